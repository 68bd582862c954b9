use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use db::models::package::{Entity as PackageEntity, PackageStatus};
use db::models::proof_image::{Model as ProofImageModel, ProofType};
use db::models::user::Entity as UserEntity;
use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::path::Path as FsPath;
use util::{config, sse::Event, state::AppState};
use validator::Validate;

use crate::auth::AuthUser;
use crate::response::ApiResponse;
use crate::routes::common::{PackageResponse, format_validation_errors};
use crate::routes::driver::NON_DELIVERY_REASONS;

/// Minimum number of proof photos required to close a package.
const MIN_PROOF_IMAGES: usize = 2;

#[derive(Debug, Deserialize, Validate)]
pub struct LocationRequest {
    #[validate(range(min = -90.0, max = 90.0, message = "Latitude out of range"))]
    pub lat: f64,

    #[validate(range(min = -180.0, max = 180.0, message = "Longitude out of range"))]
    pub lng: f64,
}

#[derive(Debug, Serialize, Default)]
pub struct LocationAck {
    pub ok: bool,
}

/// POST /api/driver/location
///
/// Stores the driver's last known position and publishes a `DRIVER_LOCATION`
/// event to the admin live-map stream.
pub async fn update_location(
    State(app_state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(req): Json<LocationRequest>,
) -> impl IntoResponse {
    if let Err(validation_errors) = req.validate() {
        let error_message = format_validation_errors(&validation_errors);
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<LocationAck>::error(error_message)),
        );
    }

    let db = app_state.db();

    let user = match UserEntity::find_by_id(claims.sub).one(db).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(ApiResponse::<LocationAck>::error("User not found")),
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "DB error loading driver");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<LocationAck>::error("Database error")),
            );
        }
    };

    let user = match user.update_last_location(db, req.lat, req.lng).await {
        Ok(user) => user,
        Err(e) => {
            tracing::error!(error = %e, "DB error storing driver location");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<LocationAck>::error("Database error")),
            );
        }
    };

    let event = Event::DriverLocation {
        driver_id: user.id,
        lat: req.lat,
        lng: req.lng,
        at: user.last_location_at.map(|t| t.to_rfc3339()),
        full_name: user.full_name,
        username: user.username,
    };
    if let Err(e) = app_state.broadcaster().publish(&event) {
        tracing::error!(error = %e, "Failed to serialize location event");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::<LocationAck>::error("Failed to publish event")),
        );
    }

    (
        StatusCode::OK,
        Json(ApiResponse::success(
            LocationAck { ok: true },
            "Location updated",
        )),
    )
}

/// The two terminal outcomes a driver can close a package with.
#[derive(Debug, Clone, Copy, PartialEq)]
enum CloseOutcome {
    Delivered,
    NotDelivered,
}

impl CloseOutcome {
    fn status(self) -> PackageStatus {
        match self {
            CloseOutcome::Delivered => PackageStatus::Delivered,
            CloseOutcome::NotDelivered => PackageStatus::NotDelivered,
        }
    }

    fn proof_type(self) -> ProofType {
        match self {
            CloseOutcome::Delivered => ProofType::Delivered,
            CloseOutcome::NotDelivered => ProofType::NotDelivered,
        }
    }
}

/// Fields accepted by the multipart close form.
#[derive(Default)]
struct CloseForm {
    pod_notes: Option<String>,
    reason: Option<String>,
    lat: Option<f64>,
    lng: Option<f64>,
    /// `(original file name, contents)` per uploaded photo.
    images: Vec<(String, Vec<u8>)>,
}

async fn read_close_form(mut multipart: Multipart) -> CloseForm {
    let mut form = CloseForm::default();

    while let Some(field) = multipart.next_field().await.unwrap_or(None) {
        match field.name().unwrap_or("") {
            "pod_notes" => form.pod_notes = field.text().await.ok(),
            "reason" => form.reason = field.text().await.ok(),
            "lat" => form.lat = field.text().await.ok().and_then(|s| s.parse().ok()),
            "lng" => form.lng = field.text().await.ok().and_then(|s| s.parse().ok()),
            "images" => {
                let name = field.file_name().unwrap_or("").to_string();
                let bytes = field.bytes().await.unwrap_or_default().to_vec();
                form.images.push((name, bytes));
            }
            _ => continue,
        }
    }

    form
}

/// Builds a collision-resistant stored file name for one proof photo,
/// keeping the original extension when there is one.
fn proof_filename(code: &str, original_name: &str) -> String {
    let ext = FsPath::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_else(|| ".jpg".into());
    format!(
        "{}_{}_{}{}",
        code,
        Utc::now().timestamp(),
        hex::encode(rand::random::<[u8; 4]>()),
        ext
    )
}

/// POST /api/driver/packages/{package_id}/close_delivered
///
/// Closes one of the driver's packages as DELIVERED. Multipart form:
/// `pod_notes` (required, non-blank), at least two `images` photos, and
/// optional `lat`/`lng` captured at the doorstep. Publishes a
/// `PACKAGE_CLOSED` event on success.
pub async fn close_delivered(
    State(app_state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(package_id): Path<i64>,
    multipart: Multipart,
) -> Response {
    close_package(app_state, claims.sub, package_id, multipart, CloseOutcome::Delivered).await
}

/// POST /api/driver/packages/{package_id}/close_not_delivered
///
/// Same as `close_delivered`, plus a required `reason` field that must match
/// one of the accepted non-delivery reasons. Closes as NOT_DELIVERED.
pub async fn close_not_delivered(
    State(app_state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(package_id): Path<i64>,
    multipart: Multipart,
) -> Response {
    close_package(
        app_state,
        claims.sub,
        package_id,
        multipart,
        CloseOutcome::NotDelivered,
    )
    .await
}

async fn close_package(
    app_state: AppState,
    driver_id: i64,
    package_id: i64,
    multipart: Multipart,
    outcome: CloseOutcome,
) -> Response {
    let form = read_close_form(multipart).await;

    let pod_notes = match form.pod_notes.as_deref().map(str::trim) {
        Some(notes) if !notes.is_empty() => notes.to_string(),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::<PackageResponse>::error(
                    "Proof notes are required",
                )),
            )
                .into_response();
        }
    };

    let reason = match outcome {
        CloseOutcome::Delivered => None,
        CloseOutcome::NotDelivered => match form.reason.as_deref() {
            Some(reason) if NON_DELIVERY_REASONS.contains(&reason) => Some(reason.to_string()),
            _ => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ApiResponse::<PackageResponse>::error(
                        "Invalid non-delivery reason",
                    )),
                )
                    .into_response();
            }
        },
    };

    if form.images.len() < MIN_PROOF_IMAGES {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<PackageResponse>::error(
                "At least 2 photos are required",
            )),
        )
            .into_response();
    }

    let db = app_state.db();

    let pkg = match PackageEntity::find_by_id(package_id).one(db).await {
        Ok(Some(pkg)) if pkg.driver_id == driver_id => pkg,
        Ok(_) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::<PackageResponse>::error("Package not found")),
            )
                .into_response();
        }
        Err(e) => {
            tracing::error!(error = %e, "DB error loading package");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<PackageResponse>::error("Database error")),
            )
                .into_response();
        }
    };

    if pkg.is_closed() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<PackageResponse>::error(
                "Package already closed",
            )),
        )
            .into_response();
    }

    let upload_root = config::upload_root();
    if let Err(e) = tokio::fs::create_dir_all(&upload_root).await {
        tracing::error!(error = %e, "Failed to create upload directory");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::<PackageResponse>::error(
                "Failed to store proof images",
            )),
        )
            .into_response();
    }

    // Files land on disk first; an orphaned file is harmless if the close
    // fails later, while a proof row without a closed package is not.
    let mut stored = Vec::with_capacity(form.images.len());
    for (original_name, bytes) in &form.images {
        let filename = proof_filename(&pkg.code, original_name);
        let fs_path = FsPath::new(&upload_root).join(&filename);
        if let Err(e) = tokio::fs::write(&fs_path, bytes).await {
            tracing::error!(error = %e, path = %fs_path.display(), "Failed to write proof image");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<PackageResponse>::error(
                    "Failed to store proof images",
                )),
            )
                .into_response();
        }
        stored.push(filename);
    }

    // Proof rows and the status flip commit together or not at all; the
    // transaction rolls back when dropped on any error path below.
    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(e) => {
            tracing::error!(error = %e, "DB error starting close transaction");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<PackageResponse>::error("Database error")),
            )
                .into_response();
        }
    };

    for filename in &stored {
        if let Err(e) = ProofImageModel::create(&txn, pkg.id, outcome.proof_type(), filename).await
        {
            tracing::error!(error = %e, "DB error recording proof image");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<PackageResponse>::error("Database error")),
            )
                .into_response();
        }
    }

    let now = Utc::now();
    let mut active = pkg.into_active_model();
    active.status = Set(outcome.status());
    active.pod_notes = Set(pod_notes);
    active.non_delivery_reason = Set(reason);
    active.closed_at = Set(Some(now));
    active.updated_at = Set(now);
    if let (Some(lat), Some(lng)) = (form.lat, form.lng) {
        active.lat = Set(Some(lat));
        active.lng = Set(Some(lng));
        active.location_at = Set(Some(now));
    }

    let updated = match active.update(&txn).await {
        Ok(updated) => updated,
        Err(e) => {
            tracing::error!(error = %e, "DB error closing package");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<PackageResponse>::error("Database error")),
            )
                .into_response();
        }
    };

    if let Err(e) = txn.commit().await {
        tracing::error!(error = %e, "DB error committing close");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::<PackageResponse>::error("Database error")),
        )
            .into_response();
    }

    let event = Event::PackageClosed {
        package_id: updated.id,
        code: updated.code.clone(),
        status: updated.status.to_string(),
        driver_id: updated.driver_id,
        closed_at: updated.closed_at.map(|t| t.to_rfc3339()),
    };
    if let Err(e) = app_state.broadcaster().publish(&event) {
        tracing::error!(error = %e, "Failed to serialize package-closed event");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::<PackageResponse>::error(
                "Failed to publish event",
            )),
        )
            .into_response();
    }

    match PackageResponse::load(db, updated).await {
        Ok(out) => (
            StatusCode::OK,
            Json(ApiResponse::success(out, "Package closed successfully")),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "DB error loading proof images");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<PackageResponse>::error("Database error")),
            )
                .into_response()
        }
    }
}

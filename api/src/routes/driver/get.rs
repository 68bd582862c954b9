use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use db::models::package::{Column as PackageColumn, Entity as PackageEntity};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use util::state::AppState;

use crate::auth::AuthUser;
use crate::response::ApiResponse;
use crate::routes::common::PackageResponse;
use crate::routes::driver::NON_DELIVERY_REASONS;

/// GET /api/driver/reasons
///
/// The fixed list of accepted non-delivery reasons, for the close form.
pub async fn list_reasons() -> impl IntoResponse {
    Json(ApiResponse::success(
        NON_DELIVERY_REASONS.to_vec(),
        "Reasons retrieved successfully",
    ))
}

/// GET /api/driver/packages
///
/// The logged-in driver's packages, newest-updated first.
pub async fn my_packages(
    State(app_state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> impl IntoResponse {
    let db = app_state.db();

    let packages = match PackageEntity::find()
        .filter(PackageColumn::DriverId.eq(claims.sub))
        .order_by_desc(PackageColumn::UpdatedAt)
        .all(db)
        .await
    {
        Ok(packages) => packages,
        Err(e) => {
            tracing::error!(error = %e, "DB error listing driver packages");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<Vec<PackageResponse>>::error("Database error")),
            );
        }
    };

    match PackageResponse::load_many(db, packages).await {
        Ok(out) => (
            StatusCode::OK,
            Json(ApiResponse::success(out, "Packages retrieved successfully")),
        ),
        Err(e) => {
            tracing::error!(error = %e, "DB error loading proof images");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<Vec<PackageResponse>>::error("Database error")),
            )
        }
    }
}

/// GET /api/driver/packages/{package_id}
///
/// Detail for one of the logged-in driver's packages. Packages assigned to
/// anyone else are reported as not found.
pub async fn package_detail(
    State(app_state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(package_id): Path<i64>,
) -> impl IntoResponse {
    let db = app_state.db();

    let pkg = match PackageEntity::find_by_id(package_id).one(db).await {
        Ok(Some(pkg)) if pkg.driver_id == claims.sub => pkg,
        Ok(_) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::<PackageResponse>::error("Package not found")),
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "DB error loading package");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<PackageResponse>::error("Database error")),
            );
        }
    };

    match PackageResponse::load(db, pkg).await {
        Ok(out) => (
            StatusCode::OK,
            Json(ApiResponse::success(out, "Package retrieved successfully")),
        ),
        Err(e) => {
            tracing::error!(error = %e, "DB error loading proof images");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<PackageResponse>::error("Database error")),
            )
        }
    }
}

#[derive(Debug, Serialize, Default)]
pub struct ProgressResponse {
    pub closed: u64,
    pub total: u64,
    pub fraction: String,
}

/// GET /api/driver/progress
///
/// Closed/total counts for the logged-in driver, with a display fraction.
pub async fn progress(
    State(app_state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> impl IntoResponse {
    let packages = match PackageEntity::find()
        .filter(PackageColumn::DriverId.eq(claims.sub))
        .all(app_state.db())
        .await
    {
        Ok(packages) => packages,
        Err(e) => {
            tracing::error!(error = %e, "DB error computing progress");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<ProgressResponse>::error("Database error")),
            );
        }
    };

    let total = packages.len() as u64;
    let closed = packages.iter().filter(|p| p.is_closed()).count() as u64;

    (
        StatusCode::OK,
        Json(ApiResponse::success(
            ProgressResponse {
                closed,
                total,
                fraction: format!("{closed}/{total}"),
            },
            "Progress retrieved successfully",
        )),
    )
}

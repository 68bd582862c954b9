use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use db::models::package::{Model as PackageModel, PackageStatus};
use db::models::user::{Entity as UserEntity, Model as UserModel, Role};
use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, Set};
use serde::{Deserialize, Serialize};
use util::state::AppState;
use validator::Validate;

use crate::response::ApiResponse;
use crate::routes::common::{DriverResponse, PackageResponse, format_validation_errors};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDriverRequest {
    #[validate(length(min = 2, max = 120, message = "Username must be 2-120 characters"))]
    pub username: String,

    #[validate(length(min = 2, max = 255, message = "Full name must be 2-255 characters"))]
    pub full_name: String,

    #[validate(length(min = 4, max = 255, message = "Password must be at least 4 characters"))]
    pub password: String,
}

/// POST /api/admin/drivers
///
/// Creates a new driver account.
///
/// ### Responses
/// - `201 Created` with the new driver
/// - `400 Bad Request` (validation failure)
/// - `409 Conflict` (duplicate username)
pub async fn create_driver(
    State(app_state): State<AppState>,
    Json(req): Json<CreateDriverRequest>,
) -> impl IntoResponse {
    if let Err(validation_errors) = req.validate() {
        let error_message = format_validation_errors(&validation_errors);
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<DriverResponse>::error(error_message)),
        );
    }

    let db = app_state.db();

    match UserModel::find_by_username(db, &req.username).await {
        Ok(Some(_)) => {
            return (
                StatusCode::CONFLICT,
                Json(ApiResponse::<DriverResponse>::error(
                    "A user with this username already exists",
                )),
            );
        }
        Ok(None) => {}
        Err(e) => {
            tracing::error!(error = %e, "DB error checking username");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<DriverResponse>::error("Database error")),
            );
        }
    }

    match UserModel::create(db, &req.username, &req.full_name, &req.password, Role::Driver).await {
        Ok(driver) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(
                DriverResponse::from(driver),
                "Driver created successfully",
            )),
        ),
        Err(e) => {
            tracing::error!(error = %e, "DB error creating driver");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<DriverResponse>::error("Database error")),
            )
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePackageRequest {
    #[validate(length(min = 1, max = 255, message = "Recipient name is required"))]
    pub recipient_name: String,

    #[validate(length(min = 1, max = 2000, message = "Address is required"))]
    pub address: String,

    pub phone: Option<String>,

    pub driver_id: i64,
}

/// Loads `driver_id` and confirms it refers to a driver account.
async fn find_driver(app_state: &AppState, driver_id: i64) -> Result<Option<UserModel>, sea_orm::DbErr> {
    Ok(UserEntity::find_by_id(driver_id)
        .one(app_state.db())
        .await?
        .filter(|u| u.role == Role::Driver))
}

/// POST /api/admin/packages
///
/// Creates a package in the ASSIGNED state with a freshly generated code.
///
/// ### Responses
/// - `201 Created` with the new package
/// - `400 Bad Request` (validation failure or non-driver assignee)
pub async fn create_package(
    State(app_state): State<AppState>,
    Json(req): Json<CreatePackageRequest>,
) -> impl IntoResponse {
    if let Err(validation_errors) = req.validate() {
        let error_message = format_validation_errors(&validation_errors);
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<PackageResponse>::error(error_message)),
        );
    }

    let db = app_state.db();

    match find_driver(&app_state, req.driver_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::<PackageResponse>::error("Invalid driver")),
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "DB error loading driver");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<PackageResponse>::error("Database error")),
            );
        }
    }

    let code = match PackageModel::next_code(db).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "DB error generating package code");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<PackageResponse>::error("Database error")),
            );
        }
    };

    match PackageModel::create(
        db,
        &code,
        &req.recipient_name,
        &req.address,
        req.phone.as_deref().unwrap_or(""),
        req.driver_id,
    )
    .await
    {
        Ok(pkg) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(
                PackageResponse::from_package(pkg, Vec::new()),
                "Package created successfully",
            )),
        ),
        Err(e) => {
            tracing::error!(error = %e, "DB error creating package");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<PackageResponse>::error("Database error")),
            )
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct AssignByCodeRequest {
    #[validate(length(min = 1, max = 32, message = "Package code is required"))]
    pub code: String,

    pub driver_id: i64,
}

#[derive(Debug, Serialize, Default)]
pub struct AssignByCodeResponse {
    pub assigned: String,
    pub driver_id: i64,
}

/// POST /api/admin/packages/assign_by_code
///
/// Reassigns an existing package (looked up by code, case-insensitive) to a
/// driver and resets its status to ASSIGNED.
///
/// ### Responses
/// - `200 OK` with `{assigned, driver_id}`
/// - `400 Bad Request` (validation failure or non-driver assignee)
/// - `404 Not Found` (unknown code)
pub async fn assign_by_code(
    State(app_state): State<AppState>,
    Json(req): Json<AssignByCodeRequest>,
) -> impl IntoResponse {
    if let Err(validation_errors) = req.validate() {
        let error_message = format_validation_errors(&validation_errors);
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<AssignByCodeResponse>::error(error_message)),
        );
    }

    let db = app_state.db();
    let code = req.code.trim().to_uppercase();

    let pkg = match PackageModel::find_by_code(db, &code).await {
        Ok(Some(pkg)) => pkg,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::<AssignByCodeResponse>::error(
                    "Package not found",
                )),
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "DB error loading package");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<AssignByCodeResponse>::error("Database error")),
            );
        }
    };

    match find_driver(&app_state, req.driver_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::<AssignByCodeResponse>::error("Invalid driver")),
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "DB error loading driver");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<AssignByCodeResponse>::error("Database error")),
            );
        }
    }

    let mut active = pkg.into_active_model();
    active.driver_id = Set(req.driver_id);
    active.status = Set(PackageStatus::Assigned);
    active.updated_at = Set(Utc::now());

    match active.update(db).await {
        Ok(_) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                AssignByCodeResponse {
                    assigned: code,
                    driver_id: req.driver_id,
                },
                "Package reassigned successfully",
            )),
        ),
        Err(e) => {
            tracing::error!(error = %e, "DB error reassigning package");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<AssignByCodeResponse>::error("Database error")),
            )
        }
    }
}

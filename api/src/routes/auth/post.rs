use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use db::models::user::Model as UserModel;
use serde::{Deserialize, Serialize};
use util::state::AppState;
use validator::Validate;

use crate::auth::generate_jwt;
use crate::response::ApiResponse;
use crate::routes::common::format_validation_errors;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 120, message = "Username is required"))]
    pub username: String,

    #[validate(length(min = 1, max = 255, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize, Default)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: String,
    pub role: String,
    pub user_id: i64,
    pub full_name: String,
}

/// POST /api/auth/login
///
/// Verifies a username/password pair and issues a bearer token.
///
/// ### Request Body
/// ```json
/// {
///   "username": "driver1",
///   "password": "strongpassword"
/// }
/// ```
///
/// ### Responses
///
/// - `200 OK`
/// ```json
/// {
///   "success": true,
///   "data": {
///     "access_token": "jwt_token_here",
///     "token_type": "bearer",
///     "expires_at": "2026-08-30T11:00:00Z",
///     "role": "driver",
///     "user_id": 4,
///     "full_name": "Driver One"
///   },
///   "message": "Login successful"
/// }
/// ```
///
/// - `400 Bad Request` (validation failure)
/// - `401 Unauthorized` (unknown user or wrong password)
pub async fn login(
    State(app_state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> impl IntoResponse {
    if let Err(validation_errors) = req.validate() {
        let error_message = format_validation_errors(&validation_errors);
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<LoginResponse>::error(error_message)),
        );
    }

    let user = match UserModel::find_by_username(app_state.db(), &req.username).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(ApiResponse::<LoginResponse>::error(
                    "Invalid username or password",
                )),
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "DB error during login");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<LoginResponse>::error("Database error")),
            );
        }
    };

    if !user.verify_password(&req.password) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::<LoginResponse>::error(
                "Invalid username or password",
            )),
        );
    }

    let (token, expires_at) = generate_jwt(user.id, user.role);

    (
        StatusCode::OK,
        Json(ApiResponse::success(
            LoginResponse {
                access_token: token,
                token_type: "bearer".into(),
                expires_at,
                role: user.role.to_string(),
                user_id: user.id,
                full_name: user.full_name,
            },
            "Login successful",
        )),
    )
}

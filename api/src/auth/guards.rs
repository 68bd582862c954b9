use crate::auth::claims::AuthUser;
use crate::response::ApiResponse;
use axum::{
    Json,
    body::Body,
    extract::{FromRequestParts, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use db::models::user::{Entity as UserEntity, Model as UserModel, Role};
use sea_orm::EntityTrait;
use util::state::AppState;

// --- Role Based Access Guards ---

#[derive(serde::Serialize, Default)]
pub struct Empty;

/// Helper to extract, validate user from request extensions and insert them back into the request
async fn extract_and_insert_authuser(
    req: Request<Body>,
) -> Result<(Request<Body>, AuthUser), (StatusCode, Json<ApiResponse<Empty>>)> {
    let (mut parts, body) = req.into_parts();
    let user = AuthUser::from_request_parts(&mut parts, &())
        .await
        .map_err(|_| {
            (
                StatusCode::UNAUTHORIZED,
                Json(ApiResponse::error("Authentication required")),
            )
        })?;

    let mut req = Request::from_parts(parts, body);
    req.extensions_mut().insert(user.clone());
    Ok((req, user))
}

/// Loads the token's account from the database. The claims only prove the
/// token was valid when issued; a token for a since-deleted account is
/// rejected as unauthenticated, and the stored role is what gets checked.
async fn load_current_user(
    app_state: &AppState,
    user: &AuthUser,
) -> Result<UserModel, (StatusCode, Json<ApiResponse<Empty>>)> {
    match UserEntity::find_by_id(user.0.sub).one(app_state.db()).await {
        Ok(Some(current)) => Ok(current),
        Ok(None) => Err((
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::error("User not found")),
        )),
        Err(e) => {
            tracing::error!(error = %e, "DB error loading user for guard");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Database error")),
            ))
        }
    }
}

/// Admin-only guard.
pub async fn allow_admin(
    State(app_state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, Json<ApiResponse<Empty>>)> {
    let (req, user) = extract_and_insert_authuser(req).await?;
    let current = load_current_user(&app_state, &user).await?;

    if current.role != Role::Admin {
        return Err((
            StatusCode::FORBIDDEN,
            Json(ApiResponse::error("Admin access required")),
        ));
    }

    Ok(next.run(req).await)
}

/// Driver-only guard.
pub async fn allow_driver(
    State(app_state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, Json<ApiResponse<Empty>>)> {
    let (req, user) = extract_and_insert_authuser(req).await?;
    let current = load_current_user(&app_state, &user).await?;

    if current.role != Role::Driver {
        return Err((
            StatusCode::FORBIDDEN,
            Json(ApiResponse::error("Driver access required")),
        ));
    }

    Ok(next.run(req).await)
}

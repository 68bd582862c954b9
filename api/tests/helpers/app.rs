use api::auth::generate_jwt;
use api::routes::{events::stream_events, routes, uploads::get_upload};
use axum::{Router, body::Body, http::Response, routing::get};
use db::models::user::Model as UserModel;
use db::test_utils::setup_test_db;
use serde_json::Value;
use util::{config::AppConfig, sse::EventBroadcaster, state::AppState};

/// Builds the full application router over a fresh in-memory database.
///
/// The returned `AppState` shares the database connection and broadcaster
/// with the router, so tests can seed rows and subscribe to events directly.
pub async fn make_test_app() -> (Router, AppState) {
    AppConfig::set_jwt_secret("test-secret");
    AppConfig::set_jwt_duration_minutes(60);

    let db = setup_test_db().await;
    let app_state = AppState::new(db, EventBroadcaster::new());

    let app = Router::new()
        .nest("/api", routes(app_state.clone()))
        .route("/events", get(stream_events))
        .route("/uploads/{filename}", get(get_upload))
        .with_state(app_state.clone());

    (app, app_state)
}

/// Bearer header value for `user`, signed with the test secret.
pub fn auth_header(user: &UserModel) -> String {
    let (token, _) = generate_jwt(user.id, user.role);
    format!("Bearer {token}")
}

/// Consumes the response body and parses it as JSON.
pub async fn read_json(response: Response<Body>) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");
    serde_json::from_slice(&body).expect("Response body was not valid JSON")
}

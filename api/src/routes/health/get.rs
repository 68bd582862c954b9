use axum::Json;
use axum::response::IntoResponse;
use serde::Serialize;

use crate::response::ApiResponse;

#[derive(Serialize, Default)]
pub struct HealthStatus {
    pub ok: bool,
}

/// GET /api/health
///
/// Liveness probe. Returns `ok: true` whenever the process is serving.
pub async fn health() -> impl IntoResponse {
    Json(ApiResponse::success(
        HealthStatus { ok: true },
        "Service is healthy",
    ))
}

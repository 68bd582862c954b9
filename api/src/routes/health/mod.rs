//! # health Routes Module
//!
//! Exposes the public health check endpoint used by deploy tooling and
//! uptime monitors.

pub mod get;

use axum::{Router, routing::get};
use util::state::AppState;

use get::health;

/// Builds the `/health` route group.
///
/// - `GET /health` → `health`
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/", get(health))
}

//! HTTP route entry point for `/api/...`.
//!
//! This module defines all HTTP entry points under the `/api` namespace.
//! Routes are organized by domain (authentication, admin, driver, health),
//! each protected via appropriate access control middleware.
//!
//! Route groups include:
//! - `/health` → Health check endpoint (public)
//! - `/auth` → Authentication endpoints (login, public)
//! - `/admin` → Driver and package management (admin-only)
//! - `/driver` → The logged-in driver's own packages and location (driver-only)

use crate::auth::guards::{allow_admin, allow_driver};
use crate::routes::{
    admin::admin_routes, auth::auth_routes, driver::driver_routes, health::health_routes,
};
use axum::{Router, middleware::from_fn_with_state};
use util::state::AppState;

pub mod admin;
pub mod auth;
pub mod common;
pub mod driver;
pub mod events;
pub mod health;
pub mod uploads;

/// Builds the application router for all `/api` endpoints.
///
/// The returned router has `AppState` as its state type and mounts all core
/// API routes under their respective base paths. The role guards take the
/// state directly because they hit the database on every request. The SSE
/// stream (`/events`) and stored proof images (`/uploads`) are mounted at
/// the root in `main`, outside this namespace.
pub fn routes(app_state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/health", health_routes())
        .nest("/auth", auth_routes())
        .nest(
            "/admin",
            admin_routes().route_layer(from_fn_with_state(app_state.clone(), allow_admin)),
        )
        .nest(
            "/driver",
            driver_routes().route_layer(from_fn_with_state(app_state, allow_driver)),
        )
}

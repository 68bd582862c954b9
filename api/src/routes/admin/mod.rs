//! # admin Routes Module
//!
//! Driver and package management for back-office users. Every route in this
//! group sits behind the `allow_admin` guard.
//!
//! ## Structure
//! - `get.rs` — GET handlers (driver lists, stats, packages, map data)
//! - `post.rs` — POST handlers (create driver, create package, reassign)

pub mod get;
pub mod post;

use axum::{
    Router,
    routing::{get, post},
};
use util::state::AppState;

use get::{driver_packages, drivers_stats, list_drivers, map_data};
use post::{assign_by_code, create_driver, create_package};

/// Builds the `/admin` route group, mapping HTTP methods to handlers.
///
/// - `GET /admin/drivers` → `list_drivers`
/// - `GET /admin/drivers_stats` → `drivers_stats`
/// - `POST /admin/drivers` → `create_driver`
/// - `GET /admin/drivers/{driver_id}/packages` → `driver_packages`
/// - `POST /admin/packages` → `create_package`
/// - `POST /admin/packages/assign_by_code` → `assign_by_code`
/// - `GET /admin/map_data` → `map_data`
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/drivers", get(list_drivers).post(create_driver))
        .route("/drivers_stats", get(drivers_stats))
        .route("/drivers/{driver_id}/packages", get(driver_packages))
        .route("/packages", post(create_package))
        .route("/packages/assign_by_code", post(assign_by_code))
        .route("/map_data", get(map_data))
}

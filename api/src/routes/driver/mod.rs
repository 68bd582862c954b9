//! # driver Routes Module
//!
//! Endpoints for the logged-in driver: their own package list, progress, and
//! the close/location producers feeding the admin live map. Every route in
//! this group sits behind the `allow_driver` guard.
//!
//! ## Structure
//! - `get.rs` — GET handlers (reasons, packages, progress)
//! - `post.rs` — POST handlers (location updates, package close)

pub mod get;
pub mod post;

use axum::{
    Router,
    routing::{get, post},
};
use util::state::AppState;

use get::{list_reasons, my_packages, package_detail, progress};
use post::{close_delivered, close_not_delivered, update_location};

/// Reasons a driver may select when closing a package as NOT_DELIVERED.
/// The close handler rejects anything not in this list.
pub const NON_DELIVERY_REASONS: [&str; 8] = [
    "Incorrect or incomplete address",
    "Recipient not reachable",
    "Recipient absent",
    "Address inaccessible",
    "Recipient requested rescheduling",
    "Package out of route",
    "Package out of zone",
    "Under review",
];

/// Builds the `/driver` route group, mapping HTTP methods to handlers.
///
/// - `GET /driver/reasons` → `list_reasons`
/// - `GET /driver/packages` → `my_packages`
/// - `GET /driver/packages/{package_id}` → `package_detail`
/// - `GET /driver/progress` → `progress`
/// - `POST /driver/location` → `update_location`
/// - `POST /driver/packages/{package_id}/close_delivered` → `close_delivered`
/// - `POST /driver/packages/{package_id}/close_not_delivered` → `close_not_delivered`
pub fn driver_routes() -> Router<AppState> {
    Router::new()
        .route("/reasons", get(list_reasons))
        .route("/packages", get(my_packages))
        .route("/packages/{package_id}", get(package_detail))
        .route("/progress", get(progress))
        .route("/location", post(update_location))
        .route(
            "/packages/{package_id}/close_delivered",
            post(close_delivered),
        )
        .route(
            "/packages/{package_id}/close_not_delivered",
            post(close_not_delivered),
        )
}

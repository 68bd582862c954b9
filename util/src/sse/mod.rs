pub mod broadcaster;
pub use broadcaster::{EventBroadcaster, Subscriber};

use serde::Serialize;

/// Events published to the admin live-map stream.
///
/// Serialized as a flat JSON object with a `"type"` discriminator. Consumers
/// must tolerate unknown or missing optional fields, so new variants and
/// fields can be added without breaking existing clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A driver reported a new position.
    #[serde(rename = "DRIVER_LOCATION")]
    DriverLocation {
        driver_id: i64,
        lat: f64,
        lng: f64,
        at: Option<String>,
        full_name: String,
        username: String,
    },
    /// A package was closed (delivered or not delivered).
    #[serde(rename = "PACKAGE_CLOSED")]
    PackageClosed {
        package_id: i64,
        code: String,
        status: String,
        driver_id: i64,
        closed_at: Option<String>,
    },
}

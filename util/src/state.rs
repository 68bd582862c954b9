//! Application state container shared across Axum route handlers.
//!
//! Holds the database connection and the process-wide event broadcaster.
//! Constructed once at startup and passed into route handlers via Axum's
//! `State<T>` extractor.

use crate::sse::EventBroadcaster;
use sea_orm::DatabaseConnection;

/// Central application state shared across the server.
///
/// This includes:
/// - A cloned, thread-safe database connection for use with SeaORM.
/// - The global `EventBroadcaster` feeding the admin live-map stream.
#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    broadcaster: EventBroadcaster,
}

impl AppState {
    /// Creates a new `AppState` with the given database connection and broadcaster.
    pub fn new(db: DatabaseConnection, broadcaster: EventBroadcaster) -> Self {
        Self { db, broadcaster }
    }

    /// Returns a shared reference to the internal `DatabaseConnection`.
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Returns a shared reference to the internal `EventBroadcaster`.
    pub fn broadcaster(&self) -> &EventBroadcaster {
        &self.broadcaster
    }

    /// Returns a cloned copy of the database connection.
    ///
    /// Useful for async contexts or spawning tasks that require ownership.
    pub fn db_clone(&self) -> DatabaseConnection {
        self.db.clone()
    }

    /// Returns a cloned handle to the `EventBroadcaster`.
    pub fn broadcaster_clone(&self) -> EventBroadcaster {
        self.broadcaster.clone()
    }
}

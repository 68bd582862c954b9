use api::auth::middleware::log_request;
use api::routes::{events::stream_events, routes, uploads::get_upload};
use axum::{
    Router,
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    middleware::from_fn,
    routing::get,
};
use db::connect;
use db::models::user::{Model as UserModel, Role};
use migration::Migrator;
use sea_orm_migration::MigratorTrait;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tracing_appender::rolling;
use util::{config, sse::EventBroadcaster, state::AppState};

#[tokio::main]
async fn main() {
    // Load configuration and initialize logging
    let _log_guard = init_logging(&config::log_file(), &config::log_level());

    // Set up dependencies
    let db = connect().await;
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    let app_state = AppState::new(db, EventBroadcaster::new());

    bootstrap_admin(&app_state).await;

    // Configure middleware
    let cors = CorsLayer::very_permissive().expose_headers([CONTENT_DISPOSITION, CONTENT_TYPE]);

    // Build app router
    let app = Router::new()
        .nest("/api", routes(app_state.clone()))
        .route("/events", get(stream_events))
        .route("/uploads/{filename}", get(get_upload))
        .with_state(app_state)
        .layer(from_fn(log_request))
        .layer(cors);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config::host(), config::port())
        .parse()
        .expect("Invalid address");

    println!(
        "Starting {} on http://{}:{}",
        config::project_name(),
        config::host(),
        config::port()
    );

    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server crashed");
}

/// Ensures the configured admin account exists, creating it on first start.
/// Skipped with a warning when no admin password is configured.
async fn bootstrap_admin(app_state: &AppState) {
    let username = config::admin_username();
    let password = config::admin_password();

    if password.is_empty() {
        tracing::warn!("ADMIN_PASSWORD not set, skipping admin bootstrap");
        return;
    }

    match UserModel::find_by_username(app_state.db(), &username).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            match UserModel::create(
                app_state.db(),
                &username,
                &config::admin_full_name(),
                &password,
                Role::Admin,
            )
            .await
            {
                Ok(admin) => tracing::info!(username = %admin.username, "Created admin account"),
                Err(e) => tracing::error!(error = %e, "Failed to create admin account"),
            }
        }
        Err(e) => tracing::error!(error = %e, "Failed to check for admin account"),
    }
}

fn init_logging(log_file: &str, _log_level: &str) -> tracing_appender::non_blocking::WorkerGuard {
    use std::fs;
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    fs::create_dir_all("logs").ok();

    let file_appender = rolling::daily("logs", log_file);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true);

    let log_to_stdout = config::log_to_stdout();

    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .with_target(true)
        .with_thread_ids(true);

    let env_filter =
        EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new("api=info"));

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer);

    if log_to_stdout {
        registry.with(stdout_layer).init();
    } else {
        registry.init();
    }

    guard
}

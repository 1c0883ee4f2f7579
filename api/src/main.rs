use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use api::state::AppState;
use common::AppConfig;
use migration::Migrator;
use sea_orm_migration::MigratorTrait;
use services::InstanceCoordinator;
use tower_http::cors::CorsLayer;
use tracing::info;

#[tokio::main]
async fn main() {
    let config = AppConfig::global().clone();
    let _log_guard =
        common::logger::init_logging(&config.log_file, &config.log_level, config.log_to_stdout);

    let db = db::connect(&config.database_path)
        .await
        .expect("Failed to connect to database");

    // Idempotent: during a rolling deploy the other live instance may have
    // applied the schema already.
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    let state = AppState::from_config(db, &config);

    let cors = CorsLayer::very_permissive();
    let app = api::app(state.clone()).layer(cors);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Invalid address");

    println!(
        "Starting {} on http://{}:{}",
        config.project_name, config.host, config.port
    );

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state.coordinator_handle()))
        .await
        .expect("Server crashed");
}

/// Resolves when the instance should stop accepting connections.
///
/// On the first termination signal the instance is flagged as draining so the
/// health probe flips to 503 and the balancer routes new traffic to the
/// replacement instance; after a short grace window the listener shuts down.
async fn shutdown_signal(coordinator: Arc<InstanceCoordinator>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    coordinator.begin_drain();
    info!("shutdown signal received, draining before close");
    tokio::time::sleep(Duration::from_secs(5)).await;
}

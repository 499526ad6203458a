//! # Pharmacy API Server
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Pharmacy API Server                              │
//! │                                                                         │
//! │  Dashboard / Storefront ───► HTTP (4000) ───► Routes ───► SQLite       │
//! │                                                  ▲                      │
//! │                                                  │                      │
//! │                                       background jobs (tokio)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pharmacy_api::config::ApiConfig;
use pharmacy_api::jobs::Jobs;
use pharmacy_api::{build_router, AppState};
use pharmacy_db::{Database, DbConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pharmacy_api=info,pharmacy_db=info,tower_http=info")),
        )
        .with_target(true)
        .init();

    info!("Starting pharmacy API server...");

    let config = ApiConfig::load().context("loading configuration")?;
    info!(
        bind = %config.bind_address(),
        database = %config.database_path,
        "Configuration loaded"
    );

    let db = Database::new(
        DbConfig::new(&config.database_path).max_connections(config.database_max_connections),
    )
    .await
    .context("opening database")?;
    if !db.health_check().await {
        anyhow::bail!("database at {} is not answering queries", config.database_path);
    }
    info!("Database ready");

    let jobs = Jobs::spawn(db.clone(), &config);
    let bind_address = config.bind_address();
    let state = AppState::new(db.clone(), config);

    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("binding {bind_address}"))?;
    info!(addr = %bind_address, "Listening");

    axum::serve(
        listener,
        build_router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("serving HTTP")?;

    jobs.shutdown().await;
    db.close().await;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(?e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(?e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}

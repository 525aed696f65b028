//! Leadsync Server - Main entry point

use anyhow::Result;
use leadsync_common::logging::{init_logging, LogConfig};
use leadsync_engine::{IdempotencyTracker, SqliteStore};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tracing::info;

use leadsync_server::{config::Config, create_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let log_config = LogConfig::builder()
        .log_file_prefix("leadsync-server")
        .filter_directives("leadsync_server=debug,leadsync_engine=info,tower_http=debug")
        .build()
        // Environment variables take precedence
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    info!("Starting leadsync server");

    // Load configuration
    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    let tracker = match &config.sync.store_path {
        Some(path) => {
            let store = SqliteStore::open(path)?;
            let purged = store.cleanup_expired()?;
            info!(path = %path.display(), purged, "Marker store opened");
            IdempotencyTracker::new(Arc::new(store), config.sync.retention())
        },
        None => IdempotencyTracker::from_config(&config.sync)?,
    };

    let state = AppState::new(config.sync.clone(), tracker);
    let app = create_router(state, &config.cors);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Start server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout_secs))
        .await?;

    info!("Server shut down gracefully");

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    // Give ongoing requests time to complete
    info!("Waiting up to {} seconds for connections to close", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}

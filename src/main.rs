//! Cluster Cache - cache manager over a Redis cluster
//!
//! Runs the cache manager as a standalone process: connects to the cluster,
//! monitors it, optionally serves diagnostics over HTTP, and shuts down
//! cleanly on SIGINT/SIGTERM.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cluster_cache::api::create_router;
use cluster_cache::{AppState, CacheManager, Config};

/// Main entry point for the cache manager process.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Connect to the cluster and probe it (fatal on failure)
/// 4. Serve diagnostics if `STATS_PORT` is set
/// 5. Shut the manager down on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cluster_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting cluster cache manager");

    let config = Config::from_env();
    info!(
        "Configuration loaded: backend={:?}, nodes={}, monitor_interval={}s, retries={}, offline_queue={}",
        config.backend,
        config.nodes.join(","),
        config.monitor_interval,
        config.max_retries,
        config.offline_queue
    );

    let manager = Arc::new(
        CacheManager::connect(&config)
            .await
            .context("cache initialization failed")?,
    );

    match config.stats_port {
        Some(port) => {
            let app = create_router(AppState::new(manager.clone()));
            let addr = SocketAddr::from(([0, 0, 0, 0], port));
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("failed to bind diagnostics port {}", port))?;
            info!("Diagnostics listening on http://{}", addr);

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("diagnostics server failed")?;
        }
        None => shutdown_signal().await,
    }

    manager.shutdown().await;
    info!("Shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}

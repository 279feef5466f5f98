//! # Kitchen Flow Server
//!
//! Wires [`Config`] → tracing → [`JsonFileStorage`] → [`KitchenSystem`] → axum, and shuts
//! down gracefully on Ctrl-C: the HTTP server drains, background tasks stop and the
//! journal is flushed.
//!
//! ```bash
//! HTTP_PORT=3000 DATA_FILE=./data/orders.json cargo run -p kitchen-flow
//! LOG_FORMAT=json RUST_LOG=debug cargo run -p kitchen-flow
//! ```

use anyhow::Context;
use entity_actor::tracing::setup_tracing;
use kitchen_flow::clock::SystemClock;
use kitchen_flow::config::Config;
use kitchen_flow::lifecycle::KitchenSystem;
use kitchen_flow::store::JsonFileStorage;
use kitchen_flow::sync_tracker::LogTransport;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();
    if let Err(e) = setup_tracing(&config.log_level, config.log_format) {
        eprintln!("tracing already initialized: {e}");
    }
    info!(?config, "Starting kitchen-flow");

    let storage = Arc::new(JsonFileStorage::new(&config.data_file));
    let system = KitchenSystem::start(
        &config,
        storage,
        Arc::new(LogTransport),
        Arc::new(SystemClock),
    )
    .await
    .with_context(|| format!("failed to load orders from {}", config.data_file.display()))?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "HTTP server listening");

    let shutdown = system.shutdown_token();
    axum::serve(listener, system.router())
        .with_graceful_shutdown(async move {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        warn!(error = %e, "Failed to listen for Ctrl-C");
                    }
                    info!("Shutdown signal received");
                }
                _ = shutdown.cancelled() => {}
            }
        })
        .await
        .context("HTTP server error")?;

    let health = system.shutdown().await;
    if !health.is_healthy() {
        warn!(
            failures = health.failures,
            last_error = health.last_error.as_deref().unwrap_or("-"),
            "Stopped with unpersisted changes"
        );
    }
    info!("Application completed successfully");
    Ok(())
}

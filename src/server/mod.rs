//! HTTP service assembly: state, worker pool, router, and listener.

pub mod api;
pub mod workers;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::config::Config;
use crate::jobs::JobStore;
use self::api::AppState;

/// Build the application router and spawn the worker pool behind it.
pub fn build_app(config: Arc<Config>) -> Router {
    let store = JobStore::new();
    let (tx, rx) = tokio::sync::mpsc::channel(config.queue_capacity);
    workers::spawn_workers(config.workers, rx, store.clone(), Arc::clone(&config));

    let state = Arc::new(AppState {
        store,
        queue: tx,
        publish_dir: config.publish_dir.clone(),
    });

    // The published asset is fetched cross-origin by the viewer, and the
    // submission endpoint is called from a browser frontend.
    api::api_router()
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until ctrl-c.
pub async fn start_server(config: Config, port: u16) -> Result<()> {
    let workers = config.workers;
    let app = build_app(Arc::new(config));

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!(addr = %listener.local_addr()?, workers, "video pipeline service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("server shut down");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("shutting down");
}

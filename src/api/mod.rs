use anyhow::Result;
use log::info;
use std::sync::Arc;
use std::time::Duration;

pub mod http;

use crate::bulk::BulkPipeline;
use crate::config::Config;
use crate::engine::MemoryGraphEngine;
use self::http::{create_router, AppState};

/// Start the inventory graph service and block until shutdown.
pub async fn start_service(config: Config) -> Result<()> {
    let engine = Arc::new(MemoryGraphEngine::new());
    let pipeline = Arc::new(BulkPipeline::new(engine, config.bulk.clone()));
    let state = AppState::new(pipeline);
    let router = create_router(state, Duration::from_secs(config.request_timeout));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("invgraph listening on {addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("invgraph shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("failed to listen for shutdown signal: {e}");
        return;
    }
    info!("shutdown signal received");
}

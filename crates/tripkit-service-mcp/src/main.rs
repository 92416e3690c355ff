//! Tripkit HTTP service binary.
//!
//! # Configuration
//!
//! - `SERVICE_PORT` - HTTP port (default: 8080)
//! - `TRIPKIT_GENERATOR`, `GOOGLE_AI_API_KEY`, `TRIPKIT_MODEL` - trip generator
//! - `TRIPKIT_API_KEYS` - `caller:token,...`; anonymous access when unset
//! - `TRIPKIT_ALLOWED_ORIGINS` - CORS allow-list
//! - `TRIPKIT_RATE_LIMIT`, `TRIPKIT_RATE_LIMIT_WINDOW_SECS` - per-IP rate limit
//! - `RUST_LOG`, `LOG_FORMAT` - logging
//! - `METRICS_ENABLED`, `METRICS_PATH` - Prometheus endpoint

use std::net::SocketAddr;

use anyhow::Context;
use tracing::{error, info};

use tripkit_service_mcp::{router, AppState};
use tripkit_service_shared::{init_logging, init_metrics, LoggingConfig, MetricsConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let logging_config = LoggingConfig::from_env().with_service("tripkit-service-mcp");
    init_logging(&logging_config);

    let metrics_config = MetricsConfig::from_env();
    if let Err(e) = init_metrics(&metrics_config) {
        // Metrics are optional.
        tracing::warn!(error = %e, "failed to initialize metrics, continuing without metrics");
    }

    let state = AppState::from_env().map_err(|e| {
        error!(error = %e, "failed to build application state");
        e
    })?;

    let port = state.config().port;
    let app = router(state.clone(), &metrics_config.path);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(addr = %addr, "listening on");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await
        .context("http server failed")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal(state: AppState) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    state.set_ready(false);
    info!("shutdown requested, draining connections");
}

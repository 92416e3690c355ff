//! Prometheus metrics for the Tripkit service.
//!
//! HTTP metrics are recorded by [`crate::middleware::track_requests`]; the
//! helpers here record trip-level business metrics:
//!
//! - `tripkit_trips_generated_total{style}`
//! - `tripkit_trips_failed_total{kind}`
//! - `tripkit_trip_days`
//! - `tripkit_rate_limited_total{endpoint}`

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tripkit_lib::ResponseEnvelope;

static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    /// Path for the metrics endpoint (e.g., "/metrics").
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/metrics".to_string(),
        }
    }
}

impl MetricsConfig {
    /// Create configuration from environment variables.
    ///
    /// - `METRICS_ENABLED`: "true" or "false" (default: true)
    /// - `METRICS_PATH`: Path for metrics endpoint (default: "/metrics")
    pub fn from_env() -> Self {
        let enabled = std::env::var("METRICS_ENABLED")
            .map(|v| v.trim().to_lowercase() != "false")
            .unwrap_or(true);
        let path = std::env::var("METRICS_PATH")
            .ok()
            .filter(|p| p.starts_with('/'))
            .unwrap_or_else(|| "/metrics".to_string());

        Self { enabled, path }
    }
}

#[derive(Debug, Clone, Error)]
pub enum MetricsError {
    #[error("metrics are disabled")]
    Disabled,
    #[error("metrics recorder already initialized")]
    AlreadyInitialized,
    #[error("failed to install metrics recorder: {0}")]
    InstallFailed(String),
}

/// Install the Prometheus recorder. Must run before any metric is recorded.
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if !config.enabled {
        return Err(MetricsError::Disabled);
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| MetricsError::InstallFailed(e.to_string()))?;

    PROMETHEUS_HANDLE
        .set(handle)
        .map_err(|_| MetricsError::AlreadyInitialized)?;

    Ok(())
}

/// Returns `None` until [`init_metrics`] has run.
pub fn prometheus_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

/// Axum handler rendering the Prometheus exposition format.
pub async fn metrics_handler() -> String {
    PROMETHEUS_HANDLE
        .get()
        .map(|h| h.render())
        .unwrap_or_else(|| "# Metrics not initialized\n".to_string())
}

/// Record a successfully generated trip.
///
/// `style` is the requested travel style, or "none".
pub fn record_trip_generated(style: &str) {
    metrics::counter!(
        "tripkit_trips_generated_total",
        "style" => style.to_string()
    )
    .increment(1);
}

/// Record a failed call by error kind (e.g. "ValidationFailed").
pub fn record_trip_failed(kind: &str) {
    metrics::counter!(
        "tripkit_trips_failed_total",
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Record the length in days of a generated trip.
pub fn record_trip_days(days: usize) {
    metrics::histogram!("tripkit_trip_days").record(days as f64);
}

/// Record a request rejected by the rate limiter.
pub fn record_rate_limited(endpoint: &str) {
    metrics::counter!(
        "tripkit_rate_limited_total",
        "endpoint" => endpoint.to_string()
    )
    .increment(1);
}

/// Record the business metrics for a finished `generate_trip` call.
pub fn record_envelope(envelope: &ResponseEnvelope) {
    match (&envelope.data, &envelope.error) {
        (Some(data), _) => {
            record_trip_generated(data.travel_style.as_deref().unwrap_or("none"));
            record_trip_days(data.day_count);
        }
        (None, Some(error)) => record_trip_failed(error.kind.as_str()),
        (None, None) => {}
    }
}

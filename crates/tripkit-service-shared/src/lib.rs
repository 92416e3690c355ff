//! Shared infrastructure for the Tripkit HTTP service.
//!
//! - [`AppState`]: the MCP server, service config, rate limiter and readiness flag
//! - [`health`]: liveness/readiness probe handlers
//! - [`EnvelopeResponse`]: envelope served with a status mapped from its error kind
//! - [`metrics`]: Prometheus recorder plus trip business metrics
//! - [`logging`]: structured JSON/text logging setup
//! - [`middleware`]: request correlation, client IP and HTTP metrics
//! - [`RateLimiter`]: per-client fixed-window limiter
//!
//! # Architecture
//!
//! Handlers stay thin; the pipeline lives in `tripkit-lib` and `tripkit-mcp`:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  axum handler / MCP gate                                    │
//! │  - Rate limit by client IP                                  │
//! │  - Build Credentials + CallContext                          │
//! │  - Hand off to rmcp (McpServer) or EndpointHandler          │
//! │  - Shape the envelope response                              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Enable the `test-utils` feature to use [`test_utils`] from dependent crates.

mod config;
mod health;
pub mod logging;
pub mod metrics;
pub mod middleware;
mod rate_limit;
mod response;
mod state;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{
    parse_origins, ConfigError, RateLimitConfig, ServiceConfig, DEFAULT_ALLOWED_ORIGINS,
};
pub use health::{health_live, health_ready, HealthStatus};
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use metrics::{
    init_metrics, metrics_handler, record_envelope, record_rate_limited, record_trip_days,
    record_trip_failed, record_trip_generated, MetricsConfig, MetricsError,
};
pub use middleware::{
    client_ip, extract_or_generate_request_id, route_label, track_requests, RequestId,
};
pub use rate_limit::{RateDecision, RateLimiter};
pub use response::{status_for_kind, EnvelopeResponse};
pub use state::{AppState, AppStateError};

//! Health check handlers for liveness and readiness probes.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::AppState;

/// Health status response for liveness and readiness probes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Status indicator: "ok" or "not_ready: <reason>".
    pub status: String,

    pub service: String,

    pub version: String,

    /// Name of the configured trip generator (readiness only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
}

impl HealthStatus {
    pub fn alive(service: &str, version: &str) -> Self {
        Self {
            status: "ok".to_string(),
            service: service.to_string(),
            version: version.to_string(),
            generator: None,
        }
    }

    pub fn ready(service: &str, version: &str, generator: &str) -> Self {
        Self {
            status: "ok".to_string(),
            service: service.to_string(),
            version: version.to_string(),
            generator: Some(generator.to_string()),
        }
    }

    pub fn not_ready(service: &str, version: &str, reason: &str) -> Self {
        Self {
            status: format!("not_ready: {}", reason),
            service: service.to_string(),
            version: version.to_string(),
            generator: None,
        }
    }
}

/// Liveness probe. Always 200 while the process is serving.
///
/// ```text
/// GET /health/live
/// {"status":"ok","service":"tripkit-service-mcp","version":"0.1.0"}
/// ```
pub async fn health_live(State(state): State<AppState>) -> impl IntoResponse {
    let status = HealthStatus::alive(&state.config().service_name, env!("CARGO_PKG_VERSION"));
    (StatusCode::OK, Json(status))
}

/// Readiness probe. 503 once the service has started draining.
///
/// ```text
/// GET /health/ready
/// {"status":"ok","service":"tripkit-service-mcp","version":"0.1.0","generator":"gemini"}
/// ```
pub async fn health_ready(State(state): State<AppState>) -> Response {
    let service = &state.config().service_name;
    let version = env!("CARGO_PKG_VERSION");

    if !state.is_ready() {
        let status = HealthStatus::not_ready(service, version, "shutting down");
        return (StatusCode::SERVICE_UNAVAILABLE, Json(status)).into_response();
    }

    let status = HealthStatus::ready(service, version, state.handler().generator_name());
    (StatusCode::OK, Json(status)).into_response()
}

//! HTTP middleware for the Tripkit service.
//!
//! - [`RequestId`]: correlation ID taken from `X-Request-ID` or generated (UUID v7)
//! - [`client_ip`]: caller address used for rate limiting and anonymous identity
//! - [`track_requests`]: axum middleware tagging requests and recording HTTP metrics
//!
//! [`track_requests`] records:
//! - `tripkit_http_requests_total`: Counter by method, route, status bucket
//! - `tripkit_http_request_duration_seconds`: Histogram by route
//! - `tripkit_mcp_requests_total`: Counter of `/api/mcp` traffic by operation

use std::time::Instant;

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderName, HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Newtype wrapper for request correlation IDs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new UUID v7 request ID.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Extract the request ID from headers or generate a new UUID v7.
///
/// Empty or non-UTF-8 `X-Request-ID` values are ignored.
pub fn extract_or_generate_request_id(headers: &HeaderMap) -> RequestId {
    headers
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(RequestId::from)
        .unwrap_or_else(RequestId::generate)
}

/// Client address as reported by the proxy chain.
///
/// First hop of `X-Forwarded-For`, then `X-Real-IP`, else `"unknown"`.
pub fn client_ip(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };

    forwarded
        .or_else(real_ip)
        .unwrap_or("unknown")
        .to_string()
}

/// Low-cardinality metric label for a request path.
pub fn route_label(path: &str) -> &'static str {
    match path {
        p if p.starts_with("/api/mcp") => "mcp",
        p if p.starts_with("/api/v1/trips") => "trips",
        p if p.starts_with("/health") => "health",
        p if p.starts_with("/metrics") => "metrics",
        _ => "other",
    }
}

/// MCP operation implied by the HTTP method on `/api/mcp`.
pub fn mcp_operation(method: &Method) -> &'static str {
    match *method {
        Method::POST => "message",
        Method::GET => "stream",
        Method::DELETE => "close_session",
        Method::OPTIONS => "preflight",
        _ => "other",
    }
}

fn status_bucket(status: u16) -> &'static str {
    match status {
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    }
}

/// Tag the request with a [`RequestId`] and record its metrics.
///
/// The ID is stored in the request extensions for handlers and echoed in the
/// `X-Request-ID` response header.
pub async fn track_requests(mut request: Request, next: Next) -> Response {
    let started = Instant::now();
    let request_id = extract_or_generate_request_id(request.headers());
    request.extensions_mut().insert(request_id.clone());

    let method = request.method().clone();
    let route = route_label(request.uri().path());
    if route == "mcp" {
        metrics::counter!(
            "tripkit_mcp_requests_total",
            "operation" => mcp_operation(&method)
        )
        .increment(1);
    }

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        route,
        client_ip = %client_ip(request.headers()),
    );
    let mut response = next.run(request).instrument(span.clone()).await;

    let status = response.status().as_u16();
    let elapsed = started.elapsed();
    metrics::counter!(
        "tripkit_http_requests_total",
        "method" => method.to_string(),
        "route" => route,
        "status" => status_bucket(status)
    )
    .increment(1);
    metrics::histogram!("tripkit_http_request_duration_seconds", "route" => route)
        .record(elapsed.as_secs_f64());

    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    span.in_scope(|| {
        info!(
            status,
            latency_ms = elapsed.as_millis() as u64,
            "request completed"
        )
    });
    response
}

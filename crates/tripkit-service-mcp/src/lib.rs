//! Tripkit HTTP service: MCP over streamable HTTP plus a plain REST trip endpoint.
//!
//! # Endpoints
//!
//! - `POST /api/mcp` - MCP JSON-RPC messages, answered by rmcp
//! - `GET /api/mcp` - Session event stream with `Accept: text/event-stream`,
//!   server info otherwise
//! - `DELETE /api/mcp` - End an MCP session
//! - `POST /api/v1/trips` - Run `generate_trip` and return the envelope
//! - `GET /metrics` - Prometheus metrics
//! - `GET /health/live`, `GET /health/ready` - Probes

use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{header, Extensions, HeaderMap, HeaderName, HeaderValue, Method},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager,
    tower::{StreamableHttpServerConfig, StreamableHttpService},
};
use serde_json::{json, Value};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, info, warn};

use tripkit_mcp::{rate_limited_error, CallContext, Credentials};
use tripkit_service_shared::{
    client_ip, extract_or_generate_request_id, health_live, health_ready, metrics_handler,
    record_envelope, record_rate_limited, track_requests, EnvelopeResponse, RequestId,
};

pub use tripkit_service_shared::AppState;

pub const MCP_PATH: &str = "/api/mcp";
pub const TRIPS_PATH: &str = "/api/v1/trips";

pub const MCP_SESSION_ID: HeaderName = HeaderName::from_static("mcp-session-id");

/// Interval of the keep-alive comments on open MCP event streams.
pub const SSE_KEEP_ALIVE: Duration = Duration::from_secs(30);

/// Router with metrics served at `/metrics`.
pub fn app(state: AppState) -> Router {
    router(state, "/metrics")
}

/// Full service router. Routes and layers share `state`.
pub fn router(state: AppState, metrics_path: &str) -> Router {
    let cors = cors_layer(&state.config().allowed_origins);

    Router::new()
        .route(TRIPS_PATH, post(create_trip))
        .route(metrics_path, get(metrics_handler))
        .route("/health/live", get(health_live))
        .route("/health/ready", get(health_ready))
        .merge(mcp_router(state.clone()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(track_requests))
        .with_state(state)
}

/// `/api/mcp` served by rmcp's streamable HTTP transport.
///
/// Sessions live in rmcp's session manager: `initialize` opens one, requests
/// with an unknown `Mcp-Session-Id` are rejected and `DELETE` closes it.
fn mcp_router(state: AppState) -> Router<AppState> {
    let server = state.server().clone();
    let service = StreamableHttpService::new(
        move || Ok(server.clone()),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig {
            sse_keep_alive: Some(SSE_KEEP_ALIVE),
            ..Default::default()
        },
    );

    Router::new()
        .nest_service(MCP_PATH, service)
        .layer(middleware::from_fn_with_state(state, mcp_gate))
}

/// CORS restricted to the configured assistant origins.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::AUTHORIZATION,
            MCP_SESSION_ID,
            HeaderName::from_static("last-event-id"),
            HeaderName::from_static("x-request-id"),
        ])
        .expose_headers([MCP_SESSION_ID, HeaderName::from_static("x-request-id")])
        .max_age(Duration::from_secs(86_400))
}

fn request_id(extensions: &Extensions, headers: &HeaderMap) -> RequestId {
    extensions
        .get::<RequestId>()
        .cloned()
        .unwrap_or_else(|| extract_or_generate_request_id(headers))
}

fn credentials(headers: &HeaderMap, ip: &str) -> Credentials {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    Credentials::from_authorization_header(authorization).with_client_ip(ip)
}

fn wants_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|accept| accept.contains("text/event-stream"))
        .unwrap_or(false)
}

/// Front of `/api/mcp`, ahead of rmcp.
///
/// - `POST` is rate limited per client IP; an over-limit client gets a
///   JSON-RPC `-32000` error with HTTP 200.
/// - `GET` without `Accept: text/event-stream` is answered with the server
///   description.
/// - Everything else reaches rmcp with the call's [`CallContext`] and
///   [`Credentials`] stored in the request extensions.
async fn mcp_gate(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let ip = client_ip(request.headers());
    let request_id = request_id(request.extensions(), request.headers());
    let session = request
        .headers()
        .get(&MCP_SESSION_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    match *request.method() {
        Method::POST => {
            let decision = state.rate_limiter().check(&ip);
            if !decision.allowed {
                warn!(request_id = %request_id, client_ip = %ip, "mcp request rate limited");
                record_rate_limited(MCP_PATH);
                let window = state.rate_limiter().config().window.as_secs();
                return Json(json!({
                    "jsonrpc": "2.0",
                    "id": Value::Null,
                    "error": rate_limited_error(window),
                }))
                .into_response();
            }
        }
        Method::GET if !wants_event_stream(request.headers()) => {
            return Json(state.server().description()).into_response();
        }
        Method::DELETE => {
            info!(request_id = %request_id, session_id = %session, "mcp session close requested");
        }
        _ => {}
    }

    debug!(
        request_id = %request_id,
        method = %request.method(),
        client_ip = %ip,
        session_id = %session,
        "mcp request"
    );

    let ctx: CallContext = state
        .handler()
        .context(request_id.as_str())
        .with_client_ip(ip.as_str());
    let creds = credentials(request.headers(), &ip);
    request.extensions_mut().insert(ctx);
    request.extensions_mut().insert(creds);

    next.run(request).await
}

/// `POST /api/v1/trips`
///
/// The body is the raw `generate_trip` arguments. Invalid JSON becomes an
/// empty argument object so the validator reports every missing field.
async fn create_trip(
    State(state): State<AppState>,
    extensions: Extensions,
    headers: HeaderMap,
    body: String,
) -> EnvelopeResponse {
    let request_id = request_id(&extensions, &headers);
    let ip = client_ip(&headers);

    let decision = state.rate_limiter().check(&ip);
    if !decision.allowed {
        warn!(request_id = %request_id, client_ip = %ip, "trip request rate limited");
        record_rate_limited(TRIPS_PATH);
        let response = EnvelopeResponse::rate_limited(decision.retry_after.as_secs());
        record_envelope(response.envelope());
        return response;
    }

    let arguments = match serde_json::from_str::<Value>(&body) {
        Ok(arguments) => arguments,
        Err(err) => {
            warn!(request_id = %request_id, error = %err, "trip request body is not JSON");
            Value::Object(Default::default())
        }
    };

    let ctx = state
        .handler()
        .context(request_id.as_str())
        .with_client_ip(ip.as_str());
    let creds = credentials(&headers, &ip);

    let envelope = state.handler().handle(&ctx, &creds, &arguments).await;
    record_envelope(&envelope);
    EnvelopeResponse::new(envelope)
}

//! Test fixtures for handler and router tests.
//!
//! Every call returns fresh state so readiness flips and rate-limit counters
//! do not leak between tests.

use std::sync::Arc;
use std::time::Duration;

use tripkit_lib::{StubBehavior, StubGenerator};
use tripkit_mcp::{ApiKeyAuthenticator, EndpointHandler};

use crate::config::{RateLimitConfig, ServiceConfig};
use crate::state::AppState;

/// Token accepted by [`keyed_state`].
pub const TEST_TOKEN: &str = "test-token";

/// Anonymous access, well-formed stub itineraries, default config.
pub fn test_state() -> AppState {
    stub_state(Arc::new(StubGenerator::new()))
}

/// Anonymous access backed by the given stub.
pub fn stub_state(stub: Arc<StubGenerator>) -> AppState {
    AppState::new(EndpointHandler::anonymous(stub), ServiceConfig::default())
}

/// Stub whose every call takes `delay`.
pub fn slow_stub(delay: Duration) -> Arc<StubGenerator> {
    Arc::new(StubGenerator::with_behavior(StubBehavior::Delay(delay)))
}

/// Requires `Authorization: Bearer test-token`.
pub fn keyed_state(stub: Arc<StubGenerator>) -> AppState {
    let handler = EndpointHandler::new(
        Arc::new(ApiKeyAuthenticator::new([("tester", TEST_TOKEN)])),
        stub,
    );
    AppState::new(handler, ServiceConfig::default())
}

/// Anonymous state with a tight rate limit.
pub fn rate_limited_state(max_requests: u32) -> AppState {
    let config = ServiceConfig {
        rate_limit: RateLimitConfig::new(max_requests, Duration::from_secs(60)),
        ..ServiceConfig::default()
    };
    AppState::new(
        EndpointHandler::anonymous(Arc::new(StubGenerator::new())),
        config,
    )
}

/// A valid three-day Paris request body.
pub fn paris_arguments() -> serde_json::Value {
    serde_json::json!({
        "destination": "Paris",
        "start_date": "2025-06-01",
        "end_date": "2025-06-03",
        "travelers": 2
    })
}

/// Generate a unique request ID for testing.
pub fn test_request_id() -> String {
    format!("test-{}", uuid::Uuid::new_v4())
}

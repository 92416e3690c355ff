//! Application state shared by the axum handlers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tripkit_mcp::{EndpointHandler, McpServer};

use crate::config::{ConfigError, ServiceConfig};
use crate::metrics::record_envelope;
use crate::rate_limit::RateLimiter;

/// Error during application state initialization.
#[derive(Debug, Error)]
pub enum AppStateError {
    #[error("invalid service configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to configure trip pipeline: {0}")]
    Pipeline(#[from] tripkit_lib::Error),
}

/// Shared application state for all axum handlers.
///
/// Cheap to clone; share it through axum's `State` extractor.
///
/// ```ignore
/// use axum::{extract::State, routing::post, Router};
/// use tripkit_service_shared::AppState;
///
/// async fn handler(State(state): State<AppState>) {
///     let server = state.server();
///     // ...
/// }
///
/// let state = AppState::from_env()?;
/// let app = Router::new().route("/api/mcp", post(handler)).with_state(state);
/// ```
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    server: McpServer,
    config: ServiceConfig,
    rate_limiter: RateLimiter,
    ready: AtomicBool,
}

impl AppState {
    /// Build the state from the environment: service config, generator,
    /// authenticator, retry policy and save link base.
    pub fn from_env() -> Result<Self, AppStateError> {
        let config = ServiceConfig::from_env()?;
        let handler = EndpointHandler::from_env()?;
        tracing::info!(
            generator = handler.generator_name(),
            port = config.port,
            origins = config.allowed_origins.len(),
            rate_limit = config.rate_limit.max_requests,
            "trip pipeline configured"
        );
        Ok(Self::new(handler, config))
    }

    /// Create state from pre-built components. The service starts ready.
    ///
    /// Envelopes produced through MCP tool calls feed the trip metrics.
    pub fn new(handler: EndpointHandler, config: ServiceConfig) -> Self {
        let rate_limiter = RateLimiter::new(config.rate_limit);
        Self {
            inner: Arc::new(AppStateInner {
                server: McpServer::new(Arc::new(handler)).with_observer(Arc::new(record_envelope)),
                config,
                rate_limiter,
                ready: AtomicBool::new(true),
            }),
        }
    }

    pub fn server(&self) -> &McpServer {
        &self.inner.server
    }

    pub fn handler(&self) -> &EndpointHandler {
        self.inner.server.handler()
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.inner.config
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.inner.rate_limiter
    }

    pub fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::Acquire)
    }

    /// Flip readiness, e.g. to drain traffic during shutdown.
    pub fn set_ready(&self, ready: bool) {
        self.inner.ready.store(ready, Ordering::Release);
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("generator", &self.handler().generator_name())
            .field("service", &self.inner.config.service_name)
            .field("ready", &self.is_ready())
            .finish()
    }
}

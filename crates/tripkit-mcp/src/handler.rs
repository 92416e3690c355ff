//! The `generate_trip` call pipeline
//!
//! Every call moves through authenticate, validate, generate and format, and
//! produces exactly one [`ResponseEnvelope`]. A failing stage short-circuits
//! the rest, so an unauthenticated call is never validated and an invalid
//! request never reaches the generator.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, error, info, warn};
use tripkit_lib::{
    build_generator, validate_request, ErrorKind, GenerateTripRequest, GeneratorConfig,
    ResponseEnvelope, TripAdapter, TripGenerator, UpstreamError, WidgetFormatter,
    DEFAULT_GENERATION_TIMEOUT, DEFAULT_SAVE_BASE_URL,
};

use crate::auth::{authenticator_from_env, AnonymousAuthenticator, Authenticator, Credentials};

/// Per-call context passed explicitly through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    /// Correlation id, also used in every log line for the call.
    pub request_id: String,
    pub client_ip: Option<String>,
    /// Bound on each generator attempt.
    pub timeout: Duration,
}

impl CallContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            client_ip: None,
            timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }

    pub fn with_client_ip(mut self, ip: impl Into<String>) -> Self {
        self.client_ip = Some(ip.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Retry policy for generator calls.
///
/// Only `UpstreamUnavailable` is retried; timeouts and invalid responses are
/// returned immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: Duration) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    /// Create a policy from `TRIPKIT_UPSTREAM_RETRIES` and
    /// `TRIPKIT_RETRY_BACKOFF_MS`.
    pub fn from_env() -> tripkit_lib::Result<Self> {
        let defaults = Self::default();
        let max_retries = parse_env("TRIPKIT_UPSTREAM_RETRIES")?.unwrap_or(defaults.max_retries);
        let backoff = parse_env::<u64>("TRIPKIT_RETRY_BACKOFF_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.backoff);
        Ok(Self {
            max_retries,
            backoff,
        })
    }

    fn should_retry(&self, err: &UpstreamError, attempt: u32) -> bool {
        matches!(err, UpstreamError::Unavailable(_)) && attempt < self.max_retries
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> tripkit_lib::Result<Option<T>> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| tripkit_lib::Error::InvalidConfig {
                key: key.to_string(),
                message: format!("expected a non-negative whole number, got '{}'", value),
            }),
        Err(_) => Ok(None),
    }
}

/// Lifecycle of a single call, logged at debug level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStage {
    Received,
    Authenticated,
    Validated,
    Generated,
    Formatted,
    Responded,
    Failed(ErrorKind),
}

impl fmt::Display for CallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallStage::Received => f.write_str("received"),
            CallStage::Authenticated => f.write_str("authenticated"),
            CallStage::Validated => f.write_str("validated"),
            CallStage::Generated => f.write_str("generated"),
            CallStage::Formatted => f.write_str("formatted"),
            CallStage::Responded => f.write_str("responded"),
            CallStage::Failed(kind) => write!(f, "failed({})", kind),
        }
    }
}

fn transition(ctx: &CallContext, stage: CallStage) {
    debug!(request_id = %ctx.request_id, stage = %stage, "call stage");
}

/// Runs the `generate_trip` pipeline.
#[derive(Clone)]
pub struct EndpointHandler {
    authenticator: Arc<dyn Authenticator>,
    adapter: TripAdapter,
    formatter: WidgetFormatter,
    retry: RetryPolicy,
    call_timeout: Duration,
}

impl fmt::Debug for EndpointHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointHandler")
            .field("generator", &self.adapter.generator_name())
            .field("formatter", &self.formatter)
            .field("retry", &self.retry)
            .field("call_timeout", &self.call_timeout)
            .finish()
    }
}

impl EndpointHandler {
    pub fn new(authenticator: Arc<dyn Authenticator>, generator: Arc<dyn TripGenerator>) -> Self {
        Self {
            authenticator,
            adapter: TripAdapter::new(generator),
            formatter: WidgetFormatter::default(),
            retry: RetryPolicy::default(),
            call_timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }

    /// Public handler over `generator`.
    pub fn anonymous(generator: Arc<dyn TripGenerator>) -> Self {
        Self::new(Arc::new(AnonymousAuthenticator), generator)
    }

    pub fn with_formatter(mut self, formatter: WidgetFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Timeout given to contexts created by [`EndpointHandler::context`].
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Wire a handler from environment configuration.
    ///
    /// Reads the generator settings (see [`GeneratorConfig::from_env`]),
    /// `TRIPKIT_API_KEYS`, `TRIPKIT_UPSTREAM_RETRIES`,
    /// `TRIPKIT_RETRY_BACKOFF_MS` and `TRIPKIT_SAVE_BASE_URL`.
    pub fn from_env() -> tripkit_lib::Result<Self> {
        let generator_config = GeneratorConfig::from_env()?;
        info!(config = ?generator_config, "configuring trip generator");

        let generator = build_generator(&generator_config)?;
        let save_base = std::env::var("TRIPKIT_SAVE_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_SAVE_BASE_URL.to_string());

        Ok(Self::new(authenticator_from_env()?, generator)
            .with_formatter(WidgetFormatter::new(&save_base)?)
            .with_retry(RetryPolicy::from_env()?)
            .with_call_timeout(generator_config.timeout))
    }

    pub fn generator_name(&self) -> &'static str {
        self.adapter.generator_name()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// New call context carrying this handler's configured timeout.
    pub fn context(&self, request_id: impl Into<String>) -> CallContext {
        CallContext::new(request_id).with_timeout(self.call_timeout)
    }

    /// Handle one `generate_trip` call.
    ///
    /// Never fails: every outcome, including a panic inside the pipeline, is
    /// expressed as an envelope.
    pub async fn handle(
        &self,
        ctx: &CallContext,
        credentials: &Credentials,
        arguments: &Value,
    ) -> ResponseEnvelope {
        let started = Instant::now();
        transition(ctx, CallStage::Received);

        let envelope = match AssertUnwindSafe(self.run(ctx, credentials, arguments))
            .catch_unwind()
            .await
        {
            Ok(envelope) => envelope,
            Err(panic) => {
                error!(
                    request_id = %ctx.request_id,
                    panic = %panic_message(panic.as_ref()),
                    "generate_trip pipeline panicked"
                );
                transition(ctx, CallStage::Failed(ErrorKind::InternalError));
                ResponseEnvelope::failure(ErrorKind::InternalError)
            }
        };

        transition(ctx, CallStage::Responded);
        info!(
            request_id = %ctx.request_id,
            ok = envelope.ok,
            error_kind = envelope.error_kind().map(|k| k.as_str()).unwrap_or("none"),
            duration_ms = started.elapsed().as_millis() as u64,
            "generate_trip completed"
        );
        envelope
    }

    async fn run(
        &self,
        ctx: &CallContext,
        credentials: &Credentials,
        arguments: &Value,
    ) -> ResponseEnvelope {
        let Some(caller) = self.authenticator.authenticate(credentials).await else {
            warn!(request_id = %ctx.request_id, "caller failed authentication");
            transition(ctx, CallStage::Failed(ErrorKind::AuthenticationFailed));
            return ResponseEnvelope::failure(ErrorKind::AuthenticationFailed);
        };
        transition(ctx, CallStage::Authenticated);

        let request = match validate_request(arguments) {
            Ok(request) => request,
            Err(failure) => {
                info!(
                    request_id = %ctx.request_id,
                    violations = failure.violations.len(),
                    fields = ?failure.fields(),
                    "request failed validation"
                );
                transition(ctx, CallStage::Failed(ErrorKind::ValidationFailed));
                return ResponseEnvelope::validation(failure);
            }
        };
        transition(ctx, CallStage::Validated);

        let trip = match self.generate_with_retry(ctx, &request, caller.as_str()).await {
            Ok(trip) => trip,
            Err(err) => {
                let kind = ErrorKind::from(&err);
                error!(
                    request_id = %ctx.request_id,
                    kind = %kind,
                    detail = %err,
                    "trip generation failed"
                );
                transition(ctx, CallStage::Failed(kind));
                return ResponseEnvelope::failure(kind);
            }
        };
        transition(ctx, CallStage::Generated);

        let payload = self.formatter.format(&trip);
        transition(ctx, CallStage::Formatted);

        ResponseEnvelope::success(payload)
    }

    async fn generate_with_retry(
        &self,
        ctx: &CallContext,
        request: &GenerateTripRequest,
        caller: &str,
    ) -> Result<tripkit_lib::CanonicalTrip, UpstreamError> {
        let mut attempt = 0;
        loop {
            match self.adapter.generate(request, caller, ctx.timeout).await {
                Ok(trip) => return Ok(trip),
                Err(err) if self.retry.should_retry(&err, attempt) => {
                    attempt += 1;
                    warn!(
                        request_id = %ctx.request_id,
                        attempt,
                        max_retries = self.retry.max_retries,
                        error = %err,
                        "generator unavailable, retrying"
                    );
                    tokio::time::sleep(self.retry.backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tripkit_lib::{StubBehavior, StubGenerator};

    fn args() -> Value {
        json!({
            "destination": "Paris",
            "start_date": "2025-06-01",
            "end_date": "2025-06-03",
            "travelers": 2
        })
    }

    #[tokio::test]
    async fn test_success_envelope() {
        let handler = EndpointHandler::anonymous(Arc::new(StubGenerator::new()));
        let envelope = handler
            .handle(&CallContext::new("req-1"), &Credentials::default(), &args())
            .await;
        assert!(envelope.ok);
        let data = envelope.data.unwrap();
        assert_eq!(data.day_count, 3);
        assert_eq!(data.title, "3 Days in Paris");
        assert!(envelope.error.is_none());
    }

    #[tokio::test]
    async fn test_retry_only_on_unavailable() {
        let stub = Arc::new(StubGenerator::with_behavior(StubBehavior::FailThen(vec![
            UpstreamError::Unavailable("blip".into()),
        ])));
        let handler = EndpointHandler::anonymous(stub.clone())
            .with_retry(RetryPolicy::new(2, Duration::from_millis(1)));
        let envelope = handler
            .handle(&CallContext::new("req-2"), &Credentials::default(), &args())
            .await;
        assert!(envelope.ok);
        assert_eq!(stub.calls(), 2);

        let stub = Arc::new(StubGenerator::with_behavior(StubBehavior::Raw("nope".into())));
        let handler = EndpointHandler::anonymous(stub.clone())
            .with_retry(RetryPolicy::new(2, Duration::from_millis(1)));
        let envelope = handler
            .handle(&CallContext::new("req-3"), &Credentials::default(), &args())
            .await;
        assert_eq!(envelope.error_kind(), Some(ErrorKind::UpstreamInvalidResponse));
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn test_no_retry_by_default() {
        let stub = Arc::new(StubGenerator::with_behavior(StubBehavior::Fail(
            UpstreamError::Unavailable("down".into()),
        )));
        let handler = EndpointHandler::anonymous(stub.clone());
        let envelope = handler
            .handle(&CallContext::new("req-4"), &Credentials::default(), &args())
            .await;
        assert_eq!(envelope.error_kind(), Some(ErrorKind::UpstreamUnavailable));
        assert_eq!(
            envelope.error.unwrap().message,
            ErrorKind::UpstreamUnavailable.default_message()
        );
        assert_eq!(stub.calls(), 1);
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(CallStage::Validated.to_string(), "validated");
        assert_eq!(
            CallStage::Failed(ErrorKind::UpstreamTimeout).to_string(),
            "failed(UpstreamTimeout)"
        );
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
    }
}

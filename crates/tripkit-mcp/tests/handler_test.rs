//! End-to-end scenarios for the `generate_trip` pipeline

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tripkit_lib::{
    ErrorKind, GenerationPrompt, StubBehavior, StubGenerator, TripGenerator, UpstreamError,
};
use tripkit_mcp::{ApiKeyAuthenticator, CallContext, Credentials, EndpointHandler};

struct PanickingGenerator;

#[async_trait]
impl TripGenerator for PanickingGenerator {
    fn name(&self) -> &'static str {
        "panicking"
    }

    async fn generate(&self, _prompt: &GenerationPrompt) -> Result<String, UpstreamError> {
        panic!("generator exploded");
    }
}

fn paris() -> Value {
    json!({
        "destination": "Paris",
        "start_date": "2025-06-01",
        "end_date": "2025-06-03",
        "travelers": 2
    })
}

fn keyed_handler(stub: Arc<StubGenerator>) -> EndpointHandler {
    EndpointHandler::new(
        Arc::new(ApiKeyAuthenticator::new([("alice", "secret-token")])),
        stub,
    )
}

#[tokio::test]
async fn unauthenticated_call_is_rejected_before_validation() {
    let stub = Arc::new(StubGenerator::new());
    let handler = keyed_handler(stub.clone());

    // Invalid on purpose: if validation ran, violations would be reported.
    let envelope = handler
        .handle(
            &CallContext::new("unauth"),
            &Credentials::default(),
            &json!({ "bogus": true }),
        )
        .await;

    assert!(!envelope.ok);
    assert!(envelope.data.is_none());
    let error = envelope.error.expect("error body");
    assert_eq!(error.kind, ErrorKind::AuthenticationFailed);
    assert!(error.violations.is_none());
    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn wrong_token_is_rejected() {
    let stub = Arc::new(StubGenerator::new());
    let envelope = keyed_handler(stub.clone())
        .handle(
            &CallContext::new("bad-token"),
            &Credentials::bearer("guess"),
            &paris(),
        )
        .await;
    assert_eq!(envelope.error_kind(), Some(ErrorKind::AuthenticationFailed));
    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn authenticated_paris_trip_succeeds() {
    let stub = Arc::new(StubGenerator::new());
    let envelope = keyed_handler(stub.clone())
        .handle(
            &CallContext::new("paris"),
            &Credentials::bearer("secret-token"),
            &paris(),
        )
        .await;

    assert!(envelope.ok);
    let data = envelope.data.expect("payload");
    assert_eq!(data.destination, "Paris");
    assert_eq!(data.day_count, 3);
    assert_eq!(data.travelers, Some(2));
    assert_eq!(
        data.days.iter().map(|d| d.date.as_str()).collect::<Vec<_>>(),
        vec!["2025-06-01", "2025-06-02", "2025-06-03"]
    );
    assert!(!serde_json::to_string(&data).unwrap().contains("alice"));
    assert_eq!(stub.calls(), 1);
}

#[tokio::test]
async fn invalid_request_never_reaches_generator() {
    let stub = Arc::new(StubGenerator::new());
    let handler = EndpointHandler::anonymous(stub.clone());
    let envelope = handler
        .handle(
            &CallContext::new("invalid"),
            &Credentials::default(),
            &json!({ "destination": "Paris", "start_date": "2025-06-05", "end_date": "2025-06-01" }),
        )
        .await;

    let error = envelope.error.expect("error body");
    assert_eq!(error.kind, ErrorKind::ValidationFailed);
    let violations = error.violations.expect("violations");
    assert!(violations.iter().any(|v| v.field == "end_date"));
    assert!(error.message.contains("end before start"));
    assert_eq!(stub.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn slow_generator_yields_timeout_without_data() {
    let stub = Arc::new(StubGenerator::with_behavior(StubBehavior::Delay(
        Duration::from_secs(90),
    )));
    let handler = EndpointHandler::anonymous(stub.clone()).with_call_timeout(Duration::from_secs(30));
    let ctx = handler.context("slow");
    assert_eq!(ctx.timeout, Duration::from_secs(30));

    let envelope = handler.handle(&ctx, &Credentials::default(), &paris()).await;

    assert!(!envelope.ok);
    assert!(envelope.data.is_none());
    assert_eq!(envelope.error_kind(), Some(ErrorKind::UpstreamTimeout));
    assert_eq!(stub.calls(), 1);
}

#[tokio::test]
async fn panic_in_pipeline_becomes_internal_error() {
    let handler = EndpointHandler::anonymous(Arc::new(PanickingGenerator));
    let envelope = handler
        .handle(&CallContext::new("panic"), &Credentials::default(), &paris())
        .await;

    let error = envelope.error.expect("error body");
    assert_eq!(error.kind, ErrorKind::InternalError);
    assert!(!error.message.contains("exploded"));
}

#[tokio::test]
async fn concurrent_calls_are_independent() {
    let stub = Arc::new(StubGenerator::new());
    let handler = Arc::new(EndpointHandler::anonymous(stub.clone()));

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let handler = handler.clone();
            tokio::spawn(async move {
                let args = if i % 2 == 0 { paris() } else { json!({}) };
                handler
                    .handle(&CallContext::new(format!("c{}", i)), &Credentials::default(), &args)
                    .await
            })
        })
        .collect();

    let mut ok = 0;
    for task in tasks {
        if task.await.unwrap().ok {
            ok += 1;
        }
    }
    assert_eq!(ok, 4);
    assert_eq!(stub.calls(), 4);
}

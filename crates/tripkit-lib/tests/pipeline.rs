use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tripkit_lib::{
    format_widget, render_html, tool_definition, validate_request, ResponseEnvelope, StubBehavior,
    StubGenerator, TripAdapter, UpstreamError, ViolationCode, WidgetFormatter,
};

#[tokio::test]
async fn paris_three_day_trip_end_to_end() {
    let request = validate_request(&json!({
        "destination": "  Paris ",
        "start_date": "2025-06-01",
        "end_date": "2025-06-03",
        "travelers": 2,
        "travel_style": "cultural",
        "interests": ["museums", "food"]
    }))
    .expect("request is valid");
    assert_eq!(request.destination, "Paris");

    let adapter = TripAdapter::new(Arc::new(StubGenerator::new()));
    let trip = adapter
        .generate(&request, "client-1", Duration::from_secs(5))
        .await
        .expect("stub generates");

    assert_eq!(trip.day_count(), 3);
    assert!(trip.is_ordered());
    assert!(trip.days.iter().all(|d| !d.activities.is_empty()));

    let formatter = WidgetFormatter::new("https://trips.example.test").unwrap();
    let payload = formatter.format(&trip);
    assert_eq!(payload.title, "3 Days in Paris");
    assert_eq!(payload.day_count, 3);
    assert_eq!(payload.activity_count, 12);
    assert_eq!(payload.days[0].label, "Day 1: Sunday, June 1");
    assert_eq!(payload.days[2].label, "Day 3: Tuesday, June 3");
    assert!(payload
        .save_url
        .starts_with("https://trips.example.test/trip/new?destination=Paris&start=2025-06-01"));
    assert!(payload.save_url.ends_with("&style=cultural"));

    let html = render_html(&payload);
    assert!(html.contains("Day 2: Monday, June 2"));

    let envelope = serde_json::to_value(ResponseEnvelope::success(payload)).unwrap();
    assert_eq!(envelope["ok"], true);
    assert!(envelope.get("error").is_none());
}

#[test]
fn every_missing_required_field_is_named() {
    let failure = validate_request(&json!({ "travelers": 2 })).unwrap_err();
    for field in ["destination", "start_date", "end_date"] {
        assert!(failure.has(field, ViolationCode::Required), "missing {}", field);
    }
}

#[test]
fn end_before_start_is_rejected() {
    let failure = validate_request(&json!({
        "destination": "Paris",
        "start_date": "2025-06-05",
        "end_date": "2025-06-01"
    }))
    .unwrap_err();
    assert!(failure.has("end_date", ViolationCode::EndBeforeStart));
}

#[tokio::test]
async fn formatting_the_same_trip_twice_is_byte_identical() {
    let request = validate_request(&json!({
        "destination": "Lisbon",
        "start_date": "2025-09-10",
        "end_date": "2025-09-11"
    }))
    .unwrap();
    let trip = TripAdapter::new(Arc::new(StubGenerator::new()))
        .generate(&request, "c", Duration::from_secs(5))
        .await
        .unwrap();

    let first = serde_json::to_vec(&format_widget(&trip)).unwrap();
    let second = serde_json::to_vec(&format_widget(&trip)).unwrap();
    assert_eq!(first, second);
}

#[tokio::test(start_paused = true)]
async fn slow_generator_times_out() {
    let request = validate_request(&json!({
        "destination": "Paris",
        "start_date": "2025-06-01",
        "end_date": "2025-06-01"
    }))
    .unwrap();
    let adapter = TripAdapter::new(Arc::new(StubGenerator::with_behavior(StubBehavior::Delay(
        Duration::from_secs(120),
    ))));

    let err = adapter
        .generate(&request, "c", Duration::from_secs(30))
        .await
        .unwrap_err();
    assert_eq!(err, UpstreamError::Timeout(Duration::from_secs(30)));
}

#[test]
fn tool_definition_names_generate_trip() {
    let definition = tool_definition();
    assert_eq!(definition.name, "generate_trip");
    assert!(definition.input_schema["properties"]["destination"].is_object());
}

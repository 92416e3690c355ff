//! Tripkit library entry points.
//!
//! This crate validates `generate_trip` requests, drives the external
//! itinerary generator, normalizes its output into a [`CanonicalTrip`], and
//! projects trips into widget payloads. Transports (the stdio MCP binary and
//! the HTTP service) depend only on what is exported here.

pub mod adapter;
pub mod envelope;
pub mod error;
pub mod generator;
pub mod prompt;
pub mod request;
pub mod tool;
pub mod trip;
pub mod widget;

pub use adapter::{normalize_itinerary, TripAdapter};
pub use envelope::{ErrorBody, ErrorKind, ResponseEnvelope};
pub use error::{Error, Result};
pub use generator::{
    build_generator, GeneratorConfig, GeneratorKind, StubBehavior, StubGenerator, TripGenerator,
    UpstreamError, DEFAULT_GENERATION_TIMEOUT,
};
pub use prompt::GenerationPrompt;
pub use request::{
    validate_request, BudgetLevel, GenerateTripArgs, GenerateTripRequest, TravelStyle,
    ValidationFailure, Violation, ViolationCode,
};
pub use tool::{tool_definition, ToolDefinition, TOOL_NAME};
pub use trip::{Activity, ActivityCategory, CanonicalTrip, TimeWindow, TripDay};
pub use widget::{
    format_widget, render_html, WidgetActivity, WidgetDay, WidgetFormatter, WidgetHtml,
    WidgetPayload, DEFAULT_SAVE_BASE_URL,
};

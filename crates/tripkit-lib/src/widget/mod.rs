//! Widget projection of a [`CanonicalTrip`].
//!
//! Formatting is pure: the payload depends only on the trip and the
//! formatter's save link base, so formatting the same trip twice yields
//! byte-identical JSON.

use once_cell::sync::Lazy;
use reqwest::Url;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::trip::{Activity, CanonicalTrip, TripDay};

mod html;

pub use html::{render_html, WidgetHtml};

/// Where the "save" call to action points when nothing else is configured.
pub const DEFAULT_SAVE_BASE_URL: &str = "https://monkeytravel.app";

/// Save endpoint under [`DEFAULT_SAVE_BASE_URL`], parsed once.
static DEFAULT_SAVE_ENDPOINT: Lazy<Url> = Lazy::new(|| {
    Url::parse("https://monkeytravel.app/trip/new").expect("literal save endpoint parses")
});

/// Value of the `source` query parameter on save links.
pub const SAVE_SOURCE: &str = "mcp";

/// Display-ready itinerary for inline rendering in the assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WidgetPayload {
    pub trip_id: String,
    /// e.g. "3 Days in Paris".
    pub title: String,
    pub summary: String,
    /// RFC 3339, second precision, UTC.
    pub generated_at: String,
    pub destination: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travelers: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_style: Option<String>,
    pub day_count: usize,
    pub activity_count: usize,
    /// Link that opens the trip in the full app for saving and editing.
    pub save_url: String,
    pub days: Vec<WidgetDay>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WidgetDay {
    pub day_number: u32,
    /// e.g. "Day 1: Sunday, June 1".
    pub label: String,
    pub date: String,
    pub theme: String,
    pub activities: Vec<WidgetActivity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WidgetActivity {
    /// Display string, `HH:MM-HH:MM` or `HH:MM`.
    pub time: String,
    pub start: String,
    pub end: String,
    pub name: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tip: Option<String>,
}

/// Formats trips into widget payloads with save links under a fixed base.
#[derive(Debug, Clone)]
pub struct WidgetFormatter {
    save_endpoint: Url,
}

impl WidgetFormatter {
    /// Create a formatter whose save links point at `{base}/trip/new`.
    pub fn new(save_base: &str) -> Result<Self> {
        let raw = format!("{}/trip/new", save_base.trim().trim_end_matches('/'));
        let save_endpoint = Url::parse(&raw).map_err(|e| Error::InvalidSaveUrl {
            base: save_base.to_string(),
            message: e.to_string(),
        })?;
        if !matches!(save_endpoint.scheme(), "http" | "https") {
            return Err(Error::InvalidSaveUrl {
                base: save_base.to_string(),
                message: "scheme must be http or https".to_string(),
            });
        }
        Ok(Self::from_endpoint(save_endpoint))
    }

    /// Create a formatter from an already parsed save endpoint.
    pub fn from_endpoint(save_endpoint: Url) -> Self {
        Self { save_endpoint }
    }

    pub fn save_endpoint(&self) -> &Url {
        &self.save_endpoint
    }

    pub fn format(&self, trip: &CanonicalTrip) -> WidgetPayload {
        let day_count = trip.day_count();
        let activity_count = trip.activity_count();

        WidgetPayload {
            trip_id: trip.id.to_string(),
            title: format!(
                "{} {} in {}",
                day_count,
                if day_count == 1 { "Day" } else { "Days" },
                trip.destination
            ),
            summary: format!(
                "Your {}-day {} itinerary is ready! Includes {} activities across {} {}.",
                day_count,
                trip.destination,
                activity_count,
                day_count,
                if day_count == 1 { "day" } else { "days" }
            ),
            generated_at: trip
                .generated_at
                .to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            destination: trip.destination.clone(),
            start_date: trip.start_date.to_string(),
            end_date: trip.end_date.to_string(),
            travelers: trip.travelers,
            travel_style: trip.travel_style.map(|s| s.as_str().to_string()),
            day_count,
            activity_count,
            save_url: self.save_url(trip),
            days: trip.days.iter().map(format_day).collect(),
        }
    }

    fn save_url(&self, trip: &CanonicalTrip) -> String {
        let mut url = self.save_endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("destination", &trip.destination)
                .append_pair("start", &trip.start_date.to_string())
                .append_pair("end", &trip.end_date.to_string())
                .append_pair("source", SAVE_SOURCE)
                .append_pair("ref", &trip.id.to_string());
            if let Some(style) = trip.travel_style {
                query.append_pair("style", style.as_str());
            }
        }
        url.to_string()
    }
}

impl Default for WidgetFormatter {
    fn default() -> Self {
        Self::from_endpoint(DEFAULT_SAVE_ENDPOINT.clone())
    }
}

/// Format `trip` with save links under [`DEFAULT_SAVE_BASE_URL`].
pub fn format_widget(trip: &CanonicalTrip) -> WidgetPayload {
    WidgetFormatter::default().format(trip)
}

fn format_day(day: &TripDay) -> WidgetDay {
    WidgetDay {
        day_number: day.day_number,
        label: format!("Day {}: {}", day.day_number, day.date.format("%A, %B %-d")),
        date: day.date.to_string(),
        theme: day.theme.clone(),
        activities: day.activities.iter().map(format_activity).collect(),
    }
}

fn format_activity(activity: &Activity) -> WidgetActivity {
    WidgetActivity {
        time: activity.time.to_string(),
        start: activity.time.start.format("%H:%M").to_string(),
        end: activity.time.end.format("%H:%M").to_string(),
        name: activity.name.clone(),
        category: activity.category.as_str().to_string(),
        location: activity.location.clone(),
        description: activity.description.clone(),
        tip: activity.tip.clone(),
    }
}

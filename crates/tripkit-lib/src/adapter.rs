//! Trip generator adapter.
//!
//! Owns the boundary with the external generation capability: prompt
//! construction, the single timed call, and normalization of whatever comes
//! back into a [`CanonicalTrip`]. A response that cannot be normalized in full
//! is rejected as [`UpstreamError::InvalidResponse`]; partial trips never leave
//! this module.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::generator::{TripGenerator, UpstreamError};
use crate::prompt::GenerationPrompt;
use crate::request::{parse_iso_date, GenerateTripRequest};
use crate::trip::{Activity, ActivityCategory, CanonicalTrip, TimeWindow, TripDay};

#[derive(Debug, Deserialize)]
struct RawItinerary {
    days: Vec<RawDay>,
}

#[derive(Debug, Deserialize)]
struct RawDay {
    day: Option<u32>,
    date: Option<String>,
    theme: Option<String>,
    #[serde(default)]
    activities: Vec<RawActivity>,
}

#[derive(Debug, Deserialize)]
struct RawActivity {
    name: Option<String>,
    time: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    description: Option<String>,
    location: Option<String>,
    tip: Option<String>,
}

/// Adapter between validated requests and the generation capability.
#[derive(Clone)]
pub struct TripAdapter {
    generator: Arc<dyn TripGenerator>,
}

impl TripAdapter {
    pub fn new(generator: Arc<dyn TripGenerator>) -> Self {
        Self { generator }
    }

    pub fn generator_name(&self) -> &'static str {
        self.generator.name()
    }

    /// Generate a trip for `request` on behalf of `caller`.
    ///
    /// Calls the generator exactly once. If it has not answered within
    /// `timeout` the wait is abandoned and [`UpstreamError::Timeout`] is
    /// returned.
    pub async fn generate(
        &self,
        request: &GenerateTripRequest,
        caller: &str,
        timeout: Duration,
    ) -> Result<CanonicalTrip, UpstreamError> {
        let prompt = GenerationPrompt::from_request(request);
        let started = Instant::now();

        debug!(
            generator = self.generator.name(),
            destination = %request.destination,
            days = prompt.day_count,
            "invoking generator"
        );

        let raw = match tokio::time::timeout(timeout, self.generator.generate(&prompt)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(err)) => {
                warn!(
                    generator = self.generator.name(),
                    error = %err,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "generator call failed"
                );
                return Err(err);
            }
            Err(_) => {
                warn!(
                    generator = self.generator.name(),
                    timeout_ms = timeout.as_millis() as u64,
                    "generator call timed out"
                );
                return Err(UpstreamError::Timeout(timeout));
            }
        };

        let trip = normalize_itinerary(request, &raw, caller, Uuid::new_v4(), Utc::now())
            .inspect_err(|err| {
                warn!(
                    generator = self.generator.name(),
                    error = %err,
                    response_len = raw.len(),
                    "generator response rejected"
                )
            })?;

        info!(
            trip_id = %trip.id,
            destination = %trip.destination,
            days = trip.day_count(),
            activities = trip.activity_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "trip generated"
        );

        Ok(trip)
    }
}

/// Normalize raw generator text into a [`CanonicalTrip`].
///
/// Requirements on the raw itinerary:
/// - every day `1..=N` of the requested span appears exactly once
///   (day numbers may be implied by `date` or by position);
/// - an explicit `date` must match the requested calendar;
/// - each day has at least one activity, each with a name and a parsable time.
///
/// Days come out in calendar order and activities in start-time order.
pub fn normalize_itinerary(
    request: &GenerateTripRequest,
    raw: &str,
    caller: &str,
    id: Uuid,
    generated_at: DateTime<Utc>,
) -> Result<CanonicalTrip, UpstreamError> {
    let body = strip_code_fence(raw);
    let itinerary: RawItinerary = serde_json::from_str(body)
        .map_err(|e| invalid(format!("itinerary is not valid JSON of the expected shape: {}", e)))?;

    let expected = request.day_count();
    if itinerary.days.len() != expected {
        return Err(invalid(format!(
            "expected {} days, got {}",
            expected,
            itinerary.days.len()
        )));
    }

    let mut days = BTreeMap::new();
    for (index, raw_day) in itinerary.days.into_iter().enumerate() {
        let day = normalize_day(request, index, raw_day)?;
        let number = day.day_number;
        if days.insert(number, day).is_some() {
            return Err(invalid(format!("day {} appears more than once", number)));
        }
    }

    Ok(CanonicalTrip {
        id,
        destination: request.destination.clone(),
        start_date: request.start_date,
        end_date: request.end_date,
        travelers: request.travelers,
        travel_style: request.travel_style,
        requested_by: caller.to_string(),
        generated_at,
        days: days.into_values().collect(),
    })
}

fn normalize_day(
    request: &GenerateTripRequest,
    index: usize,
    raw: RawDay,
) -> Result<TripDay, UpstreamError> {
    let explicit_date = match raw.date.as_deref() {
        Some(s) => Some(
            parse_iso_date(s).ok_or_else(|| invalid(format!("day has malformed date '{}'", s)))?,
        ),
        None => None,
    };

    let day_number = match (raw.day, explicit_date) {
        (Some(n), _) => n,
        (None, Some(date)) => u32::try_from((date - request.start_date).num_days() + 1)
            .map_err(|_| invalid(format!("date {} is before the trip starts", date)))?,
        (None, None) => index as u32 + 1,
    };

    let date = request.date_of_day(day_number).ok_or_else(|| {
        invalid(format!(
            "day {} is outside the requested {} day trip",
            day_number,
            request.day_count()
        ))
    })?;

    if let Some(explicit) = explicit_date {
        if explicit != date {
            return Err(invalid(format!(
                "day {} is dated {} but the trip calendar puts it on {}",
                day_number, explicit, date
            )));
        }
    }

    if raw.activities.is_empty() {
        return Err(invalid(format!("day {} has no activities", day_number)));
    }

    let mut activities = raw
        .activities
        .into_iter()
        .map(|a| normalize_activity(day_number, a))
        .collect::<Result<Vec<_>, _>>()?;
    // Stable: activities sharing a start time keep their generated order.
    activities.sort_by_key(|a| a.time.start);

    let theme = raw
        .theme
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| format!("Day {}", day_number));

    Ok(TripDay {
        day_number,
        date,
        theme,
        activities,
    })
}

fn normalize_activity(day_number: u32, raw: RawActivity) -> Result<Activity, UpstreamError> {
    let name = non_empty(raw.name)
        .ok_or_else(|| invalid(format!("an activity on day {} has no name", day_number)))?;

    let time_text = non_empty(raw.time)
        .ok_or_else(|| invalid(format!("activity '{}' on day {} has no time", name, day_number)))?;
    let time = TimeWindow::parse(&time_text).ok_or_else(|| {
        invalid(format!(
            "activity '{}' on day {} has malformed time '{}'",
            name, day_number, time_text
        ))
    })?;

    Ok(Activity {
        category: raw
            .kind
            .as_deref()
            .map(ActivityCategory::from_label)
            .unwrap_or(ActivityCategory::Other),
        name,
        time,
        location: non_empty(raw.location),
        description: non_empty(raw.description).unwrap_or_default(),
        tip: non_empty(raw.tip),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Remove a surrounding Markdown code fence such as ```` ```json ... ``` ````.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    match rest.trim_end().strip_suffix("```") {
        Some(body) => body.trim(),
        None => trimmed,
    }
}

fn invalid(message: String) -> UpstreamError {
    UpstreamError::InvalidResponse(message)
}

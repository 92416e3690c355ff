//! Canonical trip model produced by the adapter.
//!
//! A [`CanonicalTrip`] is always ordered: days ascending by calendar date and
//! activities ascending by start time. Nothing downstream of the adapter ever
//! sees the generator's raw output shape.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::request::TravelStyle;

/// Start/end time of an activity, in local time at the destination.
///
/// `end` earlier than `start` means the activity runs past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Parse `HH:MM-HH:MM` (hyphen or en dash, optional spaces) or a single
    /// `HH:MM`, which yields a zero-length window.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let mut parts = raw.splitn(2, ['-', '\u{2013}']);
        let start = parse_hhmm(parts.next()?)?;
        let end = match parts.next() {
            Some(end) => parse_hhmm(end)?,
            None => start,
        };
        Some(Self { start, end })
    }

    pub fn crosses_midnight(&self) -> bool {
        self.end < self.start
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start.format("%H:%M"))
        } else {
            write!(f, "{}-{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
        }
    }
}

impl Serialize for TimeWindow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn parse_hhmm(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M").ok()
}

/// Broad activity category used for icons and grouping in the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityCategory {
    Attraction,
    Food,
    Experience,
    Nature,
    Shopping,
    Nightlife,
    Transport,
    Accommodation,
    Other,
}

impl ActivityCategory {
    /// Map a free-form generator label onto a category. Unknown labels map to
    /// [`ActivityCategory::Other`].
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "attraction" | "sightseeing" | "landmark" | "museum" | "monument" | "sight" => {
                ActivityCategory::Attraction
            }
            "food" | "restaurant" | "dining" | "meal" | "cafe" | "café" | "breakfast" | "lunch"
            | "dinner" | "market" => ActivityCategory::Food,
            "experience" | "activity" | "tour" | "cultural" | "culture" | "entertainment"
            | "workshop" | "class" => ActivityCategory::Experience,
            "nature" | "park" | "outdoor" | "outdoors" | "hike" | "beach" => ActivityCategory::Nature,
            "shopping" | "shop" => ActivityCategory::Shopping,
            "nightlife" | "bar" | "club" => ActivityCategory::Nightlife,
            "transport" | "transportation" | "transfer" | "travel" => ActivityCategory::Transport,
            "accommodation" | "hotel" | "check-in" | "lodging" => ActivityCategory::Accommodation,
            _ => ActivityCategory::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityCategory::Attraction => "attraction",
            ActivityCategory::Food => "food",
            ActivityCategory::Experience => "experience",
            ActivityCategory::Nature => "nature",
            ActivityCategory::Shopping => "shopping",
            ActivityCategory::Nightlife => "nightlife",
            ActivityCategory::Transport => "transport",
            ActivityCategory::Accommodation => "accommodation",
            ActivityCategory::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Activity {
    pub name: String,
    pub time: TimeWindow,
    pub location: Option<String>,
    pub category: ActivityCategory,
    pub description: String,
    pub tip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TripDay {
    /// 1-based position within the trip.
    pub day_number: u32,
    pub date: NaiveDate,
    pub theme: String,
    pub activities: Vec<Activity>,
}

/// Normalized itinerary with ordering guarantees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalTrip {
    pub id: Uuid,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub travelers: Option<u32>,
    pub travel_style: Option<TravelStyle>,
    /// Caller identity the trip was generated for.
    pub requested_by: String,
    pub generated_at: DateTime<Utc>,
    pub days: Vec<TripDay>,
}

impl CanonicalTrip {
    pub fn day_count(&self) -> usize {
        self.days.len()
    }

    pub fn activity_count(&self) -> usize {
        self.days.iter().map(|d| d.activities.len()).sum()
    }

    /// Check the ordering invariant: days strictly ascending by date and
    /// activities non-decreasing by start time within each day.
    pub fn is_ordered(&self) -> bool {
        let days_ordered = self.days.windows(2).all(|w| w[0].date < w[1].date);
        let activities_ordered = self.days.iter().all(|day| {
            day.activities
                .windows(2)
                .all(|w| w[0].time.start <= w[1].time.start)
        });
        days_ordered && activities_ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    #[test]
    fn test_time_window_parse_variants() {
        let expected = TimeWindow::new(t("09:00"), t("11:30"));
        assert_eq!(TimeWindow::parse("09:00-11:30"), Some(expected));
        assert_eq!(TimeWindow::parse(" 09:00 - 11:30 "), Some(expected));
        assert_eq!(TimeWindow::parse("09:00\u{2013}11:30"), Some(expected));
    }

    #[test]
    fn test_time_window_single_time() {
        let window = TimeWindow::parse("19:30").unwrap();
        assert_eq!(window.start, window.end);
        assert_eq!(window.to_string(), "19:30");
    }

    #[test]
    fn test_time_window_rejects_garbage() {
        assert_eq!(TimeWindow::parse("morning"), None);
        assert_eq!(TimeWindow::parse("25:00-26:00"), None);
        assert_eq!(TimeWindow::parse("09:00-"), None);
        assert_eq!(TimeWindow::parse(""), None);
    }

    #[test]
    fn test_time_window_display_and_midnight() {
        let window = TimeWindow::parse("22:00-01:30").unwrap();
        assert!(window.crosses_midnight());
        assert_eq!(window.to_string(), "22:00-01:30");
        assert_eq!(serde_json::to_string(&window).unwrap(), "\"22:00-01:30\"");
    }

    #[test]
    fn test_category_from_label() {
        assert_eq!(ActivityCategory::from_label("Restaurant"), ActivityCategory::Food);
        assert_eq!(ActivityCategory::from_label("attraction"), ActivityCategory::Attraction);
        assert_eq!(ActivityCategory::from_label(" tour "), ActivityCategory::Experience);
        assert_eq!(ActivityCategory::from_label("spaceflight"), ActivityCategory::Other);
    }
}

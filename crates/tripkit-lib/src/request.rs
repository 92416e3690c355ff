//! Strict validation of inbound `generate_trip` arguments.
//!
//! The validator works on the untyped JSON value received from the caller
//! rather than on a deserialized struct so that every violated constraint can
//! be reported at once: a missing destination, a malformed date, and an
//! unknown field all show up in the same [`ValidationFailure`].

use std::fmt;

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Minimum destination length in characters (after trimming).
pub const MIN_DESTINATION_LEN: usize = 2;

/// Maximum destination length in characters (after trimming).
pub const MAX_DESTINATION_LEN: usize = 100;

/// Maximum inclusive trip length in days.
pub const MAX_TRIP_DAYS: i64 = 14;

/// Maximum number of travelers accepted for a single trip.
pub const MAX_TRAVELERS: i64 = 50;

/// Maximum length of the free-text preferences field.
pub const MAX_PREFERENCES_LEN: usize = 500;

/// Maximum number of interests.
pub const MAX_INTERESTS: usize = 5;

/// Maximum length of a single interest.
pub const MAX_INTEREST_LEN: usize = 50;

const KNOWN_FIELDS: [&str; 8] = [
    "destination",
    "start_date",
    "end_date",
    "travelers",
    "preferences",
    "travel_style",
    "interests",
    "budget",
];

/// Preferred travel style for the generated itinerary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TravelStyle {
    Adventure,
    Relaxation,
    Cultural,
    Foodie,
    Budget,
    Luxury,
    Romantic,
    Family,
}

impl TravelStyle {
    pub const ALL: [TravelStyle; 8] = [
        TravelStyle::Adventure,
        TravelStyle::Relaxation,
        TravelStyle::Cultural,
        TravelStyle::Foodie,
        TravelStyle::Budget,
        TravelStyle::Luxury,
        TravelStyle::Romantic,
        TravelStyle::Family,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TravelStyle::Adventure => "adventure",
            TravelStyle::Relaxation => "relaxation",
            TravelStyle::Cultural => "cultural",
            TravelStyle::Foodie => "foodie",
            TravelStyle::Budget => "budget",
            TravelStyle::Luxury => "luxury",
            TravelStyle::Romantic => "romantic",
            TravelStyle::Family => "family",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }
}

impl fmt::Display for TravelStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Budget level for the generated itinerary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum BudgetLevel {
    Budget,
    Moderate,
    Luxury,
}

impl BudgetLevel {
    pub const ALL: [BudgetLevel; 3] = [BudgetLevel::Budget, BudgetLevel::Moderate, BudgetLevel::Luxury];

    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetLevel::Budget => "budget",
            BudgetLevel::Moderate => "moderate",
            BudgetLevel::Luxury => "luxury",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.as_str() == value)
    }
}

impl fmt::Display for BudgetLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire shape of the `generate_trip` arguments.
///
/// This type only exists to publish the input schema; validation goes through
/// [`validate_request`] so that all violations are collected.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GenerateTripArgs {
    /// City or region to visit (e.g. "Rome", "Tokyo", "Bali"), 2-100 characters.
    pub destination: String,

    /// First day of the trip as an ISO calendar date (YYYY-MM-DD).
    pub start_date: String,

    /// Last day of the trip, inclusive (YYYY-MM-DD). Must not be before
    /// start_date; trips are limited to 14 days.
    pub end_date: String,

    /// Number of travelers (1-50).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travelers: Option<u32>,

    /// Free-text preferences such as dietary needs or pace (max 500 characters).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences: Option<String>,

    /// Optional preferred travel style.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_style: Option<TravelStyle>,

    /// Optional list of interests (max 5, each max 50 characters).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interests: Option<Vec<String>>,

    /// Optional budget level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<BudgetLevel>,
}

/// A validated trip-generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateTripRequest {
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub travelers: Option<u32>,
    pub preferences: Option<String>,
    pub travel_style: Option<TravelStyle>,
    pub interests: Vec<String>,
    pub budget: Option<BudgetLevel>,
}

impl GenerateTripRequest {
    /// Number of calendar days covered, counting both ends.
    pub fn day_count(&self) -> usize {
        ((self.end_date - self.start_date).num_days() + 1) as usize
    }

    /// Calendar date of the 1-based day `day_number`.
    pub fn date_of_day(&self, day_number: u32) -> Option<NaiveDate> {
        if day_number == 0 || day_number as usize > self.day_count() {
            return None;
        }
        self.start_date
            .checked_add_days(chrono::Days::new(u64::from(day_number - 1)))
    }
}

/// Machine-readable reason for a [`Violation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ViolationCode {
    Required,
    InvalidType,
    InvalidFormat,
    TooShort,
    TooLong,
    TooMany,
    OutOfRange,
    EndBeforeStart,
    InvalidOption,
    UnknownField,
}

/// A single violated field constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Violation {
    /// Field path, e.g. `destination` or `interests[2]`. `$` is the whole input.
    pub field: String,
    pub code: ViolationCode,
    pub message: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, code: ViolationCode, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code,
            message: message.into(),
        }
    }
}

/// Every constraint the input violated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("request failed validation with {} violation(s)", .violations.len())]
pub struct ValidationFailure {
    pub violations: Vec<Violation>,
}

impl ValidationFailure {
    /// Names of the fields that were reported, in report order.
    pub fn fields(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.field.as_str()).collect()
    }

    /// True if any violation was reported for `field` with `code`.
    pub fn has(&self, field: &str, code: ViolationCode) -> bool {
        self.violations
            .iter()
            .any(|v| v.field == field && v.code == code)
    }

    /// Human-readable summary joining every violation message.
    pub fn summary(&self) -> String {
        self.violations
            .iter()
            .map(|v| v.message.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Validate raw tool arguments into a [`GenerateTripRequest`].
///
/// Never stops at the first problem: the returned failure lists every
/// violated constraint in field order, followed by unknown fields.
pub fn validate_request(input: &Value) -> Result<GenerateTripRequest, ValidationFailure> {
    let Some(object) = input.as_object() else {
        return Err(ValidationFailure {
            violations: vec![Violation::new(
                "$",
                ViolationCode::InvalidType,
                "arguments must be a JSON object",
            )],
        });
    };

    let mut v = Collector::default();

    let destination = v.destination(object);
    let start_date = v.date(object, "start_date");
    let end_date = v.date(object, "end_date");
    if let (Some(start), Some(end)) = (start_date, end_date) {
        v.date_range(start, end);
    }
    let travelers = v.travelers(object);
    let preferences = v.preferences(object);
    let travel_style = v.option(object, "travel_style", TravelStyle::parse, TravelStyle::ALL.map(|s| s.as_str()));
    let interests = v.interests(object);
    let budget = v.option(object, "budget", BudgetLevel::parse, BudgetLevel::ALL.map(|b| b.as_str()));

    for key in object.keys() {
        if !KNOWN_FIELDS.contains(&key.as_str()) {
            v.push(key, ViolationCode::UnknownField, format!("unknown field '{}'", key));
        }
    }

    if !v.violations.is_empty() {
        return Err(ValidationFailure {
            violations: v.violations,
        });
    }

    match (destination, start_date, end_date) {
        (Some(destination), Some(start_date), Some(end_date)) => Ok(GenerateTripRequest {
            destination,
            start_date,
            end_date,
            travelers,
            preferences,
            travel_style,
            interests,
            budget,
        }),
        // Every None above records a violation, so this arm is unreachable
        // in practice; report it rather than panic.
        _ => Err(ValidationFailure {
            violations: vec![Violation::new(
                "$",
                ViolationCode::Required,
                "required fields are missing",
            )],
        }),
    }
}

#[derive(Default)]
struct Collector {
    violations: Vec<Violation>,
}

impl Collector {
    fn push(&mut self, field: impl Into<String>, code: ViolationCode, message: impl Into<String>) {
        self.violations.push(Violation::new(field, code, message));
    }

    /// Fetch an optional field, treating explicit `null` as absent.
    fn optional<'a>(object: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
        object.get(field).filter(|value| !value.is_null())
    }

    fn required_str<'a>(&mut self, object: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
        match Self::optional(object, field) {
            None => {
                self.push(field, ViolationCode::Required, format!("{} is required", field));
                None
            }
            Some(Value::String(s)) => Some(s.as_str()),
            Some(other) => {
                self.push(
                    field,
                    ViolationCode::InvalidType,
                    format!("{} must be a string, got {}", field, type_name(other)),
                );
                None
            }
        }
    }

    fn optional_str<'a>(&mut self, object: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
        match Self::optional(object, field)? {
            Value::String(s) => Some(s.as_str()),
            other => {
                self.push(
                    field,
                    ViolationCode::InvalidType,
                    format!("{} must be a string, got {}", field, type_name(other)),
                );
                None
            }
        }
    }

    fn destination(&mut self, object: &Map<String, Value>) -> Option<String> {
        let raw = self.required_str(object, "destination")?;
        let trimmed = raw.trim();
        let len = trimmed.chars().count();
        if len == 0 {
            self.push("destination", ViolationCode::TooShort, "destination must not be empty");
            return None;
        }
        if len < MIN_DESTINATION_LEN {
            self.push(
                "destination",
                ViolationCode::TooShort,
                format!("destination must be at least {} characters", MIN_DESTINATION_LEN),
            );
            return None;
        }
        if len > MAX_DESTINATION_LEN {
            self.push(
                "destination",
                ViolationCode::TooLong,
                format!("destination must be at most {} characters", MAX_DESTINATION_LEN),
            );
            return None;
        }
        Some(trimmed.to_string())
    }

    fn date(&mut self, object: &Map<String, Value>, field: &str) -> Option<NaiveDate> {
        let raw = self.required_str(object, field)?;
        match parse_iso_date(raw) {
            Some(date) => Some(date),
            None => {
                self.push(
                    field,
                    ViolationCode::InvalidFormat,
                    format!("{} must be an ISO calendar date (YYYY-MM-DD), got '{}'", field, raw),
                );
                None
            }
        }
    }

    fn date_range(&mut self, start: NaiveDate, end: NaiveDate) {
        if end < start {
            self.push(
                "end_date",
                ViolationCode::EndBeforeStart,
                format!("end before start: end_date {} is before start_date {}", end, start),
            );
            return;
        }
        let days = (end - start).num_days() + 1;
        if days > MAX_TRIP_DAYS {
            self.push(
                "end_date",
                ViolationCode::OutOfRange,
                format!("trip spans {} days; the maximum is {}", days, MAX_TRIP_DAYS),
            );
        }
    }

    fn travelers(&mut self, object: &Map<String, Value>) -> Option<u32> {
        let value = Self::optional(object, "travelers")?;
        let Some(count) = integer_value(value) else {
            let message = if value.is_number() {
                "travelers must be a whole number".to_string()
            } else {
                format!("travelers must be an integer, got {}", type_name(value))
            };
            self.push("travelers", ViolationCode::InvalidType, message);
            return None;
        };
        if count < 1 {
            self.push("travelers", ViolationCode::OutOfRange, "travelers must be a positive integer");
            return None;
        }
        if count > MAX_TRAVELERS {
            self.push(
                "travelers",
                ViolationCode::OutOfRange,
                format!("travelers cannot exceed {}", MAX_TRAVELERS),
            );
            return None;
        }
        u32::try_from(count).ok()
    }

    fn preferences(&mut self, object: &Map<String, Value>) -> Option<String> {
        let raw = self.optional_str(object, "preferences")?;
        let trimmed = raw.trim();
        if trimmed.chars().count() > MAX_PREFERENCES_LEN {
            self.push(
                "preferences",
                ViolationCode::TooLong,
                format!("preferences must be at most {} characters", MAX_PREFERENCES_LEN),
            );
            return None;
        }
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    fn option<T, const N: usize>(
        &mut self,
        object: &Map<String, Value>,
        field: &str,
        parse: fn(&str) -> Option<T>,
        allowed: [&str; N],
    ) -> Option<T> {
        let raw = self.optional_str(object, field)?;
        let parsed = parse(raw.trim());
        if parsed.is_none() {
            self.push(
                field,
                ViolationCode::InvalidOption,
                format!("{} must be one of: {}; got '{}'", field, allowed.join(", "), raw),
            );
        }
        parsed
    }

    fn interests(&mut self, object: &Map<String, Value>) -> Vec<String> {
        let Some(value) = Self::optional(object, "interests") else {
            return Vec::new();
        };
        let Some(items) = value.as_array() else {
            self.push(
                "interests",
                ViolationCode::InvalidType,
                format!("interests must be an array of strings, got {}", type_name(value)),
            );
            return Vec::new();
        };
        if items.len() > MAX_INTERESTS {
            self.push(
                "interests",
                ViolationCode::TooMany,
                format!("at most {} interests are allowed, got {}", MAX_INTERESTS, items.len()),
            );
        }

        let mut interests = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let field = format!("interests[{}]", index);
            match item {
                Value::String(s) if s.trim().chars().count() > MAX_INTEREST_LEN => self.push(
                    field,
                    ViolationCode::TooLong,
                    format!("each interest must be at most {} characters", MAX_INTEREST_LEN),
                ),
                Value::String(s) if !s.trim().is_empty() => interests.push(s.trim().to_string()),
                Value::String(_) => {}
                other => self.push(
                    field,
                    ViolationCode::InvalidType,
                    format!("interests must be strings, got {}", type_name(other)),
                ),
            }
        }
        interests
    }
}

/// Parse a strict `YYYY-MM-DD` calendar date.
pub fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// Integer view of a JSON number; integral floats such as `2.0` count.
fn integer_value(value: &Value) -> Option<i64> {
    if let Some(i) = value.as_i64() {
        return Some(i);
    }
    if value.as_u64().is_some() {
        // Larger than i64::MAX: integral, but certainly out of range.
        return Some(i64::MAX);
    }
    let f = value.as_f64()?;
    (f.fract() == 0.0 && f.abs() < 1e15).then_some(f as i64)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

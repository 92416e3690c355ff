use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{TripGenerator, UpstreamError};
use crate::prompt::GenerationPrompt;

const THEMES: [&str; 5] = [
    "Old Town Highlights",
    "Markets and Local Flavours",
    "Museums and Hidden Courtyards",
    "Parks, Views, and Neighbourhoods",
    "Day Trip and Slow Evening",
];

/// What the stub does when called.
#[derive(Debug, Clone)]
pub enum StubBehavior {
    /// Produce a deterministic, well-formed itinerary.
    Itinerary,
    /// Return this raw text verbatim.
    Raw(String),
    /// Fail with this error.
    Fail(UpstreamError),
    /// Sleep, then produce the deterministic itinerary.
    Delay(Duration),
    /// Fail with each error in turn, then fall back to the itinerary.
    FailThen(Vec<UpstreamError>),
}

/// Deterministic offline generator for tests and local runs.
pub struct StubGenerator {
    behavior: StubBehavior,
    calls: AtomicUsize,
    pending_failures: Mutex<Vec<UpstreamError>>,
}

impl StubGenerator {
    pub fn new() -> Self {
        Self::with_behavior(StubBehavior::Itinerary)
    }

    pub fn with_behavior(behavior: StubBehavior) -> Self {
        let pending_failures = match &behavior {
            StubBehavior::FailThen(errors) => errors.iter().rev().cloned().collect(),
            _ => Vec::new(),
        };
        Self {
            behavior,
            calls: AtomicUsize::new(0),
            pending_failures: Mutex::new(pending_failures),
        }
    }

    /// Number of times [`TripGenerator::generate`] has been invoked.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The itinerary JSON the stub produces for `prompt`.
    pub fn itinerary(prompt: &GenerationPrompt) -> Value {
        let destination = &prompt.destination;
        let days: Vec<Value> = (1..=prompt.day_count as u32)
            .map(|day| {
                let date = prompt
                    .start_date
                    .checked_add_days(chrono::Days::new(u64::from(day - 1)))
                    .map(|d| d.to_string());
                let theme = THEMES[(day as usize - 1) % THEMES.len()];
                json!({
                    "day": day,
                    "date": date,
                    "theme": theme,
                    "activities": [
                        {
                            "name": format!("Morning walk through {}", destination),
                            "time": "09:00-11:30",
                            "type": "attraction",
                            "description": format!("Get your bearings in central {} on foot.", destination),
                            "location": format!("{} city centre", destination),
                            "tip": "Start early to beat the crowds"
                        },
                        {
                            "name": "Lunch at a neighbourhood bistro",
                            "time": "12:30-14:00",
                            "type": "restaurant",
                            "description": "A relaxed lunch of regional dishes.",
                            "location": format!("{} old quarter", destination)
                        },
                        {
                            "name": format!("Afternoon experience: {}", theme),
                            "time": "15:00-17:30",
                            "type": "experience",
                            "description": "A guided visit matched to the day's theme.",
                            "location": null
                        },
                        {
                            "name": "Dinner with a view",
                            "time": "19:30-21:30",
                            "type": "restaurant",
                            "description": "End the day with a long dinner.",
                            "location": format!("{} riverside", destination),
                            "tip": "Reserve a table a day ahead"
                        }
                    ]
                })
            })
            .collect();

        json!({ "days": days })
    }
}

impl Default for StubGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TripGenerator for StubGenerator {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn generate(&self, prompt: &GenerationPrompt) -> Result<String, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match &self.behavior {
            StubBehavior::Itinerary => {}
            StubBehavior::Raw(text) => return Ok(text.clone()),
            StubBehavior::Fail(err) => return Err(err.clone()),
            StubBehavior::Delay(delay) => tokio::time::sleep(*delay).await,
            StubBehavior::FailThen(_) => {
                let next = self
                    .pending_failures
                    .lock()
                    .map_err(|_| UpstreamError::Unavailable("stub state poisoned".into()))?
                    .pop();
                if let Some(err) = next {
                    return Err(err);
                }
            }
        }

        Ok(Self::itinerary(prompt).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::validate_request;

    fn prompt(days: u32) -> GenerationPrompt {
        let request = validate_request(&json!({
            "destination": "Paris",
            "start_date": "2025-06-01",
            "end_date": format!("2025-06-{:02}", days)
        }))
        .unwrap();
        GenerationPrompt::from_request(&request)
    }

    #[tokio::test]
    async fn test_itinerary_is_deterministic() {
        let stub = StubGenerator::new();
        let a = stub.generate(&prompt(3)).await.unwrap();
        let b = stub.generate(&prompt(3)).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(stub.calls(), 2);

        let value: Value = serde_json::from_str(&a).unwrap();
        assert_eq!(value["days"].as_array().unwrap().len(), 3);
        assert_eq!(value["days"][2]["date"], "2025-06-03");
    }

    #[tokio::test]
    async fn test_fail_behavior() {
        let stub = StubGenerator::with_behavior(StubBehavior::Fail(UpstreamError::Unavailable(
            "down".into(),
        )));
        let err = stub.generate(&prompt(1)).await.unwrap_err();
        assert_eq!(err, UpstreamError::Unavailable("down".into()));
    }

    #[tokio::test]
    async fn test_fail_then_recovers() {
        let stub = StubGenerator::with_behavior(StubBehavior::FailThen(vec![
            UpstreamError::Unavailable("first".into()),
            UpstreamError::Unavailable("second".into()),
        ]));
        assert_eq!(
            stub.generate(&prompt(1)).await.unwrap_err(),
            UpstreamError::Unavailable("first".into())
        );
        assert_eq!(
            stub.generate(&prompt(1)).await.unwrap_err(),
            UpstreamError::Unavailable("second".into())
        );
        assert!(stub.generate(&prompt(1)).await.is_ok());
        assert_eq!(stub.calls(), 3);
    }

    #[tokio::test]
    async fn test_raw_behavior() {
        let stub = StubGenerator::with_behavior(StubBehavior::Raw("not json".into()));
        assert_eq!(stub.generate(&prompt(1)).await.unwrap(), "not json");
    }
}

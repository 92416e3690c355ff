//! Prompt construction for the external generation capability.

use chrono::NaiveDate;
use serde::Serialize;

use crate::request::{BudgetLevel, GenerateTripRequest, TravelStyle};

/// Structured generation request plus the rendered prompt text.
///
/// Generators that talk to a language model send `text`; deterministic
/// generators can read the structured fields directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationPrompt {
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub day_count: usize,
    pub travelers: Option<u32>,
    pub travel_style: Option<TravelStyle>,
    pub interests: Vec<String>,
    pub budget: Option<BudgetLevel>,
    pub preferences: Option<String>,
    pub text: String,
}

impl GenerationPrompt {
    pub fn from_request(request: &GenerateTripRequest) -> Self {
        Self {
            destination: request.destination.clone(),
            start_date: request.start_date,
            end_date: request.end_date,
            day_count: request.day_count(),
            travelers: request.travelers,
            travel_style: request.travel_style,
            interests: request.interests.clone(),
            budget: request.budget,
            preferences: request.preferences.clone(),
            text: render_prompt(request),
        }
    }
}

fn render_prompt(request: &GenerateTripRequest) -> String {
    let days = request.day_count();
    let mut prompt = format!(
        "Create a {}-day travel itinerary for {}, from {} to {} (day 1 is {}).",
        days,
        request.destination,
        request.start_date,
        request.end_date,
        request.start_date.format("%A"),
    );

    if let Some(travelers) = request.travelers {
        if travelers == 1 {
            prompt.push_str(" The trip is for a solo traveler.");
        } else {
            prompt.push_str(&format!(" The trip is for {} travelers.", travelers));
        }
    }
    if let Some(style) = request.travel_style {
        prompt.push_str(&format!(" The trip should be {}-focused.", style));
    }
    if !request.interests.is_empty() {
        prompt.push_str(&format!(" Key interests: {}.", request.interests.join(", ")));
    }
    if let Some(budget) = request.budget {
        prompt.push_str(&format!(" Budget level: {}.", budget));
    }
    if let Some(preferences) = &request.preferences {
        prompt.push_str(&format!(" Traveler preferences: {}.", preferences));
    }

    prompt.push_str(&format!(
        r#"

For each of the {days} days, provide:
1. A theme or focus for the day
2. 4-5 activities with specific times
3. A mix of attractions, food, and experiences
4. Local insider tips

Return ONLY valid JSON matching this exact structure:
{{
  "days": [
    {{
      "day": 1,
      "date": "{start}",
      "theme": "Historic Center Exploration",
      "activities": [
        {{
          "name": "Colosseum Visit",
          "time": "09:00-11:30",
          "type": "attraction",
          "description": "Explore the iconic amphitheater",
          "location": "Piazza del Colosseo",
          "tip": "Book skip-the-line tickets in advance"
        }}
      ]
    }}
  ]
}}

Important:
- Include exactly {days} days, numbered 1 to {days}, with consecutive dates
- Use realistic 24-hour times (e.g., "09:00-11:00", "12:30-14:00")
- List activities in chronological order
- Include restaurants for lunch and dinner
- Keep descriptions concise (1-2 sentences)
- Add practical tips when relevant"#,
        days = days,
        start = request.start_date,
    ));

    prompt
}

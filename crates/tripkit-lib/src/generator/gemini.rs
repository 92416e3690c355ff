use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::{TripGenerator, UpstreamError};
use crate::error::Result;
use crate::prompt::GenerationPrompt;

/// Default Generative Language API endpoint.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Fast, inexpensive model used for tool calls.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

const TEMPERATURE: f64 = 0.7;
const MAX_OUTPUT_TOKENS: u32 = 4096;

/// Generator backed by a hosted Gemini model.
pub struct GeminiGenerator {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GeminiGenerator {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    /// Classify a non-success status.
    ///
    /// 429 and 5xx are `Unavailable` (retryable); other 4xx are `InvalidResponse`.
    fn status_error(&self, status: StatusCode, detail: &str) -> UpstreamError {
        let message = format!("status {}: {}", status.as_u16(), truncate(detail, 200));
        match status {
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
                UpstreamError::Timeout(self.timeout)
            }
            StatusCode::TOO_MANY_REQUESTS => UpstreamError::Unavailable(message),
            s if s.is_client_error() => UpstreamError::InvalidResponse(message),
            _ => UpstreamError::Unavailable(message),
        }
    }

    fn map_transport_error(&self, err: reqwest::Error) -> UpstreamError {
        if err.is_timeout() {
            UpstreamError::Timeout(self.timeout)
        } else {
            UpstreamError::Unavailable(err.to_string())
        }
    }
}

#[async_trait]
impl TripGenerator for GeminiGenerator {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate(&self, prompt: &GenerationPrompt) -> std::result::Result<String, UpstreamError> {
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt.text }]
            }],
            "generationConfig": {
                "temperature": TEMPERATURE,
                "maxOutputTokens": MAX_OUTPUT_TOKENS,
                "responseMimeType": "application/json"
            }
        });

        debug!(model = %self.model, destination = %prompt.destination, "calling gemini");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "gemini returned an error status");
            return Err(self.status_error(status, &detail));
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                UpstreamError::Timeout(self.timeout)
            } else {
                UpstreamError::InvalidResponse(format!("undecodable response body: {}", e))
            }
        })?;

        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| UpstreamError::InvalidResponse("response had no candidates".into()))?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(UpstreamError::InvalidResponse(format!(
                "candidate had no text (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }

        Ok(text)
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::validate_request;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn prompt() -> GenerationPrompt {
        let request = validate_request(&json!({
            "destination": "Paris",
            "start_date": "2025-06-01",
            "end_date": "2025-06-01"
        }))
        .unwrap();
        GenerationPrompt::from_request(&request)
    }

    fn generator(server: &MockServer, timeout: Duration) -> GeminiGenerator {
        GeminiGenerator::new("test-key", "gemini-test", server.uri(), timeout).unwrap()
    }

    const MODEL_PATH: &str = "/v1beta/models/gemini-test:generateContent";

    #[tokio::test]
    async fn test_returns_candidate_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "{\"days\":" }, { "text": "[]}" }] },
                    "finishReason": "STOP"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = generator(&server, Duration::from_secs(5))
            .generate(&prompt())
            .await
            .unwrap();
        assert_eq!(text, "{\"days\":[]}");
    }

    #[tokio::test]
    async fn test_server_error_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = generator(&server, Duration::from_secs(5))
            .generate(&prompt())
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Unavailable(ref m) if m.contains("503")));
    }

    #[tokio::test]
    async fn test_rejected_request_is_not_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_string("API key not valid"))
            .mount(&server)
            .await;

        let err = generator(&server, Duration::from_secs(5))
            .generate(&prompt())
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::InvalidResponse(ref m) if m.contains("400")));
    }

    #[tokio::test]
    async fn test_throttling_stays_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota"))
            .mount(&server)
            .await;

        let err = generator(&server, Duration::from_secs(5))
            .generate(&prompt())
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Unavailable(ref m) if m.contains("429")));
    }

    #[tokio::test]
    async fn test_empty_candidates_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let err = generator(&server, Duration::from_secs(5))
            .generate(&prompt())
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_blocked_candidate_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "finishReason": "SAFETY" }]
            })))
            .mount(&server)
            .await;

        let err = generator(&server, Duration::from_secs(5))
            .generate(&prompt())
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::InvalidResponse(ref m) if m.contains("SAFETY")));
    }

    #[tokio::test]
    async fn test_slow_server_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "candidates": [] }))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let err = generator(&server, Duration::from_millis(200))
            .generate(&prompt())
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_unavailable() {
        let generator = GeminiGenerator::new(
            "k",
            "m",
            "http://127.0.0.1:9",
            Duration::from_secs(2),
        )
        .unwrap();
        let err = generator.generate(&prompt()).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Unavailable(_)));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("abc", 10), "abc");
    }
}

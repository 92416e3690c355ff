//! External itinerary generation capability.
//!
//! The adapter only ever talks to a [`TripGenerator`]; which implementation
//! backs it is decided once at startup from [`GeneratorConfig`].

use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::{Error, Result};
use crate::prompt::GenerationPrompt;

mod gemini;
mod stub;

pub use gemini::{GeminiGenerator, DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};
pub use stub::{StubBehavior, StubGenerator};

/// Default bound on a single generation call.
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Failure of the external generation capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    /// The capability could not be reached or refused the call.
    #[error("generation capability unavailable: {0}")]
    Unavailable(String),

    /// The call did not complete within the per-call bound.
    #[error("generation timed out after {0:?}")]
    Timeout(Duration),

    /// The capability answered, but not with a usable itinerary.
    #[error("generation returned an invalid response: {0}")]
    InvalidResponse(String),
}

impl UpstreamError {
    /// Stable label for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            UpstreamError::Unavailable(_) => "unavailable",
            UpstreamError::Timeout(_) => "timeout",
            UpstreamError::InvalidResponse(_) => "invalid_response",
        }
    }
}

/// An asynchronous, potentially unreliable "generate a trip" capability.
///
/// Implementations return the raw itinerary text; all parsing and
/// normalization belongs to [`crate::TripAdapter`].
#[async_trait]
pub trait TripGenerator: Send + Sync {
    /// Short name used in logs and health output.
    fn name(&self) -> &'static str;

    async fn generate(&self, prompt: &GenerationPrompt) -> std::result::Result<String, UpstreamError>;
}

/// Which generator implementation to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorKind {
    Gemini,
    Stub,
}

impl GeneratorKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "gemini" => Some(GeneratorKind::Gemini),
            "stub" => Some(GeneratorKind::Stub),
            _ => None,
        }
    }
}

impl fmt::Display for GeneratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneratorKind::Gemini => write!(f, "gemini"),
            GeneratorKind::Stub => write!(f, "stub"),
        }
    }
}

/// Generator configuration resolved at startup.
#[derive(Clone)]
pub struct GeneratorConfig {
    pub kind: GeneratorKind,
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl fmt::Debug for GeneratorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorConfig")
            .field("kind", &self.kind)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            kind: GeneratorKind::Stub,
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }
}

impl GeneratorConfig {
    /// Create configuration from environment variables.
    ///
    /// - `TRIPKIT_GENERATOR`: "gemini" or "stub" (default: gemini when an
    ///   API key is present, stub otherwise)
    /// - `GOOGLE_AI_API_KEY`: API key for the Gemini generator
    /// - `TRIPKIT_MODEL`: model name (default: gemini-2.5-flash)
    /// - `TRIPKIT_GENERATOR_BASE_URL`: API base URL
    /// - `TRIPKIT_GENERATION_TIMEOUT_SECS`: per-call timeout (default: 30)
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("GOOGLE_AI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());

        let kind = match env::var("TRIPKIT_GENERATOR") {
            Ok(value) => GeneratorKind::parse(&value).ok_or_else(|| Error::InvalidConfig {
                key: "TRIPKIT_GENERATOR".to_string(),
                message: format!("expected 'gemini' or 'stub', got '{}'", value),
            })?,
            Err(_) if api_key.is_some() => GeneratorKind::Gemini,
            Err(_) => GeneratorKind::Stub,
        };

        let timeout = match env::var("TRIPKIT_GENERATION_TIMEOUT_SECS") {
            Ok(value) => {
                let secs: u64 = value.trim().parse().map_err(|_| Error::InvalidConfig {
                    key: "TRIPKIT_GENERATION_TIMEOUT_SECS".to_string(),
                    message: format!("expected a whole number of seconds, got '{}'", value),
                })?;
                if secs == 0 {
                    return Err(Error::InvalidConfig {
                        key: "TRIPKIT_GENERATION_TIMEOUT_SECS".to_string(),
                        message: "timeout must be at least 1 second".to_string(),
                    });
                }
                Duration::from_secs(secs)
            }
            Err(_) => DEFAULT_GENERATION_TIMEOUT,
        };

        Ok(Self {
            kind,
            api_key,
            model: env::var("TRIPKIT_MODEL").unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string()),
            base_url: env::var("TRIPKIT_GENERATOR_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_BASE_URL.to_string()),
            timeout,
        })
    }
}

/// Build the configured generator.
pub fn build_generator(config: &GeneratorConfig) -> Result<Arc<dyn TripGenerator>> {
    match config.kind {
        GeneratorKind::Stub => Ok(Arc::new(StubGenerator::new())),
        GeneratorKind::Gemini => {
            let api_key = config.api_key.clone().ok_or_else(|| Error::MissingConfig {
                key: "GOOGLE_AI_API_KEY".to_string(),
            })?;
            let generator = GeminiGenerator::new(
                api_key,
                config.model.clone(),
                config.base_url.clone(),
                config.timeout,
            )?;
            Ok(Arc::new(generator))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generator_kind_parse() {
        assert_eq!(GeneratorKind::parse("gemini"), Some(GeneratorKind::Gemini));
        assert_eq!(GeneratorKind::parse(" STUB "), Some(GeneratorKind::Stub));
        assert_eq!(GeneratorKind::parse("openai"), None);
    }

    #[test]
    fn test_build_stub_generator() {
        let generator = build_generator(&GeneratorConfig::default()).unwrap();
        assert_eq!(generator.name(), "stub");
    }

    #[test]
    fn test_build_gemini_requires_key() {
        let config = GeneratorConfig {
            kind: GeneratorKind::Gemini,
            ..GeneratorConfig::default()
        };
        let err = build_generator(&config).err().unwrap();
        assert!(err.to_string().contains("GOOGLE_AI_API_KEY"));
    }

    #[test]
    fn test_config_debug_redacts_key() {
        let config = GeneratorConfig {
            api_key: Some("secret-key".to_string()),
            ..GeneratorConfig::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("redacted"));
    }

    #[test]
    fn test_upstream_error_labels() {
        assert_eq!(UpstreamError::Unavailable("x".into()).label(), "unavailable");
        assert_eq!(UpstreamError::Timeout(Duration::from_secs(1)).label(), "timeout");
        assert_eq!(UpstreamError::InvalidResponse("x".into()).label(), "invalid_response");
    }
}

//! Service configuration read from the environment at startup.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_RATE_LIMIT: u32 = 20;
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Assistant origins allowed to call the service from a browser.
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "https://chatgpt.com",
    "https://chat.openai.com",
    "https://platform.openai.com",
];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid value for {key}: {message}")]
pub struct ConfigError {
    pub key: &'static str,
    pub message: String,
}

impl ConfigError {
    fn new(key: &'static str, message: impl Into<String>) -> Self {
        Self {
            key,
            message: message.into(),
        }
    }
}

/// Fixed-window rate limit applied per client IP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    #[serde(with = "secs")]
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_RATE_LIMIT,
            window: Duration::from_secs(DEFAULT_RATE_LIMIT_WINDOW_SECS),
        }
    }
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }

    /// `TRIPKIT_RATE_LIMIT` (default 20) and `TRIPKIT_RATE_LIMIT_WINDOW_SECS` (default 60).
    pub fn from_env() -> Result<Self, ConfigError> {
        let max_requests = parse_var("TRIPKIT_RATE_LIMIT", DEFAULT_RATE_LIMIT)?;
        let window_secs = parse_var(
            "TRIPKIT_RATE_LIMIT_WINDOW_SECS",
            DEFAULT_RATE_LIMIT_WINDOW_SECS,
        )?;
        if max_requests == 0 {
            return Err(ConfigError::new("TRIPKIT_RATE_LIMIT", "must be at least 1"));
        }
        if window_secs == 0 {
            return Err(ConfigError::new(
                "TRIPKIT_RATE_LIMIT_WINDOW_SECS",
                "must be at least 1",
            ));
        }
        Ok(Self::new(max_requests, Duration::from_secs(window_secs)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub port: u16,
    pub service_name: String,
    pub allowed_origins: Vec<String>,
    pub rate_limit: RateLimitConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            service_name: "tripkit-service-mcp".to_string(),
            allowed_origins: DEFAULT_ALLOWED_ORIGINS
                .iter()
                .map(|o| o.to_string())
                .collect(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Read `SERVICE_PORT`, `SERVICE_NAME`, `TRIPKIT_ALLOWED_ORIGINS` and the rate limit.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let port = parse_var("SERVICE_PORT", DEFAULT_PORT)?;
        let service_name = std::env::var("SERVICE_NAME")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.service_name);
        let allowed_origins = match std::env::var("TRIPKIT_ALLOWED_ORIGINS") {
            Ok(raw) => parse_origins(&raw)?,
            Err(_) => defaults.allowed_origins,
        };

        Ok(Self {
            port,
            service_name,
            allowed_origins,
            rate_limit: RateLimitConfig::from_env()?,
        })
    }
}

/// Comma-separated origin list. Each entry must be an http(s) origin.
pub fn parse_origins(raw: &str) -> Result<Vec<String>, ConfigError> {
    let origins: Vec<String> = raw
        .split(',')
        .map(|o| o.trim().trim_end_matches('/'))
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect();

    if origins.is_empty() {
        return Err(ConfigError::new(
            "TRIPKIT_ALLOWED_ORIGINS",
            "at least one origin is required",
        ));
    }
    if let Some(bad) = origins
        .iter()
        .find(|o| !(o.starts_with("https://") || o.starts_with("http://")))
    {
        return Err(ConfigError::new(
            "TRIPKIT_ALLOWED_ORIGINS",
            format!("'{}' is not an http(s) origin", bad),
        ));
    }
    Ok(origins)
}

fn parse_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::new(key, format!("'{}' is not a valid number", raw))),
        Err(_) => Ok(default),
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_config_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.allowed_origins.len(), 3);
        assert!(config
            .allowed_origins
            .contains(&"https://chatgpt.com".to_string()));
        assert_eq!(config.rate_limit.max_requests, 20);
        assert_eq!(config.rate_limit.window, Duration::from_secs(60));
    }

    #[test]
    fn test_parse_origins() {
        let origins = parse_origins(" https://a.example/, http://localhost:3000 ,,").unwrap();
        assert_eq!(origins, vec!["https://a.example", "http://localhost:3000"]);
    }

    #[test]
    fn test_parse_origins_rejects_empty_and_bad_scheme() {
        let err = parse_origins(" , ").unwrap_err();
        assert_eq!(err.key, "TRIPKIT_ALLOWED_ORIGINS");

        let err = parse_origins("https://ok.example,ftp://files.example").unwrap_err();
        assert!(err.message.contains("ftp://files.example"));
    }

    #[test]
    fn test_rate_limit_config_serializes_window_in_seconds() {
        let json = serde_json::to_value(RateLimitConfig::default()).unwrap();
        assert_eq!(json["window"], 60);
        assert_eq!(json["max_requests"], 20);
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::new("SERVICE_PORT", "'abc' is not a valid number");
        assert_eq!(
            err.to_string(),
            "invalid value for SERVICE_PORT: 'abc' is not a valid number"
        );
    }
}

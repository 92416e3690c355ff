//! Caller authentication
//!
//! The handler never inspects credentials itself; it asks an [`Authenticator`]
//! for a [`CallerIdentity`] and treats `None` as `AuthenticationFailed`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};
use tripkit_lib::{Error, Result};

/// Credentials presented with a call, as extracted by the transport.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Token from an `Authorization: Bearer ...` header, if any.
    pub bearer_token: Option<String>,
    /// Client address as seen by the transport.
    pub client_ip: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .field("client_ip", &self.client_ip)
            .finish()
    }
}

impl Credentials {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            bearer_token: Some(token.into()),
            client_ip: None,
        }
    }

    pub fn with_client_ip(mut self, ip: impl Into<String>) -> Self {
        self.client_ip = Some(ip.into());
        self
    }

    /// Parse an `Authorization` header value. Only the bearer scheme is read.
    pub fn from_authorization_header(value: Option<&str>) -> Self {
        let bearer_token = value.and_then(|v| {
            let (scheme, token) = v.trim().split_once(' ')?;
            let token = token.trim();
            (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
        });
        Self {
            bearer_token,
            client_ip: None,
        }
    }
}

/// Opaque identity of an authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallerIdentity(String);

impl CallerIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Resolve `credentials` to a caller, or `None` when they are not accepted.
    async fn authenticate(&self, credentials: &Credentials) -> Option<CallerIdentity>;
}

/// Accepts every caller; identity is derived from the client address.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousAuthenticator;

#[async_trait]
impl Authenticator for AnonymousAuthenticator {
    async fn authenticate(&self, credentials: &Credentials) -> Option<CallerIdentity> {
        let ip = credentials.client_ip.as_deref().unwrap_or("local");
        Some(CallerIdentity::new(format!("anonymous:{}", ip)))
    }
}

/// Accepts bearer tokens from a fixed table of `token -> caller id`.
#[derive(Clone)]
pub struct ApiKeyAuthenticator {
    keys: HashMap<String, String>,
}

impl fmt::Debug for ApiKeyAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyAuthenticator")
            .field("callers", &self.keys.len())
            .finish()
    }
}

impl ApiKeyAuthenticator {
    pub fn new<I, C, T>(entries: I) -> Self
    where
        I: IntoIterator<Item = (C, T)>,
        C: Into<String>,
        T: Into<String>,
    {
        Self {
            keys: entries
                .into_iter()
                .map(|(caller, token)| (token.into(), caller.into()))
                .collect(),
        }
    }

    /// Parse `caller:token,caller:token`.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut keys = HashMap::new();
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (caller, token) = entry
                .split_once(':')
                .map(|(c, t)| (c.trim(), t.trim()))
                .filter(|(c, t)| !c.is_empty() && !t.is_empty())
                .ok_or_else(|| Error::InvalidConfig {
                    key: "TRIPKIT_API_KEYS".to_string(),
                    message: "entries must look like 'caller:token'".to_string(),
                })?;
            if keys.insert(token.to_string(), caller.to_string()).is_some() {
                return Err(Error::InvalidConfig {
                    key: "TRIPKIT_API_KEYS".to_string(),
                    message: format!("token for '{}' is configured more than once", caller),
                });
            }
        }
        if keys.is_empty() {
            return Err(Error::InvalidConfig {
                key: "TRIPKIT_API_KEYS".to_string(),
                message: "no API keys configured".to_string(),
            });
        }
        Ok(Self { keys })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[async_trait]
impl Authenticator for ApiKeyAuthenticator {
    async fn authenticate(&self, credentials: &Credentials) -> Option<CallerIdentity> {
        let token = credentials.bearer_token.as_deref()?;
        let caller = self.keys.get(token);
        if caller.is_none() {
            debug!("bearer token not recognized");
        }
        caller.map(CallerIdentity::new)
    }
}

/// Build the authenticator selected by `TRIPKIT_API_KEYS`.
///
/// With keys configured every call must present a known bearer token;
/// without them the server is public.
pub fn authenticator_from_env() -> Result<Arc<dyn Authenticator>> {
    match std::env::var("TRIPKIT_API_KEYS") {
        Ok(raw) if !raw.trim().is_empty() => {
            let authenticator = ApiKeyAuthenticator::parse(&raw)?;
            info!(callers = authenticator.len(), "API key authentication enabled");
            Ok(Arc::new(authenticator))
        }
        _ => {
            info!("no API keys configured; accepting anonymous callers");
            Ok(Arc::new(AnonymousAuthenticator))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_api_key_authenticator() {
        let auth = ApiKeyAuthenticator::parse("alice:tok-a, bob:tok-b").unwrap();
        assert_eq!(auth.len(), 2);
        assert_eq!(
            auth.authenticate(&Credentials::bearer("tok-b")).await,
            Some(CallerIdentity::new("bob"))
        );
        assert_eq!(auth.authenticate(&Credentials::bearer("nope")).await, None);
        assert_eq!(auth.authenticate(&Credentials::default()).await, None);
    }

    #[test]
    fn test_api_key_parse_errors() {
        assert!(ApiKeyAuthenticator::parse("").is_err());
        assert!(ApiKeyAuthenticator::parse("alice").is_err());
        assert!(ApiKeyAuthenticator::parse("alice:").is_err());
        assert!(ApiKeyAuthenticator::parse("alice:t,bob:t").is_err());
    }

    #[tokio::test]
    async fn test_anonymous_identity_uses_client_ip() {
        let creds = Credentials::default().with_client_ip("203.0.113.9");
        assert_eq!(
            AnonymousAuthenticator.authenticate(&creds).await,
            Some(CallerIdentity::new("anonymous:203.0.113.9"))
        );
        assert_eq!(
            AnonymousAuthenticator
                .authenticate(&Credentials::default())
                .await
                .unwrap()
                .as_str(),
            "anonymous:local"
        );
    }

    #[test]
    fn test_authorization_header_parsing() {
        assert_eq!(
            Credentials::from_authorization_header(Some("Bearer abc")).bearer_token,
            Some("abc".to_string())
        );
        assert_eq!(
            Credentials::from_authorization_header(Some("bearer  abc ")).bearer_token,
            Some("abc".to_string())
        );
        assert_eq!(Credentials::from_authorization_header(Some("Basic abc")).bearer_token, None);
        assert_eq!(Credentials::from_authorization_header(Some("Bearer ")).bearer_token, None);
        assert_eq!(Credentials::from_authorization_header(None).bearer_token, None);
    }

    #[test]
    fn test_debug_redacts_token() {
        let debug = format!("{:?}", Credentials::bearer("very-secret"));
        assert!(!debug.contains("very-secret"));
    }
}

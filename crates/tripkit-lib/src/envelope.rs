//! Response envelope returned by every `generate_trip` call.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::generator::UpstreamError;
use crate::request::{ValidationFailure, Violation};
use crate::widget::WidgetPayload;

/// Category of a failed call. Serialized as the variant name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum ErrorKind {
    AuthenticationFailed,
    ValidationFailed,
    RateLimited,
    UpstreamUnavailable,
    UpstreamTimeout,
    UpstreamInvalidResponse,
    InternalError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::AuthenticationFailed => "AuthenticationFailed",
            ErrorKind::ValidationFailed => "ValidationFailed",
            ErrorKind::RateLimited => "RateLimited",
            ErrorKind::UpstreamUnavailable => "UpstreamUnavailable",
            ErrorKind::UpstreamTimeout => "UpstreamTimeout",
            ErrorKind::UpstreamInvalidResponse => "UpstreamInvalidResponse",
            ErrorKind::InternalError => "InternalError",
        }
    }

    /// Generic user-facing message. Failure detail is logged, never returned.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorKind::AuthenticationFailed => "Authentication is required to call this tool.",
            ErrorKind::ValidationFailed => "The trip request is invalid.",
            ErrorKind::RateLimited => "Too many requests. Please wait a minute and try again.",
            ErrorKind::UpstreamUnavailable => {
                "The itinerary service is temporarily unavailable. Please try again."
            }
            ErrorKind::UpstreamTimeout => {
                "Generating the itinerary took too long. Please try again."
            }
            ErrorKind::UpstreamInvalidResponse => {
                "The itinerary service returned an unusable itinerary. Please try again."
            }
            ErrorKind::InternalError => "An unexpected error occurred.",
        }
    }

    /// True for the kinds that describe a failure of the generation capability.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            ErrorKind::UpstreamUnavailable
                | ErrorKind::UpstreamTimeout
                | ErrorKind::UpstreamInvalidResponse
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&UpstreamError> for ErrorKind {
    fn from(err: &UpstreamError) -> Self {
        match err {
            UpstreamError::Unavailable(_) => ErrorKind::UpstreamUnavailable,
            UpstreamError::Timeout(_) => ErrorKind::UpstreamTimeout,
            UpstreamError::InvalidResponse(_) => ErrorKind::UpstreamInvalidResponse,
        }
    }
}

/// Error half of the envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
    /// Present only for `ValidationFailed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub violations: Option<Vec<Violation>>,
}

/// `{ "ok": true, "data": ... }` or `{ "ok": false, "error": ... }`.
///
/// Exactly one of `data` and `error` is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ResponseEnvelope {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<WidgetPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl ResponseEnvelope {
    pub fn success(data: WidgetPayload) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    /// Failure carrying the kind's generic message.
    pub fn failure(kind: ErrorKind) -> Self {
        Self::failure_with_message(kind, kind.default_message())
    }

    pub fn failure_with_message(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(ErrorBody {
                kind,
                message: message.into(),
                violations: None,
            }),
        }
    }

    pub fn validation(failure: ValidationFailure) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(ErrorBody {
                kind: ErrorKind::ValidationFailed,
                message: failure.summary(),
                violations: Some(failure.violations),
            }),
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }
}

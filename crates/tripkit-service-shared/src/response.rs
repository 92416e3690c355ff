//! HTTP responses for envelopes on the REST endpoint.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tripkit_lib::{ErrorKind, ResponseEnvelope};

/// HTTP status for a failed envelope on the REST endpoint.
pub fn status_for_kind(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::AuthenticationFailed => StatusCode::UNAUTHORIZED,
        ErrorKind::ValidationFailed => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::UpstreamUnavailable => StatusCode::BAD_GATEWAY,
        ErrorKind::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::UpstreamInvalidResponse => StatusCode::BAD_GATEWAY,
        ErrorKind::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// A [`ResponseEnvelope`] served with a status derived from its error kind.
///
/// ```
/// use tripkit_lib::{ErrorKind, ResponseEnvelope};
/// use tripkit_service_shared::EnvelopeResponse;
///
/// let response = EnvelopeResponse::new(ResponseEnvelope::failure(ErrorKind::UpstreamTimeout));
/// assert_eq!(response.status().as_u16(), 504);
/// ```
#[derive(Debug, Clone)]
pub struct EnvelopeResponse {
    envelope: ResponseEnvelope,
    retry_after_secs: Option<u64>,
}

impl EnvelopeResponse {
    pub fn new(envelope: ResponseEnvelope) -> Self {
        Self {
            envelope,
            retry_after_secs: None,
        }
    }

    /// `RateLimited` envelope carrying a `Retry-After` header.
    pub fn rate_limited(retry_after_secs: u64) -> Self {
        Self {
            envelope: ResponseEnvelope::failure(ErrorKind::RateLimited),
            retry_after_secs: Some(retry_after_secs.max(1)),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.envelope
            .error_kind()
            .map(status_for_kind)
            .unwrap_or(StatusCode::OK)
    }

    pub fn envelope(&self) -> &ResponseEnvelope {
        &self.envelope
    }
}

impl IntoResponse for EnvelopeResponse {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut response = (status, Json(self.envelope)).into_response();
        if let Some(secs) = self.retry_after_secs {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

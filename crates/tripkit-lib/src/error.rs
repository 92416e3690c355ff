use thiserror::Error;

/// Convenient result alias for the Tripkit library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
///
/// Per-call failures have their own types ([`crate::ValidationFailure`] and
/// [`crate::UpstreamError`]); this enum covers setup problems raised while
/// wiring the library together at startup.
#[derive(Debug, Error)]
pub enum Error {
    /// A configuration value was present but could not be used.
    #[error("invalid configuration for {key}: {message}")]
    InvalidConfig { key: String, message: String },

    /// A configuration value required by the selected setup was absent.
    #[error("missing required configuration {key}")]
    MissingConfig { key: String },

    /// Raised when a save link base URL cannot be parsed.
    #[error("invalid save url base '{base}': {message}")]
    InvalidSaveUrl { base: String, message: String },

    /// Wrapper for HTTP client construction errors.
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

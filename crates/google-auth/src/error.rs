//! Error types for OAuth operations

use std::time::Duration;

/// Errors from the authorization flow and token endpoint.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("OAuth configuration error: {0}")]
    Configuration(String),

    #[error("Missing code")]
    MissingCode,

    #[error("token endpoint returned {status}: {body}")]
    TokenExchange { status: u16, body: String },

    #[error("token endpoint did not answer within {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("invalid token response: {0}")]
    InvalidResponse(String),

    #[error("credential has no refresh token, re-authorize via /auth")]
    NoRefreshToken,
}

impl Error {
    /// Whether repeating the same request may succeed.
    ///
    /// Timeouts and transport failures are retryable; a provider rejection
    /// (`TokenExchange`) is not, the code is single-use.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Timeout(_) | Error::Http(_))
    }
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;

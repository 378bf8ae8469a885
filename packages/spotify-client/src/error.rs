//! Spotify Web API error types

use std::time::Duration;

use thiserror::Error;

/// Spotify client errors
#[derive(Error, Debug)]
pub enum SpotifyError {
    /// Client was used for an authenticated call without an access token
    #[error("an access token is required for this request")]
    MissingAccessToken,

    /// Invalid input provided to API method
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Access token expired or revoked; the user must sign in again
    #[error("Spotify rejected the access token: {0}")]
    Unauthorized(String),

    /// Token lacks a required scope or the resource is not the user's
    #[error("Spotify denied access: {0}")]
    Forbidden(String),

    /// Requested resource does not exist
    #[error("Spotify resource not found: {0}")]
    NotFound(String),

    /// Rate limited by Spotify
    #[error("Rate limited by Spotify API")]
    RateLimited {
        /// Delay requested through the `Retry-After` header
        retry_after: Option<Duration>,
    },

    /// Network failure or 5xx response
    #[error("Transient Spotify failure: {0}")]
    Transient(String),

    /// Request timeout
    #[error("Request to Spotify timed out")]
    Timeout,

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("Failed to parse Spotify response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Spotify returned an error not covered by the other variants
    #[error("Spotify API error {status}: {message}")]
    Api { status: u16, message: String },

    /// All retry attempts exhausted
    #[error("All {attempts} attempts failed. Last error: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

impl SpotifyError {
    /// Check if this error is retryable (transient failure)
    ///
    /// Retries on:
    /// - Timeouts
    /// - Rate limiting
    /// - Transport errors (connect, timeout)
    /// - Server errors (5xx)
    ///
    /// Does NOT retry on client errors (4xx except 429 rate limiting).
    pub fn is_retryable(&self) -> bool {
        match self {
            SpotifyError::Timeout
            | SpotifyError::RateLimited { .. }
            | SpotifyError::Transient(_) => true,
            SpotifyError::Http(e) => {
                if e.is_timeout() || e.is_connect() {
                    return true;
                }
                matches!(e.status(), Some(status) if status.is_server_error())
            }
            _ => false,
        }
    }

    /// Check if the user has to re-authenticate
    pub fn requires_reauthentication(&self) -> bool {
        matches!(
            self,
            SpotifyError::Unauthorized(_) | SpotifyError::MissingAccessToken
        )
    }

    /// Delay hint carried by a rate-limit response
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            SpotifyError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Result type for Spotify operations
pub type SpotifyResult<T> = Result<T, SpotifyError>;

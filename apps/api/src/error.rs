//! Error handling for the Podqueue API
//!
//! This module provides a unified error type using thiserror, with HTTP status
//! code mapping via Axum's IntoResponse trait.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use podqueue_spotify_client::SpotifyError;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::services::scan::ScanError;

/// Path that starts a fresh sign-in
pub const LOGIN_PATH: &str = "/auth/login";

/// API error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for client-side handling
    pub code: &'static str,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Main API error type
#[derive(Error, Debug)]
pub enum ApiError {
    // ========== Authentication ==========
    /// Missing session or the platform rejected the user's token
    #[error("authentication required")]
    Unauthorized,

    /// Session token is malformed or expired
    #[error("invalid authentication token: {0}")]
    InvalidToken(String),

    // ========== Resource Errors ==========
    /// Requested resource not found
    #[error("{resource_type} not found: {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    // ========== Validation Errors ==========
    /// Request validation failed
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Playlist input does not resolve to a playlist the user can write
    #[error("invalid playlist reference: {0}")]
    InvalidPlaylistReference(String),

    /// A scan was requested before any target playlist was set
    #[error("no target playlist is configured")]
    MissingPlaylist,

    // ========== Scan Lifecycle ==========
    /// A scan for this user has not reached a terminal stage yet
    #[error("a scan is already running")]
    ScanAlreadyRunning,

    // ========== Database Errors ==========
    /// Database query failed
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    // ========== External Service Errors ==========
    /// Spotify failed in a way the user cannot fix
    #[error("Spotify error: {0}")]
    Platform(String),

    /// Spotify kept rate limiting the request
    #[error("rate limit exceeded, retry after {retry_after} seconds")]
    RateLimited { retry_after: u64 },

    // ========== Internal Errors ==========
    /// Internal server error (catch-all for unexpected errors)
    #[error("internal server error: {0}")]
    Internal(String),

    /// JWT encoding error
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

impl ApiError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized | Self::InvalidToken(_) => StatusCode::UNAUTHORIZED,

            Self::NotFound { .. } => StatusCode::NOT_FOUND,

            Self::ScanAlreadyRunning => StatusCode::CONFLICT,

            Self::ValidationError(_)
            | Self::InvalidPlaylistReference(_)
            | Self::MissingPlaylist => StatusCode::BAD_REQUEST,

            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,

            Self::Platform(_) => StatusCode::BAD_GATEWAY,

            Self::Database(_) | Self::Internal(_) | Self::Jwt(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get the error code string for client-side handling
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::InvalidToken(_) => "INVALID_TOKEN",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::InvalidPlaylistReference(_) => "INVALID_PLAYLIST_REFERENCE",
            Self::MissingPlaylist => "MISSING_PLAYLIST",
            Self::ScanAlreadyRunning => "SCAN_ALREADY_RUNNING",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Platform(_) => "PLATFORM_ERROR",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Jwt(_) => "JWT_ERROR",
        }
    }

    /// Create a not found error for a specific resource
    pub fn not_found(resource_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type,
            id: id.into(),
        }
    }

    /// Log the error with appropriate severity based on status code
    pub fn log(&self) {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(
                error = %self,
                code = self.error_code(),
                status = status.as_u16(),
                "Server error occurred"
            );
        } else if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(
                error = %self,
                code = self.error_code(),
                status = status.as_u16(),
                "Authorization error"
            );
        } else {
            tracing::debug!(
                error = %self,
                code = self.error_code(),
                status = status.as_u16(),
                "Client error"
            );
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log();

        let status = self.status_code();
        let details = if status == StatusCode::UNAUTHORIZED {
            Some(json!({ "reauthenticate_url": LOGIN_PATH }))
        } else {
            None
        };

        let error_response = ErrorResponse {
            code: self.error_code(),
            message: self.to_string(),
            details,
        };

        if let Self::RateLimited { retry_after } = &self {
            return (
                status,
                [("Retry-After", retry_after.to_string())],
                Json(error_response),
            )
                .into_response();
        }

        (status, Json(error_response)).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

// ========== Conversion Implementations ==========

impl From<SpotifyError> for ApiError {
    fn from(err: SpotifyError) -> Self {
        if err.requires_reauthentication() {
            return Self::Unauthorized;
        }
        match err {
            SpotifyError::RateLimited { retry_after } => Self::RateLimited {
                retry_after: retry_after.map(|d| d.as_secs().max(1)).unwrap_or(1),
            },
            SpotifyError::NotFound(message) => Self::not_found("Spotify resource", message),
            SpotifyError::InvalidInput(message) => Self::ValidationError(message),
            other => Self::Platform(other.to_string()),
        }
    }
}

impl From<ScanError> for ApiError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::ScanAlreadyRunning => Self::ScanAlreadyRunning,
            ScanError::MissingPlaylist => Self::MissingPlaylist,
            ScanError::Unauthorized(_) => Self::Unauthorized,
            ScanError::Store(e) => Self::Database(e),
            other @ (ScanError::ScanFailed(_) | ScanError::WriteFailed(_)) => {
                Self::Platform(other.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::Unauthorized.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::ScanAlreadyRunning.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::InvalidPlaylistReference("x".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::MissingPlaylist.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Platform("down".to_string()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            ApiError::InvalidPlaylistReference("x".to_string()).error_code(),
            "INVALID_PLAYLIST_REFERENCE"
        );
        assert_eq!(
            ApiError::ScanAlreadyRunning.error_code(),
            "SCAN_ALREADY_RUNNING"
        );
    }

    #[test]
    fn test_spotify_error_mapping() {
        assert!(matches!(
            ApiError::from(SpotifyError::Unauthorized("expired".to_string())),
            ApiError::Unauthorized
        ));
        assert!(matches!(
            ApiError::from(SpotifyError::RateLimited {
                retry_after: Some(Duration::from_secs(12))
            }),
            ApiError::RateLimited { retry_after: 12 }
        ));
        assert!(matches!(
            ApiError::from(SpotifyError::Transient("503".to_string())),
            ApiError::Platform(_)
        ));
    }

    #[tokio::test]
    async fn test_unauthorized_body_carries_login_url() {
        let response = ApiError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], "UNAUTHORIZED");
        assert_eq!(json["details"]["reauthenticate_url"], LOGIN_PATH);
    }
}

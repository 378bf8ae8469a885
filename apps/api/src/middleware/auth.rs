//! Session extractor for Axum handlers
//!
//! `AuthUser` accepts the session token as `Authorization: Bearer <token>`
//! or as the `podqueue_session` cookie and rejects the request with 401
//! otherwise.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::middleware::AuthUser;
//!
//! async fn protected_handler(auth: AuthUser) -> impl IntoResponse {
//!     format!("Hello, {}!", auth.user_id)
//! }
//! ```

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
    },
};

use crate::error::ApiError;
use crate::services::{SessionService, SESSION_COOKIE};

/// Authenticated Spotify user
#[derive(Clone)]
pub struct AuthUser {
    /// Spotify user ID
    pub user_id: String,
    /// Spotify access token from the session
    pub access_token: String,
}

impl std::fmt::Debug for AuthUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthUser")
            .field("user_id", &self.user_id)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// Extract the bearer token from the Authorization header (case-insensitive scheme)
fn extract_bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;

    let mut segments = value.split_whitespace();
    let scheme = segments.next()?;
    let token = segments.next()?;
    if segments.next().is_some() {
        return None;
    }

    scheme.eq_ignore_ascii_case("bearer").then_some(token)
}

/// Extract the session cookie
fn extract_session_cookie(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == SESSION_COOKIE && !value.is_empty()).then_some(value)
        })
        .next()
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(parts)
            .or_else(|| extract_session_cookie(parts))
            .ok_or(ApiError::Unauthorized)?;

        let sessions = parts.extensions.get::<SessionService>().ok_or_else(|| {
            ApiError::Internal("Session service not configured".to_string())
        })?;

        let claims = sessions.verify_session(token)?;

        Ok(AuthUser {
            user_id: claims.sub,
            access_token: claims.spotify_token,
        })
    }
}

//! Session and OAuth state tokens
//!
//! Sessions are HS256 JWTs carrying the Spotify user ID and access token.
//! OAuth `state` values are short-lived JWTs with a different audience, so
//! neither can stand in for the other.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "podqueue_session";

const ISSUER: &str = "podqueue";
const SESSION_AUDIENCE: &str = "podqueue-session";
const STATE_AUDIENCE: &str = "podqueue-oauth-state";

/// Upper bound on a session lifetime in seconds (Spotify tokens last an hour)
const DEFAULT_SESSION_TTL_SECS: i64 = 3600;

/// Lifetime of an OAuth state value in seconds
const STATE_TTL_SECS: i64 = 600;

/// Claims of a session token
#[derive(Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Spotify user ID
    pub sub: String,
    /// Spotify access token
    pub spotify_token: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

impl std::fmt::Debug for SessionClaims {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionClaims")
            .field("sub", &self.sub)
            .field("spotify_token", &"[REDACTED]")
            .field("exp", &self.exp)
            .finish()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StateClaims {
    nonce: String,
    iat: i64,
    exp: i64,
    iss: String,
    aud: String,
}

/// Issues and verifies session tokens
#[derive(Clone)]
pub struct SessionService {
    secret: String,
    session_ttl_secs: i64,
}

impl SessionService {
    /// Create a session service signing with `secret`
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
        }
    }

    fn validation(audience: &str) -> Validation {
        let mut validation = Validation::default();
        validation.set_issuer(&[ISSUER]);
        validation.set_audience(&[audience]);
        validation
    }

    /// Issue a session for a signed-in user
    ///
    /// The session expires with the Spotify token it carries.
    pub fn issue_session(
        &self,
        user_id: &str,
        spotify_token: &str,
        token_expires_in: u64,
    ) -> ApiResult<(String, i64)> {
        let now = Utc::now().timestamp();
        let ttl = i64::try_from(token_expires_in)
            .unwrap_or(i64::MAX)
            .min(self.session_ttl_secs);
        let claims = SessionClaims {
            sub: user_id.to_string(),
            spotify_token: spotify_token.to_string(),
            iat: now,
            exp: now + ttl,
            iss: ISSUER.to_string(),
            aud: SESSION_AUDIENCE.to_string(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?;
        Ok((token, ttl))
    }

    /// Verify a session token and return its claims
    ///
    /// # Errors
    /// - `ApiError::InvalidToken` if the token is invalid, expired, or malformed
    pub fn verify_session(&self, token: &str) -> ApiResult<SessionClaims> {
        decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Self::validation(SESSION_AUDIENCE),
        )
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(error = %e, "Session token verification failed");
            ApiError::InvalidToken(e.to_string())
        })
    }

    /// Issue an OAuth `state` value for the authorize redirect
    pub fn issue_state(&self) -> ApiResult<String> {
        let now = Utc::now().timestamp();
        let claims = StateClaims {
            nonce: Uuid::new_v4().to_string(),
            iat: now,
            exp: now + STATE_TTL_SECS,
            iss: ISSUER.to_string(),
            aud: STATE_AUDIENCE.to_string(),
        };
        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?)
    }

    /// Verify an OAuth `state` value returned to the callback
    pub fn verify_state(&self, state: &str) -> ApiResult<()> {
        decode::<StateClaims>(
            state,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Self::validation(STATE_AUDIENCE),
        )
        .map(|_| ())
        .map_err(|e| ApiError::ValidationError(format!("invalid OAuth state: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn service() -> SessionService {
        SessionService::new("test-secret-that-is-long-enough-for-hs256")
    }

    #[test]
    fn test_session_round_trip() {
        let service = service();
        let (token, ttl) = service.issue_session("alice", "spotify-token", 3600).unwrap();
        assert_eq!(ttl, 3600);

        let claims = service.verify_session(&token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.spotify_token, "spotify-token");
    }

    #[test]
    fn test_session_ttl_capped_by_token_lifetime() {
        let (_, ttl) = service().issue_session("alice", "t", 120).unwrap();
        assert_eq!(ttl, 120);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let (token, _) = service().issue_session("alice", "t", 3600).unwrap();
        let other = SessionService::new("another-secret-entirely");
        assert_matches!(other.verify_session(&token), Err(ApiError::InvalidToken(_)));
    }

    #[test]
    fn test_state_is_not_a_session() {
        let service = service();
        let state = service.issue_state().unwrap();
        assert!(service.verify_state(&state).is_ok());
        assert!(service.verify_session(&state).is_err());

        let (session, _) = service.issue_session("alice", "t", 3600).unwrap();
        assert!(service.verify_state(&session).is_err());
    }

    #[test]
    fn test_claims_debug_redacts_token() {
        let (token, _) = service().issue_session("alice", "very-secret", 3600).unwrap();
        let claims = service().verify_session(&token).unwrap();
        assert!(!format!("{:?}", claims).contains("very-secret"));
    }
}

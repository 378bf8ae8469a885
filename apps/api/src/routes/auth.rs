//! Spotify sign-in route handlers
//!
//! - `GET /auth/login` - Redirect to the Spotify consent screen
//! - `GET /auth/callback` - Exchange the authorization code and open a session
//! - `POST /auth/logout` - Clear the session cookie

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use podqueue_spotify_client::{SpotifyAuth, SpotifyError};

use crate::error::{ApiError, ApiResult};
use crate::services::SESSION_COOKIE;
use crate::state::AppState;

/// Query parameters Spotify appends to the redirect URI
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set when the user declined consent
    pub error: Option<String>,
}

/// Session returned after a successful sign-in
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    /// Bearer token for subsequent requests (also set as a cookie)
    pub token: String,
    pub user_id: String,
    pub display_name: Option<String>,
    /// Seconds until the session expires
    pub expires_in: i64,
}

/// Create auth router
pub fn auth_router(state: AppState) -> Router {
    Router::new()
        .route("/login", get(login))
        .route("/callback", get(callback))
        .route("/logout", post(logout))
        .with_state(state)
}

async fn login(State(state): State<AppState>) -> ApiResult<Redirect> {
    let oauth_state = state.sessions.issue_state()?;
    let url = SpotifyAuth::new(&state.spotify).authorize_url(&oauth_state)?;
    Ok(Redirect::temporary(&url))
}

/// Complete the authorization code flow
///
/// # Errors
/// - 400 if consent was declined, the state is invalid or expired, or the
///   code was rejected
/// - 502 if Spotify could not be reached
async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> ApiResult<impl IntoResponse> {
    if let Some(error) = params.error {
        return Err(ApiError::ValidationError(format!(
            "Spotify authorization was declined: {}",
            error
        )));
    }

    let oauth_state = params
        .state
        .ok_or_else(|| ApiError::ValidationError("missing OAuth state".to_string()))?;
    state.sessions.verify_state(&oauth_state)?;

    let code = params
        .code
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::ValidationError("missing authorization code".to_string()))?;

    let grant = SpotifyAuth::new(&state.spotify)
        .exchange_code(&code)
        .await
        .map_err(|e| match e {
            SpotifyError::Api { status, message } if (400..500).contains(&status) => {
                ApiError::ValidationError(format!("authorization code rejected: {}", message))
            }
            other => ApiError::from(other),
        })?;

    let user = state
        .spotify
        .authorized(grant.access_token.as_str())
        .current_user()
        .await?;

    let (token, ttl) = state
        .sessions
        .issue_session(&user.id, &grant.access_token, grant.expires_in)?;

    tracing::info!(user_id = %user.id, expires_in = ttl, "User signed in");

    let cookie = format!(
        "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, ttl
    );

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(SessionResponse {
            token,
            user_id: user.id,
            display_name: user.display_name,
            expires_in: ttl,
        }),
    ))
}

/// Expire the session cookie
///
/// Sessions are signed tokens with no server-side record, so a bearer token
/// copied elsewhere stays valid until it expires.
async fn logout() -> impl IntoResponse {
    let cookie = format!(
        "{}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0",
        SESSION_COOKIE
    );
    (StatusCode::NO_CONTENT, [(header::SET_COOKIE, cookie)])
}

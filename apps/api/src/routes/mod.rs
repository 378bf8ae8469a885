//! HTTP route handlers for the Podqueue API
//!
//! - Spotify sign-in endpoints
//! - Playlist setup endpoints
//! - Scan trigger and progress endpoints
//! - Health check and status endpoints

pub mod auth;
pub mod health;
pub mod playlist;
pub mod scan;

pub use auth::auth_router;
pub use health::health_router;
pub use playlist::{parse_playlist_reference, playlist_router};
pub use scan::scan_router;

use axum::{extract::Extension, routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assemble every router
///
/// The session service is installed as an extension so that the
/// [`AuthUser`](crate::middleware::AuthUser) extractor can verify tokens.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        // /health, /health/live, /health/ready
        .nest("/health", health_router(state.health.clone()))
        // /auth/login, /auth/callback
        .nest("/auth", auth_router(state.clone()))
        // PUT|POST /playlist
        .nest("/playlist", playlist_router(state.clone()))
        // POST /scan, /scan/status, /scan/state
        .nest("/scan", scan_router(state.clone()))
        .layer(Extension(state.sessions.clone()))
        .layer(TraceLayer::new_for_http())
}

async fn root() -> &'static str {
    "Podqueue - smart podcast queue for Spotify"
}

//! Target playlist setup routes
//!
//! - `PUT /playlist` - Use an existing playlist the user may edit
//! - `POST /playlist` - Create a fresh private playlist and start a scan

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::put, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

use podqueue_spotify_client::SpotifyError;

use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;
use crate::state::AppState;

const PLAYLIST_DESCRIPTION: &str = "New episodes first, then one duration band of backlog per scan.";

const PLAYLIST_URI_PREFIX: &str = "spotify:playlist:";

/// Body of `PUT /playlist`
#[derive(Debug, Deserialize)]
pub struct SetPlaylistRequest {
    /// Playlist URL, `spotify:playlist:` URI or bare ID
    pub playlist: String,
}

#[derive(Debug, Serialize)]
pub struct PlaylistResponse {
    pub playlist_id: String,
    pub name: String,
}

/// Create playlist router
pub fn playlist_router(state: AppState) -> Router {
    Router::new()
        .route("/", put(set_playlist).post(create_playlist))
        .with_state(state)
}

/// Extract a playlist ID from a URL, URI or bare ID
///
/// Accepts `https://open.spotify.com/playlist/<id>?si=...` (with an
/// optional `intl-xx` segment), `spotify:playlist:<id>` and `<id>`.
pub fn parse_playlist_reference(input: &str) -> Option<String> {
    let input = input.trim();

    let candidate = if let Some(rest) = input.strip_prefix(PLAYLIST_URI_PREFIX) {
        rest.to_string()
    } else if input.starts_with("http://") || input.starts_with("https://") {
        let url = Url::parse(input).ok()?;
        let host = url.host_str()?;
        if host != "spotify.com" && !host.ends_with(".spotify.com") {
            return None;
        }
        let mut segments = url.path_segments()?;
        segments.find(|s| *s == "playlist")?;
        segments.next()?.to_string()
    } else {
        input.to_string()
    };

    let valid = !candidate.is_empty() && candidate.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then_some(candidate)
}

/// Point the queue at an existing playlist
///
/// Changing the target resets the backlog band rotation. The user's
/// progress record is held for the duration, so no scan can start while
/// the target changes.
async fn set_playlist(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<SetPlaylistRequest>,
) -> ApiResult<Json<PlaylistResponse>> {
    let claim = state.scans.progress().begin(&auth.user_id)?;
    let result = assign_existing(&state, &auth, &request).await;
    claim.release();
    result.map(Json)
}

async fn assign_existing(
    state: &AppState,
    auth: &AuthUser,
    request: &SetPlaylistRequest,
) -> ApiResult<PlaylistResponse> {
    let playlist_id = parse_playlist_reference(&request.playlist).ok_or_else(|| {
        ApiError::InvalidPlaylistReference(format!(
            "'{}' is not a Spotify playlist URL, URI or ID",
            request.playlist.trim()
        ))
    })?;

    let playlist = state
        .spotify
        .authorized(auth.access_token.as_str())
        .playlist(&playlist_id)
        .await
        .map_err(|e| match e {
            SpotifyError::NotFound(_) | SpotifyError::Forbidden(_) | SpotifyError::InvalidInput(_) => {
                ApiError::InvalidPlaylistReference(format!(
                    "playlist {} does not exist or is not accessible",
                    playlist_id
                ))
            }
            other => ApiError::from(other),
        })?;

    if !playlist.is_writable_by(&auth.user_id) {
        return Err(ApiError::InvalidPlaylistReference(format!(
            "playlist {} is neither owned by you nor collaborative",
            playlist.id
        )));
    }

    state
        .scans
        .store()
        .set_target_playlist(&auth.user_id, &playlist.id)
        .await?;

    tracing::info!(user_id = %auth.user_id, playlist_id = %playlist.id, "Target playlist set");

    Ok(PlaylistResponse {
        playlist_id: playlist.id,
        name: playlist.name,
    })
}

/// Create a new private playlist, make it the target, and scan into it
///
/// The progress record claimed up front becomes the scan's record.
async fn create_playlist(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let handle = state.scans.progress().begin(&auth.user_id)?;

    let playlist = match create_target(&state, &auth).await {
        Ok(playlist) => playlist,
        Err(e) => {
            handle.release();
            return Err(e);
        }
    };

    state.scans.spawn(handle, &auth.access_token);

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "status": "started",
            "playlist_id": playlist.playlist_id,
            "name": playlist.name,
        })),
    ))
}

async fn create_target(state: &AppState, auth: &AuthUser) -> ApiResult<PlaylistResponse> {
    let playlist = state
        .spotify
        .authorized(auth.access_token.as_str())
        .create_playlist(&auth.user_id, &state.playlist_name, PLAYLIST_DESCRIPTION)
        .await?;

    state
        .scans
        .store()
        .set_target_playlist(&auth.user_id, &playlist.id)
        .await?;

    tracing::info!(user_id = %auth.user_id, playlist_id = %playlist.id, "Created target playlist");

    Ok(PlaylistResponse {
        playlist_id: playlist.id,
        name: playlist.name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("37i9dQZF1DXcBWIGoYBM5M")]
    #[case("spotify:playlist:37i9dQZF1DXcBWIGoYBM5M")]
    #[case("https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M")]
    #[case("https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M?si=abc123")]
    #[case("https://open.spotify.com/intl-de/playlist/37i9dQZF1DXcBWIGoYBM5M")]
    #[case("  37i9dQZF1DXcBWIGoYBM5M\n")]
    fn test_accepted_references(#[case] input: &str) {
        assert_eq!(
            parse_playlist_reference(input).as_deref(),
            Some("37i9dQZF1DXcBWIGoYBM5M")
        );
    }

    #[rstest]
    #[case("")]
    #[case("spotify:playlist:")]
    #[case("spotify:album:37i9dQZF1DXcBWIGoYBM5M")]
    #[case("https://example.com/playlist/37i9dQZF1DXcBWIGoYBM5M")]
    #[case("https://open.spotify.com/album/37i9dQZF1DXcBWIGoYBM5M")]
    #[case("my favourite playlist")]
    #[case("../../etc/passwd")]
    fn test_rejected_references(#[case] input: &str) {
        assert_eq!(parse_playlist_reference(input), None);
    }
}

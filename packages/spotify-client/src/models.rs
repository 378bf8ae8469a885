//! Spotify Web API response models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A podcast show the user has saved to their library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Show {
    /// Spotify show ID
    pub id: String,
    /// Show title
    pub name: String,
    /// Publisher name, if provided
    pub publisher: Option<String>,
    /// Number of episodes Spotify reports for the show
    pub total_episodes: u32,
}

/// A single podcast episode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    /// Spotify episode ID
    pub id: String,
    /// ID of the show the episode belongs to
    pub show_id: String,
    /// Episode title
    pub name: String,
    /// Release timestamp (midnight UTC of the first day the release date covers)
    pub released_at: DateTime<Utc>,
    /// Duration in whole seconds
    pub duration_secs: u64,
    /// Whether Spotify reports the episode as fully played
    pub played: bool,
}

impl Episode {
    /// Spotify URI used when adding the episode to a playlist
    pub fn uri(&self) -> String {
        episode_uri(&self.id)
    }
}

/// Build the `spotify:episode:` URI for an episode ID
pub fn episode_uri(id: &str) -> String {
    format!("spotify:episode:{}", id)
}

/// Kind of item stored in a playlist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaylistItemKind {
    Episode,
    Track,
}

/// An entry of a playlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistItem {
    /// Spotify ID of the episode or track
    pub id: String,
    /// Spotify URI of the episode or track
    pub uri: String,
    /// Whether the entry is an episode or a music track
    pub kind: PlaylistItemKind,
}

/// Playlist metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    /// Spotify playlist ID
    pub id: String,
    /// Playlist name
    pub name: String,
    /// ID of the owning user
    pub owner_id: String,
    /// Whether other users may edit the playlist
    pub collaborative: bool,
    /// Public visibility, when Spotify reports it
    pub public: Option<bool>,
}

impl Playlist {
    /// Check if the given user may rewrite this playlist
    pub fn is_writable_by(&self, user_id: &str) -> bool {
        self.owner_id == user_id || self.collaborative
    }
}

/// The signed-in Spotify user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Spotify user ID
    pub id: String,
    /// Display name, if set
    pub display_name: Option<String>,
}

/// Tokens granted by the accounts service for an authorization code
#[derive(Clone, Deserialize)]
pub struct TokenGrant {
    /// Bearer token for Web API calls
    pub access_token: String,
    /// Token type, always "Bearer"
    pub token_type: String,
    /// Space-separated granted scopes
    #[serde(default)]
    pub scope: String,
    /// Lifetime of the access token in seconds
    pub expires_in: u64,
    /// Refresh token, when granted
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl std::fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

// Internal response types for deserialization

/// One page of a paginated listing
#[derive(Debug, Deserialize)]
pub(crate) struct Page<T> {
    /// Unavailable entries come back as `null`
    #[serde(default = "Vec::new")]
    pub items: Vec<Option<T>>,
    /// Absolute URL of the next page
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawSavedShow {
    pub show: RawShow,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawShow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub total_episodes: u32,
}

impl From<RawShow> for Show {
    fn from(raw: RawShow) -> Self {
        Self {
            id: raw.id,
            name: raw.name,
            publisher: raw.publisher.filter(|s| !s.is_empty()),
            total_episodes: raw.total_episodes,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawEpisode {
    pub id: String,
    pub name: String,
    pub release_date: String,
    #[serde(default)]
    pub release_date_precision: Option<String>,
    pub duration_ms: u64,
    #[serde(default)]
    pub resume_point: Option<RawResumePoint>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawResumePoint {
    #[serde(default)]
    pub fully_played: bool,
}

impl RawEpisode {
    /// Attach the owning show and normalize the release date
    ///
    /// Returns `None` when the release date cannot be interpreted.
    pub fn into_episode(self, show_id: &str) -> Option<Episode> {
        let Some(released_at) =
            parse_release_date(&self.release_date, self.release_date_precision.as_deref())
        else {
            tracing::warn!(
                episode = %self.id,
                release_date = %self.release_date,
                "Skipping episode with unparseable release date"
            );
            return None;
        };

        Some(Episode {
            id: self.id,
            show_id: show_id.to_string(),
            name: self.name,
            released_at,
            duration_secs: self.duration_ms / 1000,
            played: self.resume_point.map(|r| r.fully_played).unwrap_or(false),
        })
    }
}

/// Interpret a release date at `day`, `month` or `year` precision
///
/// When the precision is missing it is inferred from the date's shape.
pub(crate) fn parse_release_date(date: &str, precision: Option<&str>) -> Option<DateTime<Utc>> {
    let date = date.trim();
    let precision = precision.unwrap_or(match date.len() {
        4 => "year",
        7 => "month",
        _ => "day",
    });

    let full = match precision {
        "year" => format!("{}-01-01", date),
        "month" => format!("{}-01", date),
        _ => date.to_string(),
    };

    NaiveDate::parse_from_str(&full, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawPlaylistItem {
    #[serde(default)]
    pub track: Option<RawPlayable>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawPlayable {
    /// Local files have no ID
    #[serde(default)]
    pub id: Option<String>,
    pub uri: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl RawPlaylistItem {
    pub fn into_item(self) -> Option<PlaylistItem> {
        let playable = self.track?;
        let kind = match playable.kind.as_str() {
            "episode" => PlaylistItemKind::Episode,
            "track" => PlaylistItemKind::Track,
            _ => return None,
        };
        Some(PlaylistItem {
            id: playable.id?,
            uri: playable.uri,
            kind,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawPlaylist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub collaborative: bool,
    #[serde(default)]
    pub public: Option<bool>,
    pub owner: RawOwner,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawOwner {
    pub id: String,
}

impl From<RawPlaylist> for Playlist {
    fn from(raw: RawPlaylist) -> Self {
        Self {
            id: raw.id,
            name: raw.name,
            owner_id: raw.owner.id,
            collaborative: raw.collaborative,
            public: raw.public,
        }
    }
}

/// Response of playlist mutations
#[derive(Debug, Deserialize)]
#[allow(dead_code)] // Required for serde deserialization
pub(crate) struct SnapshotResponse {
    pub snapshot_id: String,
}

/// Web API error envelope: `{"error": {"status": 401, "message": "..."}}`
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[allow(dead_code)] // Required for serde deserialization
    pub status: u16,
    pub message: String,
}

/// Accounts service error: `{"error": "invalid_grant", "error_description": "..."}`
#[derive(Debug, Deserialize)]
pub(crate) struct AuthErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

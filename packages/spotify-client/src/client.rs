//! Spotify Web API client implementation

use std::fmt;
use std::time::Duration;

use futures_util::{stream, Stream, StreamExt, TryStreamExt};
use podqueue_shared_config::SpotifyConfig;
use reqwest::{header::RETRY_AFTER, Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use crate::error::{SpotifyError, SpotifyResult};
use crate::models::{
    episode_uri, AuthErrorResponse, CurrentUser, Episode, ErrorResponse, Page, Playlist,
    PlaylistItem, RawEpisode, RawPlaylist, RawPlaylistItem, RawSavedShow, SnapshotResponse, Show,
};
use crate::retry::RetryPolicy;

/// Page size for show and episode listings (API maximum)
const SHOW_PAGE_LIMIT: u32 = 50;

/// Page size for playlist item listings (API maximum)
const PLAYLIST_PAGE_LIMIT: u32 = 100;

/// Maximum number of URIs accepted by a single playlist mutation
pub const PLAYLIST_WRITE_CHUNK: usize = 100;

/// Default connection timeout in seconds
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Maximum error body size kept in error messages
const MAX_ERROR_BODY_SIZE: usize = 500;

/// Spotify Web API client
///
/// A client without an access token can only be used to derive authorized
/// clients through [`SpotifyClient::authorized`]; the underlying connection
/// pool is shared between them.
#[derive(Clone)]
pub struct SpotifyClient {
    http_client: Client,
    config: SpotifyConfig,
    access_token: Option<String>,
    retry: RetryPolicy,
}

impl fmt::Debug for SpotifyClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpotifyClient")
            .field("api_url", &self.config.api_url)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("retry", &self.retry)
            .finish()
    }
}

impl SpotifyClient {
    /// Create a new client from configuration
    pub fn new(config: &SpotifyConfig) -> SpotifyResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .pool_max_idle_per_host(5)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent("Podqueue/1.0")
            .build()?;

        Ok(Self::with_client(config, http_client))
    }

    /// Create a client with custom HTTP client (for testing)
    pub fn with_client(config: &SpotifyConfig, http_client: Client) -> Self {
        Self {
            http_client,
            config: config.clone(),
            access_token: None,
            retry: RetryPolicy::with_attempts(config.max_retries),
        }
    }

    /// Replace the retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Derive a client that acts on behalf of a user
    pub fn authorized(&self, access_token: impl Into<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            ..self.clone()
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &SpotifyConfig {
        &self.config
    }

    /// Get the retry policy
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub(crate) fn http_client(&self) -> &Client {
        &self.http_client
    }

    /// Validate a Spotify (base-62) identifier
    pub(crate) fn validate_id<'a>(kind: &str, id: &'a str) -> SpotifyResult<&'a str> {
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(SpotifyError::InvalidInput(format!("{} id cannot be empty", kind)));
        }
        if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(SpotifyError::InvalidInput(format!(
                "{} id '{}' contains invalid characters",
                kind, trimmed
            )));
        }
        Ok(trimmed)
    }

    /// Truncate error body to keep error messages bounded
    fn truncate_error_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_SIZE {
            return body.to_string();
        }
        let truncate_at = body
            .char_indices()
            .map(|(i, _)| i)
            .take_while(|i| *i <= MAX_ERROR_BODY_SIZE)
            .last()
            .unwrap_or(0);
        format!("{}... (truncated)", &body[..truncate_at])
    }

    /// Extract a human-readable message from an error body
    fn error_message(body: &str) -> String {
        if let Ok(error) = serde_json::from_str::<ErrorResponse>(body) {
            return error.error.message;
        }
        if let Ok(error) = serde_json::from_str::<AuthErrorResponse>(body) {
            return match error.error_description {
                Some(description) => format!("{}: {}", error.error, description),
                None => error.error,
            };
        }
        Self::truncate_error_body(body)
    }

    /// Map a transport failure to the client's error taxonomy
    pub(crate) fn map_send_error(e: reqwest::Error) -> SpotifyError {
        if e.is_timeout() {
            SpotifyError::Timeout
        } else if e.is_connect() {
            SpotifyError::Transient(format!("connection failed: {}", e))
        } else {
            SpotifyError::Http(e)
        }
    }

    /// Turn a response into its body text, classifying error statuses
    pub(crate) async fn read_response(response: Response) -> SpotifyResult<String> {
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            warn!(retry_after_secs = ?retry_after.map(|d| d.as_secs()), "Spotify API rate limited");
            return Err(SpotifyError::RateLimited { retry_after });
        }

        let body = response.text().await.map_err(Self::map_send_error)?;
        if status.is_success() {
            return Ok(body);
        }

        let message = Self::error_message(&body);
        Err(match status {
            StatusCode::UNAUTHORIZED => SpotifyError::Unauthorized(message),
            StatusCode::FORBIDDEN => SpotifyError::Forbidden(message),
            StatusCode::NOT_FOUND => SpotifyError::NotFound(message),
            s if s.is_server_error() => {
                SpotifyError::Transient(format!("status {}: {}", s.as_u16(), message))
            }
            s => SpotifyError::Api {
                status: s.as_u16(),
                message,
            },
        })
    }

    /// Issue a single authenticated request (no retry)
    async fn send_once<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        token: &str,
        body: Option<&Value>,
    ) -> SpotifyResult<T> {
        let mut request = self.http_client.request(method, url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(Self::map_send_error)?;
        let text = Self::read_response(response).await?;
        let text = if text.trim().is_empty() { "null" } else { text.as_str() };
        Ok(serde_json::from_str(text)?)
    }

    /// Issue an authenticated request under the retry policy
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> SpotifyResult<T> {
        let token = self
            .access_token
            .as_deref()
            .ok_or(SpotifyError::MissingAccessToken)?;

        self.retry
            .run(|| self.send_once(method.clone(), url, token, body))
            .await
    }

    /// One unretried pass of a playlist replacement
    async fn write_chunks(&self, url: &str, token: &str, uris: &[String]) -> SpotifyResult<()> {
        let mut chunks = uris.chunks(PLAYLIST_WRITE_CHUNK);

        let first = chunks.next().unwrap_or(&[]);
        let _: SnapshotResponse = self
            .send_once(Method::PUT, url, token, Some(&json!({ "uris": first })))
            .await?;

        for chunk in chunks {
            let _: SnapshotResponse = self
                .send_once(Method::POST, url, token, Some(&json!({ "uris": chunk })))
                .await?;
        }
        Ok(())
    }

    /// Stream the items of a paginated listing, one page per element
    ///
    /// Each page is fetched under the retry policy and `next` links are
    /// followed until exhausted.
    fn pages<'a, R>(&'a self, first_url: String) -> impl Stream<Item = SpotifyResult<Vec<R>>> + 'a
    where
        R: DeserializeOwned + 'a,
    {
        stream::try_unfold(Some(first_url), move |next_url| async move {
            let Some(url) = next_url else {
                return Ok(None);
            };
            debug!(url = %url, "Fetching Spotify page");
            let page: Page<R> = self.request(Method::GET, &url, None).await?;
            let items: Vec<R> = page.items.into_iter().flatten().collect();
            Ok(Some((items, page.next)))
        })
    }

    /// Get the profile of the signed-in user
    #[instrument(skip(self))]
    pub async fn current_user(&self) -> SpotifyResult<CurrentUser> {
        let url = self.config.api_endpoint("me");
        self.request(Method::GET, &url, None).await
    }

    /// List every show saved in the user's library
    #[instrument(skip(self))]
    pub async fn list_saved_shows(&self) -> SpotifyResult<Vec<Show>> {
        let url = self
            .config
            .api_endpoint(&format!("me/shows?limit={}", SHOW_PAGE_LIMIT));

        let shows: Vec<Show> = self
            .pages::<RawSavedShow>(url)
            .map_ok(|page| page.into_iter().map(|saved| Show::from(saved.show)).collect::<Vec<_>>())
            .try_concat()
            .await?;

        debug!(show_count = shows.len(), "Fetched saved shows");
        Ok(shows)
    }

    /// Lazily stream every episode of a show, newest first as Spotify orders them
    pub fn episodes<'a>(
        &'a self,
        show_id: &'a str,
    ) -> impl Stream<Item = SpotifyResult<Episode>> + 'a {
        let first_url = Self::validate_id("show", show_id).map(|id| {
            self.config
                .api_endpoint(&format!("shows/{}/episodes?limit={}", id, SHOW_PAGE_LIMIT))
        });

        let pages = match first_url {
            Ok(url) => self.pages::<RawEpisode>(url).left_stream(),
            Err(e) => stream::once(async move { Err::<Vec<RawEpisode>, SpotifyError>(e) }).right_stream(),
        };

        pages
            .map_ok(move |items| {
                stream::iter(
                    items
                        .into_iter()
                        .filter_map(move |raw| raw.into_episode(show_id))
                        .map(Ok::<Episode, SpotifyError>),
                )
            })
            .try_flatten()
    }

    /// Fetch all episodes of a show
    #[instrument(skip(self))]
    pub async fn list_episodes(&self, show_id: &str) -> SpotifyResult<Vec<Episode>> {
        self.episodes(show_id).try_collect().await
    }

    /// Get playlist metadata
    #[instrument(skip(self))]
    pub async fn playlist(&self, playlist_id: &str) -> SpotifyResult<Playlist> {
        let id = Self::validate_id("playlist", playlist_id)?;
        let url = self.config.api_endpoint(&format!("playlists/{}", id));
        let raw: RawPlaylist = self.request(Method::GET, &url, None).await?;
        Ok(raw.into())
    }

    /// List every item of a playlist, in playlist order
    #[instrument(skip(self))]
    pub async fn playlist_items(&self, playlist_id: &str) -> SpotifyResult<Vec<PlaylistItem>> {
        let id = Self::validate_id("playlist", playlist_id)?;
        let url = self.config.api_endpoint(&format!(
            "playlists/{}/tracks?limit={}",
            id, PLAYLIST_PAGE_LIMIT
        ));

        self.pages::<RawPlaylistItem>(url)
            .map_ok(|page| {
                page.into_iter()
                    .filter_map(RawPlaylistItem::into_item)
                    .collect::<Vec<_>>()
            })
            .try_concat()
            .await
    }

    /// Create a private playlist owned by `user_id`
    #[instrument(skip(self, description))]
    pub async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        description: &str,
    ) -> SpotifyResult<Playlist> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SpotifyError::InvalidInput(
                "playlist name cannot be empty".to_string(),
            ));
        }

        let url = self.config.api_endpoint(&format!("users/{}/playlists", user_id));
        let body = json!({
            "name": name,
            "public": false,
            "description": description,
        });

        let raw: RawPlaylist = self.request(Method::POST, &url, Some(&body)).await?;
        debug!(playlist_id = %raw.id, "Created playlist");
        Ok(raw.into())
    }

    /// Replace the whole playlist with the given episodes, in order
    ///
    /// The first chunk replaces the existing contents (an empty list clears
    /// the playlist); further chunks are appended. The retry policy covers
    /// the sequence as a whole, so every attempt starts over with the
    /// replacing chunk and an append is never repeated on its own.
    #[instrument(skip(self, episode_ids), fields(count = episode_ids.len()))]
    pub async fn replace_playlist_items(
        &self,
        playlist_id: &str,
        episode_ids: &[String],
    ) -> SpotifyResult<()> {
        let id = Self::validate_id("playlist", playlist_id)?;
        let uris = episode_ids
            .iter()
            .map(|episode_id| Self::validate_id("episode", episode_id).map(episode_uri))
            .collect::<SpotifyResult<Vec<String>>>()?;
        let token = self
            .access_token
            .as_deref()
            .ok_or(SpotifyError::MissingAccessToken)?;

        let url = self.config.api_endpoint(&format!("playlists/{}/tracks", id));
        self.retry
            .run(|| self.write_chunks(&url, token, &uris))
            .await?;

        debug!(playlist_id = %id, item_count = uris.len(), "Replaced playlist items");
        Ok(())
    }
}

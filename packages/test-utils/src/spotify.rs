//! Mock Spotify server for testing catalog reads and playlist writes
//!
//! Web API routes are served under `/v1` and the accounts service at the
//! root, matching `SpotifyConfig::with_base_url`.

use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

/// Default page size used by the paginated mocks
const DEFAULT_PAGE_SIZE: usize = 50;

/// Matches requests whose `offset` query parameter (default 0) equals a value
struct OffsetIs(usize);

impl Match for OffsetIs {
    fn matches(&self, request: &Request) -> bool {
        let offset = request
            .url
            .query_pairs()
            .find(|(key, _)| key == "offset")
            .and_then(|(_, value)| value.parse::<usize>().ok())
            .unwrap_or(0);
        offset == self.0
    }
}

/// A playlist mutation received by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistWrite {
    /// `PUT` for a replace, `POST` for an append
    pub method: String,
    /// URIs carried by the request body
    pub uris: Vec<String>,
}

/// Mock Spotify server
///
/// Wraps a [`wiremock::MockServer`] with helpers for the endpoints the
/// curation pipeline uses. Listings are paginated with absolute `next`
/// links so that clients exercise their paging logic.
pub struct MockSpotifyServer {
    server: MockServer,
}

impl MockSpotifyServer {
    /// Start a new mock server
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Get the server URL
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Mount one mock per page of a listing
    async fn mount_pages(&self, list_path: &str, items: Vec<Value>, page_size: usize) {
        let page_size = page_size.max(1);
        let total = items.len();
        let chunks: Vec<Vec<Value>> = if items.is_empty() {
            vec![Vec::new()]
        } else {
            items.chunks(page_size).map(|c| c.to_vec()).collect()
        };

        for (index, chunk) in chunks.into_iter().enumerate() {
            let offset = index * page_size;
            let next = if offset + page_size < total {
                json!(format!(
                    "{}{}?offset={}&limit={}",
                    self.server.uri(),
                    list_path,
                    offset + page_size,
                    page_size
                ))
            } else {
                Value::Null
            };

            Mock::given(method("GET"))
                .and(path(list_path))
                .and(OffsetIs(offset))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "items": chunk,
                    "next": next,
                    "offset": offset,
                    "limit": page_size,
                    "total": total,
                })))
                .mount(&self.server)
                .await;
        }
    }

    /// Mount a mock for the signed-in user's profile
    pub async fn mock_current_user(&self, user_id: &str) {
        Mock::given(method("GET"))
            .and(path("/v1/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": user_id,
                "display_name": format!("User {}", user_id),
                "type": "user",
            })))
            .mount(&self.server)
            .await;
    }

    /// Mount a mock for the saved shows listing
    pub async fn mock_saved_shows(&self, shows: Vec<ShowFixture>) {
        self.mock_saved_shows_paged(shows, DEFAULT_PAGE_SIZE).await;
    }

    /// Mount a mock for the saved shows listing with a custom page size
    pub async fn mock_saved_shows_paged(&self, shows: Vec<ShowFixture>, page_size: usize) {
        let items = shows
            .iter()
            .map(|show| json!({ "added_at": "2024-01-01T00:00:00Z", "show": show.to_json() }))
            .collect();
        self.mount_pages("/v1/me/shows", items, page_size).await;
    }

    /// Mount a mock for the episode listing of a show
    pub async fn mock_show_episodes(&self, show_id: &str, episodes: Vec<EpisodeFixture>) {
        self.mock_show_episodes_paged(show_id, episodes, DEFAULT_PAGE_SIZE)
            .await;
    }

    /// Mount a mock for the episode listing of a show with a custom page size
    pub async fn mock_show_episodes_paged(
        &self,
        show_id: &str,
        episodes: Vec<EpisodeFixture>,
        page_size: usize,
    ) {
        let items = episodes.iter().map(EpisodeFixture::to_json).collect();
        self.mount_pages(&format!("/v1/shows/{}/episodes", show_id), items, page_size)
            .await;
    }

    /// Mount a mock returning `status` for the episode listing of a show
    pub async fn mock_show_episodes_error(&self, show_id: &str, status: u16) {
        Mock::given(method("GET"))
            .and(path(format!("/v1/shows/{}/episodes", show_id)))
            .respond_with(ResponseTemplate::new(status).set_body_json(error_body(
                status,
                "Service unavailable",
            )))
            .mount(&self.server)
            .await;
    }

    /// Mount a mock for playlist metadata
    pub async fn mock_playlist(&self, playlist_id: &str, owner_id: &str, collaborative: bool) {
        Mock::given(method("GET"))
            .and(path(format!("/v1/playlists/{}", playlist_id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(playlist_json(
                playlist_id,
                "Queue",
                owner_id,
                collaborative,
            )))
            .mount(&self.server)
            .await;
    }

    /// Like [`Self::mock_playlist`] but the response arrives after `delay`
    pub async fn mock_slow_playlist(&self, playlist_id: &str, owner_id: &str, delay: Duration) {
        Mock::given(method("GET"))
            .and(path(format!("/v1/playlists/{}", playlist_id)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(playlist_json(playlist_id, "Queue", owner_id, false))
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
    }

    /// Mount a 404 for playlist metadata
    pub async fn mock_playlist_not_found(&self, playlist_id: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/v1/playlists/{}", playlist_id)))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(error_body(404, "Resource not found")),
            )
            .mount(&self.server)
            .await;
    }

    /// Mount a mock for the playlist item listing
    pub async fn mock_playlist_items(&self, playlist_id: &str, episode_ids: &[&str]) {
        let items = episode_ids
            .iter()
            .map(|id| {
                json!({
                    "added_at": "2024-01-01T00:00:00Z",
                    "track": { "id": id, "uri": format!("spotify:episode:{}", id), "type": "episode" },
                })
            })
            .collect();
        self.mount_pages(&format!("/v1/playlists/{}/tracks", playlist_id), items, 100)
            .await;
    }

    /// Mount a mock for playlist creation
    pub async fn mock_create_playlist(&self, user_id: &str, playlist_id: &str) {
        Mock::given(method("POST"))
            .and(path(format!("/v1/users/{}/playlists", user_id)))
            .respond_with(ResponseTemplate::new(201).set_body_json(playlist_json(
                playlist_id,
                "My Smart Podcast Queue",
                user_id,
                false,
            )))
            .mount(&self.server)
            .await;
    }

    /// Mount mocks accepting replace and append writes to a playlist
    pub async fn mock_replace_items(&self, playlist_id: &str) {
        let tracks_path = format!("/v1/playlists/{}/tracks", playlist_id);
        for verb in ["PUT", "POST"] {
            Mock::given(method(verb))
                .and(path(tracks_path.as_str()))
                .respond_with(
                    ResponseTemplate::new(201).set_body_json(json!({ "snapshot_id": "snapshot" })),
                )
                .mount(&self.server)
                .await;
        }
    }

    /// Mount mocks rejecting every write to a playlist with `status`
    pub async fn mock_replace_failure(&self, playlist_id: &str, status: u16) {
        let tracks_path = format!("/v1/playlists/{}/tracks", playlist_id);
        for verb in ["PUT", "POST"] {
            Mock::given(method(verb))
                .and(path(tracks_path.as_str()))
                .respond_with(
                    ResponseTemplate::new(status).set_body_json(error_body(status, "Write failed")),
                )
                .mount(&self.server)
                .await;
        }
    }

    /// Accept the next append to a playlist but answer it only after `delay`
    ///
    /// Simulates an append that Spotify applied while the client gave up
    /// waiting. Must be mounted before [`Self::mock_replace_items`].
    pub async fn mock_slow_append(&self, playlist_id: &str, delay: Duration) {
        Mock::given(method("POST"))
            .and(path(format!("/v1/playlists/{}/tracks", playlist_id)))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(json!({ "snapshot_id": "snapshot" }))
                    .set_delay(delay),
            )
            .up_to_n_times(1)
            .mount(&self.server)
            .await;
    }

    /// Answer the next `times` requests for `url_path` with 429
    ///
    /// Must be mounted before the success mock for the same route.
    pub async fn mock_rate_limited(&self, verb: &str, url_path: &str, times: u64, retry_after_secs: u64) {
        Mock::given(method(verb))
            .and(path(url_path))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("Retry-After", retry_after_secs.to_string().as_str())
                    .set_body_json(error_body(429, "API rate limit exceeded")),
            )
            .up_to_n_times(times)
            .mount(&self.server)
            .await;
    }

    /// Answer every Web API request with 401 (expired token)
    pub async fn mock_unauthorized(&self) {
        Mock::given(path_regex(r"^/v1/.*"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(error_body(401, "The access token expired")),
            )
            .mount(&self.server)
            .await;
    }

    /// Mount a successful authorization-code exchange
    pub async fn mock_token_exchange(&self, access_token: &str) {
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": access_token,
                "token_type": "Bearer",
                "scope": "user-library-read playlist-modify-private",
                "expires_in": 3600,
                "refresh_token": "refresh-token",
            })))
            .mount(&self.server)
            .await;
    }

    /// Mount a rejected authorization-code exchange
    pub async fn mock_token_exchange_failure(&self) {
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid authorization code",
            })))
            .mount(&self.server)
            .await;
    }

    /// Writes received for a playlist, in arrival order
    pub async fn playlist_writes(&self, playlist_id: &str) -> Vec<PlaylistWrite> {
        let tracks_path = format!("/v1/playlists/{}/tracks", playlist_id);
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|request| request.url.path() == tracks_path)
            .filter_map(|request| {
                let verb = request.method.to_string().to_uppercase();
                if verb != "PUT" && verb != "POST" {
                    return None;
                }
                let body: Value = serde_json::from_slice(&request.body).ok()?;
                let uris = body["uris"]
                    .as_array()?
                    .iter()
                    .filter_map(|uri| uri.as_str().map(str::to_string))
                    .collect();
                Some(PlaylistWrite { method: verb, uris })
            })
            .collect()
    }

    /// Playlist contents after replaying every received write in order
    ///
    /// A `PUT` replaces the contents and a `POST` appends, whatever the
    /// response was.
    pub async fn playlist_contents(&self, playlist_id: &str) -> Vec<String> {
        let mut contents = Vec::new();
        for write in self.playlist_writes(playlist_id).await {
            if write.method == "PUT" {
                contents.clear();
            }
            contents.extend(write.uris);
        }
        contents
    }

    /// Number of requests received for a path
    pub async fn request_count(&self, url_path: &str) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path() == url_path)
            .count()
    }
}

fn error_body(status: u16, message: &str) -> Value {
    json!({ "error": { "status": status, "message": message } })
}

fn playlist_json(id: &str, name: &str, owner_id: &str, collaborative: bool) -> Value {
    json!({
        "id": id,
        "name": name,
        "collaborative": collaborative,
        "public": false,
        "owner": { "id": owner_id, "type": "user" },
        "uri": format!("spotify:playlist:{}", id),
    })
}

/// Show fixture for saved-shows listings
#[derive(Debug, Clone)]
pub struct ShowFixture {
    pub id: String,
    pub name: String,
    pub publisher: String,
    pub total_episodes: u32,
}

impl ShowFixture {
    /// Create a show fixture
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            publisher: format!("{} Media", name),
            total_episodes: 0,
        }
    }

    /// Convert to JSON value
    pub fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "publisher": self.publisher,
            "total_episodes": self.total_episodes,
            "type": "show",
        })
    }
}

/// Episode fixture for show episode listings
#[derive(Debug, Clone)]
pub struct EpisodeFixture {
    pub id: String,
    pub name: String,
    pub release_date: String,
    pub release_date_precision: String,
    pub duration_ms: u64,
    pub fully_played: bool,
}

impl EpisodeFixture {
    /// Create an unplayed episode released on `release_date` (YYYY-MM-DD)
    pub fn new(id: &str, release_date: &str, duration_secs: u64) -> Self {
        Self {
            id: id.to_string(),
            name: format!("Episode {}", id),
            release_date: release_date.to_string(),
            release_date_precision: "day".to_string(),
            duration_ms: duration_secs * 1000,
            fully_played: false,
        }
    }

    /// Mark the episode as fully played
    pub fn played(mut self) -> Self {
        self.fully_played = true;
        self
    }

    /// Override the title
    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Convert to JSON value
    pub fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "release_date": self.release_date,
            "release_date_precision": self.release_date_precision,
            "duration_ms": self.duration_ms,
            "type": "episode",
            "resume_point": {
                "fully_played": self.fully_played,
                "resume_position_ms": 0,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_paginated_episodes_link_pages() {
        let server = MockSpotifyServer::start().await;
        let episodes = (0..5)
            .map(|i| EpisodeFixture::new(&format!("e{}", i), "2024-01-01", 60))
            .collect();
        server.mock_show_episodes_paged("show1", episodes, 2).await;

        let client = reqwest::Client::new();
        let mut url = Some(format!("{}/v1/shows/show1/episodes?limit=50", server.url()));
        let mut seen = 0;
        let mut pages = 0;
        while let Some(current) = url {
            let body: Value = client.get(&current).send().await.unwrap().json().await.unwrap();
            seen += body["items"].as_array().unwrap().len();
            pages += 1;
            url = body["next"].as_str().map(str::to_string);
        }

        assert_eq!(seen, 5);
        assert_eq!(pages, 3);
    }

    #[tokio::test]
    async fn test_playlist_writes_are_recorded() {
        let server = MockSpotifyServer::start().await;
        server.mock_replace_items("pl1").await;

        let client = reqwest::Client::new();
        client
            .put(format!("{}/v1/playlists/pl1/tracks", server.url()))
            .json(&json!({ "uris": ["spotify:episode:a"] }))
            .send()
            .await
            .unwrap();

        let writes = server.playlist_writes("pl1").await;
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].method, "PUT");
        assert_eq!(writes[0].uris, vec!["spotify:episode:a".to_string()]);
    }

    #[tokio::test]
    async fn test_rate_limit_then_success() {
        let server = MockSpotifyServer::start().await;
        server.mock_rate_limited("GET", "/v1/me", 1, 2).await;
        server.mock_current_user("alice").await;

        let client = reqwest::Client::new();
        let first = client.get(format!("{}/v1/me", server.url())).send().await.unwrap();
        assert_eq!(first.status().as_u16(), 429);
        assert_eq!(first.headers()["retry-after"], "2");

        let second = client.get(format!("{}/v1/me", server.url())).send().await.unwrap();
        assert!(second.status().is_success());
    }
}

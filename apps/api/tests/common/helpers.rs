//! Test helper functions for API integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use podqueue_api::models::ScanStage;
use podqueue_api::repositories::{InMemoryScanStateStore, ScanStateStore};
use podqueue_api::{api_router, AppState, ScanService, SessionService};
use podqueue_shared_config::{CurationConfig, SpotifyConfig};
use podqueue_spotify_client::{RetryPolicy, SpotifyClient};
use podqueue_test_utils::MockSpotifyServer;
use serde_json::Value;

pub const TEST_SESSION_SECRET: &str = "integration-test-session-secret-0123456789";
pub const TEST_USER: &str = "alice";
pub const TEST_TOKEN: &str = "spotify-access-token";
pub const TEST_PLAYLIST: &str = "queue1";

/// Application assembled against a mock Spotify server
pub struct TestApp {
    pub spotify: MockSpotifyServer,
    pub store: Arc<InMemoryScanStateStore>,
    pub state: AppState,
}

impl TestApp {
    pub async fn start() -> Self {
        Self::with_curation(CurationConfig::default()).await
    }

    pub async fn with_curation(curation: CurationConfig) -> Self {
        let spotify = MockSpotifyServer::start().await;
        let client = SpotifyClient::new(&SpotifyConfig::with_base_url(spotify.url()))
            .expect("client")
            .with_retry_policy(RetryPolicy::immediate(2));
        let store = Arc::new(InMemoryScanStateStore::new());
        let state = AppState::new(
            client,
            SessionService::new(TEST_SESSION_SECRET),
            store.clone() as Arc<dyn ScanStateStore>,
            "memory",
            &curation,
        );
        Self {
            spotify,
            store,
            state,
        }
    }

    pub fn router(&self) -> Router {
        api_router(self.state.clone())
    }

    pub fn scans(&self) -> &ScanService {
        &self.state.scans
    }

    /// Session token for `user_id`
    pub fn session_token(&self, user_id: &str) -> String {
        self.state
            .sessions
            .issue_session(user_id, TEST_TOKEN, 3600)
            .expect("session")
            .0
    }

    /// Point the test user's queue at `TEST_PLAYLIST`
    pub async fn with_target_playlist(&self) {
        self.store
            .set_target_playlist(TEST_USER, TEST_PLAYLIST)
            .await
            .expect("set playlist");
    }

    /// Wait until the user's scan reaches a terminal stage
    pub async fn wait_for_outcome(&self, user_id: &str) -> ScanStage {
        for _ in 0..200 {
            let stage = self.scans().progress().poll(user_id);
            if stage.is_terminal() {
                return stage;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("scan did not finish in time");
    }
}

/// Build a request with an optional bearer token and JSON body
pub fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Read a response body as JSON
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Episode URIs for a list of IDs
pub fn uris(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| format!("spotify:episode:{}", id)).collect()
}

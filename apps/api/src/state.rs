//! Shared application state for route handlers

use std::sync::Arc;

use podqueue_shared_config::CurationConfig;
use podqueue_spotify_client::SpotifyClient;

use crate::repositories::ScanStateStore;
use crate::services::{HealthService, ScanService, SessionService};

/// State shared by every router
#[derive(Clone)]
pub struct AppState {
    /// Client without a user token; handlers derive authorized copies
    pub spotify: SpotifyClient,
    pub sessions: SessionService,
    pub scans: ScanService,
    pub health: HealthService,
    /// Name for playlists created through setup
    pub playlist_name: Arc<str>,
}

impl AppState {
    /// Wire the services together
    pub fn new(
        spotify: SpotifyClient,
        sessions: SessionService,
        store: Arc<dyn ScanStateStore>,
        backend: &'static str,
        curation: &CurationConfig,
    ) -> Self {
        let health = HealthService::new(
            Arc::clone(&store),
            backend,
            spotify.config().has_credentials(),
        );
        let scans = ScanService::new(spotify.clone(), store, curation);

        Self {
            spotify,
            sessions,
            scans,
            health,
            playlist_name: Arc::from(curation.playlist_name.as_str()),
        }
    }
}

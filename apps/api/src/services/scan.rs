//! Scan orchestration: fetch, classify, plan, write, commit
//!
//! A scan reads the user's stored state, walks the catalog, writes
//! `new ++ batch` to the target playlist and then commits the new state in
//! one step. Any failure before the commit leaves the stored state as it
//! was.

use std::sync::Arc;

use chrono::Utc;
use podqueue_shared_config::CurationConfig;
use podqueue_spotify_client::{SpotifyClient, SpotifyError};
use thiserror::Error;
use tracing::{error, info, Instrument};

use crate::models::{ScanCommit, ScanSummary};
use crate::repositories::ScanStateStore;
use crate::services::catalog::fetch_catalog;
use crate::services::classifier::{classify, watermark_for, ClassificationRules};
use crate::services::planner::{next_batch, BandLayout};
use crate::services::progress::{ProgressHandle, ProgressRegistry};
use crate::services::writer::{queue_order, write_queue};

/// Scan pipeline errors
#[derive(Error, Debug)]
pub enum ScanError {
    /// A scan for this user is still running
    #[error("a scan is already running for this user")]
    ScanAlreadyRunning,

    /// No target playlist has been set up
    #[error("no target playlist is configured")]
    MissingPlaylist,

    /// Spotify rejected the user's token
    #[error("Spotify session expired: {0}")]
    Unauthorized(String),

    /// Reading the catalog failed after retries
    #[error("scan failed: {0}")]
    ScanFailed(String),

    /// Replacing the playlist contents failed
    #[error("playlist write failed: {0}")]
    WriteFailed(String),

    /// Scan state could not be read or committed
    #[error("scan state error: {0}")]
    Store(#[from] sqlx::Error),
}

impl From<SpotifyError> for ScanError {
    fn from(err: SpotifyError) -> Self {
        if err.requires_reauthentication() {
            Self::Unauthorized(err.to_string())
        } else {
            Self::ScanFailed(err.to_string())
        }
    }
}

/// Result type for scan operations
pub type ScanResult<T> = Result<T, ScanError>;

/// Runs scans and tracks their progress
#[derive(Clone)]
pub struct ScanService {
    client: SpotifyClient,
    store: Arc<dyn ScanStateStore>,
    progress: ProgressRegistry,
    rules: ClassificationRules,
    layout: BandLayout,
}

impl ScanService {
    /// Create a scan service
    ///
    /// `client` carries no user token; each scan derives an authorized copy.
    pub fn new(client: SpotifyClient, store: Arc<dyn ScanStateStore>, curation: &CurationConfig) -> Self {
        Self {
            client,
            store,
            progress: ProgressRegistry::new(),
            rules: ClassificationRules::from_config(curation),
            layout: BandLayout::from_config(curation),
        }
    }

    pub fn store(&self) -> &Arc<dyn ScanStateStore> {
        &self.store
    }

    pub fn progress(&self) -> &ProgressRegistry {
        &self.progress
    }

    pub fn layout(&self) -> &BandLayout {
        &self.layout
    }

    /// Start a background scan for a user
    ///
    /// # Errors
    /// - `ScanError::MissingPlaylist` - If no target playlist is set
    /// - `ScanError::ScanAlreadyRunning` - If a scan is still in flight
    pub async fn start(&self, user_id: &str, access_token: &str) -> ScanResult<()> {
        let state = self.store.load(user_id).await?;
        if state.playlist_id.is_none() {
            return Err(ScanError::MissingPlaylist);
        }

        let handle = self.progress.begin(user_id)?;
        self.spawn(handle, access_token);
        Ok(())
    }

    /// Run a scan in the background on a record already claimed by `handle`
    pub fn spawn(&self, handle: ProgressHandle, access_token: &str) {
        let user_id = handle.user_id().to_string();
        let service = self.clone();
        let token = access_token.to_string();
        let span = tracing::info_span!("scan", user_id = %user_id);

        tokio::spawn(
            async move {
                // Outcome is reported through the progress record
                let _ = service.run(handle, &token).await;
            }
            .instrument(span),
        );

        info!(user_id = %user_id, "Scan started");
    }

    /// Run a scan to completion and report the outcome through `handle`
    pub async fn run(&self, handle: ProgressHandle, access_token: &str) -> ScanResult<ScanSummary> {
        let user_id = handle.user_id().to_string();
        match self.execute(&handle, access_token).await {
            Ok(summary) => {
                info!(
                    user_id = %user_id,
                    new = summary.new_count,
                    batch = summary.batch_count,
                    band = ?summary.batch_band,
                    "Scan complete"
                );
                handle.done(summary.clone());
                Ok(summary)
            }
            Err(e) => {
                error!(user_id = %user_id, error = %e, "Scan failed");
                handle.failed(e.to_string());
                Err(e)
            }
        }
    }

    async fn execute(&self, handle: &ProgressHandle, access_token: &str) -> ScanResult<ScanSummary> {
        let started_at = Utc::now();
        let user_id = handle.user_id();
        let client = self.client.authorized(access_token);

        let state = self.store.load(user_id).await?;
        let playlist_id = state.playlist_id.clone().ok_or(ScanError::MissingPlaylist)?;

        let catalog = fetch_catalog(&client, handle).await?;

        handle.classifying();
        let classification = classify(
            catalog.episodes,
            state.watermark,
            &state.queued_episode_ids,
            &self.rules,
        );

        handle.batch_planning();
        let batch = next_batch(&classification.backlog, state.band_pointer, &self.layout);
        let episode_ids = queue_order(&classification.new_episodes, batch.as_ref());

        handle.writing(episode_ids.len());
        write_queue(&client, &playlist_id, &episode_ids).await?;

        let summary = ScanSummary {
            shows_scanned: catalog.shows_scanned,
            new_count: classification.new_episodes.len(),
            batch_band: batch.as_ref().map(|b| b.band),
            batch_label: batch.as_ref().map(|b| self.layout.label(b.band)),
            batch_count: batch.as_ref().map(|b| b.episodes.len()).unwrap_or(0),
            excluded_count: classification.excluded.len(),
            total_count: episode_ids.len(),
            completed_at: Utc::now(),
        };

        let commit = ScanCommit {
            watermark: watermark_for(started_at),
            band_pointer: batch.as_ref().map(|b| b.band),
            queued_episode_ids: episode_ids,
            summary: summary.clone(),
        };
        self.store.commit_scan(user_id, &commit).await?;

        Ok(summary)
    }
}

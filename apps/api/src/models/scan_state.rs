//! Persisted per-user curation state
//!
//! A [`ScanState`] is read when a scan starts and replaced as a whole by a
//! [`ScanCommit`] when the scan succeeds. Setting a target playlist is the
//! only other mutation.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Curation state stored for one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanState {
    /// Spotify user ID
    pub user_id: String,
    /// Playlist the queue is written to
    pub playlist_id: Option<String>,
    /// Start time of the last successful scan; `None` before the first one
    pub watermark: Option<DateTime<Utc>>,
    /// Key of the duration band consumed by the last batch
    pub band_pointer: Option<u64>,
    /// Episodes already surfaced in the queue
    pub queued_episode_ids: BTreeSet<String>,
    /// Outcome of the last successful scan
    pub last_scan: Option<ScanSummary>,
}

impl ScanState {
    /// State of a user that has never configured anything
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            playlist_id: None,
            watermark: None,
            band_pointer: None,
            queued_episode_ids: BTreeSet::new(),
            last_scan: None,
        }
    }

    /// Apply a successful scan
    ///
    /// The watermark never moves backwards and a commit without a batch
    /// keeps the previous band pointer.
    pub fn apply(&mut self, commit: &ScanCommit) {
        self.watermark = Some(match self.watermark {
            Some(previous) => previous.max(commit.watermark),
            None => commit.watermark,
        });
        if let Some(band) = commit.band_pointer {
            self.band_pointer = Some(band);
        }
        self.queued_episode_ids
            .extend(commit.queued_episode_ids.iter().cloned());
        self.last_scan = Some(commit.summary.clone());
    }

    /// Point the queue at a new playlist and restart band rotation
    pub fn retarget(&mut self, playlist_id: impl Into<String>) {
        self.playlist_id = Some(playlist_id.into());
        self.band_pointer = None;
    }
}

/// Summary of a completed scan, shown to the user and stored as JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Shows walked during the scan
    pub shows_scanned: usize,
    /// Episodes released since the previous scan
    pub new_count: usize,
    /// Band key of the backlog batch, if one was selected
    pub batch_band: Option<u64>,
    /// Human-readable duration range of the batch band
    pub batch_label: Option<String>,
    /// Episodes taken from the backlog
    pub batch_count: usize,
    /// Episodes skipped as played, queued, blocklisted or too short
    pub excluded_count: usize,
    /// Episodes written to the playlist
    pub total_count: usize,
    /// When the scan finished
    pub completed_at: DateTime<Utc>,
}

/// Changes written atomically at the end of a successful scan
#[derive(Debug, Clone)]
pub struct ScanCommit {
    /// Scan start time; becomes the watermark unless an older scan left a later one
    pub watermark: DateTime<Utc>,
    /// Band consumed by this scan; `None` keeps the stored pointer
    pub band_pointer: Option<u64>,
    /// Episodes written to the playlist
    pub queued_episode_ids: Vec<String>,
    /// Summary stored as the last scan
    pub summary: ScanSummary,
}

/// Stored `scan_states` row
#[derive(Debug, Clone, FromRow)]
pub struct ScanStateRow {
    pub user_id: String,
    pub playlist_id: Option<String>,
    pub watermark: Option<DateTime<Utc>>,
    pub band_pointer: Option<i64>,
    pub last_scan: Option<sqlx::types::Json<ScanSummary>>,
}

impl ScanStateRow {
    /// Combine the row with its queued episode IDs
    pub fn into_state(self, queued_episode_ids: BTreeSet<String>) -> ScanState {
        ScanState {
            user_id: self.user_id,
            playlist_id: self.playlist_id,
            watermark: self.watermark,
            band_pointer: self.band_pointer.and_then(|b| u64::try_from(b).ok()),
            queued_episode_ids,
            last_scan: self.last_scan.map(|json| json.0),
        }
    }
}

/// State summary returned by `GET /scan/state`
#[derive(Debug, Clone, Serialize)]
pub struct ScanStateView {
    pub playlist_id: Option<String>,
    pub watermark: Option<DateTime<Utc>>,
    pub band_pointer: Option<u64>,
    pub queued_count: usize,
    pub last_scan: Option<ScanSummary>,
}

impl From<&ScanState> for ScanStateView {
    fn from(state: &ScanState) -> Self {
        Self {
            playlist_id: state.playlist_id.clone(),
            watermark: state.watermark,
            band_pointer: state.band_pointer,
            queued_count: state.queued_episode_ids.len(),
            last_scan: state.last_scan.clone(),
        }
    }
}

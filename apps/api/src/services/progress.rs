//! Per-user scan progress registry
//!
//! Each user has at most one record. A running scan owns the only
//! [`ProgressHandle`] for its record and is the only writer; pollers read
//! through [`ProgressRegistry::poll`], which clears terminal records once
//! they have been observed.

use std::sync::Arc;

use dashmap::{mapref::entry::Entry, DashMap};

use crate::models::{ScanStage, ScanSummary};
use crate::services::scan::{ScanError, ScanResult};

/// Reason recorded when a scan ends without reporting an outcome
pub const ABORTED_REASON: &str = "scan aborted";

/// Shared registry of scan progress records keyed by user ID
#[derive(Debug, Clone, Default)]
pub struct ProgressRegistry {
    records: Arc<DashMap<String, ScanStage>>,
}

impl ProgressRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the record of a user for a new scan
    ///
    /// # Errors
    /// `ScanError::ScanAlreadyRunning` while an earlier scan for the user
    /// has not reached `Done` or `Failed`
    pub fn begin(&self, user_id: &str) -> ScanResult<ProgressHandle> {
        match self.records.entry(user_id.to_string()) {
            Entry::Occupied(mut entry) => {
                if !entry.get().is_terminal() {
                    return Err(ScanError::ScanAlreadyRunning);
                }
                entry.insert(ScanStage::Starting);
            }
            Entry::Vacant(entry) => {
                entry.insert(ScanStage::Starting);
            }
        }

        Ok(ProgressHandle {
            registry: self.clone(),
            user_id: user_id.to_string(),
            finished: false,
        })
    }

    /// Check if a scan is in flight for the user
    pub fn is_running(&self, user_id: &str) -> bool {
        self.records
            .get(user_id)
            .map(|stage| !stage.is_terminal())
            .unwrap_or(false)
    }

    /// Read the current stage
    ///
    /// A terminal stage is returned once and then cleared, so the next poll
    /// reports `Idle`.
    pub fn poll(&self, user_id: &str) -> ScanStage {
        if let Some((_, stage)) = self.records.remove_if(user_id, |_, stage| stage.is_terminal()) {
            return stage;
        }
        self.records
            .get(user_id)
            .map(|stage| stage.clone())
            .unwrap_or_default()
    }

    fn set(&self, user_id: &str, stage: ScanStage) {
        self.records.insert(user_id.to_string(), stage);
    }

    fn update<F>(&self, user_id: &str, f: F)
    where
        F: FnOnce(&ScanStage) -> ScanStage,
    {
        if let Some(mut stage) = self.records.get_mut(user_id) {
            let next = f(stage.value());
            *stage.value_mut() = next;
        }
    }
}

/// Write access to one user's progress record, owned by the running scan
///
/// Dropping the handle before `done` or `failed` records
/// `Failed { reason: "scan aborted" }`.
#[derive(Debug)]
pub struct ProgressHandle {
    registry: ProgressRegistry,
    user_id: String,
    finished: bool,
}

impl ProgressHandle {
    /// User the handle reports for
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn fetching_shows(&self) {
        self.registry.set(&self.user_id, ScanStage::FetchingShows);
    }

    /// Report that `processed` of `total` shows have been walked
    ///
    /// The processed counter never decreases.
    pub fn fetching_episodes(&self, processed: usize, total: usize, show: &str) {
        self.registry.update(&self.user_id, |current| {
            let floor = match current {
                ScanStage::FetchingEpisodes { processed, .. } => *processed,
                _ => 0,
            };
            ScanStage::FetchingEpisodes {
                processed: processed.max(floor),
                total,
                show: show.to_string(),
            }
        });
    }

    pub fn classifying(&self) {
        self.registry.set(&self.user_id, ScanStage::Classifying);
    }

    pub fn batch_planning(&self) {
        self.registry.set(&self.user_id, ScanStage::BatchPlanning);
    }

    pub fn writing(&self, episodes: usize) {
        self.registry
            .set(&self.user_id, ScanStage::Writing { episodes });
    }

    /// Record success
    pub fn done(mut self, summary: ScanSummary) {
        self.finished = true;
        self.registry
            .set(&self.user_id, ScanStage::Done { summary });
    }

    /// Give the record back without an outcome
    ///
    /// Used when the slot was claimed for playlist setup rather than a scan;
    /// the next poll reports `Idle`.
    pub fn release(mut self) {
        self.finished = true;
        self.registry.records.remove(&self.user_id);
    }

    /// Record failure
    pub fn failed(mut self, reason: impl Into<String>) {
        self.finished = true;
        self.registry.set(
            &self.user_id,
            ScanStage::Failed {
                reason: reason.into(),
            },
        );
    }
}

impl Drop for ProgressHandle {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!(user_id = %self.user_id, "Scan ended without an outcome");
            self.registry.set(
                &self.user_id,
                ScanStage::Failed {
                    reason: ABORTED_REASON.to_string(),
                },
            );
        }
    }
}

//! Scan progress stages and their polled JSON form

use serde::Serialize;

use super::scan_state::ScanSummary;

/// Stage of a user's scan as seen by pollers
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScanStage {
    /// No scan recorded
    #[default]
    Idle,
    Starting,
    FetchingShows,
    FetchingEpisodes {
        processed: usize,
        total: usize,
        show: String,
    },
    Classifying,
    BatchPlanning,
    Writing {
        episodes: usize,
    },
    Done {
        summary: ScanSummary,
    },
    Failed {
        reason: String,
    },
}

impl ScanStage {
    /// Check if the scan has finished, successfully or not
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Failed { .. })
    }

    /// Stable machine-readable stage name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::FetchingShows => "fetching_shows",
            Self::FetchingEpisodes { .. } => "fetching_episodes",
            Self::Classifying => "classifying",
            Self::BatchPlanning => "batch_planning",
            Self::Writing { .. } => "writing",
            Self::Done { .. } => "done",
            Self::Failed { .. } => "failed",
        }
    }

    /// Human-readable description of the stage
    pub fn message(&self) -> String {
        match self {
            Self::Idle => "No scan running".to_string(),
            Self::Starting => "Starting update...".to_string(),
            Self::FetchingShows => "Fetching saved shows...".to_string(),
            Self::FetchingEpisodes {
                processed,
                total,
                show,
            } if show.is_empty() => format!("({}/{}) Scanning shows", processed, total),
            Self::FetchingEpisodes {
                processed,
                total,
                show,
            } => format!("({}/{}) Scanned: {}", processed, total, show),
            Self::Classifying => "Sorting new episodes from backlog...".to_string(),
            Self::BatchPlanning => "Choosing the next backlog batch...".to_string(),
            Self::Writing { episodes } => {
                format!("Updating playlist with {} episodes...", episodes)
            }
            Self::Done { .. } => "Update complete!".to_string(),
            Self::Failed { reason } => format!("An error occurred: {}", reason),
        }
    }

    /// Progress counter and total for the stage
    pub fn counters(&self) -> (usize, usize) {
        match self {
            Self::FetchingEpisodes {
                processed, total, ..
            } => (*processed, *total),
            Self::Done { summary } => (summary.shows_scanned, summary.shows_scanned),
            _ => (0, 0),
        }
    }
}

/// Body of `GET /scan/status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressStatus {
    pub stage: &'static str,
    pub message: String,
    pub progress: usize,
    pub total: usize,
    pub is_done: bool,
    pub is_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<ScanSummary>,
}

impl From<&ScanStage> for ProgressStatus {
    fn from(stage: &ScanStage) -> Self {
        let (progress, total) = stage.counters();
        Self {
            stage: stage.name(),
            message: stage.message(),
            progress,
            total,
            is_done: matches!(stage, ScanStage::Done { .. }),
            is_error: matches!(stage, ScanStage::Failed { .. }),
            summary: match stage {
                ScanStage::Done { summary } => Some(summary.clone()),
                _ => None,
            },
        }
    }
}

//! Domain models for the Podqueue API

pub mod progress;
pub mod scan_state;

pub use progress::{ProgressStatus, ScanStage};
pub use scan_state::{ScanCommit, ScanState, ScanStateRow, ScanStateView, ScanSummary};

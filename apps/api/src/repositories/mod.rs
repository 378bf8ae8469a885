//! Repository layer for database operations
//!
//! Repositories hide the storage behind the [`ScanStateStore`] trait so the
//! scan pipeline works the same against PostgreSQL and process memory.

mod scan_state;

pub use scan_state::{InMemoryScanStateStore, PgScanStateRepository, ScanStateStore};

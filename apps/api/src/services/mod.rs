//! Business logic services for Podqueue
//!
//! The scan pipeline runs catalog → classifier → planner → writer, with the
//! progress registry receiving checkpoints throughout. Sessions and health
//! checks support the HTTP layer.

pub mod catalog;
pub mod classifier;
pub mod health;
pub mod planner;
pub mod progress;
pub mod scan;
pub mod session;
pub mod writer;

pub use health::HealthService;
pub use progress::{ProgressHandle, ProgressRegistry};
pub use scan::{ScanError, ScanResult, ScanService};
pub use session::{SessionClaims, SessionService, SESSION_COOKIE};

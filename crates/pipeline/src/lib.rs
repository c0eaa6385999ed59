//! Video job lifecycle and the generation/read flows built on it.
//!
//! * [`reconciler`] keeps stored video records in line with the model
//!   service (poll loops, pull-based sync, restart recovery).
//! * [`orchestrator`] runs one generation request end to end.
//! * [`history`] serves the newest-first gallery listing.

pub mod error;
pub mod history;
pub mod orchestrator;
pub mod reconciler;

pub use error::PipelineError;
pub use history::{HistoryQuery, HistoryView};
pub use orchestrator::Orchestrator;
pub use reconciler::{ApplyOutcome, JobReconciler, ReconcilerConfig, SyncReport, TrackedJob, TrackedState};

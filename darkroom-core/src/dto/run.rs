//! Run lifecycle reports returned to API callers

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Aggregate outcome of starting a full run
///
/// A run start is not all-or-nothing: per-image failures leave the remaining
/// images dispatched, and the caller learns which images never started.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartRunReport {
    /// Images whose first step was dispatched
    pub started: Vec<Uuid>,
    /// Images that failed before their first dispatch
    pub failed: Vec<FailedStart>,
}

impl StartRunReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// One image that failed to start, with the reason
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedStart {
    pub image: Uuid,
    pub reason: String,
}

/// Outcome of cancelling a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelReport {
    /// In-flight step cursors that were dropped
    pub cursors_removed: u64,
}

/// Result artifacts of a project's last completed run, resolved to URLs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectResults {
    pub images: Vec<ResultLink>,
    pub texts: Vec<ResultLink>,
}

/// One result artifact resolved to a retrievable URL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultLink {
    pub image: Uuid,
    pub file_name: String,
    pub url: String,
}

//! Step cursor domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::run::RunKind;

/// The durable record of one dispatched-but-uncompleted pipeline step
///
/// A cursor is persisted before the work message referencing its correlation
/// id is sent, and deleted unconditionally the moment its completion report
/// is consumed. At most one cursor exists per (owner, project, image) at any
/// instant, which is what forces strictly sequential per-image execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepCursor {
    pub owner: String,
    pub project: Uuid,
    pub image: Uuid,
    /// Source file name of the image, used to derive step output paths
    pub file_name: String,
    pub correlation_id: String,
    pub run_kind: RunKind,
    /// Position in the project's tool chain this step executes
    pub position: u32,
    pub input_uri: String,
    pub output_uri: String,
    pub dispatched_at: chrono::DateTime<chrono::Utc>,
}

//! Image domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A source image belonging to exactly one project
///
/// The orchestrator treats images as read-only during a run; working
/// input/output paths are derived per run from the image's file name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceImage {
    pub id: Uuid,
    pub file_name: String,
    /// Key of the original bytes in the artifact store's `src` bucket
    pub source_key: String,
}

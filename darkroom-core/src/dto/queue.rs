//! Tool queue wire messages
//!
//! Field names follow the broker contract consumed by the worker fleet
//! (camelCase, `imageURI`-style URI casing).

use serde::{Deserialize, Serialize};

use crate::domain::artifact::OutputKind;
use crate::domain::tool::Procedure;

/// One-operation work request dispatched to the tool queue
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkRequest {
    pub correlation_id: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    #[serde(rename = "inputURI")]
    pub input_uri: String,
    #[serde(rename = "outputURI")]
    pub output_uri: String,
    pub procedure: Procedure,
    pub params: serde_json::Value,
}

/// Completion report delivered by the tool queue after a worker finishes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionReport {
    pub correlation_id: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub status: ReportStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<WorkOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<WorkError>,
}

/// Worker-reported step status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Ok,
    Error,
}

/// Successful step output: where the worker wrote the produced bytes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkOutput {
    #[serde(rename = "imageURI")]
    pub image_uri: String,
    #[serde(rename = "type")]
    pub kind: OutputKind,
}

/// Worker-reported step failure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkError {
    pub code: String,
    pub msg: String,
}

//! Run kinds and correlation ids

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of a pipeline run
///
/// Persisted on every step cursor as an explicit tag; the correlation id
/// prefix exists only for worker-side compatibility and is never pattern
/// matched to make decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunKind {
    /// Diagnostic run over a single image with a single replaceable artifact slot
    Preview,
    /// Durable run over the project's image set, accumulating result artifacts
    Full,
}

impl RunKind {
    /// Prefix carried by every correlation id of this run kind
    pub fn correlation_prefix(&self) -> &'static str {
        match self {
            RunKind::Preview => "preview",
            RunKind::Full => "request",
        }
    }

    /// Mint a fresh correlation id for one dispatched step
    pub fn new_correlation_id(&self) -> String {
        format!("{}-{}", self.correlation_prefix(), Uuid::new_v4())
    }

    /// Bucket of the artifact store that this run kind publishes into
    pub fn output_bucket(&self) -> &'static str {
        match self {
            RunKind::Preview => "preview",
            RunKind::Full => "out",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correlation_id_prefixes() {
        let preview = RunKind::Preview.new_correlation_id();
        let full = RunKind::Full.new_correlation_id();

        assert!(preview.starts_with("preview-"));
        assert!(full.starts_with("request-"));
        assert_ne!(
            RunKind::Preview.new_correlation_id(),
            RunKind::Preview.new_correlation_id()
        );
    }

    #[test]
    fn test_output_buckets() {
        assert_eq!(RunKind::Preview.output_bucket(), "preview");
        assert_eq!(RunKind::Full.output_bucket(), "out");
    }
}

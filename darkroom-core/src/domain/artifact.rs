//! Artifact domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of output a worker step produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Image,
    Text,
}

impl OutputKind {
    /// Text output cannot feed a further image tool; it ends the chain
    pub fn is_chainable(&self) -> bool {
        !matches!(self, OutputKind::Text)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputKind::Image => "image",
            OutputKind::Text => "text",
        }
    }

    pub fn parse(s: &str) -> Option<OutputKind> {
        match s {
            "image" => Some(OutputKind::Image),
            "text" => Some(OutputKind::Text),
            _ => None,
        }
    }
}

/// The single replaceable preview slot of one image
///
/// A new preview run for the same image replaces the prior artifact, both
/// the record and the backing object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewArtifact {
    pub owner: String,
    pub project: Uuid,
    pub image: Uuid,
    pub kind: OutputKind,
    /// Key of the bytes in the artifact store's `preview` bucket
    pub key: String,
    pub file_name: String,
}

/// The durable output of one image's completed chain in a full run
///
/// A project holds result artifacts from at most one completed run; the set
/// is cleared before a new full run dispatches anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultArtifact {
    pub owner: String,
    pub project: Uuid,
    pub image: Uuid,
    pub kind: OutputKind,
    /// Key of the bytes in the artifact store's `out` bucket
    pub key: String,
    pub file_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_is_not_chainable() {
        assert!(OutputKind::Image.is_chainable());
        assert!(!OutputKind::Text.is_chainable());
    }

    #[test]
    fn test_output_kind_serde_names() {
        assert_eq!(serde_json::to_string(&OutputKind::Image).unwrap(), "\"image\"");
        assert_eq!(serde_json::to_string(&OutputKind::Text).unwrap(), "\"text\"");
        assert_eq!(OutputKind::parse("text"), Some(OutputKind::Text));
        assert_eq!(OutputKind::parse("audio"), None);
    }
}

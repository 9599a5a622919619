//! Client notifications
//!
//! Messages pushed to the owning user's live session through the push
//! gateway. All of them are fire-and-forget: a lost notification stalls the
//! UI at worst, never the pipeline.

use serde::{Deserialize, Serialize};

/// Outbound notification to the owning user's session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Notification {
    /// One full-run step finished; counting progress is the UI's business
    ProgressTick {
        timestamp: chrono::DateTime<chrono::Utc>,
        owner: String,
    },
    /// A full-run step failed; terminal for the affected image
    RunError {
        timestamp: chrono::DateTime<chrono::Utc>,
        owner: String,
        code: String,
        msg: String,
    },
    /// A preview step failed; terminal for the previewed image
    PreviewError {
        timestamp: chrono::DateTime<chrono::Utc>,
        owner: String,
        code: String,
        msg: String,
    },
    /// The preview chain finished and its artifact is resolvable
    PreviewReady {
        timestamp: chrono::DateTime<chrono::Utc>,
        owner: String,
        url: String,
    },
}

impl Notification {
    pub fn progress_tick(owner: &str) -> Self {
        Notification::ProgressTick {
            timestamp: chrono::Utc::now(),
            owner: owner.to_string(),
        }
    }

    pub fn run_error(owner: &str, code: &str, msg: &str) -> Self {
        Notification::RunError {
            timestamp: chrono::Utc::now(),
            owner: owner.to_string(),
            code: code.to_string(),
            msg: msg.to_string(),
        }
    }

    pub fn preview_error(owner: &str, code: &str, msg: &str) -> Self {
        Notification::PreviewError {
            timestamp: chrono::Utc::now(),
            owner: owner.to_string(),
            code: code.to_string(),
            msg: msg.to_string(),
        }
    }

    pub fn preview_ready(owner: &str, url: &str) -> Self {
        Notification::PreviewReady {
            timestamp: chrono::Utc::now(),
            owner: owner.to_string(),
            url: url.to_string(),
        }
    }

    pub fn owner(&self) -> &str {
        match self {
            Notification::ProgressTick { owner, .. }
            | Notification::RunError { owner, .. }
            | Notification::PreviewError { owner, .. }
            | Notification::PreviewReady { owner, .. } => owner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_tagging() {
        let tick = Notification::progress_tick("alice");
        let value = serde_json::to_value(&tick).unwrap();
        assert_eq!(value["kind"], "progress-tick");
        assert_eq!(value["owner"], "alice");

        let ready = Notification::preview_ready("alice", "https://store/preview/k1");
        let value = serde_json::to_value(&ready).unwrap();
        assert_eq!(value["kind"], "preview-ready");
        assert_eq!(value["url"], "https://store/preview/k1");
    }
}

//! Intake decision table
//!
//! One completion report maps to exactly one outcome, keyed by the report
//! status, the cursor's run kind, and whether the step was terminal. The
//! discard case (no cursor found for the correlation id) is resolved before
//! this table is consulted.

use darkroom_core::domain::run::RunKind;
use darkroom_core::dto::queue::ReportStatus;

/// What intake does with a consumed completion report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Worker reported failure: notify the owner, terminal for the image
    ReportError,
    /// Preview chain continues: dispatch the next step, upload the
    /// intermediate preview silently
    AdvancePreview,
    /// Preview chain done: upload the preview and notify preview-ready
    FinalizePreview,
    /// Full-run chain continues: dispatch the next step, send a progress tick
    AdvanceRun,
    /// Full-run chain done: record the result artifact and send the
    /// completion tick
    FinalizeRun,
}

impl Outcome {
    /// Whether this outcome dispatches a next step
    pub fn advances(&self) -> bool {
        matches!(self, Outcome::AdvancePreview | Outcome::AdvanceRun)
    }
}

/// The full (status, run kind, terminal) table
pub fn decide(status: ReportStatus, run_kind: RunKind, terminal: bool) -> Outcome {
    match (status, run_kind, terminal) {
        (ReportStatus::Error, _, _) => Outcome::ReportError,
        (ReportStatus::Ok, RunKind::Preview, false) => Outcome::AdvancePreview,
        (ReportStatus::Ok, RunKind::Preview, true) => Outcome::FinalizePreview,
        (ReportStatus::Ok, RunKind::Full, false) => Outcome::AdvanceRun,
        (ReportStatus::Ok, RunKind::Full, true) => Outcome::FinalizeRun,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_beats_everything_else() {
        for run_kind in [RunKind::Preview, RunKind::Full] {
            for terminal in [false, true] {
                assert_eq!(
                    decide(ReportStatus::Error, run_kind, terminal),
                    Outcome::ReportError
                );
            }
        }
    }

    #[test]
    fn test_ok_cells() {
        assert_eq!(
            decide(ReportStatus::Ok, RunKind::Preview, false),
            Outcome::AdvancePreview
        );
        assert_eq!(
            decide(ReportStatus::Ok, RunKind::Preview, true),
            Outcome::FinalizePreview
        );
        assert_eq!(
            decide(ReportStatus::Ok, RunKind::Full, false),
            Outcome::AdvanceRun
        );
        assert_eq!(
            decide(ReportStatus::Ok, RunKind::Full, true),
            Outcome::FinalizeRun
        );
    }

    #[test]
    fn test_only_non_terminal_outcomes_advance() {
        assert!(decide(ReportStatus::Ok, RunKind::Preview, false).advances());
        assert!(decide(ReportStatus::Ok, RunKind::Full, false).advances());
        assert!(!decide(ReportStatus::Ok, RunKind::Preview, true).advances());
        assert!(!decide(ReportStatus::Ok, RunKind::Full, true).advances());
        assert!(!decide(ReportStatus::Error, RunKind::Full, false).advances());
    }
}

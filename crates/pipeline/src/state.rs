//! Per-job execution state within one pipeline run.

use serde::{Deserialize, Serialize};

/// Job state machine:
/// `Pending → Eligible → Built → Submitted → Completed | Failed`,
/// with the terminal side-exits `Skipped` (trigger false or run cancelled)
/// and `Blocked` (dependency failed or grace window elapsed).
///
/// First-wave jobs start `Eligible` (no dependencies); second-wave jobs
/// start `Pending`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Registered, dependencies not yet satisfied, trigger not yet evaluated.
    Pending,
    /// Dependencies satisfied and trigger true; descriptor not yet built.
    Eligible,
    /// Descriptor built, not yet included in an emitted manifest.
    Built,
    /// Included in an emitted batch manifest.
    Submitted,
    /// Externally reported success.
    Completed,
    /// Composition failure or externally reported error.
    Failed { error: String },
    /// Never built: a dependency failed, or the grace window elapsed. Always
    /// names the dependency so the outcome is explainable.
    Blocked { dependency: String, reason: String },
    /// Never built: trigger evaluated false, or the run was cancelled.
    Skipped { reason: String },
}

impl JobState {
    /// Terminal states never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed
                | JobState::Failed { .. }
                | JobState::Blocked { .. }
                | JobState::Skipped { .. }
        )
    }

    /// States a run-level cancellation converts to `Skipped`.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, JobState::Pending | JobState::Eligible)
    }
}

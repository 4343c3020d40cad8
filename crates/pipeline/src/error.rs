//! Pipeline error taxonomy.
//!
//! Everything here is contained to the smallest affected unit: a
//! composition or timeout failure settles one job, a submission failure
//! leaves the affected jobs retryable. Only registry-load failures at
//! startup (see `acumen-analysis`) are fatal.

use thiserror::Error;

use acumen_core::{CorrelationId, RunId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// No run with this id (engine-level routing).
    #[error("unknown run: {0}")]
    UnknownRun(RunId),

    /// A completion event referenced a correlation id no job of this run
    /// produced.
    #[error("unknown correlation id: {0}")]
    UnknownCorrelation(CorrelationId),

    /// An upstream dependency did not complete within the grace window.
    #[error("dependency '{dependency}' for job '{job_id}' did not complete within the grace window")]
    DependencyTimeout { job_id: String, dependency: String },

    /// The external submission service rejected a manifest. The affected
    /// jobs remain built and can be resubmitted.
    #[error("batch submission rejected: {0}")]
    Submission(String),
}

//! Submission seam towards the external LLM batch service.
//!
//! The pipeline never speaks HTTP itself: it hands manifests to a
//! [`BatchSubmitter`] and consumes completion events keyed by correlation
//! id. The in-memory implementation exists for tests and development.

use std::sync::Mutex;

use crate::error::PipelineError;
use crate::manifest::BatchManifest;

/// Accepts a batch manifest for asynchronous execution.
///
/// Completions come back out of band as
/// [`CompletionEvent`](crate::correlator::CompletionEvent)s; a rejected
/// manifest surfaces as [`PipelineError::Submission`] and leaves the
/// affected jobs retryable.
pub trait BatchSubmitter: Send + Sync + 'static {
    fn submit(&self, manifest: &BatchManifest) -> Result<(), PipelineError>;
}

/// In-memory submitter for tests/dev: records manifests, optionally
/// rejecting the first few submissions.
#[derive(Debug, Default)]
pub struct InMemorySubmitter {
    submitted: Mutex<Vec<BatchManifest>>,
    reject_next: Mutex<u32>,
}

impl InMemorySubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the next `count` submissions with a submission error.
    pub fn rejecting(count: u32) -> Self {
        Self {
            submitted: Mutex::new(Vec::new()),
            reject_next: Mutex::new(count),
        }
    }

    /// Every accepted manifest, in submission order.
    pub fn all(&self) -> Vec<BatchManifest> {
        self.submitted.lock().unwrap().clone()
    }
}

impl BatchSubmitter for InMemorySubmitter {
    fn submit(&self, manifest: &BatchManifest) -> Result<(), PipelineError> {
        {
            let mut reject = self.reject_next.lock().unwrap();
            if *reject > 0 {
                *reject -= 1;
                return Err(PipelineError::Submission(
                    "service unavailable".to_string(),
                ));
            }
        }
        self.submitted.lock().unwrap().push(manifest.clone());
        Ok(())
    }
}

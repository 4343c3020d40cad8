//! Correlation of asynchronous completions back to their originating jobs.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use acumen_core::{AnalysisOutput, CorrelationId};

/// Outcome reported by the external submission service for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionOutcome {
    Success(AnalysisOutput),
    Error(String),
}

/// One asynchronous completion, keyed solely by correlation id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionEvent {
    pub correlation_id: CorrelationId,
    pub outcome: CompletionOutcome,
}

impl CompletionEvent {
    pub fn success(correlation_id: CorrelationId, output: AnalysisOutput) -> Self {
        Self {
            correlation_id,
            outcome: CompletionOutcome::Success(output),
        }
    }

    pub fn error(correlation_id: CorrelationId, error: impl Into<String>) -> Self {
        Self {
            correlation_id,
            outcome: CompletionOutcome::Error(error.into()),
        }
    }
}

/// Bidirectional correlation index for one run, populated as descriptors are
/// built.
#[derive(Debug, Default)]
pub struct ResultCorrelator {
    by_correlation: HashMap<CorrelationId, String>,
    by_job: HashMap<String, CorrelationId>,
}

impl ResultCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, correlation_id: CorrelationId, job_id: impl Into<String>) {
        let job_id = job_id.into();
        self.by_correlation.insert(correlation_id, job_id.clone());
        self.by_job.insert(job_id, correlation_id);
    }

    pub fn job_for(&self, correlation_id: CorrelationId) -> Option<&str> {
        self.by_correlation.get(&correlation_id).map(String::as_str)
    }

    pub fn correlation_for(&self, job_id: &str) -> Option<CorrelationId> {
        self.by_job.get(job_id).copied()
    }
}

//! Completed analysis outputs and the handles dependents consume them by.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Result of one completed analysis job.
///
/// This is an insight consumed by dependent jobs and by report rendering;
/// it never mutates pipeline state by itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutput {
    /// Human-readable summary of the analysis.
    pub summary: String,

    /// Named numeric scores (meaning is job-specific; 0..=100 by convention).
    pub scores: BTreeMap<String, f64>,

    /// Free-form metadata (model name, token usage, timings, etc).
    pub metadata: JsonValue,
}

impl AnalysisOutput {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            scores: BTreeMap::new(),
            metadata: JsonValue::Null,
        }
    }

    pub fn with_score(mut self, name: impl Into<String>, value: f64) -> Self {
        self.scores.insert(name.into(), value);
        self
    }

    pub fn with_metadata(mut self, metadata: JsonValue) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn score(&self, name: &str) -> Option<f64> {
        self.scores.get(name).copied()
    }
}

/// Resolution state of an upstream output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpstreamState {
    /// The upstream job completed and its output is available.
    Completed(AnalysisOutput),
    /// The upstream output is not available but the dependent may proceed
    /// under a degrade policy.
    Unavailable,
    /// The upstream job failed.
    Failed { error: String },
}

/// Named, versioned handle to an upstream job's result.
///
/// Produced when a first-wave job settles; consumed by dependent jobs for
/// trigger evaluation and request composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamOutputRef {
    job_id: String,
    version: u32,
    state: UpstreamState,
}

impl UpstreamOutputRef {
    pub fn completed(job_id: impl Into<String>, version: u32, output: AnalysisOutput) -> Self {
        Self {
            job_id: job_id.into(),
            version,
            state: UpstreamState::Completed(output),
        }
    }

    pub fn unavailable(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            version: 0,
            state: UpstreamState::Unavailable,
        }
    }

    pub fn failed(job_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            version: 0,
            state: UpstreamState::Failed {
                error: error.into(),
            },
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn state(&self) -> &UpstreamState {
        &self.state
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.state, UpstreamState::Completed(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, UpstreamState::Failed { .. })
    }

    pub fn output(&self) -> Option<&AnalysisOutput> {
        match &self.state {
            UpstreamState::Completed(output) => Some(output),
            _ => None,
        }
    }

    /// Convenience lookup: a named score on the completed output, if any.
    pub fn score(&self, name: &str) -> Option<f64> {
        self.output()?.score(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_lookup_only_on_completed_outputs() {
        let output = AnalysisOutput::new("liquidity is tight").with_score("liquidity", 42.0);
        let completed = UpstreamOutputRef::completed("financialHealth", 1, output);
        let failed = UpstreamOutputRef::failed("financialHealth", "provider timeout");

        assert_eq!(completed.score("liquidity"), Some(42.0));
        assert_eq!(completed.score("solvency"), None);
        assert_eq!(failed.score("liquidity"), None);
        assert!(failed.is_failed());
    }
}

//! Trigger evaluation: one decision per candidate job.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use acumen_core::{AssessmentContext, UpstreamOutputRef};

use crate::spec::{AnalysisJobSpec, Tier};

/// Standing reason attached to first-wave decisions, so matched reasons are
/// non-empty exactly when a job should run, regardless of tier.
pub const TIER_ONE_REASON: &str = "first-wave analysis always runs";

/// The evaluator's output for one spec. Deterministic for fixed inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerDecision {
    pub job_id: String,
    pub should_run: bool,
    /// Human-readable description of every matched sub-predicate. Non-empty
    /// iff `should_run`.
    pub matched_reasons: Vec<String>,
}

/// Evaluate whether a job should run for this snapshot.
///
/// Second-wave rules are OR-combined: any matching sub-predicate triggers
/// the job. A rule that fails to evaluate is logged as a data-quality
/// warning and treated as non-matching; it can never halt the run.
pub fn evaluate(
    ctx: &AssessmentContext,
    spec: &AnalysisJobSpec,
    upstream: &BTreeMap<String, UpstreamOutputRef>,
) -> TriggerDecision {
    if spec.tier == Tier::One {
        return TriggerDecision {
            job_id: spec.id.clone(),
            should_run: true,
            matched_reasons: vec![TIER_ONE_REASON.to_string()],
        };
    }

    let mut matched_reasons = Vec::new();
    for rule in &spec.trigger {
        match rule.evaluate(ctx, upstream) {
            Ok(Some(reason)) => matched_reasons.push(reason),
            Ok(None) => {}
            Err(error) => {
                warn!(
                    job_id = %spec.id,
                    rule = %rule.describe(),
                    error = %error,
                    "trigger rule failed to evaluate; treating as non-matching"
                );
            }
        }
    }

    TriggerDecision {
        job_id: spec.id.clone(),
        should_run: !matched_reasons.is_empty(),
        matched_reasons,
    }
}

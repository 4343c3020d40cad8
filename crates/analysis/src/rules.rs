//! Trigger rules: named, pure predicates over the assessment snapshot.
//!
//! Each rule is a small value with a static [`describe`](TriggerRule::describe)
//! for auditing the configured rule set, and an
//! [`evaluate`](TriggerRule::evaluate) that inspects the context (and, for
//! upstream-aware rules, completed first-wave outputs) and returns the
//! concrete matched reason.
//!
//! Failure semantics: a missing field is *not a match*, never an error.
//! `RuleError` is reserved for data that exists but is malformed; the
//! evaluator logs it and treats the rule as non-matching so a single bad
//! rule can never halt a run.

use std::collections::BTreeMap;

use regex::Regex;
use thiserror::Error;

use acumen_core::{AssessmentContext, GrowthPhase, UpstreamOutputRef};

/// Rule-evaluation failure. Treated by the evaluator as "did not match".
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("invalid keyword pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("benchmark table for metric '{metric}' is malformed: {reason}")]
    MalformedBenchmark { metric: String, reason: String },

    #[error("rule threshold is not a finite number")]
    NonFiniteThreshold,
}

/// A single boolean sub-predicate of a second-wave trigger.
#[derive(Debug, Clone)]
pub enum TriggerRule {
    /// Stated revenue growth target strictly above a percentage threshold.
    GrowthTargetAbove { threshold_pct: f64 },

    /// Company growth phase is one of the listed phases.
    GrowthPhaseIn { phases: Vec<GrowthPhase> },

    /// Any stated pain point matches the keyword pattern.
    PainPointMatches { pattern: Regex, label: String },

    /// A named score on a completed upstream output is strictly below a
    /// threshold.
    UpstreamScoreBelow {
        upstream_job: String,
        score: String,
        threshold: f64,
    },

    /// A questionnaire category mean score is strictly below a threshold.
    CategoryScoreBelow { category: String, threshold: f64 },

    /// A questionnaire category mean falls below the given percentile of the
    /// named benchmark table.
    BenchmarkBelowPercentile {
        category: String,
        metric: String,
        percentile: u8,
    },
}

impl TriggerRule {
    /// Build a pain-point keyword rule, compiling the pattern case-insensitively.
    ///
    /// `label` is the short business name used in audit descriptions
    /// (e.g. "scaling pressure").
    pub fn pain_point_matches(
        pattern: &str,
        label: impl Into<String>,
    ) -> Result<Self, RuleError> {
        let compiled = Regex::new(&format!("(?i){pattern}")).map_err(|source| {
            RuleError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            }
        })?;
        Ok(Self::PainPointMatches {
            pattern: compiled,
            label: label.into(),
        })
    }

    /// Static description of the configured rule, for audit listings.
    pub fn describe(&self) -> String {
        match self {
            TriggerRule::GrowthTargetAbove { threshold_pct } => {
                format!("revenue growth target exceeds {threshold_pct}%")
            }
            TriggerRule::GrowthPhaseIn { phases } => {
                let names: Vec<String> = phases.iter().map(|p| p.to_string()).collect();
                format!("growth phase is one of [{}]", names.join(", "))
            }
            TriggerRule::PainPointMatches { label, .. } => {
                format!("stated pain points indicate {label}")
            }
            TriggerRule::UpstreamScoreBelow {
                upstream_job,
                score,
                threshold,
            } => format!("{upstream_job} score '{score}' below {threshold}"),
            TriggerRule::CategoryScoreBelow {
                category,
                threshold,
            } => format!("questionnaire category '{category}' mean below {threshold}"),
            TriggerRule::BenchmarkBelowPercentile {
                category,
                metric,
                percentile,
            } => format!(
                "category '{category}' below the {percentile}th percentile of benchmark '{metric}'"
            ),
        }
    }

    /// Evaluate the rule against the snapshot and the available upstream
    /// outputs.
    ///
    /// Returns `Ok(Some(reason))` on a match, where `reason` names the
    /// observed values (not just the configuration), `Ok(None)` on no match
    /// (including every missing-data case), and `Err` only for malformed
    /// data.
    pub fn evaluate(
        &self,
        ctx: &AssessmentContext,
        upstream: &BTreeMap<String, UpstreamOutputRef>,
    ) -> Result<Option<String>, RuleError> {
        match self {
            TriggerRule::GrowthTargetAbove { threshold_pct } => {
                if !threshold_pct.is_finite() {
                    return Err(RuleError::NonFiniteThreshold);
                }
                match ctx.profile().growth_target_pct {
                    Some(target) if target > *threshold_pct => Ok(Some(format!(
                        "Revenue growth target {target}% > {threshold_pct}% threshold"
                    ))),
                    _ => Ok(None),
                }
            }

            TriggerRule::GrowthPhaseIn { phases } => {
                let phase = ctx.profile().growth_phase;
                if phases.contains(&phase) {
                    Ok(Some(format!("Growth phase '{phase}' is in the trigger set")))
                } else {
                    Ok(None)
                }
            }

            TriggerRule::PainPointMatches { pattern, label } => {
                for pain_point in &ctx.profile().pain_points {
                    if pattern.is_match(pain_point) {
                        return Ok(Some(format!(
                            "Stated pain point '{pain_point}' indicates {label}"
                        )));
                    }
                }
                Ok(None)
            }

            TriggerRule::UpstreamScoreBelow {
                upstream_job,
                score,
                threshold,
            } => {
                if !threshold.is_finite() {
                    return Err(RuleError::NonFiniteThreshold);
                }
                // Missing, failed, or score-less upstream is not a match.
                let value = upstream
                    .get(upstream_job)
                    .and_then(|output_ref| output_ref.score(score));
                match value {
                    Some(v) if v < *threshold => Ok(Some(format!(
                        "{upstream_job} score '{score}' is {v} (below {threshold})"
                    ))),
                    _ => Ok(None),
                }
            }

            TriggerRule::CategoryScoreBelow {
                category,
                threshold,
            } => {
                if !threshold.is_finite() {
                    return Err(RuleError::NonFiniteThreshold);
                }
                match ctx.questionnaire().mean_score(category) {
                    Some(mean) if mean < *threshold => Ok(Some(format!(
                        "Category '{category}' mean score {mean} is below {threshold}"
                    ))),
                    _ => Ok(None),
                }
            }

            TriggerRule::BenchmarkBelowPercentile {
                category,
                metric,
                percentile,
            } => {
                let Some(mean) = ctx.questionnaire().mean_score(category) else {
                    return Ok(None);
                };
                let Some(table) = ctx.benchmarks().table(metric) else {
                    return Ok(None);
                };
                if table.is_empty() {
                    return Err(RuleError::MalformedBenchmark {
                        metric: metric.clone(),
                        reason: "empty percentile table".to_string(),
                    });
                }
                let Some(cutoff) = table.value_at(*percentile) else {
                    return Ok(None);
                };
                if mean < cutoff {
                    Ok(Some(format!(
                        "Category '{category}' mean {mean} is below the {percentile}th percentile \
                         ({cutoff}) of benchmark '{metric}' for peer group '{}'",
                        table.peer_group()
                    )))
                } else {
                    Ok(None)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use acumen_core::{
        AnalysisOutput, BenchmarkData, CategoryAggregates, CategoryResponses, CompanyId,
        CompanyProfile, CompanySize, PercentileTable, QuestionnaireResponses,
    };

    fn ctx_with_profile(profile: CompanyProfile) -> AssessmentContext {
        AssessmentContext::new(CompanyId::new(), profile)
    }

    fn no_upstream() -> BTreeMap<String, UpstreamOutputRef> {
        BTreeMap::new()
    }

    #[test]
    fn growth_target_above_matches_with_observed_values_in_reason() {
        let ctx = ctx_with_profile(
            CompanyProfile::new("saas", CompanySize::Small, GrowthPhase::Expansion)
                .with_growth_target_pct(30.0),
        );
        let rule = TriggerRule::GrowthTargetAbove { threshold_pct: 25.0 };

        let reason = rule.evaluate(&ctx, &no_upstream()).unwrap().unwrap();
        assert_eq!(reason, "Revenue growth target 30% > 25% threshold");
    }

    #[test]
    fn growth_target_missing_is_not_a_match() {
        let ctx = ctx_with_profile(CompanyProfile::new(
            "saas",
            CompanySize::Small,
            GrowthPhase::Mature,
        ));
        let rule = TriggerRule::GrowthTargetAbove { threshold_pct: 25.0 };

        assert!(rule.evaluate(&ctx, &no_upstream()).unwrap().is_none());
    }

    #[test]
    fn growth_target_at_threshold_is_not_a_match() {
        let ctx = ctx_with_profile(
            CompanyProfile::new("saas", CompanySize::Small, GrowthPhase::Expansion)
                .with_growth_target_pct(25.0),
        );
        let rule = TriggerRule::GrowthTargetAbove { threshold_pct: 25.0 };

        assert!(rule.evaluate(&ctx, &no_upstream()).unwrap().is_none());
    }

    #[test]
    fn phase_rule_matches_membership() {
        let ctx = ctx_with_profile(CompanyProfile::new(
            "retail",
            CompanySize::Medium,
            GrowthPhase::Startup,
        ));
        let rule = TriggerRule::GrowthPhaseIn {
            phases: vec![GrowthPhase::Startup, GrowthPhase::Expansion],
        };

        assert!(rule.evaluate(&ctx, &no_upstream()).unwrap().is_some());

        let mature = ctx_with_profile(CompanyProfile::new(
            "retail",
            CompanySize::Medium,
            GrowthPhase::Mature,
        ));
        assert!(rule.evaluate(&mature, &no_upstream()).unwrap().is_none());
    }

    #[test]
    fn pain_point_rule_is_case_insensitive() {
        let ctx = ctx_with_profile(
            CompanyProfile::new("logistics", CompanySize::Large, GrowthPhase::Mature)
                .with_pain_point("We cannot SCALE our fulfilment operations"),
        );
        let rule = TriggerRule::pain_point_matches("scal(e|ing)", "scaling pressure").unwrap();

        let reason = rule.evaluate(&ctx, &no_upstream()).unwrap().unwrap();
        assert!(reason.contains("scaling pressure"));
        assert!(reason.contains("SCALE"));
    }

    #[test]
    fn invalid_pain_point_pattern_is_rejected_at_construction() {
        assert!(matches!(
            TriggerRule::pain_point_matches("(unclosed", "broken"),
            Err(RuleError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn upstream_score_rule_ignores_missing_and_failed_upstreams() {
        let ctx = ctx_with_profile(CompanyProfile::new(
            "saas",
            CompanySize::Small,
            GrowthPhase::Expansion,
        ));
        let rule = TriggerRule::UpstreamScoreBelow {
            upstream_job: "financialHealth".to_string(),
            score: "liquidity".to_string(),
            threshold: 60.0,
        };

        assert!(rule.evaluate(&ctx, &no_upstream()).unwrap().is_none());

        let mut failed = BTreeMap::new();
        failed.insert(
            "financialHealth".to_string(),
            UpstreamOutputRef::failed("financialHealth", "provider timeout"),
        );
        assert!(rule.evaluate(&ctx, &failed).unwrap().is_none());

        let mut completed = BTreeMap::new();
        completed.insert(
            "financialHealth".to_string(),
            UpstreamOutputRef::completed(
                "financialHealth",
                1,
                AnalysisOutput::new("tight liquidity").with_score("liquidity", 45.0),
            ),
        );
        let reason = rule.evaluate(&ctx, &completed).unwrap().unwrap();
        assert!(reason.contains("45"));
    }

    #[test]
    fn benchmark_rule_flags_below_percentile_and_errors_on_empty_table() {
        let questionnaire = QuestionnaireResponses::new().with_category(
            "operations",
            CategoryResponses::new(
                vec![],
                CategoryAggregates {
                    mean_score: Some(35.0),
                    answered: 6,
                },
            ),
        );
        let benchmarks = BenchmarkData::new().with_table(
            "processAutomation",
            PercentileTable::new("manufacturing_mid", vec![(25, 30.0), (40, 48.0), (75, 70.0)]),
        );
        let ctx = ctx_with_profile(CompanyProfile::new(
            "manufacturing",
            CompanySize::Medium,
            GrowthPhase::Mature,
        ))
        .with_questionnaire(questionnaire.clone())
        .with_benchmarks(benchmarks);

        let rule = TriggerRule::BenchmarkBelowPercentile {
            category: "operations".to_string(),
            metric: "processAutomation".to_string(),
            percentile: 40,
        };
        let reason = rule.evaluate(&ctx, &no_upstream()).unwrap().unwrap();
        assert!(reason.contains("manufacturing_mid"));

        let empty = ctx_with_profile(CompanyProfile::new(
            "manufacturing",
            CompanySize::Medium,
            GrowthPhase::Mature,
        ))
        .with_questionnaire(questionnaire)
        .with_benchmarks(
            BenchmarkData::new()
                .with_table("processAutomation", PercentileTable::new("mid", vec![])),
        );
        assert!(matches!(
            rule.evaluate(&empty, &no_upstream()),
            Err(RuleError::MalformedBenchmark { .. })
        ));
    }
}

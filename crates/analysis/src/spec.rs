//! Static definitions of analyzable units.
//!
//! An [`AnalysisJobSpec`] is configuration, not state: the set of specs is
//! built once at process start (see [`crate::registry`]) and read-only
//! afterwards.

use serde::{Deserialize, Serialize};

use acumen_core::AssessmentContext;

use crate::compose::{ComposeError, UpstreamSelection};
use crate::payload::ModelParams;
use crate::rules::TriggerRule;

/// Analysis wave. First-wave jobs always run; second-wave jobs are
/// conditional and dependency-bearing.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    One,
    Two,
}

/// What to do when a required upstream ends in failure.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyPolicy {
    /// Never build the job; report it as blocked, naming the dependency.
    #[default]
    Block,
    /// Build anyway; the user template sees the upstream as unavailable and
    /// decides on fallback text.
    Degrade,
}

/// User-template function: renders the user prompt from the snapshot and the
/// declared upstream subset. Must be pure.
pub type UserTemplate =
    fn(&AssessmentContext, &UpstreamSelection<'_>) -> Result<String, ComposeError>;

/// Template pair for one job.
#[derive(Debug, Clone)]
pub struct TemplateRef {
    /// Static system text; the output-format decorator is applied on top at
    /// composition time.
    pub system: &'static str,
    pub user: UserTemplate,
}

/// Static definition of one analyzable unit.
#[derive(Debug, Clone)]
pub struct AnalysisJobSpec {
    /// Stable identifier, e.g. `"growthReadiness"`.
    pub id: String,
    pub tier: Tier,
    /// First-wave jobs this job consumes. Empty iff tier 1.
    pub required_upstream: Vec<String>,
    /// Ordered trigger sub-predicates, OR-combined. Empty iff tier 1.
    pub trigger: Vec<TriggerRule>,
    pub template: TemplateRef,
    pub params: ModelParams,
    pub dependency_policy: DependencyPolicy,
}

impl AnalysisJobSpec {
    /// A first-wave job: unconditional, no dependencies.
    pub fn tier1(id: impl Into<String>, template: TemplateRef) -> Self {
        Self {
            id: id.into(),
            tier: Tier::One,
            required_upstream: Vec::new(),
            trigger: Vec::new(),
            template,
            params: ModelParams::default(),
            dependency_policy: DependencyPolicy::default(),
        }
    }

    /// A second-wave job: add dependencies with [`with_upstream`]
    /// (at least one is required) and triggers with [`with_trigger`].
    ///
    /// [`with_upstream`]: Self::with_upstream
    /// [`with_trigger`]: Self::with_trigger
    pub fn tier2(id: impl Into<String>, template: TemplateRef) -> Self {
        Self {
            id: id.into(),
            tier: Tier::Two,
            required_upstream: Vec::new(),
            trigger: Vec::new(),
            template,
            params: ModelParams::default(),
            dependency_policy: DependencyPolicy::default(),
        }
    }

    pub fn with_upstream(mut self, job_id: impl Into<String>) -> Self {
        self.required_upstream.push(job_id.into());
        self
    }

    pub fn with_trigger(mut self, rule: TriggerRule) -> Self {
        self.trigger.push(rule);
        self
    }

    pub fn with_params(mut self, params: ModelParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_dependency_policy(mut self, policy: DependencyPolicy) -> Self {
        self.dependency_policy = policy;
        self
    }
}

//! The per-run dependency orchestrator.
//!
//! A [`PipelineRun`] owns the full job state machine for one company
//! assessment. All methods take an explicit `now` so transitions are
//! replayable in tests; only the hosting worker reads the wall clock.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use acumen_analysis::{
    AnalysisJobSpec, DependencyPolicy, OutputDecorator, SpecRegistry, Tier, compose, evaluate,
};
use acumen_core::{AssessmentContext, CorrelationId, RunId, UpstreamOutputRef, UpstreamState};

use crate::correlator::{CompletionEvent, CompletionOutcome, ResultCorrelator};
use crate::descriptor::JobDescriptor;
use crate::error::PipelineError;
use crate::manifest::BatchManifest;
use crate::state::JobState;

/// Run-level configuration.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// How long a second-wave job may wait for its dependencies before it is
    /// blocked.
    pub dependency_grace: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            dependency_grace: Duration::from_secs(10 * 60),
        }
    }
}

impl RunConfig {
    pub fn with_dependency_grace(mut self, grace: Duration) -> Self {
        self.dependency_grace = grace;
        self
    }
}

/// Counts per state, for observability.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct RunStats {
    pub pending: usize,
    pub eligible: usize,
    pub built: usize,
    pub submitted: usize,
    pub completed: usize,
    pub failed: usize,
    pub blocked: usize,
    pub skipped: usize,
}

/// One explained job outcome.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct OutcomeNote {
    pub job_id: String,
    pub note: String,
}

/// Explained outcome listing for one run, in spec registration order.
///
/// Report rendering must distinguish "not applicable" (trigger false, run
/// cancelled) from "could not complete" (failed, or blocked on a named
/// dependency); neither may be silently omitted.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub completed: Vec<String>,
    /// Submitted or still moving through the state machine.
    pub in_flight: Vec<String>,
    pub not_applicable: Vec<OutcomeNote>,
    pub incomplete: Vec<OutcomeNote>,
}

/// Dependency orchestrator for one assessment run.
///
/// Single-threaded with respect to state: one run owns its state machine,
/// and distinct runs share nothing but the read-only registry.
pub struct PipelineRun {
    run_id: RunId,
    registry: Arc<SpecRegistry>,
    ctx: AssessmentContext,
    config: RunConfig,
    decorator: Arc<dyn OutputDecorator>,

    started_at: Option<DateTime<Utc>>,
    deadline: Option<DateTime<Utc>>,
    cancelled: bool,

    states: HashMap<String, JobState>,
    /// Resolved first-wave outputs, keyed by job id.
    upstream: BTreeMap<String, UpstreamOutputRef>,
    /// Built descriptors, kept for resubmission after a rejected manifest.
    descriptors: HashMap<String, JobDescriptor>,
    correlator: ResultCorrelator,
}

impl PipelineRun {
    pub fn new(
        registry: Arc<SpecRegistry>,
        ctx: AssessmentContext,
        config: RunConfig,
        decorator: Arc<dyn OutputDecorator>,
    ) -> Self {
        let mut states = HashMap::new();
        for spec in registry.iter() {
            let initial = match spec.tier {
                Tier::One => JobState::Eligible,
                Tier::Two => JobState::Pending,
            };
            states.insert(spec.id.clone(), initial);
        }

        Self {
            run_id: RunId::new(),
            registry,
            ctx,
            config,
            decorator,
            started_at: None,
            deadline: None,
            cancelled: false,
            states,
            upstream: BTreeMap::new(),
            descriptors: HashMap::new(),
            correlator: ResultCorrelator::new(),
        }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// The grace deadline, until it has been processed by
    /// [`expire_overdue`](Self::expire_overdue).
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Compose, build, and emit the first wave.
    ///
    /// Descriptors appear in spec registration order. A composition failure
    /// settles only the affected job as `Failed`; its dependents will block
    /// at the grace deadline.
    pub fn start(&mut self, now: DateTime<Utc>) -> BatchManifest {
        if self.started_at.is_some() {
            warn!(run_id = %self.run_id, "run already started; ignoring");
            return BatchManifest::new(self.run_id);
        }
        self.started_at = Some(now);
        self.deadline =
            Some(now + chrono::Duration::from_std(self.config.dependency_grace).unwrap_or_default());

        info!(
            run_id = %self.run_id,
            company_id = %self.ctx.company_id(),
            jobs = self.registry.len(),
            "pipeline run started"
        );

        let registry = Arc::clone(&self.registry);
        let mut manifest = BatchManifest::new(self.run_id);
        for spec in registry.tier1() {
            let decision = evaluate(&self.ctx, spec, &self.upstream);
            debug!(run_id = %self.run_id, job_id = %spec.id, ?decision, "first-wave decision");

            match compose(&self.ctx, spec, &self.upstream, self.decorator.as_ref()) {
                Ok(payload) => {
                    let descriptor = JobDescriptor::build(
                        self.ctx.company_id(),
                        spec,
                        payload,
                        now,
                        Vec::new(),
                    );
                    self.correlator
                        .register(descriptor.correlation_id(), spec.id.as_str());
                    self.descriptors.insert(spec.id.clone(), descriptor.clone());
                    self.set_state(&spec.id, JobState::Built);
                    manifest.push(descriptor);
                }
                Err(error) => {
                    warn!(
                        run_id = %self.run_id,
                        job_id = %spec.id,
                        error = %error,
                        "first-wave composition failed; job settled as failed"
                    );
                    self.upstream.insert(
                        spec.id.clone(),
                        UpstreamOutputRef::failed(spec.id.as_str(), error.to_string()),
                    );
                    self.set_state(
                        &spec.id,
                        JobState::Failed {
                            error: error.to_string(),
                        },
                    );
                }
            }
        }

        self.mark_submitted(&manifest);
        manifest
    }

    /// Feed one asynchronous completion back into the run.
    ///
    /// Returns the manifests of any second-wave jobs that became eligible
    /// and were built as a result (zero or one manifest per call).
    /// Re-delivered completions for settled jobs are ignored.
    pub fn report_completion(
        &mut self,
        event: CompletionEvent,
        now: DateTime<Utc>,
    ) -> Result<Vec<BatchManifest>, PipelineError> {
        let job_id = self
            .correlator
            .job_for(event.correlation_id)
            .map(str::to_string)
            .ok_or(PipelineError::UnknownCorrelation(event.correlation_id))?;

        let current = self.states.get(&job_id).cloned().unwrap_or(JobState::Pending);
        if current.is_terminal() {
            debug!(
                run_id = %self.run_id,
                job_id = %job_id,
                "duplicate completion for settled job; ignoring"
            );
            return Ok(Vec::new());
        }

        let registry = Arc::clone(&self.registry);
        let tier = registry.get(&job_id).map(|s| s.tier);
        match event.outcome {
            CompletionOutcome::Success(output) => {
                if tier == Some(Tier::One) {
                    self.upstream.insert(
                        job_id.clone(),
                        UpstreamOutputRef::completed(job_id.as_str(), 1, output),
                    );
                }
                self.set_state(&job_id, JobState::Completed);
            }
            CompletionOutcome::Error(error) => {
                if tier == Some(Tier::One) {
                    self.upstream.insert(
                        job_id.clone(),
                        UpstreamOutputRef::failed(job_id.as_str(), error.as_str()),
                    );
                }
                self.set_state(&job_id, JobState::Failed { error });
            }
        }

        // Only the dependents of this upstream are re-examined.
        let mut manifest = BatchManifest::new(self.run_id);
        if tier == Some(Tier::One) {
            let dependents = registry.dependents_of(&job_id).to_vec();
            for dependent in dependents {
                if let Some(descriptor) = self.examine(&dependent, now, false) {
                    manifest.push(descriptor);
                }
            }
        }

        if manifest.is_empty() {
            Ok(Vec::new())
        } else {
            self.mark_submitted(&manifest);
            Ok(vec![manifest])
        }
    }

    /// Settle second-wave jobs whose grace window has elapsed.
    ///
    /// Jobs whose dependencies are still missing (or failed under a `Block`
    /// policy) become `Blocked`; jobs with a `Degrade` policy are built with
    /// whatever resolved. Returns the manifest of degraded builds, if any.
    pub fn expire_overdue(&mut self, now: DateTime<Utc>) -> Vec<BatchManifest> {
        let Some(deadline) = self.deadline else {
            return Vec::new();
        };
        if now < deadline {
            return Vec::new();
        }

        let registry = Arc::clone(&self.registry);
        let mut manifest = BatchManifest::new(self.run_id);
        for spec in registry.tier2() {
            if self.states.get(&spec.id) == Some(&JobState::Pending) {
                if let Some(descriptor) = self.examine(&spec.id, now, true) {
                    manifest.push(descriptor);
                }
            }
        }
        // Every pending job is settled now; hosts waiting on this deadline
        // can fall back to their idle tick.
        self.deadline = None;

        if manifest.is_empty() {
            Vec::new()
        } else {
            self.mark_submitted(&manifest);
            vec![manifest]
        }
    }

    /// Cancel the run: every job that has not been built yet is skipped.
    /// Idempotent.
    pub fn cancel(&mut self) {
        if !self.cancelled {
            info!(run_id = %self.run_id, "run cancelled");
        }
        self.cancelled = true;
        let job_ids: Vec<String> = self.registry.iter().map(|s| s.id.clone()).collect();
        for job_id in job_ids {
            if self
                .states
                .get(&job_id)
                .is_some_and(JobState::is_cancellable)
            {
                self.set_state(
                    &job_id,
                    JobState::Skipped {
                        reason: "run cancelled".to_string(),
                    },
                );
            }
        }
    }

    /// Revert the given jobs from `Submitted` to `Built` after the external
    /// service rejected their manifest. They can be re-emitted with
    /// [`resubmit_built`](Self::resubmit_built).
    pub fn report_submission_failure(&mut self, correlation_ids: &[CorrelationId]) {
        for &correlation_id in correlation_ids {
            let Some(job_id) = self.correlator.job_for(correlation_id).map(str::to_string) else {
                continue;
            };
            if self.states.get(&job_id) == Some(&JobState::Submitted) {
                warn!(
                    run_id = %self.run_id,
                    job_id = %job_id,
                    "submission rejected; job reverted to built"
                );
                self.set_state(&job_id, JobState::Built);
            }
        }
    }

    /// Re-emit every built-but-unsubmitted descriptor, in registration
    /// order.
    pub fn resubmit_built(&mut self) -> Option<BatchManifest> {
        let registry = Arc::clone(&self.registry);
        let mut manifest = BatchManifest::new(self.run_id);
        for spec in registry.iter() {
            if self.states.get(&spec.id) == Some(&JobState::Built) {
                if let Some(descriptor) = self.descriptors.get(&spec.id) {
                    manifest.push(descriptor.clone());
                }
            }
        }

        if manifest.is_empty() {
            None
        } else {
            self.mark_submitted(&manifest);
            Some(manifest)
        }
    }

    /// Current state of every job, keyed by job id.
    pub fn job_states(&self) -> BTreeMap<String, JobState> {
        self.states
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Explained per-job outcomes, in spec registration order.
    pub fn report(&self) -> RunReport {
        let mut report = RunReport {
            run_id: self.run_id,
            completed: Vec::new(),
            in_flight: Vec::new(),
            not_applicable: Vec::new(),
            incomplete: Vec::new(),
        };
        for spec in self.registry.iter() {
            let Some(state) = self.states.get(&spec.id) else {
                continue;
            };
            match state {
                JobState::Completed => report.completed.push(spec.id.clone()),
                JobState::Pending
                | JobState::Eligible
                | JobState::Built
                | JobState::Submitted => report.in_flight.push(spec.id.clone()),
                JobState::Skipped { reason } => report.not_applicable.push(OutcomeNote {
                    job_id: spec.id.clone(),
                    note: reason.clone(),
                }),
                JobState::Failed { error } => report.incomplete.push(OutcomeNote {
                    job_id: spec.id.clone(),
                    note: error.clone(),
                }),
                JobState::Blocked { reason, .. } => report.incomplete.push(OutcomeNote {
                    job_id: spec.id.clone(),
                    note: reason.clone(),
                }),
            }
        }
        report
    }

    pub fn stats(&self) -> RunStats {
        let mut stats = RunStats::default();
        for state in self.states.values() {
            match state {
                JobState::Pending => stats.pending += 1,
                JobState::Eligible => stats.eligible += 1,
                JobState::Built => stats.built += 1,
                JobState::Submitted => stats.submitted += 1,
                JobState::Completed => stats.completed += 1,
                JobState::Failed { .. } => stats.failed += 1,
                JobState::Blocked { .. } => stats.blocked += 1,
                JobState::Skipped { .. } => stats.skipped += 1,
            }
        }
        stats
    }

    /// A run is settled once no job can make further progress locally:
    /// everything is submitted or terminal.
    pub fn is_settled(&self) -> bool {
        self.states.values().all(|state| {
            matches!(state, JobState::Submitted) || state.is_terminal()
        })
    }

    /// Examine one pending second-wave job.
    ///
    /// Builds and returns its descriptor when the dependencies are resolved
    /// and the trigger fires; settles it as `Skipped`/`Blocked`/`Failed`
    /// when a final negative outcome is known; returns `None` and leaves it
    /// `Pending` while the outcome is still open. A job that has left
    /// `Pending` is never examined again, which makes builds at-most-once
    /// even under racing dependency events.
    fn examine(
        &mut self,
        job_id: &str,
        now: DateTime<Utc>,
        at_deadline: bool,
    ) -> Option<JobDescriptor> {
        if self.states.get(job_id) != Some(&JobState::Pending) {
            return None;
        }
        let registry = Arc::clone(&self.registry);
        let spec = registry.get(job_id)?;

        let resolved = match self.resolve_dependencies(spec, at_deadline) {
            Some(resolved) => resolved,
            None => return None,
        };

        let decision = evaluate(&self.ctx, spec, &self.upstream);
        if !decision.should_run {
            debug!(run_id = %self.run_id, job_id = %job_id, "trigger did not fire; job skipped");
            self.set_state(
                job_id,
                JobState::Skipped {
                    reason: "no trigger condition matched".to_string(),
                },
            );
            return None;
        }
        info!(
            run_id = %self.run_id,
            job_id = %job_id,
            reasons = ?decision.matched_reasons,
            "second-wave trigger fired"
        );
        self.set_state(job_id, JobState::Eligible);

        match compose(&self.ctx, spec, &self.upstream, self.decorator.as_ref()) {
            Ok(payload) => {
                let descriptor = JobDescriptor::build(
                    self.ctx.company_id(),
                    spec,
                    payload,
                    self.started_at.unwrap_or(now),
                    resolved,
                );
                self.correlator.register(descriptor.correlation_id(), job_id);
                self.descriptors.insert(job_id.to_string(), descriptor.clone());
                self.set_state(job_id, JobState::Built);
                Some(descriptor)
            }
            Err(error) => {
                warn!(
                    run_id = %self.run_id,
                    job_id = %job_id,
                    error = %error,
                    "composition failed; job settled as failed"
                );
                self.set_state(
                    job_id,
                    JobState::Failed {
                        error: error.to_string(),
                    },
                );
                None
            }
        }
    }

    /// Resolve a spec's declared upstreams into concrete references.
    ///
    /// Returns `None` when the job cannot be built yet (still waiting) or
    /// when it was settled as `Blocked` here. Failed upstreams under a
    /// `Block` policy wait out the grace window (a rejected manifest may
    /// still be resubmitted and complete) and block only at the deadline.
    fn resolve_dependencies(
        &mut self,
        spec: &AnalysisJobSpec,
        at_deadline: bool,
    ) -> Option<Vec<UpstreamOutputRef>> {
        let mut resolved = Vec::with_capacity(spec.required_upstream.len());
        for dependency in &spec.required_upstream {
            match self.upstream.get(dependency) {
                Some(output_ref) if output_ref.is_completed() => {
                    resolved.push(output_ref.clone());
                }
                Some(output_ref) if output_ref.is_failed() => match spec.dependency_policy {
                    DependencyPolicy::Degrade => {
                        resolved.push(UpstreamOutputRef::unavailable(dependency.as_str()));
                    }
                    DependencyPolicy::Block => {
                        if at_deadline {
                            let error = match output_ref.state() {
                                UpstreamState::Failed { error } => error.clone(),
                                _ => String::new(),
                            };
                            self.set_state(
                                &spec.id,
                                JobState::Blocked {
                                    dependency: dependency.clone(),
                                    reason: format!("dependency '{dependency}' failed: {error}"),
                                },
                            );
                        }
                        return None;
                    }
                },
                Some(output_ref) => {
                    // Already degraded to unavailable.
                    resolved.push(output_ref.clone());
                }
                None => match (at_deadline, spec.dependency_policy) {
                    (false, _) => return None,
                    (true, DependencyPolicy::Degrade) => {
                        resolved.push(UpstreamOutputRef::unavailable(dependency.as_str()));
                    }
                    (true, DependencyPolicy::Block) => {
                        let timeout = PipelineError::DependencyTimeout {
                            job_id: spec.id.clone(),
                            dependency: dependency.clone(),
                        };
                        self.set_state(
                            &spec.id,
                            JobState::Blocked {
                                dependency: dependency.clone(),
                                reason: timeout.to_string(),
                            },
                        );
                        return None;
                    }
                },
            }
        }
        Some(resolved)
    }

    fn mark_submitted(&mut self, manifest: &BatchManifest) {
        for descriptor in manifest.descriptors() {
            self.set_state(descriptor.job_id(), JobState::Submitted);
        }
    }

    fn set_state(&mut self, job_id: &str, new: JobState) {
        let Some(current) = self.states.get_mut(job_id) else {
            return;
        };
        if current.is_terminal() {
            debug!(
                run_id = %self.run_id,
                job_id = %job_id,
                current = ?current,
                refused = ?new,
                "refusing transition out of terminal state"
            );
            return;
        }
        debug!(run_id = %self.run_id, job_id = %job_id, from = ?current, to = ?new, "job transition");
        *current = new;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use acumen_analysis::catalog::{
        self, COMPLIANCE_SUSTAINABILITY, DIGITAL_TRANSFORMATION, FINANCIAL_HEALTH,
        GROWTH_READINESS, MARKET_DYNAMICS, OPERATIONAL_MATURITY, RISK_RESILIENCE,
        STRATEGIC_POSITIONING,
    };
    use acumen_analysis::{IdentityDecorator, Tier};
    use acumen_core::{
        AnalysisOutput, CategoryAggregates, CategoryResponses, CompanyId, CompanyProfile,
        CompanySize, GrowthPhase, QuestionnaireResponses,
    };

    fn growth_ctx() -> AssessmentContext {
        // Growth target over threshold; full questionnaire so every
        // first-wave template composes.
        let questionnaire = QuestionnaireResponses::new()
            .with_category("finance", scored_category(70.0))
            .with_category("operations", scored_category(75.0))
            .with_category("compliance", scored_category(80.0))
            .with_category("digitalization", scored_category(80.0));

        AssessmentContext::new(
            CompanyId::new(),
            CompanyProfile::new("saas", CompanySize::Small, GrowthPhase::Mature)
                .with_growth_target_pct(30.0),
        )
        .with_questionnaire(questionnaire)
    }

    fn scored_category(mean: f64) -> CategoryResponses {
        CategoryResponses::new(
            vec![],
            CategoryAggregates {
                mean_score: Some(mean),
                answered: 4,
            },
        )
    }

    fn test_run(ctx: AssessmentContext) -> PipelineRun {
        PipelineRun::new(
            Arc::new(catalog::default_registry().unwrap()),
            ctx,
            RunConfig::default(),
            Arc::new(IdentityDecorator),
        )
    }

    fn complete(
        run: &mut PipelineRun,
        manifest: &BatchManifest,
        job_id: &str,
        output: AnalysisOutput,
        now: DateTime<Utc>,
    ) -> Vec<BatchManifest> {
        let correlation_id = manifest
            .descriptors()
            .iter()
            .find(|d| d.job_id() == job_id)
            .unwrap()
            .correlation_id();
        run.report_completion(CompletionEvent::success(correlation_id, output), now)
            .unwrap()
    }

    #[test]
    fn start_emits_tier1_in_registration_order() {
        let mut run = test_run(growth_ctx());
        let manifest = run.start(Utc::now());

        let order: Vec<&str> = manifest.descriptors().iter().map(|d| d.job_id()).collect();
        assert_eq!(
            order,
            [
                STRATEGIC_POSITIONING,
                FINANCIAL_HEALTH,
                OPERATIONAL_MATURITY,
                COMPLIANCE_SUSTAINABILITY,
                MARKET_DYNAMICS,
            ]
        );
        assert!(manifest.descriptors().iter().all(|d| d.tier() == Tier::One));

        let states = run.job_states();
        assert_eq!(states[STRATEGIC_POSITIONING], JobState::Submitted);
        assert_eq!(states[GROWTH_READINESS], JobState::Pending);
    }

    #[test]
    fn tier2_is_not_built_until_every_dependency_completes() {
        let mut run = test_run(growth_ctx());
        let now = Utc::now();
        let manifest = run.start(now);

        // financialHealth alone is not enough for growthReadiness.
        let manifests = complete(
            &mut run,
            &manifest,
            FINANCIAL_HEALTH,
            AnalysisOutput::new("fine"),
            now,
        );
        assert!(manifests.is_empty());
        assert_eq!(run.job_states()[GROWTH_READINESS], JobState::Pending);

        // marketDynamics completes: growthReadiness builds exactly now.
        let manifests = complete(
            &mut run,
            &manifest,
            MARKET_DYNAMICS,
            AnalysisOutput::new("growing"),
            now,
        );
        assert_eq!(manifests.len(), 1);
        let tier2: Vec<&str> = manifests[0]
            .descriptors()
            .iter()
            .map(|d| d.job_id())
            .collect();
        assert_eq!(tier2, [GROWTH_READINESS]);
        assert_eq!(run.job_states()[GROWTH_READINESS], JobState::Submitted);

        // Resolved refs are attached to the descriptor.
        let depends_on = manifests[0].descriptors()[0].depends_on();
        assert_eq!(depends_on.len(), 2);
        assert!(depends_on.iter().all(UpstreamOutputRef::is_completed));
    }

    #[test]
    fn duplicate_completions_never_rebuild_a_job() {
        let mut run = test_run(growth_ctx());
        let now = Utc::now();
        let manifest = run.start(now);

        complete(
            &mut run,
            &manifest,
            FINANCIAL_HEALTH,
            AnalysisOutput::new("fine"),
            now,
        );
        let first = complete(
            &mut run,
            &manifest,
            MARKET_DYNAMICS,
            AnalysisOutput::new("growing"),
            now,
        );
        assert_eq!(first.len(), 1);

        // Re-delivered completion for the same upstream: ignored, nothing
        // new is built.
        let correlation_id = manifest
            .descriptors()
            .iter()
            .find(|d| d.job_id() == MARKET_DYNAMICS)
            .unwrap()
            .correlation_id();
        let again = run
            .report_completion(
                CompletionEvent::success(correlation_id, AnalysisOutput::new("growing")),
                now,
            )
            .unwrap();
        assert!(again.is_empty());
    }

    #[test]
    fn trigger_false_settles_as_skipped_with_distinct_reason() {
        // Mature company, low target, no matching pain points: the
        // growthReadiness trigger must not fire.
        let ctx = AssessmentContext::new(
            CompanyId::new(),
            CompanyProfile::new("saas", CompanySize::Small, GrowthPhase::Mature)
                .with_growth_target_pct(10.0),
        )
        .with_questionnaire(
            QuestionnaireResponses::new()
                .with_category("finance", scored_category(90.0))
                .with_category("operations", scored_category(90.0))
                .with_category("compliance", scored_category(90.0))
                .with_category("digitalization", scored_category(90.0)),
        );
        let mut run = test_run(ctx);
        let now = Utc::now();
        let manifest = run.start(now);

        complete(
            &mut run,
            &manifest,
            FINANCIAL_HEALTH,
            AnalysisOutput::new("fine").with_score("liquidity", 90.0),
            now,
        );
        let manifests = complete(
            &mut run,
            &manifest,
            MARKET_DYNAMICS,
            AnalysisOutput::new("flat"),
            now,
        );
        assert!(manifests.is_empty());
        assert_eq!(
            run.job_states()[GROWTH_READINESS],
            JobState::Skipped {
                reason: "no trigger condition matched".to_string()
            }
        );
    }

    #[test]
    fn failed_dependency_blocks_at_the_grace_deadline() {
        let mut run = test_run(growth_ctx());
        let now = Utc::now();
        let manifest = run.start(now);

        let correlation_id = manifest
            .descriptors()
            .iter()
            .find(|d| d.job_id() == COMPLIANCE_SUSTAINABILITY)
            .unwrap()
            .correlation_id();
        run.report_completion(
            CompletionEvent::error(correlation_id, "provider timeout"),
            now,
        )
        .unwrap();

        // Before the deadline the dependent stays pending (a late recovery
        // is still possible).
        assert_eq!(run.job_states()[RISK_RESILIENCE], JobState::Pending);

        let after = now + chrono::Duration::seconds(601);
        run.expire_overdue(after);

        match &run.job_states()[RISK_RESILIENCE] {
            JobState::Blocked { dependency, reason } => {
                assert_eq!(dependency, COMPLIANCE_SUSTAINABILITY);
                assert!(reason.contains("provider timeout"));
            }
            other => panic!("expected blocked, got {other:?}"),
        }
    }

    #[test]
    fn missing_dependency_times_out_without_affecting_siblings() {
        let mut run = test_run(growth_ctx());
        let now = Utc::now();
        let manifest = run.start(now);

        // growthReadiness resolves; operationalMaturity never completes, so
        // digitalTransformation must block alone.
        complete(
            &mut run,
            &manifest,
            FINANCIAL_HEALTH,
            AnalysisOutput::new("fine"),
            now,
        );
        complete(
            &mut run,
            &manifest,
            MARKET_DYNAMICS,
            AnalysisOutput::new("growing"),
            now,
        );

        let after = now + chrono::Duration::seconds(601);
        run.expire_overdue(after);

        let states = run.job_states();
        assert_eq!(states[GROWTH_READINESS], JobState::Submitted);
        match &states[DIGITAL_TRANSFORMATION] {
            JobState::Blocked { dependency, reason } => {
                assert_eq!(dependency, OPERATIONAL_MATURITY);
                assert!(reason.contains("grace window"));
            }
            other => panic!("expected blocked, got {other:?}"),
        }
    }

    #[test]
    fn composition_failure_is_contained_to_one_job() {
        // No growth target: the growthReadiness template cannot compose,
        // but its trigger fires via the pain-point rule. Siblings are
        // untouched.
        let ctx = AssessmentContext::new(
            CompanyId::new(),
            CompanyProfile::new("saas", CompanySize::Small, GrowthPhase::Mature)
                .with_pain_point("we cannot scale support capacity"),
        )
        .with_questionnaire(
            QuestionnaireResponses::new()
                .with_category("finance", scored_category(90.0))
                .with_category("operations", scored_category(90.0))
                .with_category("compliance", scored_category(30.0))
                .with_category("digitalization", scored_category(90.0)),
        );
        let mut run = test_run(ctx);
        let now = Utc::now();
        let manifest = run.start(now);

        complete(
            &mut run,
            &manifest,
            FINANCIAL_HEALTH,
            AnalysisOutput::new("fine").with_score("liquidity", 90.0),
            now,
        );
        let manifests = complete(
            &mut run,
            &manifest,
            MARKET_DYNAMICS,
            AnalysisOutput::new("growing"),
            now,
        );
        assert!(manifests.is_empty());
        match &run.job_states()[GROWTH_READINESS] {
            JobState::Failed { error } => assert!(error.contains("growth_target_pct")),
            other => panic!("expected failed, got {other:?}"),
        }

        // riskResilience still proceeds normally on its own dependency.
        let manifests = complete(
            &mut run,
            &manifest,
            COMPLIANCE_SUSTAINABILITY,
            AnalysisOutput::new("gaps found").with_score("compliance", 40.0),
            now,
        );
        assert_eq!(manifests.len(), 1);
        assert_eq!(manifests[0].descriptors()[0].job_id(), RISK_RESILIENCE);
    }

    #[test]
    fn cancel_skips_unbuilt_jobs_and_is_idempotent() {
        let mut run = test_run(growth_ctx());
        let now = Utc::now();
        let manifest = run.start(now);

        run.cancel();
        run.cancel();

        let states = run.job_states();
        // Submitted first-wave jobs are untouched; pending second-wave jobs
        // are skipped.
        assert_eq!(states[FINANCIAL_HEALTH], JobState::Submitted);
        assert_eq!(
            states[GROWTH_READINESS],
            JobState::Skipped {
                reason: "run cancelled".to_string()
            }
        );

        // Completions after cancellation no longer unblock anything.
        let manifests = complete(
            &mut run,
            &manifest,
            FINANCIAL_HEALTH,
            AnalysisOutput::new("fine"),
            now,
        );
        assert!(manifests.is_empty());
    }

    #[test]
    fn submission_failure_reverts_to_built_and_resubmits_the_same_ids() {
        let mut run = test_run(growth_ctx());
        let now = Utc::now();
        let manifest = run.start(now);

        let ids = manifest.correlation_ids();
        run.report_submission_failure(&ids);
        assert_eq!(run.job_states()[FINANCIAL_HEALTH], JobState::Built);

        let retried = run.resubmit_built().unwrap();
        assert_eq!(retried.correlation_ids(), ids);
        assert_eq!(run.job_states()[FINANCIAL_HEALTH], JobState::Submitted);
        assert!(run.resubmit_built().is_none());
    }

    #[test]
    fn settles_once_every_job_is_submitted_or_terminal() {
        let mut run = test_run(growth_ctx());
        let now = Utc::now();
        let manifest = run.start(now);
        assert!(!run.is_settled());

        for job_id in [
            STRATEGIC_POSITIONING,
            FINANCIAL_HEALTH,
            OPERATIONAL_MATURITY,
            COMPLIANCE_SUSTAINABILITY,
            MARKET_DYNAMICS,
        ] {
            complete(
                &mut run,
                &manifest,
                job_id,
                AnalysisOutput::new("done").with_score("liquidity", 90.0).with_score("compliance", 90.0),
                now,
            );
        }

        // growthReadiness submitted; riskResilience and
        // digitalTransformation skipped (no trigger matched).
        let states = run.job_states();
        assert_eq!(states[GROWTH_READINESS], JobState::Submitted);
        assert!(matches!(states[RISK_RESILIENCE], JobState::Skipped { .. }));
        assert!(matches!(
            states[DIGITAL_TRANSFORMATION],
            JobState::Skipped { .. }
        ));
        assert!(run.is_settled());

        let stats = run.stats();
        assert_eq!(stats.submitted, 1);
        assert_eq!(stats.completed, 5);
        assert_eq!(stats.skipped, 2);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: whatever order first-wave completions arrive in
            /// (including duplicates), every second-wave job is built at
            /// most once and growthReadiness is built exactly once.
            #[test]
            fn at_most_once_build_under_any_completion_order(
                order in proptest::sample::subsequence(
                    vec![0usize, 1, 2, 3, 4, 0, 1, 2, 3, 4],
                    5..=10,
                ).prop_shuffle(),
            ) {
                let mut run = test_run(growth_ctx());
                let now = Utc::now();
                let manifest = run.start(now);
                let descriptors = manifest.descriptors().to_vec();

                let mut growth_builds = 0usize;
                for index in order {
                    let descriptor = &descriptors[index];
                    let manifests = run
                        .report_completion(
                            CompletionEvent::success(
                                descriptor.correlation_id(),
                                AnalysisOutput::new("done"),
                            ),
                            now,
                        )
                        .unwrap();
                    growth_builds += manifests
                        .iter()
                        .flat_map(|m| m.descriptors())
                        .filter(|d| d.job_id() == GROWTH_READINESS)
                        .count();
                }

                // growthReadiness triggers on the 30% target; once both of
                // its dependencies have completed it must have been built
                // exactly once, and never more than once regardless.
                let both_deps_done = [FINANCIAL_HEALTH, MARKET_DYNAMICS]
                    .iter()
                    .all(|id| run.job_states()[*id] == JobState::Completed);
                if both_deps_done {
                    prop_assert_eq!(growth_builds, 1);
                } else {
                    prop_assert!(growth_builds <= 1);
                }
            }
        }
    }
}

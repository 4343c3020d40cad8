//! Threaded host for one pipeline run.
//!
//! The worker owns its [`PipelineRun`] and suspends on a blocking channel
//! receive while waiting for upstream completions; there is no polling
//! loop. The
//! receive timeout is bounded by the dependency grace deadline so overdue
//! jobs are settled promptly even when no events arrive.

use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use acumen_core::RunId;

use crate::correlator::CompletionEvent;
use crate::manifest::BatchManifest;
use crate::run::PipelineRun;
use crate::submit::BatchSubmitter;

/// Events a run reacts to.
#[derive(Debug)]
pub enum RunEvent {
    Completion(CompletionEvent),
    Cancel,
    Shutdown,
}

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct RunWorkerConfig {
    /// Thread name, for logging.
    pub name: String,
    /// Upper bound on one blocking receive, so deadline checks and
    /// resubmission retries happen even on a quiet channel.
    pub tick: Duration,
}

impl Default for RunWorkerConfig {
    fn default() -> Self {
        Self {
            name: "pipeline-run".to_string(),
            tick: Duration::from_secs(5),
        }
    }
}

impl RunWorkerConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }
}

/// Handle to a running worker.
#[derive(Debug)]
pub struct RunWorkerHandle {
    run_id: RunId,
    events: mpsc::Sender<RunEvent>,
    join: Option<thread::JoinHandle<()>>,
}

impl RunWorkerHandle {
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Feed a completion event. Returns false when the worker has exited.
    pub fn completion(&self, event: CompletionEvent) -> bool {
        self.events.send(RunEvent::Completion(event)).is_ok()
    }

    /// Request run cancellation (idempotent).
    pub fn cancel(&self) {
        let _ = self.events.send(RunEvent::Cancel);
    }

    /// Stop the worker and wait for it to exit.
    pub fn shutdown(mut self) {
        let _ = self.events.send(RunEvent::Shutdown);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

/// Spawn a worker hosting the given run.
///
/// The first wave is started and submitted from the worker thread before it
/// begins consuming events.
pub fn spawn(
    run: PipelineRun,
    submitter: Arc<dyn BatchSubmitter>,
    config: RunWorkerConfig,
) -> RunWorkerHandle {
    let run_id = run.run_id();
    let (events_tx, events_rx) = mpsc::channel::<RunEvent>();

    let name = config.name.clone();
    let join = thread::Builder::new()
        .name(name)
        .spawn(move || worker_loop(run, submitter, config, events_rx))
        .expect("failed to spawn pipeline run worker thread");

    RunWorkerHandle {
        run_id,
        events: events_tx,
        join: Some(join),
    }
}

fn worker_loop(
    mut run: PipelineRun,
    submitter: Arc<dyn BatchSubmitter>,
    config: RunWorkerConfig,
    events_rx: mpsc::Receiver<RunEvent>,
) {
    info!(worker = %config.name, run_id = %run.run_id(), "pipeline run worker started");

    let manifest = run.start(Utc::now());
    submit(&mut run, submitter.as_ref(), &manifest);

    loop {
        if run.is_settled() {
            break;
        }

        // Suspend until the next event, bounded by the grace deadline.
        let wait = run
            .deadline()
            .map(|deadline| {
                (deadline - Utc::now())
                    .to_std()
                    .unwrap_or(Duration::ZERO)
                    .min(config.tick)
            })
            .unwrap_or(config.tick);

        match events_rx.recv_timeout(wait) {
            Ok(RunEvent::Completion(event)) => {
                match run.report_completion(event, Utc::now()) {
                    Ok(manifests) => {
                        for manifest in &manifests {
                            submit(&mut run, submitter.as_ref(), manifest);
                        }
                    }
                    Err(error) => {
                        warn!(
                            worker = %config.name,
                            run_id = %run.run_id(),
                            error = %error,
                            "completion event could not be correlated"
                        );
                    }
                }
            }
            Ok(RunEvent::Cancel) => run.cancel(),
            Ok(RunEvent::Shutdown) => break,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                for manifest in run.expire_overdue(Utc::now()) {
                    submit(&mut run, submitter.as_ref(), &manifest);
                }
                // Retry anything a rejected submission left behind.
                if let Some(manifest) = run.resubmit_built() {
                    submit(&mut run, submitter.as_ref(), &manifest);
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    info!(
        worker = %config.name,
        run_id = %run.run_id(),
        stats = ?run.stats(),
        "pipeline run worker stopped"
    );
}

fn submit(run: &mut PipelineRun, submitter: &dyn BatchSubmitter, manifest: &BatchManifest) {
    if manifest.is_empty() {
        return;
    }
    match submitter.submit(manifest) {
        Ok(()) => {
            debug!(run_id = %run.run_id(), jobs = manifest.len(), "manifest submitted");
        }
        Err(error) => {
            warn!(
                run_id = %run.run_id(),
                error = %error,
                "manifest rejected; jobs stay built for resubmission"
            );
            run.report_submission_failure(&manifest.correlation_ids());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use acumen_analysis::catalog::{
        self, COMPLIANCE_SUSTAINABILITY, FINANCIAL_HEALTH, MARKET_DYNAMICS, OPERATIONAL_MATURITY,
        STRATEGIC_POSITIONING,
    };
    use acumen_analysis::IdentityDecorator;
    use acumen_core::{
        AnalysisOutput, AssessmentContext, CategoryAggregates, CategoryResponses, CompanyId,
        CompanyProfile, CompanySize, GrowthPhase, QuestionnaireResponses,
    };

    use crate::run::RunConfig;
    use crate::submit::InMemorySubmitter;

    fn scored_category(mean: f64) -> CategoryResponses {
        CategoryResponses::new(
            vec![],
            CategoryAggregates {
                mean_score: Some(mean),
                answered: 4,
            },
        )
    }

    fn ctx() -> AssessmentContext {
        AssessmentContext::new(
            CompanyId::new(),
            CompanyProfile::new("saas", CompanySize::Small, GrowthPhase::Expansion)
                .with_growth_target_pct(40.0),
        )
        .with_questionnaire(
            QuestionnaireResponses::new()
                .with_category("finance", scored_category(70.0))
                .with_category("operations", scored_category(70.0))
                .with_category("compliance", scored_category(90.0))
                .with_category("digitalization", scored_category(90.0)),
        )
    }

    fn wait_for_manifests(submitter: &InMemorySubmitter, count: usize) -> Vec<BatchManifest> {
        for _ in 0..200 {
            let all = submitter.all();
            if all.len() >= count {
                return all;
            }
            thread::sleep(Duration::from_millis(10));
        }
        panic!("timed out waiting for {count} manifests");
    }

    #[test]
    fn worker_submits_tier1_then_unblocked_tier2() {
        let registry = Arc::new(catalog::default_registry().unwrap());
        let submitter = Arc::new(InMemorySubmitter::new());
        let run = PipelineRun::new(
            registry,
            ctx(),
            RunConfig::default(),
            Arc::new(IdentityDecorator),
        );

        let handle = spawn(
            run,
            submitter.clone(),
            RunWorkerConfig::default().with_name("test-run"),
        );

        let manifests = wait_for_manifests(&submitter, 1);
        let tier1 = &manifests[0];
        assert_eq!(tier1.len(), 5);

        for job_id in [FINANCIAL_HEALTH, MARKET_DYNAMICS] {
            let correlation_id = tier1
                .descriptors()
                .iter()
                .find(|d| d.job_id() == job_id)
                .unwrap()
                .correlation_id();
            assert!(handle.completion(CompletionEvent::success(
                correlation_id,
                AnalysisOutput::new("done"),
            )));
        }

        let manifests = wait_for_manifests(&submitter, 2);
        assert_eq!(manifests[1].descriptors()[0].job_id(), "growthReadiness");

        // Settle the rest so the worker exits on its own.
        for job_id in [
            STRATEGIC_POSITIONING,
            OPERATIONAL_MATURITY,
            COMPLIANCE_SUSTAINABILITY,
        ] {
            let correlation_id = tier1
                .descriptors()
                .iter()
                .find(|d| d.job_id() == job_id)
                .unwrap()
                .correlation_id();
            handle.completion(CompletionEvent::success(
                correlation_id,
                AnalysisOutput::new("done"),
            ));
        }

        handle.shutdown();
    }

    #[test]
    fn worker_cancel_skips_pending_jobs() {
        let registry = Arc::new(catalog::default_registry().unwrap());
        let submitter = Arc::new(InMemorySubmitter::new());
        let run = PipelineRun::new(
            registry,
            ctx(),
            RunConfig::default(),
            Arc::new(IdentityDecorator),
        );

        let handle = spawn(run, submitter.clone(), RunWorkerConfig::default());
        wait_for_manifests(&submitter, 1);
        handle.cancel();
        handle.shutdown();
    }
}

//! Synchronous multi-run facade.
//!
//! The engine owns one [`PipelineRun`] per assessment and routes completion
//! events to the right run by correlation id alone. The only state shared
//! across runs is the read-only spec registry; each run's mutable state sits
//! behind its own lock and is never touched by another run's caller.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, RwLock};

use chrono::Utc;

use acumen_analysis::{IdentityDecorator, OutputDecorator, SpecRegistry};
use acumen_core::{AssessmentContext, CorrelationId, RunId};

use crate::correlator::CompletionEvent;
use crate::error::PipelineError;
use crate::manifest::BatchManifest;
use crate::run::{PipelineRun, RunConfig, RunReport, RunStats};
use crate::state::JobState;

/// Multi-run pipeline coordinator.
pub struct PipelineEngine {
    registry: Arc<SpecRegistry>,
    config: RunConfig,
    decorator: Arc<dyn OutputDecorator>,
    runs: RwLock<HashMap<RunId, Mutex<PipelineRun>>>,
    /// Correlation id -> owning run, so completions route without a run id.
    correlations: RwLock<HashMap<CorrelationId, RunId>>,
}

impl PipelineEngine {
    pub fn new(registry: Arc<SpecRegistry>, config: RunConfig) -> Self {
        Self::with_decorator(registry, config, Arc::new(IdentityDecorator))
    }

    pub fn with_decorator(
        registry: Arc<SpecRegistry>,
        config: RunConfig,
        decorator: Arc<dyn OutputDecorator>,
    ) -> Self {
        Self {
            registry,
            config,
            decorator,
            runs: RwLock::new(HashMap::new()),
            correlations: RwLock::new(HashMap::new()),
        }
    }

    /// Start a new run for the snapshot and return its first-wave manifest.
    pub fn run_pipeline(&self, ctx: AssessmentContext) -> BatchManifest {
        let mut run = PipelineRun::new(
            Arc::clone(&self.registry),
            ctx,
            self.config.clone(),
            Arc::clone(&self.decorator),
        );
        let manifest = run.start(Utc::now());
        let run_id = run.run_id();

        self.index_manifest(&manifest);
        self.runs
            .write()
            .unwrap()
            .insert(run_id, Mutex::new(run));
        manifest
    }

    /// Route one completion to its run; returns any newly eligible
    /// second-wave manifests to submit next.
    pub fn report_completion(
        &self,
        event: CompletionEvent,
    ) -> Result<Vec<BatchManifest>, PipelineError> {
        let run_id = self
            .correlations
            .read()
            .unwrap()
            .get(&event.correlation_id)
            .copied()
            .ok_or(PipelineError::UnknownCorrelation(event.correlation_id))?;

        let manifests = {
            let runs = self.runs.read().unwrap();
            let run = runs
                .get(&run_id)
                .ok_or(PipelineError::UnknownRun(run_id))?;
            run.lock().unwrap().report_completion(event, Utc::now())?
        };

        for manifest in &manifests {
            self.index_manifest(manifest);
        }
        Ok(manifests)
    }

    /// Settle overdue jobs across all runs; returns any degraded-build
    /// manifests.
    pub fn expire_overdue(&self) -> Vec<BatchManifest> {
        let now = Utc::now();
        let mut manifests = Vec::new();
        {
            let runs = self.runs.read().unwrap();
            for run in runs.values() {
                manifests.extend(run.lock().unwrap().expire_overdue(now));
            }
        }
        for manifest in &manifests {
            self.index_manifest(manifest);
        }
        manifests
    }

    /// Current state of every job of a run.
    pub fn query_run_state(&self, run_id: RunId) -> Result<BTreeMap<String, JobState>, PipelineError> {
        let runs = self.runs.read().unwrap();
        let run = runs.get(&run_id).ok_or(PipelineError::UnknownRun(run_id))?;
        Ok(run.lock().unwrap().job_states())
    }

    pub fn run_stats(&self, run_id: RunId) -> Result<RunStats, PipelineError> {
        let runs = self.runs.read().unwrap();
        let run = runs.get(&run_id).ok_or(PipelineError::UnknownRun(run_id))?;
        Ok(run.lock().unwrap().stats())
    }

    /// Explained per-job outcomes of a run, for report rendering.
    pub fn run_report(&self, run_id: RunId) -> Result<RunReport, PipelineError> {
        let runs = self.runs.read().unwrap();
        let run = runs.get(&run_id).ok_or(PipelineError::UnknownRun(run_id))?;
        Ok(run.lock().unwrap().report())
    }

    /// Cancel one run (idempotent).
    pub fn cancel_run(&self, run_id: RunId) -> Result<(), PipelineError> {
        let runs = self.runs.read().unwrap();
        let run = runs.get(&run_id).ok_or(PipelineError::UnknownRun(run_id))?;
        run.lock().unwrap().cancel();
        Ok(())
    }

    fn index_manifest(&self, manifest: &BatchManifest) {
        let mut correlations = self.correlations.write().unwrap();
        for descriptor in manifest.descriptors() {
            correlations.insert(descriptor.correlation_id(), manifest.run_id());
        }
    }
}

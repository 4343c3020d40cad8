//! `acumen-pipeline`
//!
//! **Responsibility:** two-tier dependency orchestration.
//!
//! One [`run::PipelineRun`] owns the state machine of a single assessment:
//! the first wave is emitted immediately in registration order; second-wave
//! jobs wait on their declared upstreams, are trigger-evaluated when those
//! resolve, and are built and emitted eagerly, at most once each.
//!
//! Concurrency model: a run's state is single-threaded; multiple runs share
//! nothing but the read-only spec registry. [`worker::spawn`] hosts one run
//! on a named thread behind a blocking event channel;
//! [`engine::PipelineEngine`] is the synchronous multi-run facade.

pub mod correlator;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod manifest;
pub mod run;
pub mod state;
pub mod submit;
pub mod worker;

pub use correlator::{CompletionEvent, CompletionOutcome, ResultCorrelator};
pub use descriptor::JobDescriptor;
pub use engine::PipelineEngine;
pub use error::PipelineError;
pub use manifest::BatchManifest;
pub use run::{OutcomeNote, PipelineRun, RunConfig, RunReport, RunStats};
pub use state::JobState;
pub use submit::{BatchSubmitter, InMemorySubmitter};
pub use worker::{RunEvent, RunWorkerConfig, RunWorkerHandle};

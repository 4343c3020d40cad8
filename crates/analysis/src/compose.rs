//! Template composition: spec + snapshot (+ declared upstream outputs) into a
//! fully resolved request payload.
//!
//! Composition is pure and deterministic: identical inputs yield a
//! byte-identical payload. The cross-cutting output-format policy is an
//! external collaborator behind [`OutputDecorator`].

use std::collections::BTreeMap;

use thiserror::Error;

use acumen_core::{AnalysisOutput, AssessmentContext, UpstreamOutputRef};

use crate::payload::RequestPayload;
use crate::spec::AnalysisJobSpec;

/// Composition failure, local to the affected job.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ComposeError {
    /// A required context field is absent and the template defines no
    /// fallback for it. The caller decides whether that aborts the job.
    #[error("required context field missing: {field}")]
    MissingField { field: String },

    /// The template asked for an upstream job it never declared. Dependency
    /// edges stay explicit: only `required_upstream` entries are readable.
    #[error("upstream job '{job_id}' is not declared as a dependency")]
    UndeclaredUpstream { job_id: String },

    /// The template requires a completed output, but the upstream is
    /// unavailable or failed and the template defines no fallback.
    #[error("upstream job '{job_id}' has no completed output")]
    UpstreamNotCompleted { job_id: String },
}

impl ComposeError {
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }
}

/// Cross-cutting decorator applied to every job's system text before
/// submission. Content (formatting/compliance rules) is owned by the report
/// renderer, not by this crate.
pub trait OutputDecorator: Send + Sync {
    fn decorate(&self, system_text: &str) -> String;
}

/// No-op decorator for tests and plain-text setups.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityDecorator;

impl OutputDecorator for IdentityDecorator {
    fn decorate(&self, system_text: &str) -> String {
        system_text.to_string()
    }
}

/// Read view over exactly the upstream outputs a spec declared.
///
/// User templates receive this instead of the full upstream map so an
/// undeclared read fails loudly instead of silently widening the job's
/// dependency edges.
pub struct UpstreamSelection<'a> {
    declared: &'a [String],
    upstream: &'a BTreeMap<String, UpstreamOutputRef>,
}

impl<'a> UpstreamSelection<'a> {
    pub fn new(
        declared: &'a [String],
        upstream: &'a BTreeMap<String, UpstreamOutputRef>,
    ) -> Self {
        Self { declared, upstream }
    }

    fn check_declared(&self, job_id: &str) -> Result<(), ComposeError> {
        if self.declared.iter().any(|d| d == job_id) {
            Ok(())
        } else {
            Err(ComposeError::UndeclaredUpstream {
                job_id: job_id.to_string(),
            })
        }
    }

    /// The raw reference for a declared upstream, whatever its state.
    pub fn get(&self, job_id: &str) -> Result<Option<&UpstreamOutputRef>, ComposeError> {
        self.check_declared(job_id)?;
        Ok(self.upstream.get(job_id))
    }

    /// The completed output for a declared upstream.
    pub fn output(&self, job_id: &str) -> Result<&AnalysisOutput, ComposeError> {
        self.check_declared(job_id)?;
        self.upstream
            .get(job_id)
            .and_then(UpstreamOutputRef::output)
            .ok_or_else(|| ComposeError::UpstreamNotCompleted {
                job_id: job_id.to_string(),
            })
    }

    /// Degrade-friendly accessor: the completed summary, or `fallback` when
    /// the upstream is unavailable or failed.
    pub fn summary_or(&self, job_id: &str, fallback: &str) -> Result<String, ComposeError> {
        self.check_declared(job_id)?;
        Ok(self
            .upstream
            .get(job_id)
            .and_then(UpstreamOutputRef::output)
            .map(|output| output.summary.clone())
            .unwrap_or_else(|| fallback.to_string()))
    }
}

/// Compose the request payload for one job invocation.
///
/// The upstream map may contain more than the declared subset (the
/// orchestrator passes everything it has resolved); the template only ever
/// sees the declared entries.
pub fn compose(
    ctx: &AssessmentContext,
    spec: &AnalysisJobSpec,
    upstream: &BTreeMap<String, UpstreamOutputRef>,
    decorator: &dyn OutputDecorator,
) -> Result<RequestPayload, ComposeError> {
    let system = decorator.decorate(spec.template.system);
    let selection = UpstreamSelection::new(&spec.required_upstream, upstream);
    let user = (spec.template.user)(ctx, &selection)?;
    Ok(RequestPayload::new(system, user, spec.params.clone()))
}

//! Self-contained job descriptors ready for batch submission.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use acumen_analysis::{AnalysisJobSpec, RequestPayload, Tier};
use acumen_core::{CompanyId, CorrelationId, UpstreamOutputRef};

/// One fully composed job invocation.
///
/// Carries the resolved upstream references (not raw job ids), so the
/// descriptor is inspectable without re-querying the orchestrator. The
/// correlation id is the only key a completion event needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDescriptor {
    correlation_id: CorrelationId,
    job_id: String,
    tier: Tier,
    company_id: CompanyId,
    payload: RequestPayload,
    depends_on: Vec<UpstreamOutputRef>,
}

impl JobDescriptor {
    /// Build the descriptor for one job invocation.
    ///
    /// The correlation id is derived deterministically from
    /// `(company_id, spec.id, run_timestamp)`: rebuilding with identical
    /// inputs reproduces the same id.
    pub fn build(
        company_id: CompanyId,
        spec: &AnalysisJobSpec,
        payload: RequestPayload,
        run_timestamp: DateTime<Utc>,
        depends_on: Vec<UpstreamOutputRef>,
    ) -> Self {
        Self {
            correlation_id: CorrelationId::derive(company_id, &spec.id, run_timestamp),
            job_id: spec.id.clone(),
            tier: spec.tier,
            company_id,
            payload,
            depends_on,
        }
    }

    pub fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn company_id(&self) -> CompanyId {
        self.company_id
    }

    pub fn payload(&self) -> &RequestPayload {
        &self.payload
    }

    pub fn depends_on(&self) -> &[UpstreamOutputRef] {
        &self.depends_on
    }
}

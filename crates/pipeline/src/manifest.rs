//! Ordered batch manifests, partitioned by tier.

use serde::{Deserialize, Serialize};

use acumen_analysis::Tier;
use acumen_core::{CorrelationId, RunId};

use crate::descriptor::JobDescriptor;

/// Ordered list of job descriptors ready for submission.
///
/// Tier 1 descriptors are ordered by spec registration; tier 2 descriptors
/// by eligibility (whichever unblocked first). The partition accessors let a
/// caller submit tier 1 immediately and hold tier 2.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchManifest {
    run_id: RunId,
    descriptors: Vec<JobDescriptor>,
}

impl BatchManifest {
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            descriptors: Vec::new(),
        }
    }

    pub fn push(&mut self, descriptor: JobDescriptor) {
        self.descriptors.push(descriptor);
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn descriptors(&self) -> &[JobDescriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn tier1(&self) -> impl Iterator<Item = &JobDescriptor> {
        self.descriptors.iter().filter(|d| d.tier() == Tier::One)
    }

    pub fn tier2(&self) -> impl Iterator<Item = &JobDescriptor> {
        self.descriptors.iter().filter(|d| d.tier() == Tier::Two)
    }

    pub fn correlation_ids(&self) -> Vec<CorrelationId> {
        self.descriptors.iter().map(|d| d.correlation_id()).collect()
    }
}

//! Registration-ordered registry of analysis job specs.
//!
//! The registry is built once at process start and read-only afterwards;
//! every run shares it behind an `Arc` with no locking. Registration order
//! is the only ordering the pipeline relies on, never map iteration order.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::spec::{AnalysisJobSpec, Tier};

/// Registry construction failure. Fatal: a process must not start with an
/// inconsistent job set.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("duplicate job spec id: {0}")]
    DuplicateId(String),

    #[error("job '{job_id}' depends on unknown upstream '{upstream}'")]
    UnknownUpstream { job_id: String, upstream: String },

    #[error("job '{job_id}' depends on '{upstream}', which is not a tier 1 job")]
    NonTierOneUpstream { job_id: String, upstream: String },

    #[error("tier 1 job '{0}' must not declare upstream dependencies")]
    Tier1WithUpstream(String),

    #[error("tier 1 job '{0}' must not declare trigger rules")]
    Tier1WithTrigger(String),

    #[error("tier 2 job '{0}' must declare at least one upstream dependency")]
    Tier2WithoutUpstream(String),
}

/// Read-only, registration-ordered spec registry.
#[derive(Debug, Clone)]
pub struct SpecRegistry {
    specs: Vec<AnalysisJobSpec>,
    by_id: BTreeMap<String, usize>,
    /// Tier 1 job id -> tier 2 dependents, in registration order. Drives
    /// targeted re-evaluation on upstream completion.
    dependents: BTreeMap<String, Vec<String>>,
}

impl SpecRegistry {
    /// Build and validate the registry from specs in registration order.
    pub fn build(specs: Vec<AnalysisJobSpec>) -> Result<Self, RegistryError> {
        let mut by_id = BTreeMap::new();
        for (index, spec) in specs.iter().enumerate() {
            if by_id.insert(spec.id.clone(), index).is_some() {
                return Err(RegistryError::DuplicateId(spec.id.clone()));
            }
            match spec.tier {
                Tier::One => {
                    if !spec.required_upstream.is_empty() {
                        return Err(RegistryError::Tier1WithUpstream(spec.id.clone()));
                    }
                    if !spec.trigger.is_empty() {
                        return Err(RegistryError::Tier1WithTrigger(spec.id.clone()));
                    }
                }
                Tier::Two => {
                    if spec.required_upstream.is_empty() {
                        return Err(RegistryError::Tier2WithoutUpstream(spec.id.clone()));
                    }
                }
            }
        }

        let mut dependents: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for spec in &specs {
            for upstream in &spec.required_upstream {
                let Some(&upstream_index) = by_id.get(upstream) else {
                    return Err(RegistryError::UnknownUpstream {
                        job_id: spec.id.clone(),
                        upstream: upstream.clone(),
                    });
                };
                if specs[upstream_index].tier != Tier::One {
                    return Err(RegistryError::NonTierOneUpstream {
                        job_id: spec.id.clone(),
                        upstream: upstream.clone(),
                    });
                }
                dependents
                    .entry(upstream.clone())
                    .or_default()
                    .push(spec.id.clone());
            }
        }

        Ok(Self {
            specs,
            by_id,
            dependents,
        })
    }

    pub fn get(&self, id: &str) -> Option<&AnalysisJobSpec> {
        self.by_id.get(id).map(|&index| &self.specs[index])
    }

    /// All specs, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &AnalysisJobSpec> {
        self.specs.iter()
    }

    /// First-wave specs, in registration order.
    pub fn tier1(&self) -> impl Iterator<Item = &AnalysisJobSpec> {
        self.specs.iter().filter(|s| s.tier == Tier::One)
    }

    /// Second-wave specs, in registration order.
    pub fn tier2(&self) -> impl Iterator<Item = &AnalysisJobSpec> {
        self.specs.iter().filter(|s| s.tier == Tier::Two)
    }

    /// Tier 2 jobs that declare the given tier 1 job as a dependency.
    pub fn dependents_of(&self, id: &str) -> &[String] {
        self.dependents.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

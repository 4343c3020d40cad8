//! `acumen-core`: assessment domain foundation building blocks.
//!
//! This crate contains **pure domain** values (no orchestration concerns):
//! identifiers, the immutable assessment snapshot, and upstream output
//! handles shared by every downstream component.

pub mod context;
pub mod error;
pub mod id;
pub mod output;

pub use context::{
    AssessmentContext, BenchmarkData, CategoryAggregates, CategoryResponses, CompanyProfile,
    CompanySize, GrowthPhase, PercentileTable, QuestionResponse, QuestionnaireResponses,
    ResponseValue,
};
pub use error::{DomainError, DomainResult};
pub use id::{CompanyId, CorrelationId, RunId};
pub use output::{AnalysisOutput, UpstreamOutputRef, UpstreamState};

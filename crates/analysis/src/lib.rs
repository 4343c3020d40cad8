//! `acumen-analysis`
//!
//! **Responsibility:** the pure computation layer of the assessment pipeline.
//!
//! - Trigger rules as named predicate values, evaluated without side effects
//! - Request composition (deterministic: identical inputs, identical bytes)
//! - The analysis-job registry, loaded once at process start
//!
//! Nothing in this crate touches the clock, spawns threads, or mutates
//! shared state; orchestration lives in `acumen-pipeline`.

pub mod catalog;
pub mod compose;
pub mod evaluator;
pub mod payload;
pub mod registry;
pub mod rules;
pub mod spec;

pub use compose::{ComposeError, IdentityDecorator, OutputDecorator, UpstreamSelection, compose};
pub use evaluator::{TIER_ONE_REASON, TriggerDecision, evaluate};
pub use payload::{ModelParams, RequestPayload, ResponseFormat};
pub use registry::{RegistryError, SpecRegistry};
pub use rules::{RuleError, TriggerRule};
pub use spec::{AnalysisJobSpec, DependencyPolicy, TemplateRef, Tier, UserTemplate};

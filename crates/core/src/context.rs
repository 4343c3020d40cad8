//! Immutable snapshot of one company's assessment run.
//!
//! An [`AssessmentContext`] is created once per run and never mutated after
//! construction; every downstream component (trigger rules, composer,
//! orchestrator) only reads from it. Collections use `BTreeMap` so iteration
//! order is deterministic and composed output is reproducible byte-for-byte.

use core::str::FromStr;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::id::CompanyId;

/// Headcount bracket of the company under assessment.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanySize {
    Micro,
    Small,
    Medium,
    Large,
}

impl FromStr for CompanySize {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "micro" => Ok(CompanySize::Micro),
            "small" => Ok(CompanySize::Small),
            "medium" => Ok(CompanySize::Medium),
            "large" => Ok(CompanySize::Large),
            other => Err(DomainError::validation(format!(
                "unknown company size '{other}'"
            ))),
        }
    }
}

/// Growth phase as stated in the questionnaire.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthPhase {
    Startup,
    Expansion,
    Mature,
    Turnaround,
}

impl core::fmt::Display for GrowthPhase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            GrowthPhase::Startup => "startup",
            GrowthPhase::Expansion => "expansion",
            GrowthPhase::Mature => "mature",
            GrowthPhase::Turnaround => "turnaround",
        };
        f.write_str(s)
    }
}

impl FromStr for GrowthPhase {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "startup" => Ok(GrowthPhase::Startup),
            "expansion" => Ok(GrowthPhase::Expansion),
            "mature" => Ok(GrowthPhase::Mature),
            "turnaround" => Ok(GrowthPhase::Turnaround),
            other => Err(DomainError::validation(format!(
                "unknown growth phase '{other}'"
            ))),
        }
    }
}

/// Company master data captured by the questionnaire intake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub industry: String,
    pub size: CompanySize,
    pub growth_phase: GrowthPhase,
    /// Pain points as stated by the respondent, free text.
    pub pain_points: Vec<String>,
    pub strategic_goals: Vec<String>,
    /// Stated revenue growth target in percent, if the respondent gave one.
    pub growth_target_pct: Option<f64>,
}

impl CompanyProfile {
    pub fn new(industry: impl Into<String>, size: CompanySize, growth_phase: GrowthPhase) -> Self {
        Self {
            industry: industry.into(),
            size,
            growth_phase,
            pain_points: Vec::new(),
            strategic_goals: Vec::new(),
            growth_target_pct: None,
        }
    }

    pub fn with_pain_point(mut self, pain_point: impl Into<String>) -> Self {
        self.pain_points.push(pain_point.into());
        self
    }

    pub fn with_strategic_goal(mut self, goal: impl Into<String>) -> Self {
        self.strategic_goals.push(goal.into());
        self
    }

    pub fn with_growth_target_pct(mut self, pct: f64) -> Self {
        self.growth_target_pct = Some(pct);
        self
    }
}

/// Value of a single questionnaire response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseValue {
    Numeric(f64),
    /// Likert-style rating, typically 1..=5.
    Scale(u8),
    Text(String),
}

impl ResponseValue {
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            ResponseValue::Numeric(v) => Some(*v),
            ResponseValue::Scale(v) => Some(f64::from(*v)),
            ResponseValue::Text(_) => None,
        }
    }
}

/// One answered question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionResponse {
    pub question_id: String,
    pub value: ResponseValue,
}

impl QuestionResponse {
    pub fn numeric(question_id: impl Into<String>, value: f64) -> Self {
        Self {
            question_id: question_id.into(),
            value: ResponseValue::Numeric(value),
        }
    }

    pub fn scale(question_id: impl Into<String>, value: u8) -> Self {
        Self {
            question_id: question_id.into(),
            value: ResponseValue::Scale(value),
        }
    }

    pub fn text(question_id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            question_id: question_id.into(),
            value: ResponseValue::Text(value.into()),
        }
    }
}

/// Per-category aggregate metrics, precomputed at intake.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CategoryAggregates {
    /// Mean of the numeric responses, normalized to 0..=100. `None` when the
    /// category has no numeric responses.
    pub mean_score: Option<f64>,
    pub answered: usize,
}

/// All responses of one questionnaire category.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CategoryResponses {
    pub responses: Vec<QuestionResponse>,
    pub aggregates: CategoryAggregates,
}

impl CategoryResponses {
    pub fn new(responses: Vec<QuestionResponse>, aggregates: CategoryAggregates) -> Self {
        Self {
            responses,
            aggregates,
        }
    }
}

/// Questionnaire responses grouped by category.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuestionnaireResponses {
    categories: BTreeMap<String, CategoryResponses>,
}

impl QuestionnaireResponses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category(mut self, name: impl Into<String>, responses: CategoryResponses) -> Self {
        self.categories.insert(name.into(), responses);
        self
    }

    pub fn category(&self, name: &str) -> Option<&CategoryResponses> {
        self.categories.get(name)
    }

    /// Mean score of a category, if the category exists and has numeric data.
    pub fn mean_score(&self, category: &str) -> Option<f64> {
        self.categories.get(category)?.aggregates.mean_score
    }

    pub fn categories(&self) -> impl Iterator<Item = (&str, &CategoryResponses)> {
        self.categories.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Percentile table for one metric within a peer group.
///
/// Points are kept sorted by percentile; construction is the only mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentileTable {
    peer_group: String,
    points: Vec<(u8, f64)>,
}

impl PercentileTable {
    pub fn new(peer_group: impl Into<String>, mut points: Vec<(u8, f64)>) -> Self {
        points.sort_by_key(|(p, _)| *p);
        Self {
            peer_group: peer_group.into(),
            points,
        }
    }

    pub fn peer_group(&self) -> &str {
        &self.peer_group
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Value at the given percentile: the point with the largest percentile
    /// `<= p`, falling back to the lowest point.
    pub fn value_at(&self, percentile: u8) -> Option<f64> {
        let mut result = None;
        for (p, v) in &self.points {
            if *p <= percentile {
                result = Some(*v);
            } else {
                break;
            }
        }
        result.or_else(|| self.points.first().map(|(_, v)| *v))
    }
}

/// Benchmark percentile tables keyed by metric name.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BenchmarkData {
    tables: BTreeMap<String, PercentileTable>,
}

impl BenchmarkData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, metric: impl Into<String>, table: PercentileTable) -> Self {
        self.tables.insert(metric.into(), table);
        self
    }

    pub fn table(&self, metric: &str) -> Option<&PercentileTable> {
        self.tables.get(metric)
    }
}

/// Immutable snapshot for one company's assessment run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentContext {
    company_id: CompanyId,
    profile: CompanyProfile,
    questionnaire: QuestionnaireResponses,
    benchmarks: BenchmarkData,
}

impl AssessmentContext {
    pub fn new(company_id: CompanyId, profile: CompanyProfile) -> Self {
        Self {
            company_id,
            profile,
            questionnaire: QuestionnaireResponses::default(),
            benchmarks: BenchmarkData::default(),
        }
    }

    pub fn with_questionnaire(mut self, questionnaire: QuestionnaireResponses) -> Self {
        self.questionnaire = questionnaire;
        self
    }

    pub fn with_benchmarks(mut self, benchmarks: BenchmarkData) -> Self {
        self.benchmarks = benchmarks;
        self
    }

    pub fn company_id(&self) -> CompanyId {
        self.company_id
    }

    pub fn profile(&self) -> &CompanyProfile {
        &self.profile
    }

    pub fn questionnaire(&self) -> &QuestionnaireResponses {
        &self.questionnaire
    }

    pub fn benchmarks(&self) -> &BenchmarkData {
        &self.benchmarks
    }
}

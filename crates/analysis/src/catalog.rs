//! The standing business-assessment job catalog.
//!
//! Five first-wave analyses always run; three second-wave analyses are
//! conditional. Template text here is deliberately short; prompt wording
//! is owned by the report product, and the full texts are injected by the
//! caller in production. The catalog exists so the pipeline runs end to end
//! with realistic shapes.

use acumen_core::{AssessmentContext, GrowthPhase};

use crate::compose::{ComposeError, UpstreamSelection};
use crate::registry::{RegistryError, SpecRegistry};
use crate::rules::TriggerRule;
use crate::spec::{AnalysisJobSpec, TemplateRef};

pub const STRATEGIC_POSITIONING: &str = "strategicPositioning";
pub const FINANCIAL_HEALTH: &str = "financialHealth";
pub const OPERATIONAL_MATURITY: &str = "operationalMaturity";
pub const COMPLIANCE_SUSTAINABILITY: &str = "complianceSustainability";
pub const MARKET_DYNAMICS: &str = "marketDynamics";
pub const GROWTH_READINESS: &str = "growthReadiness";
pub const RISK_RESILIENCE: &str = "riskResilience";
pub const DIGITAL_TRANSFORMATION: &str = "digitalTransformation";

fn profile_block(ctx: &AssessmentContext) -> String {
    let profile = ctx.profile();
    format!(
        "Industry: {}\nGrowth phase: {}\nStated goals: {}",
        profile.industry,
        profile.growth_phase,
        profile.strategic_goals.join("; "),
    )
}

fn category_block(ctx: &AssessmentContext, category: &str) -> Result<String, ComposeError> {
    let mean = ctx
        .questionnaire()
        .mean_score(category)
        .ok_or_else(|| ComposeError::missing_field(format!("questionnaire.{category}")))?;
    Ok(format!("{category} mean score: {mean:.1}"))
}

fn strategic_positioning_user(
    ctx: &AssessmentContext,
    _upstream: &UpstreamSelection<'_>,
) -> Result<String, ComposeError> {
    Ok(format!(
        "Assess the company's strategic position.\n{}\nPain points: {}",
        profile_block(ctx),
        ctx.profile().pain_points.join("; "),
    ))
}

fn financial_health_user(
    ctx: &AssessmentContext,
    _upstream: &UpstreamSelection<'_>,
) -> Result<String, ComposeError> {
    Ok(format!(
        "Evaluate financial health.\n{}\n{}",
        profile_block(ctx),
        category_block(ctx, "finance")?,
    ))
}

fn operational_maturity_user(
    ctx: &AssessmentContext,
    _upstream: &UpstreamSelection<'_>,
) -> Result<String, ComposeError> {
    Ok(format!(
        "Evaluate operational maturity.\n{}\n{}",
        profile_block(ctx),
        category_block(ctx, "operations")?,
    ))
}

fn compliance_sustainability_user(
    ctx: &AssessmentContext,
    _upstream: &UpstreamSelection<'_>,
) -> Result<String, ComposeError> {
    Ok(format!(
        "Evaluate compliance and sustainability posture.\n{}\n{}",
        profile_block(ctx),
        category_block(ctx, "compliance")?,
    ))
}

fn market_dynamics_user(
    ctx: &AssessmentContext,
    _upstream: &UpstreamSelection<'_>,
) -> Result<String, ComposeError> {
    Ok(format!(
        "Evaluate market dynamics for the company's segment.\n{}",
        profile_block(ctx),
    ))
}

fn growth_readiness_user(
    ctx: &AssessmentContext,
    upstream: &UpstreamSelection<'_>,
) -> Result<String, ComposeError> {
    let target = ctx
        .profile()
        .growth_target_pct
        .ok_or_else(|| ComposeError::missing_field("profile.growth_target_pct"))?;
    Ok(format!(
        "Assess growth readiness against a {target}% revenue growth target.\n{}\n\
         Financial context: {}\nMarket context: {}",
        profile_block(ctx),
        upstream.output(FINANCIAL_HEALTH)?.summary,
        upstream.output(MARKET_DYNAMICS)?.summary,
    ))
}

fn risk_resilience_user(
    ctx: &AssessmentContext,
    upstream: &UpstreamSelection<'_>,
) -> Result<String, ComposeError> {
    Ok(format!(
        "Assess risk resilience.\n{}\nCompliance context: {}",
        profile_block(ctx),
        upstream.output(COMPLIANCE_SUSTAINABILITY)?.summary,
    ))
}

fn digital_transformation_user(
    ctx: &AssessmentContext,
    upstream: &UpstreamSelection<'_>,
) -> Result<String, ComposeError> {
    Ok(format!(
        "Assess digital transformation potential.\n{}\nOperational context: {}",
        profile_block(ctx),
        upstream.output(OPERATIONAL_MATURITY)?.summary,
    ))
}

/// The default job set, in the order the report presents its sections.
pub fn default_specs() -> Vec<AnalysisJobSpec> {
    vec![
        AnalysisJobSpec::tier1(
            STRATEGIC_POSITIONING,
            TemplateRef {
                system: "You are a strategy consultant writing an assessment report section.",
                user: strategic_positioning_user,
            },
        ),
        AnalysisJobSpec::tier1(
            FINANCIAL_HEALTH,
            TemplateRef {
                system: "You are a financial analyst writing an assessment report section.",
                user: financial_health_user,
            },
        ),
        AnalysisJobSpec::tier1(
            OPERATIONAL_MATURITY,
            TemplateRef {
                system: "You are an operations consultant writing an assessment report section.",
                user: operational_maturity_user,
            },
        ),
        AnalysisJobSpec::tier1(
            COMPLIANCE_SUSTAINABILITY,
            TemplateRef {
                system: "You are a compliance advisor writing an assessment report section.",
                user: compliance_sustainability_user,
            },
        ),
        AnalysisJobSpec::tier1(
            MARKET_DYNAMICS,
            TemplateRef {
                system: "You are a market analyst writing an assessment report section.",
                user: market_dynamics_user,
            },
        ),
        AnalysisJobSpec::tier2(
            GROWTH_READINESS,
            TemplateRef {
                system: "You are a growth consultant writing an assessment report section.",
                user: growth_readiness_user,
            },
        )
        .with_upstream(FINANCIAL_HEALTH)
        .with_upstream(MARKET_DYNAMICS)
        .with_trigger(TriggerRule::GrowthTargetAbove { threshold_pct: 25.0 })
        .with_trigger(TriggerRule::GrowthPhaseIn {
            phases: vec![GrowthPhase::Startup, GrowthPhase::Expansion],
        })
        .with_trigger(
            TriggerRule::pain_point_matches("scal(e|ing)|capacity", "scaling pressure")
                .expect("static pattern"),
        )
        .with_trigger(TriggerRule::UpstreamScoreBelow {
            upstream_job: FINANCIAL_HEALTH.to_string(),
            score: "liquidity".to_string(),
            threshold: 60.0,
        }),
        AnalysisJobSpec::tier2(
            RISK_RESILIENCE,
            TemplateRef {
                system: "You are a risk advisor writing an assessment report section.",
                user: risk_resilience_user,
            },
        )
        .with_upstream(COMPLIANCE_SUSTAINABILITY)
        .with_trigger(TriggerRule::UpstreamScoreBelow {
            upstream_job: COMPLIANCE_SUSTAINABILITY.to_string(),
            score: "compliance".to_string(),
            threshold: 65.0,
        })
        .with_trigger(
            TriggerRule::pain_point_matches("risk|audit|regulat", "risk exposure")
                .expect("static pattern"),
        ),
        AnalysisJobSpec::tier2(
            DIGITAL_TRANSFORMATION,
            TemplateRef {
                system: "You are a digitalization consultant writing an assessment report section.",
                user: digital_transformation_user,
            },
        )
        .with_upstream(OPERATIONAL_MATURITY)
        .with_trigger(TriggerRule::CategoryScoreBelow {
            category: "digitalization".to_string(),
            threshold: 50.0,
        })
        .with_trigger(
            TriggerRule::pain_point_matches("manual|legacy|spreadsheet", "manual processes")
                .expect("static pattern"),
        )
        .with_trigger(TriggerRule::BenchmarkBelowPercentile {
            category: "operations".to_string(),
            metric: "processAutomation".to_string(),
            percentile: 40,
        }),
    ]
}

/// Build the default registry.
pub fn default_registry() -> Result<SpecRegistry, RegistryError> {
    SpecRegistry::build(default_specs())
}

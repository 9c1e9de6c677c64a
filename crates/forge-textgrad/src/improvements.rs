//! Improvement synthesis from gradient scores
//!
//! Each dimension maps to a rule: the threshold below which it is considered
//! failing, the kind of change to propose, and how much success-rate gain to
//! promise per point of shortfall.

use forge_core::{ImpactLevel, Improvement, ImprovementDetails, ImprovementStatus, ImprovementType};

/// Confidence attached to every synthesized improvement
pub const IMPROVEMENT_CONFIDENCE: f64 = 0.8;
pub const DEFAULT_THRESHOLD: f64 = 75.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DimensionKind {
    Safety,
    Cost,
    Quality,
    Domain,
    /// performance and usability: own threshold, generic wording
    Performance,
    Other,
}

impl DimensionKind {
    fn of(dimension: &str) -> Self {
        match dimension {
            "safety" => DimensionKind::Safety,
            "cost" => DimensionKind::Cost,
            "quality" | "correctness" => DimensionKind::Quality,
            "domain" | "domain_compliance" => DimensionKind::Domain,
            "performance" | "usability" => DimensionKind::Performance,
            _ => DimensionKind::Other,
        }
    }
}

/// How a failing dimension is turned into an improvement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DimensionRule {
    pub threshold: f64,
    pub improvement_type: ImprovementType,
    pub impact: ImpactLevel,
    /// Expected gain per point below threshold, in percent
    pub gain_per_point: f64,
    /// Ceiling on the expected gain, in percent
    pub max_gain: f64,
}

impl DimensionRule {
    pub fn for_dimension(dimension: &str) -> Self {
        let (threshold, improvement_type, impact, gain_per_point, max_gain) =
            match DimensionKind::of(dimension) {
                DimensionKind::Safety => {
                    (70.0, ImprovementType::ParameterTune, ImpactLevel::Critical, 0.5, 20.0)
                }
                DimensionKind::Cost => {
                    (75.0, ImprovementType::ParameterTune, ImpactLevel::Medium, 0.2, 5.0)
                }
                DimensionKind::Quality => {
                    (80.0, ImprovementType::TemplateAdjust, ImpactLevel::High, 0.8, 25.0)
                }
                DimensionKind::Domain => {
                    (75.0, ImprovementType::TemplateAdjust, ImpactLevel::High, 0.6, 20.0)
                }
                DimensionKind::Performance => {
                    (70.0, ImprovementType::ParameterTune, ImpactLevel::Medium, 0.3, 10.0)
                }
                DimensionKind::Other => (
                    DEFAULT_THRESHOLD,
                    ImprovementType::ParameterTune,
                    ImpactLevel::Medium,
                    0.3,
                    10.0,
                ),
            };
        Self {
            threshold,
            improvement_type,
            impact,
            gain_per_point,
            max_gain,
        }
    }

    /// Expected success-rate gain as a fraction
    pub fn expected_delta(&self, shortfall: f64) -> f64 {
        (shortfall * self.gain_per_point).min(self.max_gain) / 100.0
    }
}

fn describe(variable: &str, dimension: &str, score: f64, threshold: f64) -> String {
    match DimensionKind::of(dimension) {
        DimensionKind::Safety => format!(
            "Variable '{}' failing safety evaluation (score: {:.1}%, threshold: {:.1}%). \
             Add guardrails or validation to prevent unsafe outputs.",
            variable, score, threshold
        ),
        DimensionKind::Cost => format!(
            "Variable '{}' failing cost efficiency (score: {:.1}%, threshold: {:.1}%). \
             Reduce prompt size, optimize token usage, or use cheaper model.",
            variable, score, threshold
        ),
        DimensionKind::Quality => format!(
            "Variable '{}' failing quality/correctness (score: {:.1}%, threshold: {:.1}%). \
             Improve prompt template, add examples, or tune parameters.",
            variable, score, threshold
        ),
        DimensionKind::Domain => format!(
            "Variable '{}' failing domain compliance (score: {:.1}%, threshold: {:.1}%). \
             Add domain-specific guidance or constraints.",
            variable, score, threshold
        ),
        DimensionKind::Performance | DimensionKind::Other => format!(
            "Variable '{}' - dimension '{}' below threshold (score: {:.1}%, threshold: {:.1}%).",
            variable, dimension, score, threshold
        ),
    }
}

/// A pending improvement for `variable` when `score` is under the dimension's
/// threshold, `None` otherwise
pub fn improvement_for_dimension(variable: &str, dimension: &str, score: f64) -> Option<Improvement> {
    let rule = DimensionRule::for_dimension(dimension);
    if score >= rule.threshold {
        return None;
    }
    let shortfall = rule.threshold - score;

    Some(Improvement {
        id: uuid::Uuid::new_v4().to_string(),
        improvement_type: rule.improvement_type,
        description: describe(variable, dimension, score, rule.threshold),
        confidence: IMPROVEMENT_CONFIDENCE,
        impact: rule.impact,
        target_pattern: variable.to_string(),
        status: ImprovementStatus::Pending,
        details: ImprovementDetails {
            expected_success_rate_delta: rule.expected_delta(shortfall),
            rationale: format!(
                "Dimension '{}' scored {:.1}%, which is {:.1}% below threshold of {:.1}%. \
                 Targeted improvements expected to address this gap.",
                dimension, score, shortfall, rule.threshold
            ),
        },
    })
}

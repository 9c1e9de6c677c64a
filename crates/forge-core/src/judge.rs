//! Judge orchestrator contract
//!
//! The orchestrator fans an evaluation request out to several LLM judges and
//! returns their verdicts together with an aggregate. Only the wire shapes
//! live here; scoring itself is the orchestrator's business.

use crate::context::CallContext;
use crate::data_model::FieldMap;
use crate::error::ForgeError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// How judges are scheduled by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionMode {
    Synchronous,
    Asynchronous,
    /// Critical judges run inline, the rest in the background
    #[default]
    Hybrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AggregationStrategy {
    #[default]
    WeightedAverage,
    AllMustPass,
    MajorityPass,
    AnyPass,
    MinScore,
    MaxScore,
}

impl fmt::Display for AggregationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            AggregationStrategy::WeightedAverage => "WEIGHTED_AVERAGE",
            AggregationStrategy::AllMustPass => "ALL_MUST_PASS",
            AggregationStrategy::MajorityPass => "MAJORITY_PASS",
            AggregationStrategy::AnyPass => "ANY_PASS",
            AggregationStrategy::MinScore => "MIN_SCORE",
            AggregationStrategy::MaxScore => "MAX_SCORE",
        };
        write!(f, "{}", name)
    }
}

/// What the judges are asked to look at
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationContext {
    pub prompt: String,
    pub response: String,
    #[serde(default)]
    pub metadata: FieldMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluateRequest {
    pub judge_ids: Vec<String>,
    pub context: EvaluationContext,
    pub execution_mode: ExecutionMode,
    pub aggregation: AggregationStrategy,
    /// Forward the verdicts to the external observability sink
    pub export: bool,
    /// Per-judge timeout
    pub timeout_seconds: u32,
    pub fail_fast: bool,
}

/// One judge's opinion. Scores are on a 0-100 scale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JudgeVerdict {
    pub judge_id: String,
    #[serde(default)]
    pub judge_name: String,
    /// PASS / FAIL / PARTIAL_PASS
    #[serde(default)]
    pub verdict: String,
    pub overall_score: f64,
    #[serde(default)]
    pub dimension_scores: BTreeMap<String, f64>,
    #[serde(default)]
    pub reasoning: String,
}

impl JudgeVerdict {
    pub fn new(judge_id: impl Into<String>, overall_score: f64) -> Self {
        Self {
            judge_id: judge_id.into(),
            overall_score,
            ..Default::default()
        }
    }

    pub fn with_dimension(mut self, dimension: impl Into<String>, score: f64) -> Self {
        self.dimension_scores.insert(dimension.into(), score);
        self
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedScores {
    pub weighted_average_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluateResponse {
    pub passed: bool,
    pub final_score: f64,
    #[serde(default)]
    pub verdicts: Vec<JudgeVerdict>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregated: Option<AggregatedScores>,
}

impl EvaluateResponse {
    /// Mean score per dimension name across every verdict that reports it
    pub fn dimension_averages(&self) -> BTreeMap<String, f64> {
        let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
        for verdict in &self.verdicts {
            for (dimension, score) in &verdict.dimension_scores {
                let entry = sums.entry(dimension.clone()).or_insert((0.0, 0));
                entry.0 += score;
                entry.1 += 1;
            }
        }
        sums.into_iter()
            .map(|(dimension, (sum, count))| (dimension, sum / count as f64))
            .collect()
    }
}

/// Multi-judge evaluation service
pub trait JudgeOrchestrator: Send + Sync {
    fn evaluate(
        &self,
        ctx: &CallContext,
        request: &EvaluateRequest,
    ) -> Result<EvaluateResponse, ForgeError>;
}

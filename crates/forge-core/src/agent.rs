//! Collaborator contracts consumed by the optimizers
//!
//! Implementations live outside this workspace (LLM-backed agents, the judge
//! service, the learning agent). All calls are blocking and take a
//! [`CallContext`]; a cancelled context should surface as an `Err`.

use crate::context::CallContext;
use crate::data_model::{Demonstration, Example, ExecutionResult, FieldMap, Improvement};
use crate::error::ForgeError;
use crate::judge::JudgeVerdict;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The mutable, optimizable part of an agent's memory
pub trait Memory: Send + Sync {
    /// Replace the learned prompts and demonstrations
    fn update_learned_layer(
        &self,
        prompts: &FieldMap,
        demonstrations: &[Demonstration],
    ) -> Result<(), ForgeError>;

    fn learned_layer(&self) -> (FieldMap, Vec<Demonstration>);

    fn learned_version(&self) -> String;
}

pub trait Agent: Send + Sync {
    fn id(&self) -> &str;

    fn run(&self, ctx: &CallContext, inputs: &FieldMap) -> Result<ExecutionResult, ForgeError>;

    /// An independent copy whose memory can be changed without touching this agent
    fn clone_agent(&self) -> Box<dyn Agent>;

    /// `None` when the agent has no learned layer
    fn memory(&self) -> Option<&dyn Memory>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricType {
    ExactMatch,
    MultiJudge,
    Custom,
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MetricType::ExactMatch => write!(f, "EXACT_MATCH"),
            MetricType::MultiJudge => write!(f, "MULTI_JUDGE"),
            MetricType::Custom => write!(f, "CUSTOM"),
        }
    }
}

/// Scores an agent result against an example
pub trait Metric: Send + Sync {
    /// Score in [0, 1]
    fn evaluate(
        &self,
        ctx: &CallContext,
        example: &Example,
        result: &ExecutionResult,
    ) -> Result<f64, ForgeError>;

    fn metric_type(&self) -> MetricType;

    fn name(&self) -> String;

    /// Metrics that can report per-dimension scores return themselves here
    fn as_dimensional(&self) -> Option<&dyn DimensionalMetric> {
        None
    }
}

/// Everything one detailed evaluation produced. Returned by value, so a
/// metric instance never has to remember its last call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricEvaluation {
    /// Score in [0, 1], identical to what `Metric::evaluate` returns
    pub score: f64,
    /// Mean score per dimension across verdicts (0-100 scale)
    pub dimension_scores: BTreeMap<String, f64>,
    pub verdicts: Vec<JudgeVerdict>,
}

/// Capability: a metric that exposes per-dimension judge scores
pub trait DimensionalMetric: Send + Sync {
    fn evaluate_detailed(
        &self,
        ctx: &CallContext,
        example: &Example,
        result: &ExecutionResult,
    ) -> Result<MetricEvaluation, ForgeError>;
}

/// Proposes instruction candidates for MIPRO
pub trait InstructionGenerator: Send + Sync {
    fn generate(
        &self,
        ctx: &CallContext,
        task_description: &str,
        num_candidates: usize,
    ) -> Result<Vec<String>, ForgeError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyImprovementResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub improvement: Option<Improvement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollbackImprovementResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub restored_version: String,
}

/// System of record for applied improvements.
///
/// Must be safe for concurrent use when several steps target the same agent;
/// the optimizers do not serialize edits across calls.
pub trait LearningAgentClient: Send + Sync {
    fn apply_improvement(
        &self,
        ctx: &CallContext,
        improvement_id: &str,
        force: bool,
    ) -> Result<ApplyImprovementResponse, ForgeError>;

    fn rollback_improvement(
        &self,
        ctx: &CallContext,
        improvement_id: &str,
        reason: &str,
    ) -> Result<RollbackImprovementResponse, ForgeError>;
}

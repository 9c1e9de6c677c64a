//! Data Model: examples, traces, demonstrations, improvements, compilation results
use crate::judge::JudgeVerdict;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Named string fields (inputs, outputs, prompts, metadata).
///
/// Ordered so that every textual rendering and every hash is stable.
pub type FieldMap = BTreeMap<String, String>;

/// An optimizable parameter. `gradient` is overwritten wholesale by each backward pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    /// Parameter name (ex: "system_prompt")
    pub name: String,
    /// Current value
    pub value: String,
    /// Textual gradient from judge feedback
    #[serde(default)]
    pub gradient: String,
}

impl Variable {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            gradient: String::new(),
        }
    }
}

/// A training, dev or validation example
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Example {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub inputs: FieldMap,
    /// Expected outputs
    #[serde(default)]
    pub outputs: FieldMap,
    #[serde(default)]
    pub metadata: FieldMap,
}

impl Example {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_input(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.inputs.insert(key.into(), value.into());
        self
    }

    pub fn with_output(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.outputs.insert(key.into(), value.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// What an agent produced for one example
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub trace_id: String,
    #[serde(default)]
    pub inputs: FieldMap,
    #[serde(default)]
    pub outputs: FieldMap,
    /// Chain-of-thought or explanation, empty when the agent gives none
    #[serde(default)]
    pub rationale: String,
    pub success: bool,
    #[serde(default)]
    pub metadata: FieldMap,
}

/// A scored agent run kept by the trainset pass. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionTrace {
    pub trace_id: String,
    pub example: Example,
    pub result: ExecutionResult,
    /// Metric score in [0, 1]
    pub quality_score: f64,
    pub timestamp: DateTime<Utc>,
    pub metadata: FieldMap,
    /// Per-dimension judge averages, when the metric reports them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension_scores: Option<BTreeMap<String, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge_verdicts: Option<Vec<JudgeVerdict>>,
}

/// A worked example injected into an agent's prompt context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Demonstration {
    pub pattern_name: String,
    pub input: String,
    pub rationale: String,
    pub output: String,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: FieldMap,
}

impl Demonstration {
    /// Snapshot a trace
    pub fn from_trace(trace: &ExecutionTrace) -> Self {
        Self {
            pattern_name: trace
                .metadata
                .get("pattern_name")
                .cloned()
                .unwrap_or_default(),
            input: format_fields(&trace.example.inputs),
            rationale: trace.result.rationale.clone(),
            output: format_fields(&trace.result.outputs),
            confidence: trace.quality_score,
            timestamp: trace.timestamp,
            metadata: trace.metadata.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImprovementType {
    ParameterTune,
    TemplateAdjust,
    PatternAdd,
    PatternRemove,
}

impl fmt::Display for ImprovementType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ImprovementType::ParameterTune => write!(f, "parameter-tune"),
            ImprovementType::TemplateAdjust => write!(f, "template-adjust"),
            ImprovementType::PatternAdd => write!(f, "pattern-add"),
            ImprovementType::PatternRemove => write!(f, "pattern-remove"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactLevel {
    Low = 0,
    Medium = 1,
    High = 2,
    Critical = 3,
}

impl fmt::Display for ImpactLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ImpactLevel::Low => write!(f, "low"),
            ImpactLevel::Medium => write!(f, "medium"),
            ImpactLevel::High => write!(f, "high"),
            ImpactLevel::Critical => write!(f, "critical"),
        }
    }
}

/// Lifecycle as seen by this engine; the learning agent owns the transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImprovementStatus {
    Pending,
    Applied,
    RolledBack,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImprovementDetails {
    /// Expected success-rate gain as a fraction (0.2 = 20%)
    pub expected_success_rate_delta: f64,
    pub rationale: String,
}

/// A proposed change to an agent, derived from a failing judge dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Improvement {
    pub id: String,
    #[serde(rename = "type")]
    pub improvement_type: ImprovementType,
    pub description: String,
    pub confidence: f64,
    pub impact: ImpactLevel,
    pub target_pattern: String,
    pub status: ImprovementStatus,
    pub details: ImprovementDetails,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TeleprompterType {
    BootstrapFewShot,
    Mipro,
    Copro,
}

impl fmt::Display for TeleprompterType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TeleprompterType::BootstrapFewShot => write!(f, "BOOTSTRAP_FEW_SHOT"),
            TeleprompterType::Mipro => write!(f, "MIPRO"),
            TeleprompterType::Copro => write!(f, "COPRO"),
        }
    }
}

/// Output of one optimizer run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilationResult {
    pub compilation_id: String,
    pub agent_id: String,
    pub strategy_type: TeleprompterType,
    pub optimized_prompts: FieldMap,
    pub demonstrations: Vec<Demonstration>,
    pub trainset_score: f64,
    pub devset_score: f64,
    pub examples_used: usize,
    pub successful_traces: usize,
    pub optimization_rounds: u32,
    pub improvement_delta: f64,
    pub compilation_time_ms: u64,
    /// Content hash of prompts + demonstrations
    pub compiled_version: String,
    pub compiled_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: FieldMap,
}

/// One validation cycle. Recomputed each time, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub base_score: f64,
    pub new_score: f64,
    /// new_score - base_score, filled in by the caller
    pub score_delta: f64,
    pub passed: bool,
    pub failed_tests: usize,
}

/// Render a field map as demonstration text.
///
/// A single field yields its bare value; several fields yield
/// newline-joined `key: value` lines.
pub fn format_fields(fields: &FieldMap) -> String {
    if fields.len() == 1 {
        if let Some(value) = fields.values().next() {
            return value.clone();
        }
    }
    join_fields(fields)
}

/// Render every field as a `key: value` line, even when there is only one
pub fn join_fields(fields: &FieldMap) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{}: {}", k, v))
        .collect::<Vec<_>>()
        .join("\n")
}

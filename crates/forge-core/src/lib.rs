//! Forge Core: data model, collaborator contracts and configuration
//!
//! Shared vocabulary for the optimization crates. Everything that talks to
//! the outside world (agents, memories, metrics, the judge orchestrator and
//! the learning agent) is a trait here so the optimizers never depend on a
//! concrete transport.

pub mod agent;
pub mod config;
pub mod context;
pub mod data_model;
pub mod error;
pub mod judge;
pub mod telemetry;
pub mod version;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

pub use agent::{
    Agent, ApplyImprovementResponse, DimensionalMetric, InstructionGenerator, LearningAgentClient,
    Memory, Metric, MetricEvaluation, MetricType, RollbackImprovementResponse,
};
pub use config::{
    AutoApplyMode, ConfigError, MiproConfig, TeacherConfig, TeleprompterConfig, ValidationConfig,
};
pub use context::CallContext;
pub use data_model::{
    format_fields, join_fields, CompilationResult, Demonstration, Example, ExecutionResult,
    ExecutionTrace, FieldMap, ImpactLevel, Improvement, ImprovementDetails, ImprovementStatus,
    ImprovementType, TeleprompterType, ValidationResult, Variable,
};
pub use error::ForgeError;
pub use judge::{
    AggregatedScores, AggregationStrategy, EvaluateRequest, EvaluateResponse, EvaluationContext,
    ExecutionMode, JudgeOrchestrator, JudgeVerdict,
};
pub use version::compiled_version;

/// Engine version stamped into compilation metadata
pub const FORGE_VERSION: &str = "1.0.0";

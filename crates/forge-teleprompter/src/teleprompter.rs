//! Teleprompter contract
use forge_core::{
    Agent, CallContext, CompilationResult, Example, ForgeError, Metric, TeleprompterConfig,
    TeleprompterType,
};
use std::sync::Arc;

/// Inputs to one optimizer run
#[derive(Clone)]
pub struct CompileRequest {
    pub agent_id: String,
    /// The agent whose learned layer receives the result
    pub agent: Arc<dyn Agent>,
    pub trainset: Vec<Example>,
    /// Optional held-out set; empty means "not supplied"
    pub devset: Vec<Example>,
    pub metric: Arc<dyn Metric>,
    pub config: TeleprompterConfig,
}

impl CompileRequest {
    pub fn new(agent: Arc<dyn Agent>, trainset: Vec<Example>, metric: Arc<dyn Metric>) -> Self {
        Self {
            agent_id: agent.id().to_string(),
            agent,
            trainset,
            devset: Vec::new(),
            metric,
            config: TeleprompterConfig::default(),
        }
    }

    pub fn with_devset(mut self, devset: Vec<Example>) -> Self {
        self.devset = devset;
        self
    }

    pub fn with_config(mut self, config: TeleprompterConfig) -> Self {
        self.config = config;
        self
    }
}

pub trait Teleprompter: Send + Sync {
    fn compile(
        &self,
        ctx: &CallContext,
        request: &CompileRequest,
    ) -> Result<CompilationResult, ForgeError>;

    fn teleprompter_type(&self) -> TeleprompterType;

    fn name(&self) -> &'static str;

    fn supports_multi_round(&self) -> bool;

    fn supports_teacher(&self) -> bool;
}

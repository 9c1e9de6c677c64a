//! Scripted collaborators for tests
//!
//! Enabled in this crate's own tests and, through the `testkit` feature, in
//! the dev-dependencies of the optimizer crates.

use crate::agent::{
    Agent, ApplyImprovementResponse, DimensionalMetric, InstructionGenerator, LearningAgentClient,
    Memory, Metric, MetricEvaluation, MetricType, RollbackImprovementResponse,
};
use crate::context::CallContext;
use crate::data_model::{Demonstration, Example, ExecutionResult, FieldMap};
use crate::error::ForgeError;
use crate::judge::{EvaluateRequest, EvaluateResponse, JudgeOrchestrator, JudgeVerdict};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Learned layer kept in process
#[derive(Debug, Default)]
pub struct InMemoryMemory {
    layer: RwLock<(FieldMap, Vec<Demonstration>)>,
    fail_updates: bool,
}

impl InMemoryMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prompts(prompts: FieldMap) -> Self {
        Self {
            layer: RwLock::new((prompts, Vec::new())),
            fail_updates: false,
        }
    }

    /// Every update is refused
    pub fn failing() -> Self {
        Self {
            fail_updates: true,
            ..Self::default()
        }
    }

    fn snapshot(&self) -> Self {
        Self {
            layer: RwLock::new(self.learned_layer()),
            fail_updates: self.fail_updates,
        }
    }
}

impl Memory for InMemoryMemory {
    fn update_learned_layer(
        &self,
        prompts: &FieldMap,
        demonstrations: &[Demonstration],
    ) -> Result<(), ForgeError> {
        if self.fail_updates {
            return Err(ForgeError::Memory("learned layer is read-only".to_string()));
        }
        let mut layer = self
            .layer
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *layer = (prompts.clone(), demonstrations.to_vec());
        Ok(())
    }

    fn learned_layer(&self) -> (FieldMap, Vec<Demonstration>) {
        self.layer
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn learned_version(&self) -> String {
        let (prompts, demos) = self.learned_layer();
        crate::version::compiled_version(&prompts, &demos)
    }
}

/// `(inputs, learned prompts) -> outputs`
pub type AgentFn = dyn Fn(&FieldMap, &FieldMap) -> Result<FieldMap, ForgeError> + Send + Sync;

/// Agent whose answers come from a closure over the inputs and its current prompts
pub struct ScriptedAgent {
    id: String,
    handler: Arc<AgentFn>,
    memory: Option<InMemoryMemory>,
    runs: Arc<AtomicUsize>,
}

impl ScriptedAgent {
    pub fn new<F>(id: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&FieldMap, &FieldMap) -> Result<FieldMap, ForgeError> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            handler: Arc::new(handler),
            memory: Some(InMemoryMemory::new()),
            runs: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Copies the `answer` input, when present, to the `answer` output
    pub fn echo(id: impl Into<String>) -> Self {
        Self::new(id, |inputs, _| {
            let mut outputs = FieldMap::new();
            if let Some(answer) = inputs.get("answer") {
                outputs.insert("answer".to_string(), answer.clone());
            }
            Ok(outputs)
        })
    }

    pub fn with_memory(mut self, memory: InMemoryMemory) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn without_memory(mut self) -> Self {
        self.memory = None;
        self
    }

    /// Runs across this agent and every clone of it
    pub fn run_count(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> FieldMap {
        self.memory
            .as_ref()
            .map(|m| m.learned_layer().0)
            .unwrap_or_default()
    }

    pub fn demonstrations(&self) -> Vec<Demonstration> {
        self.memory
            .as_ref()
            .map(|m| m.learned_layer().1)
            .unwrap_or_default()
    }
}

impl Agent for ScriptedAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn run(&self, ctx: &CallContext, inputs: &FieldMap) -> Result<ExecutionResult, ForgeError> {
        ctx.check()?;
        let n = self.runs.fetch_add(1, Ordering::SeqCst);
        let outputs = (self.handler)(inputs, &self.prompts())?;
        Ok(ExecutionResult {
            trace_id: format!("{}-run-{}", self.id, n),
            inputs: inputs.clone(),
            outputs,
            rationale: String::new(),
            success: true,
            metadata: FieldMap::new(),
        })
    }

    fn clone_agent(&self) -> Box<dyn Agent> {
        Box::new(Self {
            id: self.id.clone(),
            handler: Arc::clone(&self.handler),
            memory: self.memory.as_ref().map(InMemoryMemory::snapshot),
            runs: Arc::clone(&self.runs),
        })
    }

    fn memory(&self) -> Option<&dyn Memory> {
        self.memory.as_ref().map(|m| m as &dyn Memory)
    }
}

pub type MetricFn =
    dyn Fn(&Example, &ExecutionResult) -> Result<MetricEvaluation, ForgeError> + Send + Sync;

/// Metric driven by a closure; optionally exposes dimension scores
pub struct ScriptedMetric {
    name: String,
    handler: Box<MetricFn>,
    dimensional: bool,
}

impl ScriptedMetric {
    /// Plain metric returning only a score
    pub fn scalar<F>(name: impl Into<String>, score: F) -> Self
    where
        F: Fn(&Example, &ExecutionResult) -> Result<f64, ForgeError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            handler: Box::new(move |example, result| {
                Ok(MetricEvaluation {
                    score: score(example, result)?,
                    ..Default::default()
                })
            }),
            dimensional: false,
        }
    }

    /// Metric reporting dimension scores through the capability interface
    pub fn dimensional<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Example, &ExecutionResult) -> Result<MetricEvaluation, ForgeError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            handler: Box::new(handler),
            dimensional: true,
        }
    }

    /// Reads the score from the example's `score` metadata
    pub fn from_example_metadata() -> Self {
        Self::scalar("metadata-score", |example, _| {
            example
                .metadata
                .get("score")
                .and_then(|s| s.parse::<f64>().ok())
                .ok_or_else(|| ForgeError::Metric(format!("example {} has no score", example.id)))
        })
    }
}

impl Metric for ScriptedMetric {
    fn evaluate(
        &self,
        ctx: &CallContext,
        example: &Example,
        result: &ExecutionResult,
    ) -> Result<f64, ForgeError> {
        ctx.check()?;
        Ok((self.handler)(example, result)?.score)
    }

    fn metric_type(&self) -> MetricType {
        MetricType::Custom
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn as_dimensional(&self) -> Option<&dyn DimensionalMetric> {
        if self.dimensional {
            Some(self)
        } else {
            None
        }
    }
}

impl DimensionalMetric for ScriptedMetric {
    fn evaluate_detailed(
        &self,
        ctx: &CallContext,
        example: &Example,
        result: &ExecutionResult,
    ) -> Result<MetricEvaluation, ForgeError> {
        ctx.check()?;
        (self.handler)(example, result)
    }
}

pub type OrchestratorFn =
    dyn Fn(&EvaluateRequest) -> Result<EvaluateResponse, ForgeError> + Send + Sync;

/// Judge orchestrator that records every request it receives
pub struct ScriptedOrchestrator {
    handler: Box<OrchestratorFn>,
    requests: Mutex<Vec<EvaluateRequest>>,
}

impl ScriptedOrchestrator {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&EvaluateRequest) -> Result<EvaluateResponse, ForgeError> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Always answers with the same response
    pub fn fixed(response: EvaluateResponse) -> Self {
        Self::new(move |_| Ok(response.clone()))
    }

    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }

    pub fn requests(&self) -> Vec<EvaluateRequest> {
        lock(&self.requests).clone()
    }
}

impl JudgeOrchestrator for ScriptedOrchestrator {
    fn evaluate(
        &self,
        ctx: &CallContext,
        request: &EvaluateRequest,
    ) -> Result<EvaluateResponse, ForgeError> {
        ctx.check()?;
        lock(&self.requests).push(request.clone());
        (self.handler)(request)
    }
}

pub type ApplyFn = dyn Fn(&str, bool) -> Result<ApplyImprovementResponse, ForgeError> + Send + Sync;
pub type RollbackFn =
    dyn Fn(&str, &str) -> Result<RollbackImprovementResponse, ForgeError> + Send + Sync;

/// Learning agent client recording apply and rollback requests
pub struct ScriptedLearningClient {
    apply: Box<ApplyFn>,
    rollback: Box<RollbackFn>,
    applied: Mutex<Vec<String>>,
    rolled_back: Mutex<Vec<(String, String)>>,
}

impl ScriptedLearningClient {
    /// Accepts every apply and rollback
    pub fn accepting() -> Self {
        Self::new(
            |_, _| {
                Ok(ApplyImprovementResponse {
                    success: true,
                    message: "applied".to_string(),
                    improvement: None,
                })
            },
            |_, _| {
                Ok(RollbackImprovementResponse {
                    success: true,
                    message: "rolled back".to_string(),
                    restored_version: "previous".to_string(),
                })
            },
        )
    }

    pub fn new<A, R>(apply: A, rollback: R) -> Self
    where
        A: Fn(&str, bool) -> Result<ApplyImprovementResponse, ForgeError> + Send + Sync + 'static,
        R: Fn(&str, &str) -> Result<RollbackImprovementResponse, ForgeError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            apply: Box::new(apply),
            rollback: Box::new(rollback),
            applied: Mutex::new(Vec::new()),
            rolled_back: Mutex::new(Vec::new()),
        }
    }

    /// Ids passed to `apply_improvement`, successful or not
    pub fn applied(&self) -> Vec<String> {
        lock(&self.applied).clone()
    }

    /// `(id, reason)` pairs passed to `rollback_improvement`
    pub fn rolled_back(&self) -> Vec<(String, String)> {
        lock(&self.rolled_back).clone()
    }
}

impl LearningAgentClient for ScriptedLearningClient {
    fn apply_improvement(
        &self,
        ctx: &CallContext,
        improvement_id: &str,
        force: bool,
    ) -> Result<ApplyImprovementResponse, ForgeError> {
        ctx.check()?;
        lock(&self.applied).push(improvement_id.to_string());
        (self.apply)(improvement_id, force)
    }

    fn rollback_improvement(
        &self,
        ctx: &CallContext,
        improvement_id: &str,
        reason: &str,
    ) -> Result<RollbackImprovementResponse, ForgeError> {
        ctx.check()?;
        lock(&self.rolled_back).push((improvement_id.to_string(), reason.to_string()));
        (self.rollback)(improvement_id, reason)
    }
}

/// Generator returning a fixed list, truncated to the requested count
pub struct FixedInstructions(pub Vec<String>);

impl InstructionGenerator for FixedInstructions {
    fn generate(
        &self,
        ctx: &CallContext,
        _task_description: &str,
        num_candidates: usize,
    ) -> Result<Vec<String>, ForgeError> {
        ctx.check()?;
        Ok(self.0.iter().take(num_candidates).cloned().collect())
    }
}

/// Question/answer example
pub fn qa_example(id: &str, question: &str, answer: &str) -> Example {
    Example::new(id)
        .with_input("question", question)
        .with_output("answer", answer)
}

/// Response whose single verdict reports the given dimensions
pub fn judge_response(final_score: f64, passed: bool, dimensions: &[(&str, f64)]) -> EvaluateResponse {
    let verdict = dimensions
        .iter()
        .fold(JudgeVerdict::new("judge-1", final_score), |v, (d, s)| {
            v.with_dimension(*d, *s)
        });
    EvaluateResponse {
        passed,
        final_score,
        verdicts: vec![verdict],
        aggregated: None,
    }
}

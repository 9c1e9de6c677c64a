//! Execution utilities shared by every teleprompter
use crate::registry::Registry;
use crate::selector::{BootstrapStrategy, DemonstrationSelector, TopKSelector};
use chrono::Utc;
use forge_core::{
    compiled_version, Agent, CallContext, CompilationResult, Demonstration, Example,
    ExecutionTrace, FieldMap, ForgeError, Metric, TeleprompterConfig, TeleprompterType,
};
use std::sync::Arc;
use tracing::{debug, field, info_span, warn};

/// Everything a strategy measured, before ids, hashes and timestamps are stamped on
#[derive(Debug, Clone)]
pub struct CompilationOutcome {
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
}

#[derive(Clone)]
pub struct BaseTeleprompter {
    registry: Arc<Registry>,
}

impl BaseTeleprompter {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Run the agent over the trainset and keep the traces scoring at least
    /// `min_confidence`. Agent and metric failures skip the example.
    pub fn run_on_trainset(
        &self,
        ctx: &CallContext,
        agent: &dyn Agent,
        trainset: &[Example],
        metric: &dyn Metric,
        min_confidence: f64,
    ) -> Vec<ExecutionTrace> {
        let span = info_span!(
            "teleprompter.run_on_trainset",
            agent_id = agent.id(),
            trainset_size = trainset.len(),
            min_confidence,
            successful_traces = field::Empty,
            skipped = field::Empty,
        );
        let _enter = span.enter();

        let metric_name = metric.name();
        let mut traces = Vec::with_capacity(trainset.len());
        let mut skipped = 0usize;

        for (index, example) in trainset.iter().enumerate() {
            let result = match ctx.check().and_then(|_| agent.run(ctx, &example.inputs)) {
                Ok(result) => result,
                Err(e) => {
                    warn!(index, example_id = %example.id, error = %e, "agent run failed, skipping example");
                    skipped += 1;
                    continue;
                }
            };

            let scored = ctx.check().and_then(|_| match metric.as_dimensional() {
                Some(dimensional) => dimensional
                    .evaluate_detailed(ctx, example, &result)
                    .map(|e| (e.score, non_empty(e.dimension_scores), non_empty_vec(e.verdicts))),
                None => metric.evaluate(ctx, example, &result).map(|s| (s, None, None)),
            });
            let (score, dimension_scores, judge_verdicts) = match scored {
                Ok(scored) => scored,
                Err(e) => {
                    warn!(index, example_id = %example.id, error = %e, "metric failed, skipping example");
                    skipped += 1;
                    continue;
                }
            };

            if score < min_confidence {
                debug!(index, score, "trace below confidence threshold");
                continue;
            }

            let mut metadata = FieldMap::new();
            metadata.insert("index".to_string(), index.to_string());
            metadata.insert("metric".to_string(), metric_name.clone());
            metadata.insert("agent_id".to_string(), agent.id().to_string());

            traces.push(ExecutionTrace {
                trace_id: result.trace_id.clone(),
                example: example.clone(),
                result,
                quality_score: score,
                timestamp: Utc::now(),
                metadata,
                dimension_scores,
                judge_verdicts,
            });
        }

        span.record("successful_traces", traces.len());
        span.record("skipped", skipped);
        traces
    }

    /// Mean metric score over the devset; 0.0 for an empty devset
    pub fn evaluate_on_devset(
        &self,
        ctx: &CallContext,
        agent: &dyn Agent,
        devset: &[Example],
        metric: &dyn Metric,
    ) -> Result<f64, ForgeError> {
        let span = info_span!(
            "teleprompter.evaluate_on_devset",
            agent_id = agent.id(),
            devset_size = devset.len(),
            avg_score = field::Empty,
            valid_count = field::Empty,
        );
        let _enter = span.enter();

        if devset.is_empty() {
            return Ok(0.0);
        }

        let mut total = 0.0;
        let mut valid = 0usize;
        for example in devset {
            let scored = ctx
                .check()
                .and_then(|_| agent.run(ctx, &example.inputs))
                .and_then(|result| {
                    ctx.check()?;
                    metric.evaluate(ctx, example, &result)
                });
            match scored {
                Ok(score) => {
                    total += score;
                    valid += 1;
                }
                Err(e) => {
                    warn!(example_id = %example.id, error = %e, "devset example failed");
                }
            }
        }

        if valid == 0 {
            return Err(ForgeError::empty("no valid devset examples evaluated"));
        }

        let avg = total / valid as f64;
        span.record("avg_score", avg);
        span.record("valid_count", valid);
        Ok(avg)
    }

    /// Falls back to TopK when no selector is registered for `strategy`
    pub fn select_demonstrations(
        &self,
        traces: &[ExecutionTrace],
        max_demos: usize,
        strategy: BootstrapStrategy,
    ) -> Result<Vec<Demonstration>, ForgeError> {
        let span = info_span!(
            "teleprompter.select_demonstrations",
            traces = traces.len(),
            max_demos,
            strategy = %strategy,
            selected = field::Empty,
        );
        let _enter = span.enter();

        let demonstrations = match self.registry.selector(strategy) {
            Some(selector) => selector.select(traces, max_demos)?,
            None => {
                debug!(strategy = %strategy, "selector not registered, using top-k");
                TopKSelector.select(traces, max_demos)?
            }
        };

        span.record("selected", demonstrations.len());
        Ok(demonstrations)
    }

    /// Write prompts and demonstrations into the agent's learned layer
    pub fn apply_learned_layer(
        &self,
        agent: &dyn Agent,
        prompts: &FieldMap,
        demonstrations: &[Demonstration],
    ) -> Result<(), ForgeError> {
        let span = info_span!(
            "teleprompter.apply_learned_layer",
            agent_id = agent.id(),
            prompts = prompts.len(),
            demonstrations = demonstrations.len(),
        );
        let _enter = span.enter();

        let memory = agent
            .memory()
            .ok_or_else(|| ForgeError::missing("agent has no memory interface"))?;
        memory
            .update_learned_layer(prompts, demonstrations)
            .map_err(|e| ForgeError::LearnedLayerUpdate(Box::new(e)))
    }

    pub fn compute_improvement(&self, baseline: f64, optimized: f64) -> f64 {
        optimized - baseline
    }

    pub fn generate_compilation_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }

    pub fn build_compilation_result(&self, outcome: CompilationOutcome) -> CompilationResult {
        let compiled_version = compiled_version(&outcome.optimized_prompts, &outcome.demonstrations);
        CompilationResult {
            compilation_id: self.generate_compilation_id(),
            agent_id: outcome.agent_id,
            strategy_type: outcome.strategy_type,
            optimized_prompts: outcome.optimized_prompts,
            demonstrations: outcome.demonstrations,
            trainset_score: outcome.trainset_score,
            devset_score: outcome.devset_score,
            examples_used: outcome.examples_used,
            successful_traces: outcome.successful_traces,
            optimization_rounds: outcome.optimization_rounds,
            improvement_delta: outcome.improvement_delta,
            compilation_time_ms: outcome.compilation_time_ms,
            compiled_version,
            compiled_at: Utc::now(),
            metadata: FieldMap::new(),
        }
    }

    /// Defaults first, then validation
    pub fn prepare_config(&self, config: &TeleprompterConfig) -> Result<TeleprompterConfig, ForgeError> {
        let config = config.clone().with_defaults();
        config.validate()?;
        Ok(config)
    }
}

fn non_empty<K, V>(map: std::collections::BTreeMap<K, V>) -> Option<std::collections::BTreeMap<K, V>> {
    if map.is_empty() {
        None
    } else {
        Some(map)
    }
}

fn non_empty_vec<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

//! MultiJudgeMetric: scores a result by asking several LLM judges
//!
//! Each evaluation is a single orchestrator call. The metric keeps no state
//! between calls, so one instance can serve concurrent evaluations.

use crate::request::build_request;
use forge_core::{
    AggregationStrategy, CallContext, ConfigError, DimensionalMetric, EvaluateResponse, Example,
    ExecutionResult, ForgeError, JudgeOrchestrator, Metric, MetricEvaluation, MetricType,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error};

pub const DEFAULT_MIN_THRESHOLD: f64 = 80.0;

/// Serializable part of the metric configuration; the orchestrator is injected separately
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiJudgeMetricConfig {
    pub judge_ids: Vec<String>,
    pub aggregation: AggregationStrategy,
    /// Per-dimension weights; empty means "use the orchestrator's aggregate"
    pub dimension_weights: BTreeMap<String, f64>,
    /// Passing score on the 0-100 scale, 0 for the default
    pub min_threshold: f64,
    /// Forward verdicts to the observability sink
    pub export: bool,
}

impl MultiJudgeMetricConfig {
    pub fn new(judge_ids: Vec<String>) -> Self {
        Self {
            judge_ids,
            ..Default::default()
        }
    }

    pub fn with_weight(mut self, dimension: impl Into<String>, weight: f64) -> Self {
        self.dimension_weights.insert(dimension.into(), weight);
        self
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}

pub struct MultiJudgeMetric {
    orchestrator: Arc<dyn JudgeOrchestrator>,
    judge_ids: Vec<String>,
    aggregation: AggregationStrategy,
    dimension_weights: BTreeMap<String, f64>,
    min_threshold: f64,
    export: bool,
}

impl MultiJudgeMetric {
    pub fn new(
        orchestrator: Arc<dyn JudgeOrchestrator>,
        judge_ids: Vec<String>,
    ) -> Result<Self, ForgeError> {
        Self::from_config(Some(orchestrator), MultiJudgeMetricConfig::new(judge_ids))
    }

    pub fn from_config(
        orchestrator: Option<Arc<dyn JudgeOrchestrator>>,
        config: MultiJudgeMetricConfig,
    ) -> Result<Self, ForgeError> {
        let orchestrator = orchestrator.ok_or_else(|| ForgeError::missing("orchestrator required"))?;
        if config.judge_ids.is_empty() {
            return Err(ForgeError::missing("at least one judge ID required"));
        }
        let min_threshold = if config.min_threshold == 0.0 {
            DEFAULT_MIN_THRESHOLD
        } else {
            config.min_threshold
        };

        Ok(Self {
            orchestrator,
            judge_ids: config.judge_ids,
            aggregation: config.aggregation,
            dimension_weights: config.dimension_weights,
            min_threshold,
            export: config.export,
        })
    }

    pub fn judge_ids(&self) -> &[String] {
        &self.judge_ids
    }

    pub fn aggregation(&self) -> AggregationStrategy {
        self.aggregation
    }

    pub fn min_threshold(&self) -> f64 {
        self.min_threshold
    }

    /// Score on the 0-100 scale.
    ///
    /// With weights: sum of score * weight over every (verdict, weighted
    /// dimension) pair divided by the summed weights, so a judge reporting more
    /// weighted dimensions carries more mass. Falls back to the mean overall
    /// score when no weighted dimension appears. Without weights the
    /// orchestrator's aggregate (or final score) is used as is.
    pub fn calculate_weighted_score(&self, response: &EvaluateResponse) -> f64 {
        if self.dimension_weights.is_empty() {
            return match &response.aggregated {
                Some(aggregated) => aggregated.weighted_average_score,
                None => response.final_score,
            };
        }

        let mut weighted_sum = 0.0;
        let mut total_weight = 0.0;
        for verdict in &response.verdicts {
            for (dimension, weight) in &self.dimension_weights {
                if let Some(score) = verdict.dimension_scores.get(dimension) {
                    weighted_sum += score * weight;
                    total_weight += weight;
                }
            }
        }

        if total_weight == 0.0 {
            for verdict in &response.verdicts {
                weighted_sum += verdict.overall_score;
                total_weight += 1.0;
            }
        }

        if total_weight == 0.0 {
            0.0
        } else {
            weighted_sum / total_weight
        }
    }
}

impl Metric for MultiJudgeMetric {
    fn evaluate(
        &self,
        ctx: &CallContext,
        example: &Example,
        result: &ExecutionResult,
    ) -> Result<f64, ForgeError> {
        Ok(self.evaluate_detailed(ctx, example, result)?.score)
    }

    fn metric_type(&self) -> MetricType {
        MetricType::MultiJudge
    }

    fn name(&self) -> String {
        format!(
            "MultiJudge({} judges, {})",
            self.judge_ids.len(),
            self.aggregation
        )
    }

    fn as_dimensional(&self) -> Option<&dyn DimensionalMetric> {
        Some(self)
    }
}

impl DimensionalMetric for MultiJudgeMetric {
    fn evaluate_detailed(
        &self,
        ctx: &CallContext,
        example: &Example,
        result: &ExecutionResult,
    ) -> Result<MetricEvaluation, ForgeError> {
        let request = build_request(
            &self.judge_ids,
            self.aggregation,
            self.export,
            example,
            result,
        );

        let response = ctx
            .check()
            .and_then(|_| self.orchestrator.evaluate(ctx, &request))
            .map_err(|e| {
                error!(
                    error = %e,
                    judge_ids = ?self.judge_ids,
                    "judge evaluation failed"
                );
                ForgeError::JudgeEvaluation(Box::new(e))
            })?;

        let weighted = self.calculate_weighted_score(&response);
        debug!(
            weighted_score = weighted,
            raw_score = response.final_score,
            passed = response.passed,
            above_threshold = weighted >= self.min_threshold,
            verdicts = response.verdicts.len(),
            "multi-judge evaluation complete"
        );

        Ok(MetricEvaluation {
            score: weighted / 100.0,
            dimension_scores: response.dimension_averages(),
            verdicts: response.verdicts,
        })
    }
}

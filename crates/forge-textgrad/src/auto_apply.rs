//! VALIDATED auto-apply: apply, re-validate, keep or roll back
//!
//! Improvements are applied one at a time through the learning agent. Each
//! one is kept only if the validation score rises by at least
//! `min_score_delta` over the running baseline; an accepted improvement
//! becomes part of the baseline the next one is measured against.

use crate::engine::JudgeGradientEngine;
use forge_core::{
    CallContext, ExecutionResult, ForgeError, Improvement, ImprovementStatus,
    LearningAgentClient, ValidationConfig, ValidationResult,
};
use forge_judge::build_request;
use tracing::{debug, error, field, info, info_span, warn};

pub const ROLLBACK_REASON: &str = "Validation failed: improvement did not meet threshold";

impl JudgeGradientEngine {
    pub(crate) fn apply_with_validation(
        &self,
        ctx: &CallContext,
        improvements: Vec<Improvement>,
    ) -> Result<Vec<Improvement>, ForgeError> {
        let validation = self
            .validation
            .as_ref()
            .ok_or_else(|| ForgeError::missing("validation config required for validated mode"))?;
        let client = self
            .learning_client
            .as_deref()
            .ok_or_else(|| ForgeError::missing("learning agent client required for validated mode"))?;
        let agent_id = self
            .agent_id
            .as_deref()
            .ok_or_else(|| ForgeError::missing("agent ID required for validated mode"))?;

        let mut baseline = self
            .validate(ctx, validation)
            .map_err(|e| ForgeError::BaselineValidation(Box::new(e)))?
            .new_score;
        info!(agent_id, baseline, candidates = improvements.len(), "baseline validated");

        let mut accepted = Vec::new();
        for mut improvement in improvements {
            let response = match ctx
                .check()
                .and_then(|_| client.apply_improvement(ctx, &improvement.id, false))
            {
                Ok(response) if response.success => response,
                Ok(response) => {
                    warn!(
                        improvement_id = %improvement.id,
                        message = %response.message,
                        "apply rejected, skipping improvement"
                    );
                    continue;
                }
                Err(e) => {
                    warn!(improvement_id = %improvement.id, error = %e, "apply failed, skipping improvement");
                    continue;
                }
            };

            let new_score = match self.validate(ctx, validation) {
                Ok(result) => result.new_score,
                Err(e) => {
                    error!(improvement_id = %improvement.id, error = %e, "re-validation failed");
                    if validation.rollback_on_failure {
                        self.rollback_logged(ctx, client, &improvement.id);
                    }
                    continue;
                }
            };

            let outcome = ValidationResult {
                base_score: baseline,
                new_score,
                score_delta: new_score - baseline,
                passed: new_score - baseline >= validation.min_score_delta,
                failed_tests: 0,
            };

            if !outcome.passed {
                info!(
                    improvement_id = %improvement.id,
                    base_score = outcome.base_score,
                    new_score = outcome.new_score,
                    score_delta = outcome.score_delta,
                    min_score_delta = validation.min_score_delta,
                    "improvement rejected, rolling back"
                );
                self.rollback_logged(ctx, client, &improvement.id);
                continue;
            }

            info!(
                improvement_id = %improvement.id,
                score_delta = outcome.score_delta,
                "improvement accepted"
            );
            if let Some(record) = response.improvement {
                improvement = record;
            }
            improvement.status = ImprovementStatus::Applied;
            baseline = new_score;
            accepted.push(improvement);
        }

        Ok(accepted)
    }

    /// Mean judge score over the validation set, evaluating each example's
    /// expected outputs as the response. Examples whose evaluation errors or
    /// fails count towards `failed_tests`; only a set where every evaluation
    /// errors is an error.
    ///
    /// `base_score` and `new_score` both hold the mean; the caller fills in
    /// the delta.
    pub fn validate(
        &self,
        ctx: &CallContext,
        config: &ValidationConfig,
    ) -> Result<ValidationResult, ForgeError> {
        let span = info_span!(
            "textgrad.validate",
            examples = config.validation_set.len(),
            avg_score = field::Empty,
            failed_tests = field::Empty,
        );
        let _enter = span.enter();

        if config.validation_set.is_empty() {
            return Err(ForgeError::Validation("validation set is empty".to_string()));
        }

        let mut total = 0.0;
        let mut scored = 0usize;
        let mut failed_tests = 0usize;

        for (index, example) in config.validation_set.iter().enumerate() {
            let result = ExecutionResult {
                trace_id: format!("validation-{}", index),
                inputs: example.inputs.clone(),
                outputs: example.outputs.clone(),
                rationale: format!("Validation test {}", index),
                success: true,
                metadata: Default::default(),
            };
            let request = build_request(
                &self.settings.judge_ids,
                self.settings.aggregation,
                false,
                example,
                &result,
            );

            match ctx.check().and_then(|_| self.orchestrator.evaluate(ctx, &request)) {
                Ok(response) => {
                    if !response.passed {
                        failed_tests += 1;
                    }
                    total += response.final_score;
                    scored += 1;
                }
                Err(e) => {
                    warn!(index, example_id = %example.id, error = %e, "validation example failed");
                    failed_tests += 1;
                }
            }
        }

        if scored == 0 {
            return Err(ForgeError::empty("no validation examples succeeded"));
        }

        let avg = total / scored as f64;
        span.record("avg_score", avg);
        span.record("failed_tests", failed_tests);
        debug!(scored, "validation complete");

        Ok(ValidationResult {
            base_score: avg,
            new_score: avg,
            score_delta: 0.0,
            passed: false,
            failed_tests,
        })
    }

    /// Ask the learning agent to undo an applied improvement
    pub fn rollback(&self, ctx: &CallContext, improvement_id: &str) -> Result<(), ForgeError> {
        let client = self
            .learning_client
            .as_deref()
            .ok_or_else(|| ForgeError::missing("learning agent client required for rollback"))?;
        ctx.check()?;
        self.rollback_with(ctx, client, improvement_id)
    }

    fn rollback_with(
        &self,
        ctx: &CallContext,
        client: &dyn LearningAgentClient,
        improvement_id: &str,
    ) -> Result<(), ForgeError> {
        let _enter = info_span!("textgrad.rollback", improvement_id).entered();

        let response = client
            .rollback_improvement(ctx, improvement_id, ROLLBACK_REASON)
            .map_err(|e| ForgeError::Transport(format!("rollback RPC failed: {}", e)))?;
        if !response.success {
            return Err(ForgeError::Transport(format!(
                "rollback rejected: {}",
                response.message
            )));
        }
        debug!(restored_version = %response.restored_version, "improvement rolled back");
        Ok(())
    }

    /// Undo an improvement this step applied. Runs on a detached context so
    /// a cancelled step still reverts what it changed.
    fn rollback_logged(&self, ctx: &CallContext, client: &dyn LearningAgentClient, improvement_id: &str) {
        if let Err(e) = self.rollback_with(&ctx.detached(), client, improvement_id) {
            error!(improvement_id, error = %e, "rollback failed, improvement remains applied");
        }
    }
}

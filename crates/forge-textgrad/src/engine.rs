//! JudgeGradientEngine: judge verdicts in, textual gradients and improvements out
use crate::gradient::{format_gradient, parse_gradient_scores};
use crate::improvements::improvement_for_dimension;
use forge_core::{
    AggregationStrategy, AutoApplyMode, CallContext, ConfigError, EvaluateResponse, Example,
    ExecutionResult, ForgeError, Improvement, JudgeOrchestrator, LearningAgentClient,
    ValidationConfig, Variable,
};
use forge_judge::build_request;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, field, info, info_span, warn};

/// Serializable engine settings; collaborators are injected separately
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgeGradientSettings {
    pub judge_ids: Vec<String>,
    pub aggregation: AggregationStrategy,
    /// Forward backward-pass verdicts to the observability sink
    pub export: bool,
    pub auto_apply_mode: AutoApplyMode,
}

impl JudgeGradientSettings {
    pub fn new(judge_ids: Vec<String>) -> Self {
        Self {
            judge_ids,
            ..Default::default()
        }
    }

    pub fn with_mode(mut self, mode: AutoApplyMode) -> Self {
        self.auto_apply_mode = mode;
        self
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}

pub struct JudgeGradientEngine {
    pub(crate) orchestrator: Arc<dyn JudgeOrchestrator>,
    pub(crate) settings: JudgeGradientSettings,
    pub(crate) validation: Option<ValidationConfig>,
    pub(crate) learning_client: Option<Arc<dyn LearningAgentClient>>,
    pub(crate) agent_id: Option<String>,
}

impl JudgeGradientEngine {
    pub fn new(
        orchestrator: Option<Arc<dyn JudgeOrchestrator>>,
        settings: JudgeGradientSettings,
    ) -> Result<Self, ForgeError> {
        let orchestrator = orchestrator.ok_or_else(|| ForgeError::missing("orchestrator required"))?;
        if settings.judge_ids.is_empty() {
            return Err(ForgeError::missing("at least one judge ID required"));
        }
        Ok(Self {
            orchestrator,
            settings,
            validation: None,
            learning_client: None,
            agent_id: None,
        })
    }

    pub fn with_validation(mut self, validation: ValidationConfig) -> Self {
        self.validation = Some(validation);
        self
    }

    pub fn with_learning_client(mut self, client: Arc<dyn LearningAgentClient>) -> Self {
        self.learning_client = Some(client);
        self
    }

    pub fn with_agent_id(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn settings(&self) -> &JudgeGradientSettings {
        &self.settings
    }

    pub fn mode(&self) -> AutoApplyMode {
        self.settings.auto_apply_mode
    }

    fn judge(
        &self,
        ctx: &CallContext,
        example: &Example,
        result: &ExecutionResult,
    ) -> Result<EvaluateResponse, ForgeError> {
        let request = build_request(
            &self.settings.judge_ids,
            self.settings.aggregation,
            self.settings.export,
            example,
            result,
        );
        ctx.check()
            .and_then(|_| self.orchestrator.evaluate(ctx, &request))
            .map_err(|e| {
                error!(error = %e, judge_ids = ?self.settings.judge_ids, "judge evaluation failed");
                ForgeError::JudgeEvaluation(Box::new(e))
            })
    }

    /// Judge one run and write the same gradient into every variable
    pub fn backward(
        &self,
        ctx: &CallContext,
        example: &Example,
        result: &ExecutionResult,
        variables: &mut [Variable],
    ) -> Result<(), ForgeError> {
        let span = info_span!(
            "textgrad.backward",
            example_id = %example.id,
            variables = variables.len(),
            final_score = field::Empty,
        );
        let _enter = span.enter();

        let response = self.judge(ctx, example, result)?;
        span.record("final_score", response.final_score);

        let gradient = format_gradient(&response);
        for variable in variables.iter_mut() {
            variable.gradient = gradient.clone();
        }
        debug!(passed = response.passed, "gradient written");
        Ok(())
    }

    /// Judge one run per variable; each variable gets the gradient of its own run.
    ///
    /// Nothing is written unless every judge call succeeds.
    pub fn backward_each(
        &self,
        ctx: &CallContext,
        runs: &[(Example, ExecutionResult)],
        variables: &mut [Variable],
    ) -> Result<(), ForgeError> {
        let span = info_span!("textgrad.backward", variables = variables.len(), attributed = true);
        let _enter = span.enter();

        if runs.len() != variables.len() {
            return Err(ForgeError::Validation(format!(
                "expected one run per variable, got {} runs for {} variables",
                runs.len(),
                variables.len()
            )));
        }

        let gradients = runs
            .iter()
            .map(|(example, result)| self.judge(ctx, example, result).map(|r| format_gradient(&r)))
            .collect::<Result<Vec<_>, _>>()?;

        for (variable, gradient) in variables.iter_mut().zip(gradients) {
            variable.gradient = gradient;
        }
        Ok(())
    }

    /// Improvements implied by the variables' gradients, in gradient line
    /// order. Variables without a gradient contribute nothing.
    pub fn propose_improvements(&self, variables: &[Variable]) -> Vec<Improvement> {
        let mut improvements = Vec::new();
        for variable in variables {
            if variable.gradient.is_empty() {
                continue;
            }
            for (dimension, score) in parse_gradient_scores(&variable.gradient) {
                if let Some(improvement) = improvement_for_dimension(&variable.name, &dimension, score)
                {
                    debug!(
                        variable = %variable.name,
                        dimension = %dimension,
                        score,
                        impact = %improvement.impact,
                        "improvement proposed"
                    );
                    improvements.push(improvement);
                }
            }
        }
        improvements
    }

    /// Turn gradients into improvements and dispatch them by auto-apply mode
    pub fn step(
        &self,
        ctx: &CallContext,
        variables: &[Variable],
    ) -> Result<Vec<Improvement>, ForgeError> {
        let mode = self.settings.auto_apply_mode;
        let span = info_span!(
            "textgrad.step",
            mode = %mode,
            variables = variables.len(),
            proposed = field::Empty,
            returned = field::Empty,
        );
        let _enter = span.enter();

        let improvements = self.propose_improvements(variables);
        span.record("proposed", improvements.len());

        let returned = match mode {
            AutoApplyMode::Manual => improvements,
            AutoApplyMode::DryRun | AutoApplyMode::Autonomous => {
                warn!(mode = %mode, "auto-apply mode not yet implemented, returning improvements");
                improvements
            }
            AutoApplyMode::Validated => self.apply_with_validation(ctx, improvements)?,
        };

        span.record("returned", returned.len());
        info!(returned = returned.len(), "step complete");
        Ok(returned)
    }
}

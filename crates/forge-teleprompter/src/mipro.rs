//! MIPRO: instruction search
//!
//! Every instruction candidate runs on a clone of the agent. The candidate
//! with the best (optionally dimension-weighted) trainset score wins and is
//! written, together with its demonstrations, into the real agent.

use crate::base::{BaseTeleprompter, CompilationOutcome};
use crate::registry::Registry;
use crate::selector::BootstrapStrategy;
use crate::teleprompter::{CompileRequest, Teleprompter};
use forge_core::{
    CallContext, CompilationResult, Demonstration, FieldMap, ForgeError, InstructionGenerator,
    TeleprompterConfig, TeleprompterType,
};
use forge_judge::{weighted_dimension_score, DimensionAggregator};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, field, info, info_span, warn};

/// Prompt key the candidate instruction is written to
pub const SYSTEM_PROMPT_KEY: &str = "system";

/// One instruction and what it achieved on the trainset
#[derive(Debug, Clone)]
pub struct InstructionCandidate {
    pub instruction: String,
    /// Mean trace quality score, in [0, 1]
    pub overall_score: f64,
    /// Mean per-dimension judge score across traces
    pub dimension_scores: BTreeMap<String, f64>,
    /// Lowest mean dimension, `None` when the metric reports no dimensions
    pub weakest_dimension: Option<(String, f64)>,
    pub demonstrations: Vec<Demonstration>,
    pub devset_score: f64,
    pub successful_traces: usize,
}

impl InstructionCandidate {
    /// Priority-weighted dimension score, or the overall score when no
    /// weighted dimension was reported
    pub fn rank_score(&self, priorities: &BTreeMap<String, f64>) -> f64 {
        if self.dimension_scores.is_empty() {
            return self.overall_score;
        }
        weighted_dimension_score(&self.dimension_scores, priorities).unwrap_or(self.overall_score)
    }
}

pub struct Mipro {
    base: BaseTeleprompter,
    generator: Option<Arc<dyn InstructionGenerator>>,
}

impl Mipro {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            base: BaseTeleprompter::new(registry),
            generator: None,
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn InstructionGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Configured candidates win; otherwise ask the generator
    pub fn instruction_candidates(
        &self,
        ctx: &CallContext,
        config: &TeleprompterConfig,
    ) -> Result<Vec<String>, ForgeError> {
        let mipro = config.mipro.clone().unwrap_or_default();
        if !mipro.instruction_candidates.is_empty() {
            return Ok(mipro.instruction_candidates);
        }

        let generator = self.generator.as_ref().ok_or_else(|| {
            ForgeError::missing(
                "no instruction candidates provided and no instruction generator configured",
            )
        })?;
        ctx.check()?;
        generator.generate(
            ctx,
            mipro.task_description_or_default(),
            mipro.num_candidates_or_default(),
        )
    }

    /// Run one candidate on a clone of the agent. `None` when the candidate
    /// produced no trace above the confidence bar.
    fn evaluate_candidate(
        &self,
        ctx: &CallContext,
        request: &CompileRequest,
        config: &TeleprompterConfig,
        instruction: &str,
    ) -> Option<InstructionCandidate> {
        let variant = request.agent.clone_agent();
        let mut prompts = FieldMap::new();
        prompts.insert(SYSTEM_PROMPT_KEY.to_string(), instruction.to_string());
        if let Err(e) = self.base.apply_learned_layer(variant.as_ref(), &prompts, &[]) {
            warn!(error = %e, "could not install candidate instruction, skipping");
            return None;
        }

        let metric = request.metric.as_ref();
        let traces = self.base.run_on_trainset(
            ctx,
            variant.as_ref(),
            &request.trainset,
            metric,
            config.min_confidence,
        );
        if traces.is_empty() {
            return None;
        }

        let overall_score =
            traces.iter().map(|t| t.quality_score).sum::<f64>() / traces.len() as f64;

        let mut dimensions = DimensionAggregator::new();
        for trace in &traces {
            if let Some(scores) = &trace.dimension_scores {
                dimensions.add(scores);
            }
        }
        let summary = dimensions.summary();
        debug!(
            instruction,
            samples = summary.sample_count,
            weakest = ?summary.weakest,
            "candidate dimensions aggregated"
        );

        let demonstrations = self
            .base
            .select_demonstrations(&traces, config.max_bootstrapped(), BootstrapStrategy::TopK)
            .unwrap_or_else(|e| {
                warn!(error = %e, "demonstration selection failed, continuing without demos");
                Vec::new()
            });

        let devset_score = if request.devset.is_empty() {
            0.0
        } else {
            self.base
                .evaluate_on_devset(ctx, variant.as_ref(), &request.devset, metric)
                .unwrap_or_else(|e| {
                    warn!(error = %e, "candidate devset evaluation failed");
                    0.0
                })
        };

        Some(InstructionCandidate {
            instruction: instruction.to_string(),
            overall_score,
            dimension_scores: summary.averages,
            weakest_dimension: summary.weakest,
            demonstrations,
            devset_score,
            successful_traces: traces.len(),
        })
    }

    /// Index of the winning candidate; the earliest wins ties
    pub fn select_best(
        candidates: &[InstructionCandidate],
        priorities: Option<&BTreeMap<String, f64>>,
    ) -> Option<usize> {
        let score = |c: &InstructionCandidate| match priorities {
            Some(p) => c.rank_score(p),
            None => c.overall_score,
        };

        let mut best: Option<(usize, f64)> = None;
        for (index, candidate) in candidates.iter().enumerate() {
            let s = score(candidate);
            debug!(index, score = s, "candidate ranked");
            if best.map_or(true, |(_, top)| s > top) {
                best = Some((index, s));
            }
        }
        best.map(|(index, _)| index)
    }
}

impl Teleprompter for Mipro {
    fn compile(
        &self,
        ctx: &CallContext,
        request: &CompileRequest,
    ) -> Result<CompilationResult, ForgeError> {
        let started = Instant::now();
        let span = info_span!(
            "teleprompter.mipro.compile",
            agent_id = %request.agent_id,
            trainset_size = request.trainset.len(),
            candidates = field::Empty,
            evaluated = field::Empty,
            best_score = field::Empty,
        );
        let _enter = span.enter();

        let config = self.base.prepare_config(&request.config)?;
        let candidates = self.instruction_candidates(ctx, &config)?;
        span.record("candidates", candidates.len());

        let evaluated: Vec<InstructionCandidate> = candidates
            .iter()
            .filter_map(|instruction| self.evaluate_candidate(ctx, request, &config, instruction))
            .collect();
        span.record("evaluated", evaluated.len());

        let best = Self::select_best(&evaluated, config.dimension_priorities())
            .and_then(|index| evaluated.get(index))
            .ok_or_else(|| {
                ForgeError::empty("no instruction candidates met minimum confidence threshold")
            })?;
        span.record("best_score", best.overall_score);

        let mut prompts = FieldMap::new();
        prompts.insert(SYSTEM_PROMPT_KEY.to_string(), best.instruction.clone());
        self.base
            .apply_learned_layer(request.agent.as_ref(), &prompts, &best.demonstrations)?;

        let mut result = self.base.build_compilation_result(CompilationOutcome {
            agent_id: request.agent_id.clone(),
            strategy_type: TeleprompterType::Mipro,
            optimized_prompts: prompts,
            demonstrations: best.demonstrations.clone(),
            trainset_score: best.overall_score,
            devset_score: best.devset_score,
            examples_used: request.trainset.len(),
            successful_traces: best.successful_traces,
            optimization_rounds: 1,
            improvement_delta: 0.0,
            compilation_time_ms: started.elapsed().as_millis() as u64,
        });
        result
            .metadata
            .insert("instruction_candidates".to_string(), candidates.len().to_string());
        result
            .metadata
            .insert("evaluated_candidates".to_string(), evaluated.len().to_string());
        for (dimension, score) in &best.dimension_scores {
            result
                .metadata
                .insert(format!("dimension.{}", dimension), format!("{:.2}", score));
        }
        if let Some((dimension, _)) = &best.weakest_dimension {
            result
                .metadata
                .insert("dimension.weakest".to_string(), dimension.clone());
        }

        info!(
            compilation_id = %result.compilation_id,
            trainset_score = best.overall_score,
            evaluated = evaluated.len(),
            "mipro compilation complete"
        );
        Ok(result)
    }

    fn teleprompter_type(&self) -> TeleprompterType {
        TeleprompterType::Mipro
    }

    fn name(&self) -> &'static str {
        "MIPRO"
    }

    fn supports_multi_round(&self) -> bool {
        true
    }

    fn supports_teacher(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(instruction: &str, overall: f64, dims: &[(&str, f64)]) -> InstructionCandidate {
        InstructionCandidate {
            instruction: instruction.to_string(),
            overall_score: overall,
            dimension_scores: dims.iter().map(|(d, s)| (d.to_string(), *s)).collect(),
            weakest_dimension: None,
            demonstrations: vec![],
            devset_score: 0.0,
            successful_traces: 1,
        }
    }

    fn priorities(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(d, w)| (d.to_string(), *w)).collect()
    }

    #[test]
    fn test_weighted_selection() {
        let candidates = vec![
            candidate("a", 0.7, &[("quality", 95.0), ("cost", 60.0)]),
            candidate("b", 0.9, &[("quality", 80.0), ("cost", 80.0)]),
            candidate("c", 0.8, &[("quality", 70.0), ("cost", 95.0)]),
        ];
        let weights = priorities(&[("quality", 2.0), ("cost", 1.0)]);
        assert!((candidates[0].rank_score(&weights) - 0.8333).abs() < 0.001);
        assert!((candidates[1].rank_score(&weights) - 0.8000).abs() < 0.001);
        assert!((candidates[2].rank_score(&weights) - 0.7833).abs() < 0.001);
        assert_eq!(Mipro::select_best(&candidates, Some(&weights)), Some(0));
    }

    #[test]
    fn test_unweighted_selection_uses_overall() {
        let candidates = vec![
            candidate("a", 0.7, &[("quality", 95.0)]),
            candidate("b", 0.9, &[]),
        ];
        assert_eq!(Mipro::select_best(&candidates, None), Some(1));
    }

    #[test]
    fn test_rank_falls_back_without_matching_dimension() {
        let weights = priorities(&[("safety", 1.0)]);
        assert_eq!(candidate("a", 0.66, &[("quality", 90.0)]).rank_score(&weights), 0.66);
        assert_eq!(candidate("b", 0.55, &[]).rank_score(&weights), 0.55);
    }

    #[test]
    fn test_ties_go_to_first_candidate() {
        let candidates = vec![candidate("a", 0.8, &[]), candidate("b", 0.8, &[])];
        assert_eq!(Mipro::select_best(&candidates, None), Some(0));
        assert_eq!(Mipro::select_best(&[], None), None);
    }

    #[test]
    fn test_missing_candidate_source() {
        let mipro = Mipro::new(Arc::new(Registry::with_defaults()));
        let err = mipro
            .instruction_candidates(&CallContext::new(), &TeleprompterConfig::default())
            .unwrap_err();
        assert_eq!(
            err,
            ForgeError::missing(
                "no instruction candidates provided and no instruction generator configured"
            )
        );
    }
}

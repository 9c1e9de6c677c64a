#![allow(dead_code)]

use forge_core::testkit::{ScriptedAgent, ScriptedMetric};
use forge_core::{Example, FieldMap, MetricEvaluation};
use std::sync::Arc;

/// Example whose metric score is stored in its metadata
pub fn scored_example(id: &str, score: f64) -> Example {
    Example::new(id)
        .with_input("question", format!("question {}", id))
        .with_output("answer", format!("answer {}", id))
        .with_metadata("score", score.to_string())
}

pub fn echo_agent() -> Arc<ScriptedAgent> {
    Arc::new(ScriptedAgent::new("agent-1", |inputs, _| {
        let mut outputs = FieldMap::new();
        if let Some(q) = inputs.get("question") {
            outputs.insert("answer".to_string(), q.replace("question", "answer"));
        }
        Ok(outputs)
    }))
}

/// Agent that answers with whatever system prompt it currently carries
pub fn instruction_agent() -> Arc<ScriptedAgent> {
    Arc::new(ScriptedAgent::new("agent-1", |_, prompts| {
        let mut outputs = FieldMap::new();
        outputs.insert(
            "answer".to_string(),
            prompts.get("system").cloned().unwrap_or_default(),
        );
        Ok(outputs)
    }))
}

pub fn metadata_metric() -> Arc<ScriptedMetric> {
    Arc::new(ScriptedMetric::from_example_metadata())
}

/// Dimensional metric keyed on the agent's answer: `(answer, quality, cost)`
pub fn instruction_metric(table: &'static [(&'static str, f64, f64)]) -> Arc<ScriptedMetric> {
    Arc::new(ScriptedMetric::dimensional("instruction-judge", move |_, result| {
        let answer = result.outputs.get("answer").cloned().unwrap_or_default();
        let (quality, cost) = table
            .iter()
            .find(|(instruction, _, _)| *instruction == answer)
            .map(|(_, q, c)| (*q, *c))
            .unwrap_or((0.0, 0.0));
        let mut evaluation = MetricEvaluation {
            score: (quality + cost) / 200.0,
            ..Default::default()
        };
        evaluation.dimension_scores.insert("quality".to_string(), quality);
        evaluation.dimension_scores.insert("cost".to_string(), cost);
        Ok(evaluation)
    }))
}

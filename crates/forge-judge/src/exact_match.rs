//! ExactMatchMetric: 1.0 when the agent's answer equals the expected one

use forge_core::{CallContext, Example, ExecutionResult, ForgeError, Metric, MetricType};

const EXPECTED_FIELDS: [&str; 3] = ["answer", "expected", "output"];
const ACTUAL_FIELDS: [&str; 3] = ["answer", "response", "output"];

/// 1.0 when the answer matches the expected output exactly, else 0.0
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatchMetric;

impl ExactMatchMetric {
    pub fn new() -> Self {
        Self
    }
}

impl Metric for ExactMatchMetric {
    fn evaluate(
        &self,
        _ctx: &CallContext,
        example: &Example,
        result: &ExecutionResult,
    ) -> Result<f64, ForgeError> {
        let expected = EXPECTED_FIELDS
            .iter()
            .find_map(|f| example.outputs.get(*f))
            .map(String::as_str)
            .unwrap_or("");
        let actual = ACTUAL_FIELDS
            .iter()
            .find_map(|f| result.outputs.get(*f))
            .map(String::as_str)
            .unwrap_or("");

        Ok(if expected == actual { 1.0 } else { 0.0 })
    }

    fn metric_type(&self) -> MetricType {
        MetricType::ExactMatch
    }

    fn name(&self) -> String {
        "ExactMatch".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(key: &str, value: &str) -> ExecutionResult {
        let mut r = ExecutionResult::default();
        r.outputs.insert(key.to_string(), value.to_string());
        r
    }

    #[test]
    fn test_exact_match() {
        let ctx = CallContext::new();
        let example = Example::new("e").with_output("expected", "42");
        let metric = ExactMatchMetric::new();
        assert_eq!(metric.evaluate(&ctx, &example, &result("response", "42")).unwrap(), 1.0);
        assert_eq!(metric.evaluate(&ctx, &example, &result("response", "41")).unwrap(), 0.0);
    }

    #[test]
    fn test_answer_field_wins() {
        let ctx = CallContext::new();
        let example = Example::new("e")
            .with_output("answer", "yes")
            .with_output("output", "no");
        let mut r = result("output", "no");
        r.outputs.insert("answer".to_string(), "yes".to_string());
        assert_eq!(ExactMatchMetric.evaluate(&ctx, &example, &r).unwrap(), 1.0);
    }

    #[test]
    fn test_both_missing_counts_as_match() {
        let ctx = CallContext::new();
        let score = ExactMatchMetric
            .evaluate(&ctx, &Example::new("e"), &ExecutionResult::default())
            .unwrap();
        assert_eq!(score, 1.0);
    }
}

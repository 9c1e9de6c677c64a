//! Evaluation request construction
use forge_core::{
    join_fields, AggregationStrategy, EvaluateRequest, EvaluationContext, Example,
    ExecutionMode, ExecutionResult, FieldMap,
};

/// Input fields tried, in order, as the judged prompt
pub const QUERY_FIELDS: [&str; 4] = ["query", "question", "input", "prompt"];
/// Output fields tried, in order, as the judged response
pub const RESPONSE_FIELDS: [&str; 4] = ["answer", "response", "output", "result"];
/// Per-judge timeout
pub const JUDGE_TIMEOUT_SECONDS: u32 = 30;

fn first_present(fields: &FieldMap, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| fields.get(*k).cloned())
}

/// The prompt shown to judges; all inputs as `key: value` lines when no
/// well-known field is present
pub fn extract_query(example: &Example) -> String {
    first_present(&example.inputs, &QUERY_FIELDS).unwrap_or_else(|| join_fields(&example.inputs))
}

pub fn extract_response(result: &ExecutionResult) -> String {
    first_present(&result.outputs, &RESPONSE_FIELDS).unwrap_or_else(|| join_fields(&result.outputs))
}

/// Example metadata plus what the judges need to know about the run
pub fn build_metadata(example: &Example, result: &ExecutionResult) -> FieldMap {
    let mut metadata = example.metadata.clone();
    metadata.insert("trace_id".to_string(), result.trace_id.clone());
    metadata.insert("success".to_string(), result.success.to_string());
    if !result.rationale.is_empty() {
        metadata.insert("rationale".to_string(), result.rationale.clone());
    }
    if !example.outputs.is_empty() {
        metadata.insert("expected_output".to_string(), join_fields(&example.outputs));
    }
    metadata
}

/// Hybrid execution, every verdict collected
pub fn build_request(
    judge_ids: &[String],
    aggregation: AggregationStrategy,
    export: bool,
    example: &Example,
    result: &ExecutionResult,
) -> EvaluateRequest {
    EvaluateRequest {
        judge_ids: judge_ids.to_vec(),
        context: EvaluationContext {
            prompt: extract_query(example),
            response: extract_response(result),
            metadata: build_metadata(example, result),
        },
        execution_mode: ExecutionMode::Hybrid,
        aggregation,
        export,
        timeout_seconds: JUDGE_TIMEOUT_SECONDS,
        fail_fast: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_with(outputs: &[(&str, &str)]) -> ExecutionResult {
        ExecutionResult {
            trace_id: "trace-1".to_string(),
            outputs: outputs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            success: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_query_prefers_known_fields_in_order() {
        let example = Example::new("e")
            .with_input("prompt", "p")
            .with_input("question", "q");
        assert_eq!(extract_query(&example), "q");
    }

    #[test]
    fn test_query_falls_back_to_all_fields() {
        let example = Example::new("e").with_input("table", "users");
        assert_eq!(extract_query(&example), "table: users");
    }

    #[test]
    fn test_response_order() {
        let result = result_with(&[("result", "r"), ("output", "o")]);
        assert_eq!(extract_response(&result), "o");
        let result = result_with(&[("sql", "SELECT 1"), ("rows", "1")]);
        assert_eq!(extract_response(&result), "rows: 1\nsql: SELECT 1");
    }

    #[test]
    fn test_metadata() {
        let example = Example::new("e")
            .with_metadata("domain", "sql")
            .with_output("answer", "42");
        let mut result = result_with(&[("answer", "41")]);
        result.rationale = "counted".to_string();

        let metadata = build_metadata(&example, &result);
        assert_eq!(metadata["domain"], "sql");
        assert_eq!(metadata["trace_id"], "trace-1");
        assert_eq!(metadata["success"], "true");
        assert_eq!(metadata["rationale"], "counted");
        assert_eq!(metadata["expected_output"], "answer: 42");
    }

    #[test]
    fn test_metadata_omits_empty_rationale() {
        let metadata = build_metadata(&Example::new("e"), &result_with(&[]));
        assert!(!metadata.contains_key("rationale"));
        assert!(!metadata.contains_key("expected_output"));
    }

    #[test]
    fn test_request_shape() {
        let example = Example::new("e").with_input("query", "q");
        let request = build_request(
            &["quality-judge".to_string()],
            AggregationStrategy::MinScore,
            true,
            &example,
            &result_with(&[("answer", "a")]),
        );
        assert_eq!(request.execution_mode, ExecutionMode::Hybrid);
        assert_eq!(request.timeout_seconds, 30);
        assert!(!request.fail_fast);
        assert!(request.export);
        assert_eq!(request.context.prompt, "q");
        assert_eq!(request.context.response, "a");
    }
}

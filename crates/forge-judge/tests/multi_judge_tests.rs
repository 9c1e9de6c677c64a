use forge_core::testkit::{judge_response, qa_example, ScriptedOrchestrator};
use forge_core::{
    CallContext, EvaluateResponse, ExecutionMode, ExecutionResult, ForgeError, JudgeOrchestrator,
    JudgeVerdict, Metric,
};
use forge_judge::{MultiJudgeMetric, MultiJudgeMetricConfig};
use std::sync::Arc;

fn answer(text: &str) -> ExecutionResult {
    let mut result = ExecutionResult {
        trace_id: "trace-7".to_string(),
        success: true,
        ..Default::default()
    };
    result.outputs.insert("answer".to_string(), text.to_string());
    result
}

#[test]
fn test_final_score_is_normalized() {
    let orchestrator = Arc::new(ScriptedOrchestrator::fixed(judge_response(95.0, true, &[])));
    let metric = MultiJudgeMetric::new(orchestrator.clone(), vec!["quality-judge".into()]).unwrap();

    let score = metric
        .evaluate(&CallContext::new(), &qa_example("e1", "2+2?", "4"), &answer("4"))
        .unwrap();

    assert!((score - 0.95).abs() < 0.01);
    assert_eq!(orchestrator.call_count(), 1);
}

#[test]
fn test_request_carries_example_and_result() {
    let orchestrator = Arc::new(ScriptedOrchestrator::fixed(judge_response(90.0, true, &[])));
    let metric = MultiJudgeMetric::new(
        orchestrator.clone(),
        vec!["quality-judge".into(), "safety-judge".into()],
    )
    .unwrap();

    metric
        .evaluate(&CallContext::new(), &qa_example("e1", "2+2?", "4"), &answer("four"))
        .unwrap();

    let request = &orchestrator.requests()[0];
    assert_eq!(request.judge_ids.len(), 2);
    assert_eq!(request.context.prompt, "2+2?");
    assert_eq!(request.context.response, "four");
    assert_eq!(request.context.metadata["trace_id"], "trace-7");
    assert_eq!(request.context.metadata["expected_output"], "answer: 4");
    assert_eq!(request.execution_mode, ExecutionMode::Hybrid);
    assert!(!request.fail_fast);
}

#[test]
fn test_detailed_evaluation_reports_dimension_means() {
    let response = EvaluateResponse {
        passed: true,
        final_score: 80.0,
        verdicts: vec![
            JudgeVerdict::new("a", 80.0).with_dimension("quality", 70.0),
            JudgeVerdict::new("b", 80.0)
                .with_dimension("quality", 90.0)
                .with_dimension("cost", 60.0),
        ],
        aggregated: None,
    };
    let orchestrator: Arc<dyn JudgeOrchestrator> = Arc::new(ScriptedOrchestrator::fixed(response));
    let config = MultiJudgeMetricConfig::new(vec!["a".into(), "b".into()]).with_weight("quality", 1.0);
    let metric = MultiJudgeMetric::from_config(Some(orchestrator), config).unwrap();

    let detailed = metric
        .as_dimensional()
        .unwrap()
        .evaluate_detailed(&CallContext::new(), &qa_example("e", "q", "a"), &answer("a"))
        .unwrap();

    assert!((detailed.score - 0.80).abs() < 1e-9);
    assert_eq!(detailed.dimension_scores["quality"], 80.0);
    assert_eq!(detailed.dimension_scores["cost"], 60.0);
    assert_eq!(detailed.verdicts.len(), 2);
}

#[test]
fn test_orchestrator_failure_is_wrapped() {
    let orchestrator = Arc::new(ScriptedOrchestrator::new(|_| {
        Err(ForgeError::Transport("connection refused".into()))
    }));
    let metric = MultiJudgeMetric::new(orchestrator, vec!["quality-judge".into()]).unwrap();

    let err = metric
        .evaluate(&CallContext::new(), &qa_example("e", "q", "a"), &answer("a"))
        .unwrap_err();

    assert!(matches!(err, ForgeError::JudgeEvaluation(_)));
    assert!(err.to_string().starts_with("judge evaluation failed"));
}

#[test]
fn test_cancelled_context_skips_orchestrator() {
    let orchestrator = Arc::new(ScriptedOrchestrator::fixed(judge_response(95.0, true, &[])));
    let metric = MultiJudgeMetric::new(orchestrator.clone(), vec!["quality-judge".into()]).unwrap();
    let ctx = CallContext::new();
    ctx.cancel();

    let err = metric
        .evaluate(&ctx, &qa_example("e", "q", "a"), &answer("a"))
        .unwrap_err();

    assert!(err.is_cancellation());
    assert_eq!(orchestrator.call_count(), 0);
}

#[test]
fn test_request_wire_shape() {
    let orchestrator = Arc::new(ScriptedOrchestrator::fixed(judge_response(90.0, true, &[])));
    let metric = MultiJudgeMetric::new(orchestrator.clone(), vec!["quality-judge".into()]).unwrap();
    metric
        .evaluate(&CallContext::new(), &qa_example("e1", "2+2?", "4"), &answer("4"))
        .unwrap();

    let json = serde_json::to_value(&orchestrator.requests()[0]).unwrap();
    assert_eq!(json["execution_mode"], "HYBRID");
    assert_eq!(json["aggregation"], "WEIGHTED_AVERAGE");
    assert_eq!(json["timeout_seconds"], 30);
    assert_eq!(json["context"]["prompt"], "2+2?");
}

mod common;

use common::{instruction_agent, instruction_metric, scored_example};
use forge_core::testkit::FixedInstructions;
use forge_core::{CallContext, Example, ForgeError, MiproConfig, TeleprompterConfig};
use forge_teleprompter::{CompileRequest, Mipro, Registry, Teleprompter};
use std::collections::BTreeMap;
use std::sync::Arc;

const PRECISE: &str = "Answer precisely and cite the source table.";
const BALANCED: &str = "Answer clearly.";
const CHEAP: &str = "Answer in one word.";
const WEAK: &str = "Say something.";

static TABLE: &[(&str, f64, f64)] = &[
    (PRECISE, 95.0, 60.0),
    (BALANCED, 80.0, 80.0),
    (CHEAP, 70.0, 95.0),
    (WEAK, 40.0, 40.0),
];

fn trainset() -> Vec<Example> {
    (0..3).map(|i| scored_example(&i.to_string(), 0.0)).collect()
}

fn mipro_config(candidates: &[&str], priorities: &[(&str, f64)]) -> TeleprompterConfig {
    TeleprompterConfig {
        mipro: Some(MiproConfig {
            instruction_candidates: candidates.iter().map(|c| c.to_string()).collect(),
            dimension_priorities: priorities
                .iter()
                .map(|(d, w)| (d.to_string(), *w))
                .collect::<BTreeMap<_, _>>(),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn mipro() -> Mipro {
    Mipro::new(Arc::new(Registry::with_defaults()))
}

#[test]
fn test_dimension_priorities_pick_quality_candidate() {
    let agent = instruction_agent();
    let request = CompileRequest::new(agent.clone(), trainset(), instruction_metric(TABLE))
        .with_config(mipro_config(
            &[PRECISE, BALANCED, CHEAP],
            &[("quality", 2.0), ("cost", 1.0)],
        ));

    let result = mipro().compile(&CallContext::new(), &request).unwrap();

    assert_eq!(result.optimized_prompts["system"], PRECISE);
    assert_eq!(agent.prompts()["system"], PRECISE);
    assert_eq!(result.metadata["dimension.quality"], "95.00");
    assert_eq!(result.metadata["dimension.cost"], "60.00");
    assert_eq!(result.metadata["dimension.weakest"], "cost");
    assert_eq!(result.metadata["evaluated_candidates"], "3");
    assert_eq!(result.optimization_rounds, 1);
    assert_eq!(result.improvement_delta, 0.0);
}

#[test]
fn test_overall_score_without_priorities() {
    let agent = instruction_agent();
    let request = CompileRequest::new(agent.clone(), trainset(), instruction_metric(TABLE))
        .with_config(mipro_config(&[PRECISE, BALANCED, CHEAP], &[]));

    let result = mipro().compile(&CallContext::new(), &request).unwrap();

    // (70 + 95) / 200 beats the other two
    assert_eq!(result.optimized_prompts["system"], CHEAP);
    assert!((result.trainset_score - 0.825).abs() < 1e-9);
    assert_eq!(result.successful_traces, 3);
    assert_eq!(result.demonstrations.len(), 3);
    assert_eq!(agent.demonstrations().len(), 3);
}

#[test]
fn test_low_scoring_candidates_are_skipped() {
    let request = CompileRequest::new(instruction_agent(), trainset(), instruction_metric(TABLE))
        .with_config(mipro_config(&[WEAK, BALANCED], &[]));

    let result = mipro().compile(&CallContext::new(), &request).unwrap();

    assert_eq!(result.optimized_prompts["system"], BALANCED);
    assert_eq!(result.metadata["instruction_candidates"], "2");
    assert_eq!(result.metadata["evaluated_candidates"], "1");
}

#[test]
fn test_every_candidate_below_threshold() {
    let agent = instruction_agent();
    let request = CompileRequest::new(agent.clone(), trainset(), instruction_metric(TABLE))
        .with_config(mipro_config(&[WEAK], &[]));

    let err = mipro().compile(&CallContext::new(), &request).unwrap_err();

    assert_eq!(
        err,
        ForgeError::empty("no instruction candidates met minimum confidence threshold")
    );
    assert!(agent.prompts().is_empty());
}

#[test]
fn test_generator_supplies_candidates() {
    let request = CompileRequest::new(instruction_agent(), trainset(), instruction_metric(TABLE));
    let generator = Arc::new(FixedInstructions(vec![
        BALANCED.to_string(),
        CHEAP.to_string(),
    ]));

    let result = mipro()
        .with_generator(generator)
        .compile(&CallContext::new(), &request)
        .unwrap();

    assert_eq!(result.optimized_prompts["system"], CHEAP);
}

#[test]
fn test_configured_candidates_win_over_generator() {
    let request = CompileRequest::new(instruction_agent(), trainset(), instruction_metric(TABLE))
        .with_config(mipro_config(&[BALANCED], &[]));
    let generator = Arc::new(FixedInstructions(vec![CHEAP.to_string()]));

    let result = mipro()
        .with_generator(generator)
        .compile(&CallContext::new(), &request)
        .unwrap();

    assert_eq!(result.optimized_prompts["system"], BALANCED);
}

#[test]
fn test_no_candidate_source() {
    let request = CompileRequest::new(instruction_agent(), trainset(), instruction_metric(TABLE));

    let err = mipro().compile(&CallContext::new(), &request).unwrap_err();

    assert!(matches!(err, ForgeError::MissingDependency(_)));
}

#[test]
fn test_devset_score_recorded() {
    let request = CompileRequest::new(instruction_agent(), trainset(), instruction_metric(TABLE))
        .with_config(mipro_config(&[BALANCED], &[]))
        .with_devset(vec![scored_example("dev", 0.0)]);

    let result = mipro().compile(&CallContext::new(), &request).unwrap();

    assert!((result.devset_score - 0.8).abs() < 1e-9);
}

#[test]
fn test_capabilities() {
    let mipro = mipro();
    assert_eq!(mipro.name(), "MIPRO");
    assert!(mipro.supports_multi_round());
    assert!(mipro.supports_teacher());
}

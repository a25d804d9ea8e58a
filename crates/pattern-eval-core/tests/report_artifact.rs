//! Evaluation report assembly and persistence.

use std::time::Duration;

use async_trait::async_trait;

use pattern_eval_core::{
    build_evaluation_report, write_evaluation_report_json, AgentState, EvaluationReport,
    EvaluatorConfig, Message, Pattern, PatternEvaluator, TaskCategory, TaskFilter, TaskSuite,
};

/// Always answers with the same text.
struct ConstantPattern(&'static str);

#[async_trait]
impl Pattern for ConstantPattern {
    async fn invoke(&self, mut state: AgentState) -> anyhow::Result<AgentState> {
        state.messages.push(Message::assistant(self.0));
        Ok(state)
    }
}

fn reasoning_suite() -> TaskSuite {
    TaskSuite::standard()
        .expect("standard suite")
        .filter(&TaskFilter::category(TaskCategory::Reasoning))
}

#[tokio::test]
async fn report_round_trips_through_disk() {
    let suite = reasoning_suite();
    let yes = ConstantPattern("Yes");
    let paris = ConstantPattern("The answer is Paris.");
    let yes_ref: &dyn Pattern = &yes;
    let paris_ref: &dyn Pattern = &paris;

    let evaluator = PatternEvaluator::new(
        EvaluatorConfig::default()
            .with_delay(Duration::ZERO)
            .with_robustness(false),
    )
    .with_run_id("run-report");
    let metrics = evaluator
        .evaluate_patterns(&[("yes", yes_ref), ("paris", paris_ref)], &suite)
        .await;

    let report =
        build_evaluation_report(evaluator.run_id(), &suite, &metrics).expect("build report");

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("reports").join("nested").join("evaluation.json");
    write_evaluation_report_json(&path, &report).expect("write report");

    let raw = std::fs::read_to_string(&path).expect("read report");
    let parsed: EvaluationReport = serde_json::from_str(&raw).expect("parse report");
    assert_eq!(parsed, report);
    assert_eq!(parsed.run_id, "run-report");
    assert_eq!(parsed.patterns_evaluated, vec!["yes", "paris"]);

    // "Yes" passes B1 strictly; "The answer is Paris." only passes B4 leniently.
    let yes_report = &parsed.individual_metrics[0];
    assert_eq!(yes_report.success.successful_tasks_strict, 1);
    let paris_report = &parsed.individual_metrics[1];
    assert_eq!(paris_report.success.successful_tasks_strict, 0);
    assert_eq!(paris_report.success.successful_tasks_lenient, 1);
    assert_eq!(paris_report.success.controllability_gap, 0.25);

    let comparison = parsed.comparison.expect("comparison");
    assert_eq!(comparison.success.best_pattern, "yes");
    assert_eq!(comparison.summary_table.len(), 2);
}

#[test]
fn report_writer_reports_unwritable_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let blocker = dir.path().join("file");
    std::fs::write(&blocker, "not a directory").expect("write blocker");

    let suite = reasoning_suite();
    let report = build_evaluation_report("run-x", &suite, &[]).expect("build report");
    let err = write_evaluation_report_json(&blocker.join("report.json"), &report).unwrap_err();
    assert!(err.to_string().contains("create"), "{err:#}");
}

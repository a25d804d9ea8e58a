use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregator::{MetricsAggregator, PatternComparison};
use crate::domain::suite::TaskSuite;
use crate::metrics::{PatternMetrics, PatternMetricsReport};

pub const REPORT_SCHEMA_VERSION: &str = "1.0";

/// Evaluation report artifact written after a multi-pattern run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluationReport {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub run_id: String,
    /// Digest of the task suite the patterns ran against.
    pub suite_digest: String,
    pub patterns_evaluated: Vec<String>,
    pub total_patterns: usize,
    pub individual_metrics: Vec<PatternMetricsReport>,
    /// `None` when no pattern was evaluated.
    pub comparison: Option<PatternComparison>,
}

/// Assemble the report for `metrics` evaluated against `suite`.
pub fn build_evaluation_report(
    run_id: &str,
    suite: &TaskSuite,
    metrics: &[PatternMetrics],
) -> Result<EvaluationReport> {
    let suite_digest = suite.digest().context("digest task suite")?;
    Ok(EvaluationReport {
        schema_version: REPORT_SCHEMA_VERSION.to_string(),
        generated_at: Utc::now(),
        run_id: run_id.to_string(),
        suite_digest,
        patterns_evaluated: metrics.iter().map(|m| m.pattern_name.clone()).collect(),
        total_patterns: metrics.len(),
        individual_metrics: metrics.iter().map(PatternMetrics::to_report).collect(),
        comparison: MetricsAggregator::compare_patterns(metrics),
    })
}

/// Write the report as pretty JSON, creating parent directories.
pub fn write_evaluation_report_json(path: &Path, report: &EvaluationReport) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("create {:?}", parent))?;
    }
    let content = serde_json::to_string_pretty(report).context("serialize evaluation report")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    tracing::info!(event = "report.written", path = %path.display(), patterns = report.total_patterns);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::result::{TaskResult, TaskVariant};

    fn metrics_for(suite: &TaskSuite, name: &str, pass_first: usize) -> PatternMetrics {
        let results: Vec<TaskResult> = suite
            .iter()
            .enumerate()
            .map(|(i, task)| {
                let mut r = TaskResult::pending(task, name, TaskVariant::Original);
                r.success = true;
                r.judge_success = i < pass_first;
                r.lenient_judge_success = i < pass_first;
                r
            })
            .collect();
        PatternMetrics::from_passes(name, suite.tasks(), &results, &[])
    }

    #[test]
    fn evaluation_report_has_expected_keys() {
        let suite = TaskSuite::standard().expect("standard suite");
        let all = vec![metrics_for(&suite, "react", 8), metrics_for(&suite, "cot", 12)];

        let report = build_evaluation_report("run-1", &suite, &all).expect("report");
        assert_eq!(report.total_patterns, 2);
        assert_eq!(report.patterns_evaluated, vec!["react", "cot"]);
        assert_eq!(report.suite_digest, suite.digest().expect("digest"));

        let raw = serde_json::to_value(&report).expect("serialize report");
        let obj = raw.as_object().expect("report object");
        for key in [
            "schema_version",
            "generated_at",
            "run_id",
            "suite_digest",
            "patterns_evaluated",
            "total_patterns",
            "individual_metrics",
            "comparison",
        ] {
            assert!(obj.contains_key(key), "missing {key}");
        }
        assert_eq!(raw["individual_metrics"][1]["success"]["success_rate_strict"], 0.75);
        assert_eq!(raw["comparison"]["success_dimension"]["best_pattern"], "cot");
    }

    #[test]
    fn empty_run_has_no_comparison() {
        let suite = TaskSuite::standard().expect("standard suite");
        let report = build_evaluation_report("run-2", &suite, &[]).expect("report");
        assert!(report.comparison.is_none());
        assert_eq!(report.total_patterns, 0);
    }
}

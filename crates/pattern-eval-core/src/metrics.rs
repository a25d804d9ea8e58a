//! Four-dimension metrics model.
//!
//! Each dimension is a plain struct built by a pure constructor from the
//! [`TaskResult`]s of a run (and the tasks that produced them). A
//! [`PatternMetrics`] envelope bundles all four once a pattern's passes are
//! complete; after that it is only read.
//!
//! Every rate with a zero denominator is `0.0`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::result::TaskResult;
use crate::domain::task::{TaskCategory, TaskComplexity, TestTask};

/// Interpretability scores are reported on a 0-10 scale.
const INTERPRETABILITY_SCALE: f64 = 10.0;

/// Round `value` to `places` decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn mean_count(values: &[usize]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<usize>() as f64 / values.len() as f64
    }
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn round_map<K: Ord + Clone>(map: &BTreeMap<K, f64>, places: i32) -> BTreeMap<K, f64> {
    map.iter()
        .map(|(k, v)| (k.clone(), round_to(*v, places)))
        .collect()
}

// ---------------------------------------------------------------------------
// Success
// ---------------------------------------------------------------------------

/// Success dimension, judged strictly and leniently.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuccessMetrics {
    pub total_tasks: usize,
    /// Strict judge passes.
    pub successful_tasks: usize,
    pub lenient_successful_tasks: usize,
    /// Strict judge failures, including execution errors.
    pub failed_tasks: usize,
    pub success_by_category: BTreeMap<TaskCategory, f64>,
    pub success_by_complexity: BTreeMap<TaskComplexity, f64>,
}

impl SuccessMetrics {
    /// Build from one pass. Breakdowns cover every category and complexity
    /// present in `tasks` that has at least one result.
    pub fn from_results(results: &[TaskResult], tasks: &[TestTask]) -> Self {
        let strict_rate = |matching: Vec<&TaskResult>| -> Option<f64> {
            if matching.is_empty() {
                None
            } else {
                let passed = matching.iter().filter(|r| r.judge_success).count();
                Some(ratio(passed, matching.len()))
            }
        };

        let mut success_by_category = BTreeMap::new();
        let mut success_by_complexity = BTreeMap::new();
        for task in tasks {
            if !success_by_category.contains_key(&task.category) {
                let matching = results.iter().filter(|r| r.category == task.category).collect();
                if let Some(rate) = strict_rate(matching) {
                    success_by_category.insert(task.category, rate);
                }
            }
            if !success_by_complexity.contains_key(&task.complexity) {
                let matching = results
                    .iter()
                    .filter(|r| r.complexity == task.complexity)
                    .collect();
                if let Some(rate) = strict_rate(matching) {
                    success_by_complexity.insert(task.complexity, rate);
                }
            }
        }

        let successful_tasks = results.iter().filter(|r| r.judge_success).count();
        Self {
            total_tasks: results.len(),
            successful_tasks,
            lenient_successful_tasks: results.iter().filter(|r| r.lenient_judge_success).count(),
            failed_tasks: results.len() - successful_tasks,
            success_by_category,
            success_by_complexity,
        }
    }

    pub fn success_rate(&self) -> f64 {
        ratio(self.successful_tasks, self.total_tasks)
    }

    pub fn lenient_success_rate(&self) -> f64 {
        ratio(self.lenient_successful_tasks, self.total_tasks)
    }

    /// Lenient minus strict success rate. Large values mean the agent knows
    /// the answer but ignores output-format instructions.
    pub fn controllability_gap(&self) -> f64 {
        self.lenient_success_rate() - self.success_rate()
    }

    pub fn failure_rate(&self) -> f64 {
        ratio(self.failed_tasks, self.total_tasks)
    }

    pub fn to_report(&self) -> SuccessReport {
        SuccessReport {
            total_tasks: self.total_tasks,
            successful_tasks_strict: self.successful_tasks,
            successful_tasks_lenient: self.lenient_successful_tasks,
            failed_tasks: self.failed_tasks,
            success_rate_strict: round_to(self.success_rate(), 3),
            success_rate_lenient: round_to(self.lenient_success_rate(), 3),
            controllability_gap: round_to(self.controllability_gap(), 3),
            failure_rate: round_to(self.failure_rate(), 3),
            success_by_category: round_map(&self.success_by_category, 3),
            success_by_complexity: round_map(&self.success_by_complexity, 3),
        }
    }
}

// ---------------------------------------------------------------------------
// Efficiency
// ---------------------------------------------------------------------------

/// Efficiency dimension. Only tasks whose agent call completed contribute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyMetrics {
    /// Seconds per executed task.
    pub latencies: Vec<f64>,
    pub input_tokens: Vec<usize>,
    pub output_tokens: Vec<usize>,
    pub step_counts: Vec<usize>,
    pub tool_call_counts: Vec<usize>,
}

impl EfficiencyMetrics {
    pub fn from_results(results: &[TaskResult]) -> Self {
        let mut metrics = Self::default();
        for result in results.iter().filter(|r| r.success) {
            metrics.latencies.push(result.latency_secs);
            metrics.input_tokens.push(result.input_tokens);
            metrics.output_tokens.push(result.output_tokens);
            metrics.step_counts.push(result.step_count);
            metrics.tool_call_counts.push(result.tool_call_count);
        }
        metrics
    }

    pub fn avg_latency(&self) -> f64 {
        mean(&self.latencies)
    }

    /// Mean of the two middle values for an even count.
    pub fn median_latency(&self) -> f64 {
        median(&self.latencies)
    }

    pub fn min_latency(&self) -> f64 {
        self.latencies.iter().copied().reduce(f64::min).unwrap_or(0.0)
    }

    pub fn max_latency(&self) -> f64 {
        self.latencies.iter().copied().reduce(f64::max).unwrap_or(0.0)
    }

    /// Mean of per-task `input + output` tokens.
    pub fn avg_total_tokens(&self) -> f64 {
        let totals: Vec<usize> = self
            .input_tokens
            .iter()
            .zip(&self.output_tokens)
            .map(|(i, o)| i + o)
            .collect();
        mean_count(&totals)
    }

    pub fn total_input_tokens(&self) -> usize {
        self.input_tokens.iter().sum()
    }

    pub fn total_output_tokens(&self) -> usize {
        self.output_tokens.iter().sum()
    }

    pub fn avg_steps(&self) -> f64 {
        mean_count(&self.step_counts)
    }

    pub fn avg_tool_calls(&self) -> f64 {
        mean_count(&self.tool_call_counts)
    }

    pub fn to_report(&self) -> EfficiencyReport {
        EfficiencyReport {
            avg_latency_sec: round_to(self.avg_latency(), 2),
            median_latency_sec: round_to(self.median_latency(), 2),
            min_latency_sec: round_to(self.min_latency(), 2),
            max_latency_sec: round_to(self.max_latency(), 2),
            avg_total_tokens: round_to(self.avg_total_tokens(), 1),
            total_input_tokens: self.total_input_tokens(),
            total_output_tokens: self.total_output_tokens(),
            avg_steps: round_to(self.avg_steps(), 1),
            avg_tool_calls: round_to(self.avg_tool_calls(), 1),
            total_tasks: self.latencies.len(),
        }
    }
}

// ---------------------------------------------------------------------------
// Robustness
// ---------------------------------------------------------------------------

/// Per-task robustness: 1.0 when both prompts pass, 0.5 when only the
/// original passes, 0.0 otherwise.
pub fn task_robustness_score(original_passed: bool, perturbed_passed: bool) -> f64 {
    match (original_passed, perturbed_passed) {
        (true, true) => 1.0,
        (true, false) => 0.5,
        (false, _) => 0.0,
    }
}

/// Robustness dimension: success under perturbed prompts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RobustnessMetrics {
    pub original_success_rate: f64,
    pub perturbed_success_rate: f64,
    /// Relative drop from original to perturbed, in percent.
    pub degradation_percentage: f64,
    pub task_robustness_scores: BTreeMap<String, f64>,
}

impl RobustnessMetrics {
    /// Metrics for known rates with the degradation already computed.
    pub fn from_rates(original_success_rate: f64, perturbed_success_rate: f64) -> Self {
        let mut metrics = Self {
            original_success_rate,
            perturbed_success_rate,
            ..Self::default()
        };
        metrics.calculate_degradation();
        metrics
    }

    /// Compare the original pass with the perturbed pass.
    ///
    /// An empty perturbed pass (robustness disabled, or no task declares a
    /// perturbation) leaves everything but `original_success_rate` at zero.
    /// Tasks missing from either pass get no per-task score.
    pub fn from_passes(
        original_success_rate: f64,
        original: &[TaskResult],
        perturbed: &[TaskResult],
    ) -> Self {
        if perturbed.is_empty() {
            return Self {
                original_success_rate,
                ..Self::default()
            };
        }

        let perturbed_passed = perturbed.iter().filter(|r| r.judge_success).count();
        let mut metrics =
            Self::from_rates(original_success_rate, ratio(perturbed_passed, perturbed.len()));

        for orig in original {
            if let Some(pert) = perturbed.iter().find(|p| p.task_id == orig.task_id) {
                metrics.task_robustness_scores.insert(
                    orig.task_id.clone(),
                    task_robustness_score(orig.judge_success, pert.judge_success),
                );
            }
        }
        metrics
    }

    /// `(original - perturbed) / original * 100`, or 0 when nothing passed
    /// originally.
    pub fn calculate_degradation(&mut self) {
        self.degradation_percentage = if self.original_success_rate == 0.0 {
            0.0
        } else {
            (self.original_success_rate - self.perturbed_success_rate)
                / self.original_success_rate
                * 100.0
        };
    }

    pub fn avg_robustness_score(&self) -> f64 {
        let scores: Vec<f64> = self.task_robustness_scores.values().copied().collect();
        mean(&scores)
    }

    pub fn to_report(&self) -> RobustnessReport {
        RobustnessReport {
            original_success_rate: round_to(self.original_success_rate, 3),
            perturbed_success_rate: round_to(self.perturbed_success_rate, 3),
            degradation_percentage: round_to(self.degradation_percentage, 2),
            avg_robustness_score: round_to(self.avg_robustness_score(), 3),
            task_robustness_scores: round_map(&self.task_robustness_scores, 3),
        }
    }
}

// ---------------------------------------------------------------------------
// Controllability
// ---------------------------------------------------------------------------

/// Controllability dimension: schema, tool policy and output format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControllabilityMetrics {
    /// Tasks declaring a JSON schema.
    pub total_json_tasks: usize,
    pub schema_compliant_tasks: usize,
    /// Tasks declaring a tool plan.
    pub total_tool_tasks: usize,
    /// Asserted, not measured: always equal to `total_tool_tasks` when built
    /// from results.
    pub tool_policy_compliant_tasks: usize,
    /// Tasks whose agent call completed.
    pub executed_tasks: usize,
    /// Executed tasks whose strict judge passed.
    pub format_compliant_tasks: usize,
    /// 0-10; zero means not scored.
    pub avg_interpretability_score: f64,
}

impl ControllabilityMetrics {
    pub fn from_results(results: &[TaskResult], tasks: &[TestTask]) -> Self {
        let task_for = |id: &str| tasks.iter().find(|t| t.id == id);

        let schema_compliant_tasks = results
            .iter()
            .filter(|r| r.schema_compliant)
            .filter(|r| task_for(&r.task_id).map_or(false, TestTask::has_schema))
            .count();
        let total_tool_tasks = tasks.iter().filter(|t| t.is_tool_task()).count();
        let executed: Vec<&TaskResult> = results.iter().filter(|r| r.success).collect();

        Self {
            total_json_tasks: tasks.iter().filter(|t| t.has_schema()).count(),
            schema_compliant_tasks,
            total_tool_tasks,
            tool_policy_compliant_tasks: total_tool_tasks,
            executed_tasks: executed.len(),
            format_compliant_tasks: executed.iter().filter(|r| r.judge_success).count(),
            avg_interpretability_score: 0.0,
        }
    }

    pub fn schema_compliance_rate(&self) -> f64 {
        ratio(self.schema_compliant_tasks, self.total_json_tasks)
    }

    pub fn tool_policy_compliance_rate(&self) -> f64 {
        ratio(self.tool_policy_compliant_tasks, self.total_tool_tasks)
    }

    pub fn format_compliance_rate(&self) -> f64 {
        ratio(self.format_compliant_tasks, self.executed_tasks)
    }

    /// Mean of the applicable component scores; 0 when none applies.
    pub fn overall_controllability(&self) -> f64 {
        let mut scores = Vec::with_capacity(4);
        if self.total_json_tasks > 0 {
            scores.push(self.schema_compliance_rate());
        }
        if self.total_tool_tasks > 0 {
            scores.push(self.tool_policy_compliance_rate());
        }
        if self.executed_tasks > 0 {
            scores.push(self.format_compliance_rate());
        }
        if self.avg_interpretability_score > 0.0 {
            scores.push(self.avg_interpretability_score / INTERPRETABILITY_SCALE);
        }
        mean(&scores)
    }

    pub fn to_report(&self) -> ControllabilityReport {
        ControllabilityReport {
            schema_compliance_rate: round_to(self.schema_compliance_rate(), 3),
            tool_policy_compliance_rate: round_to(self.tool_policy_compliance_rate(), 3),
            format_compliance_rate: round_to(self.format_compliance_rate(), 3),
            avg_interpretability_score: round_to(self.avg_interpretability_score, 2),
            overall_controllability: round_to(self.overall_controllability(), 3),
            total_json_tasks: self.total_json_tasks,
            schema_compliant_tasks: self.schema_compliant_tasks,
            total_tool_tasks: self.total_tool_tasks,
            tool_policy_compliant_tasks: self.tool_policy_compliant_tasks,
        }
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// All four dimensions for one evaluated pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternMetrics {
    pub pattern_name: String,
    pub success: SuccessMetrics,
    pub efficiency: EfficiencyMetrics,
    pub robustness: RobustnessMetrics,
    pub controllability: ControllabilityMetrics,
}

impl PatternMetrics {
    /// Fold a pattern's passes. Success, efficiency and controllability come
    /// from the original pass only.
    pub fn from_passes(
        pattern_name: impl Into<String>,
        tasks: &[TestTask],
        original: &[TaskResult],
        perturbed: &[TaskResult],
    ) -> Self {
        let success = SuccessMetrics::from_results(original, tasks);
        let robustness =
            RobustnessMetrics::from_passes(success.success_rate(), original, perturbed);
        Self {
            pattern_name: pattern_name.into(),
            efficiency: EfficiencyMetrics::from_results(original),
            controllability: ControllabilityMetrics::from_results(original, tasks),
            success,
            robustness,
        }
    }

    pub fn to_report(&self) -> PatternMetricsReport {
        PatternMetricsReport {
            pattern_name: self.pattern_name.clone(),
            success: self.success.to_report(),
            efficiency: self.efficiency.to_report(),
            robustness: self.robustness.to_report(),
            controllability: self.controllability.to_report(),
        }
    }

    /// One flat row for tabular comparison.
    pub fn summary(&self) -> PatternSummary {
        PatternSummary {
            pattern: self.pattern_name.clone(),
            success_rate_strict: round_to(self.success.success_rate(), 3),
            success_rate_lenient: round_to(self.success.lenient_success_rate(), 3),
            controllability_gap: round_to(self.success.controllability_gap(), 3),
            avg_latency_sec: round_to(self.efficiency.avg_latency(), 2),
            avg_tokens: round_to(self.efficiency.avg_total_tokens(), 1),
            degradation_pct: round_to(self.robustness.degradation_percentage, 2),
            controllability: round_to(self.controllability.overall_controllability(), 3),
        }
    }
}

// ---------------------------------------------------------------------------
// Report views
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessReport {
    pub total_tasks: usize,
    pub successful_tasks_strict: usize,
    pub successful_tasks_lenient: usize,
    pub failed_tasks: usize,
    pub success_rate_strict: f64,
    pub success_rate_lenient: f64,
    pub controllability_gap: f64,
    pub failure_rate: f64,
    pub success_by_category: BTreeMap<TaskCategory, f64>,
    pub success_by_complexity: BTreeMap<TaskComplexity, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyReport {
    pub avg_latency_sec: f64,
    pub median_latency_sec: f64,
    pub min_latency_sec: f64,
    pub max_latency_sec: f64,
    pub avg_total_tokens: f64,
    pub total_input_tokens: usize,
    pub total_output_tokens: usize,
    pub avg_steps: f64,
    pub avg_tool_calls: f64,
    pub total_tasks: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobustnessReport {
    pub original_success_rate: f64,
    pub perturbed_success_rate: f64,
    pub degradation_percentage: f64,
    pub avg_robustness_score: f64,
    pub task_robustness_scores: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllabilityReport {
    pub schema_compliance_rate: f64,
    pub tool_policy_compliance_rate: f64,
    pub format_compliance_rate: f64,
    pub avg_interpretability_score: f64,
    pub overall_controllability: f64,
    pub total_json_tasks: usize,
    pub schema_compliant_tasks: usize,
    pub total_tool_tasks: usize,
    pub tool_policy_compliant_tasks: usize,
}

/// Nested, rounded view of [`PatternMetrics`] for external renderers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternMetricsReport {
    pub pattern_name: String,
    pub success: SuccessReport,
    pub efficiency: EfficiencyReport,
    pub robustness: RobustnessReport,
    pub controllability: ControllabilityReport,
}

/// Flat summary row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSummary {
    pub pattern: String,
    pub success_rate_strict: f64,
    pub success_rate_lenient: f64,
    pub controllability_gap: f64,
    pub avg_latency_sec: f64,
    pub avg_tokens: f64,
    pub degradation_pct: f64,
    pub controllability: f64,
}

//! Evaluation orchestration.
//!
//! [`PatternEvaluator`] drives a [`Pattern`] through a [`TaskSuite`]:
//!
//! 1. original pass: every task, in suite order, with its own prompt
//! 2. robustness pass (optional): tasks declaring a perturbation, re-run with
//!    the first perturbation as the prompt
//! 3. fold both passes into [`PatternMetrics`]
//!
//! Everything runs sequentially. An agent error is recorded on that task's
//! [`TaskResult`] and the pass moves on.

use std::time::Instant;

use chrono::Utc;
use tracing::Instrument;
use uuid::Uuid;

use crate::aggregator::MetricsAggregator;
use crate::config::EvaluatorConfig;
use crate::domain::result::{estimate_tokens, TaskResult, TaskVariant};
use crate::domain::suite::TaskSuite;
use crate::domain::task::TestTask;
use crate::judge::Judge;
use crate::metrics::PatternMetrics;
use crate::obs::{self, PatternSpan};
use crate::pattern::{AgentState, Pattern};

/// Execution errors are cut to this many characters in the judge message.
const ERROR_PREVIEW_CHARS: usize = 100;

/// Everything one pattern's evaluation produced.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PatternRun {
    pub metrics: PatternMetrics,
    pub original_results: Vec<TaskResult>,
    /// Empty when the robustness pass is disabled or no task is perturbed.
    pub perturbed_results: Vec<TaskResult>,
}

pub struct PatternEvaluator {
    config: EvaluatorConfig,
    run_id: String,
}

impl PatternEvaluator {
    pub fn new(config: EvaluatorConfig) -> Self {
        Self {
            config,
            run_id: Uuid::new_v4().to_string(),
        }
    }

    /// Override the generated run id, e.g. to correlate with a caller's logs.
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Evaluate one pattern against `suite`.
    pub async fn evaluate_pattern(
        &self,
        pattern_name: &str,
        pattern: &dyn Pattern,
        suite: &TaskSuite,
    ) -> PatternRun {
        let (original_results, perturbed_results) = async {
            obs::emit_pattern_started(pattern_name, suite.len());

            let original: Vec<(&TestTask, &str)> =
                suite.iter().map(|t| (t, t.prompt.as_str())).collect();
            let original_results = self
                .run_pass(pattern_name, pattern, &original, TaskVariant::Original)
                .await;

            let perturbed_results = if self.config.include_robustness {
                let perturbed: Vec<(&TestTask, &str)> = suite
                    .iter()
                    .filter_map(|t| t.first_perturbation().map(|p| (t, p)))
                    .collect();
                self.run_pass(pattern_name, pattern, &perturbed, TaskVariant::Perturbed)
                    .await
            } else {
                tracing::debug!(pattern = %pattern_name, "robustness pass disabled");
                Vec::new()
            };

            (original_results, perturbed_results)
        }
        .instrument(obs::pattern_span(&self.run_id, pattern_name))
        .await;

        let _span = PatternSpan::enter(&self.run_id, pattern_name);
        let metrics = PatternMetrics::from_passes(
            pattern_name,
            suite.tasks(),
            &original_results,
            &perturbed_results,
        );
        obs::emit_pattern_finished(
            pattern_name,
            metrics.success.success_rate(),
            metrics.success.lenient_success_rate(),
            metrics.efficiency.avg_latency(),
            metrics.controllability.overall_controllability(),
        );

        PatternRun {
            metrics,
            original_results,
            perturbed_results,
        }
    }

    /// Evaluate each pattern in turn and log the cross-pattern comparison.
    /// Metrics come back in input order.
    pub async fn evaluate_patterns(
        &self,
        patterns: &[(&str, &dyn Pattern)],
        suite: &TaskSuite,
    ) -> Vec<PatternMetrics> {
        let mut all = Vec::with_capacity(patterns.len());
        for (name, pattern) in patterns {
            let run = self.evaluate_pattern(name, *pattern, suite).await;
            all.push(run.metrics);
        }

        if let Some(comparison) = MetricsAggregator::compare_patterns(&all) {
            obs::emit_comparison(
                &comparison.success.best_pattern,
                &comparison.efficiency.best_pattern,
                &comparison.robustness.best_pattern,
                &comparison.controllability.best_pattern,
            );
        }
        all
    }

    async fn run_pass(
        &self,
        pattern_name: &str,
        pattern: &dyn Pattern,
        tasks: &[(&TestTask, &str)],
        variant: TaskVariant,
    ) -> Vec<TaskResult> {
        if tasks.is_empty() {
            return Vec::new();
        }
        obs::emit_pass_started(pattern_name, variant, tasks.len());

        let delay = self.config.delay_between_tasks;
        let mut results = Vec::with_capacity(tasks.len());
        for (index, (task, prompt)) in tasks.iter().enumerate() {
            let result = self
                .run_task(pattern_name, pattern, task, prompt, variant)
                .await;
            obs::emit_task_judged(index + 1, tasks.len(), &result);
            results.push(result);

            if index + 1 < tasks.len() && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
        results
    }

    async fn run_task(
        &self,
        pattern_name: &str,
        pattern: &dyn Pattern,
        task: &TestTask,
        prompt: &str,
        variant: TaskVariant,
    ) -> TaskResult {
        let mut result = TaskResult::pending(task, pattern_name, variant);

        let started_at = Utc::now();
        let clock = Instant::now();
        let outcome = pattern.invoke(AgentState::for_prompt(prompt)).await;
        result.latency_secs = clock.elapsed().as_secs_f64();
        result.started_at = Some(started_at);
        result.finished_at = Some(Utc::now());

        let state = match outcome {
            Ok(state) => state,
            Err(err) => {
                let message = format!("{err:#}");
                obs::emit_task_failed(pattern_name, &task.id, &message);
                let preview: String = message.chars().take(ERROR_PREVIEW_CHARS).collect();
                result.judge_message = format!("Execution error: {preview}");
                result.error = Some(message);
                if task.has_schema() {
                    result.schema_compliant = false;
                }
                return result;
            }
        };

        result.success = true;
        result.output = state.final_output().to_string();
        result.step_count = state.messages.len();
        result.tool_call_count = state.tool_call_count();
        result.input_tokens = estimate_tokens(prompt);
        result.output_tokens = estimate_tokens(&result.output);
        result.total_tokens = result.input_tokens + result.output_tokens;

        let schema = task.schema.as_ref();
        let ground_truth = task.ground_truth.as_ref();
        let strict = Judge::evaluate(&result.output, ground_truth, &task.judge, schema, false);
        let lenient = Judge::evaluate(&result.output, ground_truth, &task.judge, schema, true);

        if task.has_schema() {
            result.schema_compliant = strict.passed;
        }
        result.judge_success = strict.passed;
        result.judge_message = strict.message;
        result.lenient_judge_success = lenient.passed;
        result.lenient_judge_message = lenient.message;
        result
    }
}

impl Default for PatternEvaluator {
    fn default() -> Self {
        Self::new(EvaluatorConfig::default())
    }
}

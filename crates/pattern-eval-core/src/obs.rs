//! Structured evaluation lifecycle events.
//!
//! Each helper emits one `tracing` event with an `event = "..."` field so
//! runs can be followed in text or JSON logs. [`PatternSpan`] ties everything
//! logged during a pattern's evaluation to its `run_id` and name.

use tracing::info;

use crate::domain::result::{TaskResult, TaskVariant};

/// Judge messages are cut to this many characters in progress events.
const MESSAGE_PREVIEW_CHARS: usize = 50;

fn preview(message: &str) -> String {
    message.chars().take(MESSAGE_PREVIEW_CHARS).collect()
}

fn marker(passed: bool) -> &'static str {
    if passed {
        "✓"
    } else {
        "✗"
    }
}

/// Span covering one pattern's evaluation. Use with
/// `tracing::Instrument` across awaits.
pub fn pattern_span(run_id: &str, pattern: &str) -> tracing::Span {
    tracing::info_span!("pattern_eval.pattern", run_id = %run_id, pattern = %pattern)
}

/// RAII guard that enters [`pattern_span`] for synchronous sections.
///
/// ```ignore
/// let _span = PatternSpan::enter(&run_id, "react");
/// ```
pub struct PatternSpan {
    _span: tracing::span::EnteredSpan,
}

impl PatternSpan {
    pub fn enter(run_id: &str, pattern: &str) -> Self {
        Self {
            _span: pattern_span(run_id, pattern).entered(),
        }
    }
}

pub fn emit_pattern_started(pattern: &str, total_tasks: usize) {
    info!(event = "pattern.started", pattern = %pattern, total_tasks = total_tasks);
}

/// A pass over the suite is about to start.
pub fn emit_pass_started(pattern: &str, variant: TaskVariant, tasks: usize) {
    info!(
        event = "pass.started",
        pattern = %pattern,
        variant = %variant,
        tasks = tasks,
    );
}

/// Per-task progress: the strict marker, plus the lenient one when the
/// verdicts disagree.
pub fn emit_task_judged(index: usize, total: usize, result: &TaskResult) {
    let progress = format!("{index}/{total}");
    let strict = format!(
        "{} {}",
        marker(result.judge_success),
        preview(&result.judge_message)
    );
    let lenient = result.judges_disagree().then(|| {
        format!(
            "{} {}",
            marker(result.lenient_judge_success),
            preview(&result.lenient_judge_message)
        )
    });
    info!(
        event = "task.judged",
        pattern = %result.pattern_name,
        task_id = %result.task_id,
        variant = %result.variant,
        progress = %progress,
        latency_secs = result.latency_secs,
        strict = %strict,
        lenient = lenient.as_deref(),
    );
}

/// The agent call for a task failed; the run continues.
pub fn emit_task_failed(pattern: &str, task_id: &str, error: &dyn std::fmt::Display) {
    tracing::warn!(event = "task.failed", pattern = %pattern, task_id = %task_id, error = %error);
}

pub fn emit_pattern_finished(
    pattern: &str,
    success_rate: f64,
    lenient_success_rate: f64,
    avg_latency_secs: f64,
    controllability: f64,
) {
    info!(
        event = "pattern.finished",
        pattern = %pattern,
        success_rate = success_rate,
        lenient_success_rate = lenient_success_rate,
        controllability_gap = lenient_success_rate - success_rate,
        avg_latency_secs = avg_latency_secs,
        controllability = controllability,
    );
}

/// Per-dimension winners across patterns.
pub fn emit_comparison(
    best_success: &str,
    fastest: &str,
    most_robust: &str,
    most_controllable: &str,
) {
    info!(
        event = "comparison.finished",
        best_success = %best_success,
        fastest = %fastest,
        most_robust = %most_robust,
        most_controllable = %most_controllable,
    );
}

//! Per-execution task results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::task::{TaskCategory, TaskComplexity, TestTask};

const SUMMARY_OUTPUT_CHARS: usize = 200;

/// Which prompt a result was produced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskVariant {
    /// The task's own prompt.
    Original,
    /// The task's first perturbation.
    Perturbed,
}

impl std::fmt::Display for TaskVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskVariant::Original => write!(f, "original"),
            TaskVariant::Perturbed => write!(f, "perturbed"),
        }
    }
}

/// Outcome of running one task against one pattern.
///
/// `success` records whether the agent call completed; whether the answer
/// was right is `judge_success` (strict) and `lenient_judge_success`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskResult {
    pub task_id: String,
    pub category: TaskCategory,
    pub complexity: TaskComplexity,
    pub pattern_name: String,
    pub variant: TaskVariant,

    pub success: bool,
    pub output: String,
    pub error: Option<String>,

    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Wall-clock seconds spent in the agent call.
    pub latency_secs: f64,

    pub input_tokens: usize,
    pub output_tokens: usize,
    pub total_tokens: usize,
    pub step_count: usize,
    pub tool_call_count: usize,

    pub judge_success: bool,
    pub judge_message: String,
    pub lenient_judge_success: bool,
    pub lenient_judge_message: String,
    pub schema_compliant: bool,
    pub tool_policy_compliant: bool,
}

impl TaskResult {
    /// A not-yet-executed result for `task`.
    pub fn pending(task: &TestTask, pattern_name: &str, variant: TaskVariant) -> Self {
        Self {
            task_id: task.id.clone(),
            category: task.category,
            complexity: task.complexity,
            pattern_name: pattern_name.to_string(),
            variant,
            success: false,
            output: String::new(),
            error: None,
            started_at: None,
            finished_at: None,
            latency_secs: 0.0,
            input_tokens: 0,
            output_tokens: 0,
            total_tokens: 0,
            step_count: 0,
            tool_call_count: 0,
            judge_success: false,
            judge_message: String::new(),
            lenient_judge_success: false,
            lenient_judge_message: String::new(),
            schema_compliant: true,
            tool_policy_compliant: true,
        }
    }

    /// Strict and lenient judging reached different verdicts.
    pub fn judges_disagree(&self) -> bool {
        self.judge_success != self.lenient_judge_success
    }

    pub fn summary(&self) -> TaskResultSummary {
        let output = if self.output.chars().count() > SUMMARY_OUTPUT_CHARS {
            let head: String = self.output.chars().take(SUMMARY_OUTPUT_CHARS).collect();
            format!("{head}...")
        } else {
            self.output.clone()
        };

        TaskResultSummary {
            task_id: self.task_id.clone(),
            pattern: self.pattern_name.clone(),
            variant: self.variant,
            success: self.success,
            judge_success: self.judge_success,
            lenient_judge_success: self.lenient_judge_success,
            latency: (self.latency_secs * 1000.0).round() / 1000.0,
            total_tokens: self.total_tokens,
            step_count: self.step_count,
            output,
            error: self.error.clone(),
            judge_message: self.judge_message.clone(),
        }
    }
}

/// Compact, serialisable view of a [`TaskResult`] for reports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskResultSummary {
    pub task_id: String,
    pub pattern: String,
    pub variant: TaskVariant,
    pub success: bool,
    pub judge_success: bool,
    pub lenient_judge_success: bool,
    pub latency: f64,
    pub total_tokens: usize,
    pub step_count: usize,
    pub output: String,
    pub error: Option<String>,
    pub judge_message: String,
}

/// Rough token estimate: one token per four characters.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::JudgeConfig;

    fn task() -> TestTask {
        TestTask::new("A1", TaskCategory::Baseline, "Compute 17 * 24.", JudgeConfig::Exact)
    }

    #[test]
    fn test_pending_defaults() {
        let r = TaskResult::pending(&task(), "react", TaskVariant::Original);
        assert!(!r.success);
        assert!(r.schema_compliant);
        assert!(r.tool_policy_compliant);
        assert_eq!(r.category, TaskCategory::Baseline);
        assert_eq!(r.complexity, TaskComplexity::Medium);
    }

    #[test]
    fn test_summary_truncates_long_output() {
        let mut r = TaskResult::pending(&task(), "react", TaskVariant::Original);
        r.output = "x".repeat(250);
        r.latency_secs = 1.23456;

        let s = r.summary();
        assert_eq!(s.output.len(), 203);
        assert!(s.output.ends_with("..."));
        assert_eq!(s.latency, 1.235);
    }

    #[test]
    fn test_summary_keeps_short_output() {
        let mut r = TaskResult::pending(&task(), "react", TaskVariant::Perturbed);
        r.output = "408".to_string();
        assert_eq!(r.summary().output, "408");
    }

    #[test]
    fn test_estimate_tokens_counts_chars() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 0);
        assert_eq!(estimate_tokens("abcdefgh"), 2);
        assert_eq!(estimate_tokens("äöüäöüäö"), 2);
    }

    #[test]
    fn test_judges_disagree() {
        let mut r = TaskResult::pending(&task(), "react", TaskVariant::Original);
        assert!(!r.judges_disagree());
        r.lenient_judge_success = true;
        assert!(r.judges_disagree());
    }
}

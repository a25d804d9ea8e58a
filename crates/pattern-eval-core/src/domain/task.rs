//! Evaluation task definitions and judge configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Task category within the suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    /// Arithmetic, formatting, factual QA.
    Baseline,
    /// Logic, deduction, comprehension.
    Reasoning,
    /// External data access through tools.
    Tool,
    /// Multi-step tasks with structured output.
    Planning,
}

impl TaskCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskCategory::Baseline => "baseline",
            TaskCategory::Reasoning => "reasoning",
            TaskCategory::Tool => "tool",
            TaskCategory::Planning => "planning",
        }
    }
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task complexity level.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TaskComplexity {
    Simple,
    #[default]
    Medium,
    Complex,
}

impl TaskComplexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskComplexity::Simple => "simple",
            TaskComplexity::Medium => "medium",
            TaskComplexity::Complex => "complex",
        }
    }
}

impl fmt::Display for TaskComplexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Judge mode, without mode-specific parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JudgeMode {
    Exact,
    Json,
    Regex,
}

/// How a task's output is judged. Exactly one mode per task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum JudgeConfig {
    /// Trimmed, case-sensitive string equality against the ground truth.
    Exact,

    /// Parse the output as JSON, validate against the task schema and compare
    /// with the ground truth.
    Json {
        /// Object keys dropped from both sides before comparison.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        ignore_fields: Vec<String>,
    },

    /// Unanchored regex search over the output.
    Regex {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pattern: Option<String>,
    },
}

impl JudgeConfig {
    pub fn json() -> Self {
        JudgeConfig::Json {
            ignore_fields: Vec::new(),
        }
    }

    pub fn regex(pattern: impl Into<String>) -> Self {
        JudgeConfig::Regex {
            pattern: Some(pattern.into()),
        }
    }

    pub fn mode(&self) -> JudgeMode {
        match self {
            JudgeConfig::Exact => JudgeMode::Exact,
            JudgeConfig::Json { .. } => JudgeMode::Json,
            JudgeConfig::Regex { .. } => JudgeMode::Regex,
        }
    }
}

/// Tool usage policy declared by a task.
///
/// Carried through for reporting only; the engine does not check tool calls
/// against the whitelist.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolPolicy {
    #[serde(default)]
    pub tool_whitelist: Vec<String>,
}

/// Robustness settings for a task.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RobustnessSpec {
    /// Alternate phrasings of the prompt. Only the first is run.
    #[serde(default)]
    pub perturbations: Vec<String>,

    /// Probability hint for agents that simulate tool failures.
    #[serde(default)]
    pub tool_failure_prob: f64,
}

/// A single evaluation task. Read-only once loaded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestTask {
    pub id: String,
    pub category: TaskCategory,
    #[serde(default)]
    pub complexity: TaskComplexity,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ground_truth: Option<serde_json::Value>,
    pub judge: JudgeConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<ToolPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub robustness: Option<RobustnessSpec>,
}

impl TestTask {
    /// Create a task with medium complexity and no optional sections.
    pub fn new(
        id: impl Into<String>,
        category: TaskCategory,
        prompt: impl Into<String>,
        judge: JudgeConfig,
    ) -> Self {
        Self {
            id: id.into(),
            category,
            complexity: TaskComplexity::default(),
            prompt: prompt.into(),
            ground_truth: None,
            judge,
            schema: None,
            plan: None,
            policy: None,
            robustness: None,
        }
    }

    pub fn with_complexity(mut self, complexity: TaskComplexity) -> Self {
        self.complexity = complexity;
        self
    }

    pub fn with_ground_truth(mut self, ground_truth: serde_json::Value) -> Self {
        self.ground_truth = Some(ground_truth);
        self
    }

    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Declare the expected tool sequence; also sets a matching whitelist.
    pub fn with_plan(mut self, tools: Vec<String>) -> Self {
        self.policy = Some(ToolPolicy {
            tool_whitelist: tools.clone(),
        });
        self.plan = Some(tools);
        self
    }

    pub fn with_perturbations(mut self, perturbations: Vec<String>) -> Self {
        self.robustness
            .get_or_insert_with(RobustnessSpec::default)
            .perturbations = perturbations;
        self
    }

    /// Alternate prompts for robustness testing; empty when none are declared.
    pub fn perturbations(&self) -> &[String] {
        self.robustness
            .as_ref()
            .map(|r| r.perturbations.as_slice())
            .unwrap_or(&[])
    }

    /// The perturbation used by the robustness pass.
    pub fn first_perturbation(&self) -> Option<&str> {
        self.perturbations().first().map(String::as_str)
    }

    pub fn tool_failure_prob(&self) -> f64 {
        self.robustness
            .as_ref()
            .map(|r| r.tool_failure_prob)
            .unwrap_or(0.0)
    }

    pub fn has_schema(&self) -> bool {
        self.schema.is_some()
    }

    /// Tasks that declare an expected tool plan.
    pub fn is_tool_task(&self) -> bool {
        self.plan.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_perturbations_empty_when_absent() {
        let task = TestTask::new(
            "X1",
            TaskCategory::Baseline,
            "Say hi",
            JudgeConfig::Exact,
        );
        assert!(task.perturbations().is_empty());
        assert_eq!(task.first_perturbation(), None);
        assert_eq!(task.tool_failure_prob(), 0.0);
    }

    #[test]
    fn test_first_perturbation() {
        let task = TestTask::new("X1", TaskCategory::Baseline, "p", JudgeConfig::Exact)
            .with_perturbations(vec!["p1".to_string(), "p2".to_string()]);
        assert_eq!(task.first_perturbation(), Some("p1"));
    }

    #[test]
    fn test_judge_config_tagged_by_mode() {
        let cfg: JudgeConfig = serde_json::from_value(json!({"mode": "exact"})).expect("exact");
        assert_eq!(cfg, JudgeConfig::Exact);

        let cfg: JudgeConfig =
            serde_json::from_value(json!({"mode": "json", "ignore_fields": ["path"]}))
                .expect("json");
        assert_eq!(
            cfg,
            JudgeConfig::Json {
                ignore_fields: vec!["path".to_string()]
            }
        );

        let cfg: JudgeConfig = serde_json::from_value(json!({"mode": "regex"})).expect("regex");
        assert_eq!(cfg, JudgeConfig::Regex { pattern: None });
        assert_eq!(cfg.mode(), JudgeMode::Regex);
    }

    #[test]
    fn test_unknown_judge_mode_rejected() {
        let cfg = serde_json::from_value::<JudgeConfig>(json!({"mode": "fuzzy"}));
        assert!(cfg.is_err());
    }

    #[test]
    fn test_task_defaults_from_json() {
        let task: TestTask = serde_json::from_value(json!({
            "id": "B9",
            "category": "reasoning",
            "prompt": "Yes or no?",
            "ground_truth": "Yes",
            "judge": {"mode": "exact"}
        }))
        .expect("deserialize");

        assert_eq!(task.complexity, TaskComplexity::Medium);
        assert!(!task.has_schema());
        assert!(!task.is_tool_task());
        assert_eq!(task.ground_truth, Some(json!("Yes")));
    }

    #[test]
    fn test_with_plan_sets_whitelist() {
        let task = TestTask::new("C9", TaskCategory::Tool, "p", JudgeConfig::json())
            .with_plan(vec!["weather_api".to_string()]);
        assert!(task.is_tool_task());
        assert_eq!(
            task.policy.map(|p| p.tool_whitelist),
            Some(vec!["weather_api".to_string()])
        );
    }
}

//! Immutable task catalog with filtering.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::digest::compute_digest;
use crate::domain::error::{EvalError, Result};
use crate::domain::task::{JudgeMode, TaskCategory, TaskComplexity, TestTask};

const STANDARD_SUITE: &str = include_str!("../../suites/standard.json");

/// Filter applied to a [`TaskSuite`]. All set criteria must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub category: Option<TaskCategory>,
    pub complexity: Option<TaskComplexity>,
    /// Restrict to these ids. Empty means no id restriction.
    pub task_ids: Vec<String>,
}

impl TaskFilter {
    pub fn category(category: TaskCategory) -> Self {
        Self {
            category: Some(category),
            ..Self::default()
        }
    }

    pub fn complexity(complexity: TaskComplexity) -> Self {
        Self {
            complexity: Some(complexity),
            ..Self::default()
        }
    }

    pub fn ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            task_ids: ids.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    fn matches(&self, task: &TestTask) -> bool {
        self.category.map_or(true, |c| task.category == c)
            && self.complexity.map_or(true, |c| task.complexity == c)
            && (self.task_ids.is_empty() || self.task_ids.iter().any(|id| *id == task.id))
    }
}

/// Task counts by category, complexity and judge mode.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SuiteStats {
    pub total_tasks: usize,
    pub by_category: BTreeMap<TaskCategory, usize>,
    pub by_complexity: BTreeMap<TaskComplexity, usize>,
    pub by_judge_mode: BTreeMap<JudgeMode, usize>,
}

/// An ordered, immutable set of evaluation tasks with unique ids.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSuite {
    tasks: Vec<TestTask>,
}

impl TaskSuite {
    /// Build a suite, rejecting empty or duplicate task ids.
    pub fn from_tasks(tasks: Vec<TestTask>) -> Result<Self> {
        let mut seen = HashSet::new();
        for task in &tasks {
            if task.id.trim().is_empty() {
                return Err(EvalError::InvalidSuite(
                    "task id must not be empty".to_string(),
                ));
            }
            if !seen.insert(task.id.as_str()) {
                return Err(EvalError::DuplicateTaskId(task.id.clone()));
            }
        }
        Ok(Self { tasks })
    }

    /// Parse a JSON array of tasks.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let tasks: Vec<TestTask> = serde_json::from_str(json)?;
        Self::from_tasks(tasks)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// The built-in 16-task suite (baseline, reasoning, tool, planning).
    pub fn standard() -> Result<Self> {
        Self::from_json_str(STANDARD_SUITE)
    }

    /// A new suite holding the matching tasks, in suite order.
    pub fn filter(&self, filter: &TaskFilter) -> TaskSuite {
        TaskSuite {
            tasks: self
                .tasks
                .iter()
                .filter(|t| filter.matches(t))
                .cloned()
                .collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&TestTask> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Like [`TaskSuite::get`] but fails with [`EvalError::TaskNotFound`].
    pub fn require(&self, id: &str) -> Result<&TestTask> {
        self.get(id)
            .ok_or_else(|| EvalError::TaskNotFound(id.to_string()))
    }

    pub fn tasks(&self) -> &[TestTask] {
        &self.tasks
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TestTask> {
        self.tasks.iter()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Distinct categories in first-seen order.
    pub fn categories(&self) -> Vec<TaskCategory> {
        let mut out = Vec::new();
        for task in &self.tasks {
            if !out.contains(&task.category) {
                out.push(task.category);
            }
        }
        out
    }

    /// Distinct complexities in first-seen order.
    pub fn complexities(&self) -> Vec<TaskComplexity> {
        let mut out = Vec::new();
        for task in &self.tasks {
            if !out.contains(&task.complexity) {
                out.push(task.complexity);
            }
        }
        out
    }

    pub fn stats(&self) -> SuiteStats {
        let mut stats = SuiteStats {
            total_tasks: self.tasks.len(),
            ..SuiteStats::default()
        };
        for task in &self.tasks {
            *stats.by_category.entry(task.category).or_default() += 1;
            *stats.by_complexity.entry(task.complexity).or_default() += 1;
            *stats.by_judge_mode.entry(task.judge.mode()).or_default() += 1;
        }
        stats
    }

    /// SHA-256 of the canonical JSON of every task, in order.
    pub fn digest(&self) -> Result<String> {
        compute_digest(&serde_json::to_value(&self.tasks)?)
    }
}

impl<'a> IntoIterator for &'a TaskSuite {
    type Item = &'a TestTask;
    type IntoIter = std::slice::Iter<'a, TestTask>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::JudgeConfig;

    #[test]
    fn test_standard_suite_loads() {
        let suite = TaskSuite::standard().expect("standard suite");
        assert_eq!(suite.len(), 16);

        let stats = suite.stats();
        assert_eq!(stats.by_category[&TaskCategory::Baseline], 4);
        assert_eq!(stats.by_category[&TaskCategory::Reasoning], 4);
        assert_eq!(stats.by_category[&TaskCategory::Tool], 4);
        assert_eq!(stats.by_category[&TaskCategory::Planning], 4);
        assert_eq!(stats.by_complexity[&TaskComplexity::Simple], 4);
        assert_eq!(stats.by_complexity[&TaskComplexity::Medium], 8);
        assert_eq!(stats.by_complexity[&TaskComplexity::Complex], 4);
        assert_eq!(stats.by_judge_mode[&JudgeMode::Exact], 6);
        assert_eq!(stats.by_judge_mode[&JudgeMode::Json], 7);
        assert_eq!(stats.by_judge_mode[&JudgeMode::Regex], 3);
    }

    #[test]
    fn test_every_standard_task_has_perturbations() {
        let suite = TaskSuite::standard().expect("standard suite");
        assert!(suite.iter().all(|t| !t.perturbations().is_empty()));
    }

    #[test]
    fn test_filter_by_category_and_complexity() {
        let suite = TaskSuite::standard().expect("standard suite");

        let baseline = suite.filter(&TaskFilter::category(TaskCategory::Baseline));
        assert_eq!(baseline.len(), 4);
        assert!(baseline.iter().all(|t| t.category == TaskCategory::Baseline));

        let simple = suite.filter(&TaskFilter::complexity(TaskComplexity::Simple));
        assert_eq!(simple.len(), 4);

        let none = suite.filter(&TaskFilter {
            category: Some(TaskCategory::Tool),
            complexity: Some(TaskComplexity::Simple),
            task_ids: vec![],
        });
        assert!(none.is_empty());
    }

    #[test]
    fn test_filter_by_ids_keeps_suite_order() {
        let suite = TaskSuite::standard().expect("standard suite");
        let picked = suite.filter(&TaskFilter::ids(["B2", "A1"]));
        let ids: Vec<&str> = picked.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["A1", "B2"]);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let task = TestTask::new("A1", TaskCategory::Baseline, "p", JudgeConfig::Exact);
        let err = TaskSuite::from_tasks(vec![task.clone(), task]).unwrap_err();
        assert!(matches!(err, EvalError::DuplicateTaskId(id) if id == "A1"));
    }

    #[test]
    fn test_require_unknown_task() {
        let suite = TaskSuite::standard().expect("standard suite");
        assert!(suite.require("A1").is_ok());
        assert!(matches!(
            suite.require("Z9"),
            Err(EvalError::TaskNotFound(_))
        ));
    }

    #[test]
    fn test_categories_first_seen_order() {
        let suite = TaskSuite::standard().expect("standard suite");
        assert_eq!(
            suite.categories(),
            vec![
                TaskCategory::Baseline,
                TaskCategory::Reasoning,
                TaskCategory::Tool,
                TaskCategory::Planning
            ]
        );
    }

    #[test]
    fn test_digest_is_stable_and_filter_sensitive() {
        let suite = TaskSuite::standard().expect("standard suite");
        let d1 = suite.digest().expect("digest");
        let d2 = TaskSuite::standard().expect("suite").digest().expect("digest");
        assert_eq!(d1, d2);

        let subset = suite.filter(&TaskFilter::category(TaskCategory::Tool));
        assert_ne!(d1, subset.digest().expect("digest"));
    }
}

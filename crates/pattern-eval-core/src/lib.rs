//! Pattern Evaluation Engine
//!
//! Scores interchangeable agent implementations ("patterns") against a fixed
//! task suite on four dimensions (success, efficiency, robustness,
//! controllability) and ranks them.

pub mod aggregator;
pub mod config;
pub mod domain;
pub mod evaluator;
pub mod judge;
pub mod metrics;
pub mod obs;
pub mod pattern;
pub mod reporting;
pub mod telemetry;

pub use aggregator::{
    DimensionRanking, Direction, MetricsAggregator, PatternComparison, PatternScore,
};
pub use config::EvaluatorConfig;
pub use domain::{
    EvalError, JudgeConfig, JudgeMode, Result, RobustnessSpec, SuiteStats, TaskCategory,
    TaskComplexity, TaskFilter, TaskResult, TaskResultSummary, TaskSuite, TaskVariant, TestTask,
    ToolPolicy,
};
pub use evaluator::{PatternEvaluator, PatternRun};
pub use judge::{extract_answer, extract_json, JsonExtractError, Judge, JudgeVerdict};
pub use metrics::{
    task_robustness_score, ControllabilityMetrics, EfficiencyMetrics, PatternMetrics,
    PatternMetricsReport, PatternSummary, RobustnessMetrics, SuccessMetrics,
};
pub use pattern::{AgentState, Message, Pattern, Role, ToolCall};
pub use reporting::{build_evaluation_report, write_evaluation_report_json, EvaluationReport};
pub use telemetry::{init_tracing, LogFormat};

/// Crate version, recorded alongside reports by embedding hosts.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

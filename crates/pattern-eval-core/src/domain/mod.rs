//! Domain models for the evaluation engine.
//!
//! Canonical definitions for the core entities:
//! - `TestTask`: Immutable task definition with its judge configuration
//! - `TaskSuite`: Ordered, filterable catalog of tasks
//! - `TaskResult`: Outcome of one task execution against one pattern

pub mod digest;
pub mod error;
pub mod result;
pub mod suite;
pub mod task;

pub use error::{EvalError, Result};
pub use result::{estimate_tokens, TaskResult, TaskResultSummary, TaskVariant};
pub use suite::{SuiteStats, TaskFilter, TaskSuite};
pub use task::{
    JudgeConfig, JudgeMode, RobustnessSpec, TaskCategory, TaskComplexity, TestTask, ToolPolicy,
};

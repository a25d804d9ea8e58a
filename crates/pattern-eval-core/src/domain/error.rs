//! Domain-level error taxonomy for the evaluation engine.
//!
//! Judging and task execution never surface these: a wrong answer or a failing
//! agent is recorded as data. `EvalError` covers the setup around a run
//! (loading suites, reading configuration, serialising reports).

/// Evaluation engine errors.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("invalid task suite: {0}")]
    InvalidSuite(String),

    #[error("duplicate task id in suite: {0}")]
    DuplicateTaskId(String),

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("invalid configuration: {key}={value}: {reason}")]
    Config {
        key: String,
        value: String,
        reason: String,
    },

    #[error("non-canonical value in digest input: {0}")]
    Digest(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for evaluation engine operations.
pub type Result<T> = std::result::Result<T, EvalError>;

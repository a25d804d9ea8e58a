//! Evaluator configuration.
//!
//! Loaded once (defaults or environment) and handed to the evaluator.

use std::time::Duration;

use crate::domain::error::{EvalError, Result};

pub const DELAY_ENV: &str = "PATTERN_EVAL_DELAY_SECS";
pub const ROBUSTNESS_ENV: &str = "PATTERN_EVAL_ROBUSTNESS";

const DEFAULT_DELAY_SECS: f64 = 2.0;

/// How the evaluator paces and scopes a run.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatorConfig {
    /// Pause after each task except the last in a pass.
    pub delay_between_tasks: Duration,
    /// Run the perturbed-prompt pass.
    pub include_robustness: bool,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            delay_between_tasks: Duration::from_secs_f64(DEFAULT_DELAY_SECS),
            include_robustness: true,
        }
    }
}

impl EvaluatorConfig {
    /// Read `PATTERN_EVAL_DELAY_SECS` and `PATTERN_EVAL_ROBUSTNESS`; unset
    /// variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`EvaluatorConfig::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(DELAY_ENV) {
            config.delay_between_tasks = parse_delay(&raw)?;
        }
        if let Some(raw) = lookup(ROBUSTNESS_ENV) {
            config.include_robustness = parse_flag(ROBUSTNESS_ENV, &raw)?;
        }

        Ok(config)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay_between_tasks = delay;
        self
    }

    pub fn with_robustness(mut self, include: bool) -> Self {
        self.include_robustness = include;
        self
    }
}

fn config_error(key: &str, value: &str, reason: impl Into<String>) -> EvalError {
    EvalError::Config {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn parse_delay(raw: &str) -> Result<Duration> {
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|_| config_error(DELAY_ENV, raw, "expected seconds as a number"))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(config_error(DELAY_ENV, raw, "must be a non-negative number"));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| config_error(DELAY_ENV, raw, e.to_string()))
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(config_error(key, raw, "expected true/false/1/0/yes/no")),
    }
}

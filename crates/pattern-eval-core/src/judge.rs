//! Output judging.
//!
//! [`Judge::evaluate`] turns a free-text agent output into a [`JudgeVerdict`]
//! under one of three modes (exact, JSON, regex). It is a pure function: it
//! never panics on bad input, never errors, and every failing path carries a
//! human-readable reason.
//!
//! Strict judging compares the raw output. Lenient judging first pulls the
//! likely answer out of verbose prose ([`extract_answer`]) so the gap between
//! the two measures how well an agent follows output-format instructions.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::task::JudgeConfig;

/// Lead-in phrases stripped before taking the first token of a short answer.
const LEAD_IN_PHRASES: [&str; 4] = ["The answer is", "It is", "The result is", "This is"];

const TRAILING_PUNCTUATION: &[char] = &['.', ',', '!', '?', ':', ';'];

/// Longest (exclusive) ground truth treated as a single-token answer.
const SHORT_ANSWER_CHARS: usize = 30;

const PREVIEW_CHARS: usize = 100;

fn static_regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("built-in judge regex must compile"))
}

fn numeric_answer() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    static_regex(&RE, r"^\d+(\.\d+)?$")
}

fn number_in_text() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    static_regex(&RE, r"\b(\d+(?:\.\d+)?)\b")
}

fn result_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    static_regex(&RE, r"(?i)=|\bis\b")
}

fn iso_date_answer() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    static_regex(&RE, r"^\d{4}-\d{2}-\d{2}$")
}

fn iso_date_in_text() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    static_regex(&RE, r"\b(\d{4}-\d{2}-\d{2})\b")
}

fn fenced_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    static_regex(&RE, r"(?s)```(?:json)?\s*\n?(.*?)\n?```")
}

fn embedded_json() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    static_regex(&RE, r"(?s)(\{.*\}|\[.*\])")
}

/// The outcome of judging one output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeVerdict {
    pub passed: bool,
    /// Why the output passed or failed.
    pub message: String,
}

impl JudgeVerdict {
    fn pass(message: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: message.into(),
        }
    }
}

/// Stateless output judge.
pub struct Judge;

impl Judge {
    /// Judge `output` against the task's expectation.
    ///
    /// With `lenient`, exact-mode outputs go through [`extract_answer`] first
    /// and JSON and regex modes judge the trimmed output.
    pub fn evaluate(
        output: &str,
        ground_truth: Option<&Value>,
        config: &JudgeConfig,
        schema: Option<&Value>,
        lenient: bool,
    ) -> JudgeVerdict {
        match config {
            JudgeConfig::Exact => {
                if lenient {
                    judge_exact(&extract_answer(output, ground_truth), ground_truth)
                } else {
                    judge_exact(output, ground_truth)
                }
            }
            JudgeConfig::Json { ignore_fields } => {
                let output = if lenient { output.trim() } else { output };
                judge_json(output, ground_truth, ignore_fields, schema)
            }
            JudgeConfig::Regex { pattern } => {
                let output = if lenient { output.trim() } else { output };
                judge_regex(output, pattern.as_deref())
            }
        }
    }
}

/// Text form of a ground truth: strings verbatim, anything else as compact JSON.
fn ground_truth_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

// ---------------------------------------------------------------------------
// Lenient answer extraction
// ---------------------------------------------------------------------------

/// Pull the likely answer out of verbose output, guided by the shape of the
/// ground truth.
///
/// - numeric truth: a standalone number, preferring the first one after the
///   first result marker (`=` or the word "is") that is followed by one
/// - ISO date truth: the first `YYYY-MM-DD` substring
/// - short single-token truth: the first word after known lead-in phrases,
///   without trailing punctuation
///
/// Anything else, or no match, yields the trimmed output unchanged.
pub fn extract_answer(output: &str, ground_truth: Option<&Value>) -> String {
    let output = output.trim();
    let Some(truth) = ground_truth.map(ground_truth_text) else {
        return output.to_string();
    };
    let truth = truth.trim();

    let extracted = if numeric_answer().is_match(truth) {
        extract_number(output).map(str::to_string)
    } else if iso_date_answer().is_match(truth) {
        iso_date_in_text()
            .captures(output)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    } else if !truth.contains(' ') && truth.chars().count() < SHORT_ANSWER_CHARS {
        first_token(output)
    } else {
        None
    };

    extracted.unwrap_or_else(|| output.to_string())
}

fn extract_number(text: &str) -> Option<&str> {
    let first_number = |haystack: &'_ str| -> Option<(usize, usize)> {
        number_in_text()
            .captures(haystack)
            .and_then(|c| c.get(1))
            .map(|m| (m.start(), m.end()))
    };

    for marker in result_marker().find_iter(text) {
        let tail = &text[marker.end()..];
        if let Some((start, end)) = first_number(tail) {
            return Some(&tail[start..end]);
        }
    }
    first_number(text).map(|(start, end)| &text[start..end])
}

fn first_token(text: &str) -> Option<String> {
    let mut cleaned = text;
    for phrase in LEAD_IN_PHRASES {
        let starts_with_phrase = cleaned
            .get(..phrase.len())
            .map_or(false, |head| head.eq_ignore_ascii_case(phrase));
        if starts_with_phrase {
            cleaned = cleaned[phrase.len()..].trim();
        }
    }

    cleaned
        .split_whitespace()
        .next()
        .map(|word| word.trim_end_matches(TRAILING_PUNCTUATION).to_string())
}

// ---------------------------------------------------------------------------
// Exact mode
// ---------------------------------------------------------------------------

fn judge_exact(output: &str, ground_truth: Option<&Value>) -> JudgeVerdict {
    let Some(truth) = ground_truth else {
        return JudgeVerdict::fail("No ground truth configured for exact match");
    };
    let expected = ground_truth_text(truth);
    let expected = expected.trim();
    let got = output.trim();

    if got == expected {
        JudgeVerdict::pass(format!("Exact match: '{got}'"))
    } else {
        JudgeVerdict::fail(format!("Mismatch: got '{got}', expected '{expected}'"))
    }
}

// ---------------------------------------------------------------------------
// JSON mode
// ---------------------------------------------------------------------------

/// Why no JSON value could be pulled out of an output.
#[derive(Debug, thiserror::Error)]
pub enum JsonExtractError {
    #[error("invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("no fenced code block found")]
    NoFencedBlock,

    #[error("could not extract valid JSON from: {preview}...")]
    NotFound { preview: String },
}

type JsonStrategy = fn(&str) -> Result<Value, JsonExtractError>;

/// Tried in order; the first success wins.
const JSON_STRATEGIES: [(&str, JsonStrategy); 3] = [
    ("raw", parse_raw),
    ("fenced_block", parse_fenced_block),
    ("embedded", parse_embedded),
];

fn parse_raw(text: &str) -> Result<Value, JsonExtractError> {
    Ok(serde_json::from_str(text)?)
}

fn parse_fenced_block(text: &str) -> Result<Value, JsonExtractError> {
    let body = fenced_block()
        .captures(text)
        .and_then(|c| c.get(1))
        .ok_or(JsonExtractError::NoFencedBlock)?;
    Ok(serde_json::from_str(body.as_str().trim())?)
}

fn parse_embedded(text: &str) -> Result<Value, JsonExtractError> {
    let candidate = embedded_json()
        .captures(text)
        .and_then(|c| c.get(1))
        .ok_or_else(|| JsonExtractError::NotFound {
            preview: preview(text),
        })?;
    Ok(serde_json::from_str(candidate.as_str())?)
}

/// Parse JSON from raw text, a fenced code block, or the first `{...}` /
/// `[...]` span, in that order. Returns the last strategy's error when all
/// of them fail.
pub fn extract_json(text: &str) -> Result<Value, JsonExtractError> {
    let text = text.trim();
    let mut last_err = JsonExtractError::NotFound {
        preview: preview(text),
    };
    for (name, strategy) in JSON_STRATEGIES {
        match strategy(text) {
            Ok(value) => {
                tracing::trace!(strategy = name, "json extracted");
                return Ok(value);
            }
            Err(e) => last_err = e,
        }
    }
    Err(last_err)
}

fn validate_schema(instance: &Value, schema: &Value) -> Result<(), String> {
    let validator =
        jsonschema::validator_for(schema).map_err(|e| format!("invalid schema: {e}"))?;
    let first = validator.iter_errors(instance).next().map(|e| e.to_string());
    match first {
        Some(reason) => Err(reason),
        None => Ok(()),
    }
}

/// Structural equality where numbers compare by value (`999 == 999.0`).
fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if x.is_f64() || y.is_f64() {
                x.as_f64() == y.as_f64()
            } else {
                x == y
            }
        }
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| json_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).map_or(false, |y| json_equal(x, y)))
        }
        _ => a == b,
    }
}

fn without_fields(map: &serde_json::Map<String, Value>, ignore: &[String]) -> Value {
    Value::Object(
        map.iter()
            .filter(|(k, _)| !ignore.contains(*k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    )
}

fn judge_json(
    output: &str,
    ground_truth: Option<&Value>,
    ignore_fields: &[String],
    schema: Option<&Value>,
) -> JudgeVerdict {
    let parsed = match extract_json(output) {
        Ok(value) => value,
        Err(e) => return JudgeVerdict::fail(format!("JSON parse error: {e}")),
    };

    if let Some(schema) = schema {
        if let Err(reason) = validate_schema(&parsed, schema) {
            return JudgeVerdict::fail(format!("Schema validation failed: {reason}"));
        }
    }

    let Some(truth) = ground_truth else {
        return JudgeVerdict::pass(format!(
            "JSON valid (no ground truth to compare): {parsed}"
        ));
    };

    match (&parsed, truth) {
        (Value::Object(got), Value::Object(want)) => {
            let got = without_fields(got, ignore_fields);
            let want = without_fields(want, ignore_fields);
            if json_equal(&got, &want) {
                JudgeVerdict::pass(format!("JSON match (ignoring {ignore_fields:?}): {got}"))
            } else {
                JudgeVerdict::fail(format!("JSON mismatch: got {got}, expected {want}"))
            }
        }
        _ => {
            if json_equal(&parsed, truth) {
                JudgeVerdict::pass(format!("JSON exact match: {parsed}"))
            } else {
                JudgeVerdict::fail(format!("JSON mismatch: got {parsed}, expected {truth}"))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Regex mode
// ---------------------------------------------------------------------------

fn judge_regex(output: &str, pattern: Option<&str>) -> JudgeVerdict {
    let Some(pattern) = pattern.filter(|p| !p.is_empty()) else {
        return JudgeVerdict::fail("No regex pattern provided");
    };

    // `$` may also match before one final newline.
    let matches = |re: &Regex| {
        re.is_match(output) || output.strip_suffix('\n').map_or(false, |s| re.is_match(s))
    };

    match Regex::new(pattern) {
        Ok(re) if matches(&re) => {
            JudgeVerdict::pass(format!("Regex match: pattern '{pattern}' found in output"))
        }
        Ok(_) => JudgeVerdict::fail(format!(
            "Regex mismatch: pattern '{pattern}' not found in '{output}'"
        )),
        Err(e) => JudgeVerdict::fail(format!("Regex error: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn product_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "price": {"type": "number"}
            },
            "required": ["name", "price"]
        })
    }

    #[test]
    fn exact_match_passes() {
        let v = Judge::evaluate("408", Some(&json!("408")), &JudgeConfig::Exact, None, false);
        assert!(v.passed, "{}", v.message);
        assert!(v.message.contains("Exact match"));
    }

    #[test]
    fn exact_is_case_sensitive_but_trims() {
        let truth = json!("Paris");
        assert!(!Judge::evaluate("paris", Some(&truth), &JudgeConfig::Exact, None, false).passed);
        assert!(Judge::evaluate("  Paris\n", Some(&truth), &JudgeConfig::Exact, None, false).passed);
    }

    #[test]
    fn exact_without_ground_truth_fails_gracefully() {
        let v = Judge::evaluate("anything", None, &JudgeConfig::Exact, None, false);
        assert!(!v.passed);
        assert!(v.message.contains("No ground truth"));
    }

    #[test]
    fn lenient_extracts_number_after_equals() {
        let truth = json!("408");
        let strict = Judge::evaluate("17*24=408", Some(&truth), &JudgeConfig::Exact, None, false);
        assert!(!strict.passed);

        let lenient = Judge::evaluate("17*24=408", Some(&truth), &JudgeConfig::Exact, None, true);
        assert!(lenient.passed, "{}", lenient.message);
    }

    #[test]
    fn extract_answer_number_cases() {
        let truth = json!("20");
        assert_eq!(
            extract_answer("The cost of 12 apples is $20.", Some(&truth)),
            "20"
        );
        assert_eq!(extract_answer("20 dollars", Some(&truth)), "20");
        assert_eq!(
            extract_answer("17 * 24 is 408. This is 2 more than 406", Some(&json!("408"))),
            "408"
        );
        assert_eq!(extract_answer("Total = 7 items; is that ok?", Some(&truth)), "7");
        assert_eq!(extract_answer("no digits here", Some(&truth)), "no digits here");
        assert_eq!(extract_answer("  3.50  ", Some(&json!(3.5))), "3.50");
    }

    #[test]
    fn extract_answer_numeric_ground_truth_value() {
        assert_eq!(extract_answer("Result: 408.", Some(&json!(408))), "408");
    }

    #[test]
    fn extract_answer_iso_date() {
        let truth = json!("2025-10-12");
        assert_eq!(
            extract_answer(
                "The date '12 October 2025' normalized to ISO is 2025-10-12",
                Some(&truth)
            ),
            "2025-10-12"
        );
    }

    #[test]
    fn extract_answer_short_token() {
        let truth = json!("Anna");
        assert_eq!(extract_answer("Anna is the shortest.", Some(&truth)), "Anna");
        assert_eq!(extract_answer("The answer is Yes.", Some(&json!("Yes"))), "Yes");
        assert_eq!(extract_answer("the result is Paris!", Some(&json!("Paris"))), "Paris");
        assert_eq!(extract_answer("It is Paris!", Some(&json!("Paris"))), "Paris");
    }

    #[test]
    fn extract_answer_long_truth_unchanged() {
        let truth = json!("Alexander Fleming");
        assert_eq!(
            extract_answer("  It was Alexander Fleming  ", Some(&truth)),
            "It was Alexander Fleming"
        );
        assert_eq!(extract_answer(" raw ", None), "raw");
    }

    #[test]
    fn json_matches_with_schema() {
        let v = Judge::evaluate(
            r#"{"name":"iPhone 15","price":999}"#,
            Some(&json!({"name": "iPhone 15", "price": 999})),
            &JudgeConfig::json(),
            Some(&product_schema()),
            false,
        );
        assert!(v.passed, "{}", v.message);
    }

    #[test]
    fn json_in_fenced_block_matches() {
        let output = "Here you go:\n```json\n{\"name\":\"iPhone 15\",\"price\":999}\n```\nDone.";
        let v = Judge::evaluate(
            output,
            Some(&json!({"name": "iPhone 15", "price": 999})),
            &JudgeConfig::json(),
            Some(&product_schema()),
            false,
        );
        assert!(v.passed, "{}", v.message);
    }

    #[test]
    fn json_embedded_in_prose_matches() {
        let output = r#"The result is {"rate": 0.9, "eur": 90} as requested."#;
        let v = Judge::evaluate(
            output,
            Some(&json!({"rate": 0.90, "eur": 90.0})),
            &JudgeConfig::json(),
            None,
            false,
        );
        assert!(v.passed, "{}", v.message);
    }

    #[test]
    fn json_schema_violation_is_judged_failure() {
        let v = Judge::evaluate(
            r#"{"name":"iPhone 15","price":"999"}"#,
            None,
            &JudgeConfig::json(),
            Some(&product_schema()),
            false,
        );
        assert!(!v.passed);
        assert!(v.message.starts_with("Schema validation failed"));
    }

    #[test]
    fn json_invalid_schema_is_judged_failure() {
        let v = Judge::evaluate(
            r#"{"a":1}"#,
            None,
            &JudgeConfig::json(),
            Some(&json!({"type": 12})),
            false,
        );
        assert!(!v.passed);
    }

    #[test]
    fn json_malformed_output_fails() {
        let v = Judge::evaluate("{not json", None, &JudgeConfig::json(), None, false);
        assert!(!v.passed);
        assert!(v.message.starts_with("JSON parse error"));

        let v = Judge::evaluate("plain words", None, &JudgeConfig::json(), None, true);
        assert!(!v.passed);
        assert!(v.message.contains("could not extract valid JSON"));
    }

    #[test]
    fn json_ignore_fields_dropped_both_sides() {
        let cfg = JudgeConfig::Json {
            ignore_fields: vec!["path".to_string()],
        };
        let v = Judge::evaluate(
            r#"{"path_len": 8, "path": [[1,1],[1,2]]}"#,
            Some(&json!({"path_len": 8})),
            &cfg,
            None,
            false,
        );
        assert!(v.passed, "{}", v.message);
    }

    #[test]
    fn json_ignore_fields_against_non_object_truth() {
        let cfg = JudgeConfig::Json {
            ignore_fields: vec!["x".to_string()],
        };
        let v = Judge::evaluate("[1, 2]", Some(&json!([1, 2])), &cfg, None, false);
        assert!(v.passed, "{}", v.message);
    }

    #[test]
    fn json_value_mismatch_fails() {
        let v = Judge::evaluate(
            r#"{"temp": 27, "condition": "Sunny"}"#,
            Some(&json!({"temp": 28, "condition": "Sunny"})),
            &JudgeConfig::json(),
            None,
            false,
        );
        assert!(!v.passed);
        assert!(v.message.starts_with("JSON mismatch"));
    }

    #[test]
    fn json_without_ground_truth_only_checks_structure() {
        let v = Judge::evaluate("[]", None, &JudgeConfig::json(), None, false);
        assert!(v.passed);
    }

    #[test]
    fn regex_anchored_pattern() {
        let cfg = JudgeConfig::regex("(?i)^paris$");
        assert!(Judge::evaluate("PARIS", None, &cfg, None, false).passed);
        assert!(Judge::evaluate("Paris", None, &cfg, None, false).passed);
        assert!(!Judge::evaluate("paris city", None, &cfg, None, false).passed);
    }

    #[test]
    fn regex_end_anchor_allows_one_trailing_newline() {
        let cfg = JudgeConfig::regex("(?i)^paris$");
        assert!(Judge::evaluate("Paris\n", None, &cfg, None, false).passed);
        assert!(Judge::evaluate("Paris\n", None, &cfg, None, true).passed);
        assert!(!Judge::evaluate("Paris\n\n", None, &cfg, None, false).passed);
    }

    #[test]
    fn lenient_regex_ignores_surrounding_whitespace() {
        let cfg = JudgeConfig::regex("(?i)^paris$");
        assert!(!Judge::evaluate("  Paris  ", None, &cfg, None, false).passed);
        assert!(Judge::evaluate("  Paris  ", None, &cfg, None, true).passed);
    }

    #[test]
    fn regex_missing_pattern_fails() {
        let v = Judge::evaluate("x", None, &JudgeConfig::Regex { pattern: None }, None, false);
        assert!(!v.passed);
        assert_eq!(v.message, "No regex pattern provided");
    }

    #[test]
    fn regex_invalid_pattern_fails() {
        let v = Judge::evaluate("x", None, &JudgeConfig::regex("(unclosed"), None, false);
        assert!(!v.passed);
        assert!(v.message.starts_with("Regex error:"));
    }

    #[test]
    fn evaluate_is_idempotent() {
        let truth = json!("408");
        let a = Judge::evaluate("It is 408.", Some(&truth), &JudgeConfig::Exact, None, true);
        let b = Judge::evaluate("It is 408.", Some(&truth), &JudgeConfig::Exact, None, true);
        assert_eq!(a, b);
    }

    #[test]
    fn json_equal_compares_numbers_by_value() {
        assert!(json_equal(&json!({"p": 999}), &json!({"p": 999.0})));
        assert!(!json_equal(&json!({"p": 999}), &json!({"p": 998})));
        assert!(!json_equal(&json!({"p": 1}), &json!({"p": 1, "q": 2})));
    }

    #[test]
    fn extract_json_reports_last_error() {
        let err = extract_json("nothing to see").unwrap_err();
        assert!(matches!(err, JsonExtractError::NotFound { .. }));

        let err = extract_json("prefix {broken: } suffix").unwrap_err();
        assert!(matches!(err, JsonExtractError::Parse(_)));
    }
}

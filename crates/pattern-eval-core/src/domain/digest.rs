//! Canonical JSON and SHA-256 digests for task suites.
//!
//! Object keys are sorted recursively and integer-valued floats are written as
//! integers, so two suites that differ only in key order or `90` vs `90.0`
//! hash the same.

use sha2::{Digest, Sha256};

use crate::domain::error::{EvalError, Result};

fn canonicalize(value: &serde_json::Value) -> Result<serde_json::Value> {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = serde_json::Map::new();
            for key in keys {
                if let Some(v) = map.get(key) {
                    sorted.insert(key.clone(), canonicalize(v)?);
                }
            }
            Ok(serde_json::Value::Object(sorted))
        }
        serde_json::Value::Array(arr) => Ok(serde_json::Value::Array(
            arr.iter().map(canonicalize).collect::<Result<Vec<_>>>()?,
        )),
        serde_json::Value::Number(n) if !(n.is_i64() || n.is_u64()) => match n.as_f64() {
            Some(f) if !f.is_finite() => Err(EvalError::Digest(
                "NaN/Infinity not permitted in canonical JSON".to_string(),
            )),
            Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
                Ok(serde_json::Value::Number(serde_json::Number::from(f as i64)))
            }
            _ => Ok(value.clone()),
        },
        other => Ok(other.clone()),
    }
}

/// Compact canonical JSON text for `value`.
pub fn canonical_json(value: &serde_json::Value) -> Result<String> {
    Ok(serde_json::to_string(&canonicalize(value)?)?)
}

/// SHA-256 hex digest of the canonical JSON of `value`.
pub fn compute_digest(value: &serde_json::Value) -> Result<String> {
    let canonical = canonical_json(value)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_json_integer_float() {
        let canonical = canonical_json(&json!({"eur": 90.0, "rate": 0.9})).expect("canonical");
        assert_eq!(canonical, r#"{"eur":90,"rate":0.9}"#);
    }

    #[test]
    fn test_digest_ignores_key_order() {
        let a = compute_digest(&json!({"b": 1, "a": [1, {"y": 2, "x": 3}]})).expect("digest");
        let b = compute_digest(&json!({"a": [1, {"x": 3, "y": 2}], "b": 1})).expect("digest");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_digest_changes_with_content() {
        let a = compute_digest(&json!({"prompt": "Compute 17 * 24."})).expect("digest");
        let b = compute_digest(&json!({"prompt": "Compute 17 * 25."})).expect("digest");
        assert_ne!(a, b);
    }
}

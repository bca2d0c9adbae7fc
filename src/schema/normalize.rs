//! Key normalization.
//!
//! Input documents may spell an attribute key either as `name` or in symbol
//! style as `":name"`. Both spellings map to the same canonical key; supplying
//! both in one object is an error.

use super::primitives::child_path;
use crate::error::{ValidationError, ValidationResult};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Canonical spelling of a single key.
pub fn canonical_key(key: &str, accept_symbol_keys: bool) -> &str {
    match key.strip_prefix(':') {
        Some(stripped) if accept_symbol_keys && !stripped.is_empty() => stripped,
        _ => key,
    }
}

/// Rewrite the top-level keys of one object to their canonical spelling.
///
/// Nested objects are left alone; they are normalized when their own schema
/// parses them.
pub(crate) fn normalize_keys(
    path: &str,
    input: &Map<String, Value>,
    accept_symbol_keys: bool,
) -> ValidationResult<Map<String, Value>> {
    let mut normalized = Map::new();
    let mut spellings: HashMap<&str, &str> = HashMap::new();

    for (key, value) in input {
        let canonical = canonical_key(key, accept_symbol_keys);
        if let Some(first) = spellings.insert(canonical, key.as_str()) {
            return Err(ValidationError::DuplicateKey {
                attribute: child_path(path, canonical),
                first: first.to_string(),
                second: key.clone(),
            });
        }
        normalized.insert(canonical.to_string(), value.clone());
    }

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_canonical_key() {
        assert_eq!(canonical_key(":name", true), "name");
        assert_eq!(canonical_key("name", true), "name");
        assert_eq!(canonical_key(":name", false), ":name");
        assert_eq!(canonical_key(":", true), ":");
    }

    #[test]
    fn test_symbol_keys_normalized() {
        let input = as_map(json!({":name": "stream", "shard_count": 2}));
        let normalized = normalize_keys("", &input, true).unwrap();
        assert_eq!(normalized.get("name"), Some(&json!("stream")));
        assert_eq!(normalized.get("shard_count"), Some(&json!(2)));
        assert!(!normalized.contains_key(":name"));
    }

    #[test]
    fn test_both_spellings_rejected() {
        let input = as_map(json!({":name": "a", "name": "b"}));
        match normalize_keys("block", &input, true) {
            Err(ValidationError::DuplicateKey { attribute, .. }) => {
                assert_eq!(attribute, "block.name")
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_symbol_keys_kept_when_disabled() {
        let input = as_map(json!({":name": "a", "name": "b"}));
        let normalized = normalize_keys("", &input, false).unwrap();
        assert_eq!(normalized.len(), 2);
    }
}

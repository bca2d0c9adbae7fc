//! JSON policy and pattern documents.

use crate::error::{ValidationError, ValidationResult};
use serde_json::{Map, Value};

/// A JSON object supplied either inline or as an encoded string.
///
/// ```rust
/// use cloud_resource_schemas::resource::value_objects::JsonDocument;
/// use serde_json::json;
///
/// let inline = JsonDocument::parse("event_pattern", &json!({"source": ["aws.ec2"]})).unwrap();
/// let encoded = JsonDocument::parse("event_pattern", &json!(r#"{"source":["aws.ec2"]}"#)).unwrap();
/// assert_eq!(inline, encoded);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct JsonDocument(Map<String, Value>);

impl JsonDocument {
    /// Parse an object or a string holding one, reporting failures against
    /// `attribute`.
    pub fn parse(attribute: &str, value: &Value) -> ValidationResult<Self> {
        let decoded;
        let value = match value {
            Value::String(encoded) => {
                decoded = serde_json::from_str::<Value>(encoded).map_err(|err| {
                    ValidationError::invalid_format(attribute, format!("not valid JSON: {err}"))
                })?;
                &decoded
            }
            other => other,
        };
        match value {
            Value::Object(map) => Ok(Self(map.clone())),
            _ => Err(ValidationError::invalid_format(
                attribute,
                "must be a JSON object",
            )),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Strings under `key`, whether given as one string or a list.
    pub fn strings(&self, key: &str) -> Vec<&str> {
        match self.0.get(key) {
            Some(Value::String(value)) => vec![value.as_str()],
            Some(Value::Array(values)) => values.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Size of the compact encoding in bytes.
    pub fn encoded_len(&self) -> usize {
        Value::Object(self.0.clone()).to_string().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rejects_non_objects() {
        for value in [json!([1, 2]), json!("[1]"), json!("{not json"), json!(3)] {
            assert!(matches!(
                JsonDocument::parse("policy", &value),
                Err(ValidationError::InvalidFormat { .. })
            ));
        }
    }

    #[test]
    fn test_strings() {
        let document = JsonDocument::parse(
            "event_pattern",
            &json!({"source": "aws.s3", "detail-type": ["A", "B", 3]}),
        )
        .unwrap();
        assert_eq!(document.strings("source"), vec!["aws.s3"]);
        assert_eq!(document.strings("detail-type"), vec!["A", "B"]);
        assert!(document.strings("missing").is_empty());
        assert_eq!(document.encoded_len(), r#"{"detail-type":["A","B",3],"source":"aws.s3"}"#.len());
    }
}

//! Resource tags.

use crate::error::{ValidationError, ValidationResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maximum number of tags on one resource
pub const MAX_TAGS: usize = 50;
/// Maximum tag key length in characters
pub const MAX_KEY_LENGTH: usize = 128;
/// Maximum tag value length in characters
pub const MAX_VALUE_LENGTH: usize = 256;

/// Key/value tags attached to a resource.
///
/// Deserialization accepts any string map so that [`check`](Self::check) can
/// report violations as ordinary validation errors naming the offending key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(BTreeMap<String, String>);

impl Tags {
    pub fn new(tags: BTreeMap<String, String>) -> Self {
        Self(tags)
    }

    /// Check count, key and value lengths and the reserved `aws:` prefix.
    pub fn check(&self, attribute: &str) -> ValidationResult<()> {
        if self.0.len() > MAX_TAGS {
            return Err(ValidationError::TooManyElements {
                attribute: attribute.to_string(),
                count: self.0.len(),
                max: MAX_TAGS,
            });
        }

        for (key, value) in &self.0 {
            let path = format!("{attribute}.{key}");
            let key_length = key.chars().count();
            if key_length == 0 || key_length > MAX_KEY_LENGTH {
                return Err(ValidationError::invalid_format(
                    path,
                    format!("tag keys must be 1 to {MAX_KEY_LENGTH} characters"),
                ));
            }
            if key.to_ascii_lowercase().starts_with("aws:") {
                return Err(ValidationError::invalid_format(
                    path,
                    "tag keys may not use the reserved 'aws:' prefix",
                ));
            }
            let value_length = value.chars().count();
            if value_length > MAX_VALUE_LENGTH {
                return Err(ValidationError::StringTooLong {
                    attribute: path,
                    length: value_length,
                    max: MAX_VALUE_LENGTH,
                });
            }
        }

        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }
}

/// Check an optional tag map.
pub fn check_tags(tags: Option<&Tags>) -> ValidationResult<()> {
    tags.map_or(Ok(()), |tags| tags.check("tags"))
}

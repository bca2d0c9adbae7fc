//! Structural parsing of raw attribute documents.
//!
//! Parsing one object runs in a fixed order: keys are normalized, every
//! declared field is resolved (input value, else default, else missing) and
//! checked in declaration order, and finally unknown keys are rejected or
//! dropped. The first violation found is returned.

use super::normalize::normalize_keys;
use super::primitives::{check_value, child_path, value_type_name};
use super::types::{Schema, UnknownKeys};
use crate::config::{BuildContext, UnknownKeyPolicy};
use crate::error::{ValidationError, ValidationResult};
use log::trace;
use serde_json::{Map, Value};

/// Canonical attribute map produced by a successful structural parse.
///
/// Contains only declared fields, with defaults substituted and every value in
/// canonical form. Absent optional fields without a default are omitted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedAttributes(Map<String, Value>);

impl ParsedAttributes {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl Schema {
    /// Parse a raw attribute document with the default build context.
    pub fn parse(&self, raw: &Value) -> ValidationResult<ParsedAttributes> {
        self.parse_with(raw, &BuildContext::default())
    }

    /// Parse a raw attribute document.
    pub fn parse_with(
        &self,
        raw: &Value,
        context: &BuildContext,
    ) -> ValidationResult<ParsedAttributes> {
        self.parse_object("", raw, context).map(ParsedAttributes)
    }

    pub(crate) fn parse_object(
        &self,
        path: &str,
        raw: &Value,
        context: &BuildContext,
    ) -> ValidationResult<Map<String, Value>> {
        let object = raw.as_object().ok_or_else(|| {
            let attribute = if path.is_empty() { self.name() } else { path };
            ValidationError::invalid_type(attribute, "object", value_type_name(raw))
        })?;

        let input = normalize_keys(path, object, context.config().accept_symbol_keys)?;
        let mut output = Map::new();

        for field in self.fields() {
            let field_path = child_path(path, field.name());
            let supplied = input.get(field.name()).filter(|value| !value.is_null());

            let value = match (supplied, field.default_value()) {
                (Some(value), _) => value.clone(),
                (None, Some(default)) => {
                    let value = default.resolve(context.clock());
                    trace!("Applying default for '{}': {}", field_path, value);
                    value
                }
                (None, None) if field.is_required() => {
                    return Err(ValidationError::missing_required(field_path));
                }
                (None, None) => continue,
            };

            let checked = check_value(&field_path, field.attribute_type(), &value, context)?;
            output.insert(field.name().to_string(), checked);
        }

        if self.rejects_unknown_keys(context) {
            if let Some(key) = input.keys().find(|key| self.field(key).is_none()) {
                return Err(ValidationError::UnknownAttribute {
                    attribute: child_path(path, key),
                    schema: self.name().to_string(),
                });
            }
        } else {
            for key in input.keys().filter(|key| self.field(key).is_none()) {
                trace!("Ignoring unknown attribute '{}'", child_path(path, key));
            }
        }

        Ok(output)
    }

    fn rejects_unknown_keys(&self, context: &BuildContext) -> bool {
        match context.config().unknown_keys {
            UnknownKeyPolicy::Reject => true,
            UnknownKeyPolicy::Ignore => false,
            UnknownKeyPolicy::SchemaDefault => self.unknown_keys() == UnknownKeys::Reject,
        }
    }
}

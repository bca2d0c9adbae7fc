//! Primitive type checks.
//!
//! Each check takes the dotted path of the value being checked and returns the
//! canonical form of the value: floats are widened, string lists are
//! normalized to arrays and nested objects are parsed through their schema.

use super::types::{
    AttributeType, CollectionConstraints, FloatConstraints, IntegerConstraints, StringConstraints,
};
use crate::config::BuildContext;
use crate::error::{ValidationError, ValidationResult};
use serde_json::{Map, Value};

/// Path of a named member below `parent`.
pub(crate) fn child_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

/// Path of a collection element below `parent`.
pub(crate) fn index_path(parent: &str, index: usize) -> String {
    format!("{parent}[{index}]")
}

/// JSON type name of a value, for error messages.
pub(crate) fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "float",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Check a value against its attribute type and return its canonical form.
pub(crate) fn check_value(
    path: &str,
    attribute_type: &AttributeType,
    value: &Value,
    context: &BuildContext,
) -> ValidationResult<Value> {
    match attribute_type {
        AttributeType::String(constraints) => {
            let s = expect_string(path, value)?;
            check_string(path, s, constraints)?;
            Ok(value.clone())
        }
        AttributeType::Integer(constraints) => {
            let n = expect_integer(path, value)?;
            check_integer(path, n, constraints)?;
            Ok(Value::from(n))
        }
        AttributeType::Float(constraints) => {
            let n = expect_number(path, value)?;
            check_float(path, n, constraints)?;
            Ok(Value::from(n))
        }
        AttributeType::Boolean => match value {
            Value::Bool(_) => Ok(value.clone()),
            other => Err(ValidationError::invalid_type(
                path,
                "boolean",
                value_type_name(other),
            )),
        },
        AttributeType::StringList(string_constraints, collection_constraints) => {
            let elements = match value {
                Value::String(_) => vec![value.clone()],
                Value::Array(items) => items.clone(),
                other => {
                    return Err(ValidationError::invalid_type(
                        path,
                        attribute_type.type_name(),
                        value_type_name(other),
                    ));
                }
            };
            check_collection_size(path, elements.len(), collection_constraints)?;
            for (index, element) in elements.iter().enumerate() {
                let element_path = index_path(path, index);
                let s = expect_string(&element_path, element)?;
                check_string(&element_path, s, string_constraints)?;
            }
            Ok(Value::Array(elements))
        }
        AttributeType::Array(element_type, constraints) => {
            let items = value.as_array().ok_or_else(|| {
                ValidationError::invalid_type(path, "array", value_type_name(value))
            })?;
            check_collection_size(path, items.len(), constraints)?;
            let checked = items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    check_value(&index_path(path, index), element_type, item, context)
                })
                .collect::<ValidationResult<Vec<_>>>()?;
            Ok(Value::Array(checked))
        }
        AttributeType::Map(value_type, constraints) => {
            let entries = value.as_object().ok_or_else(|| {
                ValidationError::invalid_type(path, "object", value_type_name(value))
            })?;
            check_collection_size(path, entries.len(), constraints)?;
            let mut checked = Map::new();
            for (key, entry) in entries {
                let entry_path = child_path(path, key);
                checked.insert(
                    key.clone(),
                    check_value(&entry_path, value_type, entry, context)?,
                );
            }
            Ok(Value::Object(checked))
        }
        AttributeType::Object(schema) => schema
            .parse_object(path, value, context)
            .map(Value::Object),
        AttributeType::Json => Ok(value.clone()),
    }
}

/// Check a fixed default against its own field type.
pub(crate) fn check_default(
    name: &str,
    attribute_type: &AttributeType,
    value: &Value,
) -> ValidationResult<()> {
    check_value(name, attribute_type, value, &BuildContext::default()).map(|_| ())
}

fn expect_string<'a>(path: &str, value: &'a Value) -> ValidationResult<&'a str> {
    value
        .as_str()
        .ok_or_else(|| ValidationError::invalid_type(path, "string", value_type_name(value)))
}

fn expect_integer(path: &str, value: &Value) -> ValidationResult<i64> {
    match value {
        Value::Number(n) => n.as_i64().ok_or_else(|| {
            if n.is_u64() {
                ValidationError::AboveMaximum {
                    attribute: path.to_string(),
                    value: n.to_string(),
                    max: i64::MAX.to_string(),
                }
            } else {
                ValidationError::invalid_type(path, "integer", "float")
            }
        }),
        other => Err(ValidationError::invalid_type(
            path,
            "integer",
            value_type_name(other),
        )),
    }
}

fn expect_number(path: &str, value: &Value) -> ValidationResult<f64> {
    value
        .as_f64()
        .ok_or_else(|| ValidationError::invalid_type(path, "number", value_type_name(value)))
}

fn check_string(path: &str, value: &str, constraints: &StringConstraints) -> ValidationResult<()> {
    if !constraints.allowed.is_empty() && !constraints.allowed.iter().any(|a| a == value) {
        return Err(ValidationError::InvalidEnumValue {
            attribute: path.to_string(),
            value: value.to_string(),
            allowed: constraints.allowed.clone(),
        });
    }

    let length = value.chars().count();
    if let Some(min) = constraints.min_length {
        if length < min {
            return Err(ValidationError::StringTooShort {
                attribute: path.to_string(),
                length,
                min,
            });
        }
    }
    if let Some(max) = constraints.max_length {
        if length > max {
            return Err(ValidationError::StringTooLong {
                attribute: path.to_string(),
                length,
                max,
            });
        }
    }

    if let Some(pattern) = &constraints.pattern {
        if !pattern.is_match(value) {
            return Err(ValidationError::PatternMismatch {
                attribute: path.to_string(),
                value: value.to_string(),
                pattern: pattern.source().to_string(),
            });
        }
    }

    Ok(())
}

fn check_integer(path: &str, value: i64, constraints: &IntegerConstraints) -> ValidationResult<()> {
    if let Some(min) = constraints.min {
        if value < min {
            return Err(ValidationError::BelowMinimum {
                attribute: path.to_string(),
                value: value.to_string(),
                min: min.to_string(),
            });
        }
    }
    if let Some(max) = constraints.max {
        if value > max {
            return Err(ValidationError::AboveMaximum {
                attribute: path.to_string(),
                value: value.to_string(),
                max: max.to_string(),
            });
        }
    }
    if !constraints.allowed.is_empty() && !constraints.allowed.contains(&value) {
        return Err(ValidationError::InvalidEnumValue {
            attribute: path.to_string(),
            value: value.to_string(),
            allowed: constraints.allowed.iter().map(i64::to_string).collect(),
        });
    }
    Ok(())
}

fn check_float(path: &str, value: f64, constraints: &FloatConstraints) -> ValidationResult<()> {
    if let Some(min) = constraints.min {
        if value < min {
            return Err(ValidationError::BelowMinimum {
                attribute: path.to_string(),
                value: value.to_string(),
                min: min.to_string(),
            });
        }
    }
    if let Some(max) = constraints.max {
        if value > max {
            return Err(ValidationError::AboveMaximum {
                attribute: path.to_string(),
                value: value.to_string(),
                max: max.to_string(),
            });
        }
    }
    Ok(())
}

fn check_collection_size(
    path: &str,
    count: usize,
    constraints: &CollectionConstraints,
) -> ValidationResult<()> {
    if let Some(min) = constraints.min_items {
        if count < min {
            return Err(ValidationError::TooFewElements {
                attribute: path.to_string(),
                count,
                min,
            });
        }
    }
    if let Some(max) = constraints.max_items {
        if count > max {
            return Err(ValidationError::TooManyElements {
                attribute: path.to_string(),
                count,
                max,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::Pattern;
    use serde_json::json;

    fn check(attribute_type: &AttributeType, value: Value) -> ValidationResult<Value> {
        check_value("field", attribute_type, &value, &BuildContext::default())
    }

    #[test]
    fn test_paths() {
        assert_eq!(child_path("", "name"), "name");
        assert_eq!(child_path("versioning", "enabled"), "versioning.enabled");
        assert_eq!(index_path("rules", 1), "rules[1]");
        assert_eq!(child_path(&index_path("rules", 1), "id"), "rules[1].id");
    }

    #[test]
    fn test_string_constraints() {
        let string_type = AttributeType::String(StringConstraints {
            pattern: Some(Pattern::new("[a-z-]+")),
            min_length: Some(3),
            max_length: Some(8),
            allowed: Vec::new(),
        });

        assert_eq!(check(&string_type, json!("abc")).unwrap(), json!("abc"));
        assert!(matches!(
            check(&string_type, json!("ab")),
            Err(ValidationError::StringTooShort { min: 3, .. })
        ));
        assert!(matches!(
            check(&string_type, json!("abcdefghi")),
            Err(ValidationError::StringTooLong { max: 8, .. })
        ));
        assert!(matches!(
            check(&string_type, json!("ABC")),
            Err(ValidationError::PatternMismatch { .. })
        ));
        assert!(matches!(
            check(&string_type, json!(42)),
            Err(ValidationError::InvalidAttributeType { .. })
        ));
    }

    #[test]
    fn test_enum_is_case_sensitive() {
        let enum_type = AttributeType::String(StringConstraints {
            allowed: vec!["KMS".to_string(), "NONE".to_string()],
            ..StringConstraints::default()
        });
        assert!(check(&enum_type, json!("KMS")).is_ok());
        assert!(matches!(
            check(&enum_type, json!("kms")),
            Err(ValidationError::InvalidEnumValue { .. })
        ));
    }

    #[test]
    fn test_integer_bounds_are_inclusive() {
        let integer_type = AttributeType::Integer(IntegerConstraints {
            min: Some(24),
            max: Some(8760),
            allowed: Vec::new(),
        });
        assert!(check(&integer_type, json!(24)).is_ok());
        assert!(check(&integer_type, json!(8760)).is_ok());
        assert!(matches!(
            check(&integer_type, json!(23)),
            Err(ValidationError::BelowMinimum { .. })
        ));
        assert!(matches!(
            check(&integer_type, json!(8761)),
            Err(ValidationError::AboveMaximum { .. })
        ));
        assert!(matches!(
            check(&integer_type, json!(24.5)),
            Err(ValidationError::InvalidAttributeType { .. })
        ));
        assert!(matches!(
            check(&integer_type, json!("24")),
            Err(ValidationError::InvalidAttributeType { .. })
        ));
    }

    #[test]
    fn test_float_accepts_integers() {
        let float_type = AttributeType::Float(FloatConstraints {
            min: Some(0.0),
            max: Some(100.0),
        });
        assert_eq!(check(&float_type, json!(2)).unwrap(), json!(2.0));
        assert!(check(&float_type, json!(99.5)).is_ok());
        assert!(check(&float_type, json!(-0.1)).is_err());
    }

    #[test]
    fn test_string_list_normalizes_single_string() {
        let list_type = AttributeType::StringList(
            StringConstraints::default(),
            CollectionConstraints::default(),
        );
        assert_eq!(check(&list_type, json!("a")).unwrap(), json!(["a"]));
        assert_eq!(check(&list_type, json!(["a", "b"])).unwrap(), json!(["a", "b"]));
        assert!(check(&list_type, json!(["a", 1])).is_err());
        assert!(check(&list_type, json!(1)).is_err());
    }

    #[test]
    fn test_array_element_errors_carry_index() {
        let array_type = AttributeType::Array(
            Box::new(AttributeType::integer()),
            CollectionConstraints {
                min_items: None,
                max_items: Some(3),
            },
        );
        match check(&array_type, json!([1, "two"])) {
            Err(ValidationError::InvalidAttributeType { attribute, .. }) => {
                assert_eq!(attribute, "field[1]")
            }
            other => panic!("unexpected result {:?}", other),
        }
        assert!(matches!(
            check(&array_type, json!([1, 2, 3, 4])),
            Err(ValidationError::TooManyElements { count: 4, max: 3, .. })
        ));
    }

    #[test]
    fn test_map_values_checked() {
        let map_type = AttributeType::Map(
            Box::new(AttributeType::string()),
            CollectionConstraints::default(),
        );
        assert!(check(&map_type, json!({"Team": "data"})).is_ok());
        match check(&map_type, json!({"Team": 1})) {
            Err(ValidationError::InvalidAttributeType { attribute, .. }) => {
                assert_eq!(attribute, "field.Team")
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_json_accepts_anything() {
        assert_eq!(
            check(&AttributeType::Json, json!({"Version": "2012-10-17"})).unwrap(),
            json!({"Version": "2012-10-17"})
        );
    }
}

//! Reusable cross-field rule shapes.
//!
//! Each helper checks one rule and returns the matching cross-field error.
//! Resource kinds chain them with `?` in their `validate` method so the first
//! violated rule wins.

use crate::error::{ValidationError, ValidationResult};
use std::collections::HashSet;

/// Exactly one of the named attributes must be present.
///
/// `fields` pairs each attribute name with whether it was supplied.
pub fn exactly_one_of(fields: &[(&str, bool)]) -> ValidationResult<()> {
    at_most_one_of(fields)?;
    if fields.iter().any(|(_, present)| *present) {
        Ok(())
    } else {
        Err(ValidationError::MissingAlternative {
            attributes: fields.iter().map(|(name, _)| name.to_string()).collect(),
        })
    }
}

/// At most one of the named attributes may be present.
pub fn at_most_one_of(fields: &[(&str, bool)]) -> ValidationResult<()> {
    let mut present = fields.iter().filter(|(_, present)| *present);
    match (present.next(), present.next()) {
        (Some((first, _)), Some((second, _))) => {
            Err(ValidationError::mutually_exclusive(*first, *second))
        }
        _ => Ok(()),
    }
}

/// `attribute` must be present when `condition` holds.
pub fn require_if(
    condition: bool,
    attribute: &str,
    present: bool,
    reason: &str,
) -> ValidationResult<()> {
    if condition && !present {
        Err(ValidationError::requires(attribute, reason))
    } else {
        Ok(())
    }
}

/// `attribute` must be absent when `condition` holds.
pub fn forbid_if(
    condition: bool,
    attribute: &str,
    present: bool,
    reason: &str,
) -> ValidationResult<()> {
    if condition && present {
        Err(ValidationError::forbidden(attribute, reason))
    } else {
        Ok(())
    }
}

/// `value` must be one of the members of `collection`.
pub fn must_reference<'a, I>(
    attribute: &str,
    value: &str,
    collection: &str,
    members: I,
) -> ValidationResult<()>
where
    I: IntoIterator<Item = &'a str>,
{
    if members.into_iter().any(|member| member == value) {
        Ok(())
    } else {
        Err(ValidationError::unknown_reference(attribute, value, collection))
    }
}

/// No two items may share the same key.
pub fn unique_by<'a, T, F>(attribute: &str, items: &'a [T], key: F) -> ValidationResult<()>
where
    F: Fn(&'a T) -> &'a str,
{
    let mut seen = HashSet::new();
    for item in items {
        let value = key(item);
        if !seen.insert(value) {
            return Err(ValidationError::duplicate(attribute, value));
        }
    }
    Ok(())
}

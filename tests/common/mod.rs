//! Common test utilities for resource validation testing.
//!
//! This module provides fixtures, assertion macros and small JSON helpers
//! shared by the validation and integration suites.

use serde_json::Value;
use std::sync::Once;

pub mod fixtures;

static LOGGING: Once = Once::new();

/// Route `log` output to the test harness once per process.
pub fn init_logging() {
    LOGGING.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Copy of `base` with the top-level keys of `changes` merged in.
pub fn with_changes(base: &Value, changes: Value) -> Value {
    let mut merged = base.clone();
    if let (Some(target), Value::Object(changes)) = (merged.as_object_mut(), changes) {
        target.extend(changes);
    }
    merged
}

/// Copy of `base` with one top-level key removed.
pub fn without(base: &Value, key: &str) -> Value {
    let mut trimmed = base.clone();
    if let Some(target) = trimmed.as_object_mut() {
        target.remove(key);
    }
    trimmed
}

/// Assert that a build failed with a structural validation error
#[macro_export]
macro_rules! assert_structural_error {
    ($result:expr) => {
        match &$result {
            Err(cloud_resource_schemas::ResourceError::Validation(err)) => assert!(
                err.is_structural(),
                "Expected structural error, got cross-field error {:?}",
                err
            ),
            Ok(_) => panic!("Expected structural error, but validation passed"),
            Err(other) => panic!("Expected structural error, got {:?}", other),
        }
    };
}

/// Assert that a build failed with a cross-field validation error
#[macro_export]
macro_rules! assert_cross_field_error {
    ($result:expr) => {
        match &$result {
            Err(cloud_resource_schemas::ResourceError::Validation(err)) => assert!(
                err.is_cross_field(),
                "Expected cross-field error, got {:?}",
                err
            ),
            Ok(_) => panic!("Expected cross-field error, but validation passed"),
            Err(other) => panic!("Expected cross-field error, got {:?}", other),
        }
    };
}

/// Custom assertion macro for specific error messages
#[macro_export]
macro_rules! assert_error_message_contains {
    ($result:expr, $substring:expr) => {
        match &$result {
            Err(err) => assert!(
                err.to_string().contains($substring),
                "Error message '{}' does not contain '{}'",
                err,
                $substring
            ),
            Ok(_) => panic!(
                "Expected error containing '{}', but validation passed",
                $substring
            ),
        }
    };
}

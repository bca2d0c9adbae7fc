//! Structural validation tests.
//!
//! Single-field failures: missing required attributes, wrong JSON types,
//! enumerations, lengths, ranges and unknown keys under strict and lax
//! schemas.

use crate::common::{fixtures, init_logging, with_changes};
use cloud_resource_schemas::resources::kinesis::KinesisStream;
use cloud_resource_schemas::resources::s3::S3Bucket;
use cloud_resource_schemas::{
    BuildContext, BuiltResource, ResourceAttributes, ResourceError, ResourceRegistry,
    UnknownKeyPolicy, ValidationConfig, ValidationError,
};
use serde_json::json;

fn validation_error(result: Result<impl std::fmt::Debug, ResourceError>) -> ValidationError {
    match result {
        Err(ResourceError::Validation(err)) => err,
        other => panic!("Expected validation error, got {:?}", other),
    }
}

#[test]
fn test_missing_required_attribute() {
    init_logging();
    let err = validation_error(KinesisStream::build(&json!({"shard_count": 2})));
    assert_eq!(err, ValidationError::missing_required("name"));
    assert!(err.is_structural());
}

#[test]
fn test_nested_missing_required_attribute_path() {
    let raw = json!({"name": "orders", "redrive_policy": {"max_receive_count": 3}});
    let err = validation_error(ResourceRegistry::with_defaults().validate_and_build("aws_sqs_queue", &raw));
    assert_eq!(
        err,
        ValidationError::missing_required("redrive_policy.dead_letter_target_arn")
    );
}

#[test]
fn test_invalid_type() {
    let err = validation_error(KinesisStream::build(&json!({"name": "s", "shard_count": "2"})));
    match err {
        ValidationError::InvalidAttributeType {
            attribute,
            expected,
            actual,
        } => {
            assert_eq!(attribute, "shard_count");
            assert_eq!(expected, "integer");
            assert_eq!(actual, "string");
        }
        other => panic!("Expected InvalidAttributeType, got {:?}", other),
    }

    let err = validation_error(KinesisStream::build(&json!({"name": "s", "shard_count": 1.5})));
    assert!(matches!(err, ValidationError::InvalidAttributeType { .. }));
}

#[test]
fn test_invalid_enum_value() {
    let raw = json!({"name": "s", "encryption_type": "AES"});
    match validation_error(KinesisStream::build(&raw)) {
        ValidationError::InvalidEnumValue {
            attribute,
            value,
            allowed,
        } => {
            assert_eq!(attribute, "encryption_type");
            assert_eq!(value, "AES");
            assert_eq!(allowed, vec!["NONE", "KMS"]);
        }
        other => panic!("Expected InvalidEnumValue, got {:?}", other),
    }
}

#[test]
fn test_range_violations() {
    let err = validation_error(KinesisStream::build(&json!({"name": "s", "retention_period": 12})));
    assert!(matches!(err, ValidationError::BelowMinimum { .. }));
    assert!(err.to_string().contains("retention_period"));

    let err = validation_error(KinesisStream::build(&json!({"name": "s", "retention_period": 9000})));
    assert!(matches!(err, ValidationError::AboveMaximum { .. }));
}

#[test]
fn test_pattern_and_length_violations() {
    let err = validation_error(KinesisStream::build(&json!({"name": "bad name"})));
    assert!(matches!(err, ValidationError::PatternMismatch { .. }));

    let err = validation_error(KinesisStream::build(&json!({"name": "x".repeat(129)})));
    assert!(matches!(err, ValidationError::StringTooLong { .. }));
}

#[test]
fn test_non_object_input() {
    let err = validation_error(KinesisStream::build(&json!(["clicks"])));
    assert!(matches!(err, ValidationError::InvalidAttributeType { .. }));
}

#[test]
fn test_strict_schema_rejects_unknown_keys() {
    let raw = with_changes(&fixtures::kinesis_stream(), json!({"colour": "red"}));
    match validation_error(KinesisStream::build(&raw)) {
        ValidationError::UnknownAttribute { attribute, schema } => {
            assert_eq!(attribute, "colour");
            assert_eq!(schema, "aws_kinesis_stream");
        }
        other => panic!("Expected UnknownAttribute, got {:?}", other),
    }
}

#[test]
fn test_lax_schema_drops_unknown_keys() {
    let raw = with_changes(&fixtures::s3_bucket(), json!({"website": {"index_document": "index.html"}}));
    let bucket = S3Bucket::build(&raw).unwrap();
    assert!(!bucket.to_canonical_map().contains_key("website"));
}

#[test]
fn test_unknown_key_policy_overrides_schema() {
    let reject = BuildContext::new().with_config(ValidationConfig {
        unknown_keys: UnknownKeyPolicy::Reject,
        ..ValidationConfig::default()
    });
    let raw = with_changes(&fixtures::s3_bucket(), json!({"website": {}}));
    assert!(matches!(
        S3Bucket::build_with(&raw, &reject),
        Err(ResourceError::Validation(ValidationError::UnknownAttribute { .. }))
    ));

    let ignore = BuildContext::new().with_config(ValidationConfig {
        unknown_keys: UnknownKeyPolicy::Ignore,
        ..ValidationConfig::default()
    });
    let raw = with_changes(&fixtures::kinesis_stream(), json!({"colour": "red"}));
    let stream = KinesisStream::build_with(&raw, &ignore).unwrap();
    assert!(!stream.to_canonical_map().contains_key("colour"));
}

#[test]
fn test_null_is_absent() {
    let stream = KinesisStream::build(&json!({"name": "s", "retention_period": null})).unwrap();
    assert_eq!(stream.retention_period, 24);

    let err = validation_error(KinesisStream::build(&json!({"name": null})));
    assert_eq!(err, ValidationError::missing_required("name"));
}

#[test]
fn test_reserved_tag_prefix() {
    let raw = with_changes(&fixtures::kinesis_stream(), json!({"tags": {"aws:owner": "me"}}));
    let err = validation_error(KinesisStream::build(&raw));
    assert!(matches!(err, ValidationError::InvalidFormat { .. }));
    assert!(err.to_string().contains("tags.aws:owner"));
}

#[test]
fn test_error_message_names_attribute() {
    let result = KinesisStream::build(&json!({"name": "s", "shard_count": 0}));
    assert_error_message_contains!(result, "shard_count");
    assert_structural_error!(result);
}

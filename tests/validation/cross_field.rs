//! Cross-field validation tests.
//!
//! Rules spanning several attributes run only after structural parsing
//! succeeded, and the first violated rule aborts the build.

use crate::common::{fixtures, with_changes, without};
use cloud_resource_schemas::resources::ec2::Vpc;
use cloud_resource_schemas::resources::kinesis::KinesisStream;
use cloud_resource_schemas::resources::sqs::SqsQueue;
use cloud_resource_schemas::{
    ErrorKind, ResourceAttributes, ResourceError, ResourceRegistry, ValidationError,
};
use serde_json::json;

#[test]
fn test_conditionally_required() {
    let raw = with_changes(&fixtures::kinesis_stream(), json!({"encryption_type": "KMS"}));
    match KinesisStream::build(&raw) {
        Err(ResourceError::Validation(ValidationError::ConditionallyRequired {
            attribute,
            condition,
        })) => {
            assert_eq!(attribute, "kms_key_id");
            assert_eq!(condition, "encryption_type is KMS");
        }
        other => panic!("Expected ConditionallyRequired, got {:?}", other),
    }
}

#[test]
fn test_conditionally_forbidden() {
    let raw = json!({
        "name": "clicks",
        "shard_count": 2,
        "stream_mode_details": {"stream_mode": "ON_DEMAND"}
    });
    let result = KinesisStream::build(&raw);
    assert_cross_field_error!(result);
    assert_error_message_contains!(result, "shard_count");
}

#[test]
fn test_mutually_exclusive() {
    let raw = json!({"name": "orders", "name_prefix": "orders-"});
    assert!(matches!(
        SqsQueue::build(&raw),
        Err(ResourceError::Validation(ValidationError::MutuallyExclusive { .. }))
    ));
}

#[test]
fn test_missing_alternative() {
    let result = Vpc::build(&json!({}));
    match result {
        Err(ResourceError::Validation(ValidationError::MissingAlternative { attributes })) => {
            assert!(attributes.contains(&"cidr_block".to_string()));
        }
        other => panic!("Expected MissingAlternative, got {:?}", other),
    }
}

#[test]
fn test_duplicate_value() {
    let raw = json!({
        "name": "shared",
        "replica": [{"region": "eu-west-1"}, {"region": "eu-west-1"}]
    });
    let result = ResourceRegistry::with_defaults().validate_and_build("aws_secretsmanager_secret", &raw);
    assert!(matches!(
        result,
        Err(ResourceError::Validation(ValidationError::DuplicateValue { .. }))
    ));
}

#[test]
fn test_unknown_reference() {
    let raw = json!({
        "name": "events",
        "database_name": "analytics",
        "partition_keys": [{"name": "dt", "type": "string"}],
        "partition_index": [{"index_name": "by_region", "keys": ["region"]}]
    });
    let result = ResourceRegistry::with_defaults().validate_and_build("aws_glue_catalog_table", &raw);
    match result {
        Err(ResourceError::Validation(ValidationError::UnknownReference {
            attribute,
            value,
            collection,
        })) => {
            assert_eq!(attribute, "partition_index[0].keys");
            assert_eq!(value, "region");
            assert_eq!(collection, "partition_keys");
        }
        other => panic!("Expected UnknownReference, got {:?}", other),
    }
}

#[test]
fn test_structural_errors_precede_cross_field_rules() {
    // Both the FIFO naming rule and the delay range are violated.
    let raw = json!({"name": "orders.fifo", "delay_seconds": 1000});
    let result = SqsQueue::build(&raw);
    assert_structural_error!(result);
}

#[test]
fn test_error_categories() {
    let registry = ResourceRegistry::with_defaults();
    let cases = [
        ("aws_sqs_queue", json!({"name": 7}), ErrorKind::Structural),
        (
            "aws_sqs_queue",
            json!({"name": "orders", "fifo_queue": true}),
            ErrorKind::CrossField,
        ),
        (
            "aws_kinesis_stream",
            json!({"name": "s", "shard_level_metrics": ["ALL", "IncomingBytes"]}),
            ErrorKind::CrossField,
        ),
    ];
    for (kind, raw, expected) in cases {
        let err = registry.validate_and_build(kind, &raw).unwrap_err();
        let validation = err.as_validation().expect("validation error");
        assert_eq!(validation.kind(), expected, "{kind} {raw}");
    }
}

#[test]
fn test_required_field_removed_from_fixture() {
    let registry = ResourceRegistry::with_defaults();
    let raw = without(&fixtures::lambda_function(), "role");
    let result = registry.validate_and_build("aws_lambda_function", &raw);
    assert_structural_error!(result);
    assert_error_message_contains!(result, "role");
}

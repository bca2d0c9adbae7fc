//! Key normalization and canonical output tests.

use crate::common::fixtures;
use cloud_resource_schemas::resources::kinesis::KinesisStream;
use cloud_resource_schemas::resources::s3::S3Bucket;
use cloud_resource_schemas::{
    BuildContext, BuiltResource, ResourceAttributes, ResourceError, ResourceRegistry,
    ValidationConfig, ValidationError,
};
use serde_json::{Value, json};

#[test]
fn test_symbol_keys_match_plain_keys() {
    let symbol = KinesisStream::build(&json!({":name": "clicks", ":shard_count": 2})).unwrap();
    let plain = KinesisStream::build(&json!({"name": "clicks", "shard_count": 2})).unwrap();
    assert_eq!(symbol, plain);
    assert_eq!(symbol.to_canonical_map(), plain.to_canonical_map());
}

#[test]
fn test_symbol_keys_in_nested_objects() {
    let bucket = S3Bucket::build(&json!({
        ":bucket": "my-logs",
        ":versioning": {":enabled": true}
    }))
    .unwrap();
    assert_eq!(
        bucket.to_canonical_map()["versioning"],
        json!({"enabled": true, "mfa_delete": false})
    );
}

#[test]
fn test_both_spellings_rejected() {
    let result = KinesisStream::build(&json!({":name": "a", "name": "b"}));
    match result {
        Err(ResourceError::Validation(ValidationError::DuplicateKey { attribute, .. })) => {
            assert_eq!(attribute, "name")
        }
        other => panic!("Expected DuplicateKey, got {:?}", other),
    }
}

#[test]
fn test_symbol_keys_can_be_disabled() {
    let context = BuildContext::new().with_config(ValidationConfig {
        accept_symbol_keys: false,
        ..ValidationConfig::default()
    });
    let result = KinesisStream::build_with(&json!({":name": "clicks"}), &context);
    assert!(matches!(
        result,
        Err(ResourceError::Validation(ValidationError::MissingRequiredAttribute { .. }))
    ));
}

#[test]
fn test_canonical_map_contains_no_nulls() {
    let registry = ResourceRegistry::with_defaults();
    for (kind, raw) in fixtures::valid_resources() {
        let built = registry.validate_and_build(kind, &raw).unwrap();
        let map = Value::Object(built.to_canonical_map());
        assert!(!contains_null(&map), "{kind} canonical map contains null: {map}");
    }
}

#[test]
fn test_canonical_map_has_defaults() {
    let stream = KinesisStream::build(&fixtures::kinesis_stream()).unwrap();
    let map = stream.to_canonical_map();
    assert_eq!(map["retention_period"], json!(24));
    assert_eq!(map["encryption_type"], json!("NONE"));
    assert_eq!(map["enforce_consumer_deletion"], json!(false));
    assert!(!map.contains_key("shard_count"));
    assert!(!map.contains_key("kms_key_id"));
}

#[test]
fn test_canonical_map_rebuilds_to_same_object() {
    let registry = ResourceRegistry::with_defaults();
    for (kind, raw) in fixtures::valid_resources() {
        let first = registry.validate_and_build(kind, &raw).unwrap();
        let canonical = Value::Object(first.to_canonical_map());
        let second = registry.validate_and_build(kind, &canonical).unwrap();
        assert_eq!(
            first.to_canonical_map(),
            second.to_canonical_map(),
            "{kind} is not stable under rebuild"
        );
    }
}

fn contains_null(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.iter().any(contains_null),
        Value::Object(map) => map.values().any(contains_null),
        _ => false,
    }
}

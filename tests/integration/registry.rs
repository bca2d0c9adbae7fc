//! Registry integration tests.

use crate::common::{fixtures, init_logging};
use cloud_resource_schemas::resources::sqs::SqsQueue;
use cloud_resource_schemas::{
    BuildContext, ResourceError, ResourceRegistry, UnknownKeyPolicy,
    ValidationConfig,
};
use serde_json::json;

#[test]
fn test_every_kind_has_a_fixture() {
    init_logging();
    let registry = ResourceRegistry::with_defaults();
    let fixture_kinds: Vec<&str> = fixtures::valid_resources()
        .into_iter()
        .map(|(kind, _)| kind)
        .collect();

    assert_eq!(registry.len(), 26);
    for kind in registry.kinds() {
        assert!(fixture_kinds.contains(&kind), "no fixture for {kind}");
    }
}

#[test]
fn test_built_resources_report_their_kind() {
    let registry = ResourceRegistry::with_defaults();
    for (kind, raw) in fixtures::valid_resources() {
        let built = registry.validate_and_build(kind, &raw).unwrap();
        assert_eq!(built.kind(), kind);

        let cloned = built.clone();
        assert_eq!(cloned.to_canonical_map(), built.to_canonical_map());
    }
}

#[test]
fn test_computed_properties_include_warnings() {
    let registry = ResourceRegistry::with_defaults();
    for (kind, raw) in fixtures::valid_resources() {
        let built = registry.validate_and_build(kind, &raw).unwrap();
        let properties = built.computed_properties();
        assert_eq!(
            properties.get("warnings"),
            Some(&json!(built.warnings())),
            "{kind} warnings mismatch"
        );
    }
}

#[test]
fn test_downcast_to_typed_attributes() {
    let registry = ResourceRegistry::with_defaults();
    let built = registry
        .validate_and_build("aws_sqs_queue", &fixtures::sqs_queue())
        .unwrap();
    let queue = built.downcast_ref::<SqsQueue>().expect("SqsQueue");
    assert_eq!(queue.name.as_deref(), Some("orders"));
    assert_eq!(queue.visibility_timeout_seconds, 30);
}

#[test]
fn test_unknown_kind() {
    let registry = ResourceRegistry::with_defaults();
    match registry.validate_and_build("aws_nothing", &json!({})) {
        Err(ResourceError::UnknownResourceKind { kind }) => assert_eq!(kind, "aws_nothing"),
        other => panic!("Expected UnknownResourceKind, got {:?}", other),
    }
    assert!(matches!(
        registry.schema("aws_nothing"),
        Err(ResourceError::UnknownResourceKind { .. })
    ));
}

#[test]
fn test_schema_lookup() {
    let registry = ResourceRegistry::with_defaults();
    let schema = registry.schema("aws_kinesis_stream").unwrap();
    assert_eq!(schema.name(), "aws_kinesis_stream");
    assert_eq!(schema.required_fields(), vec!["name"]);
}

#[test]
fn test_registry_context_applies_to_every_build() {
    let registry = ResourceRegistry::with_defaults().with_context(BuildContext::new().with_config(
        ValidationConfig {
            unknown_keys: UnknownKeyPolicy::Reject,
            ..ValidationConfig::default()
        },
    ));
    let raw = json!({"bucket": "my-logs", "website": {}});
    assert!(registry.validate_and_build("aws_s3_bucket", &raw).is_err());
    assert!(
        ResourceRegistry::with_defaults()
            .validate_and_build("aws_s3_bucket", &raw)
            .is_ok()
    );
}

#[test]
fn test_configuration_from_json() {
    let config = ValidationConfig::from_json(r#"{"unknown_keys": "ignore"}"#).unwrap();
    assert_eq!(config.unknown_keys, UnknownKeyPolicy::Ignore);
    assert!(config.accept_symbol_keys);

    assert!(ValidationConfig::from_json(r#"{"unknown_keys": "sometimes"}"#).is_err());
}

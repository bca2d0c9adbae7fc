//! Computed properties and advisory warnings, read through the registry.

use crate::common::{fixtures, init_logging, with_changes};
use cloud_resource_schemas::{ComputedProperties, ResourceRegistry};
use serde_json::{Value, json};

fn properties(kind: &str, raw: &Value) -> ComputedProperties {
    ResourceRegistry::with_defaults()
        .validate_and_build(kind, raw)
        .unwrap()
        .computed_properties()
}

fn warnings(kind: &str, raw: &Value) -> Vec<String> {
    ResourceRegistry::with_defaults()
        .validate_and_build(kind, raw)
        .unwrap()
        .warnings()
}

#[test]
fn test_kinesis_defaults() {
    init_logging();
    let props = properties("aws_kinesis_stream", &fixtures::kinesis_stream());
    assert_eq!(props.get_i64("retention_period_days"), Some(1));
    assert_eq!(props.get_bool("has_extended_retention"), Some(false));
    assert_eq!(props.get_bool("is_encrypted"), Some(false));
}

#[test]
fn test_sqs_unencrypted_queue() {
    let props = properties("aws_sqs_queue", &fixtures::sqs_queue());
    assert_eq!(props.get_str("encryption"), Some("none"));
    assert_eq!(props.get_bool("has_dead_letter_queue"), Some(false));
    assert_eq!(props.get("warnings").and_then(Value::as_array).map(Vec::len), Some(2));

    let encrypted = with_changes(
        &fixtures::sqs_queue(),
        json!({"kms_master_key_id": "alias/aws/sqs"}),
    );
    let props = properties("aws_sqs_queue", &encrypted);
    assert_eq!(props.get_str("encryption"), Some("sse-kms"));
    assert_eq!(
        warnings("aws_sqs_queue", &encrypted),
        vec!["Queue has no dead-letter queue"]
    );
}

#[test]
fn test_security_group_exposure() {
    let props = properties("aws_security_group", &fixtures::security_group());
    assert_eq!(props.get("exposed_ports"), Some(&json!(["443"])));
    assert_eq!(props.get_bool("is_open_to_world"), Some(true));
    assert_eq!(props.get_bool("allows_all_ingress"), Some(false));
    assert_eq!(props.get_i64("ingress_rule_count"), Some(1));
}

#[test]
fn test_vpc_addressing() {
    let props = properties("aws_vpc", &fixtures::vpc());
    assert_eq!(props.get_i64("prefix_length"), Some(16));
    assert_eq!(props.get_i64("total_ip_addresses"), Some(65_536));
    assert_eq!(props.get_i64("available_24_subnets"), Some(256));
    assert_eq!(props.get_bool("is_private_range"), Some(true));
}

#[test]
fn test_cost_estimates() {
    let cases = [
        ("aws_kms_key", fixtures::kms_key(), 2.0),
        ("aws_secretsmanager_secret", fixtures::secret(), 0.40),
        ("aws_ecs_task_definition", fixtures::ecs_task_definition(), 9.01),
        ("aws_dynamodb_table", fixtures::dynamodb_table(), 2.85),
        ("aws_elasticache_replication_group", fixtures::replication_group(), 150.38),
        ("aws_eks_cluster", fixtures::eks_cluster(), 73.0),
    ];
    for (kind, raw, expected) in cases {
        let props = properties(kind, &raw);
        assert_eq!(props.get_f64("estimated_monthly_cost"), Some(expected), "{kind}");
    }
}

#[test]
fn test_advisory_warnings() {
    assert_eq!(
        warnings("aws_secretsmanager_secret", &fixtures::secret()),
        vec!["Secret is never rotated"]
    );
    assert_eq!(
        warnings("aws_budgets_budget", &fixtures::budget()),
        vec!["Budget has no notifications"]
    );
    assert_eq!(warnings("aws_eks_cluster", &fixtures::eks_cluster()).len(), 3);
}

#[test]
fn test_warnings_do_not_block_the_build() {
    let raw = with_changes(
        &fixtures::security_group(),
        json!({"ingress": [
            {"from_port": 22, "to_port": 22, "protocol": "tcp", "cidr_blocks": ["0.0.0.0/0"]}
        ]}),
    );
    let built = ResourceRegistry::with_defaults()
        .validate_and_build("aws_security_group", &raw)
        .unwrap();
    assert!(!built.warnings().is_empty());
    assert_eq!(
        built.computed_properties().get("sensitive_ports_open_to_world"),
        Some(&json!([22]))
    );
}

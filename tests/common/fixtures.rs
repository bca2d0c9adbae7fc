//! Valid attribute documents for every registered resource kind.

use serde_json::{Value, json};

pub const ACCOUNT: &str = "123456789012";

pub fn certificate_authority() -> Value {
    json!({
        "certificate_authority_configuration": {
            "key_algorithm": "RSA_2048",
            "signing_algorithm": "SHA256WITHRSA",
            "subject": {"common_name": "example.com"}
        }
    })
}

pub fn budget() -> Value {
    json!({
        "name": "monthly",
        "budget_type": "COST",
        "limit_amount": "1200.50",
        "limit_unit": "USD",
        "time_unit": "MONTHLY"
    })
}

pub fn log_group() -> Value {
    json!({"name": "/app/api", "retention_in_days": 90})
}

pub fn metric_alarm() -> Value {
    json!({
        "alarm_name": "high-cpu",
        "comparison_operator": "GreaterThanThreshold",
        "evaluation_periods": 3,
        "metric_name": "CPUUtilization",
        "namespace": "AWS/EC2",
        "period": 300,
        "statistic": "Average",
        "threshold": 80,
        "alarm_actions": ["arn:aws:sns:us-east-1:123456789012:ops"]
    })
}

pub fn dynamodb_table() -> Value {
    json!({
        "name": "orders",
        "hash_key": "id",
        "read_capacity": 5,
        "write_capacity": 5,
        "attributes": [{"name": "id", "type": "S"}]
    })
}

pub fn security_group() -> Value {
    json!({
        "name": "web",
        "vpc_id": "vpc-0a1b2c3d",
        "ingress": [
            {"from_port": 443, "to_port": 443, "protocol": "tcp", "cidr_blocks": ["0.0.0.0/0"]}
        ],
        "egress": [
            {"from_port": 0, "to_port": 0, "protocol": "-1", "cidr_blocks": ["0.0.0.0/0"]}
        ]
    })
}

pub fn vpc() -> Value {
    json!({"cidr_block": "10.20.0.0/16"})
}

pub fn ecs_task_definition() -> Value {
    json!({
        "family": "api",
        "requires_compatibilities": ["FARGATE"],
        "network_mode": "awsvpc",
        "cpu": 256,
        "memory": 512,
        "task_role_arn": "arn:aws:iam::123456789012:role/api-task",
        "container_definitions": [{
            "name": "api",
            "image": "example/api:1.4.2",
            "memory": 512,
            "port_mappings": [{"container_port": 8080}]
        }]
    })
}

pub fn eks_cluster() -> Value {
    json!({
        "name": "platform",
        "role_arn": "arn:aws:iam::123456789012:role/eks",
        "vpc_config": {"subnet_ids": ["subnet-a", "subnet-b"]}
    })
}

pub fn replication_group() -> Value {
    json!({
        "replication_group_id": "sessions",
        "description": "session cache",
        "node_type": "cache.r6g.large"
    })
}

pub fn event_rule() -> Value {
    json!({"name": "nightly", "schedule_expression": "rate(2 hours)"})
}

pub fn delivery_stream() -> Value {
    json!({
        "name": "events",
        "destination": "extended_s3",
        "extended_s3_configuration": {
            "bucket_arn": "arn:aws:s3:::lake",
            "role_arn": "arn:aws:iam::123456789012:role/firehose"
        }
    })
}

pub fn glue_job() -> Value {
    json!({
        "name": "nightly",
        "role_arn": "arn:aws:iam::123456789012:role/glue",
        "command": {"script_location": "s3://scripts/job.py"}
    })
}

pub fn glue_catalog_table() -> Value {
    json!({
        "name": "events",
        "database_name": "analytics",
        "storage_descriptor": {
            "location": "s3://lake/events/",
            "columns": [{"name": "id", "type": "string"}]
        }
    })
}

pub fn iam_policy() -> Value {
    json!({
        "name": "reader",
        "policy": {"Statement": [{
            "Effect": "Allow",
            "Action": "s3:GetObject",
            "Resource": ["arn:aws:s3:::lake/*"]
        }]}
    })
}

pub fn iam_role() -> Value {
    json!({
        "name": "worker",
        "assume_role_policy": {"Statement": [{
            "Effect": "Allow",
            "Principal": {"Service": "lambda.amazonaws.com"},
            "Action": "sts:AssumeRole"
        }]}
    })
}

pub fn kinesis_stream() -> Value {
    json!({"name": "clicks"})
}

pub fn kms_key() -> Value {
    json!({"description": "app data", "enable_key_rotation": true})
}

pub fn lambda_function() -> Value {
    json!({
        "function_name": "handler",
        "role": "arn:aws:iam::123456789012:role/lambda-exec",
        "runtime": "python3.12",
        "handler": "app.handler",
        "filename": "build/app.zip"
    })
}

pub fn lambda_layer() -> Value {
    json!({
        "layer_name": "shared",
        "s3_bucket": "artifacts",
        "s3_key": "layers/shared.zip",
        "compatible_runtimes": ["python3.12"],
        "compatible_architectures": ["arm64", "x86_64"]
    })
}

pub fn rds_cluster() -> Value {
    json!({
        "cluster_identifier": "orders-db",
        "engine": "aurora-postgresql",
        "master_username": "admin",
        "master_password": "correct-horse",
        "skip_final_snapshot": true
    })
}

pub fn s3_bucket() -> Value {
    json!({"bucket": "my-logs", "versioning": {"enabled": true}})
}

pub fn secret() -> Value {
    json!({"name": "prod/db/password"})
}

pub fn sns_topic() -> Value {
    json!({"name": "alerts", "kms_master_key_id": "alias/aws/sns"})
}

pub fn sns_subscription() -> Value {
    json!({
        "topic_arn": "arn:aws:sns:eu-west-1:123456789012:alerts",
        "protocol": "sqs",
        "endpoint": "arn:aws:sqs:eu-west-1:123456789012:queue"
    })
}

pub fn sqs_queue() -> Value {
    json!({"name": "orders"})
}

/// One valid document per registered kind.
pub fn valid_resources() -> Vec<(&'static str, Value)> {
    vec![
        ("aws_acmpca_certificate_authority", certificate_authority()),
        ("aws_budgets_budget", budget()),
        ("aws_cloudwatch_log_group", log_group()),
        ("aws_cloudwatch_metric_alarm", metric_alarm()),
        ("aws_dynamodb_table", dynamodb_table()),
        ("aws_security_group", security_group()),
        ("aws_vpc", vpc()),
        ("aws_ecs_task_definition", ecs_task_definition()),
        ("aws_eks_cluster", eks_cluster()),
        ("aws_elasticache_replication_group", replication_group()),
        ("aws_cloudwatch_event_rule", event_rule()),
        ("aws_kinesis_firehose_delivery_stream", delivery_stream()),
        ("aws_glue_job", glue_job()),
        ("aws_glue_catalog_table", glue_catalog_table()),
        ("aws_iam_policy", iam_policy()),
        ("aws_iam_role", iam_role()),
        ("aws_kinesis_stream", kinesis_stream()),
        ("aws_kms_key", kms_key()),
        ("aws_lambda_function", lambda_function()),
        ("aws_lambda_layer_version", lambda_layer()),
        ("aws_rds_cluster", rds_cluster()),
        ("aws_s3_bucket", s3_bucket()),
        ("aws_secretsmanager_secret", secret()),
        ("aws_sns_topic", sns_topic()),
        ("aws_sns_topic_subscription", sns_subscription()),
        ("aws_sqs_queue", sqs_queue()),
    ]
}

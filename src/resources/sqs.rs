//! SQS queues.

use crate::error::{SchemaResult, ValidationError, ValidationResult};
use crate::resource::value_objects::rules::{at_most_one_of, forbid_if};
use crate::resource::value_objects::{Arn, Tags, check_tags};
use crate::resource::{ComputedProperties, ResourceAttributes, string_enum};
use crate::schema::{FieldDescriptor, Schema, SchemaCell};
use serde::{Deserialize, Serialize};

const FIFO_SUFFIX: &str = ".fifo";
const SECONDS_PER_DAY: f64 = 86_400.0;

string_enum! {
    pub enum DeduplicationScope {
        MessageGroup => "messageGroup",
        Queue => "queue",
    }
}

string_enum! {
    pub enum FifoThroughputLimit {
        PerQueue => "perQueue",
        PerMessageGroupId => "perMessageGroupId",
    }
}

static SCHEMA: SchemaCell = SchemaCell::new(|| {
    let redrive_policy = Schema::strict("redrive_policy")
        .field(FieldDescriptor::string("dead_letter_target_arn").required())
        .field(FieldDescriptor::integer("max_receive_count").required().range(1, 1000))
        .build()?;

    Schema::strict(SqsQueue::KIND)
        .field(FieldDescriptor::string("name").pattern(r"[a-zA-Z0-9_-]{1,80}(\.fifo)?"))
        .field(FieldDescriptor::string("name_prefix").pattern(r"[a-zA-Z0-9_-]{1,75}"))
        .field(FieldDescriptor::boolean("fifo_queue").default(false))
        .field(FieldDescriptor::boolean("content_based_deduplication").default(false))
        .field(FieldDescriptor::string("deduplication_scope").one_of(DeduplicationScope::VALUES))
        .field(
            FieldDescriptor::string("fifo_throughput_limit").one_of(FifoThroughputLimit::VALUES),
        )
        .field(FieldDescriptor::integer("delay_seconds").range(0, 900).default(0))
        .field(
            FieldDescriptor::integer("max_message_size")
                .range(1024, 262_144)
                .default(262_144),
        )
        .field(
            FieldDescriptor::integer("message_retention_seconds")
                .range(60, 1_209_600)
                .default(345_600),
        )
        .field(
            FieldDescriptor::integer("receive_wait_time_seconds")
                .range(0, 20)
                .default(0),
        )
        .field(
            FieldDescriptor::integer("visibility_timeout_seconds")
                .range(0, 43_200)
                .default(30),
        )
        .field(FieldDescriptor::object("redrive_policy", redrive_policy))
        .field(FieldDescriptor::string("kms_master_key_id").length(1, 2048))
        .field(
            FieldDescriptor::integer("kms_data_key_reuse_period_seconds")
                .range(60, 86_400)
                .default(300),
        )
        .field(FieldDescriptor::boolean("sqs_managed_sse_enabled"))
        .field(FieldDescriptor::tags())
        .build()
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedrivePolicy {
    pub dead_letter_target_arn: String,
    pub max_receive_count: i64,
}

/// Attributes of an `aws_sqs_queue`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqsQueue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_prefix: Option<String>,
    pub fifo_queue: bool,
    pub content_based_deduplication: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deduplication_scope: Option<DeduplicationScope>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fifo_throughput_limit: Option<FifoThroughputLimit>,
    pub delay_seconds: i64,
    pub max_message_size: i64,
    pub message_retention_seconds: i64,
    pub receive_wait_time_seconds: i64,
    pub visibility_timeout_seconds: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redrive_policy: Option<RedrivePolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kms_master_key_id: Option<String>,
    pub kms_data_key_reuse_period_seconds: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sqs_managed_sse_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
}

impl ResourceAttributes for SqsQueue {
    const KIND: &'static str = "aws_sqs_queue";

    fn schema() -> SchemaResult<&'static Schema> {
        SCHEMA.get()
    }

    fn check_formats(&self) -> ValidationResult<()> {
        check_tags(self.tags.as_ref())?;
        self.dead_letter_target().map(|_| ())
    }

    fn validate(&self) -> ValidationResult<()> {
        at_most_one_of(&[
            ("name", self.name.is_some()),
            ("name_prefix", self.name_prefix.is_some()),
        ])?;

        if let Some(name) = &self.name {
            if self.fifo_queue != name.ends_with(FIFO_SUFFIX) {
                return Err(ValidationError::cross_field(
                    ["name", "fifo_queue"],
                    "FIFO queue names must end in '.fifo' and standard queue names must not",
                ));
            }
        }

        let standard = !self.fifo_queue;
        let reason = "fifo_queue is false";
        forbid_if(
            standard,
            "content_based_deduplication",
            self.content_based_deduplication,
            reason,
        )?;
        forbid_if(
            standard,
            "deduplication_scope",
            self.deduplication_scope.is_some(),
            reason,
        )?;
        forbid_if(
            standard,
            "fifo_throughput_limit",
            self.fifo_throughput_limit.is_some(),
            reason,
        )?;

        if self.fifo_throughput_limit == Some(FifoThroughputLimit::PerMessageGroupId)
            && self.deduplication_scope != Some(DeduplicationScope::MessageGroup)
        {
            return Err(ValidationError::cross_field(
                ["fifo_throughput_limit", "deduplication_scope"],
                "perMessageGroupId throughput requires messageGroup deduplication scope",
            ));
        }

        if self.kms_master_key_id.is_some() && self.sqs_managed_sse_enabled == Some(true) {
            return Err(ValidationError::mutually_exclusive(
                "kms_master_key_id",
                "sqs_managed_sse_enabled",
            ));
        }

        if let Some(arn) = self.dead_letter_target()? {
            if arn.resource().ends_with(FIFO_SUFFIX) != self.fifo_queue {
                return Err(ValidationError::cross_field(
                    ["fifo_queue", "redrive_policy.dead_letter_target_arn"],
                    "dead-letter queue must be of the same type as the source queue",
                ));
            }
        }

        Ok(())
    }

    fn properties(&self) -> ComputedProperties {
        ComputedProperties::new()
            .with("is_fifo", self.fifo_queue)
            .with("is_high_throughput_fifo", self.is_high_throughput_fifo())
            .with("retention_days", self.retention_days())
            .with("has_dead_letter_queue", self.redrive_policy.is_some())
            .with("encryption", self.encryption())
            .with("is_long_polling", self.is_long_polling())
    }

    fn advisories(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.redrive_policy.is_none() {
            warnings.push("Queue has no dead-letter queue".to_string());
        }
        if self.encryption() == "none" {
            warnings.push("Queue is not encrypted at rest".to_string());
        }
        warnings
    }
}

impl SqsQueue {
    fn dead_letter_target(&self) -> ValidationResult<Option<Arn>> {
        let Some(policy) = &self.redrive_policy else {
            return Ok(None);
        };
        let attribute = "redrive_policy.dead_letter_target_arn";
        let arn = Arn::parse(attribute, &policy.dead_letter_target_arn)?;
        if arn.service() != "sqs" {
            return Err(ValidationError::invalid_format(attribute, "must be an SQS queue ARN"));
        }
        Ok(Some(arn))
    }

    pub fn is_high_throughput_fifo(&self) -> bool {
        self.fifo_queue
            && self.deduplication_scope == Some(DeduplicationScope::MessageGroup)
            && self.fifo_throughput_limit == Some(FifoThroughputLimit::PerMessageGroupId)
    }

    pub fn retention_days(&self) -> f64 {
        self.message_retention_seconds as f64 / SECONDS_PER_DAY
    }

    /// `sse-kms`, `sse-sqs` or `none`.
    pub fn encryption(&self) -> &'static str {
        if self.kms_master_key_id.is_some() {
            "sse-kms"
        } else if self.sqs_managed_sse_enabled == Some(true) {
            "sse-sqs"
        } else {
            "none"
        }
    }

    pub fn is_long_polling(&self) -> bool {
        self.receive_wait_time_seconds > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResourceError;
    use crate::resource::BuiltResource;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let queue = SqsQueue::build(&json!({"name": "orders"})).unwrap();
        assert_eq!(queue.message_retention_seconds, 345_600);
        assert_eq!(queue.retention_days(), 4.0);
        assert_eq!(queue.visibility_timeout_seconds, 30);
        assert_eq!(queue.encryption(), "none");
        assert!(!queue.is_long_polling());
        assert_eq!(queue.warnings().len(), 2);
    }

    #[test]
    fn test_fifo_naming() {
        assert!(SqsQueue::build(&json!({"name": "orders.fifo", "fifo_queue": true})).is_ok());
        assert!(matches!(
            SqsQueue::build(&json!({"name": "orders", "fifo_queue": true})),
            Err(ResourceError::Validation(ValidationError::CrossField { .. }))
        ));
        assert!(SqsQueue::build(&json!({"name": "orders.fifo"})).is_err());
        assert!(SqsQueue::build(&json!({"name_prefix": "orders", "fifo_queue": true})).is_ok());
    }

    #[test]
    fn test_fifo_only_options() {
        let err = SqsQueue::build(&json!({"name": "orders", "content_based_deduplication": true}))
            .unwrap_err();
        assert!(matches!(
            err,
            ResourceError::Validation(ValidationError::ConditionallyForbidden { .. })
        ));
    }

    #[test]
    fn test_high_throughput_fifo() {
        let queue = SqsQueue::build(&json!({
            "name": "orders.fifo",
            "fifo_queue": true,
            "deduplication_scope": "messageGroup",
            "fifo_throughput_limit": "perMessageGroupId"
        }))
        .unwrap();
        assert!(queue.is_high_throughput_fifo());

        let result = SqsQueue::build(&json!({
            "name": "orders.fifo",
            "fifo_queue": true,
            "deduplication_scope": "queue",
            "fifo_throughput_limit": "perMessageGroupId"
        }));
        assert!(matches!(
            result,
            Err(ResourceError::Validation(ValidationError::CrossField { .. }))
        ));
    }

    #[test]
    fn test_encryption_choice() {
        let result = SqsQueue::build(&json!({
            "name": "orders",
            "kms_master_key_id": "alias/aws/sqs",
            "sqs_managed_sse_enabled": true
        }));
        assert!(matches!(
            result,
            Err(ResourceError::Validation(ValidationError::MutuallyExclusive { .. }))
        ));

        let queue =
            SqsQueue::build(&json!({"name": "orders", "sqs_managed_sse_enabled": true})).unwrap();
        assert_eq!(queue.encryption(), "sse-sqs");
    }

    #[test]
    fn test_dead_letter_queue_type() {
        let queue = SqsQueue::build(&json!({
            "name": "orders",
            "receive_wait_time_seconds": 20,
            "redrive_policy": {
                "dead_letter_target_arn": "arn:aws:sqs:us-east-1:123456789012:orders-dlq",
                "max_receive_count": 5
            }
        }))
        .unwrap();
        let properties = queue.computed_properties();
        assert_eq!(properties.get_bool("has_dead_letter_queue"), Some(true));
        assert_eq!(properties.get_bool("is_long_polling"), Some(true));

        let result = SqsQueue::build(&json!({
            "name": "orders",
            "redrive_policy": {
                "dead_letter_target_arn": "arn:aws:sqs:us-east-1:123456789012:orders-dlq.fifo",
                "max_receive_count": 5
            }
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_dead_letter_arn_reported_before_fifo_rules() {
        let result = SqsQueue::build(&json!({
            "name": "orders",
            "content_based_deduplication": true,
            "redrive_policy": {
                "dead_letter_target_arn": "arn:aws:sns:us-east-1:123456789012:orders-dlq",
                "max_receive_count": 5
            }
        }));
        match result {
            Err(ResourceError::Validation(ValidationError::InvalidFormat { attribute, .. })) => {
                assert_eq!(attribute, "redrive_policy.dead_letter_target_arn")
            }
            other => panic!("unexpected result {:?}", other),
        }
    }
}

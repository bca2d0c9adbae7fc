//! SNS topics and subscriptions.

use crate::error::{SchemaResult, ValidationError, ValidationResult};
use crate::resource::value_objects::rules::{forbid_if, require_if};
use crate::resource::value_objects::{Arn, JsonDocument, Tags, check_tags};
use crate::resource::{ComputedProperties, ResourceAttributes, string_enum};
use crate::schema::{FieldDescriptor, Pattern, Schema, SchemaCell};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;

const FIFO_SUFFIX: &str = ".fifo";

static PHONE_NUMBER: LazyLock<Pattern> = LazyLock::new(|| Pattern::new(r"\+?[0-9]{7,15}"));
static EMAIL_ADDRESS: LazyLock<Pattern> =
    LazyLock::new(|| Pattern::new(r"[^@\s]+@[^@\s]+\.[^@\s]+"));

static TOPIC_SCHEMA: SchemaCell = SchemaCell::new(|| {
    Schema::strict(SnsTopic::KIND)
        .field(FieldDescriptor::string("name").pattern(r"[A-Za-z0-9_-]{1,256}(\.fifo)?"))
        .field(FieldDescriptor::boolean("fifo_topic").default(false))
        .field(FieldDescriptor::boolean("content_based_deduplication").default(false))
        .field(FieldDescriptor::string("display_name").max_length(100))
        .field(FieldDescriptor::string("kms_master_key_id").length(1, 2048))
        .field(FieldDescriptor::json("delivery_policy"))
        .field(FieldDescriptor::tags())
        .build()
});

/// Attributes of an `aws_sns_topic`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnsTopic {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub fifo_topic: bool,
    pub content_based_deduplication: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kms_master_key_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_policy: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
}

impl ResourceAttributes for SnsTopic {
    const KIND: &'static str = "aws_sns_topic";

    fn schema() -> SchemaResult<&'static Schema> {
        TOPIC_SCHEMA.get()
    }

    fn check_formats(&self) -> ValidationResult<()> {
        check_tags(self.tags.as_ref())?;
        if let Some(policy) = &self.delivery_policy {
            JsonDocument::parse("delivery_policy", policy)?;
        }
        Ok(())
    }

    fn validate(&self) -> ValidationResult<()> {
        if let Some(name) = &self.name {
            if self.fifo_topic != name.ends_with(FIFO_SUFFIX) {
                return Err(ValidationError::cross_field(
                    ["name", "fifo_topic"],
                    "FIFO topic names must end in '.fifo' and standard topic names must not",
                ));
            }
        }
        forbid_if(
            !self.fifo_topic,
            "content_based_deduplication",
            self.content_based_deduplication,
            "fifo_topic is false",
        )
    }

    fn properties(&self) -> ComputedProperties {
        ComputedProperties::new()
            .with("is_fifo", self.fifo_topic)
            .with("is_encrypted", self.kms_master_key_id.is_some())
    }

    fn advisories(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.kms_master_key_id.is_none() {
            warnings.push("Topic is not encrypted at rest".to_string());
        }
        warnings
    }
}

string_enum! {
    pub enum Protocol {
        Sqs => "sqs",
        Sms => "sms",
        Lambda => "lambda",
        Firehose => "firehose",
        Application => "application",
        Email => "email",
        EmailJson => "email-json",
        Http => "http",
        Https => "https",
    }
}

impl Protocol {
    /// Service an ARN endpoint must belong to, for AWS-hosted endpoints.
    pub fn endpoint_service(&self) -> Option<&'static str> {
        match self {
            Self::Sqs => Some("sqs"),
            Self::Lambda => Some("lambda"),
            Self::Firehose => Some("firehose"),
            Self::Application => Some("sns"),
            _ => None,
        }
    }

    pub fn supports_raw_delivery(&self) -> bool {
        matches!(self, Self::Sqs | Self::Http | Self::Https | Self::Firehose)
    }
}

string_enum! {
    pub enum FilterPolicyScope {
        MessageAttributes => "MessageAttributes",
        MessageBody => "MessageBody",
    }
}

static SUBSCRIPTION_SCHEMA: SchemaCell = SchemaCell::new(|| {
    Schema::strict(SnsTopicSubscription::KIND)
        .field(FieldDescriptor::string("topic_arn").required())
        .field(FieldDescriptor::string("protocol").required().one_of(Protocol::VALUES))
        .field(FieldDescriptor::string("endpoint").required().length(1, 2048))
        .field(FieldDescriptor::boolean("raw_message_delivery").default(false))
        .field(FieldDescriptor::json("filter_policy"))
        .field(FieldDescriptor::string("filter_policy_scope").one_of(FilterPolicyScope::VALUES))
        .field(FieldDescriptor::string("subscription_role_arn"))
        .field(
            FieldDescriptor::integer("confirmation_timeout_in_minutes")
                .at_least(1)
                .default(1),
        )
        .field(FieldDescriptor::boolean("endpoint_auto_confirms").default(false))
        .build()
});

/// Attributes of an `aws_sns_topic_subscription`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnsTopicSubscription {
    pub topic_arn: String,
    pub protocol: Protocol,
    pub endpoint: String,
    pub raw_message_delivery: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_policy: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_policy_scope: Option<FilterPolicyScope>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_role_arn: Option<String>,
    pub confirmation_timeout_in_minutes: i64,
    pub endpoint_auto_confirms: bool,
}

impl ResourceAttributes for SnsTopicSubscription {
    const KIND: &'static str = "aws_sns_topic_subscription";

    fn schema() -> SchemaResult<&'static Schema> {
        SUBSCRIPTION_SCHEMA.get()
    }

    fn check_formats(&self) -> ValidationResult<()> {
        let topic = Arn::parse("topic_arn", &self.topic_arn)?;
        if topic.service() != "sns" {
            return Err(ValidationError::invalid_format(
                "topic_arn",
                "must be an SNS topic ARN",
            ));
        }
        self.validate_endpoint()?;
        if let Some(role) = &self.subscription_role_arn {
            Arn::parse("subscription_role_arn", role)?;
        }
        if let Some(policy) = &self.filter_policy {
            JsonDocument::parse("filter_policy", policy)?;
        }
        Ok(())
    }

    fn validate(&self) -> ValidationResult<()> {
        if self.raw_message_delivery && !self.protocol.supports_raw_delivery() {
            return Err(ValidationError::forbidden(
                "raw_message_delivery",
                format!("protocol is {}", self.protocol),
            ));
        }

        let is_firehose = self.protocol == Protocol::Firehose;
        let has_role = self.subscription_role_arn.is_some();
        require_if(is_firehose, "subscription_role_arn", has_role, "protocol is firehose")?;
        forbid_if(!is_firehose, "subscription_role_arn", has_role, "protocol is not firehose")?;
        require_if(
            self.filter_policy_scope.is_some(),
            "filter_policy",
            self.filter_policy.is_some(),
            "filter_policy_scope is set",
        )
    }

    fn properties(&self) -> ComputedProperties {
        ComputedProperties::new()
            .with("requires_confirmation", self.requires_confirmation())
            .with("is_aws_service_endpoint", self.is_aws_service_endpoint())
            .with("endpoint_region", self.endpoint_region())
            .with("delivery_format", self.delivery_format())
    }
}

impl SnsTopicSubscription {
    fn validate_endpoint(&self) -> ValidationResult<()> {
        let endpoint = self.endpoint.as_str();
        let matches = |pattern: &Pattern| pattern.is_match(endpoint);

        let expected = match self.protocol {
            Protocol::Sqs | Protocol::Lambda | Protocol::Firehose | Protocol::Application => {
                let arn = Arn::parse("endpoint", endpoint)?;
                match self.protocol.endpoint_service() {
                    Some(service) if arn.service() != service => Some("an ARN of the protocol's service"),
                    _ => None,
                }
            }
            Protocol::Sms => (!matches(&PHONE_NUMBER)).then_some("a phone number"),
            Protocol::Email | Protocol::EmailJson => {
                (!matches(&EMAIL_ADDRESS)).then_some("an e-mail address")
            }
            Protocol::Http => (!endpoint.starts_with("http://")).then_some("an http:// URL"),
            Protocol::Https => (!endpoint.starts_with("https://")).then_some("an https:// URL"),
        };

        match expected {
            Some(expected) => Err(ValidationError::invalid_format(
                "endpoint",
                format!("must be {expected} for protocol {}", self.protocol),
            )),
            None => Ok(()),
        }
    }

    /// E-mail and HTTP endpoints must confirm before receiving messages.
    pub fn requires_confirmation(&self) -> bool {
        match self.protocol {
            Protocol::Email | Protocol::EmailJson => true,
            Protocol::Http | Protocol::Https => !self.endpoint_auto_confirms,
            _ => false,
        }
    }

    pub fn is_aws_service_endpoint(&self) -> bool {
        self.protocol.endpoint_service().is_some()
    }

    /// Region of an ARN endpoint.
    pub fn endpoint_region(&self) -> Option<String> {
        if !self.is_aws_service_endpoint() {
            return None;
        }
        Arn::parse("endpoint", &self.endpoint)
            .ok()
            .map(|arn| arn.region().to_string())
            .filter(|region| !region.is_empty())
    }

    /// `raw`, `text` or `json`.
    pub fn delivery_format(&self) -> &'static str {
        if self.raw_message_delivery {
            "raw"
        } else if matches!(self.protocol, Protocol::Email | Protocol::Sms) {
            "text"
        } else {
            "json"
        }
    }
}

//! Kinesis data streams.

use crate::error::{SchemaResult, ValidationError, ValidationResult};
use crate::resource::value_objects::rules::{forbid_if, require_if};
use crate::resource::value_objects::{Tags, check_tags};
use crate::resource::{
    ComputedProperties, HOURS_PER_MONTH, ResourceAttributes, round_currency, string_enum,
};
use crate::schema::{FieldDescriptor, Schema, SchemaCell};
use serde::{Deserialize, Serialize};

/// Hourly price of one provisioned shard
pub const SHARD_HOUR_PRICE: f64 = 0.015;
/// Hourly price of extended retention per shard
pub const EXTENDED_RETENTION_SHARD_HOUR_PRICE: f64 = 0.020;
/// Hourly price of an on-demand stream
pub const ON_DEMAND_STREAM_HOUR_PRICE: f64 = 0.04;

const DEFAULT_RETENTION_HOURS: i64 = 24;
const LONG_TERM_RETENTION_HOURS: i64 = 168;

string_enum! {
    pub enum StreamMode {
        Provisioned => "PROVISIONED",
        OnDemand => "ON_DEMAND",
    }
}

string_enum! {
    pub enum StreamEncryption {
        None => "NONE",
        Kms => "KMS",
    }
}

const SHARD_LEVEL_METRICS: &[&str] = &[
    "IncomingBytes",
    "IncomingRecords",
    "OutgoingBytes",
    "OutgoingRecords",
    "WriteProvisionedThroughputExceeded",
    "ReadProvisionedThroughputExceeded",
    "IteratorAgeMilliseconds",
    "ALL",
];

static SCHEMA: SchemaCell = SchemaCell::new(|| {
    let stream_mode_details = Schema::strict("stream_mode_details")
        .field(
            FieldDescriptor::string("stream_mode")
                .required()
                .one_of(StreamMode::VALUES),
        )
        .build()?;

    Schema::strict(KinesisStream::KIND)
        .field(
            FieldDescriptor::string("name")
                .required()
                .pattern(r"[a-zA-Z0-9_.-]+")
                .length(1, 128),
        )
        .field(FieldDescriptor::integer("shard_count").range(1, 10_000))
        .field(
            FieldDescriptor::integer("retention_period")
                .range(24, 8760)
                .default(DEFAULT_RETENTION_HOURS),
        )
        .field(FieldDescriptor::object("stream_mode_details", stream_mode_details))
        .field(
            FieldDescriptor::string("encryption_type")
                .one_of(StreamEncryption::VALUES)
                .default("NONE"),
        )
        .field(FieldDescriptor::string("kms_key_id").length(1, 2048))
        .field(FieldDescriptor::string_array("shard_level_metrics").one_of(SHARD_LEVEL_METRICS))
        .field(FieldDescriptor::boolean("enforce_consumer_deletion").default(false))
        .field(FieldDescriptor::tags())
        .build()
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamModeDetails {
    pub stream_mode: StreamMode,
}

/// Attributes of an `aws_kinesis_stream`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KinesisStream {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shard_count: Option<i64>,
    /// Retention in hours
    pub retention_period: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_mode_details: Option<StreamModeDetails>,
    pub encryption_type: StreamEncryption,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kms_key_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shard_level_metrics: Option<Vec<String>>,
    pub enforce_consumer_deletion: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
}

impl ResourceAttributes for KinesisStream {
    const KIND: &'static str = "aws_kinesis_stream";

    fn schema() -> SchemaResult<&'static Schema> {
        SCHEMA.get()
    }

    fn validate(&self) -> ValidationResult<()> {
        check_tags(self.tags.as_ref())?;

        forbid_if(
            self.is_on_demand(),
            "shard_count",
            self.shard_count.is_some(),
            "stream_mode is ON_DEMAND",
        )?;

        let has_key = self.kms_key_id.is_some();
        require_if(
            self.encryption_type == StreamEncryption::Kms,
            "kms_key_id",
            has_key,
            "encryption_type is KMS",
        )?;
        forbid_if(
            self.encryption_type == StreamEncryption::None,
            "kms_key_id",
            has_key,
            "encryption_type is NONE",
        )?;

        if let Some(metrics) = &self.shard_level_metrics {
            if metrics.len() > 1 && metrics.iter().any(|metric| metric == "ALL") {
                return Err(ValidationError::cross_field(
                    ["shard_level_metrics"],
                    "ALL cannot be combined with individual metrics",
                ));
            }
        }

        Ok(())
    }

    fn properties(&self) -> ComputedProperties {
        ComputedProperties::new()
            .with("stream_mode", self.stream_mode().as_str())
            .with("is_on_demand", self.is_on_demand())
            .with("effective_shard_count", self.effective_shard_count())
            .with("retention_period_days", self.retention_period_days())
            .with("has_extended_retention", self.has_extended_retention())
            .with("is_long_term_retention", self.is_long_term_retention())
            .with("is_encrypted", self.is_encrypted())
            .with("write_capacity_mb_per_sec", self.write_capacity_mb_per_sec())
            .with("read_capacity_mb_per_sec", self.read_capacity_mb_per_sec())
            .with("write_records_per_sec", self.write_records_per_sec())
            .with("estimated_monthly_cost", self.estimated_monthly_cost())
    }
}

impl KinesisStream {
    pub fn stream_mode(&self) -> StreamMode {
        self.stream_mode_details
            .as_ref()
            .map_or(StreamMode::Provisioned, |details| details.stream_mode)
    }

    pub fn is_on_demand(&self) -> bool {
        self.stream_mode() == StreamMode::OnDemand
    }

    /// Provisioned shard count, defaulting to one. `None` for on-demand streams.
    pub fn effective_shard_count(&self) -> Option<i64> {
        if self.is_on_demand() {
            None
        } else {
            Some(self.shard_count.unwrap_or(1))
        }
    }

    pub fn retention_period_days(&self) -> i64 {
        self.retention_period / 24
    }

    pub fn has_extended_retention(&self) -> bool {
        self.retention_period > DEFAULT_RETENTION_HOURS
    }

    pub fn is_long_term_retention(&self) -> bool {
        self.retention_period > LONG_TERM_RETENTION_HOURS
    }

    pub fn is_encrypted(&self) -> bool {
        self.encryption_type == StreamEncryption::Kms
    }

    pub fn write_capacity_mb_per_sec(&self) -> Option<i64> {
        self.effective_shard_count()
    }

    pub fn read_capacity_mb_per_sec(&self) -> Option<i64> {
        self.effective_shard_count().map(|shards| shards * 2)
    }

    pub fn write_records_per_sec(&self) -> Option<i64> {
        self.effective_shard_count().map(|shards| shards * 1000)
    }

    pub fn estimated_monthly_cost(&self) -> f64 {
        let cost = match self.effective_shard_count() {
            None => ON_DEMAND_STREAM_HOUR_PRICE * HOURS_PER_MONTH,
            Some(shards) => {
                let shards = shards as f64;
                let base = shards * SHARD_HOUR_PRICE * HOURS_PER_MONTH;
                let retention = if self.has_extended_retention() {
                    shards * EXTENDED_RETENTION_SHARD_HOUR_PRICE * HOURS_PER_MONTH
                } else {
                    0.0
                };
                base + retention
            }
        };
        round_currency(cost)
    }
}

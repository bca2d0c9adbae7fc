//! Kinesis Data Firehose delivery streams.

use crate::error::{SchemaResult, ValidationError, ValidationResult};
use crate::resource::value_objects::rules::{forbid_if, require_if};
use crate::resource::value_objects::{Tags, check_tags};
use crate::resource::{ComputedProperties, ResourceAttributes, round_currency, string_enum};
use crate::schema::{FieldDescriptor, Schema, SchemaCell};
use serde::{Deserialize, Serialize};

/// Ingestion price per GB
pub const INGESTION_PRICE_PER_GB: f64 = 0.029;
/// Additional price per GB with dynamic partitioning
pub const DYNAMIC_PARTITIONING_PRICE_PER_GB: f64 = 0.020;

const DYNAMIC_PARTITIONING_MIN_BUFFER_MB: i64 = 64;
const ARN_PATTERN: &str = r"arn:aws[a-zA-Z-]*:[a-z0-9-]+:[a-z0-9-]*:(\d{12})?:.+";

string_enum! {
    pub enum Destination {
        ExtendedS3 => "extended_s3",
        Redshift => "redshift",
        OpenSearch => "opensearch",
        HttpEndpoint => "http_endpoint",
        Splunk => "splunk",
    }
}

impl Destination {
    /// Attribute holding this destination's configuration block.
    pub fn configuration_attribute(&self) -> &'static str {
        match self {
            Self::ExtendedS3 => "extended_s3_configuration",
            Self::Redshift => "redshift_configuration",
            Self::OpenSearch => "opensearch_configuration",
            Self::HttpEndpoint => "http_endpoint_configuration",
            Self::Splunk => "splunk_configuration",
        }
    }
}

string_enum! {
    pub enum CompressionFormat {
        Uncompressed => "UNCOMPRESSED",
        Gzip => "GZIP",
        Zip => "ZIP",
        Snappy => "Snappy",
        HadoopSnappy => "HADOOP_SNAPPY",
    }
}

string_enum! {
    pub enum S3BackupMode {
        Disabled => "Disabled",
        Enabled => "Enabled",
    }
}

string_enum! {
    pub enum IndexRotationPeriod {
        NoRotation => "NoRotation",
        OneHour => "OneHour",
        OneDay => "OneDay",
        OneWeek => "OneWeek",
        OneMonth => "OneMonth",
    }
}

string_enum! {
    pub enum HecEndpointType {
        Raw => "Raw",
        Event => "Event",
    }
}

string_enum! {
    pub enum SseKeyType {
        AwsOwned => "AWS_OWNED_CMK",
        CustomerManaged => "CUSTOMER_MANAGED_CMK",
    }
}

static SCHEMA: SchemaCell = SchemaCell::new(|| {
    let kinesis_source = Schema::strict("kinesis_source_configuration")
        .field(
            FieldDescriptor::string("kinesis_stream_arn")
                .required()
                .pattern(ARN_PATTERN),
        )
        .field(FieldDescriptor::string("role_arn").required().pattern(ARN_PATTERN))
        .build()?;
    let extended_s3 = Schema::strict("extended_s3_configuration")
        .field(FieldDescriptor::string("bucket_arn").required().pattern(ARN_PATTERN))
        .field(FieldDescriptor::string("role_arn").required().pattern(ARN_PATTERN))
        .field(FieldDescriptor::string("prefix").max_length(1024))
        .field(FieldDescriptor::string("error_output_prefix").max_length(1024))
        .field(FieldDescriptor::integer("buffering_size").range(1, 128).default(5))
        .field(FieldDescriptor::integer("buffering_interval").range(0, 900).default(300))
        .field(
            FieldDescriptor::string("compression_format")
                .one_of(CompressionFormat::VALUES)
                .default("UNCOMPRESSED"),
        )
        .field(FieldDescriptor::string("kms_key_arn").pattern(ARN_PATTERN))
        .field(FieldDescriptor::boolean("dynamic_partitioning_enabled").default(false))
        .build()?;
    let redshift = Schema::strict("redshift_configuration")
        .field(
            FieldDescriptor::string("cluster_jdbcurl")
                .required()
                .pattern(r"jdbc:redshift://.+"),
        )
        .field(FieldDescriptor::string("username").required().length(1, 128))
        .field(FieldDescriptor::string("password").required().length(6, 512))
        .field(FieldDescriptor::string("data_table_name").required().length(1, 512))
        .field(FieldDescriptor::string("role_arn").required().pattern(ARN_PATTERN))
        .field(
            FieldDescriptor::string("s3_backup_mode")
                .one_of(S3BackupMode::VALUES)
                .default("Disabled"),
        )
        .build()?;
    let opensearch = Schema::strict("opensearch_configuration")
        .field(FieldDescriptor::string("domain_arn").required().pattern(ARN_PATTERN))
        .field(FieldDescriptor::string("index_name").required().length(1, 80))
        .field(FieldDescriptor::string("role_arn").required().pattern(ARN_PATTERN))
        .field(
            FieldDescriptor::string("index_rotation_period")
                .one_of(IndexRotationPeriod::VALUES)
                .default("OneDay"),
        )
        .field(FieldDescriptor::integer("buffering_size").range(1, 100).default(5))
        .field(FieldDescriptor::integer("buffering_interval").range(0, 900).default(300))
        .build()?;
    let http_endpoint = Schema::strict("http_endpoint_configuration")
        .field(FieldDescriptor::string("url").required().pattern(r"https://.+"))
        .field(FieldDescriptor::string("name").length(1, 256))
        .field(FieldDescriptor::string("access_key").max_length(4096))
        .field(FieldDescriptor::string("role_arn").required().pattern(ARN_PATTERN))
        .field(FieldDescriptor::integer("buffering_size").range(1, 64).default(5))
        .field(FieldDescriptor::integer("buffering_interval").range(0, 900).default(300))
        .build()?;
    let splunk = Schema::strict("splunk_configuration")
        .field(FieldDescriptor::string("hec_endpoint").required().pattern(r"https?://.+"))
        .field(FieldDescriptor::string("hec_token").required().length(1, 2048))
        .field(
            FieldDescriptor::string("hec_endpoint_type")
                .one_of(HecEndpointType::VALUES)
                .default("Raw"),
        )
        .field(
            FieldDescriptor::integer("hec_acknowledgment_timeout")
                .range(180, 600)
                .default(600),
        )
        .build()?;
    let server_side_encryption = Schema::strict("server_side_encryption")
        .field(FieldDescriptor::boolean("enabled").default(false))
        .field(
            FieldDescriptor::string("key_type")
                .one_of(SseKeyType::VALUES)
                .default("AWS_OWNED_CMK"),
        )
        .field(FieldDescriptor::string("key_arn").pattern(ARN_PATTERN))
        .build()?;

    Schema::strict(FirehoseDeliveryStream::KIND)
        .field(
            FieldDescriptor::string("name")
                .required()
                .pattern(r"[a-zA-Z0-9._-]+")
                .length(1, 64),
        )
        .field(
            FieldDescriptor::string("destination")
                .required()
                .one_of(Destination::VALUES),
        )
        .field(FieldDescriptor::object("kinesis_source_configuration", kinesis_source))
        .field(FieldDescriptor::object("extended_s3_configuration", extended_s3))
        .field(FieldDescriptor::object("redshift_configuration", redshift))
        .field(FieldDescriptor::object("opensearch_configuration", opensearch))
        .field(FieldDescriptor::object("http_endpoint_configuration", http_endpoint))
        .field(FieldDescriptor::object("splunk_configuration", splunk))
        .field(FieldDescriptor::object("server_side_encryption", server_side_encryption))
        .field(FieldDescriptor::tags())
        .build()
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KinesisSourceConfiguration {
    pub kinesis_stream_arn: String,
    pub role_arn: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtendedS3Configuration {
    pub bucket_arn: String,
    pub role_arn: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_output_prefix: Option<String>,
    /// Buffer size in MB
    pub buffering_size: i64,
    /// Buffer interval in seconds
    pub buffering_interval: i64,
    pub compression_format: CompressionFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kms_key_arn: Option<String>,
    pub dynamic_partitioning_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedshiftConfiguration {
    pub cluster_jdbcurl: String,
    pub username: String,
    pub password: String,
    pub data_table_name: String,
    pub role_arn: String,
    pub s3_backup_mode: S3BackupMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenSearchConfiguration {
    pub domain_arn: String,
    pub index_name: String,
    pub role_arn: String,
    pub index_rotation_period: IndexRotationPeriod,
    pub buffering_size: i64,
    pub buffering_interval: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpEndpointConfiguration {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_key: Option<String>,
    pub role_arn: String,
    pub buffering_size: i64,
    pub buffering_interval: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplunkConfiguration {
    pub hec_endpoint: String,
    pub hec_token: String,
    pub hec_endpoint_type: HecEndpointType,
    /// Seconds
    pub hec_acknowledgment_timeout: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryStreamEncryption {
    pub enabled: bool,
    pub key_type: SseKeyType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_arn: Option<String>,
}

/// Attributes of an `aws_kinesis_firehose_delivery_stream`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirehoseDeliveryStream {
    pub name: String,
    pub destination: Destination,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kinesis_source_configuration: Option<KinesisSourceConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extended_s3_configuration: Option<ExtendedS3Configuration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redshift_configuration: Option<RedshiftConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opensearch_configuration: Option<OpenSearchConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_endpoint_configuration: Option<HttpEndpointConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub splunk_configuration: Option<SplunkConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_side_encryption: Option<DeliveryStreamEncryption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
}

impl ResourceAttributes for FirehoseDeliveryStream {
    const KIND: &'static str = "aws_kinesis_firehose_delivery_stream";

    fn schema() -> SchemaResult<&'static Schema> {
        SCHEMA.get()
    }

    fn validate(&self) -> ValidationResult<()> {
        check_tags(self.tags.as_ref())?;

        let reason = format!("destination is {}", self.destination);
        for (destination, present) in self.destination_blocks() {
            let attribute = destination.configuration_attribute();
            if destination == self.destination {
                require_if(true, attribute, present, &reason)?;
            } else {
                forbid_if(true, attribute, present, &reason)?;
            }
        }

        if let Some(encryption) = &self.server_side_encryption {
            let customer_managed = encryption.key_type == SseKeyType::CustomerManaged;
            let has_key = encryption.key_arn.is_some();
            require_if(
                customer_managed,
                "server_side_encryption.key_arn",
                has_key,
                "key_type is CUSTOMER_MANAGED_CMK",
            )?;
            forbid_if(
                !customer_managed,
                "server_side_encryption.key_arn",
                has_key,
                "key_type is AWS_OWNED_CMK",
            )?;
            if encryption.enabled && self.kinesis_source_configuration.is_some() {
                return Err(ValidationError::cross_field(
                    ["server_side_encryption.enabled", "kinesis_source_configuration"],
                    "server-side encryption cannot be enabled when reading from a Kinesis stream",
                ));
            }
        }

        if let Some(s3) = &self.extended_s3_configuration {
            if s3.dynamic_partitioning_enabled
                && s3.buffering_size < DYNAMIC_PARTITIONING_MIN_BUFFER_MB
            {
                return Err(ValidationError::cross_field(
                    [
                        "extended_s3_configuration.dynamic_partitioning_enabled",
                        "extended_s3_configuration.buffering_size",
                    ],
                    format!(
                        "dynamic partitioning requires a buffering_size of at least {} MB",
                        DYNAMIC_PARTITIONING_MIN_BUFFER_MB
                    ),
                ));
            }
            let has_expressions = s3.prefix.as_deref().is_some_and(|p| p.contains("!{"));
            require_if(
                has_expressions,
                "extended_s3_configuration.error_output_prefix",
                s3.error_output_prefix.is_some(),
                "prefix contains expressions",
            )?;
        }

        Ok(())
    }

    fn properties(&self) -> ComputedProperties {
        ComputedProperties::new()
            .with("destination_type", self.destination.as_str())
            .with("source_type", self.source_type())
            .with("is_encrypted", self.is_encrypted())
            .with("buffer_size_mb", self.buffer_size_mb())
            .with("buffer_interval_seconds", self.buffer_interval_seconds())
            .with("is_compressed", self.is_compressed())
            .with("ingestion_cost_per_gb", self.ingestion_cost_per_gb())
    }

    fn advisories(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if let Some(redshift) = &self.redshift_configuration {
            if redshift.s3_backup_mode == S3BackupMode::Disabled {
                warnings.push("Redshift delivery has no S3 backup of source records".to_string());
            }
        }
        if self.destination == Destination::ExtendedS3 && !self.is_compressed() {
            warnings.push("S3 delivery is uncompressed".to_string());
        }
        warnings
    }
}

impl FirehoseDeliveryStream {
    fn destination_blocks(&self) -> [(Destination, bool); 5] {
        [
            (Destination::ExtendedS3, self.extended_s3_configuration.is_some()),
            (Destination::Redshift, self.redshift_configuration.is_some()),
            (Destination::OpenSearch, self.opensearch_configuration.is_some()),
            (Destination::HttpEndpoint, self.http_endpoint_configuration.is_some()),
            (Destination::Splunk, self.splunk_configuration.is_some()),
        ]
    }

    /// `kinesis_stream` or `direct_put`.
    pub fn source_type(&self) -> &'static str {
        if self.kinesis_source_configuration.is_some() {
            "kinesis_stream"
        } else {
            "direct_put"
        }
    }

    pub fn is_encrypted(&self) -> bool {
        self.server_side_encryption
            .as_ref()
            .is_some_and(|encryption| encryption.enabled)
    }

    /// Buffer size of the active destination. Redshift and Splunk buffer
    /// through the service defaults and report `None`.
    pub fn buffer_size_mb(&self) -> Option<i64> {
        match self.destination {
            Destination::ExtendedS3 => self.extended_s3_configuration.as_ref().map(|c| c.buffering_size),
            Destination::OpenSearch => self.opensearch_configuration.as_ref().map(|c| c.buffering_size),
            Destination::HttpEndpoint => {
                self.http_endpoint_configuration.as_ref().map(|c| c.buffering_size)
            }
            Destination::Redshift | Destination::Splunk => None,
        }
    }

    pub fn buffer_interval_seconds(&self) -> Option<i64> {
        match self.destination {
            Destination::ExtendedS3 => {
                self.extended_s3_configuration.as_ref().map(|c| c.buffering_interval)
            }
            Destination::OpenSearch => {
                self.opensearch_configuration.as_ref().map(|c| c.buffering_interval)
            }
            Destination::HttpEndpoint => {
                self.http_endpoint_configuration.as_ref().map(|c| c.buffering_interval)
            }
            Destination::Redshift | Destination::Splunk => None,
        }
    }

    pub fn is_compressed(&self) -> bool {
        self.extended_s3_configuration
            .as_ref()
            .is_some_and(|s3| s3.compression_format != CompressionFormat::Uncompressed)
    }

    fn has_dynamic_partitioning(&self) -> bool {
        self.extended_s3_configuration
            .as_ref()
            .is_some_and(|s3| s3.dynamic_partitioning_enabled)
    }

    pub fn ingestion_cost_per_gb(&self) -> f64 {
        if self.has_dynamic_partitioning() {
            INGESTION_PRICE_PER_GB + DYNAMIC_PARTITIONING_PRICE_PER_GB
        } else {
            INGESTION_PRICE_PER_GB
        }
    }

    /// Ingestion cost for `gigabytes` of delivered data.
    pub fn estimated_cost_for_volume(&self, gigabytes: f64) -> f64 {
        round_currency(self.ingestion_cost_per_gb() * gigabytes)
    }
}

//! Lambda functions and layer versions.

use crate::error::{SchemaResult, ValidationError, ValidationResult};
use crate::resource::value_objects::rules::{exactly_one_of, forbid_if, require_if, unique_by};
use crate::resource::value_objects::{Tags, check_tags};
use crate::resource::{
    ComputedProperties, ResourceAttributes, round_currency, sorted_distinct, string_enum,
};
use crate::schema::{FieldDescriptor, Schema, SchemaCell};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Price per GB-second on x86_64
pub const X86_GB_SECOND_PRICE: f64 = 0.000_016_666_7;
/// Price per GB-second on arm64
pub const ARM_GB_SECOND_PRICE: f64 = 0.000_013_333_4;
/// Price per million requests
pub const REQUEST_PRICE_PER_MILLION: f64 = 0.20;

const MAX_TIMEOUT_SECONDS: i64 = 900;
const JVM_MINIMUM_MEMORY_MB: i64 = 512;

const ROLE_ARN_PATTERN: &str = r"arn:aws[a-zA-Z-]*:iam::\d{12}:role/[\w+=,.@/-]+";
const LAYER_ARN_PATTERN: &str = r"arn:aws[a-zA-Z-]*:lambda:[a-z0-9-]+:\d{12}:layer:[a-zA-Z0-9_-]+:\d+";

string_enum! {
    pub enum PackageType {
        Zip => "Zip",
        Image => "Image",
    }
}

string_enum! {
    pub enum Architecture {
        X86 => "x86_64",
        Arm64 => "arm64",
    }
}

string_enum! {
    pub enum Runtime {
        Nodejs18 => "nodejs18.x",
        Nodejs20 => "nodejs20.x",
        Nodejs22 => "nodejs22.x",
        Python39 => "python3.9",
        Python310 => "python3.10",
        Python311 => "python3.11",
        Python312 => "python3.12",
        Python313 => "python3.13",
        Java8Al2 => "java8.al2",
        Java11 => "java11",
        Java17 => "java17",
        Java21 => "java21",
        Dotnet6 => "dotnet6",
        Dotnet8 => "dotnet8",
        Ruby32 => "ruby3.2",
        Ruby33 => "ruby3.3",
        Go1 => "go1.x",
        ProvidedAl2 => "provided.al2",
        ProvidedAl2023 => "provided.al2023",
    }
}

impl Runtime {
    /// Language family, e.g. `python` for `python3.12`.
    pub fn family(&self) -> &'static str {
        let name = self.as_str();
        let end = name
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(name.len());
        &name[..end]
    }

    pub fn is_jvm(&self) -> bool {
        self.family() == "java"
    }
}

string_enum! {
    pub enum TracingMode {
        Active => "Active",
        PassThrough => "PassThrough",
    }
}

/// Where the deployment package comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentSource {
    Local,
    S3,
    Image,
}

impl DeploymentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::S3 => "s3",
            Self::Image => "image",
        }
    }
}

static FUNCTION_SCHEMA: SchemaCell = SchemaCell::new(|| {
    let ephemeral_storage = Schema::strict("ephemeral_storage")
        .field(FieldDescriptor::integer("size").required().range(512, 10_240))
        .build()?;
    let environment = Schema::strict("environment")
        .field(FieldDescriptor::string_map("variables"))
        .build()?;
    let vpc_config = Schema::strict("vpc_config")
        .field(FieldDescriptor::string_array("subnet_ids").required().min_items(1))
        .field(
            FieldDescriptor::string_array("security_group_ids")
                .required()
                .min_items(1),
        )
        .build()?;
    let dead_letter_config = Schema::strict("dead_letter_config")
        .field(
            FieldDescriptor::string("target_arn")
                .required()
                .pattern(r"arn:aws[a-zA-Z-]*:(sqs|sns):.+"),
        )
        .build()?;
    let tracing_config = Schema::strict("tracing_config")
        .field(FieldDescriptor::string("mode").required().one_of(TracingMode::VALUES))
        .build()?;

    Schema::strict(LambdaFunction::KIND)
        .field(
            FieldDescriptor::string("function_name")
                .required()
                .pattern(r"[a-zA-Z0-9_-]+")
                .length(1, 64),
        )
        .field(FieldDescriptor::string("role").required().pattern(ROLE_ARN_PATTERN))
        .field(
            FieldDescriptor::string("package_type")
                .one_of(PackageType::VALUES)
                .default("Zip"),
        )
        .field(FieldDescriptor::string("runtime").one_of(Runtime::VALUES))
        .field(FieldDescriptor::string("handler").length(1, 128))
        .field(FieldDescriptor::string("filename"))
        .field(FieldDescriptor::string("s3_bucket"))
        .field(FieldDescriptor::string("s3_key"))
        .field(FieldDescriptor::string("s3_object_version"))
        .field(FieldDescriptor::string("image_uri"))
        .field(
            FieldDescriptor::integer("memory_size")
                .range(128, 10_240)
                .default(128),
        )
        .field(
            FieldDescriptor::integer("timeout")
                .range(1, MAX_TIMEOUT_SECONDS)
                .default(3),
        )
        .field(
            FieldDescriptor::string_array("architectures")
                .one_of(Architecture::VALUES)
                .items(1, 1)
                .default(serde_json::json!(["x86_64"])),
        )
        .field(FieldDescriptor::object("ephemeral_storage", ephemeral_storage))
        .field(FieldDescriptor::object("environment", environment))
        .field(
            FieldDescriptor::integer("reserved_concurrent_executions")
                .at_least(-1)
                .default(-1),
        )
        .field(FieldDescriptor::boolean("publish").default(false))
        .field(
            FieldDescriptor::string_array("layers")
                .pattern(LAYER_ARN_PATTERN)
                .max_items(5),
        )
        .field(FieldDescriptor::object("vpc_config", vpc_config))
        .field(FieldDescriptor::object("dead_letter_config", dead_letter_config))
        .field(FieldDescriptor::object("tracing_config", tracing_config))
        .field(FieldDescriptor::string("kms_key_arn"))
        .field(FieldDescriptor::tags())
        .build()
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EphemeralStorage {
    pub size: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VpcConfig {
    pub subnet_ids: Vec<String>,
    pub security_group_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetterConfig {
    pub target_arn: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TracingConfig {
    pub mode: TracingMode,
}

/// Attributes of an `aws_lambda_function`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LambdaFunction {
    pub function_name: String,
    pub role: String,
    pub package_type: PackageType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<Runtime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3_bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3_object_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_uri: Option<String>,
    /// Memory in MB
    pub memory_size: i64,
    /// Timeout in seconds
    pub timeout: i64,
    pub architectures: Vec<Architecture>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ephemeral_storage: Option<EphemeralStorage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
    pub reserved_concurrent_executions: i64,
    pub publish: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layers: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_config: Option<VpcConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dead_letter_config: Option<DeadLetterConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracing_config: Option<TracingConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kms_key_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
}

impl ResourceAttributes for LambdaFunction {
    const KIND: &'static str = "aws_lambda_function";

    fn schema() -> SchemaResult<&'static Schema> {
        FUNCTION_SCHEMA.get()
    }

    fn validate(&self) -> ValidationResult<()> {
        check_tags(self.tags.as_ref())?;

        match self.package_type {
            PackageType::Zip => {
                let zip = "package_type is Zip";
                exactly_one_of(&[
                    ("filename", self.filename.is_some()),
                    ("s3_bucket", self.s3_bucket.is_some()),
                ])?;
                check_s3_location(&self.s3_bucket, &self.s3_key)?;
                require_if(true, "runtime", self.runtime.is_some(), zip)?;
                require_if(true, "handler", self.handler.is_some(), zip)?;
                forbid_if(true, "image_uri", self.image_uri.is_some(), zip)?;
            }
            PackageType::Image => {
                let image = "package_type is Image";
                require_if(true, "image_uri", self.image_uri.is_some(), image)?;
                forbid_if(true, "filename", self.filename.is_some(), image)?;
                forbid_if(true, "s3_bucket", self.s3_bucket.is_some(), image)?;
                forbid_if(true, "s3_key", self.s3_key.is_some(), image)?;
                forbid_if(true, "runtime", self.runtime.is_some(), image)?;
                forbid_if(true, "handler", self.handler.is_some(), image)?;
            }
        }

        if self.runtime == Some(Runtime::Go1) && self.is_arm() {
            return Err(ValidationError::cross_field(
                ["runtime", "architectures"],
                "the go1.x runtime does not support arm64",
            ));
        }

        require_if(
            self.kms_key_arn.is_some(),
            "environment",
            self.environment.is_some(),
            "kms_key_arn is set",
        )?;

        Ok(())
    }

    fn properties(&self) -> ComputedProperties {
        ComputedProperties::new()
            .with("architecture", self.architecture().as_str())
            .with("is_arm", self.is_arm())
            .with("deployment_source", self.deployment_source().as_str())
            .with("memory_gb", self.memory_gb())
            .with("has_vpc", self.has_vpc())
            .with("has_dead_letter_queue", self.has_dead_letter_queue())
            .with("is_tracing_enabled", self.is_tracing_enabled())
            .with(
                "estimated_cost_per_million_invocations",
                self.estimated_cost_per_million_invocations(),
            )
    }

    fn advisories(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if let Some(runtime) = self.runtime {
            if runtime.is_jvm() && self.memory_size < JVM_MINIMUM_MEMORY_MB {
                warnings.push(format!(
                    "Runtime {} with {} MB of memory will start slowly; consider at least {} MB",
                    runtime, self.memory_size, JVM_MINIMUM_MEMORY_MB
                ));
            }
        }
        if self.reserved_concurrent_executions == 0 {
            warnings.push(
                "reserved_concurrent_executions is 0, so the function cannot be invoked".to_string(),
            );
        }
        if self.timeout == MAX_TIMEOUT_SECONDS {
            warnings.push(format!(
                "timeout is at the maximum of {MAX_TIMEOUT_SECONDS} seconds"
            ));
        }
        warnings
    }
}

impl LambdaFunction {
    pub fn architecture(&self) -> Architecture {
        self.architectures
            .first()
            .copied()
            .unwrap_or(Architecture::X86)
    }

    pub fn is_arm(&self) -> bool {
        self.architecture() == Architecture::Arm64
    }

    pub fn deployment_source(&self) -> DeploymentSource {
        deployment_source(self.image_uri.is_some(), self.s3_bucket.is_some())
    }

    pub fn memory_gb(&self) -> f64 {
        self.memory_size as f64 / 1024.0
    }

    pub fn has_vpc(&self) -> bool {
        self.vpc_config.is_some()
    }

    pub fn has_dead_letter_queue(&self) -> bool {
        self.dead_letter_config.is_some()
    }

    pub fn is_tracing_enabled(&self) -> bool {
        self.tracing_config
            .as_ref()
            .is_some_and(|config| config.mode == TracingMode::Active)
    }

    /// Cost of one million invocations that each run for the full timeout.
    pub fn estimated_cost_per_million_invocations(&self) -> f64 {
        let rate = if self.is_arm() {
            ARM_GB_SECOND_PRICE
        } else {
            X86_GB_SECOND_PRICE
        };
        let compute = self.memory_gb() * self.timeout as f64 * 1_000_000.0 * rate;
        round_currency(compute + REQUEST_PRICE_PER_MILLION)
    }
}

fn deployment_source(image: bool, s3: bool) -> DeploymentSource {
    if image {
        DeploymentSource::Image
    } else if s3 {
        DeploymentSource::S3
    } else {
        DeploymentSource::Local
    }
}

fn check_s3_location(bucket: &Option<String>, key: &Option<String>) -> ValidationResult<()> {
    require_if(bucket.is_some(), "s3_key", key.is_some(), "s3_bucket is set")?;
    require_if(key.is_some(), "s3_bucket", bucket.is_some(), "s3_key is set")
}

static LAYER_SCHEMA: SchemaCell = SchemaCell::new(|| {
    Schema::strict(LambdaLayerVersion::KIND)
        .field(
            FieldDescriptor::string("layer_name")
                .required()
                .pattern(r"[a-zA-Z0-9_-]+")
                .length(1, 140),
        )
        .field(FieldDescriptor::string("filename"))
        .field(FieldDescriptor::string("s3_bucket"))
        .field(FieldDescriptor::string("s3_key"))
        .field(FieldDescriptor::string("s3_object_version"))
        .field(
            FieldDescriptor::string_array("compatible_runtimes")
                .one_of(Runtime::VALUES)
                .max_items(15),
        )
        .field(
            FieldDescriptor::string_array("compatible_architectures")
                .one_of(Architecture::VALUES)
                .max_items(2),
        )
        .field(FieldDescriptor::string("description").max_length(256))
        .field(FieldDescriptor::string("license_info").max_length(512))
        .field(FieldDescriptor::boolean("skip_destroy").default(false))
        .build()
});

/// Attributes of an `aws_lambda_layer_version`.
///
/// `compatible_architectures` is not de-duplicated before its size check:
/// `["x86_64", "arm64", "arm64"]` is rejected as three entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LambdaLayerVersion {
    pub layer_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3_bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3_object_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compatible_runtimes: Option<Vec<Runtime>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compatible_architectures: Option<Vec<Architecture>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_info: Option<String>,
    pub skip_destroy: bool,
}

impl ResourceAttributes for LambdaLayerVersion {
    const KIND: &'static str = "aws_lambda_layer_version";

    fn schema() -> SchemaResult<&'static Schema> {
        LAYER_SCHEMA.get()
    }

    fn validate(&self) -> ValidationResult<()> {
        exactly_one_of(&[
            ("filename", self.filename.is_some()),
            ("s3_bucket", self.s3_bucket.is_some()),
        ])?;
        check_s3_location(&self.s3_bucket, &self.s3_key)?;

        if let Some(architectures) = &self.compatible_architectures {
            unique_by("compatible_architectures", architectures, |a| a.as_str())?;
        }
        if let Some(runtimes) = &self.compatible_runtimes {
            unique_by("compatible_runtimes", runtimes, |r| r.as_str())?;
        }

        Ok(())
    }

    fn properties(&self) -> ComputedProperties {
        ComputedProperties::new()
            .with("architectures", self.architectures())
            .with("supports_arm", self.supports_arm())
            .with("supports_all_architectures", self.supports_all_architectures())
            .with("runtime_families", self.runtime_families())
            .with("deployment_source", self.deployment_source().as_str())
    }
}

impl LambdaLayerVersion {
    /// Declared architectures, sorted and de-duplicated.
    pub fn architectures(&self) -> Vec<String> {
        sorted_distinct(
            self.compatible_architectures
                .iter()
                .flatten()
                .map(Architecture::as_str),
        )
    }

    pub fn supports_arm(&self) -> bool {
        self.compatible_architectures
            .iter()
            .flatten()
            .any(|a| *a == Architecture::Arm64)
    }

    pub fn supports_all_architectures(&self) -> bool {
        self.architectures().len() == Architecture::VALUES.len()
    }

    /// Language families of the compatible runtimes, sorted and de-duplicated.
    pub fn runtime_families(&self) -> Vec<String> {
        sorted_distinct(
            self.compatible_runtimes
                .iter()
                .flatten()
                .map(Runtime::family),
        )
    }

    pub fn deployment_source(&self) -> DeploymentSource {
        deployment_source(false, self.s3_bucket.is_some())
    }
}

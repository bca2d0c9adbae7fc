//! S3 buckets.
//!
//! The bucket schema is lax at every level: keys it does not know are dropped
//! from the canonical map instead of rejected.

use crate::error::{SchemaResult, ValidationError, ValidationResult};
use crate::resource::value_objects::rules::{at_most_one_of, forbid_if, require_if, unique_by};
use crate::resource::value_objects::{Tags, check_tags};
use crate::resource::{ComputedProperties, ResourceAttributes, sorted_distinct, string_enum};
use crate::schema::{FieldDescriptor, Schema, SchemaCell};
use serde::{Deserialize, Serialize};

const INFREQUENT_ACCESS_MINIMUM_DAYS: i64 = 30;

string_enum! {
    pub enum ObjectLock {
        Enabled => "Enabled",
        Disabled => "Disabled",
    }
}

string_enum! {
    pub enum SseAlgorithm {
        Aes256 => "AES256",
        Kms => "aws:kms",
        KmsDsse => "aws:kms:dsse",
    }
}

string_enum! {
    pub enum StorageClass {
        StandardIa => "STANDARD_IA",
        OnezoneIa => "ONEZONE_IA",
        IntelligentTiering => "INTELLIGENT_TIERING",
        Glacier => "GLACIER",
        GlacierIr => "GLACIER_IR",
        DeepArchive => "DEEP_ARCHIVE",
    }
}

string_enum! {
    pub enum CannedAcl {
        Private => "private",
        PublicRead => "public-read",
        PublicReadWrite => "public-read-write",
        AuthenticatedRead => "authenticated-read",
        LogDeliveryWrite => "log-delivery-write",
    }
}

impl CannedAcl {
    pub fn is_public(&self) -> bool {
        matches!(self, Self::PublicRead | Self::PublicReadWrite)
    }
}

static SCHEMA: SchemaCell = SchemaCell::new(|| {
    let versioning = Schema::lax("versioning")
        .field(FieldDescriptor::boolean("enabled").default(false))
        .field(FieldDescriptor::boolean("mfa_delete").default(false))
        .build()?;
    let encryption = Schema::lax("server_side_encryption")
        .field(
            FieldDescriptor::string("sse_algorithm")
                .required()
                .one_of(SseAlgorithm::VALUES),
        )
        .field(FieldDescriptor::string("kms_master_key_id"))
        .field(FieldDescriptor::boolean("bucket_key_enabled").default(false))
        .build()?;
    let transition = Schema::lax("transition")
        .field(FieldDescriptor::integer("days").required().at_least(0))
        .field(
            FieldDescriptor::string("storage_class")
                .required()
                .one_of(StorageClass::VALUES),
        )
        .build()?;
    let lifecycle_rule = Schema::lax("lifecycle_rule")
        .field(FieldDescriptor::string("id").required().length(1, 255))
        .field(FieldDescriptor::boolean("enabled").required())
        .field(FieldDescriptor::string("prefix"))
        .field(FieldDescriptor::integer("expiration_days").at_least(1))
        .field(FieldDescriptor::integer("noncurrent_version_expiration_days").at_least(1))
        .field(FieldDescriptor::object_array("transitions", transition))
        .field(FieldDescriptor::integer("abort_incomplete_multipart_upload_days").at_least(1))
        .build()?;
    let public_access_block = Schema::lax("public_access_block")
        .field(FieldDescriptor::boolean("block_public_acls").default(true))
        .field(FieldDescriptor::boolean("block_public_policy").default(true))
        .field(FieldDescriptor::boolean("ignore_public_acls").default(true))
        .field(FieldDescriptor::boolean("restrict_public_buckets").default(true))
        .build()?;
    let logging = Schema::lax("logging")
        .field(FieldDescriptor::string("target_bucket").required())
        .field(FieldDescriptor::string("target_prefix"))
        .build()?;

    Schema::lax(S3Bucket::KIND)
        .field(FieldDescriptor::string("bucket").pattern(r"[a-z0-9][a-z0-9.-]{1,61}[a-z0-9]"))
        .field(FieldDescriptor::string("bucket_prefix").length(1, 37))
        .field(FieldDescriptor::boolean("force_destroy").default(false))
        .field(FieldDescriptor::string("object_lock_enabled").one_of(ObjectLock::VALUES))
        .field(FieldDescriptor::object("versioning", versioning))
        .field(FieldDescriptor::object("server_side_encryption", encryption))
        .field(FieldDescriptor::object_array("lifecycle_rules", lifecycle_rule))
        .field(FieldDescriptor::object("public_access_block", public_access_block))
        .field(FieldDescriptor::string("acl").one_of(CannedAcl::VALUES))
        .field(FieldDescriptor::object("logging", logging))
        .field(FieldDescriptor::tags())
        .build()
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Versioning {
    pub enabled: bool,
    pub mfa_delete: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSideEncryption {
    pub sse_algorithm: SseAlgorithm,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kms_master_key_id: Option<String>,
    pub bucket_key_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub days: i64,
    pub storage_class: StorageClass,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleRule {
    pub id: String,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_days: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noncurrent_version_expiration_days: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transitions: Option<Vec<Transition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abort_incomplete_multipart_upload_days: Option<i64>,
}

impl LifecycleRule {
    fn transitions(&self) -> &[Transition] {
        self.transitions.as_deref().unwrap_or_default()
    }

    fn has_action(&self) -> bool {
        self.expiration_days.is_some()
            || self.noncurrent_version_expiration_days.is_some()
            || !self.transitions().is_empty()
            || self.abort_incomplete_multipart_upload_days.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicAccessBlock {
    pub block_public_acls: bool,
    pub block_public_policy: bool,
    pub ignore_public_acls: bool,
    pub restrict_public_buckets: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Logging {
    pub target_bucket: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_prefix: Option<String>,
}

/// Attributes of an `aws_s3_bucket`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct S3Bucket {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket_prefix: Option<String>,
    pub force_destroy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_lock_enabled: Option<ObjectLock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub versioning: Option<Versioning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_side_encryption: Option<ServerSideEncryption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifecycle_rules: Option<Vec<LifecycleRule>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_access_block: Option<PublicAccessBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acl: Option<CannedAcl>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<Logging>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
}

impl ResourceAttributes for S3Bucket {
    const KIND: &'static str = "aws_s3_bucket";

    fn schema() -> SchemaResult<&'static Schema> {
        SCHEMA.get()
    }

    fn validate(&self) -> ValidationResult<()> {
        check_tags(self.tags.as_ref())?;

        at_most_one_of(&[
            ("bucket", self.bucket.is_some()),
            ("bucket_prefix", self.bucket_prefix.is_some()),
        ])?;

        if self.is_object_lock_enabled() && !self.is_versioned() {
            return Err(ValidationError::cross_field(
                ["object_lock_enabled", "versioning.enabled"],
                "Object lock requires versioning to be enabled",
            ));
        }

        if let Some(versioning) = &self.versioning {
            require_if(
                versioning.mfa_delete,
                "versioning.enabled",
                versioning.enabled,
                "versioning.mfa_delete is true",
            )?;
        }

        if let Some(encryption) = &self.server_side_encryption {
            forbid_if(
                encryption.sse_algorithm == SseAlgorithm::Aes256,
                "server_side_encryption.kms_master_key_id",
                encryption.kms_master_key_id.is_some(),
                "sse_algorithm is AES256",
            )?;
        }

        self.validate_lifecycle_rules()?;

        if let (Some(acl), Some(block)) = (self.acl, &self.public_access_block) {
            if acl.is_public() && block.block_public_acls {
                return Err(ValidationError::cross_field(
                    ["acl", "public_access_block.block_public_acls"],
                    format!("acl '{acl}' cannot be applied while public ACLs are blocked"),
                ));
            }
        }

        Ok(())
    }

    fn properties(&self) -> ComputedProperties {
        ComputedProperties::new()
            .with("is_versioned", self.is_versioned())
            .with("is_object_lock_enabled", self.is_object_lock_enabled())
            .with("is_encrypted", self.is_encrypted())
            .with("encryption_type", self.encryption_type())
            .with("lifecycle_rule_count", self.lifecycle_rule_count())
            .with("enabled_lifecycle_rule_count", self.enabled_lifecycle_rule_count())
            .with("storage_classes_used", self.storage_classes_used())
            .with("is_public", self.is_public())
            .with("has_logging", self.has_logging())
    }

    fn advisories(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !self.is_versioned() {
            warnings.push("Versioning is disabled; deleted objects cannot be recovered".to_string());
        }
        if !self.is_encrypted() {
            warnings.push("No server-side encryption configuration is declared".to_string());
        }
        if self.is_public() {
            warnings.push("Bucket ACL grants public access".to_string());
        }
        warnings
    }
}

impl S3Bucket {
    fn validate_lifecycle_rules(&self) -> ValidationResult<()> {
        let rules = self.lifecycle_rules();
        unique_by("lifecycle_rules", rules, |rule| rule.id.as_str())?;

        for (index, rule) in rules.iter().enumerate() {
            let path = format!("lifecycle_rules[{index}]");
            if !rule.has_action() {
                return Err(ValidationError::cross_field(
                    [path],
                    "a lifecycle rule needs at least one expiration, transition or abort action",
                ));
            }

            for (position, transition) in rule.transitions().iter().enumerate() {
                let transition_path = format!("{path}.transitions[{position}].days");
                let infrequent = matches!(
                    transition.storage_class,
                    StorageClass::StandardIa | StorageClass::OnezoneIa
                );
                if infrequent && transition.days < INFREQUENT_ACCESS_MINIMUM_DAYS {
                    return Err(ValidationError::cross_field(
                        [transition_path],
                        format!(
                            "transitions to {} require at least {} days",
                            transition.storage_class, INFREQUENT_ACCESS_MINIMUM_DAYS
                        ),
                    ));
                }
                if let Some(expiration) = rule.expiration_days {
                    if transition.days >= expiration {
                        return Err(ValidationError::cross_field(
                            [transition_path, format!("{path}.expiration_days")],
                            "transitions must happen before expiration",
                        ));
                    }
                }
            }
        }

        Ok(())
    }

    fn lifecycle_rules(&self) -> &[LifecycleRule] {
        self.lifecycle_rules.as_deref().unwrap_or_default()
    }

    pub fn is_versioned(&self) -> bool {
        self.versioning.as_ref().is_some_and(|v| v.enabled)
    }

    pub fn is_object_lock_enabled(&self) -> bool {
        self.object_lock_enabled == Some(ObjectLock::Enabled)
    }

    pub fn is_encrypted(&self) -> bool {
        self.server_side_encryption.is_some()
    }

    /// Declared SSE algorithm, or `none`.
    pub fn encryption_type(&self) -> &'static str {
        self.server_side_encryption
            .as_ref()
            .map_or("none", |sse| sse.sse_algorithm.as_str())
    }

    pub fn lifecycle_rule_count(&self) -> usize {
        self.lifecycle_rules().len()
    }

    pub fn enabled_lifecycle_rule_count(&self) -> usize {
        self.lifecycle_rules().iter().filter(|rule| rule.enabled).count()
    }

    /// Storage classes targeted by any transition, sorted and de-duplicated.
    pub fn storage_classes_used(&self) -> Vec<String> {
        sorted_distinct(
            self.lifecycle_rules()
                .iter()
                .flat_map(LifecycleRule::transitions)
                .map(|transition| transition.storage_class.as_str()),
        )
    }

    pub fn is_public(&self) -> bool {
        self.acl.is_some_and(|acl| acl.is_public())
    }

    pub fn has_logging(&self) -> bool {
        self.logging.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResourceError;
    use crate::resource::BuiltResource;
    use serde_json::json;

    #[test]
    fn test_object_lock_requires_versioning() {
        let result = S3Bucket::build(&json!({"object_lock_enabled": "Enabled"}));
        match result {
            Err(ResourceError::Validation(err)) => {
                assert!(err.is_cross_field());
                assert!(err
                    .to_string()
                    .contains("Object lock requires versioning to be enabled"));
            }
            other => panic!("unexpected result {:?}", other),
        }

        let bucket = S3Bucket::build(&json!({
            "object_lock_enabled": "Enabled",
            "versioning": {"enabled": true}
        }))
        .unwrap();
        assert!(bucket.is_object_lock_enabled());
        assert!(bucket.is_versioned());
    }

    #[test]
    fn test_unknown_keys_dropped() {
        let bucket = S3Bucket::build(&json!({
            "bucket": "my-logs",
            "website": {"index_document": "index.html"},
            "versioning": {"enabled": true, "extra": 1}
        }))
        .unwrap();
        let map = bucket.to_canonical_map();
        assert!(!map.contains_key("website"));
        assert_eq!(map["versioning"], json!({"enabled": true, "mfa_delete": false}));
    }

    #[test]
    fn test_bucket_and_prefix_exclusive() {
        let result = S3Bucket::build(&json!({"bucket": "logs-1", "bucket_prefix": "logs-"}));
        assert!(matches!(
            result,
            Err(ResourceError::Validation(ValidationError::MutuallyExclusive { .. }))
        ));
    }

    #[test]
    fn test_bucket_name_pattern() {
        assert!(S3Bucket::build(&json!({"bucket": "My_Bucket"})).is_err());
        assert!(S3Bucket::build(&json!({"bucket": "ab"})).is_err());
        assert!(S3Bucket::build(&json!({"bucket": "abc"})).is_ok());
    }

    #[test]
    fn test_kms_key_only_with_kms() {
        let result = S3Bucket::build(&json!({
            "server_side_encryption": {"sse_algorithm": "AES256", "kms_master_key_id": "alias/x"}
        }));
        assert!(result.is_err());
        let bucket = S3Bucket::build(&json!({
            "server_side_encryption": {"sse_algorithm": "aws:kms", "kms_master_key_id": "alias/x"}
        }))
        .unwrap();
        assert_eq!(bucket.encryption_type(), "aws:kms");
    }

    #[test]
    fn test_lifecycle_rules() {
        let result = S3Bucket::build(&json!({
            "lifecycle_rules": [
                {"id": "a", "enabled": true, "expiration_days": 30},
                {"id": "a", "enabled": true, "expiration_days": 60}
            ]
        }));
        assert!(matches!(
            result,
            Err(ResourceError::Validation(ValidationError::DuplicateValue { .. }))
        ));

        let result = S3Bucket::build(&json!({
            "lifecycle_rules": [{"id": "a", "enabled": true}]
        }));
        assert!(result.unwrap_err().to_string().contains("lifecycle_rules[0]"));

        let result = S3Bucket::build(&json!({
            "lifecycle_rules": [{
                "id": "a",
                "enabled": true,
                "transitions": [{"days": 10, "storage_class": "STANDARD_IA"}]
            }]
        }));
        assert!(result.unwrap_err().to_string().contains("30 days"));

        let result = S3Bucket::build(&json!({
            "lifecycle_rules": [{
                "id": "a",
                "enabled": true,
                "expiration_days": 90,
                "transitions": [{"days": 90, "storage_class": "GLACIER"}]
            }]
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_lifecycle_element_path() {
        let result = S3Bucket::build(&json!({
            "lifecycle_rules": [
                {"id": "a", "enabled": true, "expiration_days": 1},
                {"enabled": true}
            ]
        }));
        assert!(matches!(
            result,
            Err(ResourceError::Validation(ValidationError::MissingRequiredAttribute { ref attribute }))
                if attribute == "lifecycle_rules[1].id"
        ));
    }

    #[test]
    fn test_public_acl_blocked() {
        let result = S3Bucket::build(&json!({
            "acl": "public-read",
            "public_access_block": {}
        }));
        assert!(result.is_err());

        let bucket = S3Bucket::build(&json!({
            "acl": "public-read",
            "public_access_block": {"block_public_acls": false}
        }))
        .unwrap();
        assert!(bucket.is_public());
        assert!(bucket
            .warnings()
            .iter()
            .any(|w| w.contains("public access")));
    }

    #[test]
    fn test_computed_properties() {
        let bucket = S3Bucket::build(&json!({
            "bucket": "data-lake",
            "versioning": {"enabled": true},
            "server_side_encryption": {"sse_algorithm": "AES256"},
            "logging": {"target_bucket": "logs"},
            "lifecycle_rules": [
                {
                    "id": "archive",
                    "enabled": true,
                    "transitions": [
                        {"days": 90, "storage_class": "GLACIER"},
                        {"days": 30, "storage_class": "STANDARD_IA"}
                    ]
                },
                {
                    "id": "old",
                    "enabled": false,
                    "transitions": [{"days": 180, "storage_class": "GLACIER"}]
                }
            ]
        }))
        .unwrap();

        let properties = bucket.computed_properties();
        assert_eq!(properties.get_i64("lifecycle_rule_count"), Some(2));
        assert_eq!(properties.get_i64("enabled_lifecycle_rule_count"), Some(1));
        assert_eq!(
            properties.get("storage_classes_used"),
            Some(&json!(["GLACIER", "STANDARD_IA"]))
        );
        assert_eq!(properties.get_bool("has_logging"), Some(true));
        assert_eq!(properties.get("warnings"), Some(&json!([])));
    }
}

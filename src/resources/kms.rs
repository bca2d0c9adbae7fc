//! KMS keys.

use crate::error::{SchemaResult, ValidationError, ValidationResult};
use crate::resource::value_objects::rules::forbid_if;
use crate::resource::value_objects::{JsonDocument, Tags, check_tags};
use crate::resource::{ComputedProperties, ResourceAttributes, string_enum};
use crate::schema::{FieldDescriptor, Schema, SchemaCell};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Monthly price of one customer managed key
pub const KEY_MONTH_PRICE: f64 = 1.0;
/// Rotated key material is billed for at most this many additional versions.
pub const MAX_BILLED_ROTATIONS: i64 = 2;

const DEFAULT_ROTATION_PERIOD_DAYS: i64 = 365;
const DAYS_PER_YEAR: i64 = 365;

string_enum! {
    pub enum KeyUsage {
        EncryptDecrypt => "ENCRYPT_DECRYPT",
        SignVerify => "SIGN_VERIFY",
        GenerateVerifyMac => "GENERATE_VERIFY_MAC",
        KeyAgreement => "KEY_AGREEMENT",
    }
}

string_enum! {
    pub enum KeySpec {
        SymmetricDefault => "SYMMETRIC_DEFAULT",
        Rsa2048 => "RSA_2048",
        Rsa3072 => "RSA_3072",
        Rsa4096 => "RSA_4096",
        Hmac224 => "HMAC_224",
        Hmac256 => "HMAC_256",
        Hmac384 => "HMAC_384",
        Hmac512 => "HMAC_512",
        EccNistP256 => "ECC_NIST_P256",
        EccNistP384 => "ECC_NIST_P384",
        EccNistP521 => "ECC_NIST_P521",
        EccSecgP256k1 => "ECC_SECG_P256K1",
        Sm2 => "SM2",
    }
}

impl KeySpec {
    /// `symmetric`, `rsa`, `hmac`, `ecc` or `sm2`.
    pub fn family(&self) -> &'static str {
        match self {
            Self::SymmetricDefault => "symmetric",
            Self::Rsa2048 | Self::Rsa3072 | Self::Rsa4096 => "rsa",
            Self::Hmac224 | Self::Hmac256 | Self::Hmac384 | Self::Hmac512 => "hmac",
            Self::EccNistP256 | Self::EccNistP384 | Self::EccNistP521 | Self::EccSecgP256k1 => {
                "ecc"
            }
            Self::Sm2 => "sm2",
        }
    }

    pub fn supports(&self, usage: KeyUsage) -> bool {
        match usage {
            KeyUsage::EncryptDecrypt => matches!(self.family(), "symmetric" | "rsa" | "sm2"),
            KeyUsage::SignVerify => matches!(self.family(), "rsa" | "ecc" | "sm2"),
            KeyUsage::GenerateVerifyMac => self.family() == "hmac",
            KeyUsage::KeyAgreement => {
                self.family() == "sm2" || (self.family() == "ecc" && *self != Self::EccSecgP256k1)
            }
        }
    }
}

static SCHEMA: SchemaCell = SchemaCell::new(|| {
    Schema::strict(KmsKey::KIND)
        .field(FieldDescriptor::string("description").max_length(8192))
        .field(
            FieldDescriptor::string("key_usage")
                .one_of(KeyUsage::VALUES)
                .default("ENCRYPT_DECRYPT"),
        )
        .field(
            FieldDescriptor::string("customer_master_key_spec")
                .one_of(KeySpec::VALUES)
                .default("SYMMETRIC_DEFAULT"),
        )
        .field(FieldDescriptor::boolean("enable_key_rotation").default(false))
        .field(FieldDescriptor::integer("rotation_period_in_days").range(90, 2560))
        .field(
            FieldDescriptor::integer("deletion_window_in_days")
                .range(7, 30)
                .default(30),
        )
        .field(FieldDescriptor::boolean("is_enabled").default(true))
        .field(FieldDescriptor::boolean("multi_region").default(false))
        .field(FieldDescriptor::json("policy"))
        .field(FieldDescriptor::boolean("bypass_policy_lockout_safety_check").default(false))
        .field(FieldDescriptor::tags())
        .build()
});

/// Attributes of an `aws_kms_key`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KmsKey {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub key_usage: KeyUsage,
    pub customer_master_key_spec: KeySpec,
    pub enable_key_rotation: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation_period_in_days: Option<i64>,
    pub deletion_window_in_days: i64,
    pub is_enabled: bool,
    pub multi_region: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<Value>,
    pub bypass_policy_lockout_safety_check: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
}

impl ResourceAttributes for KmsKey {
    const KIND: &'static str = "aws_kms_key";

    fn schema() -> SchemaResult<&'static Schema> {
        SCHEMA.get()
    }

    fn check_formats(&self) -> ValidationResult<()> {
        check_tags(self.tags.as_ref())?;
        if let Some(policy) = &self.policy {
            JsonDocument::parse("policy", policy)?;
        }
        Ok(())
    }

    fn validate(&self) -> ValidationResult<()> {
        if !self.customer_master_key_spec.supports(self.key_usage) {
            return Err(ValidationError::cross_field(
                ["key_usage", "customer_master_key_spec"],
                format!(
                    "{} keys cannot be used for {}",
                    self.customer_master_key_spec, self.key_usage
                ),
            ));
        }

        forbid_if(
            !self.is_symmetric(),
            "enable_key_rotation",
            self.enable_key_rotation,
            "customer_master_key_spec is not SYMMETRIC_DEFAULT",
        )?;
        forbid_if(
            !self.enable_key_rotation,
            "rotation_period_in_days",
            self.rotation_period_in_days.is_some(),
            "enable_key_rotation is false",
        )
    }

    fn properties(&self) -> ComputedProperties {
        ComputedProperties::new()
            .with("is_symmetric", self.is_symmetric())
            .with("is_asymmetric", self.is_asymmetric())
            .with("is_hmac", self.is_hmac())
            .with("key_family", self.customer_master_key_spec.family())
            .with("rotation_enabled", self.enable_key_rotation)
            .with(
                "effective_rotation_period_days",
                self.effective_rotation_period_days(),
            )
            .with("estimated_monthly_cost", self.estimated_monthly_cost())
    }

    fn advisories(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.is_symmetric() && !self.enable_key_rotation {
            warnings.push("Symmetric key rotation is disabled".to_string());
        }
        if self.bypass_policy_lockout_safety_check {
            warnings.push("Policy lockout safety check is bypassed".to_string());
        }
        if self.deletion_window_in_days == 7 {
            warnings.push("Deletion window is the 7 day minimum".to_string());
        }
        warnings
    }
}

impl KmsKey {
    pub fn is_symmetric(&self) -> bool {
        self.customer_master_key_spec == KeySpec::SymmetricDefault
    }

    pub fn is_hmac(&self) -> bool {
        self.customer_master_key_spec.family() == "hmac"
    }

    /// RSA, ECC and SM2 key pairs.
    pub fn is_asymmetric(&self) -> bool {
        !self.is_symmetric() && !self.is_hmac()
    }

    pub fn effective_rotation_period_days(&self) -> Option<i64> {
        self.enable_key_rotation
            .then(|| self.rotation_period_in_days.unwrap_or(DEFAULT_ROTATION_PERIOD_DAYS))
    }

    /// Key price plus one charge per rotation within a year, capped.
    pub fn estimated_monthly_cost(&self) -> f64 {
        let rotations = self
            .effective_rotation_period_days()
            .map(|period| (DAYS_PER_YEAR / period).min(MAX_BILLED_ROTATIONS))
            .unwrap_or(0);
        KEY_MONTH_PRICE + rotations as f64
    }
}

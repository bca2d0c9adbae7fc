//! Private certificate authorities.

use crate::error::{SchemaResult, ValidationError, ValidationResult};
use crate::resource::value_objects::{Tags, check_tags};
use crate::resource::{ComputedProperties, ResourceAttributes, string_enum};
use crate::schema::{FieldDescriptor, Schema, SchemaCell};
use serde::{Deserialize, Serialize};

/// Monthly price of a general purpose CA
pub const GENERAL_PURPOSE_MONTHLY_PRICE: f64 = 400.0;
/// Monthly price of a short-lived certificate CA
pub const SHORT_LIVED_MONTHLY_PRICE: f64 = 50.0;

const MINIMUM_DELETION_DAYS: i64 = 7;

string_enum! {
    pub enum AuthorityType {
        Root => "ROOT",
        Subordinate => "SUBORDINATE",
    }
}

string_enum! {
    pub enum KeyAlgorithm {
        Rsa2048 => "RSA_2048",
        Rsa3072 => "RSA_3072",
        Rsa4096 => "RSA_4096",
        EcPrime256v1 => "EC_prime256v1",
        EcSecp384r1 => "EC_secp384r1",
        EcSecp521r1 => "EC_secp521r1",
        Sm2 => "SM2",
    }
}

impl KeyAlgorithm {
    pub fn key_type(&self) -> &'static str {
        match self {
            Self::Rsa2048 | Self::Rsa3072 | Self::Rsa4096 => "RSA",
            Self::EcPrime256v1 | Self::EcSecp384r1 | Self::EcSecp521r1 => "EC",
            Self::Sm2 => "SM2",
        }
    }

    pub fn strength_bits(&self) -> u32 {
        match self {
            Self::Rsa2048 => 2048,
            Self::Rsa3072 => 3072,
            Self::Rsa4096 => 4096,
            Self::EcPrime256v1 | Self::Sm2 => 256,
            Self::EcSecp384r1 => 384,
            Self::EcSecp521r1 => 521,
        }
    }
}

string_enum! {
    pub enum SigningAlgorithm {
        Sha256WithRsa => "SHA256WITHRSA",
        Sha384WithRsa => "SHA384WITHRSA",
        Sha512WithRsa => "SHA512WITHRSA",
        Sha256WithEcdsa => "SHA256WITHECDSA",
        Sha384WithEcdsa => "SHA384WITHECDSA",
        Sha512WithEcdsa => "SHA512WITHECDSA",
        Sm3WithSm2 => "SM3WITHSM2",
    }
}

impl SigningAlgorithm {
    /// Key type this algorithm signs with.
    pub fn key_type(&self) -> &'static str {
        match self {
            Self::Sha256WithRsa | Self::Sha384WithRsa | Self::Sha512WithRsa => "RSA",
            Self::Sha256WithEcdsa | Self::Sha384WithEcdsa | Self::Sha512WithEcdsa => "EC",
            Self::Sm3WithSm2 => "SM2",
        }
    }
}

string_enum! {
    pub enum UsageMode {
        GeneralPurpose => "GENERAL_PURPOSE",
        ShortLivedCertificate => "SHORT_LIVED_CERTIFICATE",
    }
}

string_enum! {
    pub enum KeyStorageStandard {
        Fips140Level2 => "FIPS_140_2_LEVEL_2_OR_HIGHER",
        Fips140Level3 => "FIPS_140_2_LEVEL_3_OR_HIGHER",
        CcpcLevel1 => "CCPC_LEVEL_1_OR_HIGHER",
    }
}

string_enum! {
    pub enum CrlObjectAcl {
        PublicRead => "PUBLIC_READ",
        BucketOwnerFullControl => "BUCKET_OWNER_FULL_CONTROL",
    }
}

static SCHEMA: SchemaCell = SchemaCell::new(|| {
    let subject = Schema::strict("subject")
        .field(FieldDescriptor::string("common_name").max_length(64))
        .field(FieldDescriptor::string("organization").max_length(64))
        .field(FieldDescriptor::string("organizational_unit").max_length(64))
        .field(FieldDescriptor::string("country").pattern("[A-Z]{2}"))
        .field(FieldDescriptor::string("state").max_length(128))
        .field(FieldDescriptor::string("locality").max_length(128))
        .build()?;
    let configuration = Schema::strict("certificate_authority_configuration")
        .field(
            FieldDescriptor::string("key_algorithm")
                .required()
                .one_of(KeyAlgorithm::VALUES),
        )
        .field(
            FieldDescriptor::string("signing_algorithm")
                .required()
                .one_of(SigningAlgorithm::VALUES),
        )
        .field(FieldDescriptor::object("subject", subject).required())
        .build()?;
    let crl_configuration = Schema::strict("crl_configuration")
        .field(FieldDescriptor::boolean("enabled").required())
        .field(FieldDescriptor::integer("expiration_in_days").range(1, 5000))
        .field(FieldDescriptor::string("s3_bucket_name").length(3, 255))
        .field(FieldDescriptor::string("custom_cname").max_length(253))
        .field(FieldDescriptor::string("s3_object_acl").one_of(CrlObjectAcl::VALUES))
        .build()?;
    let ocsp_configuration = Schema::strict("ocsp_configuration")
        .field(FieldDescriptor::boolean("enabled").required())
        .field(FieldDescriptor::string("ocsp_custom_cname").max_length(253))
        .build()?;
    let revocation = Schema::strict("revocation_configuration")
        .field(FieldDescriptor::object("crl_configuration", crl_configuration))
        .field(FieldDescriptor::object("ocsp_configuration", ocsp_configuration))
        .build()?;

    Schema::strict(CertificateAuthority::KIND)
        .field(
            FieldDescriptor::string("type")
                .one_of(AuthorityType::VALUES)
                .default("SUBORDINATE"),
        )
        .field(
            FieldDescriptor::object("certificate_authority_configuration", configuration)
                .required(),
        )
        .field(
            FieldDescriptor::string("usage_mode")
                .one_of(UsageMode::VALUES)
                .default("GENERAL_PURPOSE"),
        )
        .field(
            FieldDescriptor::string("key_storage_security_standard")
                .one_of(KeyStorageStandard::VALUES)
                .default("FIPS_140_2_LEVEL_3_OR_HIGHER"),
        )
        .field(
            FieldDescriptor::integer("permanent_deletion_time_in_days")
                .range(MINIMUM_DELETION_DAYS, 30)
                .default(30),
        )
        .field(FieldDescriptor::boolean("enabled").default(true))
        .field(FieldDescriptor::object("revocation_configuration", revocation))
        .field(FieldDescriptor::tags())
        .build()
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub common_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organizational_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,
}

impl Subject {
    fn is_empty(&self) -> bool {
        self == &Subject::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorityConfiguration {
    pub key_algorithm: KeyAlgorithm,
    pub signing_algorithm: SigningAlgorithm,
    pub subject: Subject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrlConfiguration {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_in_days: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3_bucket_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_cname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3_object_acl: Option<CrlObjectAcl>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcspConfiguration {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocsp_custom_cname: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevocationConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crl_configuration: Option<CrlConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocsp_configuration: Option<OcspConfiguration>,
}

/// Attributes of an `aws_acmpca_certificate_authority`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateAuthority {
    #[serde(rename = "type")]
    pub authority_type: AuthorityType,
    pub certificate_authority_configuration: AuthorityConfiguration,
    pub usage_mode: UsageMode,
    pub key_storage_security_standard: KeyStorageStandard,
    pub permanent_deletion_time_in_days: i64,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revocation_configuration: Option<RevocationConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
}

impl ResourceAttributes for CertificateAuthority {
    const KIND: &'static str = "aws_acmpca_certificate_authority";

    fn schema() -> SchemaResult<&'static Schema> {
        SCHEMA.get()
    }

    fn validate(&self) -> ValidationResult<()> {
        check_tags(self.tags.as_ref())?;

        let configuration = &self.certificate_authority_configuration;
        if configuration.subject.is_empty() {
            return Err(ValidationError::cross_field(
                ["certificate_authority_configuration.subject"],
                "subject must contain at least one field",
            ));
        }

        let key_algorithm = configuration.key_algorithm;
        let signing_algorithm = configuration.signing_algorithm;
        if key_algorithm.key_type() != signing_algorithm.key_type() {
            return Err(ValidationError::cross_field(
                [
                    "certificate_authority_configuration.key_algorithm",
                    "certificate_authority_configuration.signing_algorithm",
                ],
                format!(
                    "{} keys cannot sign with {}",
                    key_algorithm, signing_algorithm
                ),
            ));
        }

        let ccpc = self.key_storage_security_standard == KeyStorageStandard::CcpcLevel1;
        if (key_algorithm == KeyAlgorithm::Sm2) != ccpc {
            return Err(ValidationError::cross_field(
                [
                    "certificate_authority_configuration.key_algorithm",
                    "key_storage_security_standard",
                ],
                "SM2 keys require CCPC_LEVEL_1_OR_HIGHER storage and CCPC storage requires SM2 keys",
            ));
        }

        if let Some(crl) = self.crl().filter(|crl| crl.enabled) {
            if crl.expiration_in_days.is_none() {
                return Err(ValidationError::requires(
                    "revocation_configuration.crl_configuration.expiration_in_days",
                    "the CRL is enabled",
                ));
            }
            if crl.s3_bucket_name.is_none() {
                return Err(ValidationError::requires(
                    "revocation_configuration.crl_configuration.s3_bucket_name",
                    "the CRL is enabled",
                ));
            }
        }

        Ok(())
    }

    fn properties(&self) -> ComputedProperties {
        ComputedProperties::new()
            .with("is_root", self.is_root())
            .with("is_subordinate", !self.is_root())
            .with("is_short_lived", self.is_short_lived())
            .with("key_type", self.key_algorithm().key_type())
            .with("key_strength_bits", self.key_algorithm().strength_bits())
            .with("security_level", self.security_level())
            .with("has_crl", self.has_crl())
            .with("has_ocsp", self.has_ocsp())
            .with("revocation_enabled", self.revocation_enabled())
            .with("estimated_monthly_cost", self.estimated_monthly_cost())
    }

    fn advisories(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !self.revocation_enabled() {
            warnings.push("No certificate revocation mechanism is enabled".to_string());
        }
        if self.is_root() && self.key_algorithm() == KeyAlgorithm::Rsa2048 {
            warnings.push("Root CAs should use a key stronger than RSA_2048".to_string());
        }
        if self.permanent_deletion_time_in_days == MINIMUM_DELETION_DAYS {
            warnings.push(format!(
                "permanent_deletion_time_in_days is the minimum of {} days",
                MINIMUM_DELETION_DAYS
            ));
        }
        warnings
    }
}

impl CertificateAuthority {
    pub fn is_root(&self) -> bool {
        self.authority_type == AuthorityType::Root
    }

    pub fn is_short_lived(&self) -> bool {
        self.usage_mode == UsageMode::ShortLivedCertificate
    }

    pub fn key_algorithm(&self) -> KeyAlgorithm {
        self.certificate_authority_configuration.key_algorithm
    }

    fn crl(&self) -> Option<&CrlConfiguration> {
        self.revocation_configuration
            .as_ref()
            .and_then(|revocation| revocation.crl_configuration.as_ref())
    }

    fn ocsp(&self) -> Option<&OcspConfiguration> {
        self.revocation_configuration
            .as_ref()
            .and_then(|revocation| revocation.ocsp_configuration.as_ref())
    }

    pub fn has_crl(&self) -> bool {
        self.crl().is_some_and(|crl| crl.enabled)
    }

    pub fn has_ocsp(&self) -> bool {
        self.ocsp().is_some_and(|ocsp| ocsp.enabled)
    }

    pub fn revocation_enabled(&self) -> bool {
        self.has_crl() || self.has_ocsp()
    }

    /// `high`, `medium` or `standard`.
    pub fn security_level(&self) -> &'static str {
        let key = self.key_algorithm();
        let strong_key = matches!(
            key,
            KeyAlgorithm::Rsa4096 | KeyAlgorithm::EcSecp384r1 | KeyAlgorithm::EcSecp521r1
        );
        let fips_level_3 = self.key_storage_security_standard == KeyStorageStandard::Fips140Level3;

        if strong_key && fips_level_3 {
            "high"
        } else if key.key_type() == "EC" || (key.key_type() == "RSA" && key.strength_bits() >= 3072)
        {
            "medium"
        } else {
            "standard"
        }
    }

    pub fn estimated_monthly_cost(&self) -> f64 {
        match self.usage_mode {
            UsageMode::GeneralPurpose => GENERAL_PURPOSE_MONTHLY_PRICE,
            UsageMode::ShortLivedCertificate => SHORT_LIVED_MONTHLY_PRICE,
        }
    }
}

//! EKS clusters.

use crate::error::{SchemaResult, ValidationError, ValidationResult};
use crate::resource::value_objects::rules::{forbid_if, unique_by};
use crate::resource::value_objects::{Ipv4Cidr, Tags, check_tags};
use crate::resource::{
    ComputedProperties, HOURS_PER_MONTH, ResourceAttributes, round_currency, sorted_distinct,
    string_enum,
};
use crate::schema::{FieldDescriptor, Schema, SchemaCell};
use serde::{Deserialize, Serialize};

/// Hourly price of the cluster control plane
pub const CONTROL_PLANE_HOUR_PRICE: f64 = 0.10;

const SERVICE_CIDR_PREFIXES: std::ops::RangeInclusive<u8> = 12..=24;

string_enum! {
    pub enum LogType {
        Api => "api",
        Audit => "audit",
        Authenticator => "authenticator",
        ControllerManager => "controllerManager",
        Scheduler => "scheduler",
    }
}

string_enum! {
    pub enum IpFamily {
        Ipv4 => "ipv4",
        Ipv6 => "ipv6",
    }
}

string_enum! {
    pub enum AuthenticationMode {
        Api => "API",
        ApiAndConfigMap => "API_AND_CONFIG_MAP",
        ConfigMap => "CONFIG_MAP",
    }
}

static SCHEMA: SchemaCell = SchemaCell::new(|| {
    let vpc_config = Schema::strict("vpc_config")
        .field(FieldDescriptor::string_array("subnet_ids").required().items(2, 16))
        .field(FieldDescriptor::string_array("security_group_ids").max_items(5))
        .field(FieldDescriptor::boolean("endpoint_private_access").default(false))
        .field(FieldDescriptor::boolean("endpoint_public_access").default(true))
        .field(FieldDescriptor::string_array("public_access_cidrs").min_items(1))
        .build()?;
    let provider = Schema::strict("provider")
        .field(
            FieldDescriptor::string("key_arn")
                .required()
                .pattern(r"arn:aws[a-zA-Z-]*:kms:[a-z0-9-]+:\d{12}:(key|alias)/.+"),
        )
        .build()?;
    let encryption_config = Schema::strict("encryption_config")
        .field(
            FieldDescriptor::string_array("resources")
                .required()
                .one_of(&["secrets"])
                .items(1, 1),
        )
        .field(FieldDescriptor::object("provider", provider).required())
        .build()?;
    let network_config = Schema::strict("kubernetes_network_config")
        .field(FieldDescriptor::string("service_ipv4_cidr"))
        .field(
            FieldDescriptor::string("ip_family")
                .one_of(IpFamily::VALUES)
                .default("ipv4"),
        )
        .build()?;
    let access_config = Schema::strict("access_config")
        .field(
            FieldDescriptor::string("authentication_mode")
                .one_of(AuthenticationMode::VALUES)
                .default("API_AND_CONFIG_MAP"),
        )
        .field(
            FieldDescriptor::boolean("bootstrap_cluster_creator_admin_permissions").default(true),
        )
        .build()?;

    Schema::strict(EksCluster::KIND)
        .field(
            FieldDescriptor::string("name")
                .required()
                .pattern(r"[0-9A-Za-z][A-Za-z0-9_-]*")
                .length(1, 100),
        )
        .field(
            FieldDescriptor::string("role_arn")
                .required()
                .pattern(r"arn:aws[a-zA-Z-]*:iam::\d{12}:role/.+"),
        )
        .field(FieldDescriptor::string("version").pattern(r"1\.\d{2}"))
        .field(FieldDescriptor::object("vpc_config", vpc_config).required())
        .field(FieldDescriptor::string_array("enabled_cluster_log_types").one_of(LogType::VALUES))
        .field(FieldDescriptor::object("encryption_config", encryption_config))
        .field(FieldDescriptor::object("kubernetes_network_config", network_config))
        .field(FieldDescriptor::object("access_config", access_config))
        .field(FieldDescriptor::tags())
        .build()
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VpcConfig {
    pub subnet_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_group_ids: Option<Vec<String>>,
    pub endpoint_private_access: bool,
    pub endpoint_public_access: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_access_cidrs: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncryptionProvider {
    pub key_arn: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncryptionConfig {
    pub resources: Vec<String>,
    pub provider: EncryptionProvider,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KubernetesNetworkConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_ipv4_cidr: Option<String>,
    pub ip_family: IpFamily,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessConfig {
    pub authentication_mode: AuthenticationMode,
    pub bootstrap_cluster_creator_admin_permissions: bool,
}

/// Attributes of an `aws_eks_cluster`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EksCluster {
    pub name: String,
    pub role_arn: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub vpc_config: VpcConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled_cluster_log_types: Option<Vec<LogType>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_config: Option<EncryptionConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubernetes_network_config: Option<KubernetesNetworkConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_config: Option<AccessConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
}

impl ResourceAttributes for EksCluster {
    const KIND: &'static str = "aws_eks_cluster";

    fn schema() -> SchemaResult<&'static Schema> {
        SCHEMA.get()
    }

    fn check_formats(&self) -> ValidationResult<()> {
        check_tags(self.tags.as_ref())?;
        self.public_access_cidrs()?;
        if let Some(cidr) = self
            .kubernetes_network_config
            .as_ref()
            .and_then(|network| network.service_ipv4_cidr.as_ref())
        {
            Ipv4Cidr::parse("kubernetes_network_config.service_ipv4_cidr", cidr)?;
        }
        Ok(())
    }

    fn validate(&self) -> ValidationResult<()> {
        let vpc = &self.vpc_config;
        if !vpc.endpoint_private_access && !vpc.endpoint_public_access {
            return Err(ValidationError::cross_field(
                [
                    "vpc_config.endpoint_private_access",
                    "vpc_config.endpoint_public_access",
                ],
                "at least one API server endpoint must be enabled",
            ));
        }

        forbid_if(
            !vpc.endpoint_public_access,
            "vpc_config.public_access_cidrs",
            vpc.public_access_cidrs.is_some(),
            "endpoint_public_access is false",
        )?;

        if let Some(network) = &self.kubernetes_network_config {
            forbid_if(
                network.ip_family == IpFamily::Ipv6,
                "kubernetes_network_config.service_ipv4_cidr",
                network.service_ipv4_cidr.is_some(),
                "ip_family is ipv6",
            )?;
            if let Some(cidr) = &network.service_ipv4_cidr {
                let attribute = "kubernetes_network_config.service_ipv4_cidr";
                let block = Ipv4Cidr::parse(attribute, cidr)?;
                if !block.is_private() {
                    return Err(ValidationError::cross_field(
                        [attribute],
                        format!("{cidr} must be within a private (RFC 1918) range"),
                    ));
                }
                if !SERVICE_CIDR_PREFIXES.contains(&block.prefix_length()) {
                    return Err(ValidationError::cross_field(
                        [attribute],
                        format!("{cidr} must have a prefix length between /12 and /24"),
                    ));
                }
            }
        }

        unique_by("vpc_config.subnet_ids", &vpc.subnet_ids, String::as_str)?;

        Ok(())
    }

    fn properties(&self) -> ComputedProperties {
        ComputedProperties::new()
            .with("endpoint_access", self.endpoint_access())
            .with("is_private", self.is_private())
            .with("enabled_log_types", self.enabled_log_types())
            .with("logging_enabled", self.logging_enabled())
            .with("all_logging_enabled", self.all_logging_enabled())
            .with("secrets_encrypted", self.secrets_encrypted())
            .with("is_open_to_world", self.is_open_to_world())
            .with("security_level", self.security_level())
            .with("estimated_monthly_cost", self.estimated_monthly_cost())
    }

    fn advisories(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.is_open_to_world() {
            warnings.push("The public API endpoint is reachable from 0.0.0.0/0".to_string());
        }
        if !self.secrets_encrypted() {
            warnings.push("Kubernetes secrets are not envelope encrypted".to_string());
        }
        if !self.log_types().contains(&LogType::Audit) {
            warnings.push("Audit logging is disabled".to_string());
        }
        warnings
    }
}

impl EksCluster {
    fn public_access_cidrs(&self) -> ValidationResult<Vec<Ipv4Cidr>> {
        self.vpc_config
            .public_access_cidrs
            .iter()
            .flatten()
            .map(|cidr| Ipv4Cidr::parse("vpc_config.public_access_cidrs", cidr))
            .collect()
    }

    fn log_types(&self) -> &[LogType] {
        self.enabled_cluster_log_types.as_deref().unwrap_or_default()
    }

    /// `public`, `private` or `public_and_private`.
    pub fn endpoint_access(&self) -> &'static str {
        match (
            self.vpc_config.endpoint_public_access,
            self.vpc_config.endpoint_private_access,
        ) {
            (true, true) => "public_and_private",
            (true, false) => "public",
            _ => "private",
        }
    }

    pub fn is_private(&self) -> bool {
        !self.vpc_config.endpoint_public_access
    }

    pub fn enabled_log_types(&self) -> Vec<String> {
        sorted_distinct(self.log_types().iter().map(LogType::as_str))
    }

    pub fn logging_enabled(&self) -> bool {
        !self.log_types().is_empty()
    }

    pub fn all_logging_enabled(&self) -> bool {
        self.enabled_log_types().len() == LogType::VALUES.len()
    }

    pub fn secrets_encrypted(&self) -> bool {
        self.encryption_config
            .as_ref()
            .is_some_and(|config| config.resources.iter().any(|r| r == "secrets"))
    }

    /// Public endpoint reachable from anywhere. An absent CIDR list means
    /// `0.0.0.0/0`.
    pub fn is_open_to_world(&self) -> bool {
        if !self.vpc_config.endpoint_public_access {
            return false;
        }
        match &self.vpc_config.public_access_cidrs {
            None => true,
            Some(_) => self
                .public_access_cidrs()
                .is_ok_and(|blocks| blocks.iter().any(Ipv4Cidr::is_anywhere)),
        }
    }

    /// `high`, `medium` or `low`.
    pub fn security_level(&self) -> &'static str {
        if self.is_private() && self.secrets_encrypted() && self.logging_enabled() {
            "high"
        } else if !self.is_open_to_world() || self.secrets_encrypted() {
            "medium"
        } else {
            "low"
        }
    }

    pub fn estimated_monthly_cost(&self) -> f64 {
        round_currency(CONTROL_PLANE_HOUR_PRICE * HOURS_PER_MONTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResourceError;
    use crate::resource::BuiltResource;
    use serde_json::{Value, json};

    fn cluster(vpc: Value, extra: Value) -> Value {
        let mut vpc_config = json!({"subnet_ids": ["subnet-a", "subnet-b"]});
        if let (Some(base), Some(vpc)) = (vpc_config.as_object_mut(), vpc.as_object()) {
            base.extend(vpc.clone());
        }
        let mut base = json!({
            "name": "platform",
            "role_arn": "arn:aws:iam::123456789012:role/eks",
            "vpc_config": vpc_config
        });
        if let (Some(base), Some(extra)) = (base.as_object_mut(), extra.as_object()) {
            base.extend(extra.clone());
        }
        base
    }

    #[test]
    fn test_defaults() {
        let eks = EksCluster::build(&cluster(json!({}), json!({}))).unwrap();
        assert_eq!(eks.endpoint_access(), "public");
        assert!(eks.is_open_to_world());
        assert_eq!(eks.security_level(), "low");
        assert_eq!(eks.estimated_monthly_cost(), 73.0);
        assert_eq!(eks.warnings().len(), 3);
    }

    #[test]
    fn test_endpoint_required() {
        let result = EksCluster::build(&cluster(
            json!({"endpoint_public_access": false}),
            json!({}),
        ));
        assert!(result.unwrap_err().to_string().contains("endpoint"));
    }

    #[test]
    fn test_cidrs_require_public_endpoint() {
        let result = EksCluster::build(&cluster(
            json!({
                "endpoint_public_access": false,
                "endpoint_private_access": true,
                "public_access_cidrs": ["203.0.113.0/24"]
            }),
            json!({}),
        ));
        assert!(matches!(
            result,
            Err(ResourceError::Validation(ValidationError::ConditionallyForbidden { .. }))
        ));

        let eks = EksCluster::build(&cluster(
            json!({"public_access_cidrs": ["203.0.113.0/24"]}),
            json!({}),
        ))
        .unwrap();
        assert!(!eks.is_open_to_world());
        assert_eq!(eks.security_level(), "medium");

        assert!(EksCluster::build(&cluster(
            json!({"public_access_cidrs": ["203.0.113.0/33"]}),
            json!({})
        ))
        .is_err());
    }

    #[test]
    fn test_service_cidr() {
        let network = |cidr: &str| {
            cluster(
                json!({}),
                json!({"kubernetes_network_config": {"service_ipv4_cidr": cidr}}),
            )
        };
        assert!(EksCluster::build(&network("172.20.0.0/16")).is_ok());
        assert!(EksCluster::build(&network("100.64.0.0/16")).is_err());
        assert!(EksCluster::build(&network("10.0.0.0/8")).is_err());
        assert!(EksCluster::build(&network("10.100.0.0/28")).is_err());

        let ipv6 = cluster(
            json!({}),
            json!({"kubernetes_network_config": {
                "ip_family": "ipv6",
                "service_ipv4_cidr": "172.20.0.0/16"
            }}),
        );
        assert!(EksCluster::build(&ipv6).is_err());
    }

    #[test]
    fn test_unique_subnets() {
        let result = EksCluster::build(&cluster(
            json!({"subnet_ids": ["subnet-a", "subnet-a"]}),
            json!({}),
        ));
        assert!(matches!(
            result,
            Err(ResourceError::Validation(ValidationError::DuplicateValue { .. }))
        ));
    }

    #[test]
    fn test_private_hardened_cluster() {
        let eks = EksCluster::build(&cluster(
            json!({"endpoint_public_access": false, "endpoint_private_access": true}),
            json!({
                "enabled_cluster_log_types": ["scheduler", "api", "audit", "authenticator", "controllerManager"],
                "encryption_config": {
                    "resources": ["secrets"],
                    "provider": {"key_arn": "arn:aws:kms:us-east-1:123456789012:key/abcd"}
                }
            }),
        ))
        .unwrap();
        assert!(eks.is_private());
        assert!(eks.all_logging_enabled());
        assert_eq!(eks.enabled_log_types()[0], "api");
        assert_eq!(eks.security_level(), "high");
        assert!(eks.warnings().is_empty());
    }

    #[test]
    fn test_subnet_count_bounds() {
        let result = EksCluster::build(&cluster(json!({"subnet_ids": ["subnet-a"]}), json!({})));
        assert!(matches!(
            result,
            Err(ResourceError::Validation(ValidationError::TooFewElements { .. }))
        ));
    }
}

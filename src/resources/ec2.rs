//! Security groups and VPCs.

use crate::error::{SchemaResult, ValidationError, ValidationResult};
use crate::resource::value_objects::rules::{at_most_one_of, exactly_one_of, require_if};
use crate::resource::value_objects::{Ipv4Cidr, Tags, check_tags};
use crate::resource::{ComputedProperties, ResourceAttributes, string_enum};
use crate::schema::{FieldDescriptor, Schema, SchemaCell};
use serde::{Deserialize, Serialize};

const ANYWHERE_IPV4: &str = "0.0.0.0/0";
const ANYWHERE_IPV6: &str = "::/0";

/// Ports of administrative and data services that should never face the
/// internet.
pub const SENSITIVE_PORTS: &[i64] = &[22, 1433, 3306, 3389, 5432, 6379, 9200, 27017];

const NAMED_PROTOCOLS: &[&str] = &["-1", "all", "tcp", "udp", "icmp", "icmpv6"];

fn rule_schema(name: &str) -> SchemaResult<Schema> {
    Schema::strict(name)
        .field(FieldDescriptor::integer("from_port").required().range(-1, 65_535))
        .field(FieldDescriptor::integer("to_port").required().range(-1, 65_535))
        .field(FieldDescriptor::string("protocol").required())
        .field(FieldDescriptor::string_array("cidr_blocks"))
        .field(FieldDescriptor::string_array("ipv6_cidr_blocks"))
        .field(FieldDescriptor::string_array("security_groups"))
        .field(FieldDescriptor::boolean("self").default(false))
        .field(FieldDescriptor::string("description").max_length(255))
        .build()
}

static SECURITY_GROUP_SCHEMA: SchemaCell = SchemaCell::new(|| {
    Schema::strict(SecurityGroup::KIND)
        .field(FieldDescriptor::string("name").length(1, 255))
        .field(FieldDescriptor::string("name_prefix").length(1, 100))
        .field(
            FieldDescriptor::string("description")
                .max_length(255)
                .default("Managed by Terraform"),
        )
        .field(FieldDescriptor::string("vpc_id").pattern(r"vpc-[0-9a-f]{8,17}"))
        .field(FieldDescriptor::object_array("ingress", rule_schema("ingress")?))
        .field(FieldDescriptor::object_array("egress", rule_schema("egress")?))
        .field(FieldDescriptor::boolean("revoke_rules_on_delete").default(false))
        .field(FieldDescriptor::tags())
        .build()
});

/// One ingress or egress rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityGroupRule {
    pub from_port: i64,
    pub to_port: i64,
    pub protocol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cidr_blocks: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv6_cidr_blocks: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_groups: Option<Vec<String>>,
    /// Whether the group itself is a source
    #[serde(rename = "self")]
    pub self_source: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SecurityGroupRule {
    pub fn is_all_traffic(&self) -> bool {
        matches!(self.protocol.as_str(), "-1" | "all")
    }

    fn has_port_range(&self) -> bool {
        matches!(self.protocol.as_str(), "tcp" | "udp" | "6" | "17")
    }

    fn cidrs(&self) -> &[String] {
        self.cidr_blocks.as_deref().unwrap_or_default()
    }

    fn ipv6_cidrs(&self) -> &[String] {
        self.ipv6_cidr_blocks.as_deref().unwrap_or_default()
    }

    fn groups(&self) -> &[String] {
        self.security_groups.as_deref().unwrap_or_default()
    }

    pub fn is_open_to_world(&self) -> bool {
        self.cidrs().iter().any(|c| c == ANYWHERE_IPV4)
            || self.ipv6_cidrs().iter().any(|c| c == ANYWHERE_IPV6)
    }

    /// Whether traffic to `port` over TCP matches this rule.
    pub fn covers_tcp_port(&self, port: i64) -> bool {
        self.is_all_traffic()
            || (matches!(self.protocol.as_str(), "tcp" | "6")
                && (self.from_port..=self.to_port).contains(&port))
    }

    /// `all`, a single port or a `from-to` range.
    pub fn port_label(&self) -> String {
        if self.is_all_traffic() {
            "all".to_string()
        } else if self.from_port == self.to_port {
            self.from_port.to_string()
        } else {
            format!("{}-{}", self.from_port, self.to_port)
        }
    }

    fn check_formats(&self, path: &str) -> ValidationResult<()> {
        let numeric = self.protocol.parse::<u8>().is_ok();
        if !numeric && !NAMED_PROTOCOLS.contains(&self.protocol.as_str()) {
            return Err(ValidationError::InvalidEnumValue {
                attribute: format!("{path}.protocol"),
                value: self.protocol.clone(),
                allowed: NAMED_PROTOCOLS.iter().map(ToString::to_string).collect(),
            });
        }
        for (i, cidr) in self.cidrs().iter().enumerate() {
            Ipv4Cidr::parse(&format!("{path}.cidr_blocks[{i}]"), cidr)?;
        }
        Ok(())
    }

    fn validate(&self, path: &str) -> ValidationResult<()> {
        let ports = [format!("{path}.from_port"), format!("{path}.to_port")];
        if self.is_all_traffic() && (self.from_port != 0 || self.to_port != 0) {
            return Err(ValidationError::cross_field(
                ports,
                "rules for all protocols must use ports 0 to 0",
            ));
        }
        if self.has_port_range() && (self.from_port < 0 || self.from_port > self.to_port) {
            return Err(ValidationError::cross_field(
                ports,
                "from_port must be between 0 and to_port",
            ));
        }

        let has_source = !self.cidrs().is_empty()
            || !self.ipv6_cidrs().is_empty()
            || !self.groups().is_empty()
            || self.self_source;
        if !has_source {
            return Err(ValidationError::MissingAlternative {
                attributes: ["cidr_blocks", "ipv6_cidr_blocks", "security_groups", "self"]
                    .iter()
                    .map(|field| format!("{path}.{field}"))
                    .collect(),
            });
        }
        Ok(())
    }
}

/// Attributes of an `aws_security_group`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityGroup {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_prefix: Option<String>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingress: Option<Vec<SecurityGroupRule>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub egress: Option<Vec<SecurityGroupRule>>,
    pub revoke_rules_on_delete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
}

impl ResourceAttributes for SecurityGroup {
    const KIND: &'static str = "aws_security_group";

    fn schema() -> SchemaResult<&'static Schema> {
        SECURITY_GROUP_SCHEMA.get()
    }

    fn check_formats(&self) -> ValidationResult<()> {
        check_tags(self.tags.as_ref())?;
        for (i, rule) in self.ingress().iter().enumerate() {
            rule.check_formats(&format!("ingress[{i}]"))?;
        }
        for (i, rule) in self.egress().iter().enumerate() {
            rule.check_formats(&format!("egress[{i}]"))?;
        }
        Ok(())
    }

    fn validate(&self) -> ValidationResult<()> {
        at_most_one_of(&[
            ("name", self.name.is_some()),
            ("name_prefix", self.name_prefix.is_some()),
        ])?;

        for (i, rule) in self.ingress().iter().enumerate() {
            rule.validate(&format!("ingress[{i}]"))?;
        }
        for (i, rule) in self.egress().iter().enumerate() {
            rule.validate(&format!("egress[{i}]"))?;
        }
        Ok(())
    }

    fn properties(&self) -> ComputedProperties {
        ComputedProperties::new()
            .with("ingress_rule_count", self.ingress().len())
            .with("egress_rule_count", self.egress().len())
            .with("exposed_ports", self.exposed_ports())
            .with("is_open_to_world", self.is_open_to_world())
            .with("allows_all_ingress", self.allows_all_ingress())
            .with(
                "sensitive_ports_open_to_world",
                self.sensitive_ports_open_to_world(),
            )
    }

    fn advisories(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let sensitive = self.sensitive_ports_open_to_world();
        if !sensitive.is_empty() {
            let ports: Vec<String> = sensitive.iter().map(ToString::to_string).collect();
            warnings.push(format!(
                "Sensitive ports open to the internet: {}",
                ports.join(", ")
            ));
        }
        if self.allows_all_ingress() {
            warnings.push("All inbound traffic is allowed from anywhere".to_string());
        }
        warnings
    }
}

impl SecurityGroup {
    pub fn ingress(&self) -> &[SecurityGroupRule] {
        self.ingress.as_deref().unwrap_or_default()
    }

    pub fn egress(&self) -> &[SecurityGroupRule] {
        self.egress.as_deref().unwrap_or_default()
    }

    /// Port labels of ingress rules in declaration order, without repeats.
    pub fn exposed_ports(&self) -> Vec<String> {
        let mut ports: Vec<String> = Vec::new();
        for label in self.ingress().iter().map(SecurityGroupRule::port_label) {
            if !ports.contains(&label) {
                ports.push(label);
            }
        }
        ports
    }

    pub fn is_open_to_world(&self) -> bool {
        self.ingress().iter().any(SecurityGroupRule::is_open_to_world)
    }

    pub fn allows_all_ingress(&self) -> bool {
        self.ingress()
            .iter()
            .any(|rule| rule.is_all_traffic() && rule.is_open_to_world())
    }

    pub fn sensitive_ports_open_to_world(&self) -> Vec<i64> {
        let open: Vec<&SecurityGroupRule> = self
            .ingress()
            .iter()
            .filter(|rule| rule.is_open_to_world())
            .collect();
        SENSITIVE_PORTS
            .iter()
            .copied()
            .filter(|port| open.iter().any(|rule| rule.covers_tcp_port(*port)))
            .collect()
    }
}

string_enum! {
    pub enum InstanceTenancy {
        Default => "default",
        Dedicated => "dedicated",
    }
}

const MIN_VPC_PREFIX: u8 = 16;
const MAX_VPC_PREFIX: u8 = 28;

static VPC_SCHEMA: SchemaCell = SchemaCell::new(|| {
    Schema::strict(Vpc::KIND)
        .field(FieldDescriptor::string("cidr_block"))
        .field(FieldDescriptor::string("ipv4_ipam_pool_id").pattern(r"ipam-pool-[0-9a-f]+"))
        .field(FieldDescriptor::integer("ipv4_netmask_length").range(16, 28))
        .field(
            FieldDescriptor::string("instance_tenancy")
                .one_of(InstanceTenancy::VALUES)
                .default("default"),
        )
        .field(FieldDescriptor::boolean("enable_dns_support").default(true))
        .field(FieldDescriptor::boolean("enable_dns_hostnames").default(false))
        .field(FieldDescriptor::boolean("assign_generated_ipv6_cidr_block").default(false))
        .field(FieldDescriptor::tags())
        .build()
});

/// Attributes of an `aws_vpc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vpc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cidr_block: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv4_ipam_pool_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv4_netmask_length: Option<i64>,
    pub instance_tenancy: InstanceTenancy,
    pub enable_dns_support: bool,
    pub enable_dns_hostnames: bool,
    pub assign_generated_ipv6_cidr_block: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
}

impl ResourceAttributes for Vpc {
    const KIND: &'static str = "aws_vpc";

    fn schema() -> SchemaResult<&'static Schema> {
        VPC_SCHEMA.get()
    }

    fn check_formats(&self) -> ValidationResult<()> {
        check_tags(self.tags.as_ref())?;
        if let Some(cidr) = &self.cidr_block {
            let block = Ipv4Cidr::parse("cidr_block", cidr)?;
            if !(MIN_VPC_PREFIX..=MAX_VPC_PREFIX).contains(&block.prefix_length()) {
                return Err(ValidationError::invalid_format(
                    "cidr_block",
                    format!("prefix length must be between /{MIN_VPC_PREFIX} and /{MAX_VPC_PREFIX}"),
                ));
            }
            if block.has_host_bits() {
                return Err(ValidationError::invalid_format(
                    "cidr_block",
                    format!("'{cidr}' has host bits set, use {}", block.network()),
                ));
            }
        }
        Ok(())
    }

    fn validate(&self) -> ValidationResult<()> {
        exactly_one_of(&[
            ("cidr_block", self.cidr_block.is_some()),
            ("ipv4_ipam_pool_id", self.ipv4_ipam_pool_id.is_some()),
        ])?;
        require_if(
            self.ipv4_netmask_length.is_some(),
            "ipv4_ipam_pool_id",
            self.ipv4_ipam_pool_id.is_some(),
            "ipv4_netmask_length is set",
        )?;
        require_if(
            self.enable_dns_hostnames,
            "enable_dns_support",
            self.enable_dns_support,
            "enable_dns_hostnames is true",
        )
    }

    fn properties(&self) -> ComputedProperties {
        ComputedProperties::new()
            .with("prefix_length", self.prefix_length())
            .with("total_ip_addresses", self.total_ip_addresses())
            .with("is_private_range", self.is_private_range())
            .with("available_24_subnets", self.available_24_subnets())
    }

    fn advisories(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.is_private_range() == Some(false) {
            warnings.push("VPC uses a publicly routable address range".to_string());
        }
        warnings
    }
}

impl Vpc {
    fn block(&self) -> Option<Ipv4Cidr> {
        Ipv4Cidr::parse("cidr_block", self.cidr_block.as_deref()?).ok()
    }

    /// From the CIDR block, or the netmask requested from IPAM.
    pub fn prefix_length(&self) -> Option<u8> {
        self.block()
            .map(|block| block.prefix_length())
            .or_else(|| self.ipv4_netmask_length.and_then(|n| u8::try_from(n).ok()))
    }

    pub fn total_ip_addresses(&self) -> Option<u64> {
        self.prefix_length()
            .map(|prefix| 1u64 << (32 - u32::from(prefix)))
    }

    /// Unknown for IPAM-allocated ranges.
    pub fn is_private_range(&self) -> Option<bool> {
        self.block().map(|block| block.is_private())
    }

    /// Number of /24 subnets the range can hold.
    pub fn available_24_subnets(&self) -> Option<u64> {
        self.prefix_length().map(|prefix| match prefix {
            0..=24 => 1u64 << (24 - u32::from(prefix)),
            _ => 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResourceError;
    use crate::resource::BuiltResource;
    use serde_json::json;

    fn web_group() -> serde_json::Value {
        json!({
            "name": "web",
            "vpc_id": "vpc-0a1b2c3d",
            "ingress": [
                {"from_port": 443, "to_port": 443, "protocol": "tcp", "cidr_blocks": ["0.0.0.0/0"]},
                {"from_port": 8000, "to_port": 8080, "protocol": "tcp", "security_groups": ["sg-0123456789abcdef0"]}
            ],
            "egress": [
                {"from_port": 0, "to_port": 0, "protocol": "-1", "cidr_blocks": ["0.0.0.0/0"]}
            ]
        })
    }

    #[test]
    fn test_security_group() {
        let group = SecurityGroup::build(&web_group()).unwrap();
        assert_eq!(group.description, "Managed by Terraform");
        let properties = group.computed_properties();
        assert_eq!(properties.get_i64("ingress_rule_count"), Some(2));
        assert_eq!(properties.get_i64("egress_rule_count"), Some(1));
        assert_eq!(group.exposed_ports(), vec!["443", "8000-8080"]);
        assert!(group.is_open_to_world());
        assert!(!group.allows_all_ingress());
        assert!(group.sensitive_ports_open_to_world().is_empty());
        assert!(group.warnings().is_empty());
    }

    #[test]
    fn test_sensitive_ports() {
        let group = SecurityGroup::build(&json!({
            "name": "bastion",
            "ingress": [
                {"from_port": 0, "to_port": 0, "protocol": "-1", "ipv6_cidr_blocks": ["::/0"]},
                {"from_port": 3300, "to_port": 3400, "protocol": "tcp", "cidr_blocks": ["10.0.0.0/8"]}
            ]
        }))
        .unwrap();
        assert!(group.allows_all_ingress());
        assert_eq!(group.sensitive_ports_open_to_world(), SENSITIVE_PORTS.to_vec());
        assert_eq!(group.warnings().len(), 2);
    }

    #[test]
    fn test_rule_validation() {
        let rule = |rule: serde_json::Value| json!({"name": "g", "ingress": [rule]});

        let unknown_protocol =
            rule(json!({"from_port": 1, "to_port": 2, "protocol": "sctp", "self": true}));
        assert!(matches!(
            SecurityGroup::build(&unknown_protocol),
            Err(ResourceError::Validation(ValidationError::InvalidEnumValue { .. }))
        ));

        let numeric = rule(json!({"from_port": 0, "to_port": 0, "protocol": "50", "self": true}));
        assert!(SecurityGroup::build(&numeric).is_ok());

        let all_ports = rule(json!({"from_port": 22, "to_port": 22, "protocol": "all", "self": true}));
        assert!(matches!(
            SecurityGroup::build(&all_ports),
            Err(ResourceError::Validation(ValidationError::CrossField { .. }))
        ));

        let reversed = rule(json!({"from_port": 90, "to_port": 80, "protocol": "tcp", "self": true}));
        assert!(SecurityGroup::build(&reversed).is_err());

        let no_source = rule(json!({"from_port": 80, "to_port": 80, "protocol": "tcp"}));
        assert!(matches!(
            SecurityGroup::build(&no_source),
            Err(ResourceError::Validation(ValidationError::MissingAlternative { .. }))
        ));

        let bad_cidr =
            rule(json!({"from_port": 80, "to_port": 80, "protocol": "tcp", "cidr_blocks": ["10.0.0.0/33"]}));
        match SecurityGroup::build(&bad_cidr) {
            Err(ResourceError::Validation(ValidationError::InvalidFormat { attribute, .. })) => {
                assert_eq!(attribute, "ingress[0].cidr_blocks[0]")
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_cidr_format_reported_before_port_rules() {
        let raw = json!({"name": "g", "ingress": [
            {"from_port": 90, "to_port": 80, "protocol": "tcp", "cidr_blocks": ["10.0.0.0/8"]},
            {"from_port": 22, "to_port": 22, "protocol": "tcp", "cidr_blocks": ["300.0.0.0/8"]}
        ]});
        let err = match SecurityGroup::build(&raw) {
            Err(ResourceError::Validation(err)) => err,
            other => panic!("unexpected result {:?}", other),
        };
        assert!(err.is_structural());
        assert!(err.to_string().contains("ingress[1].cidr_blocks[0]"));

        let err = Vpc::build(&json!({"cidr_block": "10.0.1.0/16", "ipv4_netmask_length": 20}))
            .unwrap_err();
        assert!(err.to_string().contains("host bits"));
    }

    #[test]
    fn test_vpc() {
        let vpc = Vpc::build(&json!({"cidr_block": "10.20.0.0/16"})).unwrap();
        assert_eq!(vpc.prefix_length(), Some(16));
        assert_eq!(vpc.total_ip_addresses(), Some(65_536));
        assert_eq!(vpc.available_24_subnets(), Some(256));
        assert_eq!(vpc.is_private_range(), Some(true));
        assert!(vpc.warnings().is_empty());

        let vpc = Vpc::build(&json!({
            "ipv4_ipam_pool_id": "ipam-pool-0123abcd",
            "ipv4_netmask_length": 28
        }))
        .unwrap();
        assert_eq!(vpc.available_24_subnets(), Some(0));
        assert_eq!(vpc.is_private_range(), None);
    }

    #[test]
    fn test_vpc_rules() {
        assert!(matches!(
            Vpc::build(&json!({})),
            Err(ResourceError::Validation(ValidationError::MissingAlternative { .. }))
        ));
        assert!(matches!(
            Vpc::build(&json!({"cidr_block": "10.0.0.0/16", "ipv4_netmask_length": 20})),
            Err(ResourceError::Validation(ValidationError::ConditionallyRequired { .. }))
        ));
        assert!(Vpc::build(&json!({
            "cidr_block": "10.0.0.0/16",
            "enable_dns_support": false,
            "enable_dns_hostnames": true
        }))
        .is_err());
        assert!(Vpc::build(&json!({"cidr_block": "10.0.0.0/8"})).is_err());
        let err = Vpc::build(&json!({"cidr_block": "10.0.1.0/16"})).unwrap_err();
        assert!(err.to_string().contains("host bits"));
    }
}

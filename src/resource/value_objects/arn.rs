//! Amazon Resource Names.

use crate::error::{ValidationError, ValidationResult};
use std::fmt;

const PARTITIONS: &[&str] = &["aws", "aws-cn", "aws-us-gov", "aws-iso", "aws-iso-b"];

/// A parsed `arn:partition:service:region:account:resource` string.
///
/// Only the overall shape is checked here. Individual resource kinds apply
/// their own, sometimes stricter, patterns to the ARNs they accept.
///
/// ```rust
/// use cloud_resource_schemas::resource::value_objects::Arn;
///
/// let arn = Arn::parse("role", "arn:aws:iam::123456789012:role/service-role/app").unwrap();
/// assert_eq!(arn.service(), "iam");
/// assert_eq!(arn.account(), "123456789012");
/// assert_eq!(arn.resource(), "role/service-role/app");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Arn {
    raw: String,
    partition: String,
    service: String,
    region: String,
    account: String,
    resource: String,
}

impl Arn {
    /// Parse an ARN, reporting failures against `attribute`.
    pub fn parse(attribute: &str, value: &str) -> ValidationResult<Self> {
        let invalid = |details: &str| {
            ValidationError::invalid_format(attribute, format!("'{value}' is not a valid ARN: {details}"))
        };

        let parts: Vec<&str> = value.splitn(6, ':').collect();
        let &[prefix, partition, service, region, account, resource] = parts.as_slice() else {
            return Err(invalid("expected six ':'-separated parts"));
        };
        if prefix != "arn" {
            return Err(invalid("must start with 'arn:'"));
        }
        if !PARTITIONS.contains(&partition) {
            return Err(invalid("unknown partition"));
        }
        if service.is_empty() {
            return Err(invalid("service is empty"));
        }
        if resource.is_empty() {
            return Err(invalid("resource is empty"));
        }
        if !account.is_empty() && !(account.len() == 12 && account.bytes().all(|b| b.is_ascii_digit()))
        {
            return Err(invalid("account must be 12 digits"));
        }

        Ok(Self {
            raw: value.to_string(),
            partition: partition.to_string(),
            service: service.to_string(),
            region: region.to_string(),
            account: account.to_string(),
            resource: resource.to_string(),
        })
    }

    /// Whether a string parses as an ARN.
    pub fn is_valid(value: &str) -> bool {
        Self::parse("", value).is_ok()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn partition(&self) -> &str {
        &self.partition
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Region, empty for global services.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Account id, empty for AWS-managed resources.
    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Resource type prefix, e.g. `role` for `role/admin`.
    pub fn resource_type(&self) -> Option<&str> {
        self.resource
            .split_once(['/', ':'])
            .map(|(resource_type, _)| resource_type)
    }
}

impl fmt::Display for Arn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

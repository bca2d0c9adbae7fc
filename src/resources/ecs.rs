//! ECS task definitions.

use crate::error::{SchemaResult, ValidationError, ValidationResult};
use crate::resource::value_objects::rules::unique_by;
use crate::resource::value_objects::{Arn, Tags, check_tags};
use crate::resource::{
    ComputedProperties, HOURS_PER_MONTH, ResourceAttributes, round_currency, string_enum,
};
use crate::schema::{FieldDescriptor, Schema, SchemaCell};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fargate hourly price per vCPU on x86
pub const FARGATE_X86_VCPU_HOUR_PRICE: f64 = 0.04048;
/// Fargate hourly price per GB of memory on x86
pub const FARGATE_X86_GB_HOUR_PRICE: f64 = 0.004445;
/// Fargate hourly price per vCPU on Graviton
pub const FARGATE_ARM_VCPU_HOUR_PRICE: f64 = 0.03238;
/// Fargate hourly price per GB of memory on Graviton
pub const FARGATE_ARM_GB_HOUR_PRICE: f64 = 0.00356;

const CPU_UNITS_PER_VCPU: f64 = 1024.0;
const MIB_PER_GB: f64 = 1024.0;

/// Memory choices, in MiB, for one Fargate CPU size.
enum FargateMemory {
    Listed(&'static [i64]),
    Stepped { min: i64, max: i64, step: i64 },
}

impl FargateMemory {
    fn allows(&self, memory: i64) -> bool {
        match self {
            Self::Listed(values) => values.contains(&memory),
            Self::Stepped { min, max, step } => {
                (*min..=*max).contains(&memory) && (memory - min) % step == 0
            }
        }
    }
}

const FARGATE_SIZES: &[(i64, FargateMemory)] = &[
    (256, FargateMemory::Listed(&[512, 1024, 2048])),
    (512, FargateMemory::Stepped { min: 1024, max: 4096, step: 1024 }),
    (1024, FargateMemory::Stepped { min: 2048, max: 8192, step: 1024 }),
    (2048, FargateMemory::Stepped { min: 4096, max: 16_384, step: 1024 }),
    (4096, FargateMemory::Stepped { min: 8192, max: 30_720, step: 1024 }),
    (8192, FargateMemory::Stepped { min: 16_384, max: 61_440, step: 4096 }),
    (16_384, FargateMemory::Stepped { min: 32_768, max: 122_880, step: 8192 }),
];

string_enum! {
    pub enum Compatibility {
        Ec2 => "EC2",
        Fargate => "FARGATE",
        External => "EXTERNAL",
    }
}

string_enum! {
    pub enum NetworkMode {
        None => "none",
        Bridge => "bridge",
        Awsvpc => "awsvpc",
        Host => "host",
    }
}

string_enum! {
    pub enum PortProtocol {
        Tcp => "tcp",
        Udp => "udp",
    }
}

string_enum! {
    pub enum OperatingSystemFamily {
        Linux => "LINUX",
        WindowsServer2019Full => "WINDOWS_SERVER_2019_FULL",
        WindowsServer2019Core => "WINDOWS_SERVER_2019_CORE",
        WindowsServer2022Full => "WINDOWS_SERVER_2022_FULL",
        WindowsServer2022Core => "WINDOWS_SERVER_2022_CORE",
    }
}

string_enum! {
    pub enum CpuArchitecture {
        X86_64 => "X86_64",
        Arm64 => "ARM64",
    }
}

/// Whether a Fargate task may combine `cpu` units with `memory` MiB.
pub fn is_valid_fargate_size(cpu: i64, memory: i64) -> bool {
    FARGATE_SIZES
        .iter()
        .find(|(units, _)| *units == cpu)
        .is_some_and(|(_, options)| options.allows(memory))
}

static SCHEMA: SchemaCell = SchemaCell::new(|| {
    let port_mapping = Schema::strict("port_mapping")
        .field(
            FieldDescriptor::integer("container_port")
                .required()
                .range(1, 65_535),
        )
        .field(FieldDescriptor::integer("host_port").range(0, 65_535))
        .field(
            FieldDescriptor::string("protocol")
                .one_of(PortProtocol::VALUES)
                .default("tcp"),
        )
        .build()?;
    let container = Schema::strict("container_definition")
        .field(
            FieldDescriptor::string("name")
                .required()
                .pattern(r"[a-zA-Z0-9_-]{1,255}"),
        )
        .field(FieldDescriptor::string("image").required().length(1, 1024))
        .field(FieldDescriptor::integer("cpu").at_least(0))
        .field(FieldDescriptor::integer("memory").at_least(6))
        .field(FieldDescriptor::integer("memory_reservation").at_least(6))
        .field(FieldDescriptor::boolean("essential").default(true))
        .field(FieldDescriptor::object_array("port_mappings", port_mapping))
        .field(FieldDescriptor::string_map("environment"))
        .field(FieldDescriptor::string_array("command"))
        .build()?;
    let runtime_platform = Schema::strict("runtime_platform")
        .field(
            FieldDescriptor::string("operating_system_family")
                .one_of(OperatingSystemFamily::VALUES)
                .default("LINUX"),
        )
        .field(
            FieldDescriptor::string("cpu_architecture")
                .one_of(CpuArchitecture::VALUES)
                .default("X86_64"),
        )
        .build()?;
    let ephemeral_storage = Schema::strict("ephemeral_storage")
        .field(FieldDescriptor::integer("size_in_gib").required().range(21, 200))
        .build()?;

    Schema::strict(EcsTaskDefinition::KIND)
        .field(
            FieldDescriptor::string("family")
                .required()
                .pattern(r"[a-zA-Z0-9_-]{1,255}"),
        )
        .field(
            FieldDescriptor::string_array("requires_compatibilities")
                .one_of(Compatibility::VALUES),
        )
        .field(FieldDescriptor::string("network_mode").one_of(NetworkMode::VALUES))
        .field(FieldDescriptor::integer("cpu").at_least(128))
        .field(FieldDescriptor::integer("memory").at_least(128))
        .field(FieldDescriptor::string("execution_role_arn"))
        .field(FieldDescriptor::string("task_role_arn"))
        .field(
            FieldDescriptor::object_array("container_definitions", container)
                .required()
                .items(1, 10),
        )
        .field(FieldDescriptor::object("runtime_platform", runtime_platform))
        .field(FieldDescriptor::object("ephemeral_storage", ephemeral_storage))
        .field(FieldDescriptor::tags())
        .build()
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortMapping {
    pub container_port: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_port: Option<i64>,
    pub protocol: PortProtocol,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerDefinition {
    pub name: String,
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<i64>,
    /// Hard limit in MiB
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<i64>,
    /// Soft limit in MiB
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_reservation: Option<i64>,
    pub essential: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_mappings: Option<Vec<PortMapping>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
}

impl ContainerDefinition {
    fn port_mappings(&self) -> &[PortMapping] {
        self.port_mappings.as_deref().unwrap_or_default()
    }

    /// Memory the scheduler sets aside for the container.
    fn reserved_memory(&self) -> Option<i64> {
        self.memory.or(self.memory_reservation)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimePlatform {
    pub operating_system_family: OperatingSystemFamily,
    pub cpu_architecture: CpuArchitecture,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EphemeralStorage {
    pub size_in_gib: i64,
}

/// Attributes of an `aws_ecs_task_definition`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcsTaskDefinition {
    pub family: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_compatibilities: Option<Vec<Compatibility>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_mode: Option<NetworkMode>,
    /// CPU units, 1024 per vCPU
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<i64>,
    /// MiB
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_role_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_role_arn: Option<String>,
    pub container_definitions: Vec<ContainerDefinition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_platform: Option<RuntimePlatform>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ephemeral_storage: Option<EphemeralStorage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
}

impl ResourceAttributes for EcsTaskDefinition {
    const KIND: &'static str = "aws_ecs_task_definition";

    fn schema() -> SchemaResult<&'static Schema> {
        SCHEMA.get()
    }

    fn check_formats(&self) -> ValidationResult<()> {
        check_tags(self.tags.as_ref())?;
        for (attribute, arn) in [
            ("execution_role_arn", &self.execution_role_arn),
            ("task_role_arn", &self.task_role_arn),
        ] {
            if let Some(arn) = arn {
                Arn::parse(attribute, arn)?;
            }
        }
        Ok(())
    }

    fn validate(&self) -> ValidationResult<()> {
        if self.is_fargate() {
            self.validate_fargate()?;
        }

        let containers = &self.container_definitions;
        unique_by("container_definitions", containers, |c| c.name.as_str())?;
        if !containers.iter().any(|c| c.essential) {
            return Err(ValidationError::cross_field(
                ["container_definitions"],
                "at least one container must be essential",
            ));
        }

        for (i, container) in containers.iter().enumerate() {
            self.validate_container(i, container)?;
        }

        if let Some(task_memory) = self.memory {
            let total = containers
                .iter()
                .filter_map(ContainerDefinition::reserved_memory)
                .try_fold(0i64, i64::checked_add);
            let reserved = match total {
                Some(total) if total <= task_memory => None,
                Some(total) => Some(format!("{total} MiB")),
                None => Some("more memory than fits in an i64".to_string()),
            };
            if let Some(reserved) = reserved {
                return Err(ValidationError::cross_field(
                    ["memory", "container_definitions"],
                    format!("containers reserve {reserved} but the task has {task_memory} MiB"),
                ));
            }
        }

        Ok(())
    }

    fn properties(&self) -> ComputedProperties {
        ComputedProperties::new()
            .with("is_fargate", self.is_fargate())
            .with("vcpu", self.vcpu())
            .with("memory_gb", self.memory_gb())
            .with("container_count", self.container_definitions.len())
            .with("essential_container_count", self.essential_container_count())
            .with("exposed_ports", self.exposed_ports())
            .with("estimated_monthly_cost", self.estimated_monthly_cost())
    }

    fn advisories(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.task_role_arn.is_none() {
            warnings.push("Task has no task role".to_string());
        }
        let latest = self
            .container_definitions
            .iter()
            .filter(|c| c.image.ends_with(":latest") || !c.image.contains(':'))
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>();
        if !latest.is_empty() {
            warnings.push(format!(
                "Containers use an unpinned image tag: {}",
                latest.join(", ")
            ));
        }
        warnings
    }
}

impl EcsTaskDefinition {
    fn validate_fargate(&self) -> ValidationResult<()> {
        if self.network_mode != Some(NetworkMode::Awsvpc) {
            return Err(ValidationError::cross_field(
                ["requires_compatibilities", "network_mode"],
                "FARGATE tasks must use the awsvpc network mode",
            ));
        }
        let reason = "requires_compatibilities includes FARGATE";
        let Some(cpu) = self.cpu else {
            return Err(ValidationError::requires("cpu", reason));
        };
        let Some(memory) = self.memory else {
            return Err(ValidationError::requires("memory", reason));
        };
        if !is_valid_fargate_size(cpu, memory) {
            return Err(ValidationError::cross_field(
                ["cpu", "memory"],
                format!("{cpu} CPU units cannot be combined with {memory} MiB on FARGATE"),
            ));
        }
        Ok(())
    }

    fn validate_container(
        &self,
        index: usize,
        container: &ContainerDefinition,
    ) -> ValidationResult<()> {
        if let (Some(memory), Some(reservation)) = (container.memory, container.memory_reservation)
        {
            if reservation > memory {
                return Err(ValidationError::cross_field(
                    [
                        format!("container_definitions[{index}].memory_reservation"),
                        format!("container_definitions[{index}].memory"),
                    ],
                    "memory_reservation cannot exceed memory",
                ));
            }
        }

        if self.network_mode == Some(NetworkMode::Awsvpc) {
            for (j, mapping) in container.port_mappings().iter().enumerate() {
                if mapping.host_port.is_some_and(|port| port != mapping.container_port) {
                    return Err(ValidationError::cross_field(
                        [
                            format!("container_definitions[{index}].port_mappings[{j}].host_port"),
                            format!("container_definitions[{index}].port_mappings[{j}].container_port"),
                        ],
                        "host_port must equal container_port in awsvpc network mode",
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn is_fargate(&self) -> bool {
        self.requires_compatibilities
            .as_ref()
            .is_some_and(|c| c.contains(&Compatibility::Fargate))
    }

    pub fn vcpu(&self) -> Option<f64> {
        self.cpu.map(|units| units as f64 / CPU_UNITS_PER_VCPU)
    }

    pub fn memory_gb(&self) -> Option<f64> {
        self.memory.map(|mib| mib as f64 / MIB_PER_GB)
    }

    pub fn essential_container_count(&self) -> usize {
        self.container_definitions.iter().filter(|c| c.essential).count()
    }

    /// Distinct host-side ports, falling back to the container port.
    pub fn exposed_ports(&self) -> Vec<i64> {
        let mut ports: Vec<i64> = self
            .container_definitions
            .iter()
            .flat_map(ContainerDefinition::port_mappings)
            .map(|m| m.host_port.filter(|port| *port != 0).unwrap_or(m.container_port))
            .collect();
        ports.sort_unstable();
        ports.dedup();
        ports
    }

    pub fn cpu_architecture(&self) -> CpuArchitecture {
        self.runtime_platform
            .as_ref()
            .map_or(CpuArchitecture::X86_64, |p| p.cpu_architecture)
    }

    /// Monthly cost of one continuously running Fargate task.
    pub fn estimated_monthly_cost(&self) -> Option<f64> {
        if !self.is_fargate() {
            return None;
        }
        let (vcpu_price, gb_price) = match self.cpu_architecture() {
            CpuArchitecture::X86_64 => (FARGATE_X86_VCPU_HOUR_PRICE, FARGATE_X86_GB_HOUR_PRICE),
            CpuArchitecture::Arm64 => (FARGATE_ARM_VCPU_HOUR_PRICE, FARGATE_ARM_GB_HOUR_PRICE),
        };
        let hourly = self.vcpu()? * vcpu_price + self.memory_gb()? * gb_price;
        Some(round_currency(hourly * HOURS_PER_MONTH))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResourceError;
    use crate::resource::BuiltResource;
    use serde_json::{Value, json};

    fn fargate(extra: Value) -> Value {
        let mut base = json!({
            "family": "api",
            "requires_compatibilities": ["FARGATE"],
            "network_mode": "awsvpc",
            "cpu": 256,
            "memory": 512,
            "task_role_arn": "arn:aws:iam::123456789012:role/api-task",
            "container_definitions": [{
                "name": "api",
                "image": "example/api:1.4.2",
                "memory": 512,
                "port_mappings": [{"container_port": 8080}]
            }]
        });
        if let (Some(base), Some(extra)) = (base.as_object_mut(), extra.as_object()) {
            base.extend(extra.clone());
        }
        base
    }

    #[test]
    fn test_fargate_sizes() {
        assert!(is_valid_fargate_size(256, 512));
        assert!(is_valid_fargate_size(256, 1024));
        assert!(is_valid_fargate_size(256, 2048));
        assert!(!is_valid_fargate_size(256, 1536));
        assert!(!is_valid_fargate_size(256, 4096));
        assert!(is_valid_fargate_size(512, 3072));
        assert!(is_valid_fargate_size(4096, 30_720));
        assert!(is_valid_fargate_size(8192, 20_480));
        assert!(!is_valid_fargate_size(8192, 18_432));
        assert!(is_valid_fargate_size(16_384, 122_880));
        assert!(!is_valid_fargate_size(300, 1024));
    }

    #[test]
    fn test_fargate_task() {
        let task = EcsTaskDefinition::build(&fargate(json!({}))).unwrap();
        let properties = task.computed_properties();
        assert_eq!(properties.get_bool("is_fargate"), Some(true));
        assert_eq!(properties.get_f64("vcpu"), Some(0.25));
        assert_eq!(properties.get_f64("memory_gb"), Some(0.5));
        assert_eq!(properties.get_f64("estimated_monthly_cost"), Some(9.01));
        assert_eq!(task.exposed_ports(), vec![8080]);
        assert!(task.warnings().is_empty());

        let arm = EcsTaskDefinition::build(&fargate(json!({
            "runtime_platform": {"cpu_architecture": "ARM64"}
        })))
        .unwrap();
        assert_eq!(arm.estimated_monthly_cost(), Some(7.21));
    }

    #[test]
    fn test_fargate_requirements() {
        assert!(EcsTaskDefinition::build(&fargate(json!({"network_mode": "bridge"}))).is_err());
        assert!(matches!(
            EcsTaskDefinition::build(&fargate(json!({"memory": 4096}))),
            Err(ResourceError::Validation(ValidationError::CrossField { .. }))
        ));

        let mut raw = fargate(json!({}));
        raw.as_object_mut().unwrap().remove("cpu");
        assert!(matches!(
            EcsTaskDefinition::build(&raw),
            Err(ResourceError::Validation(ValidationError::ConditionallyRequired { .. }))
        ));
    }

    #[test]
    fn test_container_rules() {
        let duplicate = fargate(json!({
            "memory": 1024,
            "container_definitions": [
                {"name": "api", "image": "example/api:1", "memory": 256},
                {"name": "api", "image": "example/api:2", "memory": 256}
            ]
        }));
        assert!(matches!(
            EcsTaskDefinition::build(&duplicate),
            Err(ResourceError::Validation(ValidationError::DuplicateValue { .. }))
        ));

        let no_essential = fargate(json!({
            "container_definitions": [
                {"name": "sidecar", "image": "example/agent:1", "essential": false}
            ]
        }));
        assert!(EcsTaskDefinition::build(&no_essential).is_err());

        let over_memory = fargate(json!({
            "container_definitions": [
                {"name": "api", "image": "example/api:1", "memory": 400},
                {"name": "agent", "image": "example/agent:1", "memory_reservation": 200}
            ]
        }));
        let err = EcsTaskDefinition::build(&over_memory).unwrap_err();
        assert!(err.to_string().contains("600 MiB"));

        let reservation = fargate(json!({
            "container_definitions": [
                {"name": "api", "image": "example/api:1", "memory": 128, "memory_reservation": 256}
            ]
        }));
        assert!(EcsTaskDefinition::build(&reservation).is_err());
    }

    #[test]
    fn test_container_memory_total_saturates() {
        let huge = i64::MAX / 2 + 1;
        let raw = fargate(json!({
            "container_definitions": [
                {"name": "api", "image": "example/api:1", "memory": huge},
                {"name": "agent", "image": "example/agent:1", "memory": huge}
            ]
        }));
        assert!(matches!(
            EcsTaskDefinition::build(&raw),
            Err(ResourceError::Validation(ValidationError::CrossField { .. }))
        ));
    }

    #[test]
    fn test_awsvpc_host_port() {
        let raw = fargate(json!({
            "container_definitions": [{
                "name": "api",
                "image": "example/api:1",
                "port_mappings": [{"container_port": 8080, "host_port": 80}]
            }]
        }));
        assert!(matches!(
            EcsTaskDefinition::build(&raw),
            Err(ResourceError::Validation(ValidationError::CrossField { .. }))
        ));
    }

    #[test]
    fn test_ec2_task() {
        let task = EcsTaskDefinition::build(&json!({
            "family": "worker",
            "network_mode": "bridge",
            "container_definitions": [{
                "name": "worker",
                "image": "example/worker",
                "memory": 256,
                "port_mappings": [
                    {"container_port": 9000, "host_port": 0},
                    {"container_port": 9100, "host_port": 19100, "protocol": "udp"}
                ]
            }]
        }))
        .unwrap();
        assert!(!task.is_fargate());
        assert_eq!(task.estimated_monthly_cost(), None);
        assert_eq!(task.exposed_ports(), vec![9000, 19100]);
        assert_eq!(task.warnings().len(), 2);
    }
}

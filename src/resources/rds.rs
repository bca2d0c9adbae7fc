//! Aurora database clusters.

use crate::error::{SchemaResult, ValidationError, ValidationResult};
use crate::resource::value_objects::rules::{at_most_one_of, require_if};
use crate::resource::value_objects::{Tags, TimeWindow, WeeklyTimeWindow, check_tags};
use crate::resource::{
    ComputedProperties, HOURS_PER_MONTH, ResourceAttributes, round_currency, string_enum,
};
use crate::schema::{FieldDescriptor, Schema, SchemaCell};
use serde::{Deserialize, Serialize};

/// Hourly price of one Aurora Serverless v2 capacity unit
pub const V2_ACU_HOUR_PRICE: f64 = 0.12;
/// Hourly price of one Aurora Serverless v1 capacity unit
pub const V1_ACU_HOUR_PRICE: f64 = 0.06;

const MINIMUM_WINDOW_MINUTES: u32 = 30;

string_enum! {
    pub enum Engine {
        AuroraMysql => "aurora-mysql",
        AuroraPostgresql => "aurora-postgresql",
    }
}

impl Engine {
    pub fn family(&self) -> &'static str {
        match self {
            Self::AuroraMysql => "mysql",
            Self::AuroraPostgresql => "postgresql",
        }
    }

    pub fn default_port(&self) -> i64 {
        match self {
            Self::AuroraMysql => 3306,
            Self::AuroraPostgresql => 5432,
        }
    }

    /// Capacities accepted by Serverless v1 scaling.
    pub fn serverless_v1_capacities(&self) -> &'static [i64] {
        match self {
            Self::AuroraMysql => &[1, 2, 4, 8, 16, 32, 64, 128, 256],
            Self::AuroraPostgresql => &[2, 4, 8, 16, 32, 64, 192, 384],
        }
    }

    pub fn log_exports(&self) -> &'static [&'static str] {
        match self {
            Self::AuroraMysql => &["audit", "error", "general", "slowquery"],
            Self::AuroraPostgresql => &["postgresql"],
        }
    }
}

string_enum! {
    pub enum EngineMode {
        Provisioned => "provisioned",
        Serverless => "serverless",
    }
}

static SCHEMA: SchemaCell = SchemaCell::new(|| {
    let serverless_v2 = Schema::strict("serverlessv2_scaling_configuration")
        .field(
            FieldDescriptor::float("min_capacity")
                .required()
                .float_range(0.0, 256.0),
        )
        .field(
            FieldDescriptor::float("max_capacity")
                .required()
                .float_range(1.0, 256.0),
        )
        .build()?;
    let scaling = Schema::strict("scaling_configuration")
        .field(FieldDescriptor::integer("min_capacity").default(1))
        .field(FieldDescriptor::integer("max_capacity").default(16))
        .field(FieldDescriptor::boolean("auto_pause").default(true))
        .field(
            FieldDescriptor::integer("seconds_until_auto_pause")
                .range(300, 86_400)
                .default(300),
        )
        .build()?;

    Schema::strict(RdsCluster::KIND)
        .field(
            FieldDescriptor::string("cluster_identifier")
                .required()
                .pattern(r"[a-z][a-z0-9-]*")
                .length(1, 63),
        )
        .field(FieldDescriptor::string("engine").required().one_of(Engine::VALUES))
        .field(FieldDescriptor::string("engine_version"))
        .field(
            FieldDescriptor::string("engine_mode")
                .one_of(EngineMode::VALUES)
                .default("provisioned"),
        )
        .field(
            FieldDescriptor::string("database_name")
                .pattern(r"[a-zA-Z][a-zA-Z0-9_]*")
                .length(1, 64),
        )
        .field(FieldDescriptor::string("master_username").length(1, 16))
        .field(FieldDescriptor::string("master_password").length(8, 128))
        .field(FieldDescriptor::boolean("manage_master_user_password"))
        .field(FieldDescriptor::string("snapshot_identifier"))
        .field(
            FieldDescriptor::integer("backup_retention_period")
                .range(1, 35)
                .default(1),
        )
        .field(
            FieldDescriptor::string("preferred_backup_window")
                .pattern(r"\d{2}:\d{2}-\d{2}:\d{2}"),
        )
        .field(
            FieldDescriptor::string("preferred_maintenance_window")
                .pattern(r"[a-zA-Z]{3}:\d{2}:\d{2}-[a-zA-Z]{3}:\d{2}:\d{2}"),
        )
        .field(FieldDescriptor::string_array("availability_zones").max_items(3))
        .field(FieldDescriptor::boolean("storage_encrypted").default(false))
        .field(FieldDescriptor::string("kms_key_id"))
        .field(FieldDescriptor::boolean("deletion_protection").default(false))
        .field(FieldDescriptor::boolean("skip_final_snapshot").default(false))
        .field(FieldDescriptor::string("final_snapshot_identifier").length(1, 255))
        .field(FieldDescriptor::object(
            "serverlessv2_scaling_configuration",
            serverless_v2,
        ))
        .field(FieldDescriptor::object("scaling_configuration", scaling))
        .field(FieldDescriptor::string_array("enabled_cloudwatch_logs_exports"))
        .field(FieldDescriptor::boolean("iam_database_authentication_enabled").default(false))
        .field(FieldDescriptor::integer("port").range(1150, 65_535))
        .field(FieldDescriptor::tags())
        .build()
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerlessV2Scaling {
    pub min_capacity: f64,
    pub max_capacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerlessV1Scaling {
    pub min_capacity: i64,
    pub max_capacity: i64,
    pub auto_pause: bool,
    pub seconds_until_auto_pause: i64,
}

/// Attributes of an `aws_rds_cluster`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RdsCluster {
    pub cluster_identifier: String,
    pub engine: Engine,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_version: Option<String>,
    pub engine_mode: EngineMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manage_master_user_password: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_identifier: Option<String>,
    /// Days
    pub backup_retention_period: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_backup_window: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_maintenance_window: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_zones: Option<Vec<String>>,
    pub storage_encrypted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kms_key_id: Option<String>,
    pub deletion_protection: bool,
    pub skip_final_snapshot: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_snapshot_identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serverlessv2_scaling_configuration: Option<ServerlessV2Scaling>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scaling_configuration: Option<ServerlessV1Scaling>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled_cloudwatch_logs_exports: Option<Vec<String>>,
    pub iam_database_authentication_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
}

impl ResourceAttributes for RdsCluster {
    const KIND: &'static str = "aws_rds_cluster";

    fn schema() -> SchemaResult<&'static Schema> {
        SCHEMA.get()
    }

    fn check_formats(&self) -> ValidationResult<()> {
        check_tags(self.tags.as_ref())?;

        let identifier = &self.cluster_identifier;
        if identifier.contains("--") || identifier.ends_with('-') {
            return Err(ValidationError::invalid_format(
                "cluster_identifier",
                "must not contain consecutive hyphens or end with a hyphen",
            ));
        }

        self.backup_window()?;
        self.maintenance_window()?;
        Ok(())
    }

    fn validate(&self) -> ValidationResult<()> {
        self.validate_credentials()?;

        require_if(
            self.kms_key_id.is_some(),
            "storage_encrypted",
            self.storage_encrypted,
            "kms_key_id is set",
        )?;
        require_if(
            !self.skip_final_snapshot,
            "final_snapshot_identifier",
            self.final_snapshot_identifier.is_some(),
            "skip_final_snapshot is false",
        )?;

        self.validate_windows()?;
        self.validate_scaling()?;

        if let Some(exports) = &self.enabled_cloudwatch_logs_exports {
            let allowed = self.engine.log_exports();
            if let Some(invalid) = exports.iter().find(|e| !allowed.contains(&e.as_str())) {
                return Err(ValidationError::cross_field(
                    ["enabled_cloudwatch_logs_exports", "engine"],
                    format!(
                        "log type '{}' is not available for {} (expected one of {:?})",
                        invalid, self.engine, allowed
                    ),
                ));
            }
        }

        Ok(())
    }

    fn properties(&self) -> ComputedProperties {
        ComputedProperties::new()
            .with("is_serverless", self.is_serverless())
            .with("serverless_version", self.serverless_version())
            .with("is_multi_az", self.is_multi_az())
            .with("engine_family", self.engine.family())
            .with("effective_port", self.effective_port())
            .with("backup_window_minutes", self.backup_window_minutes())
            .with("is_encrypted", self.storage_encrypted)
            .with("backup_retention_class", self.backup_retention_class())
            .with("estimated_monthly_cost", self.estimated_monthly_cost())
    }

    fn advisories(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !self.storage_encrypted {
            warnings.push("Cluster storage is not encrypted".to_string());
        }
        if !self.deletion_protection {
            warnings.push("Deletion protection is disabled".to_string());
        }
        if self.backup_retention_period == 1 {
            warnings.push("Backups are only retained for one day".to_string());
        }
        warnings
    }
}

impl RdsCluster {
    fn has_managed_password(&self) -> bool {
        self.manage_master_user_password == Some(true)
    }

    fn validate_credentials(&self) -> ValidationResult<()> {
        at_most_one_of(&[
            ("master_password", self.master_password.is_some()),
            ("manage_master_user_password", self.has_managed_password()),
        ])?;

        if self.snapshot_identifier.is_some() {
            return Ok(());
        }
        if self.master_username.is_none() {
            return Err(ValidationError::requires(
                "master_username",
                "not restoring from a snapshot",
            ));
        }
        require_if(
            !self.has_managed_password(),
            "master_password",
            self.master_password.is_some(),
            "not restoring from a snapshot and the password is not managed",
        )
    }

    fn backup_window(&self) -> ValidationResult<Option<TimeWindow>> {
        self.preferred_backup_window
            .as_deref()
            .map(|w| TimeWindow::parse("preferred_backup_window", w))
            .transpose()
    }

    fn maintenance_window(&self) -> ValidationResult<Option<WeeklyTimeWindow>> {
        self.preferred_maintenance_window
            .as_deref()
            .map(|w| WeeklyTimeWindow::parse("preferred_maintenance_window", w))
            .transpose()
    }

    fn validate_windows(&self) -> ValidationResult<()> {
        let backup = self.backup_window()?;
        let maintenance = self.maintenance_window()?;

        if let Some(backup) = &backup {
            if backup.duration_minutes() < MINIMUM_WINDOW_MINUTES {
                return Err(ValidationError::cross_field(
                    ["preferred_backup_window"],
                    format!("window must last at least {MINIMUM_WINDOW_MINUTES} minutes"),
                ));
            }
        }
        if let Some(maintenance) = &maintenance {
            if maintenance.duration_minutes() < MINIMUM_WINDOW_MINUTES {
                return Err(ValidationError::cross_field(
                    ["preferred_maintenance_window"],
                    format!("window must last at least {MINIMUM_WINDOW_MINUTES} minutes"),
                ));
            }
        }
        if let (Some(backup), Some(maintenance)) = (&backup, &maintenance) {
            if maintenance.overlaps_daily(backup) {
                return Err(ValidationError::cross_field(
                    ["preferred_backup_window", "preferred_maintenance_window"],
                    "backup and maintenance windows must not overlap",
                ));
            }
        }
        Ok(())
    }

    fn validate_scaling(&self) -> ValidationResult<()> {
        let serverless = self.engine_mode == EngineMode::Serverless;
        require_if(
            serverless,
            "scaling_configuration",
            self.scaling_configuration.is_some(),
            "engine_mode is serverless",
        )?;
        if !serverless && self.scaling_configuration.is_some() {
            return Err(ValidationError::forbidden(
                "scaling_configuration",
                "engine_mode is provisioned",
            ));
        }
        if serverless && self.serverlessv2_scaling_configuration.is_some() {
            return Err(ValidationError::forbidden(
                "serverlessv2_scaling_configuration",
                "engine_mode is serverless",
            ));
        }

        if let Some(v2) = &self.serverlessv2_scaling_configuration {
            let half_steps = |capacity: f64| (capacity * 2.0).fract() == 0.0;
            if !half_steps(v2.min_capacity) || !half_steps(v2.max_capacity) {
                return Err(ValidationError::cross_field(
                    ["serverlessv2_scaling_configuration"],
                    "capacities must be multiples of 0.5",
                ));
            }
            if v2.min_capacity > v2.max_capacity {
                return Err(ValidationError::cross_field(
                    [
                        "serverlessv2_scaling_configuration.min_capacity",
                        "serverlessv2_scaling_configuration.max_capacity",
                    ],
                    "min_capacity must not exceed max_capacity",
                ));
            }
        }

        if let Some(v1) = &self.scaling_configuration {
            let allowed = self.engine.serverless_v1_capacities();
            for (attribute, capacity) in [
                ("scaling_configuration.min_capacity", v1.min_capacity),
                ("scaling_configuration.max_capacity", v1.max_capacity),
            ] {
                if !allowed.contains(&capacity) {
                    return Err(ValidationError::cross_field(
                        [attribute, "engine"],
                        format!(
                            "capacity {} is not available for {} (expected one of {:?})",
                            capacity, self.engine, allowed
                        ),
                    ));
                }
            }
            if v1.min_capacity > v1.max_capacity {
                return Err(ValidationError::cross_field(
                    [
                        "scaling_configuration.min_capacity",
                        "scaling_configuration.max_capacity",
                    ],
                    "min_capacity must not exceed max_capacity",
                ));
            }
        }
        Ok(())
    }

    pub fn is_serverless(&self) -> bool {
        self.serverless_version().is_some()
    }

    /// `v1`, `v2`, or `None` for provisioned clusters.
    pub fn serverless_version(&self) -> Option<&'static str> {
        if self.engine_mode == EngineMode::Serverless {
            Some("v1")
        } else if self.serverlessv2_scaling_configuration.is_some() {
            Some("v2")
        } else {
            None
        }
    }

    pub fn is_multi_az(&self) -> bool {
        self.availability_zones
            .as_ref()
            .is_some_and(|zones| zones.len() > 1)
    }

    pub fn effective_port(&self) -> i64 {
        self.port.unwrap_or_else(|| self.engine.default_port())
    }

    pub fn backup_window_minutes(&self) -> Option<u32> {
        self.backup_window()
            .ok()
            .flatten()
            .map(|window| window.duration_minutes())
    }

    /// `minimal` (one day), `standard` (up to a week) or `extended`.
    pub fn backup_retention_class(&self) -> &'static str {
        match self.backup_retention_period {
            1 => "minimal",
            2..=7 => "standard",
            _ => "extended",
        }
    }

    /// Minimum-capacity compute cost for serverless clusters.
    pub fn estimated_monthly_cost(&self) -> Option<f64> {
        let cost = match (&self.scaling_configuration, &self.serverlessv2_scaling_configuration) {
            (Some(v1), _) if self.engine_mode == EngineMode::Serverless => {
                v1.min_capacity as f64 * V1_ACU_HOUR_PRICE * HOURS_PER_MONTH
            }
            (_, Some(v2)) => v2.min_capacity * V2_ACU_HOUR_PRICE * HOURS_PER_MONTH,
            _ => return None,
        };
        Some(round_currency(cost))
    }
}

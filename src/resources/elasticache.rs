//! ElastiCache replication groups.

use crate::error::{SchemaResult, ValidationError, ValidationResult};
use crate::resource::value_objects::rules::require_if;
use crate::resource::value_objects::{Tags, TimeWindow, WeeklyTimeWindow, check_tags};
use crate::resource::{
    ComputedProperties, HOURS_PER_MONTH, ResourceAttributes, round_currency, string_enum,
};
use crate::schema::{FieldDescriptor, Schema, SchemaCell};
use serde::{Deserialize, Serialize};

const MINIMUM_SNAPSHOT_WINDOW_MINUTES: u32 = 60;

/// On-demand hourly node prices.
const NODE_HOUR_PRICES: &[(&str, f64)] = &[
    ("cache.t3.micro", 0.017),
    ("cache.t3.small", 0.034),
    ("cache.t3.medium", 0.068),
    ("cache.t4g.micro", 0.016),
    ("cache.t4g.small", 0.032),
    ("cache.t4g.medium", 0.065),
    ("cache.m5.large", 0.156),
    ("cache.m6g.large", 0.149),
    ("cache.m7g.large", 0.158),
    ("cache.r5.large", 0.216),
    ("cache.r6g.large", 0.206),
    ("cache.r6g.xlarge", 0.411),
    ("cache.r7g.large", 0.219),
];

string_enum! {
    pub enum CacheEngine {
        Redis => "redis",
        Valkey => "valkey",
    }
}

static SCHEMA: SchemaCell = SchemaCell::new(|| {
    Schema::strict(ReplicationGroup::KIND)
        .field(
            FieldDescriptor::string("replication_group_id")
                .required()
                .pattern(r"[a-zA-Z][a-zA-Z0-9-]*")
                .length(1, 40),
        )
        .field(FieldDescriptor::string("description").required().length(1, 255))
        .field(
            FieldDescriptor::string("engine")
                .one_of(CacheEngine::VALUES)
                .default("redis"),
        )
        .field(FieldDescriptor::string("engine_version"))
        .field(
            FieldDescriptor::string("node_type")
                .required()
                .pattern(r"cache\.[a-z0-9]+\.[a-z0-9]+"),
        )
        .field(FieldDescriptor::integer("num_cache_clusters").range(1, 6))
        .field(FieldDescriptor::integer("num_node_groups").range(1, 500))
        .field(FieldDescriptor::integer("replicas_per_node_group").range(0, 5))
        .field(FieldDescriptor::boolean("automatic_failover_enabled").default(false))
        .field(FieldDescriptor::boolean("multi_az_enabled").default(false))
        .field(FieldDescriptor::integer("port").range(1, 65_535).default(6379))
        .field(FieldDescriptor::boolean("at_rest_encryption_enabled").default(false))
        .field(FieldDescriptor::boolean("transit_encryption_enabled").default(false))
        .field(FieldDescriptor::string("auth_token").length(16, 128))
        .field(FieldDescriptor::string("kms_key_id"))
        .field(
            FieldDescriptor::integer("snapshot_retention_limit")
                .range(0, 35)
                .default(0),
        )
        .field(FieldDescriptor::string("snapshot_window").pattern(r"\d{2}:\d{2}-\d{2}:\d{2}"))
        .field(
            FieldDescriptor::string("maintenance_window")
                .pattern(r"[a-zA-Z]{3}:\d{2}:\d{2}-[a-zA-Z]{3}:\d{2}:\d{2}"),
        )
        .field(FieldDescriptor::string("subnet_group_name"))
        .field(FieldDescriptor::string_array("security_group_ids"))
        .field(FieldDescriptor::tags())
        .build()
});

/// Attributes of an `aws_elasticache_replication_group`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicationGroup {
    pub replication_group_id: String,
    pub description: String,
    pub engine: CacheEngine,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_version: Option<String>,
    pub node_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_cache_clusters: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_node_groups: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicas_per_node_group: Option<i64>,
    pub automatic_failover_enabled: bool,
    pub multi_az_enabled: bool,
    pub port: i64,
    pub at_rest_encryption_enabled: bool,
    pub transit_encryption_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kms_key_id: Option<String>,
    pub snapshot_retention_limit: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_window: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance_window: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet_group_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_group_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
}

impl ResourceAttributes for ReplicationGroup {
    const KIND: &'static str = "aws_elasticache_replication_group";

    fn schema() -> SchemaResult<&'static Schema> {
        SCHEMA.get()
    }

    fn check_formats(&self) -> ValidationResult<()> {
        check_tags(self.tags.as_ref())?;
        if let Some(window) = &self.snapshot_window {
            TimeWindow::parse("snapshot_window", window)?;
        }
        if let Some(window) = &self.maintenance_window {
            WeeklyTimeWindow::parse("maintenance_window", window)?;
        }
        Ok(())
    }

    fn validate(&self) -> ValidationResult<()> {
        if self.num_cache_clusters.is_some() {
            let sizing = [
                ("num_node_groups", self.num_node_groups.is_some()),
                ("replicas_per_node_group", self.replicas_per_node_group.is_some()),
            ];
            if let Some((attribute, _)) = sizing.iter().find(|(_, present)| *present) {
                return Err(ValidationError::mutually_exclusive(
                    "num_cache_clusters",
                    *attribute,
                ));
            }
        }
        require_if(
            self.replicas_per_node_group.is_some(),
            "num_node_groups",
            self.num_node_groups.is_some(),
            "replicas_per_node_group is set",
        )?;

        require_if(
            self.multi_az_enabled,
            "automatic_failover_enabled",
            self.automatic_failover_enabled,
            "multi_az_enabled is true",
        )?;
        if self.automatic_failover_enabled && self.total_node_count() < 2 {
            return Err(ValidationError::cross_field(
                ["automatic_failover_enabled", "num_cache_clusters"],
                "automatic failover requires at least 2 nodes",
            ));
        }

        require_if(
            self.auth_token.is_some(),
            "transit_encryption_enabled",
            self.transit_encryption_enabled,
            "auth_token is set",
        )?;
        require_if(
            self.kms_key_id.is_some(),
            "at_rest_encryption_enabled",
            self.at_rest_encryption_enabled,
            "kms_key_id is set",
        )?;

        if let Some(window) = &self.snapshot_window {
            let window = TimeWindow::parse("snapshot_window", window)?;
            if window.duration_minutes() < MINIMUM_SNAPSHOT_WINDOW_MINUTES {
                return Err(ValidationError::cross_field(
                    ["snapshot_window"],
                    format!("window must last at least {MINIMUM_SNAPSHOT_WINDOW_MINUTES} minutes"),
                ));
            }
        }
        Ok(())
    }

    fn properties(&self) -> ComputedProperties {
        ComputedProperties::new()
            .with("cluster_mode_enabled", self.cluster_mode_enabled())
            .with("shard_count", self.shard_count())
            .with("total_node_count", self.total_node_count())
            .with("is_multi_az", self.multi_az_enabled)
            .with("is_highly_available", self.is_highly_available())
            .with("is_fully_encrypted", self.is_fully_encrypted())
            .with("node_family", self.node_family())
            .with("estimated_monthly_cost", self.estimated_monthly_cost())
    }

    fn advisories(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !self.is_fully_encrypted() {
            warnings.push("Encryption at rest and in transit are not both enabled".to_string());
        }
        if self.snapshot_retention_limit == 0 {
            warnings.push("Automatic snapshots are disabled".to_string());
        }
        if self.total_node_count() == 1 {
            warnings.push("A single node has no replica to fail over to".to_string());
        }
        warnings
    }
}

impl ReplicationGroup {
    pub fn cluster_mode_enabled(&self) -> bool {
        self.num_node_groups.is_some()
    }

    pub fn shard_count(&self) -> i64 {
        self.num_node_groups.unwrap_or(1)
    }

    /// Primary and replica nodes across every shard.
    pub fn total_node_count(&self) -> i64 {
        if self.cluster_mode_enabled() {
            self.shard_count() * (1 + self.replicas_per_node_group.unwrap_or(1))
        } else {
            self.num_cache_clusters.unwrap_or(1)
        }
    }

    pub fn is_highly_available(&self) -> bool {
        self.automatic_failover_enabled && self.total_node_count() >= 2
    }

    pub fn is_fully_encrypted(&self) -> bool {
        self.at_rest_encryption_enabled && self.transit_encryption_enabled
    }

    /// Instance family, e.g. `r6g` for `cache.r6g.large`.
    pub fn node_family(&self) -> &str {
        self.node_type.split('.').nth(1).unwrap_or_default()
    }

    /// `None` when the node type has no known price.
    pub fn estimated_monthly_cost(&self) -> Option<f64> {
        let (_, hourly) = NODE_HOUR_PRICES
            .iter()
            .find(|(node_type, _)| *node_type == self.node_type)?;
        Some(round_currency(
            hourly * self.total_node_count() as f64 * HOURS_PER_MONTH,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResourceError;
    use serde_json::{Value, json};

    fn group(extra: Value) -> Value {
        let mut base = json!({
            "replication_group_id": "sessions",
            "description": "session cache",
            "node_type": "cache.r6g.large"
        });
        if let (Some(base), Some(extra)) = (base.as_object_mut(), extra.as_object()) {
            base.extend(extra.clone());
        }
        base
    }

    #[test]
    fn test_defaults() {
        let cache = ReplicationGroup::build(&group(json!({}))).unwrap();
        assert_eq!(cache.port, 6379);
        assert_eq!(cache.engine, CacheEngine::Redis);
        assert_eq!(cache.total_node_count(), 1);
        assert_eq!(cache.node_family(), "r6g");
        // 0.206 * 730
        assert_eq!(cache.estimated_monthly_cost(), Some(150.38));
    }

    #[test]
    fn test_sizing_modes_exclusive() {
        let result = ReplicationGroup::build(&group(json!({
            "num_cache_clusters": 2,
            "num_node_groups": 2
        })));
        assert!(matches!(
            result,
            Err(ResourceError::Validation(ValidationError::MutuallyExclusive { .. }))
        ));
        assert!(ReplicationGroup::build(&group(json!({"replicas_per_node_group": 1}))).is_err());
    }

    #[test]
    fn test_cluster_mode_nodes() {
        let cache = ReplicationGroup::build(&group(json!({
            "num_node_groups": 3,
            "replicas_per_node_group": 2,
            "automatic_failover_enabled": true,
            "multi_az_enabled": true
        })))
        .unwrap();
        assert!(cache.cluster_mode_enabled());
        assert_eq!(cache.shard_count(), 3);
        assert_eq!(cache.total_node_count(), 9);
        assert!(cache.is_highly_available());
    }

    #[test]
    fn test_failover_rules() {
        assert!(ReplicationGroup::build(&group(json!({"multi_az_enabled": true}))).is_err());
        let result = ReplicationGroup::build(&group(json!({"automatic_failover_enabled": true})));
        assert!(result.unwrap_err().to_string().contains("at least 2 nodes"));
        assert!(ReplicationGroup::build(&group(json!({
            "automatic_failover_enabled": true,
            "num_cache_clusters": 2
        })))
        .is_ok());
    }

    #[test]
    fn test_encryption_rules() {
        assert!(ReplicationGroup::build(&group(json!({
            "auth_token": "a-very-long-secret-token"
        })))
        .is_err());
        assert!(ReplicationGroup::build(&group(json!({"kms_key_id": "alias/cache"}))).is_err());
        let cache = ReplicationGroup::build(&group(json!({
            "auth_token": "a-very-long-secret-token",
            "transit_encryption_enabled": true,
            "at_rest_encryption_enabled": true,
            "kms_key_id": "alias/cache"
        })))
        .unwrap();
        assert!(cache.is_fully_encrypted());
    }

    #[test]
    fn test_snapshot_window() {
        assert!(ReplicationGroup::build(&group(json!({"snapshot_window": "05:00-05:30"}))).is_err());
        assert!(ReplicationGroup::build(&group(json!({"snapshot_window": "23:30-00:30"}))).is_ok());
    }

    #[test]
    fn test_window_format_reported_before_failover_rule() {
        let err = ReplicationGroup::build(&group(json!({
            "multi_az_enabled": true,
            "snapshot_window": "25:00-26:00"
        })))
        .unwrap_err();
        match err {
            ResourceError::Validation(err) => {
                assert!(err.is_structural());
                assert!(err.to_string().contains("snapshot_window"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_unknown_node_type_has_no_cost() {
        let cache = ReplicationGroup::build(&group(json!({"node_type": "cache.x2gd.large"}))).unwrap();
        assert_eq!(cache.estimated_monthly_cost(), None);
        assert!(ReplicationGroup::build(&group(json!({"node_type": "r6g.large"}))).is_err());
    }
}

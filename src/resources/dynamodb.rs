//! DynamoDB tables.

use crate::error::{SchemaResult, ValidationError, ValidationResult};
use crate::resource::value_objects::rules::{forbid_if, must_reference, require_if, unique_by};
use crate::resource::value_objects::{Tags, check_tags};
use crate::resource::{
    ComputedProperties, HOURS_PER_MONTH, ResourceAttributes, round_currency, sorted_distinct,
    string_enum,
};
use crate::schema::{FieldDescriptor, Schema, SchemaCell};
use serde::{Deserialize, Serialize};

/// Hourly price of a replicated write capacity unit
pub const REPLICATED_WCU_HOUR_PRICE: f64 = 0.000_975;

string_enum! {
    pub enum BillingMode {
        Provisioned => "PROVISIONED",
        PayPerRequest => "PAY_PER_REQUEST",
    }
}

string_enum! {
    pub enum AttributeKind {
        String => "S",
        Number => "N",
        Binary => "B",
    }
}

string_enum! {
    pub enum ProjectionType {
        All => "ALL",
        KeysOnly => "KEYS_ONLY",
        Include => "INCLUDE",
    }
}

string_enum! {
    pub enum StreamViewType {
        KeysOnly => "KEYS_ONLY",
        NewImage => "NEW_IMAGE",
        OldImage => "OLD_IMAGE",
        NewAndOldImages => "NEW_AND_OLD_IMAGES",
    }
}

string_enum! {
    pub enum TableClass {
        Standard => "STANDARD",
        StandardInfrequentAccess => "STANDARD_INFREQUENT_ACCESS",
    }
}

impl TableClass {
    /// Hourly (read, write) capacity unit prices.
    pub fn capacity_prices(&self) -> (f64, f64) {
        match self {
            Self::Standard => (0.000_13, 0.000_65),
            Self::StandardInfrequentAccess => (0.000_16, 0.000_81),
        }
    }
}

const KEY_PATTERN: &str = r"[a-zA-Z0-9_.-]+";

static SCHEMA: SchemaCell = SchemaCell::new(|| {
    let attribute = Schema::strict("attribute")
        .field(FieldDescriptor::string("name").required().length(1, 255))
        .field(
            FieldDescriptor::string("type")
                .required()
                .one_of(AttributeKind::VALUES),
        )
        .build()?;
    let global_index = Schema::strict("global_secondary_index")
        .field(FieldDescriptor::string("name").required().pattern(KEY_PATTERN).length(3, 255))
        .field(FieldDescriptor::string("hash_key").required())
        .field(FieldDescriptor::string("range_key"))
        .field(
            FieldDescriptor::string("projection_type")
                .one_of(ProjectionType::VALUES)
                .default("ALL"),
        )
        .field(FieldDescriptor::string_array("non_key_attributes").items(1, 20))
        .field(FieldDescriptor::integer("read_capacity").range(1, 40_000))
        .field(FieldDescriptor::integer("write_capacity").range(1, 40_000))
        .build()?;
    let local_index = Schema::strict("local_secondary_index")
        .field(FieldDescriptor::string("name").required().pattern(KEY_PATTERN).length(3, 255))
        .field(FieldDescriptor::string("range_key").required())
        .field(
            FieldDescriptor::string("projection_type")
                .one_of(ProjectionType::VALUES)
                .default("ALL"),
        )
        .field(FieldDescriptor::string_array("non_key_attributes").items(1, 20))
        .build()?;
    let ttl = Schema::strict("ttl")
        .field(FieldDescriptor::string("attribute_name").required().length(1, 255))
        .field(FieldDescriptor::boolean("enabled").default(true))
        .build()?;
    let server_side_encryption = Schema::strict("server_side_encryption")
        .field(FieldDescriptor::boolean("enabled").default(false))
        .field(FieldDescriptor::string("kms_key_arn"))
        .build()?;
    let replica = Schema::strict("replica")
        .field(
            FieldDescriptor::string("region_name")
                .required()
                .pattern(r"[a-z]{2}(-[a-z]+)+-\d"),
        )
        .field(FieldDescriptor::string("kms_key_arn"))
        .build()?;

    Schema::strict(DynamoDbTable::KIND)
        .field(
            FieldDescriptor::string("name")
                .required()
                .pattern(KEY_PATTERN)
                .length(3, 255),
        )
        .field(
            FieldDescriptor::string("billing_mode")
                .one_of(BillingMode::VALUES)
                .default("PROVISIONED"),
        )
        .field(FieldDescriptor::string("hash_key").required().length(1, 255))
        .field(FieldDescriptor::string("range_key").length(1, 255))
        .field(FieldDescriptor::integer("read_capacity").range(1, 40_000))
        .field(FieldDescriptor::integer("write_capacity").range(1, 40_000))
        .field(FieldDescriptor::object_array("attributes", attribute).required().min_items(1))
        .field(FieldDescriptor::object_array("global_secondary_indexes", global_index).max_items(20))
        .field(FieldDescriptor::object_array("local_secondary_indexes", local_index).max_items(5))
        .field(FieldDescriptor::boolean("stream_enabled").default(false))
        .field(FieldDescriptor::string("stream_view_type").one_of(StreamViewType::VALUES))
        .field(FieldDescriptor::object("ttl", ttl))
        .field(FieldDescriptor::boolean("point_in_time_recovery").default(false))
        .field(FieldDescriptor::object("server_side_encryption", server_side_encryption))
        .field(FieldDescriptor::object_array("replicas", replica))
        .field(
            FieldDescriptor::string("table_class")
                .one_of(TableClass::VALUES)
                .default("STANDARD"),
        )
        .field(FieldDescriptor::boolean("deletion_protection_enabled").default(false))
        .field(FieldDescriptor::tags())
        .build()
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AttributeKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalSecondaryIndex {
    pub name: String,
    pub hash_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range_key: Option<String>,
    pub projection_type: ProjectionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub non_key_attributes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_capacity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_capacity: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalSecondaryIndex {
    pub name: String,
    pub range_key: String,
    pub projection_type: ProjectionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub non_key_attributes: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeToLive {
    pub attribute_name: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableEncryption {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kms_key_arn: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Replica {
    pub region_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kms_key_arn: Option<String>,
}

/// Attributes of an `aws_dynamodb_table`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamoDbTable {
    pub name: String,
    pub billing_mode: BillingMode,
    pub hash_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_capacity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_capacity: Option<i64>,
    pub attributes: Vec<AttributeDefinition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_secondary_indexes: Option<Vec<GlobalSecondaryIndex>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_secondary_indexes: Option<Vec<LocalSecondaryIndex>>,
    pub stream_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_view_type: Option<StreamViewType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<TimeToLive>,
    pub point_in_time_recovery: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_side_encryption: Option<TableEncryption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicas: Option<Vec<Replica>>,
    pub table_class: TableClass,
    pub deletion_protection_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
}

impl ResourceAttributes for DynamoDbTable {
    const KIND: &'static str = "aws_dynamodb_table";

    fn schema() -> SchemaResult<&'static Schema> {
        SCHEMA.get()
    }

    fn validate(&self) -> ValidationResult<()> {
        check_tags(self.tags.as_ref())?;
        unique_by("attributes", &self.attributes, |a| a.name.as_str())?;
        self.validate_capacity()?;
        self.validate_keys()?;

        if !self.local_indexes().is_empty() && self.range_key.is_none() {
            return Err(ValidationError::requires(
                "range_key",
                "local_secondary_indexes are declared",
            ));
        }

        require_if(
            self.stream_enabled,
            "stream_view_type",
            self.stream_view_type.is_some(),
            "stream_enabled is true",
        )?;
        forbid_if(
            !self.stream_enabled,
            "stream_view_type",
            self.stream_view_type.is_some(),
            "stream_enabled is false",
        )?;

        let projections = self
            .global_indexes()
            .iter()
            .enumerate()
            .map(|(i, gsi)| {
                (
                    format!("global_secondary_indexes[{i}]"),
                    gsi.projection_type,
                    gsi.non_key_attributes.is_some(),
                )
            })
            .chain(self.local_indexes().iter().enumerate().map(|(i, lsi)| {
                (
                    format!("local_secondary_indexes[{i}]"),
                    lsi.projection_type,
                    lsi.non_key_attributes.is_some(),
                )
            }));
        for (path, projection, has_non_key) in projections {
            let include = projection == ProjectionType::Include;
            let attribute = format!("{path}.non_key_attributes");
            require_if(include, &attribute, has_non_key, "projection_type is INCLUDE")?;
            forbid_if(!include, &attribute, has_non_key, "projection_type is not INCLUDE")?;
        }

        if self.is_global_table() {
            if self.stream_view_type != Some(StreamViewType::NewAndOldImages) {
                return Err(ValidationError::cross_field(
                    ["replicas", "stream_enabled", "stream_view_type"],
                    "replicas require a NEW_AND_OLD_IMAGES stream",
                ));
            }
            unique_by("replicas", self.replicas(), |r| r.region_name.as_str())?;
        }

        Ok(())
    }

    fn properties(&self) -> ComputedProperties {
        ComputedProperties::new()
            .with("has_range_key", self.range_key.is_some())
            .with("is_pay_per_request", self.is_pay_per_request())
            .with("gsi_count", self.global_indexes().len())
            .with("lsi_count", self.local_indexes().len())
            .with("index_count", self.index_count())
            .with("is_global_table", self.is_global_table())
            .with("replica_regions", self.replica_regions())
            .with("has_ttl", self.has_ttl())
            .with("has_stream", self.stream_enabled)
            .with("total_read_capacity", self.total_read_capacity())
            .with("total_write_capacity", self.total_write_capacity())
            .with("estimated_monthly_cost", self.estimated_monthly_cost())
    }

    fn advisories(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !self.point_in_time_recovery {
            warnings.push("Point-in-time recovery is disabled".to_string());
        }
        if !self.deletion_protection_enabled {
            warnings.push("Deletion protection is disabled".to_string());
        }
        warnings
    }
}

impl DynamoDbTable {
    fn global_indexes(&self) -> &[GlobalSecondaryIndex] {
        self.global_secondary_indexes.as_deref().unwrap_or_default()
    }

    fn local_indexes(&self) -> &[LocalSecondaryIndex] {
        self.local_secondary_indexes.as_deref().unwrap_or_default()
    }

    fn replicas(&self) -> &[Replica] {
        self.replicas.as_deref().unwrap_or_default()
    }

    fn validate_capacity(&self) -> ValidationResult<()> {
        let provisioned = self.billing_mode == BillingMode::Provisioned;
        let mut capacities = vec![
            ("read_capacity".to_string(), self.read_capacity.is_some()),
            ("write_capacity".to_string(), self.write_capacity.is_some()),
        ];
        for (i, gsi) in self.global_indexes().iter().enumerate() {
            capacities.push((
                format!("global_secondary_indexes[{i}].read_capacity"),
                gsi.read_capacity.is_some(),
            ));
            capacities.push((
                format!("global_secondary_indexes[{i}].write_capacity"),
                gsi.write_capacity.is_some(),
            ));
        }

        for (attribute, present) in &capacities {
            require_if(provisioned, attribute, *present, "billing_mode is PROVISIONED")?;
            forbid_if(!provisioned, attribute, *present, "billing_mode is PAY_PER_REQUEST")?;
        }
        Ok(())
    }

    fn validate_keys(&self) -> ValidationResult<()> {
        let declared = || self.attributes.iter().map(|a| a.name.as_str());

        let keys = self.key_references();
        for (path, key) in &keys {
            must_reference(path, key, "attributes", declared())?;
        }

        if let Some(unused) = declared().find(|name| !keys.iter().any(|(_, key)| key == name)) {
            return Err(ValidationError::cross_field(
                ["attributes"],
                format!("attribute '{unused}' is not used by any key"),
            ));
        }
        Ok(())
    }

    /// Every key attribute reference, paired with its attribute path.
    fn key_references(&self) -> Vec<(String, &str)> {
        let mut keys = vec![("hash_key".to_string(), self.hash_key.as_str())];
        if let Some(range_key) = &self.range_key {
            keys.push(("range_key".to_string(), range_key.as_str()));
        }
        for (i, gsi) in self.global_indexes().iter().enumerate() {
            keys.push((format!("global_secondary_indexes[{i}].hash_key"), gsi.hash_key.as_str()));
            if let Some(range_key) = &gsi.range_key {
                keys.push((format!("global_secondary_indexes[{i}].range_key"), range_key.as_str()));
            }
        }
        for (i, lsi) in self.local_indexes().iter().enumerate() {
            keys.push((format!("local_secondary_indexes[{i}].range_key"), lsi.range_key.as_str()));
        }
        keys
    }

    pub fn is_pay_per_request(&self) -> bool {
        self.billing_mode == BillingMode::PayPerRequest
    }

    pub fn index_count(&self) -> usize {
        self.global_indexes().len() + self.local_indexes().len()
    }

    pub fn is_global_table(&self) -> bool {
        !self.replicas().is_empty()
    }

    pub fn replica_regions(&self) -> Vec<String> {
        sorted_distinct(self.replicas().iter().map(|r| r.region_name.as_str()))
    }

    pub fn has_ttl(&self) -> bool {
        self.ttl.as_ref().is_some_and(|ttl| ttl.enabled)
    }

    /// Table plus global index read capacity. `None` for on-demand tables.
    pub fn total_read_capacity(&self) -> Option<i64> {
        let table = self.read_capacity?;
        Some(table + self.global_indexes().iter().filter_map(|g| g.read_capacity).sum::<i64>())
    }

    pub fn total_write_capacity(&self) -> Option<i64> {
        let table = self.write_capacity?;
        Some(table + self.global_indexes().iter().filter_map(|g| g.write_capacity).sum::<i64>())
    }

    /// Provisioned capacity cost including replicated writes. On-demand
    /// tables have no fixed monthly cost.
    pub fn estimated_monthly_cost(&self) -> Option<f64> {
        if self.is_pay_per_request() {
            return None;
        }
        let read = self.total_read_capacity()? as f64;
        let write = self.total_write_capacity()? as f64;
        let (read_price, write_price) = self.table_class.capacity_prices();

        let capacity = (read * read_price + write * write_price) * HOURS_PER_MONTH;
        let replication =
            self.replicas().len() as f64 * write * REPLICATED_WCU_HOUR_PRICE * HOURS_PER_MONTH;
        Some(round_currency(capacity + replication))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResourceError;
    use serde_json::{Value, json};

    fn table(extra: Value) -> Value {
        let mut base = json!({
            "name": "orders",
            "hash_key": "id",
            "read_capacity": 5,
            "write_capacity": 5,
            "attributes": [{"name": "id", "type": "S"}]
        });
        if let (Some(base), Some(extra)) = (base.as_object_mut(), extra.as_object()) {
            base.extend(extra.clone());
        }
        base
    }

    #[test]
    fn test_provisioned_cost() {
        let orders = DynamoDbTable::build(&table(json!({}))).unwrap();
        assert_eq!(orders.billing_mode, BillingMode::Provisioned);
        assert_eq!(orders.table_class, TableClass::Standard);
        // (5 * 0.00013 + 5 * 0.00065) * 730
        assert_eq!(orders.estimated_monthly_cost(), Some(2.85));
        assert_eq!(orders.total_read_capacity(), Some(5));
    }

    #[test]
    fn test_pay_per_request_forbids_capacity() {
        let result = DynamoDbTable::build(&table(json!({"billing_mode": "PAY_PER_REQUEST"})));
        assert!(matches!(
            result,
            Err(ResourceError::Validation(ValidationError::ConditionallyForbidden { .. }))
        ));

        let raw = json!({
            "name": "orders",
            "billing_mode": "PAY_PER_REQUEST",
            "hash_key": "id",
            "attributes": [{"name": "id", "type": "S"}]
        });
        let orders = DynamoDbTable::build(&raw).unwrap();
        assert!(orders.is_pay_per_request());
        assert_eq!(orders.estimated_monthly_cost(), None);
        assert_eq!(orders.total_read_capacity(), None);
    }

    #[test]
    fn test_provisioned_requires_capacity() {
        let raw = json!({
            "name": "orders",
            "hash_key": "id",
            "attributes": [{"name": "id", "type": "S"}]
        });
        match DynamoDbTable::build(&raw) {
            Err(ResourceError::Validation(ValidationError::ConditionallyRequired {
                attribute,
                ..
            })) => assert_eq!(attribute, "read_capacity"),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_keys_reference_attributes() {
        let result = DynamoDbTable::build(&table(json!({"range_key": "created_at"})));
        assert!(matches!(
            result,
            Err(ResourceError::Validation(ValidationError::UnknownReference { .. }))
        ));

        let result = DynamoDbTable::build(&table(json!({
            "attributes": [{"name": "id", "type": "S"}, {"name": "status", "type": "S"}]
        })));
        assert!(result.unwrap_err().to_string().contains("status"));
    }

    #[test]
    fn test_duplicate_attributes() {
        let result = DynamoDbTable::build(&table(json!({
            "attributes": [{"name": "id", "type": "S"}, {"name": "id", "type": "N"}]
        })));
        assert!(matches!(
            result,
            Err(ResourceError::Validation(ValidationError::DuplicateValue { .. }))
        ));
    }

    #[test]
    fn test_indexes() {
        let orders = DynamoDbTable::build(&table(json!({
            "range_key": "created_at",
            "attributes": [
                {"name": "id", "type": "S"},
                {"name": "created_at", "type": "N"},
                {"name": "status", "type": "S"},
                {"name": "total", "type": "N"}
            ],
            "global_secondary_indexes": [{
                "name": "by_status",
                "hash_key": "status",
                "projection_type": "INCLUDE",
                "non_key_attributes": ["customer"],
                "read_capacity": 2,
                "write_capacity": 3
            }],
            "local_secondary_indexes": [{"name": "by_total", "range_key": "total"}]
        })))
        .unwrap();
        assert_eq!(orders.index_count(), 2);
        assert_eq!(orders.total_read_capacity(), Some(7));
        assert_eq!(orders.total_write_capacity(), Some(8));
    }

    #[test]
    fn test_include_requires_non_key_attributes() {
        let result = DynamoDbTable::build(&table(json!({
            "attributes": [{"name": "id", "type": "S"}, {"name": "status", "type": "S"}],
            "global_secondary_indexes": [{
                "name": "by_status",
                "hash_key": "status",
                "projection_type": "INCLUDE",
                "read_capacity": 1,
                "write_capacity": 1
            }]
        })));
        assert!(result.unwrap_err().to_string().contains("non_key_attributes"));
    }

    #[test]
    fn test_local_index_requires_range_key() {
        let result = DynamoDbTable::build(&table(json!({
            "attributes": [{"name": "id", "type": "S"}, {"name": "total", "type": "N"}],
            "local_secondary_indexes": [{"name": "by_total", "range_key": "total"}]
        })));
        assert!(result.unwrap_err().to_string().contains("range_key"));
    }

    #[test]
    fn test_stream_view_type_pairing() {
        assert!(DynamoDbTable::build(&table(json!({"stream_enabled": true}))).is_err());
        assert!(DynamoDbTable::build(&table(json!({"stream_view_type": "KEYS_ONLY"}))).is_err());
    }

    #[test]
    fn test_global_table() {
        let replicas = json!([{"region_name": "us-west-2"}, {"region_name": "eu-west-1"}]);
        assert!(DynamoDbTable::build(&table(json!({"replicas": replicas}))).is_err());

        let orders = DynamoDbTable::build(&table(json!({
            "replicas": replicas,
            "stream_enabled": true,
            "stream_view_type": "NEW_AND_OLD_IMAGES"
        })))
        .unwrap();
        assert!(orders.is_global_table());
        assert_eq!(orders.replica_regions(), vec!["eu-west-1", "us-west-2"]);
        // 2.847 + 2 * 5 * 0.000975 * 730
        assert_eq!(orders.estimated_monthly_cost(), Some(9.96));

        let duplicated = json!([{"region_name": "us-west-2"}, {"region_name": "us-west-2"}]);
        assert!(DynamoDbTable::build(&table(json!({
            "replicas": duplicated,
            "stream_enabled": true,
            "stream_view_type": "NEW_AND_OLD_IMAGES"
        })))
        .is_err());
    }
}

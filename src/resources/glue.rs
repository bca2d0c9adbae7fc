//! Glue jobs and Data Catalog tables.

use crate::error::{SchemaResult, ValidationError, ValidationResult};
use crate::resource::value_objects::rules::{
    at_most_one_of, forbid_if, must_reference, require_if, unique_by,
};
use crate::resource::value_objects::{Tags, check_tags};
use crate::resource::{ComputedProperties, ResourceAttributes, round_currency, string_enum};
use crate::schema::{FieldDescriptor, Schema, SchemaCell};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Price of one DPU-hour
pub const DPU_HOUR_PRICE: f64 = 0.44;
/// Price of one DPU-hour with the FLEX execution class
pub const FLEX_DPU_HOUR_PRICE: f64 = 0.29;

const DEFAULT_ETL_DPU: f64 = 10.0;
const PYTHON_SHELL_CAPACITIES: [f64; 2] = [0.0625, 1.0];
const MINIMUM_ETL_CAPACITY: f64 = 2.0;

string_enum! {
    pub enum JobCommand {
        GlueEtl => "glueetl",
        PythonShell => "pythonshell",
        GlueStreaming => "gluestreaming",
        GlueRay => "glueray",
    }
}

string_enum! {
    pub enum PythonVersion {
        Two => "2",
        Three => "3",
        ThreeNine => "3.9",
    }
}

string_enum! {
    pub enum GlueVersion {
        V09 => "0.9",
        V10 => "1.0",
        V20 => "2.0",
        V30 => "3.0",
        V40 => "4.0",
    }
}

impl GlueVersion {
    pub fn major(&self) -> u32 {
        match self {
            Self::V09 => 0,
            Self::V10 => 1,
            Self::V20 => 2,
            Self::V30 => 3,
            Self::V40 => 4,
        }
    }
}

string_enum! {
    pub enum WorkerType {
        Standard => "Standard",
        G1X => "G.1X",
        G2X => "G.2X",
        G4X => "G.4X",
        G8X => "G.8X",
        G025X => "G.025X",
        Z2X => "Z.2X",
    }
}

impl WorkerType {
    /// Data processing units provided by one worker.
    pub fn dpu(&self) -> f64 {
        match self {
            Self::Standard | Self::G1X => 1.0,
            Self::G2X | Self::Z2X => 2.0,
            Self::G4X => 4.0,
            Self::G8X => 8.0,
            Self::G025X => 0.25,
        }
    }
}

string_enum! {
    pub enum ExecutionClass {
        Standard => "STANDARD",
        Flex => "FLEX",
    }
}

static JOB_SCHEMA: SchemaCell = SchemaCell::new(|| {
    let command = Schema::strict("command")
        .field(
            FieldDescriptor::string("name")
                .one_of(JobCommand::VALUES)
                .default("glueetl"),
        )
        .field(
            FieldDescriptor::string("script_location")
                .required()
                .pattern(r"s3://.+"),
        )
        .field(
            FieldDescriptor::string("python_version")
                .one_of(PythonVersion::VALUES)
                .default("3"),
        )
        .build()?;
    let execution_property = Schema::strict("execution_property")
        .field(
            FieldDescriptor::integer("max_concurrent_runs")
                .at_least(1)
                .default(1),
        )
        .build()?;

    Schema::strict(GlueJob::KIND)
        .field(FieldDescriptor::string("name").required().length(1, 255))
        .field(
            FieldDescriptor::string("role_arn")
                .required()
                .pattern(r"arn:aws[a-zA-Z-]*:iam::\d{12}:role/.+"),
        )
        .field(FieldDescriptor::object("command", command).required())
        .field(FieldDescriptor::string("glue_version").one_of(GlueVersion::VALUES))
        .field(FieldDescriptor::float("max_capacity").float_range(0.0625, 100.0))
        .field(FieldDescriptor::string("worker_type").one_of(WorkerType::VALUES))
        .field(FieldDescriptor::integer("number_of_workers").range(1, 1000))
        .field(FieldDescriptor::integer("timeout").range(1, 10_080).default(2880))
        .field(FieldDescriptor::integer("max_retries").range(0, 10).default(0))
        .field(FieldDescriptor::object("execution_property", execution_property))
        .field(FieldDescriptor::string_map("default_arguments"))
        .field(FieldDescriptor::string_array("connections"))
        .field(FieldDescriptor::string("security_configuration"))
        .field(
            FieldDescriptor::string("execution_class")
                .one_of(ExecutionClass::VALUES)
                .default("STANDARD"),
        )
        .field(FieldDescriptor::tags())
        .build()
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub name: JobCommand,
    pub script_location: String,
    pub python_version: PythonVersion,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionProperty {
    pub max_concurrent_runs: i64,
}

/// Attributes of an `aws_glue_job`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlueJob {
    pub name: String,
    pub role_arn: String,
    pub command: Command,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub glue_version: Option<GlueVersion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_capacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_type: Option<WorkerType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_workers: Option<i64>,
    /// Timeout in minutes
    pub timeout: i64,
    pub max_retries: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_property: Option<ExecutionProperty>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_arguments: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connections: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_configuration: Option<String>,
    pub execution_class: ExecutionClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
}

impl ResourceAttributes for GlueJob {
    const KIND: &'static str = "aws_glue_job";

    fn schema() -> SchemaResult<&'static Schema> {
        JOB_SCHEMA.get()
    }

    fn validate(&self) -> ValidationResult<()> {
        check_tags(self.tags.as_ref())?;

        at_most_one_of(&[
            ("max_capacity", self.max_capacity.is_some()),
            ("worker_type", self.worker_type.is_some()),
        ])?;
        require_if(
            self.worker_type.is_some(),
            "number_of_workers",
            self.number_of_workers.is_some(),
            "worker_type is set",
        )?;
        require_if(
            self.number_of_workers.is_some(),
            "worker_type",
            self.worker_type.is_some(),
            "number_of_workers is set",
        )?;

        let job_type = self.command.name;
        match job_type {
            JobCommand::PythonShell => {
                if let Some(capacity) = self.max_capacity {
                    if !PYTHON_SHELL_CAPACITIES.contains(&capacity) {
                        return Err(ValidationError::cross_field(
                            ["max_capacity", "command.name"],
                            "pythonshell jobs accept a max_capacity of 0.0625 or 1.0",
                        ));
                    }
                }
                if self.worker_type.is_some() {
                    return Err(ValidationError::forbidden(
                        "worker_type",
                        "command.name is pythonshell",
                    ));
                }
            }
            JobCommand::GlueEtl => {
                if self.max_capacity.is_some_and(|c| c < MINIMUM_ETL_CAPACITY) {
                    return Err(ValidationError::cross_field(
                        ["max_capacity", "command.name"],
                        "glueetl jobs need a max_capacity of at least 2",
                    ));
                }
            }
            JobCommand::GlueStreaming | JobCommand::GlueRay => {}
        }

        if self.execution_class == ExecutionClass::Flex {
            let supported = job_type == JobCommand::GlueEtl
                && self.glue_version.is_some_and(|v| v.major() >= 3);
            if !supported {
                return Err(ValidationError::cross_field(
                    ["execution_class", "command.name", "glue_version"],
                    "FLEX execution is only available for glueetl jobs on Glue 3.0 or later",
                ));
            }
        }

        if self.worker_type == Some(WorkerType::G025X) && job_type != JobCommand::GlueStreaming {
            return Err(ValidationError::cross_field(
                ["worker_type", "command.name"],
                "G.025X workers are only available for gluestreaming jobs",
            ));
        }

        let ray_worker = self.worker_type == Some(WorkerType::Z2X);
        if (job_type == JobCommand::GlueRay) != ray_worker {
            return Err(ValidationError::cross_field(
                ["worker_type", "command.name"],
                "glueray jobs require Z.2X workers and Z.2X workers require glueray",
            ));
        }

        Ok(())
    }

    fn properties(&self) -> ComputedProperties {
        ComputedProperties::new()
            .with("job_type", self.job_type().as_str())
            .with("is_streaming", self.is_streaming())
            .with("is_python_shell", self.is_python_shell())
            .with("worker_dpu", self.worker_dpu())
            .with("total_dpu", self.total_dpu())
            .with("dpu_hour_rate", self.dpu_hour_rate())
            .with("estimated_cost_per_hour", self.estimated_cost_per_hour())
            .with("max_run_cost", self.max_run_cost())
    }

    fn advisories(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.glue_version.is_none() {
            warnings.push("glue_version is not pinned; the service default will be used".to_string());
        }
        if self.is_streaming() && self.max_retries > 0 {
            warnings.push("Retries restart streaming jobs from their last checkpoint".to_string());
        }
        warnings
    }
}

impl GlueJob {
    pub fn job_type(&self) -> JobCommand {
        self.command.name
    }

    pub fn is_streaming(&self) -> bool {
        self.job_type() == JobCommand::GlueStreaming
    }

    pub fn is_python_shell(&self) -> bool {
        self.job_type() == JobCommand::PythonShell
    }

    pub fn worker_dpu(&self) -> Option<f64> {
        self.worker_type.map(|worker| worker.dpu())
    }

    /// Capacity of one run in DPUs.
    pub fn total_dpu(&self) -> f64 {
        match (self.worker_dpu(), self.number_of_workers, self.max_capacity) {
            (Some(dpu), Some(workers), _) => dpu * workers as f64,
            (_, _, Some(capacity)) => capacity,
            _ if self.is_python_shell() => PYTHON_SHELL_CAPACITIES[0],
            _ => DEFAULT_ETL_DPU,
        }
    }

    pub fn dpu_hour_rate(&self) -> f64 {
        match self.execution_class {
            ExecutionClass::Flex => FLEX_DPU_HOUR_PRICE,
            ExecutionClass::Standard => DPU_HOUR_PRICE,
        }
    }

    pub fn estimated_cost_per_hour(&self) -> f64 {
        round_currency(self.total_dpu() * self.dpu_hour_rate())
    }

    /// Cost of one run lasting the full timeout.
    pub fn max_run_cost(&self) -> f64 {
        let hours = self.timeout as f64 / 60.0;
        round_currency(self.total_dpu() * self.dpu_hour_rate() * hours)
    }
}

string_enum! {
    pub enum TableType {
        External => "EXTERNAL_TABLE",
        VirtualView => "VIRTUAL_VIEW",
        Governed => "GOVERNED",
    }
}

fn column_schema(name: &str) -> SchemaResult<Schema> {
    Schema::strict(name)
        .field(FieldDescriptor::string("name").required().length(1, 255))
        .field(FieldDescriptor::string("type").required().length(1, 131_072))
        .field(FieldDescriptor::string("comment").max_length(255))
        .build()
}

static TABLE_SCHEMA: SchemaCell = SchemaCell::new(|| {
    let ser_de_info = Schema::strict("ser_de_info")
        .field(FieldDescriptor::string("serialization_library"))
        .field(FieldDescriptor::string_map("parameters"))
        .build()?;
    let storage_descriptor = Schema::strict("storage_descriptor")
        .field(FieldDescriptor::string("location"))
        .field(FieldDescriptor::string("input_format"))
        .field(FieldDescriptor::string("output_format"))
        .field(FieldDescriptor::object_array("columns", column_schema("column")?))
        .field(FieldDescriptor::boolean("compressed").default(false))
        .field(FieldDescriptor::object("ser_de_info", ser_de_info))
        .build()?;
    let partition_index = Schema::strict("partition_index")
        .field(FieldDescriptor::string("index_name").required().length(1, 255))
        .field(FieldDescriptor::string_array("keys").required().min_items(1))
        .build()?;

    Schema::strict(GlueCatalogTable::KIND)
        .field(
            FieldDescriptor::string("name")
                .required()
                .pattern(r"[a-z0-9_]+")
                .length(1, 255),
        )
        .field(FieldDescriptor::string("database_name").required().length(1, 255))
        .field(
            FieldDescriptor::string("table_type")
                .one_of(TableType::VALUES)
                .default("EXTERNAL_TABLE"),
        )
        .field(FieldDescriptor::object("storage_descriptor", storage_descriptor))
        .field(FieldDescriptor::object_array(
            "partition_keys",
            column_schema("partition_key")?,
        ))
        .field(FieldDescriptor::object_array("partition_index", partition_index).max_items(3))
        .field(FieldDescriptor::string("view_original_text"))
        .field(FieldDescriptor::string("view_expanded_text"))
        .field(FieldDescriptor::string_map("parameters"))
        .build()
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerDeInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serialization_library: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageDescriptor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<Column>>,
    pub compressed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ser_de_info: Option<SerDeInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionIndex {
    pub index_name: String,
    pub keys: Vec<String>,
}

/// Attributes of an `aws_glue_catalog_table`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlueCatalogTable {
    pub name: String,
    pub database_name: String,
    pub table_type: TableType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_descriptor: Option<StorageDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition_keys: Option<Vec<Column>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition_index: Option<Vec<PartitionIndex>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_original_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_expanded_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<BTreeMap<String, String>>,
}

impl ResourceAttributes for GlueCatalogTable {
    const KIND: &'static str = "aws_glue_catalog_table";

    fn schema() -> SchemaResult<&'static Schema> {
        TABLE_SCHEMA.get()
    }

    fn validate(&self) -> ValidationResult<()> {
        let columns = self.columns();
        let partition_keys = self.partition_keys();

        unique_by("storage_descriptor.columns", columns, |c| c.name.as_str())?;
        unique_by("partition_keys", partition_keys, |c| c.name.as_str())?;

        if let Some(key) = partition_keys
            .iter()
            .find(|key| columns.iter().any(|column| column.name == key.name))
        {
            return Err(ValidationError::cross_field(
                ["partition_keys", "storage_descriptor.columns"],
                format!("partition key '{}' is also declared as a column", key.name),
            ));
        }

        for (index, partition_index) in self.partition_index.iter().flatten().enumerate() {
            for key in &partition_index.keys {
                must_reference(
                    &format!("partition_index[{index}].keys"),
                    key,
                    "partition_keys",
                    partition_keys.iter().map(|k| k.name.as_str()),
                )?;
            }
        }

        require_if(
            self.is_view(),
            "view_original_text",
            self.view_original_text.is_some(),
            "table_type is VIRTUAL_VIEW",
        )?;
        forbid_if(
            !self.is_view(),
            "view_original_text",
            self.view_original_text.is_some(),
            "table_type is not VIRTUAL_VIEW",
        )?;
        forbid_if(
            !self.is_view(),
            "view_expanded_text",
            self.view_expanded_text.is_some(),
            "table_type is not VIRTUAL_VIEW",
        )?;

        Ok(())
    }

    fn properties(&self) -> ComputedProperties {
        ComputedProperties::new()
            .with("column_count", self.column_count())
            .with("partition_key_count", self.partition_key_count())
            .with("is_partitioned", self.is_partitioned())
            .with("is_view", self.is_view())
            .with("all_column_names", self.all_column_names())
            .with("data_format", self.data_format())
    }
}

impl GlueCatalogTable {
    fn columns(&self) -> &[Column] {
        self.storage_descriptor
            .as_ref()
            .and_then(|sd| sd.columns.as_deref())
            .unwrap_or_default()
    }

    fn partition_keys(&self) -> &[Column] {
        self.partition_keys.as_deref().unwrap_or_default()
    }

    pub fn column_count(&self) -> usize {
        self.columns().len()
    }

    pub fn partition_key_count(&self) -> usize {
        self.partition_keys().len()
    }

    pub fn is_partitioned(&self) -> bool {
        !self.partition_keys().is_empty()
    }

    pub fn is_view(&self) -> bool {
        self.table_type == TableType::VirtualView
    }

    /// Column names followed by partition key names, in declaration order.
    pub fn all_column_names(&self) -> Vec<String> {
        self.columns()
            .iter()
            .chain(self.partition_keys())
            .map(|column| column.name.clone())
            .collect()
    }

    /// Storage format inferred from the SerDe library or input format.
    pub fn data_format(&self) -> &'static str {
        let Some(descriptor) = &self.storage_descriptor else {
            return "unknown";
        };
        let hint = descriptor
            .ser_de_info
            .as_ref()
            .and_then(|info| info.serialization_library.as_deref())
            .or(descriptor.input_format.as_deref())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if hint.contains("parquet") {
            "parquet"
        } else if hint.contains("orc") {
            "orc"
        } else if hint.contains("avro") {
            "avro"
        } else if hint.contains("json") {
            "json"
        } else if hint.contains("csv") || hint.contains("lazysimpleserde") || hint.contains("textinputformat") {
            "csv"
        } else {
            "unknown"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResourceError;
    use serde_json::{Value, json};

    fn job(extra: Value) -> Value {
        let mut base = json!({
            "name": "nightly",
            "role_arn": "arn:aws:iam::123456789012:role/glue",
            "command": {"script_location": "s3://scripts/job.py"}
        });
        if let (Some(base), Some(extra)) = (base.as_object_mut(), extra.as_object()) {
            base.extend(extra.clone());
        }
        base
    }

    #[test]
    fn test_worker_type_requires_number_of_workers() {
        let result = GlueJob::build(&job(json!({"worker_type": "G.1X"})));
        match result {
            Err(ResourceError::Validation(err)) => {
                assert!(err.is_cross_field());
                assert!(err.to_string().contains("number_of_workers"));
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_max_capacity_and_worker_type_exclusive() {
        let result = GlueJob::build(&job(json!({
            "max_capacity": 10.0,
            "worker_type": "G.1X",
            "number_of_workers": 2
        })));
        assert!(matches!(
            result,
            Err(ResourceError::Validation(ValidationError::MutuallyExclusive { .. }))
        ));

        let result = GlueJob::build(&job(json!({"max_capacity": 10.0, "worker_type": "G.1X"})));
        assert!(matches!(
            result,
            Err(ResourceError::Validation(ValidationError::MutuallyExclusive { .. }))
        ));
    }

    #[test]
    fn test_max_capacity_only() {
        let glue_job = GlueJob::build(&job(json!({"max_capacity": 10}))).unwrap();
        assert_eq!(glue_job.max_capacity, Some(10.0));
        assert_eq!(glue_job.total_dpu(), 10.0);
        assert_eq!(glue_job.estimated_cost_per_hour(), 4.4);
        // 10 DPU * 0.44 * 48 hours
        assert_eq!(glue_job.max_run_cost(), 211.2);
    }

    #[test]
    fn test_defaults() {
        let glue_job = GlueJob::build(&job(json!({}))).unwrap();
        assert_eq!(glue_job.timeout, 2880);
        assert_eq!(glue_job.max_retries, 0);
        assert_eq!(glue_job.command.name, JobCommand::GlueEtl);
        assert_eq!(glue_job.command.python_version, PythonVersion::Three);
        assert_eq!(glue_job.execution_class, ExecutionClass::Standard);
        assert_eq!(glue_job.total_dpu(), 10.0);
    }

    #[test]
    fn test_python_shell_capacity() {
        let shell = json!({"name": "pythonshell", "script_location": "s3://scripts/a.py"});
        assert!(GlueJob::build(&job(json!({"command": shell, "max_capacity": 0.0625}))).is_ok());
        assert!(GlueJob::build(&job(json!({"command": shell, "max_capacity": 2.0}))).is_err());

        let glue_job = GlueJob::build(&job(json!({"command": shell}))).unwrap();
        assert!(glue_job.is_python_shell());
        assert_eq!(glue_job.total_dpu(), 0.0625);
    }

    #[test]
    fn test_etl_minimum_capacity() {
        assert!(GlueJob::build(&job(json!({"max_capacity": 1.0}))).is_err());
    }

    #[test]
    fn test_flex_execution() {
        assert!(GlueJob::build(&job(json!({"execution_class": "FLEX"}))).is_err());
        let glue_job = GlueJob::build(&job(json!({
            "execution_class": "FLEX",
            "glue_version": "4.0",
            "worker_type": "G.2X",
            "number_of_workers": 5
        })))
        .unwrap();
        assert_eq!(glue_job.total_dpu(), 10.0);
        assert_eq!(glue_job.dpu_hour_rate(), 0.29);
        assert_eq!(glue_job.estimated_cost_per_hour(), 2.9);
    }

    #[test]
    fn test_ray_and_streaming_workers() {
        let ray = json!({"name": "glueray", "script_location": "s3://scripts/a.py"});
        assert!(GlueJob::build(&job(json!({"command": ray}))).is_err());
        assert!(GlueJob::build(&job(json!({
            "command": ray,
            "worker_type": "Z.2X",
            "number_of_workers": 2
        })))
        .is_ok());
        assert!(GlueJob::build(&job(json!({
            "worker_type": "Z.2X",
            "number_of_workers": 2
        })))
        .is_err());
        assert!(GlueJob::build(&job(json!({
            "worker_type": "G.025X",
            "number_of_workers": 2
        })))
        .is_err());
    }

    fn table(extra: Value) -> Value {
        let mut base = json!({"name": "events", "database_name": "analytics"});
        if let (Some(base), Some(extra)) = (base.as_object_mut(), extra.as_object()) {
            base.extend(extra.clone());
        }
        base
    }

    #[test]
    fn test_table_columns() {
        let glue_table = GlueCatalogTable::build(&table(json!({
            "storage_descriptor": {
                "location": "s3://lake/events/",
                "columns": [{"name": "id", "type": "string"}, {"name": "payload", "type": "string"}],
                "ser_de_info": {
                    "serialization_library": "org.apache.hadoop.hive.ql.io.parquet.serde.ParquetHiveSerDe"
                }
            },
            "partition_keys": [{"name": "dt", "type": "string"}],
            "partition_index": [{"index_name": "by_dt", "keys": ["dt"]}]
        })))
        .unwrap();

        assert_eq!(glue_table.column_count(), 2);
        assert!(glue_table.is_partitioned());
        assert_eq!(glue_table.all_column_names(), vec!["id", "payload", "dt"]);
        assert_eq!(glue_table.data_format(), "parquet");
    }

    #[test]
    fn test_table_rejects_duplicate_and_colliding_columns() {
        let result = GlueCatalogTable::build(&table(json!({
            "storage_descriptor": {
                "columns": [{"name": "id", "type": "string"}, {"name": "id", "type": "int"}]
            }
        })));
        assert!(result.is_err());

        let result = GlueCatalogTable::build(&table(json!({
            "storage_descriptor": {"columns": [{"name": "dt", "type": "string"}]},
            "partition_keys": [{"name": "dt", "type": "string"}]
        })));
        assert!(result.unwrap_err().to_string().contains("dt"));
    }

    #[test]
    fn test_partition_index_references_keys() {
        let result = GlueCatalogTable::build(&table(json!({
            "partition_keys": [{"name": "dt", "type": "string"}],
            "partition_index": [{"index_name": "by_region", "keys": ["region"]}]
        })));
        assert!(matches!(
            result,
            Err(ResourceError::Validation(ValidationError::UnknownReference { .. }))
        ));
    }

    #[test]
    fn test_views() {
        assert!(GlueCatalogTable::build(&table(json!({"table_type": "VIRTUAL_VIEW"}))).is_err());
        assert!(GlueCatalogTable::build(&table(json!({"view_original_text": "SELECT 1"}))).is_err());
        let view = GlueCatalogTable::build(&table(json!({
            "table_type": "VIRTUAL_VIEW",
            "view_original_text": "SELECT 1"
        })))
        .unwrap();
        assert!(view.is_view());
    }
}

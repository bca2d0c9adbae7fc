//! CloudWatch log groups and metric alarms.

use crate::error::{SchemaResult, ValidationError, ValidationResult};
use crate::resource::value_objects::rules::{
    at_most_one_of, exactly_one_of, forbid_if, must_reference, unique_by,
};
use crate::resource::value_objects::{Tags, check_tags};
use crate::resource::{ComputedProperties, ResourceAttributes, round_currency, string_enum};
use crate::schema::{FieldDescriptor, Schema, SchemaCell};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ingestion price per GB for the standard log class
pub const STANDARD_INGESTION_PRICE_PER_GB: f64 = 0.50;
/// Ingestion price per GB for the infrequent access log class
pub const INFREQUENT_ACCESS_INGESTION_PRICE_PER_GB: f64 = 0.25;
/// Archived log storage price per GB-month
pub const STORAGE_PRICE_PER_GB_MONTH: f64 = 0.03;
/// Monthly price per metric of a standard resolution alarm
pub const STANDARD_ALARM_METRIC_PRICE: f64 = 0.10;
/// Monthly price per metric of a high resolution alarm
pub const HIGH_RESOLUTION_ALARM_METRIC_PRICE: f64 = 0.30;

const RETENTION_DAYS: &[i64] = &[
    1, 3, 5, 7, 14, 30, 60, 90, 120, 150, 180, 365, 400, 545, 731, 1096, 1827, 2192, 2557, 2922,
    3288, 3653,
];

/// Anomaly detection bands are made of three metrics.
const ANOMALY_BAND_METRICS: usize = 3;
const MAX_ACTIONS: usize = 5;

string_enum! {
    pub enum LogGroupClass {
        Standard => "STANDARD",
        InfrequentAccess => "INFREQUENT_ACCESS",
    }
}

static LOG_GROUP_SCHEMA: SchemaCell = SchemaCell::new(|| {
    Schema::strict(LogGroup::KIND)
        .field(FieldDescriptor::string("name").pattern(r"[._/#A-Za-z0-9-]{1,512}"))
        .field(FieldDescriptor::string("name_prefix").pattern(r"[._/#A-Za-z0-9-]{1,483}"))
        .field(FieldDescriptor::integer("retention_in_days").one_of_integers(RETENTION_DAYS))
        .field(FieldDescriptor::string("kms_key_id").length(1, 2048))
        .field(
            FieldDescriptor::string("log_group_class")
                .one_of(LogGroupClass::VALUES)
                .default("STANDARD"),
        )
        .field(FieldDescriptor::boolean("skip_destroy").default(false))
        .field(FieldDescriptor::tags())
        .build()
});

/// Attributes of an `aws_cloudwatch_log_group`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogGroup {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_prefix: Option<String>,
    /// Absent means logs never expire
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention_in_days: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kms_key_id: Option<String>,
    pub log_group_class: LogGroupClass,
    pub skip_destroy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
}

impl ResourceAttributes for LogGroup {
    const KIND: &'static str = "aws_cloudwatch_log_group";

    fn schema() -> SchemaResult<&'static Schema> {
        LOG_GROUP_SCHEMA.get()
    }

    fn validate(&self) -> ValidationResult<()> {
        check_tags(self.tags.as_ref())?;
        at_most_one_of(&[
            ("name", self.name.is_some()),
            ("name_prefix", self.name_prefix.is_some()),
        ])
    }

    fn properties(&self) -> ComputedProperties {
        ComputedProperties::new()
            .with("retention_class", self.retention_class())
            .with("is_encrypted", self.kms_key_id.is_some())
            .with("ingestion_price_per_gb", self.ingestion_price_per_gb())
            .with("storage_price_per_gb_month", STORAGE_PRICE_PER_GB_MONTH)
    }

    fn advisories(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.retention_in_days.is_none() {
            warnings.push("Log group retains logs indefinitely".to_string());
        }
        warnings
    }
}

impl LogGroup {
    /// `short` up to a month, `medium` up to a year, `long` beyond and
    /// `indefinite` without a retention setting.
    pub fn retention_class(&self) -> &'static str {
        match self.retention_in_days {
            None => "indefinite",
            Some(days) if days <= 30 => "short",
            Some(days) if days <= 365 => "medium",
            Some(_) => "long",
        }
    }

    pub fn ingestion_price_per_gb(&self) -> f64 {
        match self.log_group_class {
            LogGroupClass::Standard => STANDARD_INGESTION_PRICE_PER_GB,
            LogGroupClass::InfrequentAccess => INFREQUENT_ACCESS_INGESTION_PRICE_PER_GB,
        }
    }
}

string_enum! {
    pub enum ComparisonOperator {
        GreaterThanOrEqualToThreshold => "GreaterThanOrEqualToThreshold",
        GreaterThanThreshold => "GreaterThanThreshold",
        LessThanThreshold => "LessThanThreshold",
        LessThanOrEqualToThreshold => "LessThanOrEqualToThreshold",
        LessThanLowerOrGreaterThanUpperThreshold => "LessThanLowerOrGreaterThanUpperThreshold",
        LessThanLowerThreshold => "LessThanLowerThreshold",
        GreaterThanUpperThreshold => "GreaterThanUpperThreshold",
    }
}

impl ComparisonOperator {
    /// Operators comparing against an anomaly detection band.
    pub fn is_anomaly_band(&self) -> bool {
        matches!(
            self,
            Self::LessThanLowerOrGreaterThanUpperThreshold
                | Self::LessThanLowerThreshold
                | Self::GreaterThanUpperThreshold
        )
    }
}

string_enum! {
    pub enum Statistic {
        SampleCount => "SampleCount",
        Average => "Average",
        Sum => "Sum",
        Minimum => "Minimum",
        Maximum => "Maximum",
    }
}

string_enum! {
    pub enum TreatMissingData {
        Missing => "missing",
        Ignore => "ignore",
        Breaching => "breaching",
        NotBreaching => "notBreaching",
    }
}

static ALARM_SCHEMA: SchemaCell = SchemaCell::new(|| {
    let metric = Schema::strict("metric")
        .field(FieldDescriptor::string("metric_name").required().length(1, 255))
        .field(FieldDescriptor::string("namespace").required().length(1, 255))
        .field(FieldDescriptor::integer("period").required().at_least(1))
        .field(FieldDescriptor::string("stat").required())
        .field(FieldDescriptor::string("unit"))
        .field(FieldDescriptor::string_map("dimensions"))
        .build()?;
    let metric_query = Schema::strict("metric_query")
        .field(
            FieldDescriptor::string("id")
                .required()
                .pattern(r"[a-z][a-zA-Z0-9_]*")
                .length(1, 255),
        )
        .field(FieldDescriptor::string("expression").length(1, 2048))
        .field(FieldDescriptor::object("metric", metric))
        .field(FieldDescriptor::boolean("return_data").default(false))
        .field(FieldDescriptor::string("label"))
        .build()?;

    Schema::strict(MetricAlarm::KIND)
        .field(FieldDescriptor::string("alarm_name").required().length(1, 255))
        .field(
            FieldDescriptor::string("comparison_operator")
                .required()
                .one_of(ComparisonOperator::VALUES),
        )
        .field(FieldDescriptor::integer("evaluation_periods").required().at_least(1))
        .field(FieldDescriptor::integer("datapoints_to_alarm").at_least(1))
        .field(FieldDescriptor::string("metric_name").length(1, 255))
        .field(FieldDescriptor::string("namespace").length(1, 255))
        .field(FieldDescriptor::integer("period").at_least(10))
        .field(FieldDescriptor::string("statistic").one_of(Statistic::VALUES))
        .field(FieldDescriptor::string("extended_statistic").pattern(r"p\d{1,2}(\.\d+)?"))
        .field(FieldDescriptor::float("threshold"))
        .field(FieldDescriptor::string("threshold_metric_id"))
        .field(FieldDescriptor::object_array("metric_queries", metric_query))
        .field(FieldDescriptor::string_array("alarm_actions").max_items(MAX_ACTIONS))
        .field(FieldDescriptor::string_array("ok_actions").max_items(MAX_ACTIONS))
        .field(FieldDescriptor::string_array("insufficient_data_actions").max_items(MAX_ACTIONS))
        .field(
            FieldDescriptor::string("treat_missing_data")
                .one_of(TreatMissingData::VALUES)
                .default("missing"),
        )
        .field(FieldDescriptor::boolean("actions_enabled").default(true))
        .field(FieldDescriptor::string("alarm_description").max_length(1024))
        .field(FieldDescriptor::string_map("dimensions"))
        .field(FieldDescriptor::string("unit"))
        .field(FieldDescriptor::tags())
        .build()
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub metric_name: String,
    pub namespace: String,
    pub period: i64,
    pub stat: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricQuery {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric: Option<Metric>,
    pub return_data: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Attributes of an `aws_cloudwatch_metric_alarm`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricAlarm {
    pub alarm_name: String,
    pub comparison_operator: ComparisonOperator,
    pub evaluation_periods: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datapoints_to_alarm: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistic: Option<Statistic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extended_statistic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold_metric_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric_queries: Option<Vec<MetricQuery>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alarm_actions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ok_actions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insufficient_data_actions: Option<Vec<String>>,
    pub treat_missing_data: TreatMissingData,
    pub actions_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alarm_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
}

impl ResourceAttributes for MetricAlarm {
    const KIND: &'static str = "aws_cloudwatch_metric_alarm";

    fn schema() -> SchemaResult<&'static Schema> {
        ALARM_SCHEMA.get()
    }

    fn check_formats(&self) -> ValidationResult<()> {
        check_tags(self.tags.as_ref())?;
        if let Some(period) = self.period {
            check_period("period", period)?;
        }
        for (i, query) in self.queries().iter().enumerate() {
            if let Some(metric) = &query.metric {
                check_period(&format!("metric_queries[{i}].metric.period"), metric.period)?;
            }
        }
        Ok(())
    }

    fn validate(&self) -> ValidationResult<()> {
        at_most_one_of(&[
            ("statistic", self.statistic.is_some()),
            ("extended_statistic", self.extended_statistic.is_some()),
        ])?;
        exactly_one_of(&[
            ("metric_name", self.metric_name.is_some()),
            ("metric_queries", self.metric_queries.is_some()),
        ])?;

        if self.metric_queries.is_some() {
            self.validate_queries()?;
        } else {
            self.validate_single_metric()?;
        }

        if let Some(datapoints) = self.datapoints_to_alarm {
            if datapoints > self.evaluation_periods {
                return Err(ValidationError::cross_field(
                    ["datapoints_to_alarm", "evaluation_periods"],
                    "datapoints_to_alarm cannot exceed evaluation_periods",
                ));
            }
        }

        at_most_one_of(&[
            ("threshold", self.threshold.is_some()),
            ("threshold_metric_id", self.threshold_metric_id.is_some()),
        ])?;
        let reason = format!("comparison_operator is {}", self.comparison_operator);
        if self.comparison_operator.is_anomaly_band() {
            let Some(id) = &self.threshold_metric_id else {
                return Err(ValidationError::requires("threshold_metric_id", reason));
            };
            must_reference(
                "threshold_metric_id",
                id,
                "metric_queries",
                self.queries().iter().map(|q| q.id.as_str()),
            )?;
        } else if self.threshold.is_none() {
            return Err(ValidationError::requires("threshold", reason));
        }

        Ok(())
    }

    fn properties(&self) -> ComputedProperties {
        ComputedProperties::new()
            .with("evaluation_window_seconds", self.evaluation_window_seconds())
            .with("is_anomaly_detection", self.is_anomaly_detection())
            .with("is_high_resolution", self.is_high_resolution())
            .with("uses_metric_math", self.uses_metric_math())
            .with("action_count", self.action_count())
            .with("effective_datapoints_to_alarm", self.effective_datapoints_to_alarm())
            .with("estimated_monthly_cost", self.estimated_monthly_cost())
    }

    fn advisories(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.actions_enabled && self.action_count() == 0 {
            warnings.push("Alarm has no actions configured".to_string());
        }
        if self.treat_missing_data == TreatMissingData::Breaching {
            warnings.push("Missing data is treated as breaching".to_string());
        }
        warnings
    }
}

/// High resolution periods, or any multiple of a minute.
fn check_period(attribute: &str, period: i64) -> ValidationResult<()> {
    if matches!(period, 10 | 20 | 30) || period % 60 == 0 {
        Ok(())
    } else {
        Err(ValidationError::invalid_format(
            attribute,
            format!("period {period} must be 10, 20, 30 or a multiple of 60"),
        ))
    }
}

impl MetricAlarm {
    fn queries(&self) -> &[MetricQuery] {
        self.metric_queries.as_deref().unwrap_or_default()
    }

    fn validate_single_metric(&self) -> ValidationResult<()> {
        let reason = "metric_name is set";
        if self.namespace.is_none() {
            return Err(ValidationError::requires("namespace", reason));
        }
        if self.period.is_none() {
            return Err(ValidationError::requires("period", reason));
        }
        if self.statistic.is_none() && self.extended_statistic.is_none() {
            return Err(ValidationError::MissingAlternative {
                attributes: vec!["statistic".to_string(), "extended_statistic".to_string()],
            });
        }
        Ok(())
    }

    fn validate_queries(&self) -> ValidationResult<()> {
        let queries = self.queries();
        for (attribute, present) in [
            ("namespace", self.namespace.is_some()),
            ("period", self.period.is_some()),
            ("statistic", self.statistic.is_some()),
            ("extended_statistic", self.extended_statistic.is_some()),
        ] {
            forbid_if(true, attribute, present, "metric_queries is set")?;
        }

        unique_by("metric_queries", queries, |q| q.id.as_str())?;
        for (i, query) in queries.iter().enumerate() {
            let expression = format!("metric_queries[{i}].expression");
            let metric = format!("metric_queries[{i}].metric");
            exactly_one_of(&[
                (expression.as_str(), query.expression.is_some()),
                (metric.as_str(), query.metric.is_some()),
            ])?;
        }

        let returning = queries.iter().filter(|q| q.return_data).count();
        if returning != 1 {
            return Err(ValidationError::cross_field(
                ["metric_queries"],
                format!("exactly one query must set return_data, found {returning}"),
            ));
        }
        Ok(())
    }

    /// Period of the evaluated metric, or of the first metric behind a
    /// metric math expression.
    pub fn effective_period(&self) -> Option<i64> {
        self.period.or_else(|| {
            let queries = self.queries();
            queries
                .iter()
                .find(|q| q.return_data)
                .and_then(|q| q.metric.as_ref())
                .or_else(|| queries.iter().find_map(|q| q.metric.as_ref()))
                .map(|metric| metric.period)
        })
    }

    pub fn evaluation_window_seconds(&self) -> Option<i64> {
        self.effective_period()
            .and_then(|period| period.checked_mul(self.evaluation_periods))
    }

    pub fn is_anomaly_detection(&self) -> bool {
        self.comparison_operator.is_anomaly_band()
    }

    pub fn is_high_resolution(&self) -> bool {
        self.effective_period().is_some_and(|period| period < 60)
    }

    pub fn uses_metric_math(&self) -> bool {
        self.queries().iter().any(|q| q.expression.is_some())
    }

    pub fn action_count(&self) -> usize {
        [
            &self.alarm_actions,
            &self.ok_actions,
            &self.insufficient_data_actions,
        ]
        .into_iter()
        .flatten()
        .map(Vec::len)
        .sum()
    }

    pub fn effective_datapoints_to_alarm(&self) -> i64 {
        self.datapoints_to_alarm.unwrap_or(self.evaluation_periods)
    }

    /// Monthly alarm price: one charge per metric evaluated, tripled for
    /// anomaly detection bands.
    pub fn estimated_monthly_cost(&self) -> f64 {
        let metric_price = if self.is_high_resolution() {
            HIGH_RESOLUTION_ALARM_METRIC_PRICE
        } else {
            STANDARD_ALARM_METRIC_PRICE
        };
        let mut metrics = self
            .queries()
            .iter()
            .filter(|q| q.metric.is_some())
            .count()
            .max(1);
        if self.is_anomaly_detection() {
            metrics *= ANOMALY_BAND_METRICS;
        }
        round_currency(metric_price * metrics as f64)
    }
}

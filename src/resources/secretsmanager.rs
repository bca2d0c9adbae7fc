//! Secrets Manager secrets.

use crate::error::{SchemaResult, ValidationError, ValidationResult};
use crate::resource::value_objects::rules::{at_most_one_of, exactly_one_of, unique_by};
use crate::resource::value_objects::{Arn, JsonDocument, Tags, check_tags};
use crate::resource::{ComputedProperties, ResourceAttributes, round_currency, sorted_distinct};
use crate::resources::events::Schedule;
use crate::schema::{FieldDescriptor, Schema, SchemaCell};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Monthly price of one secret, charged again for every replica
pub const SECRET_MONTH_PRICE: f64 = 0.40;

const MAX_ROTATION_WINDOW_HOURS: i64 = 24;
const MINUTES_PER_DAY: f64 = 1440.0;

static SCHEMA: SchemaCell = SchemaCell::new(|| {
    let replica = Schema::strict("replica")
        .field(
            FieldDescriptor::string("region")
                .required()
                .pattern(r"[a-z]{2}(-[a-z]+)+-\d"),
        )
        .field(FieldDescriptor::string("kms_key_id").length(1, 2048))
        .build()?;
    let rotation = Schema::strict("rotation")
        .field(FieldDescriptor::string("rotation_lambda_arn").required())
        .field(FieldDescriptor::integer("automatically_after_days").range(1, 1000))
        .field(FieldDescriptor::string("schedule_expression").length(1, 256))
        .field(FieldDescriptor::string("duration").pattern(r"\d{1,2}h"))
        .build()?;

    Schema::strict(Secret::KIND)
        .field(
            FieldDescriptor::string("name")
                .pattern(r"[a-zA-Z0-9/_+=.@-]+")
                .length(1, 512),
        )
        .field(
            FieldDescriptor::string("name_prefix")
                .pattern(r"[a-zA-Z0-9/_+=.@-]+")
                .length(1, 480),
        )
        .field(FieldDescriptor::string("description").max_length(2048))
        .field(FieldDescriptor::string("kms_key_id").length(1, 2048))
        .field(
            FieldDescriptor::integer("recovery_window_in_days")
                .range(0, 30)
                .default(30),
        )
        .field(FieldDescriptor::boolean("force_overwrite_replica_secret").default(false))
        .field(FieldDescriptor::object_array("replica", replica))
        .field(FieldDescriptor::json("policy"))
        .field(FieldDescriptor::object("rotation", rotation))
        .field(FieldDescriptor::tags())
        .build()
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Replica {
    pub region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kms_key_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    pub rotation_lambda_arn: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub automatically_after_days: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule_expression: Option<String>,
    /// Rotation window length such as `3h`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

impl Rotation {
    fn duration_hours(&self) -> ValidationResult<Option<i64>> {
        let Some(duration) = self.duration.as_deref() else {
            return Ok(None);
        };
        duration
            .strip_suffix('h')
            .and_then(|hours| hours.parse().ok())
            .map(Some)
            .ok_or_else(|| {
                ValidationError::invalid_format(
                    "rotation.duration",
                    format!("'{duration}' is not a whole number of hours"),
                )
            })
    }

    fn check_formats(&self) -> ValidationResult<()> {
        let lambda = Arn::parse("rotation.rotation_lambda_arn", &self.rotation_lambda_arn)?;
        if lambda.service() != "lambda" {
            return Err(ValidationError::invalid_format(
                "rotation.rotation_lambda_arn",
                "must be a Lambda function ARN",
            ));
        }
        if let Some(expression) = &self.schedule_expression {
            Schedule::parse("rotation.schedule_expression", expression)?;
        }
        if let Some(hours) = self.duration_hours()? {
            if hours == 0 || hours > MAX_ROTATION_WINDOW_HOURS {
                return Err(ValidationError::invalid_format(
                    "rotation.duration",
                    format!("must be between 1h and {MAX_ROTATION_WINDOW_HOURS}h"),
                ));
            }
        }
        Ok(())
    }

    fn interval_days(&self) -> Option<f64> {
        if let Some(days) = self.automatically_after_days {
            return Some(days as f64);
        }
        let expression = self.schedule_expression.as_deref()?;
        let minutes = Schedule::parse("rotation.schedule_expression", expression)
            .ok()?
            .interval_minutes()?;
        Some(minutes as f64 / MINUTES_PER_DAY)
    }
}

/// Attributes of an `aws_secretsmanager_secret`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Secret {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kms_key_id: Option<String>,
    pub recovery_window_in_days: i64,
    pub force_overwrite_replica_secret: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replica: Option<Vec<Replica>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Rotation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
}

impl ResourceAttributes for Secret {
    const KIND: &'static str = "aws_secretsmanager_secret";

    fn schema() -> SchemaResult<&'static Schema> {
        SCHEMA.get()
    }

    fn check_formats(&self) -> ValidationResult<()> {
        check_tags(self.tags.as_ref())?;
        if (1..7).contains(&self.recovery_window_in_days) {
            return Err(ValidationError::invalid_format(
                "recovery_window_in_days",
                "must be 0 or between 7 and 30",
            ));
        }
        if let Some(policy) = &self.policy {
            JsonDocument::parse("policy", policy)?;
        }
        match &self.rotation {
            Some(rotation) => rotation.check_formats(),
            None => Ok(()),
        }
    }

    fn validate(&self) -> ValidationResult<()> {
        at_most_one_of(&[
            ("name", self.name.is_some()),
            ("name_prefix", self.name_prefix.is_some()),
        ])?;

        unique_by("replica", self.replicas(), |r| r.region.as_str())?;

        if let Some(rotation) = &self.rotation {
            validate_rotation(rotation)?;
        }
        Ok(())
    }

    fn properties(&self) -> ComputedProperties {
        ComputedProperties::new()
            .with("is_replicated", self.is_replicated())
            .with("replica_regions", self.replica_regions())
            .with("deletes_immediately", self.deletes_immediately())
            .with("rotation_enabled", self.rotation.is_some())
            .with("rotation_interval_days", self.rotation_interval_days())
            .with("estimated_monthly_cost", self.estimated_monthly_cost())
    }

    fn advisories(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.rotation.is_none() {
            warnings.push("Secret is never rotated".to_string());
        }
        if self.deletes_immediately() {
            warnings.push("Secret is deleted without a recovery window".to_string());
        }
        warnings
    }
}

fn validate_rotation(rotation: &Rotation) -> ValidationResult<()> {
    exactly_one_of(&[
        (
            "rotation.automatically_after_days",
            rotation.automatically_after_days.is_some(),
        ),
        (
            "rotation.schedule_expression",
            rotation.schedule_expression.is_some(),
        ),
    ])?;

    if let Some(hours) = rotation.duration_hours()? {
        if let Some(days) = rotation.interval_days() {
            if hours as f64 >= days * 24.0 {
                let interval = if rotation.automatically_after_days.is_some() {
                    "rotation.automatically_after_days"
                } else {
                    "rotation.schedule_expression"
                };
                return Err(ValidationError::cross_field(
                    ["rotation.duration", interval],
                    "rotation window must be shorter than the rotation interval",
                ));
            }
        }
    }
    Ok(())
}

impl Secret {
    fn replicas(&self) -> &[Replica] {
        self.replica.as_deref().unwrap_or_default()
    }

    pub fn is_replicated(&self) -> bool {
        !self.replicas().is_empty()
    }

    pub fn replica_regions(&self) -> Vec<String> {
        sorted_distinct(self.replicas().iter().map(|r| r.region.as_str()))
    }

    pub fn deletes_immediately(&self) -> bool {
        self.recovery_window_in_days == 0
    }

    pub fn rotation_interval_days(&self) -> Option<f64> {
        self.rotation.as_ref()?.interval_days()
    }

    pub fn estimated_monthly_cost(&self) -> f64 {
        round_currency(SECRET_MONTH_PRICE * (1 + self.replicas().len()) as f64)
    }
}

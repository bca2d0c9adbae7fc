//! EventBridge rules.

use crate::error::{SchemaResult, ValidationError, ValidationResult};
use crate::resource::value_objects::rules::{at_most_one_of, forbid_if, require_if};
use crate::resource::value_objects::{Arn, JsonDocument, Tags, check_tags};
use crate::resource::{
    ComputedProperties, HOURS_PER_MONTH, ResourceAttributes, sorted_distinct, string_enum,
};
use crate::schema::{FieldDescriptor, Schema, SchemaCell};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const DEFAULT_EVENT_BUS: &str = "default";
const CRON_FIELDS: usize = 6;
/// Longest accepted rate interval, one year.
const MAX_RATE_MINUTES: u64 = 365 * 1440;

string_enum! {
    pub enum RuleState {
        Enabled => "ENABLED",
        Disabled => "DISABLED",
        EnabledWithAllCloudtrailManagementEvents => "ENABLED_WITH_ALL_CLOUDTRAIL_MANAGEMENT_EVENTS",
    }
}

/// A parsed `schedule_expression`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schedule {
    /// `rate(N unit)`, stored in minutes
    Rate { minutes: u64 },
    /// `cron(...)` with its six fields
    Cron(Vec<String>),
}

impl Schedule {
    pub fn parse(attribute: &str, value: &str) -> ValidationResult<Self> {
        let invalid = |details: &str| {
            ValidationError::invalid_format(attribute, format!("'{value}' {details}"))
        };

        if let Some(body) = value.strip_prefix("rate(").and_then(|v| v.strip_suffix(')')) {
            let (amount, unit) = body
                .split_once(' ')
                .ok_or_else(|| invalid("must look like rate(N unit)"))?;
            let amount: u64 = amount
                .parse()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| invalid("must have a positive whole rate"))?;
            let (singular, minutes_per_unit) = match unit {
                "minute" => (true, 1),
                "minutes" => (false, 1),
                "hour" => (true, 60),
                "hours" => (false, 60),
                "day" => (true, 1440),
                "days" => (false, 1440),
                _ => return Err(invalid("has an unknown rate unit")),
            };
            if singular != (amount == 1) {
                return Err(invalid("must use a singular unit exactly when the rate is 1"));
            }
            let minutes = amount
                .checked_mul(minutes_per_unit)
                .filter(|m| *m <= MAX_RATE_MINUTES)
                .ok_or_else(|| invalid("must not exceed a rate of 365 days"))?;
            return Ok(Self::Rate { minutes });
        }

        if let Some(body) = value.strip_prefix("cron(").and_then(|v| v.strip_suffix(')')) {
            let fields: Vec<String> = body.split_whitespace().map(str::to_string).collect();
            if fields.len() != CRON_FIELDS {
                return Err(invalid("must have six cron fields"));
            }
            return Ok(Self::Cron(fields));
        }

        Err(invalid("must be a rate() or cron() expression"))
    }

    /// Fixed interval of a rate schedule.
    pub fn interval_minutes(&self) -> Option<u64> {
        match self {
            Self::Rate { minutes } => Some(*minutes),
            Self::Cron(_) => None,
        }
    }
}

static SCHEMA: SchemaCell = SchemaCell::new(|| {
    Schema::strict(EventRule::KIND)
        .field(
            FieldDescriptor::string("name")
                .pattern(r"[.\-_A-Za-z0-9]+")
                .length(1, 64),
        )
        .field(
            FieldDescriptor::string("name_prefix")
                .pattern(r"[.\-_A-Za-z0-9]+")
                .length(1, 38),
        )
        .field(FieldDescriptor::string("schedule_expression").length(1, 256))
        .field(FieldDescriptor::json("event_pattern"))
        .field(
            FieldDescriptor::string("event_bus_name")
                .length(1, 256)
                .default(DEFAULT_EVENT_BUS),
        )
        .field(FieldDescriptor::string("description").max_length(512))
        .field(
            FieldDescriptor::string("state")
                .one_of(RuleState::VALUES)
                .default("ENABLED"),
        )
        .field(FieldDescriptor::string("role_arn"))
        .field(FieldDescriptor::tags())
        .build()
});

/// Attributes of an `aws_cloudwatch_event_rule`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule_expression: Option<String>,
    /// Object or JSON-encoded string
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_pattern: Option<Value>,
    pub event_bus_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub state: RuleState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
}

impl ResourceAttributes for EventRule {
    const KIND: &'static str = "aws_cloudwatch_event_rule";

    fn schema() -> SchemaResult<&'static Schema> {
        SCHEMA.get()
    }

    fn check_formats(&self) -> ValidationResult<()> {
        check_tags(self.tags.as_ref())?;
        if let Some(expression) = &self.schedule_expression {
            Schedule::parse("schedule_expression", expression)?;
        }
        if let Some(pattern) = &self.event_pattern {
            let document = JsonDocument::parse("event_pattern", pattern)?;
            if document.is_empty() {
                return Err(ValidationError::invalid_format(
                    "event_pattern",
                    "must not be empty",
                ));
            }
        }
        if let Some(role) = &self.role_arn {
            Arn::parse("role_arn", role)?;
        }
        Ok(())
    }

    fn validate(&self) -> ValidationResult<()> {
        at_most_one_of(&[
            ("name", self.name.is_some()),
            ("name_prefix", self.name_prefix.is_some()),
        ])?;

        if self.schedule_expression.is_none() && self.event_pattern.is_none() {
            return Err(ValidationError::MissingAlternative {
                attributes: vec!["schedule_expression".to_string(), "event_pattern".to_string()],
            });
        }

        forbid_if(
            self.uses_custom_bus(),
            "schedule_expression",
            self.schedule_expression.is_some(),
            "event_bus_name is not the default bus",
        )?;
        require_if(
            self.state == RuleState::EnabledWithAllCloudtrailManagementEvents,
            "event_pattern",
            self.event_pattern.is_some(),
            "state is ENABLED_WITH_ALL_CLOUDTRAIL_MANAGEMENT_EVENTS",
        )
    }

    fn properties(&self) -> ComputedProperties {
        ComputedProperties::new()
            .with("rule_type", self.rule_type())
            .with("is_scheduled", self.schedule_expression.is_some())
            .with("is_enabled", self.is_enabled())
            .with("schedule_interval_minutes", self.schedule_interval_minutes())
            .with(
                "estimated_monthly_invocations",
                self.estimated_monthly_invocations(),
            )
            .with("event_sources", self.event_sources())
            .with("detail_types", self.detail_types())
            .with("uses_custom_bus", self.uses_custom_bus())
    }

    fn advisories(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.state == RuleState::Disabled {
            warnings.push("Rule is disabled".to_string());
        }
        if self.schedule_interval_minutes() == Some(1) {
            warnings.push("Rule runs every minute".to_string());
        }
        warnings
    }
}

impl EventRule {
    fn schedule(&self) -> Option<Schedule> {
        let expression = self.schedule_expression.as_deref()?;
        Schedule::parse("schedule_expression", expression).ok()
    }

    fn pattern(&self) -> Option<JsonDocument> {
        let pattern = self.event_pattern.as_ref()?;
        JsonDocument::parse("event_pattern", pattern).ok()
    }

    /// `schedule`, `event_pattern` or `hybrid` when both are set.
    pub fn rule_type(&self) -> &'static str {
        match (self.schedule_expression.is_some(), self.event_pattern.is_some()) {
            (true, true) => "hybrid",
            (true, false) => "schedule",
            _ => "event_pattern",
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.state != RuleState::Disabled
    }

    pub fn schedule_interval_minutes(&self) -> Option<u64> {
        self.schedule()?.interval_minutes()
    }

    /// Invocations per month of a rate schedule.
    pub fn estimated_monthly_invocations(&self) -> Option<u64> {
        let minutes_per_month = (HOURS_PER_MONTH * 60.0) as u64;
        self.schedule_interval_minutes()
            .map(|interval| minutes_per_month / interval)
    }

    pub fn event_sources(&self) -> Vec<String> {
        self.pattern()
            .map(|pattern| sorted_distinct(pattern.strings("source")))
            .unwrap_or_default()
    }

    pub fn detail_types(&self) -> Vec<String> {
        self.pattern()
            .map(|pattern| sorted_distinct(pattern.strings("detail-type")))
            .unwrap_or_default()
    }

    pub fn uses_custom_bus(&self) -> bool {
        self.event_bus_name != DEFAULT_EVENT_BUS
    }
}

//! Cost and usage budgets.

use crate::config::Clock;
use crate::error::{SchemaResult, ValidationError, ValidationResult};
use crate::resource::value_objects::rules::{at_most_one_of, forbid_if, require_if, unique_by};
use crate::resource::value_objects::{Tags, check_tags};
use crate::resource::{ComputedProperties, ResourceAttributes, round_currency, sorted_distinct, string_enum};
use crate::schema::{FieldDescriptor, Schema, SchemaCell};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Layout of `time_period_start` and `time_period_end`
pub const TIME_PERIOD_FORMAT: &str = "%Y-%m-%d_%H:%M";

const TIME_PERIOD_PATTERN: &str = r"\d{4}-\d{2}-\d{2}_\d{2}:\d{2}";
const DEFAULT_PERIOD_END: &str = "2087-06-15_00:00";

string_enum! {
    pub enum BudgetType {
        Cost => "COST",
        Usage => "USAGE",
        RiUtilization => "RI_UTILIZATION",
        RiCoverage => "RI_COVERAGE",
        SavingsPlansUtilization => "SAVINGS_PLANS_UTILIZATION",
        SavingsPlansCoverage => "SAVINGS_PLANS_COVERAGE",
    }
}

impl BudgetType {
    /// Cost and usage budgets track an absolute limit.
    pub fn has_limit(&self) -> bool {
        matches!(self, Self::Cost | Self::Usage)
    }
}

string_enum! {
    pub enum TimeUnit {
        Daily => "DAILY",
        Monthly => "MONTHLY",
        Quarterly => "QUARTERLY",
        Annually => "ANNUALLY",
    }
}

impl TimeUnit {
    pub fn periods_per_year(&self) -> f64 {
        match self {
            Self::Daily => 365.0,
            Self::Monthly => 12.0,
            Self::Quarterly => 4.0,
            Self::Annually => 1.0,
        }
    }
}

string_enum! {
    pub enum ComparisonOperator {
        GreaterThan => "GREATER_THAN",
        LessThan => "LESS_THAN",
        EqualTo => "EQUAL_TO",
    }
}

string_enum! {
    pub enum ThresholdType {
        Percentage => "PERCENTAGE",
        AbsoluteValue => "ABSOLUTE_VALUE",
    }
}

string_enum! {
    pub enum NotificationType {
        Actual => "ACTUAL",
        Forecasted => "FORECASTED",
    }
}

const FILTER_DIMENSIONS: &[&str] = &[
    "AZ",
    "BillingEntity",
    "CostCategory",
    "InstanceType",
    "InvoicingEntity",
    "LegalEntityName",
    "LinkedAccount",
    "Operation",
    "PurchaseType",
    "RecordType",
    "Region",
    "Service",
    "TagKeyValue",
    "UsageType",
    "UsageTypeGroup",
];

fn start_of_current_month(clock: &dyn Clock) -> Value {
    Value::String(clock.now().format("%Y-%m-01_00:00").to_string())
}

static SCHEMA: SchemaCell = SchemaCell::new(|| {
    let cost_filter = Schema::strict("cost_filter")
        .field(FieldDescriptor::string("name").required().one_of(FILTER_DIMENSIONS))
        .field(FieldDescriptor::string_array("values").required().min_items(1))
        .build()?;
    let notification = Schema::strict("notification")
        .field(
            FieldDescriptor::string("comparison_operator")
                .required()
                .one_of(ComparisonOperator::VALUES),
        )
        .field(FieldDescriptor::float("threshold").required().at_least(0))
        .field(
            FieldDescriptor::string("threshold_type")
                .one_of(ThresholdType::VALUES)
                .default("PERCENTAGE"),
        )
        .field(
            FieldDescriptor::string("notification_type")
                .required()
                .one_of(NotificationType::VALUES),
        )
        .field(
            FieldDescriptor::string_array("subscriber_email_addresses")
                .pattern(r"[^@\s]+@[^@\s]+\.[^@\s]+")
                .max_items(10),
        )
        .field(FieldDescriptor::string_array("subscriber_sns_topic_arns").max_items(1))
        .build()?;

    Schema::strict(Budget::KIND)
        .field(
            FieldDescriptor::string("name")
                .pattern(r"[^:\\]+")
                .length(1, 100),
        )
        .field(FieldDescriptor::string("name_prefix").pattern(r"[^:\\]+").length(1, 100))
        .field(
            FieldDescriptor::string("budget_type")
                .required()
                .one_of(BudgetType::VALUES),
        )
        .field(FieldDescriptor::string("limit_amount").pattern(r"\d+(\.\d+)?"))
        .field(FieldDescriptor::string("limit_unit").length(1, 32))
        .field(FieldDescriptor::string("time_unit").required().one_of(TimeUnit::VALUES))
        .field(
            FieldDescriptor::string("time_period_start")
                .pattern(TIME_PERIOD_PATTERN)
                .default_with(start_of_current_month),
        )
        .field(
            FieldDescriptor::string("time_period_end")
                .pattern(TIME_PERIOD_PATTERN)
                .default(DEFAULT_PERIOD_END),
        )
        .field(FieldDescriptor::object_array("cost_filters", cost_filter))
        .field(FieldDescriptor::object_array("notifications", notification).max_items(5))
        .field(FieldDescriptor::tags())
        .build()
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostFilter {
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub comparison_operator: ComparisonOperator,
    pub threshold: f64,
    pub threshold_type: ThresholdType,
    pub notification_type: NotificationType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscriber_email_addresses: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscriber_sns_topic_arns: Option<Vec<String>>,
}

impl Notification {
    fn has_subscriber(&self) -> bool {
        let non_empty = |list: &Option<Vec<String>>| list.as_ref().is_some_and(|l| !l.is_empty());
        non_empty(&self.subscriber_email_addresses) || non_empty(&self.subscriber_sns_topic_arns)
    }
}

/// Attributes of an `aws_budgets_budget`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_prefix: Option<String>,
    pub budget_type: BudgetType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_unit: Option<String>,
    pub time_unit: TimeUnit,
    pub time_period_start: String,
    pub time_period_end: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_filters: Option<Vec<CostFilter>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notifications: Option<Vec<Notification>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
}

impl ResourceAttributes for Budget {
    const KIND: &'static str = "aws_budgets_budget";

    fn schema() -> SchemaResult<&'static Schema> {
        SCHEMA.get()
    }

    fn check_formats(&self) -> ValidationResult<()> {
        check_tags(self.tags.as_ref())?;
        parse_period("time_period_start", &self.time_period_start)?;
        parse_period("time_period_end", &self.time_period_end)?;
        Ok(())
    }

    fn validate(&self) -> ValidationResult<()> {
        at_most_one_of(&[
            ("name", self.name.is_some()),
            ("name_prefix", self.name_prefix.is_some()),
        ])?;

        let has_limit = self.budget_type.has_limit();
        let reason = format!("budget_type is {}", self.budget_type);
        for (attribute, present) in [
            ("limit_amount", self.limit_amount.is_some()),
            ("limit_unit", self.limit_unit.is_some()),
        ] {
            require_if(has_limit, attribute, present, &reason)?;
            forbid_if(!has_limit, attribute, present, &reason)?;
        }

        let start = parse_period("time_period_start", &self.time_period_start)?;
        let end = parse_period("time_period_end", &self.time_period_end)?;
        if end <= start {
            return Err(ValidationError::cross_field(
                ["time_period_start", "time_period_end"],
                "time_period_end must be after time_period_start",
            ));
        }

        unique_by("cost_filters", self.filters(), |f| f.name.as_str())?;

        for (i, notification) in self.notifications().iter().enumerate() {
            if !notification.has_subscriber() {
                return Err(ValidationError::MissingAlternative {
                    attributes: vec![
                        format!("notifications[{i}].subscriber_email_addresses"),
                        format!("notifications[{i}].subscriber_sns_topic_arns"),
                    ],
                });
            }
        }

        Ok(())
    }

    fn properties(&self) -> ComputedProperties {
        ComputedProperties::new()
            .with("limit_amount_value", self.limit_amount_value())
            .with("annualized_limit", self.annualized_limit())
            .with("notification_count", self.notifications().len())
            .with("has_forecast_alerts", self.has_alerts(NotificationType::Forecasted))
            .with("has_actual_alerts", self.has_alerts(NotificationType::Actual))
            .with("subscriber_emails", self.subscriber_emails())
            .with("alert_thresholds", self.alert_thresholds())
            .with("is_cost_budget", self.budget_type == BudgetType::Cost)
            .with("filter_dimensions", self.filter_dimensions())
    }

    fn advisories(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.notifications().is_empty() {
            warnings.push("Budget has no notifications".to_string());
        }
        warnings
    }
}

fn parse_period(attribute: &str, value: &str) -> ValidationResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TIME_PERIOD_FORMAT).map_err(|err| {
        ValidationError::invalid_format(attribute, format!("'{value}' is not a valid time: {err}"))
    })
}

impl Budget {
    fn filters(&self) -> &[CostFilter] {
        self.cost_filters.as_deref().unwrap_or_default()
    }

    fn notifications(&self) -> &[Notification] {
        self.notifications.as_deref().unwrap_or_default()
    }

    pub fn limit_amount_value(&self) -> Option<f64> {
        self.limit_amount.as_deref()?.parse().ok()
    }

    /// Limit scaled to a year of `time_unit` periods.
    pub fn annualized_limit(&self) -> Option<f64> {
        self.limit_amount_value()
            .map(|limit| round_currency(limit * self.time_unit.periods_per_year()))
    }

    pub fn has_alerts(&self, notification_type: NotificationType) -> bool {
        self.notifications()
            .iter()
            .any(|n| n.notification_type == notification_type)
    }

    pub fn subscriber_emails(&self) -> Vec<String> {
        sorted_distinct(
            self.notifications()
                .iter()
                .flat_map(|n| n.subscriber_email_addresses.iter().flatten())
                .map(String::as_str),
        )
    }

    /// Sorted distinct notification thresholds.
    pub fn alert_thresholds(&self) -> Vec<f64> {
        let mut thresholds: Vec<f64> = self.notifications().iter().map(|n| n.threshold).collect();
        thresholds.sort_by(f64::total_cmp);
        thresholds.dedup();
        thresholds
    }

    pub fn filter_dimensions(&self) -> Vec<String> {
        sorted_distinct(self.filters().iter().map(|f| f.name.as_str()))
    }
}

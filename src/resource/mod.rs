//! Attribute objects and the interfaces they share.
//!
//! Every resource kind is a plain struct implementing [`ResourceAttributes`]:
//! a structural [`Schema`], a cross-field [`validate`](ResourceAttributes::validate)
//! step and a set of computed properties. Building runs the schema parse,
//! converts the canonical map into the typed struct, checks single-field
//! formats and then applies the cross-field rules; the first violation aborts
//! construction.
//!
//! [`BuiltResource`] is the object-safe view of a built attribute object used
//! by the [`ResourceRegistry`](registry::ResourceRegistry) and by the external
//! document builder.
//!
//! # Examples
//!
//! ```rust
//! use cloud_resource_schemas::resource::{BuiltResource, ResourceAttributes};
//! use cloud_resource_schemas::resources::kinesis::KinesisStream;
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let stream = KinesisStream::build(&json!({"name": "clicks"}))?;
//! assert_eq!(stream.retention_period, 24);
//! assert_eq!(stream.retention_period_days(), 1);
//!
//! let properties = stream.computed_properties();
//! assert_eq!(properties.get_i64("retention_period_days"), Some(1));
//! # Ok(())
//! # }
//! ```

pub mod registry;
pub mod value_objects;

use crate::config::BuildContext;
use crate::error::{ResourceResult, SchemaResult, ValidationError, ValidationResult};
use crate::schema::Schema;
use log::{debug, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt::Debug;

pub use registry::ResourceRegistry;

/// Hours used to turn hourly rates into monthly estimates.
pub const HOURS_PER_MONTH: f64 = 730.0;

/// A typed, validated attribute object for one resource kind.
pub trait ResourceAttributes:
    Debug + Clone + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Resource kind name, e.g. `aws_kinesis_stream`
    const KIND: &'static str;

    /// The structural schema of this kind.
    fn schema() -> SchemaResult<&'static Schema>;

    /// Single-field format checks a schema pattern cannot express: ARN
    /// anatomy, CIDR host bits, time windows, embedded JSON. Runs before
    /// [`validate`](Self::validate), so these structural errors always win
    /// over cross-field ones.
    fn check_formats(&self) -> ValidationResult<()> {
        Ok(())
    }

    /// Check invariants spanning several fields.
    fn validate(&self) -> ValidationResult<()>;

    /// Derived values: predicates, classifications and estimates.
    fn properties(&self) -> ComputedProperties;

    /// Advisory warnings for suboptimal but valid configurations.
    fn advisories(&self) -> Vec<String> {
        Vec::new()
    }

    /// Build from raw attributes with the default context.
    fn build(raw: &Value) -> ResourceResult<Self> {
        Self::build_with(raw, &BuildContext::default())
    }

    /// Build from raw attributes.
    fn build_with(raw: &Value, context: &BuildContext) -> ResourceResult<Self> {
        debug!("Building {} attributes", Self::KIND);

        let schema = Self::schema().inspect_err(|err| {
            warn!("Schema for {} is invalid: {}", Self::KIND, err);
        })?;
        let parsed = schema.parse_with(raw, context)?;

        let attributes: Self = serde_json::from_value(parsed.into_value()).map_err(|err| {
            ValidationError::ModelMismatch {
                kind: Self::KIND.to_string(),
                details: err.to_string(),
            }
        })?;
        attributes.check_formats()?;
        attributes.validate()?;

        debug!("Built {} attributes", Self::KIND);
        Ok(attributes)
    }
}

/// Object-safe view of a built attribute object.
pub trait BuiltResource: Debug + Send + Sync {
    /// Resource kind name
    fn kind(&self) -> &'static str;

    /// All computed properties, including `warnings`.
    fn computed_properties(&self) -> ComputedProperties;

    /// Advisory warnings only.
    fn warnings(&self) -> Vec<String>;

    /// Plain nested map handed to the document builder. Absent optional
    /// fields are omitted.
    fn to_canonical_map(&self) -> Map<String, Value>;

    fn as_any(&self) -> &dyn Any;

    fn clone_boxed(&self) -> Box<dyn BuiltResource>;
}

impl<R: ResourceAttributes> BuiltResource for R {
    fn kind(&self) -> &'static str {
        R::KIND
    }

    fn computed_properties(&self) -> ComputedProperties {
        let warnings = self.warnings();
        self.properties().with("warnings", warnings)
    }

    fn warnings(&self) -> Vec<String> {
        let warnings = self.advisories();
        if !warnings.is_empty() {
            debug!("{} has {} advisory warnings", R::KIND, warnings.len());
        }
        warnings
    }

    fn to_canonical_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                warn!("{} serialized to a non-object value: {}", R::KIND, other);
                Map::new()
            }
            Err(err) => {
                warn!("{} could not be serialized: {}", R::KIND, err);
                Map::new()
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_boxed(&self) -> Box<dyn BuiltResource> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn BuiltResource> {
    fn clone(&self) -> Self {
        self.clone_boxed()
    }
}

impl dyn BuiltResource {
    /// Downcast to the concrete attribute object.
    pub fn downcast_ref<R: ResourceAttributes>(&self) -> Option<&R> {
        self.as_any().downcast_ref::<R>()
    }
}

/// Named derived values of one attribute object, in sorted key order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ComputedProperties(BTreeMap<String, Value>);

impl ComputedProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one property. Non-finite floats are recorded as `null`.
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.0.insert(name.to_string(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn into_map(self) -> BTreeMap<String, Value> {
        self.0
    }
}

/// Round to cents for cost estimates.
pub(crate) fn round_currency(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Sorted, de-duplicated copy of the given strings.
pub(crate) fn sorted_distinct<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut values: Vec<String> = values.into_iter().map(Into::into).collect();
    values.sort();
    values.dedup();
    values
}

/// Define a string-valued enumeration with its wire spellings.
///
/// Generates the enum with serde support, `as_str`, `Display` and a `VALUES`
/// slice suitable for a schema `one_of` constraint.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$variant_meta:meta])* $variant:ident => $value:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        $vis enum $name {
            $($(#[$variant_meta])* #[serde(rename = $value)] $variant),+
        }

        impl $name {
            /// Every accepted spelling, in declaration order
            pub const VALUES: &'static [&'static str] = &[$($value),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $value),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub(crate) use string_enum;

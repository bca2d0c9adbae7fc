//! Core schema type definitions for resource attributes.
//!
//! This module contains the building blocks of a structural schema: leaf type
//! primitives with their constraints, field descriptors, and the schema
//! itself. Schemas are assembled with the fluent [`FieldDescriptor`] methods
//! and checked once by [`SchemaBuilder::build`]; after that they are
//! immutable and can be shared freely between threads.

use crate::config::Clock;
use crate::error::{SchemaError, SchemaResult};
use regex::Regex;
use serde_json::Value;
use std::fmt;

/// An anchored regular expression constraint.
///
/// The source is wrapped as `^(?:source)$` so the whole value must match,
/// never just a substring. Compilation errors are kept and reported by
/// [`SchemaBuilder::build`].
#[derive(Clone)]
pub struct Pattern {
    source: String,
    compiled: Result<Regex, regex::Error>,
}

impl Pattern {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let compiled = Regex::new(&format!("^(?:{source})$"));
        Self { source, compiled }
    }

    /// The pattern as written in the schema.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether the entire value matches.
    pub fn is_match(&self, value: &str) -> bool {
        match &self.compiled {
            Ok(regex) => regex.is_match(value),
            Err(_) => false,
        }
    }

    fn compile_error(&self) -> Option<String> {
        self.compiled.as_ref().err().map(ToString::to_string)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.source).finish()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// Constraints on string values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringConstraints {
    /// Anchored pattern the value must match
    pub pattern: Option<Pattern>,
    /// Minimum length in characters
    pub min_length: Option<usize>,
    /// Maximum length in characters
    pub max_length: Option<usize>,
    /// Case-sensitive enumerated values; empty means unrestricted
    pub allowed: Vec<String>,
}

/// Constraints on integer values. Bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntegerConstraints {
    pub min: Option<i64>,
    pub max: Option<i64>,
    /// Enumerated values; empty means unrestricted
    pub allowed: Vec<i64>,
}

/// Constraints on floating point values. Bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FloatConstraints {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Constraints on collection sizes. Bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionConstraints {
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
}

/// Leaf and composite attribute types.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    /// String value
    String(StringConstraints),
    /// Integer number
    Integer(IntegerConstraints),
    /// Floating point number; integers are accepted and coerced
    Float(FloatConstraints),
    /// Boolean value
    Boolean,
    /// A single string or an array of strings, normalized to an array
    StringList(StringConstraints, CollectionConstraints),
    /// Array whose elements all satisfy the element type
    Array(Box<AttributeType>, CollectionConstraints),
    /// String-keyed map whose values all satisfy the value type
    Map(Box<AttributeType>, CollectionConstraints),
    /// Nested structural schema
    Object(Box<Schema>),
    /// Free-form JSON document
    Json,
}

impl AttributeType {
    /// Unconstrained string
    pub fn string() -> Self {
        Self::String(StringConstraints::default())
    }

    /// Unconstrained integer
    pub fn integer() -> Self {
        Self::Integer(IntegerConstraints::default())
    }

    /// Unconstrained float
    pub fn float() -> Self {
        Self::Float(FloatConstraints::default())
    }

    /// Array of the given element type
    pub fn array_of(element: AttributeType) -> Self {
        Self::Array(Box::new(element), CollectionConstraints::default())
    }

    /// Short human-readable name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Integer(_) => "integer",
            Self::Float(_) => "number",
            Self::Boolean => "boolean",
            Self::StringList(..) => "string or array of strings",
            Self::Array(..) => "array",
            Self::Map(..) => "object",
            Self::Object(_) => "object",
            Self::Json => "document",
        }
    }

    fn string_constraints_mut(&mut self) -> Option<&mut StringConstraints> {
        match self {
            Self::String(constraints) | Self::StringList(constraints, _) => Some(constraints),
            Self::Array(element, _) | Self::Map(element, _) => element.string_constraints_mut(),
            _ => None,
        }
    }

    fn collection_constraints_mut(&mut self) -> Option<&mut CollectionConstraints> {
        match self {
            Self::StringList(_, constraints)
            | Self::Array(_, constraints)
            | Self::Map(_, constraints) => Some(constraints),
            _ => None,
        }
    }

    fn patterns(&self) -> Vec<&Pattern> {
        match self {
            Self::String(constraints) | Self::StringList(constraints, _) => {
                constraints.pattern.iter().collect()
            }
            Self::Array(element, _) | Self::Map(element, _) => element.patterns(),
            _ => Vec::new(),
        }
    }
}

/// Function producing a default value at build time.
pub type DefaultGenerator = fn(&dyn Clock) -> Value;

/// Default substituted when a field is absent from the input.
#[derive(Clone)]
pub enum DefaultValue {
    /// Fixed value
    Value(Value),
    /// Value computed when the default is needed
    Generated(DefaultGenerator),
}

impl DefaultValue {
    /// Resolve the default against the given clock.
    pub fn resolve(&self, clock: &dyn Clock) -> Value {
        match self {
            Self::Value(value) => value.clone(),
            Self::Generated(generator) => generator(clock),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Generated(_) => f.write_str("Generated"),
        }
    }
}

/// One named member of a structural schema.
///
/// Field descriptors are built fluently; constraint methods apply to the
/// field's type and record a definition error when they don't fit it, which
/// [`SchemaBuilder::build`] then reports.
///
/// ```rust
/// use cloud_resource_schemas::schema::FieldDescriptor;
///
/// let field = FieldDescriptor::integer("retention_period")
///     .range(24, 8760)
///     .default(24);
/// assert!(!field.is_required());
/// ```
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    name: String,
    attribute_type: AttributeType,
    required: bool,
    default: Option<DefaultValue>,
    description: Option<String>,
    definition_errors: Vec<String>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, attribute_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attribute_type,
            required: false,
            default: None,
            description: None,
            definition_errors: Vec::new(),
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, AttributeType::string())
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, AttributeType::integer())
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, AttributeType::float())
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, AttributeType::Boolean)
    }

    /// Array of strings
    pub fn string_array(name: impl Into<String>) -> Self {
        Self::new(name, AttributeType::array_of(AttributeType::string()))
    }

    /// A string or array of strings
    pub fn string_list(name: impl Into<String>) -> Self {
        Self::new(
            name,
            AttributeType::StringList(
                StringConstraints::default(),
                CollectionConstraints::default(),
            ),
        )
    }

    /// Array of nested objects
    pub fn object_array(name: impl Into<String>, schema: Schema) -> Self {
        Self::new(
            name,
            AttributeType::array_of(AttributeType::Object(Box::new(schema))),
        )
    }

    /// Map of strings to strings
    pub fn string_map(name: impl Into<String>) -> Self {
        Self::new(
            name,
            AttributeType::Map(
                Box::new(AttributeType::string()),
                CollectionConstraints::default(),
            ),
        )
    }

    /// Nested object
    pub fn object(name: impl Into<String>, schema: Schema) -> Self {
        Self::new(name, AttributeType::Object(Box::new(schema)))
    }

    /// Free-form document
    pub fn json(name: impl Into<String>) -> Self {
        Self::new(name, AttributeType::Json)
    }

    /// Resource tags: at most 50 entries, keys 1..128 and values up to 256 characters.
    pub fn tags() -> Self {
        Self::string_map("tags").items(0, 50)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Value(value.into()));
        self
    }

    pub fn default_with(mut self, generator: DefaultGenerator) -> Self {
        self.default = Some(DefaultValue::Generated(generator));
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Anchored regex the (element) string must match.
    pub fn pattern(mut self, source: &str) -> Self {
        match self.attribute_type.string_constraints_mut() {
            Some(constraints) => constraints.pattern = Some(Pattern::new(source)),
            None => self.inapplicable("pattern"),
        }
        self
    }

    /// Inclusive character-length bounds of the (element) string.
    pub fn length(mut self, min: usize, max: usize) -> Self {
        match self.attribute_type.string_constraints_mut() {
            Some(constraints) => {
                constraints.min_length = Some(min);
                constraints.max_length = Some(max);
            }
            None => self.inapplicable("length"),
        }
        self
    }

    /// Inclusive maximum character length of the (element) string.
    pub fn max_length(mut self, max: usize) -> Self {
        match self.attribute_type.string_constraints_mut() {
            Some(constraints) => constraints.max_length = Some(max),
            None => self.inapplicable("max_length"),
        }
        self
    }

    /// Case-sensitive enumerated values of the (element) string.
    pub fn one_of(mut self, allowed: &[&str]) -> Self {
        match self.attribute_type.string_constraints_mut() {
            Some(constraints) => {
                constraints.allowed = allowed.iter().map(|value| value.to_string()).collect();
            }
            None => self.inapplicable("one_of"),
        }
        self
    }

    /// Enumerated integer values.
    pub fn one_of_integers(mut self, allowed: &[i64]) -> Self {
        match &mut self.attribute_type {
            AttributeType::Integer(constraints) => constraints.allowed = allowed.to_vec(),
            _ => self.inapplicable("one_of_integers"),
        }
        self
    }

    /// Inclusive numeric bounds.
    pub fn range(self, min: i64, max: i64) -> Self {
        self.at_least(min).at_most(max)
    }

    /// Inclusive numeric lower bound.
    pub fn at_least(mut self, min: i64) -> Self {
        match &mut self.attribute_type {
            AttributeType::Integer(constraints) => constraints.min = Some(min),
            AttributeType::Float(constraints) => constraints.min = Some(min as f64),
            _ => self.inapplicable("at_least"),
        }
        self
    }

    /// Inclusive numeric upper bound.
    pub fn at_most(mut self, max: i64) -> Self {
        match &mut self.attribute_type {
            AttributeType::Integer(constraints) => constraints.max = Some(max),
            AttributeType::Float(constraints) => constraints.max = Some(max as f64),
            _ => self.inapplicable("at_most"),
        }
        self
    }

    /// Inclusive bounds for float fields.
    pub fn float_range(mut self, min: f64, max: f64) -> Self {
        match &mut self.attribute_type {
            AttributeType::Float(constraints) => {
                constraints.min = Some(min);
                constraints.max = Some(max);
            }
            _ => self.inapplicable("float_range"),
        }
        self
    }

    /// Inclusive collection size bounds.
    pub fn items(mut self, min: usize, max: usize) -> Self {
        match self.attribute_type.collection_constraints_mut() {
            Some(constraints) => {
                constraints.min_items = Some(min);
                constraints.max_items = Some(max);
            }
            None => self.inapplicable("items"),
        }
        self
    }

    /// Inclusive minimum collection size.
    pub fn min_items(mut self, min: usize) -> Self {
        match self.attribute_type.collection_constraints_mut() {
            Some(constraints) => constraints.min_items = Some(min),
            None => self.inapplicable("min_items"),
        }
        self
    }

    /// Inclusive maximum collection size.
    pub fn max_items(mut self, max: usize) -> Self {
        match self.attribute_type.collection_constraints_mut() {
            Some(constraints) => constraints.max_items = Some(max),
            None => self.inapplicable("max_items"),
        }
        self
    }

    fn inapplicable(&mut self, constraint: &str) {
        self.definition_errors.push(format!(
            "constraint '{constraint}' does not apply to {} attributes",
            self.attribute_type.type_name()
        ));
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attribute_type(&self) -> &AttributeType {
        &self.attribute_type
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn default_value(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Unknown-key behaviour of a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownKeys {
    /// Unknown keys are a structural error
    Reject,
    /// Unknown keys are dropped
    Ignore,
}

/// A structural schema: the declarative field list of one resource kind or
/// one nested block.
#[derive(Debug, Clone)]
pub struct Schema {
    name: String,
    fields: Vec<FieldDescriptor>,
    unknown_keys: UnknownKeys,
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.unknown_keys == other.unknown_keys
            && self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(&other.fields)
                .all(|(a, b)| a.name == b.name && a.attribute_type == b.attribute_type)
    }
}

impl Schema {
    /// Start a schema that rejects unknown keys.
    pub fn strict(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(name, UnknownKeys::Reject)
    }

    /// Start a schema that ignores unknown keys.
    pub fn lax(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(name, UnknownKeys::Ignore)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field descriptors in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn unknown_keys(&self) -> UnknownKeys {
        self.unknown_keys
    }

    /// Names of the required fields, in declaration order.
    pub fn required_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|field| field.required)
            .map(|field| field.name.as_str())
            .collect()
    }
}

/// Fluent builder producing a checked [`Schema`].
#[derive(Debug)]
pub struct SchemaBuilder {
    name: String,
    fields: Vec<FieldDescriptor>,
    unknown_keys: UnknownKeys,
}

impl SchemaBuilder {
    fn new(name: impl Into<String>, unknown_keys: UnknownKeys) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            unknown_keys,
        }
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Check the definition and produce the schema.
    ///
    /// Fails when a field name repeats, a constraint doesn't fit its type, a
    /// pattern doesn't compile, or a fixed default violates its own field's
    /// constraints.
    pub fn build(self) -> SchemaResult<Schema> {
        let mut seen = std::collections::HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    schema: self.name.clone(),
                    attribute: field.name.clone(),
                });
            }

            if let Some(details) = field.definition_errors.first() {
                return Err(SchemaError::InvalidConstraint {
                    schema: self.name.clone(),
                    attribute: field.name.clone(),
                    details: details.clone(),
                });
            }

            for pattern in field.attribute_type.patterns() {
                if let Some(details) = pattern.compile_error() {
                    return Err(SchemaError::InvalidPattern {
                        schema: self.name.clone(),
                        attribute: field.name.clone(),
                        details,
                    });
                }
            }

            if let Some(DefaultValue::Value(value)) = &field.default {
                super::primitives::check_default(&field.name, &field.attribute_type, value)
                    .map_err(|err| SchemaError::InvalidDefault {
                        schema: self.name.clone(),
                        attribute: field.name.clone(),
                        details: err.to_string(),
                    })?;
            }
        }

        Ok(Schema {
            name: self.name,
            fields: self.fields,
            unknown_keys: self.unknown_keys,
        })
    }
}

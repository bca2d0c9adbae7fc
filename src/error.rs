//! Error types for resource attribute validation.
//!
//! Validation failures fall into three categories:
//!
//! - **Structural** errors: a single field fails its primitive constraint (wrong
//!   type, out of range, bad format, disallowed enumerated value) or a required
//!   field is missing.
//! - **Cross-field** errors: an invariant spanning several fields is violated
//!   after structural parsing succeeded.
//! - **Definition** errors: a schema itself is malformed. These indicate a
//!   programming defect rather than bad user input.
//!
//! Advisory warnings are never errors; they are returned as data by the
//! computed properties of each resource kind.

/// Category of a [`ValidationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Single-field constraint violation or missing required field
    Structural,
    /// Multi-field invariant violation
    CrossField,
    /// The schema or typed model is inconsistent
    Definition,
}

/// Validation errors raised while building an attribute object.
///
/// Every variant names the offending attribute(s) using dotted paths for
/// nested fields (`versioning.enabled`) and indices for collection elements
/// (`lifecycle_rules[1].id`).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Required attribute is missing
    #[error("Required attribute '{attribute}' is missing")]
    MissingRequiredAttribute { attribute: String },

    /// Attribute value doesn't match the expected type
    #[error("Attribute '{attribute}' has invalid type, expected {expected}, got {actual}")]
    InvalidAttributeType {
        attribute: String,
        expected: String,
        actual: String,
    },

    /// String value is not one of the enumerated values
    #[error("Attribute '{attribute}' has invalid value '{value}', allowed values: {allowed:?}")]
    InvalidEnumValue {
        attribute: String,
        value: String,
        allowed: Vec<String>,
    },

    /// String value does not match the required pattern
    #[error("Attribute '{attribute}' value '{value}' does not match pattern {pattern}")]
    PatternMismatch {
        attribute: String,
        value: String,
        pattern: String,
    },

    /// String value is shorter than allowed
    #[error("Attribute '{attribute}' must be at least {min} characters, got {length}")]
    StringTooShort {
        attribute: String,
        length: usize,
        min: usize,
    },

    /// String value is longer than allowed
    #[error("Attribute '{attribute}' must be at most {max} characters, got {length}")]
    StringTooLong {
        attribute: String,
        length: usize,
        max: usize,
    },

    /// Numeric value is below the inclusive lower bound
    #[error("Attribute '{attribute}' value {value} is below the minimum of {min}")]
    BelowMinimum {
        attribute: String,
        value: String,
        min: String,
    },

    /// Numeric value is above the inclusive upper bound
    #[error("Attribute '{attribute}' value {value} is above the maximum of {max}")]
    AboveMaximum {
        attribute: String,
        value: String,
        max: String,
    },

    /// Collection has fewer elements than allowed
    #[error("Attribute '{attribute}' has {count} elements, at least {min} required")]
    TooFewElements {
        attribute: String,
        count: usize,
        min: usize,
    },

    /// Collection has more elements than allowed
    #[error("Attribute '{attribute}' has {count} elements, at most {max} allowed")]
    TooManyElements {
        attribute: String,
        count: usize,
        max: usize,
    },

    /// Unknown attribute in a strict schema
    #[error("Unknown attribute '{attribute}' in schema '{schema}'")]
    UnknownAttribute { attribute: String, schema: String },

    /// The same attribute was supplied under two key spellings
    #[error("Attribute '{attribute}' is supplied more than once (as '{first}' and '{second}')")]
    DuplicateKey {
        attribute: String,
        first: String,
        second: String,
    },

    /// Attribute value has an invalid format not expressible as a pattern
    #[error("Attribute '{attribute}' has invalid format: {details}")]
    InvalidFormat { attribute: String, details: String },

    /// Two attributes that may not be combined were both supplied
    #[error("Attributes '{first}' and '{second}' are mutually exclusive")]
    MutuallyExclusive { first: String, second: String },

    /// None of a set of alternatives was supplied
    #[error("Exactly one of {attributes:?} must be specified")]
    MissingAlternative { attributes: Vec<String> },

    /// Attribute becomes required because of another attribute's value
    #[error("Attribute '{attribute}' is required when {condition}")]
    ConditionallyRequired { attribute: String, condition: String },

    /// Attribute is not allowed because of another attribute's value
    #[error("Attribute '{attribute}' is not allowed when {condition}")]
    ConditionallyForbidden { attribute: String, condition: String },

    /// Attribute names a member that is absent from another collection
    #[error("Attribute '{attribute}' references '{value}' which is not declared in '{collection}'")]
    UnknownReference {
        attribute: String,
        value: String,
        collection: String,
    },

    /// A collection contains the same identifying value twice
    #[error("Attribute '{attribute}' contains duplicate value '{value}'")]
    DuplicateValue { attribute: String, value: String },

    /// Any other multi-field rule
    #[error("Invalid combination of {attributes:?}: {rule}")]
    CrossField { attributes: Vec<String>, rule: String },

    /// Typed model could not be produced from structurally valid attributes
    #[error("Attribute model for '{kind}' is inconsistent with its schema: {details}")]
    ModelMismatch { kind: String, details: String },
}

/// Errors raised while defining a schema.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    /// A pattern constraint does not compile
    #[error("Invalid pattern for attribute '{attribute}' in schema '{schema}': {details}")]
    InvalidPattern {
        schema: String,
        attribute: String,
        details: String,
    },

    /// Two field descriptors share a name
    #[error("Schema '{schema}' declares attribute '{attribute}' more than once")]
    DuplicateField { schema: String, attribute: String },

    /// A constraint was attached to a field whose type it does not fit
    #[error("Invalid constraint for attribute '{attribute}' in schema '{schema}': {details}")]
    InvalidConstraint {
        schema: String,
        attribute: String,
        details: String,
    },

    /// A declared default fails its own constraints
    #[error("Default for attribute '{attribute}' in schema '{schema}' is invalid: {details}")]
    InvalidDefault {
        schema: String,
        attribute: String,
        details: String,
    },
}

/// Top-level error type for building resources.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    /// The supplied attributes failed validation
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The schema for the resource kind is malformed
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// No resource kind is registered under this name
    #[error("Unknown resource kind: {kind}")]
    UnknownResourceKind { kind: String },

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ValidationError {
    /// Create a missing required attribute error
    pub fn missing_required(attribute: impl Into<String>) -> Self {
        Self::MissingRequiredAttribute {
            attribute: attribute.into(),
        }
    }

    /// Create an invalid type error
    pub fn invalid_type(
        attribute: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::InvalidAttributeType {
            attribute: attribute.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an invalid format error
    pub fn invalid_format(attribute: impl Into<String>, details: impl Into<String>) -> Self {
        Self::InvalidFormat {
            attribute: attribute.into(),
            details: details.into(),
        }
    }

    /// Create a mutual exclusivity error
    pub fn mutually_exclusive(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self::MutuallyExclusive {
            first: first.into(),
            second: second.into(),
        }
    }

    /// Create a conditional requirement error
    pub fn requires(attribute: impl Into<String>, condition: impl Into<String>) -> Self {
        Self::ConditionallyRequired {
            attribute: attribute.into(),
            condition: condition.into(),
        }
    }

    /// Create a conditional incompatibility error
    pub fn forbidden(attribute: impl Into<String>, condition: impl Into<String>) -> Self {
        Self::ConditionallyForbidden {
            attribute: attribute.into(),
            condition: condition.into(),
        }
    }

    /// Create a cross-reference integrity error
    pub fn unknown_reference(
        attribute: impl Into<String>,
        value: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self::UnknownReference {
            attribute: attribute.into(),
            value: value.into(),
            collection: collection.into(),
        }
    }

    /// Create a duplicate value error
    pub fn duplicate(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self::DuplicateValue {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Create a generic cross-field error
    pub fn cross_field<I, S>(attributes: I, rule: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::CrossField {
            attributes: attributes.into_iter().map(Into::into).collect(),
            rule: rule.into(),
        }
    }

    /// The category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingRequiredAttribute { .. }
            | Self::InvalidAttributeType { .. }
            | Self::InvalidEnumValue { .. }
            | Self::PatternMismatch { .. }
            | Self::StringTooShort { .. }
            | Self::StringTooLong { .. }
            | Self::BelowMinimum { .. }
            | Self::AboveMaximum { .. }
            | Self::TooFewElements { .. }
            | Self::TooManyElements { .. }
            | Self::UnknownAttribute { .. }
            | Self::DuplicateKey { .. }
            | Self::InvalidFormat { .. } => ErrorKind::Structural,
            Self::MutuallyExclusive { .. }
            | Self::MissingAlternative { .. }
            | Self::ConditionallyRequired { .. }
            | Self::ConditionallyForbidden { .. }
            | Self::UnknownReference { .. }
            | Self::DuplicateValue { .. }
            | Self::CrossField { .. } => ErrorKind::CrossField,
            Self::ModelMismatch { .. } => ErrorKind::Definition,
        }
    }

    /// Whether this is a single-field constraint violation.
    pub fn is_structural(&self) -> bool {
        self.kind() == ErrorKind::Structural
    }

    /// Whether this is a multi-field invariant violation.
    pub fn is_cross_field(&self) -> bool {
        self.kind() == ErrorKind::CrossField
    }
}

impl ResourceError {
    /// Create an unknown resource kind error
    pub fn unknown_kind(kind: impl Into<String>) -> Self {
        Self::UnknownResourceKind { kind: kind.into() }
    }

    /// The underlying validation error, if this is one.
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

// Result type aliases for convenience
pub type ValidationResult<T> = Result<T, ValidationError>;
pub type SchemaResult<T> = Result<T, SchemaError>;
pub type ResourceResult<T> = Result<T, ResourceError>;

//! Structural schemas for resource attributes.
//!
//! A [`Schema`] is the declarative description of one attribute object: its
//! fields, their primitive types and constraints, defaults, and whether
//! unknown keys are tolerated. Parsing a raw JSON document against a schema
//! yields [`ParsedAttributes`], the canonical attribute map, or the first
//! structural [`ValidationError`](crate::error::ValidationError).
//!
//! # Key Types
//!
//! - [`Schema`] - Field list plus unknown-key behaviour
//! - [`FieldDescriptor`] - One field with its type, constraints and default
//! - [`AttributeType`] - Primitive and composite types
//! - [`SchemaCell`] - Process-wide lazily built schema
//!
//! # Examples
//!
//! ```rust
//! use cloud_resource_schemas::schema::{FieldDescriptor, Schema};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = Schema::strict("aws_kinesis_stream")
//!     .field(FieldDescriptor::string("name").required().length(1, 128))
//!     .field(FieldDescriptor::integer("retention_period").range(24, 8760).default(24))
//!     .build()?;
//!
//! let parsed = schema.parse(&json!({":name": "clicks"}))?;
//! assert_eq!(parsed.get("retention_period"), Some(&json!(24)));
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod normalize;
pub(crate) mod primitives;
pub mod types;
pub mod validation;

pub use cache::SchemaCell;
pub use normalize::canonical_key;
pub use types::{
    AttributeType, CollectionConstraints, DefaultValue, FieldDescriptor, FloatConstraints,
    IntegerConstraints, Pattern, Schema, SchemaBuilder, StringConstraints, UnknownKeys,
};
pub use validation::ParsedAttributes;

//! Typed cloud resource definitions for Rust.
//!
//! Validates the attribute documents of infrastructure-as-code resources
//! before they are rendered, and derives computed properties and advisory
//! warnings from them.
//!
//! # Core Components
//!
//! - [`Schema`] - Structural description of an attribute object
//! - [`ResourceAttributes`] - Trait implemented by every resource kind
//! - [`ResourceRegistry`] - Lookup of resource kinds by name
//! - [`BuildContext`] - Validation options and the clock used by defaults
//!
//! # Quick Start
//!
//! ```rust
//! use cloud_resource_schemas::{BuiltResource, ResourceRegistry};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = ResourceRegistry::with_defaults();
//! let queue = registry.validate_and_build(
//!     "aws_sqs_queue",
//!     &json!({":name": "orders.fifo", "fifo_queue": true}),
//! )?;
//!
//! let properties = queue.computed_properties();
//! assert_eq!(properties.get_bool("is_high_throughput_fifo"), Some(false));
//! assert!(!queue.warnings().is_empty());
//! # Ok(())
//! # }
//! ```
//!
//! Invalid input fails with the first violated rule:
//!
//! ```rust
//! use cloud_resource_schemas::{ResourceError, ResourceRegistry};
//! use serde_json::json;
//!
//! let registry = ResourceRegistry::with_defaults();
//! let result = registry.validate_and_build("aws_sqs_queue", &json!({"name": "orders.fifo"}));
//! assert!(matches!(result, Err(ResourceError::Validation(_))));
//! ```

pub mod config;
pub mod error;
pub mod resource;
pub mod resources;
pub mod schema;

// Re-export commonly used types for convenience
pub use config::{BuildContext, Clock, FixedClock, SystemClock, UnknownKeyPolicy, ValidationConfig};
pub use error::{
    ErrorKind, ResourceError, ResourceResult, SchemaError, SchemaResult, ValidationError,
    ValidationResult,
};
pub use resource::{BuiltResource, ComputedProperties, ResourceAttributes, ResourceRegistry};
pub use schema::{AttributeType, FieldDescriptor, ParsedAttributes, Schema};

//! Lazily built, process-wide schemas.

use super::types::Schema;
use crate::error::SchemaResult;
use log::debug;
use std::sync::OnceLock;

/// A schema built on first use and shared for the rest of the process.
///
/// The definition function runs at most once; a definition error is cached
/// as well and returned to every caller.
///
/// ```rust
/// use cloud_resource_schemas::schema::{FieldDescriptor, Schema, SchemaCell};
///
/// static EXAMPLE: SchemaCell = SchemaCell::new(|| {
///     Schema::strict("example")
///         .field(FieldDescriptor::string("name").required())
///         .build()
/// });
///
/// let schema = EXAMPLE.get().unwrap();
/// assert_eq!(schema.name(), "example");
/// ```
pub struct SchemaCell {
    cell: OnceLock<SchemaResult<Schema>>,
    define: fn() -> SchemaResult<Schema>,
}

impl SchemaCell {
    pub const fn new(define: fn() -> SchemaResult<Schema>) -> Self {
        Self {
            cell: OnceLock::new(),
            define,
        }
    }

    pub fn get(&self) -> SchemaResult<&Schema> {
        let built = self.cell.get_or_init(|| {
            let result = (self.define)();
            if let Ok(schema) = &result {
                debug!(
                    "Built schema '{}' with {} attributes",
                    schema.name(),
                    schema.fields().len()
                );
            }
            result
        });
        built.as_ref().map_err(Clone::clone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaError;
    use crate::schema::FieldDescriptor;

    static BROKEN: SchemaCell = SchemaCell::new(|| {
        Schema::strict("broken")
            .field(FieldDescriptor::string("name").pattern("("))
            .build()
    });

    static WORKING: SchemaCell = SchemaCell::new(|| {
        Schema::lax("working")
            .field(FieldDescriptor::string("name"))
            .build()
    });

    #[test]
    fn test_definition_error_is_cached() {
        assert!(matches!(BROKEN.get(), Err(SchemaError::InvalidPattern { .. })));
        assert!(matches!(BROKEN.get(), Err(SchemaError::InvalidPattern { .. })));
    }

    #[test]
    fn test_same_instance_returned() {
        let first = WORKING.get().unwrap() as *const Schema;
        let second = WORKING.get().unwrap() as *const Schema;
        assert_eq!(first, second);
    }
}

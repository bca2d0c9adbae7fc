//! Lookup of resource kinds by name.
//!
//! The registry maps a kind name such as `aws_s3_bucket` to the build
//! function of its attribute object, so callers holding only a kind string
//! and a raw JSON document can validate it.

use super::{BuiltResource, ResourceAttributes};
use crate::config::BuildContext;
use crate::error::{ResourceError, ResourceResult, SchemaResult};
use crate::schema::Schema;
use log::debug;
use serde_json::Value;
use std::collections::BTreeMap;

type BuildFn = fn(&Value, &BuildContext) -> ResourceResult<Box<dyn BuiltResource>>;
type SchemaFn = fn() -> SchemaResult<&'static Schema>;

#[derive(Clone, Copy)]
struct Entry {
    build: BuildFn,
    schema: SchemaFn,
}

fn build_boxed<R: ResourceAttributes>(
    raw: &Value,
    context: &BuildContext,
) -> ResourceResult<Box<dyn BuiltResource>> {
    R::build_with(raw, context).map(|attributes| Box::new(attributes) as Box<dyn BuiltResource>)
}

/// Registry of buildable resource kinds.
///
/// ```rust
/// use cloud_resource_schemas::resource::{BuiltResource, ResourceRegistry};
/// use serde_json::json;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let registry = ResourceRegistry::with_defaults();
/// let stream = registry.validate_and_build("aws_kinesis_stream", &json!({"name": "clicks"}))?;
/// assert_eq!(stream.kind(), "aws_kinesis_stream");
/// assert_eq!(stream.to_canonical_map()["retention_period"], json!(24));
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct ResourceRegistry {
    entries: BTreeMap<&'static str, Entry>,
    context: BuildContext,
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("kinds", &self.entries.keys().collect::<Vec<_>>())
            .field("context", &self.context)
            .finish()
    }
}

impl ResourceRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every resource kind this crate defines.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        crate::resources::register_all(&mut registry);
        registry
    }

    /// Use the given context for every build.
    pub fn with_context(mut self, context: BuildContext) -> Self {
        self.context = context;
        self
    }

    /// Register an attribute object type under its kind name.
    pub fn register<R: ResourceAttributes>(&mut self) -> &mut Self {
        debug!("Registering resource kind {}", R::KIND);
        self.entries.insert(
            R::KIND,
            Entry {
                build: build_boxed::<R>,
                schema: R::schema,
            },
        );
        self
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.entries.contains_key(kind)
    }

    /// Registered kind names in sorted order.
    pub fn kinds(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The structural schema of a kind.
    pub fn schema(&self, kind: &str) -> ResourceResult<&'static Schema> {
        let entry = self.entry(kind)?;
        Ok((entry.schema)()?)
    }

    /// Validate raw attributes and build the attribute object of `kind`.
    pub fn validate_and_build(
        &self,
        kind: &str,
        raw: &Value,
    ) -> ResourceResult<Box<dyn BuiltResource>> {
        let entry = self.entry(kind)?;
        (entry.build)(raw, &self.context)
    }

    fn entry(&self, kind: &str) -> ResourceResult<&Entry> {
        self.entries
            .get(kind)
            .ok_or_else(|| ResourceError::unknown_kind(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::kinesis::KinesisStream;
    use crate::resources::s3::S3Bucket;
    use serde_json::json;

    #[test]
    fn test_register_and_build() {
        let mut registry = ResourceRegistry::new();
        registry.register::<KinesisStream>().register::<S3Bucket>();
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.kinds().collect::<Vec<_>>(),
            vec!["aws_kinesis_stream", "aws_s3_bucket"]
        );

        let built = registry
            .validate_and_build("aws_kinesis_stream", &json!({"name": "s"}))
            .unwrap();
        let stream = built.downcast_ref::<KinesisStream>().unwrap();
        assert_eq!(stream.retention_period, 24);
    }

    #[test]
    fn test_unknown_kind() {
        let registry = ResourceRegistry::with_defaults();
        let result = registry.validate_and_build("aws_nothing", &json!({}));
        assert!(matches!(
            result,
            Err(ResourceError::UnknownResourceKind { .. })
        ));
    }

    #[test]
    fn test_every_default_schema_builds() {
        let registry = ResourceRegistry::with_defaults();
        assert!(registry.len() >= 26);
        for kind in registry.kinds() {
            let schema = registry.schema(kind);
            assert!(schema.is_ok(), "schema for {kind} failed: {:?}", schema.err());
        }
    }
}

//! # Resource Validator
//!
//! A command-line utility for validating resource definition files against
//! the schemas and cross-field rules of this crate.
//!
//! ## Usage
//!
//! ### Validate a Single File
//!
//! ```bash
//! cargo run --bin resource-validator definitions/queue.json
//! ```
//!
//! ### Validate All Files in a Directory
//!
//! ```bash
//! cargo run --bin resource-validator ./definitions/
//! ```
//!
//! ### Describe the Schema of a Kind
//!
//! ```bash
//! cargo run --bin resource-validator --schema aws_sqs_queue
//! ```
//!
//! ### List Registered Kinds
//!
//! ```bash
//! cargo run --bin resource-validator --list
//! ```
//!
//! ## File Format
//!
//! A definition file holds one resource object or an array of them:
//!
//! ```json
//! {"kind": "aws_sqs_queue", "attributes": {"name": "orders"}}
//! ```
//!
//! An optional `--config <file>` argument loads a validation configuration
//! document, e.g. `{"unknown_keys": "reject"}`.
//!
//! ## Output Examples
//!
//! ```text
//! Validating resource file: definitions/queue.json
//!   ✓ aws_sqs_queue
//!     encryption = "none"
//!     is_fifo = false
//!     ⚠ Queue has no dead-letter queue
//! ```
//!
//! ## Exit Codes
//!
//! - `0`: All resources are valid
//! - `1`: One or more resources are invalid or the input could not be read

use cloud_resource_schemas::{
    BuildContext, BuiltResource, ResourceRegistry, Schema, ValidationConfig,
};
use serde::Deserialize;
use serde_json::Value;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Debug, Deserialize)]
struct ResourceDefinition {
    kind: String,
    #[serde(default)]
    attributes: Value,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DefinitionFile {
    Many(Vec<ResourceDefinition>),
    One(ResourceDefinition),
}

impl DefinitionFile {
    fn into_definitions(self) -> Vec<ResourceDefinition> {
        match self {
            Self::Many(definitions) => definitions,
            Self::One(definition) => vec![definition],
        }
    }
}

#[derive(Debug, Default)]
struct Summary {
    valid: usize,
    invalid: usize,
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage(&args[0]);
        process::exit(1);
    }

    let mut config = ValidationConfig::default();
    let mut target = None;
    let mut index = 1;
    while index < args.len() {
        match args[index].as_str() {
            "--list" => {
                list_kinds(&ResourceRegistry::with_defaults());
                return;
            }
            "--schema" => {
                let Some(kind) = args.get(index + 1) else {
                    eprintln!("Error: --schema requires a resource kind");
                    process::exit(1);
                };
                describe_schema(&ResourceRegistry::with_defaults(), kind);
                return;
            }
            "--config" => {
                let Some(path) = args.get(index + 1) else {
                    eprintln!("Error: --config requires a file");
                    process::exit(1);
                };
                config = load_config(Path::new(path)).unwrap_or_else(|e| {
                    eprintln!("Error: cannot load configuration '{}': {}", path, e);
                    process::exit(1);
                });
                index += 1;
            }
            other => target = Some(PathBuf::from(other)),
        }
        index += 1;
    }

    let Some(path) = target else {
        print_usage(&args[0]);
        process::exit(1);
    };

    let registry =
        ResourceRegistry::with_defaults().with_context(BuildContext::new().with_config(config));

    let summary = if path.is_file() {
        validate_file(&registry, &path)
    } else if path.is_dir() {
        validate_directory(&registry, &path)
    } else {
        eprintln!(
            "Error: '{}' is not a valid file or directory",
            path.display()
        );
        process::exit(1);
    };

    println!("\nValidation Summary:");
    println!("  Valid resources: {}", summary.valid);
    println!("  Invalid resources: {}", summary.invalid);

    if summary.invalid > 0 {
        process::exit(1);
    }
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} [--config <file>] <resource-file-or-directory>", program);
    eprintln!("       {} --schema <kind>", program);
    eprintln!("       {} --list", program);
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {} definitions/queue.json", program);
    eprintln!("  {} ./definitions/", program);
}

fn load_config(path: &Path) -> Result<ValidationConfig, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)?;
    Ok(ValidationConfig::from_json(&content)?)
}

fn validate_directory(registry: &ResourceRegistry, dir_path: &Path) -> Summary {
    println!("Validating resources in directory: {}", dir_path.display());

    let entries = match fs::read_dir(dir_path) {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!("Error reading directory: {}", e);
            process::exit(1);
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|s| s.to_str()) == Some("json"))
        .collect();
    paths.sort();

    let mut summary = Summary::default();
    for path in paths {
        println!();
        let file_summary = validate_file(registry, &path);
        summary.valid += file_summary.valid;
        summary.invalid += file_summary.invalid;
    }
    summary
}

fn validate_file(registry: &ResourceRegistry, file_path: &Path) -> Summary {
    println!("Validating resource file: {}", file_path.display());

    let mut summary = Summary::default();
    let definitions = match load_definitions(file_path) {
        Ok(definitions) => definitions,
        Err(e) => {
            eprintln!("  ❌ Cannot read definitions: {}", e);
            summary.invalid += 1;
            return summary;
        }
    };

    for definition in definitions {
        match registry.validate_and_build(&definition.kind, &definition.attributes) {
            Ok(resource) => {
                println!("  ✓ {}", definition.kind);
                print_resource_summary(resource.as_ref());
                summary.valid += 1;
            }
            Err(e) => {
                eprintln!("  ❌ {} - {}", definition.kind, e);
                summary.invalid += 1;
            }
        }
    }
    summary
}

fn load_definitions(file_path: &Path) -> Result<Vec<ResourceDefinition>, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(file_path)?;
    let file: DefinitionFile = serde_json::from_str(&content)?;
    Ok(file.into_definitions())
}

fn print_resource_summary(resource: &dyn BuiltResource) {
    for (name, value) in resource.computed_properties().iter() {
        if name != "warnings" {
            println!("    {} = {}", name, value);
        }
    }
    for warning in resource.warnings() {
        println!("    ⚠ {}", warning);
    }
}

fn list_kinds(registry: &ResourceRegistry) {
    println!("Registered resource kinds: {}", registry.len());
    for kind in registry.kinds() {
        println!("  - {}", kind);
    }
}

fn describe_schema(registry: &ResourceRegistry, kind: &str) {
    match registry.schema(kind) {
        Ok(schema) => print_schema_summary(schema),
        Err(e) => {
            eprintln!("❌ {}", e);
            process::exit(1);
        }
    }
}

fn print_schema_summary(schema: &Schema) {
    println!("Schema Summary:");
    println!("  Kind: {}", schema.name());
    println!("  Unknown keys: {:?}", schema.unknown_keys());
    println!("  Attributes: {}", schema.fields().len());

    let required = schema.required_fields();
    if !required.is_empty() {
        println!("  Required attribute names: {}", required.join(", "));
    }

    println!("  Fields:");
    for field in schema.fields() {
        let default = if field.default_value().is_some() {
            " (default)"
        } else {
            ""
        };
        println!(
            "    - {}: {}{}",
            field.name(),
            field.attribute_type().type_name(),
            default
        );
    }
}

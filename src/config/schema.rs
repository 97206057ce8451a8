use std::fmt;

use anyhow::{anyhow, bail, Context};
use jsonschema::JSONSchema;
use serde_json::Value;

/// The two config documents a run reads
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Document {
    Main,
    Project,
}

impl Document {
    fn schema(&self) -> &'static str {
        /// included schema for the main config
        static MAIN: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/schema/config.json"));
        /// included schema for the project config
        static PROJECT: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/schema/project.json"));
        match self {
            Document::Main => MAIN,
            Document::Project => PROJECT,
        }
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Document::Main => write!(f, "main config"),
            Document::Project => write!(f, "project config"),
        }
    }
}

pub fn load_schema(document: Document) -> anyhow::Result<JSONSchema> {
    let schema: Value = serde_json::from_str(document.schema())
        .with_context(|| format!("Embedded {document} schema is not JSON"))?;
    JSONSchema::compile(&schema).map_err(|err| anyhow!("Embedded {document} schema is invalid: {err}"))
}

/// Check an untyped config document, listing every violation on failure
///
/// Runs before the logger exists, so problems are only reported through the returned error.
pub fn validate(document: Document, json: &Value) -> anyhow::Result<()> {
    let compiled = load_schema(document)?;

    let messages: Vec<String> = match compiled.validate(json) {
        Ok(_) => return Ok(()),
        Err(errors) => errors
            .map(|err| format!("{}: {}", err.instance_path, err))
            .collect(),
    };
    bail!("Invalid {document}:\n  {}", messages.join("\n  "))
}

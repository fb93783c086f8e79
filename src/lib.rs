//! typed-payload library
//!
//! Command-facing helpers for parsing JSON payloads into schema-typed
//! records. The parsing itself lives in the `json-payload` crate; the
//! schema and value types live in `payload-core`.
//!
//! # CLI Usage
//!
//! ```bash
//! # Parse a payload file against a record type
//! typed-payload parse --schema schema.yaml --type Nested payload.json
//!
//! # Parse from stdin, rejecting unknown keys
//! echo '{"x": "a"}' | typed-payload parse --schema schema.yaml --type Flat --strict
//!
//! # Validate a schema file
//! typed-payload check --schema schema.yaml
//! ```

use anyhow::Context;
use clap::Parser;
use json_payload::{record_to_json, ParseOptions, PayloadParser};
use payload_core::Schema;
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Parser, Clone, Debug)]
pub struct SchemaOpts {
    /// Schema file (YAML) declaring records and enums
    #[arg(long, value_name = "PATH", env = "TYPED_PAYLOAD_SCHEMA")]
    pub schema: PathBuf,
}

#[derive(Parser, Clone, Debug, Default)]
pub struct ParseOpts {
    /// Tolerate payload keys that match no declared field
    #[arg(long)]
    pub allow_unknown_keys: bool,

    /// Reject payload keys that match no declared field (unless --allow-unknown-keys)
    #[arg(long)]
    pub strict: bool,
}

// CLI type → parser option conversion
impl From<&ParseOpts> for ParseOptions {
    fn from(opts: &ParseOpts) -> Self {
        ParseOptions::new()
            .with_allow_unknown_keys(opts.allow_unknown_keys)
            .with_strict(opts.strict)
    }
}

/// Load and validate a schema file.
pub fn load_schema(path: &Path) -> anyhow::Result<Schema> {
    let schema = Schema::from_file(path)
        .with_context(|| format!("Failed to load schema from {path:?}"))?;
    tracing::debug!(
        "Loaded schema with {} records and {} enums",
        schema.records.len(),
        schema.enums.len()
    );
    Ok(schema)
}

/// Read payload bytes from a file, or from stdin when no path (or `-`) is given.
pub fn read_payload(path: Option<&Path>) -> anyhow::Result<Vec<u8>> {
    match path {
        Some(path) if path != Path::new("-") => {
            std::fs::read(path).with_context(|| format!("Failed to read payload from {path:?}"))
        }
        _ => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("Failed to read payload from stdin")?;
            Ok(buf)
        }
    }
}

/// Parse payload bytes as `target_type` and render the typed record as JSON.
pub fn parse_payload(
    schema: &Schema,
    payload: &[u8],
    target_type: &str,
    opts: &ParseOpts,
) -> anyhow::Result<serde_json::Value> {
    let record = PayloadParser::new(schema)
        .with_options(opts.into())
        .parse_bytes(payload, target_type)
        .with_context(|| format!("Failed to parse payload as '{target_type}'"))?;
    tracing::info!(
        "Parsed payload as {} with {} fields",
        record.type_name,
        record.field_count()
    );
    Ok(record_to_json(&record))
}

/// One summary line per record and enum in the schema.
pub fn describe_schema(schema: &Schema) -> Vec<String> {
    let mut lines = Vec::with_capacity(schema.records.len() + schema.enums.len());
    for record in &schema.records {
        let fields: Vec<String> = record
            .fields
            .iter()
            .map(|f| {
                if f.has_default() {
                    format!("{}: {} = default", f.name, f.field_type)
                } else {
                    format!("{}: {}", f.name, f.field_type)
                }
            })
            .collect();
        lines.push(format!("record {} {{ {} }}", record.name, fields.join(", ")));
    }
    for e in &schema.enums {
        let variants: Vec<String> = e
            .variants
            .iter()
            .map(|v| format!("{} = {}", v.name, v.value))
            .collect();
        lines.push(format!("enum {} {{ {} }}", e.name, variants.join(", ")));
    }
    lines
}

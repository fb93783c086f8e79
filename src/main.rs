//! Command-line interface for typed-payload
//!
//! # Usage Examples
//!
//! ## Parse
//! ```bash
//! # Parse a payload file as the `Nested` record
//! typed-payload parse --schema schema.yaml --type Nested payload.json
//!
//! # Parse stdin, pretty-printing the typed result
//! cat payload.json | typed-payload parse --schema schema.yaml --type Nested --pretty
//!
//! # Reject keys that match no declared field
//! typed-payload parse --schema schema.yaml --type Flat --strict payload.json
//! ```
//!
//! ## Check
//! ```bash
//! # Validate a schema and list its records and enums
//! TYPED_PAYLOAD_SCHEMA=schema.yaml typed-payload check
//! ```

use clap::{Parser, Subcommand};
use typed_payload::{
    describe_schema, load_schema, parse_payload, read_payload, ParseOpts, SchemaOpts,
};

#[derive(Parser)]
#[command(name = "typed-payload")]
#[command(about = "A tool for parsing JSON payloads into schema-typed records")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a JSON payload into a typed record and print it as JSON
    Parse {
        #[command(flatten)]
        schema_opts: SchemaOpts,

        /// Record type the payload must conform to
        #[arg(long = "type", value_name = "RECORD")]
        target_type: String,

        #[command(flatten)]
        parse_opts: ParseOpts,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,

        /// Payload file (reads stdin when omitted or `-`)
        payload: Option<std::path::PathBuf>,
    },

    /// Validate a schema file and list its records and enums
    Check {
        #[command(flatten)]
        schema_opts: SchemaOpts,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    // Initialize tracing; stdout carries the parsed payload
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Parse {
            schema_opts,
            target_type,
            parse_opts,
            pretty,
            payload,
        } => {
            let schema = load_schema(&schema_opts.schema)?;
            let bytes = read_payload(payload.as_deref())?;
            let value = parse_payload(&schema, &bytes, &target_type, &parse_opts)?;
            let rendered = if pretty {
                serde_json::to_string_pretty(&value)?
            } else {
                serde_json::to_string(&value)?
            };
            println!("{rendered}");
        }
        Commands::Check { schema_opts } => {
            let schema = load_schema(&schema_opts.schema)?;
            for line in describe_schema(&schema) {
                println!("{line}");
            }
            tracing::info!("Schema {:?} is valid", schema_opts.schema);
        }
    }

    Ok(())
}

//! JSON payload parsing for payload-core types.
//!
//! This crate converts raw JSON payloads into fully typed [`Record`]s,
//! directed by a [`Schema`], and back.
//!
//! # Modules
//!
//! - [`parse`] - JSON payload → Record conversion
//! - [`forward`] - Record → JSON value conversion
//! - [`keys`] - Field-name / payload-key resolution
//! - [`error`] - Parse error taxonomy and field paths
//!
//! # Example
//!
//! ```
//! use json_payload::{parse_raw, ParseOptions};
//! use payload_core::{RecordSchema, Schema, TypeExpr, Value};
//!
//! let schema = Schema::new(
//!     vec![RecordSchema::new("Flat")
//!         .field("my_variable", TypeExpr::Str)
//!         .field("my_other_variable", TypeExpr::Int)],
//!     vec![],
//! );
//!
//! let record = parse_raw(
//!     br#"{"MyVariable": "0", "MyOtherVariable": 1}"#,
//!     &schema,
//!     "Flat",
//!     &ParseOptions::default(),
//! )
//! .unwrap();
//!
//! assert_eq!(record.get("my_variable"), Some(&Value::str("0")));
//! assert_eq!(record.get("my_other_variable"), Some(&Value::Int(1)));
//! ```

pub mod error;
pub mod forward;
pub mod keys;
pub mod parse;

pub use error::{ErrorKind, FieldPath, ParseError};
pub use forward::{record_to_json, value_to_json, JsonValue};
pub use keys::{find_key, key_matches_field, to_pascal_case, to_snake_case};
pub use parse::{parse_into, parse_raw, ParseOptions, PayloadParser, RawPayload};

pub use payload_core::{Record, Schema, Value};

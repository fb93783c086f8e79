//! Core types for the typed-payload framework.
//!
//! This crate provides the foundational types used by the payload parser:
//!
//! - [`TypeExpr`] - Declared type expression of a record field
//! - [`RecordSchema`] / [`EnumSchema`] - Named record and enumeration descriptors
//! - [`Schema`] - Registry of descriptors, loaded from YAML or built in code
//! - [`Value`] / [`Record`] - Fully typed values produced by a parse
//!
//! # Architecture
//!
//! ```text
//! payload-core (this crate)
//!    │
//!    └─── json-payload   (JSON -> Record parsing, Record -> JSON)
//! ```
//!
//! # Example
//!
//! ```rust
//! use payload_core::{RecordSchema, Schema, TypeExpr};
//!
//! let schema = Schema::new(
//!     vec![RecordSchema::new("Config")
//!         .field("disabled", TypeExpr::Bool)
//!         .field("gpu", TypeExpr::Bool)],
//!     vec![],
//! );
//!
//! assert!(schema.get_record("Config").is_some());
//! assert!(schema.validate().is_ok());
//! ```

pub mod schema;
pub mod types;
pub mod values;

// Re-exports for convenience
pub use schema::{
    DiscriminatedUnion, DiscriminatorArm, EnumSchema, EnumVariant, FieldSchema, RecordSchema,
    Schema, SchemaError,
};
pub use types::{TypeExpr, TypeReference};
pub use values::{json_value_eq, EnumConstant, Record, RecordBuilder, Value};

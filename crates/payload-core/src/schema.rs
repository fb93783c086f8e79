//! Schema definitions for the typed-payload framework.
//!
//! This module defines the record-type descriptors the parser is driven by.
//!
//! ## Type Hierarchy
//!
//! - `FieldSchema` - Single field: name, declared type, optional default
//! - `RecordSchema` - Named record with ordered fields
//! - `EnumVariant` / `EnumSchema` - Named enumeration with primitive-backed constants
//! - `Schema` - Registry of records and enumerations, indexed by name
//!
//! ## Usage
//!
//! Build descriptors in code with the builder methods, or load them from a
//! YAML schema file:
//!
//! ```yaml
//! version: 1
//! enums:
//!   - name: AnimalType
//!     variants:
//!       - { name: DOG, value: dog }
//!       - { name: CAT, value: cat }
//! records:
//!   - name: Dog
//!     fields:
//!       - name: type
//!         type: { type: enum_literal, enum: AnimalType, variant: DOG }
//!       - name: bark
//!         type: bool
//! ```

use crate::types::{TypeExpr, TypeReference};
use crate::values::json_value_eq;
use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

// ============================================================================
// Error Types
// ============================================================================

/// Error type for schema operations.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// Error reading schema file
    #[error("Failed to read schema file: {0}")]
    IoError(#[from] std::io::Error),

    /// Error parsing YAML
    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Record type not found in schema
    #[error("Record type not found: {0}")]
    RecordNotFound(String),

    /// Enumeration not found in schema
    #[error("Enum not found: {0}")]
    EnumNotFound(String),

    /// Variant not found in an enumeration
    #[error("Variant '{variant}' not found in enum '{enum_name}'")]
    VariantNotFound { enum_name: String, variant: String },

    /// Two definitions share a name
    #[error("Duplicate definition: {0}")]
    DuplicateDefinition(String),

    /// Enumeration variant backed by a non-primitive or duplicated value
    #[error("Invalid backing value for '{enum_name}.{variant}': {reason}")]
    InvalidEnumBacking {
        enum_name: String,
        variant: String,
        reason: String,
    },

    /// Literal type whose value is not a JSON primitive
    #[error("Invalid literal for '{record}.{field}': {value} is not a string, number, boolean or null")]
    InvalidLiteral {
        record: String,
        field: String,
        value: String,
    },
}

// ============================================================================
// Records
// ============================================================================

// A present `default: null` must stay distinguishable from an absent default.
fn deserialize_default<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

/// Field definition within a record type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldSchema {
    /// Field name (snake_case by convention)
    pub name: String,

    /// Declared field type
    #[serde(rename = "type")]
    pub field_type: TypeExpr,

    /// Default used when the payload has no matching key
    #[serde(
        default,
        deserialize_with = "deserialize_default",
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<serde_json::Value>,
}

impl FieldSchema {
    /// Create a new required field.
    pub fn new(name: impl Into<String>, field_type: TypeExpr) -> Self {
        Self {
            name: name.into(),
            field_type,
            default: None,
        }
    }

    /// Create a new field with a default value.
    pub fn with_default(
        name: impl Into<String>,
        field_type: TypeExpr,
        default: impl Into<serde_json::Value>,
    ) -> Self {
        Self {
            name: name.into(),
            field_type,
            default: Some(default.into()),
        }
    }

    /// Whether this field declares a default.
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Whether a payload must carry this field.
    pub fn is_required(&self) -> bool {
        !self.has_default() && !self.field_type.is_optional()
    }
}

/// Record type definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordSchema {
    /// Record type name
    pub name: String,

    /// Field definitions in declaration order
    #[serde(default)]
    pub fields: Vec<FieldSchema>,
}

impl RecordSchema {
    /// Create a new record type with no fields.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Add a required field.
    pub fn field(mut self, name: impl Into<String>, field_type: TypeExpr) -> Self {
        self.fields.push(FieldSchema::new(name, field_type));
        self
    }

    /// Add a field with a default value.
    pub fn field_with_default(
        mut self,
        name: impl Into<String>,
        field_type: TypeExpr,
        default: impl Into<serde_json::Value>,
    ) -> Self {
        self.fields
            .push(FieldSchema::with_default(name, field_type, default));
        self
    }

    /// Get a field by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Get the type of a field by name.
    pub fn get_field_type(&self, name: &str) -> Option<&TypeExpr> {
        self.get_field(name).map(|f| &f.field_type)
    }

    /// Get all field names.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Fields whose declared type is a single literal value.
    pub fn literal_fields(&self) -> impl Iterator<Item = &FieldSchema> {
        self.fields.iter().filter(|f| f.field_type.is_literal())
    }
}

// ============================================================================
// Enumerations
// ============================================================================

/// Named constant of an enumeration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnumVariant {
    /// Constant name, e.g. `DOG`
    pub name: String,

    /// Backing primitive value, e.g. `"dog"`
    pub value: serde_json::Value,
}

/// Enumeration definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnumSchema {
    /// Enumeration name
    pub name: String,

    /// Constants in declaration order
    pub variants: Vec<EnumVariant>,
}

impl EnumSchema {
    /// Create a new enumeration with no variants.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variants: Vec::new(),
        }
    }

    /// Add a variant.
    pub fn variant(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.variants.push(EnumVariant {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Get a variant by constant name.
    pub fn get_variant(&self, name: &str) -> Option<&EnumVariant> {
        self.variants.iter().find(|v| v.name == name)
    }

    /// Find the variant backed by the given value.
    pub fn find_by_value(&self, value: &serde_json::Value) -> Option<&EnumVariant> {
        self.variants.iter().find(|v| json_value_eq(&v.value, value))
    }

    /// All backing values in declaration order.
    pub fn values(&self) -> Vec<&serde_json::Value> {
        self.variants.iter().map(|v| &v.value).collect()
    }
}

// ============================================================================
// Discriminated unions
// ============================================================================

/// One alternative of a [`DiscriminatedUnion`].
#[derive(Debug, Clone, PartialEq)]
pub struct DiscriminatorArm {
    /// Record type selected by this arm
    pub record: String,

    /// Literal value the discriminator field holds in that record
    pub value: serde_json::Value,
}

/// A union whose alternatives are all records declaring a literal field of
/// the same name. A payload selects its alternative by that field's value.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscriminatedUnion {
    /// Name of the shared literal field
    pub field: String,

    /// Alternatives in declaration order
    pub arms: Vec<DiscriminatorArm>,
}

impl DiscriminatedUnion {
    /// Find the arm whose literal equals `tag`.
    pub fn arm_for(&self, tag: &serde_json::Value) -> Option<&DiscriminatorArm> {
        self.arms.iter().find(|arm| json_value_eq(&arm.value, tag))
    }
}

// Detection result for one record-only union, keyed on the schema by the
// first alternative's name.
#[derive(Debug, Clone)]
struct UnionEntry {
    records: Vec<String>,
    layout: Option<DiscriminatedUnion>,
}

// ============================================================================
// Registry
// ============================================================================

fn default_version() -> u32 {
    1
}

/// Registry of record and enumeration descriptors.
///
/// Lookups go through name indexes built once when the schema is created
/// or loaded, so one `Schema` can back any number of parses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    /// Schema version
    #[serde(default = "default_version")]
    pub version: u32,

    /// Record type definitions
    #[serde(default)]
    pub records: Vec<RecordSchema>,

    /// Enumeration definitions
    #[serde(default)]
    pub enums: Vec<EnumSchema>,

    /// Cached record lookup (not serialized)
    #[serde(skip)]
    record_map: HashMap<String, usize>,

    /// Cached enum lookup (not serialized)
    #[serde(skip)]
    enum_map: HashMap<String, usize>,

    /// Cached discriminated-union detection (not serialized)
    #[serde(skip)]
    unions: HashMap<String, Vec<UnionEntry>>,
}

impl Schema {
    /// Create a new schema from record and enumeration definitions.
    pub fn new(records: Vec<RecordSchema>, enums: Vec<EnumSchema>) -> Self {
        let mut schema = Self {
            version: default_version(),
            records,
            enums,
            record_map: HashMap::new(),
            enum_map: HashMap::new(),
            unions: HashMap::new(),
        };
        schema.build_maps();
        schema
    }

    /// Load schema from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SchemaError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse and validate schema from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, SchemaError> {
        let mut schema: Schema = serde_yaml::from_str(yaml)?;
        schema.build_maps();
        schema.validate()?;
        Ok(schema)
    }

    /// Build the internal lookup maps.
    fn build_maps(&mut self) {
        self.record_map = self
            .records
            .iter()
            .enumerate()
            .map(|(idx, record)| (record.name.clone(), idx))
            .collect();
        self.enum_map = self
            .enums
            .iter()
            .enumerate()
            .map(|(idx, e)| (e.name.clone(), idx))
            .collect();
        self.index_unions();
    }

    /// Precompute discriminated-union detection for every record-only union
    /// declared in a field type.
    fn index_unions(&mut self) {
        let mut unions: HashMap<String, Vec<UnionEntry>> = HashMap::new();
        for field in self.records.iter().flat_map(|r| &r.fields) {
            field.field_type.walk(&mut |ty| {
                let TypeExpr::Union { alternatives } = ty else {
                    return;
                };
                let Some(records) = record_alternatives(alternatives) else {
                    return;
                };
                let entries = unions.entry(records[0].to_string()).or_default();
                if entries
                    .iter()
                    .any(|e| e.records.iter().map(String::as_str).eq(records.iter().copied()))
                {
                    return;
                }
                // Unresolvable unions are reported by `validate`
                if let Ok(layout) = self.detect_discriminator(&records) {
                    entries.push(UnionEntry {
                        records: records.iter().map(|name| name.to_string()).collect(),
                        layout,
                    });
                }
            });
        }
        self.unions = unions;
    }

    /// Discriminated-union layout of a union type, or `None` for a plain
    /// union. Unions declared in the schema are answered from the index;
    /// anything else is detected on the spot.
    pub fn discriminated_union(
        &self,
        alternatives: &[TypeExpr],
    ) -> Result<Option<Cow<'_, DiscriminatedUnion>>, SchemaError> {
        if alternatives.len() < 2 || alternatives.iter().any(|alt| alt.record_name().is_none()) {
            return Ok(None);
        }
        let names = || alternatives.iter().filter_map(TypeExpr::record_name);
        let cached = names().next().and_then(|first| {
            self.unions
                .get(first)?
                .iter()
                .find(|e| e.records.iter().map(String::as_str).eq(names()))
        });
        match cached {
            Some(entry) => Ok(entry.layout.as_ref().map(Cow::Borrowed)),
            None => {
                let records: Vec<&str> = names().collect();
                Ok(self.detect_discriminator(&records)?.map(Cow::Owned))
            }
        }
    }

    fn detect_discriminator(
        &self,
        names: &[&str],
    ) -> Result<Option<DiscriminatedUnion>, SchemaError> {
        let records = names
            .iter()
            .map(|name| self.require_record(name))
            .collect::<Result<Vec<_>, _>>()?;
        let Some((first, rest)) = records.split_first() else {
            return Ok(None);
        };

        let Some(field) = first.literal_fields().find(|candidate| {
            rest.iter().all(|r| {
                r.get_field(&candidate.name)
                    .is_some_and(|f| f.field_type.is_literal())
            })
        }) else {
            return Ok(None);
        };

        let mut arms = Vec::with_capacity(records.len());
        for record in &records {
            let value = match record.get_field(&field.name).map(|f| &f.field_type) {
                Some(TypeExpr::Literal { value }) => value.clone(),
                Some(TypeExpr::EnumLiteral { enum_name, variant }) => {
                    self.require_variant(enum_name, variant)?.value.clone()
                }
                _ => return Ok(None),
            };
            arms.push(DiscriminatorArm {
                record: record.name.clone(),
                value,
            });
        }

        Ok(Some(DiscriminatedUnion {
            field: field.name.clone(),
            arms,
        }))
    }

    /// Get a record type by name.
    pub fn get_record(&self, name: &str) -> Option<&RecordSchema> {
        self.record_map
            .get(name)
            .and_then(|&idx| self.records.get(idx))
    }

    /// Get an enumeration by name.
    pub fn get_enum(&self, name: &str) -> Option<&EnumSchema> {
        self.enum_map.get(name).and_then(|&idx| self.enums.get(idx))
    }

    /// Get a record type by name, failing if absent.
    pub fn require_record(&self, name: &str) -> Result<&RecordSchema, SchemaError> {
        self.get_record(name)
            .ok_or_else(|| SchemaError::RecordNotFound(name.to_string()))
    }

    /// Get an enumeration by name, failing if absent.
    pub fn require_enum(&self, name: &str) -> Result<&EnumSchema, SchemaError> {
        self.get_enum(name)
            .ok_or_else(|| SchemaError::EnumNotFound(name.to_string()))
    }

    /// Resolve an enumeration constant by enum and variant name.
    pub fn require_variant(
        &self,
        enum_name: &str,
        variant: &str,
    ) -> Result<&EnumVariant, SchemaError> {
        self.require_enum(enum_name)?
            .get_variant(variant)
            .ok_or_else(|| SchemaError::VariantNotFound {
                enum_name: enum_name.to_string(),
                variant: variant.to_string(),
            })
    }

    /// Add a record type to the schema.
    pub fn add_record(&mut self, record: RecordSchema) {
        let idx = self.records.len();
        self.record_map.insert(record.name.clone(), idx);
        self.records.push(record);
        self.index_unions();
    }

    /// Add an enumeration to the schema.
    pub fn add_enum(&mut self, e: EnumSchema) {
        let idx = self.enums.len();
        self.enum_map.insert(e.name.clone(), idx);
        self.enums.push(e);
        self.index_unions();
    }

    /// Get all record type names.
    pub fn record_names(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.name.as_str()).collect()
    }

    /// Get all enumeration names.
    pub fn enum_names(&self) -> Vec<&str> {
        self.enums.iter().map(|e| e.name.as_str()).collect()
    }

    /// Check that names are unique, enum backings are well formed, and
    /// every type reference resolves.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let mut seen = std::collections::HashSet::new();
        for name in self.record_names().into_iter().chain(self.enum_names()) {
            if !seen.insert(name) {
                return Err(SchemaError::DuplicateDefinition(name.to_string()));
            }
        }

        for e in &self.enums {
            let mut names = std::collections::HashSet::new();
            for (idx, variant) in e.variants.iter().enumerate() {
                if !names.insert(variant.name.as_str()) {
                    return Err(SchemaError::DuplicateDefinition(format!(
                        "{}.{}",
                        e.name, variant.name
                    )));
                }
                let invalid = |reason: &str| SchemaError::InvalidEnumBacking {
                    enum_name: e.name.clone(),
                    variant: variant.name.clone(),
                    reason: reason.to_string(),
                };
                if !matches!(
                    variant.value,
                    serde_json::Value::String(_)
                        | serde_json::Value::Number(_)
                        | serde_json::Value::Bool(_)
                ) {
                    return Err(invalid("backing value must be a string, number or boolean"));
                }
                if e.variants[..idx]
                    .iter()
                    .any(|v| json_value_eq(&v.value, &variant.value))
                {
                    return Err(invalid("backing value is shared with another variant"));
                }
            }
        }

        for record in &self.records {
            let mut fields = std::collections::HashSet::new();
            for field in &record.fields {
                if !fields.insert(field.name.as_str()) {
                    return Err(SchemaError::DuplicateDefinition(format!(
                        "{}.{}",
                        record.name, field.name
                    )));
                }
                for reference in field.field_type.references() {
                    self.check_reference(reference)?;
                }
                let mut literal = None;
                field.field_type.walk(&mut |ty| {
                    if let TypeExpr::Literal { value } = ty {
                        if value.is_array() || value.is_object() {
                            literal.get_or_insert(value);
                        }
                    }
                });
                if let Some(value) = literal {
                    return Err(SchemaError::InvalidLiteral {
                        record: record.name.clone(),
                        field: field.name.clone(),
                        value: value.to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    fn check_reference(&self, reference: TypeReference<'_>) -> Result<(), SchemaError> {
        match reference {
            TypeReference::Record(name) => self.require_record(name).map(|_| ()),
            TypeReference::Enum(name) => self.require_enum(name).map(|_| ()),
            TypeReference::EnumVariant { enum_name, variant } => {
                self.require_variant(enum_name, variant).map(|_| ())
            }
        }
    }
}

/// Names of a union's alternatives when there are at least two and all of
/// them are records.
fn record_alternatives(alternatives: &[TypeExpr]) -> Option<Vec<&str>> {
    if alternatives.len() < 2 {
        return None;
    }
    alternatives.iter().map(TypeExpr::record_name).collect()
}

// ============================================================================
// Tests
// ============================================================================

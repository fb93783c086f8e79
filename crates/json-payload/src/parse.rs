//! JSON payload → Record conversion.
//!
//! The parser walks the payload and the declared [`TypeExpr`] together,
//! with one handler per type tag. Nothing is returned until every field
//! of the target record has been built, so a failed parse never yields a
//! partial record.

use crate::error::{FieldPath, ParseError, PathCursor};
use crate::forward::record_to_json;
use crate::keys::{find_key, key_matches_field};
use payload_core::{
    json_value_eq, DiscriminatedUnion, EnumConstant, Record, RecordSchema, Schema, TypeExpr, Value,
};
use serde::de::DeserializeOwned;
use serde_json::Map;
use std::collections::BTreeMap;

/// Raw payload handed to the parser.
#[derive(Debug, Clone)]
pub enum RawPayload<'a> {
    /// JSON text
    Bytes(&'a [u8]),
    /// Already-decoded JSON
    Value(serde_json::Value),
}

impl<'a> From<&'a [u8]> for RawPayload<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Self::Bytes(bytes)
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for RawPayload<'a> {
    fn from(bytes: &'a [u8; N]) -> Self {
        Self::Bytes(bytes)
    }
}

impl<'a> From<&'a Vec<u8>> for RawPayload<'a> {
    fn from(bytes: &'a Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl<'a> From<&'a str> for RawPayload<'a> {
    fn from(text: &'a str) -> Self {
        Self::Bytes(text.as_bytes())
    }
}

impl From<serde_json::Value> for RawPayload<'_> {
    fn from(value: serde_json::Value) -> Self {
        Self::Value(value)
    }
}

impl From<Map<String, serde_json::Value>> for RawPayload<'_> {
    fn from(map: Map<String, serde_json::Value>) -> Self {
        Self::Value(serde_json::Value::Object(map))
    }
}

/// Options controlling how strictly payloads are matched against records.
///
/// Unknown payload keys are ignored unless `strict` is set and
/// `allow_unknown_keys` is not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Tolerate payload keys that match no declared field
    pub allow_unknown_keys: bool,
    /// Reject unknown keys unless `allow_unknown_keys` is set
    pub strict: bool,
}

impl ParseOptions {
    /// Create the default (permissive) options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `allow_unknown_keys`.
    pub fn with_allow_unknown_keys(mut self, allow: bool) -> Self {
        self.allow_unknown_keys = allow;
        self
    }

    /// Set `strict`.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    fn rejects_unknown_keys(&self) -> bool {
        self.strict && !self.allow_unknown_keys
    }
}

/// Parse a raw payload into an instance of `target_type`.
pub fn parse_raw<'a>(
    payload: impl Into<RawPayload<'a>>,
    schema: &Schema,
    target_type: &str,
    options: &ParseOptions,
) -> Result<Record, ParseError> {
    PayloadParser::new(schema)
        .with_options(*options)
        .parse(payload, target_type)
}

/// Parse a raw payload against `target_type`, then extract the result into
/// a Rust type.
pub fn parse_into<'a, T: DeserializeOwned>(
    payload: impl Into<RawPayload<'a>>,
    schema: &Schema,
    target_type: &str,
    options: &ParseOptions,
) -> Result<T, ParseError> {
    PayloadParser::new(schema)
        .with_options(*options)
        .parse_into(payload, target_type)
}

/// Schema-directed payload parser.
///
/// Holds no mutable state; one parser can serve any number of parses.
#[derive(Debug, Clone, Copy)]
pub struct PayloadParser<'s> {
    schema: &'s Schema,
    options: ParseOptions,
}

impl<'s> PayloadParser<'s> {
    /// Create a parser with default options.
    pub fn new(schema: &'s Schema) -> Self {
        Self {
            schema,
            options: ParseOptions::default(),
        }
    }

    /// Replace the parse options.
    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    /// The active parse options.
    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Parse a raw payload (bytes or decoded JSON).
    pub fn parse<'a>(
        &self,
        payload: impl Into<RawPayload<'a>>,
        target_type: &str,
    ) -> Result<Record, ParseError> {
        match payload.into() {
            RawPayload::Bytes(bytes) => self.parse_bytes(bytes, target_type),
            RawPayload::Value(value) => self.parse_value(&value, target_type),
        }
    }

    /// Parse JSON text bytes.
    pub fn parse_bytes(&self, bytes: &[u8], target_type: &str) -> Result<Record, ParseError> {
        let value: serde_json::Value = serde_json::from_slice(bytes)?;
        self.parse_value(&value, target_type)
    }

    /// Parse a JSON string.
    pub fn parse_str(&self, text: &str, target_type: &str) -> Result<Record, ParseError> {
        self.parse_bytes(text.as_bytes(), target_type)
    }

    /// Parse an already-decoded JSON value, which must be an object.
    pub fn parse_value(
        &self,
        value: &serde_json::Value,
        target_type: &str,
    ) -> Result<Record, ParseError> {
        match value {
            serde_json::Value::Object(map) => self.parse_map(map, target_type),
            other => Err(ParseError::NotAMapping {
                path: FieldPath::root(),
                found: describe(other),
            }),
        }
    }

    /// Parse a decoded JSON object.
    pub fn parse_map(
        &self,
        map: &Map<String, serde_json::Value>,
        target_type: &str,
    ) -> Result<Record, ParseError> {
        let record = self.schema.require_record(target_type)?;
        tracing::debug!("Parsing payload with {} keys as {target_type}", map.len());
        self.build_record(map, record, &PathCursor::Root)
    }

    /// Parse a single JSON value against an arbitrary type expression.
    pub fn parse_as(&self, value: &serde_json::Value, ty: &TypeExpr) -> Result<Value, ParseError> {
        self.build_value(value, ty, &PathCursor::Root)
    }

    /// Parse, then deserialize the typed record into `T`.
    pub fn parse_into<'a, T: DeserializeOwned>(
        &self,
        payload: impl Into<RawPayload<'a>>,
        target_type: &str,
    ) -> Result<T, ParseError> {
        let record = self.parse(payload, target_type)?;
        serde_json::from_value(record_to_json(&record)).map_err(|source| ParseError::Extract {
            type_name: target_type.to_string(),
            source,
        })
    }

    fn build_record(
        &self,
        map: &Map<String, serde_json::Value>,
        record: &RecordSchema,
        path: &PathCursor<'_>,
    ) -> Result<Record, ParseError> {
        if self.options.rejects_unknown_keys() {
            if let Some(key) = map
                .keys()
                .find(|key| !record.fields.iter().any(|f| key_matches_field(key, &f.name)))
            {
                return Err(ParseError::UnknownField {
                    path: path.to_path(),
                    key: key.clone(),
                    record: record.name.clone(),
                });
            }
        }

        let mut fields = Vec::with_capacity(record.fields.len());
        for field in &record.fields {
            let field_path = PathCursor::Field(path, &field.name);
            let value = match (find_key(map, &field.name), &field.default) {
                (Some((_, raw)), _) => self.build_value(raw, &field.field_type, &field_path)?,
                (None, Some(default)) => {
                    self.build_value(default, &field.field_type, &field_path)?
                }
                (None, None) if field.field_type.is_optional() => Value::Null,
                (None, None) => {
                    return Err(ParseError::MissingRequiredField {
                        path: field_path.to_path(),
                        field: field.name.clone(),
                        record: record.name.clone(),
                    })
                }
            };
            fields.push((field.name.clone(), value));
        }

        Ok(Record::new(record.name.clone(), fields))
    }

    fn build_value(
        &self,
        value: &serde_json::Value,
        ty: &TypeExpr,
        path: &PathCursor<'_>,
    ) -> Result<Value, ParseError> {
        use serde_json::Value as Json;

        let mismatch = |expected: String| ParseError::TypeMismatch {
            path: path.to_path(),
            expected,
            found: describe(value),
        };

        match (ty, value) {
            // Primitives
            (TypeExpr::Str, Json::String(s)) => Ok(Value::Str(s.clone())),
            (TypeExpr::Int, Json::Number(n)) => {
                n.as_i64().map(Value::Int).ok_or_else(|| mismatch(ty.to_string()))
            }
            // Integers widen to float
            (TypeExpr::Float, Json::Number(n)) => {
                n.as_f64().map(Value::Float).ok_or_else(|| mismatch(ty.to_string()))
            }
            (TypeExpr::Bool, Json::Bool(b)) => Ok(Value::Bool(*b)),
            (TypeExpr::Str | TypeExpr::Int | TypeExpr::Float | TypeExpr::Bool, _) => {
                Err(mismatch(ty.to_string()))
            }

            (TypeExpr::Any, _) => Ok(Value::Json(value.clone())),

            // Named types
            (TypeExpr::Record { name }, Json::Object(map)) => {
                let record = self.schema.require_record(name)?;
                self.build_record(map, record, path).map(Value::Record)
            }
            (TypeExpr::Record { .. }, _) => Err(ParseError::NotAMapping {
                path: path.to_path(),
                found: describe(value),
            }),

            (TypeExpr::Enum { name }, _) => {
                let e = self.schema.require_enum(name)?;
                match e.find_by_value(value) {
                    Some(variant) => Ok(Value::Enum(EnumConstant::new(
                        &e.name,
                        &variant.name,
                        variant.value.clone(),
                    ))),
                    None => Err(ParseError::InvalidEnumValue {
                        path: path.to_path(),
                        enum_name: e.name.clone(),
                        value: value.to_string(),
                        accepted: e.values().iter().map(|v| v.to_string()).collect(),
                    }),
                }
            }

            (TypeExpr::Literal { value: literal }, _) => {
                if json_value_eq(value, literal) {
                    Ok(primitive_value(literal))
                } else {
                    Err(mismatch(ty.to_string()))
                }
            }

            (TypeExpr::EnumLiteral { enum_name, variant }, _) => {
                let constant = self.schema.require_variant(enum_name, variant)?;
                if json_value_eq(value, &constant.value) {
                    Ok(Value::Enum(EnumConstant::new(
                        enum_name,
                        variant,
                        constant.value.clone(),
                    )))
                } else {
                    Err(ParseError::InvalidEnumValue {
                        path: path.to_path(),
                        enum_name: enum_name.clone(),
                        value: value.to_string(),
                        accepted: vec![constant.value.to_string()],
                    })
                }
            }

            // Wrappers
            (TypeExpr::Optional { .. }, Json::Null) => Ok(Value::Null),
            (TypeExpr::Optional { inner }, _) => self.build_value(value, inner, path),

            (TypeExpr::Union { alternatives }, _) => {
                match self.schema.discriminated_union(alternatives)? {
                    Some(layout) => self.dispatch_discriminated(value, &layout, path),
                    None => self.try_alternatives(value, alternatives, path),
                }
            }

            // Containers
            (TypeExpr::List { element }, Json::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| self.build_value(item, element, &PathCursor::Index(path, i)))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),

            (TypeExpr::Tuple { elements }, Json::Array(items)) => {
                if items.len() != elements.len() {
                    return Err(ParseError::TupleArityMismatch {
                        path: path.to_path(),
                        expected: elements.len(),
                        found: items.len(),
                    });
                }
                items
                    .iter()
                    .zip(elements)
                    .enumerate()
                    .map(|(i, (item, element))| {
                        self.build_value(item, element, &PathCursor::Index(path, i))
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Tuple)
            }

            (TypeExpr::VarTuple { element }, Json::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| self.build_value(item, element, &PathCursor::Index(path, i)))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Tuple),

            (TypeExpr::List { .. } | TypeExpr::Tuple { .. } | TypeExpr::VarTuple { .. }, _) => {
                Err(mismatch(ty.to_string()))
            }

            (TypeExpr::Map { value: value_type }, Json::Object(map)) => map
                .iter()
                .map(|(key, item)| {
                    self.build_value(item, value_type, &PathCursor::Key(path, key))
                        .map(|v| (key.clone(), v))
                })
                .collect::<Result<BTreeMap<_, _>, _>>()
                .map(Value::Map),
            (TypeExpr::Map { .. }, _) => Err(ParseError::NotAMapping {
                path: path.to_path(),
                found: describe(value),
            }),
        }
    }

    /// Select the alternative by the payload's discriminator value. No
    /// trial parsing happens here.
    fn dispatch_discriminated(
        &self,
        value: &serde_json::Value,
        layout: &DiscriminatedUnion,
        path: &PathCursor<'_>,
    ) -> Result<Value, ParseError> {
        let valid = || {
            layout
                .arms
                .iter()
                .map(|arm| arm.value.to_string())
                .collect::<Vec<_>>()
        };

        let serde_json::Value::Object(map) = value else {
            return Err(ParseError::UnionMismatch {
                path: path.to_path(),
                value: describe(value),
                alternatives: layout.arms.iter().map(|arm| arm.record.clone()).collect(),
            });
        };

        let Some((_, tag)) = find_key(map, &layout.field) else {
            return Err(ParseError::InvalidDiscriminator {
                path: path.to_path(),
                field: layout.field.clone(),
                found: format!("missing from {value}"),
                valid: valid(),
            });
        };

        match layout.arm_for(tag) {
            Some(arm) => {
                tracing::trace!("Discriminator {tag} at '{path}' selects {}", arm.record);
                let record = self.schema.require_record(&arm.record)?;
                self.build_record(map, record, path).map(Value::Record)
            }
            None => Err(ParseError::InvalidDiscriminator {
                path: path.to_path(),
                field: layout.field.clone(),
                found: tag.to_string(),
                valid: valid(),
            }),
        }
    }

    /// Try each alternative in declaration order; the first success wins.
    /// Record alternatives are only tried against mappings.
    fn try_alternatives(
        &self,
        value: &serde_json::Value,
        alternatives: &[TypeExpr],
        path: &PathCursor<'_>,
    ) -> Result<Value, ParseError> {
        for alt in alternatives {
            if matches!(alt, TypeExpr::Record { .. }) && !value.is_object() {
                continue;
            }
            match self.build_value(value, alt, path) {
                Ok(parsed) => return Ok(parsed),
                // A broken schema is not a mismatch
                Err(err @ ParseError::Schema(_)) => return Err(err),
                Err(err) => {
                    tracing::trace!("Union alternative {alt} rejected at '{path}': {err}");
                }
            }
        }

        Err(ParseError::UnionMismatch {
            path: path.to_path(),
            value: describe(value),
            alternatives: alternatives.iter().map(|alt| alt.to_string()).collect(),
        })
    }
}

/// Convert a JSON primitive into a typed value.
fn primitive_value(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
        },
        serde_json::Value::String(s) => Value::Str(s.clone()),
        other => Value::Json(other.clone()),
    }
}

const MAX_DESCRIBED_LEN: usize = 80;

/// Short human-readable rendering of a JSON value for error messages.
fn describe(value: &serde_json::Value) -> String {
    let kind = match value {
        serde_json::Value::Null => return "null".to_string(),
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "list",
        serde_json::Value::Object(_) => "dictionary",
    };
    let mut rendered = value.to_string();
    if rendered.len() > MAX_DESCRIBED_LEN {
        let mut cut = MAX_DESCRIBED_LEN;
        while !rendered.is_char_boundary(cut) {
            cut -= 1;
        }
        rendered.truncate(cut);
        rendered.push_str("...");
    }
    format!("{kind} {rendered}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use payload_core::EnumSchema;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::new(
            vec![
                RecordSchema::new("Config")
                    .field("disabled", TypeExpr::Bool)
                    .field("gpu", TypeExpr::Bool),
                RecordSchema::new("Point")
                    .field("x", TypeExpr::Float)
                    .field_with_default("label", TypeExpr::Str, "origin"),
            ],
            vec![EnumSchema::new("Level").variant("LOW", 1).variant("HIGH", 2)],
        )
    }

    #[test]
    fn test_primitives() {
        let schema = schema();
        let parser = PayloadParser::new(&schema);

        assert_eq!(parser.parse_as(&json!("a"), &TypeExpr::Str).unwrap(), Value::str("a"));
        assert_eq!(parser.parse_as(&json!(-3), &TypeExpr::Int).unwrap(), Value::Int(-3));
        assert_eq!(parser.parse_as(&json!(true), &TypeExpr::Bool).unwrap(), Value::Bool(true));
        assert_eq!(parser.parse_as(&json!(1.5), &TypeExpr::Float).unwrap(), Value::Float(1.5));
    }

    #[test]
    fn test_int_widens_to_float() {
        let schema = schema();
        let parser = PayloadParser::new(&schema);

        assert_eq!(parser.parse_as(&json!(2), &TypeExpr::Float).unwrap(), Value::Float(2.0));
    }

    #[test]
    fn test_no_other_primitive_coercion() {
        let schema = schema();
        let parser = PayloadParser::new(&schema);

        for (value, ty) in [
            (json!(1.5), TypeExpr::Int),
            (json!(true), TypeExpr::Int),
            (json!("1"), TypeExpr::Int),
            (json!(1), TypeExpr::Str),
            (json!(0), TypeExpr::Bool),
            (json!(null), TypeExpr::Str),
        ] {
            let err = parser.parse_as(&value, &ty).unwrap_err();
            assert!(
                matches!(err, ParseError::TypeMismatch { .. }),
                "{value} as {ty}: {err}"
            );
        }
    }

    #[test]
    fn test_type_mismatch_names_path_and_value() {
        let schema = schema();
        let err = PayloadParser::new(&schema)
            .parse_value(&json!({"disabled": "yes", "gpu": false}), "Config")
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Type mismatch at 'disabled': expected bool, got string \"yes\""
        );
    }

    #[test]
    fn test_default_is_coerced() {
        let schema = schema();
        let record = PayloadParser::new(&schema)
            .parse_value(&json!({"x": 1}), "Point")
            .unwrap();

        assert_eq!(record.get("x"), Some(&Value::Float(1.0)));
        assert_eq!(record.get("label"), Some(&Value::str("origin")));
    }

    #[test]
    fn test_numeric_enum() {
        let schema = schema();
        let parser = PayloadParser::new(&schema);
        let level = TypeExpr::enumeration("Level");

        let parsed = parser.parse_as(&json!(2), &level).unwrap();
        assert!(parsed.as_enum().unwrap().is("Level", "HIGH"));

        let err = parser.parse_as(&json!(3), &level).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid enum value at '<root>': 3 is not a valid Level (expected one of: 1, 2)"
        );
    }

    #[test]
    fn test_float_form_of_integer_backing() {
        let schema = schema();
        let parser = PayloadParser::new(&schema);

        let parsed = parser.parse_as(&json!(2.0), &TypeExpr::enumeration("Level")).unwrap();
        assert!(parsed.as_enum().unwrap().is("Level", "HIGH"));
        assert_eq!(parsed.as_enum().unwrap().value, json!(2));

        let parsed = parser.parse_as(&json!(1.0), &TypeExpr::literal(1)).unwrap();
        assert_eq!(parsed, Value::Int(1));

        let err = parser.parse_as(&json!(1.5), &TypeExpr::literal(1)).unwrap_err();
        assert!(matches!(err, ParseError::TypeMismatch { .. }));
    }

    #[test]
    fn test_primitive_literal() {
        let schema = schema();
        let parser = PayloadParser::new(&schema);

        let parsed = parser.parse_as(&json!("v1"), &TypeExpr::literal("v1")).unwrap();
        assert_eq!(parsed, Value::str("v1"));

        let err = parser.parse_as(&json!("v2"), &TypeExpr::literal("v1")).unwrap_err();
        assert!(matches!(err, ParseError::TypeMismatch { .. }));
    }

    #[test]
    fn test_union_of_primitives() {
        let schema = schema();
        let parser = PayloadParser::new(&schema);
        let ty = TypeExpr::union(vec![TypeExpr::Int, TypeExpr::Str]);

        assert_eq!(parser.parse_as(&json!(4), &ty).unwrap(), Value::Int(4));
        assert_eq!(parser.parse_as(&json!("4"), &ty).unwrap(), Value::str("4"));

        let err = parser.parse_as(&json!([4]), &ty).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Value at '<root>' does not fit any type of the union [int, str]: got list [4]"
        );
    }

    #[test]
    fn test_union_propagates_schema_errors() {
        let schema = schema();
        let parser = PayloadParser::new(&schema);
        let ty = TypeExpr::union(vec![TypeExpr::enumeration("Missing"), TypeExpr::Str]);

        let err = parser.parse_as(&json!("a"), &ty).unwrap_err();
        assert!(matches!(err, ParseError::Schema(_)));
    }

    #[test]
    fn test_unknown_target_type() {
        let schema = schema();
        let err = PayloadParser::new(&schema)
            .parse_value(&json!({}), "Nope")
            .unwrap_err();
        assert!(matches!(err, ParseError::Schema(_)));
    }

    #[test]
    fn test_describe_truncates() {
        let long = json!("x".repeat(200));
        let described = describe(&long);
        assert!(described.starts_with("string \"xxx"));
        assert!(described.ends_with("..."));
        assert!(described.len() < 100);

        assert_eq!(describe(&json!(null)), "null");
        assert_eq!(describe(&json!({"a": 1})), "dictionary {\"a\":1}");
    }

    #[test]
    fn test_options_builder() {
        let options = ParseOptions::new().with_strict(true);
        assert!(options.rejects_unknown_keys());
        assert!(!options.with_allow_unknown_keys(true).rejects_unknown_keys());
        assert!(!ParseOptions::default().rejects_unknown_keys());
    }
}

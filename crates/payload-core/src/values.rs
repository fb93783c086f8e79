//! Value representations for the typed-payload framework.
//!
//! This module defines the fully typed values a parse produces. Unlike raw
//! JSON, enum fields hold [`EnumConstant`]s and nested records are
//! [`Record`]s, never plain mappings.

use std::collections::BTreeMap;

/// Named enumeration constant together with its backing value.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumConstant {
    /// Enumeration name
    pub enum_name: String,

    /// Constant name, e.g. `CAT`
    pub variant: String,

    /// Backing primitive value, e.g. `"cat"`
    pub value: serde_json::Value,
}

impl EnumConstant {
    /// Create a new enumeration constant.
    pub fn new(
        enum_name: impl Into<String>,
        variant: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        Self {
            enum_name: enum_name.into(),
            variant: variant.into(),
            value: value.into(),
        }
    }

    /// Check whether this is the named constant of the named enumeration.
    pub fn is(&self, enum_name: &str, variant: &str) -> bool {
        self.enum_name == enum_name && self.variant == variant
    }
}

/// Typed value produced by the payload parser.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent optional value
    Null,

    /// Boolean value
    Bool(bool),

    /// 64-bit signed integer
    Int(i64),

    /// 64-bit floating point
    Float(f64),

    /// String value
    Str(String),

    /// Enumeration constant
    Enum(EnumConstant),

    /// Nested record
    Record(Record),

    /// Ordered sequence
    List(Vec<Value>),

    /// Fixed or variable tuple
    Tuple(Vec<Value>),

    /// String-keyed mapping
    Map(BTreeMap<String, Value>),

    /// Opaque JSON, kept verbatim
    Json(serde_json::Value),
}

impl Value {
    /// Create a string value.
    pub fn str(value: impl Into<String>) -> Self {
        Self::Str(value.into())
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Try to get this value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get this value as an i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get this value as an f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Try to get this value as a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get this value as an enumeration constant.
    pub fn as_enum(&self) -> Option<&EnumConstant> {
        match self {
            Self::Enum(e) => Some(e),
            _ => None,
        }
    }

    /// Try to get this value as a nested record.
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Try to get this value as a list.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Try to get this value as a tuple.
    pub fn as_tuple(&self) -> Option<&[Value]> {
        match self {
            Self::Tuple(items) => Some(items),
            _ => None,
        }
    }

    /// Try to get this value as a mapping.
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Try to get this value as opaque JSON.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }
}

/// Parsed instance of a record type.
///
/// Holds exactly one value per declared field, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Record type name
    pub type_name: String,

    /// Field values (field name, value) in declaration order
    pub fields: Vec<(String, Value)>,
}

impl Record {
    /// Create a new record.
    pub fn new(type_name: impl Into<String>, fields: Vec<(String, Value)>) -> Self {
        Self {
            type_name: type_name.into(),
            fields,
        }
    }

    /// Create a new record with a builder pattern.
    pub fn builder(type_name: impl Into<String>) -> RecordBuilder {
        RecordBuilder {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    /// Get a field value by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Get the number of fields.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Get all field names in declaration order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Check if this record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Builder for `Record`.
pub struct RecordBuilder {
    type_name: String,
    fields: Vec<(String, Value)>,
}

impl RecordBuilder {
    /// Add a field to the record.
    pub fn field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.push((name.into(), value));
        self
    }

    /// Build the record.
    pub fn build(self) -> Record {
        Record {
            type_name: self.type_name,
            fields: self.fields,
        }
    }
}

/// Compare two JSON values, treating numbers as equal when they denote the
/// same quantity (`2` equals `2.0`). Non-numbers compare structurally.
pub fn json_value_eq(a: &serde_json::Value, b: &serde_json::Value) -> bool {
    match (a, b) {
        (serde_json::Value::Number(x), serde_json::Value::Number(y)) => {
            match (x.as_i64(), y.as_i64()) {
                (Some(x), Some(y)) => x == y,
                _ => match (x.as_u64(), y.as_u64()) {
                    (Some(x), Some(y)) => x == y,
                    _ => x.as_f64() == y.as_f64(),
                },
            }
        }
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Int(42).as_i64(), Some(42));
        assert_eq!(Value::Float(3.5).as_f64(), Some(3.5));
        assert_eq!(Value::str("test").as_str(), Some("test"));
        assert!(Value::Null.is_null());

        // No cross-type conversions
        assert_eq!(Value::Int(42).as_f64(), None);
        assert_eq!(Value::Bool(true).as_i64(), None);
        assert!(Value::List(vec![]).as_tuple().is_none());
    }

    #[test]
    fn test_enum_constant() {
        let cat = EnumConstant::new("AnimalType", "CAT", "cat");
        assert!(cat.is("AnimalType", "CAT"));
        assert!(!cat.is("AnimalType", "DOG"));
        assert_eq!(Value::Enum(cat.clone()).as_enum(), Some(&cat));
    }

    #[test]
    fn test_record_builder() {
        let record = Record::builder("Config")
            .field("disabled", Value::Bool(true))
            .field("gpu", Value::Bool(false))
            .build();

        assert_eq!(record.type_name, "Config");
        assert_eq!(record.field_count(), 2);
        assert_eq!(record.field_names(), vec!["disabled", "gpu"]);
        assert_eq!(record.get("gpu"), Some(&Value::Bool(false)));
        assert_eq!(record.get("missing"), None);
        assert!(Record::new("Empty", vec![]).is_empty());
    }

    #[test]
    fn test_nested_record_access() {
        let inner = Record::builder("Config")
            .field("gpu", Value::Bool(true))
            .build();
        let outer = Record::builder("Nested")
            .field("config", Value::Record(inner))
            .build();

        let gpu = outer
            .get("config")
            .and_then(Value::as_record)
            .and_then(|r| r.get("gpu"))
            .and_then(Value::as_bool);
        assert_eq!(gpu, Some(true));
    }

    #[test]
    fn test_json_value_eq_numbers() {
        use serde_json::json;

        assert!(json_value_eq(&json!(2), &json!(2.0)));
        assert!(json_value_eq(&json!(-1.0), &json!(-1)));
        assert!(json_value_eq(&json!(u64::MAX), &json!(u64::MAX)));
        assert!(!json_value_eq(&json!(2), &json!(2.5)));
        assert!(!json_value_eq(&json!(1), &json!(true)));
        assert!(!json_value_eq(&json!("2"), &json!(2)));
        assert!(json_value_eq(&json!("cat"), &json!("cat")));
    }
}

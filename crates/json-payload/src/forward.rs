//! Forward conversion: Record → JSON value.
//!
//! The inverse of [`parse`](crate::parse): enumeration constants become
//! their backing values, records and maps become objects, lists and tuples
//! become arrays.

use payload_core::{Record, Value};
use serde_json::{json, Map};

/// Wrapper for JSON values.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonValue(pub serde_json::Value);

impl JsonValue {
    /// Get the inner JSON value.
    pub fn into_inner(self) -> serde_json::Value {
        self.0
    }

    /// Get a reference to the inner JSON value.
    pub fn as_inner(&self) -> &serde_json::Value {
        &self.0
    }
}

impl From<Value> for JsonValue {
    fn from(value: Value) -> Self {
        JsonValue(value_to_json(&value))
    }
}

impl From<Record> for JsonValue {
    fn from(record: Record) -> Self {
        JsonValue(record_to_json(&record))
    }
}

/// Convert a typed value to JSON.
pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => json!(*b),
        Value::Int(i) => json!(*i),
        // Non-finite floats have no JSON form
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Str(s) => json!(s),
        Value::Enum(constant) => constant.value.clone(),
        Value::Record(record) => record_to_json(record),
        Value::List(items) | Value::Tuple(items) => {
            serde_json::Value::Array(items.iter().map(value_to_json).collect())
        }
        Value::Map(map) => serde_json::Value::Object(
            map.iter()
                .map(|(key, item)| (key.clone(), value_to_json(item)))
                .collect(),
        ),
        Value::Json(v) => v.clone(),
    }
}

/// Convert a record to a JSON object keyed by declared field names.
pub fn record_to_json(record: &Record) -> serde_json::Value {
    let mut map = Map::with_capacity(record.field_count());
    for (name, value) in &record.fields {
        map.insert(name.clone(), value_to_json(value));
    }
    serde_json::Value::Object(map)
}

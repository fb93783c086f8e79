//! Declared type expressions for record fields.
//!
//! This module defines `TypeExpr`, the closed set of type shapes a record
//! field can declare. The payload parser dispatches on these tags, one
//! handler per variant.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// Declared type of a record field.
///
/// Named types (`Record`, `Enum`, `EnumLiteral`) refer to descriptors held
/// by a [`Schema`](crate::Schema) and are resolved at parse time.
///
/// # YAML Format
///
/// Parameterless types can be specified as strings:
/// ```yaml
/// type: str
/// type: int
/// type: any
/// ```
///
/// Everything else uses object format:
/// ```yaml
/// type:
///   type: record
///   name: Config
/// type:
///   type: list
///   element:
///     type: record
///     name: Config
/// type:
///   type: union
///   alternatives:
///     - { type: record, name: Dog }
///     - { type: record, name: Cat }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    // Primitives
    /// UTF-8 string
    Str,

    /// Signed 64-bit integer
    Int,

    /// 64-bit float (integers are widened)
    Float,

    /// Boolean
    Bool,

    /// Any JSON value, kept verbatim
    Any,

    // Named types
    /// Nested record, by name
    Record {
        /// Record type name
        name: String,
    },

    /// Enumeration, by name
    Enum {
        /// Enumeration name
        name: String,
    },

    /// Single permitted primitive value
    Literal {
        /// The permitted value
        value: serde_json::Value,
    },

    /// Single permitted enumeration constant
    EnumLiteral {
        /// Enumeration name
        enum_name: String,
        /// Variant name within the enumeration
        variant: String,
    },

    // Wrappers
    /// Value or absence
    Optional {
        /// Wrapped type
        inner: Box<TypeExpr>,
    },

    /// One of several alternatives
    Union {
        /// Alternatives in declaration order
        alternatives: Vec<TypeExpr>,
    },

    // Containers
    /// Homogeneous ordered sequence
    List {
        /// Element type
        element: Box<TypeExpr>,
    },

    /// Fixed-arity heterogeneous tuple
    Tuple {
        /// Positional element types
        elements: Vec<TypeExpr>,
    },

    /// Variable-arity homogeneous tuple
    VarTuple {
        /// Element type
        element: Box<TypeExpr>,
    },

    /// Mapping from string keys to a value type
    Map {
        /// Value type
        value: Box<TypeExpr>,
    },
}

/// A named descriptor referenced from a type expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeReference<'a> {
    /// A record type name
    Record(&'a str),
    /// An enumeration name
    Enum(&'a str),
    /// A single variant of an enumeration
    EnumVariant {
        /// Enumeration name
        enum_name: &'a str,
        /// Variant name
        variant: &'a str,
    },
}

// Custom serialization/deserialization for TypeExpr
// Supports both simple string format ("str", "int") and object format ({"type": "list", "element": "int"})

impl Serialize for TypeExpr {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeMap;

        match self {
            // Simple types - serialize as string
            Self::Str => serializer.serialize_str("str"),
            Self::Int => serializer.serialize_str("int"),
            Self::Float => serializer.serialize_str("float"),
            Self::Bool => serializer.serialize_str("bool"),
            Self::Any => serializer.serialize_str("any"),

            // Complex types - serialize as map
            Self::Record { name } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "record")?;
                map.serialize_entry("name", name)?;
                map.end()
            }
            Self::Enum { name } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "enum")?;
                map.serialize_entry("name", name)?;
                map.end()
            }
            Self::Literal { value } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "literal")?;
                map.serialize_entry("value", value)?;
                map.end()
            }
            Self::EnumLiteral { enum_name, variant } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("type", "enum_literal")?;
                map.serialize_entry("enum", enum_name)?;
                map.serialize_entry("variant", variant)?;
                map.end()
            }
            Self::Optional { inner } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "optional")?;
                map.serialize_entry("inner", inner)?;
                map.end()
            }
            Self::Union { alternatives } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "union")?;
                map.serialize_entry("alternatives", alternatives)?;
                map.end()
            }
            Self::List { element } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "list")?;
                map.serialize_entry("element", element)?;
                map.end()
            }
            Self::Tuple { elements } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "tuple")?;
                map.serialize_entry("elements", elements)?;
                map.end()
            }
            Self::VarTuple { element } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "var_tuple")?;
                map.serialize_entry("element", element)?;
                map.end()
            }
            Self::Map { value } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "map")?;
                map.serialize_entry("value", value)?;
                map.end()
            }
        }
    }
}

fn simple_type(name: &str) -> Option<TypeExpr> {
    match name {
        "str" | "string" | "text" => Some(TypeExpr::Str),
        "int" | "integer" => Some(TypeExpr::Int),
        "float" | "double" => Some(TypeExpr::Float),
        "bool" | "boolean" => Some(TypeExpr::Bool),
        "any" | "json" => Some(TypeExpr::Any),
        _ => None,
    }
}

impl<'de> Deserialize<'de> for TypeExpr {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{Error, MapAccess, Visitor};

        struct TypeExprVisitor;

        impl<'de> Visitor<'de> for TypeExprVisitor {
            type Value = TypeExpr;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string or map representing a TypeExpr")
            }

            // Handle string format: "str", "int", etc.
            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: Error,
            {
                simple_type(value).ok_or_else(|| E::custom(format!("unknown simple type: {value}")))
            }

            // Handle map format: {"type": "list", "element": "int"}
            fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut type_name: Option<String> = None;
                let mut fields: HashMap<String, serde_yaml::Value> = HashMap::new();

                while let Some(key) = map.next_key::<String>()? {
                    if key == "type" {
                        type_name = Some(map.next_value()?);
                    } else {
                        fields.insert(key, map.next_value()?);
                    }
                }

                let type_name = type_name.ok_or_else(|| M::Error::missing_field("type"))?;

                if let Some(simple) = simple_type(&type_name) {
                    return Ok(simple);
                }

                match type_name.as_str() {
                    "record" => Ok(TypeExpr::Record {
                        name: get_field_required(&fields, "name")?,
                    }),
                    "enum" => Ok(TypeExpr::Enum {
                        name: get_field_required(&fields, "name")?,
                    }),
                    "literal" => Ok(TypeExpr::Literal {
                        value: get_field_required(&fields, "value")?,
                    }),
                    "enum_literal" => Ok(TypeExpr::EnumLiteral {
                        enum_name: get_field_required(&fields, "enum")?,
                        variant: get_field_required(&fields, "variant")?,
                    }),
                    "optional" => Ok(TypeExpr::Optional {
                        inner: Box::new(get_field_required(&fields, "inner")?),
                    }),
                    "union" => Ok(TypeExpr::Union {
                        alternatives: get_field_required(&fields, "alternatives")?,
                    }),
                    "list" | "sequence" => Ok(TypeExpr::List {
                        element: Box::new(get_field_required(&fields, "element")?),
                    }),
                    "tuple" => Ok(TypeExpr::Tuple {
                        elements: get_field_required(&fields, "elements")?,
                    }),
                    "var_tuple" => Ok(TypeExpr::VarTuple {
                        element: Box::new(get_field_required(&fields, "element")?),
                    }),
                    "map" | "dict" => Ok(TypeExpr::Map {
                        value: Box::new(get_field_required(&fields, "value")?),
                    }),
                    _ => Err(M::Error::custom(format!("unknown type: {type_name}"))),
                }
            }
        }

        deserializer.deserialize_any(TypeExprVisitor)
    }
}

fn get_field_required<T: for<'de> Deserialize<'de>, E: serde::de::Error>(
    fields: &HashMap<String, serde_yaml::Value>,
    key: &'static str,
) -> Result<T, E> {
    let value = fields.get(key).ok_or_else(|| E::missing_field(key))?;
    serde_yaml::from_value(value.clone())
        .map_err(|e| E::custom(format!("invalid field '{key}': {e}")))
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str => f.write_str("str"),
            Self::Int => f.write_str("int"),
            Self::Float => f.write_str("float"),
            Self::Bool => f.write_str("bool"),
            Self::Any => f.write_str("any"),
            Self::Record { name } | Self::Enum { name } => f.write_str(name),
            Self::Literal { value } => write!(f, "Literal[{value}]"),
            Self::EnumLiteral { enum_name, variant } => {
                write!(f, "Literal[{enum_name}.{variant}]")
            }
            Self::Optional { inner } => write!(f, "Optional[{inner}]"),
            Self::Union { alternatives } => {
                f.write_str("Union[")?;
                write_joined(f, alternatives)?;
                f.write_str("]")
            }
            Self::List { element } => write!(f, "list[{element}]"),
            Self::Tuple { elements } => {
                f.write_str("tuple[")?;
                write_joined(f, elements)?;
                f.write_str("]")
            }
            Self::VarTuple { element } => write!(f, "tuple[{element}, ...]"),
            Self::Map { value } => write!(f, "dict[str, {value}]"),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, types: &[TypeExpr]) -> fmt::Result {
    for (i, ty) in types.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{ty}")?;
    }
    Ok(())
}

impl TypeExpr {
    /// Create a reference to a record type.
    pub fn record(name: impl Into<String>) -> Self {
        Self::Record { name: name.into() }
    }

    /// Create a reference to an enumeration.
    pub fn enumeration(name: impl Into<String>) -> Self {
        Self::Enum { name: name.into() }
    }

    /// Create a primitive literal type.
    pub fn literal(value: impl Into<serde_json::Value>) -> Self {
        Self::Literal {
            value: value.into(),
        }
    }

    /// Create a literal type permitting a single enumeration constant.
    pub fn enum_literal(enum_name: impl Into<String>, variant: impl Into<String>) -> Self {
        Self::EnumLiteral {
            enum_name: enum_name.into(),
            variant: variant.into(),
        }
    }

    /// Create an optional wrapper.
    pub fn optional(inner: TypeExpr) -> Self {
        Self::Optional {
            inner: Box::new(inner),
        }
    }

    /// Create a union of alternatives.
    pub fn union(alternatives: Vec<TypeExpr>) -> Self {
        Self::Union { alternatives }
    }

    /// Create a list type with the given element type.
    pub fn list(element: TypeExpr) -> Self {
        Self::List {
            element: Box::new(element),
        }
    }

    /// Create a fixed-arity tuple type.
    pub fn tuple(elements: Vec<TypeExpr>) -> Self {
        Self::Tuple { elements }
    }

    /// Create a variable-arity homogeneous tuple type.
    pub fn var_tuple(element: TypeExpr) -> Self {
        Self::VarTuple {
            element: Box::new(element),
        }
    }

    /// Create a string-keyed mapping type.
    pub fn map(value: TypeExpr) -> Self {
        Self::Map {
            value: Box::new(value),
        }
    }

    /// Check if this type is a primitive.
    pub fn is_primitive(&self) -> bool {
        matches!(self, Self::Str | Self::Int | Self::Float | Self::Bool)
    }

    /// Check if this type is a literal (primitive or enumeration constant).
    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Literal { .. } | Self::EnumLiteral { .. })
    }

    /// Check if this type is an optional wrapper.
    pub fn is_optional(&self) -> bool {
        matches!(self, Self::Optional { .. })
    }

    /// Check if this type is a container (list, tuple, or map).
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            Self::List { .. } | Self::Tuple { .. } | Self::VarTuple { .. } | Self::Map { .. }
        )
    }

    /// Visit this expression and every expression nested in it, outermost first.
    pub fn walk<'a, F: FnMut(&'a TypeExpr)>(&'a self, visit: &mut F) {
        visit(self);
        match self {
            Self::Optional { inner } => inner.walk(visit),
            Self::List { element } | Self::VarTuple { element } => element.walk(visit),
            Self::Map { value } => value.walk(visit),
            Self::Union {
                alternatives: items,
            }
            | Self::Tuple { elements: items } => {
                for item in items {
                    item.walk(visit);
                }
            }
            Self::Str
            | Self::Int
            | Self::Float
            | Self::Bool
            | Self::Any
            | Self::Record { .. }
            | Self::Enum { .. }
            | Self::Literal { .. }
            | Self::EnumLiteral { .. } => {}
        }
    }

    /// Collect every named descriptor this expression refers to, recursively.
    pub fn references(&self) -> Vec<TypeReference<'_>> {
        let mut out = Vec::new();
        self.walk(&mut |ty| match ty {
            Self::Record { name } => out.push(TypeReference::Record(name)),
            Self::Enum { name } => out.push(TypeReference::Enum(name)),
            Self::EnumLiteral { enum_name, variant } => out.push(TypeReference::EnumVariant {
                enum_name,
                variant,
            }),
            _ => {}
        });
        out
    }

    /// Name of the referenced record, if this is a record type.
    pub fn record_name(&self) -> Option<&str> {
        match self {
            Self::Record { name } => Some(name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_expr_constructors() {
        assert_eq!(
            TypeExpr::record("Config"),
            TypeExpr::Record {
                name: "Config".to_string()
            }
        );
        assert_eq!(
            TypeExpr::list(TypeExpr::Int),
            TypeExpr::List {
                element: Box::new(TypeExpr::Int)
            }
        );
        assert_eq!(
            TypeExpr::enum_literal("AnimalType", "DOG"),
            TypeExpr::EnumLiteral {
                enum_name: "AnimalType".to_string(),
                variant: "DOG".to_string()
            }
        );
    }

    #[test]
    fn test_type_categories() {
        assert!(TypeExpr::Int.is_primitive());
        assert!(!TypeExpr::Any.is_primitive());
        assert!(!TypeExpr::record("Config").is_primitive());

        assert!(TypeExpr::literal("dog").is_literal());
        assert!(TypeExpr::enum_literal("AnimalType", "CAT").is_literal());
        assert!(!TypeExpr::enumeration("AnimalType").is_literal());

        assert!(TypeExpr::optional(TypeExpr::Str).is_optional());

        assert!(TypeExpr::map(TypeExpr::Int).is_container());
        assert!(TypeExpr::var_tuple(TypeExpr::Int).is_container());
        assert!(!TypeExpr::Str.is_container());
    }

    #[test]
    fn test_display() {
        let ty = TypeExpr::union(vec![TypeExpr::record("Dog"), TypeExpr::record("Cat")]);
        assert_eq!(ty.to_string(), "Union[Dog, Cat]");

        let ty = TypeExpr::tuple(vec![TypeExpr::Str, TypeExpr::record("Config")]);
        assert_eq!(ty.to_string(), "tuple[str, Config]");

        let ty = TypeExpr::var_tuple(TypeExpr::record("Config"));
        assert_eq!(ty.to_string(), "tuple[Config, ...]");

        let ty = TypeExpr::optional(TypeExpr::map(TypeExpr::Bool));
        assert_eq!(ty.to_string(), "Optional[dict[str, bool]]");

        assert_eq!(
            TypeExpr::enum_literal("AnimalType", "DOG").to_string(),
            "Literal[AnimalType.DOG]"
        );
        assert_eq!(TypeExpr::literal("dog").to_string(), "Literal[\"dog\"]");
    }

    #[test]
    fn test_deserialize_simple_string() {
        let parsed: TypeExpr = serde_yaml::from_str("str").unwrap();
        assert_eq!(parsed, TypeExpr::Str);

        let parsed: TypeExpr = serde_yaml::from_str("integer").unwrap();
        assert_eq!(parsed, TypeExpr::Int);

        let parsed: TypeExpr = serde_yaml::from_str("json").unwrap();
        assert_eq!(parsed, TypeExpr::Any);

        let result: Result<TypeExpr, _> = serde_yaml::from_str("decimal");
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_nested_types() {
        let yaml = r#"
type: list
element:
  type: record
  name: Config
"#;
        let parsed: TypeExpr = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(parsed, TypeExpr::list(TypeExpr::record("Config")));

        let yaml = r#"
type: tuple
elements:
  - str
  - { type: record, name: Config }
"#;
        let parsed: TypeExpr = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            parsed,
            TypeExpr::tuple(vec![TypeExpr::Str, TypeExpr::record("Config")])
        );

        let yaml = r#"
type: enum_literal
enum: AnimalType
variant: DOG
"#;
        let parsed: TypeExpr = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(parsed, TypeExpr::enum_literal("AnimalType", "DOG"));
    }

    #[test]
    fn test_deserialize_from_json() {
        let json = r#"{"type": "map", "value": {"type": "optional", "inner": "float"}}"#;
        let parsed: TypeExpr = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, TypeExpr::map(TypeExpr::optional(TypeExpr::Float)));
    }

    #[test]
    fn test_deserialize_missing_parameter() {
        let yaml = r#"
type: record
"#;
        let result: Result<TypeExpr, _> = serde_yaml::from_str(yaml);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("name"), "unexpected error: {err}");
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let types = vec![
            TypeExpr::Bool,
            TypeExpr::Any,
            TypeExpr::literal(3),
            TypeExpr::enum_literal("AnimalType", "CAT"),
            TypeExpr::optional(TypeExpr::Str),
            TypeExpr::union(vec![TypeExpr::record("A"), TypeExpr::record("B")]),
            TypeExpr::var_tuple(TypeExpr::Int),
            TypeExpr::map(TypeExpr::list(TypeExpr::enumeration("AnimalType"))),
        ];

        for ty in types {
            let yaml = serde_yaml::to_string(&ty).unwrap();
            let parsed: TypeExpr = serde_yaml::from_str(&yaml).unwrap();
            assert_eq!(ty, parsed);
        }
    }

    #[test]
    fn test_references() {
        let ty = TypeExpr::union(vec![
            TypeExpr::record("Dog"),
            TypeExpr::map(TypeExpr::enumeration("AnimalType")),
            TypeExpr::tuple(vec![TypeExpr::Str, TypeExpr::enum_literal("AnimalType", "CAT")]),
        ]);

        assert_eq!(
            ty.references(),
            vec![
                TypeReference::Record("Dog"),
                TypeReference::Enum("AnimalType"),
                TypeReference::EnumVariant {
                    enum_name: "AnimalType",
                    variant: "CAT"
                },
            ]
        );
        assert!(TypeExpr::list(TypeExpr::Int).references().is_empty());
    }

    #[test]
    fn test_walk_visits_nested_expressions() {
        let ty = TypeExpr::optional(TypeExpr::list(TypeExpr::union(vec![
            TypeExpr::literal("a"),
            TypeExpr::record("Dog"),
        ])));

        let mut seen = Vec::new();
        ty.walk(&mut |inner| seen.push(inner.to_string()));
        assert_eq!(
            seen,
            vec![
                "Optional[list[Union[Literal[\"a\"], Dog]]]",
                "list[Union[Literal[\"a\"], Dog]]",
                "Union[Literal[\"a\"], Dog]",
                "Literal[\"a\"]",
                "Dog",
            ]
        );
        assert_eq!(TypeExpr::record("Dog").record_name(), Some("Dog"));
        assert_eq!(TypeExpr::Str.record_name(), None);
    }
}

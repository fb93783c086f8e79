//! Parse errors and field paths.

use payload_core::SchemaError;
use std::fmt;

/// One step of a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Field(String),
    Index(usize),
    Key(String),
}

/// Location of a value inside a payload, rendered dotted with index
/// positions in brackets: `configs[1].gpu`. The root renders as `<root>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    /// The payload root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Path to a named record field below this one.
    pub fn field(&self, name: &str) -> Self {
        self.push(Segment::Field(name.to_string()))
    }

    /// Path to a list or tuple position below this one.
    pub fn index(&self, index: usize) -> Self {
        self.push(Segment::Index(index))
    }

    /// Path to a mapping entry below this one.
    pub fn key(&self, key: &str) -> Self {
        self.push(Segment::Key(key.to_string()))
    }

    /// Whether this is the payload root.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    fn push(&self, segment: Segment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("<root>");
        }
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Field(name) | Segment::Key(name) => {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(name)?;
                }
                Segment::Index(idx) => write!(f, "[{idx}]")?,
            }
        }
        Ok(())
    }
}

/// Borrowed path used while walking a payload. Each step lives on the stack
/// of the walk; a [`FieldPath`] is only built when an error needs one.
#[derive(Debug, Clone, Copy)]
pub(crate) enum PathCursor<'a> {
    Root,
    Field(&'a PathCursor<'a>, &'a str),
    Index(&'a PathCursor<'a>, usize),
    Key(&'a PathCursor<'a>, &'a str),
}

impl PathCursor<'_> {
    /// Materialize the owned path.
    pub(crate) fn to_path(&self) -> FieldPath {
        let mut segments = Vec::new();
        let mut cursor = self;
        loop {
            let (parent, segment) = match *cursor {
                PathCursor::Root => break,
                PathCursor::Field(parent, name) => (parent, Segment::Field(name.to_string())),
                PathCursor::Index(parent, idx) => (parent, Segment::Index(idx)),
                PathCursor::Key(parent, key) => (parent, Segment::Key(key.to_string())),
            };
            segments.push(segment);
            cursor = parent;
        }
        segments.reverse();
        FieldPath { segments }
    }
}

impl fmt::Display for PathCursor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_path(), f)
    }
}

/// Coarse classification of a [`ParseError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidJson,
    NotAMapping,
    MissingRequiredField,
    TypeMismatch,
    InvalidEnumValue,
    UnionResolutionFailure,
    TupleArityMismatch,
    UnknownField,
    Schema,
    Extract,
}

/// Error type for payload parsing.
///
/// Every variant raised while walking the payload carries the [`FieldPath`]
/// of the offending value.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Payload bytes are not valid JSON
    #[error("Invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// A record or mapping position holds something else
    #[error("Value at '{path}' needs to be a dictionary, got {found}")]
    NotAMapping { path: FieldPath, found: String },

    /// Required field absent from the payload
    #[error("Missing required field '{field}' for record '{record}' at '{path}'")]
    MissingRequiredField {
        path: FieldPath,
        field: String,
        record: String,
    },

    /// Value does not have the declared shape
    #[error("Type mismatch at '{path}': expected {expected}, got {found}")]
    TypeMismatch {
        path: FieldPath,
        expected: String,
        found: String,
    },

    /// Value is not a backing value of the enumeration
    #[error(
        "Invalid enum value at '{path}': {value} is not a valid {enum_name} (expected one of: {})",
        .accepted.join(", ")
    )]
    InvalidEnumValue {
        path: FieldPath,
        enum_name: String,
        value: String,
        accepted: Vec<String>,
    },

    /// No alternative of a plain union accepted the value
    #[error(
        "Value at '{path}' does not fit any type of the union [{}]: got {value}",
        .alternatives.join(", ")
    )]
    UnionMismatch {
        path: FieldPath,
        value: String,
        alternatives: Vec<String>,
    },

    /// Discriminator of a discriminated union is absent or unknown
    #[error(
        "Invalid discriminator at '{path}': field '{field}' is {found} (expected one of: {})",
        .valid.join(", ")
    )]
    InvalidDiscriminator {
        path: FieldPath,
        field: String,
        found: String,
        valid: Vec<String>,
    },

    /// Fixed tuple with the wrong number of elements
    #[error("Tuple length mismatch at '{path}': expected {expected} elements, got {found}")]
    TupleArityMismatch {
        path: FieldPath,
        expected: usize,
        found: usize,
    },

    /// Payload key with no matching field, in strict mode
    #[error("Unknown field '{key}' for record '{record}' at '{path}'")]
    UnknownField {
        path: FieldPath,
        key: String,
        record: String,
    },

    /// Schema does not define a referenced type
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Parsed record does not deserialize into the requested Rust type
    #[error("Failed to extract '{type_name}': {source}")]
    Extract {
        type_name: String,
        source: serde_json::Error,
    },
}

impl ParseError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidJson(_) => ErrorKind::InvalidJson,
            Self::NotAMapping { .. } => ErrorKind::NotAMapping,
            Self::MissingRequiredField { .. } => ErrorKind::MissingRequiredField,
            Self::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Self::InvalidEnumValue { .. } => ErrorKind::InvalidEnumValue,
            Self::UnionMismatch { .. } | Self::InvalidDiscriminator { .. } => {
                ErrorKind::UnionResolutionFailure
            }
            Self::TupleArityMismatch { .. } => ErrorKind::TupleArityMismatch,
            Self::UnknownField { .. } => ErrorKind::UnknownField,
            Self::Schema(_) => ErrorKind::Schema,
            Self::Extract { .. } => ErrorKind::Extract,
        }
    }

    /// Location of the offending value, if the error has one.
    pub fn path(&self) -> Option<&FieldPath> {
        match self {
            Self::NotAMapping { path, .. }
            | Self::MissingRequiredField { path, .. }
            | Self::TypeMismatch { path, .. }
            | Self::InvalidEnumValue { path, .. }
            | Self::UnionMismatch { path, .. }
            | Self::InvalidDiscriminator { path, .. }
            | Self::TupleArityMismatch { path, .. }
            | Self::UnknownField { path, .. } => Some(path),
            Self::InvalidJson(_) | Self::Schema(_) | Self::Extract { .. } => None,
        }
    }
}

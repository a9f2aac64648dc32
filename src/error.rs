//! Error types for SenML operations

use thiserror::Error;

/// Result type alias for SenML operations
pub type Result<T> = std::result::Result<T, SenMLError>;

/// Errors that can occur while decoding or resolving a SenML pack
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SenMLError {
    /// Input is not valid JSON
    #[error("Syntax error: {message}")]
    Syntax { message: String },

    /// Top level JSON value is not an array
    #[error("SenML pack must be a JSON array")]
    NotAnArray,

    /// A single record failed to decode or resolve
    #[error("Record {index}: {kind}")]
    Record { index: usize, kind: RecordError },

    /// Encoding failed
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

/// Why a single record was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// Pack element is not a JSON object
    #[error("record is not a JSON object")]
    NotAnObject,

    /// None of `v`, `vs`, `vb`, `vd` is present
    #[error("record carries no value (expected one of v, vs, vb, vd)")]
    MissingValueKind,

    /// More than one of `v`, `vs`, `vb`, `vd` is present
    #[error("record carries more than one value kind: {}", keys.join(", "))]
    AmbiguousValueKind { keys: Vec<&'static str> },

    /// A known field holds the wrong JSON type
    #[error("field '{field}' must be {expected}")]
    FieldType {
        field: &'static str,
        expected: &'static str,
    },

    /// `bver` appears after the first record
    #[error("base version is only allowed on the first record")]
    VersionNotOnFirstRecord,

    /// Base name and name concatenate to nothing
    #[error("resolved name is empty")]
    EmptyResolvedName,
}

impl SenMLError {
    /// Create a syntax error
    pub fn syntax<S: Into<String>>(message: S) -> Self {
        Self::Syntax {
            message: message.into(),
        }
    }

    /// Attach a record index to a record level error
    pub fn record(index: usize, kind: RecordError) -> Self {
        Self::Record { index, kind }
    }

    /// Create a serialization error
    pub fn serialization<S: Into<String>>(message: S) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Index of the offending record, if the error is tied to one
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Record { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// The record level cause, if any
    pub fn kind(&self) -> Option<&RecordError> {
        match self {
            Self::Record { kind, .. } => Some(kind),
            _ => None,
        }
    }
}

impl RecordError {
    /// Create a field type error
    pub fn field_type(field: &'static str, expected: &'static str) -> Self {
        Self::FieldType { field, expected }
    }
}

impl From<serde_json::Error> for SenMLError {
    fn from(err: serde_json::Error) -> Self {
        Self::Syntax {
            message: err.to_string(),
        }
    }
}

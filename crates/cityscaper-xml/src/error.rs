//! Error types for the XML persistence layer.

use thiserror::Error;

use crate::value::ValueType;

#[derive(Debug, Error)]
pub enum Error {
  /// A property declares a value type the registry has no converter for.
  #[error("no converter registered for {value_type} (property {property})")]
  Configuration {
    property:   String,
    value_type: ValueType,
  },

  #[error("default for {property} is a {found} value, declared {expected}")]
  DefaultTypeMismatch {
    property: String,
    expected: ValueType,
    found:    ValueType,
  },

  #[error("malformed value for {property}: {value:?}")]
  MalformedValue { property: String, value: String },

  #[error("expected a {expected} value, got {found}")]
  TypeMismatch { expected: ValueType, found: ValueType },

  #[error("property only exists on {0} nodes")]
  WrongNodeKind(&'static str),

  #[error("value out of range: {0}")]
  OutOfRange(String),

  #[error("writer used out of order: {0}")]
  WriterOrder(&'static str),

  #[error("malformed document: {0}")]
  MalformedDocument(String),

  #[error("xml error: {0}")]
  Xml(String),

  #[error("i/o error: {0}")]
  Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

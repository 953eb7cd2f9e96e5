//! The closed set of value types a property can declare.

use chrono::{DateTime, Utc};
use cityscaper_core::{Color, ContributionType, Status, Vector3};
use strum::Display;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ValueType {
  String,
  Int,
  UInt,
  Float,
  Bool,
  U64,
  I64,
  Timestamp,
  ContributionType,
  Status,
  Vector3,
  Color,
  IntArray,
}

/// A property value in transit between an object and its serialized form.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
  String(String),
  Int(i32),
  UInt(u32),
  Float(f32),
  Bool(bool),
  U64(u64),
  I64(i64),
  Timestamp(DateTime<Utc>),
  ContributionType(ContributionType),
  Status(Status),
  Vector3(Vector3),
  Color(Color),
  IntArray(Vec<i32>),
}

impl Value {
  pub fn value_type(&self) -> ValueType {
    match self {
      Self::String(_) => ValueType::String,
      Self::Int(_) => ValueType::Int,
      Self::UInt(_) => ValueType::UInt,
      Self::Float(_) => ValueType::Float,
      Self::Bool(_) => ValueType::Bool,
      Self::U64(_) => ValueType::U64,
      Self::I64(_) => ValueType::I64,
      Self::Timestamp(_) => ValueType::Timestamp,
      Self::ContributionType(_) => ValueType::ContributionType,
      Self::Status(_) => ValueType::Status,
      Self::Vector3(_) => ValueType::Vector3,
      Self::Color(_) => ValueType::Color,
      Self::IntArray(_) => ValueType::IntArray,
    }
  }
}

impl From<&str> for Value {
  fn from(s: &str) -> Self { Self::String(s.to_owned()) }
}

macro_rules! value_conversions {
  ($($variant:ident($ty:ty)),* $(,)?) => {
    $(
      impl From<$ty> for Value {
        fn from(v: $ty) -> Self { Self::$variant(v) }
      }

      impl TryFrom<Value> for $ty {
        type Error = Error;

        fn try_from(value: Value) -> Result<Self> {
          match value {
            Value::$variant(v) => Ok(v),
            other => Err(Error::TypeMismatch {
              expected: ValueType::$variant,
              found:    other.value_type(),
            }),
          }
        }
      }
    )*
  };
}

value_conversions! {
  String(String),
  Int(i32),
  UInt(u32),
  Float(f32),
  Bool(bool),
  U64(u64),
  I64(i64),
  Timestamp(DateTime<Utc>),
  ContributionType(ContributionType),
  Status(Status),
  Vector3(Vector3),
  Color(Color),
  IntArray(Vec<i32>),
}

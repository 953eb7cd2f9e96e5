//! Converters between [`Value`]s and their XML forms, and the registry that
//! maps each [`ValueType`] to one.

use std::{borrow::Cow, collections::HashMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use cityscaper_core::{Color, ContributionType, Status, Vector3};
use rand_core::{OsRng, RngCore};

use crate::{Element, Error, Result, Value, ValueType};

/// Ticks (100 ns units since 0001-01-01) at the Unix epoch.
pub const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;
const TICKS_PER_SECOND: i64 = 10_000_000;

pub const ARRAY_ITEM: &str = "Element";
pub const ARRAY_VALUE: &str = "Value";

/// Raw text a converter could not turn into a value. The loader attaches
/// the property name.
#[derive(Debug, Clone, PartialEq)]
pub struct Malformed(pub String);

pub type Decoded = std::result::Result<Value, Malformed>;

/// How a value type is serialized. Attribute-shaped converters produce a
/// single string; element-shaped ones produce a child element named after
/// the property.
#[derive(Clone, Copy)]
pub enum Converter {
  Attribute {
    encode: fn(&Value) -> Result<String>,
    decode: fn(&str) -> Decoded,
  },
  Element {
    encode: fn(&str, &Value) -> Result<Element>,
    decode: fn(&Element) -> Decoded,
  },
}

impl Converter {
  pub fn is_attribute(&self) -> bool { matches!(self, Self::Attribute { .. }) }
}

impl fmt::Debug for Converter {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Attribute { .. } => f.write_str("Converter::Attribute"),
      Self::Element { .. } => f.write_str("Converter::Element"),
    }
  }
}

// ─── Registry ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct ConverterRegistry {
  converters: HashMap<ValueType, Converter>,
}

impl ConverterRegistry {
  pub fn empty() -> Self { Self::default() }

  /// Every built-in converter.
  pub fn standard() -> Self {
    Self::empty()
      .register(ValueType::String, attribute(encode_string, decode_string))
      .register(ValueType::Int, attribute(encode_int, decode_int))
      .register(ValueType::UInt, attribute(encode_uint, decode_uint))
      .register(ValueType::Float, attribute(encode_float, decode_float))
      .register(ValueType::Bool, attribute(encode_bool, decode_bool))
      .register(ValueType::U64, attribute(encode_u64, decode_u64))
      .register(ValueType::I64, attribute(encode_i64, decode_i64))
      .register(
        ValueType::Timestamp,
        attribute(encode_timestamp, decode_timestamp),
      )
      .register(
        ValueType::ContributionType,
        attribute(encode_contribution_type, decode_contribution_type),
      )
      .register(ValueType::Status, attribute(encode_status, decode_status))
      .register(ValueType::Vector3, element(encode_vector3, decode_vector3))
      .register(ValueType::Color, element(encode_color, decode_color))
      .register(
        ValueType::IntArray,
        element(encode_int_array, decode_int_array),
      )
  }

  /// Add or replace the converter for `value_type`.
  pub fn register(mut self, value_type: ValueType, converter: Converter) -> Self {
    self.converters.insert(value_type, converter);
    self
  }

  pub fn get(&self, value_type: ValueType) -> Option<Converter> {
    self.converters.get(&value_type).copied()
  }

  pub fn contains(&self, value_type: ValueType) -> bool {
    self.converters.contains_key(&value_type)
  }

  /// Look up the converter for a declared property.
  pub fn resolve(
    &self,
    property: &str,
    value_type: ValueType,
  ) -> Result<Converter> {
    self.get(value_type).ok_or_else(|| Error::Configuration {
      property: property.to_owned(),
      value_type,
    })
  }
}

fn attribute(
  encode: fn(&Value) -> Result<String>,
  decode: fn(&str) -> Decoded,
) -> Converter {
  Converter::Attribute { encode, decode }
}

fn element(
  encode: fn(&str, &Value) -> Result<Element>,
  decode: fn(&Element) -> Decoded,
) -> Converter {
  Converter::Element { encode, decode }
}

// ─── Sanitizing ──────────────────────────────────────────────────────────────

/// Control characters that are not legal in XML 1.0. Tab, newline and
/// carriage return are kept.
pub fn is_forbidden(c: char) -> bool {
  matches!(
    c,
    '\u{0}'..='\u{8}' | '\u{B}' | '\u{C}' | '\u{E}'..='\u{1F}'
  )
}

/// Strip forbidden control characters. Escaping of `&`, `<` and quotes is
/// left to the writer.
pub fn sanitize(s: &str) -> Cow<'_, str> {
  if s.chars().any(is_forbidden) {
    Cow::Owned(s.chars().filter(|c| !is_forbidden(*c)).collect())
  } else {
    Cow::Borrowed(s)
  }
}

// ─── Ticks ───────────────────────────────────────────────────────────────────

/// `None` when `dt` lies outside the range a 64-bit tick count can hold.
pub fn to_ticks(dt: DateTime<Utc>) -> Option<i64> {
  dt.timestamp()
    .checked_mul(TICKS_PER_SECOND)?
    .checked_add(UNIX_EPOCH_TICKS)?
    .checked_add(i64::from(dt.timestamp_subsec_nanos() / 100))
}

pub fn from_ticks(ticks: i64) -> Option<DateTime<Utc>> {
  let since_epoch = ticks.checked_sub(UNIX_EPOCH_TICKS)?;
  let secs = since_epoch.div_euclid(TICKS_PER_SECOND);
  let nanos = u32::try_from(since_epoch.rem_euclid(TICKS_PER_SECOND) * 100).ok()?;
  DateTime::from_timestamp(secs, nanos)
}

// ─── Attribute converters ────────────────────────────────────────────────────

fn mismatch(expected: ValueType, found: &Value) -> Error {
  Error::TypeMismatch {
    expected,
    found: found.value_type(),
  }
}

fn parse<T: FromStr>(raw: &str, wrap: fn(T) -> Value) -> Decoded {
  raw
    .trim()
    .parse()
    .map(wrap)
    .map_err(|_| Malformed(raw.to_owned()))
}

fn encode_string(v: &Value) -> Result<String> {
  match v {
    Value::String(s) => Ok(s.clone()),
    other => Err(mismatch(ValueType::String, other)),
  }
}

fn decode_string(raw: &str) -> Decoded { Ok(Value::String(raw.to_owned())) }

fn encode_int(v: &Value) -> Result<String> {
  match v {
    Value::Int(n) => Ok(n.to_string()),
    other => Err(mismatch(ValueType::Int, other)),
  }
}

fn decode_int(raw: &str) -> Decoded { parse(raw, Value::Int) }

fn encode_uint(v: &Value) -> Result<String> {
  match v {
    Value::UInt(n) => Ok(n.to_string()),
    other => Err(mismatch(ValueType::UInt, other)),
  }
}

fn decode_uint(raw: &str) -> Decoded { parse(raw, Value::UInt) }

fn encode_float(v: &Value) -> Result<String> {
  match v {
    Value::Float(n) => Ok(n.to_string()),
    other => Err(mismatch(ValueType::Float, other)),
  }
}

fn decode_float(raw: &str) -> Decoded { parse(raw, Value::Float) }

fn encode_bool(v: &Value) -> Result<String> {
  match v {
    Value::Bool(b) => Ok(b.to_string()),
    other => Err(mismatch(ValueType::Bool, other)),
  }
}

fn decode_bool(raw: &str) -> Decoded {
  let trimmed = raw.trim();
  if trimmed.eq_ignore_ascii_case("true") {
    Ok(Value::Bool(true))
  } else if trimmed.eq_ignore_ascii_case("false") {
    Ok(Value::Bool(false))
  } else {
    Err(Malformed(raw.to_owned()))
  }
}

fn encode_u64(v: &Value) -> Result<String> {
  match v {
    Value::U64(n) => Ok(n.to_string()),
    other => Err(mismatch(ValueType::U64, other)),
  }
}

fn decode_u64(raw: &str) -> Decoded { parse(raw, Value::U64) }

fn encode_i64(v: &Value) -> Result<String> {
  match v {
    Value::I64(n) => Ok(n.to_string()),
    other => Err(mismatch(ValueType::I64, other)),
  }
}

fn decode_i64(raw: &str) -> Decoded { parse(raw, Value::I64) }

fn encode_timestamp(v: &Value) -> Result<String> {
  match v {
    Value::Timestamp(dt) => to_ticks(*dt)
      .map(|ticks| ticks.to_string())
      .ok_or_else(|| Error::OutOfRange(dt.to_rfc3339())),
    other => Err(mismatch(ValueType::Timestamp, other)),
  }
}

fn decode_timestamp(raw: &str) -> Decoded {
  raw
    .trim()
    .parse::<i64>()
    .ok()
    .and_then(from_ticks)
    .map(Value::Timestamp)
    .ok_or_else(|| Malformed(raw.to_owned()))
}

fn encode_contribution_type(v: &Value) -> Result<String> {
  match v {
    Value::ContributionType(t) => Ok(t.id().to_owned()),
    other => Err(mismatch(ValueType::ContributionType, other)),
  }
}

fn decode_contribution_type(raw: &str) -> Decoded {
  ContributionType::from_id(raw.trim())
    .map(Value::ContributionType)
    .ok_or_else(|| Malformed(raw.to_owned()))
}

fn encode_status(v: &Value) -> Result<String> {
  match v {
    Value::Status(s) => Ok(s.id().to_string()),
    other => Err(mismatch(ValueType::Status, other)),
  }
}

fn decode_status(raw: &str) -> Decoded {
  raw
    .trim()
    .parse::<u8>()
    .ok()
    .and_then(Status::from_id)
    .map(Value::Status)
    .ok_or_else(|| Malformed(raw.to_owned()))
}

// ─── Element converters ──────────────────────────────────────────────────────

fn float_attribute(
  element: &Element,
  key: &str,
) -> std::result::Result<f32, Malformed> {
  let raw = element
    .attribute(key)
    .ok_or_else(|| Malformed(format!("<{} {key}=?>", element.name)))?;
  raw.trim().parse().map_err(|_| Malformed(raw.to_owned()))
}

fn encode_vector3(name: &str, v: &Value) -> Result<Element> {
  let Value::Vector3(vec) = v else {
    return Err(mismatch(ValueType::Vector3, v));
  };
  Ok(
    Element::new(name)
      .with_attribute("x", vec.x.to_string())
      .with_attribute("y", vec.y.to_string())
      .with_attribute("z", vec.z.to_string()),
  )
}

fn decode_vector3(element: &Element) -> Decoded {
  Ok(Value::Vector3(Vector3::new(
    float_attribute(element, "x")?,
    float_attribute(element, "y")?,
    float_attribute(element, "z")?,
  )))
}

fn encode_color(name: &str, v: &Value) -> Result<Element> {
  let Value::Color(color) = v else {
    return Err(mismatch(ValueType::Color, v));
  };
  Ok(
    Element::new(name)
      .with_attribute("r", color.r.to_string())
      .with_attribute("g", color.g.to_string())
      .with_attribute("b", color.b.to_string())
      .with_attribute("a", color.a.to_string()),
  )
}

fn decode_color(element: &Element) -> Decoded {
  let channel = |key: &str| {
    float_attribute(element, key).map(|v| recover_channel(&element.name, key, v))
  };
  let r = channel("r")?;
  let g = channel("g")?;
  let b = channel("b")?;
  let a = channel("a")?;
  Ok(Value::Color(Color::new(r, g, b, a)))
}

/// Replace a channel outside `[0, 1]` (or NaN) with a random value in
/// `[0.1, 1.0]`.
fn recover_channel(property: &str, channel: &str, value: f32) -> f32 {
  if (0.0..=1.0).contains(&value) {
    return value;
  }
  let replacement = random_channel();
  tracing::warn!(
    property,
    channel,
    value,
    replacement,
    "colour channel out of range; substituting a random value"
  );
  replacement
}

fn random_channel() -> f32 {
  let unit = OsRng.next_u32() as f32 / u32::MAX as f32;
  0.1 + unit * 0.9
}

fn encode_int_array(name: &str, v: &Value) -> Result<Element> {
  let Value::IntArray(items) = v else {
    return Err(mismatch(ValueType::IntArray, v));
  };
  let mut element = Element::new(name);
  for item in items {
    element.children.push(
      Element::new(ARRAY_ITEM).with_attribute(ARRAY_VALUE, item.to_string()),
    );
  }
  Ok(element)
}

fn decode_int_array(element: &Element) -> Decoded {
  element
    .children_named(ARRAY_ITEM)
    .map(|item| {
      let raw = item
        .attribute(ARRAY_VALUE)
        .ok_or_else(|| Malformed(format!("<{ARRAY_ITEM}> without {ARRAY_VALUE}")))?;
      raw.trim().parse::<i32>().map_err(|_| Malformed(raw.to_owned()))
    })
    .collect::<std::result::Result<Vec<_>, _>>()
    .map(Value::IntArray)
}

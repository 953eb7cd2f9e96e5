//! Static property tables.
//!
//! A [`Descriptor`] lists, in declaration order, every persisted property of
//! a type: its name, its [`ValueType`], an optional default used when the
//! property is missing on load, and a getter/setter pair. A getter returning
//! `None` means the property is not written for that instance.

use crate::{Converter, ConverterRegistry, Error, Result, Value, ValueType};

pub type Getter<T> = fn(&T) -> Option<Value>;
pub type Setter<T> = fn(&mut T, Value) -> Result<()>;

pub struct Property<T> {
  pub name:       &'static str,
  pub value_type: ValueType,
  pub default:    Option<Value>,
  pub get:        Getter<T>,
  pub set:        Setter<T>,
}

pub struct Descriptor<T> {
  type_name:  &'static str,
  properties: Vec<Property<T>>,
}

impl<T> Descriptor<T> {
  /// `type_name` is also the element name instances are written under.
  pub fn new(type_name: &'static str) -> Self {
    Self {
      type_name,
      properties: Vec::new(),
    }
  }

  /// Declare a property with no default. A missing value on load leaves the
  /// field untouched.
  pub fn property(
    mut self,
    name: &'static str,
    value_type: ValueType,
    get: Getter<T>,
    set: Setter<T>,
  ) -> Self {
    self.properties.push(Property {
      name,
      value_type,
      default: None,
      get,
      set,
    });
    self
  }

  /// Declare a property whose missing value loads as `default`.
  pub fn with_default(
    mut self,
    name: &'static str,
    value_type: ValueType,
    default: Value,
    get: Getter<T>,
    set: Setter<T>,
  ) -> Self {
    self.properties.push(Property {
      name,
      value_type,
      default: Some(default),
      get,
      set,
    });
    self
  }

  pub fn type_name(&self) -> &'static str { self.type_name }

  pub fn properties(&self) -> &[Property<T>] { &self.properties }

  pub fn property_named(&self, name: &str) -> Option<&Property<T>> {
    self.properties.iter().find(|p| p.name == name)
  }

  /// Check every property against `registry`.
  pub fn validate(&self, registry: &ConverterRegistry) -> Result<()> {
    self.resolve(registry).map(|_| ())
  }

  /// Pair each property with its converter, failing on the first property
  /// that has no converter or whose default has the wrong type.
  pub(crate) fn resolve<'d>(
    &'d self,
    registry: &ConverterRegistry,
  ) -> Result<Vec<(&'d Property<T>, Converter)>> {
    self
      .properties
      .iter()
      .map(|property| {
        let converter = registry.resolve(property.name, property.value_type)?;
        if let Some(default) = &property.default
          && default.value_type() != property.value_type
        {
          return Err(Error::DefaultTypeMismatch {
            property: property.name.to_owned(),
            expected: property.value_type,
            found:    default.value_type(),
          });
        }
        Ok((property, converter))
      })
      .collect()
  }
}

/// Setter helper: convert `value` and store it in `slot`.
pub fn assign<V>(slot: &mut V, value: Value) -> Result<()>
where
  V: TryFrom<Value, Error = Error>,
{
  *slot = V::try_from(value)?;
  Ok(())
}

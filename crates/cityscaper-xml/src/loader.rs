//! Fills one object from one XML element.

use tracing::error;

use crate::{
  Converter, ConverterRegistry, Descriptor, Element, Error, Malformed,
  Property, Result,
};

pub struct InstanceLoader<'d, T> {
  type_name: &'static str,
  table:     Vec<(&'d Property<T>, Converter)>,
}

impl<'d, T> InstanceLoader<'d, T> {
  pub fn new(
    descriptor: &'d Descriptor<T>,
    registry: &ConverterRegistry,
  ) -> Result<Self> {
    Ok(Self {
      type_name: descriptor.type_name(),
      table:     descriptor.resolve(registry)?,
    })
  }

  pub fn type_name(&self) -> &'static str { self.type_name }

  /// Populate `instance` from `element`. Missing properties take their
  /// declared default, or are left alone when there is none. Unknown
  /// attributes and children are ignored.
  pub fn load(&self, element: &Element, instance: &mut T) -> Result<()> {
    if element.name != self.type_name {
      return Err(Error::MalformedDocument(format!(
        "expected <{}>, found <{}>",
        self.type_name, element.name
      )));
    }

    for (property, converter) in &self.table {
      let decoded = match *converter {
        Converter::Attribute { decode, .. } => {
          element.attribute(property.name).map(decode)
        }
        Converter::Element { decode, .. } => {
          element.first_child(property.name).map(decode)
        }
      };

      let value = match decoded {
        Some(Ok(value)) => value,
        Some(Err(Malformed(raw))) => {
          error!(
            element = self.type_name,
            property = property.name,
            value = %raw,
            "malformed property value"
          );
          return Err(Error::MalformedValue {
            property: property.name.to_owned(),
            value:    raw,
          });
        }
        None => match &property.default {
          Some(default) => default.clone(),
          None => continue,
        },
      };

      (property.set)(instance, value)?;
    }
    Ok(())
  }
}

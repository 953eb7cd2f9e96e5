//! Writes one object as one XML element.

use std::io::Write;

use quick_xml::{
  Writer,
  events::{BytesEnd, Event},
};
use tracing::error;

use crate::{
  Converter, ConverterRegistry, Descriptor, Element, Error, Property, Result,
  element::{emit, start_tag},
};

/// Streams instances of `T` to a quick-xml [`Writer`].
///
/// The call order is `start`, `write_properties`, then any nested elements,
/// then `end`. The start tag is held back until `write_properties` has
/// collected every attribute, so attribute-shaped properties always land on
/// the start tag and element-shaped ones follow as children, whatever their
/// declaration order. One writer may be reused for nested instances of the
/// same type.
pub struct InstanceWriter<'d, T> {
  type_name: &'static str,
  table:     Vec<(&'d Property<T>, Converter)>,
  started:   bool,
  open:      usize,
  deferred:  Vec<Element>,
}

impl<'d, T> InstanceWriter<'d, T> {
  pub fn new(
    descriptor: &'d Descriptor<T>,
    registry: &ConverterRegistry,
  ) -> Result<Self> {
    Ok(Self {
      type_name: descriptor.type_name(),
      table:     descriptor.resolve(registry)?,
      started:   false,
      open:      0,
      deferred:  Vec::new(),
    })
  }

  /// Begin a new element. Nothing is emitted until `write_properties`.
  pub fn start<W: Write>(&mut self, _writer: &mut Writer<W>) -> Result<()> {
    if self.started {
      return Err(Error::WriterOrder("start called twice"));
    }
    self.deferred.clear();
    self.started = true;
    Ok(())
  }

  /// Emit the start tag with every attribute-shaped property, then every
  /// element-shaped property as a child.
  pub fn write_properties<W: Write>(
    &mut self,
    writer: &mut Writer<W>,
    instance: &T,
  ) -> Result<()> {
    if !self.started {
      return Err(Error::WriterOrder("write_properties before start"));
    }

    // Failed or not, the instance is finished with; the next one starts clean.
    let result = self.emit_properties(writer, instance);
    self.started = false;
    self.deferred.clear();
    result
  }

  fn emit_properties<W: Write>(
    &mut self,
    writer: &mut Writer<W>,
    instance: &T,
  ) -> Result<()> {
    let mut attributes = Vec::new();
    for (property, converter) in &self.table {
      let Some(value) = (property.get)(instance) else {
        continue;
      };
      let encoded = match *converter {
        Converter::Attribute { encode, .. } => {
          encode(&value).map(|s| attributes.push((property.name.to_owned(), s)))
        }
        Converter::Element { encode, .. } => {
          encode(property.name, &value).map(|e| self.deferred.push(e))
        }
      };
      if let Err(e) = encoded {
        error!(
          element = self.type_name,
          property = property.name,
          error = %e,
          "failed to write property"
        );
        return Err(e);
      }
    }

    emit(writer, Event::Start(start_tag(self.type_name, &attributes)))?;
    self.open += 1;
    for element in self.deferred.drain(..) {
      element.write(writer)?;
    }
    Ok(())
  }

  /// Close the most recently opened element.
  pub fn end<W: Write>(&mut self, writer: &mut Writer<W>) -> Result<()> {
    if self.started {
      return Err(Error::WriterOrder("end before write_properties"));
    }
    if self.open == 0 {
      return Err(Error::WriterOrder("end without an open element"));
    }
    emit(writer, Event::End(BytesEnd::new(self.type_name)))?;
    self.open -= 1;
    Ok(())
  }

  /// `start`, `write_properties` and `end` in one call.
  pub fn write<W: Write>(
    &mut self,
    writer: &mut Writer<W>,
    instance: &T,
  ) -> Result<()> {
    self.start(writer)?;
    self.write_properties(writer, instance)?;
    self.end(writer)
  }
}

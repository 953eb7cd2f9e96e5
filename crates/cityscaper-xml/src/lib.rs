//! Descriptor-driven XML persistence for Cityscaper objects.
//!
//! Each persisted type declares a static table of properties
//! ([`Descriptor`]); each property names a [`ValueType`], and a
//! [`ConverterRegistry`] maps every value type to an attribute- or
//! element-shaped converter. [`InstanceWriter`] and [`InstanceLoader`] walk
//! the table to move one object to and from one XML element.
//!
//! Tables are resolved against the registry when a writer or loader is
//! built, so a property without a converter fails at startup rather than in
//! the middle of a save.

pub mod convert;
pub mod descriptor;
pub mod element;
pub mod error;
pub mod loader;
pub mod schema;
pub mod value;
pub mod writer;

pub use convert::{Converter, ConverterRegistry, Malformed, sanitize};
pub use descriptor::{Descriptor, Property};
pub use element::Element;
pub use error::{Error, Result};
pub use loader::InstanceLoader;
pub use schema::Schema;
pub use value::{Value, ValueType};
pub use writer::InstanceWriter;

#[cfg(test)]
mod tests;

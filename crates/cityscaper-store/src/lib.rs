//! File-backed persistence for a Cityscaper session.
//!
//! [`document`] turns a whole [`Session`](cityscaper_core::Session) into one
//! XML document and back. [`XmlStore`] owns the save file and the
//! load/save lifecycle around it.

pub mod document;
pub mod error;
mod store;

pub use document::{
  ContainerFailure, LoadReport, load_document, max_depth, write_document,
};
pub use error::{Error, Result};
pub use store::{INDENT_DEPTH_LIMIT, StoreState, XmlStore};

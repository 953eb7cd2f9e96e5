//! Error type for `cityscaper-store`.

use thiserror::Error;

use crate::StoreState;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] cityscaper_core::Error),

  #[error("xml error: {0}")]
  Xml(#[from] cityscaper_xml::Error),

  #[error("i/o error: {0}")]
  Io(#[from] std::io::Error),

  /// The save file exists but cannot be understood.
  #[error("corrupt save: {0}")]
  CorruptSave(String),

  #[error("no container registered with key {0:?}")]
  UnknownContainer(String),

  #[error("cannot {operation} while the store is {state}")]
  InvalidState {
    operation: &'static str,
    state:     StoreState,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

//! Error types for `cityscaper-core`.

use thiserror::Error;

/// A structural rule of the comment tree that a caller tried to break.
///
/// These indicate programmer error rather than bad data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
  #[error("{child} is already a child of {parent}")]
  DuplicateChild { parent: String, child: String },

  #[error("{child} declares parent {declared:?} but was appended under {target}")]
  WrongParent {
    child:    String,
    declared: Option<String>,
    target:   String,
  },

  #[error("contribution {0} cannot be nested under another node")]
  ContributionAsChild(String),

  #[error("comment {0} cannot be a root")]
  CommentAsRoot(String),

  #[error("root {0} is already attached to a container")]
  AlreadyAttached(String),
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("invariant violation: {0}")]
  InvariantViolation(#[from] Violation),

  #[error("node not found: {0}")]
  UnknownNode(String),

  #[error("unknown container: {0}")]
  UnknownContainer(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

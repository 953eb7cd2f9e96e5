//! Core types for the Cityscaper contribution tree.
//!
//! Contributions are user submissions attached to scene entities; comments
//! reply to contributions or to other comments, nested to any depth. This
//! crate holds the tree, the per-entity containers, and the identity/clock
//! seams. It knows nothing about XML or the filesystem.

pub mod error;
pub mod ids;
pub mod model;
pub mod session;
pub mod tree;

pub use error::{Error, Result, Violation};
pub use ids::{Clock, CounterIdGenerator, FixedClock, IdGenerator, SystemClock};
pub use model::{Color, ContributionType, Status, Vector3};
pub use session::{
  Checkpoint, ContributionSet, NewComment, NewContribution, Session, SetId,
};
pub use tree::{
  CommentData, ContributionData, DATE_FORMAT, Forest, Node, NodeId, NodeKind,
  PreOrder,
};

//! The comment tree: contributions at the roots, comments beneath them.
//!
//! Nodes live in an arena ([`Forest`]) and refer to one another through
//! [`NodeId`] handles. A parent link is a plain handle, never ownership; the
//! arena owns every node until the session ends. Nodes are never removed
//! individually.

use std::{
  fmt,
  ops::{Index, IndexMut},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result, Violation,
  model::{ContributionType, Status},
};

/// Display format for [`Node::date_created`].
pub const DATE_FORMAT: &str = "%B %d %Y %H:%M:%S";

// ─── Handles ─────────────────────────────────────────────────────────────────

/// A stable handle to a node in a [`Forest`].
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
)]
pub struct NodeId(usize);

impl NodeId {
  pub fn index(self) -> usize { self.0 }
}

impl fmt::Display for NodeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

// ─── Node payloads ───────────────────────────────────────────────────────────

/// Fields only a contribution has.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContributionData {
  pub belong_to_project: String,
  pub author:            String,
  pub status:            Status,
  /// World-position-derived coordinates.
  pub latitude:          f32,
  pub longitude:         f32,

  // Session-only metadata; not part of the persisted schema.
  pub link:              String,
  pub category:          String,
  pub sub_category:      String,
  pub keyword_suggested: String,
  pub keyword_picked:    String,
  pub sentiment:         String,
  pub custom_attribute:  String,
  pub dipas_located:     bool,
}

/// Fields only a comment has.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommentData {
  /// Id of the contribution at the root of this comment's tree.
  pub comment_on_contribution: String,
  /// Id of the parent comment, empty when replying to the contribution.
  pub comment_on_comment:      String,

  // Session-only.
  pub latitude:                f32,
  pub longitude:               f32,
  pub attachment:              String,
  pub custom_attribute:        String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
  Contribution(ContributionData),
  Comment(CommentData),
}

// ─── Node ────────────────────────────────────────────────────────────────────

/// The data of one tree node. Structure (parent and children) is held by the
/// [`Forest`], not by the node.
///
/// `id` and `timestamp` are assigned at creation and never change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
  pub id:                String,
  pub timestamp:         DateTime<Utc>,
  pub title:             String,
  pub content:           String,
  pub contribution_type: ContributionType,
  pub voting_pro:        u32,
  pub voting_contra:     u32,
  pub kind:              NodeKind,
}

impl Node {
  pub fn contribution(
    id: impl Into<String>,
    timestamp: DateTime<Utc>,
    belong_to_project: impl Into<String>,
    author: impl Into<String>,
  ) -> Self {
    Self::with_kind(
      id.into(),
      timestamp,
      NodeKind::Contribution(ContributionData {
        belong_to_project: belong_to_project.into(),
        author: author.into(),
        ..ContributionData::default()
      }),
    )
  }

  pub fn comment(id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
    Self::with_kind(
      id.into(),
      timestamp,
      NodeKind::Comment(CommentData::default()),
    )
  }

  fn with_kind(id: String, timestamp: DateTime<Utc>, kind: NodeKind) -> Self {
    Self {
      id,
      timestamp,
      title: String::new(),
      content: String::new(),
      contribution_type: ContributionType::default(),
      voting_pro: 0,
      voting_contra: 0,
      kind,
    }
  }

  pub fn is_contribution(&self) -> bool {
    matches!(self.kind, NodeKind::Contribution(_))
  }

  pub fn as_contribution(&self) -> Option<&ContributionData> {
    match &self.kind {
      NodeKind::Contribution(c) => Some(c),
      NodeKind::Comment(_) => None,
    }
  }

  pub fn as_contribution_mut(&mut self) -> Option<&mut ContributionData> {
    match &mut self.kind {
      NodeKind::Contribution(c) => Some(c),
      NodeKind::Comment(_) => None,
    }
  }

  pub fn as_comment(&self) -> Option<&CommentData> {
    match &self.kind {
      NodeKind::Comment(c) => Some(c),
      NodeKind::Contribution(_) => None,
    }
  }

  pub fn as_comment_mut(&mut self) -> Option<&mut CommentData> {
    match &mut self.kind {
      NodeKind::Comment(c) => Some(c),
      NodeKind::Contribution(_) => None,
    }
  }

  /// The creation time formatted for display. Derived, never persisted.
  pub fn date_created(&self) -> String {
    self.timestamp.format(DATE_FORMAT).to_string()
  }

  pub fn up_vote(&mut self) -> u32 {
    self.voting_pro = self.voting_pro.saturating_add(1);
    self.voting_pro
  }

  pub fn down_vote(&mut self) -> u32 {
    self.voting_contra = self.voting_contra.saturating_add(1);
    self.voting_contra
  }
}

// ─── Forest ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Slot {
  node:     Node,
  parent:   Option<NodeId>,
  children: Vec<NodeId>,
}

/// Arena holding every node of every tree in a session.
///
/// Indexing with a [`NodeId`] from a different forest panics.
#[derive(Debug, Clone, Default)]
pub struct Forest {
  slots: Vec<Slot>,
}

impl Forest {
  pub fn new() -> Self { Self::default() }

  pub fn len(&self) -> usize { self.slots.len() }

  pub fn is_empty(&self) -> bool { self.slots.is_empty() }

  pub fn get(&self, id: NodeId) -> Option<&Node> {
    self.slots.get(id.0).map(|s| &s.node)
  }

  pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
    self.slots.get_mut(id.0).map(|s| &mut s.node)
  }

  /// Add a parentless contribution.
  pub fn create_root(&mut self, node: Node) -> Result<NodeId> {
    if !node.is_contribution() {
      return Err(Violation::CommentAsRoot(node.id).into());
    }
    Ok(self.push(node, None))
  }

  /// Add a comment that records `parent` as its parent.
  ///
  /// The new node is not yet among `parent`'s children; call
  /// [`Forest::append_child`] to attach it.
  pub fn create_child(&mut self, parent: NodeId, node: Node) -> Result<NodeId> {
    self.check(parent)?;
    if node.is_contribution() {
      return Err(Violation::ContributionAsChild(node.id).into());
    }
    Ok(self.push(node, Some(parent)))
  }

  /// Append `child` to `parent`'s children.
  ///
  /// `child` must already declare `parent` as its parent and must not be
  /// present among its children yet.
  pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
    self.check(parent)?;
    self.check(child)?;

    let child_slot = &self.slots[child.0];
    if child_slot.node.is_contribution() {
      return Err(Violation::ContributionAsChild(child_slot.node.id.clone()).into());
    }
    if child_slot.parent != Some(parent) {
      return Err(
        Violation::WrongParent {
          child:    child_slot.node.id.clone(),
          declared: child_slot.parent.map(|p| self.slots[p.0].node.id.clone()),
          target:   self.slots[parent.0].node.id.clone(),
        }
        .into(),
      );
    }
    if self.slots[parent.0].children.contains(&child) {
      return Err(
        Violation::DuplicateChild {
          parent: self.slots[parent.0].node.id.clone(),
          child:  self.slots[child.0].node.id.clone(),
        }
        .into(),
      );
    }

    self.slots[parent.0].children.push(child);
    Ok(())
  }

  pub fn parent(&self, id: NodeId) -> Option<NodeId> { self.slots[id.0].parent }

  /// Direct children in insertion order.
  pub fn children(&self, id: NodeId) -> &[NodeId] { &self.slots[id.0].children }

  /// Number of direct replies; shown as a contribution's comment count.
  pub fn comments_number(&self, id: NodeId) -> usize {
    self.slots[id.0].children.len()
  }

  /// Walk parent links up to the root.
  pub fn root_of(&self, id: NodeId) -> NodeId {
    let mut current = id;
    while let Some(parent) = self.slots[current.0].parent {
      current = parent;
    }
    current
  }

  /// Roots have depth 1; each level below adds one.
  pub fn depth_of(&self, id: NodeId) -> usize {
    let mut depth = 1;
    let mut current = id;
    while let Some(parent) = self.slots[current.0].parent {
      depth += 1;
      current = parent;
    }
    depth
  }

  /// Size of the subtree below `id`, not counting `id` itself.
  pub fn descendant_count(&self, id: NodeId) -> usize {
    self.pre_order(id).count() - 1
  }

  /// Depth-first, pre-order walk of the subtree rooted at `id`, starting
  /// with `id`.
  pub fn pre_order(&self, id: NodeId) -> PreOrder<'_> {
    PreOrder {
      forest: self,
      stack:  vec![id],
    }
  }

  /// Look up a node by its string id. Linear in the number of nodes.
  pub fn find(&self, id: &str) -> Option<NodeId> {
    self.slots.iter().position(|s| s.node.id == id).map(NodeId)
  }

  /// Drop every node created at or after `len`, along with any child links
  /// pointing at them.
  pub(crate) fn truncate(&mut self, len: usize) {
    self.slots.truncate(len);
    for slot in &mut self.slots {
      slot.children.retain(|c| c.0 < len);
    }
  }

  fn push(&mut self, node: Node, parent: Option<NodeId>) -> NodeId {
    let id = NodeId(self.slots.len());
    self.slots.push(Slot {
      node,
      parent,
      children: Vec::new(),
    });
    id
  }

  fn check(&self, id: NodeId) -> Result<()> {
    if id.0 < self.slots.len() {
      Ok(())
    } else {
      Err(Error::UnknownNode(id.to_string()))
    }
  }
}

impl Index<NodeId> for Forest {
  type Output = Node;

  fn index(&self, id: NodeId) -> &Node { &self.slots[id.0].node }
}

impl IndexMut<NodeId> for Forest {
  fn index_mut(&mut self, id: NodeId) -> &mut Node { &mut self.slots[id.0].node }
}

// ─── Traversal ───────────────────────────────────────────────────────────────

/// Iterator returned by [`Forest::pre_order`].
pub struct PreOrder<'a> {
  forest: &'a Forest,
  stack:  Vec<NodeId>,
}

impl Iterator for PreOrder<'_> {
  type Item = NodeId;

  fn next(&mut self) -> Option<NodeId> {
    let id = self.stack.pop()?;
    self
      .stack
      .extend(self.forest.children(id).iter().rev().copied());
    Some(id)
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

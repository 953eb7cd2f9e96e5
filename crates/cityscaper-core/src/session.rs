//! The in-memory session: every tree, grouped by the scene entity that owns
//! it.

use chrono::{DateTime, Utc};

use crate::{
  Error, Result, Violation,
  ids::{Clock, CounterIdGenerator, IdGenerator, SystemClock},
  model::ContributionType,
  tree::{Forest, Node, NodeId},
};

// ─── Containers ──────────────────────────────────────────────────────────────

/// Handle to a [`ContributionSet`] registered in a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SetId(usize);

/// The contributions attached to one scene entity, identified by that
/// entity's external key.
#[derive(Debug, Clone)]
pub struct ContributionSet {
  key:   String,
  roots: Vec<NodeId>,
}

impl ContributionSet {
  pub fn key(&self) -> &str { &self.key }

  /// Root contributions in the order they were added.
  pub fn roots(&self) -> &[NodeId] { &self.roots }

  pub fn len(&self) -> usize { self.roots.len() }

  pub fn is_empty(&self) -> bool { self.roots.is_empty() }
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Input to [`Session::add_root_contribution`].
#[derive(Debug, Clone, Default)]
pub struct NewContribution {
  pub belong_to_project: String,
  pub author:            String,
  pub title:             String,
  pub content:           String,
  pub contribution_type: ContributionType,
  pub latitude:          f32,
  pub longitude:         f32,
}

/// Input to [`Session::add_comment`].
#[derive(Debug, Clone, Default)]
pub struct NewComment {
  pub title:             String,
  pub content:           String,
  pub contribution_type: ContributionType,
}

/// A restore point taken with [`Session::checkpoint`].
#[derive(Debug, Clone)]
pub struct Checkpoint {
  nodes: usize,
  roots: Vec<usize>,
}

// ─── Session ─────────────────────────────────────────────────────────────────

/// Owns the node arena, the registered containers, and the services used to
/// stamp new nodes.
///
/// Single-threaded: every mutation, save and load runs on the caller's
/// thread.
pub struct Session {
  forest: Forest,
  sets:   Vec<ContributionSet>,
  ids:    Box<dyn IdGenerator>,
  clock:  Box<dyn Clock>,
}

impl Default for Session {
  fn default() -> Self {
    Self::new(CounterIdGenerator::default(), SystemClock)
  }
}

impl Session {
  pub fn new(
    ids: impl IdGenerator + 'static,
    clock: impl Clock + 'static,
  ) -> Self {
    Self {
      forest: Forest::new(),
      sets:   Vec::new(),
      ids:    Box::new(ids),
      clock:  Box::new(clock),
    }
  }

  pub fn forest(&self) -> &Forest { &self.forest }

  pub fn forest_mut(&mut self) -> &mut Forest { &mut self.forest }

  pub fn now(&self) -> DateTime<Utc> { self.clock.now() }

  // ── Containers ──────────────────────────────────────────────────────────

  /// Register the container for a scene entity. Registering a key twice
  /// returns the existing container.
  pub fn register_container(&mut self, key: impl Into<String>) -> SetId {
    let key = key.into();
    if let Some(existing) = self.find_container_by_key(&key) {
      return existing;
    }
    self.sets.push(ContributionSet {
      key,
      roots: Vec::new(),
    });
    SetId(self.sets.len() - 1)
  }

  pub fn find_container_by_key(&self, key: &str) -> Option<SetId> {
    self.sets.iter().position(|s| s.key == key).map(SetId)
  }

  /// Every registered container, in registration order.
  pub fn sets(&self) -> &[ContributionSet] { &self.sets }

  pub fn set(&self, id: SetId) -> Result<&ContributionSet> {
    self
      .sets
      .get(id.0)
      .ok_or_else(|| Error::UnknownContainer(format!("#{}", id.0)))
  }

  /// The container a root contribution is attached to, if any.
  pub fn container_of(&self, root: NodeId) -> Option<SetId> {
    self
      .sets
      .iter()
      .position(|s| s.roots.contains(&root))
      .map(SetId)
  }

  // ── Tree mutation ───────────────────────────────────────────────────────

  /// Create a contribution with a fresh id and timestamp and attach it to
  /// `set`.
  pub fn add_root_contribution(
    &mut self,
    set: SetId,
    input: NewContribution,
  ) -> Result<NodeId> {
    self.set(set)?;

    let mut node = Node::contribution(
      self.ids.generate(),
      self.clock.now(),
      input.belong_to_project,
      input.author,
    );
    node.title = input.title;
    node.content = input.content;
    node.contribution_type = input.contribution_type;
    if let Some(data) = node.as_contribution_mut() {
      data.latitude = input.latitude;
      data.longitude = input.longitude;
    }

    let root = self.forest.create_root(node)?;
    self.attach_root(set, root)?;
    Ok(root)
  }

  /// Reply to `parent`, which may be a contribution or another comment.
  pub fn add_comment(
    &mut self,
    parent: NodeId,
    input: NewComment,
  ) -> Result<NodeId> {
    let parent_node = self
      .forest
      .get(parent)
      .ok_or_else(|| Error::UnknownNode(parent.to_string()))?;
    let on_comment = if parent_node.is_contribution() {
      String::new()
    } else {
      parent_node.id.clone()
    };
    let on_contribution = self.forest[self.forest.root_of(parent)].id.clone();

    let mut node = Node::comment(self.ids.generate(), self.clock.now());
    node.title = input.title;
    node.content = input.content;
    node.contribution_type = input.contribution_type;
    if let Some(data) = node.as_comment_mut() {
      data.comment_on_contribution = on_contribution;
      data.comment_on_comment = on_comment;
    }

    let child = self.forest.create_child(parent, node)?;
    self.forest.append_child(parent, child)?;
    Ok(child)
  }

  /// Register an existing root contribution (e.g. one rebuilt from a save)
  /// with a container.
  pub fn attach_root(&mut self, set: SetId, root: NodeId) -> Result<()> {
    let node = self
      .forest
      .get(root)
      .ok_or_else(|| Error::UnknownNode(root.to_string()))?;
    if !node.is_contribution() || self.forest.parent(root).is_some() {
      return Err(Violation::CommentAsRoot(node.id.clone()).into());
    }
    if self.container_of(root).is_some() {
      return Err(Violation::AlreadyAttached(node.id.clone()).into());
    }
    let target = self
      .sets
      .get_mut(set.0)
      .ok_or_else(|| Error::UnknownContainer(format!("#{}", set.0)))?;
    target.roots.push(root);
    Ok(())
  }

  pub fn find_node(&self, id: &str) -> Option<NodeId> { self.forest.find(id) }

  pub fn up_vote(&mut self, node: NodeId) -> Result<u32> {
    self
      .forest
      .get_mut(node)
      .map(Node::up_vote)
      .ok_or_else(|| Error::UnknownNode(node.to_string()))
  }

  pub fn down_vote(&mut self, node: NodeId) -> Result<u32> {
    self
      .forest
      .get_mut(node)
      .map(Node::down_vote)
      .ok_or_else(|| Error::UnknownNode(node.to_string()))
  }

  /// Tell the id generator about an id reconstructed from outside.
  pub fn observe_id(&mut self, id: &str) { self.ids.observe(id); }

  // ── Checkpoints ─────────────────────────────────────────────────────────

  pub fn checkpoint(&self) -> Checkpoint {
    Checkpoint {
      nodes: self.forest.len(),
      roots: self.sets.iter().map(|s| s.roots.len()).collect(),
    }
  }

  /// Discard every node, root attachment and container created since `cp`.
  ///
  /// Handles obtained after the checkpoint become invalid.
  pub fn rollback(&mut self, cp: Checkpoint) {
    self.forest.truncate(cp.nodes);
    self.sets.truncate(cp.roots.len());
    for (set, len) in self.sets.iter_mut().zip(cp.roots) {
      set.roots.truncate(len);
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;
  use crate::ids::FixedClock;

  fn session() -> Session {
    Session::new(
      CounterIdGenerator::default(),
      FixedClock(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()),
    )
  }

  fn contribution(title: &str) -> NewContribution {
    NewContribution {
      belong_to_project: "harbour".into(),
      author: "ana".into(),
      title: title.into(),
      content: "Somewhere to sit".into(),
      ..NewContribution::default()
    }
  }

  fn reply(title: &str) -> NewComment {
    NewComment {
      title: title.into(),
      content: "Good idea".into(),
      contribution_type: ContributionType::Opinion,
    }
  }

  #[test]
  fn register_container_is_idempotent() {
    let mut s = session();
    let a = s.register_container("fountain");
    let b = s.register_container("fountain");
    assert_eq!(a, b);
    assert_eq!(s.sets().len(), 1);
    assert_eq!(s.find_container_by_key("fountain"), Some(a));
    assert_eq!(s.find_container_by_key("bench"), None);
  }

  #[test]
  fn add_root_contribution_stamps_id_and_time() {
    let mut s = session();
    let set = s.register_container("fountain");
    let c = s.add_root_contribution(set, contribution("Add a bench")).unwrap();

    let node = &s.forest()[c];
    assert_eq!(node.id, "1");
    assert_eq!(node.timestamp, s.now());
    assert_eq!(node.title, "Add a bench");
    assert_eq!(node.as_contribution().unwrap().author, "ana");
    assert_eq!(s.set(set).unwrap().roots(), &[c]);
    assert_eq!(s.forest().depth_of(c), 1);
  }

  #[test]
  fn comments_record_back_references() {
    let mut s = session();
    let set = s.register_container("fountain");
    let c1 = s.add_root_contribution(set, contribution("Add a bench")).unwrap();
    let m1 = s.add_comment(c1, reply("Yes")).unwrap();
    let m2 = s.add_comment(m1, reply("Agreed")).unwrap();

    let m1_data = s.forest()[m1].as_comment().unwrap();
    assert_eq!(m1_data.comment_on_contribution, "1");
    assert_eq!(m1_data.comment_on_comment, "");

    let m2_data = s.forest()[m2].as_comment().unwrap();
    assert_eq!(m2_data.comment_on_contribution, "1");
    assert_eq!(m2_data.comment_on_comment, "2");

    assert_eq!(s.forest().depth_of(m2), 3);
    assert_eq!(s.forest().descendant_count(c1), 2);
  }

  #[test]
  fn attach_root_rejects_comments_and_double_attachment() {
    let mut s = session();
    let set = s.register_container("fountain");
    let c1 = s.add_root_contribution(set, contribution("Add a bench")).unwrap();
    let m1 = s.add_comment(c1, reply("Yes")).unwrap();

    assert!(matches!(
      s.attach_root(set, c1),
      Err(Error::InvariantViolation(Violation::AlreadyAttached(_)))
    ));
    assert!(matches!(
      s.attach_root(set, m1),
      Err(Error::InvariantViolation(Violation::CommentAsRoot(_)))
    ));
  }

  #[test]
  fn votes_go_through_session() {
    let mut s = session();
    let set = s.register_container("fountain");
    let c1 = s.add_root_contribution(set, contribution("Add a bench")).unwrap();
    s.up_vote(c1).unwrap();
    s.up_vote(c1).unwrap();
    assert_eq!(s.down_vote(c1).unwrap(), 1);
    assert_eq!(s.forest()[c1].voting_pro, 2);
  }

  #[test]
  fn rollback_discards_everything_after_checkpoint() {
    let mut s = session();
    let set = s.register_container("fountain");
    let c1 = s.add_root_contribution(set, contribution("Keep")).unwrap();

    let cp = s.checkpoint();
    let c2 = s.add_root_contribution(set, contribution("Drop")).unwrap();
    s.add_comment(c2, reply("Gone")).unwrap();
    s.add_comment(c1, reply("Gone too")).unwrap();
    s.register_container("late");
    s.rollback(cp);

    assert_eq!(s.forest().len(), 1);
    assert_eq!(s.set(set).unwrap().roots(), &[c1]);
    assert!(s.forest().children(c1).is_empty());
    assert_eq!(s.sets().len(), 1);
  }
}

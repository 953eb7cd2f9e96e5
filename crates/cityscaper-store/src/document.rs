//! Whole-session documents.
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <Root Timestamp="March 14 2019 15:09:26">
//!   <ContributionSet id="harbour-bench">
//!     <Contribution Id="1" ...>
//!       <Comment Id="2" CommentOnContribution="1" CommentOnComment="" ...>
//!         <Comment Id="3" CommentOnContribution="1" CommentOnComment="2" .../>
//!       </Comment>
//!     </Contribution>
//!   </ContributionSet>
//! </Root>
//! ```
//!
//! Tree structure comes from element nesting alone. The back-reference
//! attributes on comments are persisted for readers of the file and checked
//! on load, but a mismatch is only logged.

use std::io::Write;

use cityscaper_core::{DATE_FORMAT, Forest, Node, NodeId, Session, SetId};
use cityscaper_xml::{
  Element, InstanceLoader, InstanceWriter, Schema,
  element::start_tag,
  schema::{COMMENT, CONTRIBUTION},
};
use quick_xml::{
  Writer,
  events::{BytesDecl, BytesEnd, Event},
};
use tracing::{debug, info, warn};

use crate::{Error, Result};

pub const ROOT: &str = "Root";
pub const ROOT_TIMESTAMP: &str = "Timestamp";
pub const CONTRIBUTION_SET: &str = "ContributionSet";
pub const SET_KEY: &str = "id";

fn emit<W: Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<()> {
  writer
    .write_event(event)
    .map_err(|e| cityscaper_xml::Error::Xml(e.to_string()))?;
  Ok(())
}

// ─── Writing ─────────────────────────────────────────────────────────────────

/// Write every container of `session`, each root followed by its comments
/// in pre-order.
pub fn write_document<W: Write>(
  writer: &mut Writer<W>,
  session: &Session,
  schema: &Schema,
) -> Result<()> {
  let mut contributions = schema.contribution_writer()?;
  let mut comments = schema.comment_writer()?;

  emit(writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

  let stamp = session.now().format(DATE_FORMAT).to_string();
  let root_attributes = [(ROOT_TIMESTAMP.to_owned(), stamp)];
  emit(writer, Event::Start(start_tag(ROOT, &root_attributes)))?;

  for set in session.sets() {
    let set_attributes = [(SET_KEY.to_owned(), set.key().to_owned())];
    emit(writer, Event::Start(start_tag(CONTRIBUTION_SET, &set_attributes)))?;

    for &root in set.roots() {
      write_tree(
        writer,
        session.forest(),
        root,
        &mut contributions,
        &mut comments,
      )?;
    }

    emit(writer, Event::End(BytesEnd::new(CONTRIBUTION_SET)))?;
    debug!(key = set.key(), roots = set.len(), "wrote container");
  }

  emit(writer, Event::End(BytesEnd::new(ROOT)))
}

/// Depth of the deepest node reachable from any container; roots count
/// as 1 and an empty session as 0.
pub fn max_depth(session: &Session) -> usize {
  let forest = session.forest();
  let mut deepest = 0;
  let mut stack: Vec<(NodeId, usize)> = session
    .sets()
    .iter()
    .flat_map(|set| set.roots().iter().map(|&r| (r, 1)))
    .collect();
  while let Some((id, depth)) = stack.pop() {
    deepest = deepest.max(depth);
    stack.extend(forest.children(id).iter().map(|&c| (c, depth + 1)));
  }
  deepest
}

enum Step {
  Open(NodeId),
  Close(NodeId),
}

/// Depth-first without recursion, so comment depth is bounded by memory
/// rather than the call stack.
fn write_tree<'d, W: Write>(
  writer: &mut Writer<W>,
  forest: &Forest,
  root: NodeId,
  contributions: &mut InstanceWriter<'d, Node>,
  comments: &mut InstanceWriter<'d, Node>,
) -> Result<()> {
  let mut stack = vec![Step::Open(root)];
  while let Some(step) = stack.pop() {
    match step {
      Step::Open(id) => {
        let node = &forest[id];
        let instance_writer = if node.is_contribution() {
          &mut *contributions
        } else {
          &mut *comments
        };
        instance_writer.start(writer)?;
        instance_writer.write_properties(writer, node)?;

        stack.push(Step::Close(id));
        stack.extend(forest.children(id).iter().rev().map(|&c| Step::Open(c)));
      }
      Step::Close(id) => {
        if forest[id].is_contribution() {
          contributions.end(writer)?;
        } else {
          comments.end(writer)?;
        }
      }
    }
  }
  Ok(())
}

// ─── Loading ─────────────────────────────────────────────────────────────────

/// A container whose contents were discarded during a load.
#[derive(Debug)]
pub struct ContainerFailure {
  pub key:   String,
  pub error: Error,
}

#[derive(Debug, Default)]
pub struct LoadReport {
  pub containers:    usize,
  pub contributions: usize,
  pub comments:      usize,
  pub failed:        Vec<ContainerFailure>,
}

impl LoadReport {
  pub fn is_clean(&self) -> bool { self.failed.is_empty() }
}

/// Rebuild the trees in `root` into `session`.
///
/// Every container is loaded in isolation: if anything inside it fails, the
/// nodes it created are rolled back, the failure is recorded in the report,
/// and loading continues with the next container. Only a document whose
/// root element is wrong fails as a whole.
pub fn load_document(
  root: &Element,
  session: &mut Session,
  schema: &Schema,
) -> Result<LoadReport> {
  if root.name != ROOT {
    return Err(Error::CorruptSave(format!(
      "expected <{ROOT}>, found <{}>",
      root.name
    )));
  }
  if let Some(stamp) = root.attribute(ROOT_TIMESTAMP) {
    debug!(saved_at = stamp, "loading document");
  }

  let contributions = schema.contribution_loader()?;
  let comments = schema.comment_loader()?;
  let mut report = LoadReport::default();

  for set_element in root.children_named(CONTRIBUTION_SET) {
    let key = set_element.attribute(SET_KEY).unwrap_or_default().to_owned();

    let checkpoint = session.checkpoint();
    match load_set(set_element, &key, session, &contributions, &comments) {
      Ok((roots, replies)) => {
        report.containers += 1;
        report.contributions += roots;
        report.comments += replies;
        debug!(key = %key, roots, replies, "loaded container");
      }
      Err(error) => {
        session.rollback(checkpoint);
        warn!(key = %key, %error, "discarding container");
        report.failed.push(ContainerFailure { key, error });
      }
    }
  }

  info!(
    containers = report.containers,
    contributions = report.contributions,
    comments = report.comments,
    failed = report.failed.len(),
    "load finished"
  );
  Ok(report)
}

/// Returns the number of contributions and comments created.
fn load_set(
  element: &Element,
  key: &str,
  session: &mut Session,
  contributions: &InstanceLoader<'_, Node>,
  comments: &InstanceLoader<'_, Node>,
) -> Result<(usize, usize)> {
  if key.is_empty() {
    return Err(Error::CorruptSave(format!(
      "<{CONTRIBUTION_SET}> without {SET_KEY}"
    )));
  }
  let set = session
    .find_container_by_key(key)
    .ok_or_else(|| Error::UnknownContainer(key.to_owned()))?;

  let mut roots = 0;
  let mut replies = 0;
  for root_element in element.children_named(CONTRIBUTION) {
    let root = load_root(root_element, set, session, contributions)?;
    replies += load_comments(root_element, root, session, comments)?;
    roots += 1;
  }
  Ok((roots, replies))
}

fn load_root(
  element: &Element,
  set: SetId,
  session: &mut Session,
  loader: &InstanceLoader<'_, Node>,
) -> Result<NodeId> {
  let mut node = Node::contribution("", Default::default(), "", "");
  loader.load(element, &mut node)?;
  require_id(&node)?;
  session.observe_id(&node.id);

  let root = session.forest_mut().create_root(node)?;
  session.attach_root(set, root)?;
  Ok(root)
}

/// Rebuild every comment beneath `root_element`, returning how many were
/// created.
fn load_comments(
  root_element: &Element,
  root: NodeId,
  session: &mut Session,
  loader: &InstanceLoader<'_, Node>,
) -> Result<usize> {
  let root_id = session.forest()[root].id.clone();
  let mut created = 0;
  let mut pending = vec![(root_element, root)];

  while let Some((parent_element, parent)) = pending.pop() {
    for element in parent_element.children_named(COMMENT) {
      let mut node = Node::comment("", Default::default());
      loader.load(element, &mut node)?;
      require_id(&node)?;
      check_back_references(&node, &root_id, session.forest(), parent);
      session.observe_id(&node.id);

      let forest = session.forest_mut();
      let child = forest.create_child(parent, node)?;
      forest.append_child(parent, child)?;
      pending.push((element, child));
      created += 1;
    }
  }
  Ok(created)
}

fn require_id(node: &Node) -> Result<()> {
  if node.id.is_empty() {
    let kind = if node.is_contribution() { CONTRIBUTION } else { COMMENT };
    return Err(Error::CorruptSave(format!("<{kind}> without an id")));
  }
  Ok(())
}

fn check_back_references(
  node: &Node,
  root_id: &str,
  forest: &Forest,
  parent: NodeId,
) {
  let Some(data) = node.as_comment() else {
    return;
  };
  let parent_node = &forest[parent];
  let expected_comment = if parent_node.is_contribution() {
    ""
  } else {
    parent_node.id.as_str()
  };

  if data.comment_on_contribution != root_id
    || data.comment_on_comment != expected_comment
  {
    warn!(
      id = %node.id,
      on_contribution = %data.comment_on_contribution,
      on_comment = %data.comment_on_comment,
      expected_contribution = root_id,
      expected_comment,
      "comment back-references disagree with nesting; keeping nesting"
    );
  }
}

//! Terminal and JSON views of a session.

use std::fmt::Write as _;

use cityscaper_core::{Forest, Node, NodeId, NodeKind, Session};
use serde_json::{Value, json};

/// `1234` → `"1,234"`.
pub fn group_thousands(n: u32) -> String {
  let digits = n.to_string();
  let mut out = String::with_capacity(digits.len() + digits.len() / 3);
  for (i, c) in digits.chars().enumerate() {
    if i > 0 && (digits.len() - i) % 3 == 0 {
      out.push(',');
    }
    out.push(c);
  }
  out
}

fn headline(node: &Node) -> String {
  let mut line = format!(
    "#{} [{}] {:?} (+{} / -{}) {}",
    node.id,
    node.contribution_type,
    node.title,
    group_thousands(node.voting_pro),
    group_thousands(node.voting_contra),
    node.date_created(),
  );
  if let NodeKind::Contribution(data) = &node.kind {
    let _ = write!(line, " by {}, {}", data.author, data.status);
  }
  line
}

/// Every container followed by its trees in pre-order, indented by depth.
pub fn text(session: &Session) -> String {
  let forest = session.forest();
  let mut out = String::new();
  for set in session.sets() {
    let _ = writeln!(out, "{} ({} contributions)", set.key(), set.len());
    for &root in set.roots() {
      for id in forest.pre_order(root) {
        let indent = "  ".repeat(forest.depth_of(id));
        let node = &forest[id];
        let _ = writeln!(out, "{indent}{}", headline(node));
        if !node.content.is_empty() {
          let _ = writeln!(out, "{indent}  {}", node.content);
        }
      }
    }
  }
  out
}

fn tree(forest: &Forest, id: NodeId) -> serde_json::Result<Value> {
  let mut value = serde_json::to_value(&forest[id])?;
  let children = forest
    .children(id)
    .iter()
    .map(|&c| tree(forest, c))
    .collect::<serde_json::Result<Vec<_>>>()?;
  if let Value::Object(map) = &mut value {
    map.insert("children".into(), Value::Array(children));
  }
  Ok(value)
}

/// Containers keyed by their external key, each holding nested trees.
pub fn json(session: &Session) -> serde_json::Result<Value> {
  let forest = session.forest();
  let mut containers = serde_json::Map::new();
  for set in session.sets() {
    let roots = set
      .roots()
      .iter()
      .map(|&r| tree(forest, r))
      .collect::<serde_json::Result<Vec<_>>>()?;
    containers.insert(set.key().to_owned(), Value::Array(roots));
  }
  Ok(json!({ "containers": containers }))
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};
  use cityscaper_core::{
    CounterIdGenerator, FixedClock, NewComment, NewContribution,
  };

  use super::*;

  fn sample() -> Session {
    let clock = FixedClock(Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 0).unwrap());
    let mut s = Session::new(CounterIdGenerator::default(), clock);
    let set = s.register_container("bench");
    let root = s
      .add_root_contribution(set, NewContribution {
        author: "ana".into(),
        title: "Shade".into(),
        content: "Plant a tree".into(),
        ..NewContribution::default()
      })
      .unwrap();
    let reply = s
      .add_comment(root, NewComment {
        title: "Yes".into(),
        ..NewComment::default()
      })
      .unwrap();
    s.add_comment(reply, NewComment::default()).unwrap();
    for _ in 0..1234 {
      s.up_vote(root).unwrap();
    }
    s
  }

  #[test]
  fn thousands_are_grouped() {
    assert_eq!(group_thousands(0), "0");
    assert_eq!(group_thousands(999), "999");
    assert_eq!(group_thousands(1234), "1,234");
    assert_eq!(group_thousands(1_000_000), "1,000,000");
    assert_eq!(group_thousands(u32::MAX), "4,294,967,295");
  }

  #[test]
  fn text_indents_by_depth() {
    let out = text(&sample());
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines[0], "bench (1 contributions)");
    assert!(lines[1].starts_with("  #1 [Suggestion] \"Shade\" (+1,234 / -0)"));
    assert!(lines[1].contains("October 16 2026 09:30:00"));
    assert!(lines[1].ends_with("by ana, Not yet worked on"));
    assert_eq!(lines[2], "    Plant a tree");
    assert!(lines[3].starts_with("    #2 "));
    assert!(lines[4].starts_with("      #3 "));
  }

  #[test]
  fn json_nests_children() {
    let value = json(&sample()).unwrap();
    let root = &value["containers"]["bench"][0];
    assert_eq!(root["id"], "1");
    assert_eq!(root["voting_pro"], 1234);
    assert_eq!(root["children"][0]["id"], "2");
    assert_eq!(root["children"][0]["children"][0]["id"], "3");
  }
}

//! A small owned element tree, plus the quick-xml glue to read and write it.
//!
//! Element-shaped converters produce and consume [`Element`]s, and the
//! document loader parses a whole save file into one before handing
//! subtrees to the instance loaders.

use std::io::Write;

use quick_xml::{
  Reader, Writer,
  events::{BytesEnd, BytesStart, Event},
};

use crate::{Error, Result, convert::sanitize};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
  pub name:       String,
  pub attributes: Vec<(String, String)>,
  pub children:   Vec<Element>,
}

impl Element {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name:       name.into(),
      attributes: Vec::new(),
      children:   Vec::new(),
    }
  }

  pub fn with_attribute(
    mut self,
    key: impl Into<String>,
    value: impl Into<String>,
  ) -> Self {
    self.push_attribute(key, value);
    self
  }

  pub fn with_child(mut self, child: Element) -> Self {
    self.children.push(child);
    self
  }

  pub fn push_attribute(
    &mut self,
    key: impl Into<String>,
    value: impl Into<String>,
  ) {
    self.attributes.push((key.into(), value.into()));
  }

  pub fn attribute(&self, key: &str) -> Option<&str> {
    self
      .attributes
      .iter()
      .find(|(k, _)| k == key)
      .map(|(_, v)| v.as_str())
  }

  pub fn has_attribute(&self, key: &str) -> bool {
    self.attribute(key).is_some()
  }

  pub fn first_child(&self, name: &str) -> Option<&Element> {
    self.children.iter().find(|c| c.name == name)
  }

  pub fn children_named<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Iterator<Item = &'a Element> + 'a {
    self.children.iter().filter(move |c| c.name == name)
  }

  /// Parse a complete document into its root element. Declarations,
  /// comments and text content are skipped.
  pub fn parse(xml: &[u8]) -> Result<Element> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;
    let mut buf = Vec::new();

    loop {
      match reader.read_event_into(&mut buf) {
        Ok(Event::Start(ref e)) => stack.push(element_from(e)?),
        Ok(Event::Empty(ref e)) => {
          let element = element_from(e)?;
          attach(&mut stack, &mut root, element)?;
        }
        Ok(Event::End(_)) => {
          let element = stack.pop().ok_or_else(|| {
            Error::MalformedDocument("unbalanced end tag".into())
          })?;
          attach(&mut stack, &mut root, element)?;
        }
        Ok(Event::Eof) => break,
        Ok(_) => {}
        Err(e) => return Err(Error::Xml(e.to_string())),
      }
      buf.clear();
    }

    if let Some(open) = stack.last() {
      return Err(Error::MalformedDocument(format!(
        "unclosed element <{}>",
        open.name
      )));
    }
    root.ok_or_else(|| {
      Error::MalformedDocument("document has no root element".into())
    })
  }

  /// Write this element and its subtree. Attribute values are sanitized.
  pub fn write<W: Write>(&self, writer: &mut Writer<W>) -> Result<()> {
    let start = start_tag(&self.name, &self.attributes);
    if self.children.is_empty() {
      return emit(writer, Event::Empty(start));
    }
    emit(writer, Event::Start(start))?;
    for child in &self.children {
      child.write(writer)?;
    }
    emit(writer, Event::End(BytesEnd::new(self.name.as_str())))
  }
}

/// Unwinds the subtree with an explicit stack so arbitrarily deep documents
/// are released without recursing.
impl Drop for Element {
  fn drop(&mut self) {
    let mut pending = std::mem::take(&mut self.children);
    while let Some(mut child) = pending.pop() {
      pending.append(&mut child.children);
    }
  }
}

/// A start tag with every attribute value sanitized.
pub fn start_tag<'a>(
  name: &'a str,
  attributes: &[(String, String)],
) -> BytesStart<'a> {
  let mut start = BytesStart::new(name);
  for (key, value) in attributes {
    start.push_attribute((key.as_str(), sanitize(value).as_ref()));
  }
  start
}

pub(crate) fn emit<W: Write>(
  writer: &mut Writer<W>,
  event: Event<'_>,
) -> Result<()> {
  writer
    .write_event(event)
    .map_err(|e| Error::Xml(e.to_string()))
}

fn element_from(e: &BytesStart<'_>) -> Result<Element> {
  let name_buf = e.name();
  let name = std::str::from_utf8(name_buf.as_ref())
    .map_err(|err| Error::Xml(err.to_string()))?;
  let mut element = Element::new(name);

  for attr in e.attributes() {
    let attr = attr.map_err(|err| Error::Xml(err.to_string()))?;
    let key = std::str::from_utf8(attr.key.as_ref())
      .map_err(|err| Error::Xml(err.to_string()))?
      .to_owned();
    let value = attr
      .unescape_value()
      .map_err(|err| Error::Xml(err.to_string()))?
      .into_owned();
    element.attributes.push((key, value));
  }
  Ok(element)
}

fn attach(
  stack: &mut [Element],
  root: &mut Option<Element>,
  element: Element,
) -> Result<()> {
  match stack.last_mut() {
    Some(parent) => parent.children.push(element),
    None if root.is_none() => *root = Some(element),
    None => {
      return Err(Error::MalformedDocument(
        "more than one root element".into(),
      ));
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn render(element: &Element) -> String {
    let mut writer = Writer::new(Vec::new());
    element.write(&mut writer).unwrap();
    String::from_utf8(writer.into_inner()).unwrap()
  }

  #[test]
  fn parse_builds_nested_tree() {
    let xml = br#"<?xml version="1.0" encoding="UTF-8"?>
      <Root Timestamp="now">
        <Set id="a"><Item Id="1"/><Item Id="2"><Item Id="3"/></Item></Set>
        <!-- ignored -->
      </Root>"#;
    let root = Element::parse(xml).unwrap();

    assert_eq!(root.name, "Root");
    assert_eq!(root.attribute("Timestamp"), Some("now"));
    let set = root.first_child("Set").unwrap();
    assert_eq!(set.attribute("id"), Some("a"));
    let items: Vec<_> = set.children_named("Item").collect();
    assert_eq!(items.len(), 2);
    assert_eq!(items[1].children[0].attribute("Id"), Some("3"));
  }

  #[test]
  fn parse_unescapes_attributes() {
    let root = Element::parse(br#"<A v="fish &amp; chips &lt;3"/>"#).unwrap();
    assert_eq!(root.attribute("v"), Some("fish & chips <3"));
  }

  #[test]
  fn parse_rejects_broken_documents() {
    assert!(Element::parse(b"<A><B></A>").is_err());
    assert!(Element::parse(b"<A>").is_err());
    assert!(Element::parse(b"").is_err());
  }

  #[test]
  fn write_escapes_and_sanitizes() {
    let element = Element::new("A").with_attribute("v", "a & b\u{1}<c>");
    let out = render(&element);
    assert!(out.contains("a &amp; b&lt;c&gt;"), "{out}");
    assert!(!out.contains('\u{1}'));

    let back = Element::parse(out.as_bytes()).unwrap();
    assert_eq!(back.attribute("v"), Some("a & b<c>"));
  }

  #[test]
  fn deep_tree_parses_and_drops() {
    const DEPTH: usize = 50_000;
    let mut xml = String::with_capacity(DEPTH * 20);
    for _ in 0..DEPTH {
      xml.push_str("<Comment>");
    }
    for _ in 0..DEPTH {
      xml.push_str("</Comment>");
    }

    let root = Element::parse(xml.as_bytes()).unwrap();
    let mut depth = 1;
    let mut current = &root;
    while let Some(child) = current.first_child("Comment") {
      depth += 1;
      current = child;
    }
    assert_eq!(depth, DEPTH);
    drop(root);
  }

  #[test]
  fn write_nests_children() {
    let element = Element::new("Ids")
      .with_child(Element::new("Element").with_attribute("Value", "1"))
      .with_child(Element::new("Element").with_attribute("Value", "2"));
    let out = render(&element);
    assert!(out.starts_with("<Ids>"));
    assert!(out.ends_with("</Ids>"));
    assert_eq!(Element::parse(out.as_bytes()).unwrap(), element);
  }
}

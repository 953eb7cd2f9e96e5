//! Writer and loader behaviour against a synthetic type and the node schema.

use chrono::{TimeZone, Utc};
use cityscaper_core::{Color, ContributionType, Node, Status, Vector3};
use quick_xml::Writer;

use crate::{
  ConverterRegistry, Descriptor, Element, Error, InstanceLoader,
  InstanceWriter, Schema, Value, ValueType, descriptor::assign,
};

#[derive(Debug, Default, Clone, PartialEq)]
struct Marker {
  name:     String,
  position: Vector3,
  visible:  bool,
  tint:     Color,
  ids:      Vec<i32>,
  count:    i32,
  big:      u64,
  offset:   i64,
  note:     Option<String>,
}

/// Element-shaped properties are declared between attribute-shaped ones.
fn marker() -> Descriptor<Marker> {
  Descriptor::<Marker>::new("Marker")
    .property(
      "Name",
      ValueType::String,
      |m| Some(m.name.as_str().into()),
      |m, v| assign(&mut m.name, v),
    )
    .with_default(
      "Position",
      ValueType::Vector3,
      Value::Vector3(Vector3::new(9.0, 9.0, 9.0)),
      |m| Some(m.position.into()),
      |m, v| assign(&mut m.position, v),
    )
    .with_default(
      "Visible",
      ValueType::Bool,
      Value::Bool(true),
      |m| Some(m.visible.into()),
      |m, v| assign(&mut m.visible, v),
    )
    .property(
      "Tint",
      ValueType::Color,
      |m| Some(m.tint.into()),
      |m, v| assign(&mut m.tint, v),
    )
    .property(
      "Ids",
      ValueType::IntArray,
      |m| Some(m.ids.clone().into()),
      |m, v| assign(&mut m.ids, v),
    )
    .with_default(
      "Count",
      ValueType::Int,
      Value::Int(-1),
      |m| Some(m.count.into()),
      |m, v| assign(&mut m.count, v),
    )
    .property(
      "Big",
      ValueType::U64,
      |m| Some(m.big.into()),
      |m, v| assign(&mut m.big, v),
    )
    .property(
      "Offset",
      ValueType::I64,
      |m| Some(m.offset.into()),
      |m, v| assign(&mut m.offset, v),
    )
    .property(
      "Note",
      ValueType::String,
      |m| m.note.as_deref().map(Value::from),
      |m, v| {
        m.note = Some(String::try_from(v)?);
        Ok(())
      },
    )
}

fn sample() -> Marker {
  Marker {
    name:     "pin".into(),
    position: Vector3::new(1.0, 2.5, -3.0),
    visible:  false,
    tint:     Color::new(1.0, 0.0, 0.5, 1.0),
    ids:      vec![4, 5],
    count:    3,
    big:      u64::MAX,
    offset:   -7,
    note:     None,
  }
}

fn render<T>(writer: &mut InstanceWriter<'_, T>, instance: &T) -> String {
  let mut out = Writer::new(Vec::new());
  writer.write(&mut out, instance).unwrap();
  String::from_utf8(out.into_inner()).unwrap()
}

// ─── Construction ────────────────────────────────────────────────────────────

#[test]
fn missing_converter_fails_at_construction() {
  let descriptor = marker();
  let registry = ConverterRegistry::standard();
  assert!(InstanceWriter::new(&descriptor, &registry).is_ok());

  let partial = ConverterRegistry::empty().register(
    ValueType::String,
    registry.get(ValueType::String).unwrap(),
  );
  let err = InstanceWriter::new(&descriptor, &partial).err().unwrap();
  assert!(matches!(
    err,
    Error::Configuration { property, value_type: ValueType::Vector3 }
      if property == "Position"
  ));
  assert!(InstanceLoader::new(&descriptor, &partial).is_err());
}

#[test]
fn mistyped_default_fails_at_construction() {
  let descriptor = Descriptor::<Marker>::new("Marker").with_default(
    "Count",
    ValueType::Int,
    Value::from("three"),
    |m| Some(m.count.into()),
    |m, v| assign(&mut m.count, v),
  );
  let err = descriptor
    .validate(&ConverterRegistry::standard())
    .unwrap_err();
  assert!(matches!(
    err,
    Error::DefaultTypeMismatch {
      expected: ValueType::Int,
      found: ValueType::String,
      ..
    }
  ));
}

// ─── Writing ─────────────────────────────────────────────────────────────────

#[test]
fn attributes_precede_child_elements() {
  let descriptor = marker();
  let registry = ConverterRegistry::standard();
  let mut writer = InstanceWriter::new(&descriptor, &registry).unwrap();
  let out = render(&mut writer, &sample());

  let start_tag_end = out.find('>').unwrap();
  let start_tag = &out[..start_tag_end];
  for attr in [
    r#"Name="pin""#,
    r#"Visible="false""#,
    r#"Count="3""#,
    r#"Big="18446744073709551615""#,
    r#"Offset="-7""#,
  ] {
    assert!(start_tag.contains(attr), "{attr} missing from {start_tag}");
  }
  assert!(!start_tag.contains("Note"));

  let position = out.find("<Position").unwrap();
  let tint = out.find("<Tint").unwrap();
  let ids = out.find("<Ids>").unwrap();
  assert!(start_tag_end < position && position < tint && tint < ids);
  assert!(out.ends_with("</Marker>"));
}

#[test]
fn writer_is_reusable_for_nested_instances() {
  let descriptor = marker();
  let registry = ConverterRegistry::standard();
  let mut writer = InstanceWriter::new(&descriptor, &registry).unwrap();
  let mut out = Writer::new(Vec::new());

  let outer = sample();
  let inner = Marker {
    name: "inner".into(),
    ..sample()
  };
  writer.start(&mut out).unwrap();
  writer.write_properties(&mut out, &outer).unwrap();
  writer.write(&mut out, &inner).unwrap();
  writer.end(&mut out).unwrap();

  let xml = out.into_inner();
  let root = Element::parse(&xml).unwrap();
  assert_eq!(root.attribute("Name"), Some("pin"));
  let nested = root.first_child("Marker").unwrap();
  assert_eq!(nested.attribute("Name"), Some("inner"));
}

#[test]
fn writer_rejects_out_of_order_calls() {
  let descriptor = marker();
  let registry = ConverterRegistry::standard();
  let mut writer = InstanceWriter::new(&descriptor, &registry).unwrap();
  let mut out = Writer::new(Vec::new());

  assert!(matches!(
    writer.write_properties(&mut out, &sample()),
    Err(Error::WriterOrder(_))
  ));
  assert!(matches!(writer.end(&mut out), Err(Error::WriterOrder(_))));

  writer.start(&mut out).unwrap();
  assert!(matches!(writer.start(&mut out), Err(Error::WriterOrder(_))));
  assert!(matches!(writer.end(&mut out), Err(Error::WriterOrder(_))));
}

#[test]
fn failed_write_leaves_writer_ready_for_the_next_instance() {
  // A negative count yields a value the Int converter refuses, after the
  // element-shaped Position has already been staged.
  let descriptor = Descriptor::<Marker>::new("Marker")
    .property(
      "Position",
      ValueType::Vector3,
      |m| Some(m.position.into()),
      |m, v| assign(&mut m.position, v),
    )
    .property(
      "Count",
      ValueType::Int,
      |m| Some(if m.count < 0 { Value::from("x") } else { m.count.into() }),
      |m, v| assign(&mut m.count, v),
    );
  let registry = ConverterRegistry::standard();
  let mut writer = InstanceWriter::new(&descriptor, &registry).unwrap();

  let mut out = Writer::new(Vec::new());
  let broken = Marker {
    count: -5,
    ..sample()
  };
  assert!(matches!(
    writer.write(&mut out, &broken),
    Err(Error::TypeMismatch { .. })
  ));
  assert!(out.into_inner().is_empty());

  let xml = render(&mut writer, &sample());
  let root = Element::parse(xml.as_bytes()).unwrap();
  assert_eq!(root.attribute("Count"), Some("3"));
  assert_eq!(root.children_named("Position").count(), 1);
}

#[test]
fn written_strings_are_sanitized() {
  let descriptor = marker();
  let registry = ConverterRegistry::standard();
  let mut writer = InstanceWriter::new(&descriptor, &registry).unwrap();
  let marker = Marker {
    name: "bell\u{7} & whistle".into(),
    ..sample()
  };
  let out = render(&mut writer, &marker);
  assert!(out.contains(r#"Name="bell &amp; whistle""#), "{out}");
}

// ─── Loading ─────────────────────────────────────────────────────────────────

#[test]
fn write_then_load_restores_every_property() {
  let descriptor = marker();
  let registry = ConverterRegistry::standard();
  let mut writer = InstanceWriter::new(&descriptor, &registry).unwrap();
  let loader = InstanceLoader::new(&descriptor, &registry).unwrap();

  let original = Marker {
    note: Some("hello".into()),
    ..sample()
  };
  let out = render(&mut writer, &original);

  let mut loaded = Marker::default();
  loader
    .load(&Element::parse(out.as_bytes()).unwrap(), &mut loaded)
    .unwrap();
  assert_eq!(loaded, original);
}

#[test]
fn missing_properties_take_defaults_or_stay_untouched() {
  let descriptor = marker();
  let registry = ConverterRegistry::standard();
  let loader = InstanceLoader::new(&descriptor, &registry).unwrap();

  let element = Element::parse(br#"<Marker Name="bare" Extra="ignored"/>"#).unwrap();
  let mut loaded = Marker {
    big: 12,
    note: Some("kept".into()),
    ..Marker::default()
  };
  loader.load(&element, &mut loaded).unwrap();

  assert_eq!(loaded.name, "bare");
  assert_eq!(loaded.position, Vector3::new(9.0, 9.0, 9.0));
  assert!(loaded.visible);
  assert_eq!(loaded.count, -1);
  assert_eq!(loaded.big, 12);
  assert_eq!(loaded.note.as_deref(), Some("kept"));
}

#[test]
fn malformed_value_names_the_property() {
  let descriptor = marker();
  let registry = ConverterRegistry::standard();
  let loader = InstanceLoader::new(&descriptor, &registry).unwrap();

  let element = Element::parse(br#"<Marker Count="lots"/>"#).unwrap();
  let err = loader.load(&element, &mut Marker::default()).unwrap_err();
  assert!(matches!(
    err,
    Error::MalformedValue { property, value } if property == "Count" && value == "lots"
  ));
}

#[test]
fn loader_checks_element_name() {
  let descriptor = marker();
  let registry = ConverterRegistry::standard();
  let loader = InstanceLoader::new(&descriptor, &registry).unwrap();
  let element = Element::new("Pin");
  assert!(matches!(
    loader.load(&element, &mut Marker::default()),
    Err(Error::MalformedDocument(_))
  ));
}

// ─── Node schema ─────────────────────────────────────────────────────────────

#[test]
fn contribution_attributes_follow_declared_order() {
  let schema = Schema::standard().unwrap();
  let ts = Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap();
  let mut node = Node::contribution("7", ts, "harbour", "ana");
  node.title = "Bench".into();
  node.content = "More benches please".into();
  node.voting_pro = 2;

  let mut writer = schema.contribution_writer().unwrap();
  let out = render(&mut writer, &node);
  let element = Element::parse(out.as_bytes()).unwrap();

  let names: Vec<&str> = element.attributes.iter().map(|(k, _)| k.as_str()).collect();
  assert_eq!(names, [
    "Id",
    "Timestamp",
    "BelongToProject",
    "Author",
    "Title",
    "ContributionContent",
    "ContributionType",
    "Status",
    "Latitude",
    "Longitude",
    "VotingPro",
    "VotingContra",
  ]);
  assert_eq!(element.attribute("Timestamp"), Some("637135310450000000"));
  assert_eq!(element.attribute("Status"), Some("0"));
  assert_eq!(element.attribute("ContributionType"), Some("Suggestion"));
}

#[test]
fn comment_round_trips_through_schema() {
  let schema = Schema::standard().unwrap();
  let ts = Utc.with_ymd_and_hms(2021, 6, 1, 12, 0, 0).unwrap();
  let mut node = Node::comment("12", ts);
  node.title = "Re: Bench".into();
  node.content = "Agreed".into();
  node.contribution_type = ContributionType::Opinion;
  node.voting_contra = 4;
  if let Some(c) = node.as_comment_mut() {
    c.comment_on_contribution = "7".into();
    c.comment_on_comment = "9".into();
  }

  let mut writer = schema.comment_writer().unwrap();
  let out = render(&mut writer, &node);
  assert!(!out.contains("Status"));

  let mut loaded = Node::comment("", Default::default());
  schema
    .comment_loader()
    .unwrap()
    .load(&Element::parse(out.as_bytes()).unwrap(), &mut loaded)
    .unwrap();
  assert_eq!(loaded, node);
}

#[test]
fn sparse_contribution_loads_defaults() {
  let schema = Schema::standard().unwrap();
  let element =
    Element::parse(br#"<Contribution Id="3" Timestamp="637135310450000000"/>"#)
      .unwrap();
  let mut node = Node::contribution("", Default::default(), "x", "y");
  schema
    .contribution_loader()
    .unwrap()
    .load(&element, &mut node)
    .unwrap();

  assert_eq!(node.id, "3");
  assert_eq!(node.title, "");
  assert_eq!(node.voting_pro, 0);
  let data = node.as_contribution().unwrap();
  assert_eq!(data.author, "");
  assert_eq!(data.status, Status::NotYetWorkedOn);
  assert_eq!(data.latitude, 0.0);
}

#[test]
fn comment_table_cannot_fill_a_contribution() {
  let schema = Schema::standard().unwrap();
  let element = Element::parse(br#"<Comment Id="1" Timestamp="0"/>"#).unwrap();
  let mut node = Node::contribution("", Default::default(), "", "");
  let err = schema
    .comment_loader()
    .unwrap()
    .load(&element, &mut node)
    .unwrap_err();
  assert!(matches!(err, Error::WrongNodeKind("Comment")));
}

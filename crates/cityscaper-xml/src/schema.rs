//! Property tables for contributions and comments.

use cityscaper_core::{CommentData, ContributionData, Node};

use crate::{
  ConverterRegistry, Descriptor, Error, InstanceLoader, InstanceWriter,
  Result, Value, ValueType, descriptor::assign,
};

pub const CONTRIBUTION: &str = "Contribution";
pub const COMMENT: &str = "Comment";

pub const ID: &str = "Id";
pub const TIMESTAMP: &str = "Timestamp";
pub const COMMENT_ON_CONTRIBUTION: &str = "CommentOnContribution";
pub const COMMENT_ON_COMMENT: &str = "CommentOnComment";

fn contribution(node: &mut Node) -> Result<&mut ContributionData> {
  node
    .as_contribution_mut()
    .ok_or(Error::WrongNodeKind(CONTRIBUTION))
}

fn comment(node: &mut Node) -> Result<&mut CommentData> {
  node.as_comment_mut().ok_or(Error::WrongNodeKind(COMMENT))
}

fn empty() -> Value { Value::from("") }

/// Identity properties, persisted first on both node kinds.
fn common(type_name: &'static str) -> Descriptor<Node> {
  Descriptor::<Node>::new(type_name)
    .property(
      ID,
      ValueType::String,
      |n| Some(n.id.as_str().into()),
      |n, v| assign(&mut n.id, v),
    )
    .property(
      TIMESTAMP,
      ValueType::Timestamp,
      |n| Some(n.timestamp.into()),
      |n, v| assign(&mut n.timestamp, v),
    )
}

pub fn contribution_descriptor() -> Descriptor<Node> {
  common(CONTRIBUTION)
    .with_default(
      "BelongToProject",
      ValueType::String,
      empty(),
      |n| n.as_contribution().map(|c| c.belong_to_project.as_str().into()),
      |n, v| assign(&mut contribution(n)?.belong_to_project, v),
    )
    .with_default(
      "Author",
      ValueType::String,
      empty(),
      |n| n.as_contribution().map(|c| c.author.as_str().into()),
      |n, v| assign(&mut contribution(n)?.author, v),
    )
    .with_default(
      "Title",
      ValueType::String,
      empty(),
      |n| Some(n.title.as_str().into()),
      |n, v| assign(&mut n.title, v),
    )
    .with_default(
      "ContributionContent",
      ValueType::String,
      empty(),
      |n| Some(n.content.as_str().into()),
      |n, v| assign(&mut n.content, v),
    )
    .with_default(
      "ContributionType",
      ValueType::ContributionType,
      Value::ContributionType(Default::default()),
      |n| Some(n.contribution_type.into()),
      |n, v| assign(&mut n.contribution_type, v),
    )
    .with_default(
      "Status",
      ValueType::Status,
      Value::Status(Default::default()),
      |n| n.as_contribution().map(|c| c.status.into()),
      |n, v| assign(&mut contribution(n)?.status, v),
    )
    .with_default(
      "Latitude",
      ValueType::Float,
      Value::Float(0.0),
      |n| n.as_contribution().map(|c| c.latitude.into()),
      |n, v| assign(&mut contribution(n)?.latitude, v),
    )
    .with_default(
      "Longitude",
      ValueType::Float,
      Value::Float(0.0),
      |n| n.as_contribution().map(|c| c.longitude.into()),
      |n, v| assign(&mut contribution(n)?.longitude, v),
    )
    .with_default(
      "VotingPro",
      ValueType::UInt,
      Value::UInt(0),
      |n| Some(n.voting_pro.into()),
      |n, v| assign(&mut n.voting_pro, v),
    )
    .with_default(
      "VotingContra",
      ValueType::UInt,
      Value::UInt(0),
      |n| Some(n.voting_contra.into()),
      |n, v| assign(&mut n.voting_contra, v),
    )
}

pub fn comment_descriptor() -> Descriptor<Node> {
  common(COMMENT)
    .with_default(
      "Title",
      ValueType::String,
      empty(),
      |n| Some(n.title.as_str().into()),
      |n, v| assign(&mut n.title, v),
    )
    .with_default(
      "CommentContent",
      ValueType::String,
      empty(),
      |n| Some(n.content.as_str().into()),
      |n, v| assign(&mut n.content, v),
    )
    .with_default(
      "ContributionType",
      ValueType::ContributionType,
      Value::ContributionType(Default::default()),
      |n| Some(n.contribution_type.into()),
      |n, v| assign(&mut n.contribution_type, v),
    )
    .with_default(
      "VotingPro",
      ValueType::UInt,
      Value::UInt(0),
      |n| Some(n.voting_pro.into()),
      |n, v| assign(&mut n.voting_pro, v),
    )
    .with_default(
      "VotingContra",
      ValueType::UInt,
      Value::UInt(0),
      |n| Some(n.voting_contra.into()),
      |n, v| assign(&mut n.voting_contra, v),
    )
    .with_default(
      COMMENT_ON_CONTRIBUTION,
      ValueType::String,
      empty(),
      |n| n.as_comment().map(|c| c.comment_on_contribution.as_str().into()),
      |n, v| assign(&mut comment(n)?.comment_on_contribution, v),
    )
    .with_default(
      COMMENT_ON_COMMENT,
      ValueType::String,
      empty(),
      |n| n.as_comment().map(|c| c.comment_on_comment.as_str().into()),
      |n, v| assign(&mut comment(n)?.comment_on_comment, v),
    )
}

/// The converter registry together with both node tables, validated once.
pub struct Schema {
  registry:     ConverterRegistry,
  contribution: Descriptor<Node>,
  comment:      Descriptor<Node>,
}

impl Schema {
  pub fn new(registry: ConverterRegistry) -> Result<Self> {
    let contribution = contribution_descriptor();
    let comment = comment_descriptor();
    contribution.validate(&registry)?;
    comment.validate(&registry)?;
    Ok(Self {
      registry,
      contribution,
      comment,
    })
  }

  pub fn standard() -> Result<Self> { Self::new(ConverterRegistry::standard()) }

  pub fn registry(&self) -> &ConverterRegistry { &self.registry }

  pub fn contribution(&self) -> &Descriptor<Node> { &self.contribution }

  pub fn comment(&self) -> &Descriptor<Node> { &self.comment }

  pub fn contribution_writer(&self) -> Result<InstanceWriter<'_, Node>> {
    InstanceWriter::new(&self.contribution, &self.registry)
  }

  pub fn comment_writer(&self) -> Result<InstanceWriter<'_, Node>> {
    InstanceWriter::new(&self.comment, &self.registry)
  }

  pub fn contribution_loader(&self) -> Result<InstanceLoader<'_, Node>> {
    InstanceLoader::new(&self.contribution, &self.registry)
  }

  pub fn comment_loader(&self) -> Result<InstanceLoader<'_, Node>> {
    InstanceLoader::new(&self.comment, &self.registry)
  }
}

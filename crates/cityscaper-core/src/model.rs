//! Small domain values carried by tree nodes and understood by the
//! persistence schema.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

// ─── ContributionType ────────────────────────────────────────────────────────

/// What kind of feedback a contribution or comment expresses.
///
/// The variant name is the persisted string id.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
)]
pub enum ContributionType {
  #[default]
  Suggestion,
  Opinion,
  Criticism,
}

impl ContributionType {
  /// Dropdown order used by input forms.
  pub const ALL: [Self; 3] = [Self::Suggestion, Self::Opinion, Self::Criticism];

  pub fn id(self) -> &'static str { self.into() }

  pub fn from_id(id: &str) -> Option<Self> { id.parse().ok() }

  /// Resolve a zero-based position in [`Self::ALL`].
  pub fn from_index(index: usize) -> Option<Self> {
    Self::ALL.get(index).copied()
  }
}

// ─── Status ──────────────────────────────────────────────────────────────────

/// Processing state of a contribution. Persisted by numeric id.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
)]
#[repr(u8)]
pub enum Status {
  #[default]
  #[strum(to_string = "Not yet worked on")]
  NotYetWorkedOn = 0,
  #[strum(to_string = "Categorized")]
  Categorized    = 1,
  #[strum(to_string = "In progress")]
  InProgress     = 2,
  #[strum(to_string = "Finished")]
  Finished       = 3,
}

impl Status {
  pub const ALL: [Self; 4] = [
    Self::NotYetWorkedOn,
    Self::Categorized,
    Self::InProgress,
    Self::Finished,
  ];

  pub fn id(self) -> u8 { self as u8 }

  pub fn from_id(id: u8) -> Option<Self> {
    Self::ALL.into_iter().find(|s| s.id() == id)
  }

  /// Human-readable label, e.g. "In progress".
  pub fn label(self) -> String { self.to_string() }
}

// ─── Structured values ───────────────────────────────────────────────────────

/// A position in scene space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
  pub x: f32,
  pub y: f32,
  pub z: f32,
}

impl Vector3 {
  pub const fn new(x: f32, y: f32, z: f32) -> Self { Self { x, y, z } }
}

/// An RGBA color with channels in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Color {
  pub r: f32,
  pub g: f32,
  pub b: f32,
  pub a: f32,
}

impl Color {
  pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);

  pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
    Self { r, g, b, a }
  }
}

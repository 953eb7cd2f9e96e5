//! Layered configuration: defaults, then the TOML file, then `CITYSCAPER_*`
//! environment variables, then command-line flags.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
  pub save_path:  PathBuf,
  pub project:    String,
  pub author:     String,
  /// Keys of the scene entities present in this session. Registered before
  /// load so saved containers can find their owners.
  pub containers: Vec<String>,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      save_path:  PathBuf::from("Contributions.xml"),
      project:    "cityscaper".to_string(),
      author:     "anonymous".to_string(),
      containers: Vec::new(),
    }
  }
}

impl Settings {
  /// Read `path` (which need not exist) and the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("CITYSCAPER")
          .try_parsing(true)
          .list_separator(",")
          .with_list_parse_key("containers"),
      )
      .build()
      .context("failed to read config file")?
      .try_deserialize()
      .context("failed to deserialise Settings")
  }

  pub fn with_overrides(
    mut self,
    save_path: Option<PathBuf>,
    author: Option<String>,
  ) -> Self {
    if let Some(path) = save_path {
      self.save_path = path;
    }
    if let Some(author) = author {
      self.author = author;
    }
    self
  }
}

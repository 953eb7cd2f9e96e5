//! [`XmlStore`]: the save file and its load/save lifecycle.

use std::{
  fs::{self, File},
  io::{self, BufWriter, Write as _},
  path::{Path, PathBuf},
};

use cityscaper_core::Session;
use cityscaper_xml::{Element, Schema};
use quick_xml::Writer;
use strum::Display;
use tracing::{debug, info, warn};

use crate::{
  Error, Result,
  document::{LoadReport, load_document, max_depth, write_document},
};

/// Trees nested deeper than this are saved without indentation, which
/// would otherwise grow with the square of the depth.
pub const INDENT_DEPTH_LIMIT: usize = 64;

/// Where a store is in its lifecycle.
///
/// `Idle → Loading → Ready → Saving → Closed`. A failed load returns to
/// `Idle`; a failed save returns to `Ready` so it can be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum StoreState {
  Idle,
  Loading,
  Ready,
  Saving,
  Closed,
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Cityscaper session persisted as a single XML file.
pub struct XmlStore {
  path:   PathBuf,
  schema: Schema,
  state:  StoreState,
}

impl XmlStore {
  /// Bind a store to `path` with the standard schema. Nothing is read until
  /// [`XmlStore::load`].
  pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
    Ok(Self::with_schema(path, Schema::standard()?))
  }

  pub fn with_schema(path: impl Into<PathBuf>, schema: Schema) -> Self {
    Self {
      path: path.into(),
      schema,
      state: StoreState::Idle,
    }
  }

  pub fn path(&self) -> &Path { &self.path }

  pub fn state(&self) -> StoreState { self.state }

  fn require(&self, expected: StoreState, operation: &'static str) -> Result<()> {
    if self.state != expected {
      return Err(Error::InvalidState {
        operation,
        state: self.state,
      });
    }
    Ok(())
  }

  /// Read the save file into `session`.
  ///
  /// A missing file is a fresh start. Containers that fail to load are
  /// listed in the report and leave no nodes behind.
  pub fn load(&mut self, session: &mut Session) -> Result<LoadReport> {
    self.require(StoreState::Idle, "load")?;
    self.state = StoreState::Loading;

    match self.read_into(session) {
      Ok(report) => {
        self.state = StoreState::Ready;
        Ok(report)
      }
      Err(e) => {
        self.state = StoreState::Idle;
        Err(e)
      }
    }
  }

  fn read_into(&self, session: &mut Session) -> Result<LoadReport> {
    let bytes = match fs::read(&self.path) {
      Ok(bytes) => bytes,
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        info!(path = %self.path.display(), "no save file; starting empty");
        return Ok(LoadReport::default());
      }
      Err(e) => return Err(e.into()),
    };
    debug!(path = %self.path.display(), bytes = bytes.len(), "read save file");

    let root = Element::parse(&bytes)
      .map_err(|e| Error::CorruptSave(e.to_string()))?;
    load_document(&root, session, &self.schema)
  }

  /// Write `session` to the save file and close the store.
  ///
  /// The document goes to a sibling temporary file first and is renamed
  /// over the save file, so an interrupted save leaves the previous file
  /// intact.
  pub fn save_and_close(&mut self, session: &Session) -> Result<()> {
    self.require(StoreState::Ready, "save")?;
    self.state = StoreState::Saving;

    match self.write_from(session) {
      Ok(()) => {
        self.state = StoreState::Closed;
        info!(path = %self.path.display(), "saved");
        Ok(())
      }
      Err(e) => {
        self.state = StoreState::Ready;
        Err(e)
      }
    }
  }

  fn write_from(&self, session: &Session) -> Result<()> {
    if let Some(dir) = self.path.parent()
      && !dir.as_os_str().is_empty()
    {
      fs::create_dir_all(dir)?;
    }

    let tmp = self.temp_path();
    let result = self.write_temp(&tmp, session).and_then(|()| {
      fs::rename(&tmp, &self.path)?;
      Ok(())
    });
    if result.is_err()
      && let Err(e) = fs::remove_file(&tmp)
      && e.kind() != io::ErrorKind::NotFound
    {
      warn!(path = %tmp.display(), error = %e, "could not remove temporary save file");
    }
    result
  }

  fn write_temp(&self, tmp: &Path, session: &Session) -> Result<()> {
    let file = BufWriter::new(File::create(tmp)?);
    let depth = max_depth(session);
    let mut writer = if depth <= INDENT_DEPTH_LIMIT {
      Writer::new_with_indent(file, b' ', 2)
    } else {
      debug!(depth, "tree too deep to indent; writing compact document");
      Writer::new(file)
    };
    write_document(&mut writer, session, &self.schema)?;

    let mut file = writer.into_inner();
    file.write_all(b"\n")?;
    let file = file.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(())
  }

  fn temp_path(&self) -> PathBuf {
    let mut name = self
      .path
      .file_name()
      .map(|n| n.to_os_string())
      .unwrap_or_default();
    name.push(".tmp");
    self.path.with_file_name(name)
  }
}

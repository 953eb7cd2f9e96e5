//! `cityscaper`: inspect and edit a contributions save file.
//!
//! Every command loads the save file into a fresh session first. Mutating
//! commands then save and close the store; `show` exits without saving.
//!
//! ```
//! cityscaper show
//! cityscaper contribute --container bench --title Shade --content "Plant a tree"
//! cityscaper comment --parent 1 --title Yes --content "Agreed" --type Opinion
//! cityscaper vote --node 1 --pro
//! ```

mod render;
mod settings;

use std::path::PathBuf;

use anyhow::{Context as _, bail};
use clap::{ArgGroup, Parser, Subcommand};
use cityscaper_core::{ContributionType, NewComment, NewContribution, Session};
use cityscaper_store::XmlStore;
use settings::Settings;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "cityscaper", version, about = "Contributions and comments on scene entities")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, value_name = "FILE", default_value = "cityscaper.toml")]
  config: PathBuf,

  /// Save file to load from and write to.
  #[arg(long, value_name = "FILE")]
  save_path: Option<PathBuf>,

  /// Author recorded on new contributions.
  #[arg(long)]
  author: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Print every container and its comment trees.
  Show {
    /// Emit nested JSON instead of text.
    #[arg(long)]
    json: bool,
  },

  /// Add a contribution to a container.
  Contribute {
    /// Key of a container listed in the configuration.
    #[arg(long)]
    container: String,
    #[arg(long)]
    title: String,
    #[arg(long)]
    content: String,
    #[arg(long = "type", default_value = "Suggestion")]
    kind: ContributionType,
    #[arg(long, requires = "longitude", allow_negative_numbers = true)]
    latitude: Option<f32>,
    #[arg(long, requires = "latitude", allow_negative_numbers = true)]
    longitude: Option<f32>,
  },

  /// Reply to a contribution or comment.
  Comment {
    /// Id of the node being replied to.
    #[arg(long)]
    parent: String,
    #[arg(long)]
    title: String,
    #[arg(long)]
    content: String,
    #[arg(long = "type", default_value = "Suggestion")]
    kind: ContributionType,
  },

  /// Vote a contribution or comment up or down.
  #[command(group(ArgGroup::new("direction").required(true).args(["pro", "contra"])))]
  Vote {
    #[arg(long)]
    node: String,
    #[arg(long)]
    pro: bool,
    #[arg(long)]
    contra: bool,
  },
}

// ─── Entry point ─────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let settings = Settings::load(&cli.config)?.with_overrides(cli.save_path, cli.author);

  let mut session = Session::default();
  for key in &settings.containers {
    session.register_container(key.as_str());
  }

  let mut store = XmlStore::open(&settings.save_path)
    .context("failed to build the persistence schema")?;
  let report = store
    .load(&mut session)
    .with_context(|| format!("failed to load {}", settings.save_path.display()))?;

  if let Command::Show { json } = cli.command {
    if json {
      let value = render::json(&session).context("failed to build JSON view")?;
      println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
      print!("{}", render::text(&session));
    }
    return Ok(());
  }

  // Saving replaces the whole file, so anything skipped on load would be
  // lost.
  if !report.is_clean() {
    let keys: Vec<&str> = report.failed.iter().map(|f| f.key.as_str()).collect();
    bail!(
      "refusing to save: {} container(s) failed to load ({}); fix the save file or the container list",
      keys.len(),
      keys.join(", ")
    );
  }

  apply(&mut session, &settings, cli.command)?;

  store
    .save_and_close(&session)
    .with_context(|| format!("failed to save {}", settings.save_path.display()))?;
  Ok(())
}

fn apply(
  session: &mut Session,
  settings: &Settings,
  command: Command,
) -> anyhow::Result<()> {
  match command {
    Command::Show { .. } => {}

    Command::Contribute {
      container,
      title,
      content,
      kind,
      latitude,
      longitude,
    } => {
      let Some(set) = session.find_container_by_key(&container) else {
        bail!("unknown container {container:?}; add it to `containers` in the configuration");
      };
      let root = session.add_root_contribution(set, NewContribution {
        belong_to_project: settings.project.clone(),
        author: settings.author.clone(),
        title,
        content,
        contribution_type: kind,
        latitude: latitude.unwrap_or_default(),
        longitude: longitude.unwrap_or_default(),
      })?;
      let id = &session.forest()[root].id;
      info!(%id, container = %container, "added contribution");
      println!("{id}");
    }

    Command::Comment {
      parent,
      title,
      content,
      kind,
    } => {
      let parent = session
        .find_node(&parent)
        .with_context(|| format!("no node with id {parent:?}"))?;
      let reply = session.add_comment(parent, NewComment {
        title,
        content,
        contribution_type: kind,
      })?;
      let id = &session.forest()[reply].id;
      info!(%id, "added comment");
      println!("{id}");
    }

    Command::Vote { node, pro, .. } => {
      let target = session
        .find_node(&node)
        .with_context(|| format!("no node with id {node:?}"))?;
      let count = if pro {
        session.up_vote(target)?
      } else {
        session.down_vote(target)?
      };
      println!("{}", render::group_thousands(count));
    }
  }
  Ok(())
}

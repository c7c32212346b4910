mod missed;
mod outdated;
mod record;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::debug;

use remake_lib::context::{BuildContext, Jobs, Settings};
use remake_lib::manifest::load_document;
use remake_lib::stale::Trigger;

pub use missed::cmd_missed;
pub use outdated::cmd_outdated;
pub use record::cmd_record;

/// Arguments shared by every command that reads a context document.
#[derive(Debug, Args)]
pub struct ContextArgs {
  /// Path to the resolved context document (JSON)
  pub context: PathBuf,

  /// Metadata store directory (default: $REMAKE_STORE or the data directory)
  #[arg(long)]
  pub store: Option<PathBuf>,

  /// Workspace root file targets are resolved against (default: current directory)
  #[arg(long)]
  pub root: Option<PathBuf>,

  /// Maximum parallel evaluations (default: $REMAKE_JOBS or available cores)
  #[arg(short, long)]
  pub jobs: Option<usize>,

  /// Default trigger for targets that do not set one
  #[arg(long)]
  pub trigger: Option<Trigger>,
}

impl ContextArgs {
  /// Settings from the environment, with flags taking precedence.
  pub fn settings(&self) -> Settings {
    let mut settings = Settings::from_env();
    if let Some(store) = &self.store {
      settings.store_dir = store.clone();
    }
    if let Some(root) = &self.root {
      settings.workspace_root = root.clone();
    }
    if let Some(jobs) = self.jobs {
      settings.jobs = Jobs::uniform(jobs);
    }
    if let Some(trigger) = self.trigger {
      settings.trigger = trigger;
    }
    settings
  }

  /// Read the context document and build the context.
  pub fn load(&self) -> Result<BuildContext> {
    debug!(path = %self.context.display(), "loading context");
    let document = load_document(&self.context)?;
    let context = BuildContext::from_document(document, self.settings())
      .with_context(|| format!("Failed to load context: {}", self.context.display()))?;
    Ok(context)
  }
}

pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
  tokio::runtime::Runtime::new().context("Failed to create async runtime")
}

//! Discovery settings.

use std::path::PathBuf;

use tracing::warn;

use crate::consts::JOBS_ENV;
use crate::platform::paths::store_dir;
use crate::stale::Trigger;

/// Job limits for the two kinds of parallel work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Jobs {
  /// Limit for import scanning and processing.
  pub preprocess: usize,
  /// Limit for staleness evaluation of frontier targets.
  pub general: usize,
}

impl Jobs {
  /// The same limit for both kinds of work, clamped to at least one.
  pub fn uniform(jobs: usize) -> Self {
    let jobs = jobs.max(1);
    Self {
      preprocess: jobs,
      general: jobs,
    }
  }

  /// Limit from `REMAKE_JOBS`, else the available parallelism.
  pub fn from_env() -> Self {
    match std::env::var(JOBS_ENV) {
      Ok(raw) => match raw.trim().parse::<i64>() {
        Ok(n) => Self::uniform(usize::try_from(n).unwrap_or(0)),
        Err(_) => {
          warn!(var = JOBS_ENV, value = %raw, "ignoring invalid job limit");
          Self::uniform(num_cpus())
        }
      },
      Err(_) => Self::uniform(num_cpus()),
    }
  }
}

impl Default for Jobs {
  fn default() -> Self {
    Self::uniform(num_cpus())
  }
}

fn num_cpus() -> usize {
  std::thread::available_parallelism().map(|p| p.get()).unwrap_or(4)
}

/// Settings shared by every discovery call on a context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
  /// Root of the metadata store.
  pub store_dir: PathBuf,
  /// Directory file nodes are resolved against.
  pub workspace_root: PathBuf,
  /// Context-wide trigger, used by targets that do not set their own.
  pub trigger: Trigger,
  pub jobs: Jobs,
}

impl Settings {
  /// Settings from the environment with the current directory as workspace root.
  pub fn from_env() -> Self {
    Self {
      store_dir: store_dir(),
      workspace_root: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
      trigger: Trigger::default(),
      jobs: Jobs::from_env(),
    }
  }

  /// Settings rooted at explicit directories, with default trigger and jobs.
  pub fn new(store_dir: impl Into<PathBuf>, workspace_root: impl Into<PathBuf>) -> Self {
    Self {
      store_dir: store_dir.into(),
      workspace_root: workspace_root.into(),
      trigger: Trigger::default(),
      jobs: Jobs::default(),
    }
  }

  pub fn with_trigger(mut self, trigger: Trigger) -> Self {
    self.trigger = trigger;
    self
  }

  pub fn with_jobs(mut self, jobs: Jobs) -> Self {
    self.jobs = jobs;
    self
  }
}

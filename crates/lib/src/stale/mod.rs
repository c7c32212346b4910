//! Staleness discovery.
//!
//! [`outdated`] answers "what must be rebuilt?" and [`missed`] answers "which
//! declared imports are absent?". The building blocks are public as well:
//!
//! - [`should_build`] - the per-target predicate, driven by [`Trigger`]
//! - [`lightly_parallelize`] - bounded parallel evaluation of a node set
//! - [`first_outdated`] - frontier expansion with pruning over the schedule
//! - [`downstream_closure`] - everything that depends on a stale target
//! - [`missing_imports`] / [`process_imports`] - import scanning and hashing
//! - [`run_prework`] - shell setup steps
//! - [`record_build`] - what an executor calls after building a target

mod fingerprint;
mod frontier;
mod imports;
mod memo;
mod parallel;
mod predicate;
mod prework;
mod record;
mod trigger;
mod types;

use tracing::{info, warn};

use crate::context::BuildContext;
use crate::graph::NodeId;

pub use fingerprint::{command_hash, dependency_fingerprint, normalize_command};
pub use frontier::{downstream_closure, first_outdated};
pub use imports::{missing_imports, process_imports};
pub use memo::{HashMemo, MemoScope};
pub use parallel::lightly_parallelize;
pub use predicate::should_build;
pub use prework::run_prework;
pub use record::record_build;
pub use trigger::{Trigger, TriggerParseError};
pub use types::StaleError;

/// Side steps [`outdated`] runs before discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutdatedOptions {
  /// Refresh import hashes first.
  pub make_imports: bool,
  /// Run the context's prework steps first.
  pub do_prework: bool,
}

impl Default for OutdatedOptions {
  fn default() -> Self {
    Self {
      make_imports: true,
      do_prework: true,
    }
  }
}

/// Targets that must be rebuilt, sorted and deduplicated.
///
/// The targets stale on their own account, plus everything downstream of
/// them. An empty result means the context is up to date under its triggers.
pub async fn outdated(ctx: &BuildContext, options: OutdatedOptions) -> Result<Vec<NodeId>, StaleError> {
  info!(
    targets = ctx.schedule().node_count(),
    make_imports = options.make_imports,
    do_prework = options.do_prework,
    "checking for outdated targets"
  );

  if options.do_prework {
    run_prework(ctx).await?;
  }
  if options.make_imports {
    let recorded = process_imports(ctx).await?;
    info!(imports = recorded, "imports processed");
  }

  let frontier = first_outdated(ctx).await?;
  let outdated = downstream_closure(ctx.schedule(), &frontier);

  info!(frontier = frontier.len(), outdated = outdated.len(), "outdated targets found");
  Ok(outdated)
}

/// Declared imports that are absent, sorted.
///
/// Each absent import is logged with the targets that read it directly.
pub async fn missed(ctx: &BuildContext) -> Result<Vec<NodeId>, StaleError> {
  let missing = missing_imports(ctx).await?;
  for id in &missing {
    let dependents = ctx.graph().dependents(id);
    warn!(
      import = %id,
      dependents = %names_of(&dependents),
      "import is missing"
    );
  }
  info!(imports = ctx.imports().len(), missing = missing.len(), "import scan complete");
  Ok(missing)
}

fn names_of(ids: &[NodeId]) -> String {
  ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

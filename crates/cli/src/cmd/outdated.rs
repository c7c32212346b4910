//! Implementation of the `remake outdated` command.

use std::time::Instant;

use anyhow::{Context, Result};

use remake_lib::stale::{OutdatedOptions, outdated};

use super::{ContextArgs, runtime};
use crate::output::{OutputFormat, Status, elapsed, emit_json, field, node_list, status};

/// List the targets that must be rebuilt, in sorted order.
pub fn cmd_outdated(args: &ContextArgs, make_imports: bool, do_prework: bool, output: OutputFormat) -> Result<()> {
  let ctx = args.load()?;
  let options = OutdatedOptions {
    make_imports,
    do_prework,
  };

  let started = Instant::now();
  let rt = runtime()?;
  let targets = rt
    .block_on(outdated(&ctx, options))
    .context("Failed to determine outdated targets")?;
  let took = started.elapsed();

  if output.is_json() {
    return emit_json(&serde_json::json!({ "outdated": targets }));
  }

  if targets.is_empty() {
    status(Status::Clean, "All targets are up to date");
  } else {
    node_list(Status::Stale, "outdated target", &targets);
  }
  println!();
  field("Targets", &ctx.schedule().node_count().to_string());
  field("Checked in", &elapsed(took));

  Ok(())
}

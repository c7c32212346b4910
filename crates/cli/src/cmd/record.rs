//! Implementation of the `remake record` command.
//!
//! Called by whatever actually ran a target's command, so that the next
//! `remake outdated` sees the target as current.

use anyhow::{Context, Result};

use remake_lib::graph::NodeId;
use remake_lib::stale::record_build;

use super::ContextArgs;
use crate::output::{OutputFormat, Status, emit_json, field, short_hash, status};

pub fn cmd_record(args: &ContextArgs, target: &str, value: Option<&str>, output: OutputFormat) -> Result<()> {
  let ctx = args.load()?;

  let id: NodeId = target
    .parse()
    .with_context(|| format!("Invalid target id: {:?}", target))?;
  let value: Option<serde_json::Value> = value
    .map(serde_json::from_str)
    .transpose()
    .context("Invalid --value JSON")?;

  let meta = record_build(&ctx, &id, value.as_ref()).with_context(|| format!("Failed to record {}", id))?;

  if output.is_json() {
    return emit_json(&meta);
  }

  status(Status::Clean, &format!("Recorded {}", id));
  field("Value hash", short_hash(&meta.value_hash));
  field("Command hash", short_hash(&meta.command_hash));
  Ok(())
}

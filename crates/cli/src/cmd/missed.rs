//! Implementation of the `remake missed` command.

use anyhow::{Context, Result};

use remake_lib::stale::missed;

use super::{ContextArgs, runtime};
use crate::output::{OutputFormat, Status, emit_json, node_list, status};

/// List declared imports that are not available.
pub fn cmd_missed(args: &ContextArgs, output: OutputFormat) -> Result<()> {
  let ctx = args.load()?;

  let rt = runtime()?;
  let missing = rt.block_on(missed(&ctx)).context("Failed to scan imports")?;

  if output.is_json() {
    return emit_json(&serde_json::json!({ "missing": missing }));
  }

  if missing.is_empty() {
    status(Status::Clean, "No missing imports");
  } else {
    node_list(Status::Missing, "missing import", &missing);
  }

  Ok(())
}

//! The staleness predicate.

use tracing::{debug, warn};

use crate::context::BuildContext;
use crate::graph::NodeId;
use crate::store::TargetMeta;

use super::fingerprint::{command_hash, dependency_fingerprint, file_hash};
use super::{StaleError, Trigger};

/// Decide whether a node must be rebuilt.
///
/// Imports are always reported stale; they are processed, never built.
/// A target without an existing value, or without readable metadata, is
/// stale. Otherwise the effective trigger decides which recorded hashes are
/// compared against the current state. Dependency hashes are memoized for the
/// current discovery call.
pub fn should_build(ctx: &BuildContext, id: &NodeId) -> Result<bool, StaleError> {
  if ctx.is_import(id) {
    return Ok(true);
  }
  let Some(decl) = ctx.target(id) else {
    return Err(StaleError::UnknownNode(id.clone()));
  };

  if !ctx.target_exists(id) {
    debug!(node = %id, "no existing value");
    return Ok(true);
  }

  let meta = match ctx.store().read_target_meta(id) {
    Ok(Some(meta)) => meta,
    Ok(None) => {
      debug!(node = %id, "no recorded metadata");
      return Ok(true);
    }
    Err(e) => {
      warn!(node = %id, error = %e, "unreadable metadata, treating target as stale");
      return Ok(true);
    }
  };

  let trigger = ctx.effective_trigger(id);
  let stale = match trigger {
    Trigger::Always => true,
    Trigger::Missing => false,
    _ => {
      (trigger.checks_command() && command_hash(&decl.command) != meta.command_hash)
        || (trigger.checks_depends() && dependency_fingerprint(ctx, decl, true) != meta.depends_hash)
        || (trigger.checks_file() && output_changed(ctx, id, &meta)?)
    }
  };

  debug!(node = %id, %trigger, stale, "target evaluated");
  Ok(stale)
}

/// Whether the stored output no longer matches the recorded value hash.
fn output_changed(ctx: &BuildContext, id: &NodeId, meta: &TargetMeta) -> Result<bool, StaleError> {
  match id {
    NodeId::Object(_) => match ctx.store().value_hash(id) {
      Ok(Some(hash)) => Ok(hash != meta.value_hash),
      Ok(None) => Ok(true),
      Err(e) => {
        warn!(node = %id, error = %e, "unreadable stored value, treating target as stale");
        Ok(true)
      }
    },
    NodeId::File(path) => {
      let recorded = meta.file_stamp.as_ref().map(|stamp| (stamp, &meta.value_hash));
      let (current, _) = file_hash(&ctx.file_path(path), recorded).map_err(|source| StaleError::Hash {
        node: id.clone(),
        source,
      })?;
      Ok(current != meta.value_hash)
    }
  }
}

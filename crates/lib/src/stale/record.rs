//! Recording finished builds.

use tracing::info;

use crate::context::BuildContext;
use crate::graph::NodeId;
use crate::store::{TargetMeta, unix_now};

use super::fingerprint::{command_hash, dependency_fingerprint, file_hash};
use super::StaleError;

/// Record that `id` was just built.
///
/// For object targets, `value` is written to the store first; without one, a
/// value already in the store is recorded. File targets must exist on disk.
/// The dependency fingerprint is computed fresh, bypassing the memo.
pub fn record_build(
  ctx: &BuildContext,
  id: &NodeId,
  value: Option<&serde_json::Value>,
) -> Result<TargetMeta, StaleError> {
  let Some(decl) = ctx.target(id) else {
    return Err(StaleError::UnknownNode(id.clone()));
  };

  let (value_hash, file_stamp) = match id {
    NodeId::Object(_) => {
      let hash = match value {
        Some(value) => ctx.store().write_value(id, value)?,
        None => ctx
          .store()
          .value_hash(id)?
          .ok_or_else(|| StaleError::MissingValue(id.clone()))?,
      };
      (hash, None)
    }
    NodeId::File(path) => {
      let path = ctx.file_path(path);
      if !path.exists() {
        return Err(StaleError::MissingOutput(id.clone()));
      }
      file_hash(&path, None).map_err(|source| StaleError::Hash {
        node: id.clone(),
        source,
      })?
    }
  };

  let meta = TargetMeta {
    id: id.clone(),
    command_hash: command_hash(&decl.command),
    depends_hash: dependency_fingerprint(ctx, decl, false),
    value_hash,
    file_stamp,
    built_at_unix: unix_now(),
  };
  ctx.store().write_target_meta(&meta)?;

  info!(node = %id, "build recorded");
  Ok(meta)
}

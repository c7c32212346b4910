//! Import scanning and processing.

use tracing::{debug, warn};

use crate::context::BuildContext;
use crate::graph::NodeId;
use crate::store::{ImportMeta, unix_now};
use crate::util::hash::hash_json;

use super::fingerprint::file_hash;
use super::parallel::lightly_parallelize;
use super::StaleError;

/// Declared imports that are not available, sorted.
///
/// Object imports must be bound in the environment, file imports must exist
/// under the workspace root.
pub async fn missing_imports(ctx: &BuildContext) -> Result<Vec<NodeId>, StaleError> {
  let imports: Vec<NodeId> = ctx.imports().iter().cloned().collect();
  let worker_ctx = ctx.clone();
  let present = lightly_parallelize(imports, ctx.settings().jobs.preprocess, move |id| {
    Ok(worker_ctx.import_exists(id))
  })
  .await?;

  let mut missing: Vec<NodeId> = present
    .into_iter()
    .filter_map(|(id, exists)| (!exists).then_some(id))
    .collect();
  missing.sort();
  Ok(missing)
}

/// Refresh the recorded hash of every available import.
///
/// Returns the number of imports recorded. Missing imports are skipped with a
/// warning and keep their old entry, but fingerprints ignore it while the
/// import is absent, so their dependents go stale.
pub async fn process_imports(ctx: &BuildContext) -> Result<usize, StaleError> {
  let imports: Vec<NodeId> = ctx.imports().iter().cloned().collect();
  let worker_ctx = ctx.clone();
  let recorded = lightly_parallelize(imports, ctx.settings().jobs.preprocess, move |id| {
    process_import(&worker_ctx, id)
  })
  .await?;

  Ok(recorded.values().filter(|done| **done).count())
}

fn process_import(ctx: &BuildContext, id: &NodeId) -> Result<bool, StaleError> {
  let (hash, file_stamp) = match id {
    NodeId::Object(name) => {
      let Some(value) = ctx.environment().get(name) else {
        warn!(import = %id, "import is not bound, skipping");
        return Ok(false);
      };
      (hash_json(value), None)
    }
    NodeId::File(path) => {
      let path = ctx.file_path(path);
      if !path.exists() {
        warn!(import = %id, "import file does not exist, skipping");
        return Ok(false);
      }
      let previous = match ctx.store().read_import_meta(id) {
        Ok(meta) => meta,
        Err(e) => {
          debug!(import = %id, error = %e, "ignoring unreadable import metadata");
          None
        }
      };
      let recorded = previous
        .as_ref()
        .and_then(|meta| meta.file_stamp.as_ref().map(|stamp| (stamp, &meta.hash)));
      file_hash(&path, recorded).map_err(|source| StaleError::Hash {
        node: id.clone(),
        source,
      })?
    }
  };

  ctx.store().write_import_meta(&ImportMeta {
    id: id.clone(),
    hash,
    file_stamp,
    recorded_at_unix: unix_now(),
  })?;
  Ok(true)
}

//! Hashes compared by the triggers.

use std::path::Path;

use tracing::warn;

use crate::context::BuildContext;
use crate::graph::NodeId;
use crate::manifest::TargetDecl;
use crate::store::FileStamp;
use crate::util::hash::{ContentHash, FileHashError, hash_bytes, hash_path};

/// Collapse whitespace runs so that reformatting a command does not rebuild.
pub fn normalize_command(command: &str) -> String {
  command.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn command_hash(command: &str) -> ContentHash {
  hash_bytes(normalize_command(command).as_bytes())
}

/// Hash a node currently has on record: a target's value hash or an import's
/// processed hash. Unreadable metadata counts as no record, and so does an
/// import that is no longer available.
pub fn recorded_hash(ctx: &BuildContext, id: &NodeId) -> Option<ContentHash> {
  let result = if ctx.is_import(id) {
    if !ctx.import_exists(id) {
      return None;
    }
    ctx.store().read_import_meta(id).map(|meta| meta.map(|m| m.hash))
  } else {
    ctx.store().read_target_meta(id).map(|meta| meta.map(|m| m.value_hash))
  };
  match result {
    Ok(hash) => hash,
    Err(e) => {
      warn!(node = %id, error = %e, "unreadable metadata for dependency");
      None
    }
  }
}

/// Fingerprint over the recorded hashes of a target's direct dependencies.
///
/// With `memoized`, dependency hashes go through the context's memo.
pub fn dependency_fingerprint(ctx: &BuildContext, decl: &TargetDecl, memoized: bool) -> ContentHash {
  let mut deps: Vec<&NodeId> = decl.deps.iter().collect();
  deps.sort();
  deps.dedup();

  let mut lines = String::new();
  for dep in deps {
    let hash = if memoized {
      ctx.memo().get_or_insert_with(dep, || recorded_hash(ctx, dep))
    } else {
      recorded_hash(ctx, dep)
    };
    let shown = hash.as_ref().map(|h| h.0.as_str()).unwrap_or("-");
    lines.push_str(&format!("{}={}\n", dep, shown));
  }
  hash_bytes(lines.as_bytes())
}

/// Current hash of a file or directory, with the stamp it was taken at.
///
/// When `recorded` carries a stamp equal to the current one, the recorded hash
/// is returned without reading the file. Directories carry no stamp and are
/// always rehashed: editing a nested file leaves the directory's own size and
/// mtime untouched.
pub fn file_hash(
  path: &Path,
  recorded: Option<(&FileStamp, &ContentHash)>,
) -> Result<(ContentHash, Option<FileStamp>), FileHashError> {
  let stamp = if path.is_file() { FileStamp::of(path).ok() } else { None };
  if let (Some(current), Some((previous, hash))) = (stamp, recorded)
    && current == *previous
  {
    return Ok((hash.clone(), stamp));
  }
  Ok((hash_path(path)?, stamp))
}

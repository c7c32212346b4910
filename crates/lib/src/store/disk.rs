//! File-backed store implementation.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use crate::graph::NodeId;
use crate::platform::paths::store_dir;
use crate::util::hash::{ContentHash, hash_bytes};

use super::types::{ImportMeta, MetaError, StoreError, TargetMeta};

const TARGETS_DIR: &str = "targets";
const IMPORTS_DIR: &str = "imports";
const VALUES_DIR: &str = "values";

/// Handle to a metadata store directory.
///
/// Cheap to clone; it only holds the root path. Concurrent readers are fine,
/// writes go through a temp file and a rename.
#[derive(Debug, Clone)]
pub struct Store {
  root: PathBuf,
}

impl Store {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  /// Store at the default location (`REMAKE_STORE` or the data directory).
  pub fn default_store() -> Self {
    Self::new(store_dir())
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  fn entry_path(&self, dir: &str, id: &NodeId) -> PathBuf {
    self.root.join(dir).join(format!("{}.json", id.store_key()))
  }

  pub fn read_target_meta(&self, id: &NodeId) -> Result<Option<TargetMeta>, MetaError> {
    let path = self.entry_path(TARGETS_DIR, id);
    let meta: Option<TargetMeta> = read_json(&path)?;
    check_owner(meta, id, &path, |m| &m.id)
  }

  pub fn write_target_meta(&self, meta: &TargetMeta) -> Result<(), StoreError> {
    let path = self.entry_path(TARGETS_DIR, &meta.id);
    let content = serde_json::to_vec_pretty(meta).map_err(|source| StoreError::Serialize {
      id: meta.id.clone(),
      source,
    })?;
    write_atomic(&path, &content)?;
    debug!(node = %meta.id, "target metadata saved");
    Ok(())
  }

  pub fn read_import_meta(&self, id: &NodeId) -> Result<Option<ImportMeta>, MetaError> {
    let path = self.entry_path(IMPORTS_DIR, id);
    let meta: Option<ImportMeta> = read_json(&path)?;
    check_owner(meta, id, &path, |m| &m.id)
  }

  pub fn write_import_meta(&self, meta: &ImportMeta) -> Result<(), StoreError> {
    let path = self.entry_path(IMPORTS_DIR, &meta.id);
    let content = serde_json::to_vec_pretty(meta).map_err(|source| StoreError::Serialize {
      id: meta.id.clone(),
      source,
    })?;
    write_atomic(&path, &content)?;
    debug!(import = %meta.id, "import metadata saved");
    Ok(())
  }

  /// Store the value of an object target and return its hash.
  pub fn write_value(&self, id: &NodeId, value: &serde_json::Value) -> Result<ContentHash, StoreError> {
    let path = self.entry_path(VALUES_DIR, id);
    let content = value.to_string().into_bytes();
    write_atomic(&path, &content)?;
    Ok(hash_bytes(&content))
  }

  pub fn read_value(&self, id: &NodeId) -> Result<Option<serde_json::Value>, MetaError> {
    read_json(&self.entry_path(VALUES_DIR, id))
  }

  pub fn has_value(&self, id: &NodeId) -> bool {
    self.entry_path(VALUES_DIR, id).is_file()
  }

  /// Hash of the stored value bytes as they are on disk right now.
  pub fn value_hash(&self, id: &NodeId) -> Result<Option<ContentHash>, MetaError> {
    let path = self.entry_path(VALUES_DIR, id);
    match fs::read(&path) {
      Ok(bytes) => Ok(Some(hash_bytes(&bytes))),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
      Err(source) => Err(MetaError::Read { path, source }),
    }
  }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, MetaError> {
  let content = match fs::read_to_string(path) {
    Ok(content) => content,
    Err(e) if e.kind() == io::ErrorKind::NotFound => {
      trace!(path = %path.display(), "store entry not found");
      return Ok(None);
    }
    Err(source) => {
      return Err(MetaError::Read {
        path: path.to_path_buf(),
        source,
      });
    }
  };

  serde_json::from_str(&content).map(Some).map_err(|source| MetaError::Parse {
    path: path.to_path_buf(),
    source,
  })
}

fn check_owner<T>(
  entry: Option<T>,
  expected: &NodeId,
  path: &Path,
  owner: impl Fn(&T) -> &NodeId,
) -> Result<Option<T>, MetaError> {
  match entry {
    Some(e) if owner(&e) != expected => Err(MetaError::Mismatch {
      path: path.to_path_buf(),
      expected: expected.clone(),
      found: owner(&e).clone(),
    }),
    other => Ok(other),
  }
}

/// Write atomically: write to temp file, then rename
fn write_atomic(path: &Path, content: &[u8]) -> Result<(), StoreError> {
  if let Some(dir) = path.parent() {
    fs::create_dir_all(dir).map_err(|source| StoreError::CreateDir {
      path: dir.to_path_buf(),
      source,
    })?;
  }

  let temp_path = path.with_extension("json.tmp");
  fs::write(&temp_path, content).map_err(|source| StoreError::Write {
    path: temp_path.clone(),
    source,
  })?;
  fs::rename(&temp_path, path).map_err(|source| StoreError::Write {
    path: path.to_path_buf(),
    source,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::FileStamp;
  use crate::util::hash::hash_json;
  use serde_json::json;
  use tempfile::TempDir;

  fn target_meta(id: &NodeId) -> TargetMeta {
    TargetMeta {
      id: id.clone(),
      command_hash: hash_bytes(b"cmd"),
      depends_hash: hash_bytes(b"deps"),
      value_hash: hash_bytes(b"value"),
      file_stamp: None,
      built_at_unix: 1_700_000_000,
    }
  }

  #[test]
  fn target_meta_save_and_load() {
    let temp = TempDir::new().unwrap();
    let store = Store::new(temp.path());
    let id = NodeId::object("model");

    assert!(store.read_target_meta(&id).unwrap().is_none());

    let meta = target_meta(&id);
    store.write_target_meta(&meta).unwrap();
    assert_eq!(store.read_target_meta(&id).unwrap(), Some(meta));
  }

  #[test]
  fn import_meta_save_and_load() {
    let temp = TempDir::new().unwrap();
    let store = Store::new(temp.path());
    let id = NodeId::file("data/raw.csv");

    let meta = ImportMeta {
      id: id.clone(),
      hash: hash_bytes(b"raw"),
      file_stamp: Some(FileStamp {
        size: 3,
        mtime_secs: 10,
        mtime_nanos: 5,
      }),
      recorded_at_unix: 1,
    };
    store.write_import_meta(&meta).unwrap();
    assert_eq!(store.read_import_meta(&id).unwrap(), Some(meta));
    // Import and target entries live apart
    assert!(store.read_target_meta(&id).unwrap().is_none());
  }

  #[test]
  fn corrupt_meta_is_a_parse_error() {
    let temp = TempDir::new().unwrap();
    let store = Store::new(temp.path());
    let id = NodeId::object("model");

    let path = store.entry_path(TARGETS_DIR, &id);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, "{ not json").unwrap();

    assert!(matches!(store.read_target_meta(&id), Err(MetaError::Parse { .. })));
  }

  #[test]
  fn meta_of_another_node_is_rejected() {
    let temp = TempDir::new().unwrap();
    let store = Store::new(temp.path());
    let id = NodeId::object("model");
    let other = NodeId::object("other");

    // Simulate a key collision by copying another node's entry into place
    store.write_target_meta(&target_meta(&other)).unwrap();
    fs::copy(
      store.entry_path(TARGETS_DIR, &other),
      store.entry_path(TARGETS_DIR, &id),
    )
    .unwrap();

    assert!(matches!(
      store.read_target_meta(&id),
      Err(MetaError::Mismatch { .. })
    ));
  }

  #[test]
  fn value_hash_matches_written_value() {
    let temp = TempDir::new().unwrap();
    let store = Store::new(temp.path());
    let id = NodeId::object("summary");
    let value = json!({"rows": 3, "mean": 1.5});

    assert!(!store.has_value(&id));
    assert_eq!(store.value_hash(&id).unwrap(), None);

    let hash = store.write_value(&id, &value).unwrap();
    assert!(store.has_value(&id));
    assert_eq!(hash, hash_json(&value));
    assert_eq!(store.value_hash(&id).unwrap(), Some(hash));
    assert_eq!(store.read_value(&id).unwrap(), Some(value));
  }

  #[test]
  fn tampered_value_changes_hash() {
    let temp = TempDir::new().unwrap();
    let store = Store::new(temp.path());
    let id = NodeId::object("summary");

    let hash = store.write_value(&id, &json!([1, 2, 3])).unwrap();
    fs::write(store.entry_path(VALUES_DIR, &id), "[1,2,4]").unwrap();

    assert_ne!(store.value_hash(&id).unwrap(), Some(hash));
  }
}

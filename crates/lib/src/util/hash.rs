//! Hashing utilities for staleness checks and store keys.
//!
//! This module provides:
//! - `ObjectHash`: A truncated 20-character hash used for store file names
//! - `ContentHash`: A full 64-character hash recorded in target metadata
//! - `hash_path()`: File or directory hashing, whichever the path is
//! - `hash_directory()`: Deterministic directory hashing
//! - `hash_file()`: Single file hashing
//! - `hash_bytes()` / `hash_json()`: In-memory hashing

use std::fs;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::consts::OBJ_HASH_PREFIX_LEN;

/// A truncated hash identifying a store entry.
///
/// The hash is a 20-character truncated SHA-256, which keeps store file names
/// short and free of path separators.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectHash(pub String);

impl std::fmt::Display for ObjectHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl ObjectHash {
  /// Truncated hash of arbitrary bytes.
  pub fn of(data: &[u8]) -> Self {
    let full = hash_bytes(data);
    ObjectHash(full.0[..OBJ_HASH_PREFIX_LEN].to_string())
  }
}

/// A full 64-character SHA256 hash.
///
/// Recorded in target and import metadata and compared by the staleness
/// triggers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl std::fmt::Display for ContentHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Error while hashing something on disk.
#[derive(Debug, thiserror::Error)]
pub enum FileHashError {
  #[error("failed to walk directory: {message}")]
  WalkDir { message: String },

  #[error("failed to read file {path}: {message}")]
  ReadFile { path: String, message: String },

  #[error("failed to read symlink {path}: {message}")]
  ReadSymlink { path: String, message: String },
}

/// Hash a path that may be either a regular file or a directory.
pub fn hash_path(path: &Path) -> Result<ContentHash, FileHashError> {
  if path.is_dir() {
    hash_directory(path, &[])
  } else {
    hash_file(path)
  }
}

/// Compute a deterministic hash of a directory's contents.
///
/// The hash includes:
/// - File contents (not metadata like timestamps or permissions)
/// - Directory structure
/// - Symlink targets
///
/// Entries are sorted by path for determinism.
///
/// # Arguments
///
/// * `path` - The directory to hash
/// * `exclude` - List of file/directory names to skip
pub fn hash_directory(path: &Path, exclude: &[&str]) -> Result<ContentHash, FileHashError> {
  let mut entries: Vec<(String, String)> = Vec::new();

  let walker = WalkDir::new(path).sort_by_file_name().into_iter().filter_entry(|e| {
    e.file_name()
      .to_str()
      .map(|name| !exclude.contains(&name))
      .unwrap_or(true)
  });

  for entry in walker {
    let entry = entry.map_err(|e| FileHashError::WalkDir { message: e.to_string() })?;
    let entry_path = entry.path();

    let rel_path = entry_path
      .strip_prefix(path)
      .unwrap_or(entry_path)
      .to_string_lossy()
      .to_string();

    // Skip the root directory itself
    if rel_path.is_empty() {
      continue;
    }

    let file_type = entry.file_type();
    let entry_hash = if file_type.is_file() {
      let content_hash = hash_file(entry_path)?;
      format!("F:{}:{}", rel_path, content_hash.0)
    } else if file_type.is_dir() {
      format!("D:{}", rel_path)
    } else if file_type.is_symlink() {
      let target = fs::read_link(entry_path).map_err(|e| FileHashError::ReadSymlink {
        path: entry_path.display().to_string(),
        message: e.to_string(),
      })?;
      let target_hash = hash_bytes(target.to_string_lossy().as_bytes());
      format!("L:{}:{}", rel_path, target_hash.0)
    } else {
      // Sockets, devices and the like carry no content
      continue;
    };

    entries.push((rel_path, entry_hash));
  }

  entries.sort_by(|a, b| a.0.cmp(&b.0));

  let mut hasher = Sha256::new();
  for (_, entry_hash) in entries {
    hasher.update(entry_hash.as_bytes());
    hasher.update(b"\n");
  }

  Ok(ContentHash(hex::encode(hasher.finalize())))
}

/// Hash a file's contents.
///
/// Returns the full 64-character SHA256 hash of the file.
pub fn hash_file(path: &Path) -> Result<ContentHash, FileHashError> {
  let mut file = fs::File::open(path).map_err(|e| FileHashError::ReadFile {
    path: path.display().to_string(),
    message: e.to_string(),
  })?;

  let mut hasher = Sha256::new();
  let mut buffer = [0u8; 8192];

  loop {
    let bytes_read = file.read(&mut buffer).map_err(|e| FileHashError::ReadFile {
      path: path.display().to_string(),
      message: e.to_string(),
    })?;
    if bytes_read == 0 {
      break;
    }
    hasher.update(&buffer[..bytes_read]);
  }

  Ok(ContentHash(hex::encode(hasher.finalize())))
}

/// Hash arbitrary bytes.
///
/// Returns the full 64-character SHA256 hash.
pub fn hash_bytes(data: &[u8]) -> ContentHash {
  let mut hasher = Sha256::new();
  hasher.update(data);
  ContentHash(hex::encode(hasher.finalize()))
}

/// Hash a JSON value through its compact serialization.
///
/// `serde_json` keeps object keys sorted (no `preserve_order`), so equal
/// values always serialize, and therefore hash, identically.
pub fn hash_json(value: &serde_json::Value) -> ContentHash {
  hash_bytes(value.to_string().as_bytes())
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs;
  use std::path::Path;
  use tempfile::tempdir;

  /// Cross-platform symlink creation helper
  fn create_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
      std::os::unix::fs::symlink(target, link)
    }
    #[cfg(windows)]
    {
      if target.is_dir() {
        std::os::windows::fs::symlink_dir(target, link)
      } else {
        std::os::windows::fs::symlink_file(target, link)
      }
    }
  }

  #[test]
  fn hash_is_deterministic() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("a.txt"), "content a").unwrap();
    fs::write(temp.path().join("b.txt"), "content b").unwrap();

    let hash1 = hash_directory(temp.path(), &[]).unwrap();
    let hash2 = hash_directory(temp.path(), &[]).unwrap();

    assert_eq!(hash1, hash2);
    assert_eq!(hash1.0.len(), 64);
  }

  #[test]
  fn directory_hash_changes_with_content() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("file.txt"), "original").unwrap();
    let hash1 = hash_directory(temp.path(), &[]).unwrap();

    fs::write(temp.path().join("file.txt"), "modified").unwrap();
    let hash2 = hash_directory(temp.path(), &[]).unwrap();

    assert_ne!(hash1, hash2);
  }

  #[test]
  fn directory_hash_includes_symlinks() {
    let temp = tempdir().unwrap();
    let file = temp.path().join("target.txt");
    fs::write(&file, "target content").unwrap();
    let before = hash_directory(temp.path(), &[]).unwrap();

    create_symlink(&file, &temp.path().join("link")).unwrap();
    let after = hash_directory(temp.path(), &[]).unwrap();

    assert_ne!(before, after);
  }

  #[test]
  fn directory_hash_respects_exclusions() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("file.txt"), "content").unwrap();
    let hash1 = hash_directory(temp.path(), &[]).unwrap();

    fs::create_dir(temp.path().join("tmp")).unwrap();
    fs::write(temp.path().join("tmp/scratch"), "temp").unwrap();
    let hash2 = hash_directory(temp.path(), &["tmp"]).unwrap();

    assert_eq!(hash1, hash2);
  }

  #[test]
  fn hash_path_dispatches_on_kind() {
    let temp = tempdir().unwrap();
    let file_path = temp.path().join("test.txt");
    fs::write(&file_path, "hello world").unwrap();

    assert_eq!(hash_path(&file_path).unwrap(), hash_file(&file_path).unwrap());
    assert_eq!(
      hash_path(temp.path()).unwrap(),
      hash_directory(temp.path(), &[]).unwrap()
    );
  }

  #[test]
  fn hash_file_reports_missing_path() {
    let temp = tempdir().unwrap();
    let err = hash_file(&temp.path().join("absent")).unwrap_err();
    assert!(matches!(err, FileHashError::ReadFile { .. }));
  }

  #[test]
  fn object_hash_is_truncated_prefix() {
    let short = ObjectHash::of(b"abc");
    let full = hash_bytes(b"abc");
    assert_eq!(short.0.len(), 20);
    assert!(full.0.starts_with(&short.0));
  }

  #[test]
  fn json_hash_ignores_key_order() {
    let a: serde_json::Value = serde_json::from_str(r#"{"x": 1, "y": [1, 2]}"#).unwrap();
    let b: serde_json::Value = serde_json::from_str(r#"{"y": [1, 2], "x": 1}"#).unwrap();
    assert_eq!(hash_json(&a), hash_json(&b));
    assert_ne!(hash_json(&a), hash_json(&serde_json::json!({"x": 2, "y": [1, 2]})));
  }
}

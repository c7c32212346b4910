use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graph::NodeId;
use crate::util::hash::ContentHash;

/// What was recorded when a target was last built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetMeta {
  /// The target this entry belongs to.
  pub id: NodeId,
  /// Hash of the normalized command text.
  pub command_hash: ContentHash,
  /// Fingerprint over the recorded hashes of the direct dependencies.
  pub depends_hash: ContentHash,
  /// Hash of the produced output (stored value or file contents).
  pub value_hash: ContentHash,
  /// Modification stamp of a file output, used to skip rehashing.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub file_stamp: Option<FileStamp>,
  pub built_at_unix: u64,
}

/// What was recorded when an import was last processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportMeta {
  pub id: NodeId,
  pub hash: ContentHash,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub file_stamp: Option<FileStamp>,
  pub recorded_at_unix: u64,
}

/// Size and modification time of a file.
///
/// When both still match, the recorded hash of the file is trusted instead of
/// reading the file again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStamp {
  pub size: u64,
  pub mtime_secs: u64,
  pub mtime_nanos: u32,
}

impl FileStamp {
  /// Read the current stamp of a path.
  pub fn of(path: &Path) -> io::Result<Self> {
    let metadata = std::fs::metadata(path)?;
    let modified = metadata.modified()?.duration_since(UNIX_EPOCH).unwrap_or_default();
    Ok(Self {
      size: metadata.len(),
      mtime_secs: modified.as_secs(),
      mtime_nanos: modified.subsec_nanos(),
    })
  }
}

pub(crate) fn unix_now() -> u64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .unwrap_or_default()
    .as_secs()
}

/// Errors writing to the store.
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("failed to create store directory {path}: {source}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to serialize store entry for {id}: {source}")]
  Serialize {
    id: NodeId,
    #[source]
    source: serde_json::Error,
  },
}

/// Errors reading recorded metadata or values.
///
/// The staleness predicate absorbs these: a target whose metadata cannot be
/// read is treated as stale.
#[derive(Debug, Error)]
pub enum MetaError {
  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("corrupt store entry {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("store entry {path} belongs to {found}, expected {expected}")]
  Mismatch {
    path: PathBuf,
    expected: NodeId,
    found: NodeId,
  },
}

//! Node identities.
//!
//! A node is either an object (a value held in the store or bound in the
//! environment) or a file on disk. Files are displayed, serialized and sorted
//! with surrounding single quotes, so `'data/raw.csv'` is a file and
//! `raw_data` is an object.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::hash::ObjectHash;

/// Identity of a target or import in the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum NodeId {
  /// An object value, identified by name.
  Object(String),
  /// A file, identified by its path relative to the workspace root.
  File(String),
}

/// Errors parsing a node identity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeIdError {
  #[error("node id must not be empty")]
  Empty,

  #[error("file node {0:?} has an empty path")]
  EmptyPath(String),
}

impl NodeId {
  pub fn object(name: impl Into<String>) -> Self {
    NodeId::Object(name.into())
  }

  pub fn file(path: impl Into<String>) -> Self {
    NodeId::File(path.into())
  }

  /// The bare name or path, without quoting.
  pub fn name(&self) -> &str {
    match self {
      NodeId::Object(name) | NodeId::File(name) => name,
    }
  }

  pub fn is_file(&self) -> bool {
    matches!(self, NodeId::File(_))
  }

  /// Key under which the store keeps this node's entries.
  pub fn store_key(&self) -> ObjectHash {
    ObjectHash::of(self.to_string().as_bytes())
  }

  fn sort_key(&self) -> Cow<'_, str> {
    match self {
      NodeId::Object(name) => Cow::Borrowed(name),
      NodeId::File(path) => Cow::Owned(format!("'{}'", path)),
    }
  }
}

impl fmt::Display for NodeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      NodeId::Object(name) => write!(f, "{}", name),
      NodeId::File(path) => write!(f, "'{}'", path),
    }
  }
}

impl FromStr for NodeId {
  type Err = NodeIdError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    if s.is_empty() {
      return Err(NodeIdError::Empty);
    }
    if s.len() >= 2 && s.starts_with('\'') && s.ends_with('\'') {
      let path = &s[1..s.len() - 1];
      if path.is_empty() {
        return Err(NodeIdError::EmptyPath(s.to_string()));
      }
      return Ok(NodeId::File(path.to_string()));
    }
    Ok(NodeId::Object(s.to_string()))
  }
}

impl TryFrom<String> for NodeId {
  type Error = NodeIdError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

impl From<NodeId> for String {
  fn from(id: NodeId) -> Self {
    id.to_string()
  }
}

impl Ord for NodeId {
  fn cmp(&self, other: &Self) -> Ordering {
    self
      .sort_key()
      .cmp(&other.sort_key())
      .then_with(|| self.is_file().cmp(&other.is_file()))
  }
}

impl PartialOrd for NodeId {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

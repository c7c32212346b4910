//! Context document types.
//!
//! # Example
//!
//! ```json
//! {
//!   "targets": [
//!     { "id": "summary", "command": "summarize(data)", "deps": ["data"] },
//!     { "id": "'report.html'", "command": "render(summary)", "deps": ["summary"], "trigger": "always" }
//!   ],
//!   "imports": ["'raw.csv'", "threshold"],
//!   "environment": { "threshold": 0.5 },
//!   "prework": ["mkdir -p out"]
//! }
//! ```
//!
//! A raw plan (`[{"target": ..., "command": ...}]`) parses as well, so that it
//! can be rejected with a precise error instead of a generic parse failure.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graph::NodeId;
use crate::stale::Trigger;

/// A buildable target of the resolved context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetDecl {
  pub id: NodeId,
  /// Command text. Only hashed by the command trigger, never executed here.
  #[serde(default)]
  pub command: String,
  /// Direct dependencies, targets or imports.
  #[serde(default)]
  pub deps: Vec<NodeId>,
  /// Overrides the context-wide trigger for this target alone.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub trigger: Option<Trigger>,
}

/// The resolved context, ready for staleness discovery.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
  #[serde(default)]
  pub targets: Vec<TargetDecl>,
  #[serde(default)]
  pub imports: Vec<NodeId>,
  /// Bound values of object imports, keyed by name.
  #[serde(default)]
  pub environment: BTreeMap<String, serde_json::Value>,
  /// Shell steps run in the workspace root before discovery.
  #[serde(default)]
  pub prework: Vec<String>,
}

/// One row of an unresolved plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRow {
  pub target: String,
  pub command: String,
}

/// Anything a context file may hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextDocument {
  Resolved(Manifest),
  Plan(Vec<PlanRow>),
}

impl ContextDocument {
  /// Short name of the document kind, for error messages.
  pub fn kind(&self) -> &'static str {
    match self {
      ContextDocument::Resolved(_) => "resolved context",
      ContextDocument::Plan(_) => "plan",
    }
  }
}

/// Errors loading a context document from disk.
#[derive(Debug, Error)]
pub enum DocumentError {
  #[error("failed to read context file {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse context file {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
}

/// Read and parse a context document.
pub fn load_document(path: &Path) -> Result<ContextDocument, DocumentError> {
  let content = fs::read_to_string(path).map_err(|source| DocumentError::Read {
    path: path.to_path_buf(),
    source,
  })?;
  serde_json::from_str(&content).map_err(|source| DocumentError::Parse {
    path: path.to_path_buf(),
    source,
  })
}

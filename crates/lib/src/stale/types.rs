//! Errors raised by staleness discovery.

use thiserror::Error;

use crate::context::ContextError;
use crate::graph::NodeId;
use crate::store::{MetaError, StoreError};
use crate::util::hash::FileHashError;

/// Errors that abort a discovery call.
///
/// Callers must treat any of these as "state unknown", never as "nothing
/// stale": no partial result is returned alongside an error.
#[derive(Debug, Error)]
pub enum StaleError {
  /// A raw plan was supplied where a resolved context is required.
  #[error("expected a resolved context, got a {found}")]
  ConfigType { found: &'static str },

  #[error("invalid context: {0}")]
  Context(#[from] ContextError),

  /// A node id that the context does not declare.
  #[error("unknown node: {0}")]
  UnknownNode(NodeId),

  /// An evaluation worker panicked or was cancelled.
  #[error("evaluation of {node} failed: {message}")]
  Evaluation { node: NodeId, message: String },

  #[error("failed to hash {node}: {source}")]
  Hash {
    node: NodeId,
    #[source]
    source: FileHashError,
  },

  /// A file target was recorded but its output is not on disk.
  #[error("output of {0} does not exist")]
  MissingOutput(NodeId),

  /// An object target was recorded without a value.
  #[error("no value supplied for object target {0}")]
  MissingValue(NodeId),

  #[error("prework step {step:?} failed with exit code {code:?}")]
  PreworkFailed { step: String, code: Option<i32> },

  #[error("failed to start prework step {step:?}: {source}")]
  PreworkSpawn {
    step: String,
    #[source]
    source: std::io::Error,
  },

  #[error("store error: {0}")]
  Store(#[from] StoreError),

  /// A store entry exists but could not be read back.
  #[error("unreadable store entry: {0}")]
  Meta(#[from] MetaError),
}

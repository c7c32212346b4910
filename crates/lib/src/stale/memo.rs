//! Call-scoped hash memo.
//!
//! Dependents look up the recorded hash of each of their dependencies. Within
//! one discovery call the same dependency is shared by many siblings, so its
//! hash is read once and memoized here. The memo must never outlive the call
//! that filled it: [`HashMemo::scope`] hands out a guard that clears it on
//! entry and again when dropped, whatever the exit path.

use dashmap::DashMap;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{trace, warn};

use crate::graph::NodeId;
use crate::util::hash::ContentHash;

/// Concurrent map from node to its recorded hash.
///
/// Reads and first writes for distinct keys do not contend. Two workers racing
/// on the same key may both compute it; the last write wins, which is harmless
/// since the value is deterministic within a call.
#[derive(Debug, Default)]
pub struct HashMemo {
  entries: DashMap<NodeId, ContentHash>,
  scope: Mutex<()>,
}

impl HashMemo {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, id: &NodeId) -> Option<ContentHash> {
    self.entries.get(id).map(|entry| entry.value().clone())
  }

  pub fn insert(&self, id: NodeId, hash: ContentHash) {
    self.entries.insert(id, hash);
  }

  /// Memoized lookup. `None` results are not memoized.
  pub fn get_or_insert_with(&self, id: &NodeId, compute: impl FnOnce() -> Option<ContentHash>) -> Option<ContentHash> {
    if let Some(hash) = self.get(id) {
      trace!(node = %id, "hash memo hit");
      return Some(hash);
    }
    let hash = compute()?;
    self.insert(id.clone(), hash.clone());
    Some(hash)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Enter a discovery scope.
  ///
  /// Waits for any other scope on the same memo to end, so concurrent calls on
  /// one context never see each other's entries.
  pub async fn scope(&self) -> MemoScope<'_> {
    let lock = self.scope.lock().await;
    if !self.entries.is_empty() {
      warn!(entries = self.entries.len(), "hash memo was not empty on entry, clearing");
      self.entries.clear();
    }
    MemoScope { memo: self, _lock: lock }
  }
}

/// Guard for one discovery call. Clears the memo on drop.
#[derive(Debug)]
pub struct MemoScope<'a> {
  memo: &'a HashMemo,
  _lock: MutexGuard<'a, ()>,
}

impl Drop for MemoScope<'_> {
  fn drop(&mut self) {
    self.memo.entries.clear();
  }
}

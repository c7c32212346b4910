//! Dependency DAG over targets and imports.
//!
//! Edges point from a dependency to its dependent, so "`a` depends on `b`" is
//! stored as the edge `b -> a`. Under this orientation:
//! - a leaf (a node with no unresolved dependencies) has no incoming edges;
//! - downstream nodes are reached by following outgoing edges.
//!
//! The graph is backed by a `StableDiGraph`, so removing vertices from a
//! working copy never invalidates the indices of the remaining ones.

use std::collections::{BTreeSet, HashMap};

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{Dfs, EdgeRef, IntoEdgeReferences};
use thiserror::Error;

use super::node::NodeId;

/// Errors raised while building or querying a dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
  /// The same node was added twice.
  #[error("duplicate node: {0}")]
  DuplicateNode(NodeId),

  /// An edge referenced a node that is not part of the graph.
  #[error("unknown node: {0}")]
  UnknownNode(NodeId),

  /// Cycle detected in the dependency graph.
  #[error("dependency cycle detected at {0}")]
  CycleDetected(NodeId),
}

/// A directed acyclic graph of node dependencies.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
  graph: StableDiGraph<NodeId, ()>,
  indices: HashMap<NodeId, NodeIndex>,
}

impl DependencyGraph {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add a node, failing if it is already present.
  pub fn add_node(&mut self, id: NodeId) -> Result<(), GraphError> {
    if self.indices.contains_key(&id) {
      return Err(GraphError::DuplicateNode(id));
    }
    let idx = self.graph.add_node(id.clone());
    self.indices.insert(id, idx);
    Ok(())
  }

  /// Record that `dependent` depends on `dependency`.
  ///
  /// Both nodes must already exist. Adding the same edge twice is a no-op.
  pub fn add_dependency(&mut self, dependent: &NodeId, dependency: &NodeId) -> Result<(), GraphError> {
    let to = self.index_of(dependent)?;
    let from = self.index_of(dependency)?;
    self.graph.update_edge(from, to, ());
    Ok(())
  }

  fn index_of(&self, id: &NodeId) -> Result<NodeIndex, GraphError> {
    self
      .indices
      .get(id)
      .copied()
      .ok_or_else(|| GraphError::UnknownNode(id.clone()))
  }

  /// Verify that the graph is acyclic.
  pub fn verify_acyclic(&self) -> Result<(), GraphError> {
    toposort(&self.graph, None).map_err(|cycle| GraphError::CycleDetected(self.graph[cycle.node_id()].clone()))?;
    Ok(())
  }

  /// Nodes in an order where dependencies come before dependents.
  pub fn topological_order(&self) -> Result<Vec<NodeId>, GraphError> {
    let sorted =
      toposort(&self.graph, None).map_err(|cycle| GraphError::CycleDetected(self.graph[cycle.node_id()].clone()))?;
    Ok(sorted.into_iter().map(|idx| self.graph[idx].clone()).collect())
  }

  pub fn contains(&self, id: &NodeId) -> bool {
    self.indices.contains_key(id)
  }

  pub fn node_count(&self) -> usize {
    self.indices.len()
  }

  pub fn is_empty(&self) -> bool {
    self.indices.is_empty()
  }

  /// Nodes with no remaining dependencies, sorted.
  pub fn leaves(&self) -> Vec<NodeId> {
    let mut leaves: Vec<NodeId> = self
      .graph
      .externals(Direction::Incoming)
      .map(|idx| self.graph[idx].clone())
      .collect();
    leaves.sort();
    leaves
  }

  /// Remove nodes (and their edges) from the graph.
  ///
  /// Ids that are not present are ignored.
  pub fn remove_nodes<'a>(&mut self, ids: impl IntoIterator<Item = &'a NodeId>) {
    for id in ids {
      if let Some(idx) = self.indices.remove(id) {
        self.graph.remove_node(idx);
      }
    }
  }

  /// Direct dependents of a node, sorted. Empty for unknown ids.
  pub fn dependents(&self, id: &NodeId) -> Vec<NodeId> {
    let Some(&idx) = self.indices.get(id) else {
      return Vec::new();
    };
    let mut out: Vec<NodeId> = self
      .graph
      .neighbors_directed(idx, Direction::Outgoing)
      .map(|n| self.graph[n].clone())
      .collect();
    out.sort();
    out.dedup();
    out
  }

  /// Every node reachable downstream from `from`, including the start nodes.
  ///
  /// Start nodes missing from the graph are skipped.
  pub fn downstream<'a>(&self, from: impl IntoIterator<Item = &'a NodeId>) -> BTreeSet<NodeId> {
    let mut reached = BTreeSet::new();
    let mut dfs = Dfs::empty(&self.graph);

    for id in from {
      let Some(&start) = self.indices.get(id) else {
        continue;
      };
      dfs.move_to(start);
      while let Some(idx) = dfs.next(&self.graph) {
        reached.insert(self.graph[idx].clone());
      }
    }

    reached
  }

  /// The induced subgraph on the nodes accepted by `keep`.
  pub fn subgraph(&self, keep: impl Fn(&NodeId) -> bool) -> DependencyGraph {
    let mut sub = DependencyGraph::new();
    for idx in self.graph.node_indices() {
      let id = &self.graph[idx];
      if keep(id) {
        let new_idx = sub.graph.add_node(id.clone());
        sub.indices.insert(id.clone(), new_idx);
      }
    }

    for edge in self.graph.edge_references() {
      let from = &self.graph[edge.source()];
      let to = &self.graph[edge.target()];
      if let (Some(&a), Some(&b)) = (sub.indices.get(from), sub.indices.get(to)) {
        sub.graph.update_edge(a, b, ());
      }
    }

    sub
  }
}

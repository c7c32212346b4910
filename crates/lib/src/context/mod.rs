//! The resolved build context.
//!
//! A [`BuildContext`] bundles everything a discovery call reads: the full
//! dependency graph, the schedule (targets only), declarations, the import
//! environment, the metadata store and the settings. It is read-only and cheap
//! to clone, so workers on blocking threads each get their own handle.

mod settings;

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::graph::{DependencyGraph, GraphError, NodeId};
use crate::manifest::{ContextDocument, Manifest, TargetDecl};
use crate::stale::{HashMemo, StaleError, Trigger};
use crate::store::Store;

pub use settings::{Jobs, Settings};

/// Errors in the content of a resolved context.
#[derive(Debug, Error)]
pub enum ContextError {
  #[error("target {0} is declared more than once")]
  DuplicateTarget(NodeId),

  #[error("import {0} is declared more than once")]
  DuplicateImport(NodeId),

  #[error("{0} is declared both as a target and as an import")]
  ImportClash(NodeId),

  #[error("target {target} depends on undeclared node {dependency}")]
  UnknownDependency { target: NodeId, dependency: NodeId },

  #[error("dependency cycle detected at {0}")]
  Cycle(NodeId),

  #[error("graph error: {0}")]
  Graph(#[from] GraphError),
}

/// Read-only bundle a discovery call works on.
#[derive(Debug, Clone)]
pub struct BuildContext {
  graph: Arc<DependencyGraph>,
  schedule: Arc<DependencyGraph>,
  targets: Arc<BTreeMap<NodeId, TargetDecl>>,
  imports: Arc<BTreeSet<NodeId>>,
  environment: Arc<BTreeMap<String, serde_json::Value>>,
  prework: Arc<Vec<String>>,
  store: Store,
  settings: Settings,
  memo: Arc<HashMemo>,
}

impl BuildContext {
  /// Build a context from a parsed document.
  ///
  /// Only resolved contexts are accepted; a raw plan fails with
  /// [`StaleError::ConfigType`].
  pub fn from_document(document: ContextDocument, settings: Settings) -> Result<Self, StaleError> {
    match document {
      ContextDocument::Resolved(manifest) => Ok(Self::from_manifest(manifest, settings)?),
      other => Err(StaleError::ConfigType { found: other.kind() }),
    }
  }

  /// Validate a resolved context and build its graphs.
  pub fn from_manifest(manifest: Manifest, settings: Settings) -> Result<Self, ContextError> {
    let Manifest {
      targets,
      imports,
      environment,
      prework,
    } = manifest;

    let mut target_map = BTreeMap::new();
    for decl in targets {
      if target_map.contains_key(&decl.id) {
        return Err(ContextError::DuplicateTarget(decl.id));
      }
      target_map.insert(decl.id.clone(), decl);
    }

    let mut import_set = BTreeSet::new();
    for id in imports {
      if target_map.contains_key(&id) {
        return Err(ContextError::ImportClash(id));
      }
      if !import_set.insert(id.clone()) {
        return Err(ContextError::DuplicateImport(id));
      }
    }

    let mut graph = DependencyGraph::new();
    for id in target_map.keys().chain(import_set.iter()) {
      graph.add_node(id.clone())?;
    }
    for decl in target_map.values() {
      for dep in &decl.deps {
        if !graph.contains(dep) {
          return Err(ContextError::UnknownDependency {
            target: decl.id.clone(),
            dependency: dep.clone(),
          });
        }
        graph.add_dependency(&decl.id, dep)?;
      }
    }

    graph.verify_acyclic().map_err(|e| match e {
      GraphError::CycleDetected(id) => ContextError::Cycle(id),
      other => ContextError::Graph(other),
    })?;

    let schedule = graph.subgraph(|id| target_map.contains_key(id));

    debug!(
      targets = target_map.len(),
      imports = import_set.len(),
      prework = prework.len(),
      "context resolved"
    );

    Ok(Self {
      graph: Arc::new(graph),
      schedule: Arc::new(schedule),
      targets: Arc::new(target_map),
      imports: Arc::new(import_set),
      environment: Arc::new(environment),
      prework: Arc::new(prework),
      store: Store::new(settings.store_dir.clone()),
      settings,
      memo: Arc::new(HashMemo::new()),
    })
  }

  /// Full graph over targets and imports.
  pub fn graph(&self) -> &DependencyGraph {
    &self.graph
  }

  /// Build-order graph over targets only.
  pub fn schedule(&self) -> &DependencyGraph {
    &self.schedule
  }

  pub fn targets(&self) -> impl Iterator<Item = &TargetDecl> {
    self.targets.values()
  }

  pub fn target(&self, id: &NodeId) -> Option<&TargetDecl> {
    self.targets.get(id)
  }

  pub fn imports(&self) -> &BTreeSet<NodeId> {
    &self.imports
  }

  pub fn is_import(&self, id: &NodeId) -> bool {
    self.imports.contains(id)
  }

  pub fn environment(&self) -> &BTreeMap<String, serde_json::Value> {
    &self.environment
  }

  pub fn prework(&self) -> &[String] {
    &self.prework
  }

  pub fn store(&self) -> &Store {
    &self.store
  }

  pub fn settings(&self) -> &Settings {
    &self.settings
  }

  pub fn memo(&self) -> &HashMemo {
    &self.memo
  }

  /// Trigger governing a target: its own if set, else the context default.
  pub fn effective_trigger(&self, id: &NodeId) -> Trigger {
    self
      .targets
      .get(id)
      .and_then(|decl| decl.trigger)
      .unwrap_or(self.settings.trigger)
  }

  /// Location of a file node under the workspace root.
  pub fn file_path(&self, path: &str) -> PathBuf {
    self.settings.workspace_root.join(path)
  }

  /// Whether a target currently has a value: a stored value for objects, the
  /// file on disk for files.
  pub fn target_exists(&self, id: &NodeId) -> bool {
    match id {
      NodeId::Object(_) => self.store.has_value(id),
      NodeId::File(path) => self.file_path(path).exists(),
    }
  }

  /// Whether an import is available: bound in the environment for objects,
  /// present on disk for files.
  pub fn import_exists(&self, id: &NodeId) -> bool {
    match id {
      NodeId::Object(name) => self.environment.contains_key(name),
      NodeId::File(path) => self.file_path(path).exists(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::manifest::PlanRow;
  use crate::util::testutil::{decl, settings_in};
  use tempfile::TempDir;

  fn obj(name: &str) -> NodeId {
    NodeId::object(name)
  }

  #[test]
  fn resolved_manifest_builds_both_graphs() {
    let temp = TempDir::new().unwrap();
    let manifest = Manifest {
      targets: vec![decl("a", &["b"]), decl("b", &["raw"])],
      imports: vec![obj("raw")],
      ..Default::default()
    };

    let ctx = BuildContext::from_manifest(manifest, settings_in(temp.path())).unwrap();
    assert_eq!(ctx.graph().node_count(), 3);
    assert_eq!(ctx.schedule().node_count(), 2);
    assert_eq!(ctx.schedule().leaves(), vec![obj("b")]);
    assert_eq!(ctx.graph().leaves(), vec![obj("raw")]);
    assert!(ctx.is_import(&obj("raw")));
    assert!(ctx.target(&obj("a")).is_some());
  }

  #[test]
  fn raw_plan_is_a_config_type_error() {
    let temp = TempDir::new().unwrap();
    let doc = ContextDocument::Plan(vec![PlanRow {
      target: "a".into(),
      command: "f()".into(),
    }]);

    let err = BuildContext::from_document(doc, settings_in(temp.path())).unwrap_err();
    assert!(matches!(err, StaleError::ConfigType { found: "plan" }));
  }

  #[test]
  fn duplicate_target_rejected() {
    let temp = TempDir::new().unwrap();
    let manifest = Manifest {
      targets: vec![decl("a", &[]), decl("a", &[])],
      ..Default::default()
    };
    let err = BuildContext::from_manifest(manifest, settings_in(temp.path())).unwrap_err();
    assert!(matches!(err, ContextError::DuplicateTarget(id) if id == obj("a")));
  }

  #[test]
  fn unknown_dependency_rejected() {
    let temp = TempDir::new().unwrap();
    let manifest = Manifest {
      targets: vec![decl("a", &["ghost"])],
      ..Default::default()
    };
    let err = BuildContext::from_manifest(manifest, settings_in(temp.path())).unwrap_err();
    assert!(matches!(err, ContextError::UnknownDependency { .. }));
  }

  #[test]
  fn import_target_clash_rejected() {
    let temp = TempDir::new().unwrap();
    let manifest = Manifest {
      targets: vec![decl("a", &[])],
      imports: vec![obj("a")],
      ..Default::default()
    };
    let err = BuildContext::from_manifest(manifest, settings_in(temp.path())).unwrap_err();
    assert!(matches!(err, ContextError::ImportClash(_)));
  }

  #[test]
  fn cycle_rejected() {
    let temp = TempDir::new().unwrap();
    let manifest = Manifest {
      targets: vec![decl("a", &["b"]), decl("b", &["a"])],
      ..Default::default()
    };
    let err = BuildContext::from_manifest(manifest, settings_in(temp.path())).unwrap_err();
    assert!(matches!(err, ContextError::Cycle(_)));
  }

  #[test]
  fn per_target_trigger_overrides_default() {
    let temp = TempDir::new().unwrap();
    let mut pinned = decl("pinned", &[]);
    pinned.trigger = Some(Trigger::Always);
    let manifest = Manifest {
      targets: vec![pinned, decl("plain", &[])],
      ..Default::default()
    };
    let settings = settings_in(temp.path()).with_trigger(Trigger::Missing);
    let ctx = BuildContext::from_manifest(manifest, settings).unwrap();

    assert_eq!(ctx.effective_trigger(&obj("pinned")), Trigger::Always);
    assert_eq!(ctx.effective_trigger(&obj("plain")), Trigger::Missing);
  }

  #[test]
  fn existence_checks_follow_node_kind() {
    let temp = TempDir::new().unwrap();
    let manifest = Manifest {
      targets: vec![decl("model", &[]), decl("'out.txt'", &[])],
      imports: vec![obj("bound"), obj("unbound"), NodeId::file("in.csv")],
      environment: [("bound".to_string(), serde_json::json!(1))].into(),
      ..Default::default()
    };
    let ctx = BuildContext::from_manifest(manifest, settings_in(temp.path())).unwrap();

    assert!(ctx.import_exists(&obj("bound")));
    assert!(!ctx.import_exists(&obj("unbound")));
    assert!(!ctx.import_exists(&NodeId::file("in.csv")));
    std::fs::write(ctx.file_path("in.csv"), "x").unwrap();
    assert!(ctx.import_exists(&NodeId::file("in.csv")));

    assert!(!ctx.target_exists(&obj("model")));
    ctx.store().write_value(&obj("model"), &serde_json::json!({"k": 1})).unwrap();
    assert!(ctx.target_exists(&obj("model")));

    assert!(!ctx.target_exists(&NodeId::file("out.txt")));
    std::fs::write(ctx.file_path("out.txt"), "x").unwrap();
    assert!(ctx.target_exists(&NodeId::file("out.txt")));
  }
}

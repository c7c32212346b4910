//! Test utilities for remake-lib.
//!
//! Helpers to declare small contexts rooted in a temporary directory and to
//! bring their targets up to date without running any commands.

use std::path::Path;

use crate::context::{BuildContext, Jobs, Settings};
use crate::graph::NodeId;
use crate::manifest::{Manifest, TargetDecl};
use crate::stale::record_build;
use crate::store::TargetMeta;

/// Settings with the workspace at `root` and the store inside it.
pub fn settings_in(root: &Path) -> Settings {
  Settings::new(root.join(".remake-store"), root).with_jobs(Jobs::uniform(4))
}

/// A target declaration. Ids in display form, so `'x.csv'` is a file.
pub fn decl(id: &str, deps: &[&str]) -> TargetDecl {
  TargetDecl {
    id: id.parse().unwrap(),
    command: format!("make {id}"),
    deps: deps.iter().map(|d| d.parse().unwrap()).collect(),
    trigger: None,
  }
}

pub fn context_with(settings: Settings, targets: Vec<TargetDecl>, imports: &[&str]) -> BuildContext {
  let manifest = Manifest {
    targets,
    imports: imports.iter().map(|i| i.parse().unwrap()).collect(),
    ..Default::default()
  };
  BuildContext::from_manifest(manifest, settings).unwrap()
}

pub fn context_in(root: &Path, targets: Vec<TargetDecl>, imports: &[&str]) -> BuildContext {
  context_with(settings_in(root), targets, imports)
}

/// Like [`context_in`], with object imports bound in the environment.
pub fn context_with_env<'a>(
  root: &Path,
  targets: Vec<TargetDecl>,
  imports: &[&str],
  environment: impl IntoIterator<Item = (&'a str, serde_json::Value)>,
) -> BuildContext {
  let manifest = Manifest {
    targets,
    imports: imports.iter().map(|i| i.parse().unwrap()).collect(),
    environment: environment.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
    prework: Vec::new(),
  };
  BuildContext::from_manifest(manifest, settings_in(root)).unwrap()
}

/// An empty context that only runs prework.
pub fn context_with_prework(root: &Path, prework: Vec<String>) -> BuildContext {
  let manifest = Manifest {
    prework,
    ..Default::default()
  };
  BuildContext::from_manifest(manifest, settings_in(root)).unwrap()
}

/// The same context with a different job limit.
pub fn with_jobs(ctx: &BuildContext, jobs: usize) -> BuildContext {
  let manifest = Manifest {
    targets: ctx.targets().cloned().collect(),
    imports: ctx.imports().iter().cloned().collect(),
    environment: ctx.environment().clone(),
    prework: ctx.prework().to_vec(),
  };
  let settings = ctx.settings().clone().with_jobs(Jobs::uniform(jobs));
  BuildContext::from_manifest(manifest, settings).unwrap()
}

/// Record a target whose output is already in place.
pub fn record(ctx: &BuildContext, id: &str) -> TargetMeta {
  record_build(ctx, &id.parse().unwrap(), None).unwrap()
}

/// Produce and record every target, dependencies first.
pub fn build_all(ctx: &BuildContext) {
  for id in ctx.schedule().topological_order().unwrap() {
    match &id {
      NodeId::Object(name) => {
        ctx.store().write_value(&id, &serde_json::json!(name)).unwrap();
      }
      NodeId::File(path) => {
        std::fs::write(ctx.file_path(path), path).unwrap();
      }
    }
    record_build(ctx, &id, None).unwrap();
  }
}

/// Display forms, for compact assertions.
pub fn names(ids: &[NodeId]) -> Vec<String> {
  ids.iter().map(ToString::to_string).collect()
}

/// A prework step that creates an empty file in the workspace root.
#[cfg(unix)]
pub fn touch_file_script(filename: &str) -> String {
  format!("touch {filename}")
}

#[cfg(windows)]
pub fn touch_file_script(filename: &str) -> String {
  format!("type nul > {filename}")
}

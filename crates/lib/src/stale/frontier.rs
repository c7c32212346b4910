//! Frontier expansion with pruning, and downstream closure.

use std::collections::BTreeSet;

use tracing::debug;

use crate::context::BuildContext;
use crate::graph::{DependencyGraph, NodeId};

use super::parallel::lightly_parallelize;
use super::predicate::should_build;
use super::StaleError;

/// Find the targets that are stale on their own account.
///
/// Works on a copy of the schedule. Each round evaluates the leaves that are
/// not already known stale. Clean leaves are pruned, exposing their dependents
/// for the next round; stale leaves stay, so nothing downstream of them is
/// ever evaluated. The loop ends as soon as a round prunes nothing.
///
/// The result is sorted. Targets that are stale only because something
/// upstream is stale are not included; see [`downstream_closure`].
pub async fn first_outdated(ctx: &BuildContext) -> Result<Vec<NodeId>, StaleError> {
  let _scope = ctx.memo().scope().await;

  let mut working = ctx.schedule().clone();
  let mut stale: BTreeSet<NodeId> = BTreeSet::new();
  let jobs = ctx.settings().jobs.general;

  for round in 1.. {
    let frontier: Vec<NodeId> = working.leaves().into_iter().filter(|id| !stale.contains(id)).collect();

    let worker_ctx = ctx.clone();
    let decisions = lightly_parallelize(frontier.clone(), jobs, move |id| should_build(&worker_ctx, id)).await?;

    let (newly_stale, clean): (Vec<NodeId>, Vec<NodeId>) = frontier
      .into_iter()
      .partition(|id| decisions.get(id).copied().unwrap_or(true));

    debug!(
      round,
      stale = newly_stale.len(),
      clean = clean.len(),
      "frontier evaluated"
    );

    stale.extend(newly_stale);
    if clean.is_empty() {
      break;
    }
    working.remove_nodes(&clean);
  }

  Ok(stale.into_iter().collect())
}

/// Every node downstream of `frontier` in `schedule`, the frontier included.
///
/// `schedule` must be the unpruned schedule. The result is sorted and free of
/// duplicates.
pub fn downstream_closure(schedule: &DependencyGraph, frontier: &[NodeId]) -> Vec<NodeId> {
  let mut reached = schedule.downstream(frontier);
  reached.extend(frontier.iter().cloned());
  reached.into_iter().collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::stale::Trigger;
  use crate::util::testutil::{build_all, context_in, decl, names};
  use tempfile::TempDir;

  fn obj(name: &str) -> NodeId {
    NodeId::object(name)
  }

  #[tokio::test]
  async fn nothing_built_means_only_leaves_are_first_outdated() {
    let temp = TempDir::new().unwrap();
    // a <- b <- c, d independent
    let ctx = context_in(
      temp.path(),
      vec![decl("a", &[]), decl("b", &["a"]), decl("c", &["b"]), decl("d", &[])],
      &[],
    );

    let stale = first_outdated(&ctx).await.unwrap();
    assert_eq!(names(&stale), vec!["a", "d"]);
    assert!(ctx.memo().is_empty());
  }

  #[tokio::test]
  async fn everything_built_means_nothing_outdated() {
    let temp = TempDir::new().unwrap();
    let ctx = context_in(
      temp.path(),
      vec![decl("a", &[]), decl("b", &["a"]), decl("c", &["a", "b"])],
      &[],
    );
    build_all(&ctx);

    assert!(first_outdated(&ctx).await.unwrap().is_empty());
    assert!(ctx.memo().is_empty());
  }

  #[tokio::test]
  async fn pruning_exposes_dependents_of_clean_nodes() {
    let temp = TempDir::new().unwrap();
    let mut middle = decl("b", &["a"]);
    middle.trigger = Some(Trigger::Always);
    let ctx = context_in(temp.path(), vec![decl("a", &[]), middle, decl("c", &["b"])], &[]);
    build_all(&ctx);

    // a is clean and pruned, b is stale and stops the expansion before c
    let stale = first_outdated(&ctx).await.unwrap();
    assert_eq!(stale, vec![obj("b")]);
    assert_eq!(names(&downstream_closure(ctx.schedule(), &stale)), vec!["b", "c"]);
  }

  #[tokio::test]
  async fn sequential_and_parallel_rounds_agree() {
    let temp = TempDir::new().unwrap();
    let mut targets = Vec::new();
    for i in 0..12 {
      let name = format!("t{i:02}");
      let deps: Vec<String> = if i >= 4 { vec![format!("t{:02}", i - 4)] } else { vec![] };
      let deps: Vec<&str> = deps.iter().map(String::as_str).collect();
      let mut d = decl(&name, &deps);
      if i % 5 == 3 {
        d.trigger = Some(Trigger::Always);
      }
      targets.push(d);
    }

    let seq = context_in(temp.path(), targets.clone(), &[]);
    build_all(&seq);
    let seq = crate::util::testutil::with_jobs(&seq, 1);
    let par = crate::util::testutil::with_jobs(&seq, 4);

    let a = first_outdated(&seq).await.unwrap();
    let b = first_outdated(&par).await.unwrap();
    assert_eq!(a, b);
    assert_eq!(names(&a), vec!["t03", "t08"]);
  }

  #[test]
  fn closure_of_empty_frontier_is_empty() {
    let temp = TempDir::new().unwrap();
    let ctx = context_in(temp.path(), vec![decl("a", &[])], &[]);
    assert!(downstream_closure(ctx.schedule(), &[]).is_empty());
  }

  #[test]
  fn closure_is_sorted_and_deduplicated() {
    let temp = TempDir::new().unwrap();
    // z <- m, z <- y, m <- a, y <- a
    let ctx = context_in(
      temp.path(),
      vec![decl("z", &[]), decl("m", &["z"]), decl("y", &["z"]), decl("a", &["m", "y"])],
      &[],
    );
    let closure = downstream_closure(ctx.schedule(), &[obj("m"), obj("y"), obj("m")]);
    assert_eq!(names(&closure), vec!["a", "m", "y"]);
  }
}

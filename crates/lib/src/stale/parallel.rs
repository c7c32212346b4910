//! Bounded parallel evaluation of a node set.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{Id, JoinError, JoinSet};
use tracing::{debug, error};

use crate::graph::NodeId;

use super::StaleError;

type Joined<T> = Result<(Id, (NodeId, Result<T, StaleError>)), JoinError>;

/// Apply `evaluate` to every node, with at most `jobs` evaluations in flight.
///
/// With `jobs <= 1`, or a single node, the nodes are evaluated one after
/// another on the calling task, and a panic there is reported like a panicked
/// worker. Otherwise each evaluation runs on a blocking thread, since hashing
/// reads files. The first failed or panicked evaluation fails the whole call;
/// evaluations not yet started are cancelled and running ones are awaited, so
/// no worker outlives the call.
pub async fn lightly_parallelize<T, F>(
  nodes: Vec<NodeId>,
  jobs: usize,
  evaluate: F,
) -> Result<HashMap<NodeId, T>, StaleError>
where
  T: Send + 'static,
  F: Fn(&NodeId) -> Result<T, StaleError> + Send + Sync + 'static,
{
  let mut results = HashMap::with_capacity(nodes.len());

  if jobs <= 1 || nodes.len() <= 1 {
    for id in nodes {
      let value = match catch_unwind(AssertUnwindSafe(|| evaluate(&id))) {
        Ok(value) => value?,
        Err(payload) => {
          let message = panic_message(payload);
          error!(node = %id, %message, "evaluation panicked");
          return Err(StaleError::Evaluation { node: id, message });
        }
      };
      results.insert(id, value);
    }
    return Ok(results);
  }

  debug!(nodes = nodes.len(), jobs, "evaluating in parallel");

  let evaluate = Arc::new(evaluate);
  let semaphore = Arc::new(Semaphore::new(jobs));
  let mut join_set = JoinSet::new();
  let mut owners: HashMap<Id, NodeId> = HashMap::new();

  for id in nodes {
    // Settle whatever already finished so an early failure stops the spawning
    while let Some(joined) = join_set.try_join_next_with_id() {
      if let Err(e) = settle(joined, &owners, &mut results) {
        return Err(abort(join_set, e).await);
      }
    }

    let permit = match semaphore.clone().acquire_owned().await {
      Ok(permit) => permit,
      Err(_) => {
        let e = StaleError::Evaluation {
          node: id,
          message: "worker pool closed".to_string(),
        };
        return Err(abort(join_set, e).await);
      }
    };

    let evaluate = evaluate.clone();
    let node = id.clone();
    let handle = join_set.spawn_blocking(move || {
      let _permit = permit;
      let value = evaluate(&node);
      (node, value)
    });
    owners.insert(handle.id(), id);
  }

  while let Some(joined) = join_set.join_next_with_id().await {
    if let Err(e) = settle(joined, &owners, &mut results) {
      return Err(abort(join_set, e).await);
    }
  }

  Ok(results)
}

fn settle<T>(joined: Joined<T>, owners: &HashMap<Id, NodeId>, results: &mut HashMap<NodeId, T>) -> Result<(), StaleError> {
  match joined {
    Ok((_, (id, Ok(value)))) => {
      results.insert(id, value);
      Ok(())
    }
    Ok((_, (id, Err(e)))) => {
      error!(node = %id, error = %e, "evaluation failed");
      Err(e)
    }
    Err(join_error) => {
      let node = owners
        .get(&join_error.id())
        .cloned()
        .unwrap_or_else(|| NodeId::object("<unknown>"));
      let message = if join_error.is_panic() {
        panic_message(join_error.into_panic())
      } else {
        "worker cancelled".to_string()
      };
      error!(%node, %message, "evaluation worker died");
      Err(StaleError::Evaluation { node, message })
    }
  }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
  if let Some(s) = payload.downcast_ref::<&str>() {
    format!("worker panicked: {s}")
  } else if let Some(s) = payload.downcast_ref::<String>() {
    format!("worker panicked: {s}")
  } else {
    "worker panicked".to_string()
  }
}

/// Cancel pending evaluations and wait for running ones before failing.
async fn abort<T: 'static>(mut join_set: JoinSet<T>, e: StaleError) -> StaleError {
  join_set.abort_all();
  while join_set.join_next().await.is_some() {}
  e
}

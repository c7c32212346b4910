//! Prework: shell steps run before discovery.

use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use crate::context::BuildContext;

use super::StaleError;

/// Run each prework step in order in the workspace root.
///
/// Output is inherited from the current process. The first failing step
/// aborts the run.
pub async fn run_prework(ctx: &BuildContext) -> Result<(), StaleError> {
  let steps = ctx.prework();
  if steps.is_empty() {
    return Ok(());
  }
  info!(steps = steps.len(), "running prework");

  for step in steps {
    debug!(step = %step, "prework step");
    let status = shell(step)
      .current_dir(&ctx.settings().workspace_root)
      .stdin(Stdio::null())
      .status()
      .await
      .map_err(|source| StaleError::PreworkSpawn {
        step: step.clone(),
        source,
      })?;

    if !status.success() {
      return Err(StaleError::PreworkFailed {
        step: step.clone(),
        code: status.code(),
      });
    }
  }
  Ok(())
}

#[cfg(unix)]
fn shell(step: &str) -> Command {
  let mut cmd = Command::new("/bin/sh");
  cmd.arg("-c").arg(step);
  cmd
}

#[cfg(windows)]
fn shell(step: &str) -> Command {
  let mut cmd = Command::new("cmd.exe");
  cmd.arg("/C").arg(step);
  cmd
}

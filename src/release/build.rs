//! Builder: asset build and production dependency install
//!
//! Steps run sequentially in the project root. The first failing step aborts
//! the run; nothing is retried.

use crate::core::config::BuildStep;
use crate::core::error::{ReleaseError, ReleaseResult};
use crate::core::exec::{CommandRunner, Invocation};
use crate::ui::status;
use std::path::Path;

/// Run every build step in order; returns the names of the steps that ran
pub fn run_build(root: &Path, steps: &[BuildStep], runner: &dyn CommandRunner) -> ReleaseResult<Vec<String>> {
  let mut completed = Vec::with_capacity(steps.len());

  for step in steps {
    let invocation = Invocation::new(&step.program, root).args(step.args.iter().cloned());
    status!("   🔨 {} ({})", step.name, invocation.display());

    runner.run_checked(&invocation).map_err(|e| ReleaseError::Message {
      message: format!("Build step '{}' failed", step.name),
      context: Some(e.to_string()),
      help: e.help_message(),
    })?;

    completed.push(step.name.clone());
  }

  Ok(completed)
}

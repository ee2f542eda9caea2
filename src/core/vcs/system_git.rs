//! System git backend
//!
//! Every operation is a `git` subprocess run through a [`CommandRunner`] with
//! an isolated environment, so results don't depend on the caller's shell.

use crate::core::error::{GitError, ReleaseError, ReleaseResult};
use crate::core::exec::{CommandOutput, CommandRunner, Invocation};
use std::path::{Path, PathBuf};

/// Environment variables passed through to git (everything else is cleared)
const PASSTHROUGH_ENV: &[&str] = &[
  "PATH",
  "HOME",
  "SSH_AUTH_SOCK",
  "GIT_SSH",
  "GIT_SSH_COMMAND",
  "GIT_ASKPASS",
  "GIT_AUTHOR_NAME",
  "GIT_AUTHOR_EMAIL",
  "GIT_COMMITTER_NAME",
  "GIT_COMMITTER_EMAIL",
];

/// Git backend using system git
pub struct SystemGit<'r> {
  /// Repository working directory
  pub(crate) repo_path: PathBuf,

  pub(crate) runner: &'r dyn CommandRunner,
}

impl<'r> SystemGit<'r> {
  /// Open an existing git repository (verifies it with one rev-parse call)
  pub fn open(path: &Path, runner: &'r dyn CommandRunner) -> ReleaseResult<Self> {
    let git = Self::at(path, runner);
    let output = git.run(&["rev-parse", "--show-toplevel"])?;

    if !output.success() {
      if output.stderr.contains("not a git repository") {
        return Err(ReleaseError::Git(GitError::RepoNotFound {
          path: path.to_path_buf(),
        }));
      }
      return Err(ReleaseError::message(format!(
        "Failed to open git repository: {}",
        output.stderr.trim_end()
      )));
    }

    Ok(git)
  }

  /// Wrap a path without verifying it
  pub fn at(path: &Path, runner: &'r dyn CommandRunner) -> Self {
    Self {
      repo_path: path.to_path_buf(),
      runner,
    }
  }

  /// Get HEAD commit SHA
  pub fn head_commit(&self) -> ReleaseResult<String> {
    let output = self.run_checked(&["rev-parse", "HEAD"])?;
    Ok(output.stdout.trim().to_string())
  }

  /// Checked-out branch, `None` when HEAD is detached
  pub fn current_branch(&self) -> ReleaseResult<Option<String>> {
    let output = self.run(&["symbolic-ref", "--short", "-q", "HEAD"])?;
    let branch = output.stdout.trim();
    Ok((output.success() && !branch.is_empty()).then(|| branch.to_string()))
  }

  /// Run a git subcommand in this repository, returning its raw output
  pub(crate) fn run(&self, args: &[&str]) -> ReleaseResult<CommandOutput> {
    self.runner.run(&git_invocation(&self.repo_path, args))
  }

  /// Run a git subcommand and map a non-zero exit to [`GitError::CommandFailed`]
  pub(crate) fn run_checked(&self, args: &[&str]) -> ReleaseResult<CommandOutput> {
    let output = self.run(args)?;
    if !output.success() {
      return Err(ReleaseError::Git(GitError::CommandFailed {
        command: format!("git {}", args.join(" ")),
        stderr: if output.stderr.trim().is_empty() {
          output.stdout
        } else {
          output.stderr
        },
      }));
    }
    Ok(output)
  }
}

/// Build a safe git invocation rooted at `dir`
///
/// - Runs with `-C <dir>`
/// - Clears the environment except for [`PASSTHROUGH_ENV`]
/// - Adds configuration overrides that make output stable
pub(crate) fn git_invocation(dir: &Path, args: &[&str]) -> Invocation {
  let mut inv = Invocation::new("git", dir)
    .arg("-C")
    .arg(dir.to_string_lossy())
    .args(["-c", "protocol.version=2"])
    .args(["-c", "advice.detachedHead=false"])
    .args(["-c", "core.quotePath=false"])
    .args(args.iter().copied());

  inv.env_clear = true;
  inv.env = PASSTHROUGH_ENV
    .iter()
    .filter_map(|key| std::env::var(key).ok().map(|value| (key.to_string(), value)))
    .collect();
  // Failure text is matched in English
  inv.env.push(("LC_ALL".to_string(), "C".to_string()));
  inv
}

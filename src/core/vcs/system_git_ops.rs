//! Release operations for SystemGit (clone, commit, tag, push)

use super::system_git::{SystemGit, git_invocation};
use crate::core::error::{GitError, ReleaseError, ReleaseResult};
use crate::core::exec::{CommandRunner, FailureClass, Operation, classify_failure};
use std::path::Path;

/// Result of a commit attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
  Created(String),
  /// Tree identical to HEAD; nothing was recorded
  NothingToCommit,
}

/// Result of a tag attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagOutcome {
  Created,
  AlreadyExists,
}

impl<'r> SystemGit<'r> {
  /// Clone `remote` into `dest` with `branch` checked out.
  ///
  /// When the remote has no such branch (including an empty remote) the clone
  /// is pointed at an unborn `branch`, so the next commit starts it.
  pub fn clone_branch(remote: &str, dest: &Path, branch: &str, runner: &'r dyn CommandRunner) -> ReleaseResult<Self> {
    let parent = dest.parent().unwrap_or(Path::new("."));
    let dest_str = dest.to_string_lossy().into_owned();

    let heads = runner.run(&git_invocation(parent, &["ls-remote", "--heads", remote, branch]))?;
    if !heads.success() {
      return Err(ReleaseError::Git(GitError::CloneFailed {
        remote: remote.to_string(),
        reason: heads.stderr,
      }));
    }
    let has_branch = !heads.stdout.trim().is_empty();

    let clone_args: Vec<&str> = if has_branch {
      vec!["clone", "--quiet", "--branch", branch, remote, dest_str.as_str()]
    } else {
      vec!["clone", "--quiet", remote, dest_str.as_str()]
    };
    let output = runner.run(&git_invocation(parent, &clone_args))?;
    if !output.success() {
      return Err(ReleaseError::Git(GitError::CloneFailed {
        remote: remote.to_string(),
        reason: output.stderr,
      }));
    }

    let git = SystemGit::at(dest, runner);
    if !has_branch {
      let head_ref = format!("refs/heads/{}", branch);
      git.run_checked(&["symbolic-ref", "HEAD", &head_ref])?;
    }
    Ok(git)
  }

  /// Remove every tracked file from the index and working tree
  pub fn remove_all_tracked(&self) -> ReleaseResult<()> {
    self.run_checked(&["rm", "-r", "-q", "--ignore-unmatch", "."])?;
    Ok(())
  }

  /// Stage all changes (additions, modifications, deletions)
  pub fn add_all(&self) -> ReleaseResult<()> {
    self.run_checked(&["add", "-A"])?;
    Ok(())
  }

  /// Stage specific paths
  pub fn add_paths(&self, paths: &[&Path]) -> ReleaseResult<()> {
    if paths.is_empty() {
      return Ok(());
    }
    let rendered: Vec<String> = paths.iter().map(|p| crate::utils::path_to_git_format(p)).collect();
    let mut args = vec!["add", "--"];
    args.extend(rendered.iter().map(String::as_str));
    self.run_checked(&args)?;
    Ok(())
  }

  /// Commit staged changes; an empty commit is reported, not an error
  pub fn commit(&self, message: &str) -> ReleaseResult<CommitOutcome> {
    self.commit_with(&["commit", "-q", "-m", message])
  }

  /// Commit only `paths`, leaving anything else in the index staged
  pub fn commit_paths(&self, message: &str, paths: &[&Path]) -> ReleaseResult<CommitOutcome> {
    if paths.is_empty() {
      return Ok(CommitOutcome::NothingToCommit);
    }
    let rendered: Vec<String> = paths.iter().map(|p| crate::utils::path_to_git_format(p)).collect();
    let mut args = vec!["commit", "-q", "-m", message, "--only", "--"];
    args.extend(rendered.iter().map(String::as_str));
    self.commit_with(&args)
  }

  fn commit_with(&self, args: &[&str]) -> ReleaseResult<CommitOutcome> {
    let output = self.run(args)?;

    if !output.success() {
      return match classify_failure(Operation::Commit, &output) {
        FailureClass::Benign(_) => Ok(CommitOutcome::NothingToCommit),
        FailureClass::Fatal => Err(ReleaseError::Git(GitError::CommandFailed {
          command: "git commit".to_string(),
          stderr: output.combined().trim().to_string(),
        })),
      };
    }

    Ok(CommitOutcome::Created(self.head_commit()?))
  }

  /// Check whether a tag exists locally. A failed lookup means "absent".
  pub fn tag_exists(&self, tag: &str) -> ReleaseResult<bool> {
    let tag_ref = format!("refs/tags/{}", tag);
    let output = self.run(&["rev-parse", "-q", "--verify", &tag_ref])?;
    Ok(output.success())
  }

  /// Create an annotated tag at HEAD unless it already exists
  pub fn ensure_tag(&self, tag: &str, message: &str) -> ReleaseResult<TagOutcome> {
    if self.tag_exists(tag)? {
      return Ok(TagOutcome::AlreadyExists);
    }
    self.run_checked(&["tag", "-a", tag, "-m", message])?;
    Ok(TagOutcome::Created)
  }

  /// Push a branch or tag refspec
  pub fn push(&self, remote: &str, refspec: &str) -> ReleaseResult<()> {
    let output = self.run(&["push", "--quiet", remote, refspec])?;

    if !output.success() {
      return Err(ReleaseError::Git(GitError::PushFailed {
        remote: remote.to_string(),
        refspec: refspec.to_string(),
        reason: output.stderr,
      }));
    }

    Ok(())
  }
}

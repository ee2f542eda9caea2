//! Publisher: tags, pushes and hosted releases
//!
//! The distribution repository is published first, then the source
//! repository. Tagging is idempotent; an existing tag is reused.

use crate::core::error::{ReleaseError, ReleaseResult};
use crate::core::exec::{CommandRunner, FailureClass, Invocation, Operation, classify_failure};
use crate::core::vcs::{CommitOutcome, SystemGit, TagOutcome};
use crate::release::version::VersionString;
use crate::ui::status;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One repository to publish
pub struct RepoTarget<'g, 'r> {
  /// "distribution" or "source", used in messages
  pub label: &'static str,
  pub git: &'g SystemGit<'r>,
  pub remote: &'g str,
  pub branch: &'g str,
}

/// What happened to a repository's tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TagStatus {
  Created,
  AlreadyExists,
  Skipped,
}

impl From<TagOutcome> for TagStatus {
  fn from(outcome: TagOutcome) -> Self {
    match outcome {
      TagOutcome::Created => TagStatus::Created,
      TagOutcome::AlreadyExists => TagStatus::AlreadyExists,
    }
  }
}

/// Create the annotated tag `tag` unless it already exists
pub fn ensure_tag(git: &SystemGit<'_>, tag: &str) -> ReleaseResult<TagOutcome> {
  let outcome = git.ensure_tag(tag, &format!("Release {}", tag))?;
  match outcome {
    TagOutcome::Created => status!("   🏷️  Created tag {}", tag),
    TagOutcome::AlreadyExists => status!("   ℹ️  Tag {} already exists, skipping", tag),
  }
  Ok(outcome)
}

/// Push the branch, then tag and push the tag unless `tag` is `None`
pub fn publish_repository(target: &RepoTarget<'_, '_>, tag: Option<&str>) -> ReleaseResult<TagStatus> {
  target.git.push(target.remote, target.branch)?;
  status!("   ⬆️  Pushed {} branch {} to {}", target.label, target.branch, target.remote);

  let Some(tag) = tag else {
    return Ok(TagStatus::Skipped);
  };

  let outcome = ensure_tag(target.git, tag)?;
  target.git.push(target.remote, &format!("refs/tags/{}", tag))?;
  status!("   ⬆️  Pushed {} tag {}", target.label, tag);
  Ok(outcome.into())
}

/// Commit the rewritten version files in the source repository
pub fn commit_version_bump(
  git: &SystemGit<'_>,
  root: &Path,
  files: &[PathBuf],
  version: &VersionString,
) -> ReleaseResult<CommitOutcome> {
  let relative: Vec<&Path> = files.iter().map(|f| f.strip_prefix(root).unwrap_or(f)).collect();
  git.add_paths(&relative)?;
  let outcome = git.commit_paths(&format!("Release {}", version.display()), &relative)?;
  match &outcome {
    CommitOutcome::Created(sha) => status!("   📝 Committed version bump ({})", short_sha(sha)),
    CommitOutcome::NothingToCommit => status!("   ℹ️  Version files unchanged, nothing to commit"),
  }
  Ok(outcome)
}

fn short_sha(sha: &str) -> &str {
  sha.get(..7).unwrap_or(sha)
}

/// Where a hosted release is created
#[derive(Debug, Clone)]
pub struct HostedTarget {
  /// "distribution" or "source"
  pub label: &'static str,
  /// Checkout the `gh` command runs in
  pub cwd: PathBuf,
  /// Explicit `owner/repo`; otherwise `gh` infers it from the checkout
  pub repo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HostedOutcome {
  Created,
  AlreadyExists,
  Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostedRelease {
  pub repository: String,
  #[serde(flatten)]
  pub outcome: HostedOutcome,
}

/// Create one hosted release per target, attempting every target
pub fn create_hosted_releases(
  targets: &[HostedTarget],
  tag: &str,
  zip: &Path,
  notes: &str,
  runner: &dyn CommandRunner,
) -> Vec<HostedRelease> {
  targets
    .iter()
    .map(|target| {
      let outcome = create_hosted_release(target, tag, zip, notes, runner);
      match &outcome {
        HostedOutcome::Created => status!("   🚀 Created {} release {}", target.label, tag),
        HostedOutcome::AlreadyExists => status!("   ℹ️  {} release {} already exists", target.label, tag),
        HostedOutcome::Failed { reason } => eprintln!("   ❌ {} release {} failed: {}", target.label, tag, reason),
      }
      HostedRelease {
        repository: target.repo.clone().unwrap_or_else(|| target.label.to_string()),
        outcome,
      }
    })
    .collect()
}

fn create_hosted_release(
  target: &HostedTarget,
  tag: &str,
  zip: &Path,
  notes: &str,
  runner: &dyn CommandRunner,
) -> HostedOutcome {
  let mut invocation = Invocation::new("gh", &target.cwd)
    .args(["release", "create", tag])
    .arg(zip.to_string_lossy())
    .args(["--title", tag, "--notes", notes]);
  if let Some(repo) = &target.repo {
    invocation = invocation.args(["--repo", repo.as_str()]);
  }

  match runner.run(&invocation) {
    Ok(output) if output.success() => HostedOutcome::Created,
    Ok(output) => match classify_failure(Operation::CreateHostedRelease, &output) {
      FailureClass::Benign(_) => HostedOutcome::AlreadyExists,
      FailureClass::Fatal => HostedOutcome::Failed {
        reason: output.combined().trim().to_string(),
      },
    },
    Err(e) => HostedOutcome::Failed { reason: e.to_string() },
  }
}

/// Fail if any hosted release failed, naming each failed repository
pub fn ensure_all_released(releases: &[HostedRelease]) -> ReleaseResult<()> {
  let failed: Vec<&str> = releases
    .iter()
    .filter(|r| matches!(r.outcome, HostedOutcome::Failed { .. }))
    .map(|r| r.repository.as_str())
    .collect();

  if failed.is_empty() {
    return Ok(());
  }
  Err(ReleaseError::with_help(
    format!("Hosted release failed for: {}", failed.join(", ")),
    "Check `gh auth status` and that the tag was pushed, then re-run; existing releases are skipped",
  ))
}

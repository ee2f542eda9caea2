//! Distribution workspace
//!
//! A fresh clone of the distribution repository with every tracked file
//! removed, repopulated from the selection, then committed. The directory is
//! removed after a successful run and kept after a failure.

use crate::core::error::{ReleaseError, ReleaseResult, ResultExt};
use crate::core::exec::CommandRunner;
use crate::core::vcs::{CommitOutcome, SystemGit};
use crate::release::inclusion::Selection;
use crate::release::manifest::PublishManifest;
use crate::release::version::VersionString;
use crate::ui::progress::CopyProgress;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub struct DistributionWorkspace<'r> {
  path: PathBuf,
  git: SystemGit<'r>,
}

impl<'r> DistributionWorkspace<'r> {
  /// Clone `remote` at `branch` into `path` (replacing anything stale there)
  /// and empty the working tree except for `.git`
  pub fn prepare(path: &Path, remote: &str, branch: &str, runner: &'r dyn CommandRunner) -> ReleaseResult<Self> {
    if path.exists() {
      tracing::debug!(path = %path.display(), "removing stale distribution checkout");
      fs::remove_dir_all(path).with_context(|| format!("Failed to remove stale checkout {}", path.display()))?;
    }
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let git = SystemGit::clone_branch(remote, path, branch, runner)?;
    if !path.join(".git").exists() {
      return Err(ReleaseError::message(format!(
        "Clone of {} did not produce a repository at {}",
        remote,
        path.display()
      )));
    }

    git.remove_all_tracked()?;
    clear_untracked(path)?;

    Ok(Self {
      path: path.to_path_buf(),
      git,
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn git(&self) -> &SystemGit<'r> {
    &self.git
  }

  /// Copy every selected entry from `source_root`; returns the number of files copied
  pub fn populate(&self, source_root: &Path, selection: &Selection) -> ReleaseResult<usize> {
    let files = expand_files(source_root, &selection.entries, &selection.skip)?;
    let mut progress = CopyProgress::new(files.len(), "Copying files");

    for (src, rel) in &files {
      let dest = self.path.join(rel);
      if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
      }
      fs::copy(src, &dest).with_context(|| format!("Failed to copy {}", src.display()))?;
      progress.inc();
    }

    Ok(files.len())
  }

  /// Write the publish-time `composer.json` at the checkout root
  pub fn write_publish_manifest(&self, manifest: &PublishManifest<'_>) -> ReleaseResult<PathBuf> {
    let path = self.path.join("composer.json");
    manifest.write(&path)?;
    Ok(path)
  }

  /// Stage everything and commit as `Release v<version>`
  pub fn commit(&self, version: &VersionString) -> ReleaseResult<CommitOutcome> {
    self.git.add_all()?;
    self.git.commit(&format!("Release {}", version.display()))
  }

  /// Remove the checkout, and its parent when that is left empty
  pub fn cleanup(self) -> ReleaseResult<()> {
    fs::remove_dir_all(&self.path).with_context(|| format!("Failed to remove {}", self.path.display()))?;
    if let Some(parent) = self.path.parent() {
      let _ = fs::remove_dir(parent);
    }
    Ok(())
  }
}

/// Delete everything in `dir` except `.git`
fn clear_untracked(dir: &Path) -> ReleaseResult<()> {
  for entry in fs::read_dir(dir)? {
    let entry = entry?;
    if entry.file_name() == ".git" {
      continue;
    }
    let path = entry.path();
    if entry.file_type()?.is_dir() {
      fs::remove_dir_all(&path)?;
    } else {
      fs::remove_file(&path)?;
    }
  }
  Ok(())
}

/// Expand selected entries (files or directory trees) into `(source, relative)` file pairs.
/// Absolute paths in `skip` are left out wherever they appear.
pub fn expand_files(
  source_root: &Path,
  entries: &[String],
  skip: &[PathBuf],
) -> ReleaseResult<Vec<(PathBuf, PathBuf)>> {
  let mut files = Vec::new();

  for entry in entries {
    let src = source_root.join(entry);
    if skip.contains(&src) {
      continue;
    }
    if !src.is_dir() {
      files.push((src, PathBuf::from(entry)));
      continue;
    }
    let walker = WalkDir::new(&src)
      .follow_links(true)
      .sort_by_file_name()
      .into_iter()
      .filter_entry(|e| !skip.iter().any(|s| s == e.path()));
    for item in walker {
      let item = item?;
      if item.file_type().is_dir() {
        continue;
      }
      let rel = item.path().strip_prefix(source_root)?.to_path_buf();
      files.push((item.path().to_path_buf(), rel));
    }
  }

  Ok(files)
}

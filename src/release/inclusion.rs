//! File selection for the distribution
//!
//! Two strategies, exactly one active per run:
//!
//! - **Include** (canonical): an allow-list of top-level entries. Only entries
//!   that exist in the source tree are selected; the rest are reported missing.
//! - **Exclude** (deprecated): every file except those matching zip-style
//!   wildcards, where `*` also matches `/`. New top-level files leak into the
//!   package unless someone remembers to exclude them.

use crate::core::config::{DistributionConfig, Strategy};
use crate::core::error::{ReleaseError, ReleaseResult};
use crate::utils::relative_git_path;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InclusionManifest {
  Include(Vec<String>),
  Exclude(Vec<String>),
}

/// Entries picked from a source tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
  /// Slash-separated paths relative to the source root (files or directories)
  pub entries: Vec<String>,
  /// Include-list entries absent from the source tree
  pub missing: Vec<String>,
  /// Absolute paths never copied, even from inside a selected directory
  pub skip: Vec<PathBuf>,
}

impl Selection {
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl InclusionManifest {
  pub fn from_config(config: &DistributionConfig, entry_file: &Path) -> Self {
    match config.strategy {
      Strategy::Include => InclusionManifest::Include(config.include_list(entry_file)),
      Strategy::Exclude => InclusionManifest::Exclude(config.exclude.clone()),
    }
  }

  pub fn is_deprecated(&self) -> bool {
    matches!(self, InclusionManifest::Exclude(_))
  }

  /// Resolve against `root`; paths in `skip` (absolute) are never selected
  pub fn resolve(&self, root: &Path, skip: &[PathBuf]) -> ReleaseResult<Selection> {
    match self {
      InclusionManifest::Include(list) => resolve_include(list, root, skip),
      InclusionManifest::Exclude(patterns) => resolve_exclude(patterns, root, skip),
    }
  }
}

fn normalize_entry(raw: &str) -> ReleaseResult<String> {
  let trimmed = raw.trim().trim_start_matches("./").trim_end_matches('/');
  let path = Path::new(trimmed);
  let escapes = path
    .components()
    .any(|c| !matches!(c, Component::Normal(_)));
  if trimmed.is_empty() || escapes {
    return Err(ReleaseError::with_help(
      format!("Invalid include entry '{}'", raw),
      "Include entries must be paths relative to the plugin root",
    ));
  }
  Ok(trimmed.to_string())
}

fn resolve_include(list: &[String], root: &Path, skip: &[PathBuf]) -> ReleaseResult<Selection> {
  let mut selection = Selection {
    skip: skip.to_vec(),
    ..Selection::default()
  };
  let mut seen = HashSet::new();

  for raw in list {
    let entry = normalize_entry(raw)?;
    if !seen.insert(entry.clone()) {
      continue;
    }
    let path = root.join(&entry);
    if skip.iter().any(|s| s == &path) {
      continue;
    }
    if path.symlink_metadata().is_ok() {
      selection.entries.push(entry);
    } else {
      selection.missing.push(entry);
    }
  }

  Ok(selection)
}

fn build_globset(patterns: &[String]) -> ReleaseResult<GlobSet> {
  let mut builder = GlobSetBuilder::new();
  for pattern in patterns {
    builder.add(Glob::new(pattern)?);
  }
  Ok(builder.build()?)
}

fn resolve_exclude(patterns: &[String], root: &Path, skip: &[PathBuf]) -> ReleaseResult<Selection> {
  let excluded = build_globset(patterns)?;
  let mut selection = Selection {
    skip: skip.to_vec(),
    ..Selection::default()
  };

  let walker = WalkDir::new(root)
    .min_depth(1)
    .sort_by_file_name()
    .into_iter()
    .filter_entry(|e| {
      if skip.iter().any(|s| s == e.path()) {
        return false;
      }
      if !e.file_type().is_dir() {
        return true;
      }
      // Prune directories whose whole subtree is excluded
      match relative_git_path(e.path(), root) {
        Some(rel) => !(excluded.is_match(format!("{}/", rel)) && excluded.is_match(format!("{}/_", rel))),
        None => true,
      }
    });

  for entry in walker {
    let entry = entry?;
    if entry.file_type().is_dir() {
      continue;
    }
    let Some(rel) = relative_git_path(entry.path(), root) else {
      continue;
    };
    if !excluded.is_match(&rel) {
      selection.entries.push(rel);
    }
  }

  Ok(selection)
}

//! Version writer
//!
//! Rewrites the release version into the plugin entry file (header comment
//! and version constant) and the JSON manifests. Writes are in place and
//! not transactional.

use crate::core::error::{ReleaseResult, ResultExt};
use crate::release::manifest;
use crate::release::version::VersionString;
use regex::{NoExpand, Regex};
use std::fs;
use std::path::{Path, PathBuf};

/// Where the version has to be written
#[derive(Debug, Clone)]
pub struct VersionTargets {
  pub entry: PathBuf,
  pub constant: String,
  pub manifest: PathBuf,
  /// Additional manifests, skipped when they don't exist
  pub extra_manifests: Vec<PathBuf>,
}

/// What the writer did
#[derive(Debug, Clone, Default)]
pub struct WriteReport {
  pub files: Vec<PathBuf>,
  pub warnings: Vec<String>,
}

/// Write `version` into every target
pub fn write_version(targets: &VersionTargets, version: &VersionString) -> ReleaseResult<WriteReport> {
  let mut report = WriteReport::default();

  let content = fs::read_to_string(&targets.entry)
    .with_context(|| format!("Failed to read plugin entry file {}", targets.entry.display()))?;
  let rewritten = rewrite_php(&content, &targets.constant, version.as_str(), &mut report.warnings)?;
  fs::write(&targets.entry, rewritten).with_context(|| format!("Failed to write {}", targets.entry.display()))?;
  report.files.push(targets.entry.clone());

  manifest::set_version(&targets.manifest, version.as_str())?;
  report.files.push(targets.manifest.clone());

  for extra in &targets.extra_manifests {
    if extra == &targets.manifest {
      continue;
    }
    if !extra.exists() {
      tracing::debug!(path = %extra.display(), "version file not present, skipping");
      continue;
    }
    manifest::set_version(extra, version.as_str())?;
    report.files.push(extra.clone());
  }

  Ok(report)
}

/// Rewrite the `Version:` header and the `define()` constant in PHP source
pub fn rewrite_php(content: &str, constant: &str, version: &str, warnings: &mut Vec<String>) -> ReleaseResult<String> {
  let header = Regex::new(r"Version:\s*\d+\.\d+\.\d+")?;
  let header_value = format!("Version: {}", version);
  let after_header = if header.is_match(content) {
    header.replace_all(content, NoExpand(&header_value)).into_owned()
  } else {
    warnings.push("No `Version: x.y.z` header found in the plugin entry file".to_string());
    content.to_string()
  };

  let define = Regex::new(&format!(
    r#"define\(\s*['"]{}['"]\s*,\s*['"][^'"]*['"]\s*\)\s*;"#,
    regex::escape(constant)
  ))?;
  let define_value = format!("define( '{}', '{}' );", constant, version);
  let after_define = if define.is_match(&after_header) {
    define.replace_all(&after_header, NoExpand(&define_value)).into_owned()
  } else {
    warnings.push(format!("No `define( '{}', ... );` found in the plugin entry file", constant));
    after_header
  };

  Ok(after_define)
}

/// Targets relative to the project root
pub fn targets_for(root: &Path, entry: &Path, constant: &str, manifest: &Path, extra: &[PathBuf]) -> VersionTargets {
  VersionTargets {
    entry: crate::utils::absolutize(entry, root),
    constant: constant.to_string(),
    manifest: crate::utils::absolutize(manifest, root),
    extra_manifests: extra.iter().map(|p| crate::utils::absolutize(p, root)).collect(),
  }
}

//! Version resolution
//!
//! The CLI value wins over the manifest. Anything that is not plain
//! `MAJOR.MINOR.PATCH` is accepted with a warning.

use crate::core::error::{ConfigError, ReleaseError, ReleaseResult};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

fn canonical_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| Regex::new(r"^\d+\.\d+\.\d+$").expect("static pattern"))
}

/// A release version without the leading `v`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct VersionString(String);

impl VersionString {
  /// Normalize user input: trim whitespace and strip one leading `v`/`V`
  pub fn new(raw: &str) -> Self {
    let trimmed = raw.trim();
    let bare = trimmed
      .strip_prefix('v')
      .or_else(|| trimmed.strip_prefix('V'))
      .unwrap_or(trimmed);
    Self(bare.to_string())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// Tag/title form, `v1.2.3`
  pub fn display(&self) -> String {
    format!("v{}", self.0)
  }

  /// Matches `^\d+\.\d+\.\d+$`
  pub fn is_canonical(&self) -> bool {
    canonical_pattern().is_match(&self.0)
  }
}

impl fmt::Display for VersionString {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Resolved version plus the soft warnings raised on the way
#[derive(Debug, Clone)]
pub struct Resolution {
  pub version: VersionString,
  pub from_cli: bool,
  pub warnings: Vec<String>,
}

/// Pick the release version from the CLI request or the manifest fallback
pub fn resolve_version(
  requested: Option<&str>,
  manifest_version: Option<&str>,
  manifest_path: &Path,
) -> ReleaseResult<Resolution> {
  let requested = requested.filter(|v| !v.trim().is_empty());
  let manifest_version = manifest_version.filter(|v| !v.trim().is_empty());

  let (version, from_cli) = match (requested, manifest_version) {
    (Some(raw), _) => (VersionString::new(raw), true),
    (None, Some(raw)) => (VersionString::new(raw), false),
    (None, None) => {
      return Err(ReleaseError::Config(ConfigError::NoVersion {
        manifest: manifest_path.to_path_buf(),
      }));
    }
  };

  if version.as_str().is_empty() {
    return Err(ReleaseError::Config(ConfigError::NoVersion {
      manifest: manifest_path.to_path_buf(),
    }));
  }

  let mut warnings = Vec::new();
  if !version.is_canonical() {
    warnings.push(format!(
      "Version '{}' does not match MAJOR.MINOR.PATCH; continuing anyway",
      version
    ));
  }

  if from_cli
    && let Some(current) = manifest_version
    && let Some(warning) = downgrade_warning(&version, &VersionString::new(current))
  {
    warnings.push(warning);
  }

  Ok(Resolution {
    version,
    from_cli,
    warnings,
  })
}

fn downgrade_warning(next: &VersionString, current: &VersionString) -> Option<String> {
  let next_semver = semver::Version::parse(next.as_str()).ok()?;
  let current_semver = semver::Version::parse(current.as_str()).ok()?;
  (next_semver < current_semver).then(|| {
    format!(
      "Version {} is lower than the manifest's current version {}",
      next, current
    )
  })
}

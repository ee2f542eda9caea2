//! Release context - build once, pass everywhere
//!
//! `ReleaseContext` gathers everything the stages read: the project root, the
//! command-line options, `release.toml` and the package manifest. It is built
//! in `main` before any side effect, so configuration problems abort the run
//! while the tree is still untouched.

use crate::core::config::ProjectConfig;
use crate::core::error::{ConfigError, ReleaseError, ReleaseResult};
use crate::release::manifest::PackageManifest;
use crate::release::package::artifact_path;
use crate::release::writer::{VersionTargets, targets_for};
use crate::utils::absolutize;
use std::path::{Path, PathBuf};

/// Options for one run, fixed once the command line is parsed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseOptions {
  /// Artifact directory (`outdir=`); the project root when unset
  pub output_directory: Option<PathBuf>,
  /// Version override (`version=`)
  pub requested_version: Option<String>,
  pub push_to_distribution: bool,
  pub create_hosted_release: bool,
  pub skip_zip: bool,
  pub skip_tag: bool,
  pub config_path: Option<PathBuf>,
}

impl ReleaseOptions {
  /// Apply one `KEY=VALUE` setting
  pub fn apply_setting(&mut self, raw: &str) -> ReleaseResult<()> {
    let Some((key, value)) = raw.split_once('=') else {
      return Err(ReleaseError::Config(ConfigError::UnknownSetting { key: raw.to_string() }));
    };
    let value = value.trim();

    match key.trim() {
      "outdir" | "version" if value.is_empty() => Err(ReleaseError::with_help(
        format!("Setting '{}' needs a value", key.trim()),
        "Use KEY=VALUE, e.g. outdir=dist or version=2.1.0",
      )),
      "outdir" => {
        self.output_directory = Some(PathBuf::from(value));
        Ok(())
      }
      "version" => {
        self.requested_version = Some(value.to_string());
        Ok(())
      }
      other => Err(ReleaseError::Config(ConfigError::UnknownSetting { key: other.to_string() })),
    }
  }
}

/// Everything a run needs to know about the project
#[derive(Debug, Clone)]
pub struct ReleaseContext {
  /// Project root (absolute)
  pub root: PathBuf,
  pub options: ReleaseOptions,
  pub config: ProjectConfig,
  /// The config file that was loaded, if any
  pub config_path: Option<PathBuf>,
  pub manifest: PackageManifest,
  /// Plugin entry file (absolute)
  pub entry: PathBuf,
}

impl ReleaseContext {
  pub fn build(root: &Path, options: ReleaseOptions) -> ReleaseResult<Self> {
    let root = root.to_path_buf();
    let (config, config_path) = ProjectConfig::load(&root, options.config_path.as_deref())?;

    let manifest = PackageManifest::load(&absolutize(&config.package.manifest, &root))?;
    let entry = match &config.package.entry {
      Some(entry) => absolutize(entry, &root),
      None => root.join(format!("{}.php", manifest.slug())),
    };
    if !entry.is_file() {
      return Err(ReleaseError::with_help(
        format!("Plugin entry file not found: {}", entry.display()),
        "Set [package] entry in release.toml when the main PHP file is not <slug>.php",
      ));
    }

    if options.push_to_distribution {
      config.distribution_remote()?;
    }

    Ok(Self {
      root,
      options,
      config,
      config_path,
      manifest,
      entry,
    })
  }

  pub fn slug(&self) -> &str {
    self.manifest.slug()
  }

  /// Entry file relative to the root
  pub fn entry_relative(&self) -> &Path {
    self.entry.strip_prefix(&self.root).unwrap_or(&self.entry)
  }

  pub fn output_directory(&self) -> PathBuf {
    match &self.options.output_directory {
      Some(dir) => absolutize(dir, &self.root),
      None => self.root.clone(),
    }
  }

  pub fn artifact_path(&self) -> PathBuf {
    artifact_path(&self.output_directory(), self.slug())
  }

  /// `<root>/<workspace>/<slug>`
  pub fn workspace_path(&self) -> PathBuf {
    absolutize(&self.config.distribution.workspace, &self.root).join(self.slug())
  }

  /// Distribution remote usable from inside the workspace
  pub fn distribution_remote(&self) -> ReleaseResult<String> {
    let remote = self.config.distribution_remote()?;
    Ok(crate::utils::resolve_remote(remote, &self.root))
  }

  pub fn version_targets(&self) -> VersionTargets {
    let package = &self.config.package;
    targets_for(
      &self.root,
      &self.entry,
      &package.version_constant,
      &package.manifest,
      &package.version_files,
    )
  }
}

use crate::core::error::{ConfigError, ReleaseError, ReleaseResult, ResultExt};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Project configuration for plugin-release
/// Searched in order: release.toml, .release.toml, .config/release.toml
///
/// Every section is optional; an absent file means all defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
  #[serde(default)]
  pub package: PackageConfig,
  #[serde(default)]
  pub build: BuildConfig,
  #[serde(default)]
  pub distribution: DistributionConfig,
  #[serde(default)]
  pub publish: PublishConfig,
}

/// Where the version lives
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageConfig {
  /// JSON manifest providing `name` and the fallback `version`
  #[serde(default = "default_manifest")]
  pub manifest: PathBuf,

  /// Further JSON manifests whose `version` is kept in step (skipped when absent)
  #[serde(default = "default_version_files")]
  pub version_files: Vec<PathBuf>,

  /// PHP plugin entry file (default: `<slug>.php`)
  #[serde(default)]
  pub entry: Option<PathBuf>,

  /// Constant defined in the entry file as `define( 'NAME', 'x.y.z' );`
  #[serde(default = "default_version_constant")]
  pub version_constant: String,
}

fn default_manifest() -> PathBuf {
  PathBuf::from("composer.json")
}

fn default_version_files() -> Vec<PathBuf> {
  vec![PathBuf::from("package.json")]
}

fn default_version_constant() -> String {
  "PLUGIN_VERSION".to_string()
}

impl Default for PackageConfig {
  fn default() -> Self {
    Self {
      manifest: default_manifest(),
      version_files: default_version_files(),
      entry: None,
      version_constant: default_version_constant(),
    }
  }
}

/// External build commands, run in order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
  #[serde(default = "default_build_steps")]
  pub steps: Vec<BuildStep>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildStep {
  pub name: String,
  pub program: String,
  #[serde(default)]
  pub args: Vec<String>,
}

impl BuildStep {
  fn new(name: &str, program: &str, args: &[&str]) -> Self {
    Self {
      name: name.to_string(),
      program: program.to_string(),
      args: args.iter().map(|a| a.to_string()).collect(),
    }
  }
}

fn default_build_steps() -> Vec<BuildStep> {
  vec![
    BuildStep::new("assets", "npm", &["run", "build"]),
    BuildStep::new(
      "dependencies",
      "composer",
      &["install", "--no-dev", "--optimize-autoloader"],
    ),
  ]
}

impl Default for BuildConfig {
  fn default() -> Self {
    Self {
      steps: default_build_steps(),
    }
  }
}

/// How files are selected for the distribution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
  /// Copy an explicit allow-list of top-level paths
  #[default]
  Include,
  /// Take everything except deny-listed patterns (deprecated)
  Exclude,
}

/// Distribution repository and file selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DistributionConfig {
  #[serde(default)]
  pub strategy: Strategy,

  /// Top-level entries to ship (default: build output, vendor, templates,
  /// licence and readme files, plus the plugin entry file)
  #[serde(default)]
  pub include: Option<Vec<String>>,

  #[serde(default = "default_exclude")]
  pub exclude: Vec<String>,

  /// Distribution repository (URL or local path); required with --push
  #[serde(default)]
  pub remote: Option<String>,

  #[serde(default = "default_branch")]
  pub branch: String,

  /// Parent directory of the ephemeral checkout, relative to the project root
  #[serde(default = "default_workspace")]
  pub workspace: PathBuf,

  /// Synthesized publish manifest fields
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default = "default_license")]
  pub license: String,
  #[serde(default = "default_package_type")]
  pub package_type: String,
}

fn default_include() -> Vec<String> {
  [
    "build",
    "vendor",
    "templates",
    "inc",
    "languages",
    "LICENSE",
    "license.txt",
    "readme.txt",
  ]
  .iter()
  .map(|s| s.to_string())
  .collect()
}

fn default_exclude() -> Vec<String> {
  [
    ".*",
    "node_modules/*",
    "create-release.js",
    "package.json",
    "package-lock.json",
    "composer.lock",
    "composer.json",
    "*.zip",
    "tests/*",
    "src/*",
    "README.md",
    "CHANGELOG.md",
    "pnpm-lock.yaml",
    "phpcs.xml.dist",
    "webpack.config.js",
    "release.toml",
  ]
  .iter()
  .map(|s| s.to_string())
  .collect()
}

fn default_branch() -> String {
  "main".to_string()
}

fn default_workspace() -> PathBuf {
  PathBuf::from(".dist")
}

fn default_license() -> String {
  "GPL-2.0-or-later".to_string()
}

fn default_package_type() -> String {
  "wordpress-plugin".to_string()
}

impl DistributionConfig {
  /// The effective include list for a plugin whose entry file is `entry`
  pub fn include_list(&self, entry: &Path) -> Vec<String> {
    match &self.include {
      Some(list) => list.clone(),
      None => {
        let mut list = default_include();
        list.insert(0, crate::utils::path_to_git_format(entry));
        list
      }
    }
  }
}

impl Default for DistributionConfig {
  fn default() -> Self {
    Self {
      strategy: Strategy::default(),
      include: None,
      exclude: default_exclude(),
      remote: None,
      branch: default_branch(),
      workspace: default_workspace(),
      description: None,
      license: default_license(),
      package_type: default_package_type(),
    }
  }
}

/// Tagging and hosted releases
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublishConfig {
  /// `owner/repo` of the source repository for `gh --repo` (default: inferred by gh)
  #[serde(default)]
  pub source_repo: Option<String>,

  /// `owner/repo` of the distribution repository (default: inferred from the checkout)
  #[serde(default)]
  pub distribution_repo: Option<String>,

  #[serde(default = "default_source_remote")]
  pub source_remote: String,

  #[serde(default = "default_branch")]
  pub source_branch: String,

  /// Commit the rewritten version files in the source repository before tagging
  #[serde(default = "default_true")]
  pub commit_version_bump: bool,

  /// Fixed note attached to every hosted release
  #[serde(default = "default_notes")]
  pub notes: String,
}

fn default_source_remote() -> String {
  "origin".to_string()
}

fn default_true() -> bool {
  true
}

fn default_notes() -> String {
  "Production build of the plugin. Download the attached zip and install it from Plugins → Add New → Upload Plugin."
    .to_string()
}

impl Default for PublishConfig {
  fn default() -> Self {
    Self {
      source_repo: None,
      distribution_repo: None,
      source_remote: default_source_remote(),
      source_branch: default_branch(),
      commit_version_bump: true,
      notes: default_notes(),
    }
  }
}

impl ProjectConfig {
  /// Find config file in search order: release.toml, .release.toml, .config/release.toml
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = [
      path.join("release.toml"),
      path.join(".release.toml"),
      path.join(".config").join("release.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load config from `explicit` or the search path; defaults when none exists
  pub fn load(root: &Path, explicit: Option<&Path>) -> ReleaseResult<(Self, Option<PathBuf>)> {
    let config_path = match explicit {
      Some(path) => {
        let path = crate::utils::absolutize(path, root);
        if !path.exists() {
          return Err(ReleaseError::Config(ConfigError::Invalid {
            path,
            reason: "file does not exist".to_string(),
          }));
        }
        Some(path)
      }
      None => Self::find_config_path(root),
    };

    let Some(config_path) = config_path else {
      return Ok((Self::default(), None));
    };

    let content = fs::read_to_string(&config_path)
      .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
    let config = Self::parse(&content).map_err(|e| {
      ReleaseError::Config(ConfigError::Invalid {
        path: config_path.clone(),
        reason: e.to_string(),
      })
    })?;

    Ok((config, Some(config_path)))
  }

  pub fn parse(content: &str) -> ReleaseResult<Self> {
    let config: ProjectConfig = toml_edit::de::from_str(content)?;
    config.validate()?;
    Ok(config)
  }

  fn validate(&self) -> ReleaseResult<()> {
    if self.build.steps.iter().any(|s| s.program.trim().is_empty()) {
      return Err(ReleaseError::Config(ConfigError::MissingField {
        field: "build.steps.program".to_string(),
      }));
    }
    if self.distribution.strategy == Strategy::Include && self.distribution.include.as_ref().is_some_and(Vec::is_empty) {
      return Err(ReleaseError::with_help(
        "The include strategy needs at least one entry",
        "List the files and directories to ship under [distribution] include = [...]",
      ));
    }
    if self.distribution.branch.trim().is_empty() {
      return Err(ReleaseError::Config(ConfigError::MissingField {
        field: "distribution.branch".to_string(),
      }));
    }
    Ok(())
  }

  /// The distribution remote, required for --push runs
  pub fn distribution_remote(&self) -> ReleaseResult<&str> {
    self
      .distribution
      .remote
      .as_deref()
      .filter(|r| !r.trim().is_empty())
      .ok_or_else(|| {
        ReleaseError::Config(ConfigError::MissingField {
          field: "distribution.remote (required with --push)".to_string(),
        })
      })
  }
}

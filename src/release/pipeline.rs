//! Release pipeline driver
//!
//! ```text
//! ResolveVersion -> WriteVersion -> Build -> Assemble -> Package -> Publish -> Cleanup
//! ```
//!
//! Stages run strictly in order. The first failure stops the run and comes
//! back as a stage-tagged error; no earlier side effect is rolled back. The
//! distribution checkout is removed only after a fully successful run.

use crate::core::context::ReleaseContext;
use crate::core::error::{ReleaseError, ReleaseResult};
use crate::core::exec::CommandRunner;
use crate::core::vcs::{CommitOutcome, SystemGit};
use crate::release::assemble::DistributionWorkspace;
use crate::release::build::run_build;
use crate::release::inclusion::{InclusionManifest, Selection};
use crate::release::manifest::PublishManifest;
use crate::release::package::{ReleaseArtifact, package_artifact};
use crate::release::publish::{
  HostedRelease, HostedTarget, RepoTarget, TagStatus, commit_version_bump, create_hosted_releases,
  ensure_all_released, publish_repository,
};
use crate::release::version::{VersionString, resolve_version};
use crate::release::writer::write_version;
use crate::ui::status;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
  ResolveVersion,
  WriteVersion,
  Build,
  Assemble,
  Package,
  Publish,
  Cleanup,
}

impl Stage {
  pub const ALL: [Stage; 7] = [
    Stage::ResolveVersion,
    Stage::WriteVersion,
    Stage::Build,
    Stage::Assemble,
    Stage::Package,
    Stage::Publish,
    Stage::Cleanup,
  ];

  pub fn name(self) -> &'static str {
    match self {
      Stage::ResolveVersion => "resolve-version",
      Stage::WriteVersion => "write-version",
      Stage::Build => "build",
      Stage::Assemble => "assemble",
      Stage::Package => "package",
      Stage::Publish => "publish",
      Stage::Cleanup => "cleanup",
    }
  }

  fn banner(self) -> &'static str {
    match self {
      Stage::ResolveVersion => "🔎 Resolving version",
      Stage::WriteVersion => "✏️  Writing version",
      Stage::Build => "🔨 Building",
      Stage::Assemble => "📂 Assembling distribution",
      Stage::Package => "📦 Packaging",
      Stage::Publish => "🚀 Publishing",
      Stage::Cleanup => "🧹 Cleaning up",
    }
  }
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
  Completed,
  Skipped,
  Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageRecord {
  pub stage: Stage,
  pub status: StageStatus,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagRecord {
  pub repository: &'static str,
  pub tag: String,
  pub status: TagStatus,
}

/// Record of one run, printable as text or JSON
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
  pub started_at: DateTime<Utc>,
  pub finished_at: Option<DateTime<Utc>>,
  pub success: bool,
  pub version: Option<VersionString>,
  pub stages: Vec<StageRecord>,
  pub warnings: Vec<String>,
  pub artifact: Option<ReleaseArtifact>,
  pub tags: Vec<TagRecord>,
  pub hosted_releases: Vec<HostedRelease>,
  /// Distribution checkout kept after a failure
  pub preserved_workspace: Option<PathBuf>,
  pub error: Option<String>,
}

impl RunReport {
  fn new() -> Self {
    Self {
      started_at: Utc::now(),
      finished_at: None,
      success: false,
      version: None,
      stages: Vec::new(),
      warnings: Vec::new(),
      artifact: None,
      tags: Vec::new(),
      hosted_releases: Vec::new(),
      preserved_workspace: None,
      error: None,
    }
  }

  pub fn stage_status(&self, stage: Stage) -> Option<StageStatus> {
    self.stages.iter().find(|r| r.stage == stage).map(|r| r.status)
  }
}

enum StageOutcome {
  Done(Option<String>),
  Skipped(String),
}

struct Pipeline<'a> {
  ctx: &'a ReleaseContext,
  runner: &'a dyn CommandRunner,
  report: RunReport,
  version: Option<VersionString>,
  written: Vec<PathBuf>,
  source_git: Option<SystemGit<'a>>,
  workspace: Option<DistributionWorkspace<'a>>,
  selection: Option<Selection>,
}

/// Run every stage; the report is returned whether or not the run succeeded
pub fn run_pipeline(ctx: &ReleaseContext, runner: &dyn CommandRunner) -> (RunReport, ReleaseResult<()>) {
  let mut pipeline = Pipeline {
    ctx,
    runner,
    report: RunReport::new(),
    version: None,
    written: Vec::new(),
    source_git: None,
    workspace: None,
    selection: None,
  };
  let result = pipeline.run();
  let mut report = pipeline.report;
  report.finished_at = Some(Utc::now());
  report.success = result.is_ok();
  if let Err(e) = &result {
    report.error = Some(e.to_string());
  }
  (report, result)
}

impl<'a> Pipeline<'a> {
  fn run(&mut self) -> ReleaseResult<()> {
    for (index, stage) in Stage::ALL.into_iter().enumerate() {
      status!("\n[{}/{}] {}", index + 1, Stage::ALL.len(), stage.banner());
      tracing::debug!(stage = %stage, "stage started");

      match self.run_stage(stage) {
        Ok(StageOutcome::Done(detail)) => self.record(stage, StageStatus::Completed, detail),
        Ok(StageOutcome::Skipped(reason)) => {
          status!("   ⏭️  Skipped: {}", reason);
          self.record(stage, StageStatus::Skipped, Some(reason));
        }
        Err(error) => {
          self.record(stage, StageStatus::Failed, Some(error.to_string()));
          if let Some(ws) = &self.workspace {
            eprintln!("   📁 Distribution checkout kept for inspection: {}", ws.path().display());
            self.report.preserved_workspace = Some(ws.path().to_path_buf());
          }
          return Err(ReleaseError::Stage {
            stage: stage.name().to_string(),
            source: Box::new(error),
          });
        }
      }
    }
    Ok(())
  }

  fn record(&mut self, stage: Stage, status: StageStatus, detail: Option<String>) {
    self.report.stages.push(StageRecord { stage, status, detail });
  }

  fn warn(&mut self, warning: impl Into<String>) {
    let warning = warning.into();
    eprintln!("   ⚠️  {}", warning);
    self.report.warnings.push(warning);
  }

  fn run_stage(&mut self, stage: Stage) -> ReleaseResult<StageOutcome> {
    match stage {
      Stage::ResolveVersion => self.resolve(),
      Stage::WriteVersion => self.write(),
      Stage::Build => self.build(),
      Stage::Assemble => self.assemble(),
      Stage::Package => self.package(),
      Stage::Publish => self.publish(),
      Stage::Cleanup => self.cleanup(),
    }
  }

  fn version(&self) -> ReleaseResult<&VersionString> {
    self
      .version
      .as_ref()
      .ok_or_else(|| ReleaseError::message("Version was not resolved"))
  }

  fn resolve(&mut self) -> ReleaseResult<StageOutcome> {
    let manifest = &self.ctx.manifest;
    let resolution = resolve_version(
      self.ctx.options.requested_version.as_deref(),
      manifest.version.as_deref(),
      &manifest.path,
    )?;
    for warning in resolution.warnings {
      self.warn(warning);
    }

    // Fail on a non-repository or the wrong branch before touching any file
    if self.ctx.options.push_to_distribution {
      let git = SystemGit::open(&self.ctx.root, self.runner)?;
      let expected = &self.ctx.config.publish.source_branch;
      let current = git.current_branch()?;
      if current.as_deref() != Some(expected.as_str()) {
        return Err(ReleaseError::with_help(
          format!(
            "Source checkout is on {}, but releases are pushed to '{}'",
            current.map_or_else(|| "a detached HEAD".to_string(), |b| format!("branch '{}'", b)),
            expected
          ),
          format!("Check out '{}' or set publish.source_branch in release.toml", expected),
        ));
      }
      self.source_git = Some(git);
    }

    let source = if resolution.from_cli { "command line" } else { "manifest" };
    status!("   Version {} (from {})", resolution.version, source);
    let detail = format!("{} from {}", resolution.version, source);
    self.report.version = Some(resolution.version.clone());
    self.version = Some(resolution.version);
    Ok(StageOutcome::Done(Some(detail)))
  }

  fn write(&mut self) -> ReleaseResult<StageOutcome> {
    let version = self.version()?.clone();
    let report = write_version(&self.ctx.version_targets(), &version)?;
    for warning in report.warnings {
      self.warn(warning);
    }
    for file in &report.files {
      status!("   ✏️  {}", file.strip_prefix(&self.ctx.root).unwrap_or(file).display());
    }
    let detail = format!("{} files", report.files.len());
    self.written = report.files;
    Ok(StageOutcome::Done(Some(detail)))
  }

  fn build(&mut self) -> ReleaseResult<StageOutcome> {
    let steps = &self.ctx.config.build.steps;
    if steps.is_empty() {
      return Ok(StageOutcome::Skipped("no build steps configured".to_string()));
    }
    let done = run_build(&self.ctx.root, steps, self.runner)?;
    Ok(StageOutcome::Done(Some(done.join(", "))))
  }

  /// Select files from the source tree (never the artifact or the workspace)
  fn select(&mut self) -> ReleaseResult<Selection> {
    let distribution = &self.ctx.config.distribution;
    let manifest = InclusionManifest::from_config(distribution, self.ctx.entry_relative());
    if manifest.is_deprecated() {
      self.warn("The exclude strategy is deprecated: new files ship unless excluded. Switch to strategy = \"include\"");
    }

    let mut skip = vec![self.ctx.artifact_path()];
    if let Some(parent) = self.ctx.workspace_path().parent() {
      skip.push(parent.to_path_buf());
    }
    let selection = manifest.resolve(&self.ctx.root, &skip)?;
    for missing in &selection.missing {
      self.warn(format!("Include entry '{}' does not exist, skipping", missing));
    }
    if selection.is_empty() {
      return Err(ReleaseError::with_help(
        "No files selected for the distribution",
        "Check [distribution] include in release.toml and that the build produced its output",
      ));
    }
    Ok(selection)
  }

  fn assemble(&mut self) -> ReleaseResult<StageOutcome> {
    if !self.ctx.options.push_to_distribution {
      return Ok(StageOutcome::Skipped("--push not set".to_string()));
    }
    let version = self.version()?.clone();
    let selection = self.select()?;

    let path = self.ctx.workspace_path();
    let remote = self.ctx.distribution_remote()?;
    let branch = &self.ctx.config.distribution.branch;
    status!("   Cloning {} ({}) into {}", remote, branch, path.display());
    let workspace = self.workspace.insert(DistributionWorkspace::prepare(&path, &remote, branch, self.runner)?);

    let copied = workspace.populate(&self.ctx.root, &selection)?;

    let distribution = &self.ctx.config.distribution;
    let description = distribution
      .description
      .as_deref()
      .or(self.ctx.manifest.description.as_deref())
      .unwrap_or_default();
    workspace.write_publish_manifest(&PublishManifest {
      name: &self.ctx.manifest.name,
      package_type: &distribution.package_type,
      description,
      license: &distribution.license,
    })?;

    let detail = match workspace.commit(&version)? {
      CommitOutcome::Created(sha) => {
        status!("   📝 Committed {} files as {}", copied, sha);
        format!("{} files committed", copied)
      }
      CommitOutcome::NothingToCommit => {
        status!("   ℹ️  Distribution unchanged, nothing to commit");
        "nothing to commit".to_string()
      }
    };
    self.selection = Some(selection);
    Ok(StageOutcome::Done(Some(detail)))
  }

  fn package(&mut self) -> ReleaseResult<StageOutcome> {
    if self.ctx.options.skip_zip {
      return Ok(StageOutcome::Skipped("--no-zip".to_string()));
    }
    let selection = match self.selection.take() {
      Some(selection) => selection,
      None => self.select()?,
    };
    let tree_root = match &self.workspace {
      Some(ws) => ws.path().to_path_buf(),
      None => self.ctx.root.clone(),
    };

    let zip_path = self.ctx.artifact_path();
    let artifact = package_artifact(&tree_root, &selection.entries, &zip_path, self.runner)?;
    status!("   ✅ Created {} ({} bytes)", artifact.path.display(), artifact.size);
    status!("   sha256 {}", artifact.sha256);

    self.selection = Some(selection);
    self.report.artifact = Some(artifact);
    Ok(StageOutcome::Done(Some(zip_path.display().to_string())))
  }

  fn publish(&mut self) -> ReleaseResult<StageOutcome> {
    let options = &self.ctx.options;
    if !options.push_to_distribution {
      let reason = if options.create_hosted_release {
        "--push not set (hosted releases need it too)"
      } else {
        "--push not set"
      };
      return Ok(StageOutcome::Skipped(reason.to_string()));
    }

    let version = self.version()?.clone();
    let tag = (!options.skip_tag).then(|| version.display());
    if tag.is_none() {
      status!("   ℹ️  --no-tag: tags are neither created nor pushed");
    }

    let workspace = self
      .workspace
      .as_ref()
      .ok_or_else(|| ReleaseError::message("Distribution checkout was not assembled"))?;
    let status = publish_repository(
      &RepoTarget {
        label: "distribution",
        git: workspace.git(),
        remote: "origin",
        branch: &self.ctx.config.distribution.branch,
      },
      tag.as_deref(),
    )?;
    if let Some(tag) = &tag {
      self.report.tags.push(TagRecord {
        repository: "distribution",
        tag: tag.clone(),
        status,
      });
    }

    let publish = &self.ctx.config.publish;
    let source_git = self
      .source_git
      .as_ref()
      .ok_or_else(|| ReleaseError::message("Source repository was not opened"))?;
    if publish.commit_version_bump {
      commit_version_bump(source_git, &self.ctx.root, &self.written, &version)?;
    }
    let status = publish_repository(
      &RepoTarget {
        label: "source",
        git: source_git,
        remote: &publish.source_remote,
        branch: &publish.source_branch,
      },
      tag.as_deref(),
    )?;
    if let Some(tag) = &tag {
      self.report.tags.push(TagRecord {
        repository: "source",
        tag: tag.clone(),
        status,
      });
    }

    self.hosted_releases(tag.as_deref())?;
    Ok(StageOutcome::Done(tag))
  }

  /// Hosted releases need an artifact and a tag to attach to
  fn hosted_releases(&mut self, tag: Option<&str>) -> ReleaseResult<()> {
    if !self.ctx.options.create_hosted_release {
      return Ok(());
    }
    let Some(artifact) = self.report.artifact.clone() else {
      self.warn("Skipping hosted releases: no artifact was packaged (--no-zip)");
      return Ok(());
    };
    let Some(tag) = tag else {
      self.warn("Skipping hosted releases: tagging is disabled (--no-tag)");
      return Ok(());
    };
    let Some(workspace) = &self.workspace else {
      return Err(ReleaseError::message("Distribution checkout was not assembled"));
    };

    let publish = &self.ctx.config.publish;
    let targets = [
      HostedTarget {
        label: "distribution",
        cwd: workspace.path().to_path_buf(),
        repo: publish.distribution_repo.clone(),
      },
      HostedTarget {
        label: "source",
        cwd: self.ctx.root.clone(),
        repo: publish.source_repo.clone(),
      },
    ];
    let releases = create_hosted_releases(&targets, tag, &artifact.path, &publish.notes, self.runner);
    self.report.hosted_releases = releases;
    ensure_all_released(&self.report.hosted_releases)
  }

  fn cleanup(&mut self) -> ReleaseResult<StageOutcome> {
    let Some(workspace) = self.workspace.take() else {
      return Ok(StageOutcome::Skipped("no distribution checkout".to_string()));
    };
    let path = workspace.path().to_path_buf();
    workspace.cleanup()?;
    Ok(StageOutcome::Done(Some(format!("removed {}", path.display()))))
  }
}

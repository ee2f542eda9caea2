//! `plugin-release` command
//!
//! Builds the context, runs the pipeline and prints the run report.

use crate::core::context::{ReleaseContext, ReleaseOptions};
use crate::core::error::ReleaseResult;
use crate::core::exec::SystemRunner;
use crate::release::pipeline::{RunReport, StageStatus, run_pipeline};
use crate::ui::status;
use std::path::Path;

/// Run a release from `root`
pub fn run_release(root: &Path, options: ReleaseOptions, json: bool) -> ReleaseResult<()> {
  let ctx = ReleaseContext::build(root, options)?;

  status!("🚀 Releasing {} from {}", ctx.manifest.name, ctx.root.display());
  if let Some(path) = &ctx.config_path {
    status!("   Config: {}", path.display());
  }

  let (report, result) = run_pipeline(&ctx, &SystemRunner);

  if json {
    println!("{}", serde_json::to_string_pretty(&report)?);
  } else {
    print_summary(&ctx, &report);
  }

  result
}

fn print_summary(ctx: &ReleaseContext, report: &RunReport) {
  println!();
  println!("📋 Summary");
  for record in &report.stages {
    let marker = match record.status {
      StageStatus::Completed => "✅",
      StageStatus::Skipped => "⏭️ ",
      StageStatus::Failed => "❌",
    };
    match &record.detail {
      Some(detail) if record.status != StageStatus::Failed => {
        println!("   {} {:<16} {}", marker, record.stage.name(), detail)
      }
      _ => println!("   {} {}", marker, record.stage.name()),
    }
  }

  if !report.warnings.is_empty() {
    println!("   ⚠️  {} warning(s)", report.warnings.len());
  }

  if !report.success {
    return;
  }

  if let Some(version) = &report.version {
    println!();
    println!("✅ Released {} {}", ctx.slug(), version.display());
  }
  if let Some(artifact) = &report.artifact
    && report.hosted_releases.is_empty()
  {
    println!();
    println!("🔔 Next steps:");
    println!("   1. Create a release on GitHub (or re-run with --push --create-release)");
    println!("   2. Upload the zip file: {}", artifact.path.display());
  }
}

//! Zip artifact packaging
//!
//! The archive is built by the system `zip` tool run inside the tree root,
//! with the selected entry names fed on stdin (`zip -r -q <zip> -@`).

use crate::core::error::{ReleaseError, ReleaseResult, ResultExt};
use crate::core::exec::{CommandRunner, Invocation};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

/// The packaged plugin zip
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseArtifact {
  pub path: PathBuf,
  /// Hex SHA-256 of the zip
  pub sha256: String,
  pub size: u64,
}

/// `<outdir>/<slug>.zip`
pub fn artifact_path(outdir: &Path, slug: &str) -> PathBuf {
  outdir.join(format!("{}.zip", slug))
}

/// Package `entries` (relative to `tree_root`) into `zip_path`
pub fn package_artifact(
  tree_root: &Path,
  entries: &[String],
  zip_path: &Path,
  runner: &dyn CommandRunner,
) -> ReleaseResult<ReleaseArtifact> {
  if entries.is_empty() {
    return Err(ReleaseError::with_help(
      "Nothing to package: the file selection is empty",
      "Check [distribution] include in release.toml against the built plugin tree",
    ));
  }

  if zip_path.exists() {
    tracing::debug!(path = %zip_path.display(), "removing stale artifact");
    fs::remove_file(zip_path).with_context(|| format!("Failed to remove stale artifact {}", zip_path.display()))?;
  }
  if let Some(outdir) = zip_path.parent() {
    fs::create_dir_all(outdir).with_context(|| format!("Failed to create output directory {}", outdir.display()))?;
  }

  let mut list = entries.join("\n");
  list.push('\n');
  let invocation = Invocation::new("zip", tree_root)
    .args(["-r", "-q"])
    .arg(zip_path.to_string_lossy())
    .arg("-@")
    .stdin(list);
  runner.run_checked(&invocation)?;

  if !zip_path.exists() {
    return Err(ReleaseError::message(format!(
      "Archive tool reported success but {} was not created",
      zip_path.display()
    )));
  }

  let (sha256, size) = sha256_file(zip_path)?;
  Ok(ReleaseArtifact {
    path: zip_path.to_path_buf(),
    sha256,
    size,
  })
}

/// Hex SHA-256 digest and byte length of a file
pub fn sha256_file(path: &Path) -> ReleaseResult<(String, u64)> {
  let mut file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
  let mut hasher = Sha256::new();
  let size = io::copy(&mut file, &mut hasher)?;
  let digest = hasher.finalize();
  let hex = digest.iter().map(|b| format!("{:02x}", b)).collect();
  Ok((hex, size))
}

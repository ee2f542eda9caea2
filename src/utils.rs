//! Path and remote helpers shared by the stages

use std::path::{Path, PathBuf};

/// Whether a distribution remote names a directory on this machine
///
/// `git@host:org/repo.git`, `https://...` and `ssh://...` are network remotes.
/// Absolute paths, `./` or `../` prefixes and Windows drive or UNC paths are local.
/// A bare name such as `plugin-dist` is treated as a network remote.
pub fn is_local_remote(remote: &str) -> bool {
  if remote.starts_with("./") || remote.starts_with("../") || remote.starts_with("\\\\") {
    return true;
  }

  // Drive letters contain ':' so they are checked before the scp-style form
  if let [drive, b':', sep, ..] = remote.as_bytes()
    && drive.is_ascii_alphabetic()
    && (*sep == b'\\' || *sep == b'/')
  {
    return true;
  }

  if remote.contains("://") || remote.contains('@') {
    return false;
  }

  remote.starts_with('/') || Path::new(remote).is_absolute()
}

/// Resolve a remote for use from another working directory
///
/// Relative local paths (`../plugin-dist.git`) are anchored at `base`; URLs and
/// absolute paths are returned unchanged.
pub fn resolve_remote(remote: &str, base: &Path) -> String {
  if is_local_remote(remote) && !Path::new(remote).is_absolute() {
    path_to_git_format(&base.join(remote))
  } else {
    remote.to_string()
  }
}

/// Slash-separated path of `path` relative to `root`
pub fn relative_git_path(path: &Path, root: &Path) -> Option<String> {
  path.strip_prefix(root).ok().map(path_to_git_format)
}

/// Absolute form of `path`, anchored at `base` when relative
pub fn absolutize(path: &Path, base: &Path) -> PathBuf {
  if path.is_absolute() {
    path.to_path_buf()
  } else {
    base.join(path)
  }
}

/// Forward-slash form of a path, as git and zip entry lists expect
pub fn path_to_git_format(path: &Path) -> String {
  #[cfg(target_os = "windows")]
  {
    path.to_string_lossy().replace('\\', "/")
  }
  #[cfg(not(target_os = "windows"))]
  {
    path.to_string_lossy().to_string()
  }
}

//! Error types for plugin-release with contextual messages
//!
//! Every fatal condition the pipeline can hit is one of these variants. Errors
//! carry an optional help message that is printed under the error itself.
//! The process exits with status 1 for every variant; the category only drives
//! the help text.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Main error type for plugin-release
#[derive(Debug)]
pub enum ReleaseError {
  /// Configuration errors (CLI, release.toml, manifest)
  Config(ConfigError),

  /// External command errors (build tools, zip, gh)
  Command(CommandError),

  /// Git operation errors
  Git(GitError),

  /// I/O errors
  Io(io::Error),

  /// A pipeline stage failed
  Stage { stage: String, source: Box<ReleaseError> },

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl ReleaseError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    ReleaseError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    ReleaseError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      ReleaseError::Message { message, context, help } => ReleaseError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      ReleaseError::Io(err) => ReleaseError::Message {
        message: ctx_str,
        context: Some(format!("I/O error: {}", err)),
        help: None,
      },
      _ => self,
    }
  }

  /// Name of the pipeline stage this error was raised in, if any
  pub fn stage(&self) -> Option<&str> {
    match self {
      ReleaseError::Stage { stage, .. } => Some(stage),
      _ => None,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      ReleaseError::Config(e) => e.help_message(),
      ReleaseError::Command(e) => e.help_message(),
      ReleaseError::Git(e) => e.help_message(),
      ReleaseError::Stage { source, .. } => source.help_message(),
      ReleaseError::Message { help, .. } => help.clone(),
      ReleaseError::Io(_) => None,
    }
  }
}

impl fmt::Display for ReleaseError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ReleaseError::Config(e) => write!(f, "{}", e),
      ReleaseError::Command(e) => write!(f, "{}", e),
      ReleaseError::Git(e) => write!(f, "{}", e),
      ReleaseError::Io(e) => write!(f, "I/O error: {}", e),
      ReleaseError::Stage { stage, source } => write!(f, "Stage '{}' failed: {}", stage, source),
      ReleaseError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for ReleaseError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      ReleaseError::Io(e) => Some(e),
      ReleaseError::Stage { source, .. } => Some(source.as_ref()),
      _ => None,
    }
  }
}

impl From<io::Error> for ReleaseError {
  fn from(err: io::Error) -> Self {
    ReleaseError::Io(err)
  }
}

impl From<String> for ReleaseError {
  fn from(msg: String) -> Self {
    ReleaseError::message(msg)
  }
}

impl From<&str> for ReleaseError {
  fn from(msg: &str) -> Self {
    ReleaseError::message(msg)
  }
}

impl From<toml_edit::de::Error> for ReleaseError {
  fn from(err: toml_edit::de::Error) -> Self {
    ReleaseError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<serde_json::Error> for ReleaseError {
  fn from(err: serde_json::Error) -> Self {
    ReleaseError::message(format!("JSON error: {}", err))
  }
}

impl From<regex::Error> for ReleaseError {
  fn from(err: regex::Error) -> Self {
    ReleaseError::message(format!("Pattern error: {}", err))
  }
}

impl From<globset::Error> for ReleaseError {
  fn from(err: globset::Error) -> Self {
    ReleaseError::message(format!("Invalid exclude pattern: {}", err))
  }
}

impl From<walkdir::Error> for ReleaseError {
  fn from(err: walkdir::Error) -> Self {
    ReleaseError::message(format!("Failed to walk directory: {}", err))
  }
}

impl From<std::path::StripPrefixError> for ReleaseError {
  fn from(err: std::path::StripPrefixError) -> Self {
    ReleaseError::message(format!("Path strip prefix error: {}", err))
  }
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
  /// Neither the command line nor the manifest yields a version
  NoVersion { manifest: PathBuf },

  /// Manifest file missing or unreadable
  ManifestNotFound { path: PathBuf },

  /// Missing required field
  MissingField { field: String },

  /// Unknown `KEY=VALUE` argument
  UnknownSetting { key: String },

  /// Config file could not be parsed
  Invalid { path: PathBuf, reason: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::NoVersion { manifest } => Some(format!(
        "Pass version=<x.y.z> or add a \"version\" field to {}",
        manifest.display()
      )),
      ConfigError::ManifestNotFound { .. } => {
        Some("Run plugin-release from the plugin root or set [package] manifest in release.toml".to_string())
      }
      ConfigError::MissingField { field } if field.starts_with("distribution.remote") => {
        Some("Add `remote = \"git@github.com:org/plugin-dist.git\"` under [distribution] in release.toml".to_string())
      }
      ConfigError::UnknownSetting { .. } => Some("Supported settings: outdir=<path>, version=<x.y.z>".to_string()),
      _ => None,
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::NoVersion { manifest } => {
        write!(f, "No version to release: none given and none found in {}", manifest.display())
      }
      ConfigError::ManifestNotFound { path } => write!(f, "Manifest not found: {}", path.display()),
      ConfigError::MissingField { field } => write!(f, "Missing required field in config: {}", field),
      ConfigError::UnknownSetting { key } => write!(f, "Unknown setting '{}'", key),
      ConfigError::Invalid { path, reason } => write!(f, "Invalid config {}: {}", path.display(), reason),
    }
  }
}

/// External (non-git) command errors
#[derive(Debug)]
pub enum CommandError {
  /// Program could not be started
  Spawn { command: String, reason: String },

  /// Program exited with a non-zero status
  Failed {
    command: String,
    exit_code: Option<i32>,
    stderr: String,
  },

  /// Captured output exceeded the buffer limit
  OutputLimitExceeded { command: String, limit: usize },
}

impl CommandError {
  fn help_message(&self) -> Option<String> {
    match self {
      CommandError::Spawn { command, .. } => {
        let program = command.split_whitespace().next().unwrap_or(command);
        Some(format!("Make sure `{}` is installed and on PATH", program))
      }
      CommandError::Failed { command, stderr, .. } if command.starts_with("gh ") => {
        if stderr.contains("auth") || stderr.contains("401") {
          Some("Authenticate the GitHub CLI with `gh auth login` or set GH_TOKEN".to_string())
        } else {
          None
        }
      }
      CommandError::OutputLimitExceeded { .. } => {
        Some("Reduce the command's output (e.g. quieter build flags) and re-run".to_string())
      }
      _ => None,
    }
  }
}

impl fmt::Display for CommandError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      CommandError::Spawn { command, reason } => write!(f, "Failed to run `{}`: {}", command, reason),
      CommandError::Failed {
        command,
        exit_code,
        stderr,
      } => {
        match exit_code {
          Some(code) => write!(f, "Command `{}` exited with status {}", command, code)?,
          None => write!(f, "Command `{}` was terminated by a signal", command)?,
        }
        if !stderr.trim().is_empty() {
          write!(f, "\n{}", stderr.trim_end())?;
        }
        Ok(())
      }
      CommandError::OutputLimitExceeded { command, limit } => {
        write!(f, "Output of `{}` exceeded the {} byte buffer", command, limit)
      }
    }
  }
}

/// Git operation errors
#[derive(Debug)]
pub enum GitError {
  /// Git command failed
  CommandFailed { command: String, stderr: String },

  /// Repository not found
  RepoNotFound { path: PathBuf },

  /// Clone failed
  CloneFailed { remote: String, reason: String },

  /// Push failed
  PushFailed {
    remote: String,
    refspec: String,
    reason: String,
  },
}

impl GitError {
  fn help_message(&self) -> Option<String> {
    match self {
      GitError::PushFailed { reason, .. } => {
        if reason.contains("non-fast-forward") || reason.contains("rejected") {
          Some("The remote has commits you don't have. Pull or reconcile the branch, then re-run.".to_string())
        } else if reason.contains("Permission denied") || reason.contains("permission denied") || reason.contains("403")
        {
          Some("Check your SSH key or token has push access to the repository.".to_string())
        } else {
          None
        }
      }
      GitError::CloneFailed { remote, .. } => Some(format!(
        "Check that {} exists and is reachable (distribution.remote in release.toml)",
        remote
      )),
      GitError::RepoNotFound { path } => Some(format!(
        "Run plugin-release inside the plugin's git checkout: {}",
        path.display()
      )),
      _ => None,
    }
  }
}

impl fmt::Display for GitError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      GitError::CommandFailed { command, stderr } => {
        write!(f, "Git command failed: {}\n{}", command, stderr.trim_end())
      }
      GitError::RepoNotFound { path } => write!(f, "Git repository not found at: {}", path.display()),
      GitError::CloneFailed { remote, reason } => write!(f, "Failed to clone {}: {}", remote, reason.trim_end()),
      GitError::PushFailed {
        remote,
        refspec,
        reason,
      } => write!(f, "Push of {} to {} failed: {}", refspec, remote, reason.trim_end()),
    }
  }
}

/// Result type alias for plugin-release
pub type ReleaseResult<T> = Result<T, ReleaseError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> ReleaseResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> ReleaseResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<ReleaseError>,
{
  fn context(self, ctx: impl Into<String>) -> ReleaseResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> ReleaseResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &ReleaseError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}

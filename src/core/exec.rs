//! External command execution
//!
//! Every tool the pipeline drives (git, npm, composer, zip, gh) goes through a
//! [`CommandRunner`]. Invocations are blocking, have no timeout, and capture
//! stdout/stderr up to [`MAX_OUTPUT_BYTES`]; larger output is a fatal error.
//!
//! Failure text is only ever inspected by [`classify_failure`].

use crate::core::error::{CommandError, ReleaseError, ReleaseResult};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

/// Combined stdout + stderr capture limit (10 MB)
pub const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// A fully described external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
  pub program: String,
  pub args: Vec<String>,
  pub cwd: PathBuf,
  /// Data written to the child's stdin
  pub stdin: Option<String>,
  /// Start from an empty environment (plus `env`)
  pub env_clear: bool,
  pub env: Vec<(String, String)>,
}

impl Invocation {
  pub fn new(program: impl Into<String>, cwd: impl AsRef<Path>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
      cwd: cwd.as_ref().to_path_buf(),
      stdin: None,
      env_clear: false,
      env: Vec::new(),
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  pub fn stdin(mut self, input: impl Into<String>) -> Self {
    self.stdin = Some(input.into());
    self
  }

  /// Human-readable command line, used in logs and errors
  pub fn display(&self) -> String {
    if self.args.is_empty() {
      self.program.clone()
    } else {
      format!("{} {}", self.program, self.args.join(" "))
    }
  }
}

/// Result of one external invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
  /// `None` when the process was killed by a signal
  pub exit_code: Option<i32>,
  pub stdout: String,
  pub stderr: String,
}

impl CommandOutput {
  pub fn success(&self) -> bool {
    self.exit_code == Some(0)
  }

  /// stderr and stdout together; git prints some failures on stdout
  pub fn combined(&self) -> String {
    format!("{}\n{}", self.stderr, self.stdout)
  }

  /// Turn a non-zero exit into a [`CommandError::Failed`]
  pub fn into_checked(self, invocation: &Invocation) -> ReleaseResult<CommandOutput> {
    if self.success() {
      Ok(self)
    } else {
      let stderr = if self.stderr.trim().is_empty() {
        self.stdout.clone()
      } else {
        self.stderr.clone()
      };
      Err(ReleaseError::Command(CommandError::Failed {
        command: invocation.display(),
        exit_code: self.exit_code,
        stderr,
      }))
    }
  }
}

/// Executes invocations; the seam between pipeline stages and the outside world
pub trait CommandRunner {
  /// Run to completion. `Err` only when the program could not be run or its
  /// output overflowed; a non-zero exit is reported through `CommandOutput`.
  fn run(&self, invocation: &Invocation) -> ReleaseResult<CommandOutput>;

  /// Run and fail on non-zero exit
  fn run_checked(&self, invocation: &Invocation) -> ReleaseResult<CommandOutput> {
    self.run(invocation)?.into_checked(invocation)
  }
}

/// Runs invocations as real child processes
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
  fn run(&self, invocation: &Invocation) -> ReleaseResult<CommandOutput> {
    tracing::debug!(command = %invocation.display(), cwd = %invocation.cwd.display(), "running");

    let mut cmd = Command::new(&invocation.program);
    cmd.args(&invocation.args).current_dir(&invocation.cwd);
    if invocation.env_clear {
      cmd.env_clear();
    }
    for (key, value) in &invocation.env {
      cmd.env(key, value);
    }
    let stdin = if invocation.stdin.is_some() {
      Stdio::piped()
    } else {
      Stdio::null()
    };

    let spawn_error = |e: io::Error| {
      ReleaseError::Command(CommandError::Spawn {
        command: invocation.display(),
        reason: e.to_string(),
      })
    };

    let mut child = cmd
      .stdin(stdin)
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .spawn()
      .map_err(spawn_error)?;

    let (captured, overflowed) = drain(&mut child, invocation.stdin.as_deref());
    let status = child.wait().map_err(spawn_error)?;

    if overflowed {
      return Err(ReleaseError::Command(CommandError::OutputLimitExceeded {
        command: invocation.display(),
        limit: MAX_OUTPUT_BYTES,
      }));
    }
    let (stdout, stderr) = captured.map_err(spawn_error)?;

    let result = CommandOutput {
      exit_code: status.code(),
      stdout: String::from_utf8_lossy(&stdout).into_owned(),
      stderr: String::from_utf8_lossy(&stderr).into_owned(),
    };
    tracing::debug!(command = %invocation.display(), exit_code = ?result.exit_code, "finished");
    Ok(result)
  }
}

enum Stream {
  Stdout,
  Stderr,
}

enum Capture {
  Complete(Vec<u8>),
  Overflow,
}

/// Feed stdin and read stdout/stderr concurrently, killing the child once the
/// combined output passes [`MAX_OUTPUT_BYTES`]. Returns the captured streams
/// and whether the limit was hit.
fn drain(child: &mut Child, input: Option<&str>) -> (io::Result<(Vec<u8>, Vec<u8>)>, bool) {
  let total = AtomicUsize::new(0);
  let (tx, rx) = mpsc::channel();

  thread::scope(|scope| {
    if let (Some(mut pipe), Some(input)) = (child.stdin.take(), input) {
      // A child may exit before reading all of its input
      scope.spawn(move || {
        let _ = pipe.write_all(input.as_bytes());
      });
    }
    if let Some(pipe) = child.stdout.take() {
      let (tx, total) = (tx.clone(), &total);
      scope.spawn(move || {
        let _ = tx.send((Stream::Stdout, capture(pipe, total)));
      });
    }
    if let Some(pipe) = child.stderr.take() {
      let (tx, total) = (tx.clone(), &total);
      scope.spawn(move || {
        let _ = tx.send((Stream::Stderr, capture(pipe, total)));
      });
    }
    drop(tx);

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let mut overflowed = false;
    let mut failure = None;
    for (stream, result) in rx {
      match result {
        Ok(Capture::Complete(bytes)) => match stream {
          Stream::Stdout => stdout = bytes,
          Stream::Stderr => stderr = bytes,
        },
        Ok(Capture::Overflow) => {
          if !overflowed {
            overflowed = true;
            let _ = child.kill();
          }
        }
        Err(e) => {
          let _ = child.kill();
          failure.get_or_insert(e);
        }
      }
    }

    match failure {
      Some(e) => (Err(e), overflowed),
      None => (Ok((stdout, stderr)), overflowed),
    }
  })
}

/// Read `pipe` to the end unless the shared total passes the limit first
fn capture(mut pipe: impl Read, total: &AtomicUsize) -> io::Result<Capture> {
  let mut buf = Vec::new();
  let mut chunk = [0u8; 8192];
  loop {
    let n = match pipe.read(&mut chunk) {
      Ok(0) => return Ok(Capture::Complete(buf)),
      Ok(n) => n,
      Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
      Err(e) => return Err(e),
    };
    if total.fetch_add(n, Ordering::Relaxed) + n > MAX_OUTPUT_BYTES {
      return Ok(Capture::Overflow);
    }
    buf.extend_from_slice(&chunk[..n]);
  }
}

/// Operations whose failures may be expected and harmless
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
  Commit,
  CreateHostedRelease,
}

/// How a failed invocation should be treated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureClass {
  /// Expected outcome; continue as if it succeeded
  Benign(&'static str),
  Fatal,
}

/// Map a failed command's output to benign or fatal.
///
/// Benign:
/// - commit with nothing staged ("nothing to commit", "no changes added to commit",
///   "nothing added to commit")
/// - hosted release whose tag already has a release ("already exists")
pub fn classify_failure(operation: Operation, output: &CommandOutput) -> FailureClass {
  let text = output.combined();
  match operation {
    Operation::Commit
      if ["nothing to commit", "no changes added to commit", "nothing added to commit"]
        .iter()
        .any(|phrase| text.contains(phrase)) =>
    {
      FailureClass::Benign("nothing to commit")
    }
    Operation::CreateHostedRelease if text.contains("already exists") => FailureClass::Benign("release already exists"),
    _ => FailureClass::Fatal,
  }
}

//! Test helpers for integration tests

use anyhow::{Context, Result};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const PLUGIN_PHP: &str = r#"<?php
/**
 * Plugin Name:       Invintus
 * Description:       Embed the Invintus video player.
 * Version:           2.0.0
 * Requires PHP:      7.4
 * License:           GPL-2.0-or-later
 */

define( 'PLUGIN_VERSION', '2.0.0' );
define( 'PLUGIN_DIR', plugin_dir_path( __FILE__ ) );
"#;

const COMPOSER_JSON: &str = r#"{
  "name": "invintus/invintus",
  "description": "Invintus video player block",
  "version": "2.0.0",
  "type": "wordpress-plugin",
  "require-dev": {
    "wp-coding-standards/wpcs": "^3.0"
  },
  "scripts": {
    "lint": "phpcs"
  }
}
"#;

/// Build tools replaced by shell scripts on PATH
const STUBS: &[(&str, &str)] = &[
  (
    "npm",
    r#"#!/bin/sh
if [ -n "$FAIL_BUILD" ]; then
  echo "Module not found: Error: Can't resolve './edit'" >&2
  exit 1
fi
mkdir -p build && echo "built" > build/index.js
"#,
  ),
  (
    "composer",
    r#"#!/bin/sh
mkdir -p vendor && echo "<?php // autoload" > vendor/autoload.php
"#,
  ),
  (
    "zip",
    r#"#!/bin/sh
# zip -r -q <zip> -@ : record the entry list as the archive
cat > "$3"
"#,
  ),
  (
    "gh",
    r#"#!/bin/sh
echo "$*" >> "$GH_STATE/log"
if [ -n "$GH_FAIL" ]; then
  echo "HTTP 401: Bad credentials (https://api.github.com/graphql)" >&2
  exit 1
fi
key=$(printf '%s' "$*" | cksum | cut -d' ' -f1)
if [ -e "$GH_STATE/$key" ]; then
  echo "a release with the same tag name already exists: $3" >&2
  exit 1
fi
touch "$GH_STATE/$key"
"#,
  ),
];

/// A plugin checkout with a source remote, an empty distribution remote and
/// stubbed build tools
pub struct TestPlugin {
  _root: TempDir,
  pub path: PathBuf,
  pub dist_remote: PathBuf,
  pub source_remote: PathBuf,
  bin: PathBuf,
  home: PathBuf,
  gh_state: PathBuf,
}

impl TestPlugin {
  pub fn new() -> Result<Self> {
    let root = TempDir::new()?;
    let base = root.path().to_path_buf();
    let path = base.join("invintus");
    let dist_remote = base.join("invintus-dist.git");
    let source_remote = base.join("invintus-source.git");
    let bin = base.join("bin");
    let home = base.join("home");
    let gh_state = base.join("gh");

    for dir in [&path, &bin, &home, &gh_state] {
      fs::create_dir_all(dir)?;
    }
    fs::write(
      home.join(".gitconfig"),
      "[user]\n  name = Release Bot\n  email = release@example.com\n[init]\n  defaultBranch = main\n",
    )?;
    for (name, script) in STUBS {
      let stub = bin.join(name);
      fs::write(&stub, script)?;
      fs::set_permissions(&stub, fs::Permissions::from_mode(0o755))?;
    }

    let plugin = Self {
      _root: root,
      path,
      dist_remote,
      source_remote,
      bin,
      home,
      gh_state,
    };

    plugin.write("invintus.php", PLUGIN_PHP)?;
    plugin.write("composer.json", COMPOSER_JSON)?;
    plugin.write("package.json", "{\n  \"name\": \"invintus\",\n  \"version\": \"2.0.0\"\n}\n")?;
    plugin.write("src/edit.js", "export default function Edit() {}\n")?;
    plugin.write("templates/player.php", "<div class=\"invintus-player\"></div>\n")?;
    plugin.write("readme.txt", "=== Invintus ===\nStable tag: 2.0.0\n")?;
    plugin.write("README.md", "# Invintus\n")?;
    plugin.write(
      "release.toml",
      r#"[distribution]
remote = "../invintus-dist.git"

[publish]
source_repo = "invintus/invintus"
distribution_repo = "invintus/invintus-dist"
"#,
    )?;

    plugin.git(&["init", "--initial-branch=main"])?;
    plugin.git(&["add", "."])?;
    plugin.git(&["commit", "-m", "Initial plugin"])?;

    plugin.git_in(&plugin.source_remote.clone(), &["init", "--bare", "--initial-branch=main", "."])?;
    plugin.git_in(&plugin.dist_remote.clone(), &["init", "--bare", "--initial-branch=main", "."])?;
    let source = plugin.source_remote.to_string_lossy().into_owned();
    plugin.git(&["remote", "add", "origin", &source])?;
    plugin.git(&["push", "-q", "origin", "main"])?;

    Ok(plugin)
  }

  pub fn write(&self, rel: &str, content: &str) -> Result<()> {
    let file = self.path.join(rel);
    if let Some(parent) = file.parent() {
      fs::create_dir_all(parent)?;
    }
    fs::write(file, content)?;
    Ok(())
  }

  pub fn read(&self, rel: &str) -> Result<String> {
    fs::read_to_string(self.path.join(rel)).with_context(|| format!("reading {}", rel))
  }

  pub fn exists(&self, rel: &str) -> bool {
    self.path.join(rel).exists()
  }

  /// Run git in the plugin checkout
  pub fn git(&self, args: &[&str]) -> Result<String> {
    self.git_in(&self.path, args)
  }

  /// Run git in `dir` (created if missing) with the test identity
  pub fn git_in(&self, dir: &Path, args: &[&str]) -> Result<String> {
    fs::create_dir_all(dir)?;
    let output = Command::new("git")
      .current_dir(dir)
      .args(args)
      .env("HOME", &self.home)
      .env("GIT_CONFIG_NOSYSTEM", "1")
      .output()
      .context("Failed to run git command")?;

    if !output.status.success() {
      anyhow::bail!(
        "Git command failed: git {}\n{}",
        args.join(" "),
        String::from_utf8_lossy(&output.stderr)
      );
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
  }

  /// Files on `branch` of a bare remote
  pub fn remote_files(&self, remote: &Path, branch: &str) -> Result<Vec<String>> {
    let out = self.git_in(remote, &["ls-tree", "-r", "--name-only", branch])?;
    Ok(out.lines().map(String::from).collect())
  }

  /// Commit subjects on `branch` of a bare remote, newest first
  pub fn remote_log(&self, remote: &Path, branch: &str) -> Result<Vec<String>> {
    let out = self.git_in(remote, &["log", "--format=%s", branch])?;
    Ok(out.lines().map(String::from).collect())
  }

  pub fn remote_tags(&self, remote: &Path) -> Result<Vec<String>> {
    let out = self.git_in(remote, &["tag", "--list"])?;
    Ok(out.lines().map(String::from).collect())
  }

  pub fn remote_show(&self, remote: &Path, spec: &str) -> Result<String> {
    self.git_in(remote, &["show", spec])
  }

  /// Every `gh` invocation so far
  pub fn gh_calls(&self) -> Vec<String> {
    fs::read_to_string(self.gh_state.join("log"))
      .map(|log| log.lines().map(String::from).collect())
      .unwrap_or_default()
  }

  /// Run plugin-release in the plugin checkout
  pub fn run(&self, args: &[&str], env: &[(&str, &str)]) -> Result<Output> {
    let path_var = format!(
      "{}:{}",
      self.bin.display(),
      std::env::var("PATH").unwrap_or_default()
    );
    Command::new(env!("CARGO_BIN_EXE_plugin-release"))
      .current_dir(&self.path)
      .args(args)
      .env("PATH", path_var)
      .env("HOME", &self.home)
      .env("GH_STATE", &self.gh_state)
      .env("GIT_CONFIG_NOSYSTEM", "1")
      .env_remove("RUST_LOG")
      .envs(env.iter().copied())
      .output()
      .context("Failed to run plugin-release")
  }

  /// Run plugin-release and require success
  pub fn release(&self, args: &[&str]) -> Result<Output> {
    let output = self.run(args, &[])?;
    if !output.status.success() {
      anyhow::bail!(
        "plugin-release {} failed\nstdout: {}\nstderr: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
      );
    }
    Ok(output)
  }
}

pub fn stderr(output: &Output) -> String {
  String::from_utf8_lossy(&output.stderr).into_owned()
}

pub fn stdout(output: &Output) -> String {
  String::from_utf8_lossy(&output.stdout).into_owned()
}

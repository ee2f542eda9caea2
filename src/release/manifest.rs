//! JSON package manifests (composer.json / package.json)
//!
//! Manifests are edited as untyped JSON so unknown fields and key order
//! survive a version rewrite. Files are written back with 2-space indentation
//! and a trailing newline.

use crate::core::error::{ConfigError, ReleaseError, ReleaseResult, ResultExt};
use serde_json::{Map, Value, json};
use std::fs;
use std::path::{Path, PathBuf};

/// The development manifest the release is driven from
#[derive(Debug, Clone)]
pub struct PackageManifest {
  pub path: PathBuf,
  /// Full package name, e.g. `invintus/invintus`
  pub name: String,
  pub version: Option<String>,
  pub description: Option<String>,
}

impl PackageManifest {
  /// Read `name` and `version` from a JSON manifest
  pub fn load(path: &Path) -> ReleaseResult<Self> {
    if !path.exists() {
      return Err(ReleaseError::Config(ConfigError::ManifestNotFound {
        path: path.to_path_buf(),
      }));
    }
    let doc = read_json(path)?;

    let name = doc
      .get("name")
      .and_then(Value::as_str)
      .filter(|n| !n.trim().is_empty())
      .ok_or_else(|| {
        ReleaseError::Config(ConfigError::MissingField {
          field: format!("name in {}", path.display()),
        })
      })?
      .to_string();
    let version = doc
      .get("version")
      .and_then(Value::as_str)
      .map(str::to_string)
      .filter(|v| !v.trim().is_empty());
    let description = doc.get("description").and_then(Value::as_str).map(str::to_string);

    Ok(Self {
      path: path.to_path_buf(),
      name,
      version,
      description,
    })
  }

  /// Plugin slug: the package name without its vendor prefix
  pub fn slug(&self) -> &str {
    self.name.rsplit('/').next().unwrap_or(&self.name)
  }
}

/// Read and parse a JSON file
pub fn read_json(path: &Path) -> ReleaseResult<Value> {
  let content = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
  serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Write JSON with 2-space indentation and a trailing newline
pub fn write_json(path: &Path, value: &Value) -> ReleaseResult<()> {
  let mut content = serde_json::to_string_pretty(value)?;
  content.push('\n');
  fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

/// Set the top-level `version` field of a JSON manifest in place
pub fn set_version(path: &Path, version: &str) -> ReleaseResult<()> {
  let mut doc = read_json(path)?;
  let Value::Object(map) = &mut doc else {
    return Err(ReleaseError::message(format!(
      "{} is not a JSON object",
      path.display()
    )));
  };
  map.insert("version".to_string(), Value::String(version.to_string()));
  write_json(path, &doc)
}

/// Fields of the synthesized publish-time manifest
#[derive(Debug, Clone)]
pub struct PublishManifest<'a> {
  pub name: &'a str,
  pub package_type: &'a str,
  pub description: &'a str,
  pub license: &'a str,
}

impl PublishManifest<'_> {
  /// Minimal manifest for the distribution package: no dev dependencies,
  /// scripts, autoload-dev or other internal metadata
  pub fn to_json(&self) -> Value {
    json!({
      "name": self.name,
      "type": self.package_type,
      "description": self.description,
      "license": self.license,
      "require": Value::Object(Map::new()),
    })
  }

  pub fn write(&self, path: &Path) -> ReleaseResult<()> {
    write_json(path, &self.to_json())
  }
}

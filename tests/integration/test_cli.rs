//! Command-line surface: settings, configuration errors, report output

use crate::helpers::{TestPlugin, stderr, stdout};
use anyhow::Result;

#[test]
fn test_unknown_setting_fails_without_side_effects() -> Result<()> {
  let plugin = TestPlugin::new()?;

  let output = plugin.run(&["channel=beta"], &[])?;

  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("Unknown setting 'channel'"));
  assert!(!plugin.exists("build"));
  Ok(())
}

#[test]
fn test_missing_version_fails_without_side_effects() -> Result<()> {
  let plugin = TestPlugin::new()?;
  plugin.write("composer.json", "{\n  \"name\": \"invintus/invintus\"\n}\n")?;
  let before = plugin.read("invintus.php")?;

  let output = plugin.run(&[], &[])?;

  assert_eq!(output.status.code(), Some(1));
  let err = stderr(&output);
  assert!(err.contains("No version to release"), "{err}");
  assert!(err.contains("version=<x.y.z>"), "{err}");
  assert_eq!(plugin.read("invintus.php")?, before);
  assert!(!plugin.exists("build"));
  Ok(())
}

#[test]
fn test_push_without_remote_is_config_error() -> Result<()> {
  let plugin = TestPlugin::new()?;
  plugin.write("release.toml", "[package]\nversion_constant = \"PLUGIN_VERSION\"\n")?;

  let output = plugin.run(&["version=2.1.0", "--push"], &[])?;

  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("distribution.remote"));
  assert!(plugin.read("invintus.php")?.contains("Version:           2.0.0"));
  Ok(())
}

#[test]
fn test_invalid_config_is_rejected() -> Result<()> {
  let plugin = TestPlugin::new()?;
  plugin.write("release.toml", "[distribution]\nstrategy = \"everything\"\n")?;

  let output = plugin.run(&[], &[])?;
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("Invalid config"));
  Ok(())
}

#[test]
fn test_two_component_version_warns_but_succeeds() -> Result<()> {
  let plugin = TestPlugin::new()?;

  let output = plugin.release(&["version=1.2", "--no-zip"])?;

  assert!(stderr(&output).contains("MAJOR.MINOR.PATCH"));
  let php = plugin.read("invintus.php")?;
  assert!(php.contains("Version: 1.2\n"));
  assert!(php.contains("define( 'PLUGIN_VERSION', '1.2' );"));
  assert!(!plugin.exists("invintus.zip"));
  Ok(())
}

#[test]
fn test_leading_v_is_stripped() -> Result<()> {
  let plugin = TestPlugin::new()?;

  plugin.release(&["version=v2.3.4", "--no-zip"])?;
  assert!(plugin.read("composer.json")?.contains("\"version\": \"2.3.4\""));
  Ok(())
}

#[test]
fn test_json_report() -> Result<()> {
  let plugin = TestPlugin::new()?;

  let output = plugin.release(&["version=2.1.0", "--json"])?;

  let report: serde_json::Value = serde_json::from_str(&stdout(&output))?;
  assert_eq!(report["success"], true);
  assert_eq!(report["version"], "2.1.0");
  assert_eq!(report["stages"].as_array().map(Vec::len), Some(7));
  assert_eq!(report["stages"][3]["status"], "skipped");
  assert_eq!(report["artifact"]["sha256"].as_str().map(str::len), Some(64));
  assert!(report["finished_at"].is_string());
  Ok(())
}

#[test]
fn test_explicit_config_path() -> Result<()> {
  let plugin = TestPlugin::new()?;
  plugin.write("ci/release.toml", "[distribution]\ninclude = [\"invintus.php\", \"build\"]\n")?;

  plugin.release(&["--config", "ci/release.toml"])?;
  assert_eq!(plugin.read("invintus.zip")?, "invintus.php\nbuild\n");
  Ok(())
}

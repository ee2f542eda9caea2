//! End-to-end release runs against local repositories

use crate::helpers::{TestPlugin, stderr, stdout};
use anyhow::Result;

#[test]
fn test_push_and_create_release_end_to_end() -> Result<()> {
  let plugin = TestPlugin::new()?;

  plugin.release(&["version=2.1.0", "--push", "--create-release"])?;

  // Version written into every location
  let php = plugin.read("invintus.php")?;
  assert!(php.contains(" * Version: 2.1.0\n"));
  assert!(php.contains("define( 'PLUGIN_VERSION', '2.1.0' );"));
  assert!(plugin.read("composer.json")?.contains("\"version\": \"2.1.0\""));
  assert!(plugin.read("package.json")?.contains("\"version\": \"2.1.0\""));

  // Distribution repository holds exactly the include list plus the publish manifest
  let files = plugin.remote_files(&plugin.dist_remote, "main")?;
  for expected in [
    "invintus.php",
    "build/index.js",
    "vendor/autoload.php",
    "templates/player.php",
    "readme.txt",
    "composer.json",
  ] {
    assert!(files.contains(&expected.to_string()), "missing {expected} in {files:?}");
  }
  for unexpected in ["src/edit.js", "README.md", "package.json", "release.toml", "invintus.zip"] {
    assert!(!files.contains(&unexpected.to_string()), "{unexpected} leaked into {files:?}");
  }
  assert_eq!(plugin.remote_log(&plugin.dist_remote, "main")?, ["Release v2.1.0"]);

  let manifest: serde_json::Value = serde_json::from_str(&plugin.remote_show(&plugin.dist_remote, "main:composer.json")?)?;
  let keys: Vec<&str> = manifest.as_object().unwrap().keys().map(String::as_str).collect();
  assert_eq!(keys, ["name", "type", "description", "license", "require"]);
  assert_eq!(manifest["name"], "invintus/invintus");
  assert_eq!(manifest["description"], "Invintus video player block");

  // Both repositories tagged and pushed
  assert_eq!(plugin.remote_tags(&plugin.dist_remote)?, ["v2.1.0"]);
  assert_eq!(plugin.remote_tags(&plugin.source_remote)?, ["v2.1.0"]);
  assert_eq!(plugin.remote_log(&plugin.source_remote, "main")?[0], "Release v2.1.0");
  let tag = plugin.remote_show(&plugin.source_remote, "v2.1.0")?;
  assert!(tag.starts_with("tag v2.1.0"), "expected an annotated tag: {tag}");

  // Zip packaged from the distribution checkout
  assert_eq!(
    plugin.read("invintus.zip")?,
    "invintus.php\nbuild\nvendor\ntemplates\nreadme.txt\n"
  );

  // One hosted release per repository
  let calls = plugin.gh_calls();
  assert_eq!(calls.len(), 2);
  assert!(calls[0].starts_with("release create v2.1.0 "));
  assert!(calls[0].ends_with("--repo invintus/invintus-dist"));
  assert!(calls[1].ends_with("--repo invintus/invintus"));
  assert!(calls.iter().all(|c| c.contains("--title v2.1.0")));

  // Workspace removed after success
  assert!(!plugin.exists(".dist"));
  Ok(())
}

#[test]
fn test_rerun_is_idempotent() -> Result<()> {
  let plugin = TestPlugin::new()?;

  plugin.release(&["version=2.1.0", "--push", "--create-release"])?;
  let output = plugin.release(&["version=2.1.0", "--push", "--create-release"])?;

  let out = stdout(&output);
  assert!(out.contains("nothing to commit"), "{out}");
  assert!(out.contains("already exists"), "{out}");

  assert_eq!(plugin.remote_log(&plugin.dist_remote, "main")?, ["Release v2.1.0"]);
  assert_eq!(plugin.remote_tags(&plugin.dist_remote)?, ["v2.1.0"]);
  assert_eq!(plugin.remote_tags(&plugin.source_remote)?, ["v2.1.0"]);
  let source_log = plugin.remote_log(&plugin.source_remote, "main")?;
  assert_eq!(source_log.iter().filter(|s| *s == "Release v2.1.0").count(), 1);
  assert_eq!(plugin.gh_calls().len(), 4);
  Ok(())
}

#[test]
fn test_second_release_replaces_distribution_contents() -> Result<()> {
  let plugin = TestPlugin::new()?;
  plugin.write("templates/legacy.php", "<?php // old\n")?;
  plugin.git(&["add", "."])?;
  plugin.git(&["commit", "-q", "-m", "Add legacy template"])?;

  plugin.release(&["version=2.1.0", "--push"])?;
  assert!(plugin.remote_files(&plugin.dist_remote, "main")?.contains(&"templates/legacy.php".to_string()));

  std::fs::remove_file(plugin.path.join("templates/legacy.php"))?;
  plugin.release(&["version=2.2.0", "--push"])?;

  let files = plugin.remote_files(&plugin.dist_remote, "main")?;
  assert!(!files.contains(&"templates/legacy.php".to_string()), "stale file survived: {files:?}");
  assert_eq!(
    plugin.remote_log(&plugin.dist_remote, "main")?,
    ["Release v2.2.0", "Release v2.1.0"]
  );
  assert_eq!(plugin.remote_tags(&plugin.dist_remote)?, ["v2.1.0", "v2.2.0"]);
  Ok(())
}

#[test]
fn test_local_run_packages_from_source_tree() -> Result<()> {
  let plugin = TestPlugin::new()?;

  let output = plugin.release(&["outdir=dist"])?;

  assert_eq!(
    plugin.read("dist/invintus.zip")?,
    "invintus.php\nbuild\nvendor\ntemplates\nreadme.txt\n"
  );
  assert!(stdout(&output).contains("Next steps"));
  // Manifest version reused, nothing published
  assert!(plugin.read("invintus.php")?.contains("Version: 2.0.0"));
  assert!(plugin.remote_tags(&plugin.dist_remote)?.is_empty());
  assert!(plugin.remote_tags(&plugin.source_remote)?.is_empty());
  assert!(plugin.gh_calls().is_empty());
  assert!(!plugin.exists(".dist"));
  Ok(())
}

#[test]
fn test_stale_zip_is_replaced() -> Result<()> {
  let plugin = TestPlugin::new()?;
  plugin.write("invintus.zip", "stale archive")?;

  plugin.release(&[])?;
  assert!(!plugin.read("invintus.zip")?.contains("stale"));
  Ok(())
}

#[test]
fn test_no_tag_pushes_branches_only() -> Result<()> {
  let plugin = TestPlugin::new()?;

  let output = plugin.release(&["version=2.1.0", "--push", "--no-tag", "--create-release"])?;

  assert_eq!(plugin.remote_log(&plugin.dist_remote, "main")?, ["Release v2.1.0"]);
  assert!(plugin.remote_tags(&plugin.dist_remote)?.is_empty());
  assert!(plugin.remote_tags(&plugin.source_remote)?.is_empty());
  assert!(plugin.gh_calls().is_empty());
  assert!(stderr(&output).contains("tagging is disabled"));
  Ok(())
}

#[test]
fn test_no_zip_skips_hosted_releases() -> Result<()> {
  let plugin = TestPlugin::new()?;

  let output = plugin.release(&["version=2.1.0", "--push", "--no-zip", "--create-release"])?;

  assert!(!plugin.exists("invintus.zip"));
  assert!(plugin.gh_calls().is_empty());
  assert!(stderr(&output).contains("no artifact was packaged"));
  assert_eq!(plugin.remote_tags(&plugin.dist_remote)?, ["v2.1.0"]);
  Ok(())
}

#[test]
fn test_hosted_release_failure_keeps_workspace() -> Result<()> {
  let plugin = TestPlugin::new()?;

  let output = plugin.run(&["version=2.1.0", "--push", "--create-release"], &[("GH_FAIL", "1")])?;

  assert_eq!(output.status.code(), Some(1));
  let err = stderr(&output);
  assert!(err.contains("Stage 'publish' failed"), "{err}");
  assert!(err.contains("invintus/invintus-dist") && err.contains("invintus/invintus"), "{err}");
  assert!(err.contains("kept for inspection"), "{err}");
  // Both repositories were attempted
  assert_eq!(plugin.gh_calls().len(), 2);
  assert!(plugin.exists(".dist/invintus/.git"));
  // Earlier side effects stay in place
  assert_eq!(plugin.remote_tags(&plugin.dist_remote)?, ["v2.1.0"]);
  Ok(())
}

#[test]
fn test_build_failure_aborts_before_packaging() -> Result<()> {
  let plugin = TestPlugin::new()?;

  let output = plugin.run(&["version=2.1.0", "--push"], &[("FAIL_BUILD", "1")])?;

  assert_eq!(output.status.code(), Some(1));
  let err = stderr(&output);
  assert!(err.contains("Build step 'assets' failed"), "{err}");
  assert!(err.contains("Can't resolve"), "{err}");
  assert!(!plugin.exists("invintus.zip"));
  assert!(plugin.remote_tags(&plugin.dist_remote)?.is_empty());
  Ok(())
}

#[test]
fn test_exclude_strategy_still_works() -> Result<()> {
  let plugin = TestPlugin::new()?;
  plugin.write(
    "release.toml",
    "[distribution]\nstrategy = \"exclude\"\nremote = \"../invintus-dist.git\"\n",
  )?;
  plugin.write("debug.log", "oops\n")?;

  let output = plugin.release(&["version=2.1.0", "--push"])?;
  assert!(stderr(&output).contains("deprecated"));

  let files = plugin.remote_files(&plugin.dist_remote, "main")?;
  assert!(files.contains(&"invintus.php".to_string()));
  assert!(files.contains(&"vendor/autoload.php".to_string()));
  // Exclude lists ship anything they don't name
  assert!(files.contains(&"debug.log".to_string()));
  assert!(!files.contains(&"src/edit.js".to_string()));
  assert!(!files.iter().any(|f| f.ends_with(".zip")));
  Ok(())
}

#[test]
fn test_version_bump_leaves_prestaged_changes_alone() -> Result<()> {
  let plugin = TestPlugin::new()?;
  plugin.write("inc/unfinished.php", "<?php // work in progress\n")?;
  plugin.git(&["add", "inc/unfinished.php"])?;

  plugin.release(&["version=2.1.0", "--push"])?;

  let files = plugin.remote_files(&plugin.source_remote, "main")?;
  assert!(!files.contains(&"inc/unfinished.php".to_string()), "staged file swept into release: {files:?}");
  assert_eq!(plugin.remote_log(&plugin.source_remote, "main")?[0], "Release v2.1.0");
  assert!(plugin.remote_show(&plugin.source_remote, "main:composer.json")?.contains("\"version\": \"2.1.0\""));
  // Still staged for the operator's own commit
  assert_eq!(plugin.git(&["diff", "--cached", "--name-only"])?.trim(), "inc/unfinished.php");
  Ok(())
}

#[test]
fn test_push_from_other_branch_is_rejected() -> Result<()> {
  let plugin = TestPlugin::new()?;
  plugin.git(&["checkout", "-q", "-b", "feature/captions"])?;

  let output = plugin.run(&["version=2.1.0", "--push"], &[])?;

  assert_eq!(output.status.code(), Some(1));
  let err = stderr(&output);
  assert!(err.contains("feature/captions"), "{err}");
  assert!(err.contains("publish.source_branch"), "{err}");
  assert!(plugin.read("invintus.php")?.contains("Version:           2.0.0"));
  assert!(plugin.remote_tags(&plugin.dist_remote)?.is_empty());
  assert!(plugin.remote_tags(&plugin.source_remote)?.is_empty());
  Ok(())
}

#[test]
fn test_commit_identity_from_environment() -> Result<()> {
  let plugin = TestPlugin::new()?;

  let output = plugin.run(
    &["version=2.1.0", "--push"],
    &[
      ("GIT_AUTHOR_NAME", "CI Release"),
      ("GIT_AUTHOR_EMAIL", "ci@example.com"),
      ("GIT_COMMITTER_NAME", "CI Release"),
      ("GIT_COMMITTER_EMAIL", "ci@example.com"),
    ],
  )?;
  assert!(output.status.success(), "{}", stderr(&output));

  let authors = plugin.git_in(&plugin.dist_remote.clone(), &["log", "--format=%an <%ce>", "main"])?;
  assert_eq!(authors.trim(), "CI Release <ci@example.com>");
  let source = plugin.git_in(&plugin.source_remote.clone(), &["log", "-1", "--format=%an", "main"])?;
  assert_eq!(source.trim(), "CI Release");
  Ok(())
}

#[test]
fn test_previous_artifact_in_included_directory_is_not_distributed() -> Result<()> {
  let plugin = TestPlugin::new()?;
  plugin.release(&["outdir=build"])?;
  assert!(plugin.exists("build/invintus.zip"));

  plugin.release(&["version=2.1.0", "outdir=build", "--push"])?;

  let files = plugin.remote_files(&plugin.dist_remote, "main")?;
  assert!(files.contains(&"build/index.js".to_string()));
  assert!(!files.contains(&"build/invintus.zip".to_string()), "artifact leaked: {files:?}");
  Ok(())
}

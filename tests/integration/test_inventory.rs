//! Tests for discovery: inventorize, module, info and lint

use crate::helpers::*;
use anyhow::Result;

fn two_module_repo() -> Result<TestRepo> {
  let repo = TestRepo::new()?;
  repo.add_module("modules/alpha", "ch.open:alpha")?;
  repo.add_module("tools/deep/beta", "ch.open:beta")?;
  repo.commit("Add modules")?;
  Ok(repo)
}

#[test]
fn test_inventorize_lists_all_modules() -> Result<()> {
  let repo = two_module_repo()?;

  let output = run_kaeter(&repo.path, &["inventorize"])?;
  let inventory: serde_json::Value = serde_json::from_str(&stdout(&output))?;
  let modules = inventory["modules"].as_object().expect("modules object");
  assert_eq!(modules.len(), 2);
  assert_eq!(modules["ch.open:beta"]["path"], "tools/deep/beta");
  assert_eq!(modules["ch.open:alpha"]["latest_version"], "0.0.0");

  Ok(())
}

#[test]
fn test_path_limits_discovery() -> Result<()> {
  let repo = two_module_repo()?;

  let output = run_kaeter(&repo.path, &["inventorize", "--path", "tools"])?;
  let inventory: serde_json::Value = serde_json::from_str(&stdout(&output))?;
  let modules = inventory["modules"].as_object().expect("modules object");
  assert_eq!(modules.len(), 1);
  assert!(modules.contains_key("ch.open:beta"));

  Ok(())
}

#[test]
fn test_duplicate_module_ids_fail() -> Result<()> {
  let repo = two_module_repo()?;
  repo.add_module("copy", "ch.open:alpha")?;

  let output = kaeter(&repo.path, &["inventorize"])?;
  assert_eq!(output.status.code(), Some(3));
  assert!(stderr(&output).contains("ch.open:alpha"));

  Ok(())
}

#[test]
fn test_module_lookup() -> Result<()> {
  let repo = two_module_repo()?;

  let output = run_kaeter(&repo.path, &["module", "ch.open:alpha"])?;
  let entry: serde_json::Value = serde_json::from_str(&stdout(&output))?;
  assert_eq!(entry["ledger_path"], "modules/alpha/versions.yaml");

  let output = kaeter(&repo.path, &["module", "ch.open:missing"])?;
  assert_eq!(output.status.code(), Some(1));

  Ok(())
}

#[test]
fn test_info_json() -> Result<()> {
  let repo = two_module_repo()?;

  let output = run_kaeter(&repo.path, &["info", "ch.open:beta", "--json"])?;
  let info: serde_json::Value = serde_json::from_str(&stdout(&output))?;
  assert_eq!(info["id"], "ch.open:beta");
  assert_eq!(info["versioning"], "SemVer");
  assert_eq!(info["versions"][0]["commit_id"], "INIT");

  Ok(())
}

#[test]
fn test_lint_reports_missing_changelog() -> Result<()> {
  let repo = two_module_repo()?;
  run_kaeter(&repo.path, &["lint"])?;

  std::fs::remove_file(repo.path.join("modules/alpha/CHANGELOG.md"))?;
  let output = kaeter(&repo.path, &["lint"])?;
  assert!(!output.status.success());
  assert!(stdout(&output).contains("[changelog]"));

  // The other module still passes on its own
  run_kaeter(&repo.path, &["lint", "-m", "ch.open:beta"])?;

  Ok(())
}

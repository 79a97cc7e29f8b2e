//! Tests for `prepare` and `autorelease`

use crate::helpers::*;
use anyhow::Result;

/// Repository with one committed module whose CHANGELOG documents `versions`
fn repo_with_module(versions: &[&str]) -> Result<TestRepo> {
  let repo = TestRepo::new()?;
  repo.add_module("modules/alpha", "ch.open:alpha")?;
  repo.write_file("modules/alpha/CHANGELOG.md", &changelog(versions))?;
  repo.commit("Add alpha")?;
  Ok(repo)
}

fn changelog(versions: &[&str]) -> String {
  let mut text = String::from("# Changelog\n");
  for version in versions {
    text.push_str(&format!("\n## {}\n- changes\n", version));
  }
  text
}

#[test]
fn test_prepare_commits_release_plan() -> Result<()> {
  let repo = repo_with_module(&["0.0.1"])?;
  let base = repo.head()?;

  run_kaeter(&repo.path, &["prepare", "-m", "ch.open:alpha"])?;

  let message = repo.head_message()?;
  assert!(message.starts_with("[release] ch.open:alpha:0.0.1"));
  assert!(message.contains("Release Plan:"));
  assert!(message.contains("ch.open:alpha:0.0.1"));

  let ledger = repo.read_file("modules/alpha/versions.yaml")?;
  assert!(ledger.contains("0.0.1: "));
  assert!(ledger.contains(&format!("|{}", base)));

  // Only the ledger is part of the release commit
  let files = git(&repo.path, &["show", "--name-only", "--format=", "HEAD"])?;
  assert_eq!(String::from_utf8_lossy(&files.stdout).trim(), "modules/alpha/versions.yaml");

  Ok(())
}

#[test]
fn test_read_plan_of_prepared_commit() -> Result<()> {
  let repo = repo_with_module(&["0.1.0"])?;
  run_kaeter(&repo.path, &["prepare", "-m", "modules/alpha", "--minor"])?;

  let output = run_kaeter(&repo.path, &["read-plan", "--json"])?;
  let plan: serde_json::Value = serde_json::from_str(&stdout(&output))?;
  assert_eq!(plan["releases"][0], "ch.open:alpha:0.1.0");
  assert_eq!(plan["commit"], repo.head()?);
  assert_eq!(plan["planId"].as_str().map(str::len), Some(64));

  Ok(())
}

#[test]
fn test_prepare_several_modules() -> Result<()> {
  let repo = repo_with_module(&["1.0.0"])?;
  repo.add_module("modules/beta", "ch.open:beta")?;
  repo.write_file("modules/beta/CHANGELOG.md", &changelog(&["1.0.0"]))?;
  repo.commit("Add beta")?;

  run_kaeter(
    &repo.path,
    &["prepare", "-m", "ch.open:alpha", "-m", "ch.open:beta", "--major"],
  )?;

  let message = repo.head_message()?;
  assert!(message.starts_with("[release] ch.open:alpha:1.0.0 (+1 more modules)"));
  assert!(message.contains("ch.open:beta:1.0.0"));

  Ok(())
}

#[test]
fn test_failed_check_restores_ledger() -> Result<()> {
  // CHANGELOG does not document the new version
  let repo = repo_with_module(&[])?;
  let head = repo.head()?;
  let before = repo.read_file("modules/alpha/versions.yaml")?;

  let output = kaeter(&repo.path, &["prepare", "-m", "ch.open:alpha"])?;
  assert!(!output.status.success());
  assert!(stderr(&output).contains("0.0.1"));

  assert_eq!(repo.read_file("modules/alpha/versions.yaml")?, before);
  assert_eq!(repo.head()?, head);

  Ok(())
}

#[test]
fn test_failure_in_second_module_restores_first() -> Result<()> {
  let repo = repo_with_module(&["0.0.1"])?;
  repo.add_module("modules/beta", "ch.open:beta")?;
  repo.commit("Add beta without changelog entry")?;
  let alpha_before = repo.read_file("modules/alpha/versions.yaml")?;

  let output = kaeter(&repo.path, &["prepare", "-m", "ch.open:alpha", "-m", "ch.open:beta"])?;
  assert!(!output.status.success());
  assert_eq!(repo.read_file("modules/alpha/versions.yaml")?, alpha_before);

  let status = git(&repo.path, &["status", "--porcelain"])?;
  assert!(String::from_utf8_lossy(&status.stdout).trim().is_empty());

  Ok(())
}

#[test]
fn test_rejected_commit_restores_staged_ledger() -> Result<()> {
  use std::os::unix::fs::PermissionsExt;

  let repo = repo_with_module(&["0.0.1"])?;
  let head = repo.head()?;
  let before = repo.read_file("modules/alpha/versions.yaml")?;

  let hook = repo.path.join(".git").join("hooks").join("pre-commit");
  std::fs::create_dir_all(hook.parent().unwrap())?;
  std::fs::write(&hook, "#!/bin/sh\nexit 1\n")?;
  std::fs::set_permissions(&hook, std::fs::Permissions::from_mode(0o755))?;

  let output = kaeter(&repo.path, &["prepare", "-m", "ch.open:alpha"])?;
  assert_eq!(output.status.code(), Some(2));

  assert_eq!(repo.read_file("modules/alpha/versions.yaml")?, before);
  assert_eq!(repo.head()?, head);
  let status = git(&repo.path, &["status", "--porcelain"])?;
  assert!(String::from_utf8_lossy(&status.stdout).trim().is_empty());

  Ok(())
}

#[test]
fn test_prepare_without_commit() -> Result<()> {
  let repo = repo_with_module(&["0.0.1"])?;
  let head = repo.head()?;

  let output = run_kaeter(&repo.path, &["prepare", "-m", "ch.open:alpha", "--no-commit"])?;
  assert!(stdout(&output).contains("Release Plan:"));
  assert_eq!(repo.head()?, head);
  assert!(repo.read_file("modules/alpha/versions.yaml")?.contains("0.0.1: "));

  Ok(())
}

#[test]
fn test_prepare_refuses_dirty_ledger() -> Result<()> {
  let repo = repo_with_module(&["0.0.1"])?;
  let ledger = repo.read_file("modules/alpha/versions.yaml")?;
  repo.write_file("modules/alpha/versions.yaml", &format!("# local edit\n{}", ledger))?;

  let output = kaeter(&repo.path, &["prepare", "-m", "ch.open:alpha"])?;
  assert!(!output.status.success());
  assert!(stderr(&output).contains("uncommitted changes"));
  assert!(repo.read_file("modules/alpha/versions.yaml")?.starts_with("# local edit"));

  Ok(())
}

#[test]
fn test_anystringver_requires_version() -> Result<()> {
  let repo = TestRepo::new()?;
  run_kaeter(
    &repo.path,
    &["init", "--id", "ch.open:free", "--versioning", "AnyStringVer", "free"],
  )?;
  repo.write_file("free/CHANGELOG.md", &changelog(&["blue-whale"]))?;
  repo.commit("Add free")?;

  let output = kaeter(&repo.path, &["prepare", "-m", "ch.open:free"])?;
  assert_eq!(output.status.code(), Some(3));

  run_kaeter(&repo.path, &["prepare", "-m", "ch.open:free", "--version", "blue-whale"])?;
  assert!(repo.head_message()?.starts_with("[release] ch.open:free:blue-whale"));

  Ok(())
}

#[test]
fn test_autorelease_marks_ledger_without_committing() -> Result<()> {
  let repo = repo_with_module(&["0.0.1"])?;
  let head = repo.head()?;

  run_kaeter(&repo.path, &["autorelease", "-m", "modules/alpha", "--tag", "nightly"])?;

  let ledger = repo.read_file("modules/alpha/versions.yaml")?;
  assert!(ledger.contains("0.0.1: "));
  assert!(ledger.contains("|AUTORELEASE|nightly"));
  assert_eq!(repo.head()?, head);

  Ok(())
}

#[test]
fn test_unknown_module() -> Result<()> {
  let repo = repo_with_module(&["0.0.1"])?;
  let output = kaeter(&repo.path, &["prepare", "-m", "ch.open:nope"])?;
  assert_eq!(output.status.code(), Some(1));
  Ok(())
}

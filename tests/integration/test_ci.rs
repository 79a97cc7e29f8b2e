//! Tests for the autorelease CI flow

use crate::helpers::*;
use anyhow::Result;

/// Repository whose HEAD commits an AUTORELEASE entry for ch.open:alpha
fn autorelease_repo() -> Result<TestRepo> {
  let repo = TestRepo::new()?;
  repo.add_module("modules/alpha", "ch.open:alpha")?;
  repo.add_module("modules/beta", "ch.open:beta")?;
  repo.write_file("modules/alpha/CHANGELOG.md", "## 0.1.0\n- new\n")?;
  repo.commit("Add modules")?;
  run_kaeter(&repo.path, &["autorelease", "-m", "ch.open:alpha", "--minor"])?;
  repo.commit("Autorelease alpha")?;
  Ok(repo)
}

#[test]
fn test_autoreleaseplan_lists_changed_ledgers() -> Result<()> {
  let repo = autorelease_repo()?;

  let output = run_kaeter(&repo.path, &["ci", "autoreleaseplan"])?;
  let plan = stdout(&output);
  assert!(plan.contains("releases:"));
  assert!(plan.contains("ch.open:alpha:0.1.0"));
  assert!(!plan.contains("ch.open:beta"));

  Ok(())
}

#[test]
fn test_autorelease_plan_file_drives_ci_release() -> Result<()> {
  let repo = autorelease_repo()?;
  let plan_commit = repo.head()?;
  let (tool, log) = repo.fake_build_tool()?;
  let plan_dir = tempfile::TempDir::new()?;
  let plan_file = plan_dir.path().join("plan.yaml");

  run_kaeter(
    &repo.path,
    &["ci", "autoreleaseplan", "--output", plan_file.to_str().unwrap()],
  )?;
  assert!(std::fs::read_to_string(&plan_file)?.contains("ch.open:alpha:0.1.0"));

  let output = run_kaeter(
    &repo.path,
    &[
      "ci",
      "release",
      "--plan-file",
      plan_file.to_str().unwrap(),
      "--build-tool",
      tool.to_str().unwrap(),
    ],
  )?;
  // AUTORELEASE versions are built from the plan commit
  assert!(stdout(&output).contains(&plan_commit[..12]));
  let log = std::fs::read_to_string(log)?;
  assert_eq!(log.lines().count(), 3);
  assert!(log.lines().all(|l| l.contains("VERSION=0.1.0")));

  Ok(())
}

#[test]
fn test_commit_without_ledger_change_has_no_plan() -> Result<()> {
  let repo = autorelease_repo()?;
  repo.write_file("README.md", "# monorepo\n\nmore docs\n")?;
  repo.commit("Docs only")?;

  let output = run_kaeter(&repo.path, &["ci", "autoreleaseplan"])?;
  assert!(stdout(&output).contains("No autorelease pending"));

  // The autorelease commit itself can still be inspected
  let output = run_kaeter(&repo.path, &["ci", "autoreleaseplan", "--commit", "HEAD~1"])?;
  assert!(stdout(&output).contains("ch.open:alpha:0.1.0"));

  Ok(())
}

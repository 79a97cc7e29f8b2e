//! Tests for `release` and `ci release`

use crate::helpers::*;
use anyhow::Result;
use std::path::Path;

/// Repository whose HEAD is the release commit of ch.open:alpha:0.0.1
fn prepared_repo() -> Result<TestRepo> {
  let repo = TestRepo::new()?;
  repo.add_module("modules/alpha", "ch.open:alpha")?;
  repo.write_file("modules/alpha/CHANGELOG.md", "# Changelog\n\n## 0.0.1\n- first\n")?;
  repo.commit("Add alpha")?;
  run_kaeter(&repo.path, &["prepare", "-m", "ch.open:alpha"])?;
  Ok(repo)
}

fn log_lines(log: &Path) -> Vec<String> {
  std::fs::read_to_string(log)
    .unwrap_or_default()
    .lines()
    .map(String::from)
    .collect()
}

#[test]
fn test_release_runs_build_steps_at_ledger_commit() -> Result<()> {
  let repo = prepared_repo()?;
  let release_commit = repo.head()?;
  let (tool, log) = repo.fake_build_tool()?;

  let output = run_kaeter(&repo.path, &["release", "--build-tool", tool.to_str().unwrap()])?;
  assert!(stdout(&output).contains("ch.open:alpha:0.0.1 released"));

  let lines = log_lines(&log);
  assert_eq!(lines.len(), 3);
  for (line, step) in lines.iter().zip(["build", "test", "release"]) {
    assert!(line.starts_with(&repo.path.join("modules/alpha").display().to_string()));
    assert!(line.contains("-e VERSION=0.0.1"));
    assert!(line.ends_with(&format!(" {}", step)));
  }

  // Working tree is back where it started
  assert_eq!(repo.current_branch()?, "master");
  assert_eq!(repo.head()?, release_commit);

  Ok(())
}

#[test]
fn test_dry_run_skips_release_step() -> Result<()> {
  let repo = prepared_repo()?;
  let (tool, log) = repo.fake_build_tool()?;

  run_kaeter(
    &repo.path,
    &["release", "--dry-run", "--build-tool", tool.to_str().unwrap()],
  )?;

  let lines = log_lines(&log);
  assert_eq!(lines.len(), 2);
  assert!(lines.iter().all(|l| !l.ends_with(" release")));

  Ok(())
}

#[test]
fn test_skipped_modules_are_not_built() -> Result<()> {
  let repo = prepared_repo()?;
  let (tool, log) = repo.fake_build_tool()?;

  let output = run_kaeter(
    &repo.path,
    &[
      "release",
      "--skip-module",
      "ch.open:alpha",
      "--build-tool",
      tool.to_str().unwrap(),
    ],
  )?;
  assert!(stdout(&output).contains("skipped"));
  assert!(log_lines(&log).is_empty());

  Ok(())
}

#[test]
fn test_config_skip_list_and_build_tool() -> Result<()> {
  let repo = prepared_repo()?;
  let (tool, log) = repo.fake_build_tool()?;
  repo.write_file(
    "kaeter.toml",
    &format!(
      "[build]\ntool = \"{}\"\n\n[release]\nskip_modules = [\"ch.open:alpha\"]\n",
      tool.display()
    ),
  )?;

  let output = run_kaeter(&repo.path, &["release"])?;
  assert!(stdout(&output).contains("skipped"));
  assert!(log_lines(&log).is_empty());

  Ok(())
}

#[test]
fn test_release_requires_release_commit() -> Result<()> {
  let repo = TestRepo::new()?;
  let output = kaeter(&repo.path, &["release"])?;
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("not a release commit"));
  Ok(())
}

#[test]
fn test_commit_must_be_on_trunk() -> Result<()> {
  let repo = TestRepo::new()?;
  git(&repo.path, &["checkout", "-b", "feature"])?;
  repo.add_module("modules/alpha", "ch.open:alpha")?;
  repo.write_file("modules/alpha/CHANGELOG.md", "## 0.0.1\n")?;
  repo.commit("Add alpha on a branch")?;
  run_kaeter(&repo.path, &["prepare", "-m", "ch.open:alpha"])?;
  let (tool, log) = repo.fake_build_tool()?;

  let output = kaeter(&repo.path, &["release", "--build-tool", tool.to_str().unwrap()])?;
  assert_eq!(output.status.code(), Some(3));
  assert!(stderr(&output).contains("master"));
  assert!(log_lines(&log).is_empty());
  assert_eq!(repo.current_branch()?, "feature");

  // The same plan is accepted once the branch is the trunk
  run_kaeter(
    &repo.path,
    &[
      "release",
      "--git-main-branch",
      "feature",
      "--build-tool",
      tool.to_str().unwrap(),
    ],
  )?;
  assert_eq!(log_lines(&log).len(), 3);
  assert_eq!(repo.current_branch()?, "feature");

  Ok(())
}

#[test]
fn test_stale_plan_is_rejected() -> Result<()> {
  let repo = prepared_repo()?;
  let first_release = repo.head()?;
  repo.write_file("modules/alpha/CHANGELOG.md", "## 0.0.2\n\n## 0.0.1\n")?;
  repo.commit("Document 0.0.2")?;
  run_kaeter(&repo.path, &["prepare", "-m", "ch.open:alpha"])?;
  let (tool, log) = repo.fake_build_tool()?;

  let output = kaeter(
    &repo.path,
    &[
      "ci",
      "release",
      "--plan-commit",
      &first_release,
      "--build-tool",
      tool.to_str().unwrap(),
    ],
  )?;
  assert_eq!(output.status.code(), Some(3));
  assert!(stderr(&output).contains("0.0.2"));
  assert!(log_lines(&log).is_empty());

  Ok(())
}

#[test]
fn test_ci_release_from_plan_file() -> Result<()> {
  let repo = prepared_repo()?;
  let (tool, log) = repo.fake_build_tool()?;
  let plan_dir = tempfile::TempDir::new()?;
  let plan_file = plan_dir.path().join("plan.yaml");
  std::fs::write(&plan_file, "releases:\n  - ch.open:alpha:0.0.1\n")?;

  run_kaeter(
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
  assert_eq!(log_lines(&log).len(), 3);

  Ok(())
}

#[test]
fn test_failed_build_restores_branch() -> Result<()> {
  let repo = prepared_repo()?;
  let release_commit = repo.head()?;
  let (tool, log) = repo.fake_build_tool()?;
  std::fs::write(
    &tool,
    format!(
      "#!/bin/sh\necho \"$*\" >> '{}'\ncase \"$*\" in *\" test\") exit 1;; esac\n",
      log.display()
    ),
  )?;

  let output = kaeter(&repo.path, &["release", "--build-tool", tool.to_str().unwrap()])?;
  assert_eq!(output.status.code(), Some(2));
  assert_eq!(log_lines(&log).len(), 2);
  assert_eq!(repo.current_branch()?, "master");
  assert_eq!(repo.head()?, release_commit);

  Ok(())
}

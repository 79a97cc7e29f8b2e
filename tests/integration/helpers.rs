//! Test helpers for integration tests

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// A git repository on `master` with one initial commit
pub struct TestRepo {
  _root: TempDir,
  pub path: PathBuf,
}

impl TestRepo {
  pub fn new() -> Result<Self> {
    let root = TempDir::new()?;
    // git reports the resolved path; keep ours comparable
    let path = root.path().canonicalize()?;

    git(&path, &["init", "--initial-branch=master"])?;
    git(&path, &["config", "user.name", "Test User"])?;
    git(&path, &["config", "user.email", "test@example.com"])?;
    git(&path, &["config", "commit.gpgsign", "false"])?;

    std::fs::write(path.join("README.md"), "# monorepo\n")?;
    git(&path, &["add", "."])?;
    git(&path, &["commit", "-m", "Initial commit"])?;

    Ok(Self { _root: root, path })
  }

  /// Initialise a module through `kaeter init` and give it a Makefile
  pub fn add_module(&self, dir: &str, id: &str) -> Result<PathBuf> {
    run_kaeter(&self.path, &["init", "--id", id, dir])?;
    let module = self.path.join(dir);
    std::fs::write(module.join("Makefile"), "build:\ntest:\nrelease:\n")?;
    Ok(module)
  }

  /// Stage everything and commit
  pub fn commit(&self, message: &str) -> Result<String> {
    git(&self.path, &["add", "."])?;
    git(&self.path, &["commit", "-m", message])?;
    self.head()
  }

  pub fn head(&self) -> Result<String> {
    let output = git(&self.path, &["rev-parse", "HEAD"])?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  pub fn head_message(&self) -> Result<String> {
    let output = git(&self.path, &["log", "-1", "--format=%B"])?;
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
  }

  pub fn current_branch(&self) -> Result<String> {
    let output = git(&self.path, &["rev-parse", "--abbrev-ref", "HEAD"])?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  pub fn read_file(&self, path: &str) -> Result<String> {
    Ok(std::fs::read_to_string(self.path.join(path))?)
  }

  pub fn write_file(&self, path: &str, content: &str) -> Result<()> {
    let path = self.path.join(path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }
    Ok(std::fs::write(path, content)?)
  }

  /// Build tool that appends its arguments to `build.log` instead of building
  pub fn fake_build_tool(&self) -> Result<(PathBuf, PathBuf)> {
    use std::os::unix::fs::PermissionsExt;

    let tool_dir = self.path.join(".git").join("fake-tool");
    std::fs::create_dir_all(&tool_dir)?;
    let log = tool_dir.join("build.log");
    let tool = tool_dir.join("fake-make");
    std::fs::write(
      &tool,
      format!("#!/bin/sh\necho \"$(pwd) $*\" >> '{}'\n", log.display()),
    )?;
    std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755))?;
    Ok((tool, log))
  }
}

/// Run git command in a directory
pub fn git(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = Command::new("git")
    .current_dir(cwd)
    .args(args)
    .output()
    .context("Failed to run git command")?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    anyhow::bail!("Git command failed: git {}\n{}", args.join(" "), stderr);
  }

  Ok(output)
}

/// Run the kaeter binary and return its output whatever the exit status
pub fn kaeter(cwd: &Path, args: &[&str]) -> Result<Output> {
  Command::new(env!("CARGO_BIN_EXE_kaeter"))
    .current_dir(cwd)
    .args(args)
    .env_remove("KAETER_LOG")
    .output()
    .context("Failed to run kaeter")
}

/// Run the kaeter binary and fail unless it succeeds
pub fn run_kaeter(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = kaeter(cwd, args)?;
  if !output.status.success() {
    anyhow::bail!(
      "kaeter command failed: kaeter {}\nstdout: {}\nstderr: {}",
      args.join(" "),
      String::from_utf8_lossy(&output.stdout),
      String::from_utf8_lossy(&output.stderr)
    );
  }
  Ok(output)
}

pub fn stdout(output: &Output) -> String {
  String::from_utf8_lossy(&output.stdout).to_string()
}

pub fn stderr(output: &Output) -> String {
  String::from_utf8_lossy(&output.stderr).to_string()
}

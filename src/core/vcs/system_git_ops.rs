//! Repository operations used by release preparation and execution

use super::system_git::SystemGit;
use crate::core::error::{KaeterError, KaeterResult};
use std::path::{Path, PathBuf};

/// One line of `git diff --name-status`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedFile {
  /// Status letter (A, M, D, R, C, T)
  pub status: char,
  /// Path relative to the repository root (the new path for renames and copies)
  pub path: PathBuf,
}

impl SystemGit {
  /// Full commit message of `rev`
  pub fn commit_message(&self, rev: &str) -> KaeterResult<String> {
    let output = self.git(["log", "-1", "--format=%B", rev])?;
    Ok(output.stdout)
  }

  /// First parent of `rev`, `None` for a root commit
  pub fn first_parent(&self, rev: &str) -> KaeterResult<Option<String>> {
    let output = self.git(["rev-list", "--parents", "-n", "1", rev])?;
    Ok(output.stdout.split_whitespace().nth(1).map(String::from))
  }

  /// Stage `paths` and commit them with `message`
  pub fn commit_paths(&self, message: &str, paths: &[PathBuf]) -> KaeterResult<String> {
    if paths.is_empty() {
      return Err(KaeterError::message("Nothing to commit: no files given"));
    }
    let path_args: Vec<String> = paths.iter().map(|p| p.to_string_lossy().into_owned()).collect();

    let mut add = vec!["add".to_string(), "--".to_string()];
    add.extend(path_args.iter().cloned());
    self.git(add)?;

    let mut commit = vec![
      "commit".to_string(),
      "--quiet".to_string(),
      "-m".to_string(),
      message.to_string(),
      "--".to_string(),
    ];
    commit.extend(path_args);
    self.git(commit)?;

    self.head_commit()
  }

  /// Detach HEAD at `commit`
  pub fn checkout_detached(&self, commit: &str) -> KaeterResult<()> {
    self.git(["checkout", "--quiet", "--detach", commit])?;
    Ok(())
  }

  /// Hard reset the working tree to `commit`
  pub fn reset_hard(&self, commit: &str) -> KaeterResult<()> {
    self.git(["reset", "--quiet", "--hard", commit])?;
    Ok(())
  }

  /// Branch checked out at HEAD, `None` when detached
  pub fn current_branch(&self) -> KaeterResult<Option<String>> {
    let output = self.git_unchecked(["symbolic-ref", "--quiet", "--short", "HEAD"])?;
    let branch = output.stdout.trim();
    Ok((output.success() && !branch.is_empty()).then(|| branch.to_string()))
  }

  /// Go back to `branch` (or stay detached) and hard reset to `commit`
  pub fn restore_head(&self, commit: &str, branch: Option<&str>) -> KaeterResult<()> {
    if let Some(branch) = branch {
      self.git(["checkout", "--quiet", "--force", branch])?;
    }
    self.reset_hard(commit)
  }

  /// Reset one file to its HEAD content, in the index and the working tree
  pub fn restore_file(&self, path: &Path) -> KaeterResult<()> {
    let path = path.to_string_lossy();
    self.git(["checkout", "--quiet", "HEAD", "--", path.as_ref()])?;
    Ok(())
  }

  /// Files changed between two revisions
  pub fn diff_name_status(&self, from: &str, to: &str) -> KaeterResult<Vec<ChangedFile>> {
    let output = self.git(["diff", "--name-status", "--no-renames", from, to])?;
    Ok(parse_name_status(&output.stdout))
  }

  /// Files introduced by `commit` (compared to its first parent, or the empty tree)
  pub fn changed_in_commit(&self, commit: &str) -> KaeterResult<Vec<ChangedFile>> {
    match self.first_parent(commit)? {
      Some(parent) => self.diff_name_status(&parent, commit),
      None => {
        let output = self.git([
          "show",
          "--name-status",
          "--no-renames",
          "--format=",
          commit,
        ])?;
        Ok(parse_name_status(&output.stdout))
      }
    }
  }

  /// Branch names containing `commit` that match `glob`, local and remote
  pub fn branches_containing(&self, commit: &str, glob: &str) -> KaeterResult<Vec<String>> {
    let output = self.git(["branch", "-a", "--contains", commit, "--list", glob])?;
    Ok(
      output
        .stdout
        .lines()
        .map(|l| l.trim_start_matches(['*', '+']).trim())
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect(),
    )
  }

  /// True when `commit` is reachable from `trunk` locally or on origin
  pub fn is_on_branch(&self, commit: &str, trunk: &str) -> KaeterResult<bool> {
    let remote = format!("remotes/origin/{}", trunk);
    let branches = self.branches_containing(commit, &format!("*{}", trunk))?;
    Ok(branches.iter().any(|b| b == trunk || *b == remote))
  }

  /// True when the tracked files have no uncommitted modifications
  pub fn is_clean(&self, paths: &[PathBuf]) -> KaeterResult<bool> {
    let mut args = vec![
      "status".to_string(),
      "--porcelain".to_string(),
      "--untracked-files=no".to_string(),
    ];
    if !paths.is_empty() {
      args.push("--".to_string());
      args.extend(paths.iter().map(|p| p.to_string_lossy().into_owned()));
    }
    let output = self.git_unchecked(args)?;
    Ok(output.success() && output.stdout.trim().is_empty())
  }
}

fn parse_name_status(stdout: &str) -> Vec<ChangedFile> {
  stdout
    .lines()
    .filter_map(|line| {
      let mut fields = line.split('\t');
      let status = fields.next()?.chars().next()?;
      let path = fields.last()?;
      Some(ChangedFile {
        status,
        path: PathBuf::from(path),
      })
    })
    .collect()
}

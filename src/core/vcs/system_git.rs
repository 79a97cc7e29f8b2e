//! System git backend
//!
//! Every call shells out to the `git` binary through the injected
//! [`ProcessRunner`] with an isolated environment:
//! - Working directory pinned with `-C`
//! - Environment cleared except PATH and HOME
//! - Safe `-c` overrides regardless of the user's config

use crate::core::error::{KaeterError, KaeterResult};
use crate::core::process::{Invocation, ProcessOutput, ProcessRunner, run_checked};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Git backend using the system git binary
#[derive(Clone)]
pub struct SystemGit {
  runner: Arc<dyn ProcessRunner>,

  /// Working tree root
  pub(crate) work_tree: PathBuf,
}

impl SystemGit {
  /// Open the repository containing `path`
  ///
  /// This performs ONE subprocess call to locate the working tree root.
  pub fn open(path: &Path, runner: Arc<dyn ProcessRunner>) -> KaeterResult<Self> {
    let probe = Self {
      runner,
      work_tree: path.to_path_buf(),
    };
    let output = probe.runner.run(&probe.invocation(["rev-parse", "--show-toplevel"]))?;

    if !output.success() {
      if output.stderr.contains("not a git repository") {
        return Err(KaeterError::with_help(
          format!("{} is not inside a git repository", path.display()),
          "Run kaeter from within the monorepo checkout or pass --path.",
        ));
      }
      return Err(KaeterError::ExternalTool {
        command: "git rev-parse --show-toplevel".to_string(),
        output: output.combined(),
      });
    }

    let work_tree = PathBuf::from(output.stdout.trim());
    Ok(Self {
      runner: probe.runner,
      work_tree,
    })
  }

  /// Use `work_tree` without probing it
  #[cfg(test)]
  pub fn at(work_tree: &Path, runner: Arc<dyn ProcessRunner>) -> Self {
    Self {
      runner,
      work_tree: work_tree.to_path_buf(),
    }
  }

  pub fn work_tree(&self) -> &Path {
    &self.work_tree
  }

  /// Get HEAD commit SHA
  pub fn head_commit(&self) -> KaeterResult<String> {
    self.rev_parse("HEAD")
  }

  /// Resolve any revision to its full commit hash
  pub fn rev_parse(&self, rev: &str) -> KaeterResult<String> {
    let commit = format!("{}^{{commit}}", rev);
    let output = self.git(["rev-parse", "--verify", commit.as_str()])?;
    Ok(output.stdout.trim().to_string())
  }

  /// Build a git invocation with the safe defaults applied
  pub(crate) fn invocation<I, S>(&self, args: I) -> Invocation
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Invocation::new("git")
      .arg("-C")
      .arg(self.work_tree.to_string_lossy())
      // Force safe behavior (override user config)
      .args(["-c", "protocol.version=2"])
      .args(["-c", "advice.detachedHead=false"])
      .args(["-c", "core.quotePath=false"])
      .args(args)
      .isolated()
  }

  /// Run git and fail on a non-zero exit
  pub(crate) fn git<I, S>(&self, args: I) -> KaeterResult<ProcessOutput>
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    run_checked(self.runner.as_ref(), &self.invocation(args))
  }

  /// Run git and hand back the output whatever the exit status
  pub(crate) fn git_unchecked<I, S>(&self, args: I) -> KaeterResult<ProcessOutput>
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.runner.run(&self.invocation(args))
  }
}

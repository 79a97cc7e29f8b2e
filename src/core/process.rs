//! External process execution
//!
//! Every shell-out (git, the build tool, hook scripts) goes through a
//! [`ProcessRunner`] so release logic can be exercised against a scripted fake.

use crate::core::error::{KaeterError, KaeterResult, ResultExt};
use std::fmt;
use std::path::PathBuf;
use std::process::Command;

/// A fully described command line
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Invocation {
  pub program: String,
  pub args: Vec<String>,
  pub cwd: Option<PathBuf>,
  /// Start from an empty environment with only PATH and HOME passed through
  pub isolated_env: bool,
}

impl Invocation {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
      ..Default::default()
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
    self.cwd = Some(dir.into());
    self
  }

  pub fn isolated(mut self) -> Self {
    self.isolated_env = true;
    self
  }

  /// Program and arguments joined by spaces
  pub fn command_line(&self) -> String {
    std::iter::once(self.program.as_str())
      .chain(self.args.iter().map(String::as_str))
      .collect::<Vec<_>>()
      .join(" ")
  }
}

impl fmt::Display for Invocation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.command_line())
  }
}

/// Captured result of a finished process
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessOutput {
  /// Exit code, `None` when killed by a signal
  pub status: Option<i32>,
  pub stdout: String,
  pub stderr: String,
}

impl ProcessOutput {
  pub fn success(&self) -> bool {
    self.status == Some(0)
  }

  /// stdout followed by stderr
  pub fn combined(&self) -> String {
    match (self.stdout.trim().is_empty(), self.stderr.trim().is_empty()) {
      (_, true) => self.stdout.clone(),
      (true, false) => self.stderr.clone(),
      (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr),
    }
  }
}

/// Runs external commands; blocks until the process exits
pub trait ProcessRunner: Send + Sync {
  fn run(&self, invocation: &Invocation) -> KaeterResult<ProcessOutput>;
}

/// Runs commands with `std::process::Command`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
  fn run(&self, invocation: &Invocation) -> KaeterResult<ProcessOutput> {
    let mut cmd = Command::new(&invocation.program);
    cmd.args(&invocation.args);
    if let Some(dir) = &invocation.cwd {
      cmd.current_dir(dir);
    }

    // Isolated environment (don't trust global config)
    if invocation.isolated_env {
      cmd.env_clear();
      if let Ok(path) = std::env::var("PATH") {
        cmd.env("PATH", path);
      }
      if let Ok(home) = std::env::var("HOME") {
        cmd.env("HOME", home);
      }
    }

    let output = cmd
      .output()
      .with_context(|| format!("Failed to execute {}", invocation.program))?;

    Ok(ProcessOutput {
      status: output.status.code(),
      stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
      stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
  }
}

/// Run and turn a non-zero exit into [`KaeterError::ExternalTool`]
pub fn run_checked(runner: &dyn ProcessRunner, invocation: &Invocation) -> KaeterResult<ProcessOutput> {
  let output = runner.run(invocation)?;
  if output.success() {
    Ok(output)
  } else {
    Err(KaeterError::ExternalTool {
      command: invocation.command_line(),
      output: output.combined(),
    })
  }
}

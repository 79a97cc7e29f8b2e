//! Build tool invocation
//!
//! A module is built through its own Makefile: `Makefile.kaeter` when present,
//! otherwise `Makefile`. Every step gets `VERSION=<version>` via `-e`.

use crate::core::error::{KaeterResult, NotFoundError};
use crate::core::process::{Invocation, ProcessOutput, ProcessRunner, run_checked};
use std::fmt;
use std::path::{Path, PathBuf};

/// Build file names, in order of preference
pub const BUILD_FILES: [&str; 2] = ["Makefile.kaeter", "Makefile"];

/// Makefile targets invoked during a release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStep {
  Build,
  Test,
  Release,
}

impl BuildStep {
  pub fn target(&self) -> &'static str {
    match self {
      BuildStep::Build => "build",
      BuildStep::Test => "test",
      BuildStep::Release => "release",
    }
  }
}

impl fmt::Display for BuildStep {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.target())
  }
}

/// Locate the build file of the module in `module_dir`
///
/// The preferred name wins even when it turns out to be a directory, which is an error.
pub fn locate_build_file(module_dir: &Path) -> KaeterResult<PathBuf> {
  for name in BUILD_FILES {
    let candidate = module_dir.join(name);
    if candidate.is_file() {
      return Ok(candidate);
    }
    if candidate.exists() {
      break;
    }
  }
  Err(
    NotFoundError::BuildFile {
      dir: module_dir.to_path_buf(),
    }
    .into(),
  )
}

/// `<tool> --file <makefile> -e VERSION=<version> <target>`, run in the module directory
pub fn step_invocation(tool: &str, build_file: &Path, version: &str, step: BuildStep) -> Invocation {
  let mut invocation = Invocation::new(tool)
    .arg("--file")
    .arg(build_file.to_string_lossy())
    .arg("-e")
    .arg(format!("VERSION={}", version))
    .arg(step.target());
  if let Some(dir) = build_file.parent() {
    invocation = invocation.cwd(dir);
  }
  invocation
}

/// Run one build step and fail with its captured output on a non-zero exit
pub fn run_step(
  runner: &dyn ProcessRunner,
  tool: &str,
  build_file: &Path,
  version: &str,
  step: BuildStep,
) -> KaeterResult<ProcessOutput> {
  run_checked(runner, &step_invocation(tool, build_file, version, step))
}

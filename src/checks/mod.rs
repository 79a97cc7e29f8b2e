//! Module lint checks
//!
//! All checks implement the `Check` trait and are run by a `CheckRunner`.
//! Release preparation only sees the [`ModuleChecker`] seam: a module either
//! passes or the mutation that was just made to its ledger is rolled back.
//!
//! # Built-in Checks
//!
//! - **ledger**: versions file parses, versions and commits are unique
//! - **readme**: README.md exists
//! - **changelog**: CHANGELOG.md exists and mentions the latest released version

mod module;
mod runner;
mod trait_def;

pub use module::{CHANGELOG_FILE, README_FILE};
pub use runner::{CheckRunner, create_default_runner};
pub use trait_def::{CheckContext, CheckResult, Severity};

use crate::core::error::{KaeterError, KaeterResult};
use std::path::Path;

/// Validates one module given the path of its ledger
pub trait ModuleChecker: Send + Sync {
  fn check_module(&self, ledger_path: &Path) -> KaeterResult<()>;
}

/// Runs the built-in checks; any error-severity result fails the module
pub struct DefaultModuleChecker {
  runner: CheckRunner,
}

impl DefaultModuleChecker {
  pub fn new() -> Self {
    Self {
      runner: create_default_runner(),
    }
  }

  /// All results for the module owning `ledger_path`
  pub fn results(&self, ledger_path: &Path) -> Vec<CheckResult> {
    let ctx = CheckContext {
      module_dir: ledger_path.parent().map(Path::to_path_buf).unwrap_or_default(),
      ledger_path: ledger_path.to_path_buf(),
    };
    self.runner.run_all(&ctx)
  }
}

impl Default for DefaultModuleChecker {
  fn default() -> Self {
    Self::new()
  }
}

impl ModuleChecker for DefaultModuleChecker {
  fn check_module(&self, ledger_path: &Path) -> KaeterResult<()> {
    let failures: Vec<KaeterError> = self
      .results(ledger_path)
      .into_iter()
      .filter(CheckResult::is_blocking)
      .map(|r| match r.suggestion {
        Some(help) => KaeterError::with_help(format!("[{}] {}", r.check_name, r.message), help),
        None => KaeterError::message(format!("[{}] {}", r.check_name, r.message)),
      })
      .collect();

    match KaeterError::join(failures) {
      Some(err) => Err(err),
      None => Ok(()),
    }
  }
}

//! Check runner for executing module checks

use super::module::{ChangelogCheck, LedgerCheck, ReadmeCheck};
use super::trait_def::{Check, CheckContext, CheckResult};
use std::sync::Arc;

/// Check runner that executes multiple checks
pub struct CheckRunner {
  checks: Vec<Arc<dyn Check>>,
}

impl CheckRunner {
  /// Create a new check runner
  pub fn new() -> Self {
    Self { checks: Vec::new() }
  }

  /// Add a check to the runner
  pub fn add_check(&mut self, check: Arc<dyn Check>) {
    self.checks.push(check);
  }

  /// Run all checks and collect results
  pub fn run_all(&self, ctx: &CheckContext) -> Vec<CheckResult> {
    self
      .checks
      .iter()
      .map(|check| {
        check.run(ctx).unwrap_or_else(|err| {
          // If a check itself fails to run, create an error result
          CheckResult::error(
            check.name(),
            format!("Check failed to run: {}", err),
            Some("Run with -vv for more details"),
          )
        })
      })
      .collect()
  }
}

impl Default for CheckRunner {
  fn default() -> Self {
    Self::new()
  }
}

/// Create a runner with all built-in checks
pub fn create_default_runner() -> CheckRunner {
  let mut runner = CheckRunner::new();
  runner.add_check(Arc::new(LedgerCheck));
  runner.add_check(Arc::new(ReadmeCheck));
  runner.add_check(Arc::new(ChangelogCheck));
  runner
}

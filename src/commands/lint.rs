//! `kaeter lint` - run the module checks

use crate::checks::{CheckResult, DefaultModuleChecker, Severity};
use crate::core::context::RepoContext;
use crate::core::error::{KaeterError, KaeterResult};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct ModuleLint {
  ledger: PathBuf,
  results: Vec<CheckResult>,
}

/// Lint one module, or every discovered module when none is given
///
/// With `strict`, warnings fail the run too.
pub fn run_lint(ctx: &RepoContext, module: Option<&str>, json: bool, strict: bool) -> KaeterResult<()> {
  let mut discovery_errors = Vec::new();
  let ledger_paths: Vec<PathBuf> = match module {
    Some(module) => vec![ctx.resolve_module(module)?],
    None => {
      let discovery = ctx.discover();
      discovery_errors = discovery.errors;
      let inventory = discovery.inventory;
      inventory.modules().map(|m| inventory.ledger_path(m)).collect()
    }
  };

  let checker = DefaultModuleChecker::new();
  let lints: Vec<ModuleLint> = ledger_paths
    .into_iter()
    .map(|path| ModuleLint {
      results: checker.results(&path),
      ledger: ctx.relative(&path).to_path_buf(),
    })
    .collect();

  let failing = lints
    .iter()
    .filter(|l| {
      l.results
        .iter()
        .any(|r| r.is_blocking() || (strict && !r.passed && r.severity == Severity::Warning))
    })
    .count();

  if json {
    println!("{}", serde_json::to_string_pretty(&lints)?);
  } else {
    print_lints(&lints);
  }

  for err in &discovery_errors {
    ctx.reporter.warn(&err.to_string());
  }
  if let Some(err) = KaeterError::join(discovery_errors) {
    return Err(err);
  }

  if failing > 0 {
    return Err(KaeterError::with_help(
      format!("{} of {} module(s) failed lint", failing, lints.len()),
      "Fix the issues listed above and run `kaeter lint` again.",
    ));
  }
  Ok(())
}

fn print_lints(lints: &[ModuleLint]) {
  if lints.is_empty() {
    println!("⚠️  No modules found");
    return;
  }

  for lint in lints {
    println!("{}", lint.ledger.display());
    for result in &lint.results {
      let icon = match (result.passed, result.severity) {
        (true, _) => "✅",
        (false, Severity::Error) => "❌",
        (false, _) => "⚠️ ",
      };
      println!("  {} [{}] {}", icon, result.check_name, result.message);
      if !result.passed
        && let Some(suggestion) = &result.suggestion
      {
        println!("     💡 {}", suggestion);
      }
    }
  }
}

//! Read-only commands: info, inventorize, module, read-plan

use super::short_sha;
use crate::core::context::RepoContext;
use crate::core::error::{KaeterError, KaeterResult};
use crate::ledger::{Ledger, VersionMetadata};
use crate::release::from_commit_message;
use serde::Serialize;
use serde_json::json;

#[derive(Serialize)]
struct LedgerInfo<'a> {
  id: &'a str,
  #[serde(rename = "type")]
  module_type: &'a str,
  versioning: String,
  ledger: String,
  versions: &'a [VersionMetadata],
}

/// Show a module's ledger
pub fn run_info(ctx: &RepoContext, module: &str, json: bool) -> KaeterResult<()> {
  let ledger_path = ctx.resolve_module(module)?;
  let ledger = Ledger::read(&ledger_path)?;
  let relative = ctx.relative(&ledger_path).display().to_string();

  if json {
    let info = LedgerInfo {
      id: ledger.id(),
      module_type: ledger.module_type(),
      versioning: ledger.versioning().to_string(),
      ledger: relative,
      versions: ledger.released_versions(),
    };
    println!("{}", serde_json::to_string_pretty(&info)?);
    return Ok(());
  }

  println!("📦 {} ({}, {})", ledger.id(), ledger.module_type(), ledger.versioning());
  println!("   {}", relative);
  println!();
  for version in ledger.released_versions() {
    let tags = if version.tags.is_empty() {
      String::new()
    } else {
      format!("  [{}]", version.tags.join(", "))
    };
    println!(
      "  {:<16} {}  {}{}",
      version.number.to_string(),
      version.timestamp.format("%Y-%m-%d %H:%M:%S"),
      short_sha(&version.commit_id),
      tags
    );
  }
  if let Some(pending) = ledger.pending_autorelease() {
    println!();
    println!("⏳ {} is waiting for autorelease", pending.number);
  }
  Ok(())
}

/// Print every discovered module as JSON
///
/// The inventory is printed even when discovery hit errors; the errors are
/// returned afterwards so the exit code reflects them.
pub fn run_inventorize(ctx: &RepoContext) -> KaeterResult<()> {
  let discovery = ctx.discover();
  println!("{}", serde_json::to_string_pretty(&discovery.inventory)?);
  for err in &discovery.errors {
    ctx.reporter.warn(&err.to_string());
  }
  match KaeterError::join(discovery.errors) {
    Some(err) => Err(err),
    None => Ok(()),
  }
}

/// Print one inventory entry as JSON
pub fn run_module(ctx: &RepoContext, module_id: &str) -> KaeterResult<()> {
  let inventory = ctx.inventory()?;
  let entry = inventory.require(module_id)?;
  println!("{}", serde_json::to_string_pretty(entry)?);
  Ok(())
}

/// Print the release plan embedded in a commit (default HEAD)
pub fn run_read_plan(ctx: &RepoContext, commit: Option<&str>, json: bool) -> KaeterResult<()> {
  let commit = ctx.git.rev_parse(commit.unwrap_or("HEAD"))?;
  let plan = from_commit_message(&ctx.git.commit_message(&commit)?)?;

  if json {
    let doc = json!({
      "commit": commit,
      "planId": plan.id().as_str(),
      "releases": plan.entries(),
    });
    println!("{}", serde_json::to_string_pretty(&doc)?);
    return Ok(());
  }

  println!("📋 Release plan {} in {}", plan.id(), short_sha(&commit));
  for target in plan.targets() {
    println!("   {}", target);
  }
  Ok(())
}

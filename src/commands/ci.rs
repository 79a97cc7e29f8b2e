//! `kaeter ci autoreleaseplan` - turn pending autoreleases into a plan
//!
//! Only modules whose ledger was changed by the inspected commit and whose
//! latest entry is the AUTORELEASE marker end up in the plan. The plan is the
//! bare `releases:` document that `kaeter ci release --plan-file` accepts.

use super::short_sha;
use crate::core::context::RepoContext;
use crate::core::error::{KaeterResult, ResultExt};
use crate::inventory::Inventory;
use crate::release::{ReleasePlan, ReleaseTarget, to_plan_yaml};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Print or write the autorelease plan for `commit` (default HEAD)
pub fn run_autorelease_plan(ctx: &RepoContext, commit: Option<&str>, output: Option<&Path>) -> KaeterResult<()> {
  let commit = ctx.git.rev_parse(commit.unwrap_or("HEAD"))?;
  let inventory = ctx.inventory()?;

  let changed: HashSet<PathBuf> = ctx
    .git
    .changed_in_commit(&commit)?
    .into_iter()
    .filter(|f| f.status != 'D')
    .map(|f| ctx.root.join(f.path))
    .collect();
  ctx
    .reporter
    .debug(&format!("{} file(s) changed in {}", changed.len(), short_sha(&commit)));

  let targets = autorelease_targets(&inventory, &changed);
  if targets.is_empty() {
    println!("No autorelease pending in {}", short_sha(&commit));
    return Ok(());
  }

  let plan = ReleasePlan::new(targets)?;
  let yaml = to_plan_yaml(&plan)?;
  match output {
    Some(path) => {
      fs::write(path, &yaml).with_context(|| format!("Failed to write plan to {}", path.display()))?;
      println!("🤖 Autorelease plan {} ({} target(s)) written to {}", plan.id(), plan.len(), path.display());
    }
    None => print!("{}", yaml),
  }
  Ok(())
}

/// Modules whose changed ledger ends with an AUTORELEASE entry, ordered by id
fn autorelease_targets(inventory: &Inventory, changed: &HashSet<PathBuf>) -> Vec<ReleaseTarget> {
  inventory
    .pending_autoreleases()
    .filter(|m| m.pending_autorelease.as_deref() == Some(m.latest_version.as_str()))
    .filter(|m| changed.contains(&inventory.ledger_path(m)))
    .map(|m| ReleaseTarget::new(m.module_id.as_str(), m.latest_version.as_str()))
    .collect()
}

//! `kaeter prepare` and `kaeter autorelease` - add versions to module ledgers
//!
//! Both commands append one version per selected module and validate the
//! module afterwards. If any module fails, every ledger touched so far is
//! restored from git before the error is returned.
//!
//! `prepare` then commits the ledgers with a release plan in the commit
//! message. `autorelease` records the AUTORELEASE marker instead of a commit
//! id and leaves committing to the developer; CI picks the version up once
//! the change lands on trunk.

use super::short_sha;
use crate::checks::{DefaultModuleChecker, ModuleChecker};
use crate::core::context::RepoContext;
use crate::core::error::{KaeterError, KaeterResult};
use crate::hooks::HookRunner;
use crate::ledger::{AUTORELEASE_COMMIT, Ledger};
use crate::release::{ReleasePlan, ReleaseTarget, to_commit_message};
use crate::version::BumpKind;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Modules and version selection shared by `prepare` and `autorelease`
#[derive(Debug, Clone, Default)]
pub struct ReleaseRequest {
  /// Module ids, module directories or ledger paths
  pub modules: Vec<String>,
  pub bump: BumpKind,
  /// Explicit version; required for AnyStringVer modules
  pub version: Option<String>,
  pub tags: Vec<String>,
}

/// A ledger that was rewritten and the version it gained
struct Prepared {
  ledger_path: PathBuf,
  target: ReleaseTarget,
}

/// Add a version to each module and commit the ledgers with a release plan
pub fn run_prepare(ctx: &RepoContext, request: &ReleaseRequest, no_commit: bool) -> KaeterResult<()> {
  let head = ctx.git.head_commit()?;
  let checker = DefaultModuleChecker::new();
  let prepared = add_versions(ctx, request, &head, &checker, None)?;

  let plan = ReleasePlan::new(prepared.iter().map(|p| p.target.clone()).collect())?;
  let message = to_commit_message(&plan)?;

  if no_commit {
    println!("📝 Updated {} ledger(s); commit them with this message:", prepared.len());
    println!();
    println!("{}", message);
    return Ok(());
  }

  let paths: Vec<PathBuf> = prepared
    .iter()
    .map(|p| ctx.relative(&p.ledger_path).to_path_buf())
    .collect();
  let commit = match ctx.git.commit_paths(&message, &paths) {
    Ok(commit) => commit,
    Err(err) => return Err(restore_ledgers(ctx, &prepared, err)),
  };

  println!("📦 Release commit {} (plan {})", short_sha(&commit), plan.id());
  for target in plan.targets() {
    println!("   {}", target);
  }
  println!();
  println!("Push the commit; `kaeter release` builds it from trunk.");
  Ok(())
}

/// Add an AUTORELEASE version to each module without committing
pub fn run_autorelease(ctx: &RepoContext, request: &ReleaseRequest) -> KaeterResult<()> {
  let head = ctx.git.head_commit()?;
  let checker = DefaultModuleChecker::new();
  let hooks = HookRunner::new(ctx.runner.clone());
  let prepared = add_versions(ctx, request, AUTORELEASE_COMMIT, &checker, Some((&hooks, head.as_str())))?;

  println!("🤖 Marked {} module(s) for autorelease:", prepared.len());
  for p in &prepared {
    println!("   {}  ({})", p.target, ctx.relative(&p.ledger_path).display());
  }
  println!();
  println!("Commit the ledgers; CI releases them once the commit reaches trunk.");
  Ok(())
}

fn add_versions(
  ctx: &RepoContext,
  request: &ReleaseRequest,
  commit_id: &str,
  checker: &dyn ModuleChecker,
  hooks: Option<(&HookRunner, &str)>,
) -> KaeterResult<Vec<Prepared>> {
  if request.modules.is_empty() {
    return Err(KaeterError::with_help(
      "No module selected",
      "Pass --module <id|path> once per module to release.",
    ));
  }

  let mut ledger_paths: Vec<PathBuf> = Vec::with_capacity(request.modules.len());
  for module in &request.modules {
    let path = ctx.resolve_module(module)?;
    if !ledger_paths.contains(&path) {
      ledger_paths.push(path);
    }
  }

  // Ledgers must be clean: a failed run restores them from HEAD
  let relative: Vec<PathBuf> = ledger_paths.iter().map(|p| ctx.relative(p).to_path_buf()).collect();
  if !ctx.git.is_clean(&relative)? {
    return Err(KaeterError::with_help(
      "Ledgers have uncommitted changes",
      "Commit or stash the changes to the selected versions files first.",
    ));
  }

  let now = Utc::now();
  let mut prepared: Vec<Prepared> = Vec::with_capacity(ledger_paths.len());
  for ledger_path in ledger_paths {
    let result = add_version(&ledger_path, request, commit_id, now, hooks).and_then(|target| {
      ctx.reporter.info(&format!("{} -> {}", ctx.relative(&ledger_path).display(), target));
      prepared.push(Prepared {
        ledger_path: ledger_path.clone(),
        target,
      });
      checker.check_module(&ledger_path)
    });
    if let Err(err) = result {
      return Err(restore_ledgers(ctx, &prepared, err));
    }
  }
  Ok(prepared)
}

fn add_version(
  ledger_path: &Path,
  request: &ReleaseRequest,
  commit_id: &str,
  now: DateTime<Utc>,
  hooks: Option<(&HookRunner, &str)>,
) -> KaeterResult<ReleaseTarget> {
  let mut ledger = Ledger::read(ledger_path)?;

  let mut version = request.version.clone();
  if version.is_none()
    && let Some((hooks, head)) = hooks
  {
    let module_dir = ledger_path.parent().unwrap_or(ledger_path);
    let current = ledger.latest().map(|v| v.number.to_string()).unwrap_or_default();
    version = hooks.compute_version(ledger.annotations(), module_dir, &current, Some(head))?;
  }

  let added = ledger.add_release(now, request.bump, version.as_deref(), commit_id, &request.tags)?;
  ledger.save_to_file(ledger_path)?;
  Ok(ReleaseTarget::new(ledger.id(), added.number.to_string()))
}

/// Undo ledger edits; a failing restore is reported next to the original error
fn restore_ledgers(ctx: &RepoContext, prepared: &[Prepared], cause: KaeterError) -> KaeterError {
  let failures: Vec<KaeterError> = prepared
    .iter()
    .filter_map(|p| ctx.git.restore_file(ctx.relative(&p.ledger_path)).err())
    .collect();
  if !prepared.is_empty() {
    ctx.reporter.warn(&format!("Restored {} ledger(s) after failure", prepared.len()));
  }
  match KaeterError::join(failures) {
    None => cause,
    Some(restore) => KaeterError::RestoreFailed {
      cause: Box::new(cause),
      restore: Box::new(restore),
    },
  }
}

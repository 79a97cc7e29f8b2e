//! `kaeter release` and `kaeter ci release` - execute a release plan

use super::short_sha;
use crate::core::context::RepoContext;
use crate::core::error::{KaeterError, KaeterResult, ResultExt};
use crate::release::{
  Orchestrator, OrchestratorOptions, ReleasePlan, TargetReport, TargetState, from_commit_message, has_release_plan,
  read_plan_text,
};
use crate::ui::{ProgressReporter, Reporter};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Flags shared by both release commands
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
  pub dry_run: bool,
  pub skip_checkout: bool,
  /// Added to `release.skip_modules` from the config
  pub skip_modules: Vec<String>,
}

/// Release the plan carried by the HEAD commit
pub fn run_release(ctx: &RepoContext, options: &RunOptions) -> KaeterResult<()> {
  let head = ctx.git.head_commit()?;
  let message = ctx.git.commit_message(&head)?;
  if !has_release_plan(&message) {
    return Err(KaeterError::with_help(
      format!("HEAD ({}) is not a release commit", short_sha(&head)),
      "Create one with `kaeter prepare`, or use `kaeter ci release --plan-file` for a standalone plan.",
    ));
  }
  let plan = from_commit_message(&message)?;
  execute(ctx, &plan, &head, options)
}

/// Release a plan read from a commit or from a file
///
/// A plan file may hold a full release commit message or a bare `releases:`
/// document. The plan commit defaults to HEAD either way; AUTORELEASE modules are
/// built from it.
pub fn run_ci_release(
  ctx: &RepoContext,
  plan_commit: Option<&str>,
  plan_file: Option<&Path>,
  options: &RunOptions,
) -> KaeterResult<()> {
  let commit = ctx.git.rev_parse(plan_commit.unwrap_or("HEAD"))?;

  let plan = match plan_file {
    Some(path) => {
      let text = fs::read_to_string(path).with_context(|| format!("Failed to read plan file {}", path.display()))?;
      read_plan_text(&text)?
    }
    None => from_commit_message(&ctx.git.commit_message(&commit)?)?,
  };

  execute(ctx, &plan, &commit, options)
}

fn execute(ctx: &RepoContext, plan: &ReleasePlan, plan_commit: &str, options: &RunOptions) -> KaeterResult<()> {
  let inventory = ctx.inventory()?;

  let mut skip_modules = ctx.config.release.skip_modules.clone();
  skip_modules.extend(options.skip_modules.iter().cloned());

  let orchestrator_options = OrchestratorOptions {
    dry_run: options.dry_run,
    skip_checkout: options.skip_checkout,
    skip_modules,
    trunk: ctx.config.git.trunk.clone(),
    build_tool: ctx.config.build.tool.clone(),
  };

  println!(
    "🚀 Release plan {} from {} ({} target(s))",
    plan.id(),
    short_sha(plan_commit),
    plan.len()
  );

  let reporter: Arc<dyn Reporter> = Arc::new(ProgressReporter::new(ctx.reporter.clone(), plan.len(), "releasing"));
  let orchestrator = Orchestrator::new(ctx.git.clone(), ctx.runner.clone(), reporter, orchestrator_options);
  let reports = orchestrator.run(plan, &inventory, plan_commit)?;

  println!();
  print_reports(&reports);
  Ok(())
}

fn print_reports(reports: &[TargetReport]) {
  for report in reports {
    let (icon, label) = match report.state {
      TargetState::Skipped => ("⏭️ ", "skipped"),
      _ if report.dry_run => ("🔍", "built and tested (dry run)"),
      _ => ("✅", "released"),
    };
    match &report.commit {
      Some(commit) => println!("{} {} {} from {}", icon, report.target, label, short_sha(commit)),
      None => println!("{} {} {}", icon, report.target, label),
    }
  }
}

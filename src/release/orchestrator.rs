//! Release plan execution
//!
//! Targets are processed strictly in plan order. Each one walks
//!
//! ```text
//! Pending -> Skipped                                (module on the skip list)
//! Pending -> Validated -> BuildFileLocated
//!         -> CheckedOut                             (unless checkout is skipped)
//!         -> Built -> Tested -> Released            (release skipped on dry runs)
//!         -> Restored                               (only after a checkout)
//! ```
//!
//! The first failure stops the run. Targets released before it stay released;
//! targets after it are never attempted.

use super::build::{BuildStep, locate_build_file, run_step};
use super::plan::{ReleasePlan, ReleaseTarget};
use crate::core::error::{ConsistencyError, KaeterError, KaeterResult};
use crate::core::process::ProcessRunner;
use crate::core::vcs::SystemGit;
use crate::inventory::Inventory;
use crate::ledger::Ledger;
use crate::ui::Reporter;
use crate::version::VersionIdentifier;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct OrchestratorOptions {
  /// Build and test, but never run the release step
  pub dry_run: bool,
  /// Build in the current working tree instead of checking out the release commit
  pub skip_checkout: bool,
  /// Module ids left untouched
  pub skip_modules: Vec<String>,
  /// Branch the release commit must be reachable from
  pub trunk: String,
  /// Build tool binary
  pub build_tool: String,
}

/// Where a target is in its release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
  Pending,
  Skipped,
  Validated,
  BuildFileLocated,
  CheckedOut,
  Built,
  Tested,
  Released,
  Restored,
}

impl fmt::Display for TargetState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Debug::fmt(self, f)
  }
}

/// Final state of a target that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetReport {
  pub target: ReleaseTarget,
  pub state: TargetState,
  /// Commit the module was built from, absent for skipped targets
  pub commit: Option<String>,
  pub dry_run: bool,
}

/// Where the working tree was before the run
struct RestorePoint {
  commit: String,
  branch: Option<String>,
}

struct ValidatedTarget {
  module_dir: PathBuf,
  commit: String,
}

pub struct Orchestrator {
  git: SystemGit,
  runner: Arc<dyn ProcessRunner>,
  reporter: Arc<dyn Reporter>,
  options: OrchestratorOptions,
}

impl Orchestrator {
  pub fn new(
    git: SystemGit,
    runner: Arc<dyn ProcessRunner>,
    reporter: Arc<dyn Reporter>,
    options: OrchestratorOptions,
  ) -> Self {
    Self {
      git,
      runner,
      reporter,
      options,
    }
  }

  /// Execute `plan`
  ///
  /// `plan_commit` is the commit carrying the plan; modules whose latest entry is
  /// an AUTORELEASE are built from it.
  pub fn run(&self, plan: &ReleasePlan, inventory: &Inventory, plan_commit: &str) -> KaeterResult<Vec<TargetReport>> {
    self.reporter.info(&format!(
      "Executing release plan {} ({} target(s){})",
      plan.id(),
      plan.len(),
      if self.options.dry_run { ", dry run" } else { "" }
    ));

    let pre_run_head = if self.options.skip_checkout {
      None
    } else {
      Some(RestorePoint {
        commit: self.git.head_commit()?,
        branch: self.git.current_branch()?,
      })
    };

    let mut reports = Vec::with_capacity(plan.len());
    for target in plan.targets() {
      match self.release_target(target, inventory, plan_commit, pre_run_head.as_ref()) {
        Ok(report) => {
          self.reporter.target_finished(&target.to_string());
          reports.push(report);
        }
        Err(err) => {
          self.reporter.warn(&format!("Release of {} failed; stopping", target));
          return Err(err);
        }
      }
    }
    Ok(reports)
  }

  fn release_target(
    &self,
    target: &ReleaseTarget,
    inventory: &Inventory,
    plan_commit: &str,
    pre_run_head: Option<&RestorePoint>,
  ) -> KaeterResult<TargetReport> {
    if self.options.skip_modules.iter().any(|m| *m == target.module_id) {
      self.transition(target, TargetState::Pending, TargetState::Skipped);
      self.reporter.info(&format!("Skipping {} (on the skip list)", target));
      return Ok(TargetReport {
        target: target.clone(),
        state: TargetState::Skipped,
        commit: None,
        dry_run: self.options.dry_run,
      });
    }

    let validated = self.validate(target, inventory, plan_commit)?;
    self.transition(target, TargetState::Pending, TargetState::Validated);

    let build_file = locate_build_file(&validated.module_dir)?;
    self.transition(target, TargetState::Validated, TargetState::BuildFileLocated);

    let Some(restore_to) = pre_run_head else {
      let state = self.build_test_release(target, &build_file, TargetState::BuildFileLocated)?;
      return Ok(self.report(target, state, validated.commit));
    };

    if !self.git.is_on_branch(&validated.commit, &self.options.trunk)? {
      return Err(
        ConsistencyError::CommitNotOnTrunk {
          commit: validated.commit,
          trunk: self.options.trunk.clone(),
        }
        .into(),
      );
    }
    self.git.checkout_detached(&validated.commit)?;
    self.transition(target, TargetState::BuildFileLocated, TargetState::CheckedOut);

    let outcome = self.build_test_release(target, &build_file, TargetState::CheckedOut);
    let restored = self.git.restore_head(&restore_to.commit, restore_to.branch.as_deref());

    match (outcome, restored) {
      (Ok(state), Ok(())) => {
        self.transition(target, state, TargetState::Restored);
        Ok(self.report(target, TargetState::Restored, validated.commit))
      }
      (Ok(_), Err(restore)) => Err(restore),
      (Err(cause), Ok(())) => Err(cause),
      (Err(cause), Err(restore)) => Err(KaeterError::RestoreFailed {
        cause: Box::new(cause),
        restore: Box::new(restore),
      }),
    }
  }

  /// Fresh ledger read: id must match and the version must be the latest entry
  fn validate(&self, target: &ReleaseTarget, inventory: &Inventory, plan_commit: &str) -> KaeterResult<ValidatedTarget> {
    let entry = inventory.require(&target.module_id)?;
    let ledger = Ledger::read(&inventory.ledger_path(entry))?;

    if ledger.id() != target.module_id {
      return Err(
        ConsistencyError::ModuleIdMismatch {
          expected: target.module_id.clone(),
          found: ledger.id().to_string(),
        }
        .into(),
      );
    }

    let requested = VersionIdentifier::parse(&target.version, ledger.versioning())?;
    let latest = ledger
      .latest()
      .ok_or_else(|| KaeterError::message(format!("Ledger of {} is empty", target.module_id)))?;
    if latest.number != requested {
      return Err(
        ConsistencyError::NotLatestVersion {
          module: target.module_id.clone(),
          requested: target.version.clone(),
          latest: latest.number.to_string(),
        }
        .into(),
      );
    }

    let commit = if latest.is_autorelease() {
      plan_commit.to_string()
    } else {
      latest.commit_id.clone()
    };

    Ok(ValidatedTarget {
      module_dir: inventory.module_dir(entry),
      commit,
    })
  }

  /// Build, test and (unless dry) release, starting from state `from`
  fn build_test_release(
    &self,
    target: &ReleaseTarget,
    build_file: &std::path::Path,
    from: TargetState,
  ) -> KaeterResult<TargetState> {
    let tool = self.options.build_tool.as_str();
    let runner = self.runner.as_ref();

    self.reporter.info(&format!("Building {}", target));
    run_step(runner, tool, build_file, &target.version, BuildStep::Build)?;
    self.transition(target, from, TargetState::Built);

    self.reporter.info(&format!("Testing {}", target));
    run_step(runner, tool, build_file, &target.version, BuildStep::Test)?;
    self.transition(target, TargetState::Built, TargetState::Tested);

    if self.options.dry_run {
      self.reporter.info(&format!("Dry run: not releasing {}", target));
      return Ok(TargetState::Tested);
    }

    self.reporter.info(&format!("Releasing {}", target));
    run_step(runner, tool, build_file, &target.version, BuildStep::Release)?;
    self.transition(target, TargetState::Tested, TargetState::Released);
    Ok(TargetState::Released)
  }

  fn report(&self, target: &ReleaseTarget, state: TargetState, commit: String) -> TargetReport {
    TargetReport {
      target: target.clone(),
      state,
      commit: Some(commit),
      dry_run: self.options.dry_run,
    }
  }

  fn transition(&self, target: &ReleaseTarget, from: TargetState, to: TargetState) {
    self.reporter.debug(&format!("{}: {} -> {}", target, from, to));
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::process::testing::ScriptedRunner;
  use crate::ledger::LEDGER_FILE_NAMES;
  use crate::ui::MemoryReporter;
  use std::fs;
  use std::path::Path;

  struct Fixture {
    dir: tempfile::TempDir,
    runner: Arc<ScriptedRunner>,
    reporter: Arc<MemoryReporter>,
  }

  impl Fixture {
    fn new() -> Self {
      let dir = tempfile::tempdir().unwrap();
      module(dir.path(), "alpha", "ch.open:alpha", "  1.0.0: 2020-01-01T00:00:00Z|a1pha\n");
      module(dir.path(), "beta", "ch.open:beta", "  2.0.0: 2020-01-01T00:00:00Z|be7a\n");
      let runner = Arc::new(ScriptedRunner::new());
      runner.respond("rev-parse --verify HEAD", "orig\n");
      runner.respond("symbolic-ref", "master\n");
      runner.respond("branch -a --contains", "* master\n");
      Self {
        dir,
        runner,
        reporter: Arc::new(MemoryReporter::new()),
      }
    }

    fn inventory(&self) -> Inventory {
      let names: Vec<String> = LEDGER_FILE_NAMES.iter().map(|s| s.to_string()).collect();
      Inventory::build(self.dir.path(), &names).unwrap()
    }

    fn run(&self, entries: &[&str], options: OrchestratorOptions) -> KaeterResult<Vec<TargetReport>> {
      let git = SystemGit::at(self.dir.path(), self.runner.clone());
      let orchestrator = Orchestrator::new(git, self.runner.clone(), self.reporter.clone(), options);
      orchestrator.run(&ReleasePlan::from_entries(entries).unwrap(), &self.inventory(), "p1an")
    }

    /// State changes recorded for `target`, as `From -> To`
    fn transitions(&self, target: &str) -> Vec<String> {
      let prefix = format!("DEBUG {}: ", target);
      self
        .reporter
        .lines()
        .into_iter()
        .filter_map(|l| l.strip_prefix(&prefix).map(str::to_string))
        .collect()
    }

    /// Command lines with the temp dir and git's fixed flags stripped
    fn commands(&self) -> Vec<String> {
      let root = self.dir.path().to_string_lossy().to_string();
      self
        .runner
        .command_lines()
        .into_iter()
        .map(|l| {
          l.replace(" -c protocol.version=2 -c advice.detachedHead=false -c core.quotePath=false", "")
            .replace(&format!("-C {} ", root), "")
            .replace(&format!("{}/", root), "")
        })
        .collect()
    }
  }

  fn module(root: &Path, dir: &str, id: &str, versions: &str) {
    let dir = root.join(dir);
    fs::create_dir_all(&dir).unwrap();
    fs::write(
      dir.join("versions.yaml"),
      format!("id: {}\nversions:\n  0.0.0: 1970-01-01T00:00:00Z|INIT\n{}", id, versions),
    )
    .unwrap();
    fs::write(dir.join("Makefile"), "build:\ntest:\nrelease:\n").unwrap();
  }

  fn options() -> OrchestratorOptions {
    OrchestratorOptions {
      trunk: "master".to_string(),
      build_tool: "make".to_string(),
      ..Default::default()
    }
  }

  #[test]
  fn test_full_release_sequence() {
    let fx = Fixture::new();
    let reports = fx.run(&["ch.open:alpha:1.0.0"], options()).unwrap();

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].state, TargetState::Restored);
    assert_eq!(reports[0].commit.as_deref(), Some("a1pha"));
    assert_eq!(
      fx.commands(),
      vec![
        "git rev-parse --verify HEAD^{commit}",
        "git symbolic-ref --quiet --short HEAD",
        "git branch -a --contains a1pha --list *master",
        "git checkout --quiet --detach a1pha",
        "make --file alpha/Makefile -e VERSION=1.0.0 build",
        "make --file alpha/Makefile -e VERSION=1.0.0 test",
        "make --file alpha/Makefile -e VERSION=1.0.0 release",
        "git checkout --quiet --force master",
        "git reset --quiet --hard orig",
      ]
    );
    assert!(fx.reporter.contains("DONE ch.open:alpha:1.0.0"));
    assert_eq!(
      fx.transitions("ch.open:alpha:1.0.0"),
      vec![
        "Pending -> Validated",
        "Validated -> BuildFileLocated",
        "BuildFileLocated -> CheckedOut",
        "CheckedOut -> Built",
        "Built -> Tested",
        "Tested -> Released",
        "Released -> Restored",
      ]
    );
  }

  #[test]
  fn test_dry_run_never_releases() {
    let fx = Fixture::new();
    let reports = fx
      .run(
        &["ch.open:alpha:1.0.0", "ch.open:beta:2.0.0"],
        OrchestratorOptions {
          dry_run: true,
          ..options()
        },
      )
      .unwrap();

    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.dry_run && r.state == TargetState::Restored));
    let commands = fx.commands();
    assert!(commands.iter().all(|c| !c.ends_with(" release")));
    assert_eq!(commands.iter().filter(|c| c.ends_with(" test")).count(), 2);
    assert_eq!(commands.iter().filter(|c| c.contains("reset --quiet --hard orig")).count(), 2);

    let beta = fx.transitions("ch.open:beta:2.0.0");
    assert_eq!(&beta[3..], ["CheckedOut -> Built", "Built -> Tested", "Tested -> Restored"]);
  }

  #[test]
  fn test_skipped_module_runs_nothing() {
    let fx = Fixture::new();
    let reports = fx
      .run(
        &["ch.open:alpha:1.0.0", "ch.open:beta:2.0.0"],
        OrchestratorOptions {
          skip_modules: vec!["ch.open:alpha".to_string()],
          ..options()
        },
      )
      .unwrap();

    assert_eq!(reports[0].state, TargetState::Skipped);
    assert_eq!(reports[0].commit, None);
    assert!(fx.commands().iter().all(|c| !c.contains("alpha") && !c.contains("a1pha")));
    assert!(fx.commands().iter().any(|c| c.contains("beta/Makefile")));
  }

  #[test]
  fn test_failed_validation_stops_the_run() {
    let fx = Fixture::new();
    let err = fx
      .run(&["ch.open:alpha:0.9.0", "ch.open:beta:2.0.0"], options())
      .unwrap_err();

    assert!(matches!(
      err,
      KaeterError::Consistency(ConsistencyError::NotLatestVersion { .. })
    ));
    // Only the pre-run HEAD lookup happened
    assert_eq!(
      fx.commands(),
      vec![
        "git rev-parse --verify HEAD^{commit}",
        "git symbolic-ref --quiet --short HEAD",
      ]
    );
  }

  #[test]
  fn test_unknown_module() {
    let fx = Fixture::new();
    let err = fx.run(&["ch.open:gamma:1.0.0"], options()).unwrap_err();
    assert!(matches!(err, KaeterError::NotFound(_)));
  }

  #[test]
  fn test_commit_must_be_on_trunk() {
    let fx = Fixture::new();
    let runner = Arc::new(ScriptedRunner::new());
    runner.respond("rev-parse --verify HEAD", "orig\n");
    runner.respond("branch -a --contains", "  feature\n");
    let fx = Fixture { runner, ..fx };

    let err = fx.run(&["ch.open:alpha:1.0.0"], options()).unwrap_err();
    assert!(matches!(
      err,
      KaeterError::Consistency(ConsistencyError::CommitNotOnTrunk { .. })
    ));
    assert!(fx.commands().iter().all(|c| !c.contains("checkout")));
  }

  #[test]
  fn test_failed_build_still_restores() {
    let fx = Fixture::new();
    fx.runner.fail("VERSION=1.0.0 build", "compile error");

    let err = fx.run(&["ch.open:alpha:1.0.0"], options()).unwrap_err();
    assert!(matches!(err, KaeterError::ExternalTool { .. }));
    let commands = fx.commands();
    assert!(commands.iter().all(|c| !c.ends_with(" test")));
    assert_eq!(fx.transitions("ch.open:alpha:1.0.0").last().map(String::as_str), Some("BuildFileLocated -> CheckedOut"));
    assert_eq!(commands.last().map(String::as_str), Some("git reset --quiet --hard orig"));
  }

  #[test]
  fn test_failed_restore_is_reported_with_cause() {
    let fx = Fixture::new();
    fx.runner.fail("VERSION=1.0.0 test", "tests failed");
    fx.runner.fail("reset --quiet --hard", "index.lock exists");

    let err = fx.run(&["ch.open:alpha:1.0.0"], options()).unwrap_err();
    assert!(matches!(err, KaeterError::RestoreFailed { .. }));
  }

  #[test]
  fn test_skip_checkout_uses_working_tree() {
    let fx = Fixture::new();
    let reports = fx
      .run(
        &["ch.open:beta:2.0.0"],
        OrchestratorOptions {
          skip_checkout: true,
          ..options()
        },
      )
      .unwrap();

    assert_eq!(reports[0].state, TargetState::Released);
    assert!(fx.commands().iter().all(|c| !c.starts_with("git")));
    assert_eq!(
      fx.transitions("ch.open:beta:2.0.0"),
      vec![
        "Pending -> Validated",
        "Validated -> BuildFileLocated",
        "BuildFileLocated -> Built",
        "Built -> Tested",
        "Tested -> Released",
      ]
    );
  }

  #[test]
  fn test_autorelease_builds_plan_commit() {
    let fx = Fixture::new();
    module(fx.dir.path(), "gamma", "ch.open:gamma", "  0.1.0: 2020-01-01T00:00:00Z|AUTORELEASE\n");

    let reports = fx.run(&["ch.open:gamma:0.1.0"], options()).unwrap();
    assert_eq!(reports[0].commit.as_deref(), Some("p1an"));
    assert!(fx.commands().contains(&"git checkout --quiet --detach p1an".to_string()));
  }

  #[test]
  fn test_ledger_changed_since_discovery() {
    let fx = Fixture::new();
    let inventory = fx.inventory();
    module(fx.dir.path(), "alpha", "ch.open:renamed", "  1.0.0: 2020-01-01T00:00:00Z|a1pha\n");

    let git = SystemGit::at(fx.dir.path(), fx.runner.clone());
    let orchestrator = Orchestrator::new(git, fx.runner.clone(), fx.reporter.clone(), options());
    let plan = ReleasePlan::from_entries(&["ch.open:alpha:1.0.0"]).unwrap();
    let err = orchestrator.run(&plan, &inventory, "p1an").unwrap_err();
    assert!(matches!(
      err,
      KaeterError::Consistency(ConsistencyError::ModuleIdMismatch { .. })
    ));
  }
}

//! Repository context - build once, pass everywhere
//!
//! ```text
//! main.rs:
//!   RepoContext::build() -> &RepoContext
//!   |
//!   v
//! commands/prepare.rs, release.rs, etc:
//!   fn run_*(ctx: &RepoContext, ...)
//! ```

use crate::core::config::KaeterConfig;
use crate::core::error::{KaeterResult, ResultExt};
use crate::core::process::ProcessRunner;
use crate::core::vcs::SystemGit;
use crate::inventory::{Discovery, Inventory};
use crate::ledger::resolve_ledger_path;
use crate::ui::Reporter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Command line values that override the config file
#[derive(Debug, Clone, Default)]
pub struct GlobalOverrides {
  /// Root of module discovery (default: repository root)
  pub path: Option<PathBuf>,
  pub trunk: Option<String>,
  pub build_tool: Option<String>,
}

/// Shared repository-level state for all commands
#[derive(Clone)]
pub struct RepoContext {
  /// Repository working tree root (absolute path)
  pub root: PathBuf,

  /// Directory scanned for ledgers (absolute path)
  pub search_root: PathBuf,

  pub config: Arc<KaeterConfig>,
  pub git: SystemGit,
  pub runner: Arc<dyn ProcessRunner>,
  pub reporter: Arc<dyn Reporter>,
}

impl RepoContext {
  /// Locate the repository containing `start` and load its configuration
  pub fn build(
    start: &Path,
    overrides: &GlobalOverrides,
    runner: Arc<dyn ProcessRunner>,
    reporter: Arc<dyn Reporter>,
  ) -> KaeterResult<Self> {
    let git = SystemGit::open(start, runner.clone())?;
    let root = git.work_tree().to_path_buf();

    let config = KaeterConfig::load(&root)?.with_overrides(overrides.trunk.as_deref(), overrides.build_tool.as_deref())?;

    let search_root = match &overrides.path {
      Some(path) => start.join(path),
      None => root.clone(),
    };
    // Canonical so paths line up with what git reports
    let search_root = search_root
      .canonicalize()
      .with_context(|| format!("Cannot scan {}", search_root.display()))?;

    reporter.debug(&format!(
      "repository {} (trunk {}, scanning {})",
      root.display(),
      config.git.trunk,
      search_root.display()
    ));

    Ok(Self {
      root,
      search_root,
      config: Arc::new(config),
      git,
      runner,
      reporter,
    })
  }

  /// Scan for ledgers, keeping partial results and errors
  pub fn discover(&self) -> Discovery {
    Inventory::discover(&self.search_root, &self.config.discovery.ledger_names)
  }

  /// Scan for ledgers; any discovery error fails
  pub fn inventory(&self) -> KaeterResult<Inventory> {
    self.discover().into_result()
  }

  /// Ledger path for a `--module` argument: ledger file, module directory or module id
  pub fn resolve_module(&self, module: &str) -> KaeterResult<PathBuf> {
    let as_path = Path::new(module);
    if as_path.exists() {
      return resolve_ledger_path(as_path)?
        .canonicalize()
        .with_context(|| format!("Cannot resolve {}", module));
    }
    let inventory = self.inventory()?;
    let entry = inventory.require(module)?;
    Ok(inventory.ledger_path(entry))
  }

  /// Path relative to the repository root, for git and for display
  pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
    path.strip_prefix(&self.root).unwrap_or(path)
  }
}

//! `kaeter init` - create a new module

use crate::checks::{CHANGELOG_FILE, README_FILE};
use crate::core::error::{KaeterError, KaeterResult, ResultExt};
use crate::ledger::{LEDGER_FILE_NAMES, Ledger, find_ledger};
use crate::version::VersioningScheme;
use chrono::Utc;
use std::fs;
use std::path::Path;

/// Write a fresh ledger plus README and CHANGELOG stubs into `module_dir`
///
/// Existing README and CHANGELOG files are left alone; an existing ledger is an error.
pub fn run_init(module_dir: &Path, module_id: &str, module_type: &str, versioning: VersioningScheme) -> KaeterResult<()> {
  if let Some(existing) = find_ledger(module_dir) {
    return Err(KaeterError::with_help(
      format!("{} already exists", existing.display()),
      "Use `kaeter prepare` to add versions to an initialised module.",
    ));
  }

  fs::create_dir_all(module_dir).with_context(|| format!("Failed to create {}", module_dir.display()))?;

  let ledger = Ledger::initialise(module_id, module_type, versioning, Utc::now())?;
  let ledger_path = module_dir.join(LEDGER_FILE_NAMES[0]);
  ledger.save_to_file(&ledger_path)?;
  println!("✨ Initialised {} in {}", module_id, ledger_path.display());

  let readme = module_dir.join(README_FILE);
  if !readme.exists() {
    fs::write(&readme, readme_stub(module_id)).with_context(|| format!("Failed to write {}", readme.display()))?;
    println!("   created {}", readme.display());
  }

  let changelog = module_dir.join(CHANGELOG_FILE);
  if !changelog.exists() {
    fs::write(&changelog, changelog_stub(module_id))
      .with_context(|| format!("Failed to write {}", changelog.display()))?;
    println!("   created {}", changelog.display());
  }

  println!();
  println!("Next: add a Makefile with build, test and release targets, then run `kaeter prepare`.");
  Ok(())
}

fn readme_stub(module_id: &str) -> String {
  format!("# {}\n\nDescribe what this module is and how to use it.\n", module_id)
}

fn changelog_stub(module_id: &str) -> String {
  format!(
    "# Changelog for {}\n\nDocument every release here, newest first, under a `## <version>` heading.\n",
    module_id
  )
}

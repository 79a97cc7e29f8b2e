//! Built-in module checks

use super::trait_def::{Check, CheckContext, CheckResult};
use crate::core::error::KaeterResult;
use crate::ledger::Ledger;
use regex::Regex;
use std::fs;

pub const README_FILE: &str = "README.md";
pub const CHANGELOG_FILE: &str = "CHANGELOG.md";

/// Ledger parses and satisfies the ledger rules
pub struct LedgerCheck;

impl Check for LedgerCheck {
  fn name(&self) -> &str {
    "ledger"
  }

  fn run(&self, ctx: &CheckContext) -> KaeterResult<CheckResult> {
    let ledger = match Ledger::read(&ctx.ledger_path) {
      Ok(ledger) => ledger,
      Err(err) => {
        return Ok(CheckResult::error(
          self.name(),
          err.to_string(),
          err.help_message(),
        ));
      }
    };

    let problems = ledger.check_invariants();
    if problems.is_empty() {
      Ok(CheckResult::pass(
        self.name(),
        format!("{} has {} entries", ledger.id(), ledger.released_versions().len()),
      ))
    } else {
      let message = problems.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ");
      Ok(CheckResult::error(self.name(), message, Some("Remove the duplicated entries by hand")))
    }
  }
}

/// Module ships a README
pub struct ReadmeCheck;

impl Check for ReadmeCheck {
  fn name(&self) -> &str {
    "readme"
  }

  fn run(&self, ctx: &CheckContext) -> KaeterResult<CheckResult> {
    let path = ctx.module_dir.join(README_FILE);
    if path.is_file() {
      if fs::read_to_string(&path)?.trim().is_empty() {
        return Ok(CheckResult::warning(
          self.name(),
          format!("{} is empty", path.display()),
          Some("Describe what the module is and how to release it"),
        ));
      }
      Ok(CheckResult::pass(self.name(), "README.md present"))
    } else {
      Ok(CheckResult::error(
        self.name(),
        format!("{} has no {}", ctx.module_dir.display(), README_FILE),
        Some("Describe the module in a README.md next to its versions file"),
      ))
    }
  }
}

/// CHANGELOG mentions the latest released version
pub struct ChangelogCheck;

impl Check for ChangelogCheck {
  fn name(&self) -> &str {
    "changelog"
  }

  fn run(&self, ctx: &CheckContext) -> KaeterResult<CheckResult> {
    let path = ctx.module_dir.join(CHANGELOG_FILE);
    if !path.is_file() {
      return Ok(CheckResult::error(
        self.name(),
        format!("{} has no {}", ctx.module_dir.display(), CHANGELOG_FILE),
        Some("Add a CHANGELOG.md with one section per version"),
      ));
    }

    // A broken ledger is reported by LedgerCheck
    let Ok(ledger) = Ledger::read(&ctx.ledger_path) else {
      return Ok(CheckResult::pass(self.name(), "skipped: ledger unreadable"));
    };
    let Some(latest) = ledger.released_versions().iter().rev().find(|v| !v.is_init()) else {
      return Ok(CheckResult::pass(self.name(), "no release yet"));
    };

    let version = latest.number.to_string();
    let content = fs::read_to_string(&path)?;
    if mentions_version(&content, &version)? {
      Ok(CheckResult::pass(self.name(), format!("{} documented", version)))
    } else {
      Ok(CheckResult::error(
        self.name(),
        format!("{} does not mention version {}", path.display(), version),
        Some(format!("Add a '## {}' section describing the release", version)),
      ))
    }
  }
}

/// `1.2.3` must not match inside `11.2.3`, `1.2.30` or `1.2.3.4`
///
/// A trailing sentence dot is fine.
fn mentions_version(content: &str, version: &str) -> KaeterResult<bool> {
  let pattern = format!(
    r"(?m)(?:^|[^0-9.]){}(?:$|[^0-9A-Za-z.]|\.(?:$|[^0-9A-Za-z]))",
    regex::escape(version)
  );
  Ok(Regex::new(&pattern)?.is_match(content))
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::path::Path;

  fn ctx(dir: &Path) -> CheckContext {
    CheckContext {
      module_dir: dir.to_path_buf(),
      ledger_path: dir.join("versions.yaml"),
    }
  }

  fn module(dir: &Path, versions: &str) {
    fs::write(
      dir.join("versions.yaml"),
      format!("id: ch.open:mod\nversioning: SemVer\nversions:\n  0.0.0: 1970-01-01T00:00:00Z|INIT\n{}", versions),
    )
    .unwrap();
  }

  #[test]
  fn test_mentions_version() {
    let mentions = |content: &str, version: &str| mentions_version(content, version).unwrap();
    assert!(mentions("## 1.2.3\n- fix", "1.2.3"));
    assert!(mentions("1.2.3", "1.2.3"));
    assert!(mentions("Released 1.2.3.", "1.2.3"));
    assert!(mentions("Released 1.2.3. Next", "1.2.3"));
    assert!(mentions("[1.2.3] - 2020", "1.2.3"));
    assert!(mentions("## 11.2.3\n## 1.2.3\n", "1.2.3"));
    assert!(!mentions("## 11.2.3", "1.2.3"));
    assert!(!mentions("## 1.2.30", "1.2.3"));
    assert!(!mentions("## 1.2.3.4", "1.2.3"));
    assert!(!mentions("## 1x2y3", "1.2.3"));
    assert!(mentions("## 1.0.0+build.5 (lts)", "1.0.0+build.5"));
  }

  #[test]
  fn test_ledger_check() {
    let dir = tempfile::tempdir().unwrap();
    module(dir.path(), "");
    assert!(LedgerCheck.run(&ctx(dir.path())).unwrap().passed);

    module(dir.path(), "  0.0.1: 2020-01-01T00:00:00Z|INIT\n");
    let result = LedgerCheck.run(&ctx(dir.path())).unwrap();
    assert!(result.is_blocking());
  }

  #[test]
  fn test_readme_check() {
    let dir = tempfile::tempdir().unwrap();
    assert!(ReadmeCheck.run(&ctx(dir.path())).unwrap().is_blocking());
    fs::write(dir.path().join(README_FILE), "  \n").unwrap();
    let empty = ReadmeCheck.run(&ctx(dir.path())).unwrap();
    assert!(!empty.passed && !empty.is_blocking());
    fs::write(dir.path().join(README_FILE), "# mod").unwrap();
    assert!(ReadmeCheck.run(&ctx(dir.path())).unwrap().passed);
  }

  #[test]
  fn test_changelog_check() {
    let dir = tempfile::tempdir().unwrap();
    module(dir.path(), "");
    assert!(ChangelogCheck.run(&ctx(dir.path())).unwrap().is_blocking());

    fs::write(dir.path().join(CHANGELOG_FILE), "# Changelog\n").unwrap();
    assert!(ChangelogCheck.run(&ctx(dir.path())).unwrap().passed);

    module(dir.path(), "  0.1.0: 2020-01-01T00:00:00Z|AUTORELEASE\n");
    assert!(ChangelogCheck.run(&ctx(dir.path())).unwrap().is_blocking());

    fs::write(dir.path().join(CHANGELOG_FILE), "# Changelog\n\n## 0.1.0\n- first\n").unwrap();
    assert!(ChangelogCheck.run(&ctx(dir.path())).unwrap().passed);
  }
}

//! Tests for the `init` command

use crate::helpers::*;
use anyhow::Result;

#[test]
fn test_init_creates_module_files() -> Result<()> {
  let repo = TestRepo::new()?;
  run_kaeter(&repo.path, &["init", "--id", "ch.open:alpha", "modules/alpha"])?;

  let ledger = repo.read_file("modules/alpha/versions.yaml")?;
  assert!(ledger.contains("id: ch.open:alpha"));
  assert!(ledger.contains("versioning: SemVer"));
  assert!(ledger.contains("0.0.0: "));
  assert!(ledger.contains("|INIT"));
  assert!(repo.path.join("modules/alpha/README.md").is_file());
  assert!(repo.path.join("modules/alpha/CHANGELOG.md").is_file());

  Ok(())
}

#[test]
fn test_init_with_calver() -> Result<()> {
  let repo = TestRepo::new()?;
  run_kaeter(
    &repo.path,
    &["init", "--id", "ch.open:cal", "--versioning", "CalVer", "cal"],
  )?;
  assert!(repo.read_file("cal/versions.yaml")?.contains("versioning: CalVer"));
  Ok(())
}

#[test]
fn test_init_refuses_existing_ledger() -> Result<()> {
  let repo = TestRepo::new()?;
  run_kaeter(&repo.path, &["init", "--id", "ch.open:alpha", "alpha"])?;
  let before = repo.read_file("alpha/versions.yaml")?;

  let output = kaeter(&repo.path, &["init", "--id", "ch.open:other", "alpha"])?;
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("already exists"));
  assert_eq!(repo.read_file("alpha/versions.yaml")?, before);

  Ok(())
}

#[test]
fn test_init_rejects_unknown_scheme() -> Result<()> {
  let repo = TestRepo::new()?;
  let output = kaeter(&repo.path, &["init", "--id", "ch.open:x", "--versioning", "RomanVer", "x"])?;
  assert!(!output.status.success());
  assert!(!repo.path.join("x/versions.yaml").exists());
  Ok(())
}

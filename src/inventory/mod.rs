//! Module discovery
//!
//! Scans a directory tree for ledger files and builds an inventory keyed by
//! module id. Each directory is read by its own rayon task; tasks report
//! ledgers and errors over a channel and never cancel their siblings.

use crate::core::error::{ConsistencyError, KaeterError, KaeterResult, NotFoundError, ResultExt};
use crate::ledger::Ledger;
use crate::version::VersioningScheme;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};

/// Directories never descended into
const SKIPPED_DIRS: [&str; 1] = [".git"];

/// One discovered module
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleEntry {
  pub module_id: String,
  /// Module directory relative to the inventory root
  pub path: PathBuf,
  /// Ledger file relative to the inventory root
  pub ledger_path: PathBuf,
  pub module_type: String,
  pub versioning: VersioningScheme,
  pub latest_version: String,
  #[serde(skip_serializing_if = "BTreeMap::is_empty")]
  pub annotations: BTreeMap<String, String>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub dependencies: Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub pending_autorelease: Option<String>,
}

impl ModuleEntry {
  fn from_ledger(ledger: &Ledger, ledger_path: PathBuf) -> Self {
    let path = ledger_path.parent().map(Path::to_path_buf).unwrap_or_default();
    Self {
      module_id: ledger.id().to_string(),
      path,
      ledger_path,
      module_type: ledger.module_type().to_string(),
      versioning: ledger.versioning(),
      latest_version: ledger.latest().map(|v| v.number.to_string()).unwrap_or_default(),
      annotations: ledger.annotations().clone(),
      dependencies: ledger.dependencies().to_vec(),
      pending_autorelease: ledger.pending_autorelease().map(|v| v.number.to_string()),
    }
  }
}

/// Modules found under one root, keyed by id
#[derive(Debug, Clone, Default, Serialize)]
pub struct Inventory {
  #[serde(skip)]
  root: PathBuf,
  modules: BTreeMap<String, ModuleEntry>,
}

/// Inventory plus every error hit while building it
#[derive(Debug)]
pub struct Discovery {
  pub inventory: Inventory,
  pub errors: Vec<KaeterError>,
}

impl Discovery {
  /// Fail with all joined errors, or hand back the inventory
  pub fn into_result(self) -> KaeterResult<Inventory> {
    match KaeterError::join(self.errors) {
      Some(err) => Err(err),
      None => Ok(self.inventory),
    }
  }
}

enum Found {
  Ledger { path: PathBuf, ledger: Box<Ledger> },
  Error(KaeterError),
}

impl Inventory {
  /// Scan `root` for files named like one of `ledger_names`
  pub fn discover(root: &Path, ledger_names: &[String]) -> Discovery {
    let (tx, rx) = mpsc::channel();
    rayon::scope(|scope| scan_dir(scope, root.to_path_buf(), ledger_names, tx));

    let mut ledgers = Vec::new();
    let mut errors = Vec::new();
    for found in rx {
      match found {
        Found::Ledger { path, ledger } => ledgers.push((path, ledger)),
        Found::Error(err) => errors.push(err),
      }
    }

    // Walk order is nondeterministic; sort so the same tree always keeps the same duplicate.
    ledgers.sort_by(|a, b| a.0.cmp(&b.0));
    errors.sort_by_key(|e| e.to_string());

    let mut modules: BTreeMap<String, ModuleEntry> = BTreeMap::new();
    for (path, ledger) in ledgers {
      let relative = path.strip_prefix(root).map(Path::to_path_buf).unwrap_or(path);
      if let Some(existing) = modules.get(ledger.id()) {
        errors.push(
          ConsistencyError::DuplicateModuleId {
            id: ledger.id().to_string(),
            first: existing.ledger_path.clone(),
            second: relative,
          }
          .into(),
        );
        continue;
      }
      modules.insert(ledger.id().to_string(), ModuleEntry::from_ledger(&ledger, relative));
    }

    Discovery {
      inventory: Inventory {
        root: root.to_path_buf(),
        modules,
      },
      errors,
    }
  }

  /// Scan and fail on the first sign of trouble (all errors joined)
  #[cfg(test)]
  pub fn build(root: &Path, ledger_names: &[String]) -> KaeterResult<Self> {
    Self::discover(root, ledger_names).into_result()
  }

  #[cfg(test)]
  pub fn len(&self) -> usize {
    self.modules.len()
  }

  #[cfg(test)]
  pub fn is_empty(&self) -> bool {
    self.modules.is_empty()
  }

  /// Modules ordered by id
  pub fn modules(&self) -> impl Iterator<Item = &ModuleEntry> {
    self.modules.values()
  }

  pub fn get(&self, module_id: &str) -> Option<&ModuleEntry> {
    self.modules.get(module_id)
  }

  /// Like [`Inventory::get`] but a missing module is an error
  pub fn require(&self, module_id: &str) -> KaeterResult<&ModuleEntry> {
    self.get(module_id).ok_or_else(|| {
      NotFoundError::Module {
        id: module_id.to_string(),
      }
      .into()
    })
  }

  /// Absolute ledger path of a module
  pub fn ledger_path(&self, entry: &ModuleEntry) -> PathBuf {
    self.root.join(&entry.ledger_path)
  }

  /// Absolute module directory
  pub fn module_dir(&self, entry: &ModuleEntry) -> PathBuf {
    self.root.join(&entry.path)
  }

  /// Modules whose ledger holds an AUTORELEASE entry
  pub fn pending_autoreleases(&self) -> impl Iterator<Item = &ModuleEntry> {
    self.modules().filter(|m| m.pending_autorelease.is_some())
  }
}

fn scan_dir<'s>(scope: &rayon::Scope<'s>, dir: PathBuf, ledger_names: &'s [String], tx: Sender<Found>) {
  let entries = match fs::read_dir(&dir).with_context(|| format!("Failed to read directory {}", dir.display())) {
    Ok(entries) => entries,
    Err(err) => {
      let _ = tx.send(Found::Error(err));
      return;
    }
  };

  for entry in entries {
    let entry = match entry {
      Ok(entry) => entry,
      Err(err) => {
        let _ = tx.send(Found::Error(err.into()));
        continue;
      }
    };
    let path = entry.path();
    let file_type = match entry
      .file_type()
      .with_context(|| format!("Failed to stat {}", path.display()))
    {
      Ok(file_type) => file_type,
      Err(err) => {
        let _ = tx.send(Found::Error(err));
        continue;
      }
    };
    let name = entry.file_name();
    let name = name.to_string_lossy();

    if file_type.is_dir() {
      if SKIPPED_DIRS.iter().any(|d| *d == name) {
        continue;
      }
      let tx = tx.clone();
      scope.spawn(move |scope| scan_dir(scope, path, ledger_names, tx));
    } else if file_type.is_file() && ledger_names.iter().any(|n| *n == name) {
      let found = match Ledger::read(&path) {
        Ok(ledger) => Found::Ledger {
          path,
          ledger: Box::new(ledger),
        },
        Err(err) => Found::Error(err),
      };
      let _ = tx.send(found);
    }
  }
}

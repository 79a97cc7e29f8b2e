//! Version ledgers (`versions.yaml`)
//!
//! A ledger is the release history of one module. It is read fresh for every
//! operation, mutated in memory through [`Ledger::add_release`] and written back
//! with [`Ledger::save_to_file`]. The typed fields are decoded with serde_yaml;
//! the file itself is retained as a [`LedgerDocument`] so that a read-modify-write
//! cycle only touches the `versions` entries.
//!
//! # Example versions.yaml
//!
//! ```yaml
//! id: ch.open:my-module
//! type: Makefile
//! versioning: SemVer
//! versions:
//!   0.0.0: 1970-01-01T00:00:00Z|INIT
//!   0.1.0: 2020-02-02T00:00:00Z|5d3a1e0f|stable
//! metadata:
//!   annotations:
//!     open.ch/kaeter-hook/version: ./hooks/version.sh
//! dependencies:
//!   - ../shared/proto
//! ```

pub mod document;
pub mod metadata;

pub use document::{EntryUpdate, LedgerDocument};
pub use metadata::{AUTORELEASE_COMMIT, INIT_COMMIT, VersionMetadata, validate_tag};

use crate::core::error::{KaeterResult, NotFoundError, ResultExt, ValidationError};
use crate::version::{BumpKind, VersionIdentifier, VersioningScheme, next_version};
use chrono::{DateTime, SecondsFormat, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// File names recognised as ledgers, in lookup order
pub const LEDGER_FILE_NAMES: [&str; 2] = ["versions.yaml", "versions.yml"];

/// `metadata` section of a ledger
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerMetadata {
  #[serde(default)]
  pub annotations: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct RawLedger {
  id: String,
  #[serde(rename = "type", default)]
  module_type: Option<String>,
  #[serde(default)]
  versioning: Option<String>,
  #[serde(default)]
  versions: serde_yaml::Value,
  #[serde(default)]
  metadata: Option<LedgerMetadata>,
  #[serde(default)]
  dependencies: Option<Vec<String>>,
}

/// One module's release history
#[derive(Debug, Clone)]
pub struct Ledger {
  id: String,
  module_type: String,
  versioning: VersioningScheme,
  released_versions: Vec<VersionMetadata>,
  metadata: LedgerMetadata,
  dependencies: Vec<String>,
  document: LedgerDocument,
}

impl Ledger {
  /// Read and decode a ledger file
  pub fn read(path: &Path) -> KaeterResult<Self> {
    if !path.is_file() {
      return Err(NotFoundError::Ledger { path: path.to_path_buf() }.into());
    }
    let content =
      fs::read_to_string(path).with_context(|| format!("Failed to read ledger {}", path.display()))?;
    Self::parse(&content, path)
  }

  /// Decode ledger text; `origin` is only used in error messages
  pub fn parse(text: &str, origin: &Path) -> KaeterResult<Self> {
    let invalid = |reason: String| ValidationError::InvalidLedger {
      path: origin.to_path_buf(),
      reason,
    };

    let raw: RawLedger = serde_yaml::from_str(text).map_err(|e| invalid(e.to_string()))?;
    let versioning: VersioningScheme = raw.versioning.as_deref().unwrap_or_default().parse().map_err(invalid)?;

    if raw.id.trim().is_empty() {
      return Err(invalid("'id' must not be empty".to_string()).into());
    }

    let document = LedgerDocument::parse(text, origin)?;
    let released_versions = document
      .entries()
      .map(|(key, value)| VersionMetadata::parse(key, value, versioning, origin))
      .collect::<KaeterResult<Vec<_>>>()?;

    let declared = match &raw.versions {
      serde_yaml::Value::Mapping(m) => m.len(),
      serde_yaml::Value::Null => 0,
      _ => return Err(invalid("'versions' must be a mapping".to_string()).into()),
    };
    if declared != released_versions.len() {
      return Err(
        invalid(format!(
          "'versions' holds {} entries but only {} are one-line '<version>: <timestamp>|<commit>' entries",
          declared,
          released_versions.len()
        ))
        .into(),
      );
    }

    if released_versions.is_empty() {
      return Err(ValidationError::Uninitialized { id: raw.id }.into());
    }

    Ok(Self {
      id: raw.id,
      module_type: raw.module_type.unwrap_or_default(),
      versioning,
      released_versions,
      metadata: raw.metadata.unwrap_or_default(),
      dependencies: raw.dependencies.unwrap_or_default(),
      document,
    })
  }

  /// Build a fresh ledger holding only the `0.0.0|INIT` entry
  pub fn initialise(id: &str, module_type: &str, versioning: VersioningScheme, now: DateTime<Utc>) -> KaeterResult<Self> {
    validate_module_id(id)?;
    let text = format!(
      "# Release ledger of {id}, maintained by kaeter.\n\
       # Comments are preserved when kaeter adds releases.\n\
       id: {id}\n\
       type: {module_type}\n\
       # One of SemVer, CalVer or AnyStringVer\n\
       versioning: {versioning}\n\
       # <version>: <timestamp>|<commit id>[|tags], oldest first\n\
       versions:\n  \
       0.0.0: {timestamp}|{INIT_COMMIT}\n",
      module_type = if module_type.trim().is_empty() { "Makefile" } else { module_type.trim() },
      timestamp = now.to_rfc3339_opts(SecondsFormat::Secs, true),
    );
    Self::parse(&text, Path::new(LEDGER_FILE_NAMES[0]))
  }

  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn module_type(&self) -> &str {
    &self.module_type
  }

  pub fn versioning(&self) -> VersioningScheme {
    self.versioning
  }

  /// All entries in release order
  pub fn released_versions(&self) -> &[VersionMetadata] {
    &self.released_versions
  }

  pub fn annotations(&self) -> &BTreeMap<String, String> {
    &self.metadata.annotations
  }

  pub fn dependencies(&self) -> &[String] {
    &self.dependencies
  }

  /// Most recent entry
  pub fn latest(&self) -> Option<&VersionMetadata> {
    self.released_versions.last()
  }

  /// Entry carrying the AUTORELEASE marker, if any
  pub fn pending_autorelease(&self) -> Option<&VersionMetadata> {
    self.released_versions.iter().find(|v| v.is_autorelease())
  }

  /// Look up an entry by its version
  pub fn find(&self, version: &VersionIdentifier) -> Option<&VersionMetadata> {
    self.released_versions.iter().find(|v| &v.number == version)
  }

  /// Append the next release
  ///
  /// The version is derived from the ledger's scheme (see [`next_version`]). The
  /// caller persists the ledger.
  pub fn add_release(
    &mut self,
    ref_time: DateTime<Utc>,
    bump: BumpKind,
    user_version: Option<&str>,
    commit_id: &str,
    tags: &[String],
  ) -> KaeterResult<VersionMetadata> {
    let commit_id = commit_id.trim();
    if commit_id.is_empty() {
      return Err(ValidationError::EmptyCommit.into());
    }

    let latest = self
      .released_versions
      .last()
      .ok_or_else(|| ValidationError::Uninitialized { id: self.id.clone() })?;

    let number = next_version(self.versioning, &latest.number, bump, user_version, ref_time)?;

    if self.find(&number).is_some() {
      return Err(
        ValidationError::DuplicateVersion {
          version: number.to_string(),
        }
        .into(),
      );
    }
    if self.released_versions.iter().any(|v| v.commit_id == commit_id) {
      return Err(
        ValidationError::DuplicateCommit {
          commit: commit_id.to_string(),
        }
        .into(),
      );
    }
    for tag in tags {
      validate_tag(tag)?;
    }

    let release = VersionMetadata {
      number,
      timestamp: ref_time.with_nanosecond(0).unwrap_or(ref_time),
      commit_id: commit_id.to_string(),
      tags: tags.to_vec(),
    };
    self.released_versions.push(release.clone());
    Ok(release)
  }

  /// Rules every ledger must satisfy; returns one error per violation
  pub fn check_invariants(&self) -> Vec<ValidationError> {
    let mut problems = Vec::new();
    if self.released_versions.is_empty() {
      problems.push(ValidationError::Uninitialized { id: self.id.clone() });
    }

    let mut versions = HashSet::new();
    let mut commits = HashSet::new();
    for entry in &self.released_versions {
      if !versions.insert(entry.number.to_string()) {
        problems.push(ValidationError::DuplicateVersion {
          version: entry.number.to_string(),
        });
      }
      if !commits.insert(entry.commit_id.as_str()) {
        problems.push(ValidationError::DuplicateCommit {
          commit: entry.commit_id.clone(),
        });
      }
    }
    problems
  }

  /// Serialize, reusing the original text for everything but changed entries
  pub fn marshal(&self) -> String {
    let existing: Vec<(String, String)> = self
      .document
      .entries()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect();

    let updates: Vec<EntryUpdate> = self
      .released_versions
      .iter()
      .map(|release| {
        let key = release.number.to_string();
        let unchanged = existing
          .iter()
          .find(|(k, _)| *k == key)
          .and_then(|(k, v)| VersionMetadata::parse(k, v, self.versioning, Path::new("")).ok())
          .is_some_and(|current| current == *release);
        if unchanged {
          EntryUpdate::Keep { key }
        } else {
          EntryUpdate::Set {
            key,
            value: release.render_value(),
          }
        }
      })
      .collect();

    let mut document = self.document.clone();
    document.replace_versions(&updates);
    document.render()
  }

  /// Write the ledger to `path`
  pub fn save_to_file(&self, path: &Path) -> KaeterResult<()> {
    fs::write(path, self.marshal()).with_context(|| format!("Failed to write ledger {}", path.display()))
  }
}

/// Ledger file inside `dir`, if there is one
pub fn find_ledger(dir: &Path) -> Option<PathBuf> {
  LEDGER_FILE_NAMES.iter().map(|name| dir.join(name)).find(|p| p.is_file())
}

/// Resolve a module directory or a ledger path to the ledger file
pub fn resolve_ledger_path(path: &Path) -> KaeterResult<PathBuf> {
  if path.is_file() {
    return Ok(path.to_path_buf());
  }
  find_ledger(path).ok_or_else(|| {
    NotFoundError::Ledger {
      path: path.join(LEDGER_FILE_NAMES[0]),
    }
    .into()
  })
}

/// `group:name` ids end up unquoted in YAML and in `moduleID:version` plan entries
pub fn validate_module_id(id: &str) -> KaeterResult<()> {
  let ok = id.chars().next().is_some_and(|c| c.is_ascii_alphanumeric())
    && id
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ':' | '/'))
    && !id.ends_with(':');
  if ok {
    Ok(())
  } else {
    Err(
      ValidationError::InvalidLedger {
        path: PathBuf::from(LEDGER_FILE_NAMES[0]),
        reason: format!("'{}' is not a valid module id (use group:name with [a-zA-Z0-9._-/])", id),
      }
      .into(),
    )
  }
}

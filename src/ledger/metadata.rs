//! Release entries: `<timestamp>|<commit>[|tag1,tag2]`

use crate::core::error::{KaeterResult, ValidationError};
use crate::version::{VersionIdentifier, VersioningScheme};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::path::Path;

/// Commit id of the synthetic first entry of every ledger
pub const INIT_COMMIT: &str = "INIT";

/// Commit id of a release that will be triggered once its change lands on trunk
pub const AUTORELEASE_COMMIT: &str = "AUTORELEASE";

/// One released (or pending) version of a module
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionMetadata {
  #[serde(serialize_with = "serialize_display")]
  pub number: VersionIdentifier,
  pub timestamp: DateTime<Utc>,
  pub commit_id: String,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub tags: Vec<String>,
}

impl VersionMetadata {
  /// Parse one ledger entry
  pub fn parse(key: &str, value: &str, scheme: VersioningScheme, origin: &Path) -> KaeterResult<Self> {
    let invalid = |reason: String| ValidationError::InvalidLedger {
      path: origin.to_path_buf(),
      reason,
    };

    let number = VersionIdentifier::parse(key, scheme)?;

    let mut parts = value.split('|');
    let timestamp = parts.next().unwrap_or_default().trim();
    let commit_id = parts.next().map(str::trim).unwrap_or_default();
    let tags = parts.next().map(parse_tags).unwrap_or_default();
    if parts.next().is_some() {
      return Err(invalid(format!("entry '{}' has too many '|' separated fields", key)).into());
    }
    if commit_id.is_empty() {
      return Err(invalid(format!("entry '{}' must look like <timestamp>|<commit>", key)).into());
    }

    let timestamp = DateTime::parse_from_rfc3339(timestamp)
      .map_err(|e| invalid(format!("entry '{}' has an invalid timestamp '{}': {}", key, timestamp, e)))?
      .with_timezone(&Utc);

    Ok(Self {
      number,
      timestamp,
      commit_id: commit_id.to_string(),
      tags,
    })
  }

  /// Value side of the ledger entry
  pub fn render_value(&self) -> String {
    let mut value = format!(
      "{}|{}",
      self.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true),
      self.commit_id
    );
    if !self.tags.is_empty() {
      value.push('|');
      value.push_str(&self.tags.join(","));
    }
    value
  }

  /// True for the bootstrap entry written by `init`
  pub fn is_init(&self) -> bool {
    self.commit_id == INIT_COMMIT
  }

  /// True for a release waiting to be triggered on trunk
  pub fn is_autorelease(&self) -> bool {
    self.commit_id == AUTORELEASE_COMMIT
  }
}

fn parse_tags(raw: &str) -> Vec<String> {
  raw
    .split(',')
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .map(String::from)
    .collect()
}

/// Tags end up inside a plain YAML scalar and our own separators
pub fn validate_tag(tag: &str) -> KaeterResult<()> {
  let ok = !tag.is_empty()
    && tag == tag.trim()
    && !tag.contains([',', '|', '#', ':', '\n', '\r'])
    && !tag.starts_with(['"', '\'']);
  if ok {
    Ok(())
  } else {
    Err(ValidationError::InvalidTag { tag: tag.to_string() }.into())
  }
}

fn serialize_display<S: serde::Serializer>(value: &VersionIdentifier, serializer: S) -> Result<S::Ok, S::Error> {
  serializer.collect_str(value)
}

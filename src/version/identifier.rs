//! Version identifiers and the schemes that produce them

use crate::core::error::{KaeterResult, ValidationError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Versioning scheme declared by a ledger's `versioning` key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VersioningScheme {
  /// Semantic versioning, bumped by major/minor/patch
  #[default]
  SemVer,
  /// Calendar versioning: YY.MM.N derived from the release time
  CalVer,
  /// Free-form identifiers, always supplied by the user
  AnyStringVer,
}

impl VersioningScheme {
  pub fn as_str(&self) -> &'static str {
    match self {
      VersioningScheme::SemVer => "SemVer",
      VersioningScheme::CalVer => "CalVer",
      VersioningScheme::AnyStringVer => "AnyStringVer",
    }
  }
}

impl fmt::Display for VersioningScheme {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for VersioningScheme {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "" | "semver" => Ok(VersioningScheme::SemVer),
      "calver" => Ok(VersioningScheme::CalVer),
      "anystringver" => Ok(VersioningScheme::AnyStringVer),
      other => Err(format!(
        "unknown versioning scheme '{}' (expected SemVer, CalVer or AnyStringVer)",
        other
      )),
    }
  }
}

/// A single version value
///
/// `Structured` values (SemVer and CalVer ledgers) are ordered; `Opaque`
/// values (AnyStringVer ledgers) only support equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionIdentifier {
  Structured(semver::Version),
  Opaque(String),
}

impl VersionIdentifier {
  /// Parse a raw version under the given scheme
  pub fn parse(raw: &str, scheme: VersioningScheme) -> KaeterResult<Self> {
    let malformed = || ValidationError::MalformedVersion {
      raw: raw.to_string(),
      scheme: scheme.to_string(),
    };

    match scheme {
      VersioningScheme::SemVer | VersioningScheme::CalVer => semver::Version::parse(raw)
        .map(VersionIdentifier::Structured)
        .map_err(|_| malformed().into()),
      VersioningScheme::AnyStringVer => {
        if is_opaque_version(raw) {
          Ok(VersionIdentifier::Opaque(raw.to_string()))
        } else {
          Err(malformed().into())
        }
      }
    }
  }

  /// Numeric components, when the identifier has any
  pub fn as_structured(&self) -> Option<&semver::Version> {
    match self {
      VersionIdentifier::Structured(v) => Some(v),
      VersionIdentifier::Opaque(_) => None,
    }
  }
}

impl PartialOrd for VersionIdentifier {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    match (self, other) {
      (VersionIdentifier::Structured(a), VersionIdentifier::Structured(b)) => Some(a.cmp(b)),
      _ if self == other => Some(Ordering::Equal),
      _ => None,
    }
  }
}

impl fmt::Display for VersionIdentifier {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      VersionIdentifier::Structured(v) => write!(f, "{}", v),
      VersionIdentifier::Opaque(s) => f.write_str(s),
    }
  }
}

/// `[a-zA-Z0-9.+_~@-]+`
fn is_opaque_version(raw: &str) -> bool {
  !raw.is_empty()
    && raw
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '+' | '_' | '~' | '@' | '-'))
}

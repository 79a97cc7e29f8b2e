//! Release targets and plans
//!
//! A plan is the ordered list of `moduleID:version` pairs approved in one
//! release commit. Plans are identified by a SHA-256 over their entries so a
//! CI log can be matched to the commit that produced it.

use crate::core::error::{KaeterResult, ProtocolError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Plan identifier (SHA256 hash of the plan entries)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanId(String);

impl PlanId {
  /// Create a plan ID from plan contents
  pub fn from_contents(contents: &[u8]) -> Self {
    let mut hasher = Sha256::new();
    hasher.update(contents);
    let result = hasher.finalize();
    Self(format!("{:x}", result))
  }

  /// Get the short ID (first 12 characters)
  pub fn short(&self) -> &str {
    &self.0[..12.min(self.0.len())]
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for PlanId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.short())
  }
}

/// One module release requested by a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseTarget {
  pub module_id: String,
  pub version: String,
}

impl ReleaseTarget {
  pub fn new(module_id: impl Into<String>, version: impl Into<String>) -> Self {
    Self {
      module_id: module_id.into(),
      version: version.into(),
    }
  }
}

impl fmt::Display for ReleaseTarget {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.module_id, self.version)
  }
}

/// Module ids contain colons themselves (`group:name`), so the version starts
/// after the last one.
impl FromStr for ReleaseTarget {
  type Err = ProtocolError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let entry = s.trim();
    match entry.rsplit_once(':') {
      Some((module_id, version)) if !module_id.trim().is_empty() && !version.trim().is_empty() => {
        Ok(Self::new(module_id.trim(), version.trim()))
      }
      _ => Err(ProtocolError::MalformedTarget {
        entry: entry.to_string(),
      }),
    }
  }
}

/// Ordered, non-empty list of release targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleasePlan {
  releases: Vec<ReleaseTarget>,
}

impl ReleasePlan {
  pub fn new(releases: Vec<ReleaseTarget>) -> KaeterResult<Self> {
    if releases.is_empty() {
      return Err(ProtocolError::EmptyPlan.into());
    }
    Ok(Self { releases })
  }

  /// Parse `moduleID:version` entries
  #[cfg(test)]
  pub fn from_entries<S: AsRef<str>>(entries: &[S]) -> KaeterResult<Self> {
    let releases = entries
      .iter()
      .map(|e| e.as_ref().parse::<ReleaseTarget>())
      .collect::<Result<Vec<_>, _>>()?;
    Self::new(releases)
  }

  pub fn targets(&self) -> &[ReleaseTarget] {
    &self.releases
  }

  pub fn len(&self) -> usize {
    self.releases.len()
  }

  /// `moduleID:version` strings in plan order
  pub fn entries(&self) -> Vec<String> {
    self.releases.iter().map(ToString::to_string).collect()
  }

  pub fn id(&self) -> PlanId {
    PlanId::from_contents(self.entries().join("\n").as_bytes())
  }
}

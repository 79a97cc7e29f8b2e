//! Next-version computation for each versioning scheme

use super::identifier::{VersionIdentifier, VersioningScheme};
use crate::core::error::{KaeterError, KaeterResult, ValidationError};
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// Which SemVer component to increment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BumpKind {
  /// Major version bump (breaking changes)
  Major,
  /// Minor version bump (new features)
  Minor,
  /// Patch version bump (bug fixes)
  #[default]
  Patch,
}

impl BumpKind {
  /// Apply bump to a semver version
  pub fn apply(&self, version: &semver::Version) -> KaeterResult<semver::Version> {
    let bumped = match self {
      BumpKind::Major => version.major.checked_add(1).map(|major| semver::Version::new(major, 0, 0)),
      BumpKind::Minor => version
        .minor
        .checked_add(1)
        .map(|minor| semver::Version::new(version.major, minor, 0)),
      BumpKind::Patch => version
        .patch
        .checked_add(1)
        .map(|patch| semver::Version::new(version.major, version.minor, patch)),
    };
    bumped.ok_or_else(|| overflow(version))
  }
}

/// Compute the identifier following `previous` under `scheme`
///
/// `user_version` is the explicit version requested on the command line, if any.
/// Empty strings count as "not provided".
pub fn next_version(
  scheme: VersioningScheme,
  previous: &VersionIdentifier,
  bump: BumpKind,
  user_version: Option<&str>,
  ref_time: DateTime<Utc>,
) -> KaeterResult<VersionIdentifier> {
  let user_version = user_version.map(str::trim).filter(|v| !v.is_empty());

  match scheme {
    VersioningScheme::SemVer => {
      if let Some(raw) = user_version {
        return VersionIdentifier::parse(raw, scheme);
      }
      let prev = structured(previous, scheme)?;
      Ok(VersionIdentifier::Structured(bump.apply(prev)?))
    }
    VersioningScheme::CalVer => {
      if let Some(raw) = user_version {
        return Err(
          ValidationError::InvalidOverride {
            scheme: scheme.to_string(),
            reason: format!("manual version '{}' is not allowed, CalVer is derived from the date", raw),
          }
          .into(),
        );
      }
      let prev = structured(previous, scheme)?;
      Ok(VersionIdentifier::Structured(next_calver(prev, ref_time)?))
    }
    VersioningScheme::AnyStringVer => match user_version {
      Some(raw) => VersionIdentifier::parse(raw, scheme),
      None => Err(
        ValidationError::InvalidOverride {
          scheme: scheme.to_string(),
          reason: "an explicit version is required".to_string(),
        }
        .into(),
      ),
    },
  }
}

/// YY.MM.N where N restarts at 0 every month
fn next_calver(previous: &semver::Version, ref_time: DateTime<Utc>) -> KaeterResult<semver::Version> {
  let major = (ref_time.year().rem_euclid(100)) as u64;
  let minor = ref_time.month() as u64;

  if previous.major == major && previous.minor == minor {
    let patch = previous.patch.checked_add(1).ok_or_else(|| overflow(previous))?;
    Ok(semver::Version::new(major, minor, patch))
  } else {
    Ok(semver::Version::new(major, minor, 0))
  }
}

fn overflow(version: &semver::Version) -> KaeterError {
  ValidationError::VersionOverflow {
    version: version.to_string(),
  }
  .into()
}

fn structured(previous: &VersionIdentifier, scheme: VersioningScheme) -> KaeterResult<&semver::Version> {
  previous.as_structured().ok_or_else(|| {
    ValidationError::MalformedVersion {
      raw: previous.to_string(),
      scheme: scheme.to_string(),
    }
    .into()
  })
}

//! Release plans embedded in commit messages
//!
//! A release commit looks like this:
//!
//! ````text
//! [release] ch.open:mod:1.2.3 (+1 more modules)
//!
//! <boilerplate>
//!
//! Release Plan:
//! ```lang=yaml
//!
//! releases:
//! - ch.open:mod:1.2.3
//! - ch.open:other:2.0.0
//! ```
//! ````
//!
//! The subject tag marks the commit for CI, the fenced block carries the plan.

use super::plan::{ReleasePlan, ReleaseTarget};
use crate::core::error::{KaeterResult, ProtocolError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Literal that marks a commit as a release commit
pub const RELEASE_TAG: &str = "[release]";

/// Header line preceding the fenced plan block
pub const PLAN_MARKER: &str = "Release Plan:";

static PLAN_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?s)Release Plan:[ \t]*\r?\n[ \t]*```(?:lang=)?yaml[^\n]*\n(.*?)```")
    .expect("plan block pattern is valid")
});

#[derive(Serialize, Deserialize)]
struct PlanBody {
  #[serde(default)]
  releases: Option<Vec<String>>,
}

/// Render the commit message for `plan`
pub fn to_commit_message(plan: &ReleasePlan) -> KaeterResult<String> {
  let targets = plan.targets();
  let first = &targets[0];
  let mut subject = format!("{} {}", RELEASE_TAG, first);
  if targets.len() > 1 {
    subject.push_str(&format!(" (+{} more modules)", targets.len() - 1));
  }

  let body = to_plan_yaml(plan)?;

  Ok(format!(
    "{subject}\n\n\
     This commit was created by kaeter prepare. It records new versions in the\n\
     module ledgers listed below. Once it is on the trunk branch, CI builds,\n\
     tests and releases each module at the commit its ledger records.\n\n\
     {PLAN_MARKER}\n\
     ```lang=yaml\n\n\
     {body}\
     ```\n"
  ))
}

/// Extract the plan from a commit message
pub fn from_commit_message(message: &str) -> KaeterResult<ReleasePlan> {
  let captures = PLAN_BLOCK.captures(message).ok_or(ProtocolError::MissingPlan)?;
  let yaml = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
  from_plan_yaml(yaml)
}

/// The bare `releases:` document found inside the fenced block
pub fn to_plan_yaml(plan: &ReleasePlan) -> KaeterResult<String> {
  Ok(serde_yaml::to_string(&PlanBody {
    releases: Some(plan.entries()),
  })?)
}

/// Parse a bare `releases:` document
pub fn from_plan_yaml(yaml: &str) -> KaeterResult<ReleasePlan> {
  let body: PlanBody = serde_yaml::from_str(yaml).map_err(|e| ProtocolError::MalformedPlan { reason: e.to_string() })?;
  let entries = body.releases.unwrap_or_default();
  if entries.is_empty() {
    return Err(ProtocolError::EmptyPlan.into());
  }

  let releases = entries
    .iter()
    .map(|e| e.parse::<ReleaseTarget>())
    .collect::<Result<Vec<_>, _>>()?;
  ReleasePlan::new(releases)
}

/// Plan file contents: a full commit message or a bare `releases:` document
pub fn read_plan_text(text: &str) -> KaeterResult<ReleasePlan> {
  if PLAN_BLOCK.is_match(text) {
    from_commit_message(text)
  } else {
    from_plan_yaml(text)
  }
}

/// True when the message is tagged `[release]` and carries a readable plan
pub fn has_release_plan(message: &str) -> bool {
  message.contains(RELEASE_TAG) && from_commit_message(message).is_ok()
}

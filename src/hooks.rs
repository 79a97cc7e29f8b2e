//! Module hooks declared through ledger annotations
//!
//! ```yaml
//! metadata:
//!   annotations:
//!     open.ch/kaeter-hook/version: ./scripts/next-version.sh
//! ```
//!
//! The script path is relative to the module directory. It is called with the
//! module path, the current version and optionally the current commit; its
//! trimmed stdout is the computed version.

use crate::core::error::{KaeterError, KaeterResult};
use crate::core::process::{Invocation, ProcessRunner, run_checked};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Annotation naming the version hook
pub const VERSION_HOOK_ANNOTATION: &str = "open.ch/kaeter-hook/version";

pub struct HookRunner {
  runner: Arc<dyn ProcessRunner>,
}

impl HookRunner {
  pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
    Self { runner }
  }

  /// Script declared for `hook`, resolved against the module directory
  pub fn resolve(annotations: &BTreeMap<String, String>, hook: &str, module_dir: &Path) -> Option<PathBuf> {
    annotations
      .get(hook)
      .map(|p| p.trim())
      .filter(|p| !p.is_empty())
      .map(|p| module_dir.join(p))
  }

  /// Run the version hook, if the module declares one
  pub fn compute_version(
    &self,
    annotations: &BTreeMap<String, String>,
    module_dir: &Path,
    current_version: &str,
    current_commit: Option<&str>,
  ) -> KaeterResult<Option<String>> {
    let Some(script) = Self::resolve(annotations, VERSION_HOOK_ANNOTATION, module_dir) else {
      return Ok(None);
    };
    if !script.is_file() {
      return Err(KaeterError::with_help(
        format!("Version hook {} does not exist", script.display()),
        format!("Fix the '{}' annotation in the module's ledger.", VERSION_HOOK_ANNOTATION),
      ));
    }

    let mut invocation = Invocation::new(script.to_string_lossy())
      .arg(module_dir.to_string_lossy())
      .arg(current_version)
      .cwd(module_dir);
    if let Some(commit) = current_commit {
      invocation = invocation.arg(commit);
    }

    let output = run_checked(self.runner.as_ref(), &invocation)?;
    let version = output.stdout.trim();
    if version.is_empty() {
      return Err(KaeterError::message(format!(
        "Version hook {} printed no version",
        script.display()
      )));
    }
    Ok(Some(version.to_string()))
  }
}

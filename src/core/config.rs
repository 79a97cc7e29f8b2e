use crate::core::error::{ConfigError, KaeterResult, ResultExt};
use crate::ledger::LEDGER_FILE_NAMES;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for kaeter
/// Searched in order: kaeter.toml, .kaeter.toml, .config/kaeter.toml
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KaeterConfig {
  #[serde(default)]
  pub git: GitConfig,
  #[serde(default)]
  pub build: BuildConfig,
  #[serde(default)]
  pub release: ReleaseConfig,
  #[serde(default)]
  pub discovery: DiscoveryConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitConfig {
  /// Branch a release commit must be reachable from (default: "master")
  #[serde(default = "default_trunk")]
  pub trunk: String,
}

fn default_trunk() -> String {
  "master".to_string()
}

impl Default for GitConfig {
  fn default() -> Self {
    Self { trunk: default_trunk() }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
  /// Build tool binary invoked with `--file <makefile>` (default: "make")
  #[serde(default = "default_tool")]
  pub tool: String,
}

fn default_tool() -> String {
  "make".to_string()
}

impl Default for BuildConfig {
  fn default() -> Self {
    Self { tool: default_tool() }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseConfig {
  /// Module ids never released by this repository's CI
  #[serde(default)]
  pub skip_modules: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
  /// File names treated as ledgers
  #[serde(default = "default_ledger_names")]
  pub ledger_names: Vec<String>,
}

fn default_ledger_names() -> Vec<String> {
  LEDGER_FILE_NAMES.iter().map(|s| s.to_string()).collect()
}

impl Default for DiscoveryConfig {
  fn default() -> Self {
    Self {
      ledger_names: default_ledger_names(),
    }
  }
}

impl KaeterConfig {
  /// Find config file in search order: kaeter.toml, .kaeter.toml, .config/kaeter.toml
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = [
      path.join("kaeter.toml"),
      path.join(".kaeter.toml"),
      path.join(".config").join("kaeter.toml"),
    ];

    candidates.into_iter().find(|p| p.is_file())
  }

  /// Load config from the repository root; a missing file yields the defaults
  pub fn load(path: &Path) -> KaeterResult<Self> {
    let Some(config_path) = Self::find_config_path(path) else {
      return Ok(Self::default());
    };

    let content = fs::read_to_string(&config_path)
      .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
    let config: KaeterConfig = toml_edit::de::from_str(&content).map_err(|e| ConfigError::Malformed {
      path: config_path.clone(),
      reason: e.to_string(),
    })?;

    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> KaeterResult<()> {
    let invalid = |field: &str, reason: &str| ConfigError::InvalidField {
      field: field.to_string(),
      reason: reason.to_string(),
    };

    if self.git.trunk.trim().is_empty() {
      return Err(invalid("git.trunk", "must not be empty").into());
    }
    if self.build.tool.trim().is_empty() {
      return Err(invalid("build.tool", "must not be empty").into());
    }
    if self.discovery.ledger_names.is_empty() {
      return Err(invalid("discovery.ledger_names", "at least one file name is required").into());
    }
    if self
      .discovery
      .ledger_names
      .iter()
      .any(|n| n.trim().is_empty() || n.contains(['/', '\\']))
    {
      return Err(invalid("discovery.ledger_names", "entries must be plain file names").into());
    }
    Ok(())
  }

  /// Apply command line overrides on top of the file values
  pub fn with_overrides(mut self, trunk: Option<&str>, build_tool: Option<&str>) -> KaeterResult<Self> {
    if let Some(trunk) = trunk {
      self.git.trunk = trunk.to_string();
    }
    if let Some(tool) = build_tool {
      self.build.tool = tool.to_string();
    }
    self.validate()?;
    Ok(self)
  }
}

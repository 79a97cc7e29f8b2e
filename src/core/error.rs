//! Error types for kaeter with contextual messages and exit codes
//!
//! This module provides a unified error type that categorizes errors and provides
//! contextual help messages to users. The categories mirror the places a release
//! can go wrong: bad input (validation), a broken commit-message protocol, missing
//! modules or build files, failing external tools, and inconsistent repository state.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for kaeter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, invalid args, missing files)
  User = 1,
  /// System error (git, build tool, I/O)
  System = 2,
  /// Validation failure (ledger rules, plan consistency)
  Validation = 3,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for kaeter
#[derive(Debug)]
pub enum KaeterError {
  /// Configuration errors
  Config(ConfigError),

  /// Malformed versions, wrong scheme/override combinations, duplicate entries
  Validation(ValidationError),

  /// Release plan block missing or malformed
  Protocol(ProtocolError),

  /// Module, ledger or build file that should exist but does not
  NotFound(NotFoundError),

  /// Repository state that contradicts the request
  Consistency(ConsistencyError),

  /// An external process (git, build tool, hook) exited unsuccessfully
  ExternalTool { command: String, output: String },

  /// A compensating restore failed after an earlier failure
  RestoreFailed {
    cause: Box<KaeterError>,
    restore: Box<KaeterError>,
  },

  /// Several independent failures collected from one operation
  Aggregate(Vec<KaeterError>),

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl KaeterError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    KaeterError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    KaeterError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Join a list of errors; a single error is returned unwrapped
  pub fn join(mut errors: Vec<KaeterError>) -> Option<Self> {
    match errors.len() {
      0 => None,
      1 => errors.pop(),
      _ => Some(KaeterError::Aggregate(errors)),
    }
  }

  /// Add context to an existing error
  ///
  /// Only message-style errors carry context; structured errors pass through
  /// unchanged so their category and exit code survive.
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      KaeterError::Message { message, context, help } => KaeterError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      KaeterError::Io(e) => KaeterError::Message {
        message: format!("I/O error: {}", e),
        context: Some(ctx_str),
        help: None,
      },
      other => other,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      KaeterError::Config(_) => ExitCode::User,
      KaeterError::Validation(_) => ExitCode::Validation,
      KaeterError::Protocol(_) => ExitCode::Validation,
      KaeterError::NotFound(_) => ExitCode::User,
      KaeterError::Consistency(_) => ExitCode::Validation,
      KaeterError::ExternalTool { .. } => ExitCode::System,
      KaeterError::RestoreFailed { .. } => ExitCode::System,
      KaeterError::Aggregate(errors) => errors
        .iter()
        .map(|e| e.exit_code())
        .max_by_key(|c| c.as_i32())
        .unwrap_or(ExitCode::User),
      KaeterError::Io(_) => ExitCode::System,
      KaeterError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      KaeterError::Config(e) => e.help_message(),
      KaeterError::Validation(e) => e.help_message(),
      KaeterError::Protocol(e) => e.help_message(),
      KaeterError::NotFound(e) => e.help_message(),
      KaeterError::Consistency(e) => e.help_message(),
      KaeterError::RestoreFailed { .. } => Some(
        "The ledger file could not be restored automatically. Run `git checkout -- <ledger>` and fix it by hand."
          .to_string(),
      ),
      KaeterError::Message { help, .. } => help.clone(),
      _ => None,
    }
  }
}

impl fmt::Display for KaeterError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      KaeterError::Config(e) => write!(f, "{}", e),
      KaeterError::Validation(e) => write!(f, "{}", e),
      KaeterError::Protocol(e) => write!(f, "{}", e),
      KaeterError::NotFound(e) => write!(f, "{}", e),
      KaeterError::Consistency(e) => write!(f, "{}", e),
      KaeterError::ExternalTool { command, output } => {
        write!(f, "Command failed: {}", command)?;
        if !output.trim().is_empty() {
          write!(f, "\n{}", output.trim_end())?;
        }
        Ok(())
      }
      KaeterError::RestoreFailed { cause, restore } => {
        write!(f, "{}\nRestoring the ledger also failed: {}", cause, restore)
      }
      KaeterError::Aggregate(errors) => {
        write!(f, "{} errors occurred:", errors.len())?;
        for error in errors {
          write!(f, "\n  - {}", error)?;
        }
        Ok(())
      }
      KaeterError::Io(e) => write!(f, "I/O error: {}", e),
      KaeterError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for KaeterError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      KaeterError::Io(e) => Some(e),
      KaeterError::RestoreFailed { cause, .. } => Some(cause.as_ref()),
      _ => None,
    }
  }
}

impl From<io::Error> for KaeterError {
  fn from(err: io::Error) -> Self {
    KaeterError::Io(err)
  }
}

impl From<String> for KaeterError {
  fn from(msg: String) -> Self {
    KaeterError::message(msg)
  }
}

impl From<&str> for KaeterError {
  fn from(msg: &str) -> Self {
    KaeterError::message(msg)
  }
}

impl From<ValidationError> for KaeterError {
  fn from(err: ValidationError) -> Self {
    KaeterError::Validation(err)
  }
}

impl From<ProtocolError> for KaeterError {
  fn from(err: ProtocolError) -> Self {
    KaeterError::Protocol(err)
  }
}

impl From<NotFoundError> for KaeterError {
  fn from(err: NotFoundError) -> Self {
    KaeterError::NotFound(err)
  }
}

impl From<ConsistencyError> for KaeterError {
  fn from(err: ConsistencyError) -> Self {
    KaeterError::Consistency(err)
  }
}

impl From<ConfigError> for KaeterError {
  fn from(err: ConfigError) -> Self {
    KaeterError::Config(err)
  }
}

impl From<serde_yaml::Error> for KaeterError {
  fn from(err: serde_yaml::Error) -> Self {
    KaeterError::message(format!("YAML error: {}", err))
  }
}

impl From<serde_json::Error> for KaeterError {
  fn from(err: serde_json::Error) -> Self {
    KaeterError::message(format!("JSON error: {}", err))
  }
}

impl From<toml_edit::de::Error> for KaeterError {
  fn from(err: toml_edit::de::Error) -> Self {
    KaeterError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<semver::Error> for KaeterError {
  fn from(err: semver::Error) -> Self {
    KaeterError::message(format!("Version parse error: {}", err))
  }
}

impl From<chrono::ParseError> for KaeterError {
  fn from(err: chrono::ParseError) -> Self {
    KaeterError::message(format!("Timestamp parse error: {}", err))
  }
}

impl From<regex::Error> for KaeterError {
  fn from(err: regex::Error) -> Self {
    KaeterError::message(format!("Pattern error: {}", err))
  }
}

impl From<std::path::StripPrefixError> for KaeterError {
  fn from(err: std::path::StripPrefixError) -> Self {
    KaeterError::message(format!("Path strip prefix error: {}", err))
  }
}

impl From<std::string::FromUtf8Error> for KaeterError {
  fn from(err: std::string::FromUtf8Error) -> Self {
    KaeterError::message(format!("UTF-8 conversion error: {}", err))
  }
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
  /// Config file exists but a field holds an unusable value
  InvalidField { field: String, reason: String },

  /// Config file could not be parsed
  Malformed { path: PathBuf, reason: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::InvalidField { field, .. } => Some(format!(
        "Fix `{}` in kaeter.toml or override it on the command line.",
        field
      )),
      ConfigError::Malformed { .. } => Some("kaeter.toml must be valid TOML; see `kaeter --help`.".to_string()),
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::InvalidField { field, reason } => {
        write!(f, "Invalid configuration value for '{}': {}", field, reason)
      }
      ConfigError::Malformed { path, reason } => {
        write!(f, "Failed to parse configuration {}: {}", path.display(), reason)
      }
    }
  }
}

/// Validation errors (ledger rules and version parsing)
#[derive(Debug)]
pub enum ValidationError {
  /// Version string does not parse under the ledger's scheme
  MalformedVersion { raw: String, scheme: String },

  /// Scheme and manual-version combination is not allowed
  InvalidOverride { scheme: String, reason: String },

  /// Version already recorded in the ledger
  DuplicateVersion { version: String },

  /// Commit already recorded in the ledger
  DuplicateCommit { commit: String },

  /// Release requested without a commit identifier
  EmptyCommit,

  /// Tag that cannot be stored in a ledger entry
  InvalidTag { tag: String },

  /// Bumping a component would exceed its numeric range
  VersionOverflow { version: String },

  /// Ledger carries no entries at all
  Uninitialized { id: String },

  /// Ledger file content is structurally wrong
  InvalidLedger { path: PathBuf, reason: String },
}

impl ValidationError {
  fn help_message(&self) -> Option<String> {
    match self {
      ValidationError::MalformedVersion { scheme, .. } => Some(match scheme.as_str() {
        "AnyStringVer" => "AnyStringVer versions may only contain [a-zA-Z0-9.+_~@-].".to_string(),
        _ => "Versions must look like MAJOR.MINOR.PATCH (e.g. 1.2.3 or 1.2.3-rc.1).".to_string(),
      }),
      ValidationError::Uninitialized { .. } => {
        Some("Initialise the module with `kaeter init` so it gets its 0.0.0 entry.".to_string())
      }
      ValidationError::VersionOverflow { .. } => Some("Pass the next version explicitly with --version.".to_string()),
      ValidationError::DuplicateCommit { .. } => {
        Some("Each release needs its own commit. Commit your changes before preparing another release.".to_string())
      }
      _ => None,
    }
  }
}

impl fmt::Display for ValidationError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ValidationError::MalformedVersion { raw, scheme } => {
        write!(f, "Malformed {} version: '{}'", scheme, raw)
      }
      ValidationError::InvalidOverride { scheme, reason } => {
        write!(f, "Invalid version request for {} module: {}", scheme, reason)
      }
      ValidationError::DuplicateVersion { version } => {
        write!(f, "Version {} already exists in the ledger", version)
      }
      ValidationError::DuplicateCommit { commit } => {
        write!(f, "Commit {} is already associated with a release", commit)
      }
      ValidationError::EmptyCommit => write!(f, "Cannot add a release without a commit id"),
      ValidationError::InvalidTag { tag } => {
        write!(f, "Invalid release tag '{}': tags may not contain ',', '|', '#' or ':'", tag)
      }
      ValidationError::VersionOverflow { version } => {
        write!(f, "Cannot compute the version after {}: a component is at its maximum", version)
      }
      ValidationError::Uninitialized { id } => {
        write!(f, "Ledger for '{}' has no released versions; it is not initialised", id)
      }
      ValidationError::InvalidLedger { path, reason } => {
        write!(f, "Invalid ledger {}: {}", path.display(), reason)
      }
    }
  }
}

/// Release plan embedding errors
#[derive(Debug)]
pub enum ProtocolError {
  /// No fenced release plan block in the message
  MissingPlan,

  /// The block exists but lists no releases
  EmptyPlan,

  /// The block body is not the expected YAML document
  MalformedPlan { reason: String },

  /// An entry is not `moduleID:version`
  MalformedTarget { entry: String },
}

impl ProtocolError {
  fn help_message(&self) -> Option<String> {
    match self {
      ProtocolError::MissingPlan => {
        Some("Release commits are created by `kaeter prepare`; check that HEAD is such a commit.".to_string())
      }
      _ => None,
    }
  }
}

impl fmt::Display for ProtocolError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ProtocolError::MissingPlan => write!(f, "No release plan found in commit message"),
      ProtocolError::EmptyPlan => write!(f, "Release plan does not contain any release"),
      ProtocolError::MalformedPlan { reason } => write!(f, "Malformed release plan: {}", reason),
      ProtocolError::MalformedTarget { entry } => {
        write!(f, "Malformed release target '{}': expected <moduleID>:<version>", entry)
      }
    }
  }
}

/// Missing modules, ledgers and build files
#[derive(Debug)]
pub enum NotFoundError {
  /// Module id not present in the inventory
  Module { id: String },

  /// No ledger file at the given location
  Ledger { path: PathBuf },

  /// Module directory has neither Makefile.kaeter nor Makefile
  BuildFile { dir: PathBuf },
}

impl NotFoundError {
  fn help_message(&self) -> Option<String> {
    match self {
      NotFoundError::Module { .. } => Some("List known modules with `kaeter inventorize`.".to_string()),
      NotFoundError::BuildFile { .. } => {
        Some("Add a Makefile.kaeter (or Makefile) with build, test and release targets.".to_string())
      }
      NotFoundError::Ledger { .. } => Some("Create one with `kaeter init`.".to_string()),
    }
  }
}

impl fmt::Display for NotFoundError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      NotFoundError::Module { id } => write!(f, "Module '{}' not found", id),
      NotFoundError::Ledger { path } => write!(f, "No versions file found at {}", path.display()),
      NotFoundError::BuildFile { dir } => {
        write!(f, "No Makefile.kaeter or Makefile found in {}", dir.display())
      }
    }
  }
}

/// Repository state contradicting the request
#[derive(Debug)]
pub enum ConsistencyError {
  /// Two ledgers declare the same module id
  DuplicateModuleId { id: String, first: PathBuf, second: PathBuf },

  /// Ledger found for a target declares another id
  ModuleIdMismatch { expected: String, found: String },

  /// Target version is not the ledger's most recent release
  NotLatestVersion {
    module: String,
    requested: String,
    latest: String,
  },

  /// Release commit is not reachable from the trunk branch
  CommitNotOnTrunk { commit: String, trunk: String },
}

impl ConsistencyError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConsistencyError::DuplicateModuleId { .. } => Some("Module ids must be unique across the repository.".to_string()),
      ConsistencyError::NotLatestVersion { .. } => {
        Some("Only the most recent version in a ledger can be released.".to_string())
      }
      ConsistencyError::CommitNotOnTrunk { trunk, .. } => Some(format!(
        "Merge the release commit into '{}' (and fetch it) before releasing.",
        trunk
      )),
      _ => None,
    }
  }
}

impl fmt::Display for ConsistencyError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConsistencyError::DuplicateModuleId { id, first, second } => write!(
        f,
        "Duplicate module id '{}' declared in {} and {}",
        id,
        first.display(),
        second.display()
      ),
      ConsistencyError::ModuleIdMismatch { expected, found } => {
        write!(f, "Ledger declares module id '{}' but '{}' was requested", found, expected)
      }
      ConsistencyError::NotLatestVersion {
        module,
        requested,
        latest,
      } => write!(
        f,
        "Cannot release {}:{}: the latest version in its ledger is {}",
        module, requested, latest
      ),
      ConsistencyError::CommitNotOnTrunk { commit, trunk } => {
        write!(f, "Commit {} is not part of branch '{}'", commit, trunk)
      }
    }
  }
}

/// Result type alias for kaeter
pub type KaeterResult<T> = Result<T, KaeterError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> KaeterResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<KaeterError>,
{
  fn with_context<F>(self, f: F) -> KaeterResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &KaeterError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}

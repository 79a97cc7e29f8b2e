//! Reporter interface handed to long-running components
//!
//! Components never log through a global; they get an `Arc<dyn Reporter>` at
//! construction so tests can capture what a run said.

pub trait Reporter: Send + Sync {
  fn info(&self, message: &str);
  fn warn(&self, message: &str);
  fn debug(&self, message: &str);

  /// Called once per plan target after it reached a final state
  fn target_finished(&self, _target: &str) {}
}

/// Forwards to the `tracing` facade
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
  fn info(&self, message: &str) {
    tracing::info!("{}", message);
  }

  fn warn(&self, message: &str) {
    tracing::warn!("{}", message);
  }

  fn debug(&self, message: &str) {
    tracing::debug!("{}", message);
  }

  fn target_finished(&self, target: &str) {
    tracing::debug!(target = target, "target finished");
  }
}

/// Keeps every line in memory, prefixed with its level
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryReporter {
  lines: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl MemoryReporter {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn lines(&self) -> Vec<String> {
    self.lines.lock().map(|l| l.clone()).unwrap_or_default()
  }

  /// True when any recorded line contains `needle`
  pub fn contains(&self, needle: &str) -> bool {
    self.lines().iter().any(|l| l.contains(needle))
  }

  fn push(&self, level: &str, message: &str) {
    if let Ok(mut lines) = self.lines.lock() {
      lines.push(format!("{} {}", level, message));
    }
  }
}

#[cfg(test)]
impl Reporter for MemoryReporter {
  fn info(&self, message: &str) {
    self.push("INFO", message);
  }

  fn warn(&self, message: &str) {
    self.push("WARN", message);
  }

  fn debug(&self, message: &str) {
    self.push("DEBUG", message);
  }

  fn target_finished(&self, target: &str) {
    self.push("DONE", target);
  }
}

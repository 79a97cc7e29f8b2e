//! Progress indicators for release runs
//!
//! Uses `linya` for allocation-free progress bars drawn on stderr.

use super::reporter::Reporter;
use linya::{Bar, Progress};
use std::sync::{Arc, Mutex};

/// Reporter that advances one bar per finished plan target
///
/// Messages are forwarded to the wrapped reporter unchanged.
pub struct ProgressReporter {
  inner: Arc<dyn Reporter>,
  progress: Mutex<Progress>,
  bar: Bar,
}

impl ProgressReporter {
  /// Create a bar sized to the plan
  pub fn new(inner: Arc<dyn Reporter>, total: usize, label: impl Into<String>) -> Self {
    let mut progress = Progress::new();
    let bar = progress.bar(total, label.into());
    Self {
      inner,
      progress: Mutex::new(progress),
      bar,
    }
  }
}

impl Reporter for ProgressReporter {
  fn info(&self, message: &str) {
    self.inner.info(message);
  }

  fn warn(&self, message: &str) {
    self.inner.warn(message);
  }

  fn debug(&self, message: &str) {
    self.inner.debug(message);
  }

  fn target_finished(&self, target: &str) {
    self.inner.target_finished(target);
    if let Ok(mut progress) = self.progress.lock() {
      progress.inc_and_draw(&self.bar, 1);
    }
  }
}

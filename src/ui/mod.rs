//! Run narration: the reporter interface and its terminal renderings

pub mod progress;
pub mod reporter;

pub use progress::ProgressReporter;
#[cfg(test)]
pub use reporter::MemoryReporter;
pub use reporter::{Reporter, TracingReporter};

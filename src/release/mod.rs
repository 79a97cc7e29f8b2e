//! Release plans and their execution
//!
//! # Flow
//!
//! ```text
//! kaeter prepare        ledgers += new version, commit "[release] ..." with plan
//!   |
//!   v  (merged to trunk)
//! kaeter release        plan read back from the commit message
//!   |
//!   v
//! Orchestrator          validate -> checkout -> build -> test -> release -> restore
//! ```

pub mod build;
pub mod codec;
pub mod orchestrator;
pub mod plan;

pub use codec::{from_commit_message, has_release_plan, read_plan_text, to_commit_message, to_plan_yaml};
pub use orchestrator::{Orchestrator, OrchestratorOptions, TargetReport, TargetState};
pub use plan::{ReleasePlan, ReleaseTarget};

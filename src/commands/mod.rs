//! CLI commands for kaeter
//!
//! ## Setup & Inspection
//! - **init**: Create the versions file, README and CHANGELOG of a new module
//! - **lint**: Check modules for a valid ledger, README and CHANGELOG
//! - **info** / **inventorize** / **module**: Show ledgers and the module inventory
//! - **read-plan**: Print the release plan embedded in a commit
//!
//! ## Releases
//! - **prepare**: Add versions to ledgers and commit them with a release plan
//! - **autorelease**: Add a version that CI releases once it lands on trunk
//! - **release**: Execute the plan of the HEAD commit
//! - **ci autoreleaseplan** / **ci release**: The CI halves of the autorelease flow
//!
//! Every command except `init` receives the `&RepoContext` built in main.rs.

pub mod ci;
pub mod init;
pub mod inspect;
pub mod lint;
pub mod prepare;
pub mod release;

pub use ci::run_autorelease_plan;
pub use init::run_init;
pub use inspect::{run_info, run_inventorize, run_module, run_read_plan};
pub use lint::run_lint;
pub use prepare::{ReleaseRequest, run_autorelease, run_prepare};
pub use release::{RunOptions, run_ci_release, run_release};

/// Abbreviated commit id for display
pub(crate) fn short_sha(commit: &str) -> &str {
  commit.get(..12).unwrap_or(commit)
}

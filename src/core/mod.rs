//! Core building blocks shared by every command
//!
//! - **config**: kaeter.toml parsing and validation
//! - **context**: Repository context built once in main.rs
//! - **error**: Error types with exit codes and contextual help messages
//! - **process**: External command invocation behind a fakeable runner
//! - **vcs**: Git operations (SystemGit)

pub mod config;
pub mod context;
pub mod error;
pub mod process;
pub mod vcs;

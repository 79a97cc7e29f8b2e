//! Version identifiers and bump rules
//!
//! A ledger declares one of three schemes. SemVer and CalVer values are
//! structured `MAJOR.MINOR.PATCH[-pre][+build]` numbers; AnyStringVer values
//! are opaque strings that can only be compared for equality.

pub mod bump;
pub mod identifier;

pub use bump::{BumpKind, next_version};
pub use identifier::{VersionIdentifier, VersioningScheme};

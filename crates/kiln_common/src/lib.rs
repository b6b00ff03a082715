//! Shared foundational types used across the Kiln toolchain builder.
//!
//! This crate provides the pinned toolchain [`Version`], the on-disk
//! [`Workspace`] layout, modification-time helpers used by every freshness
//! check, and content hashing for fingerprinting layer definitions.

#![warn(missing_docs)]

pub mod hash;
pub mod timestamp;
pub mod version;
pub mod workspace;

pub use hash::ContentHash;
pub use timestamp::{is_up_to_date, mtime, newest_mtime, touch};
pub use version::{Version, VersionError};
pub use workspace::{Workspace, TOOLCHAIN_NAME};

//! Freshness checks and compiled-output bookkeeping for incremental builds.
//!
//! Every pipeline stage decides between "skip" and "execute" with the
//! modification-time checks in [`freshness`]. The compile layers additionally
//! record what they produced in an [`OutputStore`], so a layer can tell
//! whether its classes are still present in the shared class directory and
//! whether an upstream layer has been rebuilt since it last ran.

#![warn(missing_docs)]

pub mod error;
pub mod freshness;
pub mod store;

pub use error::CacheError;
pub use freshness::{dir_is_populated, UpToDate};
pub use store::{ClassSnapshot, CompiledUnit, LayerRecord, OutputStore, Stamp, STORE_FILE};

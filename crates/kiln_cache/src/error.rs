//! Error types for cache operations.

use std::path::PathBuf;

/// Errors that can occur while reading or writing build bookkeeping.
///
/// Loading is fail-safe (a damaged store reads as empty and forces a
/// rebuild); these errors surface only when persisting fails.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing cache files.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },
}

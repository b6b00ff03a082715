//! Error types for process execution.

use std::path::PathBuf;

/// Errors raised before an external process reports an exit status.
///
/// A process that starts and exits non-zero is not an `ExecError`; it is
/// reported through [`ExitReport`](crate::ExitReport) and turned into a
/// stage-specific error by the caller.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    /// The program could not be started.
    #[error("failed to launch {program}: {source}")]
    Launch {
        /// The program that failed to start.
        program: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// An argument file could not be written.
    #[error("failed to write argument file in {dir}: {source}")]
    ArgFile {
        /// Directory the argument file was written to.
        dir: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A stage referenced a task kind that was never registered.
    #[error("task kind '{name}' is not registered (has the bootstrap stage run?)")]
    TaskNotRegistered {
        /// Name of the missing task kind.
        name: String,
    },
}

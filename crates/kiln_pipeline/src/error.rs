//! The error returned by a pipeline run.

use std::path::PathBuf;

use kiln_fetch::{ExtractError, FetchError};
use kiln_stages::{BootstrapError, CompileError, GenerationError, PackageError, PreprocessError};

/// A failed run, naming the stage that failed.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Downloading the source archive failed.
    #[error("fetch: {0}")]
    Fetch(#[from] FetchError),

    /// Unpacking the source archive failed.
    #[error("extract: {0}")]
    Extract(#[from] ExtractError),

    /// Compiling the helper tools failed.
    #[error("bootstrap: {0}")]
    Bootstrap(#[from] BootstrapError),

    /// Rendering the version templates failed.
    #[error("preprocess: {0}")]
    Preprocess(#[from] PreprocessError),

    /// Generating the vector sources failed.
    #[error("generate: {0}")]
    Generate(#[from] GenerationError),

    /// A compile layer or a user compilation failed.
    #[error("compile: {0}")]
    Compile(#[from] CompileError),

    /// Writing the jars failed.
    #[error("package: {0}")]
    Package(#[from] PackageError),

    /// The extracted tree could not be discarded for a rebuild.
    #[error("rebuild: cannot remove {path}: {source}")]
    Clean {
        /// The tree being removed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

//! Error types for the build stages.
//!
//! One enum per stage. All of them are fatal to the run; an external process
//! that exits non-zero carries its diagnostics so the user sees why.

use std::path::PathBuf;

use kiln_exec::ExecError;

/// Errors from compiling the helper tools.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// None of the helper sources were found.
    #[error("no bootstrap sources under {dir}")]
    MissingSources {
        /// The extracted source root.
        dir: PathBuf,
    },

    /// `javac` rejected the helper sources.
    #[error("bootstrap compile failed (exit {code:?}):\n{diagnostics}")]
    Failed {
        /// Exit code of the compiler.
        code: Option<i32>,
        /// Compiler output.
        diagnostics: String,
    },

    /// The output directory could not be created.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The directory being created.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The compiler could not be run.
    #[error(transparent)]
    Exec(#[from] ExecError),
}

/// Errors from rewriting the version templates.
#[derive(Debug, thiserror::Error)]
pub enum PreprocessError {
    /// The directory holding the templates does not exist.
    #[error("preprocess source directory {dir} does not exist")]
    MissingSourceDir {
        /// The missing directory.
        dir: PathBuf,
    },

    /// The structured-copy task kind was not registered.
    #[error("task kind '{name}' is not registered")]
    TaskNotRegistered {
        /// Name of the missing task kind.
        name: String,
    },

    /// The include pattern was malformed.
    #[error("invalid include pattern '{pattern}': {reason}")]
    Pattern {
        /// The offending pattern.
        pattern: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Reading a template or writing its output failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The file being read or written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors from generating the vector sources.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The shared template is missing.
    #[error("vector template {path} does not exist")]
    MissingTemplate {
        /// Expected template path.
        path: PathBuf,
    },

    /// The generator failed for one element type.
    #[error("generator failed for tag {tag} (exit {code:?}):\n{diagnostics}")]
    Failed {
        /// Element-type tag being generated.
        tag: String,
        /// Exit code of the generator.
        code: Option<i32>,
        /// Generator output.
        diagnostics: String,
    },

    /// The generator could not be run.
    #[error(transparent)]
    Exec(#[from] ExecError),
}

/// Errors from compiling a layer of classes.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// A file named in a layer definition is missing.
    #[error("layer {layer}: source {path} does not exist")]
    MissingSource {
        /// Layer being compiled.
        layer: String,
        /// The missing file.
        path: PathBuf,
    },

    /// The compiler reported errors, including warnings escalated to errors.
    #[error("layer {layer} failed to compile (exit {code:?}):\n{diagnostics}")]
    Failed {
        /// Layer being compiled.
        layer: String,
        /// Exit code of the compiler.
        code: Option<i32>,
        /// Compiler output.
        diagnostics: String,
    },

    /// The target-language compile task was not registered.
    #[error("task kind '{name}' is not registered")]
    TaskNotRegistered {
        /// Name of the missing task kind.
        name: String,
    },

    /// The include pattern was malformed.
    #[error("invalid include pattern '{pattern}': {reason}")]
    Pattern {
        /// The offending pattern.
        pattern: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The class directory could not be created.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The directory being created.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The output store could not be written.
    #[error(transparent)]
    Cache(#[from] kiln_cache::CacheError),

    /// The compiler could not be run.
    #[error(transparent)]
    Exec(#[from] ExecError),
}

/// Errors from writing the distributable archives.
#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    /// Reading inputs or writing an archive failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The path being read or written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// An existing archive could not be read or the new one not written.
    #[error("archive error in {path}: {reason}")]
    Archive {
        /// The archive.
        path: PathBuf,
        /// Description of the failure.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_failure_carries_diagnostics() {
        let err = CompileError::Failed {
            layer: "lib-3".to_string(),
            code: Some(1),
            diagnostics: "pprint.scm:12:3: unbound location: define-record-type".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("lib-3"));
        assert!(msg.contains("unbound location"));
    }

    #[test]
    fn exec_errors_wrap_transparently() {
        let err: GenerationError = ExecError::TaskNotRegistered {
            name: "xcopy".to_string(),
        }
        .into();
        assert!(err.to_string().contains("'xcopy'"));
    }
}

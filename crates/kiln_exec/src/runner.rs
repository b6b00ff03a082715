//! Running invocations as child processes.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::ExecError;
use crate::invocation::{Invocation, JavaTools, Tool};

/// `javac` calls with more sources than this pass them through an
/// `@argfile`, keeping the command line under platform limits.
const ARGFILE_THRESHOLD: usize = 64;

/// How a process ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExitReport {
    /// Exit code, or `None` if the process was killed by a signal.
    pub code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl ExitReport {
    /// A clean exit with no output.
    pub fn ok() -> Self {
        Self {
            code: Some(0),
            ..Self::default()
        }
    }

    /// A failed exit with `message` on standard error.
    pub fn failed(code: i32, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: message.into(),
        }
    }

    /// Exit code 0.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// The compiler's diagnostics: standard error, or standard output when
    /// the tool reports there (the Kawa compiler does).
    pub fn diagnostics(&self) -> &str {
        let err = self.stderr.trim();
        if err.is_empty() {
            self.stdout.trim()
        } else {
            err
        }
    }
}

/// Executes invocations. Implemented by [`CommandRunner`] and by test fakes.
pub trait ProcessRunner {
    /// Runs `invocation` to completion.
    ///
    /// Returns `Err` only if the process could not be started; a non-zero
    /// exit is reported through [`ExitReport`].
    fn run(&self, tools: &JavaTools, invocation: &Invocation) -> Result<ExitReport, ExecError>;
}

/// Spawns the JDK launchers with [`std::process::Command`].
#[derive(Debug, Default, Clone)]
pub struct CommandRunner {
    argfile_dir: Option<PathBuf>,
}

impl CommandRunner {
    /// A runner writing argument files to the system temp directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes argument files to `dir` instead.
    pub fn with_argfile_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.argfile_dir = Some(dir.into());
        self
    }

    fn write_argfile(&self, sources: &[PathBuf]) -> Result<tempfile::NamedTempFile, ExecError> {
        let dir = self
            .argfile_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir);
        let err = |source| ExecError::ArgFile {
            dir: dir.clone(),
            source,
        };
        std::fs::create_dir_all(&dir).map_err(err)?;
        let mut file = tempfile::Builder::new()
            .prefix("javac-")
            .suffix(".args")
            .tempfile_in(&dir)
            .map_err(err)?;
        for source in sources {
            writeln!(file, "{}", quote_arg(source)).map_err(err)?;
        }
        file.flush().map_err(err)?;
        Ok(file)
    }
}

/// Quotes a path for a `javac` argument file.
fn quote_arg(path: &Path) -> String {
    let raw = path.to_string_lossy();
    let escaped = raw.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

impl ProcessRunner for CommandRunner {
    fn run(&self, tools: &JavaTools, invocation: &Invocation) -> Result<ExitReport, ExecError> {
        let program = tools.program(invocation.tool);
        let mut cmd = Command::new(program);
        cmd.args(invocation.leading_args());

        // Held until the process exits.
        let _argfile = if invocation.tool == Tool::Javac
            && invocation.sources.len() > ARGFILE_THRESHOLD
        {
            let file = self.write_argfile(&invocation.sources)?;
            let mut arg = std::ffi::OsString::from("@");
            arg.push(file.path());
            cmd.arg(arg);
            Some(file)
        } else {
            cmd.args(&invocation.sources);
            None
        };
        if let Some(dir) = &invocation.working_dir {
            cmd.current_dir(dir);
        }

        tracing::debug!(command = %invocation.display(tools), "spawning");
        let output = cmd.output().map_err(|e| ExecError::Launch {
            program: program.to_path_buf(),
            source: e,
        })?;

        let report = ExitReport {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        if !report.success() {
            tracing::debug!(status = %output.status, tool = %invocation.tool, "process failed");
        }
        Ok(report)
    }
}

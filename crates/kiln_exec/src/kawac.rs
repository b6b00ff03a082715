//! The `kawac` task kind: compiling target-language sources to classes.
//!
//! The task drives the bootstrapped compiler through the `java` launcher:
//!
//! ```text
//! java -cp <task classpath>:<extra> kawa.repl -d <dest> [-P <prefix>]
//!      [--module-static-<mode>] --<language> <flags> -C <sources>
//! ```

use std::path::PathBuf;

use crate::context::TaskDef;
use crate::invocation::Invocation;

/// Entry point of the target-language compiler.
pub const COMPILER_MAIN: &str = "kawa.repl";

/// One `kawac` batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KawacRequest {
    /// Source language, e.g. `scheme`.
    pub language: String,
    /// Output directory for classes.
    pub destination: PathBuf,
    /// Package prefix for compiled modules, e.g. `kawa.lib.`.
    pub prefix: Option<String>,
    /// Module-static mode, e.g. `run`.
    pub module_static: Option<String>,
    /// Extra flags, such as warning escalation.
    pub flags: Vec<String>,
    /// Classpath entries after the task's own.
    pub classpath: Vec<PathBuf>,
    /// Sources, in compile order.
    pub sources: Vec<PathBuf>,
    /// Directory the sources are relative to.
    pub working_dir: Option<PathBuf>,
}

impl KawacRequest {
    /// An empty batch for `language` writing into `destination`.
    pub fn new(language: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            language: language.into(),
            destination: destination.into(),
            prefix: None,
            module_static: None,
            flags: Vec::new(),
            classpath: Vec::new(),
            sources: Vec::new(),
            working_dir: None,
        }
    }

    /// Builds the process call for the registered `kawac` task.
    pub fn to_invocation(&self, task: &TaskDef) -> Invocation {
        let mut inv = Invocation::java(COMPILER_MAIN)
            .classpath(task.classpath.iter().cloned())
            .classpath(self.classpath.iter().cloned())
            .destination(&self.destination);
        if let Some(prefix) = &self.prefix {
            inv = inv.flag("-P").flag(prefix);
        }
        if let Some(mode) = &self.module_static {
            inv = inv.flag(format!("--module-static-{mode}"));
        }
        inv = inv
            .flag(format!("--{}", self.language))
            .flags(self.flags.iter().cloned())
            .flag("-C")
            .sources(self.sources.iter().cloned());
        if let Some(dir) = &self.working_dir {
            inv = inv.working_dir(dir);
        }
        inv
    }
}

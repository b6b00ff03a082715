//! The explicit per-run build context.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use kiln_common::{Version, Workspace};

use crate::error::ExecError;
use crate::invocation::{Invocation, JavaTools};
use crate::runner::{ExitReport, ProcessRunner};

/// Named invocation targets installed by the bootstrap stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TaskKind {
    /// Compile target-language sources to classes.
    Kawac,
    /// Structured copy with filename mapping and token filtering.
    XCopy,
}

impl TaskKind {
    /// Registered name.
    pub const fn name(self) -> &'static str {
        match self {
            TaskKind::Kawac => "kawac",
            TaskKind::XCopy => "xcopy",
        }
    }

    /// Adapter class compiled by the bootstrap stage.
    pub const fn adapter_class(self) -> &'static str {
        match self {
            TaskKind::Kawac => "gnu.kawa.ant.Kawac",
            TaskKind::XCopy => "gnu.kawa.ant.XCopy",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A registered task kind and the classpath it runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDef {
    /// Which task.
    pub kind: TaskKind,
    /// Classpath for the task's process, in order.
    pub classpath: Vec<PathBuf>,
}

/// Task kinds available to later stages, by name.
#[derive(Debug, Default, Clone)]
pub struct TaskRegistry {
    tasks: BTreeMap<&'static str, TaskDef>,
}

impl TaskRegistry {
    /// Registers `def`, replacing an earlier registration of the same kind.
    pub fn register(&mut self, def: TaskDef) {
        tracing::debug!(task = def.kind.name(), "registered task kind");
        self.tasks.insert(def.kind.name(), def);
    }

    /// Looks a task up by name.
    pub fn get(&self, name: &str) -> Option<&TaskDef> {
        self.tasks.get(name)
    }

    /// Looks a task up, failing if it was never registered.
    pub fn require(&self, kind: TaskKind) -> Result<&TaskDef, ExecError> {
        self.get(kind.name()).ok_or_else(|| ExecError::TaskNotRegistered {
            name: kind.name().to_string(),
        })
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.tasks.keys().copied()
    }
}

/// Everything a stage needs besides its own inputs.
///
/// Owned by the orchestrator for the duration of one run and passed by
/// reference into every stage.
pub struct BuildContext {
    workspace: Workspace,
    tools: JavaTools,
    bootstrap_classpath: Vec<PathBuf>,
    runner: Box<dyn ProcessRunner>,
    tasks: TaskRegistry,
}

impl fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildContext")
            .field("workspace", &self.workspace)
            .field("tools", &self.tools)
            .field("bootstrap_classpath", &self.bootstrap_classpath)
            .field("tasks", &self.tasks)
            .finish_non_exhaustive()
    }
}

impl BuildContext {
    /// Creates a context with no registered tasks.
    pub fn new(workspace: Workspace, tools: JavaTools, runner: Box<dyn ProcessRunner>) -> Self {
        Self {
            workspace,
            tools,
            bootstrap_classpath: Vec::new(),
            runner,
            tasks: TaskRegistry::default(),
        }
    }

    /// Sets the classpath used to compile the helper tools.
    pub fn with_bootstrap_classpath(mut self, classpath: Vec<PathBuf>) -> Self {
        self.bootstrap_classpath = classpath;
        self
    }

    /// The workspace being built.
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// The pinned version.
    pub fn version(&self) -> &Version {
        self.workspace.version()
    }

    /// JDK launcher locations.
    pub fn tools(&self) -> &JavaTools {
        &self.tools
    }

    /// Classpath for compiling the helper tools.
    pub fn bootstrap_classpath(&self) -> &[PathBuf] {
        &self.bootstrap_classpath
    }

    /// Registered task kinds.
    pub fn tasks(&self) -> &TaskRegistry {
        &self.tasks
    }

    /// Registers a task kind.
    pub fn register_task(&mut self, def: TaskDef) {
        self.tasks.register(def);
    }

    /// Looks up a registered task kind.
    pub fn task(&self, kind: TaskKind) -> Result<&TaskDef, ExecError> {
        self.tasks.require(kind)
    }

    /// Runs `invocation` through the context's runner.
    pub fn run(&self, invocation: &Invocation) -> Result<ExitReport, ExecError> {
        self.runner.run(&self.tools, invocation)
    }
}

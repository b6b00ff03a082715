//! External compiler invocation and the per-run build context.
//!
//! Every stage that does real compilation work describes it as an
//! [`Invocation`] and hands it to the [`ProcessRunner`] held by the
//! [`BuildContext`]. The production runner is [`CommandRunner`], which spawns
//! the JDK's `javac`/`java`; tests substitute a fake.
//!
//! The context also carries the task kinds registered by the bootstrap stage
//! (`kawac`, `xcopy`), which later stages look up by name.

#![warn(missing_docs)]

pub mod context;
pub mod error;
pub mod invocation;
pub mod kawac;
pub mod runner;

pub use context::{BuildContext, TaskDef, TaskKind, TaskRegistry};
pub use error::ExecError;
pub use invocation::{Invocation, JavaTools, Tool};
pub use kawac::KawacRequest;
pub use runner::{CommandRunner, ExitReport, ProcessRunner};

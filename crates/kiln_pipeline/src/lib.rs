//! Sequencing of the build stages for one toolchain version.
//!
//! A [`Pipeline`] walks the fixed stage order, evaluating each stage's
//! freshness check and executing only the stale ones:
//!
//! ```text
//! Fresh → Fetched → Extracted → ToolsBuilt → Preprocessed → Generated
//!       → CoreCompiled → LibCompiled → SlibCompiled → Packaged
//! ```
//!
//! The first failing stage aborts the run. Outputs of the stages before it
//! stay in place and are found fresh by the next run.

#![warn(missing_docs)]

pub mod error;
pub mod orchestrator;
pub mod stage;
pub mod user;

pub use error::PipelineError;
pub use orchestrator::Pipeline;
pub use stage::{
    PipelineState, RunReport, StageDescriptor, StageId, StageOutcome, StageResult,
};
pub use user::compile_user_sources;

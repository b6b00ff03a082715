//! Stage identities, pipeline states and run reports.

use std::fmt;
use std::path::PathBuf;

/// One stage of the pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StageId {
    /// Download the source archive.
    Fetch,
    /// Unpack the archive into the workspace.
    Extract,
    /// Compile the helper tools.
    Bootstrap,
    /// Render the version templates.
    Preprocess,
    /// Generate the vector sources.
    Generate,
    /// Compile the core classes.
    CompileCore,
    /// Compile library layers 1 to 3.
    CompileLib,
    /// Compile the SLIB modules.
    CompileSlib,
    /// Write the jars.
    Package,
}

impl StageId {
    /// Every stage, in order.
    pub const ALL: [StageId; 9] = [
        StageId::Fetch,
        StageId::Extract,
        StageId::Bootstrap,
        StageId::Preprocess,
        StageId::Generate,
        StageId::CompileCore,
        StageId::CompileLib,
        StageId::CompileSlib,
        StageId::Package,
    ];

    /// Short name used in logs and status output.
    pub fn name(self) -> &'static str {
        match self {
            StageId::Fetch => "fetch",
            StageId::Extract => "extract",
            StageId::Bootstrap => "bootstrap",
            StageId::Preprocess => "preprocess",
            StageId::Generate => "generate",
            StageId::CompileCore => "compile-core",
            StageId::CompileLib => "compile-lib",
            StageId::CompileSlib => "compile-slib",
            StageId::Package => "package",
        }
    }

    /// The state the pipeline is in once this stage is done.
    pub fn completes(self) -> PipelineState {
        match self {
            StageId::Fetch => PipelineState::Fetched,
            StageId::Extract => PipelineState::Extracted,
            StageId::Bootstrap => PipelineState::ToolsBuilt,
            StageId::Preprocess => PipelineState::Preprocessed,
            StageId::Generate => PipelineState::Generated,
            StageId::CompileCore => PipelineState::CoreCompiled,
            StageId::CompileLib => PipelineState::LibCompiled,
            StageId::CompileSlib => PipelineState::SlibCompiled,
            StageId::Package => PipelineState::Packaged,
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A stage's declared inputs and outputs, resolved against one workspace.
///
/// Lists are empty where the files they name do not exist yet, e.g. the
/// inputs of every compile stage before extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageDescriptor {
    /// The stage described.
    pub stage: StageId,
    /// Files the freshness check compares against.
    pub inputs: Vec<PathBuf>,
    /// Files or directories the stage writes.
    pub outputs: Vec<PathBuf>,
}

/// Progress through the linear state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PipelineState {
    /// Nothing done yet.
    Fresh,
    /// Archive present locally.
    Fetched,
    /// Sources unpacked.
    Extracted,
    /// Helper tools compiled.
    ToolsBuilt,
    /// Version sources rendered.
    Preprocessed,
    /// Vector sources generated.
    Generated,
    /// Core classes compiled.
    CoreCompiled,
    /// Library layers compiled.
    LibCompiled,
    /// SLIB modules compiled.
    SlibCompiled,
    /// Jars written.
    Packaged,
}

/// Whether a stage did work in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// The stage was stale and ran.
    Executed,
    /// The stage's outputs were fresh.
    Skipped,
}

/// Outcome of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageResult {
    /// The stage.
    pub stage: StageId,
    /// What happened to it.
    pub outcome: StageOutcome,
}

/// What [`Pipeline::run`](crate::Pipeline::run) did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Per-stage outcomes, in order.
    pub stages: Vec<StageResult>,
    /// State reached at the end of the run.
    pub state: PipelineState,
    /// Whether the extracted tree was discarded first.
    pub rebuilt: bool,
}

impl RunReport {
    /// Stages that ran.
    pub fn executed(&self) -> impl Iterator<Item = StageId> + '_ {
        self.stages
            .iter()
            .filter(|r| r.outcome == StageOutcome::Executed)
            .map(|r| r.stage)
    }

    /// Whether every stage was skipped.
    pub fn is_noop(&self) -> bool {
        self.executed().next().is_none()
    }
}

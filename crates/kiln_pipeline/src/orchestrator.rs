//! The stage sequencer.

use std::path::{Path, PathBuf};

use kiln_cache::dir_is_populated;
use kiln_config::Settings;
use kiln_exec::{BuildContext, CommandRunner, JavaTools, ProcessRunner};
use kiln_fetch::{extract, fetch, transport_for, ArchiveHandle, Transport};
use kiln_stages::layers::{self, LayerDef, CORE, LIB_LAYERS, SLIB};
use kiln_stages::{bootstrap, codegen, packager, preprocess};

use crate::error::PipelineError;
use crate::stage::{
    PipelineState, RunReport, StageDescriptor, StageId, StageOutcome, StageResult,
};

/// Builds one toolchain version.
///
/// Owns the [`BuildContext`] for its workspace. The default context runs the
/// real JDK and picks the archive transport from the URL scheme; both can be
/// replaced for tests and mirrors.
pub struct Pipeline {
    settings: Settings,
    ctx: BuildContext,
    transport: Option<Box<dyn Transport>>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("settings", &self.settings)
            .field("ctx", &self.ctx)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// A pipeline for `settings` using the host JDK.
    pub fn new(settings: Settings) -> Self {
        let runner = CommandRunner::new().with_argfile_dir(settings.workspace().state_dir());
        let ctx = context_for(&settings, Box::new(runner));
        Self {
            settings,
            ctx,
            transport: None,
        }
    }

    /// Replaces the process runner.
    pub fn with_runner(mut self, runner: Box<dyn ProcessRunner>) -> Self {
        self.ctx = context_for(&self.settings, runner);
        self
    }

    /// Fetches through `transport` regardless of the URL scheme.
    pub fn with_transport(mut self, transport: Box<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// The settings this pipeline was created with.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The build context shared by the stages.
    pub fn context(&self) -> &BuildContext {
        &self.ctx
    }

    /// Installs the `kawac` and `xcopy` task kinds.
    pub fn register_tasks(&mut self) {
        bootstrap::register_tasks(&mut self.ctx);
    }

    /// Whether `stage`'s outputs are fresh.
    pub fn is_fresh(&self, stage: StageId) -> bool {
        let ctx = &self.ctx;
        let ws = ctx.workspace();
        match stage {
            StageId::Fetch => ws.archive_path().is_file(),
            StageId::Extract => dir_is_populated(&ws.source_dir()),
            StageId::Bootstrap => bootstrap::is_fresh(ctx),
            StageId::Preprocess => preprocess::is_fresh(ctx),
            StageId::Generate => codegen::is_fresh(ctx),
            StageId::CompileCore => layers::is_fresh(ctx, &CORE),
            StageId::CompileLib => LIB_LAYERS.iter().all(|layer| layers::is_fresh(ctx, layer)),
            StageId::CompileSlib => layers::is_fresh(ctx, &SLIB),
            StageId::Package => packager::is_fresh(ctx),
        }
    }

    /// The declared inputs and outputs of `stage` as the tree is now.
    pub fn describe(&self, stage: StageId) -> StageDescriptor {
        let ws = self.ctx.workspace();
        let source_dir = ws.source_dir();
        let (inputs, outputs) = match stage {
            StageId::Fetch => (Vec::new(), vec![ws.archive_path()]),
            StageId::Extract => (vec![ws.archive_path()], vec![source_dir]),
            StageId::Bootstrap => {
                let sources = bootstrap::sources(&source_dir);
                let classes = sources
                    .iter()
                    .map(|src| bootstrap::class_file(&source_dir, &ws.tools_dir(), src))
                    .collect();
                (sources, classes)
            }
            StageId::Preprocess => {
                let pairs = preprocess::copy_spec(&source_dir, ws.version())
                    .pairs()
                    .unwrap_or_default();
                pairs.into_iter().unzip()
            }
            StageId::Generate => (
                vec![
                    source_dir.join(codegen::TEMPLATE),
                    bootstrap::generator_class(&ws.tools_dir()),
                ],
                codegen::outputs(&source_dir),
            ),
            StageId::CompileCore => (layer_inputs(&source_dir, &[&CORE]), vec![ws.classes_dir()]),
            StageId::CompileLib => (layer_inputs(&source_dir, &LIB_LAYERS), vec![ws.classes_dir()]),
            StageId::CompileSlib => (layer_inputs(&source_dir, &[&SLIB]), vec![ws.classes_dir()]),
            StageId::Package => {
                let inputs = [packager::main_jar(ws), packager::tools_jar(ws)]
                    .iter()
                    .flat_map(|jar| jar.inputs().unwrap_or_default())
                    .collect();
                (inputs, vec![ws.main_jar(), ws.tools_jar()])
            }
        };
        StageDescriptor {
            stage,
            inputs,
            outputs,
        }
    }

    /// Evaluates every freshness check without executing anything.
    pub fn status(&self) -> Vec<(StageId, bool)> {
        StageId::ALL
            .iter()
            .map(|&stage| (stage, self.is_fresh(stage)))
            .collect()
    }

    /// Runs every stale stage in order.
    pub fn run(&mut self) -> Result<RunReport, PipelineError> {
        self.run_with(|_| {})
    }

    /// Like [`run`](Self::run), reporting each stage as it finishes.
    pub fn run_with(
        &mut self,
        mut on_stage: impl FnMut(StageResult),
    ) -> Result<RunReport, PipelineError> {
        let rebuilt = self.discard_for_rebuild()?;
        let mut stages = Vec::with_capacity(StageId::ALL.len());
        let mut state = PipelineState::Fresh;

        for stage in StageId::ALL {
            let outcome = if self.is_fresh(stage) {
                tracing::debug!(stage = stage.name(), "up to date, skipping");
                StageOutcome::Skipped
            } else {
                tracing::info!(stage = stage.name(), "running");
                self.execute(stage)?;
                StageOutcome::Executed
            };
            if stage == StageId::Bootstrap {
                self.register_tasks();
            }
            let result = StageResult { stage, outcome };
            on_stage(result);
            stages.push(result);
            state = stage.completes();
        }

        Ok(RunReport {
            stages,
            state,
            rebuilt,
        })
    }

    fn execute(&self, stage: StageId) -> Result<(), PipelineError> {
        let ctx = &self.ctx;
        let ws = ctx.workspace();
        match stage {
            StageId::Fetch => {
                let handle = ArchiveHandle::for_workspace(&self.settings.fetch_base_url, ws);
                match &self.transport {
                    Some(transport) => fetch(&handle, transport.as_ref())?,
                    None => fetch(&handle, transport_for(&handle.url)?.as_ref())?,
                };
            }
            StageId::Extract => {
                extract(&ws.archive_path(), &ws.source_dir())?;
            }
            StageId::Bootstrap => {
                bootstrap::bootstrap(ctx)?;
            }
            StageId::Preprocess => {
                preprocess::preprocess(ctx)?;
            }
            StageId::Generate => {
                codegen::generate_vector_sources(ctx)?;
            }
            StageId::CompileCore => {
                layers::compile_layer(ctx, &CORE)?;
            }
            StageId::CompileLib => {
                for layer in LIB_LAYERS {
                    if !layers::is_fresh(ctx, layer) {
                        layers::compile_layer(ctx, layer)?;
                    }
                }
            }
            StageId::CompileSlib => {
                layers::compile_layer(ctx, &SLIB)?;
            }
            StageId::Package => {
                packager::package(ctx)?;
            }
        }
        Ok(())
    }

    /// Deletes the extracted tree when a rebuild was requested and there is
    /// something to delete. The archive is kept.
    fn discard_for_rebuild(&self) -> Result<bool, PipelineError> {
        let source_dir = self.ctx.workspace().source_dir();
        if !self.settings.rebuild || !dir_is_populated(&source_dir) {
            return Ok(false);
        }
        std::fs::remove_dir_all(&source_dir).map_err(|e| PipelineError::Clean {
            path: source_dir.clone(),
            source: e,
        })?;
        tracing::info!(dir = %source_dir.display(), "discarded workspace for rebuild");
        Ok(true)
    }
}

/// Absolute inputs of `layers`, skipping layers whose sources are missing.
fn layer_inputs(source_dir: &Path, layers: &[&LayerDef]) -> Vec<PathBuf> {
    layers
        .iter()
        .filter_map(|layer| layer.inputs(source_dir).ok())
        .flatten()
        .map(|rel| source_dir.join(rel))
        .collect()
}

fn context_for(settings: &Settings, runner: Box<dyn ProcessRunner>) -> BuildContext {
    BuildContext::new(
        settings.workspace(),
        JavaTools::from_home(settings.java_home.as_deref()),
        runner,
    )
    .with_bootstrap_classpath(settings.bootstrap_classpath.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_common::Version;
    use kiln_exec::{ExecError, ExitReport, Invocation};
    use kiln_fetch::FetchError;
    use std::fs;
    use kiln_stages::LayerKind;
    use std::io::Read;

    struct Unreachable;

    impl Transport for Unreachable {
        fn open(&self, url: &str) -> Result<Box<dyn Read>, FetchError> {
            Err(FetchError::Transport {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            })
        }
    }

    struct NoProcesses;

    impl ProcessRunner for NoProcesses {
        fn run(&self, _tools: &JavaTools, inv: &Invocation) -> Result<ExitReport, ExecError> {
            panic!("unexpected process: {:?}", inv.tool)
        }
    }

    fn settings(cache: &Path, rebuild: bool) -> Settings {
        Settings {
            version: Version::new("1.0.0").unwrap(),
            cache_dir: cache.to_path_buf(),
            fetch_base_url: "https://mirror.invalid/kawa".to_string(),
            java_home: None,
            bootstrap_classpath: vec![PathBuf::from("/opt/ant/lib/ant.jar")],
            rebuild,
        }
    }

    fn pipeline(cache: &Path, rebuild: bool) -> Pipeline {
        Pipeline::new(settings(cache, rebuild))
            .with_runner(Box::new(NoProcesses))
            .with_transport(Box::new(Unreachable))
    }

    #[test]
    fn empty_cache_is_all_stale() {
        let cache = tempfile::tempdir().unwrap();
        let status = pipeline(cache.path(), false).status();
        assert_eq!(status.len(), StageId::ALL.len());
        assert!(status.iter().all(|(_, fresh)| !fresh));
    }

    #[test]
    fn fetch_failure_aborts_before_later_stages() {
        let cache = tempfile::tempdir().unwrap();
        let mut p = pipeline(cache.path(), false);
        let mut seen = Vec::new();
        let err = p.run_with(|r| seen.push(r.stage)).unwrap_err();
        assert!(matches!(err, PipelineError::Fetch(FetchError::Transport { .. })));
        assert!(seen.is_empty());
        assert!(!p.context().workspace().archive_path().exists());
    }

    #[test]
    fn context_carries_settings() {
        let cache = tempfile::tempdir().unwrap();
        let p = pipeline(cache.path(), false);
        assert_eq!(
            p.context().bootstrap_classpath(),
            &[PathBuf::from("/opt/ant/lib/ant.jar")]
        );
        assert_eq!(p.context().version().as_str(), "1.0.0");
    }

    #[test]
    fn rebuild_discards_extracted_tree_only() {
        let cache = tempfile::tempdir().unwrap();
        let p = pipeline(cache.path(), true);
        let ws = p.context().workspace().clone();
        fs::create_dir_all(ws.classes_dir()).unwrap();
        fs::write(ws.source_dir().join("build.xml"), "<project/>").unwrap();
        fs::write(ws.archive_path(), b"archive").unwrap();

        assert!(p.discard_for_rebuild().unwrap());
        assert!(!ws.source_dir().exists());
        assert!(ws.archive_path().is_file());
        assert!(!p.discard_for_rebuild().unwrap());
    }

    #[test]
    fn no_rebuild_keeps_tree() {
        let cache = tempfile::tempdir().unwrap();
        let p = pipeline(cache.path(), false);
        let ws = p.context().workspace().clone();
        fs::create_dir_all(ws.classes_dir()).unwrap();
        assert!(!p.discard_for_rebuild().unwrap());
        assert!(ws.classes_dir().is_dir());
    }

    #[test]
    fn descriptors_before_extraction() {
        let cache = tempfile::tempdir().unwrap();
        let p = pipeline(cache.path(), false);
        let ws = p.context().workspace().clone();

        let fetch = p.describe(StageId::Fetch);
        assert!(fetch.inputs.is_empty());
        assert_eq!(fetch.outputs, vec![ws.archive_path()]);

        let generate = p.describe(StageId::Generate);
        assert_eq!(generate.inputs.len(), 2);
        assert_eq!(generate.outputs.len(), 16);

        let core = p.describe(StageId::CompileCore);
        assert!(core.inputs.is_empty());
        assert_eq!(core.outputs, vec![ws.classes_dir()]);

        let package = p.describe(StageId::Package);
        assert_eq!(package.outputs, vec![ws.main_jar(), ws.tools_jar()]);
    }

    #[test]
    fn slib_descriptor_lists_its_sources() {
        let cache = tempfile::tempdir().unwrap();
        let p = pipeline(cache.path(), false);
        let src = p.context().workspace().source_dir();
        let LayerKind::Kawa { base_dir, files, .. } = SLIB.kind else {
            panic!("slib is a kawa layer");
        };
        for file in files {
            let path = src.join(base_dir).join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, ";;").unwrap();
        }
        let slib = p.describe(StageId::CompileSlib);
        assert_eq!(slib.inputs.len(), files.len());
        assert_eq!(slib.inputs[0], src.join("gnu/kawa/slib/readtable.scm"));
    }

    #[test]
    fn register_tasks_installs_both_kinds() {
        let cache = tempfile::tempdir().unwrap();
        let mut p = pipeline(cache.path(), false);
        assert!(p.context().tasks().names().next().is_none());
        p.register_tasks();
        let mut names: Vec<_> = p.context().tasks().names().collect();
        names.sort_unstable();
        assert_eq!(names, vec!["kawac", "xcopy"]);
    }
}

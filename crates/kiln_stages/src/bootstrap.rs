//! Compiles the helper toolchain into `tools/` and registers task kinds.
//!
//! The helper set is the vector-source generator plus the build-task
//! adapters. Nothing else from the source tree is compiled here except what
//! `javac` pulls in through the source path.

use std::path::{Path, PathBuf};

use kiln_cache::UpToDate;
use kiln_exec::{BuildContext, Invocation, TaskDef, TaskKind};

use crate::error::BootstrapError;

/// The generator's source, relative to the source root.
pub const GENERATOR_SOURCE: &str = "gnu/kawa/util/PreProcess.java";

/// The generator's main class.
pub const GENERATOR_CLASS: &str = "gnu.kawa.util.PreProcess";

/// Glob of the build-task adapter sources, relative to the source root.
pub const ADAPTER_SOURCES: &str = "gnu/kawa/ant/*.java";

/// Optimize on, debug on; deprecation warnings stay off.
pub const JAVAC_FLAGS: [&str; 2] = ["-O", "-g"];

/// The helper sources present under `source_dir`, sorted.
pub fn sources(source_dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let generator = source_dir.join(GENERATOR_SOURCE);
    if generator.is_file() {
        found.push(generator);
    }
    let pattern = format!(
        "{}/{ADAPTER_SOURCES}",
        glob::Pattern::escape(&source_dir.to_string_lossy())
    );
    if let Ok(paths) = glob::glob(&pattern) {
        found.extend(paths.filter_map(Result::ok));
    }
    found.sort();
    found
}

/// Where `javac` writes the class for `source`.
pub fn class_file(source_dir: &Path, tools_dir: &Path, source: &Path) -> PathBuf {
    let rel = source.strip_prefix(source_dir).unwrap_or(source);
    tools_dir.join(rel).with_extension("class")
}

/// The compiled generator, which the code generator's freshness depends on.
pub fn generator_class(tools_dir: &Path) -> PathBuf {
    tools_dir.join(GENERATOR_SOURCE).with_extension("class")
}

/// Every helper source has a class at least as new as itself.
pub fn is_fresh(ctx: &BuildContext) -> bool {
    let ws = ctx.workspace();
    let (source_dir, tools_dir) = (ws.source_dir(), ws.tools_dir());
    let sources = sources(&source_dir);
    if sources.is_empty() {
        return false;
    }
    sources
        .iter()
        .fold(UpToDate::new(), |check, src| {
            check.mapped(src, class_file(&source_dir, &tools_dir, src))
        })
        .check()
}

/// Compiles the helper sources into `tools/`.
pub fn bootstrap(ctx: &BuildContext) -> Result<PathBuf, BootstrapError> {
    let ws = ctx.workspace();
    let (source_dir, tools_dir) = (ws.source_dir(), ws.tools_dir());
    let sources = sources(&source_dir);
    if sources.is_empty() {
        return Err(BootstrapError::MissingSources { dir: source_dir });
    }

    let invocation = Invocation::javac(&tools_dir)
        .source_path(&source_dir)
        .classpath(ctx.bootstrap_classpath().iter().cloned())
        .flags(JAVAC_FLAGS)
        .sources(sources.iter().cloned());
    std::fs::create_dir_all(&tools_dir).map_err(|e| BootstrapError::Io {
        path: tools_dir.clone(),
        source: e,
    })?;

    let report = ctx.run(&invocation)?;
    if !report.success() {
        return Err(BootstrapError::Failed {
            code: report.code,
            diagnostics: report.diagnostics().to_string(),
        });
    }
    tracing::info!(sources = sources.len(), dir = %tools_dir.display(), "bootstrapped helper tools");
    Ok(tools_dir)
}

/// Installs the `kawac` and `xcopy` task kinds.
///
/// Not a stage action: called on every run, whether or not [`bootstrap`]
/// was skipped.
pub fn register_tasks(ctx: &mut BuildContext) {
    let tools = ctx.workspace().tools_dir();
    let classes = ctx.workspace().classes_dir();
    ctx.register_task(TaskDef {
        kind: TaskKind::Kawac,
        classpath: vec![tools.clone(), classes],
    });
    ctx.register_task(TaskDef {
        kind: TaskKind::XCopy,
        classpath: vec![tools],
    });
}

//! Rewrites `kawa/*Version.java.in` into compilable sources.

use std::path::{Path, PathBuf};

use kiln_cache::UpToDate;
use kiln_common::Version;
use kiln_exec::{BuildContext, TaskKind};

use crate::error::PreprocessError;
use crate::filter::{FilterSet, GlobMapper};
use crate::xcopy::{CopyReport, CopySpec};

/// Directory, relative to the source root, holding the templates.
pub const TEMPLATE_DIR: &str = "kawa";

/// Banner substituted for the editor mode line of generated files.
pub const GENERATED_BANNER: &str =
    "Automatically generated file - DO NOT EDIT!.  -*- buffer-read-only: t -*-";

/// The copy this stage performs for `version` under `source_dir`.
pub fn copy_spec(source_dir: &Path, version: &Version) -> CopySpec {
    let dir = source_dir.join(TEMPLATE_DIR);
    CopySpec {
        from_dir: dir.clone(),
        to_dir: dir,
        include: "*.java.in".to_string(),
        mapper: GlobMapper::new("*Version.java.in", "*Version.java"),
        filters: vec![
            FilterSet::new("-*-", "-*-").token("Java", GENERATED_BANNER),
            FilterSet::new("\"", "\"").token("VERSION", format!("\"{version}\"")),
        ],
    }
}

/// Files this stage writes.
pub fn outputs(source_dir: &Path, version: &Version) -> Vec<PathBuf> {
    copy_spec(source_dir, version)
        .pairs()
        .map(|pairs| pairs.into_iter().map(|(_, target)| target).collect())
        .unwrap_or_default()
}

/// Every template has an output at least as new as itself.
///
/// A missing template directory is never fresh, so the stage runs and
/// reports it.
pub fn is_fresh(ctx: &BuildContext) -> bool {
    let source_dir = ctx.workspace().source_dir();
    let spec = copy_spec(&source_dir, ctx.version());
    if !spec.from_dir.is_dir() {
        return false;
    }
    let Ok(pairs) = spec.pairs() else {
        return false;
    };
    pairs
        .into_iter()
        .fold(UpToDate::new(), |check, (src, dst)| check.mapped(src, dst))
        .check()
}

/// Runs the structured copy through the registered `xcopy` task.
pub fn preprocess(ctx: &BuildContext) -> Result<CopyReport, PreprocessError> {
    ctx.task(TaskKind::XCopy)
        .map_err(|_| PreprocessError::TaskNotRegistered {
            name: TaskKind::XCopy.name().to_string(),
        })?;
    let source_dir = ctx.workspace().source_dir();
    let report = copy_spec(&source_dir, ctx.version()).run()?;
    tracing::info!(
        written = report.written.len(),
        refreshed = report.refreshed.len(),
        unchanged = report.unchanged.len(),
        "preprocessed version templates"
    );
    Ok(report)
}

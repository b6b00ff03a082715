//! Compiling user sources with the built toolchain.

use std::path::{Path, PathBuf};

use kiln_config::CompileSettings;
use kiln_exec::KawacRequest;
use kiln_stages::layers::compile_batch;
use kiln_stages::CompileError;
use walkdir::WalkDir;

use crate::error::PipelineError;
use crate::orchestrator::Pipeline;

/// Label used for user compilations in errors and logs.
pub const USER_BATCH: &str = "user";

/// Always passed to user compilations.
const WARN_AS_ERROR: &str = "--warn-as-error";

/// Compiles every source under `request.src_dir` into `request.dest_dir`.
///
/// Builds the toolchain first if the main jar is missing. The classpath is
/// every jar in the dist directory. Returns the number of source files
/// compiled.
pub fn compile_user_sources(
    pipeline: &mut Pipeline,
    request: &CompileSettings,
) -> Result<usize, PipelineError> {
    if !pipeline.context().workspace().main_jar().is_file() {
        pipeline.run()?;
    } else {
        pipeline.register_tasks();
    }

    let sources = user_sources(&request.src_dir, &request.language);
    if sources.is_empty() {
        return Err(CompileError::MissingSource {
            layer: USER_BATCH.to_string(),
            path: request.src_dir.clone(),
        }
        .into());
    }

    let mut batch = KawacRequest::new(&request.language, &request.dest_dir);
    batch.classpath = dist_jars(&pipeline.context().workspace().dist_dir());
    batch.flags = request.args.clone();
    if !batch.flags.iter().any(|f| f == WARN_AS_ERROR) {
        batch.flags.push(WARN_AS_ERROR.to_string());
    }
    batch.sources = sources.clone();
    batch.working_dir = Some(request.src_dir.clone());

    compile_batch(pipeline.context(), USER_BATCH, &batch)?;
    tracing::info!(
        files = sources.len(),
        dest = %request.dest_dir.display(),
        "compiled user sources"
    );
    Ok(sources.len())
}

/// File extensions compiled for `language`. Unknown languages compile every
/// file.
fn extensions(language: &str) -> &'static [&'static str] {
    match language {
        "scheme" | "r7rs" => &["scm", "sld", "ss"],
        "elisp" | "emacs" => &["el"],
        "commonlisp" | "clisp" | "lisp" => &["lisp", "lsp", "cl"],
        "xquery" | "qexo" => &["xql", "xq", "xquery"],
        "krl" | "brl" => &["krl", "brl"],
        _ => &[],
    }
}

/// Sources under `src_dir` as paths relative to it, sorted.
fn user_sources(src_dir: &Path, language: &str) -> Vec<PathBuf> {
    let wanted = extensions(language);
    let mut found: Vec<PathBuf> = WalkDir::new(src_dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            wanted.is_empty()
                || e.path()
                    .extension()
                    .is_some_and(|ext| wanted.iter().any(|w| ext == *w))
        })
        .filter_map(|e| e.path().strip_prefix(src_dir).ok().map(Path::to_path_buf))
        .collect();
    found.sort();
    found
}

/// Every `*.jar` directly in `dist_dir`, sorted.
fn dist_jars(dist_dir: &Path) -> Vec<PathBuf> {
    let mut jars: Vec<PathBuf> = std::fs::read_dir(dist_dir)
        .into_iter()
        .flatten()
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == "jar"))
        .collect();
    jars.sort();
    jars
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn scheme_sources_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("app/main.scm"));
        touch(&dir.path().join("app/util.sld"));
        touch(&dir.path().join("README.md"));
        assert_eq!(
            user_sources(dir.path(), "scheme"),
            vec![PathBuf::from("app/main.scm"), PathBuf::from("app/util.sld")]
        );
    }

    #[test]
    fn unknown_language_takes_every_file() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.foo"));
        touch(&dir.path().join("b.bar"));
        assert_eq!(user_sources(dir.path(), "nolang").len(), 2);
    }

    #[test]
    fn classpath_is_every_dist_jar() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("kawa-1.0.0.jar"));
        touch(&dir.path().join("kawa-ant-1.0.0.jar"));
        touch(&dir.path().join("notes.txt"));
        let jars = dist_jars(dir.path());
        assert_eq!(
            jars,
            vec![
                dir.path().join("kawa-1.0.0.jar"),
                dir.path().join("kawa-ant-1.0.0.jar")
            ]
        );
        assert!(dist_jars(&dir.path().join("missing")).is_empty());
    }
}

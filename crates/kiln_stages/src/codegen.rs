//! Generates the uniform-vector family from one template.
//!
//! The generator is run once per [`VectorKind`], reading
//! `gnu/lists/PrimVector.template` and writing `gnu/lists/<Name>Vector.java`.
//! Freshness is one flag for the whole family: either every target is at
//! least as new as both the template and the compiled generator, or every
//! target is regenerated.

use std::path::{Path, PathBuf};

use kiln_cache::UpToDate;
use kiln_exec::{BuildContext, Invocation};

use crate::bootstrap::{generator_class, GENERATOR_CLASS};
use crate::error::GenerationError;

/// Template shared by every vector, relative to the source root.
pub const TEMPLATE: &str = "gnu/lists/PrimVector.template";

/// Directory of the generated files, relative to the source root.
pub const OUTPUT_DIR: &str = "gnu/lists";

/// One generated vector class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorKind {
    /// Class name stem: `S8` gives `S8Vector`.
    pub name: &'static str,
    /// Preprocessor tag selecting the element type.
    pub tag: &'static str,
}

impl VectorKind {
    const fn new(name: &'static str, tag: &'static str) -> Self {
        Self { name, tag }
    }

    /// `gnu/lists/<Name>Vector.java`, relative to the source root.
    pub fn relative_path(&self) -> String {
        format!("{OUTPUT_DIR}/{}Vector.java", self.name)
    }
}

/// The generic object vector followed by the fifteen typed vectors.
pub const VECTOR_KINDS: [VectorKind; 16] = [
    VectorKind::new("F", "OBJECT"),
    VectorKind::new("Bit", "BIT"),
    VectorKind::new("Byte", "BYTE"),
    VectorKind::new("Short", "SHORT"),
    VectorKind::new("Int", "INT"),
    VectorKind::new("Long", "LONG"),
    VectorKind::new("F32", "F32"),
    VectorKind::new("F64", "F64"),
    VectorKind::new("S8", "S8"),
    VectorKind::new("S16", "S16"),
    VectorKind::new("S32", "S32"),
    VectorKind::new("S64", "S64"),
    VectorKind::new("U8", "U8"),
    VectorKind::new("U16", "U16"),
    VectorKind::new("U32", "U32"),
    VectorKind::new("U64", "U64"),
];

/// Every file this stage writes.
pub fn outputs(source_dir: &Path) -> Vec<PathBuf> {
    VECTOR_KINDS
        .iter()
        .map(|kind| source_dir.join(kind.relative_path()))
        .collect()
}

/// The coarse up-to-date flag for the whole family.
pub fn is_fresh(ctx: &BuildContext) -> bool {
    let ws = ctx.workspace();
    let source_dir = ws.source_dir();
    UpToDate::new()
        .source(source_dir.join(TEMPLATE))
        .source(generator_class(&ws.tools_dir()))
        .targets(outputs(&source_dir))
        .check()
}

/// The generator call for one vector kind. Paths are relative to the
/// source root, which is the working directory.
pub fn invocation(source_dir: &Path, tools_dir: &Path, kind: &VectorKind) -> Invocation {
    Invocation::java(GENERATOR_CLASS)
        .classpath([tools_dir])
        .flags([
            format!("%{}", kind.tag),
            "%UniformVector".to_string(),
            "-o".to_string(),
            kind.relative_path(),
        ])
        .sources([TEMPLATE])
        .working_dir(source_dir)
}

/// Regenerates every vector source.
///
/// Stops at the first failing tag; files generated earlier in the same run
/// are left in place.
pub fn generate_vector_sources(ctx: &BuildContext) -> Result<Vec<PathBuf>, GenerationError> {
    let ws = ctx.workspace();
    let (source_dir, tools_dir) = (ws.source_dir(), ws.tools_dir());
    let template = source_dir.join(TEMPLATE);
    if !template.is_file() {
        return Err(GenerationError::MissingTemplate { path: template });
    }

    let mut written = Vec::with_capacity(VECTOR_KINDS.len());
    for kind in &VECTOR_KINDS {
        let report = ctx.run(&invocation(&source_dir, &tools_dir, kind))?;
        if !report.success() {
            return Err(GenerationError::Failed {
                tag: kind.tag.to_string(),
                code: report.code,
                diagnostics: report.diagnostics().to_string(),
            });
        }
        tracing::debug!(tag = kind.tag, "generated {}Vector.java", kind.name);
        written.push(source_dir.join(kind.relative_path()));
    }
    tracing::info!(files = written.len(), "generated vector sources");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::{set_file_mtime, FileTime};
    use kiln_common::{Version, Workspace};
    use kiln_exec::{ExecError, ExitReport, JavaTools, ProcessRunner};
    use std::cell::Cell;
    use std::collections::HashSet;
    use std::fs;
    use std::rc::Rc;

    /// Writes the `-o` target, failing on `fail_tag`.
    struct Generator {
        fail_tag: Option<&'static str>,
        calls: Rc<Cell<usize>>,
    }

    impl ProcessRunner for Generator {
        fn run(&self, _tools: &JavaTools, inv: &Invocation) -> Result<ExitReport, ExecError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail_tag.is_some_and(|t| inv.flags[0] == format!("%{t}")) {
                return Ok(ExitReport::failed(1, "bad tag"));
            }
            let out_idx = inv.flags.iter().position(|f| f == "-o").unwrap() + 1;
            let out = inv.working_dir.as_ref().unwrap().join(&inv.flags[out_idx]);
            fs::write(out, format!("// {}\n", inv.flags[0])).unwrap();
            Ok(ExitReport::ok())
        }
    }

    fn setup(cache: &Path, fail_tag: Option<&'static str>) -> (BuildContext, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let ws = Workspace::new(cache, &Version::new("1.0.0").unwrap());
        let runner = Generator {
            fail_tag,
            calls: Rc::clone(&calls),
        };
        let ctx = BuildContext::new(ws, JavaTools::from_home(None), Box::new(runner));
        let src = ctx.workspace().source_dir();
        fs::create_dir_all(src.join(OUTPUT_DIR)).unwrap();
        fs::write(src.join(TEMPLATE), "#ifdef OBJECT\n#endif\n").unwrap();
        let gen = generator_class(&ctx.workspace().tools_dir());
        fs::create_dir_all(gen.parent().unwrap()).unwrap();
        fs::write(&gen, b"\xca\xfe").unwrap();
        for p in [src.join(TEMPLATE), gen] {
            set_file_mtime(&p, FileTime::from_unix_time(1_000, 0)).unwrap();
        }
        (ctx, calls)
    }

    #[test]
    fn table_is_unique_and_starts_with_object() {
        assert_eq!(VECTOR_KINDS[0].tag, "OBJECT");
        assert_eq!(VECTOR_KINDS[0].relative_path(), "gnu/lists/FVector.java");
        let names: HashSet<_> = VECTOR_KINDS.iter().map(|k| k.name).collect();
        assert_eq!(names.len(), VECTOR_KINDS.len());
        for kind in &VECTOR_KINDS[1..] {
            assert_eq!(kind.tag, kind.name.to_uppercase());
        }
    }

    #[test]
    fn invocation_arguments() {
        let inv = invocation(Path::new("/w"), Path::new("/w/tools"), &VECTOR_KINDS[8]);
        assert_eq!(inv.main_class.as_deref(), Some(GENERATOR_CLASS));
        assert_eq!(inv.flags, vec!["%S8", "%UniformVector", "-o", "gnu/lists/S8Vector.java"]);
        assert_eq!(inv.sources, vec![PathBuf::from(TEMPLATE)]);
        assert_eq!(inv.working_dir.as_deref(), Some(Path::new("/w")));
    }

    #[test]
    fn generates_all_then_fresh() {
        let cache = tempfile::tempdir().unwrap();
        let (ctx, calls) = setup(cache.path(), None);
        assert!(!is_fresh(&ctx));

        let written = generate_vector_sources(&ctx).unwrap();
        assert_eq!(written.len(), VECTOR_KINDS.len());
        assert_eq!(calls.get(), VECTOR_KINDS.len());
        assert!(is_fresh(&ctx));
    }

    #[test]
    fn touching_template_invalidates_whole_family() {
        let cache = tempfile::tempdir().unwrap();
        let (ctx, _) = setup(cache.path(), None);
        generate_vector_sources(&ctx).unwrap();
        for out in outputs(&ctx.workspace().source_dir()) {
            set_file_mtime(&out, FileTime::from_unix_time(2_000, 0)).unwrap();
        }
        assert!(is_fresh(&ctx));

        let template = ctx.workspace().source_dir().join(TEMPLATE);
        set_file_mtime(&template, FileTime::from_unix_time(3_000, 0)).unwrap();
        assert!(!is_fresh(&ctx));
    }

    #[test]
    fn failure_keeps_earlier_outputs() {
        let cache = tempfile::tempdir().unwrap();
        let (ctx, calls) = setup(cache.path(), Some("INT"));
        let err = generate_vector_sources(&ctx).unwrap_err();
        assert!(matches!(err, GenerationError::Failed { ref tag, .. } if tag == "INT"));
        assert_eq!(calls.get(), 5);
        let src = ctx.workspace().source_dir();
        assert!(src.join("gnu/lists/ShortVector.java").is_file());
        assert!(!src.join("gnu/lists/IntVector.java").exists());
    }

    #[test]
    fn missing_template() {
        let cache = tempfile::tempdir().unwrap();
        let (ctx, calls) = setup(cache.path(), None);
        fs::remove_file(ctx.workspace().source_dir().join(TEMPLATE)).unwrap();
        let err = generate_vector_sources(&ctx).unwrap_err();
        assert!(matches!(err, GenerationError::MissingTemplate { .. }));
        assert_eq!(calls.get(), 0);
    }
}

//! Layered compilation of the core classes and the library modules.
//!
//! [`LAYERS`] is the fixed compile order. Each layer may reference classes
//! produced by every layer before it, and all layers write into the same
//! class directory, which is never cleaned between them. The order reflects
//! hand-verified compile-time dependencies of the library; nothing here
//! solves for it.
//!
//! What each layer wrote is recorded in the
//! [`OutputStore`](kiln_cache::OutputStore), which is also what decides
//! whether a layer can be skipped.

use std::path::{Path, PathBuf};

use filetime::FileTime;
use kiln_cache::OutputStore;
use kiln_common::ContentHash;
use kiln_exec::{BuildContext, Invocation, KawacRequest, TaskKind};
use walkdir::WalkDir;

use crate::error::CompileError;

/// Language mode of every library layer.
pub const LANGUAGE: &str = "scheme";

/// Module-static mode of every library layer.
pub const MODULE_STATIC: &str = "run";

/// Flags of the core `javac` invocation.
pub const JAVAC_FLAGS: [&str; 2] = ["-O", "-g"];

/// Warnings escalated for the `kawa.lib` layers.
pub const STRICT_WARNINGS: &[&str] = &[
    "--warn-undefined-variable",
    "--warn-unknown-member",
    "--warn-as-error",
];

/// How a layer is compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    /// Host-language sources compiled with `javac`.
    Java {
        /// Include patterns relative to the source root. A trailing `/`
        /// selects the whole subtree; otherwise `*` globs within one
        /// directory. Only `.java` files are compiled.
        includes: &'static [&'static str],
    },
    /// Target-language modules compiled with the `kawac` task.
    Kawa {
        /// Directory of the files, relative to the source root.
        base_dir: &'static str,
        /// Package prefix of the compiled modules.
        prefix: &'static str,
        /// Files relative to `base_dir`, in compile order.
        files: &'static [&'static str],
        /// Extra compiler flags.
        flags: &'static [&'static str],
    },
}

/// One named compile layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerDef {
    /// Layer name, used as the output-store key.
    pub name: &'static str,
    /// What to compile and how.
    pub kind: LayerKind,
}

/// The runtime, compiler and data-structure classes. Includes the generated
/// vector sources and `kawa/Version.java`, so regenerating either
/// invalidates this layer and everything after it.
pub const CORE: LayerDef = LayerDef {
    name: "core",
    kind: LayerKind::Java {
        includes: &[
            "gnu/bytecode/",
            "gnu/commonlisp/lang/",
            "gnu/ecmascript/",
            "gnu/expr/",
            "gnu/kawa/functions/",
            "gnu/kawa/lispexpr/",
            "gnu/kawa/reflect/",
            "gnu/kawa/util/",
            "gnu/lists/",
            "gnu/mapping/",
            "gnu/math/",
            "gnu/q2/lang/",
            "gnu/text/",
            "kawa/lang/",
            "kawa/standard/",
            "kawa/repl.java",
            "kawa/Shell.java",
            "kawa/Version.java",
            "kawa/Source*.java",
            "kawa/Telnet*.java",
            "gnu/kawa/xml/",
            "gnu/xml/",
            "gnu/kawa/models/",
        ],
    },
};

/// Primitive syntax, the R7RS libraries and the standard procedures.
/// Everything in the later layers imports from here.
pub const LIB_1: LayerDef = LayerDef {
    name: "lib-1",
    kind: LayerKind::Kawa {
        base_dir: "kawa/lib",
        prefix: "kawa.lib.",
        files: &[
            "prim_imports.scm",
            "prim_syntax.scm",
            "std_syntax.scm",
            "reflection.scm",
            "syntax.scm",
            "lists.scm",
            "case_syntax.scm",
            "DefineRecordType.scm",
            "ExceptionClasses.scm",
            "exceptions.scm",
            "kawa/expressions.scm",
            "compile_misc.scm",
            "compile_map.scm",
            "thread.scm",
            "characters.scm",
            "keywords.scm",
            "numbers.scm",
            "strings_syntax.scm",
            "strings.scm",
            "parameters.scm",
            "parameterize.scm",
            "ports.scm",
            "files.scm",
            "misc.scm",
            "misc_syntax.scm",
            "vectors.scm",
            "uniform.scm",
            "bytevectors.scm",
            "arrays.scm",
            "system.scm",
            "kawa/istrings.scm",
            "kawa/mstrings.scm",
            "kawa/arglist.scm",
            "kawa/process-keywords.scm",
            "kawa/string-cursors.scm",
            "kawa/hashtable.scm",
            "kawa/regex.scm",
            "rnrs/unicode.scm",
            "scheme/base.scm",
            "scheme/case-lambda.scm",
            "scheme/char.scm",
            "scheme/complex.scm",
            "scheme/cxr.scm",
            "scheme/eval.scm",
            "scheme/file.scm",
            "scheme/inexact.scm",
            "scheme/lazy.scm",
            "scheme/load.scm",
            "scheme/process-context.scm",
            "scheme/read.scm",
            "scheme/repl.scm",
            "scheme/time.scm",
            "scheme/write.scm",
            "scheme/r5rs.scm",
            "trace.scm",
        ],
        flags: STRICT_WARNINGS,
    },
};

/// SRFIs, R6RS libraries and the `kawa` base library.
pub const LIB_2: LayerDef = LayerDef {
    name: "lib-2",
    kind: LayerKind::Kawa {
        base_dir: "kawa/lib",
        prefix: "kawa.lib.",
        files: &[
            "enums.scm",
            "srfi/8.scm",
            "srfi/26.scm",
            "srfi/95.scm",
            "strings_ext.scm",
            "rnrs/hashtables.scm",
            "rnrs/lists.scm",
            "rnrs/arithmetic/bitwise.scm",
            "rnrs/sorting.scm",
            "rnrs/programs.scm",
            "kawa/base.scm",
            "kawa/pictures.scm",
        ],
        flags: STRICT_WARNINGS,
    },
};

/// Libraries built on `kawa/base`.
pub const LIB_3: LayerDef = LayerDef {
    name: "lib-3",
    kind: LayerKind::Kawa {
        base_dir: "kawa/lib",
        prefix: "kawa.lib.",
        files: &[
            "kawa/quaternions.scm",
            "kawa/pprint.scm",
            "kawa/rotations.scm",
            "kawa/null-5.scm",
            "kawa/reflect.scm",
        ],
        flags: STRICT_WARNINGS,
    },
};

/// The SLIB-derived modules. Compiled without warning escalation.
pub const SLIB: LayerDef = LayerDef {
    name: "slib",
    kind: LayerKind::Kawa {
        base_dir: "gnu/kawa/slib",
        prefix: "gnu.kawa.slib.",
        files: &[
            "readtable.scm",
            "srfi1.scm",
            "srfi2.scm",
            "conditions.scm",
            "srfi13.scm",
            "srfi14.scm",
            "srfi34.scm",
            "srfi37.scm",
            "srfi60.scm",
            "srfi69.scm",
            "pregexp.scm",
            "Streams.scm",
            "StreamsDerived.scm",
            "StreamsPrimitive.scm",
            "StreamsType.scm",
            "genwrite.scm",
            "pp.scm",
            "ppfile.scm",
            "printf.scm",
            "syntaxutils.scm",
            "testing.scm",
            "gui.scm",
        ],
        flags: &[],
    },
};

/// Every layer, in compile order.
pub const LAYERS: [&LayerDef; 5] = [&CORE, &LIB_1, &LIB_2, &LIB_3, &SLIB];

/// The library layers compiled by one pipeline stage.
pub const LIB_LAYERS: [&LayerDef; 3] = [&LIB_1, &LIB_2, &LIB_3];

impl LayerDef {
    /// Names of the layers compiled before this one.
    pub fn upstream(&self) -> Vec<&'static str> {
        LAYERS
            .iter()
            .take_while(|layer| layer.name != self.name)
            .map(|layer| layer.name)
            .collect()
    }

    /// Input files as paths relative to the source root, in compile order.
    ///
    /// For a `Kawa` layer every listed file must exist. For the `Java` layer
    /// the include patterns are expanded against the tree.
    pub fn inputs(&self, source_dir: &Path) -> Result<Vec<PathBuf>, CompileError> {
        match self.kind {
            LayerKind::Kawa { base_dir, files, .. } => files
                .iter()
                .map(|file| {
                    let rel = Path::new(base_dir).join(file);
                    if source_dir.join(&rel).is_file() {
                        Ok(rel)
                    } else {
                        Err(CompileError::MissingSource {
                            layer: self.name.to_string(),
                            path: source_dir.join(rel),
                        })
                    }
                })
                .collect(),
            LayerKind::Java { includes } => {
                let mut found = Vec::new();
                for include in includes {
                    expand_include(source_dir, include, &mut found)?;
                }
                found.sort();
                found.dedup();
                if found.is_empty() {
                    return Err(CompileError::MissingSource {
                        layer: self.name.to_string(),
                        path: source_dir.to_path_buf(),
                    });
                }
                Ok(found)
            }
        }
    }

    /// Fingerprint of the layer definition against the expanded inputs.
    pub fn fingerprint(&self, inputs: &[PathBuf]) -> ContentHash {
        let mut lines = vec![self.name.to_string()];
        if let LayerKind::Kawa { prefix, flags, .. } = self.kind {
            lines.push(prefix.to_string());
            lines.extend(flags.iter().map(|f| f.to_string()));
        }
        lines.push(String::new());
        lines.extend(inputs.iter().map(|p| p.to_string_lossy().replace('\\', "/")));
        ContentHash::from_lines(lines)
    }
}

fn expand_include(
    source_dir: &Path,
    include: &str,
    found: &mut Vec<PathBuf>,
) -> Result<(), CompileError> {
    let is_java = |p: &Path| p.extension().is_some_and(|e| e == "java");

    if let Some(dir) = include.strip_suffix('/') {
        for entry in WalkDir::new(source_dir.join(dir))
            .into_iter()
            .filter_map(Result::ok)
        {
            if entry.file_type().is_file() && is_java(entry.path()) {
                if let Ok(rel) = entry.path().strip_prefix(source_dir) {
                    found.push(rel.to_path_buf());
                }
            }
        }
        return Ok(());
    }

    let pattern = format!(
        "{}/{include}",
        glob::Pattern::escape(&source_dir.to_string_lossy())
    );
    let paths = glob::glob(&pattern).map_err(|e| CompileError::Pattern {
        pattern: include.to_string(),
        reason: e.to_string(),
    })?;
    for path in paths.filter_map(Result::ok) {
        if path.is_file() && is_java(&path) {
            if let Ok(rel) = path.strip_prefix(source_dir) {
                found.push(rel.to_path_buf());
            }
        }
    }
    Ok(())
}

/// Whether `layer` can be skipped.
pub fn is_fresh(ctx: &BuildContext, layer: &LayerDef) -> bool {
    let ws = ctx.workspace();
    let source_dir = ws.source_dir();
    let Ok(inputs) = layer.inputs(&source_dir) else {
        return false;
    };
    let store = OutputStore::load_or_create(&ws.state_dir(), &ws.classes_dir());
    let absolute: Vec<PathBuf> = inputs.iter().map(|p| source_dir.join(p)).collect();
    store.is_layer_fresh(
        layer.name,
        layer.fingerprint(&inputs),
        &absolute,
        &layer.upstream(),
    )
}

/// Compiles one layer and records its output. Returns the number of
/// compiled units it wrote.
pub fn compile_layer(ctx: &BuildContext, layer: &LayerDef) -> Result<usize, CompileError> {
    let ws = ctx.workspace();
    let (source_dir, classes_dir) = (ws.source_dir(), ws.classes_dir());
    let inputs = layer.inputs(&source_dir)?;

    let invocation = match layer.kind {
        LayerKind::Java { .. } => Invocation::javac(&classes_dir)
            .source_path(&source_dir)
            .classpath([&classes_dir])
            .flags(JAVAC_FLAGS)
            .sources(inputs.iter().map(|p| source_dir.join(p))),
        LayerKind::Kawa {
            base_dir,
            prefix,
            files,
            flags,
        } => {
            let mut request = KawacRequest::new(LANGUAGE, &classes_dir);
            request.prefix = Some(prefix.to_string());
            request.module_static = Some(MODULE_STATIC.to_string());
            request.flags = flags.iter().map(|f| f.to_string()).collect();
            request.sources = files.iter().map(PathBuf::from).collect();
            request.working_dir = Some(source_dir.join(base_dir));
            kawac_invocation(ctx, &request)?
        }
    };

    std::fs::create_dir_all(&classes_dir).map_err(|e| CompileError::Io {
        path: classes_dir.clone(),
        source: e,
    })?;
    let mut store = OutputStore::load_or_create(&ws.state_dir(), &classes_dir);
    let before = store.snapshot();
    let started = FileTime::now();

    run_batch(ctx, layer.name, &invocation)?;

    let units = store.record_layer(layer.name, layer.fingerprint(&inputs), started, &before);
    store.save()?;
    tracing::info!(layer = layer.name, files = inputs.len(), units, "compiled layer");
    Ok(units)
}

/// Compiles an arbitrary `kawac` batch, such as user sources.
pub fn compile_batch(
    ctx: &BuildContext,
    label: &str,
    request: &KawacRequest,
) -> Result<(), CompileError> {
    let invocation = kawac_invocation(ctx, request)?;
    std::fs::create_dir_all(&request.destination).map_err(|e| CompileError::Io {
        path: request.destination.clone(),
        source: e,
    })?;
    run_batch(ctx, label, &invocation)
}

fn kawac_invocation(ctx: &BuildContext, request: &KawacRequest) -> Result<Invocation, CompileError> {
    let task = ctx
        .task(TaskKind::Kawac)
        .map_err(|_| CompileError::TaskNotRegistered {
            name: TaskKind::Kawac.name().to_string(),
        })?;
    Ok(request.to_invocation(task))
}

fn run_batch(ctx: &BuildContext, label: &str, invocation: &Invocation) -> Result<(), CompileError> {
    let report = ctx.run(invocation)?;
    if report.success() {
        Ok(())
    } else {
        Err(CompileError::Failed {
            layer: label.to_string(),
            code: report.code,
            diagnostics: report.diagnostics().to_string(),
        })
    }
}

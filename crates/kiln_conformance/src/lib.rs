//! Conformance test helpers for the Kiln toolchain builder.
//!
//! Provides a fake JDK that imitates `javac`, the vector-source generator and
//! the Kawa compiler closely enough for the pipeline's freshness logic to be
//! exercised end to end, plus a builder for source archives shaped like a
//! real Kawa release.

#![warn(missing_docs)]

use std::cell::RefCell;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use flate2::write::GzEncoder;
use flate2::Compression;
use kiln_common::{Version, Workspace};
use kiln_config::Settings;
use kiln_exec::{ExecError, ExitReport, Invocation, JavaTools, ProcessRunner, Tool};
use kiln_pipeline::Pipeline;
use kiln_stages::layers::{LayerKind, LAYERS};

/// A source containing this marker fails to compile.
pub const COMPILE_ERROR: &str = "COMPILE_ERROR";

/// Lines of the form `;; requires: <class path>` name a class file that must
/// already exist in the destination for the source to compile.
pub const REQUIRES: &str = ";; requires: ";

/// Modification time given to every archive entry.
pub const ARCHIVE_MTIME: u64 = 1_600_000_000;

/// Shared record of every invocation a [`FakeJdk`] received.
#[derive(Debug, Default, Clone)]
pub struct CallLog(Rc<RefCell<Vec<Invocation>>>);

impl CallLog {
    /// Number of recorded invocations.
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// A copy of the recorded invocations.
    pub fn calls(&self) -> Vec<Invocation> {
        self.0.borrow().clone()
    }

    /// Forgets everything recorded so far.
    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

/// A [`ProcessRunner`] that writes the files the real tools would.
///
/// - `javac` writes one class per source under `-d`.
/// - `gnu.kawa.util.PreProcess` writes its `-o` target from the template.
/// - `kawa.repl` writes one class per source under `-d`, named from the
///   `-P` prefix and the source's path.
///
/// A source containing [`COMPILE_ERROR`], or naming a missing class through
/// [`REQUIRES`], makes the call exit 1.
#[derive(Debug, Default, Clone)]
pub struct FakeJdk {
    log: CallLog,
}

impl FakeJdk {
    /// A fake JDK and the log it records into.
    pub fn new() -> (Self, CallLog) {
        let jdk = Self::default();
        let log = jdk.log.clone();
        (jdk, log)
    }

    fn javac(&self, inv: &Invocation) -> ExitReport {
        let (Some(dest), Some(root)) = (&inv.destination, &inv.source_path) else {
            return ExitReport::failed(2, "javac: no -d or -sourcepath");
        };
        for src in &inv.sources {
            if let Err(msg) = check_source(src, dest) {
                return ExitReport::failed(1, msg);
            }
            let rel = src.strip_prefix(root).unwrap_or(src);
            if let Err(e) = write_class(&dest.join(rel).with_extension("class")) {
                return ExitReport::failed(1, e.to_string());
            }
        }
        ExitReport::ok()
    }

    fn preprocess(&self, inv: &Invocation) -> ExitReport {
        let cwd = inv.working_dir.clone().unwrap_or_default();
        let Some(out) = flag_value(&inv.flags, "-o") else {
            return ExitReport::failed(2, "PreProcess: missing -o");
        };
        let Some(template) = inv.sources.first() else {
            return ExitReport::failed(2, "PreProcess: missing template");
        };
        let Ok(text) = fs::read_to_string(cwd.join(template)) else {
            return ExitReport::failed(1, format!("cannot read {}", template.display()));
        };
        let tag = inv.flags.first().cloned().unwrap_or_default();
        match fs::write(cwd.join(out), format!("// {tag}\n{text}")) {
            Ok(()) => ExitReport::ok(),
            Err(e) => ExitReport::failed(1, e.to_string()),
        }
    }

    fn kawac(&self, inv: &Invocation) -> ExitReport {
        let cwd = inv.working_dir.clone().unwrap_or_default();
        let Some(dest) = &inv.destination else {
            return ExitReport::failed(2, "kawa: missing -d");
        };
        let package_dir = flag_value(&inv.flags, "-P")
            .map(|p| p.trim_end_matches('.').replace('.', "/"))
            .unwrap_or_default();
        for src in &inv.sources {
            if let Err(msg) = check_source(&cwd.join(src), dest) {
                return ExitReport::failed(1, msg);
            }
            let class = dest.join(&package_dir).join(src).with_extension("class");
            if let Err(e) = write_class(&class) {
                return ExitReport::failed(1, e.to_string());
            }
        }
        ExitReport::ok()
    }
}

impl ProcessRunner for FakeJdk {
    fn run(&self, _tools: &JavaTools, inv: &Invocation) -> Result<ExitReport, ExecError> {
        self.log.0.borrow_mut().push(inv.clone());
        Ok(match (inv.tool, inv.main_class.as_deref()) {
            (Tool::Javac, _) => self.javac(inv),
            (Tool::Java, Some("gnu.kawa.util.PreProcess")) => self.preprocess(inv),
            (Tool::Java, Some("kawa.repl")) => self.kawac(inv),
            (Tool::Java, other) => ExitReport::failed(1, format!("no main class {other:?}")),
        })
    }
}

fn flag_value<'a>(flags: &'a [String], name: &str) -> Option<&'a str> {
    let i = flags.iter().position(|f| f == name)?;
    flags.get(i + 1).map(String::as_str)
}

fn check_source(src: &Path, dest: &Path) -> Result<(), String> {
    let text = fs::read_to_string(src).map_err(|e| format!("{}: {e}", src.display()))?;
    if text.contains(COMPILE_ERROR) {
        return Err(format!("{}:1: error: {COMPILE_ERROR}", src.display()));
    }
    for line in text.lines() {
        if let Some(required) = line.strip_prefix(REQUIRES) {
            if !dest.join(required.trim()).is_file() {
                return Err(format!(
                    "{}:1: error: unbound location: {}",
                    src.display(),
                    required.trim()
                ));
            }
        }
    }
    Ok(())
}

fn write_class(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, b"\xca\xfe\xba\xbe")
}

/// Helper-tool and core sources every fixture tree carries, relative to the
/// source root.
pub const FIXED_SOURCES: &[(&str, &str)] = &[
    ("gnu/kawa/util/PreProcess.java", "package gnu.kawa.util;\n"),
    ("gnu/kawa/ant/Kawac.java", "package gnu.kawa.ant;\n"),
    ("gnu/kawa/ant/XCopy.java", "package gnu.kawa.ant;\n"),
    ("gnu/lists/PrimVector.template", "#ifdef OBJECT\n#endif\n"),
    ("gnu/lists/Sequence.java", "package gnu.lists;\n"),
    ("gnu/expr/Compilation.java", "package gnu.expr;\n"),
    ("gnu/mapping/Procedure.java", "package gnu.mapping;\n"),
    ("kawa/standard/Scheme.java", "package kawa.standard;\n"),
    ("kawa/standard/SchemeScriptEngineFactory.java", "package kawa.standard;\n"),
    ("kawa/repl.java", "package kawa;\n"),
    ("kawa/Shell.java", "package kawa;\n"),
    ("kawa/SourceMethodType.java", "package kawa;\n"),
    (
        "kawa/Version.java.in",
        "/* -*-Java-*- */\npackage kawa;\npublic class Version {\n  public static final String version = \"VERSION\";\n}\n",
    ),
    ("jar-manifest", "Main-Class: kawa.repl\n"),
];

/// A Kawa-shaped source tree to pack into an archive.
#[derive(Debug, Clone)]
pub struct SourceFixture {
    /// Files relative to the source root, with contents.
    pub files: Vec<(String, String)>,
}

impl SourceFixture {
    /// Every helper, core and library source, with later library layers
    /// requiring a class from an earlier one.
    pub fn kawa() -> Self {
        let mut files: Vec<(String, String)> = FIXED_SOURCES
            .iter()
            .map(|(p, c)| (p.to_string(), c.to_string()))
            .collect();
        for layer in LAYERS {
            let LayerKind::Kawa { base_dir, files: names, .. } = layer.kind else {
                continue;
            };
            let requires = match layer.name {
                "lib-2" | "slib" => vec!["kawa/lib/prim_imports.class"],
                "lib-3" => vec!["kawa/lib/prim_imports.class", "kawa/lib/kawa/base.class"],
                _ => Vec::new(),
            };
            for name in names {
                let mut text = format!(";; {name}\n");
                for r in &requires {
                    text.push_str(&format!("{REQUIRES}{r}\n"));
                }
                files.push((format!("{base_dir}/{name}"), text));
            }
        }
        Self { files }
    }

    /// Replaces the content of `path`, adding it if absent.
    pub fn with_file(mut self, path: &str, content: &str) -> Self {
        self.files.retain(|(p, _)| p != path);
        self.files.push((path.to_string(), content.to_string()));
        self
    }

    /// Writes `kawa-<version>.tar.gz` into `dir`, every entry under the
    /// `kawa-<version>/` root. Returns its path.
    pub fn write_archive(&self, dir: &Path, version: &str) -> std::io::Result<PathBuf> {
        let root = format!("kawa-{version}");
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{root}.tar.gz"));
        let encoder = GzEncoder::new(File::create(&path)?, Compression::default());
        let mut builder = tar::Builder::new(encoder);

        for (rel, content) in &self.files {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_mtime(ARCHIVE_MTIME);
            header.set_entry_type(tar::EntryType::Regular);
            builder.append_data(&mut header, format!("{root}/{rel}"), content.as_bytes())?;
        }
        builder.into_inner()?.finish()?;
        Ok(path)
    }
}

/// `file://` URL of a local directory.
pub fn file_url(dir: &Path) -> String {
    format!("file://{}", dir.display())
}

/// Settings for `version` with the archive mirror at `mirror`.
pub fn settings(cache_dir: &Path, mirror: &Path, version: &str) -> Settings {
    Settings {
        version: Version::new(version).expect("valid fixture version"),
        cache_dir: cache_dir.to_path_buf(),
        fetch_base_url: file_url(mirror),
        java_home: None,
        bootstrap_classpath: vec![PathBuf::from("/opt/ant/lib/ant.jar")],
        rebuild: false,
    }
}

/// A temporary cache directory plus a `file://` mirror holding one archive.
#[derive(Debug)]
pub struct Sandbox {
    dir: tempfile::TempDir,
    version: String,
}

impl Sandbox {
    /// Packs `fixture` as `kawa-<version>.tar.gz` into a fresh mirror.
    pub fn new(version: &str, fixture: &SourceFixture) -> std::io::Result<Self> {
        let dir = tempfile::tempdir()?;
        fixture.write_archive(&dir.path().join("mirror"), version)?;
        Ok(Self {
            dir,
            version: version.to_string(),
        })
    }

    /// Root of the per-version workspaces.
    pub fn cache_dir(&self) -> PathBuf {
        self.dir.path().join("cache")
    }

    /// Directory served as the archive mirror.
    pub fn mirror_dir(&self) -> PathBuf {
        self.dir.path().join("mirror")
    }

    /// A scratch directory outside the cache.
    pub fn scratch(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Settings pointing at this sandbox.
    pub fn settings(&self) -> Settings {
        settings(&self.cache_dir(), &self.mirror_dir(), &self.version)
    }

    /// The workspace the pipeline builds into.
    pub fn workspace(&self) -> Workspace {
        self.settings().workspace()
    }

    /// A pipeline running against a fresh [`FakeJdk`].
    pub fn pipeline(&self) -> (Pipeline, CallLog) {
        self.pipeline_with(self.settings())
    }

    /// Like [`pipeline`](Self::pipeline) with adjusted settings.
    pub fn pipeline_with(&self, settings: Settings) -> (Pipeline, CallLog) {
        let (jdk, log) = FakeJdk::new();
        (Pipeline::new(settings).with_runner(Box::new(jdk)), log)
    }
}

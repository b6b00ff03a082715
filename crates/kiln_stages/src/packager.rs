//! Service registration and the two distributable jars.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use kiln_common::{is_up_to_date, Workspace};
use kiln_exec::BuildContext;

use crate::error::PackageError;
use crate::jar::JarSpec;

/// Directory of service registrations inside the class directory.
pub const SERVICES_DIR: &str = "META-INF/services";

/// Optional manifest attributes, relative to the source root.
pub const JAR_MANIFEST: &str = "jar-manifest";

/// Entries of the main jar, relative to the class directory.
pub const MAIN_INCLUDES: [&str; 3] = ["gnu/**/*.class", "kawa/**/*.class", "META-INF/services/*"];

/// Entries of the tools jar, relative to the tools directory.
pub const TOOLS_INCLUDES: [&str; 1] = ["gnu/kawa/ant/*.class"];

/// A service-registration line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildManifestEntry {
    /// Fully-qualified service interface; names the registration file.
    pub service: &'static str,
    /// Fully-qualified provider class.
    pub provider: &'static str,
    /// Trailing comment.
    pub comment: &'static str,
}

/// Registers the Scheme script engine.
pub const SCRIPT_ENGINE: BuildManifestEntry = BuildManifestEntry {
    service: "javax.script.ScriptEngineFactory",
    provider: "kawa.standard.SchemeScriptEngineFactory",
    comment: "Scheme",
};

impl BuildManifestEntry {
    /// `<provider> #<comment>` with a trailing newline.
    pub fn line(&self) -> String {
        format!("{} #{}\n", self.provider, self.comment)
    }

    /// Appends [`line`](Self::line) to the registration file under
    /// `classes_dir`. Never deduplicates: each call adds one line.
    pub fn append_to(&self, classes_dir: &Path) -> Result<PathBuf, PackageError> {
        let dir = classes_dir.join(SERVICES_DIR);
        fs::create_dir_all(&dir).map_err(|e| PackageError::Io {
            path: dir.clone(),
            source: e,
        })?;
        let path = dir.join(self.service);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| PackageError::Io {
                path: path.clone(),
                source: e,
            })?;
        file.write_all(self.line().as_bytes())
            .map_err(|e| PackageError::Io {
                path: path.clone(),
                source: e,
            })?;
        Ok(path)
    }
}

/// The main jar for `ws`.
pub fn main_jar(ws: &Workspace) -> JarSpec {
    JarSpec {
        path: ws.main_jar(),
        root: ws.classes_dir(),
        includes: MAIN_INCLUDES.iter().map(|s| s.to_string()).collect(),
        manifest: Some(ws.source_dir().join(JAR_MANIFEST)),
    }
}

/// The build-task adapter jar for `ws`.
pub fn tools_jar(ws: &Workspace) -> JarSpec {
    JarSpec {
        path: ws.tools_jar(),
        root: ws.tools_dir(),
        includes: TOOLS_INCLUDES.iter().map(|s| s.to_string()).collect(),
        manifest: None,
    }
}

/// Both jars exist and each is at least as new as everything it includes.
pub fn is_fresh(ctx: &BuildContext) -> bool {
    let ws = ctx.workspace();
    [main_jar(ws), tools_jar(ws)].iter().all(|jar| {
        jar.inputs()
            .map(|inputs| is_up_to_date(&jar.path, &inputs))
            .unwrap_or(false)
    })
}

/// Registers the script engine, then writes both jars. Returns their paths.
pub fn package(ctx: &BuildContext) -> Result<Vec<PathBuf>, PackageError> {
    let ws = ctx.workspace();
    SCRIPT_ENGINE.append_to(&ws.classes_dir())?;

    let mut written = Vec::with_capacity(2);
    for jar in [main_jar(ws), tools_jar(ws)] {
        let entries = jar.write()?;
        tracing::info!(jar = %jar.path.display(), entries, "packaged");
        written.push(jar.path);
    }
    Ok(written)
}

//! Merging of file configuration, command-line overrides and environment
//! into validated settings.
//!
//! Precedence, highest first: command line, `kiln.toml`, environment
//! (`JAVA_HOME`, `ANT_HOME`), built-in defaults.

use std::path::{Path, PathBuf};

use kiln_common::{Version, Workspace};

use crate::error::ConfigurationError;
use crate::types::KilnConfig;

/// Where source archives are fetched from unless configured otherwise.
pub const DEFAULT_FETCH_BASE_URL: &str = "https://ftp.gnu.org/pub/gnu/kawa";

/// Ant's runtime jar relative to `ANT_HOME`.
const ANT_RUNTIME_JAR: &str = "lib/ant.jar";

/// Values given on the command line for a pipeline run.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    /// `--version`.
    pub version: Option<String>,
    /// `--cache-dir`.
    pub cache_dir: Option<PathBuf>,
    /// `--rebuild`: discard an already extracted workspace.
    pub rebuild: bool,
}

/// The validated record consumed by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Pinned toolchain release.
    pub version: Version,
    /// Root under which `<version>/` workspaces live.
    pub cache_dir: PathBuf,
    /// Base URL of the archive mirror, without a trailing slash.
    pub fetch_base_url: String,
    /// JDK installation, or `None` to use `javac`/`java` from `PATH`.
    pub java_home: Option<PathBuf>,
    /// Classpath for compiling the helper tools.
    pub bootstrap_classpath: Vec<PathBuf>,
    /// Whether a full rebuild was requested.
    pub rebuild: bool,
}

impl Settings {
    /// The workspace layout these settings select.
    pub fn workspace(&self) -> Workspace {
        Workspace::new(&self.cache_dir, &self.version)
    }
}

/// Command-line values for compiling user sources.
#[derive(Debug, Default, Clone)]
pub struct CompileOverrides {
    /// `--src`.
    pub src_dir: Option<PathBuf>,
    /// `--dest`.
    pub dest_dir: Option<PathBuf>,
    /// `--language`.
    pub language: Option<String>,
    /// `--args`.
    pub args: Option<String>,
}

/// Validated inputs of a user-source compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileSettings {
    /// Directory of user sources.
    pub src_dir: PathBuf,
    /// Destination of compiled classes.
    pub dest_dir: PathBuf,
    /// Source language, e.g. `scheme`.
    pub language: String,
    /// Extra compiler arguments.
    pub args: Vec<String>,
}

/// Resolves pipeline settings.
///
/// `base_dir` anchors relative paths from the file (normally the directory
/// holding `kiln.toml`). `env` looks up environment variables; callers pass
/// `|k| std::env::var(k).ok()` outside of tests.
pub fn resolve_settings(
    config: &KilnConfig,
    overrides: &Overrides,
    base_dir: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Settings, ConfigurationError> {
    let version = overrides
        .version
        .clone()
        .or_else(|| config.toolchain.version.clone())
        .ok_or_else(|| ConfigurationError::MissingField("toolchain.version".to_string()))?;
    let version = Version::new(version)?;

    let cache_dir = overrides
        .cache_dir
        .clone()
        .or_else(|| config.toolchain.cache_dir.as_ref().map(|p| base_dir.join(p)))
        .ok_or_else(|| ConfigurationError::MissingField("toolchain.cache_dir".to_string()))?;

    let fetch_base_url = config
        .toolchain
        .fetch_base_url
        .as_deref()
        .unwrap_or(DEFAULT_FETCH_BASE_URL)
        .trim_end_matches('/')
        .to_string();

    let java_home = config
        .java
        .home
        .as_ref()
        .map(|p| base_dir.join(p))
        .or_else(|| env("JAVA_HOME").map(PathBuf::from));

    let mut bootstrap_classpath: Vec<PathBuf> = config
        .bootstrap
        .classpath
        .iter()
        .map(|p| base_dir.join(p))
        .collect();
    if bootstrap_classpath.is_empty() {
        if let Some(ant_home) = env("ANT_HOME") {
            bootstrap_classpath.push(PathBuf::from(ant_home).join(ANT_RUNTIME_JAR));
        }
    }

    Ok(Settings {
        version,
        cache_dir,
        fetch_base_url,
        java_home,
        bootstrap_classpath,
        rebuild: overrides.rebuild,
    })
}

/// Resolves the inputs of a user-source compilation. Every field is required.
pub fn resolve_compile_settings(
    config: &KilnConfig,
    overrides: &CompileOverrides,
    base_dir: &Path,
) -> Result<CompileSettings, ConfigurationError> {
    let compile = &config.compile;
    let src_dir = overrides
        .src_dir
        .clone()
        .or_else(|| compile.src_dir.as_ref().map(|p| base_dir.join(p)))
        .ok_or_else(|| ConfigurationError::MissingField("compile.src_dir".to_string()))?;
    let dest_dir = overrides
        .dest_dir
        .clone()
        .or_else(|| compile.dest_dir.as_ref().map(|p| base_dir.join(p)))
        .ok_or_else(|| ConfigurationError::MissingField("compile.dest_dir".to_string()))?;
    let language = overrides
        .language
        .clone()
        .or_else(|| compile.language.clone())
        .ok_or_else(|| ConfigurationError::MissingField("compile.language".to_string()))?;
    let args = overrides
        .args
        .clone()
        .or_else(|| compile.args.clone())
        .ok_or_else(|| ConfigurationError::MissingField("compile.args".to_string()))?;

    Ok(CompileSettings {
        src_dir,
        dest_dir,
        language,
        args: args.split_whitespace().map(str::to_string).collect(),
    })
}

//! Configuration types deserialized from `kiln.toml`.
//!
//! Every field is optional at this level; requiredness is enforced when the
//! file is merged with command-line overrides in [`crate::resolve`].

use serde::Deserialize;
use std::path::PathBuf;

/// The top-level configuration parsed from `kiln.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KilnConfig {
    /// Which toolchain release to build and where to cache it.
    #[serde(default)]
    pub toolchain: ToolchainConfig,
    /// Location of the host JDK.
    #[serde(default)]
    pub java: JavaConfig,
    /// Extra inputs for the bootstrap compile.
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
    /// Compilation of user sources with the built toolchain.
    #[serde(default)]
    pub compile: CompileConfig,
}

/// The `[toolchain]` table.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolchainConfig {
    /// Release to build (e.g. `"3.1.1"`).
    pub version: Option<String>,
    /// Root of the per-version workspaces. Relative paths are resolved
    /// against the directory holding `kiln.toml`.
    pub cache_dir: Option<PathBuf>,
    /// Base URL the source archive is fetched from.
    pub fetch_base_url: Option<String>,
}

/// The `[java]` table.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JavaConfig {
    /// JDK installation; `bin/javac` and `bin/java` are used from it.
    pub home: Option<PathBuf>,
}

/// The `[bootstrap]` table.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BootstrapConfig {
    /// Classpath entries needed to compile the helper tools, typically
    /// Ant's runtime jar.
    #[serde(default)]
    pub classpath: Vec<PathBuf>,
}

/// The `[compile]` table.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompileConfig {
    /// Directory of user sources.
    pub src_dir: Option<PathBuf>,
    /// Output directory for compiled user classes.
    pub dest_dir: Option<PathBuf>,
    /// Source language passed to the compiler (e.g. `"scheme"`).
    pub language: Option<String>,
    /// Extra compiler argument line, split on whitespace.
    pub args: Option<String>,
}

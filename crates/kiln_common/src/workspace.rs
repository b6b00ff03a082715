//! On-disk layout of a versioned build workspace.
//!
//! ```text
//! <cache_dir>/<version>/kawa-<version>.tar.gz     fetched archive
//! <cache_dir>/<version>/kawa-<version>/           extracted source root
//!     tools/                                      bootstrapped helper classes
//!     classes/                                    compiled module output
//!     dist/                                       packaged jars
//!     .kiln/                                      builder bookkeeping
//! ```

use std::path::{Path, PathBuf};

use crate::version::Version;

/// Name of the toolchain this builder produces. Fixed.
pub const TOOLCHAIN_NAME: &str = "kawa";

/// Directory names inside the extracted source root.
const TOOLS_DIR: &str = "tools";
const CLASSES_DIR: &str = "classes";
const DIST_DIR: &str = "dist";
const STATE_DIR: &str = ".kiln";

/// Paths of one version's workspace.
///
/// Pure path arithmetic: nothing is created on construction. Directories are
/// created lazily by the stages that write into them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    version: Version,
    base: PathBuf,
}

impl Workspace {
    /// Creates the layout for `version` under `cache_dir`.
    pub fn new(cache_dir: &Path, version: &Version) -> Self {
        Self {
            version: version.clone(),
            base: cache_dir.join(version.as_str()),
        }
    }

    /// The pinned version this workspace belongs to.
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// `<cache_dir>/<version>`.
    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    /// `kawa-<version>`, the stem shared by the archive and its root directory.
    pub fn release_name(&self) -> String {
        format!("{TOOLCHAIN_NAME}-{}", self.version)
    }

    /// File name of the source archive, `kawa-<version>.tar.gz`.
    pub fn archive_name(&self) -> String {
        format!("{}.tar.gz", self.release_name())
    }

    /// Local path of the fetched source archive.
    pub fn archive_path(&self) -> PathBuf {
        self.base.join(self.archive_name())
    }

    /// Root of the extracted sources.
    pub fn source_dir(&self) -> PathBuf {
        self.base.join(self.release_name())
    }

    /// Output directory of the bootstrapped helper classes.
    pub fn tools_dir(&self) -> PathBuf {
        self.source_dir().join(TOOLS_DIR)
    }

    /// Shared output directory of every compile layer.
    pub fn classes_dir(&self) -> PathBuf {
        self.source_dir().join(CLASSES_DIR)
    }

    /// Output directory of the packaged jars.
    pub fn dist_dir(&self) -> PathBuf {
        self.source_dir().join(DIST_DIR)
    }

    /// Builder bookkeeping (output-store manifest, argument files).
    pub fn state_dir(&self) -> PathBuf {
        self.source_dir().join(STATE_DIR)
    }

    /// `dist/kawa-<version>.jar`.
    pub fn main_jar(&self) -> PathBuf {
        self.dist_dir()
            .join(format!("{TOOLCHAIN_NAME}-{}.jar", self.version))
    }

    /// `dist/kawa-ant-<version>.jar`.
    pub fn tools_jar(&self) -> PathBuf {
        self.dist_dir()
            .join(format!("{TOOLCHAIN_NAME}-ant-{}.jar", self.version))
    }
}

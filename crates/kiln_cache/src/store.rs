//! Append-only record of the compiled units in the shared class directory.
//!
//! All compile layers write into one class directory and never clean it. The
//! store makes that accumulation explicit: after each layer runs, the classes
//! it wrote are recorded as [`CompiledUnit`]s keyed by fully-qualified class
//! name, together with a [`LayerRecord`] holding the layer's input
//! fingerprint and the time it started. The store is persisted as
//! `units.json` in the workspace state directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use filetime::FileTime;
use kiln_common::{mtime, ContentHash};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::CacheError;

/// Name of the store file within the state directory.
pub const STORE_FILE: &str = "units.json";

/// Bump when the serialized layout changes; older files are discarded.
const STORE_FORMAT: u32 = 1;

/// Seconds and nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Stamp {
    /// Whole seconds.
    pub secs: i64,
    /// Sub-second nanoseconds.
    pub nanos: u32,
}

impl From<FileTime> for Stamp {
    fn from(t: FileTime) -> Self {
        Self {
            secs: t.unix_seconds(),
            nanos: t.nanoseconds(),
        }
    }
}

impl From<Stamp> for FileTime {
    fn from(s: Stamp) -> Self {
        FileTime::from_unix_time(s.secs, s.nanos)
    }
}

/// The last successful run of one compile layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerRecord {
    /// Fingerprint of the layer's ordered input list.
    pub fingerprint: ContentHash,
    /// When the layer's compile started.
    pub stamp: Stamp,
}

/// One class file produced by a compile layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledUnit {
    /// Path of the class file relative to the class directory.
    pub path: PathBuf,
    /// Name of the layer that produced it.
    pub layer: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    format: u32,
    layers: BTreeMap<String, LayerRecord>,
    units: BTreeMap<String, CompiledUnit>,
}

impl Default for StoreFile {
    fn default() -> Self {
        Self {
            format: STORE_FORMAT,
            layers: BTreeMap::new(),
            units: BTreeMap::new(),
        }
    }
}

/// Modification times of every class file under a directory, keyed by
/// path relative to it. Taken before a layer runs so the store can tell
/// which classes the layer wrote.
#[derive(Debug, Default, Clone)]
pub struct ClassSnapshot(BTreeMap<PathBuf, FileTime>);

impl ClassSnapshot {
    /// Scans `class_dir` for `.class` files. A missing directory is empty.
    pub fn take(class_dir: &Path) -> Self {
        let mut files = BTreeMap::new();
        for entry in WalkDir::new(class_dir).into_iter().filter_map(Result::ok) {
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|e| e.to_str()) != Some("class")
            {
                continue;
            }
            if let (Ok(rel), Some(t)) = (path.strip_prefix(class_dir), mtime(path)) {
                files.insert(rel.to_path_buf(), t);
            }
        }
        Self(files)
    }

    /// Number of class files in the snapshot.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the snapshot holds no class files.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Converts `kawa/lib/lists$1.class` into `kawa.lib.lists$1`.
fn class_name(rel: &Path) -> String {
    let stem = rel.with_extension("");
    stem.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join(".")
}

/// Ledger of compiled units for one class directory.
#[derive(Debug)]
pub struct OutputStore {
    state_dir: PathBuf,
    class_dir: PathBuf,
    file: StoreFile,
}

impl OutputStore {
    /// Loads the store from `state_dir`, or starts empty.
    ///
    /// Fail-safe: an unreadable, corrupt or outdated file yields an empty
    /// store, so every layer looks stale and is rebuilt.
    pub fn load_or_create(state_dir: &Path, class_dir: &Path) -> Self {
        let file = std::fs::read_to_string(state_dir.join(STORE_FILE))
            .ok()
            .and_then(|s| serde_json::from_str::<StoreFile>(&s).ok())
            .filter(|f| f.format == STORE_FORMAT)
            .unwrap_or_default();
        Self {
            state_dir: state_dir.to_path_buf(),
            class_dir: class_dir.to_path_buf(),
            file,
        }
    }

    /// The class directory this store describes.
    pub fn class_dir(&self) -> &Path {
        &self.class_dir
    }

    /// Takes a snapshot of the class directory.
    pub fn snapshot(&self) -> ClassSnapshot {
        ClassSnapshot::take(&self.class_dir)
    }

    /// Records a finished layer run.
    ///
    /// Every class file that is new or rewritten relative to `before` is
    /// recorded as a unit of `layer`. Existing units are never dropped; a
    /// class rewritten by a later layer is re-attributed to it. Returns the
    /// number of units recorded.
    pub fn record_layer(
        &mut self,
        layer: &str,
        fingerprint: ContentHash,
        started: FileTime,
        before: &ClassSnapshot,
    ) -> usize {
        let after = self.snapshot();
        let mut written = 0;
        for (rel, t) in &after.0 {
            if before.0.get(rel).is_some_and(|old| old == t) {
                continue;
            }
            self.file.units.insert(
                class_name(rel),
                CompiledUnit {
                    path: rel.clone(),
                    layer: layer.to_string(),
                },
            );
            written += 1;
        }
        self.file.layers.insert(
            layer.to_string(),
            LayerRecord {
                fingerprint,
                stamp: started.into(),
            },
        );
        tracing::debug!(layer, units = written, "recorded layer output");
        written
    }

    /// Returns the record of `layer`'s last run, if any.
    pub fn layer(&self, layer: &str) -> Option<&LayerRecord> {
        self.file.layers.get(layer)
    }

    /// Looks up a unit by fully-qualified class name.
    pub fn unit(&self, class_name: &str) -> Option<&CompiledUnit> {
        self.file.units.get(class_name)
    }

    /// Iterates over the units attributed to `layer`, by class name.
    pub fn units_of<'a>(
        &'a self,
        layer: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a CompiledUnit)> + 'a {
        self.file
            .units
            .iter()
            .filter(move |(_, u)| u.layer == layer)
            .map(|(name, u)| (name.as_str(), u))
    }

    /// Decides whether `layer` can be skipped.
    ///
    /// Fresh means: the layer has a record with the same input fingerprint;
    /// every input exists and is no newer than the record's stamp; every unit
    /// the layer produced is still on disk; and no layer in `upstream` has
    /// run more recently than this one.
    pub fn is_layer_fresh(
        &self,
        layer: &str,
        fingerprint: ContentHash,
        inputs: &[PathBuf],
        upstream: &[&str],
    ) -> bool {
        let Some(record) = self.file.layers.get(layer) else {
            return false;
        };
        if record.fingerprint != fingerprint {
            tracing::debug!(layer, "input list changed");
            return false;
        }
        let stamp = FileTime::from(record.stamp);
        if !inputs
            .iter()
            .all(|input| matches!(mtime(input), Some(t) if t <= stamp))
        {
            tracing::debug!(layer, "inputs changed since last compile");
            return false;
        }
        if !self
            .units_of(layer)
            .all(|(_, unit)| self.class_dir.join(&unit.path).is_file())
        {
            tracing::debug!(layer, "compiled units missing from class directory");
            return false;
        }
        upstream.iter().all(|up| {
            let fresh = self
                .file
                .layers
                .get(*up)
                .is_some_and(|r| r.stamp <= record.stamp);
            if !fresh {
                tracing::debug!(layer, upstream = *up, "upstream layer rebuilt");
            }
            fresh
        })
    }

    /// Persists the store.
    pub fn save(&self) -> Result<(), CacheError> {
        std::fs::create_dir_all(&self.state_dir).map_err(|e| CacheError::Io {
            path: self.state_dir.clone(),
            source: e,
        })?;
        let path = self.state_dir.join(STORE_FILE);
        let json = serde_json::to_string_pretty(&self.file).map_err(|e| {
            CacheError::Serialization {
                reason: e.to_string(),
            }
        })?;
        std::fs::write(&path, json).map_err(|e| CacheError::Io { path, source: e })
    }
}

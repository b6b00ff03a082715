//! Timestamp-based up-to-date checks.
//!
//! [`UpToDate`] answers the question every stage guard asks: do all declared
//! targets exist, and is each at least as new as the sources it depends on?
//! Sources come in two flavours. Shared sources gate every target (a template
//! and the generator that expands it). Mapped sources gate only their own
//! target (`Foo.java` gates `Foo.class`).

use std::fs;
use std::path::{Path, PathBuf};

use filetime::FileTime;
use kiln_common::mtime;

/// Returns `true` if `dir` exists and contains at least one entry.
pub fn dir_is_populated(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

/// Builder for a single freshness decision.
#[derive(Debug, Default, Clone)]
pub struct UpToDate {
    shared_sources: Vec<PathBuf>,
    targets: Vec<PathBuf>,
    mapped: Vec<(PathBuf, PathBuf)>,
}

impl UpToDate {
    /// Starts an empty check. An empty check is trivially up to date.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a source that every target must be at least as new as.
    pub fn source(mut self, path: impl Into<PathBuf>) -> Self {
        self.shared_sources.push(path.into());
        self
    }

    /// Adds a target that must exist.
    pub fn target(mut self, path: impl Into<PathBuf>) -> Self {
        self.targets.push(path.into());
        self
    }

    /// Adds several targets that must exist.
    pub fn targets<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.targets.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Adds a source/target pair checked in isolation from the others.
    pub fn mapped(mut self, source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        self.mapped.push((source.into(), target.into()));
        self
    }

    /// Evaluates the check.
    ///
    /// A missing shared or mapped source counts as infinitely new, so a
    /// check naming it is never up to date.
    pub fn check(&self) -> bool {
        let mut shared = FileTime::zero();
        for src in &self.shared_sources {
            match mtime(src) {
                Some(t) => shared = shared.max(t),
                None => {
                    tracing::debug!(source = %src.display(), "source missing, stale");
                    return false;
                }
            }
        }

        let all_targets = self
            .targets
            .iter()
            .chain(self.mapped.iter().map(|(_, target)| target));
        for target in all_targets {
            match mtime(target) {
                Some(t) if t >= shared => {}
                _ => {
                    tracing::debug!(target = %target.display(), "target missing or older than shared sources");
                    return false;
                }
            }
        }

        self.mapped.iter().all(|(src, target)| {
            matches!((mtime(src), mtime(target)), (Some(s), Some(t)) if t >= s)
        })
    }

    /// Returns the mapped pairs whose target is missing or older than its
    /// source, ignoring shared sources.
    pub fn stale_mapped(&self) -> Vec<&(PathBuf, PathBuf)> {
        self.mapped
            .iter()
            .filter(|(src, target)| {
                !matches!((mtime(src), mtime(target)), (Some(s), Some(t)) if t >= s)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::set_file_mtime;

    fn write_at(path: &Path, secs: i64) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "x").unwrap();
        set_file_mtime(path, FileTime::from_unix_time(secs, 0)).unwrap();
    }

    #[test]
    fn populated_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!dir_is_populated(dir.path()));
        assert!(!dir_is_populated(&dir.path().join("missing")));
        write_at(&dir.path().join("f"), 1);
        assert!(dir_is_populated(dir.path()));
    }

    #[test]
    fn empty_check_is_up_to_date() {
        assert!(UpToDate::new().check());
    }

    #[test]
    fn all_targets_newer_than_shared_sources() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("PrimVector.template");
        let tool = dir.path().join("PreProcess.class");
        let a = dir.path().join("S8Vector.java");
        let b = dir.path().join("U8Vector.java");
        write_at(&template, 100);
        write_at(&tool, 150);
        write_at(&a, 200);
        write_at(&b, 200);

        let check = UpToDate::new()
            .source(&template)
            .source(&tool)
            .targets([&a, &b]);
        assert!(check.check());

        write_at(&template, 300);
        assert!(!check.check(), "touching a shared source invalidates all targets");
    }

    #[test]
    fn missing_target_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("t");
        write_at(&template, 100);
        let check = UpToDate::new()
            .source(&template)
            .target(dir.path().join("missing"));
        assert!(!check.check());
    }

    #[test]
    fn missing_source_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out");
        write_at(&target, 100);
        let check = UpToDate::new()
            .source(dir.path().join("missing"))
            .target(&target);
        assert!(!check.check());
    }

    #[test]
    fn mapped_pairs_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let a_src = dir.path().join("A.java");
        let a_out = dir.path().join("A.class");
        let b_src = dir.path().join("B.java");
        let b_out = dir.path().join("B.class");
        write_at(&a_src, 100);
        write_at(&a_out, 200);
        write_at(&b_src, 300);
        write_at(&b_out, 400);

        // A.class is older than B.java, which is fine for mapped pairs.
        let check = UpToDate::new().mapped(&a_src, &a_out).mapped(&b_src, &b_out);
        assert!(check.check());
        assert!(check.stale_mapped().is_empty());

        write_at(&a_src, 500);
        assert!(!check.check());
        let stale = check.stale_mapped();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].0, a_src);
    }
}

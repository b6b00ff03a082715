//! The `xcopy` task kind: copy with filename mapping and token filtering.
//!
//! Runs in-process. The overwrite policy is "overwrite false": a target at
//! least as new as its source is left alone, and a stale target whose
//! rendered content is unchanged only has its timestamp refreshed.

use std::fs;
use std::path::{Path, PathBuf};

use kiln_common::{mtime, touch};

use crate::error::PreprocessError;
use crate::filter::{FilterSet, GlobMapper};

/// One structured copy.
#[derive(Debug, Clone)]
pub struct CopySpec {
    /// Directory files are read from.
    pub from_dir: PathBuf,
    /// Directory files are written to; may equal `from_dir`.
    pub to_dir: PathBuf,
    /// Glob of file names to consider, relative to `from_dir`.
    pub include: String,
    /// Renames included files; unmapped files are not copied.
    pub mapper: GlobMapper,
    /// Filter sets applied in order.
    pub filters: Vec<FilterSet>,
}

/// What a copy did, per target.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CopyReport {
    /// Targets written with new content.
    pub written: Vec<PathBuf>,
    /// Stale targets whose content was already right.
    pub refreshed: Vec<PathBuf>,
    /// Targets already up to date.
    pub unchanged: Vec<PathBuf>,
}

impl CopySpec {
    /// Source/target pairs this copy would process, sorted by source.
    pub fn pairs(&self) -> Result<Vec<(PathBuf, PathBuf)>, PreprocessError> {
        let pattern = format!(
            "{}/{}",
            glob::Pattern::escape(&self.from_dir.to_string_lossy()),
            self.include
        );
        let paths = glob::glob(&pattern).map_err(|e| PreprocessError::Pattern {
            pattern: pattern.clone(),
            reason: e.to_string(),
        })?;

        let mut pairs = Vec::new();
        for path in paths.filter_map(Result::ok) {
            if !path.is_file() {
                continue;
            }
            let Ok(rel) = path.strip_prefix(&self.from_dir) else {
                continue;
            };
            let rel = rel.to_string_lossy().replace('\\', "/");
            if let Some(mapped) = self.mapper.map(&rel) {
                pairs.push((path.clone(), self.to_dir.join(mapped)));
            }
        }
        pairs.sort();
        Ok(pairs)
    }

    /// Runs the copy.
    pub fn run(&self) -> Result<CopyReport, PreprocessError> {
        if !self.from_dir.is_dir() {
            return Err(PreprocessError::MissingSourceDir {
                dir: self.from_dir.clone(),
            });
        }
        let mut report = CopyReport::default();
        for (source, target) in self.pairs()? {
            match (mtime(&source), mtime(&target)) {
                (Some(s), Some(t)) if t >= s => {
                    report.unchanged.push(target);
                    continue;
                }
                _ => {}
            }

            let text = fs::read_to_string(&source).map_err(|e| io_err(&source, e))?;
            let rendered = self
                .filters
                .iter()
                .fold(text, |acc, filter| filter.apply(&acc));

            if fs::read_to_string(&target).is_ok_and(|old| old == rendered) {
                touch(&target).map_err(|e| io_err(&target, e))?;
                report.refreshed.push(target);
                continue;
            }
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
            }
            fs::write(&target, rendered).map_err(|e| io_err(&target, e))?;
            tracing::debug!(target = %target.display(), "copied with filters");
            report.written.push(target);
        }
        Ok(report)
    }
}

fn io_err(path: &Path, source: std::io::Error) -> PreprocessError {
    PreprocessError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::{set_file_mtime, FileTime};

    fn spec(dir: &Path) -> CopySpec {
        CopySpec {
            from_dir: dir.to_path_buf(),
            to_dir: dir.to_path_buf(),
            include: "*.java.in".to_string(),
            mapper: GlobMapper::new("*Version.java.in", "*Version.java"),
            filters: vec![FilterSet::new("\"", "\"").token("VERSION", "\"1.0.0\"")],
        }
    }

    #[test]
    fn copies_only_mapped_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Version.java.in"), "v = \"VERSION\";\n").unwrap();
        fs::write(dir.path().join("Shell.java.in"), "class Shell {}\n").unwrap();

        let report = spec(dir.path()).run().unwrap();
        assert_eq!(report.written, vec![dir.path().join("Version.java")]);
        assert_eq!(
            fs::read_to_string(dir.path().join("Version.java")).unwrap(),
            "v = \"1.0.0\";\n"
        );
        assert!(!dir.path().join("Shell.java").exists());
    }

    #[test]
    fn fresh_target_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("Version.java.in");
        let dst = dir.path().join("Version.java");
        fs::write(&src, "v = \"VERSION\";\n").unwrap();
        fs::write(&dst, "hand edited").unwrap();
        set_file_mtime(&src, FileTime::from_unix_time(100, 0)).unwrap();
        set_file_mtime(&dst, FileTime::from_unix_time(200, 0)).unwrap();

        let report = spec(dir.path()).run().unwrap();
        assert_eq!(report.unchanged, vec![dst.clone()]);
        assert_eq!(fs::read_to_string(&dst).unwrap(), "hand edited");
    }

    #[test]
    fn stale_identical_target_is_only_touched() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("Version.java.in");
        let dst = dir.path().join("Version.java");
        fs::write(&src, "v = \"VERSION\";\n").unwrap();
        fs::write(&dst, "v = \"1.0.0\";\n").unwrap();
        set_file_mtime(&dst, FileTime::from_unix_time(100, 0)).unwrap();
        set_file_mtime(&src, FileTime::from_unix_time(200, 0)).unwrap();

        let report = spec(dir.path()).run().unwrap();
        assert_eq!(report.refreshed, vec![dst.clone()]);
        assert!(mtime(&dst).unwrap() >= FileTime::from_unix_time(200, 0));
    }

    #[test]
    fn missing_source_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = spec(&dir.path().join("kawa")).run().unwrap_err();
        assert!(matches!(err, PreprocessError::MissingSourceDir { .. }));
    }
}

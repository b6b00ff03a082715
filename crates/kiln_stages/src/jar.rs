//! Deterministic, update-in-place jar writing.
//!
//! A jar is rebuilt from the entries already in it plus the files selected
//! from a root directory; selected files win. Entries are written in sorted
//! order with a fixed timestamp, so unchanged inputs give a byte-identical
//! archive. The result replaces the old archive by rename.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::PackageError;

/// Name of the manifest entry.
pub const MANIFEST_ENTRY: &str = "META-INF/MANIFEST.MF";

const MANIFEST_HEADER: &str = "Manifest-Version: 1.0";

const MATCH: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// One jar to write.
#[derive(Debug, Clone)]
pub struct JarSpec {
    /// Destination archive.
    pub path: PathBuf,
    /// Directory the include patterns are matched against.
    pub root: PathBuf,
    /// Patterns over `/`-separated paths relative to `root`.
    pub includes: Vec<String>,
    /// Extra manifest attributes, if any.
    pub manifest: Option<PathBuf>,
}

impl JarSpec {
    /// Files under `root` selected by the include patterns, keyed by entry
    /// name.
    pub fn entries(&self) -> Result<BTreeMap<String, PathBuf>, PackageError> {
        let patterns = self
            .includes
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|e| PackageError::Archive {
                    path: self.path.clone(),
                    reason: format!("invalid include '{p}': {e}"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut found = BTreeMap::new();
        if !self.root.is_dir() {
            return Ok(found);
        }
        for entry in WalkDir::new(&self.root).into_iter().filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let name = rel.to_string_lossy().replace('\\', "/");
            if patterns.iter().any(|p| p.matches_with(&name, MATCH)) {
                found.insert(name, entry.path().to_path_buf());
            }
        }
        Ok(found)
    }

    /// Every file the jar is built from: the selected entries plus the
    /// manifest source.
    pub fn inputs(&self) -> Result<Vec<PathBuf>, PackageError> {
        let mut inputs: Vec<PathBuf> = self.entries()?.into_values().collect();
        inputs.extend(self.manifest.iter().filter(|m| m.is_file()).cloned());
        Ok(inputs)
    }

    /// Writes the jar and returns the number of file entries in it.
    pub fn write(&self) -> Result<usize, PackageError> {
        let mut contents = self.existing_entries()?;
        for (name, path) in self.entries()? {
            let data = fs::read(&path).map_err(|e| PackageError::Io { path, source: e })?;
            contents.insert(name, data);
        }
        let manifest = self.render_manifest()?;

        let dir = self.path.parent().unwrap_or(Path::new("."));
        fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| io_error(dir, e))?;

        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default());
        let mut writer = ZipWriter::new(tmp.as_file_mut());
        let archive_err = |e: zip::result::ZipError| self.archive_error(e);

        writer.add_directory("META-INF/", options).map_err(archive_err)?;
        writer.start_file(MANIFEST_ENTRY, options).map_err(archive_err)?;
        writer
            .write_all(manifest.as_bytes())
            .map_err(|e| io_error(&self.path, e))?;

        let mut dirs_written = vec!["META-INF/".to_string()];
        for (name, data) in &contents {
            for dir in parent_dirs(name) {
                if !dirs_written.contains(&dir) {
                    writer.add_directory(dir.as_str(), options).map_err(archive_err)?;
                    dirs_written.push(dir);
                }
            }
            writer.start_file(name.as_str(), options).map_err(archive_err)?;
            writer.write_all(data).map_err(|e| io_error(&self.path, e))?;
        }
        writer.finish().map_err(archive_err)?;

        tmp.persist(&self.path)
            .map_err(|e| io_error(&self.path, e.error))?;
        tracing::debug!(jar = %self.path.display(), entries = contents.len(), "wrote jar");
        Ok(contents.len())
    }

    /// File entries of the current archive, manifest excluded. A missing
    /// archive has none.
    fn existing_entries(&self) -> Result<BTreeMap<String, Vec<u8>>, PackageError> {
        let mut kept = BTreeMap::new();
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(kept),
            Err(e) => return Err(io_error(&self.path, e)),
        };
        let mut archive = ZipArchive::new(file).map_err(|e| self.archive_error(e))?;
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).map_err(|e| self.archive_error(e))?;
            if entry.is_dir() || entry.name() == MANIFEST_ENTRY {
                continue;
            }
            let name = entry.name().to_string();
            let mut data = Vec::with_capacity(entry.size() as usize);
            entry
                .read_to_end(&mut data)
                .map_err(|e| io_error(&self.path, e))?;
            kept.insert(name, data);
        }
        Ok(kept)
    }

    fn render_manifest(&self) -> Result<String, PackageError> {
        let mut out = format!("{MANIFEST_HEADER}\n");
        if let Some(path) = self.manifest.as_ref().filter(|m| m.is_file()) {
            let text = fs::read_to_string(path).map_err(|e| io_error(path, e))?;
            for line in text.lines() {
                if line.trim().is_empty() || line.starts_with("Manifest-Version:") {
                    continue;
                }
                out.push_str(line);
                out.push('\n');
            }
        }
        out.push('\n');
        Ok(out)
    }

    fn archive_error(&self, e: zip::result::ZipError) -> PackageError {
        PackageError::Archive {
            path: self.path.clone(),
            reason: e.to_string(),
        }
    }
}

/// `a/b/c.class` yields `a/` and `a/b/`.
fn parent_dirs(name: &str) -> Vec<String> {
    name.match_indices('/')
        .map(|(i, _)| name[..=i].to_string())
        .collect()
}

fn io_error(path: &Path, source: std::io::Error) -> PackageError {
    PackageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, rel: &str, data: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, data).unwrap();
    }

    fn names(jar: &Path) -> Vec<String> {
        let mut archive = ZipArchive::new(File::open(jar).unwrap()).unwrap();
        (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect()
    }

    fn read_entry(jar: &Path, name: &str) -> String {
        let mut archive = ZipArchive::new(File::open(jar).unwrap()).unwrap();
        let mut out = String::new();
        archive.by_name(name).unwrap().read_to_string(&mut out).unwrap();
        out
    }

    fn spec(dir: &Path, includes: &[&str]) -> JarSpec {
        JarSpec {
            path: dir.join("dist/out.jar"),
            root: dir.join("classes"),
            includes: includes.iter().map(|s| s.to_string()).collect(),
            manifest: None,
        }
    }

    #[test]
    fn selects_by_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let classes = dir.path().join("classes");
        write(&classes, "gnu/lists/FVector.class", "a");
        write(&classes, "gnu/kawa/ant/Kawac.class", "b");
        write(&classes, "gnu/lists/FVector.java", "c");
        write(&classes, "org/other/X.class", "d");

        let all = spec(dir.path(), &["gnu/**/*.class"]).entries().unwrap();
        assert_eq!(all.len(), 2);

        let ant = spec(dir.path(), &["gnu/kawa/ant/*.class"]).entries().unwrap();
        assert_eq!(ant.keys().collect::<Vec<_>>(), vec!["gnu/kawa/ant/Kawac.class"]);
    }

    #[test]
    fn single_star_stays_in_one_directory() {
        let dir = tempfile::tempdir().unwrap();
        let classes = dir.path().join("classes");
        write(&classes, "gnu/kawa/ant/sub/Inner.class", "x");
        let entries = spec(dir.path(), &["gnu/kawa/ant/*.class"]).entries().unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn manifest_first_and_entries_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let classes = dir.path().join("classes");
        write(&classes, "kawa/repl.class", "r");
        write(&classes, "gnu/expr/Compilation.class", "c");
        write(dir.path(), "jar-manifest", "Main-Class: kawa.repl\n");
        let mut jar = spec(dir.path(), &["gnu/**/*.class", "kawa/**/*.class"]);
        jar.manifest = Some(dir.path().join("jar-manifest"));

        assert_eq!(jar.write().unwrap(), 2);
        let names = names(&jar.path);
        assert_eq!(names[0], "META-INF/");
        assert_eq!(names[1], MANIFEST_ENTRY);
        let files: Vec<_> = names.iter().filter(|n| !n.ends_with('/')).collect();
        assert_eq!(
            files,
            vec![MANIFEST_ENTRY, "gnu/expr/Compilation.class", "kawa/repl.class"]
        );
        let manifest = read_entry(&jar.path, MANIFEST_ENTRY);
        assert!(manifest.starts_with("Manifest-Version: 1.0\n"));
        assert!(manifest.contains("Main-Class: kawa.repl"));
    }

    #[test]
    fn update_keeps_old_entries_and_overrides_changed() {
        let dir = tempfile::tempdir().unwrap();
        let classes = dir.path().join("classes");
        write(&classes, "gnu/A.class", "old");
        write(&classes, "gnu/B.class", "b");
        let jar = spec(dir.path(), &["gnu/**/*.class"]);
        jar.write().unwrap();

        fs::remove_file(classes.join("gnu/B.class")).unwrap();
        write(&classes, "gnu/A.class", "new");
        assert_eq!(jar.write().unwrap(), 2);
        assert_eq!(read_entry(&jar.path, "gnu/A.class"), "new");
        assert_eq!(read_entry(&jar.path, "gnu/B.class"), "b");
    }

    #[test]
    fn unchanged_inputs_give_identical_bytes() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("classes"), "gnu/A.class", "a");
        let jar = spec(dir.path(), &["gnu/**/*.class"]);
        jar.write().unwrap();
        let first = fs::read(&jar.path).unwrap();
        jar.write().unwrap();
        assert_eq!(fs::read(&jar.path).unwrap(), first);
    }

    #[test]
    fn corrupt_existing_jar_is_archive_error() {
        let dir = tempfile::tempdir().unwrap();
        let jar = spec(dir.path(), &["gnu/**/*.class"]);
        write(dir.path(), "dist/out.jar", "not a zip");
        assert!(matches!(jar.write(), Err(PackageError::Archive { .. })));
    }

    #[test]
    fn parent_dirs_of_entry() {
        assert_eq!(parent_dirs("a/b/c.class"), vec!["a/", "a/b/"]);
        assert!(parent_dirs("top.class").is_empty());
    }
}

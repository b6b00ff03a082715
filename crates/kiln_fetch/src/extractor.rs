//! Unpacking of the fetched archive into the workspace.

use std::ffi::OsString;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;

use crate::error::ExtractError;

/// Result of [`extract`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extraction {
    /// `dest_dir` already had content; nothing was unpacked.
    Skipped,
    /// The archive was unpacked.
    Unpacked {
        /// Number of archive entries written.
        entries: usize,
    },
}

/// Unpacks the archive's top-level directory into `dest_dir`.
///
/// The archive must contain a root directory with the same name as
/// `dest_dir` (`kawa-<version>/`). A `dest_dir` that exists and is non-empty
/// is taken as already extracted. Entries are unpacked into a sibling
/// staging directory first, and the root is moved into place only after the
/// whole archive was read.
pub fn extract(archive: &Path, dest_dir: &Path) -> Result<Extraction, ExtractError> {
    if has_entries(dest_dir) {
        tracing::debug!(dir = %dest_dir.display(), "already extracted");
        return Ok(Extraction::Skipped);
    }

    let root_name = dest_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parent = dest_dir.parent().unwrap_or(Path::new("."));
    let staging = staging_dir(dest_dir);

    if staging.exists() {
        fs::remove_dir_all(&staging).map_err(|e| io_err(&staging, e))?;
    }
    fs::create_dir_all(&staging).map_err(|e| io_err(&staging, e))?;

    let entries = match unpack(archive, &staging) {
        Ok(n) => n,
        Err(e) => {
            let _ = fs::remove_dir_all(&staging);
            return Err(e);
        }
    };

    let unpacked_root = staging.join(&root_name);
    if !unpacked_root.is_dir() {
        let _ = fs::remove_dir_all(&staging);
        return Err(ExtractError::MissingRoot {
            archive: archive.to_path_buf(),
            expected: root_name,
        });
    }

    fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    if dest_dir.exists() {
        fs::remove_dir_all(dest_dir).map_err(|e| io_err(dest_dir, e))?;
    }
    fs::rename(&unpacked_root, dest_dir).map_err(|e| io_err(dest_dir, e))?;
    fs::remove_dir_all(&staging).map_err(|e| io_err(&staging, e))?;

    tracing::info!(dir = %dest_dir.display(), entries, "extracted");
    Ok(Extraction::Unpacked { entries })
}

fn has_entries(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|mut it| it.next().is_some())
        .unwrap_or(false)
}

/// `<parent>/.<name>.extracting`
fn staging_dir(dest_dir: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(dest_dir.file_name().unwrap_or_default());
    name.push(".extracting");
    dest_dir.with_file_name(name)
}

fn unpack(archive: &Path, staging: &Path) -> Result<usize, ExtractError> {
    let corrupt = |source| ExtractError::Corrupt {
        archive: archive.to_path_buf(),
        source,
    };
    let file = File::open(archive).map_err(|e| io_err(archive, e))?;
    let mut tar = tar::Archive::new(GzDecoder::new(file));
    tar.set_preserve_mtime(true);

    let mut count = 0;
    for entry in tar.entries().map_err(corrupt)? {
        let mut entry = entry.map_err(corrupt)?;
        entry.unpack_in(staging).map_err(|e| io_err(staging, e))?;
        count += 1;
    }
    Ok(count)
}

fn io_err(path: &Path, source: std::io::Error) -> ExtractError {
    ExtractError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    fn write_archive(path: &Path, files: &[(&str, &str)]) {
        let gz = GzEncoder::new(File::create(path).unwrap(), Compression::fast());
        let mut builder = tar::Builder::new(gz);
        for (name, body) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(body.len() as u64);
            header.set_mode(0o644);
            header.set_mtime(1_000_000);
            header.set_cksum();
            builder.append_data(&mut header, name, body.as_bytes()).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn unpacks_root_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("kawa-1.0.0.tar.gz");
        write_archive(
            &archive,
            &[
                ("kawa-1.0.0/kawa/Version.java.in", "class Version {}"),
                ("kawa-1.0.0/gnu/lists/PrimVector.template", "template"),
            ],
        );
        let dest = dir.path().join("kawa-1.0.0");

        let out = extract(&archive, &dest).unwrap();
        assert_eq!(out, Extraction::Unpacked { entries: 2 });
        assert!(dest.join("kawa/Version.java.in").is_file());
        assert!(!staging_dir(&dest).exists());
    }

    #[test]
    fn populated_destination_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("kawa-1.0.0");
        fs::create_dir_all(&dest).unwrap();
        fs::write(dest.join("marker"), "x").unwrap();
        let out = extract(&dir.path().join("absent.tar.gz"), &dest).unwrap();
        assert_eq!(out, Extraction::Skipped);
    }

    #[test]
    fn wrong_root_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("kawa-1.0.0.tar.gz");
        write_archive(&archive, &[("something-else/README", "hi")]);
        let dest = dir.path().join("kawa-1.0.0");

        let err = extract(&archive, &dest).unwrap_err();
        assert!(matches!(err, ExtractError::MissingRoot { .. }));
        assert!(!dest.exists());
    }

    #[test]
    fn corrupt_archive_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("kawa-1.0.0.tar.gz");
        fs::write(&archive, b"definitely not gzip").unwrap();
        let dest = dir.path().join("kawa-1.0.0");

        let err = extract(&archive, &dest).unwrap_err();
        assert!(matches!(err, ExtractError::Corrupt { .. }));
        assert!(!dest.exists());
        assert!(!staging_dir(&dest).exists());
    }

    #[test]
    fn leftover_staging_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("kawa-1.0.0.tar.gz");
        write_archive(&archive, &[("kawa-1.0.0/build.xml", "<project/>")]);
        let dest = dir.path().join("kawa-1.0.0");
        let staging = staging_dir(&dest);
        fs::create_dir_all(staging.join("kawa-1.0.0/half")).unwrap();

        extract(&archive, &dest).unwrap();
        assert!(dest.join("build.xml").is_file());
        assert!(!dest.join("half").exists());
    }
}

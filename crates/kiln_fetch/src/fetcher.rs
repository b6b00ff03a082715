//! Atomic download of the source archive into the workspace.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use kiln_common::Workspace;

use crate::error::FetchError;
use crate::transport::Transport;

const PART_SUFFIX: &str = ".part";
const CHUNK: usize = 64 * 1024;

/// Where an archive comes from and where it lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveHandle {
    /// Remote location.
    pub url: String,
    /// Final local path.
    pub local: PathBuf,
    /// In-progress path, a sibling of `local`.
    pub partial: PathBuf,
}

impl ArchiveHandle {
    /// Derives the handle for a workspace: `<base_url>/kawa-<version>.tar.gz`.
    pub fn for_workspace(base_url: &str, workspace: &Workspace) -> Self {
        let local = workspace.archive_path();
        let mut partial = local.clone().into_os_string();
        partial.push(PART_SUFFIX);
        Self {
            url: format!(
                "{}/{}",
                base_url.trim_end_matches('/'),
                workspace.archive_name()
            ),
            local,
            partial: partial.into(),
        }
    }
}

/// Result of [`fetch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fetched {
    /// The archive was already present; nothing was transferred.
    Cached,
    /// The archive was downloaded.
    Downloaded {
        /// Bytes written.
        bytes: u64,
    },
}

/// Downloads the archive unless it is already present.
///
/// Bytes go to `handle.partial`, which is renamed to `handle.local` only
/// after the stream ended cleanly. On failure the partial file is removed and
/// the final path is never created.
pub fn fetch(handle: &ArchiveHandle, transport: &dyn Transport) -> Result<Fetched, FetchError> {
    if handle.local.is_file() {
        tracing::debug!(path = %handle.local.display(), "archive cached");
        return Ok(Fetched::Cached);
    }
    if let Some(parent) = handle.local.parent() {
        fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }

    tracing::info!(url = %handle.url, "downloading");
    let mut reader = transport.open(&handle.url)?;
    let result = stream_to(&mut reader, &handle.url, &handle.partial);
    let bytes = match result {
        Ok(bytes) => bytes,
        Err(e) => {
            let _ = fs::remove_file(&handle.partial);
            return Err(e);
        }
    };

    fs::rename(&handle.partial, &handle.local).map_err(|e| io_err(&handle.local, e))?;
    tracing::info!(path = %handle.local.display(), bytes, "archive saved");
    Ok(Fetched::Downloaded { bytes })
}

fn stream_to(reader: &mut dyn Read, url: &str, partial: &Path) -> Result<u64, FetchError> {
    let mut out = File::create(partial).map_err(|e| io_err(partial, e))?;
    let mut buf = vec![0u8; CHUNK];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(FetchError::Interrupted {
                    url: url.to_string(),
                    source: e,
                })
            }
        };
        out.write_all(&buf[..n]).map_err(|e| io_err(partial, e))?;
        total += n as u64;
    }
    out.sync_all().map_err(|e| io_err(partial, e))?;
    Ok(total)
}

fn io_err(path: &Path, source: std::io::Error) -> FetchError {
    FetchError::Io {
        path: path.to_path_buf(),
        source,
    }
}

//! Byte-stream sources for archive downloads.

use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;

use crate::error::FetchError;

/// Opens a URL as a readable byte stream.
///
/// One GET-equivalent request per call. Implementations report a missing
/// resource as [`FetchError::NotFound`]; errors while reading the returned
/// stream are surfaced by the fetcher as interruptions.
pub trait Transport {
    /// Opens `url` for reading.
    fn open(&self, url: &str) -> Result<Box<dyn Read>, FetchError>;
}

/// HTTP and HTTPS through `ureq`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpTransport;

impl Transport for HttpTransport {
    fn open(&self, url: &str) -> Result<Box<dyn Read>, FetchError> {
        match ureq::get(url).call() {
            Ok(response) => Ok(Box::new(response.into_reader())),
            Err(ureq::Error::Status(404, _)) => Err(FetchError::NotFound {
                url: url.to_string(),
            }),
            Err(ureq::Error::Status(code, _)) => Err(FetchError::Status {
                url: url.to_string(),
                code,
            }),
            Err(ureq::Error::Transport(e)) => Err(FetchError::Transport {
                url: url.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

/// Local files addressed as `file:///abs/path`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileTransport;

impl FileTransport {
    fn path_of(url: &str) -> Option<PathBuf> {
        url.strip_prefix("file://").map(PathBuf::from)
    }
}

impl Transport for FileTransport {
    fn open(&self, url: &str) -> Result<Box<dyn Read>, FetchError> {
        let path = Self::path_of(url).ok_or_else(|| FetchError::UnsupportedScheme {
            url: url.to_string(),
        })?;
        match File::open(&path) {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(FetchError::NotFound {
                url: url.to_string(),
            }),
            Err(e) => Err(FetchError::Transport {
                url: url.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

/// Picks the transport for `url` by scheme.
pub fn transport_for(url: &str) -> Result<Box<dyn Transport>, FetchError> {
    let scheme = url.split_once("://").map(|(s, _)| s.to_ascii_lowercase());
    match scheme.as_deref() {
        Some("http" | "https") => Ok(Box::new(HttpTransport)),
        Some("file") => Ok(Box::new(FileTransport)),
        _ => Err(FetchError::UnsupportedScheme {
            url: url.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_selection() {
        assert!(transport_for("https://ftp.gnu.org/pub/gnu/kawa/kawa-3.1.1.tar.gz").is_ok());
        assert!(transport_for("HTTP://mirror/kawa-3.1.1.tar.gz").is_ok());
        assert!(transport_for("file:///srv/mirror/kawa-3.1.1.tar.gz").is_ok());
        let err = transport_for("ftp://ftp.gnu.org/pub/gnu/kawa/kawa-3.1.1.tar.gz")
            .err()
            .unwrap();
        assert!(matches!(err, FetchError::UnsupportedScheme { .. }));
        assert!(transport_for("no-scheme").is_err());
    }

    #[test]
    fn file_transport_reads_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.tar.gz");
        std::fs::write(&path, b"payload").unwrap();
        let url = format!("file://{}", path.display());

        let mut buf = Vec::new();
        FileTransport.open(&url).unwrap().read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"payload");
    }

    #[test]
    fn file_transport_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("file://{}", dir.path().join("missing.tar.gz").display());
        let err = FileTransport.open(&url).err().unwrap();
        assert!(matches!(err, FetchError::NotFound { .. }));
    }
}

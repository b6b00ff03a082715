//! Error types for fetching and extracting archives.

use std::path::PathBuf;

/// Errors raised while downloading a source archive.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The URL scheme has no transport.
    #[error("unsupported URL scheme in '{url}' (expected http, https or file)")]
    UnsupportedScheme {
        /// The rejected URL.
        url: String,
    },

    /// The remote resource does not exist.
    #[error("archive not found at {url}")]
    NotFound {
        /// The requested URL.
        url: String,
    },

    /// The server answered with a non-success status.
    #[error("fetching {url} failed with HTTP status {code}")]
    Status {
        /// The requested URL.
        url: String,
        /// The HTTP status code.
        code: u16,
    },

    /// The connection could not be established.
    #[error("fetching {url} failed: {reason}")]
    Transport {
        /// The requested URL.
        url: String,
        /// Description of the transport failure.
        reason: String,
    },

    /// The stream broke off before the transfer finished.
    #[error("transfer of {url} interrupted: {source}")]
    Interrupted {
        /// The requested URL.
        url: String,
        /// The read error that ended the stream.
        source: std::io::Error,
    },

    /// Writing the download to disk failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The path being written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors raised while unpacking a source archive.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The archive could not be read as a gzip'd tar.
    #[error("corrupt archive {archive}: {source}")]
    Corrupt {
        /// The archive being read.
        archive: PathBuf,
        /// The decoding error.
        source: std::io::Error,
    },

    /// The archive unpacked, but not into the expected root directory.
    #[error("archive {archive} has no top-level '{expected}' directory")]
    MissingRoot {
        /// The archive being read.
        archive: PathBuf,
        /// Name of the expected root directory.
        expected: String,
    },

    /// The destination could not be written.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The path being written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display() {
        let err = FetchError::Status {
            url: "https://ftp.gnu.org/pub/gnu/kawa/kawa-1.0.tar.gz".to_string(),
            code: 503,
        };
        let msg = err.to_string();
        assert!(msg.contains("503"));
        assert!(msg.contains("kawa-1.0.tar.gz"));
    }

    #[test]
    fn missing_root_display() {
        let err = ExtractError::MissingRoot {
            archive: PathBuf::from("/c/1.0/kawa-1.0.tar.gz"),
            expected: "kawa-1.0".to_string(),
        };
        assert!(err.to_string().contains("'kawa-1.0'"));
    }
}

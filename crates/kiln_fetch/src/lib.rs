//! Retrieval and unpacking of toolchain source archives.
//!
//! [`fetch`] downloads `<base>/kawa-<version>.tar.gz` into the workspace
//! through a [`Transport`], writing to a `.part` file and renaming it only
//! once the transfer completed. [`extract`] unpacks the archive root into the
//! workspace through a staging directory so a half-extracted tree is never
//! mistaken for a finished one.

#![warn(missing_docs)]

pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod transport;

pub use error::{ExtractError, FetchError};
pub use extractor::{extract, Extraction};
pub use fetcher::{fetch, ArchiveHandle, Fetched};
pub use transport::{transport_for, FileTransport, HttpTransport, Transport};

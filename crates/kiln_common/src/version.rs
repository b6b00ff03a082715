//! The pinned toolchain release identifier.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A toolchain release identifier such as `"3.1.1"`.
///
/// The string is otherwise opaque, but it is spliced into archive names,
/// cache subdirectories and artifact names, so it must be non-empty and must
/// not contain whitespace or path separators.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version(String);

/// Reasons a version string is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    /// The version string was empty.
    #[error("version must not be empty")]
    Empty,

    /// The version string contained a character that cannot appear in an
    /// archive file name.
    #[error("version '{version}' contains invalid character {ch:?}")]
    InvalidChar {
        /// The rejected version string.
        version: String,
        /// The first offending character.
        ch: char,
    },
}

impl Version {
    /// Validates and wraps a version string.
    pub fn new(version: impl Into<String>) -> Result<Self, VersionError> {
        let version = version.into();
        if version.is_empty() {
            return Err(VersionError::Empty);
        }
        if let Some(ch) = version
            .chars()
            .find(|c| c.is_whitespace() || matches!(c, '/' | '\\' | ':'))
        {
            return Err(VersionError::InvalidChar { version, ch });
        }
        Ok(Self(version))
    }

    /// Returns the version as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Version {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Version> for String {
    fn from(v: Version) -> Self {
        v.0
    }
}

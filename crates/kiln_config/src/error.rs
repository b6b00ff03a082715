//! Error types for configuration loading and validation.

use kiln_common::VersionError;

/// Errors detected before any pipeline stage runs.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    /// An I/O error occurred while reading the configuration file.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A required setting was supplied by neither the file, the command line
    /// nor the environment.
    #[error("missing required setting: {0}")]
    MissingField(String),

    /// The toolchain version is not usable in archive and directory names.
    #[error("invalid toolchain version: {0}")]
    InvalidVersion(#[from] VersionError),

    /// A configuration value failed validation.
    #[error("validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_missing_field() {
        let err = ConfigurationError::MissingField("toolchain.version".to_string());
        assert_eq!(format!("{err}"), "missing required setting: toolchain.version");
    }

    #[test]
    fn display_parse_error() {
        let err = ConfigurationError::ParseError("expected '=' at line 3".to_string());
        assert_eq!(
            format!("{err}"),
            "failed to parse configuration: expected '=' at line 3"
        );
    }

    #[test]
    fn display_invalid_version() {
        let err = ConfigurationError::from(VersionError::Empty);
        assert_eq!(
            format!("{err}"),
            "invalid toolchain version: version must not be empty"
        );
    }

    #[test]
    fn display_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = ConfigurationError::IoError(io_err);
        assert!(format!("{err}").starts_with("failed to read configuration:"));
    }
}

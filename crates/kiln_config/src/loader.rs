//! Configuration file loading and validation.

use crate::error::ConfigurationError;
use crate::types::KilnConfig;
use std::path::Path;

/// Name of the configuration file looked up in a project directory.
pub const CONFIG_FILE: &str = "kiln.toml";

/// Loads and validates `kiln.toml` from a project directory.
pub fn load_config(project_dir: &Path) -> Result<KilnConfig, ConfigurationError> {
    let config_path = project_dir.join(CONFIG_FILE);
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `kiln.toml` configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<KilnConfig, ConfigurationError> {
    let config: KilnConfig =
        toml::from_str(content).map_err(|e| ConfigurationError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Rejects values that are present but unusable.
fn validate_config(config: &KilnConfig) -> Result<(), ConfigurationError> {
    if let Some(url) = &config.toolchain.fetch_base_url {
        if url.trim().is_empty() {
            return Err(ConfigurationError::ValidationError(
                "toolchain.fetch_base_url must not be empty".to_string(),
            ));
        }
    }
    if let Some(lang) = &config.compile.language {
        if lang.trim().is_empty() {
            return Err(ConfigurationError::ValidationError(
                "compile.language must not be empty".to_string(),
            ));
        }
    }
    Ok(())
}

//! Parsing and validation of `kiln.toml` and resolution of build settings.
//!
//! The file is optional: every field can also come from the command line or
//! the environment. [`resolve_settings`] merges those sources into the small,
//! validated [`Settings`] record the pipeline consumes.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigurationError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE};
pub use resolve::{
    resolve_compile_settings, resolve_settings, CompileOverrides, CompileSettings, Overrides,
    Settings, DEFAULT_FETCH_BASE_URL,
};
pub use types::*;

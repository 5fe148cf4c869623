//! Errors from loading, validating and saving `config.toml`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to encode config: {0}")]
    Encode(#[from] toml::ser::Error),

    /// The platform offers no home/config directory to derive defaults from.
    #[error("No platform config directory available")]
    NoPlatformDirs,

    /// `set-dir` was given an area name with no storage slot.
    #[error("Unknown storage area '{0}' (expected stage, original, template, thumbnails or scratch)")]
    UnknownArea(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

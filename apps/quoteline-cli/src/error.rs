//! # CLI Error Types
//!
//! Configuration failures. Everything else is reported through `anyhow` in
//! `main`, with context attached at the call site.

use thiserror::Error;

use quoteline_core::{CoreError, ValidationError};

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value with no built-in default was never supplied.
    #[error("{field} is not configured. Set it in quoteline.toml, via {env}, or with {flag}")]
    MissingRequired {
        field: &'static str,
        env: &'static str,
        flag: &'static str,
    },

    /// A value was supplied but cannot be used.
    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to write config file: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

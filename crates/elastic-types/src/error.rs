//! Error types for configuration loading and validation.

use thiserror::Error;

/// Errors raised while loading or validating settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The layered configuration could not be built or deserialized
    #[error("Configuration error: {0}")]
    Load(String),

    /// A setting holds a value the benchmark cannot run with
    #[error("Invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::Load(err.to_string())
    }
}

//! Error types for config loading and validation.

use thiserror::Error;

/// Errors returned while loading or validating a trawl config.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading a config file failed.
    #[error("failed to read config: {0}")]
    ReadFailed(#[from] std::io::Error),
    /// Parsing JSON5 contents failed.
    #[error("failed to parse config: {0}")]
    ParseFailed(#[from] json5::Error),
    /// Converting the merged JSON value into typed config failed.
    #[error("failed to decode config: {0}")]
    DecodeFailed(#[from] serde_json::Error),
    /// A specific field failed schema validation.
    #[error("invalid config at {path}: {message}")]
    InvalidField { path: String, message: String },
    /// A cross-field invariant does not hold.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// Error types for recorder option loading

use reqtrail_core::ConfigurationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load recorder options: {0}")]
    LoadError(String),

    #[error("Failed to parse recorder options: {0}")]
    ParseError(String),

    #[error("Invalid environment variable {key}: {reason}")]
    EnvError { key: String, reason: String },

    #[error("Recorder options have the wrong shape: {0}")]
    DeserializationError(String),

    /// Options parsed but failed validation
    #[error(transparent)]
    Invalid(#[from] ConfigurationError),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

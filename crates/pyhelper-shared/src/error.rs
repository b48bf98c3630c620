//! Error types for pyhelper

use thiserror::Error;

/// Main error type for pyhelper operations
#[derive(Debug, Error)]
pub enum HelperError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Result type alias for pyhelper operations
pub type Result<T> = std::result::Result<T, HelperError>;

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid configuration format: {message}")]
    InvalidFormat { message: String },

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Unknown rule selector: {selector}")]
    UnknownRule { selector: String },

    #[error("Rule {code} cannot be {action}")]
    UnsupportedRule { code: String, action: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(error: config::ConfigError) -> Self {
        ConfigError::InvalidFormat {
            message: error.to_string(),
        }
    }
}

impl From<ConfigError> for HelperError {
    fn from(error: ConfigError) -> Self {
        match error {
            ConfigError::FileNotFound { path } => HelperError::NotFound { resource: path },
            ConfigError::InvalidFormat { message } => HelperError::Config { message },
            other => HelperError::InvalidConfiguration {
                message: other.to_string(),
            },
        }
    }
}

impl From<config::ConfigError> for HelperError {
    fn from(error: config::ConfigError) -> Self {
        ConfigError::from(error).into()
    }
}

impl From<toml::ser::Error> for HelperError {
    fn from(error: toml::ser::Error) -> Self {
        HelperError::Serialization {
            message: error.to_string(),
        }
    }
}

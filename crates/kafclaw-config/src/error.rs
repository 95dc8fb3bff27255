//! Configuration error types.

use thiserror::Error;

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config file could not be read from disk.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path of the file that could not be read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A config file's contents could not be parsed as TOML.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path of the file that failed to parse (or a synthetic
        /// placeholder such as `<embedded defaults>`).
        path: String,
        /// Underlying TOML parse error.
        #[source]
        source: toml::de::Error,
    },

    /// The merged configuration failed a validation rule.
    #[error("invalid configuration: {field}: {message}")]
    ValidationError {
        /// Dotted path of the offending field.
        field: String,
        /// Human-readable explanation.
        message: String,
    },

    /// The user's home directory could not be determined, so the user
    /// config layer cannot be located.
    #[error("could not determine home directory")]
    NoHomeDir,
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

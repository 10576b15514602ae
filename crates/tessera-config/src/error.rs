//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The named file does not exist.
    #[error("no config file at {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The file exists but could not be read.
    #[error("cannot read config file {path}")]
    ReadError {
        /// Path to the file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Malformed TOML.
    #[error("bad TOML config: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Malformed JSON.
    #[error("bad JSON config: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Neither TOML nor JSON.
    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// A value failed validation.
    #[error("{field}: {reason}")]
    InvalidValue {
        /// Dotted field path.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// An override variable did not parse.
    #[error("environment override {var}: {reason}")]
    EnvParseError {
        /// The variable name.
        var: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Failed to load a `.env` file.
    #[error("failed to load .env file: {0}")]
    Dotenv(String),
}

impl ConfigError {
    /// File not found.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// File read failure.
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadError {
            path: path.into(),
            source,
        }
    }

    /// Invalid value.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Bad environment variable.
    pub fn env_parse_error(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvParseError {
            var: var.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_names_path() {
        let err = ConfigError::file_not_found("/etc/tessera.toml");
        assert_eq!(err.to_string(), "no config file at /etc/tessera.toml");
    }

    #[test]
    fn test_invalid_value_names_field() {
        let err = ConfigError::invalid_value("server.http_addr", "not a socket address");
        assert_eq!(err.to_string(), "server.http_addr: not a socket address");
    }

    #[test]
    fn test_env_parse_error() {
        let err = ConfigError::env_parse_error("TESSERA__SERVER__MAX_BODY_BYTES", "expected integer");
        assert!(err.to_string().contains("TESSERA__SERVER__MAX_BODY_BYTES"));
        assert!(err.to_string().contains("expected integer"));
    }
}

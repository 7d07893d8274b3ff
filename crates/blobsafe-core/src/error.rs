//! Error types module
//!
//! Configuration errors raised while reading, parsing and validating the
//! bucket configuration. Every bucket-level variant names the identifier of
//! the offending config entry so operators can find it.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected conditions
    Debug,
    /// Warning level - for recoverable issues
    Warn,
    /// Error level - for failures that abort a run
    Error,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("config file {path} has an invalid format: {source}")]
    InvalidFormat {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config for bucket '{identifier}': {reason}")]
    InvalidBucket { identifier: String, reason: String },

    #[error("Invalid storage backend: {0}")]
    InvalidStorageBackend(String),

    #[error("Invalid execution strategy: {0}")]
    InvalidExecutionStrategy(String),
}

impl ConfigError {
    pub fn invalid_bucket(identifier: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidBucket {
            identifier: identifier.to_string(),
            reason: reason.into(),
        }
    }
}

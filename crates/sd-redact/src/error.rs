//! Error types for the redaction engine.
//!
//! Detection and traversal are infallible; errors only come from the
//! configuration boundary and from serialization.

use thiserror::Error;

/// Result type for redaction operations.
pub type Result<T> = std::result::Result<T, RedactionError>;

/// Errors that can occur while configuring or serializing redaction.
#[derive(Error, Debug)]
pub enum RedactionError {
    /// A caller-supplied pattern failed to compile.
    #[error("pattern error: {0}")]
    PatternError(String),

    /// The redaction configuration is invalid.
    #[error("config error: {0}")]
    ConfigError(String),

    /// I/O error during config file operations.
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization error.
    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl RedactionError {
    /// Wrap a regex compilation failure for the given pattern source.
    pub(crate) fn pattern(source: &str, err: &regex::Error) -> Self {
        RedactionError::PatternError(format!("`{}`: {}", source, err))
    }
}

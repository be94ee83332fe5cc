//! File-loadable redaction configuration.
//!
//! `RedactionConfig` is the serializable subset of [`RedactionOptions`]:
//! everything except the function-valued hooks. Field-name patterns are
//! stored as regex sources and compiled (case-insensitively) when the config
//! is turned into options.

use crate::error::{RedactionError, Result};
use crate::matcher::{compile_regex, CompileFlags};
use crate::options::{
    RedactedValue, RedactionOptions, DEFAULT_MAX_DEPTH, DEFAULT_MAX_STRING_LENGTH, REDACTED,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Schema version for the config file.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";

/// Serializable redaction configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedactionConfig {
    /// Schema version.
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    /// Deepest container depth whose entries are classified.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Walk nested containers.
    #[serde(default = "default_true")]
    pub deep: bool,

    /// Extra field-name patterns (regex sources).
    #[serde(default)]
    pub extra_field_patterns: Vec<String>,

    /// Keep the shape of sensitive containers.
    #[serde(default)]
    pub preserve_structure: bool,

    /// Replacement text for redacted values.
    #[serde(default = "default_redacted_value")]
    pub redacted_value: String,

    /// Strings longer than this are truncated.
    #[serde(default = "default_max_string_length")]
    pub max_string_length: usize,

    /// Check string content against sensitive patterns.
    #[serde(default = "default_true")]
    pub check_content: bool,
}

fn default_schema_version() -> String {
    CONFIG_SCHEMA_VERSION.to_string()
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_true() -> bool {
    true
}

fn default_redacted_value() -> String {
    REDACTED.to_string()
}

fn default_max_string_length() -> usize {
    DEFAULT_MAX_STRING_LENGTH
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            max_depth: DEFAULT_MAX_DEPTH,
            deep: true,
            extra_field_patterns: Vec::new(),
            preserve_structure: false,
            redacted_value: default_redacted_value(),
            max_string_length: DEFAULT_MAX_STRING_LENGTH,
            check_content: true,
        }
    }
}

impl RedactionConfig {
    /// Create a config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load config from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_json(&content)?;
        debug!(
            path = %path.display(),
            schema_version = %config.schema_version,
            extra_patterns = config.extra_field_patterns.len(),
            "Redaction config loaded"
        );
        Ok(config)
    }

    /// Save config to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate and compile patterns into runtime options.
    pub fn into_options(self) -> Result<RedactionOptions> {
        if self.max_string_length == 0 {
            return Err(RedactionError::ConfigError(
                "max_string_length must be at least 1".to_string(),
            ));
        }

        let extra_patterns = self
            .extra_field_patterns
            .iter()
            .map(|source| compile_regex(source, CompileFlags::default()))
            .collect::<Result<Vec<_>>>()?;

        Ok(RedactionOptions {
            max_depth: self.max_depth,
            deep: self.deep,
            extra_patterns,
            custom_redactor: None,
            preserve_structure: self.preserve_structure,
            redacted_value: RedactedValue::Fixed(self.redacted_value),
            max_string_length: self.max_string_length,
            check_content: self.check_content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RedactionConfig::default();
        assert_eq!(config.schema_version, CONFIG_SCHEMA_VERSION);
        assert_eq!(config.max_depth, 10);
        assert_eq!(config.redacted_value, "[REDACTED]");
        assert!(config.deep);
        assert!(config.check_content);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = RedactionConfig::from_json(r#"{"max_depth": 4, "redacted_value": "***"}"#).unwrap();
        assert_eq!(config.max_depth, 4);
        assert_eq!(config.redacted_value, "***");
        assert_eq!(config.max_string_length, 10_000);
        assert!(config.extra_field_patterns.is_empty());
    }

    #[test]
    fn test_into_options() {
        let config = RedactionConfig {
            extra_field_patterns: vec![r"^acct_".to_string()],
            ..RedactionConfig::default()
        };
        let options = config.into_options().unwrap();
        assert!(options.is_sensitive_key("ACCT_balance"));
        assert!(!options.is_sensitive_key("balance"));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let config = RedactionConfig {
            extra_field_patterns: vec!["([".to_string()],
            ..RedactionConfig::default()
        };
        assert!(matches!(
            config.into_options(),
            Err(RedactionError::PatternError(_))
        ));
    }

    #[test]
    fn test_zero_string_length_rejected() {
        let config = RedactionConfig {
            max_string_length: 0,
            ..RedactionConfig::default()
        };
        assert!(matches!(config.into_options(), Err(RedactionError::ConfigError(_))));
    }

    #[test]
    fn test_config_serialization() {
        let config = RedactionConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed = RedactionConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);
    }
}

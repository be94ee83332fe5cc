//! Per-call redaction options.

use crate::detect::is_sensitive_field_name_with;
use crate::matcher::{compile_patterns, CompileFlags, PatternSource};
use crate::value::Value;
use regex::Regex;
use std::sync::Arc;

/// Default replacement for redacted values.
pub const REDACTED: &str = "[REDACTED]";

/// Marker appended to strings cut at `max_string_length`.
pub const TRUNCATED: &str = "[TRUNCATED]";

/// Default container depth whose entries are still classified.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Default maximum string length (in chars) before truncation.
pub const DEFAULT_MAX_STRING_LENGTH: usize = 10_000;

/// Hook consulted before built-in classification.
///
/// Receives the entry key and value; `Some(replacement)` means the value was
/// changed and `replacement` is written to the output.
pub type CustomRedactor = Arc<dyn Fn(&str, &Value) -> Option<Value> + Send + Sync>;

/// Function producing a replacement from the original value.
pub type ReplacementFn = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// What a sensitive value is replaced with.
#[derive(Clone)]
pub enum RedactedValue {
    Fixed(String),
    With(ReplacementFn),
}

impl RedactedValue {
    /// Build a policy that derives the replacement from the original value.
    pub fn with<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        RedactedValue::With(Arc::new(f))
    }

    /// Replacement for a whole value.
    pub fn replacement_for(&self, original: &Value) -> Value {
        match self {
            RedactedValue::Fixed(text) => Value::String(text.clone()),
            RedactedValue::With(f) => f(original),
        }
    }

    /// Replacement for a matched substring.
    pub fn text_for(&self, matched: &str) -> String {
        match self {
            RedactedValue::Fixed(text) => text.clone(),
            RedactedValue::With(f) => match f(&Value::from(matched)) {
                Value::String(s) => s,
                other => other.to_json().to_string(),
            },
        }
    }
}

impl Default for RedactedValue {
    fn default() -> Self {
        RedactedValue::Fixed(REDACTED.to_string())
    }
}

impl From<&str> for RedactedValue {
    fn from(text: &str) -> Self {
        RedactedValue::Fixed(text.to_string())
    }
}

impl From<String> for RedactedValue {
    fn from(text: String) -> Self {
        RedactedValue::Fixed(text)
    }
}

impl std::fmt::Debug for RedactedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RedactedValue::Fixed(text) => f.debug_tuple("Fixed").field(text).finish(),
            RedactedValue::With(_) => f.write_str("With(<fn>)"),
        }
    }
}

/// Configuration consumed by every redaction call.
#[derive(Clone)]
pub struct RedactionOptions {
    /// Deepest container depth (root = 0) whose entries are classified.
    /// Deeper containers are copied through unredacted.
    pub max_depth: usize,
    /// Walk nested containers. When false only top-level entries are classified.
    pub deep: bool,
    /// Additional field-name patterns.
    pub extra_patterns: Vec<Regex>,
    /// Hook consulted before built-in rules.
    pub custom_redactor: Option<CustomRedactor>,
    /// Keep the shape of sensitive containers and redact each of their leaves
    /// instead of replacing the container wholesale.
    pub preserve_structure: bool,
    /// Replacement policy.
    pub redacted_value: RedactedValue,
    /// Strings longer than this (in chars) are truncated.
    pub max_string_length: usize,
    /// Check string content against sensitive patterns.
    pub check_content: bool,
}

impl Default for RedactionOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            deep: true,
            extra_patterns: Vec::new(),
            custom_redactor: None,
            preserve_structure: false,
            redacted_value: RedactedValue::default(),
            max_string_length: DEFAULT_MAX_STRING_LENGTH,
            check_content: true,
        }
    }
}

impl RedactionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_deep(mut self, deep: bool) -> Self {
        self.deep = deep;
        self
    }

    pub fn with_extra_patterns(mut self, patterns: Vec<Regex>) -> Self {
        self.extra_patterns.extend(patterns);
        self
    }

    /// Add field-name patterns from literal text or compiled regexes.
    /// Text is matched case-insensitively.
    pub fn with_field_patterns(mut self, sources: &[PatternSource]) -> Self {
        self.extra_patterns
            .extend(compile_patterns(sources, CompileFlags::default()));
        self
    }

    pub fn with_custom_redactor<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, &Value) -> Option<Value> + Send + Sync + 'static,
    {
        self.custom_redactor = Some(Arc::new(hook));
        self
    }

    pub fn with_preserve_structure(mut self, preserve: bool) -> Self {
        self.preserve_structure = preserve;
        self
    }

    pub fn with_redacted_value(mut self, redacted: impl Into<RedactedValue>) -> Self {
        self.redacted_value = redacted.into();
        self
    }

    pub fn with_max_string_length(mut self, max: usize) -> Self {
        self.max_string_length = max;
        self
    }

    pub fn with_check_content(mut self, check: bool) -> Self {
        self.check_content = check;
        self
    }

    /// Whether a key name is sensitive under these options.
    pub fn is_sensitive_key(&self, key: &str) -> bool {
        is_sensitive_field_name_with(key, &self.extra_patterns)
    }
}

impl std::fmt::Debug for RedactionOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedactionOptions")
            .field("max_depth", &self.max_depth)
            .field("deep", &self.deep)
            .field("extra_patterns", &self.extra_patterns.len())
            .field("custom_redactor", &self.custom_redactor.is_some())
            .field("preserve_structure", &self.preserve_structure)
            .field("redacted_value", &self.redacted_value)
            .field("max_string_length", &self.max_string_length)
            .field("check_content", &self.check_content)
            .finish()
    }
}

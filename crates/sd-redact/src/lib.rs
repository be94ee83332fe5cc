//! Sensitive-data detection and redaction for arbitrary nested values.
//!
//! This crate decides whether a field name or a string's content is
//! sensitive, and produces redacted copies of data trees before they reach
//! logs, reports, or any other output surface.
//!
//! # Key Features
//!
//! - **Field-name detection**: exact names plus case-insensitive patterns,
//!   extendable per call.
//! - **Content detection**: credentials, cloud/provider keys, JWTs, card
//!   numbers, SSNs, contact data, encoded blobs, and binary payloads.
//! - **Iterative traversal**: no recursion over data, identity-based cycle
//!   handling, depth and work-list limits.
//! - **Variants**: explicit-path redaction, pattern-based substring
//!   redaction, redact-then-serialize, and partial masking.
//! - **Fail-closed**: when traversal limits are exceeded the whole result is
//!   replaced with a sentinel rather than emitting partial data.
//!
//! # Example
//!
//! ```
//! use sd_redact::{redact, RedactionOptions, Value};
//! use serde_json::json;
//!
//! let input = Value::from(json!({"user": "alice", "password": "hunter2"}));
//! let output = redact(&input, &RedactionOptions::default());
//!
//! assert_eq!(output.to_json(), json!({"user": "alice", "password": "[REDACTED]"}));
//! ```

pub mod config;
pub mod detect;
pub mod engine;
pub mod error;
pub mod mask;
pub mod matcher;
pub mod options;
pub mod paths;
pub mod pattern_redact;
pub mod serialize;
pub mod value;

pub use config::{RedactionConfig, CONFIG_SCHEMA_VERSION};
pub use detect::{
    contains_sensitive_content, detect_content, find_sensitive_content, is_binary_content,
    is_sensitive_field_name, ContentKind, ContentMatch, DEFAULT_BINARY_THRESHOLD,
    SENSITIVE_FIELD_NAMES,
};
pub use engine::{
    contains_sensitive, create_redactor, redact, Redactor, MAX_WORK_ITEMS, STACK_LIMIT_EXCEEDED,
};
pub use error::{RedactionError, Result};
pub use mask::{mask, MaskOptions};
pub use matcher::{
    compile_patterns, compile_regex, create_matcher, CompileFlags, Matcher, MatcherOptions,
    PatternBuilder, PatternSource,
};
pub use options::{
    CustomRedactor, RedactedValue, RedactionOptions, DEFAULT_MAX_DEPTH,
    DEFAULT_MAX_STRING_LENGTH, REDACTED, TRUNCATED,
};
pub use paths::{parse_path, redact_paths, PathIndex, PathRedactionOptions, PathSegment};
pub use pattern_redact::redact_by_pattern;
pub use serialize::{safe_stringify, Replacer, StringifyOptions};
pub use value::{Node, ObjectMap, Value, CIRCULAR};

//! Redaction of explicitly named locations.
//!
//! Paths are dotted strings such as `user.profile.ssn` or `users[*].email`.
//! The input is deep-cloned once and only the named locations are replaced;
//! nothing else is classified.

use crate::options::RedactedValue;
use crate::value::Value;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

// `key`, `key[N]`, `key[*]`, or a bare `[N]` / `[*]` against the current value
static SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^\[\]]*)(?:\[(\d+|\*)\])?$").unwrap());

/// Array marker on a path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathIndex {
    /// A fixed element.
    At(usize),
    /// Every element.
    Wildcard,
}

/// One parsed step of a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    /// Key to look up. Empty when the segment only indexes the current value.
    pub key: String,
    pub index: Option<PathIndex>,
}

/// Options for [`redact_paths`].
#[derive(Debug, Clone)]
pub struct PathRedactionOptions {
    pub redacted_value: RedactedValue,
    /// Match keys exactly. When false, every key equal after lower-casing matches.
    pub case_sensitive: bool,
    pub separator: String,
}

impl Default for PathRedactionOptions {
    fn default() -> Self {
        Self {
            redacted_value: RedactedValue::default(),
            case_sensitive: true,
            separator: ".".to_string(),
        }
    }
}

impl PathRedactionOptions {
    pub fn with_redacted_value(mut self, redacted: impl Into<RedactedValue>) -> Self {
        self.redacted_value = redacted.into();
        self
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }
}

/// Parse a path into segments.
///
/// Returns an empty list for an empty or malformed path.
pub fn parse_path(path: &str, separator: &str) -> Vec<PathSegment> {
    if path.is_empty() {
        return Vec::new();
    }

    let parts: Vec<&str> = if separator.is_empty() {
        vec![path]
    } else {
        path.split(separator).collect()
    };

    let mut segments = Vec::with_capacity(parts.len());
    for part in parts {
        match parse_segment(part) {
            Some(segment) => segments.push(segment),
            None => return Vec::new(),
        }
    }
    segments
}

fn parse_segment(part: &str) -> Option<PathSegment> {
    let caps = SEGMENT.captures(part)?;
    let key = caps.get(1).map_or("", |m| m.as_str()).to_string();
    let index = match caps.get(2).map(|m| m.as_str()) {
        None => None,
        Some("*") => Some(PathIndex::Wildcard),
        Some(digits) => Some(PathIndex::At(digits.parse().ok()?)),
    };
    if key.is_empty() && index.is_none() {
        return None;
    }
    Some(PathSegment { key, index })
}

/// Replace the values at `paths` in a deep copy of `data`.
///
/// Paths that do not resolve are skipped silently.
pub fn redact_paths(data: &Value, paths: &[&str], options: &PathRedactionOptions) -> Value {
    let mut root = data.deep_clone();

    for path in paths {
        let segments = parse_path(path, &options.separator);
        if segments.is_empty() {
            debug!(path = %path, "Skipping empty or malformed redaction path");
            continue;
        }
        apply(&mut root, &segments, options);
    }

    root
}

/// Apply the remaining `segments` below `slot`; with none left, replace it.
fn apply(slot: &mut Value, segments: &[PathSegment], options: &PathRedactionOptions) {
    let Some((segment, rest)) = segments.split_first() else {
        let replacement = options.redacted_value.replacement_for(slot);
        *slot = replacement;
        return;
    };

    if segment.key.is_empty() {
        if let Some(index) = segment.index {
            apply_index(slot, index, rest, options);
        }
        return;
    }

    let name = if options.case_sensitive {
        segment.key.clone()
    } else {
        segment.key.to_lowercase()
    };
    for_each_child(slot, &name, options.case_sensitive, |child| match segment.index {
        None => apply(child, rest, options),
        Some(index) => apply_index(child, index, rest, options),
    });
}

fn apply_index(
    slot: &mut Value,
    index: PathIndex,
    rest: &[PathSegment],
    options: &PathRedactionOptions,
) {
    let Value::Array(node) = slot else {
        return;
    };
    let mut items = node.write();
    match index {
        PathIndex::At(position) => {
            if let Some(item) = items.get_mut(position) {
                apply(item, rest, options);
            }
        }
        PathIndex::Wildcard => {
            for item in items.iter_mut() {
                apply(item, rest, options);
            }
        }
    }
}

// The copy shares no nodes, so a child lock never aliases its parent's.
fn for_each_child(
    target: &Value,
    name: &str,
    case_sensitive: bool,
    mut f: impl FnMut(&mut Value),
) {
    let key_matches = |key: &str| {
        if case_sensitive {
            key == name
        } else {
            key.to_lowercase() == name
        }
    };

    match target {
        Value::Object(node) => {
            for (key, child) in node.write().iter_mut() {
                if key_matches(key.as_str()) {
                    f(child);
                }
            }
        }
        Value::Map(node) => {
            for (key, child) in node.write().iter_mut() {
                if key.as_str().is_some_and(|k| key_matches(k)) {
                    f(child);
                }
            }
        }
        _ => {}
    }
}

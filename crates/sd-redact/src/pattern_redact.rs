//! Substring redaction driven by caller patterns.

use crate::detect::is_sensitive_field_name_with;
use crate::engine::redact;
use crate::options::{RedactedValue, RedactionOptions};
use crate::value::Value;
use regex::Regex;
use std::sync::Arc;

/// Replace every non-empty match of each pattern with the policy text.
///
/// Returns `None` when nothing matched.
fn replace_matches(text: &str, patterns: &[Regex], policy: &RedactedValue) -> Option<String> {
    let mut current: Option<String> = None;

    for pattern in patterns {
        let input = current.as_deref().unwrap_or(text);
        let mut output = String::with_capacity(input.len());
        let mut last = 0;
        let mut replaced = false;

        for m in pattern.find_iter(input).filter(|m| !m.is_empty()) {
            output.push_str(&input[last..m.start()]);
            output.push_str(&policy.text_for(m.as_str()));
            last = m.end();
            replaced = true;
        }

        if replaced {
            output.push_str(&input[last..]);
            current = Some(output);
        }
    }

    current
}

/// Redact matches of `patterns` inside every string leaf.
///
/// Runs the general engine with a hook that rewrites string entries. A
/// rewritten string still goes through the content check and truncation, so
/// a secret sitting next to a pattern match is redacted whole. Entries under
/// a sensitive field name, and strings with no match, fall through to the
/// caller's own hook (if any) and then to the normal rules.
pub fn redact_by_pattern(data: &Value, patterns: &[Regex], options: &RedactionOptions) -> Value {
    if let Value::String(text) = data {
        return match replace_matches(text, patterns, &options.redacted_value) {
            Some(replaced) => redact(&Value::String(replaced), options),
            None => redact(data, options),
        };
    }

    let patterns: Arc<[Regex]> = patterns.into();
    let base = options.clone();
    let caller = options.custom_redactor.clone();

    let hooked = options.clone().with_custom_redactor(move |key, value| {
        let named_sensitive =
            !key.is_empty() && is_sensitive_field_name_with(key, &base.extra_patterns);
        if let (false, Value::String(text)) = (named_sensitive, value) {
            if let Some(replaced) = replace_matches(text, &patterns, &base.redacted_value) {
                // A root string never reaches the hook, so this only applies
                // the string rules.
                return Some(redact(&Value::String(replaced), &base));
            }
        }
        caller.as_ref().and_then(|hook| hook(key, value))
    });

    redact(data, &hooked)
}

//! Redact-then-serialize helper.
//!
//! A caller replacer only ever sees the redacted tree.

use crate::engine::redact;
use crate::error::Result;
use crate::options::RedactionOptions;
use crate::value::Value;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// Widest indent honored for pretty output.
const MAX_INDENT: usize = 10;

/// Post-redaction transform over JSON members.
///
/// Called with the member key (array index as text, `""` for the root) and
/// its already-transformed value. `None` drops an object member and becomes
/// `null` in arrays and at the root.
pub type Replacer = Arc<dyn Fn(&str, &JsonValue) -> Option<JsonValue> + Send + Sync>;

/// Options for [`safe_stringify`].
#[derive(Clone)]
pub struct StringifyOptions {
    /// Run redaction before serializing.
    pub redact: bool,
    /// Pretty-print with this many spaces of indent (capped at 10).
    pub space: Option<usize>,
    pub replacer: Option<Replacer>,
    pub redaction_options: RedactionOptions,
}

impl Default for StringifyOptions {
    fn default() -> Self {
        Self {
            redact: true,
            space: None,
            replacer: None,
            redaction_options: RedactionOptions::default(),
        }
    }
}

impl StringifyOptions {
    pub fn with_redact(mut self, redact: bool) -> Self {
        self.redact = redact;
        self
    }

    pub fn with_space(mut self, space: usize) -> Self {
        self.space = Some(space);
        self
    }

    pub fn with_replacer<F>(mut self, replacer: F) -> Self
    where
        F: Fn(&str, &JsonValue) -> Option<JsonValue> + Send + Sync + 'static,
    {
        self.replacer = Some(Arc::new(replacer));
        self
    }

    pub fn with_redaction_options(mut self, options: RedactionOptions) -> Self {
        self.redaction_options = options;
        self
    }
}

impl std::fmt::Debug for StringifyOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StringifyOptions")
            .field("redact", &self.redact)
            .field("space", &self.space)
            .field("replacer", &self.replacer.is_some())
            .field("redaction_options", &self.redaction_options)
            .finish()
    }
}

/// Redact (unless disabled) and serialize `data` to JSON text.
pub fn safe_stringify(data: &Value, options: &StringifyOptions) -> Result<String> {
    let prepared = if options.redact {
        redact(data, &options.redaction_options)
    } else {
        data.clone()
    };

    let mut json = serde_json::to_value(&prepared)?;
    if let Some(replacer) = &options.replacer {
        json = apply_replacer("", json, replacer.as_ref()).unwrap_or(JsonValue::Null);
    }

    match options.space.map(|n| n.min(MAX_INDENT)) {
        Some(indent) if indent > 0 => to_string_indented(&json, indent),
        _ => Ok(serde_json::to_string(&json)?),
    }
}

/// Children first, then the member itself.
fn apply_replacer(
    key: &str,
    value: JsonValue,
    replacer: &(dyn Fn(&str, &JsonValue) -> Option<JsonValue> + Send + Sync),
) -> Option<JsonValue> {
    let value = match value {
        JsonValue::Object(members) => JsonValue::Object(
            members
                .into_iter()
                .filter_map(|(k, v)| apply_replacer(&k, v, replacer).map(|v| (k, v)))
                .collect(),
        ),
        JsonValue::Array(items) => JsonValue::Array(
            items
                .into_iter()
                .enumerate()
                .map(|(i, v)| apply_replacer(&i.to_string(), v, replacer).unwrap_or(JsonValue::Null))
                .collect(),
        ),
        other => other,
    };
    replacer(key, &value)
}

fn to_string_indented(json: &JsonValue, indent: usize) -> Result<String> {
    let spaces = vec![b' '; indent];
    let formatter = serde_json::ser::PrettyFormatter::with_indent(&spaces);
    let mut buf = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    json.serialize(&mut serializer)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

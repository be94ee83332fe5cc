//! Main redaction engine.
//!
//! `redact` walks a value with an explicit work list instead of recursion,
//! so hostile nesting cannot overflow the stack. Each call owns an
//! identity-keyed visited set; a container reached twice is written as
//! `"[Circular]"`. The output is always a freshly allocated tree.

use crate::detect::{contains_sensitive_content, is_sensitive_field_name_with};
use crate::error::Result;
use crate::options::{RedactedValue, RedactionOptions, TRUNCATED};
use crate::serialize::{safe_stringify, StringifyOptions};
use crate::value::{Value, CIRCULAR};
use regex::Regex;
use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Whole-result replacement when the work list outgrows [`MAX_WORK_ITEMS`].
pub const STACK_LIMIT_EXCEEDED: &str = "[REDACTION STACK LIMIT EXCEEDED]";

/// Hard ceiling on pending containers during one traversal.
pub const MAX_WORK_ITEMS: usize = 1000;

/// Free work lists kept per thread.
const POOL_CAPACITY: usize = 8;

/// A container whose entries still have to be copied into `destination`.
struct WorkItem {
    source: Value,
    destination: Value,
    depth: usize,
}

thread_local! {
    static WORK_LIST_POOL: RefCell<Vec<Vec<WorkItem>>> = RefCell::new(Vec::new());
}

/// Work list borrowed from the per-thread pool and returned on drop.
struct WorkList {
    items: Vec<WorkItem>,
}

impl WorkList {
    fn acquire() -> Self {
        let items = WORK_LIST_POOL
            .try_with(|pool| pool.borrow_mut().pop())
            .ok()
            .flatten()
            .unwrap_or_default();
        Self { items }
    }
}

impl Drop for WorkList {
    fn drop(&mut self) {
        let mut items = std::mem::take(&mut self.items);
        items.clear();
        // The thread-local may already be torn down during thread exit.
        let _ = WORK_LIST_POOL.try_with(|pool| {
            let mut pool = pool.borrow_mut();
            if pool.len() < POOL_CAPACITY {
                pool.push(items);
            }
        });
    }
}

/// The work list outgrew [`MAX_WORK_ITEMS`].
struct StackLimitExceeded;

/// State for a single top-level `redact` call.
struct Traversal<'a> {
    options: &'a RedactionOptions,
    visited: HashSet<usize>,
    work: WorkList,
}

impl<'a> Traversal<'a> {
    fn new(options: &'a RedactionOptions) -> Self {
        Self {
            options,
            visited: HashSet::new(),
            work: WorkList::acquire(),
        }
    }

    fn run(mut self, data: &Value) -> Value {
        let Some(id) = data.node_id() else {
            return self.copy_value(data, 0);
        };

        self.visited.insert(id);
        let root = data.empty_like();
        self.work.items.push(WorkItem {
            source: data.clone(),
            destination: root.clone(),
            depth: 0,
        });

        match self.drain() {
            Ok(()) => root,
            Err(StackLimitExceeded) => Value::String(STACK_LIMIT_EXCEEDED.to_string()),
        }
    }

    fn drain(&mut self) -> std::result::Result<(), StackLimitExceeded> {
        while let Some(item) = self.work.items.pop() {
            self.process(item);
            if self.work.items.len() > MAX_WORK_ITEMS {
                warn!(
                    pending = self.work.items.len(),
                    limit = MAX_WORK_ITEMS,
                    "Redaction work list exceeded its ceiling; result discarded"
                );
                return Err(StackLimitExceeded);
            }
        }
        Ok(())
    }

    /// Copy every entry of one container, classifying each.
    fn process(&mut self, item: WorkItem) {
        let WorkItem {
            source,
            destination,
            depth,
        } = item;
        let child_depth = depth + 1;

        match (&source, &destination) {
            (Value::Object(src), Value::Object(dst)) => {
                let entries: Vec<(String, Value)> = src
                    .read()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                for (key, value) in entries {
                    let out = self.redact_entry(&key, &value, child_depth);
                    dst.write().insert(key, out);
                }
            }
            (Value::Array(src), Value::Array(dst)) => {
                let items: Vec<Value> = src.read().clone();
                for (index, value) in items.iter().enumerate() {
                    let out = self.redact_entry(&index.to_string(), value, child_depth);
                    dst.write().push(out);
                }
            }
            (Value::Map(src), Value::Map(dst)) => {
                let entries: Vec<(Value, Value)> = src.read().clone();
                for (key, value) in entries {
                    let name = key.as_str().unwrap_or_default();
                    let out = self.redact_entry(name, &value, child_depth);
                    dst.write().push((key.deep_clone(), out));
                }
            }
            (Value::Set(src), Value::Set(dst)) => {
                // Set members have no name; only content rules apply.
                let items: Vec<Value> = src.read().clone();
                for value in items {
                    let out = self.redact_entry("", &value, child_depth);
                    let mut members = dst.write();
                    if out.is_container() || !members.contains(&out) {
                        members.push(out);
                    }
                }
            }
            _ => {}
        }
    }

    /// Classify and copy one entry. An empty key skips name classification.
    fn redact_entry(&mut self, key: &str, value: &Value, child_depth: usize) -> Value {
        if let Some(hook) = &self.options.custom_redactor {
            if let Some(replacement) = hook(key, value) {
                return replacement;
            }
        }

        if !key.is_empty() && self.options.is_sensitive_key(key) {
            return self.redact_whole(value);
        }

        self.copy_value(value, child_depth)
    }

    fn redact_whole(&self, value: &Value) -> Value {
        let policy = &self.options.redacted_value;
        if self.options.preserve_structure && value.is_container() {
            return value.rebuild(&|leaf: &Value| policy.replacement_for(leaf));
        }
        policy.replacement_for(value)
    }

    fn copy_value(&mut self, value: &Value, depth: usize) -> Value {
        match value {
            Value::String(s) => self.copy_string(value, s),
            container if container.is_container() => self.descend(container, depth),
            leaf => leaf.clone(),
        }
    }

    fn copy_string(&self, original: &Value, s: &str) -> Value {
        if self.is_marker(s) {
            return Value::String(s.to_string());
        }
        let check = self.options.check_content;
        if check && contains_sensitive_content(s) {
            return self.options.redacted_value.replacement_for(original);
        }
        match truncate(s, self.options.max_string_length) {
            // A cut can create a match the full string did not have
            Some(cut) if check && contains_sensitive_content(&cut) => {
                self.options.redacted_value.replacement_for(original)
            }
            Some(cut) => Value::String(cut),
            None => Value::String(s.to_string()),
        }
    }

    /// Strings this engine writes itself pass through a second run unchanged.
    fn is_marker(&self, s: &str) -> bool {
        s == CIRCULAR
            || s == STACK_LIMIT_EXCEEDED
            || matches!(&self.options.redacted_value, RedactedValue::Fixed(text) if text == s)
    }

    /// Queue a nested container, or copy it through when it is past the
    /// depth limit (or deep mode is off).
    fn descend(&mut self, value: &Value, depth: usize) -> Value {
        let Some(id) = value.node_id() else {
            return value.clone();
        };
        if !self.visited.insert(id) {
            return Value::String(CIRCULAR.to_string());
        }

        if !self.options.deep {
            return value.deep_clone();
        }
        if depth > self.options.max_depth {
            debug!(
                depth,
                max_depth = self.options.max_depth,
                "Depth limit reached; subtree copied without redaction"
            );
            return value.deep_clone();
        }

        let destination = value.empty_like();
        self.work.items.push(WorkItem {
            source: value.clone(),
            destination: destination.clone(),
            depth,
        });
        destination
    }
}

/// Cut a string to `max_chars` characters plus the truncation marker.
/// `None` when it already fits.
fn truncate(s: &str, max_chars: usize) -> Option<String> {
    s.char_indices()
        .nth(max_chars)
        .map(|(cut, _)| format!("{}{}", &s[..cut], TRUNCATED))
}

/// Produce a redacted deep copy of `data`.
///
/// Never fails for well-formed options. A panicking custom redactor is not
/// caught and unwinds out of this call.
///
/// With a fixed replacement text, running `redact` on its own output changes
/// nothing. A [`RedactedValue::With`] policy is applied again on every pass.
pub fn redact(data: &Value, options: &RedactionOptions) -> Value {
    Traversal::new(options).run(data)
}

/// Check whether anything in `data` has a sensitive field name or
/// sensitive string content. Stops at the first hit and builds no output.
pub fn contains_sensitive(data: &Value, extra_patterns: &[Regex]) -> bool {
    let mut visited = HashSet::new();
    let mut pending = vec![data.clone()];

    while let Some(current) = pending.pop() {
        match &current {
            Value::String(s) => {
                if contains_sensitive_content(s) {
                    return true;
                }
            }
            Value::Object(node) => {
                if !visited.insert(node.id()) {
                    continue;
                }
                for (key, child) in node.read().iter() {
                    if is_sensitive_field_name_with(key, extra_patterns) {
                        return true;
                    }
                    pending.push(child.clone());
                }
            }
            Value::Array(node) | Value::Set(node) => {
                if !visited.insert(node.id()) {
                    continue;
                }
                pending.extend(node.read().iter().cloned());
            }
            Value::Map(node) => {
                if !visited.insert(node.id()) {
                    continue;
                }
                for (key, child) in node.read().iter() {
                    if key
                        .as_str()
                        .is_some_and(|name| is_sensitive_field_name_with(name, extra_patterns))
                    {
                        return true;
                    }
                    pending.push(child.clone());
                }
            }
            _ => {}
        }
    }

    false
}

/// A redactor with fixed options, cheap to clone and share.
#[derive(Debug, Clone, Default)]
pub struct Redactor {
    options: Arc<RedactionOptions>,
}

impl Redactor {
    pub fn new(options: RedactionOptions) -> Self {
        Self {
            options: Arc::new(options),
        }
    }

    /// The options every call uses.
    pub fn options(&self) -> &RedactionOptions {
        &self.options
    }

    pub fn redact(&self, data: &Value) -> Value {
        redact(data, &self.options)
    }

    /// Containment check using this redactor's extra field patterns.
    pub fn contains_sensitive(&self, data: &Value) -> bool {
        contains_sensitive(data, &self.options.extra_patterns)
    }

    /// Redact and serialize to compact JSON.
    pub fn stringify(&self, data: &Value) -> Result<String> {
        let options = StringifyOptions {
            redaction_options: (*self.options).clone(),
            ..StringifyOptions::default()
        };
        safe_stringify(data, &options)
    }
}

/// Build a reusable redactor from fixed options.
pub fn create_redactor(options: RedactionOptions) -> Redactor {
    Redactor::new(options)
}

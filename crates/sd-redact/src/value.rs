//! Data model for values that flow through the redaction engine.
//!
//! `Value` is a closed sum type over the leaf and container kinds the engine
//! knows how to copy. Containers live behind shared [`Node`]s so callers can
//! build graphs with shared or self-referential children; cloning a container
//! `Value` clones the reference, not the contents.
//!
//! Equality, `Debug` and `Serialize` all terminate on cyclic graphs: a node
//! that is re-entered while it is already being visited compares equal,
//! prints as `[Circular]` and serializes as the string `"[Circular]"`.

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use regex::Regex;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Sentinel written in place of a container that was already visited.
pub const CIRCULAR: &str = "[Circular]";

/// Ordered string-keyed mapping used by [`Value::Object`].
pub type ObjectMap = IndexMap<String, Value>;

/// Shared, interior-mutable container node.
///
/// Identity is the address of the shared allocation; two nodes with the same
/// contents are still distinct unless they are clones of one another.
pub struct Node<T>(Arc<RwLock<T>>);

impl<T> Node<T> {
    /// Wrap a container in a fresh node.
    pub fn new(inner: T) -> Self {
        Node(Arc::new(RwLock::new(inner)))
    }

    /// Lock the node for reading.
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.0.read()
    }

    /// Lock the node for writing. Used to close cycles after construction.
    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.0.write()
    }

    /// Identity of the node (address of the shared allocation).
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    /// Whether both handles point at the same node.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn read_nested(&self) -> RwLockReadGuard<'_, T> {
        self.0.read_recursive()
    }
}

impl<T> Clone for Node<T> {
    fn clone(&self) -> Self {
        Node(Arc::clone(&self.0))
    }
}

impl<T: fmt::Debug> fmt::Debug for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Reentry::enter(Op::Debug, self.id(), 0) {
            Some(_guard) => self.read_nested().fmt(f),
            None => f.write_str(CIRCULAR),
        }
    }
}

impl<T: PartialEq> PartialEq for Node<T> {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        // A pair already under comparison is assumed equal; the rest of the
        // walk decides.
        match Reentry::enter(Op::Eq, self.id(), other.id()) {
            Some(_guard) => *self.read_nested() == *other.read_nested(),
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Op {
    Debug,
    Eq,
    Serialize,
}

thread_local! {
    static IN_PROGRESS: RefCell<HashSet<(Op, usize, usize)>> = RefCell::new(HashSet::new());
}

/// Marks a node (or node pair) as being visited on this thread.
struct Reentry {
    key: (Op, usize, usize),
}

impl Reentry {
    fn enter(op: Op, a: usize, b: usize) -> Option<Self> {
        let key = (op, a, b);
        let fresh = IN_PROGRESS.with(|set| set.borrow_mut().insert(key));
        fresh.then(|| Reentry { key })
    }
}

impl Drop for Reentry {
    fn drop(&mut self) {
        IN_PROGRESS.with(|set| {
            set.borrow_mut().remove(&self.key);
        });
    }
}

/// A value that can be inspected and redacted.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absent value. Dropped from objects when serialized.
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    /// Date-like leaf, copied by value.
    Date(DateTime<Utc>),
    /// Regular-expression-like leaf, copied by value.
    Pattern(Regex),
    /// Typed numeric buffer, copied by value.
    Bytes(Vec<u8>),
    /// Ordered string-keyed mapping.
    Object(Node<ObjectMap>),
    Array(Node<Vec<Value>>),
    /// Ordered mapping with arbitrary keys.
    Map(Node<Vec<(Value, Value)>>),
    /// Unique-value collection.
    Set(Node<Vec<Value>>),
}

impl Value {
    /// Build an object from key/value pairs, keeping their order.
    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Object(Node::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    pub fn array<I: IntoIterator<Item = Value>>(items: I) -> Self {
        Value::Array(Node::new(items.into_iter().collect()))
    }

    pub fn map<I: IntoIterator<Item = (Value, Value)>>(entries: I) -> Self {
        Value::Map(Node::new(entries.into_iter().collect()))
    }

    /// Build a set; later duplicates of an earlier entry are dropped.
    pub fn set<I: IntoIterator<Item = Value>>(items: I) -> Self {
        let mut unique: Vec<Value> = Vec::new();
        for item in items {
            if !unique.contains(&item) {
                unique.push(item);
            }
        }
        Value::Set(Node::new(unique))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    /// Whether the value is one of the shared container kinds.
    pub fn is_container(&self) -> bool {
        self.node_id().is_some()
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// Look up a member of an object, or a string-keyed entry of a map.
    pub fn get(&self, key: &str) -> Option<Value> {
        match self {
            Value::Object(node) => node.read().get(key).cloned(),
            Value::Map(node) => node
                .read()
                .iter()
                .find(|(k, _)| k.as_str() == Some(key))
                .map(|(_, v)| v.clone()),
            _ => None,
        }
    }

    /// Element of an array or set by position.
    pub fn get_index(&self, index: usize) -> Option<Value> {
        match self {
            Value::Array(node) | Value::Set(node) => node.read().get(index).cloned(),
            _ => None,
        }
    }

    /// Resolve a JSON-pointer-like path such as `/users/0/email`.
    pub fn pointer(&self, pointer: &str) -> Option<Value> {
        if pointer.is_empty() {
            return Some(self.clone());
        }
        let rest = pointer.strip_prefix('/')?;
        let mut current = self.clone();
        for token in rest.split('/') {
            let token = token.replace("~1", "/").replace("~0", "~");
            current = match &current {
                Value::Array(_) | Value::Set(_) => current.get_index(token.parse().ok()?)?,
                _ => current.get(&token)?,
            };
        }
        Some(current)
    }

    /// Number of entries for containers, `None` for leaves.
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::Object(node) => Some(node.read().len()),
            Value::Array(node) | Value::Set(node) => Some(node.read().len()),
            Value::Map(node) => Some(node.read().len()),
            _ => None,
        }
    }

    /// Identity of the underlying node for containers.
    pub fn node_id(&self) -> Option<usize> {
        match self {
            Value::Object(node) => Some(node.id()),
            Value::Array(node) | Value::Set(node) => Some(node.id()),
            Value::Map(node) => Some(node.id()),
            _ => None,
        }
    }

    /// Fresh, empty container of the same kind. Leaves are returned as-is.
    pub(crate) fn empty_like(&self) -> Value {
        match self {
            Value::Object(_) => Value::Object(Node::new(ObjectMap::new())),
            Value::Array(_) => Value::Array(Node::new(Vec::new())),
            Value::Map(_) => Value::Map(Node::new(Vec::new())),
            Value::Set(_) => Value::Set(Node::new(Vec::new())),
            leaf => leaf.clone(),
        }
    }

    /// Structural copy that shares nothing with `self`.
    ///
    /// Iterative, so arbitrarily deep input cannot exhaust the stack. A node
    /// reached a second time is written as `"[Circular]"`.
    pub fn deep_clone(&self) -> Value {
        self.rebuild(&|leaf: &Value| leaf.clone())
    }

    /// Copy the container shape of `self`, passing every leaf (entry values,
    /// not map keys) through `leaf`.
    pub(crate) fn rebuild(&self, leaf: &dyn Fn(&Value) -> Value) -> Value {
        let mut seen = HashSet::new();
        let mut pending: Vec<(Value, Value)> = Vec::new();
        let root = shell(self, &mut seen, &mut pending, leaf);

        while let Some((source, dest)) = pending.pop() {
            match (&source, &dest) {
                (Value::Object(src), Value::Object(dst)) => {
                    let entries: Vec<(String, Value)> = src
                        .read()
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect();
                    for (key, value) in entries {
                        let copy = shell(&value, &mut seen, &mut pending, leaf);
                        dst.write().insert(key, copy);
                    }
                }
                (Value::Array(src), Value::Array(dst)) | (Value::Set(src), Value::Set(dst)) => {
                    let items: Vec<Value> = src.read().clone();
                    for item in items {
                        let copy = shell(&item, &mut seen, &mut pending, leaf);
                        dst.write().push(copy);
                    }
                }
                (Value::Map(src), Value::Map(dst)) => {
                    let entries: Vec<(Value, Value)> = src.read().clone();
                    for (key, value) in entries {
                        let copy = shell(&value, &mut seen, &mut pending, leaf);
                        dst.write().push((key.deep_clone(), copy));
                    }
                }
                _ => {}
            }
        }

        root
    }

    /// Convert into a `serde_json::Value` using the same rules as `Serialize`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Queue a container for copying and return its empty destination, or
/// convert a leaf directly.
fn shell(
    value: &Value,
    seen: &mut HashSet<usize>,
    pending: &mut Vec<(Value, Value)>,
    leaf: &dyn Fn(&Value) -> Value,
) -> Value {
    match value.node_id() {
        Some(id) => {
            if !seen.insert(id) {
                return Value::String(CIRCULAR.to_string());
            }
            let dest = value.empty_like();
            pending.push((value.clone(), dest.clone()));
            dest
        }
        None => leaf(value),
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Pattern(a), Value::Pattern(b)) => a.as_str() == b.as_str(),
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Array(a), Value::Array(b)) | (Value::Set(a), Value::Set(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Undefined | Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => n.serialize(serializer),
            Value::String(s) => serializer.serialize_str(s),
            Value::Date(d) => {
                serializer.serialize_str(&d.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            Value::Pattern(re) => serializer.serialize_str(re.as_str()),
            Value::Bytes(bytes) => serializer.collect_seq(bytes.iter()),
            Value::Object(node) => {
                let Some(_guard) = Reentry::enter(Op::Serialize, node.id(), 0) else {
                    return serializer.serialize_str(CIRCULAR);
                };
                let map = node.read_nested();
                let present = map.values().filter(|v| !v.is_undefined()).count();
                let mut out = serializer.serialize_map(Some(present))?;
                for (key, value) in map.iter().filter(|(_, v)| !v.is_undefined()) {
                    out.serialize_entry(key, value)?;
                }
                out.end()
            }
            Value::Array(node) | Value::Set(node) => {
                let Some(_guard) = Reentry::enter(Op::Serialize, node.id(), 0) else {
                    return serializer.serialize_str(CIRCULAR);
                };
                let items = node.read_nested();
                let mut out = serializer.serialize_seq(Some(items.len()))?;
                for item in items.iter() {
                    out.serialize_element(item)?;
                }
                out.end()
            }
            Value::Map(node) => {
                let Some(_guard) = Reentry::enter(Op::Serialize, node.id(), 0) else {
                    return serializer.serialize_str(CIRCULAR);
                };
                let entries = node.read_nested();
                if entries.iter().all(|(k, _)| k.is_string()) {
                    let mut out = serializer.serialize_map(Some(entries.len()))?;
                    for (key, value) in entries.iter() {
                        out.serialize_entry(key, value)?;
                    }
                    out.end()
                } else {
                    let mut out = serializer.serialize_seq(Some(entries.len()))?;
                    for (key, value) in entries.iter() {
                        out.serialize_element(&(key, value))?;
                    }
                    out.end()
                }
            }
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::array(items.into_iter().map(Value::from)),
            serde_json::Value::Object(map) => {
                Value::object(map.into_iter().map(|(k, v)| (k, Value::from(v))))
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n.into())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Number(n.into())
    }
}

impl From<f64> for Value {
    /// Non-finite floats have no JSON form and become `Null`.
    fn from(n: f64) -> Self {
        serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Value::Date(d)
    }
}

impl From<Regex> for Value {
    fn from(re: Regex) -> Self {
        Value::Pattern(re)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::array(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn self_referential() -> Value {
        let root = Value::object([("name", Value::from("loop"))]);
        if let Value::Object(node) = &root {
            node.write().insert("self".to_string(), root.clone());
        }
        root
    }

    #[test]
    fn test_from_json_and_pointer() {
        let value = Value::from(json!({"b": 1, "a": [true, null, "x"]}));
        assert_eq!(value.get("b").and_then(|v| v.as_i64()), Some(1));
        assert_eq!(value.pointer("/a/2").and_then(|v| v.as_str().map(String::from)), Some("x".to_string()));
        assert!(value.pointer("/a/1").unwrap().is_null());
        assert!(value.pointer("/missing").is_none());
    }

    #[test]
    fn test_clone_shares_node() {
        let value = Value::from(json!({"a": 1}));
        let alias = value.clone();
        assert_eq!(value.node_id(), alias.node_id());

        let copy = value.deep_clone();
        assert_ne!(value.node_id(), copy.node_id());
        assert_eq!(value, copy);
    }

    #[test]
    fn test_deep_clone_breaks_cycles() {
        let root = self_referential();
        let copy = root.deep_clone();
        assert_eq!(copy.get("self").and_then(|v| v.as_str().map(String::from)), Some(CIRCULAR.to_string()));
        assert_eq!(copy.get("name").and_then(|v| v.as_str().map(String::from)), Some("loop".to_string()));
    }

    #[test]
    fn test_debug_and_eq_terminate_on_cycles() {
        let root = self_referential();
        let printed = format!("{:?}", root);
        assert!(printed.contains(CIRCULAR));
        assert_eq!(root, root.clone());
        assert_eq!(self_referential(), self_referential());
    }

    #[test]
    fn test_serialize_cycle_as_sentinel() {
        let root = self_referential();
        let json = root.to_json();
        assert_eq!(json, json!({"name": "loop", "self": "[Circular]"}));
    }

    #[test]
    fn test_serialize_leaf_kinds() {
        let date = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let value = Value::object([
            ("when", Value::from(date)),
            ("bytes", Value::Bytes(vec![1, 2, 3])),
            ("gone", Value::Undefined),
            ("tags", Value::set([Value::from("a"), Value::from("a"), Value::from("b")])),
        ]);
        assert_eq!(
            value.to_json(),
            json!({"when": "2024-01-02T03:04:05.000Z", "bytes": [1, 2, 3], "tags": ["a", "b"]})
        );
    }

    #[test]
    fn test_serialize_map_keys() {
        let by_name = Value::map([(Value::from("k"), Value::from(1i64))]);
        assert_eq!(by_name.to_json(), json!({"k": 1}));

        let by_number = Value::map([(Value::from(7i64), Value::from("seven"))]);
        assert_eq!(by_number.to_json(), json!([[7, "seven"]]));
    }

    #[test]
    fn test_non_finite_float_is_null() {
        assert!(Value::from(f64::NAN).is_null());
    }
}

//! Tree - the nested JSON document holding all data.
//!
//! The tree knows nothing about listeners. It only reads and writes values
//! at canonical paths; [`crate::Store`] pairs it with the notifier.

use crate::error::{Error, Result};
use crate::path;
use serde_json::{Map, Value};

/// A nested JSON document addressed by path.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    root: Value,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self {
            root: Value::Object(Map::new()),
        }
    }

    /// Create a tree from an existing document. The document must be an object.
    pub fn from_value(root: Value) -> Result<Self> {
        if !root.is_object() {
            return Err(Error::InvalidSeed("expected an object at the root".into()));
        }
        Ok(Self { root })
    }

    /// Parse a tree from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let root: Value =
            serde_json::from_str(json).map_err(|e| Error::InvalidSeed(e.to_string()))?;
        Self::from_value(root)
    }

    /// Serialize the tree to JSON.
    pub fn to_json(&self) -> String {
        self.root.to_string()
    }

    /// The root document.
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Borrow the value at `path`.
    pub fn get_ref(&self, path: &str) -> Option<&Value> {
        let mut current = &self.root;
        for segment in path::segments(path) {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Copy of the value at `path`, or `None` when nothing is stored there.
    pub fn get(&self, path: &str) -> Option<Value> {
        self.get_ref(path).cloned()
    }

    /// Write `value` at `path`, creating intermediate objects as needed.
    ///
    /// Numeric segments address existing array elements in place; any other
    /// non-object along the way is replaced by an object. The root only
    /// accepts an object: `null` clears it and other values are ignored.
    pub fn set(&mut self, path: &str, value: Value) {
        let parts = path::segments(path);
        let Some((last, parents)) = parts.split_last() else {
            match value {
                Value::Object(_) => self.root = value,
                Value::Null => self.clear(),
                _ => tracing::warn!("ignoring non-object value written at the root"),
            }
            return;
        };

        let mut current = &mut self.root;
        for segment in parents {
            let Some(next) = child_slot(current, segment) else {
                return;
            };
            current = next;
        }
        if let Some(slot) = child_slot(current, last) {
            *slot = value;
        }
    }

    /// Shallow-merge `partial` into the object at `path`.
    ///
    /// When either side is not an object the stored value is replaced.
    pub fn update(&mut self, path: &str, partial: Value) {
        let fields = match partial {
            Value::Object(fields) => fields,
            other => {
                self.set(path, other);
                return;
            }
        };
        if let Some(Value::Object(existing)) = self.get_mut(path) {
            for (key, value) in fields {
                existing.insert(key, value);
            }
            return;
        }
        self.set(path, Value::Object(fields));
    }

    /// Delete the key at `path` from its parent object.
    ///
    /// An array element is nulled instead, keeping the other indices stable.
    /// Does nothing when the parent is absent or a scalar. Removing the root
    /// leaves an empty tree.
    pub fn remove(&mut self, path: &str) {
        let Some(parent) = path::parent(path) else {
            self.clear();
            return;
        };
        let Some(key) = path::leaf(path).map(str::to_string) else {
            return;
        };
        match self.get_mut(&parent) {
            Some(Value::Object(map)) => {
                map.shift_remove(&key);
            }
            Some(Value::Array(items)) => {
                if let Some(item) = key.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
                    *item = Value::Null;
                }
            }
            _ => {}
        }
    }

    /// Deep-merge `state` into the tree. Objects merge key by key, anything
    /// else replaces what was there. A non-object `state` is ignored.
    pub fn merge(&mut self, state: Value) {
        if !state.is_object() {
            tracing::warn!("ignoring non-object state merged at the root");
            return;
        }
        deep_merge(&mut self.root, state);
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.root = Value::Object(Map::new());
    }

    fn get_mut(&mut self, path: &str) -> Option<&mut Value> {
        let mut current = &mut self.root;
        for segment in path::segments(path) {
            current = match current {
                Value::Object(map) => map.get_mut(segment)?,
                Value::Array(items) => items.get_mut(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

/// Borrow the child `segment` of `container` for writing.
///
/// An in-range index into an array yields that element. Anything else is
/// turned into an object first and the key is created if missing.
fn child_slot<'a>(container: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    let index = match &*container {
        Value::Array(items) => segment.parse::<usize>().ok().filter(|i| *i < items.len()),
        _ => None,
    };
    match (index, container) {
        (Some(i), Value::Array(items)) => items.get_mut(i),
        (_, other) => {
            if !other.is_object() {
                *other = Value::Object(Map::new());
            }
            let map = other.as_object_mut()?;
            Some(
                map.entry(segment.to_string())
                    .or_insert_with(|| Value::Object(Map::new())),
            )
        }
    }
}

fn deep_merge(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(existing), Value::Object(incoming)) => {
            for (key, value) in incoming {
                match existing.get_mut(&key) {
                    Some(slot) => deep_merge(slot, value),
                    None => {
                        existing.insert(key, value);
                    }
                }
            }
        }
        (target, source) => *target = source,
    }
}

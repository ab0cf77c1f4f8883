//! Snapshot - an immutable view of the data at a path.
//!
//! Snapshots are handed to `once` callers and to listeners. Each one owns a
//! copy of its data, so nothing a consumer does can reach back into the
//! store.

use crate::path;
use crate::query::{entry_id, strip_id, to_entries};
use crate::sort::Comparator;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// A point-in-time view of a subtree or scalar.
///
/// `value` distinguishes "nothing there" (`None`) from an explicit `null`
/// (`Some(Value::Null)`); see [`Snapshot::exists`].
#[derive(Clone)]
pub struct Snapshot {
    path: String,
    value: Option<Value>,
    sorting: Option<Comparator>,
}

impl Snapshot {
    /// Create a snapshot of `value` located at `path`.
    pub fn new(path: &str, value: Option<Value>) -> Self {
        Self {
            path: path::normalize(path),
            value,
            sorting: None,
        }
    }

    /// Attach the comparator used by [`Snapshot::for_each`].
    pub fn with_sorting_function(mut self, compare: Comparator) -> Self {
        self.sorting = Some(compare);
        self
    }

    /// Last segment of the snapshot's path; `None` at the root.
    pub fn key(&self) -> Option<&str> {
        path::leaf(&self.path)
    }

    /// Canonical path of the snapshot.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Copy of the data.
    ///
    /// An array of records that all carry an `id` is returned as an object
    /// keyed by those ids.
    pub fn val(&self) -> Option<Value> {
        match &self.value {
            Some(Value::Array(items))
                if !items.is_empty() && items.iter().all(|i| entry_id(i).is_some()) =>
            {
                let map: Map<String, Value> = items
                    .iter()
                    .filter_map(|item| entry_id(item).map(|id| (id, strip_id(item))))
                    .collect();
                Some(Value::Object(map))
            }
            other => other.clone(),
        }
    }

    /// Same as [`Snapshot::val`]; priorities are not modelled.
    pub fn export_val(&self) -> Option<Value> {
        self.val()
    }

    /// Snapshot of a descendant, or `None` when nothing is stored there.
    pub fn child(&self, child_path: &str) -> Option<Snapshot> {
        let mut current = self.val()?;
        for segment in path::segments(child_path) {
            current = match current {
                Value::Object(mut map) => map.shift_remove(segment)?,
                _ => return None,
            };
        }
        Some(Snapshot {
            path: path::join(&self.path, child_path),
            value: Some(current),
            sorting: self.sorting.clone(),
        })
    }

    pub fn has_child(&self, child_path: &str) -> bool {
        self.child(child_path).is_some()
    }

    pub fn has_children(&self) -> bool {
        self.num_children() > 0
    }

    /// Number of direct children. Zero for anything but an object.
    pub fn num_children(&self) -> usize {
        match self.val() {
            Some(Value::Object(map)) => map.len(),
            _ => 0,
        }
    }

    /// `false` only for an explicit `null`. An undefined value counts as
    /// existing: it marks a location that was read but held nothing, which
    /// is different from one that was explicitly nulled.
    pub fn exists(&self) -> bool {
        !matches!(self.value, Some(Value::Null))
    }

    /// Visit each child in the order given by the sorting function.
    ///
    /// Stops and returns `true` as soon as `visit` returns `true`; otherwise
    /// returns `false` once every child was seen.
    pub fn for_each(&self, mut visit: impl FnMut(Snapshot) -> bool) -> bool {
        let Some(Value::Object(map)) = self.val() else {
            return false;
        };

        let mut entries = to_entries(&map);
        if let Some(compare) = &self.sorting {
            entries.sort_by(|a, b| compare(a, b));
        }

        for entry in &entries {
            let Some(id) = entry_id(entry) else { continue };
            let payload = match map.get(&id) {
                Some(value) if value.is_object() => strip_id(value),
                Some(value) => value.clone(),
                None => continue,
            };
            let child = Snapshot {
                path: path::join(&self.path, &id),
                value: Some(payload),
                sorting: self.sorting.clone(),
            };
            if visit(child) {
                return true;
            }
        }
        false
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("path", &self.path)
            .field("value", &self.value)
            .field("sorted", &self.sorting.is_some())
            .finish()
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct View<'a> {
            key: Option<&'a str>,
            value: Option<Value>,
        }

        View {
            key: self.key(),
            value: self.val(),
        }
        .serialize(serializer)
    }
}

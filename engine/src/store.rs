//! Store - the in-memory state container.
//!
//! The Store pairs the data [`Tree`] with the [`ListenerRegistry`]. Every
//! mutation reads the old value, applies the change, and asks the notifier
//! which listeners fire. The resulting [`Notification`]s are returned to the
//! caller for delivery.

use crate::error::{Error, Result};
use crate::listener::{ListenerRegistry, Notification};
use crate::path;
use crate::query::{run_query, QueryDescriptor};
use crate::snapshot::Snapshot;
use crate::sort::comparator;
use crate::tree::Tree;
use serde_json::Value;

/// The main store holding all state.
#[derive(Debug, Default)]
pub struct Store {
    /// All data
    tree: Tree,
    /// Active subscriptions
    listeners: ListenerRegistry,
}

impl Store {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store over an existing tree.
    pub fn with_tree(tree: Tree) -> Self {
        Self {
            tree,
            listeners: ListenerRegistry::new(),
        }
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }

    pub fn listeners_mut(&mut self) -> &mut ListenerRegistry {
        &mut self.listeners
    }

    /// Copy of the value at `path`.
    pub fn get(&self, path: &str) -> Option<Value> {
        self.tree.get(path)
    }

    /// Write `value` at `path`.
    pub fn set(&mut self, path: &str, value: Value) -> Result<Vec<Notification>> {
        validate_write(path, &value)?;
        Ok(self.mutate("set", path, |tree, path| tree.set(path, value)))
    }

    /// Shallow-merge `partial` into the value at `path`.
    pub fn update(&mut self, path: &str, partial: Value) -> Result<Vec<Notification>> {
        validate_write(path, &partial)?;
        Ok(self.mutate("update", path, |tree, path| tree.update(path, partial)))
    }

    /// Remove the value at `path`.
    pub fn remove(&mut self, path: &str) -> Result<Vec<Notification>> {
        path::validate(path)?;
        Ok(self.mutate("remove", path, |tree, path| tree.remove(path)))
    }

    /// Apply a `set` for each entry, in order.
    ///
    /// All paths are validated before anything is written, so an invalid
    /// entry leaves the store untouched.
    pub fn multi_path_update(
        &mut self,
        entries: impl IntoIterator<Item = (String, Value)>,
    ) -> Result<Vec<Notification>> {
        let entries: Vec<(String, Value)> = entries.into_iter().collect();
        for (path, value) in &entries {
            validate_write(path, value)?;
        }

        let mut notifications = Vec::new();
        for (path, value) in entries {
            notifications.extend(self.mutate("set", &path, |tree, path| tree.set(path, value)));
        }
        Ok(notifications)
    }

    /// Bulk-merge raw data into the tree without notifying anyone.
    pub fn load(&mut self, state: Value, clear_first: bool) {
        if clear_first {
            self.tree.clear();
        }
        self.tree.merge(state);
        tracing::debug!(clear_first, "store loaded");
    }

    /// Clear all data and remove every listener.
    pub fn reset(&mut self) {
        self.tree.clear();
        self.listeners.remove_all();
        tracing::debug!("store reset");
    }

    /// Run a query and wrap the result in a snapshot.
    ///
    /// Missing data stays undefined; only a stored `null` reads as null.
    pub fn query(&self, query: &QueryDescriptor) -> Snapshot {
        let result = run_query(query, self.tree.get(&query.path));
        Snapshot::new(&query.path, result)
            .with_sorting_function(comparator(&query.order()))
    }

    fn mutate(
        &mut self,
        op: &'static str,
        path: &str,
        apply: impl FnOnce(&mut Tree, &str),
    ) -> Vec<Notification> {
        let path = path::normalize(path);
        let old = self.tree.get(&path);
        apply(&mut self.tree, &path);
        let new = self.tree.get(&path);

        let notifications = self
            .listeners
            .notify(&self.tree, &path, new.as_ref(), old.as_ref());
        tracing::debug!(op, path = %path, notified = notifications.len(), "store mutated");
        notifications
    }
}

/// Check the path, and that a write at the root keeps it an object.
fn validate_write(path: &str, value: &Value) -> Result<()> {
    path::validate(path)?;
    if path::segments(path).is_empty() && !(value.is_object() || value.is_null()) {
        return Err(Error::NonObjectRoot);
    }
    Ok(())
}

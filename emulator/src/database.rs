//! The database handle shared by every reference.
//!
//! A [`Database`] owns one engine [`Store`] behind a mutex. Mutations lock
//! the store, apply the change, release the lock, and only then deliver the
//! resulting notifications, so listener callbacks are free to read or write
//! the same database.

use crate::config::Config;
use crate::delay::{Delay, DelayProfile};
use crate::error::Result;
use crate::push_id::PushIdGenerator;
use crate::reference::Reference;
use mockbase_engine::{
    EventType, ListenerId, ListenerInfo, ListenerRecord, Notification, Store, Tree,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

struct Inner {
    store: Mutex<Store>,
    delay: Mutex<Delay>,
    push_ids: Mutex<PushIdGenerator>,
}

/// Handle to an in-memory database. Clones share the same data.
#[derive(Clone)]
pub struct Database {
    inner: Arc<Inner>,
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("delay", &self.delay_profile())
            .field("listeners", &self.listener_count(None))
            .finish()
    }
}

impl Database {
    /// Create an empty database with the default delay.
    pub fn new() -> Self {
        Self::with_store(Store::new(), DelayProfile::default())
    }

    /// Create an empty database with the given delay profile.
    pub fn with_delay(profile: DelayProfile) -> Self {
        Self::with_store(Store::new(), profile)
    }

    /// Build a database from configuration, loading the seed document if
    /// one is configured.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = match &config.seed_path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                Store::with_tree(Tree::from_json(&raw)?)
            }
            None => Store::new(),
        };
        tracing::info!(
            delay = %config.delay,
            seed = ?config.seed_path,
            "database created from config"
        );
        Ok(Self::with_store(store, config.delay))
    }

    fn with_store(store: Store, profile: DelayProfile) -> Self {
        Self {
            inner: Arc::new(Inner {
                store: Mutex::new(store),
                delay: Mutex::new(Delay::new(profile)),
                push_ids: Mutex::new(PushIdGenerator::new()),
            }),
        }
    }

    /// Reference to `path` (slash or dot notation).
    pub fn reference(&self, path: &str) -> Reference {
        Reference::new(self.clone(), path)
    }

    /// Reference to the root of the tree.
    pub fn root(&self) -> Reference {
        self.reference("")
    }

    // ------------------------------------------------------------------
    // Admin
    // ------------------------------------------------------------------

    /// Deep-merge raw data into the tree. No listener fires.
    pub fn update_db(&self, state: Value, clear_first: bool) {
        self.inner.store.lock().load(state, clear_first);
    }

    pub fn set_delay(&self, profile: DelayProfile) {
        self.inner.delay.lock().set_profile(profile);
    }

    pub fn delay_profile(&self) -> DelayProfile {
        self.inner.delay.lock().profile()
    }

    /// Clear all data and drop every listener.
    pub fn reset(&self) {
        self.inner.store.lock().reset();
    }

    /// Raw copy of the value at `path`, without delay or query processing.
    pub fn value(&self, path: &str) -> Option<Value> {
        self.inner.store.lock().get(path)
    }

    // ------------------------------------------------------------------
    // Listener registry
    // ------------------------------------------------------------------

    /// Remove listeners matching every given filter, invoking their cancel
    /// callbacks. Returns how many were removed.
    pub fn remove_listener(
        &self,
        event_type: Option<EventType>,
        id: Option<ListenerId>,
        context: Option<&str>,
    ) -> usize {
        let removed = self
            .inner
            .store
            .lock()
            .listeners_mut()
            .remove_listener(event_type, id, context);
        cancel_all(removed)
    }

    /// Drop every listener without invoking cancel callbacks.
    pub fn remove_all_listeners(&self) -> usize {
        self.inner.store.lock().listeners_mut().remove_all()
    }

    pub fn listener_count(&self, event_type: Option<EventType>) -> usize {
        self.inner.store.lock().listeners().len(event_type)
    }

    pub fn listener_paths(&self, event_type: Option<EventType>) -> Vec<String> {
        self.inner.store.lock().listeners().paths(event_type)
    }

    pub fn get_listeners(&self, event_type: Option<EventType>) -> Vec<ListenerInfo> {
        self.inner.store.lock().listeners().listeners(event_type)
    }

    // ------------------------------------------------------------------
    // Crate internals
    // ------------------------------------------------------------------

    /// Run `f` against the store while holding the lock.
    pub(crate) fn with_store_locked<R>(&self, f: impl FnOnce(&mut Store) -> R) -> R {
        f(&mut self.inner.store.lock())
    }

    /// Apply a mutation, then deliver its notifications with the lock
    /// released.
    pub(crate) fn apply(
        &self,
        mutation: impl FnOnce(&mut Store) -> mockbase_engine::Result<Vec<Notification>>,
    ) -> Result<()> {
        let notifications = self.with_store_locked(mutation)?;
        for notification in notifications {
            notification.deliver();
        }
        Ok(())
    }

    pub(crate) fn next_delay(&self) -> Duration {
        self.inner.delay.lock().next()
    }

    pub(crate) fn next_push_id(&self) -> String {
        self.inner.push_ids.lock().generate()
    }
}

/// Invoke the cancel callback of each removed listener; returns the count.
pub(crate) fn cancel_all(removed: Vec<Arc<ListenerRecord>>) -> usize {
    for listener in &removed {
        listener.cancel();
    }
    removed.len()
}

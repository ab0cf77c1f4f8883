//! References - writable locations in the tree.
//!
//! Every mutation is applied and dispatched to listeners before the method
//! returns. The returned future only models network latency: it resolves
//! after the configured delay. An optional completion callback runs
//! synchronously with the outcome.

use crate::database::Database;
use crate::delay::delayed;
use crate::error::{Error, Result};
use crate::query::Query;
use futures::future::{self, BoxFuture};
use futures::FutureExt;
use mockbase_engine::{path, CancelCallback, EventType, ListenerId, Snapshot};
use serde_json::Value;
use std::fmt;

/// Callback invoked with the outcome of a write, before its delay elapses.
pub type OnComplete = Box<dyn FnOnce(Option<&Error>) + Send>;

/// A location in the database.
#[derive(Clone)]
pub struct Reference {
    query: Query,
}

impl Reference {
    pub(crate) fn new(db: Database, path: &str) -> Self {
        Self {
            query: Query::new(db, path),
        }
    }

    fn db(&self) -> &Database {
        self.query.database()
    }

    /// A query over this location with no ordering or filters applied.
    pub fn query(&self) -> Query {
        self.query.clone()
    }

    /// Last segment of the path; `None` for the root.
    pub fn key(&self) -> Option<&str> {
        path::leaf(self.path())
    }

    /// Canonical (dot-separated) path.
    pub fn path(&self) -> &str {
        self.query.path()
    }

    pub fn child(&self, child_path: &str) -> Reference {
        Reference::new(self.db().clone(), &path::join(self.path(), child_path))
    }

    /// The enclosing location; `None` for the root.
    pub fn parent(&self) -> Option<Reference> {
        path::parent(self.path()).map(|parent| Reference::new(self.db().clone(), &parent))
    }

    pub fn root(&self) -> Reference {
        self.db().root()
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Replace the value at this location.
    pub fn set(
        &self,
        value: Value,
        on_complete: Option<OnComplete>,
    ) -> BoxFuture<'static, Result<()>> {
        let path = self.path().to_string();
        let result = self.db().apply(|store| store.set(&path, value));
        self.complete(result, on_complete)
    }

    /// Merge `values` into this location.
    ///
    /// When every key contains a `/` the keys are treated as paths relative
    /// to this reference and each one is written independently; otherwise
    /// the object is shallow-merged into the existing value.
    pub fn update(
        &self,
        values: Value,
        on_complete: Option<OnComplete>,
    ) -> BoxFuture<'static, Result<()>> {
        let base = self.path().to_string();
        let result = match values {
            Value::Object(map) if is_multi_path(&map) => {
                let entries: Vec<(String, Value)> = map
                    .into_iter()
                    .map(|(key, value)| (path::join(&base, &key), value))
                    .collect();
                tracing::debug!(path = %base, entries = entries.len(), "multi-path update");
                self.db().apply(|store| store.multi_path_update(entries))
            }
            other => self.db().apply(|store| store.update(&base, other)),
        };
        self.complete(result, on_complete)
    }

    /// Delete this location.
    pub fn remove(&self, on_complete: Option<OnComplete>) -> BoxFuture<'static, Result<()>> {
        let path = self.path().to_string();
        let result = self.db().apply(|store| store.remove(&path));
        self.complete(result, on_complete)
    }

    /// Write `value` under a freshly generated child key and return a
    /// reference to it.
    pub fn push(
        &self,
        value: Value,
        on_complete: Option<OnComplete>,
    ) -> BoxFuture<'static, Result<Reference>> {
        let child = self.child(&self.db().next_push_id());
        let path = child.path().to_string();
        let result = self
            .db()
            .apply(|store| store.set(&path, value))
            .map(|()| child);
        self.complete(result, on_complete)
    }

    /// Writes queued for disconnection. Nothing is ever queued.
    pub fn on_disconnect(&self) -> OnDisconnect {
        OnDisconnect {
            path: self.path().to_string(),
        }
    }

    fn complete<T: Send + 'static>(
        &self,
        result: Result<T>,
        on_complete: Option<OnComplete>,
    ) -> BoxFuture<'static, Result<T>> {
        if let Some(callback) = on_complete {
            callback(result.as_ref().err());
        }
        match result {
            Ok(value) => delayed(Ok(value), self.db().next_delay()),
            Err(err) => {
                tracing::debug!(path = %self.path(), error = %err, "write rejected");
                future::ready(Err(err)).boxed()
            }
        }
    }

    // ------------------------------------------------------------------
    // Query forwarding
    // ------------------------------------------------------------------

    pub fn order_by_key(&self) -> Query {
        self.query().order_by_key()
    }

    pub fn order_by_value(&self) -> Query {
        self.query().order_by_value()
    }

    pub fn order_by_child(&self, prop: impl Into<String>) -> Query {
        self.query().order_by_child(prop)
    }

    pub fn order_by_priority(&self) -> Query {
        self.query().order_by_priority()
    }

    pub fn equal_to(&self, value: impl Into<Value>, key: Option<&str>) -> Result<Query> {
        self.query().equal_to(value, key)
    }

    pub fn start_at(&self, value: impl Into<Value>, key: Option<&str>) -> Query {
        self.query().start_at(value, key)
    }

    pub fn end_at(&self, value: impl Into<Value>, key: Option<&str>) -> Query {
        self.query().end_at(value, key)
    }

    pub fn limit_to_first(&self, n: usize) -> Query {
        self.query().limit_to_first(n)
    }

    pub fn limit_to_last(&self, n: usize) -> Query {
        self.query().limit_to_last(n)
    }

    pub fn once(&self, event_type: EventType) -> BoxFuture<'static, Result<Snapshot>> {
        self.query.once(event_type)
    }

    pub fn on(
        &self,
        event_type: EventType,
        callback: impl Fn(&Snapshot) + Send + Sync + 'static,
    ) -> ListenerId {
        self.query.on(event_type, callback)
    }

    pub fn on_with(
        &self,
        event_type: EventType,
        callback: impl Fn(&Snapshot) + Send + Sync + 'static,
        cancel_callback: Option<CancelCallback>,
        context: Option<String>,
    ) -> ListenerId {
        self.query.on_with(event_type, callback, cancel_callback, context)
    }

    pub fn off(&self, event_type: Option<EventType>) -> usize {
        self.query.off(event_type)
    }
}

fn is_multi_path(map: &serde_json::Map<String, Value>) -> bool {
    !map.is_empty() && map.keys().all(|key| key.contains('/'))
}

/// Slash notation, root as `/`.
impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&path::to_slashed(self.path()))
    }
}

impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reference")
            .field("path", &self.path())
            .finish()
    }
}

/// Disconnect hooks for a location.
///
/// There is no connection to lose, so every call resolves immediately
/// without queuing anything.
#[derive(Debug, Clone)]
pub struct OnDisconnect {
    path: String,
}

impl OnDisconnect {
    pub fn set(&self, _value: Value) -> BoxFuture<'static, Result<()>> {
        self.ignored("set")
    }

    pub fn update(&self, _values: Value) -> BoxFuture<'static, Result<()>> {
        self.ignored("update")
    }

    pub fn remove(&self) -> BoxFuture<'static, Result<()>> {
        self.ignored("remove")
    }

    pub fn cancel(&self) -> BoxFuture<'static, Result<()>> {
        self.ignored("cancel")
    }

    fn ignored(&self, op: &'static str) -> BoxFuture<'static, Result<()>> {
        tracing::debug!(op, path = %self.path, "onDisconnect call ignored");
        future::ready(Ok(())).boxed()
    }
}

//! Query facade.
//!
//! A [`Query`] pairs a database handle with a [`QueryDescriptor`]. Builder
//! calls consume the query and return a new one; `once` reads through the
//! engine's query pipeline and `on` registers listeners at the query path.

use crate::database::{cancel_all, Database};
use crate::delay::delayed;
use crate::error::{Error, Result};
use futures::future::{self, BoxFuture};
use futures::FutureExt;
use mockbase_engine::{CancelCallback, EventType, ListenerId, QueryDescriptor, Snapshot};
use serde_json::Value;
use std::sync::Arc;

/// A location plus ordering, filters and limits.
#[derive(Clone)]
pub struct Query {
    db: Database,
    descriptor: QueryDescriptor,
}

impl Query {
    pub(crate) fn new(db: Database, path: &str) -> Self {
        Self {
            db,
            descriptor: QueryDescriptor::new(path),
        }
    }

    pub fn descriptor(&self) -> &QueryDescriptor {
        &self.descriptor
    }

    /// Canonical path the query reads.
    pub fn path(&self) -> &str {
        &self.descriptor.path
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    fn map(self, f: impl FnOnce(QueryDescriptor) -> QueryDescriptor) -> Self {
        Self {
            db: self.db,
            descriptor: f(self.descriptor),
        }
    }

    pub fn order_by_key(self) -> Self {
        self.map(QueryDescriptor::order_by_key)
    }

    pub fn order_by_value(self) -> Self {
        self.map(QueryDescriptor::order_by_value)
    }

    pub fn order_by_child(self, prop: impl Into<String>) -> Self {
        self.map(|d| d.order_by_child(prop))
    }

    /// Accepted for compatibility; priorities are not modelled.
    pub fn order_by_priority(self) -> Self {
        self
    }

    /// Fails when `key` is given while ordering by key.
    pub fn equal_to(self, value: impl Into<Value>, key: Option<&str>) -> Result<Self> {
        let descriptor = self.descriptor.equal_to(value, key)?;
        Ok(Self {
            db: self.db,
            descriptor,
        })
    }

    pub fn start_at(self, value: impl Into<Value>, key: Option<&str>) -> Self {
        self.map(|d| d.start_at(value, key))
    }

    pub fn end_at(self, value: impl Into<Value>, key: Option<&str>) -> Self {
        self.map(|d| d.end_at(value, key))
    }

    pub fn limit_to_first(self, n: usize) -> Self {
        self.map(|d| d.limit_to_first(n))
    }

    pub fn limit_to_last(self, n: usize) -> Self {
        self.map(|d| d.limit_to_last(n))
    }

    /// Read the query result once.
    ///
    /// The data is captured when this is called; the returned future yields
    /// it after the simulated delay. Only [`EventType::Value`] is supported;
    /// other event types fail immediately.
    pub fn once(&self, event_type: EventType) -> BoxFuture<'static, Result<Snapshot>> {
        if event_type != EventType::Value {
            return future::ready(Err(Error::UnsupportedEvent(event_type))).boxed();
        }
        let snapshot = self
            .db
            .with_store_locked(|store| store.query(&self.descriptor));
        delayed(Ok(snapshot), self.db.next_delay())
    }

    /// Register `callback` for `event_type` at this query's path.
    pub fn on(
        &self,
        event_type: EventType,
        callback: impl Fn(&Snapshot) + Send + Sync + 'static,
    ) -> ListenerId {
        self.on_with(event_type, callback, None, None)
    }

    /// Register a listener with an optional cancel callback and context tag.
    pub fn on_with(
        &self,
        event_type: EventType,
        callback: impl Fn(&Snapshot) + Send + Sync + 'static,
        cancel_callback: Option<CancelCallback>,
        context: Option<String>,
    ) -> ListenerId {
        let path = self.path().to_string();
        self.db.with_store_locked(|store| {
            store.listeners_mut().add(
                &path,
                event_type,
                Arc::new(callback),
                cancel_callback,
                context,
            )
        })
    }

    /// Remove the listeners registered at this path, optionally only those
    /// of one event type. Cancel callbacks run; returns the count.
    pub fn off(&self, event_type: Option<EventType>) -> usize {
        let path = self.path().to_string();
        let removed = self
            .db
            .with_store_locked(|store| store.listeners_mut().remove_at(&path, event_type));
        cancel_all(removed)
    }
}

impl std::fmt::Debug for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

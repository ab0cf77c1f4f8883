//! Listener registry and notifier.
//!
//! The registry keeps every active subscription in registration order. On
//! each store mutation the notifier decides which listeners fire and builds
//! the snapshot each one receives. Building is separate from delivery: the
//! store returns [`Notification`]s and the caller delivers them once it no
//! longer holds the store, so a callback may freely read or write the same
//! database.

use crate::error::{Error, Result};
use crate::path;
use crate::query::strip_id;
use crate::snapshot::Snapshot;
use crate::sort::order_by_key;
use crate::tree::Tree;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Identifier handed out when a listener is registered.
pub type ListenerId = u64;

/// Callback receiving the snapshot of an event.
pub type Callback = Arc<dyn Fn(&Snapshot) + Send + Sync>;

/// Callback invoked when a listener is cancelled.
pub type CancelCallback = Arc<dyn Fn() + Send + Sync>;

/// The kinds of events a listener can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Value,
    ChildAdded,
    ChildChanged,
    ChildRemoved,
    ChildMoved,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Value => "value",
            EventType::ChildAdded => "child_added",
            EventType::ChildChanged => "child_changed",
            EventType::ChildRemoved => "child_removed",
            EventType::ChildMoved => "child_moved",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "value" => Ok(EventType::Value),
            "child_added" => Ok(EventType::ChildAdded),
            "child_changed" => Ok(EventType::ChildChanged),
            "child_removed" => Ok(EventType::ChildRemoved),
            "child_moved" => Ok(EventType::ChildMoved),
            other => Err(Error::InvalidEventType(other.to_string())),
        }
    }
}

/// A registered subscription.
#[derive(Clone)]
pub struct ListenerRecord {
    pub id: ListenerId,
    /// Canonical path the listener watches
    pub path: String,
    pub event_type: EventType,
    pub callback: Callback,
    pub cancel_callback: Option<CancelCallback>,
    /// Caller-chosen tag used to remove groups of listeners together
    pub context: Option<String>,
}

impl ListenerRecord {
    /// Run the cancel callback, if any. Returns whether one was present.
    pub fn cancel(&self) -> bool {
        match &self.cancel_callback {
            Some(cancel) => {
                cancel();
                true
            }
            None => false,
        }
    }

    /// Plain-data description of the listener.
    pub fn info(&self) -> ListenerInfo {
        ListenerInfo {
            id: self.id,
            path: self.path.clone(),
            event_type: self.event_type,
            context: self.context.clone(),
            has_cancel_callback: self.cancel_callback.is_some(),
        }
    }
}

impl fmt::Debug for ListenerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRecord")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("event_type", &self.event_type)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

/// Description of a listener without its callbacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListenerInfo {
    pub id: ListenerId,
    pub path: String,
    pub event_type: EventType,
    pub context: Option<String>,
    pub has_cancel_callback: bool,
}

/// An event ready to be handed to a listener.
#[derive(Debug)]
pub struct Notification {
    listener: Arc<ListenerRecord>,
    event: EventType,
    snapshot: Snapshot,
}

impl Notification {
    pub fn listener_id(&self) -> ListenerId {
        self.listener.id
    }

    pub fn event(&self) -> EventType {
        self.event
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Invoke the listener's callback.
    pub fn deliver(self) {
        (self.listener.callback)(&self.snapshot);
    }
}

/// All active listeners, in registration order.
#[derive(Debug)]
pub struct ListenerRegistry {
    listeners: Vec<Arc<ListenerRecord>>,
    next_id: ListenerId,
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 1,
        }
    }

    /// Register a listener and return its id.
    pub fn add(
        &mut self,
        path: &str,
        event_type: EventType,
        callback: Callback,
        cancel_callback: Option<CancelCallback>,
        context: Option<String>,
    ) -> ListenerId {
        let id = self.next_id;
        self.next_id += 1;

        let record = ListenerRecord {
            id,
            path: path::normalize(path),
            event_type,
            callback,
            cancel_callback,
            context,
        };
        tracing::debug!(id, path = %record.path, event = %event_type, "listener registered");
        self.listeners.push(Arc::new(record));
        id
    }

    /// Value listeners at `path` or any of its ancestors.
    pub fn find_value_listeners(&self, path: &str) -> Vec<Arc<ListenerRecord>> {
        self.listeners
            .iter()
            .filter(|l| l.event_type == EventType::Value && path::is_within(path, &l.path))
            .cloned()
            .collect()
    }

    /// Child listeners registered exactly at `path`, narrowed to `events`
    /// unless `events` is empty.
    pub fn find_child_listeners(
        &self,
        path: &str,
        events: &[EventType],
    ) -> Vec<Arc<ListenerRecord>> {
        let path = path::normalize(path);
        self.listeners
            .iter()
            .filter(|l| l.event_type != EventType::Value && l.path == path)
            .filter(|l| events.is_empty() || events.contains(&l.event_type))
            .cloned()
            .collect()
    }

    /// Remove every listener matching all of the given filters and return
    /// the removed records. A `None` filter matches anything.
    pub fn remove_listener(
        &mut self,
        event_type: Option<EventType>,
        id: Option<ListenerId>,
        context: Option<&str>,
    ) -> Vec<Arc<ListenerRecord>> {
        self.remove_where(|l| {
            event_type.map_or(true, |e| l.event_type == e)
                && id.map_or(true, |id| l.id == id)
                && context.map_or(true, |c| l.context.as_deref() == Some(c))
        })
    }

    /// Remove the listeners registered exactly at `path`.
    pub fn remove_at(
        &mut self,
        path: &str,
        event_type: Option<EventType>,
    ) -> Vec<Arc<ListenerRecord>> {
        let path = path::normalize(path);
        self.remove_where(|l| {
            l.path == path && event_type.map_or(true, |e| l.event_type == e)
        })
    }

    /// Drop every listener. Returns how many there were.
    pub fn remove_all(&mut self) -> usize {
        let count = self.listeners.len();
        self.listeners.clear();
        tracing::debug!(count, "all listeners removed");
        count
    }

    fn remove_where(
        &mut self,
        matches: impl Fn(&ListenerRecord) -> bool,
    ) -> Vec<Arc<ListenerRecord>> {
        let (removed, kept): (Vec<_>, Vec<_>) =
            self.listeners.drain(..).partition(|l| matches(l.as_ref()));
        self.listeners = kept;
        for l in &removed {
            tracing::debug!(id = l.id, path = %l.path, event = %l.event_type, "listener removed");
        }
        removed
    }

    /// Number of listeners, optionally of one event type.
    pub fn len(&self, event_type: Option<EventType>) -> usize {
        self.matching(event_type).count()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Distinct listener paths, in registration order.
    pub fn paths(&self, event_type: Option<EventType>) -> Vec<String> {
        let mut paths: Vec<String> = Vec::new();
        for l in self.matching(event_type) {
            if !paths.contains(&l.path) {
                paths.push(l.path.clone());
            }
        }
        paths
    }

    /// Descriptions of the listeners, optionally of one event type.
    pub fn listeners(&self, event_type: Option<EventType>) -> Vec<ListenerInfo> {
        self.matching(event_type).map(|l| l.info()).collect()
    }

    fn matching(
        &self,
        event_type: Option<EventType>,
    ) -> impl Iterator<Item = &Arc<ListenerRecord>> {
        self.listeners
            .iter()
            .filter(move |l| event_type.map_or(true, |e| l.event_type == e))
    }

    /// Work out the events caused by a mutation at `path`.
    ///
    /// `tree` must already reflect the mutation. Nothing fires when `new`
    /// and `old` are equal; object key order is ignored in that comparison.
    /// Value listeners at or above `path` get a fresh read of their own
    /// location. Child listeners on the parent of `path` hear about inserts
    /// (`child_added`, `child_changed`) and removals (`child_removed`,
    /// `child_changed`). Changing a child that already existed produces no
    /// child event; only value listeners see it.
    pub fn notify(
        &self,
        tree: &Tree,
        path: &str,
        new: Option<&Value>,
        old: Option<&Value>,
    ) -> Vec<Notification> {
        if new == old {
            return Vec::new();
        }
        let path = path::normalize(path);
        let mut out = Vec::new();

        for listener in self.find_value_listeners(&path) {
            let snapshot = Snapshot::new(&listener.path, tree.get(&listener.path))
                .with_sorting_function(order_by_key());
            out.push(Notification {
                listener,
                event: EventType::Value,
                snapshot,
            });
        }

        let Some(parent) = path::parent(&path) else {
            return out;
        };
        let (events, value) = match (new, old) {
            (None, _) => ([EventType::ChildRemoved, EventType::ChildChanged], None),
            (Some(new), None) => (
                [EventType::ChildAdded, EventType::ChildChanged],
                Some(strip_id(new)),
            ),
            (Some(_), Some(_)) => return out,
        };
        for listener in self.find_child_listeners(&parent, &events) {
            let event = listener.event_type;
            let snapshot =
                Snapshot::new(&path, value.clone()).with_sorting_function(order_by_key());
            out.push(Notification {
                listener,
                event,
                snapshot,
            });
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    type Seen = Vec<(Option<String>, Option<Value>)>;

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Seen>>);

    impl Recorder {
        fn callback(&self) -> Callback {
            let seen = self.0.clone();
            Arc::new(move |snap: &Snapshot| {
                seen.lock()
                    .unwrap()
                    .push((snap.key().map(str::to_string), snap.val()));
            })
        }

        fn seen(&self) -> Seen {
            self.0.lock().unwrap().clone()
        }
    }

    fn deliver(notes: Vec<Notification>) {
        notes.into_iter().for_each(Notification::deliver);
    }

    #[test]
    fn event_type_strings() {
        assert_eq!(EventType::ChildAdded.to_string(), "child_added");
        assert_eq!("child_removed".parse::<EventType>(), Ok(EventType::ChildRemoved));
        assert!(matches!(
            "nope".parse::<EventType>(),
            Err(Error::InvalidEventType(_))
        ));
    }

    #[test]
    fn value_listener_lookup_is_prefix_based() {
        let rec = Recorder::default();
        let mut reg = ListenerRegistry::new();
        reg.add("/users", EventType::Value, rec.callback(), None, None);
        reg.add("/", EventType::Value, rec.callback(), None, None);
        reg.add("/users2", EventType::Value, rec.callback(), None, None);
        reg.add("/users", EventType::ChildAdded, rec.callback(), None, None);

        let found = reg.find_value_listeners("users.abc.name");
        let paths: Vec<_> = found.iter().map(|l| l.path.as_str()).collect();
        assert_eq!(paths, vec!["users", ""]);
    }

    #[test]
    fn child_listener_lookup_is_exact() {
        let rec = Recorder::default();
        let mut reg = ListenerRegistry::new();
        reg.add("/users", EventType::ChildAdded, rec.callback(), None, None);
        reg.add("/users", EventType::ChildRemoved, rec.callback(), None, None);
        reg.add("/users/abc", EventType::ChildAdded, rec.callback(), None, None);
        reg.add("/users", EventType::Value, rec.callback(), None, None);

        assert_eq!(reg.find_child_listeners("users", &[]).len(), 2);
        assert_eq!(
            reg.find_child_listeners("/users", &[EventType::ChildRemoved]).len(),
            1
        );
    }

    #[test]
    fn notify_skips_identical_values() {
        let rec = Recorder::default();
        let mut reg = ListenerRegistry::new();
        reg.add("/", EventType::Value, rec.callback(), None, None);
        let tree = Tree::new();
        let v = json!({"a": 1});
        assert!(reg.notify(&tree, "x", Some(&v), Some(&v)).is_empty());
    }

    #[test]
    fn notify_value_listener_reads_its_own_path() {
        let rec = Recorder::default();
        let mut reg = ListenerRegistry::new();
        reg.add("/users", EventType::Value, rec.callback(), None, None);

        let mut tree = Tree::new();
        tree.set("users.a", json!({"n": 1}));
        tree.set("users.b", json!({"n": 2}));

        deliver(reg.notify(&tree, "users.b", Some(&json!({"n": 2})), None));
        assert_eq!(
            rec.seen(),
            vec![(
                Some("users".to_string()),
                Some(json!({"a": {"n": 1}, "b": {"n": 2}}))
            )]
        );
    }

    #[test]
    fn notify_child_events() {
        let added = Recorder::default();
        let removed = Recorder::default();
        let changed = Recorder::default();
        let mut reg = ListenerRegistry::new();
        reg.add("/users", EventType::ChildAdded, added.callback(), None, None);
        reg.add("/users", EventType::ChildRemoved, removed.callback(), None, None);
        reg.add("/users", EventType::ChildChanged, changed.callback(), None, None);
        let tree = Tree::new();

        let v = json!({"n": 1});
        deliver(reg.notify(&tree, "users.a", Some(&v), None));
        assert_eq!(added.seen(), vec![(Some("a".into()), Some(v.clone()))]);
        assert!(removed.seen().is_empty());
        assert_eq!(changed.seen().len(), 1);

        deliver(reg.notify(&tree, "users.a", None, Some(&v)));
        assert_eq!(removed.seen(), vec![(Some("a".into()), None)]);
        assert_eq!(changed.seen().len(), 2);

        // in-place change: no child events
        let notes = reg.notify(&tree, "users.a", Some(&json!({"n": 2})), Some(&v));
        assert!(notes.is_empty());
    }

    #[test]
    fn child_added_payload_drops_id_field() {
        let added = Recorder::default();
        let mut reg = ListenerRegistry::new();
        reg.add("/users", EventType::ChildAdded, added.callback(), None, None);

        let v = json!({"id": "fresh", "name": "Ann"});
        deliver(reg.notify(&Tree::new(), "users.fresh", Some(&v), None));
        assert_eq!(
            added.seen(),
            vec![(Some("fresh".into()), Some(json!({"name": "Ann"})))]
        );
    }

    #[test]
    fn equal_values_in_different_key_order_are_not_a_change() {
        let rec = Recorder::default();
        let mut reg = ListenerRegistry::new();
        reg.add("/a", EventType::Value, rec.callback(), None, None);

        let old = json!({"x": 1, "y": 2});
        let new = json!({"y": 2, "x": 1});
        assert!(reg.notify(&Tree::new(), "a", Some(&new), Some(&old)).is_empty());
    }

    #[test]
    fn remove_listener_filters() {
        let rec = Recorder::default();
        let mut reg = ListenerRegistry::new();
        let first = reg.add("/a", EventType::Value, rec.callback(), None, Some("ui".into()));
        reg.add("/b", EventType::Value, rec.callback(), None, Some("sync".into()));
        reg.add("/c", EventType::ChildAdded, rec.callback(), None, Some("ui".into()));

        let removed = reg.remove_listener(None, None, Some("ui"));
        assert_eq!(removed.len(), 2);
        assert_eq!(removed[0].id, first);
        assert_eq!(reg.len(None), 1);

        assert!(reg.remove_listener(Some(EventType::ChildAdded), None, None).is_empty());
        assert_eq!(reg.remove_listener(Some(EventType::Value), None, None).len(), 1);
        assert!(reg.is_empty());
    }

    #[test]
    fn remove_at_path_and_cancel() {
        let cancelled = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = cancelled.clone();
        let cancel: CancelCallback = Arc::new(move || {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });

        let rec = Recorder::default();
        let mut reg = ListenerRegistry::new();
        reg.add("/a", EventType::Value, rec.callback(), Some(cancel), None);
        reg.add("/a", EventType::ChildAdded, rec.callback(), None, None);
        reg.add("/a/b", EventType::Value, rec.callback(), None, None);

        let removed = reg.remove_at("a", Some(EventType::Value));
        assert_eq!(removed.len(), 1);
        assert!(removed[0].cancel());
        assert_eq!(cancelled.load(std::sync::atomic::Ordering::SeqCst), 1);

        let removed = reg.remove_at("/a", None);
        assert_eq!(removed.len(), 1);
        assert!(!removed[0].cancel());
        assert_eq!(reg.len(None), 1);
    }

    #[test]
    fn counting_and_paths() {
        let rec = Recorder::default();
        let mut reg = ListenerRegistry::new();
        reg.add("/a", EventType::Value, rec.callback(), None, None);
        reg.add("/a", EventType::ChildAdded, rec.callback(), None, None);
        reg.add("/b", EventType::Value, rec.callback(), None, Some("tag".into()));

        assert_eq!(reg.len(None), 3);
        assert_eq!(reg.len(Some(EventType::Value)), 2);
        assert_eq!(reg.paths(None), vec!["a", "b"]);
        assert_eq!(reg.paths(Some(EventType::ChildAdded)), vec!["a"]);

        let infos = reg.listeners(Some(EventType::Value));
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[1].context.as_deref(), Some("tag"));
        assert!(!infos[1].has_cancel_callback);

        assert_eq!(reg.remove_all(), 3);
        assert!(reg.is_empty());
    }
}

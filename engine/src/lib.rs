//! # Mockbase Engine
//!
//! The deterministic core of an in-memory realtime-database emulator.
//!
//! This crate owns the JSON tree, the query pipeline, and the listener
//! registry. It never sleeps, spawns, or touches the network: every mutation
//! returns the list of notifications to deliver and leaves delivery timing to
//! the caller.
//!
//! ## Design Principles
//!
//! - **No IO**: Engine has no knowledge of timers, files, or transport
//! - **Deterministic**: Same inputs always produce same outputs
//! - **Testable**: Pure logic, no mocks needed
//!
//! ## Core Concepts
//!
//! ### Paths
//!
//! Locations are dot-separated strings with the root at `""`. Callers may use
//! slash notation (`/users/abc`); [`path::normalize`] converts between the two.
//!
//! ### Tree
//!
//! The [`Tree`] is a single `serde_json` object. Writes create intermediate
//! objects as needed; removal deletes the key from its parent.
//!
//! ### Queries
//!
//! A [`QueryDescriptor`] records ordering, filters, and limits. [`run_query`]
//! applies it to the data found at the query path:
//! - flat maps are sorted and limited
//! - record lists are sorted, filtered, limited, and reassembled by id
//! - anything else passes through untouched
//!
//! Comparators produced by [`sort`] rank the larger element first.
//!
//! ### Listeners
//!
//! The [`ListenerRegistry`] stores subscriptions. After each change the
//! notifier produces a [`Notification`] per listener that should fire.
//!
//! ## Quick Start
//!
//! ```rust
//! use mockbase_engine::{QueryDescriptor, Store};
//! use serde_json::json;
//!
//! let mut store = Store::new();
//! store
//!     .set("/users", json!({"a": {"age": 30}, "b": {"age": 50}}))
//!     .unwrap();
//!
//! let query = QueryDescriptor::new("/users").order_by_child("age").limit_to_first(1);
//! let snap = store.query(&query);
//! assert_eq!(snap.val(), Some(json!({"b": {"age": 50}})));
//! ```

pub mod error;
pub mod filter;
pub mod listener;
pub mod path;
pub mod query;
pub mod snapshot;
pub mod sort;
pub mod store;
pub mod tree;

// Re-export main types at crate root
pub use error::{Error, Result};
pub use filter::Bound;
pub use listener::{
    Callback, CancelCallback, EventType, ListenerId, ListenerInfo, ListenerRecord,
    ListenerRegistry, Notification,
};
pub use query::{run_query, QueryDescriptor, Shape};
pub use snapshot::Snapshot;
pub use sort::{Comparator, OrderBy};
pub use store::Store;
pub use tree::Tree;

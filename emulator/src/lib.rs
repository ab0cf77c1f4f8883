//! # Mockbase
//!
//! An in-memory stand-in for a hierarchical realtime database, for tests
//! and local development.
//!
//! A [`Database`] holds one JSON tree. [`Reference`]s write to it and
//! [`Query`]s read from it or subscribe to changes. Every public call
//! applies its effect immediately and returns a future that resolves after
//! a simulated network delay (see [`DelayProfile`]).
//!
//! ```rust
//! use mockbase::{Database, DelayProfile, EventType};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), mockbase::Error> {
//! let db = Database::with_delay(DelayProfile::Fixed(0));
//! let scores = db.reference("/scores");
//! scores.set(json!({"ann": {"points": 7}, "bob": {"points": 9}}), None).await?;
//!
//! let top = scores.order_by_child("points").limit_to_first(1);
//! let snap = top.once(EventType::Value).await?;
//! assert_eq!(snap.val(), Some(json!({"bob": {"points": 9}})));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod database;
pub mod delay;
pub mod error;
pub mod push_id;
pub mod query;
pub mod reference;

pub use config::Config;
pub use database::Database;
pub use delay::{Delay, DelayProfile, NetworkProfile};
pub use error::{ConfigError, Error, Result};
pub use query::Query;
pub use reference::{OnComplete, OnDisconnect, Reference};

pub use mockbase_engine::{EventType, ListenerId, ListenerInfo, Snapshot};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install a tracing subscriber driven by `RUST_LOG`.
///
/// Falls back to debug output for the emulator crates. Returns `false` if
/// a global subscriber was already installed.
pub fn init_tracing() -> bool {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mockbase=debug,mockbase_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}

//! Filter functions.
//!
//! Predicate builders for the range and equality constraints of a query,
//! plus the cardinality (limit) filter. All predicates operate on record
//! entries (`{"id": key, ...fields}`).

use crate::sort::{compare_values, field};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

/// A predicate over record entries.
pub type Predicate = Box<dyn Fn(&Value) -> bool + Send + Sync>;

/// A filter boundary: the value to compare against and, optionally, the
/// property to compare. Without a key the order-by property is used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bound {
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl Bound {
    pub fn new(value: impl Into<Value>, key: Option<&str>) -> Self {
        Self {
            value: value.into(),
            key: key.map(str::to_string),
        }
    }

    fn property(&self, default_prop: &str) -> String {
        self.key.clone().unwrap_or_else(|| default_prop.to_string())
    }
}

fn compare_bound(
    bound: Option<&Bound>,
    default_prop: &str,
    accept: fn(Ordering) -> bool,
) -> Predicate {
    let Some(bound) = bound else {
        return Box::new(|_| true);
    };
    let prop = bound.property(default_prop);
    let target = bound.value.clone();
    Box::new(move |record| {
        field(record, &prop)
            .map(|value| accept(compare_values(value, &target)))
            .unwrap_or(false)
    })
}

/// Keep entries whose property equals the bound value.
pub fn equal_to(bound: Option<&Bound>, default_prop: &str) -> Predicate {
    compare_bound(bound, default_prop, Ordering::is_eq)
}

/// Keep entries whose property is at or above the bound value.
pub fn start_at(bound: Option<&Bound>, default_prop: &str) -> Predicate {
    compare_bound(bound, default_prop, Ordering::is_ge)
}

/// Keep entries whose property is at or below the bound value.
pub fn end_at(bound: Option<&Bound>, default_prop: &str) -> Predicate {
    compare_bound(bound, default_prop, Ordering::is_le)
}

/// Apply `limit_to_first` then `limit_to_last`. `None` leaves the list alone.
pub fn limit<T>(mut entries: Vec<T>, first: Option<usize>, last: Option<usize>) -> Vec<T> {
    if let Some(n) = first {
        entries.truncate(n);
    }
    if let Some(n) = last {
        let skip = entries.len().saturating_sub(n);
        entries.drain(..skip);
    }
    entries
}

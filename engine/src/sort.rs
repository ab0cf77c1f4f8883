//! Sort functions.
//!
//! Records are compared as entries of the form `{"id": key, ...fields}` (or
//! `{"id": key, "value": scalar}` for plain values). The record comparators
//! rank in descending order: when `a > b` the result is `Less`, so larger
//! keys and values come first. Range filters are defined against this same
//! convention.

use crate::path;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Property holding the identifying key of a record entry.
pub const ID_FIELD: &str = "id";

/// Property holding the payload of a scalar entry.
pub const VALUE_FIELD: &str = "value";

/// A comparator over record entries.
pub type Comparator = Arc<dyn Fn(&Value, &Value) -> Ordering + Send + Sync>;

/// The ordering mode of a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "child", rename_all = "camelCase")]
pub enum OrderBy {
    /// Order by record key.
    Key,
    /// Order by the scalar value of each entry.
    Value,
    /// Order by a (possibly nested) child property.
    Child(String),
}

impl OrderBy {
    /// The entry property this ordering compares on, which is also the
    /// property filters use when no explicit key is given.
    pub fn property(&self) -> &str {
        match self {
            OrderBy::Key => ID_FIELD,
            OrderBy::Value => VALUE_FIELD,
            OrderBy::Child(prop) => prop,
        }
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderBy::Key => write!(f, "orderByKey"),
            OrderBy::Value => write!(f, "orderByValue"),
            OrderBy::Child(prop) => write!(f, "orderByChild({prop})"),
        }
    }
}

/// Compare two JSON values.
///
/// Type rank first: null < false < true < numbers < strings < arrays <
/// objects. Numbers compare as f64, strings by code point. Arrays and
/// objects of the same type compare equal.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(na), Value::Number(nb)) => {
            let fa = na.as_f64().unwrap_or(f64::NAN);
            let fb = nb.as_f64().unwrap_or(f64::NAN);
            fa.partial_cmp(&fb).unwrap_or(Ordering::Equal)
        }
        (Value::String(sa), Value::String(sb)) => sa.cmp(sb),
        (Value::Bool(ba), Value::Bool(bb)) => ba.cmp(bb),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Compare two possibly-missing fields. Missing sorts before everything.
pub fn compare_fields(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => compare_values(a, b),
    }
}

/// Look up a property of a record entry. `prop` may be a nested path.
pub fn field<'a>(record: &'a Value, prop: &str) -> Option<&'a Value> {
    let mut current = record;
    for segment in path::segments(prop) {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Descending comparator on the entry property `prop`.
fn descending_by(prop: String) -> Comparator {
    Arc::new(move |a, b| compare_fields(field(a, &prop), field(b, &prop)).reverse())
}

/// Rank entries by key, descending.
pub fn order_by_key() -> Comparator {
    descending_by(ID_FIELD.to_string())
}

/// Rank entries by `.value`, descending.
pub fn order_by_value() -> Comparator {
    descending_by(VALUE_FIELD.to_string())
}

/// Rank entries by a child property, descending.
pub fn order_by_child(prop: impl Into<String>) -> Comparator {
    descending_by(prop.into())
}

/// The comparator for an ordering mode.
pub fn comparator(order: &OrderBy) -> Comparator {
    match order {
        OrderBy::Key => order_by_key(),
        OrderBy::Value => order_by_value(),
        OrderBy::Child(prop) => order_by_child(prop.clone()),
    }
}

/// Reorder a flat map by key, ascending. Stable for equal keys.
pub fn sort_map_by_key(map: Map<String, Value>) -> Map<String, Value> {
    let mut entries: Vec<_> = map.into_iter().collect();
    entries.sort_by(|(a, _), (b, _)| a.cmp(b));
    entries.into_iter().collect()
}

/// Reorder a flat map by value, ascending.
pub fn sort_map_by_value(map: Map<String, Value>) -> Map<String, Value> {
    let mut entries: Vec<_> = map.into_iter().collect();
    entries.sort_by(|(_, a), (_, b)| compare_values(a, b));
    entries.into_iter().collect()
}

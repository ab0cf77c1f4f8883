//! Query engine.
//!
//! [`QueryDescriptor`] accumulates the ordering, filter and limit settings of
//! a query. [`run_query`] applies a descriptor to the raw value stored at the
//! query's path:
//!
//! 1. The value is classified into a [`Shape`].
//! 2. Scalars pass through unchanged.
//! 3. Flat maps are reordered (by key or by value) and limit-sliced.
//! 4. Record lists are converted to `{"id": key, ...fields}` entries, sorted
//!    by the order-by comparator, filtered (`equal_to`, `start_at`,
//!    `end_at`), limited, then reassembled into an id-keyed object that keeps
//!    the filtered order.

use crate::error::{Error, Result};
use crate::filter::{self, Bound};
use crate::path;
use crate::sort::{self, OrderBy, ID_FIELD, VALUE_FIELD};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The accumulated configuration of a query.
///
/// Builder methods consume the descriptor and return the updated copy, so a
/// descriptor handed to a listener or a pending read is never changed
/// behind its back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDescriptor {
    /// Canonical path the query reads from
    pub path: String,
    /// Active ordering; `None` means key ordering
    pub order_by: Option<OrderBy>,
    pub equal_to: Option<Bound>,
    pub start_at: Option<Bound>,
    pub end_at: Option<Bound>,
    pub limit_to_first: Option<usize>,
    pub limit_to_last: Option<usize>,
}

impl QueryDescriptor {
    /// A query over `path` with no constraints.
    pub fn new(path: &str) -> Self {
        Self {
            path: path::normalize(path),
            ..Self::default()
        }
    }

    /// The effective ordering mode.
    pub fn order(&self) -> OrderBy {
        self.order_by.clone().unwrap_or(OrderBy::Key)
    }

    pub fn order_by_key(mut self) -> Self {
        self.order_by = Some(OrderBy::Key);
        self
    }

    pub fn order_by_value(mut self) -> Self {
        self.order_by = Some(OrderBy::Value);
        self
    }

    pub fn order_by_child(mut self, prop: impl Into<String>) -> Self {
        self.order_by = Some(OrderBy::Child(prop.into()));
        self
    }

    /// Keep only entries whose order-by property (or `key`) equals `value`.
    ///
    /// Fails when a key is given while ordering by key: the key is already
    /// the compared property.
    pub fn equal_to(mut self, value: impl Into<Value>, key: Option<&str>) -> Result<Self> {
        if key.is_some() && self.order() == OrderBy::Key {
            return Err(Error::AmbiguousEqualTo);
        }
        self.equal_to = Some(Bound::new(value, key));
        Ok(self)
    }

    pub fn start_at(mut self, value: impl Into<Value>, key: Option<&str>) -> Self {
        self.start_at = Some(Bound::new(value, key));
        self
    }

    pub fn end_at(mut self, value: impl Into<Value>, key: Option<&str>) -> Self {
        self.end_at = Some(Bound::new(value, key));
        self
    }

    pub fn limit_to_first(mut self, n: usize) -> Self {
        self.limit_to_first = Some(n);
        self
    }

    pub fn limit_to_last(mut self, n: usize) -> Self {
        self.limit_to_last = Some(n);
        self
    }
}

/// Where a record list came from; decides how it is reassembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordSource {
    /// An object whose every value is an object
    Map,
    /// An array holding objects that carry their own `id`
    Array,
}

/// The shape of the data at a query path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Scalar,
    FlatMap,
    RecordList(RecordSource),
}

/// Classify a value for query processing.
pub fn classify(data: &Value) -> Shape {
    match data {
        Value::Object(map) if map.values().all(Value::is_object) => {
            Shape::RecordList(RecordSource::Map)
        }
        Value::Object(_) => Shape::FlatMap,
        Value::Array(items) if items.iter().any(Value::is_object) => {
            Shape::RecordList(RecordSource::Array)
        }
        _ => Shape::Scalar,
    }
}

/// Convert an object into record entries.
///
/// Object values become `{"id": key, ...fields}`; any other value becomes
/// `{"id": key, "value": value}`.
pub fn to_entries(map: &Map<String, Value>) -> Vec<Value> {
    map.iter().map(|(key, value)| to_entry(key, value)).collect()
}

fn to_entry(key: &str, value: &Value) -> Value {
    let mut entry = Map::new();
    entry.insert(ID_FIELD.to_string(), Value::String(key.to_string()));
    match value {
        Value::Object(fields) => {
            for (k, v) in fields.iter().filter(|(k, _)| k.as_str() != ID_FIELD) {
                entry.insert(k.clone(), v.clone());
            }
        }
        other => {
            entry.insert(VALUE_FIELD.to_string(), other.clone());
        }
    }
    Value::Object(entry)
}

/// Identifying key of an entry. Numeric ids are accepted and stringified.
pub fn entry_id(entry: &Value) -> Option<String> {
    match entry.get(ID_FIELD)? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

/// Entry payload with its identifying key removed.
pub fn strip_id(entry: &Value) -> Value {
    match entry {
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .filter(|(k, _)| k.as_str() != ID_FIELD)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Run a query against the raw value at its path.
///
/// Returns `None` when there is no data, including an empty object or
/// array.
pub fn run_query(query: &QueryDescriptor, data: Option<Value>) -> Option<Value> {
    let data = data.filter(|value| !is_empty_container(value))?;
    match classify(&data) {
        Shape::Scalar => Some(data),
        Shape::FlatMap => match data {
            Value::Object(map) => Some(Value::Object(reshape_flat_map(query, map))),
            other => Some(other),
        },
        Shape::RecordList(source) => {
            let entries = record_entries(query, &data);
            Some(Value::Object(reassemble(query, entries, source)))
        }
    }
}

fn is_empty_container(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// The ordered, filtered and limited entry list a record-list query
/// produces before reassembly. Returns `None` for other shapes.
pub fn run_query_entries(query: &QueryDescriptor, data: &Value) -> Option<Vec<Value>> {
    match classify(data) {
        Shape::RecordList(_) => Some(record_entries(query, data)),
        _ => None,
    }
}

fn reshape_flat_map(query: &QueryDescriptor, map: Map<String, Value>) -> Map<String, Value> {
    let ordered = match query.order() {
        OrderBy::Key => sort::sort_map_by_key(map),
        OrderBy::Value | OrderBy::Child(_) => sort::sort_map_by_value(map),
    };
    let entries: Vec<(String, Value)> = ordered.into_iter().collect();
    filter::limit(entries, query.limit_to_first, query.limit_to_last)
        .into_iter()
        .collect()
}

fn record_entries(query: &QueryDescriptor, data: &Value) -> Vec<Value> {
    let mut entries = match data {
        Value::Object(map) => to_entries(map),
        Value::Array(items) => items.clone(),
        _ => return Vec::new(),
    };

    let order = query.order();
    let compare = sort::comparator(&order);
    entries.sort_by(|a, b| compare(a, b));

    let prop = order.property();
    let equal_to = filter::equal_to(query.equal_to.as_ref(), prop);
    let start_at = filter::start_at(query.start_at.as_ref(), prop);
    let end_at = filter::end_at(query.end_at.as_ref(), prop);
    entries.retain(|e| equal_to(e) && start_at(e) && end_at(e));

    filter::limit(entries, query.limit_to_first, query.limit_to_last)
}

fn reassemble(
    query: &QueryDescriptor,
    entries: Vec<Value>,
    source: RecordSource,
) -> Map<String, Value> {
    let mut out = Map::new();
    for (index, entry) in entries.iter().enumerate() {
        let Some(id) = entry_id(entry) else {
            tracing::warn!(path = %query.path, index, "dropping query result entry without an id");
            continue;
        };
        let payload = match source {
            RecordSource::Map => strip_id(entry),
            RecordSource::Array => match entry.as_object() {
                Some(fields) if fields.len() == 2 && fields.contains_key(VALUE_FIELD) => {
                    fields[VALUE_FIELD].clone()
                }
                _ => strip_id(entry),
            },
        };
        out.insert(id, payload);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keys(value: &Value) -> Vec<String> {
        value
            .as_object()
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn colors() -> Value {
        json!({
            "a": {"color": "red", "size": 3},
            "b": {"color": "green", "size": 1},
            "c": {"color": "blue", "size": 2},
        })
    }

    #[test]
    fn classify_shapes() {
        assert_eq!(classify(&json!(42)), Shape::Scalar);
        assert_eq!(classify(&json!("x")), Shape::Scalar);
        assert_eq!(classify(&json!([1, 2])), Shape::Scalar);
        assert_eq!(classify(&json!({"a": 1, "b": {}})), Shape::FlatMap);
        assert_eq!(classify(&colors()), Shape::RecordList(RecordSource::Map));
        assert_eq!(
            classify(&json!([{"id": "a"}])),
            Shape::RecordList(RecordSource::Array)
        );
    }

    #[test]
    fn equal_to_with_key_rejected_under_key_order() {
        let q = QueryDescriptor::new("/colors").order_by_key();
        assert_eq!(q.equal_to("x", Some("color")), Err(Error::AmbiguousEqualTo));

        // default ordering is by key as well
        let q = QueryDescriptor::new("/colors");
        assert!(q.equal_to("x", Some("color")).is_err());

        let q = QueryDescriptor::new("/colors").order_by_child("size");
        assert!(q.equal_to("red", Some("color")).is_ok());
    }

    #[test]
    fn later_order_replaces_earlier() {
        let q = QueryDescriptor::new("x").order_by_value().order_by_child("n");
        assert_eq!(q.order(), OrderBy::Child("n".into()));
    }

    #[test]
    fn missing_data_returns_none() {
        let q = QueryDescriptor::new("nothing");
        assert_eq!(run_query(&q, None), None);
    }

    #[test]
    fn scalars_pass_through() {
        let q = QueryDescriptor::new("n")
            .order_by_child("x")
            .limit_to_first(1)
            .start_at(100, None);
        assert_eq!(run_query(&q, Some(json!(7))), Some(json!(7)));
        assert_eq!(run_query(&q, Some(json!("seven"))), Some(json!("seven")));
    }

    #[test]
    fn flat_map_key_order_and_limit() {
        let q = QueryDescriptor::new("scores").limit_to_first(2);
        let out = run_query(&q, Some(json!({"c": 1, "a": 3, "b": 2}))).unwrap();
        assert_eq!(keys(&out), vec!["a", "b"]);
    }

    #[test]
    fn flat_map_value_order_and_limit_to_last() {
        let q = QueryDescriptor::new("scores").order_by_value().limit_to_last(2);
        let out = run_query(&q, Some(json!({"c": 1, "a": 3, "b": 2}))).unwrap();
        assert_eq!(keys(&out), vec!["b", "a"]);
        assert_eq!(out, json!({"b": 2, "a": 3}));
    }

    #[test]
    fn record_list_child_order_descends() {
        let q = QueryDescriptor::new("colors").order_by_child("size");
        let out = run_query(&q, Some(colors())).unwrap();
        assert_eq!(keys(&out), vec!["a", "c", "b"]);
        assert_eq!(out["a"], json!({"color": "red", "size": 3}));
    }

    #[test]
    fn record_list_filters_before_limits() {
        let q = QueryDescriptor::new("colors")
            .order_by_child("size")
            .end_at(2, None)
            .limit_to_first(1);
        let out = run_query(&q, Some(colors())).unwrap();
        assert_eq!(keys(&out), vec!["c"]);
    }

    #[test]
    fn record_list_equal_to() {
        let q = QueryDescriptor::new("colors")
            .order_by_child("color")
            .equal_to("green", None)
            .unwrap();
        let out = run_query(&q, Some(colors())).unwrap();
        assert_eq!(out, json!({"b": {"color": "green", "size": 1}}));
    }

    #[test]
    fn entries_expose_internal_order() {
        let q = QueryDescriptor::new("colors").order_by_key();
        let entries = run_query_entries(&q, &colors()).unwrap();
        let ids: Vec<_> = entries.iter().filter_map(entry_id).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
        assert_eq!(entries[0], json!({"id": "c", "color": "blue", "size": 2}));
        assert!(run_query_entries(&q, &json!(1)).is_none());
    }

    #[test]
    fn array_sources_reassemble_by_shape() {
        let q = QueryDescriptor::new("list");
        let data = json!([
            {"id": "x", "value": 10},
            {"id": "y", "name": "Yolanda"},
            {"name": "no id"},
            "stray scalar",
        ]);
        let out = run_query(&q, Some(data)).unwrap();
        assert_eq!(out, json!({"y": {"name": "Yolanda"}, "x": 10}));
    }

    #[test]
    fn empty_containers_query_to_nothing() {
        let q = QueryDescriptor::new("empty").limit_to_first(3);
        assert_eq!(run_query(&q, Some(json!({}))), None);
        assert_eq!(run_query(&q, Some(json!([]))), None);
        assert_eq!(run_query(&q, None), None);
    }

    #[test]
    fn descriptor_serializes() {
        let q = QueryDescriptor::new("/a/b")
            .order_by_child("age")
            .start_at(18, None);
        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["path"], "a.b");
        assert_eq!(json["orderBy"], json!({"type": "child", "child": "age"}));
        assert_eq!(json["startAt"], json!({"value": 18}));
    }
}

//! Size-bounding of backend responses before they reach the payload.

use serde_json::{json, Map, Value};

/// Reduce a raw response to a domain snapshot.
///
/// Page envelopes (`{content, totalElements, ...}`) and bare arrays become
/// `{items, total}` with at most `cap` items. Other objects keep their
/// fields, with every list at any depth truncated to `cap`.
pub fn shape(value: Value, cap: usize) -> Value {
    match value {
        Value::Array(items) => listing(items, None, cap),
        Value::Object(map) if is_page(&map) => {
            let mut map = map;
            let total = map.get("totalElements").and_then(Value::as_u64);
            let items = match map.remove("content") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            };
            listing(items, total, cap)
        }
        other => cap_lists(other, cap),
    }
}

fn is_page(map: &Map<String, Value>) -> bool {
    matches!(map.get("content"), Some(Value::Array(_)))
        && (map.contains_key("totalElements") || map.contains_key("totalPages"))
}

fn listing(mut items: Vec<Value>, total: Option<u64>, cap: usize) -> Value {
    let total = total.unwrap_or(items.len() as u64);
    items.truncate(cap);
    let items: Vec<Value> = items.into_iter().map(|v| cap_lists(v, cap)).collect();
    json!({ "items": items, "total": total })
}

fn cap_lists(value: Value, cap: usize) -> Value {
    match value {
        Value::Array(mut items) => {
            items.truncate(cap);
            Value::Array(items.into_iter().map(|v| cap_lists(v, cap)).collect())
        }
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, cap_lists(v, cap)))
                .collect(),
        ),
        other => other,
    }
}

/// Fold extra domain fields into a snapshot. Non-object snapshots are kept
/// under `value`.
pub(crate) fn annotate(data: Value, fields: impl IntoIterator<Item = (&'static str, Value)>) -> Value {
    let mut map = match data {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    };
    for (key, value) in fields {
        if !value.is_null() {
            map.insert(key.to_string(), value);
        }
    }
    Value::Object(map)
}

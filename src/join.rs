//! Merge secondary records (reviews, meal requests) with the meal they point at.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value};

/// Fields the secondary record keeps when both sides carry them.
const PRESERVED_FIELDS: &[&str] = &["_id", "rating"];

pub type Record = Map<String, Value>;

/// For each record, look up `reference_key` in `lookup` and overlay the
/// primary record's fields. Records whose reference is missing, not a string,
/// or unknown pass through unchanged. Order is preserved.
pub fn join(records: Vec<Record>, reference_key: &str, lookup: &HashMap<String, Record>) -> Vec<Record> {
    records
        .into_iter()
        .map(|record| {
            let primary = record
                .get(reference_key)
                .and_then(Value::as_str)
                .and_then(|id| lookup.get(id));

            match primary {
                Some(primary) => merge(record, primary),
                None => record,
            }
        })
        .collect()
}

fn merge(mut secondary: Record, primary: &Record) -> Record {
    for (key, value) in primary {
        if PRESERVED_FIELDS.contains(&key.as_str()) && secondary.contains_key(key) {
            continue;
        }
        secondary.insert(key.clone(), value.clone());
    }
    secondary
}

/// Index primary records by their `_id`.
pub fn lookup_by_id(records: Vec<Record>) -> HashMap<String, Record> {
    records
        .into_iter()
        .filter_map(|record| {
            let id = record.get("_id")?.as_str()?.to_string();
            Some((id, record))
        })
        .collect()
}

/// Serialize typed records into JSON objects for joining.
pub fn to_objects<T: Serialize>(items: &[T]) -> Result<Vec<Record>, serde_json::Error> {
    items
        .iter()
        .map(|item| match serde_json::to_value(item)? {
            Value::Object(map) => Ok(map),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                Ok(map)
            }
        })
        .collect()
}

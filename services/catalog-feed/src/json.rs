//!
//! src/json.rs  Andrew Belles  Oct 3rd, 2025
//!
//! Finds the record array inside a json payload of unknown shape
//!

use serde_json::Value;

use crate::mapping::Mapper;
use crate::types::Track;

/// Keys probed, in order, when the payload is an object
pub const WRAPPER_KEYS: [&str; 4] = ["data", "items", "tracks", "results"];

#[derive(Debug, PartialEq)]
pub enum JsonBatch<'a> {
    Array(&'a [Value]),
    Wrapped { key: &'static str, items: &'a [Value] },
    Unrecognized,
}

impl<'a> JsonBatch<'a> {
    pub fn classify(value: &'a Value) -> Self {
        match value {
            Value::Array(items) => JsonBatch::Array(items),
            Value::Object(map) => WRAPPER_KEYS.iter()
                .find_map(|key| match map.get(*key) {
                    Some(Value::Array(items)) => Some(JsonBatch::Wrapped { key: *key, items }),
                    _ => None,
                })
                .unwrap_or(JsonBatch::Unrecognized),
            _ => JsonBatch::Unrecognized,
        }
    }

    pub fn items(&self) -> &'a [Value] {
        match self {
            JsonBatch::Array(items) | JsonBatch::Wrapped { items, .. } => *items,
            JsonBatch::Unrecognized => &[],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            JsonBatch::Array(_) => "array",
            JsonBatch::Wrapped { key, .. } => *key,
            JsonBatch::Unrecognized => "unrecognized",
        }
    }
}

/// Maps every object of the batch; non-object elements are dropped
pub fn decode(value: &Value, mapper: &Mapper<'_>) -> Vec<Track> {
    let batch = JsonBatch::classify(value);
    tracing::trace!(batch = batch.label(), items = batch.items().len(), "feed.json.batch");

    batch.items()
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            item.as_object().and_then(|record| mapper.map(record, index))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::MappingDefaults;
    use crate::types::IngestStamp;
    use serde_json::json;

    fn rows() -> Value {
        json!([
            { "musica": "Ousado Amor", "banda": "Isaias Saad", "views": 3 },
            { "banda": "no title here" },
            { "Title": "Grandes Coisas", "Artist": "Fernandinho" }
        ])
    }

    #[test]
    fn wrappers_and_bare_array_agree() {
        let defaults = MappingDefaults::default();
        let mapper = Mapper::new(&defaults, IngestStamp::now());

        let bare = decode(&rows(), &mapper);
        let items = decode(&json!({ "items": rows() }), &mapper);
        let tracks = decode(&json!({ "tracks": rows() }), &mapper);
        let results = decode(&json!({ "meta": 1, "results": rows() }), &mapper);

        assert_eq!(bare.len(), 2);
        assert_eq!(bare, items);
        assert_eq!(bare, tracks);
        assert_eq!(bare, results);
        assert_eq!(bare[1].artist, "Fernandinho");
    }

    #[test]
    fn first_array_key_wins() {
        let value = json!({ "data": "not an array", "items": [], "tracks": [{ "title": "x" }] });
        assert_eq!(JsonBatch::classify(&value), JsonBatch::Wrapped {
            key: "items",
            items: &[],
        });
    }

    #[test]
    fn unknown_shapes_yield_nothing() {
        let defaults = MappingDefaults::default();
        let mapper = Mapper::new(&defaults, IngestStamp::now());

        assert_eq!(JsonBatch::classify(&json!(42)), JsonBatch::Unrecognized);
        assert_eq!(JsonBatch::classify(&json!({ "rows": [] })), JsonBatch::Unrecognized);
        assert!(decode(&json!("text"), &mapper).is_empty());
        assert!(decode(&json!([1, "two", null]), &mapper).is_empty());
    }
}

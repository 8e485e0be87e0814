//!
//! src/normalize.rs  Andrew Belles  Oct 2nd, 2025
//!
//! Case and whitespace insensitive view over a record of unknown shape
//!

use serde_json::Value;

use crate::types::RawRecord;

/// Trims and lower-cases every key. Keys that collide afterwards
/// ("ID" and " id ") keep the value written last in source order
pub fn normalize_keys(raw: &RawRecord) -> RawRecord {
    let mut out = RawRecord::new();
    for (key, value) in raw {
        out.insert(key.trim().to_lowercase(), value.clone());
    }
    out
}

/// Renders a value as text if it carries something usable.
/// Empty strings, null, arrays and objects count as absent
pub fn present_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        // 1.0 reads as "1", 1.5 as "1.5"
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.is_finite() => Some(f.to_string()),
            _ => Some(n.to_string()),
        },
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// First alias (in order) holding a present value
pub fn first_present<'a>(record: &'a RawRecord, aliases: &[&str]) -> Option<&'a Value> {
    aliases.iter()
        .filter_map(|alias| record.get(*alias))
        .find(|value| present_text(value).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(v: Value) -> RawRecord {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn keys_are_trimmed_and_lowered() {
        let raw = record(json!({ " Musica ": "Oceans", "BANDA": "Hillsong" }));
        let norm = normalize_keys(&raw);
        assert_eq!(norm.get("musica"), Some(&json!("Oceans")));
        assert_eq!(norm.get("banda"), Some(&json!("Hillsong")));
        assert_eq!(norm.len(), 2);
    }

    #[test]
    fn collisions_keep_last_written() {
        let raw = record(json!({ "ID": "first", " id ": "second" }));
        let norm = normalize_keys(&raw);
        assert_eq!(norm.get("id"), Some(&json!("second")));
        assert_eq!(norm.len(), 1);
    }

    #[test]
    fn empty_and_structured_values_are_absent() {
        assert_eq!(present_text(&json!("  ")), None);
        assert_eq!(present_text(&json!(null)), None);
        assert_eq!(present_text(&json!([1, 2])), None);
        assert_eq!(present_text(&json!({ "a": 1 })), None);
        assert_eq!(present_text(&json!(42)), Some("42".to_string()));
        assert_eq!(present_text(&json!(" x ")), Some("x".to_string()));
    }

    #[test]
    fn integral_floats_drop_the_fraction() {
        assert_eq!(present_text(&json!(1.0)), Some("1".to_string()));
        assert_eq!(present_text(&json!(-3.0)), Some("-3".to_string()));
        assert_eq!(present_text(&json!(1.5)), Some("1.5".to_string()));
        assert_eq!(present_text(&json!(true)), Some("true".to_string()));
    }

    #[test]
    fn first_present_skips_blank_aliases() {
        let raw = record(json!({ "musica": "", "title": "Way Maker" }));
        let hit = first_present(&raw, &["musica", "nome", "title"]);
        assert_eq!(hit, Some(&json!("Way Maker")));
        assert_eq!(first_present(&raw, &["nome"]), None);
    }
}

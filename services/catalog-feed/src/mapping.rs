//!
//! src/mapping.rs  Andrew Belles  Oct 2nd, 2025
//!
//! Maps a raw record (json object or csv row) onto a Track using
//! ordered lists of accepted column names, portuguese first
//!

use serde_json::Value;

use crate::config::FeedConfig;
use crate::normalize::{first_present, normalize_keys, present_text};
use crate::types::{IngestStamp, RawRecord, Track};

pub const TITLE_ALIASES: [&str; 6] = ["musica", "nome", "title", "titulo", "name", "track"];
pub const ID_ALIASES: [&str; 1] = ["id"];
pub const ARTIST_ALIASES: [&str; 5] = ["banda", "artista", "artist", "cantor", "grupo"];
pub const IMAGE_ALIASES: [&str; 6] = ["capa", "imagem", "foto", "imageurl", "image", "cover"];
pub const DOWNLOAD_ALIASES: [&str; 5] = ["link", "url", "download", "downloadurl", "arquivo"];
pub const GENRE_ALIASES: [&str; 4] = ["genero", "estilo", "genre", "categoria"];
pub const CREATED_ALIASES: [&str; 3] = ["data", "createdat", "date"];
pub const COUNT_ALIASES: [&str; 2] = ["views", "searchcount"];

/// Fallbacks for the fields a source may leave out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingDefaults {
    pub id_prefix: String,
    pub artist: String,
    pub genre: String,
}

impl Default for MappingDefaults {
    fn default() -> Self {
        Self::from(&FeedConfig::default())
    }
}

impl From<&FeedConfig> for MappingDefaults {
    fn from(cfg: &FeedConfig) -> Self {
        Self {
            id_prefix: cfg.id_prefix.clone(),
            artist: cfg.default_artist.clone(),
            genre: cfg.default_genre.clone(),
        }
    }
}

/// Holds what is shared by every record of one batch
#[derive(Debug, Clone)]
pub struct Mapper<'a> {
    defaults: &'a MappingDefaults,
    stamp: IngestStamp,
}

impl<'a> Mapper<'a> {
    pub fn new(defaults: &'a MappingDefaults, stamp: IngestStamp) -> Self {
        Self { defaults, stamp }
    }

    /// Returns None when no title alias is present; every other field
    /// has a default so a titled record is always emitted whole
    pub fn map(&self, raw: &RawRecord, index: usize) -> Option<Track> {
        let record = normalize_keys(raw);
        let text = |aliases: &[&str]| {
            first_present(&record, aliases).and_then(present_text)
        };

        let title = text(&TITLE_ALIASES)?;

        let id = text(&ID_ALIASES).unwrap_or_else(|| {
            format!("{}-{index}-{}", self.defaults.id_prefix, self.stamp.millis())
        });

        Some( Track {
            id,
            title,
            artist: text(&ARTIST_ALIASES).unwrap_or_else(|| self.defaults.artist.clone()),
            image_url: text(&IMAGE_ALIASES).unwrap_or_default(),
            download_url: text(&DOWNLOAD_ALIASES).unwrap_or_default(),
            genre: text(&GENRE_ALIASES).unwrap_or_else(|| self.defaults.genre.clone()),
            search_count: first_present(&record, &COUNT_ALIASES)
                .map(coerce_count)
                .unwrap_or(0),
            created_at: text(&CREATED_ALIASES).unwrap_or_else(|| self.stamp.iso()),
        })
    }
}

/// Numbers and numeric strings truncate toward zero; anything negative,
/// non-finite or non-numeric becomes 0
pub fn coerce_count(value: &Value) -> u64 {
    // whole numbers past 2^53 would lose digits going through f64
    let n = match value {
        Value::Number(n) => match n.as_u64() {
            Some(whole) => return whole,
            None => n.as_f64(),
        },
        Value::String(s) => {
            let s = s.trim();
            if let Ok(whole) = s.parse::<u64>() {
                return whole;
            }
            s.parse::<f64>().ok()
        }
        _ => None,
    };

    match n {
        Some(n) if n.is_finite() && n > 0.0 => n.trunc() as u64,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn stamp() -> IngestStamp {
        IngestStamp(chrono::Utc.timestamp_millis_opt(1_700_000_000_000).unwrap())
    }

    fn record(v: Value) -> RawRecord {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn portuguese_columns_map_to_track() {
        let defaults = MappingDefaults::default();
        let mapper = Mapper::new(&defaults, stamp());
        let raw = record(json!({
            "Musica": "Bondade de Deus",
            "Banda": "Isaias Saad",
            "Capa": "https://img.example/capa.jpg",
            "Link": "https://files.example/bondade.zip",
            "Genero": "Adoracao",
            "Views": "12",
            "Data": "2024-05-01"
        }));

        let track = mapper.map(&raw, 3).expect("titled record");
        assert_eq!(track.title, "Bondade de Deus");
        assert_eq!(track.artist, "Isaias Saad");
        assert_eq!(track.image_url, "https://img.example/capa.jpg");
        assert_eq!(track.download_url, "https://files.example/bondade.zip");
        assert_eq!(track.genre, "Adoracao");
        assert_eq!(track.search_count, 12);
        assert_eq!(track.created_at, "2024-05-01");
        assert_eq!(track.id, "track-3-1700000000000");
    }

    #[test]
    fn missing_title_is_rejected_whatever_else_is_set() {
        let defaults = MappingDefaults::default();
        let mapper = Mapper::new(&defaults, stamp());
        let raw = record(json!({
            "id": "x1",
            "artist": "Someone",
            "musica": "",
            "title": null,
            "cover": "https://img.example/a.png",
            "views": 900
        }));
        assert_eq!(mapper.map(&raw, 0), None);
        assert_eq!(mapper.map(&RawRecord::new(), 0), None);
    }

    #[test]
    fn defaults_fill_everything_but_title() {
        let defaults = MappingDefaults::default();
        let mapper = Mapper::new(&defaults, stamp());
        let track = mapper.map(&record(json!({ "title": "Oceans" })), 0).unwrap();

        assert_eq!(track.artist, "Desconhecido");
        assert_eq!(track.genre, "Worship");
        assert_eq!(track.image_url, "");
        assert_eq!(track.download_url, "");
        assert_eq!(track.search_count, 0);
        assert_eq!(track.created_at, "2023-11-14T22:13:20.000Z");
    }

    #[test]
    fn alias_order_decides_priority() {
        let defaults = MappingDefaults::default();
        let mapper = Mapper::new(&defaults, stamp());
        let raw = record(json!({ "name": "english", "nome": "portugues", "id": 7 }));
        let track = mapper.map(&raw, 0).unwrap();
        assert_eq!(track.title, "portugues");
        assert_eq!(track.id, "7");
    }

    #[test]
    fn non_numeric_count_is_zero() {
        assert_eq!(coerce_count(&json!("many")), 0);
        assert_eq!(coerce_count(&json!("")), 0);
        assert_eq!(coerce_count(&json!(true)), 0);
        assert_eq!(coerce_count(&json!(-4)), 0);
        assert_eq!(coerce_count(&json!(" 17 ")), 17);
        assert_eq!(coerce_count(&json!(8.9)), 8);

        let defaults = MappingDefaults::default();
        let mapper = Mapper::new(&defaults, stamp());
        let raw = record(json!({ "title": "A", "searchCount": "lots" }));
        assert_eq!(mapper.map(&raw, 0).unwrap().search_count, 0);
    }

    #[test]
    fn large_whole_counts_keep_every_digit() {
        assert_eq!(coerce_count(&json!(9_007_199_254_740_993_u64)), 9_007_199_254_740_993);
        assert_eq!(coerce_count(&json!("9007199254740993")), 9_007_199_254_740_993);
        assert_eq!(coerce_count(&json!(12.0)), 12);
    }

    #[test]
    fn configured_defaults_are_used() {
        let defaults = MappingDefaults {
            id_prefix: "row".to_string(),
            artist: "unknown".to_string(),
            genre: "misc".to_string(),
        };
        let mapper = Mapper::new(&defaults, stamp());
        let track = mapper.map(&record(json!({ "titulo": "X" })), 9).unwrap();
        assert_eq!(track.id, "row-9-1700000000000");
        assert_eq!(track.artist, "unknown");
        assert_eq!(track.genre, "misc");
    }
}

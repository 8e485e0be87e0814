use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// One record of unknown shape, as decoded from json or csv.
/// Keys keep their source order (serde_json preserve_order)
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// Canonical catalog entry, rebuilt from scratch on every poll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub image_url: String,
    pub download_url: String,
    pub genre: String,
    pub search_count: u64,
    pub created_at: String,
}

// One timestamp per fetch so every record of a batch agrees on it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestStamp(pub DateTime<Utc>);

impl IngestStamp {
    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// e.g. 2025-10-02T18:04:11.250Z
    pub fn iso(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

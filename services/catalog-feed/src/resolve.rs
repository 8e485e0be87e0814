//!
//! src/resolve.rs  Andrew Belles  Oct 3rd, 2025
//!
//! Turns the url a user pasted into the url actually fetched:
//! spreadsheet share links become csv exports, every request gets
//! a cache-busting parameter
//!

use std::sync::atomic::{AtomicU64, Ordering};

use url::Url;

use crate::FeedError;

pub const SHEETS_MARKER: &str = "docs.google.com/spreadsheets";
pub const SHEETS_EXPORT: &str = "https://docs.google.com/spreadsheets/d/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub url: String,
    pub is_sheet: bool,
}

/// Rewrites spreadsheet share links without an explicit export into
/// the csv export endpoint, keeping the tab (gid) when present.
/// Everything else passes through untouched
pub fn resolve(raw: &str) -> ResolvedSource {
    let raw = raw.trim();
    if !raw.contains(SHEETS_MARKER) {
        return ResolvedSource { url: raw.to_string(), is_sheet: false };
    }

    let url = match (raw.contains("/export"), spreadsheet_id(raw)) {
        (false, Some(id)) => {
            let gid = sheet_gid(raw)
                .map(|gid| format!("&gid={gid}"))
                .unwrap_or_default();
            format!("{SHEETS_EXPORT}{id}/export?format=csv{gid}")
        }
        _ => raw.to_string(),
    };
    ResolvedSource { url, is_sheet: true }
}

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// The segment following "/d/" in the share path
fn spreadsheet_id(url: &str) -> Option<&str> {
    let start = url.find("/d/")? + 3;
    let rest = &url[start..];
    let end = rest.find(|c: char| !is_id_char(c)).unwrap_or(rest.len());
    (end > 0).then(|| &rest[..end])
}

/// gid=<digits> from either the query or the fragment
fn sheet_gid(url: &str) -> Option<&str> {
    url.match_indices("gid=").find_map(|(i, _)| {
        let lead = url[..i].chars().next_back()?;
        if !matches!(lead, '#' | '&' | '?') {
            return None;
        }
        let rest = &url[i + 4..];
        let end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        (end > 0).then(|| &rest[..end])
    })
}

/// Hands out strictly increasing millisecond stamps, so two fetches in
/// the same millisecond still get distinct cache keys
#[derive(Debug, Default)]
pub struct CacheBuster {
    last: AtomicU64,
}

impl CacheBuster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> u64 {
        let now = chrono::Utc::now().timestamp_millis().max(0) as u64;
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(prev + 1);
            match self.last.compare_exchange_weak(
                prev, candidate, Ordering::Relaxed, Ordering::Relaxed
            ) {
                Ok(_) => return candidate,
                Err(actual) => prev = actual,
            }
        }
    }
}

/// Appends key=value to the query, keeping any fragment at the end
pub fn with_param(url: &str, key: &str, value: &str) -> Result<Url, FeedError> {
    let mut url = Url::parse(url)?;
    url.query_pairs_mut().append_pair(key, value);
    Ok(url)
}

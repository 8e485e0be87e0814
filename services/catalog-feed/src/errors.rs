//!
//! src/errors.rs  Andrew Belles  Oct 2nd, 2025
//!
//! Defines enums and methods of error conversion
//! for errors the feed uses. Ingestion paths never hand these to the
//! consumer; they are folded into diagnostics instead
//!
//!

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("config error: {0}")]
    Config(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("unexpected status: {0}")]
    Status(u16),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("store error: {0}")]
    Store(String),
    #[error("sink error: {0}")]
    Sink(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error)
}

impl From<reqwest::Error> for FeedError {
    fn from(e: reqwest::Error) -> Self { FeedError::Http(e.to_string()) }
}

impl From<serde_json::Error> for FeedError {
    fn from(e: serde_json::Error) -> Self { FeedError::Parse(e.to_string()) }
}

impl From<url::ParseError> for FeedError {
    fn from(e: url::ParseError) -> Self { FeedError::Parse(format!("url: {e}")) }
}

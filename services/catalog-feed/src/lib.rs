//!
//! src/lib.rs  Andrew Belles  Oct 2nd, 2025
//!
//! Catalog feed: mirrors a remote spreadsheet / json / csv catalog into
//! a normalized list of tracks, re-polled on an interval
//!
//!

pub mod config;
pub mod errors;
pub mod logging;

pub mod csv;
pub mod diagnostics;
pub mod fetch;
pub mod json;
pub mod mapping;
pub mod normalize;
pub mod resolve;
pub mod services;
pub mod sink;
pub mod store;
pub mod subscription;
pub mod types;

pub use errors::FeedError;
pub use fetch::{Fetcher, HttpTransport, RawResponse, Transport};
pub use services::{Services, SourceService};
pub use subscription::{FeedState, Subscription};
pub use types::Track;

//!
//! src/config.rs  Andrew Belles  Oct 2nd, 2025
//!
//! Reads environment (and .env) into the configuration structs
//! each module of the feed expects
//!

use std::{path::PathBuf, str::FromStr, time};
use url::Url;

use crate::FeedError;

/// Constants for HTTP Config
pub const HTTP_TIMEOUT: u64 = 15000;
pub const HTTP_CONNECT_TIMEOUT: u64 = 4000;
pub const HTTP_POOL_MAX_IDLE: usize = 4;
pub const HTTP_POOL_IDLE_TIMEOUT: u64 = 90000;
pub const HTTP_MAX_REDIRECTS: u8 = 8;

/// Constants for the feed itself
pub const FEED_POLL_INTERVAL: u64 = 60;
pub const FEED_PROXY_URL: &str = "https://api.allorigins.win/";
pub const FEED_ID_PREFIX: &str = "track";
pub const FEED_DEFAULT_ARTIST: &str = "Desconhecido";
pub const FEED_DEFAULT_GENRE: &str = "Worship";

pub const STORE_RELOAD: u64 = 5;
pub const SINK_ZSTD_LEVEL: i32 = 3;

/// Wrapper over env::var that treats blank values as unset
fn env_opt(s: &str) -> Option<String> {
    match std::env::var(s) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

/// Parses a raw value, falling back on default when absent or invalid
fn parse_or<T: FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|v| v.parse::<T>().ok()).unwrap_or(default)
}

fn env_or<T: FromStr>(s: &str, default: T) -> T {
    parse_or(env_opt(s), default)
}

/// Ensures url can be fetched from
fn ensure_http(url: &Url) -> Result<(), String> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("URL must be http(s), got {other}: {url}")),
    }
}

/// Ensure trailing slash so that join() appends instead of replacing
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let mut path = url.path().to_string();
        path.push('/');
        url.set_path(&path);
    }
    url
}

///
/// Configuration for Http timeouts, pooling, etc.
///
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: time::Duration,
    pub connect_timeout: time::Duration,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: time::Duration,
    pub max_redirects: u8,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: time::Duration::from_millis(HTTP_TIMEOUT),
            connect_timeout: time::Duration::from_millis(HTTP_CONNECT_TIMEOUT),
            pool_max_idle_per_host: HTTP_POOL_MAX_IDLE,
            pool_idle_timeout: time::Duration::from_millis(HTTP_POOL_IDLE_TIMEOUT),
            max_redirects: HTTP_MAX_REDIRECTS,
        }
    }
}

fn build_http() -> HttpConfig {
    let defaults = HttpConfig::default();
    HttpConfig {
        timeout: time::Duration::from_millis(env_or("HTTP_TIMEOUT_MS", HTTP_TIMEOUT)),
        connect_timeout: time::Duration::from_millis(
            env_or("HTTP_CONNECT_TIMEOUT_MS", HTTP_CONNECT_TIMEOUT)
        ),
        ..defaults
    }
}

///
/// Configuration for polling, proxy fallback and mapping defaults
///
#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub poll_interval: time::Duration,
    pub proxy_base: Option<Url>,  // None disables the proxy fallback
    pub id_prefix: String,
    pub default_artist: String,
    pub default_genre: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            poll_interval: time::Duration::from_secs(FEED_POLL_INTERVAL),
            proxy_base: Url::parse(FEED_PROXY_URL).ok(),
            id_prefix: FEED_ID_PREFIX.to_string(),
            default_artist: FEED_DEFAULT_ARTIST.to_string(),
            default_genre: FEED_DEFAULT_GENRE.to_string(),
        }
    }
}

/// Resolves the proxy setting, "off" and "none" disable the fallback
fn parse_proxy(raw: Option<String>) -> Result<Option<Url>, FeedError> {
    let raw = raw.unwrap_or_else(|| FEED_PROXY_URL.to_string());
    if raw.eq_ignore_ascii_case("off") || raw.eq_ignore_ascii_case("none") {
        return Ok(None);
    }

    let url = Url::parse(&raw)
        .map_err(|e| FeedError::Config(format!("CORS_PROXY_URL invalid {e}")))?;
    ensure_http(&url).map_err(FeedError::Config)?;
    Ok( Some(with_trailing_slash(url)) )
}

fn build_feed() -> Result<FeedConfig, FeedError> {
    // zero would spin the poller
    let secs = env_or("FEED_POLL_INTERVAL_SECS", FEED_POLL_INTERVAL).max(1);
    let proxy_base = parse_proxy(env_opt("CORS_PROXY_URL"))?;

    Ok( FeedConfig {
        poll_interval: time::Duration::from_secs(secs),
        proxy_base,
        id_prefix: env_opt("FEED_ID_PREFIX")
            .unwrap_or_else(|| FEED_ID_PREFIX.to_string()),
        default_artist: env_opt("FEED_DEFAULT_ARTIST")
            .unwrap_or_else(|| FEED_DEFAULT_ARTIST.to_string()),
        default_genre: env_opt("FEED_DEFAULT_GENRE")
            .unwrap_or_else(|| FEED_DEFAULT_GENRE.to_string()),
    })
}

///
/// Configuration for where the source url lives
///
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub path: Option<PathBuf>,       // None means unconfigured
    pub reload_interval: time::Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            reload_interval: time::Duration::from_secs(STORE_RELOAD),
        }
    }
}

fn build_store() -> StoreConfig {
    StoreConfig {
        path: env_opt("SOURCE_CONFIG_PATH").map(PathBuf::from),
        reload_interval: time::Duration::from_secs(
            env_or("SOURCE_RELOAD_SECS", STORE_RELOAD).max(1)
        ),
    }
}

///
/// Configuration for on-disk snapshots of the latest catalog
///
#[derive(Debug, Clone)]
pub struct SinkConfig {
    pub root: Option<PathBuf>,
    pub level: i32,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self { root: None, level: SINK_ZSTD_LEVEL }
    }
}

fn build_sink() -> SinkConfig {
    SinkConfig {
        root: env_opt("SNAPSHOT_DIR").map(PathBuf::from),
        level: env_or("SNAPSHOT_ZSTD_LEVEL", SINK_ZSTD_LEVEL).clamp(0, 21),
    }
}

///
/// Configuration for Logger
///

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json
}

impl FromStr for LogFormat {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json"   => Ok(LogFormat::Json),
            other    => Err(FeedError::Config(format!("unknown log format {other}"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub filter_directives: String,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub include_file_line: bool,
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter_directives: "info,catalog_feed=debug,reqwest=warn".to_string(),
            format: LogFormat::Json,
            with_ansi: true,
            include_file_line: true,
            include_target: true,
        }
    }
}

fn build_logging() -> LoggingConfig {
    let defaults = LoggingConfig::default();
    LoggingConfig {
        format: env_or("LOG_FORMAT", defaults.format),
        with_ansi: env_or("LOG_ANSI", defaults.with_ansi),
        ..defaults
    }
}

///
/// AppConfig which holds everything the services need
///
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub feed: FeedConfig,
    pub store: StoreConfig,
    pub sink: SinkConfig,
    pub logging: LoggingConfig
}

///
/// Return all environment variables to caller at program start.
///
pub fn load_config() -> Result<AppConfig, FeedError> {
    dotenvy::dotenv().ok();

    let http    = build_http();
    let feed    = build_feed()?;
    let store   = build_store();
    let sink    = build_sink();
    let logging = build_logging();

    Ok( AppConfig { http, feed, store, sink, logging } )
}

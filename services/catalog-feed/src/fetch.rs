//!
//! src/fetch.rs  Andrew Belles  Oct 3rd, 2025
//!
//! Hits the configured source, decides json vs csv, and falls back on
//! a read-through proxy when the direct request does not work out.
//! Callers always get a list back, possibly empty
//!

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, header, redirect};
use url::Url;

use crate::config::{FeedConfig, HttpConfig};
use crate::diagnostics::{Diagnostics, IngestEvent};
use crate::mapping::{Mapper, MappingDefaults};
use crate::resolve::{CacheBuster, ResolvedSource, resolve, with_param};
use crate::types::{IngestStamp, Track};
use crate::{FeedError, csv, json};

pub const ACCEPT_FEED: &str = "application/json, text/csv, text/plain";

/// What the orchestrator needs out of a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    fn declares_json(&self) -> bool {
        self.content_type.as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("application/json"))
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &Url) -> Result<RawResponse, FeedError>;
}

/// Client building functionality
fn client_helper(http: &HttpConfig) -> reqwest::ClientBuilder {
    Client::builder()
        .timeout(http.timeout)
        .connect_timeout(http.connect_timeout)
        .pool_max_idle_per_host(http.pool_max_idle_per_host)
        .pool_idle_timeout(Some(http.pool_idle_timeout))
        .redirect(redirect::Policy::limited(http.max_redirects as usize))
}

pub fn feed_client(http: &HttpConfig) -> Result<Client, FeedError> {
    let mut h = header::HeaderMap::new();
    h.insert(header::ACCEPT, header::HeaderValue::from_static(ACCEPT_FEED));
    client_helper(http)
        .default_headers(h)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| FeedError::Http(format!("build client: {e}")))
}

#[derive(Clone, Debug)]
pub struct HttpTransport {
    pub http: Client,
}

impl HttpTransport {
    pub fn new(http_config: &HttpConfig) -> Result<Self, FeedError> {
        Ok( Self { http: feed_client(http_config)? } )
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &Url) -> Result<RawResponse, FeedError> {
        let response = self.http.get(url.clone()).send().await?;
        let status = response.status().as_u16();
        let content_type = response.headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;
        Ok( RawResponse { status, content_type, body } )
    }
}

/// JSON first (servers mislabel content types), csv otherwise
fn decode_text(body: &str, mapper: &Mapper<'_>) -> Vec<Track> {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => json::decode(&value, mapper),
        Err(_) => csv::decode(body, mapper),
    }
}

pub struct Fetcher {
    transport: Arc<dyn Transport>,
    proxy_base: Option<Url>,
    defaults: MappingDefaults,
    buster: CacheBuster,
    diagnostics: Diagnostics,
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("proxy_base", &self.proxy_base)
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

impl Fetcher {
    pub fn new(transport: Arc<dyn Transport>, cfg: &FeedConfig) -> Self {
        Self {
            transport,
            proxy_base: cfg.proxy_base.clone(),
            defaults: MappingDefaults::from(cfg),
            buster: CacheBuster::new(),
            diagnostics: Diagnostics::silent(),
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Never fails: transport and format problems degrade to an empty
    /// list and show up in the diagnostics instead
    pub async fn fetch_tracks(&self, url: &str) -> Vec<Track> {
        if url.trim().is_empty() {
            return Vec::new();
        }

        let source = resolve(url);
        let stamp = IngestStamp::now();
        let mapper = Mapper::new(&self.defaults, stamp);

        match self.fetch_direct(url.trim(), &source, &mapper).await {
            Ok(tracks) => {
                self.diagnostics.emit(IngestEvent::Fetched {
                    url: source.url.clone(), via_proxy: false, tracks: tracks.len()
                });
                return tracks;
            }
            Err(e) => self.diagnostics.emit(IngestEvent::DirectFailed {
                url: source.url.clone(), reason: e.to_string()
            }),
        }

        match self.fetch_proxied(&source, &mapper).await {
            Ok(tracks) => {
                self.diagnostics.emit(IngestEvent::Fetched {
                    url: source.url.clone(), via_proxy: true, tracks: tracks.len()
                });
                tracks
            }
            Err(e) => {
                self.diagnostics.emit(IngestEvent::ProxyFailed {
                    url: source.url.clone(), reason: e.to_string()
                });
                self.diagnostics.emit(IngestEvent::Degraded { url: source.url });
                Vec::new()
            }
        }
    }

    async fn fetch_direct(
        &self,
        original: &str,
        source: &ResolvedSource,
        mapper: &Mapper<'_>
    ) -> Result<Vec<Track>, FeedError> {
        let target = with_param(&source.url, "t", &self.buster.next().to_string())?;
        tracing::debug!(url = %target, sheet = source.is_sheet, "feed.fetch.direct");

        let response = self.transport.get(&target).await?;
        if !response.is_success() {
            return Err(FeedError::Status(response.status));
        }

        let json_hint = response.declares_json() || original.ends_with(".json");
        if !source.is_sheet && json_hint {
            match serde_json::from_str::<serde_json::Value>(&response.body) {
                Ok(value) => return Ok(json::decode(&value, mapper)),
                Err(e) => self.diagnostics.emit(IngestEvent::JsonFallback {
                    url: source.url.clone(), reason: e.to_string()
                }),
            }
        }

        Ok(decode_text(&response.body, mapper))
    }

    /// GET {proxy}/raw?url=<resolved url>&disableCache=<stamp>
    pub fn proxy_url(&self, target: &str) -> Result<Url, FeedError> {
        let base = self.proxy_base.as_ref()
            .ok_or_else(|| FeedError::Config("no proxy configured".to_string()))?;
        let mut url = base.join("raw")?;
        url.query_pairs_mut()
            .append_pair("url", target)
            .append_pair("disableCache", &self.buster.next().to_string());
        Ok(url)
    }

    async fn fetch_proxied(
        &self,
        source: &ResolvedSource,
        mapper: &Mapper<'_>
    ) -> Result<Vec<Track>, FeedError> {
        let url = self.proxy_url(&source.url)?;
        tracing::debug!(url = %url, "feed.fetch.proxy");

        let response = self.transport.get(&url).await?;
        if !response.is_success() {
            return Err(FeedError::Status(response.status));
        }
        Ok(decode_text(&response.body, mapper))
    }
}

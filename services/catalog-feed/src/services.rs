//!
//! src/services.rs  Andrew Belles  Oct 4th, 2025
//!
//! Explicitly constructed handles the feed needs, built once from
//! AppConfig and passed to whoever uses them
//!

use std::{sync::Arc, time::Duration};

use tracing::warn;

use crate::config::AppConfig;
use crate::diagnostics::Diagnostics;
use crate::errors::FeedError;
use crate::fetch::{Fetcher, HttpTransport, Transport};
use crate::store::{FileStore, SourceStore};
use crate::subscription::Subscription;
use crate::types::Track;

/// Whether there is anywhere to read the source url from
#[derive(Clone)]
pub enum SourceService {
    Configured(Arc<dyn SourceStore>),
    Unconfigured,
}

impl std::fmt::Debug for SourceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceService::Configured(_) => f.write_str("Configured"),
            SourceService::Unconfigured => f.write_str("Unconfigured"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Services {
    pub source: SourceService,
    pub fetcher: Arc<Fetcher>,
    pub poll_interval: Duration,
}

impl Services {
    pub fn new(source: SourceService, fetcher: Arc<Fetcher>, poll_interval: Duration) -> Self {
        Self { source, fetcher, poll_interval }
    }

    /// Also returns the file store (if any) so the caller can drive reloads
    pub fn from_config(cfg: &AppConfig, diagnostics: Diagnostics) ->
        Result<(Self, Option<Arc<FileStore>>), FeedError> {

        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&cfg.http)?);
        let fetcher = Fetcher::new(transport, &cfg.feed).with_diagnostics(diagnostics);

        let file_store = match &cfg.store.path {
            Some(path) => Some(Arc::new(FileStore::open(path)?)),
            None => None,
        };
        let source = match &file_store {
            Some(store) => SourceService::Configured(store.clone()),
            None => SourceService::Unconfigured,
        };

        let services = Self::new(source, Arc::new(fetcher), cfg.feed.poll_interval);
        Ok( (services, file_store) )
    }

    pub fn is_configured(&self) -> bool {
        matches!(self.source, SourceService::Configured(_))
    }

    /// Starts the feed. Without a store the consumer gets one empty
    /// list and the returned subscription is already stopped
    pub fn listen<F>(&self, mut consumer: F) -> Subscription
    where
        F: FnMut(Vec<Track>) + Send + 'static,
    {
        match &self.source {
            SourceService::Configured(store) => Subscription::spawn(
                store.as_ref(), self.fetcher.clone(), self.poll_interval, consumer
            ),
            SourceService::Unconfigured => {
                warn!("source store not configured");
                consumer(Vec::new());
                Subscription::stopped()
            }
        }
    }

    /// Persists a new source url; subscribers pick it up
    pub fn set_source(&self, url: &str) -> Result<(), FeedError> {
        match &self.source {
            SourceService::Configured(store) => store.write(url),
            SourceService::Unconfigured => Err(FeedError::Config(
                "SOURCE_CONFIG_PATH was not set".to_string()
            )),
        }
    }

    /// One-shot fetch, returns how many tracks were admitted
    pub async fn sync_from_source(&self, url: &str) -> usize {
        self.fetcher.fetch_tracks(url).await.len()
    }
}

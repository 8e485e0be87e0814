//!
//! src/store.rs  Andrew Belles  Oct 4th, 2025
//!
//! Where the source url lives. The feed only reads and listens;
//! writing is for whatever edits the settings
//!

use std::{fs, path::{Path, PathBuf}, time::Duration};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::FeedError;

/// Persisted shape: { "sourceUrl": "..." }
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSettings {
    #[serde(default)]
    pub source_url: String,
}

pub trait SourceStore: Send + Sync {
    fn current(&self) -> String;

    /// Dropping the receiver unsubscribes
    fn subscribe(&self) -> watch::Receiver<String>;

    fn write(&self, url: &str) -> Result<(), FeedError>;
}

/// Notifies only when the value actually changed
fn publish(tx: &watch::Sender<String>, url: &str) -> bool {
    tx.send_if_modified(|current| {
        if current == url {
            false
        } else {
            *current = url.to_string();
            true
        }
    })
}

#[derive(Debug)]
pub struct MemoryStore {
    tx: watch::Sender<String>,
}

impl MemoryStore {
    pub fn new(initial: impl Into<String>) -> Self {
        let (tx, _) = watch::channel(initial.into());
        Self { tx }
    }
}

impl SourceStore for MemoryStore {
    fn current(&self) -> String {
        self.tx.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<String> {
        self.tx.subscribe()
    }

    fn write(&self, url: &str) -> Result<(), FeedError> {
        publish(&self.tx, url.trim());
        Ok(())
    }
}

/// JSON file on disk, re-read periodically so edits made by hand
/// (or by another process) reach the subscribers
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    tx: watch::Sender<String>,
}

impl FileStore {
    /// Missing file means a blank url, not an error
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FeedError> {
        let path = path.as_ref().to_path_buf();
        let settings = Self::read_settings(&path)?;
        let (tx, _) = watch::channel(settings.source_url.trim().to_string());
        Ok( Self { path, tx } )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_settings(path: &Path) -> Result<SourceSettings, FeedError> {
        match fs::read_to_string(path) {
            Ok(text) if text.trim().is_empty() => Ok(SourceSettings::default()),
            Ok(text) => serde_json::from_str(&text).map_err(|e|
                FeedError::Store(format!("parse {}: {e}", path.display()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(SourceSettings::default())
            }
            Err(e) => Err(FeedError::Store(format!("read {}: {e}", path.display()))),
        }
    }

    fn write_settings(&self, settings: &SourceSettings) -> Result<(), FeedError> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(|e|
            FeedError::Store(format!("create dir {}: {e}", parent.display())))?;

        let temp = tempfile::NamedTempFile::new_in(&parent).map_err(|e|
            FeedError::Store(format!("tempfile in {}: {e}", parent.display())))?;
        serde_json::to_writer_pretty(temp.as_file(), settings)?;
        temp.persist(&self.path).map_err(|e|
            FeedError::Store(format!("persist {}: {e}", self.path.display())))?;
        Ok(())
    }

    /// Re-reads the file; true if subscribers were notified
    pub fn reload(&self) -> Result<bool, FeedError> {
        let settings = Self::read_settings(&self.path)?;
        let changed = publish(&self.tx, settings.source_url.trim());
        if changed {
            info!(path = %self.path.display(), "store.reload.changed");
        }
        Ok(changed)
    }

    /// Polls the file until the token is cancelled
    pub fn spawn_reload(
        self: std::sync::Arc<Self>,
        period: Duration,
        shutdown: CancellationToken
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = self.reload() {
                            warn!(error = %e, "store.reload.failed");
                        }
                    }
                }
            }
            debug!("store.reload.stop");
        })
    }
}

impl SourceStore for FileStore {
    fn current(&self) -> String {
        self.tx.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<String> {
        self.tx.subscribe()
    }

    fn write(&self, url: &str) -> Result<(), FeedError> {
        let url = url.trim();
        self.write_settings(&SourceSettings { source_url: url.to_string() })?;
        publish(&self.tx, url);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_notifies_on_change_only() -> Result<(), FeedError> {
        let store = MemoryStore::new("");
        let mut rx = store.subscribe();
        assert_eq!(store.current(), "");

        store.write("http://a")?;
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), "http://a");

        store.write(" http://a ")?;
        assert!(!rx.has_changed().unwrap());
        Ok(())
    }

    #[test]
    fn file_store_round_trips_settings() -> Result<(), FeedError> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("source.json");

        let store = FileStore::open(&path)?;
        assert_eq!(store.current(), "");

        store.write("https://example.com/feed.csv")?;
        let text = fs::read_to_string(&path)?;
        let settings: SourceSettings = serde_json::from_str(&text)?;
        assert_eq!(settings.source_url, "https://example.com/feed.csv");
        assert!(text.contains("\"sourceUrl\""));

        let reopened = FileStore::open(&path)?;
        assert_eq!(reopened.current(), "https://example.com/feed.csv");
        Ok(())
    }

    #[test]
    fn reload_picks_up_external_edits() -> Result<(), FeedError> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("source.json");
        fs::write(&path, r#"{ "sourceUrl": "http://a" }"#)?;

        let store = FileStore::open(&path)?;
        let mut rx = store.subscribe();
        assert!(!store.reload()?);

        fs::write(&path, r#"{ "sourceUrl": "http://b" }"#)?;
        assert!(store.reload()?);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), "http://b");
        Ok(())
    }

    #[test]
    fn garbage_file_is_a_store_error() -> Result<(), FeedError> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("source.json");
        fs::write(&path, "not json")?;
        assert!(matches!(FileStore::open(&path), Err(FeedError::Store(_))));
        Ok(())
    }
}

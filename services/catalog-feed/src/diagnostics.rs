//!
//! src/diagnostics.rs  Andrew Belles  Oct 3rd, 2025
//!
//! Ingestion never fails loudly; instead every degradation is logged
//! and, if someone is listening, pushed onto an event channel
//!

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestEvent {
    /// direct request failed (status, network, bad url)
    DirectFailed { url: String, reason: String },
    /// body was announced as json but did not parse
    JsonFallback { url: String, reason: String },
    ProxyFailed { url: String, reason: String },
    /// nothing could be fetched this cycle; consumer gets an empty list
    Degraded { url: String },
    Fetched { url: String, via_proxy: bool, tracks: usize },
}

#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    tx: Option<UnboundedSender<IngestEvent>>,
}

impl Diagnostics {
    /// Logs only
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn channel() -> (Self, UnboundedReceiver<IngestEvent>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn emit(&self, event: IngestEvent) {
        match &event {
            IngestEvent::DirectFailed { url, reason } => {
                warn!(url = %url, reason = %reason, "feed.fetch.direct.failed");
            }
            IngestEvent::JsonFallback { url, reason } => {
                warn!(url = %url, reason = %reason, "feed.fetch.json.fallback");
            }
            IngestEvent::ProxyFailed { url, reason } => {
                warn!(url = %url, reason = %reason, "feed.proxy.failed");
            }
            IngestEvent::Degraded { url } => {
                warn!(url = %url, "feed.degraded");
            }
            IngestEvent::Fetched { url, via_proxy, tracks } => {
                debug!(url = %url, via_proxy, tracks, "feed.fetch.done");
            }
        }

        if let Some(tx) = &self.tx {
            // receiver gone just means nobody is watching anymore
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_reach_the_channel() {
        let (diag, mut rx) = Diagnostics::channel();
        diag.emit(IngestEvent::Degraded { url: "http://a".into() });
        assert_eq!(rx.try_recv().ok(), Some(IngestEvent::Degraded { url: "http://a".into() }));
    }

    #[test]
    fn silent_and_dropped_receivers_do_not_panic() {
        Diagnostics::silent().emit(IngestEvent::Degraded { url: "x".into() });

        let (diag, rx) = Diagnostics::channel();
        drop(rx);
        diag.emit(IngestEvent::Degraded { url: "x".into() });
    }
}

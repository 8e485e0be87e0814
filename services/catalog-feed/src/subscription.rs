//!
//! src/subscription.rs  Andrew Belles  Oct 4th, 2025
//!
//! Polling lifecycle: listens to the source store, fetches right away
//! when the url changes, re-fetches on an interval, and pushes every
//! result to the consumer as a full replacement list
//!
//! Idle -> Polling(url) on a non-blank url, Polling -> Polling on a
//! different url, Polling -> Idle on blank, anything -> Stopped on
//! unsubscribe. A fetch that finishes after its url was replaced is
//! dropped, never delivered
//!

use std::{sync::Arc, time::Duration};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::fetch::Fetcher;
use crate::store::SourceStore;
use crate::types::Track;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedState {
    Idle,
    Polling(String),
    Stopped,
}

/// A finished fetch, tagged with the url generation it was started for
#[derive(Debug)]
struct Fetched {
    generation: u64,
    url: String,
    tracks: Vec<Track>,
}

struct Poller<F> {
    fetcher: Arc<Fetcher>,
    period: Duration,
    consumer: F,

    // only the control task touches these
    generation: u64,
    current: Option<String>,
    ticker: Option<Interval>,

    results_tx: mpsc::UnboundedSender<Fetched>,
    results_rx: mpsc::UnboundedReceiver<Fetched>,
    state_tx: watch::Sender<FeedState>,
    shutdown: CancellationToken,
}

/// Resolves on the next tick, or never while Idle
async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(t) => { t.tick().await; }
        None => std::future::pending::<()>().await,
    }
}

impl<F> Poller<F>
where
    F: FnMut(Vec<Track>) + Send + 'static,
{
    async fn run(mut self, mut source: watch::Receiver<String>) {
        let initial = source.borrow_and_update().clone();
        if initial.trim().is_empty() {
            info!("subscription.idle.unset");
            self.emit(Vec::new());
        } else {
            self.apply(initial);
        }

        let mut store_open = true;
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                changed = source.changed(), if store_open => {
                    match changed {
                        Ok(()) => {
                            let url = source.borrow_and_update().clone();
                            self.apply(url);
                        }
                        Err(_) => {
                            // keep polling whatever we had
                            debug!("subscription.store.closed");
                            store_open = false;
                        }
                    }
                }
                Some(done) = self.results_rx.recv() => self.deliver(done),
                _ = next_tick(&mut self.ticker) => self.launch(),
            }
        }

        self.ticker = None;
        self.state_tx.send_replace(FeedState::Stopped);
        info!("subscription.stopped");
    }

    fn apply(&mut self, url: String) {
        let url = url.trim().to_string();

        if url.is_empty() {
            if let Some(old) = self.current.take() {
                self.generation += 1;
                self.ticker = None;
                self.state_tx.send_replace(FeedState::Idle);
                info!(old = %old, "subscription.idle");
                self.emit(Vec::new());
            }
            return;
        }

        if self.current.as_deref() == Some(url.as_str()) {
            return;
        }

        match &self.current {
            Some(old) => info!(old = %old, new = %url, "subscription.switch"),
            None => info!(url = %url, period = ?self.period, "subscription.polling"),
        }

        self.generation += 1;
        self.current = Some(url.clone());

        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.ticker = Some(ticker);

        self.state_tx.send_replace(FeedState::Polling(url));
        self.launch();
    }

    /// Fetches run on their own tasks so a slow source never blocks
    /// the control loop; overlapping fetches are fine
    fn launch(&self) {
        let Some(url) = self.current.clone() else {
            return;
        };
        let generation = self.generation;
        let fetcher = self.fetcher.clone();
        let tx = self.results_tx.clone();

        debug!(url = %url, generation, "subscription.fetch");
        tokio::spawn(async move {
            let tracks = fetcher.fetch_tracks(&url).await;
            let _ = tx.send(Fetched { generation, url, tracks });
        });
    }

    fn deliver(&mut self, done: Fetched) {
        let current = self.current.as_deref() == Some(done.url.as_str());
        if done.generation != self.generation || !current {
            debug!(
                url = %done.url, generation = done.generation,
                latest = self.generation, "subscription.stale"
            );
            return;
        }
        self.emit(done.tracks);
    }

    fn emit(&mut self, tracks: Vec<Track>) {
        if self.shutdown.is_cancelled() {
            return;
        }
        debug!(tracks = tracks.len(), "subscription.emit");
        (self.consumer)(tracks);
    }
}

/// Handle on a running subscription; dropping it unsubscribes
#[derive(Debug)]
pub struct Subscription {
    shutdown: CancellationToken,
    state: watch::Receiver<FeedState>,
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    /// The consumer runs on the control task; keep it quick
    pub fn spawn<F>(
        store: &dyn SourceStore,
        fetcher: Arc<Fetcher>,
        period: Duration,
        consumer: F
    ) -> Self
    where
        F: FnMut(Vec<Track>) + Send + 'static,
    {
        let shutdown = CancellationToken::new();
        let (state_tx, state) = watch::channel(FeedState::Idle);
        let (results_tx, results_rx) = mpsc::unbounded_channel();

        let poller = Poller {
            fetcher,
            period,
            consumer,
            generation: 0,
            current: None,
            ticker: None,
            results_tx,
            results_rx,
            state_tx,
            shutdown: shutdown.clone(),
        };
        let handle = tokio::spawn(poller.run(store.subscribe()));

        Self { shutdown, state, handle: Some(handle) }
    }

    /// Already stopped, never emits
    pub fn stopped() -> Self {
        let shutdown = CancellationToken::new();
        shutdown.cancel();
        let (_, state) = watch::channel(FeedState::Stopped);
        Self { shutdown, state, handle: None }
    }

    pub fn state(&self) -> FeedState {
        self.state.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<FeedState> {
        self.state.clone()
    }

    pub fn unsubscribe(&self) {
        self.shutdown.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Unsubscribes and waits for the control task to wind down
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

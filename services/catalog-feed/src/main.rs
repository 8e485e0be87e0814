//!
//! src/main.rs  Andrew Belles  Oct 4th, 2025
//!
//! Entry point: runs the feed until ctrl-c, or performs one of the
//! one-shot commands
//!
//!   catalog-feed                    poll the configured source
//!   catalog-feed set-source <url>   write the source url
//!   catalog-feed sync <url>         fetch once and print the count
//!

use catalog_feed::config;
use catalog_feed::diagnostics::{Diagnostics, IngestEvent};
use catalog_feed::logging;
use catalog_feed::sink::SnapshotSink;
use catalog_feed::{FeedError, Services};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), FeedError> {
    let cfgs = config::load_config()?;
    let _logger = logging::init_logging(&cfgs.logging)?;

    info!(
        service = "catalog-feed",
        version = %env!("CARGO_PKG_VERSION"),
        "starting"
    );

    let (diagnostics, mut events) = Diagnostics::channel();
    let (services, file_store) = Services::from_config(&cfgs, diagnostics)?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["set-source", url] => {
            services.set_source(url)?;
            info!(url = %url, "source.updated");
            return Ok(());
        }
        ["sync", url] => {
            let count = services.sync_from_source(url).await;
            println!("{count}");
            return Ok(());
        }
        [] => {}
        other => {
            return Err(FeedError::Config(format!("unknown arguments: {other:?}")));
        }
    }

    let shutdown = CancellationToken::new();

    let reload = file_store.map(|store| {
        store.spawn_reload(cfgs.store.reload_interval, shutdown.clone())
    });

    // count cycles in a row that produced nothing
    let watcher = tokio::spawn(async move {
        let mut streak = 0_u32;
        while let Some(event) = events.recv().await {
            match event {
                IngestEvent::Degraded { url } => {
                    streak += 1;
                    warn!(url = %url, streak, "feed.degraded.streak");
                }
                IngestEvent::Fetched { .. } => streak = 0,
                _ => {}
            }
        }
    });

    let sink = cfgs.sink.root.as_ref()
        .map(|root| SnapshotSink::new(root, cfgs.sink.level));
    let subscription = services.listen(move |tracks| {
        info!(tracks = tracks.len(), "feed.update");
        if let Some(sink) = &sink {
            match sink.write(&tracks) {
                Ok(path) => info!(path = %path.display(), "feed.snapshot"),
                Err(e) => error!(error = %e, "feed.snapshot.failed"),
            }
        }
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            warn!(msg = "shutting feed down", "feed.signal");
        }
        _ = shutdown.cancelled() => {}
    }

    shutdown.cancel();
    subscription.shutdown().await;
    if let Some(handle) = reload {
        let _ = handle.await;
    }
    // the fetcher (and its event sender) lives in services
    drop(services);
    watcher.abort();

    info!("feed.exit");
    Ok(())
}

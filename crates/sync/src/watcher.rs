//! Polling change watcher
//!
//! Peers that share the store but not the bus learn about writes by
//! watching a collection's write counter.

use std::time::Duration;

use pawpark_core::{Collection, VenueStore};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, trace};

/// Background poller for one collection
pub struct StoreWatcher {
    shutdown_tx: broadcast::Sender<()>,
}

impl StoreWatcher {
    /// Start polling. The receiver yields the new counter each time it moves.
    pub fn spawn(
        store: VenueStore,
        collection: Collection,
        interval: Duration,
    ) -> (Self, mpsc::Receiver<u64>) {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let (changes_tx, changes_rx) = mpsc::channel(16);

        debug!(key = %store.key(collection), ?interval, "Watching collection");
        tokio::spawn(watch_loop(store, collection, interval, changes_tx, shutdown_rx));

        (Self { shutdown_tx }, changes_rx)
    }

    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

impl Drop for StoreWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn watch_loop(
    store: VenueStore,
    collection: Collection,
    interval: Duration,
    changes_tx: mpsc::Sender<u64>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut seen = store.version(collection);

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {
                let current = store.version(collection);
                if current == seen {
                    continue;
                }
                trace!(key = %store.key(collection), from = seen, to = current, "Collection changed");
                seen = current;
                if changes_tx.send(current).await.is_err() {
                    break;
                }
            }
            _ = shutdown_rx.recv() => break,
        }
    }

    debug!(key = %store.key(collection), "Watcher stopped");
}

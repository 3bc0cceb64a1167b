//! Cross-process signal relay
//!
//! [`SharedBus`] publishes on the local bus and appends the same signal to
//! the backend's signal log. A [`SignalRelay`] polls that log and
//! republishes what other processes wrote onto its own local bus, so every
//! process sharing the store file hears every other one.

use std::sync::Arc;
use std::time::Duration;

use pawpark_core::{Backend, Notifier, Signal};
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::LocalBus;

/// Notifier that reaches local subscribers and peers sharing the backend
#[derive(Clone)]
pub struct SharedBus {
    local: LocalBus,
    backend: Arc<dyn Backend>,
    source: String,
}

impl SharedBus {
    pub fn new(local: LocalBus, backend: Arc<dyn Backend>) -> Self {
        Self {
            local,
            backend,
            source: Uuid::new_v4().to_string(),
        }
    }

    pub fn local(&self) -> &LocalBus {
        &self.local
    }

    /// Writer id stamped on this bus's log entries
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Start republishing peers' signals. Only entries appended after this
    /// call are relayed.
    pub fn spawn_relay(&self, interval: Duration) -> SignalRelay {
        SignalRelay::spawn(self.clone(), interval)
    }
}

impl Notifier for SharedBus {
    fn notify(&self, signal: Signal) {
        match serde_json::to_string(&signal) {
            Ok(payload) => {
                if let Err(e) = self.backend.append_signal(&self.source, &payload, signal.at) {
                    warn!(error = %e, "Signal not shared, peers will catch up on their next read");
                }
            }
            Err(e) => warn!(error = %e, "Signal not serializable"),
        }
        self.local.publish(signal);
    }
}

/// Background poller feeding peers' signals into a local bus
pub struct SignalRelay {
    shutdown_tx: broadcast::Sender<()>,
}

impl SignalRelay {
    fn spawn(bus: SharedBus, interval: Duration) -> Self {
        let seen = match bus.backend.last_signal_seq() {
            Ok(seq) => seq,
            Err(e) => {
                warn!(error = %e, "Signal log unreadable, relaying from the start");
                0
            }
        };
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        debug!(source = %bus.source, from = seen, "Signal relay started");
        tokio::spawn(relay_loop(bus, seen, interval, shutdown_rx));
        Self { shutdown_tx }
    }

    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

impl Drop for SignalRelay {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn relay_loop(
    bus: SharedBus,
    mut seen: u64,
    interval: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {
                let entries = match bus.backend.signals_after(seen) {
                    Ok(entries) => entries,
                    Err(e) => {
                        warn!(error = %e, "Signal log read failed");
                        continue;
                    }
                };
                for entry in entries {
                    seen = entry.seq;
                    if entry.source == bus.source {
                        continue;
                    }
                    match serde_json::from_str::<Signal>(&entry.payload) {
                        Ok(signal) => {
                            trace!(seq = entry.seq, change = ?signal.change, "Relaying peer signal");
                            bus.local.publish(signal);
                        }
                        Err(e) => warn!(seq = entry.seq, error = %e, "Skipping malformed signal"),
                    }
                }
            }
            _ = shutdown_rx.recv() => break,
        }
    }
    debug!(source = %bus.source, "Signal relay stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;
    use pawpark_core::{
        Change, MemoryBackend, MemoryTokenJar, Session, SessionDeps, SessionId, SqliteBackend,
        Topic, Venue,
    };

    const POLL: Duration = Duration::from_millis(20);
    const WAIT: Duration = Duration::from_secs(2);

    fn alpha() -> Venue {
        Venue::parse("alpha").unwrap()
    }

    fn session(backend: Arc<dyn Backend>, bus: &SharedBus) -> Session {
        let deps = SessionDeps::new(backend, Arc::new(MemoryTokenJar::new()))
            .with_notifier(Arc::new(bus.clone()));
        Session::open(deps.bootstrap(Some("alpha"), &Venue::default()), &deps)
    }

    #[tokio::test]
    async fn test_peer_process_receives_join_through_shared_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pawpark.db");
        let backend_a: Arc<dyn Backend> = Arc::new(SqliteBackend::open(&path).unwrap());
        let backend_b: Arc<dyn Backend> = Arc::new(SqliteBackend::open(&path).unwrap());

        let bus_a = SharedBus::new(LocalBus::new(), backend_a.clone());
        let bus_b = SharedBus::new(LocalBus::new(), backend_b.clone());
        let _relay_a = bus_a.spawn_relay(POLL);
        let _relay_b = bus_b.spawn_relay(POLL);

        let mut a = session(backend_a, &bus_a);
        let b = session(backend_b, &bus_b);
        let mut peer = bus_b.local().subscribe(&Topic::Venue(alpha()));

        a.join("Fido", true).unwrap();

        let signal = tokio::time::timeout(WAIT, peer.recv()).await.unwrap().unwrap();
        assert_eq!(signal.change, Change::Join);
        assert_eq!(signal.origin, a.id());
        assert_eq!(b.online_now()[0].display_name, "Fido");
    }

    #[tokio::test]
    async fn test_own_signals_are_not_relayed_back() {
        let backend: Arc<dyn Backend> = Arc::new(MemoryBackend::new());
        let bus = SharedBus::new(LocalBus::new(), backend.clone());
        let _relay = bus.spawn_relay(POLL);
        let mut own = bus.local().subscribe(&Topic::Venue(alpha()));

        bus.notify(Signal::new(Change::Leave, alpha(), SessionId::new(), Utc::now()));

        assert_eq!(own.recv().await.unwrap().change, Change::Leave);
        let echo = tokio::time::timeout(POLL * 10, own.recv()).await;
        assert!(echo.is_err());
    }

    #[tokio::test]
    async fn test_relay_skips_history_and_garbage() {
        let backend: Arc<dyn Backend> = Arc::new(MemoryBackend::new());
        backend
            .append_signal("old", "{\"stale\":true}", Utc::now())
            .unwrap();

        let bus = SharedBus::new(LocalBus::new(), backend.clone());
        let _relay = bus.spawn_relay(POLL);
        let mut sub = bus.local().subscribe(&Topic::Chat(alpha()));

        backend.append_signal("peer", "not json", Utc::now()).unwrap();
        let payload = serde_json::to_string(&Signal::new(
            Change::ChatNew,
            alpha(),
            SessionId::new(),
            Utc::now(),
        ))
        .unwrap();
        backend.append_signal("peer", &payload, Utc::now()).unwrap();

        let signal = tokio::time::timeout(WAIT, sub.recv()).await.unwrap().unwrap();
        assert_eq!(signal.change, Change::ChatNew);
    }

    #[tokio::test]
    async fn test_stopped_relay_delivers_nothing() {
        let backend: Arc<dyn Backend> = Arc::new(MemoryBackend::new());
        let bus = SharedBus::new(LocalBus::new(), backend.clone());
        let relay = bus.spawn_relay(POLL);
        let mut sub = bus.local().subscribe(&Topic::Venue(alpha()));
        relay.stop();

        let payload = serde_json::to_string(&Signal::new(
            Change::Join,
            alpha(),
            SessionId::new(),
            Utc::now(),
        ))
        .unwrap();
        backend.append_signal("peer", &payload, Utc::now()).unwrap();

        let quiet = tokio::time::timeout(POLL * 10, sub.recv()).await;
        assert!(quiet.is_err());
    }
}

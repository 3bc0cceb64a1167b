//! Pawpark Sync Library
//!
//! Async plumbing around the core engines.
//!
//! - **Bus**: in-process broadcast hub for change signals, one channel per topic
//! - **Relay**: carries signals between processes through the shared store's
//!   signal log
//! - **Watcher**: polls a collection's write counter, the fallback path for
//!   peers outside the bus
//! - **Heartbeat**: periodic presence refresh for a joined session
//! - **Mirror**: moves mirror writes off the caller onto a background task

pub mod bus;
pub mod error;
pub mod heartbeat;
pub mod mirror;
pub mod relay;
pub mod watcher;

pub use bus::{LocalBus, Subscription};
pub use error::{Error, Result};
pub use heartbeat::HeartbeatTask;
pub use mirror::MirrorForwarder;
pub use relay::{SharedBus, SignalRelay};
pub use watcher::StoreWatcher;

/// Buffered signals per topic before slow subscribers start lagging
pub const TOPIC_CAPACITY: usize = 64;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use pawpark_core::{
        Change, Collection, MemoryBackend, MemoryTokenJar, Notifier, Session, SessionDeps, Topic,
        Venue,
    };

    fn open(backend: &MemoryBackend, notifier: Arc<dyn Notifier>) -> Session {
        let deps = SessionDeps::new(
            Arc::new(backend.clone()),
            Arc::new(MemoryTokenJar::new()),
        )
        .with_notifier(notifier);
        Session::open(deps.bootstrap(Some("alpha"), &Venue::default()), &deps)
    }

    #[tokio::test]
    async fn test_peer_refreshes_on_bus_signal() {
        let backend = MemoryBackend::new();
        let bus = LocalBus::new();
        let mut a = open(&backend, Arc::new(bus.clone()));
        let b = open(&backend, Arc::new(bus.clone()));
        let mut presence = bus.subscribe(&Topic::Venue(b.venue().clone()));
        let mut chat = bus.subscribe(&Topic::Chat(b.venue().clone()));

        a.join("Fido", true).unwrap();
        let signal = presence.recv().await.unwrap();
        assert_eq!(signal.change, Change::Join);
        assert_eq!(signal.origin, a.id());
        assert_eq!(b.online_now()[0].display_name, "Fido");

        a.send_message("hello").unwrap();
        assert_eq!(chat.recv().await.unwrap().change, Change::ChatNew);
        assert_eq!(b.messages()[0].text, "hello");
    }

    // Without a bus, chat still propagates through the watcher while
    // presence only shows up on the peer's own next read.
    #[tokio::test(start_paused = true)]
    async fn test_without_bus_only_chat_has_a_fallback() {
        let backend = MemoryBackend::new();
        let mut a = open(&backend, Arc::new(pawpark_core::NoopNotifier));
        let b = open(&backend, Arc::new(pawpark_core::NoopNotifier));
        let bus = LocalBus::new();
        let mut presence = bus.subscribe(&Topic::Venue(b.venue().clone()));
        let (_watcher, mut chat_changes) =
            StoreWatcher::spawn(b.store().clone(), Collection::Chat, Duration::from_secs(1));

        a.join("Fido", true).unwrap();
        a.send_message("hello").unwrap();

        assert!(chat_changes.recv().await.is_some());
        assert_eq!(b.messages()[0].text, "hello");

        let quiet = tokio::time::timeout(Duration::from_secs(5), presence.recv()).await;
        assert!(quiet.is_err());
        assert_eq!(b.online_now().len(), 1);
    }
}

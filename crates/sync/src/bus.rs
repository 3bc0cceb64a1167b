//! In-process change bus
//!
//! Every observer in one host process shares a [`LocalBus`]. Publishing is
//! fire-and-forget: a topic with no subscribers drops the signal, and a
//! subscriber that falls behind skips what it missed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use pawpark_core::{Notifier, Signal, Topic};
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

use crate::TOPIC_CAPACITY;

/// Topic-keyed broadcast hub
#[derive(Clone, Default)]
pub struct LocalBus {
    topics: Arc<Mutex<HashMap<String, broadcast::Sender<Signal>>>>,
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn sender(&self, topic: &Topic) -> broadcast::Sender<Signal> {
        let mut topics = self.topics.lock().unwrap_or_else(|e| e.into_inner());
        topics
            .entry(topic.name())
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
            .clone()
    }

    /// Deliver a signal to the current subscribers of its topic.
    /// Returns how many received it.
    pub fn publish(&self, signal: Signal) -> usize {
        let topic = signal.topic();
        match self.sender(&topic).send(signal) {
            Ok(count) => {
                trace!(topic = %topic.name(), receivers = count, "Signal published");
                count
            }
            Err(_) => {
                trace!(topic = %topic.name(), "No subscribers, signal dropped");
                0
            }
        }
    }

    pub fn subscribe(&self, topic: &Topic) -> Subscription {
        debug!(topic = %topic.name(), "Subscribed");
        Subscription {
            topic: topic.name(),
            rx: self.sender(topic).subscribe(),
        }
    }

    /// Number of live subscribers on a topic
    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        let topics = self.topics.lock().unwrap_or_else(|e| e.into_inner());
        topics
            .get(&topic.name())
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }
}

impl Notifier for LocalBus {
    fn notify(&self, signal: Signal) {
        self.publish(signal);
    }
}

/// Receiving end of one topic
pub struct Subscription {
    topic: String,
    rx: broadcast::Receiver<Signal>,
}

impl Subscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Next signal, or `None` once the bus is gone
    pub async fn recv(&mut self) -> Option<Signal> {
        loop {
            match self.rx.recv().await {
                Ok(signal) => return Some(signal),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(topic = %self.topic, skipped, "Subscriber lagged, signals skipped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

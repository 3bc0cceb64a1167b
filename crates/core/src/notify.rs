//! Change notifications
//!
//! Engines announce "something changed, re-read the store" through a
//! [`Notifier`]. A signal never carries the changed data, so a lost signal
//! only delays a peer's refresh until its next own read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{SessionId, Venue};
use crate::storage::Collection;

/// Where a signal is delivered
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Presence, recency and profile changes of a venue
    Venue(Venue),
    /// Message changes of a venue's chat collection
    Chat(Venue),
}

impl Topic {
    /// Channel name observers subscribe to
    pub fn name(&self) -> String {
        match self {
            Topic::Venue(venue) => format!("dogpark:{}", venue),
            Topic::Chat(venue) => format!("chat:{}:{}", venue, Collection::Chat.as_str()),
        }
    }

    pub fn venue(&self) -> &Venue {
        match self {
            Topic::Venue(venue) | Topic::Chat(venue) => venue,
        }
    }
}

/// What kind of change happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Change {
    #[serde(rename = "join")]
    Join,
    #[serde(rename = "heartbeat")]
    Heartbeat,
    #[serde(rename = "leave")]
    Leave,
    #[serde(rename = "rename")]
    Rename,
    #[serde(rename = "recent")]
    Recent,
    #[serde(rename = "profile")]
    Profile,
    #[serde(rename = "chat:new")]
    ChatNew,
    #[serde(rename = "chat:delete")]
    ChatDelete,
}

impl Change {
    /// Topic this change is published on
    pub fn topic(self, venue: &Venue) -> Topic {
        match self {
            Change::ChatNew | Change::ChatDelete => Topic::Chat(venue.clone()),
            _ => Topic::Venue(venue.clone()),
        }
    }
}

/// One invalidation hint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    #[serde(rename = "type")]
    pub change: Change,
    pub venue: Venue,
    /// Session that caused the change
    pub origin: SessionId,
    pub at: DateTime<Utc>,
}

impl Signal {
    pub fn new(change: Change, venue: Venue, origin: SessionId, at: DateTime<Utc>) -> Self {
        Self {
            change,
            venue,
            origin,
            at,
        }
    }

    pub fn topic(&self) -> Topic {
        self.change.topic(&self.venue)
    }
}

/// Best-effort fan-out of signals to other observers
pub trait Notifier: Send + Sync {
    fn notify(&self, signal: Signal);
}

/// Used when no broadcast primitive is available
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, signal: Signal) {
        tracing::trace!(change = ?signal.change, "No bus, signal dropped");
    }
}

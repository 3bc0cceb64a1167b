//! Recently-present tracking
//!
//! Departures are appended to the venue's recent list. Old rows are trimmed
//! opportunistically when writing, but the retention window is always
//! re-applied on read, so it is derived rather than stored.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::clock::Clock;
use crate::error::Result;
use crate::models::{Member, RecentEntry, SessionId};
use crate::notify::{Change, Notifier, Signal};
use crate::storage::VenueStore;

pub struct RecencyTracker {
    store: VenueStore,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
}

impl RecencyTracker {
    pub fn new(store: VenueStore, clock: Arc<dyn Clock>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            clock,
            notifier,
        }
    }

    /// Append a departure for `name`, dropping rows past retention first
    pub fn record_departure(&self, origin: SessionId, name: &str) -> Result<RecentEntry> {
        let now = self.clock.now();
        let mut entries: Vec<RecentEntry> = self
            .store
            .recent()
            .into_iter()
            .filter(|e| e.is_retained_at(now))
            .collect();

        let entry = RecentEntry::new(name.to_string(), now);
        entries.push(entry.clone());
        self.store.save_recent(&entries)?;
        debug!(name, kept = entries.len(), "Departure recorded");

        self.notifier.notify(Signal::new(
            Change::Recent,
            self.store.venue().clone(),
            origin,
            now,
        ));
        Ok(entry)
    }

    /// Departures inside the retention window whose name is not online now,
    /// newest first. Repeated departures of one name are all kept.
    pub fn compute_recent(&self, online: &[Member]) -> Vec<RecentEntry> {
        let now = self.clock.now();
        let online_names: HashSet<&str> = online.iter().map(|m| m.display_name.as_str()).collect();

        let mut recent: Vec<RecentEntry> = self
            .store
            .recent()
            .into_iter()
            .filter(|e| e.is_retained_at(now))
            .filter(|e| !online_names.contains(e.display_name.as_str()))
            .collect();
        recent.sort_by(|a, b| b.at.cmp(&a.at));
        recent
    }
}

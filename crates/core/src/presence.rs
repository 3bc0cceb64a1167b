//! Presence engine
//!
//! Join / heartbeat / leave / rename for the local session, and the
//! `online now` projection. The member list is rewritten whole on every
//! change; concurrent writers in other processes can overwrite each other,
//! and stale members simply age out of `online_now`.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::Result;
use crate::identity::{DurableIdentity, IdentityBinding};
use crate::invariants;
use crate::models::{Member, RecentEntry, SessionId, Venue};
use crate::notify::{Change, Notifier, Signal};
use crate::recency::RecencyTracker;
use crate::storage::VenueStore;

/// Everything that drives the local session's behavior
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    /// Locked at bootstrap
    pub venue: Venue,
    pub id: SessionId,
    pub display_name: String,
    pub joined: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JoinOutcome {
    Joined,
    /// Name was empty after trimming
    EmptyName,
    /// Explicit join without consent
    ConsentRequired,
    /// Silent resume requested but no durable identity is stored
    NoIdentity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatOutcome {
    Refreshed,
    NotJoined,
    /// Own record vanished from the store; membership is not resurrected
    Evicted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveReason {
    /// User asked to leave
    Explicit,
    /// Process is going away; best effort only
    Terminated,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LeaveOutcome {
    Left(RecentEntry),
    NotJoined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameOutcome {
    Renamed,
    NotJoined,
    EmptyName,
    Evicted,
}

pub struct PresenceEngine {
    store: VenueStore,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    identity: IdentityBinding,
    recency: RecencyTracker,
    state: SessionState,
}

impl PresenceEngine {
    pub fn new(
        store: VenueStore,
        session_id: SessionId,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        identity: IdentityBinding,
    ) -> Self {
        let recency = RecencyTracker::new(store.clone(), clock.clone(), notifier.clone());
        let state = SessionState {
            venue: store.venue().clone(),
            id: session_id,
            display_name: String::new(),
            joined: false,
        };
        Self {
            store,
            clock,
            notifier,
            identity,
            recency,
            state,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn id(&self) -> SessionId {
        self.state.id
    }

    pub fn venue(&self) -> &Venue {
        &self.state.venue
    }

    pub fn is_joined(&self) -> bool {
        self.state.joined
    }

    pub fn store(&self) -> &VenueStore {
        &self.store
    }

    /// Explicit join: needs a non-blank name and consent, then remembers the
    /// identity for silent resume on the next start
    pub fn join(&mut self, name: &str, consent: bool) -> Result<JoinOutcome> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(JoinOutcome::EmptyName);
        }
        if !consent {
            return Ok(JoinOutcome::ConsentRequired);
        }

        self.enter(name)?;
        if let Err(e) = self.identity.remember(name, &self.state.venue) {
            warn!(error = %e, "Could not persist durable identity");
        }
        Ok(JoinOutcome::Joined)
    }

    /// Silent join with a stored identity; consent was given when it was made
    pub fn resume(&mut self, identity: &DurableIdentity) -> Result<JoinOutcome> {
        invariants::assert_venue_unchanged(&identity.venue, &self.state.venue);
        let name = identity.display_name.trim();
        if name.is_empty() {
            return Ok(JoinOutcome::EmptyName);
        }
        self.enter(name)?;
        Ok(JoinOutcome::Joined)
    }

    fn enter(&mut self, name: &str) -> Result<()> {
        let now = self.clock.now();
        let me = Member::new(self.state.id, name.to_string(), now);

        let mut members = self.store.members();
        match members.iter_mut().find(|m| m.id == self.state.id) {
            Some(existing) => *existing = me,
            None => members.push(me),
        }
        invariants::assert_member_list_invariants(&members);
        self.store.save_members(&members)?;

        self.state.display_name = name.to_string();
        self.state.joined = true;
        invariants::assert_session_invariants(&self.state);

        info!(venue = %self.state.venue, session_id = %self.state.id, name, "Joined");
        self.announce(Change::Join);
        Ok(())
    }

    /// Refresh own `lastPingAt`. Never re-creates a missing record.
    pub fn heartbeat(&mut self) -> Result<HeartbeatOutcome> {
        if !self.state.joined {
            return Ok(HeartbeatOutcome::NotJoined);
        }

        let now = self.clock.now();
        let mut members = self.store.members();
        let Some(me) = members.iter_mut().find(|m| m.id == self.state.id) else {
            debug!(session_id = %self.state.id, "Heartbeat skipped, own record is gone");
            return Ok(HeartbeatOutcome::Evicted);
        };
        me.last_ping_at = now;
        self.store.save_members(&members)?;

        debug!(session_id = %self.state.id, "Heartbeat");
        self.announce(Change::Heartbeat);
        Ok(HeartbeatOutcome::Refreshed)
    }

    /// Drop own record and log the departure under the last known name
    pub fn leave(&mut self, reason: LeaveReason) -> Result<LeaveOutcome> {
        if !self.state.joined {
            return Ok(LeaveOutcome::NotJoined);
        }

        let mut members = self.store.members();
        let name = members
            .iter()
            .find(|m| m.id == self.state.id)
            .map(|m| m.display_name.clone())
            .unwrap_or_else(|| self.state.display_name.clone());
        members.retain(|m| m.id != self.state.id);
        self.store.save_members(&members)?;
        self.state.joined = false;

        let entry = self.recency.record_departure(self.state.id, &name)?;
        info!(venue = %self.state.venue, session_id = %self.state.id, ?reason, "Left");
        self.announce(Change::Leave);
        Ok(LeaveOutcome::Left(entry))
    }

    /// Change own display name in place and in the durable identity
    pub fn rename(&mut self, name: &str) -> Result<RenameOutcome> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(RenameOutcome::EmptyName);
        }
        if !self.state.joined {
            return Ok(RenameOutcome::NotJoined);
        }

        let now = self.clock.now();
        let mut members = self.store.members();
        let Some(me) = members.iter_mut().find(|m| m.id == self.state.id) else {
            return Ok(RenameOutcome::Evicted);
        };
        me.display_name = name.to_string();
        me.last_ping_at = now;
        self.store.save_members(&members)?;

        if let Err(e) = self.identity.rename(name, &self.state.venue) {
            warn!(error = %e, "Could not update durable identity");
        }
        self.state.display_name = name.to_string();

        info!(session_id = %self.state.id, name, "Renamed");
        self.announce(Change::Rename);
        Ok(RenameOutcome::Renamed)
    }

    /// Members whose last ping is fresher than the online threshold
    pub fn online_now(&self) -> Vec<Member> {
        let now = self.clock.now();
        self.store
            .members()
            .into_iter()
            .filter(|m| m.is_online_at(now))
            .collect()
    }

    /// Recently present, minus anyone online right now
    pub fn recent(&self) -> Vec<RecentEntry> {
        self.recency.compute_recent(&self.online_now())
    }

    fn announce(&self, change: Change) {
        self.notifier.notify(Signal::new(
            change,
            self.state.venue.clone(),
            self.state.id,
            self.clock.now(),
        ));
    }
}

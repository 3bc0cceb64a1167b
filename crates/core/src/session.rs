//! One visitor session at one venue
//!
//! Bundles the presence engine, profile book and chat room over a shared
//! venue store, and wires them to the clock, bus and optional mirror.

use std::sync::Arc;

use uuid::Uuid;

use crate::chat::{ChatRoom, DeleteOutcome, SendOutcome};
use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::identity::{IdentityBinding, SessionBootstrap, TokenJar};
use crate::mirror::Mirror;
use crate::models::{ChatMessage, Member, Profile, ProfilePatch, RecentEntry, SessionId, Venue};
use crate::moderation::Moderator;
use crate::notify::{NoopNotifier, Notifier};
use crate::presence::{
    HeartbeatOutcome, JoinOutcome, LeaveOutcome, LeaveReason, PresenceEngine, RenameOutcome,
    SessionState,
};
use crate::profiles::{ProfileBook, ProfileOutcome};
use crate::storage::{Backend, ProfileMap, StoreDump, VenueStore};

/// Collaborators a session is built from
#[derive(Clone)]
pub struct SessionDeps {
    pub backend: Arc<dyn Backend>,
    pub jar: Arc<dyn TokenJar>,
    pub clock: Arc<dyn Clock>,
    pub notifier: Arc<dyn Notifier>,
    pub moderator: Arc<Moderator>,
    pub mirror: Option<Arc<dyn Mirror>>,
}

impl SessionDeps {
    /// Wall clock, no bus, default word list, no mirror
    pub fn new(backend: Arc<dyn Backend>, jar: Arc<dyn TokenJar>) -> Self {
        Self {
            backend,
            jar,
            clock: Arc::new(SystemClock),
            notifier: Arc::new(NoopNotifier),
            moderator: Arc::new(Moderator::default()),
            mirror: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_moderator(mut self, moderator: Moderator) -> Self {
        self.moderator = Arc::new(moderator);
        self
    }

    pub fn with_mirror(mut self, mirror: Arc<dyn Mirror>) -> Self {
        self.mirror = Some(mirror);
        self
    }

    pub fn identity(&self) -> IdentityBinding {
        IdentityBinding::new(self.jar.clone(), self.clock.clone())
    }

    /// Resolve venue and stored identity for a starting process
    pub fn bootstrap(&self, venue_hint: Option<&str>, default_venue: &Venue) -> SessionBootstrap {
        self.identity().bootstrap(venue_hint, default_venue)
    }
}

pub struct Session {
    bootstrap: SessionBootstrap,
    presence: PresenceEngine,
    profiles: ProfileBook,
    chat: ChatRoom,
}

impl Session {
    pub fn open(bootstrap: SessionBootstrap, deps: &SessionDeps) -> Self {
        let store = VenueStore::new(bootstrap.venue.clone(), deps.backend.clone());
        let presence = PresenceEngine::new(
            store.clone(),
            bootstrap.session_id,
            deps.clock.clone(),
            deps.notifier.clone(),
            deps.identity(),
        );
        let profiles = ProfileBook::new(
            store.clone(),
            deps.clock.clone(),
            deps.notifier.clone(),
            deps.mirror.clone(),
        );
        let chat = ChatRoom::new(
            store,
            deps.clock.clone(),
            deps.notifier.clone(),
            deps.moderator.clone(),
            deps.mirror.clone(),
        );

        Self {
            bootstrap,
            presence,
            profiles,
            chat,
        }
    }

    /// Silently rejoin when a durable identity was found at bootstrap
    pub fn resume(&mut self) -> Result<JoinOutcome> {
        match self.bootstrap.identity.clone() {
            Some(identity) => self.presence.resume(&identity),
            None => Ok(JoinOutcome::NoIdentity),
        }
    }

    pub fn id(&self) -> SessionId {
        self.presence.id()
    }

    pub fn venue(&self) -> &Venue {
        self.presence.venue()
    }

    pub fn state(&self) -> &SessionState {
        self.presence.state()
    }

    pub fn is_joined(&self) -> bool {
        self.presence.is_joined()
    }

    pub fn store(&self) -> &VenueStore {
        self.presence.store()
    }

    pub fn join(&mut self, name: &str, consent: bool) -> Result<JoinOutcome> {
        self.presence.join(name, consent)
    }

    pub fn heartbeat(&mut self) -> Result<HeartbeatOutcome> {
        self.presence.heartbeat()
    }

    pub fn leave(&mut self, reason: LeaveReason) -> Result<LeaveOutcome> {
        self.presence.leave(reason)
    }

    pub fn rename(&mut self, name: &str) -> Result<RenameOutcome> {
        self.presence.rename(name)
    }

    pub fn online_now(&self) -> Vec<Member> {
        self.presence.online_now()
    }

    pub fn recent(&self) -> Vec<RecentEntry> {
        self.presence.recent()
    }

    pub fn send_message(&self, text: &str) -> Result<SendOutcome> {
        self.chat.send(self.presence.state(), text)
    }

    pub fn delete_message(&self, id: Uuid) -> Result<DeleteOutcome> {
        self.chat.delete(self.id(), id)
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.chat.messages()
    }

    /// Edit a profile; only succeeds when `target` is this session
    pub fn update_profile(&self, target: SessionId, patch: ProfilePatch) -> Result<ProfileOutcome> {
        self.profiles.update(self.id(), target, patch)
    }

    pub fn profile(&self, id: SessionId) -> Option<Profile> {
        self.profiles.get(id)
    }

    pub fn profiles(&self) -> ProfileMap {
        self.profiles.all()
    }

    pub fn dump(&self) -> StoreDump {
        self.store().dump()
    }
}

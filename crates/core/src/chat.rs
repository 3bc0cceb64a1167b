//! Moderated venue chat
//!
//! Messages are masked before they are stored, and only the session that
//! wrote a message may delete it. Like presence, every change rewrites the
//! whole list and then notifies peers.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::Result;
use crate::invariants;
use crate::mirror::{self, Mirror};
use crate::models::{ChatMessage, SessionId};
use crate::moderation::Moderator;
use crate::notify::{Change, Notifier, Signal};
use crate::permissions::{authorize, OwnedAction};
use crate::presence::SessionState;
use crate::storage::VenueStore;

#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    Sent(ChatMessage),
    /// Blank after trimming
    Empty,
    NotJoined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    NotOwner,
}

pub struct ChatRoom {
    store: VenueStore,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    moderator: Arc<Moderator>,
    mirror: Option<Arc<dyn Mirror>>,
}

impl ChatRoom {
    pub fn new(
        store: VenueStore,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        moderator: Arc<Moderator>,
        mirror: Option<Arc<dyn Mirror>>,
    ) -> Self {
        Self {
            store,
            clock,
            notifier,
            moderator,
            mirror,
        }
    }

    /// Mask and append a message authored by `author`
    pub fn send(&self, author: &SessionState, text: &str) -> Result<SendOutcome> {
        let raw = text.trim();
        if raw.is_empty() {
            return Ok(SendOutcome::Empty);
        }
        if !author.joined {
            return Ok(SendOutcome::NotJoined);
        }

        let now = self.clock.now();
        let message = ChatMessage::new(
            author.id,
            author.display_name.clone(),
            self.moderator.mask(raw),
            now,
        );
        invariants::assert_message_owned_by(&message, author.id);

        let mut messages = self.store.chat();
        messages.push(message.clone());
        self.store.save_chat(&messages)?;

        debug!(message_id = %message.id, "Message sent");
        self.announce(Change::ChatNew, author.id);
        mirror::forward(self.mirror.as_ref(), "message", |m| {
            m.put_message(self.store.venue(), &message)
        });

        Ok(SendOutcome::Sent(message))
    }

    /// Remove message `id` if `actor` wrote it; otherwise change nothing
    pub fn delete(&self, actor: SessionId, id: Uuid) -> Result<DeleteOutcome> {
        let mut messages = self.store.chat();
        let Some(target) = messages.iter().find(|m| m.id == id) else {
            debug!(message_id = %id, "Delete ignored, no such message");
            return Ok(DeleteOutcome::NotFound);
        };
        if !authorize(OwnedAction::DeleteMessage, actor, target.owner_id) {
            return Ok(DeleteOutcome::NotOwner);
        }

        messages.retain(|m| m.id != id);
        self.store.save_chat(&messages)?;

        info!(message_id = %id, "Message deleted");
        self.announce(Change::ChatDelete, actor);
        mirror::forward(self.mirror.as_ref(), "message removal", |m| {
            m.remove_message(self.store.venue(), id)
        });

        Ok(DeleteOutcome::Deleted)
    }

    /// All messages, oldest first
    pub fn messages(&self) -> Vec<ChatMessage> {
        let mut messages = self.store.chat();
        messages.sort_by(|a, b| a.at.cmp(&b.at));
        messages
    }

    fn announce(&self, change: Change, origin: SessionId) {
        self.notifier.notify(Signal::new(
            change,
            self.store.venue().clone(),
            origin,
            self.clock.now(),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::models::Venue;
    use crate::notify::NoopNotifier;
    use crate::storage::MemoryBackend;
    use chrono::Duration;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingMirror {
        puts: Mutex<Vec<Uuid>>,
        removes: Mutex<Vec<Uuid>>,
    }

    impl Mirror for RecordingMirror {
        fn put_profile(&self, _: &Venue, _: SessionId, _: &crate::models::Profile) -> Result<()> {
            Ok(())
        }

        fn put_message(&self, _: &Venue, message: &ChatMessage) -> Result<()> {
            self.puts.lock().unwrap().push(message.id);
            Ok(())
        }

        fn remove_message(&self, _: &Venue, id: Uuid) -> Result<()> {
            self.removes.lock().unwrap().push(id);
            Ok(())
        }
    }

    struct FailingMirror;

    impl Mirror for FailingMirror {
        fn put_profile(&self, _: &Venue, _: SessionId, _: &crate::models::Profile) -> Result<()> {
            Err(crate::Error::Mirror("offline".into()))
        }

        fn put_message(&self, _: &Venue, _: &ChatMessage) -> Result<()> {
            Err(crate::Error::Mirror("offline".into()))
        }

        fn remove_message(&self, _: &Venue, _: Uuid) -> Result<()> {
            Err(crate::Error::Mirror("offline".into()))
        }
    }

    fn room(clock: Arc<ManualClock>, mirror: Option<Arc<dyn Mirror>>) -> ChatRoom {
        let store = VenueStore::new(Venue::parse("alpha").unwrap(), Arc::new(MemoryBackend::new()));
        ChatRoom::new(
            store,
            clock,
            Arc::new(NoopNotifier),
            Arc::new(Moderator::default()),
            mirror,
        )
    }

    fn author(name: &str) -> SessionState {
        SessionState {
            venue: Venue::parse("alpha").unwrap(),
            id: SessionId::new(),
            display_name: name.to_string(),
            joined: true,
        }
    }

    fn sent(outcome: SendOutcome) -> ChatMessage {
        match outcome {
            SendOutcome::Sent(message) => message,
            other => panic!("expected a sent message, got {:?}", other),
        }
    }

    #[test]
    fn test_send_masks_and_sets_owner() {
        let room = room(Arc::new(ManualClock::at_millis(1_000)), None);
        let fido = author("Fido");

        let message = sent(room.send(&fido, "  you fuck ").unwrap());
        assert_eq!(message.text, "you ****");
        assert_eq!(message.owner_id, fido.id);
        assert_eq!(message.display_name, "Fido");
        assert_eq!(room.messages(), vec![message]);
    }

    #[test]
    fn test_blank_message_is_dropped() {
        let room = room(Arc::new(ManualClock::at_millis(1_000)), None);
        assert_eq!(room.send(&author("Fido"), " \t ").unwrap(), SendOutcome::Empty);
        assert!(room.messages().is_empty());
    }

    #[test]
    fn test_not_joined_cannot_send() {
        let room = room(Arc::new(ManualClock::at_millis(1_000)), None);
        let mut ghost = author("Ghost");
        ghost.joined = false;
        assert_eq!(room.send(&ghost, "hello").unwrap(), SendOutcome::NotJoined);
    }

    #[test]
    fn test_only_owner_deletes() {
        let room = room(Arc::new(ManualClock::at_millis(1_000)), None);
        let fido = author("Fido");
        let rex = author("Rex");
        let message = sent(room.send(&fido, "hello").unwrap());
        let before = room.messages();

        assert_eq!(room.delete(rex.id, message.id).unwrap(), DeleteOutcome::NotOwner);
        assert_eq!(room.messages(), before);

        assert_eq!(room.delete(fido.id, Uuid::new_v4()).unwrap(), DeleteOutcome::NotFound);
        assert_eq!(room.delete(fido.id, message.id).unwrap(), DeleteOutcome::Deleted);
        assert!(room.messages().is_empty());
    }

    #[test]
    fn test_messages_sorted_by_time() {
        let clock = Arc::new(ManualClock::at_millis(10_000));
        let room = room(clock.clone(), None);
        let fido = author("Fido");

        let late = sent(room.send(&fido, "second").unwrap());
        clock.set(late.at - Duration::seconds(5));
        let early = sent(room.send(&fido, "first").unwrap());

        let texts: Vec<String> = room.messages().into_iter().map(|m| m.text).collect();
        assert_eq!(texts, vec!["first".to_string(), "second".to_string()]);
        assert!(early.at < late.at);
    }

    #[test]
    fn test_mirror_receives_writes() {
        let mirror = Arc::new(RecordingMirror::default());
        let room = room(Arc::new(ManualClock::at_millis(1_000)), Some(mirror.clone()));
        let fido = author("Fido");

        let message = sent(room.send(&fido, "hello").unwrap());
        room.delete(fido.id, message.id).unwrap();

        assert_eq!(*mirror.puts.lock().unwrap(), vec![message.id]);
        assert_eq!(*mirror.removes.lock().unwrap(), vec![message.id]);
    }

    #[test]
    fn test_failing_mirror_does_not_block_local_write() {
        let room = room(Arc::new(ManualClock::at_millis(1_000)), Some(Arc::new(FailingMirror)));
        let message = sent(room.send(&author("Fido"), "hello").unwrap());
        assert_eq!(room.messages(), vec![message]);
    }
}

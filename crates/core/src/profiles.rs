//! Profile book
//!
//! Only the session a profile belongs to may create or change it. Profiles
//! stay after their owner leaves.

use std::sync::Arc;

use tracing::info;

use crate::clock::Clock;
use crate::error::Result;
use crate::mirror::{self, Mirror};
use crate::models::{Profile, ProfilePatch, SessionId};
use crate::notify::{Change, Notifier, Signal};
use crate::permissions::{authorize, OwnedAction};
use crate::storage::{ProfileMap, VenueStore};

#[derive(Debug, Clone, PartialEq)]
pub enum ProfileOutcome {
    Updated(Profile),
    /// Target belongs to another session; nothing was written
    NotOwner,
}

pub struct ProfileBook {
    store: VenueStore,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    mirror: Option<Arc<dyn Mirror>>,
}

impl ProfileBook {
    pub fn new(
        store: VenueStore,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        mirror: Option<Arc<dyn Mirror>>,
    ) -> Self {
        Self {
            store,
            clock,
            notifier,
            mirror,
        }
    }

    /// Merge `patch` into `target`'s profile on behalf of `actor`
    pub fn update(
        &self,
        actor: SessionId,
        target: SessionId,
        patch: ProfilePatch,
    ) -> Result<ProfileOutcome> {
        if !authorize(OwnedAction::EditProfile, actor, target) {
            return Ok(ProfileOutcome::NotOwner);
        }

        let now = self.clock.now();
        let mut profiles = self.store.profiles();
        let profile = profiles
            .entry(target)
            .or_insert_with(|| Profile::blank(now));
        profile.apply(patch, now);
        let updated = profile.clone();
        self.store.save_profiles(&profiles)?;

        info!(session_id = %target, "Profile updated");
        self.notifier.notify(Signal::new(
            Change::Profile,
            self.store.venue().clone(),
            actor,
            now,
        ));
        mirror::forward(self.mirror.as_ref(), "profile", |m| {
            m.put_profile(self.store.venue(), target, &updated)
        });

        Ok(ProfileOutcome::Updated(updated))
    }

    pub fn get(&self, id: SessionId) -> Option<Profile> {
        self.store.profiles().remove(&id)
    }

    pub fn all(&self) -> ProfileMap {
        self.store.profiles()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::models::{Gender, Venue};
    use crate::notify::NoopNotifier;
    use crate::storage::MemoryBackend;

    fn book() -> ProfileBook {
        let store = VenueStore::new(Venue::parse("alpha").unwrap(), Arc::new(MemoryBackend::new()));
        ProfileBook::new(
            store,
            Arc::new(ManualClock::at_millis(5_000)),
            Arc::new(NoopNotifier),
            None,
        )
    }

    #[test]
    fn test_owner_creates_and_updates() {
        let book = book();
        let me = SessionId::new();

        book.update(
            me,
            me,
            ProfilePatch {
                breed: Some("Golden".into()),
                ..Default::default()
            },
        )
        .unwrap();
        let outcome = book
            .update(
                me,
                me,
                ProfilePatch {
                    gender: Some(Gender::Male),
                    ..Default::default()
                },
            )
            .unwrap();

        let ProfileOutcome::Updated(profile) = outcome else {
            panic!("expected update");
        };
        assert_eq!(profile.breed.as_deref(), Some("Golden"));
        assert_eq!(profile.gender, Some(Gender::Male));
        assert_eq!(book.get(me), Some(profile));
    }

    #[test]
    fn test_other_session_cannot_edit() {
        let book = book();
        let me = SessionId::new();
        let other = SessionId::new();

        let outcome = book
            .update(
                other,
                me,
                ProfilePatch {
                    breed: Some("Pug".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(outcome, ProfileOutcome::NotOwner);
        assert!(book.get(me).is_none());
        assert!(book.all().is_empty());
    }
}

//! Venue-scoped storage for Pawpark
//!
//! Four logical collections live under `<venue>:<collection>` keys. Reads
//! never fail: missing or malformed data yields the collection's empty
//! default. Writes replace the whole collection.

mod memory;
mod schema;
mod sqlite;
mod traits;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::models::{ChatMessage, Member, Profile, RecentEntry, SessionId, Venue};

pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;
pub use traits::{Backend, LoggedSignal};

/// How long an entry stays in the shared signal log
pub const SIGNAL_LOG_TTL_MS: i64 = 60_000;

pub(crate) fn signal_log_ttl() -> chrono::Duration {
    chrono::Duration::milliseconds(SIGNAL_LOG_TTL_MS)
}

/// Profiles keyed by owning session id
pub type ProfileMap = BTreeMap<SessionId, Profile>;

/// Logical collections stored per venue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Members,
    Recent,
    Profiles,
    Chat,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Members => "members",
            Collection::Recent => "recent",
            Collection::Profiles => "profiles",
            Collection::Chat => "chat",
        }
    }
}

/// Raw stored JSON of every collection, for diagnostics
#[derive(Debug, Clone, Default)]
pub struct StoreDump {
    pub members: Option<String>,
    pub recent: Option<String>,
    pub profiles: Option<String>,
    pub chat: Option<String>,
}

/// Store handle bound to one venue
#[derive(Clone)]
pub struct VenueStore {
    venue: Venue,
    backend: Arc<dyn Backend>,
}

impl VenueStore {
    pub fn new(venue: Venue, backend: Arc<dyn Backend>) -> Self {
        Self { venue, backend }
    }

    pub fn venue(&self) -> &Venue {
        &self.venue
    }

    /// Storage key for a collection in this venue
    pub fn key(&self, collection: Collection) -> String {
        format!("{}:{}", self.venue, collection.as_str())
    }

    /// Read a collection, substituting the default on missing or bad data
    pub fn read<T: DeserializeOwned + Default>(&self, collection: Collection) -> T {
        let key = self.key(collection);
        let raw = match self.backend.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return T::default(),
            Err(e) => {
                warn!(key = %key, error = %e, "Store read failed, using empty collection");
                return T::default();
            }
        };

        match serde_json::from_str::<Option<T>>(&raw) {
            Ok(Some(value)) => value,
            Ok(None) => T::default(),
            Err(e) => {
                warn!(key = %key, error = %e, "Malformed collection, using empty default");
                T::default()
            }
        }
    }

    /// Overwrite a whole collection
    pub fn write<T: Serialize>(&self, collection: Collection, value: &T) -> Result<()> {
        let key = self.key(collection);
        let raw = serde_json::to_string(value)?;
        self.backend.put(&key, &raw)?;
        debug!(key = %key, bytes = raw.len(), "Collection written");
        Ok(())
    }

    /// Write counter for a collection; 0 when unknown
    pub fn version(&self, collection: Collection) -> u64 {
        self.backend.version(&self.key(collection)).unwrap_or(0)
    }

    pub fn members(&self) -> Vec<Member> {
        self.read(Collection::Members)
    }

    pub fn save_members(&self, members: &[Member]) -> Result<()> {
        self.write(Collection::Members, &members)
    }

    pub fn recent(&self) -> Vec<RecentEntry> {
        self.read(Collection::Recent)
    }

    pub fn save_recent(&self, entries: &[RecentEntry]) -> Result<()> {
        self.write(Collection::Recent, &entries)
    }

    pub fn profiles(&self) -> ProfileMap {
        self.read(Collection::Profiles)
    }

    pub fn save_profiles(&self, profiles: &ProfileMap) -> Result<()> {
        self.write(Collection::Profiles, profiles)
    }

    pub fn chat(&self) -> Vec<ChatMessage> {
        self.read(Collection::Chat)
    }

    pub fn save_chat(&self, messages: &[ChatMessage]) -> Result<()> {
        self.write(Collection::Chat, &messages)
    }

    /// Raw contents of all four collections
    pub fn dump(&self) -> StoreDump {
        let raw = |c: Collection| self.backend.get(&self.key(c)).ok().flatten();
        StoreDump {
            members: raw(Collection::Members),
            recent: raw(Collection::Recent),
            profiles: raw(Collection::Profiles),
            chat: raw(Collection::Chat),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn store(venue: &str, backend: &MemoryBackend) -> VenueStore {
        VenueStore::new(Venue::parse(venue).unwrap(), Arc::new(backend.clone()))
    }

    #[test]
    fn test_keys_are_venue_scoped() {
        let backend = MemoryBackend::new();
        let alpha = store("alpha", &backend);
        assert_eq!(alpha.key(Collection::Members), "alpha:members");
        assert_eq!(alpha.key(Collection::Recent), "alpha:recent");
        assert_eq!(alpha.key(Collection::Profiles), "alpha:profiles");
        assert_eq!(alpha.key(Collection::Chat), "alpha:chat");
    }

    #[test]
    fn test_missing_collection_reads_empty() {
        let backend = MemoryBackend::new();
        let alpha = store("alpha", &backend);
        assert!(alpha.members().is_empty());
        assert!(alpha.profiles().is_empty());
    }

    #[test]
    fn test_malformed_collection_reads_empty() {
        let backend = MemoryBackend::new();
        backend.put("alpha:members", "{not json").unwrap();
        backend.put("alpha:chat", "null").unwrap();
        backend.put("alpha:recent", "{\"wrong\":\"shape\"}").unwrap();

        let alpha = store("alpha", &backend);
        assert!(alpha.members().is_empty());
        assert!(alpha.chat().is_empty());
        assert!(alpha.recent().is_empty());
    }

    #[test]
    fn test_write_is_visible_and_isolated_per_venue() {
        let backend = MemoryBackend::new();
        let alpha = store("alpha", &backend);
        let beta = store("beta", &backend);

        let member = Member::new(SessionId::new(), "Fido".into(), Utc::now());
        alpha.save_members(&[member.clone()]).unwrap();

        assert_eq!(alpha.members(), vec![member]);
        assert!(beta.members().is_empty());
        assert_eq!(alpha.version(Collection::Members), 1);
        assert_eq!(beta.version(Collection::Members), 0);
    }

    #[test]
    fn test_dump_returns_raw_json() {
        let backend = MemoryBackend::new();
        let alpha = store("alpha", &backend);
        alpha.save_chat(&[]).unwrap();

        let dump = alpha.dump();
        assert_eq!(dump.chat.as_deref(), Some("[]"));
        assert!(dump.members.is_none());
    }
}

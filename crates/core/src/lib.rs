//! Pawpark Core Library
//!
//! Presence, recency, profile and moderated chat engines for venue-scoped
//! check-in sessions, plus the namespaced store they share.

pub mod chat;
pub mod clock;
pub mod config;
pub mod error;
pub mod identity;
pub mod invariants;
pub mod mirror;
pub mod models;
pub mod moderation;
pub mod notify;
pub mod permissions;
pub mod presence;
pub mod profiles;
pub mod recency;
pub mod session;
pub mod storage;

pub use chat::{ChatRoom, DeleteOutcome, SendOutcome};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{Error, Result};
pub use identity::{
    DurableIdentity, FileTokenJar, IdentityBinding, MemoryTokenJar, SessionBootstrap, TokenJar,
};
pub use mirror::{JsonlMirror, Mirror};
pub use models::*;
pub use moderation::Moderator;
pub use notify::{Change, NoopNotifier, Notifier, Signal, Topic};
pub use permissions::{authorize, can_mutate, OwnedAction};
pub use presence::{
    HeartbeatOutcome, JoinOutcome, LeaveOutcome, LeaveReason, PresenceEngine, RenameOutcome,
    SessionState,
};
pub use profiles::{ProfileBook, ProfileOutcome};
pub use recency::RecencyTracker;
pub use session::{Session, SessionDeps};
pub use storage::{
    Backend, Collection, LoggedSignal, MemoryBackend, ProfileMap, SqliteBackend, StoreDump,
    VenueStore, SIGNAL_LOG_TTL_MS,
};

use chrono::Duration;

/// A member counts as online while `now - lastPingAt` is below this
pub const ONLINE_THRESHOLD_MS: i64 = 30_000;

/// Heartbeat period; shorter than the threshold so one missed tick is tolerated
pub const HEARTBEAT_INTERVAL_MS: u64 = 15_000;

/// How long a departure stays in the "recently present" view
pub const RETENTION_MS: i64 = 30 * 60 * 1000;

/// Lifetime of the durable identity token
pub const TOKEN_TTL_DAYS: i64 = 180;

pub fn online_threshold() -> Duration {
    Duration::milliseconds(ONLINE_THRESHOLD_MS)
}

pub fn retention_window() -> Duration {
    Duration::milliseconds(RETENTION_MS)
}

pub fn heartbeat_interval() -> std::time::Duration {
    std::time::Duration::from_millis(HEARTBEAT_INTERVAL_MS)
}

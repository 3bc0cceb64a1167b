//! Storage backend trait
//!
//! The namespaced store only needs whole-value get/put per key plus a
//! write counter, so backends stay small: SQLite for real use, an
//! in-memory map for tests, anything else later. Backends also keep a
//! short-lived signal log so observers sharing the backend from different
//! processes can hear each other.

use chrono::{DateTime, Utc};

use crate::error::Result;

/// One entry of the shared signal log
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedSignal {
    /// Increases with every append
    pub seq: u64,
    /// Writer that appended it
    pub source: String,
    /// Serialized signal
    pub payload: String,
}

/// Key/value persistence under the venue store
pub trait Backend: Send + Sync {
    /// Raw stored value for `key`, if any
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Overwrite the value for `key`, bumping its version
    fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Number of writes seen for `key` (0 if never written)
    fn version(&self, key: &str) -> Result<u64>;

    /// Append to the signal log, dropping entries older than
    /// [`SIGNAL_LOG_TTL_MS`](super::SIGNAL_LOG_TTL_MS) before `at`
    fn append_signal(&self, source: &str, payload: &str, at: DateTime<Utc>) -> Result<u64>;

    /// Log entries with `seq > after`, oldest first
    fn signals_after(&self, after: u64) -> Result<Vec<LoggedSignal>>;

    /// Highest `seq` appended so far (0 if none)
    fn last_signal_seq(&self) -> Result<u64>;
}

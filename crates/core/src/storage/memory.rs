//! In-memory backend
//!
//! Clones share one map, so several sessions built from clones of the same
//! backend behave like processes sharing a store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use super::traits::{Backend, LoggedSignal};
use crate::error::Result;

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, (String, u64)>,
    signals: Vec<(LoggedSignal, DateTime<Utc>)>,
    next_seq: u64,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Backend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock().entries.get(key).map(|(value, _)| value.clone()))
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let mut inner = self.lock();
        let entry = inner
            .entries
            .entry(key.to_string())
            .or_insert_with(|| (String::new(), 0));
        entry.0 = value.to_string();
        entry.1 += 1;
        Ok(())
    }

    fn version(&self, key: &str) -> Result<u64> {
        Ok(self.lock().entries.get(key).map(|(_, version)| *version).unwrap_or(0))
    }

    fn append_signal(&self, source: &str, payload: &str, at: DateTime<Utc>) -> Result<u64> {
        let mut inner = self.lock();
        let cutoff = at - super::signal_log_ttl();
        inner.signals.retain(|(_, created)| *created >= cutoff);

        inner.next_seq += 1;
        let seq = inner.next_seq;
        inner.signals.push((
            LoggedSignal {
                seq,
                source: source.to_string(),
                payload: payload.to_string(),
            },
            at,
        ));
        Ok(seq)
    }

    fn signals_after(&self, after: u64) -> Result<Vec<LoggedSignal>> {
        Ok(self
            .lock()
            .signals
            .iter()
            .filter(|(s, _)| s.seq > after)
            .map(|(s, _)| s.clone())
            .collect())
    }

    fn last_signal_seq(&self) -> Result<u64> {
        Ok(self.lock().next_seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_clones_share_entries() {
        let backend = MemoryBackend::new();
        backend.clone().put("alpha:chat", "[]").unwrap();
        assert_eq!(backend.get("alpha:chat").unwrap().as_deref(), Some("[]"));
        assert_eq!(backend.version("alpha:chat").unwrap(), 1);
    }

    #[test]
    fn test_signal_log_prunes_old_entries() {
        let backend = MemoryBackend::new();
        let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

        backend.append_signal("a", "{}", start).unwrap();
        let later = start + super::super::signal_log_ttl() + Duration::milliseconds(1);
        let seq = backend.append_signal("b", "{}", later).unwrap();

        let remaining = backend.signals_after(0).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].seq, seq);
        assert_eq!(backend.last_signal_seq().unwrap(), 2);
    }
}

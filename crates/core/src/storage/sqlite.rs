//! SQLite-backed key/value storage
//!
//! Several processes may open the same file; WAL mode plus a busy timeout
//! lets them read while another writes. Writes are whole-value overwrites,
//! so the last writer wins.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::instrument;

use super::schema;
use super::traits::{Backend, LoggedSignal};
use crate::error::Result;

/// Main database handle
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Open or create database at the given path
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(2))?;
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
        Self::init(conn)
    }

    /// Open in-memory database (for testing)
    #[instrument]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        schema::ensure_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Get current schema version
    pub fn schema_version(&self) -> u32 {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        schema::user_version(&conn).unwrap_or(0)
    }
}

impl Backend for SqliteBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let value = conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute(
            "INSERT INTO kv (key, value, updated_at, version) VALUES (?1, ?2, ?3, 1)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at,
                version = kv.version + 1",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn version(&self, key: &str) -> Result<u64> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let version = conn
            .query_row(
                "SELECT version FROM kv WHERE key = ?1",
                params![key],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(version.map(|v| v as u64).unwrap_or(0))
    }

    fn append_signal(&self, source: &str, payload: &str, at: DateTime<Utc>) -> Result<u64> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let cutoff = (at - super::signal_log_ttl()).timestamp_millis();
        conn.execute("DELETE FROM signals WHERE created_at < ?1", params![cutoff])?;
        conn.execute(
            "INSERT INTO signals (source, payload, created_at) VALUES (?1, ?2, ?3)",
            params![source, payload, at.timestamp_millis()],
        )?;
        Ok(conn.last_insert_rowid() as u64)
    }

    fn signals_after(&self, after: u64) -> Result<Vec<LoggedSignal>> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let mut stmt = conn.prepare(
            "SELECT seq, source, payload FROM signals WHERE seq > ?1 ORDER BY seq",
        )?;
        let rows = stmt.query_map(params![after as i64], |row| {
            Ok(LoggedSignal {
                seq: row.get::<_, i64>(0)? as u64,
                source: row.get(1)?,
                payload: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn last_signal_seq(&self) -> Result<u64> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        // AUTOINCREMENT keeps the high-water mark in sqlite_sequence even after pruning
        let seq = conn
            .query_row(
                "SELECT seq FROM sqlite_sequence WHERE name = 'signals'",
                [],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(seq.map(|s| s as u64).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_put_get_and_version() {
        let db = SqliteBackend::open_in_memory().unwrap();

        assert!(db.get("alpha:members").unwrap().is_none());
        assert_eq!(db.version("alpha:members").unwrap(), 0);

        db.put("alpha:members", "[]").unwrap();
        db.put("alpha:members", "[1]").unwrap();

        assert_eq!(db.get("alpha:members").unwrap().as_deref(), Some("[1]"));
        assert_eq!(db.version("alpha:members").unwrap(), 2);
    }

    #[test]
    fn test_two_handles_share_a_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pawpark.db");

        let first = SqliteBackend::open(&path).unwrap();
        let second = SqliteBackend::open(&path).unwrap();

        first.put("alpha:chat", "[]").unwrap();
        assert_eq!(second.get("alpha:chat").unwrap().as_deref(), Some("[]"));
        assert_eq!(second.version("alpha:chat").unwrap(), 1);
        assert_eq!(first.schema_version(), 1);
    }

    #[test]
    fn test_signal_log_is_shared_and_pruned() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pawpark.db");
        let first = SqliteBackend::open(&path).unwrap();
        let second = SqliteBackend::open(&path).unwrap();
        let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

        assert_eq!(second.last_signal_seq().unwrap(), 0);
        let seq = first.append_signal("a", "{\"type\":\"join\"}", start).unwrap();

        let seen = second.signals_after(0).unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].seq, seq);
        assert_eq!(seen[0].source, "a");
        assert!(second.signals_after(seq).unwrap().is_empty());

        let later = start + chrono::Duration::milliseconds(super::super::SIGNAL_LOG_TTL_MS + 1);
        second.append_signal("b", "{}", later).unwrap();
        let remaining = first.signals_after(0).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].source, "b");
        assert_eq!(first.last_signal_seq().unwrap(), 2);
    }
}

//! Store schema
//!
//! One `kv` table holds every venue collection; `signals` is the short-lived
//! notice log that lets processes sharing the file see each other's changes.
//! `PRAGMA user_version` records the schema the file was created with.

use rusqlite::Connection;
use tracing::{info, instrument, warn};

use crate::error::Result;

pub(crate) const SCHEMA_VERSION: u32 = 1;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS kv (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        version INTEGER NOT NULL DEFAULT 1,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS signals (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        source TEXT NOT NULL,
        payload TEXT NOT NULL,
        created_at INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS signals_created_at ON signals(created_at);
"#;

pub(crate) fn user_version(conn: &Connection) -> Result<u32> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

/// Create the tables on a fresh file; leave an existing one alone
#[instrument(skip(conn))]
pub(crate) fn ensure_schema(conn: &Connection) -> Result<()> {
    let found = user_version(conn)?;
    if found > SCHEMA_VERSION {
        warn!(found, supported = SCHEMA_VERSION, "Store written by a newer version");
        return Ok(());
    }
    if found == SCHEMA_VERSION {
        return Ok(());
    }

    // IMMEDIATE so two processes opening a fresh file do not interleave
    conn.execute_batch(&format!(
        "BEGIN IMMEDIATE; {} PRAGMA user_version = {}; COMMIT;",
        SCHEMA, SCHEMA_VERSION
    ))?;
    info!(from = found, to = SCHEMA_VERSION, "Store schema created");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare(&format!("SELECT name FROM pragma_table_info('{}')", table))
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .map(|c| c.unwrap())
            .collect()
    }

    #[test]
    fn test_fresh_store_gets_both_tables() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(user_version(&conn).unwrap(), 0);

        ensure_schema(&conn).unwrap();

        assert_eq!(user_version(&conn).unwrap(), SCHEMA_VERSION);
        assert_eq!(columns(&conn, "kv"), ["key", "value", "version", "updated_at"]);
        assert_eq!(columns(&conn, "signals"), ["seq", "source", "payload", "created_at"]);
    }

    #[test]
    fn test_existing_store_keeps_its_rows() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES ('alpha:chat', '[]', 'now')",
            [],
        )
        .unwrap();

        ensure_schema(&conn).unwrap();

        let value: String = conn
            .query_row("SELECT value FROM kv WHERE key = 'alpha:chat'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(value, "[]");
    }

    #[test]
    fn test_newer_store_is_not_touched() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA user_version = 9;").unwrap();

        ensure_schema(&conn).unwrap();

        assert_eq!(user_version(&conn).unwrap(), 9);
        assert!(columns(&conn, "kv").is_empty());
    }
}

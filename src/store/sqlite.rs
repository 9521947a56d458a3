//! SQLite Record Store
//! Mission: Durably persist named slots across process restarts

use super::RecordStore;
use anyhow::{Context, Result};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

/// SQLite-backed slot store. A single `slots` table holds every named
/// collection as its serialized value, mirroring the key-value layout of
/// the original client-side storage.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the store at `db_path` and initialize the schema.
    pub fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open record store at {}", db_path))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS slots (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )
        .context("Failed to create slots table")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl RecordStore for SqliteStore {
    fn get(&self, slot: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        let value = conn
            .query_row(
                "SELECT value FROM slots WHERE key = ?1",
                params![slot],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .with_context(|| format!("Failed to read slot '{}'", slot))?;
        Ok(value)
    }

    fn put(&self, slot: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO slots (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![slot, value, chrono::Utc::now().to_rfc3339()],
        )
        .with_context(|| format!("Failed to write slot '{}'", slot))?;
        Ok(())
    }

    fn remove(&self, slot: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM slots WHERE key = ?1", params![slot])
            .with_context(|| format!("Failed to remove slot '{}'", slot))?;
        Ok(())
    }
}

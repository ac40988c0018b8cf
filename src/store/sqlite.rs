use anyhow::Result;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};

use super::SlotStore;

const SLOT_NAME: &str = "pending_scan";

fn open_connection(db_path: &str) -> Result<Connection> {
    if db_path.starts_with("file:") {
        return Ok(Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI,
        )?);
    }
    Ok(Connection::open(db_path)?)
}

/// SQLite-backed persistence slot.
///
/// One named row; writes are whole-row replacements, so concurrent writers
/// reduce to last-writer-wins without any explicit lock.
pub struct SqliteSlotStore {
    conn: Connection,
}

impl SqliteSlotStore {
    /// Open (creating as needed) the slot database at `db_path`. `file:` URIs
    /// are passed through, which is how tests share an in-memory database.
    pub fn open(db_path: &str) -> Result<Self> {
        let conn = open_connection(db_path)?;
        let store = Self { conn };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;

            CREATE TABLE IF NOT EXISTS scanner_slot (
              slot TEXT PRIMARY KEY,
              payload_json TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }
}

impl SlotStore for SqliteSlotStore {
    fn read(&mut self) -> Result<Option<String>> {
        let payload = self
            .conn
            .query_row(
                "SELECT payload_json FROM scanner_slot WHERE slot = ?1",
                params![SLOT_NAME],
                |row| row.get(0),
            )
            .optional()?;
        Ok(payload)
    }

    fn write(&mut self, payload: &str) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO scanner_slot(slot, payload_json) VALUES (?1, ?2)
            ON CONFLICT(slot) DO UPDATE SET payload_json = excluded.payload_json
            "#,
            params![SLOT_NAME, payload],
        )?;
        Ok(())
    }

    fn delete(&mut self) -> Result<()> {
        self.conn
            .execute("DELETE FROM scanner_slot WHERE slot = ?1", params![SLOT_NAME])?;
        Ok(())
    }
}

/// In-memory slot for unit tests and web-like hosts without local SQLite.
#[derive(Clone, Debug, Default)]
pub struct InMemorySlotStore {
    payload: Option<String>,
}

impl InMemorySlotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SlotStore for InMemorySlotStore {
    fn read(&mut self) -> Result<Option<String>> {
        Ok(self.payload.clone())
    }

    fn write(&mut self, payload: &str) -> Result<()> {
        self.payload = Some(payload.to_string());
        Ok(())
    }

    fn delete(&mut self) -> Result<()> {
        self.payload = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared_memory_uri;

    #[test]
    fn sqlite_slot_overwrites_in_place() {
        let uri = shared_memory_uri();
        let mut store = SqliteSlotStore::open(&uri).expect("open slot db");

        assert!(store.read().unwrap().is_none());
        store.write("first").unwrap();
        store.write("second").unwrap();
        assert_eq!(store.read().unwrap().as_deref(), Some("second"));

        store.delete().unwrap();
        assert!(store.read().unwrap().is_none());
    }

    #[test]
    fn sqlite_slot_is_shared_across_connections() {
        let uri = shared_memory_uri();
        let mut writer = SqliteSlotStore::open(&uri).expect("open writer");
        writer.write("persisted").unwrap();

        // Second connection over the same URI sees the same slot, the way a
        // restarted process sees the same database file.
        let mut reader = SqliteSlotStore::open(&uri).expect("open reader");
        assert_eq!(reader.read().unwrap().as_deref(), Some("persisted"));
    }
}

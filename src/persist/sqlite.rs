//! SQLite-backed document store.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{Connection, OptionalExtension, params};

use super::{BlobStore, PersistError, PersistResult};

const DOCUMENT_FORMAT_VERSION: i64 = 1;

/// Keeps one named document per row of the `documents` table, so the calendar
/// and the activity history can share a database file.
pub struct SqliteBlobStore {
    conn: Connection,
    document: String,
    label: String,
}

impl SqliteBlobStore {
    /// Opens or creates the database at `path` and binds to `document`.
    ///
    /// Enables WAL mode and sets `synchronous=NORMAL`.
    pub fn open(path: impl AsRef<Path>, document: &str) -> PersistResult<Self> {
        let label = format!("{}#{document}", path.as_ref().display());
        let conn = Connection::open(path)?;
        Self::init_connection(conn, document, label)
    }

    /// Opens an in-memory database bound to `document`.
    pub fn open_in_memory(document: &str) -> PersistResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_connection(conn, document, format!(":memory:#{document}"))
    }

    fn init_connection(conn: Connection, document: &str, label: String) -> PersistResult<Self> {
        conn.execute_batch(include_str!("schema.sql"))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(Self {
            conn,
            document: document.to_string(),
            label,
        })
    }

    /// Milliseconds timestamp of the last save, if any.
    pub fn updated_ms(&self) -> PersistResult<Option<u64>> {
        let ts: Option<i64> = self
            .conn
            .query_row(
                "SELECT updated_ms FROM documents WHERE name = ?1",
                params![self.document],
                |row| row.get(0),
            )
            .optional()?;
        Ok(ts.map(|v| v as u64))
    }
}

impl BlobStore for SqliteBlobStore {
    fn save(&mut self, data: &[u8]) -> PersistResult<()> {
        self.conn.execute(
            "INSERT INTO documents(name, format_version, updated_ms, payload) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(name) DO UPDATE SET
                format_version = excluded.format_version,
                updated_ms = excluded.updated_ms,
                payload = excluded.payload",
            params![self.document, DOCUMENT_FORMAT_VERSION, now_ms() as i64, data],
        )?;
        Ok(())
    }

    fn load(&self) -> PersistResult<Vec<u8>> {
        let row: Option<(i64, Vec<u8>)> = self
            .conn
            .query_row(
                "SELECT format_version, payload FROM documents WHERE name = ?1",
                params![self.document],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((version, payload)) = row else {
            return Ok(Vec::new());
        };
        if version != DOCUMENT_FORMAT_VERSION {
            return Err(PersistError::Message(format!(
                "unsupported document format version: {version}"
            )));
        }
        Ok(payload)
    }

    fn name(&self) -> String {
        self.label.clone()
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

//! Blob-store persistence abstraction and backends.
//!
//! Each store holds one logical document; callers always save and load it as
//! a whole.

/// JSON file backend.
pub mod json_file;
/// In-process backend with failure injection.
pub mod memory;
/// SQLite `documents` table backend.
pub mod sqlite;

use thiserror::Error;

/// Failure inside a blob store or while (de)serializing its document.
#[derive(Debug, Error)]
pub enum PersistError {
    /// Filesystem error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// SQLite error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Document could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Anything else.
    #[error("{0}")]
    Message(String),
}

/// Result alias for persistence calls.
pub type PersistResult<T> = Result<T, PersistError>;

/// Durable store for a single opaque document.
pub trait BlobStore: Send {
    /// Replaces the stored document with `data`.
    fn save(&mut self, data: &[u8]) -> PersistResult<()>;
    /// Returns the stored document, or an empty buffer when nothing was saved yet.
    fn load(&self) -> PersistResult<Vec<u8>>;
    /// Human-readable location, used in log lines.
    fn name(&self) -> String;
}

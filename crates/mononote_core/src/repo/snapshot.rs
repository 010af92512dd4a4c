//! Durable snapshot backends.
//!
//! # Responsibility
//! - Read and replace one named text record holding the whole store.
//!
//! # Invariants
//! - `replace` is atomic: readers observe either the previous or the new
//!   snapshot, never a partial one.
//! - Writes on one backend instance are applied in call order.

use crate::db::{open_db, open_db_in_memory, DbError};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// Record name holding the serialized store snapshot.
pub const SNAPSHOT_RECORD_NAME: &str = "mononote-storage";

pub type StorageResult<T> = Result<T, StorageError>;

/// Failure of the durable medium.
#[derive(Debug)]
pub enum StorageError {
    Db(DbError),
    /// Backend-specific failure (quota, unreachable medium, ...).
    Backend(String),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Backend(message) => write!(f, "storage backend failure: {message}"),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Backend(_) => None,
        }
    }
}

impl From<DbError> for StorageError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Durable medium for the serialized store snapshot.
pub trait SnapshotBackend {
    /// Reads the last committed snapshot, `None` when nothing was ever saved.
    fn load(&self) -> StorageResult<Option<String>>;
    /// Atomically replaces the stored snapshot.
    fn replace(&mut self, snapshot: &str) -> StorageResult<()>;
}

/// SQLite-backed snapshot storage using the `records` table.
pub struct SqliteSnapshotBackend {
    conn: Connection,
    record_name: String,
}

impl SqliteSnapshotBackend {
    /// Wraps a migrated connection.
    pub fn new(conn: Connection) -> Self {
        Self::with_record_name(conn, SNAPSHOT_RECORD_NAME)
    }

    /// Wraps a migrated connection and stores under a custom record name.
    pub fn with_record_name(conn: Connection, record_name: impl Into<String>) -> Self {
        Self {
            conn,
            record_name: record_name.into(),
        }
    }

    /// Opens (and migrates) a database file.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    /// Opens a throwaway in-memory database.
    pub fn open_in_memory() -> StorageResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl SnapshotBackend for SqliteSnapshotBackend {
    fn load(&self) -> StorageResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM records WHERE name = ?1;",
                [self.record_name.as_str()],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn replace(&mut self, snapshot: &str) -> StorageResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO records (name, value, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(name) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![self.record_name.as_str(), snapshot],
        )?;
        tx.commit()?;
        Ok(())
    }
}

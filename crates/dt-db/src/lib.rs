//! SQLite storage for session timers.
//!
//! Implements the [`TimeStorage`] port of `dt-core` on top of `rusqlite`.
//! Each timer is one row keyed by `(user_id, session_id)` holding the
//! serialized timer as produced by the configured storage format.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` instance can be moved between threads but cannot be shared
//! across threads without external synchronization.
//!
//! SQLite serializes individual writes, but a timer request is a
//! load/modify/save sequence. Callers running concurrent requests for the
//! same key must serialize them (the `dt` binary holds a lock file for the
//! duration of each request).
//!
//! # Schema
//!
//! `updated_at` is stored as TEXT in RFC 3339 format with millisecond
//! precision (e.g., `2024-01-15T10:30:00.000Z`), so lexicographic ordering
//! matches chronological ordering.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use dt_core::{SessionId, StorageError, TimeStorage, UserId};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.conn.path())
            .finish()
    }
}

/// Identifies the timer of one candidate in one test session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimerKey {
    pub user_id: UserId,
    pub session_id: SessionId,
}

impl TimerKey {
    pub const fn new(user_id: UserId, session_id: SessionId) -> Self {
        Self {
            user_id,
            session_id,
        }
    }
}

impl fmt::Display for TimerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.user_id, self.session_id)
    }
}

/// Summary of a stored timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerRecord {
    pub user_id: String,
    pub session_id: String,
    /// Size of the serialized timer in bytes.
    pub size: i64,
    pub updated_at: String,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- Timers table: one serialized timer per candidate session
            -- data: payload written by the configured storage format
            -- updated_at: RFC 3339 (e.g., '2024-01-15T10:30:00.000Z')
            CREATE TABLE IF NOT EXISTS timers (
                user_id TEXT NOT NULL,
                session_id TEXT NOT NULL,
                data TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (user_id, session_id)
            );

            CREATE INDEX IF NOT EXISTS idx_timers_updated ON timers(updated_at);
            ",
        )?;
        Ok(())
    }

    /// Inserts or replaces the timer stored under `key`.
    pub fn store_timer(
        &self,
        key: &TimerKey,
        data: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        self.conn.execute(
            "
            INSERT INTO timers (user_id, session_id, data, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (user_id, session_id)
            DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at
            ",
            params![
                key.user_id.as_str(),
                key.session_id.as_str(),
                data,
                format_timestamp(updated_at)
            ],
        )?;
        Ok(())
    }

    /// Returns the timer stored under `key`, if any.
    pub fn load_timer(&self, key: &TimerKey) -> Result<Option<String>, DbError> {
        let data = self
            .conn
            .query_row(
                "SELECT data FROM timers WHERE user_id = ?1 AND session_id = ?2",
                params![key.user_id.as_str(), key.session_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(data)
    }

    /// Deletes the timer stored under `key`, returning whether it existed.
    pub fn delete_timer(&self, key: &TimerKey) -> Result<bool, DbError> {
        let deleted = self.conn.execute(
            "DELETE FROM timers WHERE user_id = ?1 AND session_id = ?2",
            params![key.user_id.as_str(), key.session_id.as_str()],
        )?;
        Ok(deleted > 0)
    }

    /// Lists stored timers, most recently updated first.
    pub fn list_timers(&self) -> Result<Vec<TimerRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT user_id, session_id, length(data), updated_at
            FROM timers
            ORDER BY updated_at DESC, user_id ASC, session_id ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(TimerRecord {
                user_id: row.get(0)?,
                session_id: row.get(1)?,
                size: row.get(2)?,
                updated_at: row.get(3)?,
            })
        })?;
        let mut timers = Vec::new();
        for row in rows {
            timers.push(row?);
        }
        Ok(timers)
    }
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// [`TimeStorage`] bound to one timer row.
#[derive(Debug)]
pub struct SqliteTimeStorage {
    db: Database,
    key: TimerKey,
}

impl SqliteTimeStorage {
    pub const fn new(db: Database, key: TimerKey) -> Self {
        Self { db, key }
    }

    pub const fn key(&self) -> &TimerKey {
        &self.key
    }

    pub const fn database(&self) -> &Database {
        &self.db
    }
}

impl TimeStorage for SqliteTimeStorage {
    fn store(&mut self, data: &str) -> Result<(), StorageError> {
        self.db
            .store_timer(&self.key, data, Utc::now())
            .map_err(StorageError::backend)?;
        tracing::debug!(key = %self.key, bytes = data.len(), "timer stored");
        Ok(())
    }

    fn load(&mut self) -> Result<Option<String>, StorageError> {
        self.db.load_timer(&self.key).map_err(StorageError::backend)
    }

    fn delete(&mut self) -> Result<bool, StorageError> {
        let deleted = self
            .db
            .delete_timer(&self.key)
            .map_err(StorageError::backend)?;
        tracing::debug!(key = %self.key, deleted, "timer deleted");
        Ok(deleted)
    }
}

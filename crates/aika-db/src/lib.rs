//! Storage layer for aika.
//!
//! Provides persistence for time entries using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! [`SqliteEntryStore`] puts it behind an async mutex so it can serve as an
//! [`aika_core::EntryStore`].
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in RFC 3339 format with millisecond precision
//! (e.g., `2024-01-15T10:30:00.000Z`). The fixed width ensures:
//! - Lexicographic ordering matches chronological ordering
//! - Human-readable values in the database
//! - Timezone-aware (always UTC)
//!
//! ## Ownership
//!
//! `owner_kind` and `owner_id` together identify the scope (a user or an
//! organization). The schema does not constrain how many entries of a scope
//! may have a NULL `end_time`.

mod store;

use std::path::Path;

use aika_core::{EntryId, EntryPatch, NewEntry, Scope, TimeEntry, UserId};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use thiserror::Error;
use uuid::Uuid;

pub use store::SqliteEntryStore;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp for entry {entry_id}: {timestamp}")]
    TimestampParse {
        entry_id: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored row does not describe a valid entry.
    #[error("invalid entry data for {entry_id}: {message}")]
    InvalidEntryData { entry_id: String, message: String },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// Raw column values of a `time_entries` row.
struct EntryRow {
    id: String,
    owner_kind: String,
    owner_id: String,
    description: String,
    start_time: String,
    end_time: Option<String>,
    created_at: String,
    created_by: String,
}

impl EntryRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner_kind: row.get(1)?,
            owner_id: row.get(2)?,
            description: row.get(3)?,
            start_time: row.get(4)?,
            end_time: row.get(5)?,
            created_at: row.get(6)?,
            created_by: row.get(7)?,
        })
    }

    fn into_entry(self) -> Result<TimeEntry, DbError> {
        let invalid = |message: String| DbError::InvalidEntryData {
            entry_id: self.id.clone(),
            message,
        };
        let scope = Scope::from_parts(&self.owner_kind, &self.owner_id)
            .map_err(|err| invalid(err.to_string()))?;
        let created_by = UserId::new(self.created_by.as_str()).map_err(|err| invalid(err.to_string()))?;
        let start_time = parse_timestamp(&self.start_time, &self.id)?;
        let end_time = self
            .end_time
            .as_deref()
            .map(|end| parse_timestamp(end, &self.id))
            .transpose()?;
        let created_at = parse_timestamp(&self.created_at, &self.id)?;
        let id = EntryId::new(self.id.as_str()).map_err(|err| invalid(err.to_string()))?;
        Ok(TimeEntry {
            id,
            scope,
            description: self.description,
            start_time,
            end_time,
            created_at,
            created_by,
        })
    }
}

const ENTRY_COLUMNS: &str =
    "id, owner_kind, owner_id, description, start_time, end_time, created_at, created_by";

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
            -- start_time / end_time / created_at: RFC 3339 UTC, millisecond precision
            -- end_time: NULL while the entry is in progress
            CREATE TABLE IF NOT EXISTS time_entries (
                id TEXT PRIMARY KEY,
                owner_kind TEXT NOT NULL,
                owner_id TEXT NOT NULL,
                description TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT,
                created_at TEXT NOT NULL,
                created_by TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_time_entries_owner_start
                ON time_entries(owner_kind, owner_id, start_time);
            ",
        )?;
        Ok(())
    }

    /// Inserts a new entry, assigning its ID and creation time.
    pub fn insert_entry(
        &mut self,
        entry: &NewEntry,
        created_at: DateTime<Utc>,
    ) -> Result<TimeEntry, DbError> {
        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            "
            INSERT INTO time_entries
            (id, owner_kind, owner_id, description, start_time, end_time, created_at, created_by)
            VALUES (?, ?, ?, ?, ?, NULL, ?, ?)
            ",
            params![
                id,
                entry.scope.kind(),
                entry.scope.owner_id(),
                entry.description,
                format_timestamp(entry.start_time),
                format_timestamp(created_at),
                entry.created_by.as_str(),
            ],
        )?;
        self.get_entry(&id)?.ok_or_else(|| DbError::InvalidEntryData {
            entry_id: id,
            message: "inserted row could not be read back".to_string(),
        })
    }

    /// Fetches a single entry by ID.
    pub fn get_entry(&self, id: &str) -> Result<Option<TimeEntry>, DbError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM time_entries WHERE id = ?"),
                [id],
                EntryRow::from_row,
            )
            .optional()?;
        row.map(EntryRow::into_entry).transpose()
    }

    /// Lists a scope's entries, newest start time first.
    pub fn list_entries(&self, scope: &Scope) -> Result<Vec<TimeEntry>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "
            SELECT {ENTRY_COLUMNS}
            FROM time_entries
            WHERE owner_kind = ? AND owner_id = ?
            ORDER BY start_time DESC, id ASC
            "
        ))?;
        let rows = stmt.query_map([scope.kind(), scope.owner_id()], EntryRow::from_row)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?.into_entry()?);
        }
        Ok(entries)
    }

    /// Applies a partial update. Returns `false` if no entry has this ID.
    pub fn update_entry(&mut self, id: &str, patch: &EntryPatch) -> Result<bool, DbError> {
        let mut assignments = Vec::new();
        let mut values: Vec<Option<String>> = Vec::new();
        if let Some(description) = &patch.description {
            assignments.push("description = ?");
            values.push(Some(description.clone()));
        }
        if let Some(start_time) = patch.start_time {
            assignments.push("start_time = ?");
            values.push(Some(format_timestamp(start_time)));
        }
        if let Some(end_time) = patch.end_time {
            assignments.push("end_time = ?");
            values.push(end_time.map(format_timestamp));
        }

        if assignments.is_empty() {
            return Ok(self.get_entry(id)?.is_some());
        }

        values.push(Some(id.to_string()));
        let changed = self.conn.execute(
            &format!(
                "UPDATE time_entries SET {} WHERE id = ?",
                assignments.join(", ")
            ),
            params_from_iter(values),
        )?;
        Ok(changed > 0)
    }

    /// Deletes an entry. Returns `false` if no entry has this ID.
    pub fn delete_entry(&mut self, id: &str) -> Result<bool, DbError> {
        let deleted = self
            .conn
            .execute("DELETE FROM time_entries WHERE id = ?", [id])?;
        Ok(deleted > 0)
    }
}

fn parse_timestamp(timestamp: &str, entry_id: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            entry_id: entry_id.to_string(),
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

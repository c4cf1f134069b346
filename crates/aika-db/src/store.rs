//! [`EntryStore`] backed by the SQLite [`Database`].

use std::path::Path;
use std::sync::Arc;

use aika_core::{
    Clock, EntryId, EntryPatch, EntryStore, NewEntry, Scope, StoreError, SystemClock, TimeEntry,
};
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{Database, DbError};

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        Self::Backend(Box::new(err))
    }
}

pub struct SqliteEntryStore {
    db: Mutex<Database>,
    clock: Arc<dyn Clock>,
}

impl SqliteEntryStore {
    /// Wraps an open database. Creation times come from the system clock.
    pub fn new(db: Database) -> Self {
        Self::with_clock(db, Arc::new(SystemClock))
    }

    pub fn with_clock(db: Database, clock: Arc<dyn Clock>) -> Self {
        Self {
            db: Mutex::new(db),
            clock,
        }
    }

    /// Opens (and initializes) the database at `path`.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        Database::open(path).map(Self::new)
    }
}

#[async_trait]
impl EntryStore for SqliteEntryStore {
    async fn list(&self, scope: &Scope) -> Result<Vec<TimeEntry>, StoreError> {
        let db = self.db.lock().await;
        Ok(db.list_entries(scope)?)
    }

    async fn insert(&self, entry: NewEntry) -> Result<TimeEntry, StoreError> {
        if entry.description.trim().is_empty() {
            return Err(StoreError::Rejected("description cannot be empty".into()));
        }
        let mut db = self.db.lock().await;
        let stored = db.insert_entry(&entry, self.clock.now())?;
        tracing::debug!(id = %stored.id, scope = %stored.scope, "inserted entry");
        Ok(stored)
    }

    async fn update(&self, id: &EntryId, patch: &EntryPatch) -> Result<(), StoreError> {
        let mut db = self.db.lock().await;
        if db.update_entry(id.as_str(), patch)? {
            Ok(())
        } else {
            Err(StoreError::NotFound(id.clone()))
        }
    }

    async fn delete(&self, id: &EntryId) -> Result<(), StoreError> {
        let mut db = self.db.lock().await;
        if db.delete_entry(id.as_str())? {
            Ok(())
        } else {
            Err(StoreError::NotFound(id.clone()))
        }
    }
}

//! The persistence boundary for time entries.

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{EntryId, EntryPatch, NewEntry, Scope, TimeEntry};

/// Errors reported by an [`EntryStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// No entry with the given ID exists.
    #[error("time entry not found: {0}")]
    NotFound(EntryId),

    /// The store refused the request (constraint or validation failure).
    #[error("entry store rejected the request: {0}")]
    Rejected(String),

    /// The backing store failed (I/O, connection, decoding).
    #[error("entry store unavailable: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Where time entries live.
///
/// Implementations assign `id` and `created_at` on insert and return entries
/// newest `start_time` first from [`EntryStore::list`]. Nothing here keeps a
/// scope from holding more than one open entry.
#[async_trait]
pub trait EntryStore: Send + Sync {
    async fn list(&self, scope: &Scope) -> Result<Vec<TimeEntry>, StoreError>;
    async fn insert(&self, entry: NewEntry) -> Result<TimeEntry, StoreError>;
    async fn update(&self, id: &EntryId, patch: &EntryPatch) -> Result<(), StoreError>;
    async fn delete(&self, id: &EntryId) -> Result<(), StoreError>;
}

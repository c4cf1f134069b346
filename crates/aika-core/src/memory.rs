//! In-memory [`EntryStore`] for tests and local experiments.
//!
//! Failures can be injected per operation to exercise the controller's
//! error paths.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::store::{EntryStore, StoreError};
use crate::types::{EntryId, EntryPatch, NewEntry, Scope, TimeEntry};

/// The store operations, for failure injection and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    List,
    Insert,
    Update,
    Delete,
}

#[derive(Default)]
struct Inner {
    entries: Vec<TimeEntry>,
    failures: HashMap<StoreOp, usize>,
    calls: HashMap<StoreOp, usize>,
}

impl Inner {
    fn begin(&mut self, op: StoreOp) -> Result<(), StoreError> {
        *self.calls.entry(op).or_default() += 1;
        match self.failures.get_mut(&op) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Err(StoreError::Backend(
                    format!("injected {op:?} failure").into(),
                ))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-populated with `entries`.
    pub fn with_entries(entries: Vec<TimeEntry>) -> Self {
        Self {
            inner: RwLock::new(Inner {
                entries,
                ..Inner::default()
            }),
        }
    }

    /// Makes the next `times` calls of `op` fail with a backend error.
    pub async fn fail_next(&self, op: StoreOp, times: usize) {
        self.inner.write().await.failures.insert(op, times);
    }

    /// How many times `op` has been called, failed calls included.
    pub async fn calls(&self, op: StoreOp) -> usize {
        self.inner.read().await.calls.get(&op).copied().unwrap_or(0)
    }

    /// A copy of every stored entry, in insertion order.
    pub async fn entries(&self) -> Vec<TimeEntry> {
        self.inner.read().await.entries.clone()
    }
}

#[async_trait]
impl EntryStore for MemoryStore {
    async fn list(&self, scope: &Scope) -> Result<Vec<TimeEntry>, StoreError> {
        let mut inner = self.inner.write().await;
        inner.begin(StoreOp::List)?;
        let mut entries: Vec<TimeEntry> = inner
            .entries
            .iter()
            .filter(|entry| &entry.scope == scope)
            .cloned()
            .collect();
        entries.sort_by(|a, b| {
            b.start_time
                .cmp(&a.start_time)
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });
        Ok(entries)
    }

    async fn insert(&self, entry: NewEntry) -> Result<TimeEntry, StoreError> {
        let mut inner = self.inner.write().await;
        inner.begin(StoreOp::Insert)?;
        if entry.description.trim().is_empty() {
            return Err(StoreError::Rejected("description cannot be empty".into()));
        }
        let id = EntryId::new(Uuid::new_v4().to_string())
            .map_err(|err| StoreError::Backend(err.into()))?;
        let stored = TimeEntry {
            id,
            scope: entry.scope,
            description: entry.description,
            start_time: entry.start_time,
            end_time: None,
            created_at: Utc::now(),
            created_by: entry.created_by,
        };
        inner.entries.push(stored.clone());
        Ok(stored)
    }

    async fn update(&self, id: &EntryId, patch: &EntryPatch) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.begin(StoreOp::Update)?;
        let entry = inner
            .entries
            .iter_mut()
            .find(|entry| &entry.id == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        patch.apply_to(entry);
        Ok(())
    }

    async fn delete(&self, id: &EntryId) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.begin(StoreOp::Delete)?;
        let before = inner.entries.len();
        inner.entries.retain(|entry| &entry.id != id);
        if inner.entries.len() == before {
            return Err(StoreError::NotFound(id.clone()));
        }
        Ok(())
    }
}

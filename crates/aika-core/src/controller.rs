//! Reconciles the timer engine with persisted time entries.
//!
//! [`EntryController`] is the only writer of time entries. Local state (the
//! current entry, its description, the engine) changes only after the store
//! confirms the corresponding operation, and every successful mutation is
//! followed by a full reload of the scope's entries instead of patching the
//! cached list in place.
//!
//! Operations take `&mut self`, so one controller never has two store
//! requests in flight. Nothing orders requests issued by different
//! controllers or processes; each transition bumps [`EntryController::sequence`]
//! and is logged with it so crossed updates can be traced.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;

use crate::clock::Clock;
use crate::store::{EntryStore, StoreError};
use crate::timer::{TimerEngine, TimerState};
use crate::types::{EntryId, EntryPatch, NewEntry, Session, TimeEntry, ValidationError};

/// Errors returned by controller operations.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("a timer is already running (entry {0})")]
    AlreadyRunning(EntryId),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The mutation was persisted but reloading the entry list failed.
    #[error("change saved, but reloading entries failed: {0}")]
    Refresh(#[source] StoreError),
}

/// Outcome of a reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// The open entry the timer now follows.
    pub active: Option<EntryId>,
    /// Other open entries in the scope, ignored in favor of `active`.
    pub stranded: Vec<EntryId>,
}

/// Observable controller state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerSnapshot {
    pub current_entry_id: Option<EntryId>,
    pub description: String,
    pub timer: TimerState,
    pub elapsed: u64,
}

pub struct EntryController<S> {
    store: S,
    session: Session,
    clock: Arc<dyn Clock>,
    engine: TimerEngine,
    current_entry_id: Option<EntryId>,
    description: String,
    entries: Vec<TimeEntry>,
    sequence: u64,
}

impl<S: EntryStore> EntryController<S> {
    pub fn new(store: S, session: Session, clock: Arc<dyn Clock>) -> Self {
        let engine = TimerEngine::new(Arc::clone(&clock));
        Self {
            store,
            session,
            clock,
            engine,
            current_entry_id: None,
            description: String::new(),
            entries: Vec::new(),
            sequence: 0,
        }
    }

    /// Overrides the engine's tick interval.
    #[must_use]
    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.engine = TimerEngine::new(Arc::clone(&self.clock)).with_tick_interval(tick_interval);
        self
    }

    pub const fn session(&self) -> &Session {
        &self.session
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn engine(&self) -> &TimerEngine {
        &self.engine
    }

    /// Entries of the active scope as of the last successful reload, newest first.
    pub fn entries(&self) -> &[TimeEntry] {
        &self.entries
    }

    pub fn entry(&self, id: &EntryId) -> Option<&TimeEntry> {
        self.entries.iter().find(|entry| &entry.id == id)
    }

    pub const fn current_entry_id(&self) -> Option<&EntryId> {
        self.current_entry_id.as_ref()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub const fn is_running(&self) -> bool {
        self.current_entry_id.is_some()
    }

    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    /// The last elapsed value published by the engine.
    pub fn elapsed(&self) -> u64 {
        self.engine.elapsed()
    }

    /// Subscribes to elapsed-second changes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.engine.subscribe()
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            current_entry_id: self.current_entry_id.clone(),
            description: self.description.clone(),
            timer: self.engine.state(),
            elapsed: self.engine.elapsed(),
        }
    }

    /// Rebuilds timer state from the scope's persisted entries.
    ///
    /// The open entry with the latest start time drives the timer. Calling
    /// this again without store changes leaves every piece of state as it was.
    pub async fn reconcile(&mut self) -> Result<Reconciliation, ControllerError> {
        let entries = self.store.list(&self.session.scope()).await?;
        Ok(self.apply_entries(entries))
    }

    /// Creates an open entry starting now and starts the timer from it.
    pub async fn start_timer(&mut self, description: &str) -> Result<TimeEntry, ControllerError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(ValidationError::Empty {
                field: "description",
            }
            .into());
        }
        if let Some(id) = &self.current_entry_id {
            return Err(ControllerError::AlreadyRunning(id.clone()));
        }

        let new_entry = NewEntry {
            scope: self.session.scope(),
            description: description.to_string(),
            start_time: self.clock.now(),
            created_by: self.session.user.clone(),
        };
        let entry = self.store.insert(new_entry).await?;

        self.sequence += 1;
        self.current_entry_id = Some(entry.id.clone());
        self.description.clone_from(&entry.description);
        self.engine.start(entry.start_time);
        tracing::info!(id = %entry.id, sequence = self.sequence, "started timer");

        self.refresh().await?;
        Ok(entry)
    }

    /// Closes the current entry at now and stops the timer.
    ///
    /// Returns the closed entry's ID, or `None` when no timer was running. On
    /// failure the entry stays open locally and the call can be retried.
    pub async fn stop_timer(&mut self) -> Result<Option<EntryId>, ControllerError> {
        let Some(id) = self.current_entry_id.clone() else {
            tracing::debug!("stop requested with no running timer");
            return Ok(None);
        };

        let end = self.clock.now();
        self.store.update(&id, &EntryPatch::close_at(end)).await?;

        self.sequence += 1;
        self.engine.stop();
        self.current_entry_id = None;
        self.description.clear();
        tracing::info!(%id, %end, sequence = self.sequence, "stopped timer");

        self.refresh().await?;
        Ok(Some(id))
    }

    /// Applies `patch` to an entry of the active scope, then reloads.
    ///
    /// Entries outside the last loaded list are `NotFound`, even if the store
    /// holds them under another scope.
    pub async fn update_entry(
        &mut self,
        id: &EntryId,
        patch: &EntryPatch,
    ) -> Result<(), ControllerError> {
        self.ensure_in_scope(id)?;
        self.store.update(id, patch).await?;
        self.sequence += 1;
        tracing::info!(%id, sequence = self.sequence, "updated entry");
        self.refresh().await
    }

    /// Deletes an entry of the active scope, then reloads.
    pub async fn delete_entry(&mut self, id: &EntryId) -> Result<(), ControllerError> {
        self.ensure_in_scope(id)?;
        self.store.delete(id).await?;
        self.sequence += 1;
        tracing::info!(%id, sequence = self.sequence, "deleted entry");
        self.refresh().await
    }

    fn ensure_in_scope(&self, id: &EntryId) -> Result<(), ControllerError> {
        if self.entry(id).is_some() {
            return Ok(());
        }
        tracing::debug!(%id, scope = %self.session.scope(), "entry not in active scope");
        Err(StoreError::NotFound(id.clone()).into())
    }

    async fn refresh(&mut self) -> Result<(), ControllerError> {
        let entries = self
            .store
            .list(&self.session.scope())
            .await
            .map_err(ControllerError::Refresh)?;
        self.apply_entries(entries);
        Ok(())
    }

    fn apply_entries(&mut self, entries: Vec<TimeEntry>) -> Reconciliation {
        let mut open: Vec<&TimeEntry> = entries.iter().filter(|entry| entry.is_open()).collect();
        // Stable: equal start times keep the store's order.
        open.sort_by(|a, b| b.start_time.cmp(&a.start_time));

        let report = Reconciliation {
            active: open.first().map(|entry| entry.id.clone()),
            stranded: open.iter().skip(1).map(|entry| entry.id.clone()).collect(),
        };
        for id in &report.stranded {
            tracing::warn!(
                %id,
                scope = %self.session.scope(),
                "ignoring additional open entry; only the latest open entry drives the timer"
            );
        }

        match open.first() {
            Some(active) => {
                let changed = self.current_entry_id.as_ref() != Some(&active.id)
                    || self.engine.anchor() != Some(active.start_time);
                self.current_entry_id = Some(active.id.clone());
                self.description.clone_from(&active.description);
                if changed {
                    self.sequence += 1;
                    self.engine.start(active.start_time);
                    tracing::debug!(id = %active.id, sequence = self.sequence, "resumed open entry");
                }
            }
            None => {
                if self.current_entry_id.take().is_some() || self.engine.is_running() {
                    self.sequence += 1;
                    self.engine.stop();
                    tracing::debug!(sequence = self.sequence, "no open entry; timer stopped");
                }
                self.description.clear();
            }
        }

        tracing::debug!(entries = entries.len(), "loaded entries");
        self.entries = entries;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{DateTime, TimeZone, Utc};

    use crate::clock::ManualClock;
    use crate::memory::{MemoryStore, StoreOp};
    use crate::types::{OrganizationId, Scope, UserId};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
    }

    fn session() -> Session {
        Session::personal(user())
    }

    fn controller(store: MemoryStore, clock: &ManualClock) -> EntryController<MemoryStore> {
        EntryController::new(store, session(), Arc::new(clock.clone()))
    }

    fn stored(id: &str, description: &str, start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> TimeEntry {
        TimeEntry {
            id: EntryId::new(id).unwrap(),
            scope: session().scope(),
            description: description.to_string(),
            start_time: start,
            end_time: end,
            created_at: start,
            created_by: user(),
        }
    }

    async fn next_change(rx: &mut watch::Receiver<u64>) -> u64 {
        tokio::time::timeout(Duration::from_secs(5), rx.changed())
            .await
            .expect("tick within timeout")
            .expect("sender alive");
        *rx.borrow_and_update()
    }

    #[tokio::test(start_paused = true)]
    async fn start_then_stop_records_interval() {
        let clock = ManualClock::new(t0());
        let mut controller = controller(MemoryStore::new(), &clock);
        controller.reconcile().await.unwrap();

        let entry = controller.start_timer("write spec").await.unwrap();
        assert_eq!(entry.start_time, t0());
        assert!(entry.is_open());
        assert_eq!(controller.elapsed(), 0);
        assert_eq!(controller.current_entry_id(), Some(&entry.id));
        assert_eq!(controller.description(), "write spec");
        assert_eq!(controller.entries().len(), 1);

        let mut rx = controller.subscribe();
        clock.advance(chrono::Duration::seconds(90));
        assert_eq!(next_change(&mut rx).await, 90);

        let stopped = controller.stop_timer().await.unwrap();
        assert_eq!(stopped, Some(entry.id.clone()));
        assert_eq!(controller.engine().state(), TimerState::Stopped);
        assert_eq!(controller.current_entry_id(), None);
        assert_eq!(controller.description(), "");
        assert_eq!(controller.elapsed(), 0);

        let persisted = controller.store().entries().await;
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].end_time, Some(t0() + chrono::Duration::seconds(90)));
        assert_eq!(controller.entries()[0].end_time, persisted[0].end_time);
    }

    #[tokio::test(start_paused = true)]
    async fn reconcile_resumes_open_entry_after_reload() {
        let clock = ManualClock::new(t0() + chrono::Duration::minutes(30));
        let store = MemoryStore::with_entries(vec![
            stored("done", "earlier", t0() - chrono::Duration::hours(2), Some(t0())),
            stored("open", "write spec", t0(), None),
        ]);
        let mut controller = controller(store, &clock);

        let report = controller.reconcile().await.unwrap();
        assert_eq!(report.active, Some(EntryId::new("open").unwrap()));
        assert!(report.stranded.is_empty());
        assert_eq!(controller.engine().state(), TimerState::Running { anchor: t0() });
        assert_eq!(controller.current_entry_id().unwrap().as_str(), "open");
        assert_eq!(controller.description(), "write spec");
        assert_eq!(controller.elapsed(), 1800);
        assert_eq!(controller.entries()[0].id.as_str(), "open");
    }

    #[tokio::test(start_paused = true)]
    async fn reconcile_is_idempotent() {
        let clock = ManualClock::new(t0() + chrono::Duration::seconds(10));
        let store = MemoryStore::with_entries(vec![stored("open", "review", t0(), None)]);
        let mut controller = controller(store, &clock);

        let first = controller.reconcile().await.unwrap();
        let snapshot = controller.snapshot();
        let sequence = controller.sequence();
        let second = controller.reconcile().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(controller.snapshot(), snapshot);
        assert_eq!(controller.sequence(), sequence);
        assert_eq!(controller.entries().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reconcile_without_open_entry_is_stopped() {
        let clock = ManualClock::new(t0());
        let store = MemoryStore::with_entries(vec![stored(
            "done",
            "review",
            t0() - chrono::Duration::hours(1),
            Some(t0()),
        )]);
        let mut controller = controller(store, &clock);

        let report = controller.reconcile().await.unwrap();
        assert_eq!(report, Reconciliation::default());
        assert_eq!(controller.engine().state(), TimerState::Stopped);
        assert_eq!(controller.current_entry_id(), None);
        assert_eq!(controller.entries().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn latest_open_entry_wins_and_others_are_reported() {
        let clock = ManualClock::new(t0() + chrono::Duration::hours(1));
        let later = t0() + chrono::Duration::minutes(20);
        let store = MemoryStore::with_entries(vec![
            stored("first", "from laptop", t0(), None),
            stored("second", "from phone", later, None),
        ]);
        let mut controller = controller(store, &clock);

        let report = controller.reconcile().await.unwrap();
        assert_eq!(report.active, Some(EntryId::new("second").unwrap()));
        assert_eq!(report.stranded, vec![EntryId::new("first").unwrap()]);
        assert_eq!(controller.engine().anchor(), Some(later));
        assert_eq!(controller.description(), "from phone");
    }

    #[tokio::test(start_paused = true)]
    async fn blank_description_is_rejected_without_side_effects() {
        let clock = ManualClock::new(t0());
        let mut controller = controller(MemoryStore::new(), &clock);

        let err = controller.start_timer("   ").await.unwrap_err();
        assert!(matches!(
            err,
            ControllerError::Validation(ValidationError::Empty {
                field: "description"
            })
        ));
        assert_eq!(controller.store().calls(StoreOp::Insert).await, 0);
        assert!(!controller.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn description_is_trimmed() {
        let clock = ManualClock::new(t0());
        let mut controller = controller(MemoryStore::new(), &clock);

        let entry = controller.start_timer("  plan sprint \n").await.unwrap();
        assert_eq!(entry.description, "plan sprint");
        assert_eq!(controller.description(), "plan sprint");
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_is_refused_while_running() {
        let clock = ManualClock::new(t0());
        let mut controller = controller(MemoryStore::new(), &clock);
        let entry = controller.start_timer("first").await.unwrap();

        let err = controller.start_timer("second").await.unwrap_err();
        assert!(matches!(err, ControllerError::AlreadyRunning(id) if id == entry.id));
        assert_eq!(controller.store().calls(StoreOp::Insert).await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_start_leaves_state_untouched() {
        let clock = ManualClock::new(t0());
        let store = MemoryStore::new();
        store.fail_next(StoreOp::Insert, 1).await;
        let mut controller = controller(store, &clock);
        controller.reconcile().await.unwrap();
        let before = controller.snapshot();

        let err = controller.start_timer("write spec").await.unwrap_err();
        assert!(matches!(err, ControllerError::Store(StoreError::Backend(_))));
        assert_eq!(controller.snapshot(), before);
        assert_eq!(controller.engine().state(), TimerState::Stopped);
        assert!(controller.store().entries().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_stop_keeps_interval_open_and_can_be_retried() {
        let clock = ManualClock::new(t0());
        let mut controller = controller(MemoryStore::new(), &clock);
        let entry = controller.start_timer("write spec").await.unwrap();
        clock.advance(chrono::Duration::seconds(30));

        controller.store().fail_next(StoreOp::Update, 1).await;
        let err = controller.stop_timer().await.unwrap_err();
        assert!(matches!(err, ControllerError::Store(_)));
        assert_eq!(controller.current_entry_id(), Some(&entry.id));
        assert_eq!(controller.engine().state(), TimerState::Running { anchor: t0() });
        assert!(controller.store().entries().await[0].is_open());

        clock.advance(chrono::Duration::seconds(30));
        assert_eq!(controller.stop_timer().await.unwrap(), Some(entry.id));
        assert_eq!(
            controller.store().entries().await[0].end_time,
            Some(t0() + chrono::Duration::seconds(60))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stop_without_running_timer_is_noop() {
        let clock = ManualClock::new(t0());
        let mut controller = controller(MemoryStore::new(), &clock);

        assert_eq!(controller.stop_timer().await.unwrap(), None);
        assert_eq!(controller.store().calls(StoreOp::Update).await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn update_reloads_and_follows_edited_start() {
        let clock = ManualClock::new(t0() + chrono::Duration::minutes(10));
        let store = MemoryStore::with_entries(vec![stored("open", "draft", t0(), None)]);
        let mut controller = controller(store, &clock);
        controller.reconcile().await.unwrap();
        assert_eq!(controller.elapsed(), 600);

        let id = EntryId::new("open").unwrap();
        let earlier = t0() - chrono::Duration::minutes(5);
        let patch = EntryPatch {
            description: Some("final draft".to_string()),
            start_time: Some(earlier),
            end_time: None,
        };
        controller.update_entry(&id, &patch).await.unwrap();

        let entry = controller.entry(&id).unwrap();
        assert_eq!(entry.description, "final draft");
        assert_eq!(entry.start_time, earlier);
        assert_eq!(controller.description(), "final draft");
        assert_eq!(controller.engine().anchor(), Some(earlier));
        assert_eq!(controller.elapsed(), 900);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_delete_keeps_previous_list() {
        let clock = ManualClock::new(t0());
        let store = MemoryStore::with_entries(vec![stored(
            "done",
            "review",
            t0() - chrono::Duration::hours(1),
            Some(t0()),
        )]);
        let mut controller = controller(store, &clock);
        controller.reconcile().await.unwrap();

        controller.store().fail_next(StoreOp::Delete, 1).await;
        let id = EntryId::new("done").unwrap();
        assert!(controller.delete_entry(&id).await.is_err());
        assert_eq!(controller.entries().len(), 1);

        controller.delete_entry(&id).await.unwrap();
        assert!(controller.entries().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn deleting_open_entry_stops_timer() {
        let clock = ManualClock::new(t0());
        let mut controller = controller(MemoryStore::new(), &clock);
        let entry = controller.start_timer("oops").await.unwrap();

        controller.delete_entry(&entry.id).await.unwrap();
        assert!(!controller.is_running());
        assert_eq!(controller.engine().state(), TimerState::Stopped);
        assert!(controller.entries().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn entries_of_other_scopes_cannot_be_changed() {
        let clock = ManualClock::new(t0());
        let team_scope = Scope::Organization(OrganizationId::new("org-1").unwrap());
        let team_entry = TimeEntry {
            scope: team_scope.clone(),
            ..stored("team", "team work", t0(), None)
        };
        let mut personal = controller(MemoryStore::with_entries(vec![team_entry]), &clock);
        personal.reconcile().await.unwrap();
        assert!(personal.entries().is_empty());

        let id = EntryId::new("team").unwrap();
        let err = personal.delete_entry(&id).await.unwrap_err();
        assert!(matches!(
            err,
            ControllerError::Store(StoreError::NotFound(ref missing)) if *missing == id
        ));
        let err = personal
            .update_entry(&id, &EntryPatch::close_at(t0()))
            .await
            .unwrap_err();
        assert!(matches!(err, ControllerError::Store(StoreError::NotFound(_))));

        assert_eq!(personal.store().calls(StoreOp::Delete).await, 0);
        assert_eq!(personal.store().calls(StoreOp::Update).await, 0);
        let remaining = personal.store().entries().await;
        assert_eq!(remaining.len(), 1);
        assert!(remaining[0].is_open());
        assert_eq!(remaining[0].scope, team_scope);
    }

    #[tokio::test(start_paused = true)]
    async fn reload_failure_after_save_is_distinguished() {
        let clock = ManualClock::new(t0());
        let mut controller = controller(MemoryStore::new(), &clock);
        controller.store().fail_next(StoreOp::List, 1).await;

        let err = controller.start_timer("write spec").await.unwrap_err();
        assert!(matches!(err, ControllerError::Refresh(_)));
        // The insert went through, and local state reflects it.
        assert!(controller.is_running());
        assert_eq!(controller.store().entries().await.len(), 1);
        assert!(controller.entries().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn controllers_do_not_share_timer_state() {
        let clock = ManualClock::new(t0());
        let mut personal = controller(MemoryStore::new(), &clock);
        let mut team = EntryController::new(
            MemoryStore::new(),
            Session {
                user: user(),
                organization: Some(OrganizationId::new("org-1").unwrap()),
            },
            Arc::new(clock.clone()),
        );

        team.start_timer("standup").await.unwrap();
        personal.reconcile().await.unwrap();

        assert!(team.is_running());
        assert!(!personal.is_running());
        assert_eq!(personal.engine().state(), TimerState::Stopped);
        assert!(matches!(
            team.store().entries().await[0].scope,
            Scope::Organization(_)
        ));
    }
}

//! Fixtures shared by command tests.

use std::sync::Arc;

use aika_core::memory::MemoryStore;
use aika_core::{EntryController, EntryId, ManualClock, Session, TimeEntry, UserId};
use chrono::{DateTime, TimeZone, Utc};

pub(crate) fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
}

pub(crate) fn user() -> UserId {
    UserId::new("user-1").unwrap()
}

pub(crate) fn personal() -> Session {
    Session::personal(user())
}

pub(crate) fn entry(
    session: &Session,
    id: &str,
    description: &str,
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
) -> TimeEntry {
    TimeEntry {
        id: EntryId::new(id).unwrap(),
        scope: session.scope(),
        description: description.to_string(),
        start_time: start,
        end_time: end,
        created_at: start,
        created_by: user(),
    }
}

/// A reconciled controller over an in-memory store holding `entries`.
pub(crate) async fn controller(
    session: Session,
    entries: Vec<TimeEntry>,
    clock: &ManualClock,
) -> EntryController<MemoryStore> {
    let mut controller = EntryController::new(
        MemoryStore::with_entries(entries),
        session,
        Arc::new(clock.clone()),
    );
    controller.reconcile().await.unwrap();
    controller
}

pub(crate) fn text(output: Vec<u8>) -> String {
    String::from_utf8(output).unwrap()
}

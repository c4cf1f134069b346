//! Core domain logic for the aika work timer.
//!
//! This crate contains:
//! - Timer: a drift-free elapsed-time engine anchored at an instant
//! - Controller: reconciliation of the timer with persisted time entries
//! - Edit text: the lenient `MM/DD/YYYY h:mm AM` codec used when editing entries
//! - Store: the persistence boundary and an in-memory implementation

pub mod clock;
pub mod controller;
pub mod display;
pub mod edit_text;
pub mod memory;
pub mod store;
pub mod timer;
mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{ControllerError, EntryController, Reconciliation, TimerSnapshot};
pub use store::{EntryStore, StoreError};
pub use timer::{TimerEngine, TimerState};
pub use types::{
    EntryId, EntryPatch, NewEntry, OrganizationId, Scope, Session, TimeEntry, UserId,
    ValidationError,
};

//! Elapsed-time engine for a running timer.
//!
//! The engine never counts ticks. Every tick recomputes the elapsed seconds
//! from the anchor instant and the current wall clock, so a process that was
//! suspended for an hour reports the right value on its first tick after
//! resuming. Observers subscribe to a [`watch`] channel that only changes when
//! the whole-second value does.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::clock::Clock;

/// Default recomputation period. A scheduling hint only.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(500);

/// Whether the engine is measuring, and from when.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Stopped,
    Running { anchor: DateTime<Utc> },
}

/// Whole seconds from `anchor` to `now`, rounded down and clamped at zero.
pub fn elapsed_seconds(anchor: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let millis = (now - anchor).num_milliseconds();
    u64::try_from(millis.div_euclid(1000)).unwrap_or(0)
}

/// Aborts the tick task when dropped. Aborting twice is harmless.
struct Ticker(JoinHandle<()>);

impl Drop for Ticker {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Owns the timer state and the recurring tick task.
pub struct TimerEngine {
    clock: Arc<dyn Clock>,
    tick_interval: Duration,
    state: TimerState,
    elapsed: Arc<watch::Sender<u64>>,
    /// Bumped on every start/stop; a tick only publishes for its own generation.
    generation: Arc<AtomicU64>,
    ticker: Option<Ticker>,
}

impl TimerEngine {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let (elapsed, _) = watch::channel(0);
        Self {
            clock,
            tick_interval: DEFAULT_TICK_INTERVAL,
            state: TimerState::Stopped,
            elapsed: Arc::new(elapsed),
            generation: Arc::new(AtomicU64::new(0)),
            ticker: None,
        }
    }

    /// Overrides the recomputation period. Zero falls back to the default.
    #[must_use]
    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        if !tick_interval.is_zero() {
            self.tick_interval = tick_interval;
        }
        self
    }

    pub const fn state(&self) -> TimerState {
        self.state
    }

    pub const fn anchor(&self) -> Option<DateTime<Utc>> {
        match self.state {
            TimerState::Running { anchor } => Some(anchor),
            TimerState::Stopped => None,
        }
    }

    pub const fn is_running(&self) -> bool {
        matches!(self.state, TimerState::Running { .. })
    }

    /// The last published elapsed value.
    pub fn elapsed(&self) -> u64 {
        *self.elapsed.borrow()
    }

    /// Elapsed seconds at `now`, computed directly rather than read from the
    /// last tick. Zero when stopped.
    pub fn elapsed_at(&self, now: DateTime<Utc>) -> u64 {
        self.anchor()
            .map_or(0, |anchor| elapsed_seconds(anchor, now))
    }

    /// A receiver notified whenever the published elapsed value changes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.elapsed.subscribe()
    }

    /// Starts measuring from `anchor`, replacing any previous anchor.
    ///
    /// Publishes the current elapsed value before returning. Must be called
    /// from within a tokio runtime.
    pub fn start(&mut self, anchor: DateTime<Utc>) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.ticker = None;
        self.state = TimerState::Running { anchor };

        publish(
            &self.elapsed,
            &self.generation,
            generation,
            elapsed_seconds(anchor, self.clock.now()),
        );

        let clock = Arc::clone(&self.clock);
        let elapsed = Arc::clone(&self.elapsed);
        let current = Arc::clone(&self.generation);
        let period = self.tick_interval;
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately and was published above.
            interval.tick().await;
            loop {
                interval.tick().await;
                let value = elapsed_seconds(anchor, clock.now());
                if !publish(&elapsed, &current, generation, value) {
                    break;
                }
            }
        });
        self.ticker = Some(Ticker(handle));
        tracing::debug!(%anchor, generation, "timer started");
    }

    /// Cancels the tick, resets the published value to zero and clears the anchor.
    pub fn stop(&mut self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.ticker = None;
        let was_running = self.is_running();
        self.state = TimerState::Stopped;
        self.elapsed.send_if_modified(|published| {
            let changed = *published != 0;
            *published = 0;
            changed
        });
        if was_running {
            tracing::debug!(generation, "timer stopped");
        }
    }
}

impl Drop for TimerEngine {
    fn drop(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

/// Publishes `value` if `generation` is still current and the value changed.
///
/// The generation is checked under the channel lock, so a tick racing a
/// `stop` either lands before the reset or not at all. Returns whether the
/// generation is still current.
fn publish(
    elapsed: &watch::Sender<u64>,
    current: &AtomicU64,
    generation: u64,
    value: u64,
) -> bool {
    let mut is_current = true;
    elapsed.send_if_modified(|published| {
        if current.load(Ordering::SeqCst) != generation {
            is_current = false;
            return false;
        }
        if *published == value {
            return false;
        }
        *published = value;
        true
    });
    is_current
}

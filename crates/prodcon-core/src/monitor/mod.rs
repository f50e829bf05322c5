//! Synchronization monitors guarding a `BoundedBuffer`
//!
//! Two interchangeable disciplines implement [`Monitor`]:
//!
//! - [`SemaphoreMonitor`]: `empty_slots`/`filled_slots` counting semaphores
//!   plus an exclusion lock. The slot semaphore is always taken before the
//!   lock, so nobody sleeps on a semaphore while holding the lock.
//! - [`CondvarMonitor`]: one lock and two condition variables, with the
//!   wait predicate re-checked in a loop after every wake-up.
//!
//! In both, the exclusion lock is acquired with a blocking `lock()`; there
//! is no try-lock path that could touch the buffer unlocked. The only
//! places a caller sleeps are the semaphore acquire and the condition wait.
//!
//! Activity events are emitted after the lock is dropped.
//!
//! [`Monitor::close`] ends a run early: sleepers wake, producers get
//! [`PcError::Closed`](crate::PcError::Closed), and consumers drain what is
//! still buffered before they get it too.

mod condvar;
mod semaphore;

pub use condvar::CondvarMonitor;
pub use semaphore::SemaphoreMonitor;

use core::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{ContractViolation, ProduceError, PcResult, TryConsumeError, TryProduceError};
use crate::recorder::{ActivityRecorder, Event, EventKind};
use crate::state;

/// Item handed to a consumer, with the slot it was read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consumed<T> {
    pub slot: usize,
    pub item: T,
}

/// Blocking producer/consumer access to a shared bounded buffer
pub trait Monitor<T: Send>: Send + Sync {
    /// Enqueue `item`, sleeping while the buffer is full.
    /// Returns the slot the item was written to.
    fn produce(&self, item: T) -> Result<usize, ProduceError<T>>;

    /// Dequeue the oldest item, sleeping while the buffer is empty
    fn consume(&self) -> PcResult<Consumed<T>>;

    /// Enqueue without sleeping for room; `Full` hands the item back
    fn try_produce(&self, item: T) -> Result<usize, TryProduceError<T>>;

    /// Dequeue without sleeping for an item
    fn try_consume(&self) -> Result<Consumed<T>, TryConsumeError>;

    /// Wake every sleeper and refuse further produces. Idempotent.
    fn close(&self);

    fn is_closed(&self) -> bool;

    /// Filled slots right now (takes the lock)
    fn occupied(&self) -> PcResult<usize>;

    fn capacity(&self) -> usize;

    fn stats(&self) -> &MonitorStats;

    fn strategy(&self) -> Strategy;
}

/// Which synchronization discipline a monitor uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Two counting semaphores plus an exclusion lock
    Semaphore,
    /// One lock plus `not_full`/`not_empty` condition variables
    Condvar,
}

impl Strategy {
    pub const ALL: [Strategy; 2] = [Strategy::Semaphore, Strategy::Condvar];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Strategy::Semaphore => "semaphore",
            Strategy::Condvar => "condvar",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = crate::error::ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "semaphore" | "sem" | "a" => Ok(Strategy::Semaphore),
            "condvar" | "cond" | "monitor" | "b" => Ok(Strategy::Condvar),
            other => Err(crate::error::ConfigError::UnknownStrategy(other.to_string())),
        }
    }
}

/// Build a monitor of the given strategy over a fresh buffer
pub fn new_monitor<T: Send + 'static>(
    strategy: Strategy,
    capacity: usize,
    recorder: Arc<dyn ActivityRecorder>,
) -> PcResult<Arc<dyn Monitor<T>>> {
    Ok(match strategy {
        Strategy::Semaphore => Arc::new(SemaphoreMonitor::new(capacity, recorder)?),
        Strategy::Condvar => Arc::new(CondvarMonitor::new(capacity, recorder)?),
    })
}

/// Operation counters, updated outside the critical section
#[derive(Debug, Default)]
pub struct MonitorStats {
    produced: AtomicU64,
    consumed: AtomicU64,
    anomalies: AtomicU64,
    /// Times a producer found no free slot and had to sleep
    producer_waits: AtomicU64,
    /// Times a consumer found no item and had to sleep
    consumer_waits: AtomicU64,
}

impl MonitorStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            produced: self.produced.load(Ordering::Acquire),
            consumed: self.consumed.load(Ordering::Acquire),
            anomalies: self.anomalies.load(Ordering::Acquire),
            producer_waits: self.producer_waits.load(Ordering::Relaxed),
            consumer_waits: self.consumer_waits.load(Ordering::Relaxed),
        }
    }

    #[inline]
    pub(crate) fn producer_waited(&self) {
        self.producer_waits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn consumer_waited(&self) {
        self.consumer_waits.fetch_add(1, Ordering::Relaxed);
    }
}

/// Point-in-time copy of [`MonitorStats`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub produced: u64,
    pub consumed: u64,
    pub anomalies: u64,
    pub producer_waits: u64,
    pub consumer_waits: u64,
}

/// Bookkeeping shared by both monitors once the lock is released
pub(crate) struct Reporter {
    recorder: Arc<dyn ActivityRecorder>,
    stats: MonitorStats,
}

impl Reporter {
    pub(crate) fn new(recorder: Arc<dyn ActivityRecorder>) -> Self {
        Self { recorder, stats: MonitorStats::default() }
    }

    #[inline]
    pub(crate) fn stats(&self) -> &MonitorStats {
        &self.stats
    }

    pub(crate) fn produced(&self, slot: usize) {
        self.stats.produced.fetch_add(1, Ordering::AcqRel);
        self.recorder.record(Event::new(EventKind::Produced, slot, state::current_id()));
        crate::pc_trace!("produced in slot {}", slot);
    }

    pub(crate) fn consumed(&self, slot: usize) {
        self.stats.consumed.fetch_add(1, Ordering::AcqRel);
        self.recorder.record(Event::new(EventKind::Consumed, slot, state::current_id()));
        crate::pc_trace!("consumed from slot {}", slot);
    }

    /// Report a contract violation: error log, anomaly event, counter
    pub(crate) fn anomaly(&self, violation: &ContractViolation) {
        self.stats.anomalies.fetch_add(1, Ordering::AcqRel);
        crate::pc_error!("buffer contract violated: {}", violation);
        self.recorder
            .record(Event::new(EventKind::Anomaly, violation.slot, state::current_id()));
    }
}

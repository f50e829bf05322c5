//! Per-worker phase tracking
//!
//! Every pool worker moves through
//! `Idle -> AcquiringAccess -> (Blocked)* -> Mutating -> Signaling -> Idle`
//! once per buffer operation and ends in `Terminated`. The phase lives in an
//! atomic so a supervisor can snapshot stuck workers without taking the
//! buffer lock.

use core::fmt;
use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use crate::id::WorkerId;

/// Phase of one worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerPhase {
    /// Between operations
    Idle = 0,

    /// Waiting for a slot/item permit or the exclusion lock
    AcquiringAccess = 1,

    /// Suspended until the buffer has room (producer) or an item (consumer)
    Blocked = 2,

    /// Inside the critical section, touching the buffer
    Mutating = 3,

    /// Waking the other side
    Signaling = 4,

    /// Finished all iterations
    Terminated = 5,
}

impl WorkerPhase {
    /// True while the worker is parked waiting for the other side
    #[inline]
    pub const fn is_waiting(&self) -> bool {
        matches!(self, WorkerPhase::AcquiringAccess | WorkerPhase::Blocked)
    }

    #[inline]
    pub const fn is_terminated(&self) -> bool {
        matches!(self, WorkerPhase::Terminated)
    }
}

impl From<u8> for WorkerPhase {
    fn from(v: u8) -> Self {
        match v {
            0 => WorkerPhase::Idle,
            1 => WorkerPhase::AcquiringAccess,
            2 => WorkerPhase::Blocked,
            3 => WorkerPhase::Mutating,
            4 => WorkerPhase::Signaling,
            5 => WorkerPhase::Terminated,
            _ => WorkerPhase::Idle,
        }
    }
}

impl fmt::Display for WorkerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkerPhase::Idle => "IDLE",
            WorkerPhase::AcquiringAccess => "ACQUIRING",
            WorkerPhase::Blocked => "BLOCKED",
            WorkerPhase::Mutating => "MUTATING",
            WorkerPhase::Signaling => "SIGNALING",
            WorkerPhase::Terminated => "TERMINATED",
        };
        f.write_str(s)
    }
}

/// Shared, lock-free view of one worker
#[derive(Debug)]
pub struct WorkerStatus {
    id: WorkerId,
    phase: AtomicU8,
    /// Buffer operations completed so far
    completed: AtomicU64,
}

impl WorkerStatus {
    pub fn new(id: WorkerId) -> Self {
        Self {
            id,
            phase: AtomicU8::new(WorkerPhase::Idle as u8),
            completed: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn id(&self) -> WorkerId {
        self.id
    }

    #[inline]
    pub fn phase(&self) -> WorkerPhase {
        WorkerPhase::from(self.phase.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set_phase(&self, phase: WorkerPhase) {
        self.phase.store(phase as u8, Ordering::Release);
    }

    #[inline]
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn bump_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }
}

thread_local! {
    /// Status of the pool worker running on this OS thread, if any
    static CURRENT: RefCell<Option<Arc<WorkerStatus>>> = const { RefCell::new(None) };
}

/// Bind `status` to the calling thread
pub fn set_current(status: Arc<WorkerStatus>) {
    CURRENT.with(|cell| *cell.borrow_mut() = Some(status));
}

/// Unbind the calling thread
pub fn clear_current() {
    CURRENT.with(|cell| *cell.borrow_mut() = None);
}

/// Id of the worker on this thread, `None` outside a pool
pub fn current_id() -> Option<WorkerId> {
    CURRENT.with(|cell| cell.borrow().as_ref().map(|s| s.id()))
}

/// Move the calling worker to `phase`; no-op outside a pool
#[inline]
pub fn enter(phase: WorkerPhase) {
    CURRENT.with(|cell| {
        if let Some(status) = cell.borrow().as_ref() {
            status.set_phase(phase);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_predicates() {
        assert!(WorkerPhase::Blocked.is_waiting());
        assert!(WorkerPhase::AcquiringAccess.is_waiting());
        assert!(!WorkerPhase::Mutating.is_waiting());
        assert!(WorkerPhase::Terminated.is_terminated());
        assert!(!WorkerPhase::Idle.is_terminated());
    }

    #[test]
    fn test_phase_round_trip_u8() {
        assert_eq!(WorkerPhase::from(WorkerPhase::Signaling as u8), WorkerPhase::Signaling);
        assert_eq!(WorkerPhase::from(200), WorkerPhase::Idle);
    }

    #[test]
    fn test_current_binding() {
        let status = Arc::new(WorkerStatus::new(WorkerId::producer(1)));
        assert_eq!(current_id(), None);
        enter(WorkerPhase::Mutating); // unbound, ignored

        set_current(Arc::clone(&status));
        assert_eq!(current_id(), Some(WorkerId::producer(1)));
        enter(WorkerPhase::Blocked);
        assert_eq!(status.phase(), WorkerPhase::Blocked);

        clear_current();
        enter(WorkerPhase::Idle);
        assert_eq!(status.phase(), WorkerPhase::Blocked);
    }
}

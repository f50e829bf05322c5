//! Counting semaphores plus an exclusion lock
//!
//! Acquisition order is fixed: slot semaphore first, exclusion lock second.
//! Taking the lock first and then sleeping on a semaphore would park a
//! thread inside the critical section and deadlock the other side.
//!
//! `close` adds one spare permit to each semaphore. After close, every
//! caller passes its permit on before returning, so the counts never drop
//! back to zero and every sleeper wakes in turn.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{Consumed, Monitor, MonitorStats, Reporter, Strategy};
use crate::buffer::BoundedBuffer;
use crate::error::{
    ConfigError, PcError, PcResult, ProduceError, TryConsumeError, TryProduceError,
};
use crate::recorder::ActivityRecorder;
use crate::semaphore::{new_semaphore, CountingSemaphore, PlatformSemaphore};
use crate::state::{self, WorkerPhase};

/// `empty_slots` / `filled_slots` semaphores guarding a locked buffer
pub struct SemaphoreMonitor<T> {
    buffer: Mutex<BoundedBuffer<T>>,
    /// Free slots; starts at `capacity`
    empty_slots: PlatformSemaphore,
    /// Filled slots; starts at 0
    filled_slots: PlatformSemaphore,
    closed: AtomicBool,
    capacity: usize,
    reporter: Reporter,
}

impl<T: Send> SemaphoreMonitor<T> {
    pub fn new(capacity: usize, recorder: Arc<dyn ActivityRecorder>) -> PcResult<Self> {
        if capacity == 0 {
            return Err(ConfigError::InvalidValue("capacity must be > 0").into());
        }
        Ok(Self {
            buffer: Mutex::new(BoundedBuffer::new(capacity)),
            empty_slots: new_semaphore(capacity, capacity)?,
            filled_slots: new_semaphore(0, capacity)?,
            closed: AtomicBool::new(false),
            capacity,
            reporter: Reporter::new(recorder),
        })
    }

    fn lock(&self) -> PcResult<MutexGuard<'_, BoundedBuffer<T>>> {
        self.buffer.lock().map_err(|_| PcError::Poisoned)
    }

    /// Take a free-slot permit, counting the wait if we have to sleep
    fn acquire_empty(&self) {
        state::enter(WorkerPhase::AcquiringAccess);
        if !self.empty_slots.try_acquire() {
            state::enter(WorkerPhase::Blocked);
            self.reporter.stats().producer_waited();
            self.empty_slots.acquire();
        }
    }

    fn acquire_filled(&self) {
        state::enter(WorkerPhase::AcquiringAccess);
        if !self.filled_slots.try_acquire() {
            state::enter(WorkerPhase::Blocked);
            self.reporter.stats().consumer_waited();
            self.filled_slots.acquire();
        }
    }

    /// Give a permit back; overflow means permits and slots disagree,
    /// unless the spare permits from `close` are in play
    fn release(&self, sem: &PlatformSemaphore, name: &str) {
        if !sem.release() && !self.is_closed() {
            crate::pc_error!(
                "{} semaphore released past its maximum of {}",
                name,
                sem.max_permits()
            );
        }
    }

    /// Critical section for a write; caller already holds an empty-slot permit
    fn write_with_permit(&self, item: T) -> Result<usize, ProduceError<T>> {
        if self.is_closed() {
            self.release(&self.empty_slots, "empty_slots");
            state::enter(WorkerPhase::Idle);
            return Err(ProduceError { item, error: PcError::Closed });
        }
        state::enter(WorkerPhase::AcquiringAccess);
        let mut buf = match self.lock() {
            Ok(buf) => buf,
            Err(error) => {
                self.release(&self.empty_slots, "empty_slots");
                return Err(ProduceError { item, error });
            }
        };
        state::enter(WorkerPhase::Mutating);
        let result = buf.write(item);
        drop(buf);

        state::enter(WorkerPhase::Signaling);
        let outcome = match result {
            Ok(slot) => {
                self.release(&self.filled_slots, "filled_slots");
                self.reporter.produced(slot);
                Ok(slot)
            }
            Err(rejected) => {
                // Nothing was written: hand the permit back untouched
                self.release(&self.empty_slots, "empty_slots");
                self.reporter.anomaly(&rejected.violation);
                Err(rejected.into())
            }
        };
        state::enter(WorkerPhase::Idle);
        outcome
    }

    /// Critical section for a read; caller already holds a filled-slot permit
    fn read_with_permit(&self) -> PcResult<Consumed<T>> {
        state::enter(WorkerPhase::AcquiringAccess);
        let mut buf = match self.lock() {
            Ok(buf) => buf,
            Err(error) => {
                self.release(&self.filled_slots, "filled_slots");
                return Err(error);
            }
        };
        if buf.is_empty() && self.is_closed() {
            drop(buf);
            self.release(&self.filled_slots, "filled_slots");
            state::enter(WorkerPhase::Idle);
            return Err(PcError::Closed);
        }
        state::enter(WorkerPhase::Mutating);
        let result = buf.read();
        drop(buf);

        state::enter(WorkerPhase::Signaling);
        let outcome = match result {
            Ok((slot, item)) => {
                self.release(&self.empty_slots, "empty_slots");
                if self.is_closed() {
                    self.release(&self.filled_slots, "filled_slots");
                }
                self.reporter.consumed(slot);
                Ok(Consumed { slot, item })
            }
            Err(violation) => {
                self.release(&self.filled_slots, "filled_slots");
                self.reporter.anomaly(&violation);
                Err(violation.into())
            }
        };
        state::enter(WorkerPhase::Idle);
        outcome
    }
}

impl<T: Send> Monitor<T> for SemaphoreMonitor<T> {
    fn produce(&self, item: T) -> Result<usize, ProduceError<T>> {
        self.acquire_empty();
        self.write_with_permit(item)
    }

    fn consume(&self) -> PcResult<Consumed<T>> {
        self.acquire_filled();
        self.read_with_permit()
    }

    fn try_produce(&self, item: T) -> Result<usize, TryProduceError<T>> {
        if self.is_closed() {
            return Err(TryProduceError::Failed(ProduceError { item, error: PcError::Closed }));
        }
        if !self.empty_slots.try_acquire() {
            return Err(TryProduceError::Full(item));
        }
        self.write_with_permit(item).map_err(TryProduceError::Failed)
    }

    fn try_consume(&self) -> Result<Consumed<T>, TryConsumeError> {
        if !self.filled_slots.try_acquire() {
            return Err(TryConsumeError::Empty);
        }
        self.read_with_permit().map_err(TryConsumeError::Failed)
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        crate::pc_debug!("semaphore monitor closed");
        // A release refused at the maximum means nobody sleeps on that side
        self.empty_slots.release();
        self.filled_slots.release();
    }

    #[inline]
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn occupied(&self) -> PcResult<usize> {
        Ok(self.lock()?.occupied())
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn stats(&self) -> &MonitorStats {
        self.reporter.stats()
    }

    fn strategy(&self) -> Strategy {
        Strategy::Semaphore
    }
}

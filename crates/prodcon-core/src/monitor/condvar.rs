//! Single lock with `not_full` / `not_empty` condition variables
//!
//! Producers wait on `not_full` and signal `not_empty`; consumers do the
//! reverse. A woken thread may find the slot/item already taken by a thread
//! that got the lock first, so every wait sits in a `while` loop over the
//! explicit occupancy count. The loop also exits once the monitor is
//! closed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use super::{Consumed, Monitor, MonitorStats, Reporter, Strategy};
use crate::buffer::BoundedBuffer;
use crate::error::{
    ConfigError, PcError, PcResult, ProduceError, TryConsumeError, TryProduceError,
};
use crate::recorder::ActivityRecorder;
use crate::state::{self, WorkerPhase};

/// Lock + two condition variables
pub struct CondvarMonitor<T> {
    buffer: Mutex<BoundedBuffer<T>>,
    /// Signalled by consumers after freeing a slot
    not_full: Condvar,
    /// Signalled by producers after filling a slot
    not_empty: Condvar,
    /// Set under the lock so a sleeper cannot miss it
    closed: AtomicBool,
    capacity: usize,
    reporter: Reporter,
}

impl<T: Send> CondvarMonitor<T> {
    pub fn new(capacity: usize, recorder: Arc<dyn ActivityRecorder>) -> PcResult<Self> {
        if capacity == 0 {
            return Err(ConfigError::InvalidValue("capacity must be > 0").into());
        }
        Ok(Self {
            buffer: Mutex::new(BoundedBuffer::new(capacity)),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            closed: AtomicBool::new(false),
            capacity,
            reporter: Reporter::new(recorder),
        })
    }

    fn lock(&self) -> PcResult<MutexGuard<'_, BoundedBuffer<T>>> {
        state::enter(WorkerPhase::AcquiringAccess);
        self.buffer.lock().map_err(|_| PcError::Poisoned)
    }

    /// Leave the critical section with `PcError::Closed`
    fn closed_error(&self, buf: MutexGuard<'_, BoundedBuffer<T>>) -> PcError {
        drop(buf);
        state::enter(WorkerPhase::Idle);
        PcError::Closed
    }

    /// Write under the held lock, then signal and report after unlocking
    fn write_locked(
        &self,
        mut buf: MutexGuard<'_, BoundedBuffer<T>>,
        item: T,
    ) -> Result<usize, ProduceError<T>> {
        state::enter(WorkerPhase::Mutating);
        let result = buf.write(item);
        state::enter(WorkerPhase::Signaling);
        if result.is_ok() {
            self.not_empty.notify_one();
        }
        drop(buf);

        let outcome = match result {
            Ok(slot) => {
                self.reporter.produced(slot);
                Ok(slot)
            }
            Err(rejected) => {
                self.reporter.anomaly(&rejected.violation);
                Err(rejected.into())
            }
        };
        state::enter(WorkerPhase::Idle);
        outcome
    }

    fn read_locked(&self, mut buf: MutexGuard<'_, BoundedBuffer<T>>) -> PcResult<Consumed<T>> {
        state::enter(WorkerPhase::Mutating);
        let result = buf.read();
        state::enter(WorkerPhase::Signaling);
        if result.is_ok() {
            self.not_full.notify_one();
        }
        drop(buf);

        let outcome = match result {
            Ok((slot, item)) => {
                self.reporter.consumed(slot);
                Ok(Consumed { slot, item })
            }
            Err(violation) => {
                self.reporter.anomaly(&violation);
                Err(violation.into())
            }
        };
        state::enter(WorkerPhase::Idle);
        outcome
    }
}

impl<T: Send> Monitor<T> for CondvarMonitor<T> {
    fn produce(&self, item: T) -> Result<usize, ProduceError<T>> {
        let mut buf = match self.lock() {
            Ok(buf) => buf,
            Err(error) => return Err(ProduceError { item, error }),
        };
        while buf.is_full() && !self.is_closed() {
            state::enter(WorkerPhase::Blocked);
            self.reporter.stats().producer_waited();
            buf = match self.not_full.wait(buf) {
                Ok(buf) => buf,
                Err(_) => return Err(ProduceError { item, error: PcError::Poisoned }),
            };
        }
        if self.is_closed() {
            return Err(ProduceError { item, error: self.closed_error(buf) });
        }
        self.write_locked(buf, item)
    }

    fn consume(&self) -> PcResult<Consumed<T>> {
        let mut buf = self.lock()?;
        while buf.is_empty() && !self.is_closed() {
            state::enter(WorkerPhase::Blocked);
            self.reporter.stats().consumer_waited();
            buf = self.not_empty.wait(buf).map_err(|_| PcError::Poisoned)?;
        }
        // Closed but not yet drained: keep handing out items
        if buf.is_empty() {
            return Err(self.closed_error(buf));
        }
        self.read_locked(buf)
    }

    fn try_produce(&self, item: T) -> Result<usize, TryProduceError<T>> {
        let buf = match self.lock() {
            Ok(buf) => buf,
            Err(error) => return Err(TryProduceError::Failed(ProduceError { item, error })),
        };
        if self.is_closed() {
            let error = self.closed_error(buf);
            return Err(TryProduceError::Failed(ProduceError { item, error }));
        }
        if buf.is_full() {
            drop(buf);
            state::enter(WorkerPhase::Idle);
            return Err(TryProduceError::Full(item));
        }
        self.write_locked(buf, item).map_err(TryProduceError::Failed)
    }

    fn try_consume(&self) -> Result<Consumed<T>, TryConsumeError> {
        let buf = self.lock().map_err(TryConsumeError::Failed)?;
        if buf.is_empty() && self.is_closed() {
            return Err(TryConsumeError::Failed(self.closed_error(buf)));
        }
        if buf.is_empty() {
            drop(buf);
            state::enter(WorkerPhase::Idle);
            return Err(TryConsumeError::Empty);
        }
        self.read_locked(buf).map_err(TryConsumeError::Failed)
    }

    fn close(&self) {
        let buf = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        drop(buf);
        crate::pc_debug!("condvar monitor closed");
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }

    #[inline]
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn occupied(&self) -> PcResult<usize> {
        let buf = self.buffer.lock().map_err(|_| PcError::Poisoned)?;
        Ok(buf.occupied())
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn stats(&self) -> &MonitorStats {
        self.reporter.stats()
    }

    fn strategy(&self) -> Strategy {
        Strategy::Condvar
    }
}

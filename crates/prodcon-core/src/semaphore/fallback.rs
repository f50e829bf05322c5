//! Counting semaphore on std::sync::Condvar
//!
//! Used on platforms without futex support, and available everywhere for
//! comparison. Less efficient but portable.

use super::CountingSemaphore;
use std::sync::{Condvar, Mutex, PoisonError};

/// Mutex + condvar counting semaphore
pub struct CondvarSemaphore {
    /// Permit count
    count: Mutex<usize>,

    /// Signalled on every release
    available: Condvar,

    max: usize,
}

impl CondvarSemaphore {
    pub fn new(initial: usize, max: usize) -> Self {
        Self {
            count: Mutex::new(initial.min(max)),
            available: Condvar::new(),
            max,
        }
    }
}

// The guarded value is a plain counter that is never left half-updated, so a
// poisoned lock still holds a valid count.
impl CountingSemaphore for CondvarSemaphore {
    fn acquire(&self) {
        let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        while *count == 0 {
            count = self
                .available
                .wait(count)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *count -= 1;
    }

    fn try_acquire(&self) -> bool {
        let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        if *count == 0 {
            return false;
        }
        *count -= 1;
        true
    }

    fn release(&self) -> bool {
        {
            let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
            if *count >= self.max {
                return false;
            }
            *count += 1;
        }
        self.available.notify_one();
        true
    }

    fn available(&self) -> usize {
        *self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn max_permits(&self) -> usize {
        self.max
    }
}

impl Default for CondvarSemaphore {
    fn default() -> Self {
        Self::new(0, 1)
    }
}

//! Linux futex-based counting semaphore
//!
//! The futex word is the permit count itself:
//! - `acquire` CASes the count down when it is positive, otherwise
//!   FUTEX_WAITs while the word still reads 0
//! - `release` increments the count and FUTEX_WAKEs one sleeper if any
//!
//! A sleeper is only woken into a re-check loop; it takes a permit with a
//! CAS like everyone else, so a wake never hands a permit over implicitly.

use super::CountingSemaphore;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

/// Futex-backed counting semaphore
pub struct FutexSemaphore {
    /// Permit count, doubles as the futex word
    count: AtomicU32,

    /// Threads currently inside FUTEX_WAIT (skips the wake syscall when 0)
    sleepers: AtomicUsize,

    max: u32,
}

impl FutexSemaphore {
    pub fn new(initial: usize, max: usize) -> Self {
        let max = max.min(u32::MAX as usize) as u32;
        Self {
            count: AtomicU32::new((initial as u32).min(max)),
            sleepers: AtomicUsize::new(0),
            max,
        }
    }

    fn futex_wait(&self) {
        // Sleeps only if the count is still 0; EAGAIN/EINTR just re-loop.
        unsafe {
            libc::syscall(
                libc::SYS_futex,
                self.count.as_ptr(),
                libc::FUTEX_WAIT | libc::FUTEX_PRIVATE_FLAG,
                0u32,
                std::ptr::null::<libc::timespec>(),
                std::ptr::null::<u32>(),
                0u32,
            );
        }
    }

    fn futex_wake_one(&self) {
        unsafe {
            libc::syscall(
                libc::SYS_futex,
                self.count.as_ptr(),
                libc::FUTEX_WAKE | libc::FUTEX_PRIVATE_FLAG,
                1i32,
                std::ptr::null::<libc::timespec>(),
                std::ptr::null::<u32>(),
                0u32,
            );
        }
    }
}

impl CountingSemaphore for FutexSemaphore {
    fn acquire(&self) {
        loop {
            if self.try_acquire() {
                return;
            }
            self.sleepers.fetch_add(1, Ordering::SeqCst);
            if self.count.load(Ordering::SeqCst) == 0 {
                self.futex_wait();
            }
            self.sleepers.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn try_acquire(&self) -> bool {
        let mut current = self.count.load(Ordering::Acquire);
        while current > 0 {
            match self.count.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
        false
    }

    fn release(&self) -> bool {
        let mut current = self.count.load(Ordering::Acquire);
        loop {
            if current >= self.max {
                return false;
            }
            match self.count.compare_exchange_weak(
                current,
                current + 1,
                Ordering::SeqCst,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }

        if self.sleepers.load(Ordering::SeqCst) > 0 {
            self.futex_wake_one();
        }
        true
    }

    fn available(&self) -> usize {
        self.count.load(Ordering::Relaxed) as usize
    }

    fn max_permits(&self) -> usize {
        self.max as usize
    }
}

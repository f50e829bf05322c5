//! Counting semaphore
//!
//! A non-negative permit count with an upper bound. `acquire` blocks while
//! the count is zero; `release` never blocks. Platform implementations use
//! the cheapest sleeping primitive available.

use crate::error::{PcError, PcResult};

/// Counting semaphore interface
pub trait CountingSemaphore: Send + Sync {
    /// Take one permit, sleeping while none are available
    fn acquire(&self);

    /// Take one permit if available, without sleeping
    fn try_acquire(&self) -> bool;

    /// Return one permit and wake one sleeper
    ///
    /// Returns `false` (and does not add the permit) if the count is
    /// already at its maximum, which means permits were released twice.
    fn release(&self) -> bool;

    /// Current permit count (hint, may be stale)
    fn available(&self) -> usize;

    /// Upper bound on the permit count
    fn max_permits(&self) -> usize;
}

cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        mod futex_linux;
        pub use futex_linux::FutexSemaphore as PlatformSemaphore;
    } else {
        mod fallback;
        pub use fallback::CondvarSemaphore as PlatformSemaphore;
    }
}

#[cfg(target_os = "linux")]
mod fallback;
pub use fallback::CondvarSemaphore;

/// Create a platform semaphore with `initial` permits out of `max`
pub fn new_semaphore(initial: usize, max: usize) -> PcResult<PlatformSemaphore> {
    if max == 0 || initial > max {
        return Err(PcError::Config(crate::error::ConfigError::InvalidValue(
            "semaphore permits must satisfy 0 <= initial <= max, max > 0",
        )));
    }
    Ok(PlatformSemaphore::new(initial, max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn exercise_counting<S: CountingSemaphore>(sem: S) {
        assert_eq!(sem.available(), 2);
        assert!(sem.try_acquire());
        sem.acquire();
        assert_eq!(sem.available(), 0);
        assert!(!sem.try_acquire());

        assert!(sem.release());
        assert!(sem.release());
        assert!(!sem.release()); // over max
        assert_eq!(sem.available(), 2);
    }

    fn exercise_blocking<S: CountingSemaphore + 'static>(sem: Arc<S>) {
        let acquired = Arc::new(AtomicBool::new(false));

        let handle = {
            let sem = Arc::clone(&sem);
            let acquired = Arc::clone(&acquired);
            thread::spawn(move || {
                sem.acquire();
                acquired.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!acquired.load(Ordering::SeqCst));

        sem.release();
        handle.join().unwrap();
        assert!(acquired.load(Ordering::SeqCst));
        assert_eq!(sem.available(), 0);
    }

    #[test]
    fn test_platform_counting() {
        exercise_counting(new_semaphore(2, 2).unwrap());
    }

    #[test]
    fn test_condvar_counting() {
        exercise_counting(CondvarSemaphore::new(2, 2));
    }

    #[test]
    fn test_platform_blocks_at_zero() {
        exercise_blocking(Arc::new(new_semaphore(0, 1).unwrap()));
    }

    #[test]
    fn test_condvar_blocks_at_zero() {
        exercise_blocking(Arc::new(CondvarSemaphore::new(0, 1)));
    }

    #[test]
    fn test_invalid_permits() {
        assert!(new_semaphore(3, 2).is_err());
        assert!(new_semaphore(0, 0).is_err());
    }

    #[test]
    fn test_many_waiters_all_released() {
        let sem = Arc::new(new_semaphore(0, 64).unwrap());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let sem = Arc::clone(&sem);
                thread::spawn(move || sem.acquire())
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        for _ in 0..16 {
            assert!(sem.release());
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(sem.available(), 0);
    }
}

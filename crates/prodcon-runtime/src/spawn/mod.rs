//! Worker thread creation
//!
//! Two spawners implement [`ThreadSpawner`]:
//! - [`StdSpawner`]: `std::thread::Builder`, portable
//! - `NativeSpawner` (Linux): raw `pthread_create` with an explicit stack
//!   size and kernel-visible thread name
//!
//! Both catch worker panics and report them from `join` as
//! [`WorkerError::Panicked`] instead of unwinding into the pool.

mod std_thread;

pub use std_thread::StdSpawner;

use core::fmt;
use std::str::FromStr;

use prodcon_core::{ConfigError, PcResult, WorkerError};

cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        mod pthread_linux;
        pub use pthread_linux::NativeSpawner;
    }
}

/// Body of a worker thread
pub type WorkerFn = Box<dyn FnOnce() + Send + 'static>;

/// Starts named threads and joins them
pub trait ThreadSpawner: Send + Sync {
    type Handle: Send;

    /// Start `body` on a new thread called `name`
    fn spawn(&self, name: &str, stack_size: usize, body: WorkerFn) -> PcResult<Self::Handle>;

    /// Wait for the thread; a panic inside `body` becomes `Panicked(name)`
    fn join(&self, handle: Self::Handle) -> Result<(), WorkerError>;
}

/// Which spawner a pool uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SpawnerKind {
    Std,
    /// pthreads on Linux; same as `Std` elsewhere
    #[default]
    Native,
}

impl SpawnerKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SpawnerKind::Std => "std",
            SpawnerKind::Native => "native",
        }
    }
}

impl fmt::Display for SpawnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpawnerKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "std" | "thread" => Ok(SpawnerKind::Std),
            "native" | "pthread" | "os" => Ok(SpawnerKind::Native),
            other => Err(ConfigError::UnknownSpawner(other.to_string())),
        }
    }
}

/// Kernel thread id of the caller, for log lines
#[cfg(target_os = "linux")]
pub fn os_thread_id() -> u64 {
    nix::unistd::gettid().as_raw() as u64
}

#[cfg(all(unix, not(target_os = "linux")))]
pub fn os_thread_id() -> u64 {
    nix::sys::pthread::pthread_self() as usize as u64
}

#[cfg(not(unix))]
pub fn os_thread_id() -> u64 {
    0
}

/// Best-effort text from a panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_spawner_kind_parse() {
        assert_eq!("std".parse::<SpawnerKind>().unwrap(), SpawnerKind::Std);
        assert_eq!(" Native ".parse::<SpawnerKind>().unwrap(), SpawnerKind::Native);
        assert_eq!("pthread".parse::<SpawnerKind>().unwrap(), SpawnerKind::Native);
        assert!(matches!(
            "green".parse::<SpawnerKind>(),
            Err(ConfigError::UnknownSpawner(_))
        ));
        assert_eq!(SpawnerKind::default(), SpawnerKind::Native);
    }

    fn check_runs_and_joins<S: ThreadSpawner>(spawner: &S) {
        let hits = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let hits = hits.clone();
                spawner
                    .spawn(&format!("t-{}", i), 128 * 1024, Box::new(move || {
                        hits.fetch_add(1, Ordering::SeqCst);
                    }))
                    .unwrap()
            })
            .collect();
        for h in handles {
            spawner.join(h).unwrap();
        }
        assert_eq!(hits.load(Ordering::SeqCst), 4);
    }

    fn check_thread_name<S: ThreadSpawner>(spawner: &S) {
        let seen = Arc::new(std::sync::Mutex::new(None));
        let seen2 = seen.clone();
        let h = spawner
            .spawn("producer-7", 128 * 1024, Box::new(move || {
                *seen2.lock().unwrap() = std::thread::current().name().map(str::to_string);
            }))
            .unwrap();
        spawner.join(h).unwrap();
        assert_eq!(seen.lock().unwrap().as_deref(), Some("producer-7"));
    }

    fn check_panic_reported<S: ThreadSpawner>(spawner: &S) {
        let h = spawner
            .spawn("consumer-1", 128 * 1024, Box::new(|| panic!("boom")))
            .unwrap();
        assert_eq!(spawner.join(h), Err(WorkerError::Panicked("consumer-1".into())));
    }

    #[test]
    fn test_std_spawner() {
        check_runs_and_joins(&StdSpawner);
        check_thread_name(&StdSpawner);
        check_panic_reported(&StdSpawner);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_native_spawner() {
        check_runs_and_joins(&NativeSpawner);
        check_panic_reported(&NativeSpawner);
    }
}

//! # prodcon-runtime
//!
//! Thread-level runtime for the producer/consumer monitors in
//! `prodcon-core`.
//!
//! This crate provides:
//! - Pool configuration (compile-time defaults, `PC_*` environment overrides)
//! - Worker thread spawning (std threads, or raw pthreads on Linux)
//! - The worker pool that drives producers and consumers to completion
//! - The activity log file sink

pub mod config;
pub mod spawn;
pub mod sink;
pub mod pool;

// Re-exports
pub use config::PoolConfig;
pub use pool::{RunReport, WorkerFailure, WorkerPool, WorkerSnapshot};
pub use sink::{open_recorder, FileRecorder};
pub use spawn::{os_thread_id, SpawnerKind, StdSpawner, ThreadSpawner, WorkerFn};

cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        pub use spawn::NativeSpawner;
    }
}

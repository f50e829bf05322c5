//! # prodcon-core
//!
//! Bounded circular buffer and the synchronization monitors that let many
//! producer and consumer threads share it.
//!
//! This crate is platform-agnostic apart from the futex fast path of the
//! counting semaphore. Thread spawning and configuration live in
//! `prodcon-runtime`.
//!
//! ## Modules
//!
//! - `buffer` - fixed-capacity slot ring with explicit occupancy
//! - `monitor` - semaphore and condvar disciplines behind one trait
//! - `semaphore` - counting semaphore (futex on Linux, condvar elsewhere)
//! - `recorder` - activity events and sinks
//! - `state` - per-worker phase tracking
//! - `id` - worker identifier
//! - `error` - error types
//! - `log` - leveled stderr macros
//! - `env` - environment variable helpers

pub mod log;
pub mod env;
pub mod error;
pub mod id;
pub mod state;
pub mod buffer;
pub mod semaphore;
pub mod recorder;
pub mod monitor;

pub use buffer::{BoundedBuffer, Slot};
pub use error::{
    ConfigError, ContractViolation, PcError, PcResult, ProduceError, Rejected, SlotOp,
    TryConsumeError, TryProduceError, WorkerError,
};
pub use id::{Role, WorkerId};
pub use monitor::{
    new_monitor, Consumed, CondvarMonitor, Monitor, MonitorStats, SemaphoreMonitor,
    StatsSnapshot, Strategy,
};
pub use recorder::{
    ActivityRecorder, Event, EventCounts, EventKind, LogRecorder, MemoryRecorder, NullRecorder,
};
pub use semaphore::{new_semaphore, CountingSemaphore, PlatformSemaphore};
pub use state::{WorkerPhase, WorkerStatus};
pub use env::{env_get, env_get_bool, env_get_first, env_get_opt, env_get_str};

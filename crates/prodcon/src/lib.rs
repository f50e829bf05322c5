//! # prodcon - bounded-buffer producers and consumers
//!
//! Many producer threads and many consumer threads share one fixed-capacity
//! circular buffer. Access goes through a monitor that makes producers
//! sleep while the buffer is full and consumers sleep while it is empty,
//! so no slot is ever overwritten or read twice.
//!
//! ## Features
//!
//! - **Two disciplines**: counting semaphores plus a lock, or one lock with
//!   two condition variables, selected at runtime by [`Strategy`]
//! - **Contract checks**: a write to a filled slot or a read from an empty
//!   one is refused, logged, and recorded as an anomaly
//! - **Activity recording**: every produce/consume is reported to an
//!   [`ActivityRecorder`] after the lock is released
//! - **Worker pool**: interleaved producer/consumer threads with per-worker
//!   phase tracking
//!
//! ## Quick Start
//!
//! ```ignore
//! use prodcon::{PoolConfig, Strategy, WorkerPool};
//!
//! let config = PoolConfig::from_env()
//!     .capacity(4)
//!     .num_producers(2)
//!     .num_consumers(2)
//!     .items_per_worker(2)
//!     .strategy(Strategy::Semaphore);
//!
//! let pool: WorkerPool<u64> = WorkerPool::new(config)?;
//! let report = pool.run(|_, n| n as u64, |_, item| println!("got {}", item))?;
//! assert_eq!(report.produced, 4);
//! ```
//!
//! Monitors can also be used directly:
//!
//! ```ignore
//! let monitor = prodcon::new_monitor::<String>(Strategy::Condvar, 8, Arc::new(NullRecorder))?;
//! monitor.produce("A".to_string())?;
//! let got = monitor.consume()?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//!   producer-0  consumer-0  producer-1  consumer-1 ...   (WorkerPool)
//!        │           │           │           │
//!        └───────────┴─────┬─────┴───────────┘
//!                          ▼
//!              ┌───────────────────────┐
//!              │  Monitor (Semaphore   │──► ActivityRecorder
//!              │         or Condvar)   │     (file / memory / log / null)
//!              └───────────┬───────────┘
//!                          ▼
//!              ┌───────────────────────┐
//!              │     BoundedBuffer     │
//!              │ slots, read/write idx │
//!              │  explicit occupancy   │
//!              └───────────────────────┘
//! ```

// Re-export core types
pub use prodcon_core::{
    new_monitor, ActivityRecorder, BoundedBuffer, CondvarMonitor, ConfigError, Consumed,
    ContractViolation, Event, EventCounts, EventKind, LogRecorder, MemoryRecorder, Monitor,
    MonitorStats, NullRecorder, PcError, PcResult, ProduceError, Rejected, Role,
    SemaphoreMonitor, Slot, SlotOp, StatsSnapshot, Strategy, TryConsumeError, TryProduceError,
    WorkerError, WorkerId, WorkerPhase, WorkerStatus,
};

// Re-export logging macros
pub use prodcon_core::{pc_debug, pc_error, pc_info, pc_println, pc_trace, pc_warn};
pub use prodcon_core::log::{
    init as init_logging, set_flush_enabled, set_log_level, set_time_enabled, LogLevel,
};

// Re-export env utilities
pub use prodcon_core::{env_get, env_get_bool, env_get_opt, env_get_str};

// Re-export runtime types
pub use prodcon_runtime::{
    open_recorder, FileRecorder, PoolConfig, RunReport, SpawnerKind, WorkerFailure, WorkerPool,
    WorkerSnapshot,
};

/// Item a default run moves through the buffer: producer index in the high
/// half, per-producer sequence number in the low half
pub fn tag_item(worker: WorkerId, n: usize) -> u64 {
    (u64::from(worker.index()) << 32) | (n as u64 & 0xffff_ffff)
}

/// Validate `config`, run it to completion with [`tag_item`] items, and
/// report. Consumed items are traced and dropped.
pub fn run(config: PoolConfig) -> PcResult<RunReport> {
    let pool: WorkerPool<u64> = WorkerPool::new(config)?;
    pool.run(tag_item, |worker, item| {
        pc_trace!("{} took item {:#x}", worker, item);
    })
}

//! Error types for the bounded buffer and its monitors

use core::fmt;

/// Result type for buffer and pool operations
pub type PcResult<T> = Result<T, PcError>;

/// Errors that can occur while producing, consuming or running a pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PcError {
    /// A slot operation ran without its precondition holding.
    /// This is a synchronization bug, never an expected condition.
    ContractViolation(ContractViolation),

    /// A thread panicked while holding the exclusion lock
    Poisoned,

    /// The monitor was closed; no more items will be produced
    Closed,

    /// Invalid configuration
    Config(ConfigError),

    /// Worker thread error
    Worker(WorkerError),

    /// The activity sink could not be opened or written
    Sink(String),
}

impl fmt::Display for PcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PcError::ContractViolation(v) => write!(f, "contract violation: {}", v),
            PcError::Poisoned => write!(f, "buffer lock poisoned"),
            PcError::Closed => write!(f, "monitor closed"),
            PcError::Config(e) => write!(f, "config error: {}", e),
            PcError::Worker(e) => write!(f, "worker error: {}", e),
            PcError::Sink(msg) => write!(f, "activity sink error: {}", msg),
        }
    }
}

impl std::error::Error for PcError {}

impl From<ContractViolation> for PcError {
    fn from(v: ContractViolation) -> Self {
        PcError::ContractViolation(v)
    }
}

impl From<ConfigError> for PcError {
    fn from(e: ConfigError) -> Self {
        PcError::Config(e)
    }
}

impl From<WorkerError> for PcError {
    fn from(e: WorkerError) -> Self {
        PcError::Worker(e)
    }
}

/// Which slot operation broke its precondition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotOp {
    /// Write into a full buffer or an occupied slot
    Write,
    /// Read from an empty buffer or an empty slot
    Read,
}

impl fmt::Display for SlotOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotOp::Write => write!(f, "write"),
            SlotOp::Read => write!(f, "read"),
        }
    }
}

/// A write-to-full or read-from-empty, with the offending slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractViolation {
    pub op: SlotOp,
    pub slot: usize,
    /// Occupancy observed when the violation was detected
    pub occupied: usize,
    pub capacity: usize,
}

impl fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op {
            SlotOp::Write => write!(
                f,
                "write to occupied slot {} (occupied {}/{})",
                self.slot, self.occupied, self.capacity
            ),
            SlotOp::Read => write!(
                f,
                "read from empty slot {} (occupied {}/{})",
                self.slot, self.occupied, self.capacity
            ),
        }
    }
}

impl std::error::Error for ContractViolation {}

/// A write that was refused; the item is handed back untouched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected<T> {
    pub item: T,
    pub violation: ContractViolation,
}

impl<T> Rejected<T> {
    /// Drop the item and keep the violation
    pub fn into_violation(self) -> ContractViolation {
        self.violation
    }
}

impl<T> fmt::Display for Rejected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item rejected: {}", self.violation)
    }
}

/// Error returned by a blocking produce; carries the item back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProduceError<T> {
    pub item: T,
    pub error: PcError,
}

impl<T> fmt::Display for ProduceError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "produce failed: {}", self.error)
    }
}

impl<T: fmt::Debug> std::error::Error for ProduceError<T> {}

impl<T> From<ProduceError<T>> for PcError {
    fn from(e: ProduceError<T>) -> Self {
        e.error
    }
}

impl<T> From<Rejected<T>> for ProduceError<T> {
    fn from(r: Rejected<T>) -> Self {
        ProduceError {
            item: r.item,
            error: PcError::ContractViolation(r.violation),
        }
    }
}

/// Error returned by `try_produce`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TryProduceError<T> {
    /// No free slot right now
    Full(T),
    /// The write itself failed
    Failed(ProduceError<T>),
}

impl<T> TryProduceError<T> {
    /// Recover the item that was not enqueued
    pub fn into_inner(self) -> T {
        match self {
            TryProduceError::Full(item) => item,
            TryProduceError::Failed(e) => e.item,
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, TryProduceError::Full(_))
    }
}

impl<T> fmt::Display for TryProduceError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TryProduceError::Full(_) => write!(f, "buffer full"),
            TryProduceError::Failed(e) => write!(f, "{}", e),
        }
    }
}

/// Error returned by `try_consume`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TryConsumeError {
    /// Nothing to consume right now
    Empty,
    /// The read itself failed
    Failed(PcError),
}

impl fmt::Display for TryConsumeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TryConsumeError::Empty => write!(f, "buffer empty"),
            TryConsumeError::Failed(e) => write!(f, "{}", e),
        }
    }
}

/// Configuration error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue(&'static str),
    /// Consumers would wait forever: more reads requested than writes
    Unbalanced { produced: usize, consumed: usize, capacity: usize },
    UnknownStrategy(String),
    UnknownSpawner(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "invalid config: {}", msg),
            ConfigError::Unbalanced { produced, consumed, capacity } => write!(
                f,
                "run cannot terminate: {} items produced, {} consumed, capacity {}",
                produced, consumed, capacity
            ),
            ConfigError::UnknownStrategy(s) => write!(f, "unknown strategy '{}'", s),
            ConfigError::UnknownSpawner(s) => write!(f, "unknown spawner '{}'", s),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Worker thread related errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    /// Failed to spawn a worker thread (OS error code when known)
    SpawnFailed(i32),

    /// Worker thread panicked
    Panicked(String),

    /// Failed to join a worker thread
    JoinFailed(i32),
}

impl fmt::Display for WorkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerError::SpawnFailed(code) => write!(f, "failed to spawn worker thread ({})", code),
            WorkerError::Panicked(name) => write!(f, "worker thread {} panicked", name),
            WorkerError::JoinFailed(code) => write!(f, "failed to join worker thread ({})", code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let v = ContractViolation { op: SlotOp::Write, slot: 3, occupied: 4, capacity: 4 };
        assert_eq!(
            format!("{}", PcError::from(v)),
            "contract violation: write to occupied slot 3 (occupied 4/4)"
        );

        let e = PcError::Worker(WorkerError::Panicked("producer-2".into()));
        assert_eq!(format!("{}", e), "worker error: worker thread producer-2 panicked");
    }

    #[test]
    fn test_rejected_hands_item_back() {
        let v = ContractViolation { op: SlotOp::Write, slot: 0, occupied: 1, capacity: 1 };
        let err: ProduceError<&str> = Rejected { item: "A", violation: v }.into();
        assert_eq!(err.item, "A");
        assert!(matches!(err.error, PcError::ContractViolation(_)));
    }

    #[test]
    fn test_try_produce_into_inner() {
        assert_eq!(TryProduceError::Full(7).into_inner(), 7);
        assert!(TryProduceError::Full(7).is_full());
    }
}

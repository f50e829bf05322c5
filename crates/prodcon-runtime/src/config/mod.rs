//! Pool configuration
//!
//! Compile-time defaults with runtime environment overrides.
//!
//! # Configuration Priority (highest wins)
//!
//! 1. Builder calls
//! 2. Environment variables (`from_env`)
//! 3. User's `pc_config.rs` baked in via `PC_CONFIG_RS`
//! 4. Library defaults
//!
//! # Example
//!
//! ```rust,ignore
//! use prodcon_runtime::config::PoolConfig;
//!
//! let config = PoolConfig::from_env()
//!     .capacity(4)
//!     .num_producers(2)
//!     .num_consumers(2)
//!     .strategy(Strategy::Semaphore);
//! config.validate()?;
//! ```

pub mod defaults;

use std::path::PathBuf;

use prodcon_core::env::{env_get, env_get_first, env_get_opt, env_get_str};
use prodcon_core::{ConfigError, Strategy};

use crate::spawn::SpawnerKind;

/// Settings for one producer/consumer run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Buffer slots
    pub capacity: usize,
    pub num_producers: usize,
    pub num_consumers: usize,
    /// `produce` calls per producer
    pub items_per_producer: usize,
    /// `consume` calls per consumer
    pub items_per_consumer: usize,
    pub strategy: Strategy,
    /// Activity log file; `None` disables file recording
    pub log_path: Option<PathBuf>,
    /// Stack size per worker thread
    pub stack_size: usize,
    /// Thread creation facility
    pub spawner: SpawnerKind,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl PoolConfig {
    /// Compile-time defaults with environment overrides.
    ///
    /// Environment variables (all optional):
    /// - `PC_CAPACITY` - buffer slots
    /// - `PC_NUM_PRODUCERS` / `PC_NUM_CONSUMERS` - worker counts
    /// - `PC_ITEMS_PER_WORKER` - operations per worker (both roles)
    /// - `PC_ITEMS_PER_PRODUCER` / `PC_ITEMS_PER_CONSUMER` - per-role override
    /// - `PC_STRATEGY` - `semaphore` or `condvar`
    /// - `PC_LOG_PATH` - activity log file, empty to disable
    /// - `PC_STACK_SIZE` - worker stack size in bytes
    /// - `PC_SPAWNER` - `native` or `std`
    pub fn from_env() -> Self {
        let defaults = Self::new();
        let log_path = env_get_str(
            "PC_LOG_PATH",
            defaults.log_path.as_ref().and_then(|p| p.to_str()).unwrap_or(""),
        );

        Self {
            capacity: env_get("PC_CAPACITY", defaults.capacity),
            num_producers: env_get("PC_NUM_PRODUCERS", defaults.num_producers),
            num_consumers: env_get("PC_NUM_CONSUMERS", defaults.num_consumers),
            items_per_producer: env_get_first(
                &["PC_ITEMS_PER_PRODUCER", "PC_ITEMS_PER_WORKER"],
                defaults.items_per_producer,
            ),
            items_per_consumer: env_get_first(
                &["PC_ITEMS_PER_CONSUMER", "PC_ITEMS_PER_WORKER"],
                defaults.items_per_consumer,
            ),
            strategy: env_get("PC_STRATEGY", defaults.strategy),
            log_path: non_empty_path(&log_path),
            stack_size: env_get_opt("PC_STACK_SIZE").unwrap_or(defaults.stack_size),
            spawner: env_get("PC_SPAWNER", defaults.spawner),
        }
    }

    /// Library/compile-time defaults only, no environment lookups
    pub fn new() -> Self {
        Self {
            capacity: defaults::CAPACITY,
            num_producers: defaults::NUM_PRODUCERS,
            num_consumers: defaults::NUM_CONSUMERS,
            items_per_producer: defaults::ITEMS_PER_WORKER,
            items_per_consumer: defaults::ITEMS_PER_WORKER,
            strategy: defaults::STRATEGY.parse().unwrap_or(Strategy::Condvar),
            log_path: non_empty_path(defaults::LOG_PATH),
            stack_size: defaults::STACK_SIZE,
            spawner: defaults::SPAWNER.parse().unwrap_or_default(),
        }
    }

    // Builder methods

    pub fn capacity(mut self, n: usize) -> Self {
        self.capacity = n;
        self
    }

    pub fn num_producers(mut self, n: usize) -> Self {
        self.num_producers = n;
        self
    }

    pub fn num_consumers(mut self, n: usize) -> Self {
        self.num_consumers = n;
        self
    }

    /// Same operation count for every worker of both roles
    pub fn items_per_worker(mut self, n: usize) -> Self {
        self.items_per_producer = n;
        self.items_per_consumer = n;
        self
    }

    pub fn items_per_producer(mut self, n: usize) -> Self {
        self.items_per_producer = n;
        self
    }

    pub fn items_per_consumer(mut self, n: usize) -> Self {
        self.items_per_consumer = n;
        self
    }

    /// Per-role counts with equal totals for the current worker counts.
    ///
    /// Equal worker counts get `base` each. Otherwise both sides are scaled
    /// to `base * lcm(producers, consumers)` total operations, so any
    /// producer/consumer mix terminates with an empty buffer.
    pub fn balanced(mut self, base: usize) -> Self {
        let (p, c) = (self.num_producers.max(1), self.num_consumers.max(1));
        let g = gcd(p, c);
        self.items_per_producer = base * (c / g);
        self.items_per_consumer = base * (p / g);
        self
    }

    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn log_path(mut self, path: Option<PathBuf>) -> Self {
        self.log_path = path;
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.stack_size = size;
        self
    }

    pub fn spawner(mut self, kind: SpawnerKind) -> Self {
        self.spawner = kind;
        self
    }

    /// Items all producers write in total
    pub fn total_produced(&self) -> usize {
        self.num_producers.saturating_mul(self.items_per_producer)
    }

    /// Items all consumers read in total
    pub fn total_consumed(&self) -> usize {
        self.num_consumers.saturating_mul(self.items_per_consumer)
    }

    /// Reject settings that are invalid or that can never finish.
    ///
    /// A run terminates only if consumers never ask for more than producers
    /// write, and producers never write more than consumers take plus what
    /// the buffer can hold at the end.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::InvalidValue("capacity must be > 0"));
        }
        if self.num_producers == 0 {
            return Err(ConfigError::InvalidValue("num_producers must be > 0"));
        }
        if self.num_consumers == 0 {
            return Err(ConfigError::InvalidValue("num_consumers must be > 0"));
        }
        if self.items_per_producer == 0 || self.items_per_consumer == 0 {
            return Err(ConfigError::InvalidValue("items per worker must be > 0"));
        }
        if self.stack_size < 64 * 1024 {
            return Err(ConfigError::InvalidValue("stack_size must be >= 64KB"));
        }

        let produced = self.total_produced();
        let consumed = self.total_consumed();
        if consumed > produced || produced - consumed > self.capacity {
            return Err(ConfigError::Unbalanced {
                produced,
                consumed,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    /// Print configuration (for debugging)
    pub fn print(&self) {
        eprintln!("prodcon configuration:");
        eprintln!("  capacity:            {}", self.capacity);
        eprintln!("  num_producers:       {}", self.num_producers);
        eprintln!("  num_consumers:       {}", self.num_consumers);
        eprintln!("  items_per_producer:  {}", self.items_per_producer);
        eprintln!("  items_per_consumer:  {}", self.items_per_consumer);
        eprintln!("  strategy:            {}", self.strategy);
        match &self.log_path {
            Some(p) => eprintln!("  log_path:            {}", p.display()),
            None => eprintln!("  log_path:            (disabled)"),
        }
        eprintln!("  stack_size:          {}", self.stack_size);
        eprintln!("  spawner:             {}", self.spawner);
    }
}

fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

fn non_empty_path(s: &str) -> Option<PathBuf> {
    let s = s.trim();
    if s.is_empty() {
        None
    } else {
        Some(PathBuf::from(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PoolConfig::new();
        assert_eq!(config.capacity, defaults::CAPACITY);
        assert_eq!(config.items_per_producer, defaults::ITEMS_PER_WORKER);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = PoolConfig::new()
            .capacity(4)
            .num_producers(2)
            .num_consumers(2)
            .items_per_worker(2)
            .strategy(Strategy::Semaphore)
            .log_path(None);

        assert_eq!(config.capacity, 4);
        assert_eq!(config.total_produced(), 4);
        assert_eq!(config.total_consumed(), 4);
        assert_eq!(config.strategy, Strategy::Semaphore);
        assert!(config.log_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_zero() {
        assert!(PoolConfig::new().capacity(0).validate().is_err());
        assert!(PoolConfig::new().num_producers(0).validate().is_err());
        assert!(PoolConfig::new().num_consumers(0).validate().is_err());
        assert!(PoolConfig::new().items_per_worker(0).validate().is_err());
        assert!(PoolConfig::new().stack_size(1024).validate().is_err());
    }

    #[test]
    fn test_validation_termination() {
        // Consumers asking for more than is produced would block forever
        let starving = PoolConfig::new()
            .num_producers(1)
            .num_consumers(2)
            .items_per_worker(5);
        assert!(matches!(
            starving.validate(),
            Err(ConfigError::Unbalanced { produced: 5, consumed: 10, .. })
        ));

        // Surplus that fits in the buffer is fine, one more item is not
        let surplus = PoolConfig::new()
            .capacity(3)
            .num_producers(1)
            .num_consumers(1)
            .items_per_producer(8)
            .items_per_consumer(5);
        assert!(surplus.validate().is_ok());
        assert!(surplus.items_per_producer(9).validate().is_err());
    }

    #[test]
    fn test_balanced() {
        let same = PoolConfig::new().num_producers(5).num_consumers(5).balanced(20);
        assert_eq!((same.items_per_producer, same.items_per_consumer), (20, 20));

        let skewed = PoolConfig::new().num_producers(4).num_consumers(6).balanced(20);
        assert_eq!((skewed.items_per_producer, skewed.items_per_consumer), (60, 40));
        assert_eq!(skewed.total_produced(), skewed.total_consumed());
        assert!(skewed.capacity(1).validate().is_ok());
    }

    // The only test in this binary that touches PC_ITEMS_*
    #[test]
    fn test_env_item_counts() {
        std::env::set_var("PC_ITEMS_PER_WORKER", "7");
        std::env::set_var("PC_ITEMS_PER_CONSUMER", "4");
        let config = PoolConfig::from_env();
        std::env::remove_var("PC_ITEMS_PER_WORKER");
        std::env::remove_var("PC_ITEMS_PER_CONSUMER");

        // Per-role key wins, the shared key fills the other role
        assert_eq!(config.items_per_producer, 7);
        assert_eq!(config.items_per_consumer, 4);
    }

    #[test]
    fn test_empty_log_path_disables() {
        assert_eq!(non_empty_path("  "), None);
        assert_eq!(non_empty_path("log.txt"), Some(PathBuf::from("log.txt")));
    }
}

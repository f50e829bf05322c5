//! prodcon Configuration File
//!
//! Example build-time defaults for prodcon.
//! Copy this file to your project and modify as needed.
//!
//! Usage:
//!   PC_CONFIG_RS=./pc_config.rs cargo build
//!
//! You only need to include parameters you want to change.
//! All other parameters will use library defaults.
//!
//! These values can still be overridden at runtime via environment variables:
//!   PC_NUM_PRODUCERS=16 PC_NUM_CONSUMERS=16 ./prodcon

// Buffer slots
pub const CAPACITY: usize = 25;

// Producer and consumer threads
pub const NUM_PRODUCERS: usize = 5;
pub const NUM_CONSUMERS: usize = 5;

// produce/consume calls per worker
pub const ITEMS_PER_WORKER: usize = 20;

// "semaphore" or "condvar"
pub const STRATEGY: &str = "condvar";

// Activity log; "" disables it
pub const LOG_PATH: &str = "log.txt";

// Stack per worker thread
pub const STACK_SIZE: usize = 256 * 1024;

// "native" (pthreads on Linux) or "std"
pub const SPAWNER: &str = "native";

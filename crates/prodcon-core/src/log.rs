//! Leveled stderr logging
//!
//! Each line is written under the stderr lock, so lines from concurrent
//! producers and consumers never interleave mid-line. Lines are tagged with
//! the current thread's name (workers are named `producer-N`/`consumer-N`).
//!
//! # Environment Variables
//!
//! - `PC_LOG_LEVEL=<level>` - off, error, warn, info, debug, trace (or 0-5)
//! - `PC_FLUSH_EPRINT=1` - flush stderr after each line
//! - `PC_LOG_TIME=1` - prefix lines with time since logging started
//!
//! # Usage
//!
//! ```ignore
//! use prodcon_core::{pc_info, pc_error};
//!
//! pc_info!("spawning {} producers", n);
//! pc_error!("write to occupied slot {}", slot);
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => LogLevel::Off,
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    /// Parse a level name or digit; `None` for anything else
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "off" | "0" => Some(LogLevel::Off),
            "error" | "1" => Some(LogLevel::Error),
            "warn" | "2" => Some(LogLevel::Warn),
            "info" | "3" => Some(LogLevel::Info),
            "debug" | "4" => Some(LogLevel::Debug),
            "trace" | "5" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            LogLevel::Off => "",
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN ",
            LogLevel::Info => "INFO ",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }
}

static FLUSH_ENABLED: AtomicBool = AtomicBool::new(false);
static TIME_ENABLED: AtomicBool = AtomicBool::new(false);
static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);
static INITIALIZED: AtomicBool = AtomicBool::new(false);
static START: OnceLock<Instant> = OnceLock::new();

/// Read the `PC_*` logging variables. Runs once; later calls are no-ops.
pub fn init() {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }
    START.get_or_init(Instant::now);

    FLUSH_ENABLED.store(crate::env::env_get_bool("PC_FLUSH_EPRINT", false), Ordering::Relaxed);
    TIME_ENABLED.store(crate::env::env_get_bool("PC_LOG_TIME", false), Ordering::Relaxed);

    if let Ok(val) = std::env::var("PC_LOG_LEVEL") {
        let level = LogLevel::parse(&val).unwrap_or(LogLevel::Info);
        LOG_LEVEL.store(level as u8, Ordering::Relaxed);
    }
}

#[inline]
fn ensure_init() {
    if !INITIALIZED.load(Ordering::Relaxed) {
        init();
    }
}

#[inline]
pub fn log_level() -> LogLevel {
    ensure_init();
    LogLevel::from_u8(LOG_LEVEL.load(Ordering::Relaxed))
}

/// Set log level programmatically (wins over `PC_LOG_LEVEL`)
pub fn set_log_level(level: LogLevel) {
    ensure_init();
    LOG_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn set_flush_enabled(enabled: bool) {
    ensure_init();
    FLUSH_ENABLED.store(enabled, Ordering::Relaxed);
}

pub fn set_time_enabled(enabled: bool) {
    ensure_init();
    TIME_ENABLED.store(enabled, Ordering::Relaxed);
}

#[inline]
pub fn level_enabled(level: LogLevel) -> bool {
    level != LogLevel::Off && level <= log_level()
}

fn write_prefix(out: &mut impl Write, level: LogLevel) {
    if TIME_ENABLED.load(Ordering::Relaxed) {
        let elapsed = START.get_or_init(Instant::now).elapsed();
        let _ = write!(out, "{:>4}.{:06} ", elapsed.as_secs(), elapsed.subsec_micros());
    }
    let _ = write!(out, "[{}]", level.tag());
    if let Some(name) = std::thread::current().name() {
        let _ = write!(out, " [{}]", name);
    }
    let _ = out.write_all(b" ");
}

#[doc(hidden)]
pub fn _println_impl(args: std::fmt::Arguments<'_>) {
    ensure_init();
    let stderr = std::io::stderr();
    let mut handle = stderr.lock();
    let _ = handle.write_fmt(args);
    let _ = handle.write_all(b"\n");
    if FLUSH_ENABLED.load(Ordering::Relaxed) {
        let _ = handle.flush();
    }
}

#[doc(hidden)]
pub fn _log_impl(level: LogLevel, args: std::fmt::Arguments<'_>) {
    if !level_enabled(level) {
        return;
    }
    let stderr = std::io::stderr();
    let mut handle = stderr.lock();
    write_prefix(&mut handle, level);
    let _ = handle.write_fmt(args);
    let _ = handle.write_all(b"\n");
    if FLUSH_ENABLED.load(Ordering::Relaxed) {
        let _ = handle.flush();
    }
}

/// Unleveled line to stderr
#[macro_export]
macro_rules! pc_println {
    () => {{
        $crate::log::_println_impl(format_args!(""));
    }};
    ($($arg:tt)*) => {{
        $crate::log::_println_impl(format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! pc_error {
    ($($arg:tt)*) => {{
        $crate::log::_log_impl($crate::log::LogLevel::Error, format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! pc_warn {
    ($($arg:tt)*) => {{
        $crate::log::_log_impl($crate::log::LogLevel::Warn, format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! pc_info {
    ($($arg:tt)*) => {{
        $crate::log::_log_impl($crate::log::LogLevel::Info, format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! pc_debug {
    ($($arg:tt)*) => {{
        $crate::log::_log_impl($crate::log::LogLevel::Debug, format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! pc_trace {
    ($($arg:tt)*) => {{
        $crate::log::_log_impl($crate::log::LogLevel::Trace, format_args!($($arg)*));
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Error < LogLevel::Warn);
        assert!(LogLevel::Info < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Trace);
    }

    #[test]
    fn test_level_parse() {
        assert_eq!(LogLevel::parse("DEBUG"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse(" 1 "), Some(LogLevel::Error));
        assert_eq!(LogLevel::parse("verbose"), None);
        assert_eq!(LogLevel::from_u8(42), LogLevel::Trace);
    }

    #[test]
    fn test_prefix_carries_thread_name() {
        let handle = std::thread::Builder::new()
            .name("producer-7".into())
            .spawn(|| {
                let mut out = Vec::new();
                write_prefix(&mut out, LogLevel::Warn);
                String::from_utf8(out).unwrap()
            })
            .unwrap();
        let prefix = handle.join().unwrap();
        assert!(prefix.ends_with("[WARN ] [producer-7] "));
    }

    #[test]
    fn test_macros_compile() {
        set_log_level(LogLevel::Off);
        assert!(!level_enabled(LogLevel::Error));

        pc_error!("error {}", 1);
        pc_warn!("warn");
        pc_info!("info");
        pc_debug!("debug");
        pc_trace!("trace");
    }
}

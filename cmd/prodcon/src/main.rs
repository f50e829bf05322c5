//! prodcon - one bounded-buffer run from the command line
//!
//! Starts the configured producers and consumers, waits for all of them,
//! prints the run report and then `Done`.
//!
//! Defaults come from `PC_*` environment variables (see `PoolConfig`);
//! flags override them.

use std::path::PathBuf;
use std::process;

use prodcon::{init_logging, PoolConfig, SpawnerKind, Strategy};

fn parse_args() -> PoolConfig {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (c, show_config) = apply_args(PoolConfig::from_env(), &args);
    if show_config {
        c.print();
    }
    c
}

/// Apply command-line flags over `c`; also returns whether `--show-config` was given
fn apply_args(mut c: PoolConfig, args: &[String]) -> (PoolConfig, bool) {
    let mut show_config = false;
    let mut balanced = None;

    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "-p" | "--producers" => { i += 1; c.num_producers = number(flag, args.get(i)); }
            "-c" | "--consumers" => { i += 1; c.num_consumers = number(flag, args.get(i)); }
            "-n" | "--items" => { i += 1; c = c.items_per_worker(number(flag, args.get(i))); }
            "-b" | "--capacity" => { i += 1; c.capacity = number(flag, args.get(i)); }
            "--balanced" => { i += 1; balanced = Some(number(flag, args.get(i))); }
            "-s" | "--strategy" => { i += 1; c.strategy = parsed::<Strategy>(flag, args.get(i)); }
            "--spawner" => { i += 1; c.spawner = parsed::<SpawnerKind>(flag, args.get(i)); }
            "--log" => {
                i += 1;
                c.log_path = match args.get(i).map(String::as_str) {
                    None | Some("") | Some("none") => None,
                    Some(p) => Some(PathBuf::from(p)),
                };
            }
            "--no-log" => { c.log_path = None; }
            "--show-config" => { show_config = true; }
            "-h" | "--help" => { eprint_usage(); process::exit(0); }
            other => { eprintln!("prodcon: unknown: {}", other); eprint_usage(); process::exit(1); }
        }
        i += 1;
    }

    // Needs the final worker counts, wherever -p/-c appeared
    if let Some(base) = balanced {
        c = c.balanced(base);
    }
    (c, show_config)
}

fn number(flag: &str, value: Option<&String>) -> usize {
    parsed::<usize>(flag, value)
}

fn parsed<T: std::str::FromStr>(flag: &str, value: Option<&String>) -> T {
    match value.and_then(|s| s.parse().ok()) {
        Some(v) => v,
        None => {
            eprintln!("prodcon: {} needs a valid value", flag);
            process::exit(1);
        }
    }
}

fn eprint_usage() {
    eprintln!(
"Usage: prodcon [OPTIONS]

Options:
  -p  --producers <N>     Producer threads (default: 5, PC_NUM_PRODUCERS)
  -c  --consumers <N>     Consumer threads (default: 5, PC_NUM_CONSUMERS)
  -n  --items <N>         Operations per worker (default: 20, PC_ITEMS_PER_WORKER)
      --balanced <N>      Scale per-role counts so totals match, N per worker when P == C
  -b  --capacity <N>      Buffer slots (default: 25, PC_CAPACITY)
  -s  --strategy <S>      semaphore | condvar (default: condvar, PC_STRATEGY)
      --spawner <S>       native | std (default: native, PC_SPAWNER)
      --log <PATH>        Activity log file, 'none' to disable (default: log.txt, PC_LOG_PATH)
      --no-log            Do not write an activity log
      --show-config       Print the effective configuration

Logging: PC_LOG_LEVEL=off|error|warn|info|debug|trace, PC_LOG_TIME=1");
}

fn main() {
    init_logging();
    let config = parse_args();

    if let Err(e) = config.validate() {
        eprintln!("prodcon: {}", e);
        process::exit(2);
    }

    eprintln!(
        "prodcon: {} producers x {}, {} consumers x {}, capacity {}, strategy={}",
        config.num_producers,
        config.items_per_producer,
        config.num_consumers,
        config.items_per_consumer,
        config.capacity,
        config.strategy
    );

    match prodcon::run(config) {
        Ok(report) => {
            println!("{}", report);
            if !report.is_clean() {
                process::exit(3);
            }
        }
        Err(e) => {
            eprintln!("prodcon: {}", e);
            process::exit(2);
        }
    }

    println!("Done");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn test_balanced_uses_final_worker_counts() {
        let orders = ["--balanced 20 -p 3 -c 5", "-p 3 --balanced 20 -c 5", "-p 3 -c 5 --balanced 20"];
        for line in orders {
            let (c, show) = apply_args(PoolConfig::new(), &args(line));
            assert!(!show);
            assert_eq!((c.num_producers, c.num_consumers), (3, 5), "{}", line);
            assert_eq!((c.items_per_producer, c.items_per_consumer), (100, 60), "{}", line);
            assert_eq!(c.total_produced(), c.total_consumed());
            assert!(c.validate().is_ok(), "{}", line);
        }
    }

    #[test]
    fn test_flags_override_base() {
        let (c, show) = apply_args(
            PoolConfig::new(),
            &args("-b 4 -n 7 -s semaphore --spawner std --no-log --show-config"),
        );
        assert!(show);
        assert_eq!(c.capacity, 4);
        assert_eq!((c.items_per_producer, c.items_per_consumer), (7, 7));
        assert_eq!(c.strategy, Strategy::Semaphore);
        assert_eq!(c.spawner, SpawnerKind::Std);
        assert!(c.log_path.is_none());
    }
}

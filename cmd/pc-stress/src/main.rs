//! Stress test - sweep buffer sizes and worker counts
//!
//! Runs every (strategy, capacity, producers, consumers) combination with
//! balanced totals and a per-run timeout. A run that does not finish in
//! time is reported with the phase of every unfinished worker.

use prodcon::{init_logging, NullRecorder, PoolConfig, RunReport, SpawnerKind, Strategy, WorkerPool};
use std::process;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const QUICK_CAPACITIES: &[usize] = &[1, 2, 3, 5, 10, 25];
const QUICK_WORKERS: &[usize] = &[1, 2, 3, 5, 8, 17, 50, 100];

struct Cfg {
    full: bool,
    timeout: Duration,
    base: usize,
    strategies: Vec<Strategy>,
    spawner: SpawnerKind,
}

fn parse_args() -> Cfg {
    let args: Vec<String> = std::env::args().collect();
    let mut c = Cfg {
        full: false,
        timeout: Duration::from_secs(30),
        base: 20,
        strategies: Strategy::ALL.to_vec(),
        spawner: SpawnerKind::Native,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--full" => { c.full = true; }
            "-t" | "--timeout" => { i += 1; c.timeout = Duration::from_secs(args.get(i).and_then(|s| s.trim_end_matches('s').parse().ok()).unwrap_or(30)); }
            "-n" | "--items" => { i += 1; c.base = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(20); }
            "-s" | "--strategy" => { i += 1; c.strategies = args.get(i).and_then(|s| s.parse().ok()).map(|s| vec![s]).unwrap_or_else(|| Strategy::ALL.to_vec()); }
            "--spawner" => { i += 1; c.spawner = args.get(i).and_then(|s| s.parse().ok()).unwrap_or_default(); }
            "-h" | "--help" => { eprint_usage(); process::exit(0); }
            other => { eprintln!("pc-stress: unknown: {}", other); process::exit(1); }
        }
        i += 1;
    }
    c
}

fn eprint_usage() {
    eprintln!(
"Usage: pc-stress [OPTIONS]

Options:
      --full              Capacity 1..=25 x producers/consumers 1..=100
                          (default: a representative subset)
  -t  --timeout <SEC>     Per-run timeout (default: 30)
  -n  --items <N>         Operations per worker when producers == consumers (default: 20)
  -s  --strategy <S>      Only this strategy (default: both)
      --spawner <S>       native | std (default: native)");
}

enum Outcome {
    Finished(RunReport),
    Failed(String),
    TimedOut(Vec<String>),
}

fn run_one(config: PoolConfig, timeout: Duration) -> Outcome {
    let pool: Arc<WorkerPool<u64>> = match WorkerPool::with_recorder(config, Arc::new(NullRecorder)) {
        Ok(pool) => Arc::new(pool),
        Err(e) => return Outcome::Failed(e.to_string()),
    };

    let (tx, rx) = mpsc::channel();
    let runner = pool.clone();
    thread::spawn(move || {
        let _ = tx.send(runner.run(prodcon::tag_item, |_, _| {}));
    });

    match rx.recv_timeout(timeout) {
        Ok(Ok(report)) => Outcome::Finished(report),
        Ok(Err(e)) => Outcome::Failed(e.to_string()),
        Err(_) => Outcome::TimedOut(pool.stuck_workers().iter().map(|s| s.to_string()).collect()),
    }
}

fn main() {
    init_logging();
    let cfg = parse_args();

    let (capacities, workers): (Vec<usize>, Vec<usize>) = if cfg.full {
        ((1..=25).collect(), (1..=100).collect())
    } else {
        (QUICK_CAPACITIES.to_vec(), QUICK_WORKERS.to_vec())
    };
    let total = cfg.strategies.len() * capacities.len() * workers.len() * workers.len();

    println!("=== prodcon Stress Test ===\n");
    println!("Runs: {} (timeout {:?} each, spawner {})", total, cfg.timeout, cfg.spawner);

    let start = Instant::now();
    let mut done = 0usize;
    let mut items = 0u64;
    let mut bad = 0usize;

    for &strategy in &cfg.strategies {
        for &capacity in &capacities {
            for &p in &workers {
                for &c in &workers {
                    let config = PoolConfig::new()
                        .strategy(strategy)
                        .spawner(cfg.spawner)
                        .capacity(capacity)
                        .num_producers(p)
                        .num_consumers(c)
                        .balanced(cfg.base)
                        .log_path(None);
                    let label = format!("{} cap={} p={} c={}", strategy, capacity, p, c);

                    match run_one(config, cfg.timeout) {
                        Outcome::Finished(report) => {
                            items += report.consumed;
                            if !report.is_clean() || report.final_occupancy != 0 {
                                bad += 1;
                                println!("\n{}: unclean run\n{}", label, report);
                            }
                        }
                        Outcome::Failed(e) => {
                            bad += 1;
                            println!("\n{}: {}", label, e);
                        }
                        Outcome::TimedOut(stuck) => {
                            println!("\n{}: Timeout! {} workers unfinished:", label, stuck.len());
                            for line in stuck {
                                println!("  {}", line);
                            }
                            // Stuck threads stay blocked; further runs would be meaningless
                            process::exit(1);
                        }
                    }

                    done += 1;
                    if done % 50 == 0 {
                        print!("\rCompleted: {}/{}", done, total);
                    }
                }
            }
        }
    }

    let elapsed = start.elapsed();
    println!("\n\n=== Results ===");
    println!("Runs:            {}", done);
    println!("Failed:          {}", bad);
    println!("Items moved:     {}", items);
    println!("Total time:      {:?}", elapsed);
    println!("Throughput:      {:.0} items/sec", items as f64 / elapsed.as_secs_f64());

    if bad > 0 {
        process::exit(1);
    }
    println!("\n=== Stress Test Complete ===");
}

//! Producer/consumer worker pool
//!
//! A pool owns one monitor and spawns `num_producers` producers and
//! `num_consumers` consumers against it, interleaved as producer 0,
//! consumer 0, producer 1, consumer 1, ... Each worker performs its fixed
//! number of operations, then terminates; `run` joins them all and returns
//! a [`RunReport`].
//!
//! Every worker has a [`WorkerStatus`] bound to its thread, so the monitor
//! can tag events with the worker id and an observer can read each
//! worker's phase while the run is in progress (see [`WorkerPool::snapshot`]).
//!
//! A panic in `make_item` or `sink` is caught and reported as a
//! [`WorkerFailure`]. A consumer whose sink panicked keeps going, since the
//! item already left the buffer. A producer that cannot make its next item
//! closes the monitor, so the run ends instead of starving the consumers.

use core::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use prodcon_core::state::{self, WorkerPhase, WorkerStatus};
use prodcon_core::{
    new_monitor, pc_debug, pc_error, ActivityRecorder, ConfigError, Consumed, Monitor,
    PcError, PcResult, ProduceError, Strategy, WorkerError, WorkerId,
};

use crate::config::PoolConfig;
use crate::sink::open_recorder;
use crate::spawn::{os_thread_id, panic_message, SpawnerKind, StdSpawner, ThreadSpawner};

/// A worker that stopped on an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerFailure {
    pub worker: WorkerId,
    pub error: PcError,
}

/// Phase and progress of one worker at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSnapshot {
    pub id: WorkerId,
    pub phase: WorkerPhase,
    pub completed: u64,
}

impl fmt::Display for WorkerSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<14} {:<17} {} ops",
            self.id.to_string(),
            self.phase.to_string(),
            self.completed
        )
    }
}

/// Outcome of [`WorkerPool::run`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub strategy: Strategy,
    pub capacity: usize,
    pub produced: u64,
    pub consumed: u64,
    pub anomalies: u64,
    pub producer_waits: u64,
    pub consumer_waits: u64,
    /// Items left in the buffer after every worker finished
    pub final_occupancy: usize,
    pub elapsed: Duration,
    pub failures: Vec<WorkerFailure>,
}

impl RunReport {
    /// No anomalies and no failed workers
    pub fn is_clean(&self) -> bool {
        self.anomalies == 0 && self.failures.is_empty()
    }

    /// Every produced item is either consumed or still buffered
    pub fn is_conserved(&self) -> bool {
        self.produced == self.consumed + self.final_occupancy as u64
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "strategy:        {}", self.strategy)?;
        writeln!(f, "capacity:        {}", self.capacity)?;
        writeln!(f, "produced:        {}", self.produced)?;
        writeln!(f, "consumed:        {}", self.consumed)?;
        writeln!(f, "left in buffer:  {}", self.final_occupancy)?;
        writeln!(f, "anomalies:       {}", self.anomalies)?;
        writeln!(
            f,
            "waits:           {} producer, {} consumer",
            self.producer_waits, self.consumer_waits
        )?;
        write!(f, "elapsed:         {:.3?}", self.elapsed)?;
        for failure in &self.failures {
            write!(f, "\nfailed:          {}: {}", failure.worker, failure.error)?;
        }
        Ok(())
    }
}

/// Producers and consumers sharing one monitor
pub struct WorkerPool<T: Send + 'static> {
    config: PoolConfig,
    monitor: Arc<dyn Monitor<T>>,
    recorder: Arc<dyn ActivityRecorder>,
    producers: Vec<Arc<WorkerStatus>>,
    consumers: Vec<Arc<WorkerStatus>>,
    started: AtomicBool,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Validate `config` and build the pool, recording to `config.log_path`
    pub fn new(config: PoolConfig) -> PcResult<Self> {
        config.validate()?;
        let recorder = open_recorder(config.log_path.as_deref());
        Self::with_recorder(config, recorder)
    }

    /// Build the pool with an explicit recorder; `config.log_path` is ignored
    pub fn with_recorder(
        config: PoolConfig,
        recorder: Arc<dyn ActivityRecorder>,
    ) -> PcResult<Self> {
        config.validate()?;
        let monitor = new_monitor(config.strategy, config.capacity, recorder.clone())?;

        let producers = (0..config.num_producers)
            .map(|i| Arc::new(WorkerStatus::new(WorkerId::producer(i as u32))))
            .collect();
        let consumers = (0..config.num_consumers)
            .map(|i| Arc::new(WorkerStatus::new(WorkerId::consumer(i as u32))))
            .collect();

        Ok(Self {
            config,
            monitor,
            recorder,
            producers,
            consumers,
            started: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// The shared monitor
    pub fn monitor(&self) -> &Arc<dyn Monitor<T>> {
        &self.monitor
    }

    /// Phase and progress of every worker, producers first
    pub fn snapshot(&self) -> Vec<WorkerSnapshot> {
        self.producers
            .iter()
            .chain(&self.consumers)
            .map(|s| WorkerSnapshot { id: s.id(), phase: s.phase(), completed: s.completed() })
            .collect()
    }

    /// Workers not yet terminated
    pub fn stuck_workers(&self) -> Vec<WorkerSnapshot> {
        self.snapshot()
            .into_iter()
            .filter(|s| !s.phase.is_terminated())
            .collect()
    }

    /// Spawn every worker, wait for all of them, and report.
    ///
    /// `make_item(worker, n)` builds the `n`th item of a producer.
    /// `sink(worker, item)` receives every item a consumer takes.
    ///
    /// A pool runs once; later calls fail with a config error.
    pub fn run<F, S>(&self, make_item: F, sink: S) -> PcResult<RunReport>
    where
        F: Fn(WorkerId, usize) -> T + Send + Sync + 'static,
        S: Fn(WorkerId, T) + Send + Sync + 'static,
    {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(ConfigError::InvalidValue("pool has already run").into());
        }

        match self.config.spawner {
            SpawnerKind::Std => self.run_with(&StdSpawner, make_item, sink),
            #[cfg(target_os = "linux")]
            SpawnerKind::Native => {
                self.run_with(&crate::spawn::NativeSpawner, make_item, sink)
            }
            #[cfg(not(target_os = "linux"))]
            SpawnerKind::Native => self.run_with(&StdSpawner, make_item, sink),
        }
    }

    fn run_with<P, F, S>(&self, spawner: &P, make_item: F, sink: S) -> PcResult<RunReport>
    where
        P: ThreadSpawner,
        F: Fn(WorkerId, usize) -> T + Send + Sync + 'static,
        S: Fn(WorkerId, T) + Send + Sync + 'static,
    {
        let make_item = Arc::new(make_item);
        let sink = Arc::new(sink);
        let failures: Arc<Mutex<Vec<WorkerFailure>>> = Arc::new(Mutex::new(Vec::new()));

        pc_debug!(
            "starting {} producers, {} consumers ({} strategy, capacity {})",
            self.producers.len(),
            self.consumers.len(),
            self.config.strategy,
            self.config.capacity
        );

        let start = Instant::now();
        let mut handles = Vec::with_capacity(self.producers.len() + self.consumers.len());
        let rounds = self.producers.len().max(self.consumers.len());

        for i in 0..rounds {
            if let Some(status) = self.producers.get(i) {
                let body = self.producer_body(status.clone(), make_item.clone(), failures.clone());
                handles.push((status.id(), self.spawn_one(spawner, status, body)?));
            }
            if let Some(status) = self.consumers.get(i) {
                let body = self.consumer_body(status.clone(), sink.clone(), failures.clone());
                handles.push((status.id(), self.spawn_one(spawner, status, body)?));
            }
        }

        for (id, handle) in handles {
            if let Err(e) = spawner.join(handle) {
                pc_error!("{}: {}", id, e);
                push_failure(&failures, id, PcError::Worker(e));
            }
        }
        let elapsed = start.elapsed();
        self.recorder.flush();

        let stats = self.monitor.stats().snapshot();
        let final_occupancy = self.monitor.occupied()?;
        let failures = std::mem::take(&mut *failures.lock().unwrap_or_else(PoisonError::into_inner));

        Ok(RunReport {
            strategy: self.config.strategy,
            capacity: self.config.capacity,
            produced: stats.produced,
            consumed: stats.consumed,
            anomalies: stats.anomalies,
            producer_waits: stats.producer_waits,
            consumer_waits: stats.consumer_waits,
            final_occupancy,
            elapsed,
            failures,
        })
    }

    fn spawn_one<P: ThreadSpawner>(
        &self,
        spawner: &P,
        status: &WorkerStatus,
        body: Box<dyn FnOnce() + Send + 'static>,
    ) -> PcResult<P::Handle> {
        let name = status.id().thread_name();
        spawner.spawn(&name, self.config.stack_size, body).map_err(|e| {
            // Already-running workers are left detached: joining them could
            // block forever without their counterparts.
            pc_error!("cannot start {}: {}", name, e);
            e
        })
    }

    fn producer_body<F>(
        &self,
        status: Arc<WorkerStatus>,
        make_item: Arc<F>,
        failures: Arc<Mutex<Vec<WorkerFailure>>>,
    ) -> Box<dyn FnOnce() + Send + 'static>
    where
        F: Fn(WorkerId, usize) -> T + Send + Sync + 'static,
    {
        let monitor = self.monitor.clone();
        let count = self.config.items_per_producer;
        Box::new(move || {
            let id = status.id();
            state::set_current(status.clone());
            let _exit = WorkerExit { status: status.clone(), monitor: monitor.clone() };
            pc_debug!("{} started (tid {})", id, os_thread_id());

            for n in 0..count {
                let item = match panic::catch_unwind(AssertUnwindSafe(|| make_item(id, n))) {
                    Ok(item) => item,
                    Err(payload) => {
                        let msg = panic_message(payload.as_ref());
                        pc_error!("{} item #{} panicked: {}", id, n, msg);
                        let error = WorkerError::Panicked(id.thread_name());
                        push_failure(&failures, id, error.into());
                        // The rest of this producer's items will never arrive
                        monitor.close();
                        break;
                    }
                };
                match monitor.produce(item) {
                    Ok(_) => status.bump_completed(),
                    Err(ProduceError { error: PcError::Closed, .. }) => {
                        pc_debug!("{} stopping after {} items: monitor closed", id, n);
                        break;
                    }
                    Err(e) => {
                        pc_error!("{} produce #{} failed: {}", id, n, e.error);
                        push_failure(&failures, id, e.into());
                    }
                }
            }
        })
    }

    fn consumer_body<S>(
        &self,
        status: Arc<WorkerStatus>,
        sink: Arc<S>,
        failures: Arc<Mutex<Vec<WorkerFailure>>>,
    ) -> Box<dyn FnOnce() + Send + 'static>
    where
        S: Fn(WorkerId, T) + Send + Sync + 'static,
    {
        let monitor = self.monitor.clone();
        let count = self.config.items_per_consumer;
        Box::new(move || {
            let id = status.id();
            state::set_current(status.clone());
            let _exit = WorkerExit { status: status.clone(), monitor: monitor.clone() };
            pc_debug!("{} started (tid {})", id, os_thread_id());

            for n in 0..count {
                match monitor.consume() {
                    Ok(Consumed { item, .. }) => {
                        let delivered = panic::catch_unwind(AssertUnwindSafe(|| sink(id, item)));
                        if let Err(payload) = delivered {
                            let msg = panic_message(payload.as_ref());
                            pc_error!("{} sink panicked on #{}: {}", id, n, msg);
                            let error = WorkerError::Panicked(id.thread_name());
                            push_failure(&failures, id, error.into());
                        }
                        // Taken from the buffer either way
                        status.bump_completed();
                    }
                    Err(PcError::Closed) => {
                        pc_debug!("{} stopping after {} items: monitor closed", id, n);
                        break;
                    }
                    Err(e) => {
                        pc_error!("{} consume #{} failed: {}", id, n, e);
                        push_failure(&failures, id, e);
                    }
                }
            }
        })
    }
}

/// Marks the worker terminated on every exit path, panics included
struct WorkerExit<T: Send + 'static> {
    status: Arc<WorkerStatus>,
    monitor: Arc<dyn Monitor<T>>,
}

impl<T: Send + 'static> Drop for WorkerExit<T> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.monitor.close();
        }
        self.status.set_phase(WorkerPhase::Terminated);
        state::clear_current();
        pc_debug!("{} done", self.status.id());
    }
}

fn push_failure(failures: &Mutex<Vec<WorkerFailure>>, worker: WorkerId, error: PcError) {
    failures
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(WorkerFailure { worker, error });
}

#[cfg(test)]
mod tests {
    use super::*;
    use prodcon_core::{EventCounts, EventKind, MemoryRecorder};
    use std::sync::atomic::AtomicU64;

    fn config(strategy: Strategy) -> PoolConfig {
        PoolConfig::new()
            .capacity(4)
            .num_producers(2)
            .num_consumers(2)
            .items_per_worker(2)
            .strategy(strategy)
            .spawner(SpawnerKind::Std)
            .log_path(None)
    }

    #[test]
    fn test_four_item_run() {
        for strategy in Strategy::ALL {
            let recorder = Arc::new(MemoryRecorder::new());
            let pool: WorkerPool<u64> =
                WorkerPool::with_recorder(config(strategy), recorder.clone()).unwrap();
            let report = pool.run(|_, n| n as u64, |_, _| {}).unwrap();

            assert_eq!(report.produced, 4);
            assert_eq!(report.consumed, 4);
            assert_eq!(report.final_occupancy, 0);
            assert!(report.is_clean() && report.is_conserved(), "{}", report);

            let events = recorder.drain();
            assert_eq!(events.len(), 8);
            let counts = EventCounts::tally(&events);
            assert_eq!((counts.produced, counts.consumed, counts.anomalies), (4, 4, 0));
            assert!(events.iter().all(|e| e.worker.is_some()));
            assert!(events
                .iter()
                .filter(|e| e.kind == EventKind::Produced)
                .all(|e| e.worker.map_or(false, |w| w.is_producer())));
        }
    }

    #[test]
    fn test_sink_sees_every_item() {
        let total = Arc::new(AtomicU64::new(0));
        let total2 = total.clone();
        let pool: WorkerPool<u64> = WorkerPool::with_recorder(
            config(Strategy::Semaphore).items_per_worker(10),
            Arc::new(prodcon_core::NullRecorder),
        )
        .unwrap();
        // Producer p writes p*100 + n
        let report = pool
            .run(
                |id, n| id.index() as u64 * 100 + n as u64,
                move |_, item| {
                    total2.fetch_add(item, Ordering::SeqCst);
                },
            )
            .unwrap();
        assert_eq!(report.consumed, 20);
        let expected: u64 = (0..10).sum::<u64>() + (100..110).sum::<u64>();
        assert_eq!(total.load(Ordering::SeqCst), expected);
    }

    #[test]
    fn test_all_workers_terminate() {
        let pool: WorkerPool<usize> =
            WorkerPool::with_recorder(config(Strategy::Condvar), Arc::new(prodcon_core::NullRecorder))
                .unwrap();
        assert!(pool.snapshot().iter().all(|s| s.phase == WorkerPhase::Idle));
        pool.run(|_, n| n, |_, _| {}).unwrap();

        let snap = pool.snapshot();
        assert_eq!(snap.len(), 4);
        assert!(pool.stuck_workers().is_empty());
        assert!(snap.iter().all(|s| s.completed == 2));
    }

    #[test]
    fn test_runs_once() {
        let pool: WorkerPool<usize> =
            WorkerPool::with_recorder(config(Strategy::Condvar), Arc::new(prodcon_core::NullRecorder))
                .unwrap();
        pool.run(|_, n| n, |_, _| {}).unwrap();
        assert!(matches!(
            pool.run(|_, n| n, |_, _| {}),
            Err(PcError::Config(ConfigError::InvalidValue(_)))
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let bad = config(Strategy::Condvar).num_consumers(3);
        assert!(matches!(
            WorkerPool::<u8>::with_recorder(bad, Arc::new(prodcon_core::NullRecorder)),
            Err(PcError::Config(ConfigError::Unbalanced { .. }))
        ));
    }

    /// Run on a helper thread so a hang fails the test instead of blocking it
    fn run_within<F, S>(pool: Arc<WorkerPool<usize>>, make_item: F, sink: S) -> RunReport
    where
        F: Fn(WorkerId, usize) -> usize + Send + Sync + 'static,
        S: Fn(WorkerId, usize) + Send + Sync + 'static,
    {
        let (tx, rx) = std::sync::mpsc::channel();
        let runner = pool.clone();
        thread::spawn(move || {
            let _ = tx.send(runner.run(make_item, sink));
        });
        match rx.recv_timeout(Duration::from_secs(10)) {
            Ok(report) => report.unwrap(),
            Err(_) => {
                let stuck: Vec<String> =
                    pool.stuck_workers().iter().map(|s| s.to_string()).collect();
                panic!("run did not finish:\n{}", stuck.join("\n"));
            }
        }
    }

    fn single_pair(strategy: Strategy) -> Arc<WorkerPool<usize>> {
        let config = config(strategy)
            .capacity(1)
            .num_producers(1)
            .num_consumers(1)
            .items_per_worker(3);
        Arc::new(WorkerPool::with_recorder(config, Arc::new(prodcon_core::NullRecorder)).unwrap())
    }

    #[test]
    fn test_sink_panic_reported() {
        let pool: WorkerPool<usize> = WorkerPool::with_recorder(
            config(Strategy::Condvar).num_producers(1).num_consumers(1).items_per_worker(1),
            Arc::new(prodcon_core::NullRecorder),
        )
        .unwrap();
        let report = pool.run(|_, n| n, |_, _| panic!("sink exploded")).unwrap();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].worker, WorkerId::consumer(0));
        assert_eq!(
            report.failures[0].error,
            PcError::Worker(WorkerError::Panicked("consumer-0".into()))
        );
        assert!(!report.is_clean());
    }

    #[test]
    fn test_panicking_sink_does_not_stall_run() {
        for strategy in Strategy::ALL {
            let pool = single_pair(strategy);
            let report = run_within(pool.clone(), |_, n| n, |_, _| panic!("sink exploded"));

            assert_eq!((report.produced, report.consumed), (3, 3), "{}", strategy);
            assert_eq!(report.final_occupancy, 0);
            assert_eq!(report.failures.len(), 3);
            assert!(report.failures.iter().all(|f| f.worker == WorkerId::consumer(0)));
            assert!(pool.stuck_workers().is_empty());
            assert!(pool.snapshot().iter().all(|s| s.completed == 3));
        }
    }

    #[test]
    fn test_panicking_item_factory_ends_run() {
        for strategy in Strategy::ALL {
            let pool = single_pair(strategy);
            let report = run_within(
                pool.clone(),
                |_, n| if n == 1 { panic!("no item {}", n) } else { n },
                |_, _| {},
            );

            assert_eq!((report.produced, report.consumed), (1, 1), "{}", strategy);
            assert!(report.is_conserved());
            assert_eq!(
                report.failures,
                vec![WorkerFailure {
                    worker: WorkerId::producer(0),
                    error: PcError::Worker(WorkerError::Panicked("producer-0".into())),
                }]
            );
            assert!(pool.monitor().is_closed());
            assert!(pool.stuck_workers().is_empty());
        }
    }
}

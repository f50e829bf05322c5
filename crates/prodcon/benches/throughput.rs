use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use prodcon::{new_monitor, NullRecorder, PoolConfig, SpawnerKind, Strategy, WorkerPool};
use std::sync::Arc;
use std::thread;

/// Single-threaded produce/consume pairs, no contention.
fn bench_uncontended_pair(c: &mut Criterion) {
    let mut group = c.benchmark_group("uncontended_pair");
    for strategy in Strategy::ALL {
        let monitor = new_monitor::<u64>(strategy, 16, Arc::new(NullRecorder)).unwrap();
        group.bench_function(strategy.as_str(), |b| {
            b.iter(|| {
                monitor.produce(black_box(7)).unwrap();
                black_box(monitor.consume().unwrap());
            })
        });
    }
    group.finish();
}

/// One producer and one consumer thread moving 10k items.
fn bench_spsc(c: &mut Criterion) {
    const ITEMS: u64 = 10_000;
    let mut group = c.benchmark_group("spsc_10k");
    group.throughput(Throughput::Elements(ITEMS));
    for strategy in Strategy::ALL {
        for capacity in [1usize, 25] {
            group.bench_with_input(
                BenchmarkId::new(strategy.as_str(), capacity),
                &capacity,
                |b, &capacity| {
                    b.iter(|| {
                        let monitor =
                            new_monitor::<u64>(strategy, capacity, Arc::new(NullRecorder)).unwrap();
                        let producer = {
                            let monitor = monitor.clone();
                            thread::spawn(move || {
                                for n in 0..ITEMS {
                                    monitor.produce(n).unwrap();
                                }
                            })
                        };
                        for _ in 0..ITEMS {
                            black_box(monitor.consume().unwrap());
                        }
                        producer.join().unwrap();
                    })
                },
            );
        }
    }
    group.finish();
}

/// Full pool run with the default shape: 5 producers, 5 consumers, 20 items each.
fn bench_pool(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_5x5");
    group.sample_size(20);
    for strategy in Strategy::ALL {
        group.bench_function(strategy.as_str(), |b| {
            b.iter(|| {
                let config = PoolConfig::new()
                    .capacity(25)
                    .num_producers(5)
                    .num_consumers(5)
                    .items_per_worker(20)
                    .strategy(strategy)
                    .spawner(SpawnerKind::Std)
                    .log_path(None);
                let pool: WorkerPool<u64> =
                    WorkerPool::with_recorder(config, Arc::new(NullRecorder)).unwrap();
                black_box(pool.run(prodcon::tag_item, |_, _| {}).unwrap())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_uncontended_pair, bench_spsc, bench_pool);
criterion_main!(benches);

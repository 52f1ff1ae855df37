//! Benchmark comparison: kovan-lvec vs a vector of parking_lot mutexes
//!
//! Both store one u64 per slot; kovan-lvec keeps the lock in bit 0 of the
//! slot, parking_lot needs a separate lock byte (padded to a word) per slot.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use kovan_lvec::LockingVector;
use parking_lot::Mutex;
use std::hint::black_box;
use std::sync::Arc;
use std::thread;

const SLOTS: usize = 1_024;
const OPS_PER_THREAD: usize = 10_000;
const THREAD_COUNTS: &[usize] = &[1, 2, 4, 8];

fn bench_uncontended(c: &mut Criterion) {
    let mut group = c.benchmark_group("uncontended_cycle");
    group.throughput(Throughput::Elements(SLOTS as u64));

    let lvec = LockingVector::<u64>::new(SLOTS);
    group.bench_function("kovan-lvec", |b| {
        b.iter(|| {
            for i in 0..SLOTS {
                let v = lvec.lock_and_read(black_box(i));
                lvec.write_and_unlock(i, v + 2);
            }
        });
    });

    let mutexes: Vec<Mutex<u64>> = (0..SLOTS).map(|_| Mutex::new(0)).collect();
    group.bench_function("parking_lot", |b| {
        b.iter(|| {
            for i in 0..SLOTS {
                *mutexes[black_box(i)].lock() += 2;
            }
        });
    });

    group.finish();
}

fn bench_raw_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot_raw");
    group.throughput(Throughput::Elements(SLOTS as u64));

    let lvec: LockingVector<u64> = (0..SLOTS as u64).map(|i| i * 2).collect();
    let mut dest = Vec::new();
    group.bench_function("kovan-lvec", |b| {
        b.iter(|| {
            lvec.snapshot_raw(&mut dest);
            black_box(&dest);
        });
    });

    group.finish();
}

fn bench_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended_single_slot");

    for &threads in THREAD_COUNTS {
        group.throughput(Throughput::Elements((threads * OPS_PER_THREAD) as u64));

        group.bench_with_input(
            BenchmarkId::new("kovan-lvec", threads),
            &threads,
            |b, &threads| {
                b.iter(|| {
                    let lvec = Arc::new(LockingVector::<u64>::new(1));
                    let handles: Vec<_> = (0..threads)
                        .map(|_| {
                            let lvec = lvec.clone();
                            thread::spawn(move || {
                                for _ in 0..OPS_PER_THREAD {
                                    let v = lvec.lock_and_read(0);
                                    lvec.write_and_unlock(0, v + 2);
                                }
                            })
                        })
                        .collect();
                    for h in handles {
                        h.join().unwrap();
                    }
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("parking_lot", threads),
            &threads,
            |b, &threads| {
                b.iter(|| {
                    let m = Arc::new(Mutex::new(0u64));
                    let handles: Vec<_> = (0..threads)
                        .map(|_| {
                            let m = m.clone();
                            thread::spawn(move || {
                                for _ in 0..OPS_PER_THREAD {
                                    *m.lock() += 2;
                                }
                            })
                        })
                        .collect();
                    for h in handles {
                        h.join().unwrap();
                    }
                });
            },
        );
    }

    group.finish();
}

fn bench_spread(c: &mut Criterion) {
    let mut group = c.benchmark_group("spread_slots");

    for &threads in THREAD_COUNTS {
        group.throughput(Throughput::Elements((threads * OPS_PER_THREAD) as u64));

        group.bench_with_input(
            BenchmarkId::new("kovan-lvec", threads),
            &threads,
            |b, &threads| {
                let lvec = Arc::new(LockingVector::<u64>::new(SLOTS));
                b.iter(|| {
                    let handles: Vec<_> = (0..threads)
                        .map(|t| {
                            let lvec = lvec.clone();
                            thread::spawn(move || {
                                for n in 0..OPS_PER_THREAD {
                                    let i = (n * 7 + t * 131) % SLOTS;
                                    let mut slot = lvec.lock_guard(i);
                                    *slot += 2;
                                }
                            })
                        })
                        .collect();
                    for h in handles {
                        h.join().unwrap();
                    }
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("parking_lot", threads),
            &threads,
            |b, &threads| {
                let mutexes: Arc<Vec<Mutex<u64>>> =
                    Arc::new((0..SLOTS).map(|_| Mutex::new(0)).collect());
                b.iter(|| {
                    let handles: Vec<_> = (0..threads)
                        .map(|t| {
                            let mutexes = mutexes.clone();
                            thread::spawn(move || {
                                for n in 0..OPS_PER_THREAD {
                                    let i = (n * 7 + t * 131) % SLOTS;
                                    *mutexes[i].lock() += 2;
                                }
                            })
                        })
                        .collect();
                    for h in handles {
                        h.join().unwrap();
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_uncontended,
    bench_raw_snapshot,
    bench_contended,
    bench_spread
);
criterion_main!(benches);

//! Lock fast-path and contention benchmarks.

use std::sync::{Arc, Barrier};
use std::time::{Duration, Instant};

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use frankenpthread_abi::sync_abi::{pthread_mutex_lock, pthread_mutex_unlock};
use frankenpthread_abi::types::PTHREAD_MUTEX_INITIALIZER;
use frankenpthread_core::pthread::{Mutex, SpinLock, SpinRwLock};

fn bench_uncontended(c: &mut Criterion) {
    let mut group = c.benchmark_group("uncontended");
    group.throughput(Throughput::Elements(1));

    let mutex = Mutex::new();
    group.bench_function("mutex", |b| {
        b.iter(|| {
            mutex.lock().unwrap();
            mutex.unlock().unwrap();
        });
    });

    let mut raw = PTHREAD_MUTEX_INITIALIZER;
    group.bench_function("pthread_mutex_abi", |b| {
        b.iter(|| unsafe {
            black_box(pthread_mutex_lock(&mut raw));
            black_box(pthread_mutex_unlock(&mut raw));
        });
    });

    let spin = SpinLock::new();
    group.bench_function("spinlock", |b| {
        b.iter(|| {
            spin.lock();
            spin.unlock().unwrap();
        });
    });

    let rw = SpinRwLock::new();
    group.bench_function("spin_rwlock_read", |b| {
        b.iter(|| {
            rw.read_lock();
            rw.read_unlock().unwrap();
        });
    });

    let baseline = parking_lot::Mutex::new(0u64);
    group.bench_function("parking_lot_baseline", |b| {
        b.iter(|| {
            *baseline.lock() += 1;
        });
    });
    group.finish();
}

/// Time `iters` lock/unlock pairs spread over `threads` threads.
fn contended<L, A, R>(threads: usize, iters: u64, lock: Arc<L>, acquire: A, release: R) -> Duration
where
    L: Send + Sync + 'static,
    A: Fn(&L) + Send + Sync + Copy + 'static,
    R: Fn(&L) + Send + Sync + Copy + 'static,
{
    let per_thread = iters / threads as u64 + 1;
    let start_line = Arc::new(Barrier::new(threads + 1));
    let workers: Vec<_> = (0..threads)
        .map(|_| {
            let lock = Arc::clone(&lock);
            let start_line = Arc::clone(&start_line);
            std::thread::spawn(move || {
                start_line.wait();
                for _ in 0..per_thread {
                    acquire(&lock);
                    release(&lock);
                }
            })
        })
        .collect();
    start_line.wait();
    let start = Instant::now();
    for w in workers {
        w.join().unwrap();
    }
    start.elapsed()
}

fn bench_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended");
    group.sample_size(20);

    for &threads in &[2usize, 4, 8] {
        group.bench_with_input(BenchmarkId::new("mutex", threads), &threads, |b, &n| {
            b.iter_custom(|iters| {
                contended(
                    n,
                    iters,
                    Arc::new(Mutex::new()),
                    |m: &Mutex| m.lock().unwrap(),
                    |m: &Mutex| m.unlock().unwrap(),
                )
            });
        });
        group.bench_with_input(BenchmarkId::new("spinlock", threads), &threads, |b, &n| {
            b.iter_custom(|iters| {
                contended(
                    n,
                    iters,
                    Arc::new(SpinLock::new()),
                    SpinLock::lock,
                    |s: &SpinLock| s.unlock().unwrap(),
                )
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_uncontended, bench_contended);
criterion_main!(benches);

//! Semaphore benchmarks.

use std::sync::Arc;
use std::time::Instant;

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use frankenpthread_core::pthread::{Barrier, BarrierAttr};
use frankenpthread_core::semaphore::Semaphore;

fn bench_post_wait(c: &mut Criterion) {
    let mut group = c.benchmark_group("semaphore");
    group.throughput(Throughput::Elements(1));

    let sem = Semaphore::new(false, 0).unwrap();
    group.bench_function("post_wait", |b| {
        b.iter(|| {
            sem.post().unwrap();
            sem.wait().unwrap();
        });
    });

    group.bench_function("trywait_empty", |b| {
        b.iter(|| black_box(sem.try_wait().is_err()));
    });

    group.bench_function("ping_pong", |b| {
        b.iter_custom(|iters| {
            let ping = Arc::new(Semaphore::new(false, 0).unwrap());
            let pong = Arc::new(Semaphore::new(false, 0).unwrap());
            let peer = {
                let ping = Arc::clone(&ping);
                let pong = Arc::clone(&pong);
                std::thread::spawn(move || {
                    for _ in 0..iters {
                        ping.wait().unwrap();
                        pong.post().unwrap();
                    }
                })
            };
            let start = Instant::now();
            for _ in 0..iters {
                ping.post().unwrap();
                pong.wait().unwrap();
            }
            let elapsed = start.elapsed();
            peer.join().unwrap();
            elapsed
        });
    });
    group.finish();
}

fn bench_barrier_single_party(c: &mut Criterion) {
    let barrier = Barrier::new(1, &BarrierAttr::default()).unwrap();
    c.bench_function("barrier_single_party", |b| {
        b.iter(|| black_box(barrier.wait().unwrap()));
    });
}

criterion_group!(benches, bench_post_wait, bench_barrier_single_party);
criterion_main!(benches);

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use thunkpool::{DispatcherThreadPool, RayonThreadPool, SharedQueueThreadPool, ThreadPool};

const TASK_NUM: usize = 1000;

fn schedule_and_wait<P: ThreadPool>(pool: &P) {
    let counter = Arc::new(AtomicUsize::new(0));
    for _ in 0..TASK_NUM {
        let counter = Arc::clone(&counter);
        pool.schedule(move || {
            counter.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();
    }
    pool.wait();
    assert_eq!(counter.load(Ordering::SeqCst), TASK_NUM);
}

fn trivial_tasks(c: &mut Criterion) {
    let mut group = c.benchmark_group("trivial_tasks");

    for threads in [1u32, 4, 8, 16] {
        group.bench_with_input(BenchmarkId::new("shared", threads), &threads, |b, &threads| {
            let pool = SharedQueueThreadPool::new(threads).unwrap();
            b.iter(|| schedule_and_wait(&pool));
        });

        group.bench_with_input(
            BenchmarkId::new("dispatcher", threads),
            &threads,
            |b, &threads| {
                let pool = DispatcherThreadPool::new(threads).unwrap();
                b.iter(|| schedule_and_wait(&pool));
            },
        );

        group.bench_with_input(BenchmarkId::new("rayon", threads), &threads, |b, &threads| {
            let pool = RayonThreadPool::new(threads).unwrap();
            b.iter(|| schedule_and_wait(&pool));
        });
    }

    group.finish();
}

fn pool_startup(c: &mut Criterion) {
    let mut group = c.benchmark_group("startup");

    group.bench_function("shared", |b| {
        b.iter(|| SharedQueueThreadPool::new(8).unwrap());
    });

    group.bench_function("dispatcher", |b| {
        b.iter(|| DispatcherThreadPool::new(8).unwrap());
    });

    group.finish();
}

criterion_group!(benches, trivial_tasks, pool_startup);
criterion_main!(benches);

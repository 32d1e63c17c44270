//! Basic benchmarks for the `slot_pool` crate.
#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;
use std::iter;
use std::num::NonZero;
use std::time::Instant;

use criterion::{Criterion, criterion_group, criterion_main};
use slot_pool::SlotPool;

criterion_group!(benches, entrypoint);
criterion_main!(benches);

type TestItem = usize;
const TEST_VALUE: TestItem = 1024;

const CAPACITY: NonZero<u32> = NonZero::new(1024).unwrap();

// For benchmarks that need a fresh pool per iteration.
const SMALL_CAPACITY: NonZero<u32> = NonZero::new(4).unwrap();

fn reserved_pool(capacity: NonZero<u32>) -> SlotPool<TestItem> {
    SlotPool::builder().capacity(capacity).reserve().build()
}

fn entrypoint(c: &mut Criterion) {
    let mut group = c.benchmark_group("sp_basic");

    group.bench_function("reserve", |b| {
        b.iter_custom(|iters| {
            let mut pools = iter::repeat_with(|| SlotPool::<TestItem>::with_capacity(SMALL_CAPACITY))
                .take(usize::try_from(iters).unwrap())
                .collect::<Vec<_>>();

            let start = Instant::now();

            for pool in &mut pools {
                black_box(pool.reserve()).unwrap();
            }

            start.elapsed()
        });
    });

    group.bench_function("insert_first", |b| {
        b.iter_custom(|iters| {
            let mut pools = iter::repeat_with(|| reserved_pool(SMALL_CAPACITY))
                .take(usize::try_from(iters).unwrap())
                .collect::<Vec<_>>();

            let start = Instant::now();

            for pool in &mut pools {
                _ = black_box(pool.insert(black_box(TEST_VALUE)));
            }

            start.elapsed()
        });
    });

    group.bench_function("insert_remove_churn", |b| {
        let mut pool = reserved_pool(CAPACITY);

        // Half full, so removal swaps entries around rather than hitting the last one.
        for _ in 0..CAPACITY.get() / 2 {
            _ = pool.insert(TEST_VALUE).unwrap();
        }

        b.iter(|| {
            let handle = pool.insert(black_box(TEST_VALUE)).unwrap();
            pool.remove(black_box(handle)).unwrap();
        });
    });

    group.bench_function("remove_from_front", |b| {
        b.iter_custom(|iters| {
            let mut pools = iter::repeat_with(|| {
                let mut pool = reserved_pool(SMALL_CAPACITY);
                let first = pool.insert(TEST_VALUE).unwrap();

                for _ in 1..SMALL_CAPACITY.get() {
                    _ = pool.insert(TEST_VALUE).unwrap();
                }

                (pool, first)
            })
            .take(usize::try_from(iters).unwrap())
            .collect::<Vec<_>>();

            let start = Instant::now();

            for (pool, first) in &mut pools {
                _ = black_box(pool.remove(*first));
            }

            start.elapsed()
        });
    });

    group.bench_function("get_handle", |b| {
        let mut pool = reserved_pool(CAPACITY);
        let handle = pool.insert(TEST_VALUE).unwrap();

        b.iter(|| black_box(pool.get(black_box(handle))));
    });

    group.bench_function("get_stale_handle", |b| {
        let mut pool = reserved_pool(CAPACITY);
        let stale = pool.insert(TEST_VALUE).unwrap();
        pool.remove(stale).unwrap();
        _ = pool.insert(TEST_VALUE).unwrap();

        b.iter(|| black_box(pool.get(black_box(stale))));
    });

    group.bench_function("iter_full", |b| {
        let mut pool = reserved_pool(CAPACITY);

        while !pool.is_full() {
            _ = pool.insert(TEST_VALUE).unwrap();
        }

        b.iter(|| black_box(pool.iter().sum::<usize>()));
    });

    group.finish();
}

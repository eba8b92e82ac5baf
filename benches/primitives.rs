use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ferrous_lease::{BoxError, Pool, SingleFlightLazy, TtlCache};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

// ===== Micro Benchmarks =====

fn bench_lazy_hit(c: &mut Criterion) {
    let lazy = SingleFlightLazy::new(42u64, |n: &u64| Ok::<_, BoxError>(*n * 2));
    let _ = lazy.value().unwrap();

    c.bench_function("lazy_resolved_hit", |b| {
        b.iter(|| {
            let v = lazy.value().unwrap();
            black_box(v);
        })
    });
}

fn bench_lazy_cold(c: &mut Criterion) {
    c.bench_function("lazy_cold_resolve", |b| {
        b.iter_batched(
            || SingleFlightLazy::new((), |_: &()| Ok::<_, BoxError>((0..1000u64).collect::<Vec<_>>())),
            |lazy| {
                let v = lazy.value().unwrap();
                black_box(v.len());
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_pool_take_release(c: &mut Criterion) {
    let pool = Pool::builder(|| Vec::<u8>::with_capacity(4096))
        .max_items(4)
        .on_release(|buf: &mut Vec<u8>| buf.clear())
        .build();

    c.bench_function("pool_take_release_warm", |b| {
        b.iter(|| {
            let mut buf = pool.take().unwrap();
            buf.push(1);
            black_box(buf.len());
        })
    });
}

fn bench_pool_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_contended");
    for threads in [2usize, 4, 8] {
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            let pool = Arc::new(Pool::builder(|| 0u64).max_items(2).build());
            b.iter(|| {
                let handles: Vec<_> = (0..threads)
                    .map(|_| {
                        let pool = Arc::clone(&pool);
                        thread::spawn(move || {
                            for _ in 0..100 {
                                let mut item = pool.take().unwrap();
                                *item += 1;
                            }
                        })
                    })
                    .collect();
                for handle in handles {
                    handle.join().unwrap();
                }
            })
        });
    }
    group.finish();
}

fn bench_ttl_hit(c: &mut Criterion) {
    let cache = TtlCache::new(|| "snapshot".to_string(), Duration::from_secs(3600));
    let _ = cache.value();

    c.bench_function("ttl_cache_fresh_hit", |b| {
        b.iter(|| {
            black_box(cache.value());
        })
    });
}

criterion_group!(
    benches,
    bench_lazy_hit,
    bench_lazy_cold,
    bench_pool_take_release,
    bench_pool_contended,
    bench_ttl_hit
);
criterion_main!(benches);

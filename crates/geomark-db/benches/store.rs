//! Write and read throughput of the in-memory marker store.
//!
//! `put` upserts fresh markers with 100-letter names scattered over a
//! 1000 x 1000 plane; `query` runs random rectangles against a store
//! pre-loaded with the same kind of data.

#![allow(clippy::unwrap_used, missing_docs)]

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use geomark_db::MarkerStore;
use geomark_types::{Coordinates, Marker, Rect};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::runtime::Runtime;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

fn random_name(rng: &mut StdRng, len: usize) -> String {
    (0..len)
        .filter_map(|_| LETTERS.get(rng.random_range(0..LETTERS.len())))
        .map(|&b| char::from(b))
        .collect()
}

fn random_point(rng: &mut StdRng) -> Coordinates {
    let x = f64::from(rng.random_range(0..1000_u32)) + rng.random::<f64>();
    let y = f64::from(rng.random_range(0..1000_u32)) + rng.random::<f64>();
    Coordinates::new(x, y)
}

fn random_marker(rng: &mut StdRng) -> Marker {
    let name = random_name(rng, 100);
    Marker::unassigned(random_point(rng), name)
}

fn random_rect(rng: &mut StdRng) -> Rect {
    let x0 = f64::from(rng.random_range(0..1000_u32)) + rng.random::<f64>();
    let y0 = f64::from(rng.random_range(0..1000_u32)) + rng.random::<f64>();
    let x1 = f64::from(rng.random_range(0..360_u32)) + rng.random::<f64>();
    let y1 = f64::from(rng.random_range(0..360_u32)) + rng.random::<f64>();
    Rect::new(x0, y0, x1, y1).unwrap()
}

fn preloaded_store(rt: &Runtime, count: usize, rng: &mut StdRng) -> MarkerStore {
    let store = MarkerStore::in_memory();
    rt.block_on(async {
        for _ in 0..count {
            store.put(random_marker(rng)).await.unwrap();
        }
    });
    store
}

fn bench_put(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut rng = StdRng::seed_from_u64(1);
    let mut group = c.benchmark_group("memory_store");
    group.throughput(Throughput::Elements(1));

    let store = &MarkerStore::in_memory();
    group.bench_function("put_new", |b| {
        b.to_async(&rt).iter_batched(
            || random_marker(&mut rng),
            |marker| async move { black_box(store.put(marker).await.unwrap()) },
            BatchSize::SmallInput,
        );
    });

    let store = &preloaded_store(&rt, 10_000, &mut rng);
    let stored = rt
        .block_on(store.query(&Rect::new(0.0, 0.0, 1000.0, 1000.0).unwrap()))
        .unwrap();
    group.bench_function("put_replace", |b| {
        b.to_async(&rt).iter_batched(
            || {
                let target = stored.get(rng.random_range(0..stored.len())).unwrap();
                target.moved_to(random_point(&mut rng))
            },
            |marker| async move { black_box(store.put(marker).await.unwrap()) },
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

fn bench_query(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut rng = StdRng::seed_from_u64(2);
    let mut group = c.benchmark_group("memory_store");

    for &n in &[1_000_usize, 10_000, 100_000] {
        let store = &preloaded_store(&rt, n, &mut rng);
        group.bench_function(format!("query_random_rect_n{n}"), |b| {
            b.to_async(&rt).iter_batched(
                || random_rect(&mut rng),
                |rect| async move { black_box(store.query(&rect).await.unwrap().len()) },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_put, bench_query);
criterion_main!(benches);

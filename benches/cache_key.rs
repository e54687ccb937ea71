use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, SamplingMode, Throughput};
use sqlmapper::cache::{Cache, CacheKey, PerpetualCache};
use sqlmapper::Record;
use std::sync::Arc;

const SQL: &str = "SELECT * FROM author WHERE id = ? AND name = ?";

fn record(fields: usize, seed: i64) -> Record {
    let mut r = Record::new();
    for i in 0..fields { r.insert(format!("field{i}"), seed.wrapping_mul(31).wrapping_add(i as i64)); }
    r
}

fn bench_cache_key(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_key");
    group.sampling_mode(SamplingMode::Flat);
    group.sample_size(50);

    group.bench_function("scalar", |b| {
        b.iter(|| criterion::black_box(CacheKey::for_query("author.byId", SQL, &42i64, "development").expect("key")));
    });

    for &fields in &[2usize, 8, 32] {
        let param = record(fields, 7);
        group.throughput(Throughput::Elements(fields as u64));
        group.bench_with_input(BenchmarkId::new("record", fields.to_string()), &fields, |b, _| {
            b.iter(|| criterion::black_box(CacheKey::for_query("author.search", SQL, &param, "development").expect("key")));
        });
    }

    // Lookups against a warm cache
    let n = 10_000i64;
    let cache = PerpetualCache::new("author");
    let keys: Vec<CacheKey> = (0..n)
        .map(|i| CacheKey::for_query("author.byId", SQL, &i, "development").expect("key"))
        .collect();
    for k in &keys { cache.put_object(k.clone(), Arc::new(vec![0i64])); }
    group.throughput(Throughput::Elements(n as u64));
    group.bench_function("perpetual_get", |b| {
        b.iter(|| {
            let mut hits = 0usize;
            for k in &keys { if cache.get_object(k).is_some() { hits += 1; } }
            criterion::black_box(hits);
        });
    });
    group.finish();
}

criterion_group!(benches, bench_cache_key);
criterion_main!(benches);

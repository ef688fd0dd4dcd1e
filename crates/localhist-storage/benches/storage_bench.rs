//! Storage benchmarks for local history content storage.
//!
//! Benchmarks:
//! - Blob writes through the full stack at various sizes
//! - Cached and uncached blob reads
//! - Contended access from several threads

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use localhist_storage::{
    create_content_storage, CachingStorage, CompressingStorage, CompressionLevel,
    MemoryRecordStore, RecordBlobStorage, ThreadSafeStorage,
};
use std::hint::black_box;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

/// Generate test data of specified size
fn generate_data(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}

fn memory_stack(cache_capacity: usize) -> ThreadSafeStorage {
    let storage = RecordBlobStorage::new(MemoryRecordStore::new());
    let storage = CachingStorage::new(storage, cache_capacity, 100 * 1024);
    let storage = CompressingStorage::new(storage, CompressionLevel::Fast);
    ThreadSafeStorage::new(storage)
}

/// Benchmark blob writes to an on-disk stack
fn bench_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("content_store");

    // 1KB, 10KB, 100KB, 1MB
    for size in [1_024, 10_240, 102_400, 1_048_576].iter() {
        group.throughput(Throughput::Bytes(*size as u64));

        group.bench_with_input(BenchmarkId::new("store", size), size, |b, &size| {
            let dir = TempDir::new().unwrap();
            let storage = create_content_storage(dir.path()).unwrap();
            let data = generate_data(size);

            b.iter(|| black_box(storage.store(&data).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark blob reads with and without cache hits
fn bench_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("content_load");

    for size in [1_024, 10_240, 102_400].iter() {
        group.throughput(Throughput::Bytes(*size as u64));

        group.bench_with_input(BenchmarkId::new("cached", size), size, |b, &size| {
            let storage = memory_stack(50);
            let id = storage.store(&generate_data(size)).unwrap();

            b.iter(|| black_box(storage.load(id).unwrap()));
        });

        group.bench_with_input(BenchmarkId::new("uncached", size), size, |b, &size| {
            // Capacity 1 with a second blob in between forces a miss every time.
            let storage = memory_stack(1);
            let first = storage.store(&generate_data(size)).unwrap();
            let second = storage.store(&generate_data(size / 2)).unwrap();

            b.iter(|| {
                black_box(storage.load(first).unwrap());
                black_box(storage.load(second).unwrap());
            });
        });
    }

    group.finish();
}

/// Benchmark contended access through the single lock
fn bench_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("content_contended");

    for num_threads in [2, 4, 8].iter() {
        group.bench_with_input(
            BenchmarkId::new("threads", num_threads),
            num_threads,
            |b, &num_threads| {
                let storage = Arc::new(memory_stack(50));
                let ids: Arc<Vec<_>> = Arc::new(
                    (0..100)
                        .map(|i| storage.store(format!("blob-{i}").as_bytes()).unwrap())
                        .collect(),
                );

                b.iter(|| {
                    let handles: Vec<_> = (0..num_threads)
                        .map(|t| {
                            let storage = Arc::clone(&storage);
                            let ids = Arc::clone(&ids);
                            thread::spawn(move || {
                                for i in 0..50 {
                                    let id = ids[(t * 50 + i) % ids.len()];
                                    black_box(storage.load(id).unwrap());
                                }
                                black_box(storage.store(b"written under contention").unwrap());
                            })
                        })
                        .collect();

                    for handle in handles {
                        handle.join().unwrap();
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_store, bench_load, bench_contended);
criterion_main!(benches);

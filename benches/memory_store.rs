//! 内存存储性能基准测试

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use futures_util::StreamExt;
use shortener::storage::{MemoryStore, StoreBackend};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

async fn populated_store(owners: usize, per_owner: usize) -> MemoryStore {
    let store = MemoryStore::new();
    for owner in 0..owners {
        for i in 0..per_owner {
            let id = format!("o{}_{}", owner, i);
            store
                .store_url(&id, &format!("https://{}.example.com", id), &format!("owner{}", owner))
                .await
                .unwrap();
        }
    }
    store
}

/// 单线程写入吞吐量（每次迭代都是新 URL）
fn bench_store_url(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = &MemoryStore::new();
    let counter = &AtomicUsize::new(0);

    c.bench_function("store_url/unique", |b| {
        b.to_async(&rt).iter(|| async move {
            let n = counter.fetch_add(1, Ordering::Relaxed);
            store
                .store_url(&format!("id{}", n), &format!("https://{}.example.com", n), "owner")
                .await
                .unwrap();
        });
    });
}

/// 热点读取
fn bench_load_url(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = &rt.block_on(populated_store(10, 1000));

    c.bench_function("load_url/hit", |b| {
        b.to_async(&rt).iter(|| async move {
            store.load_url("o5_500").await.unwrap();
        });
    });
}

/// 按用户列出，map 大小不同
fn bench_listing(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("load_urls_by_user");

    for owners in [10, 100] {
        let store = &rt.block_on(populated_store(owners, 100));
        group.throughput(Throughput::Elements(100));
        group.bench_with_input(BenchmarkId::new("owners", owners), &owners, |b, _| {
            b.to_async(&rt).iter(|| async move {
                let count = store.load_urls_by_user("owner3").count().await;
                assert_eq!(count, 100);
            });
        });
    }

    group.finish();
}

/// 并发写入同一个 map
fn bench_concurrent_store(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("store_url/concurrent");

    for num_tasks in [2, 4, 8] {
        group.throughput(Throughput::Elements(1000));
        group.bench_with_input(
            BenchmarkId::new("tasks", num_tasks),
            &num_tasks,
            |b, &num_tasks| {
                b.to_async(&rt).iter(|| async {
                    let store = Arc::new(MemoryStore::new());
                    let mut handles = vec![];

                    for task in 0..num_tasks {
                        let store = Arc::clone(&store);
                        handles.push(tokio::spawn(async move {
                            for i in 0..1000 / num_tasks {
                                let id = format!("t{}_{}", task, i);
                                let _ = store
                                    .store_url(&id, &format!("https://{}.example.com", id), "owner")
                                    .await;
                            }
                        }));
                    }

                    for handle in handles {
                        handle.await.unwrap();
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_store_url,
    bench_load_url,
    bench_listing,
    bench_concurrent_store
);
criterion_main!(benches);

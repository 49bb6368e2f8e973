//! In-memory backend tests

use futures_util::StreamExt;
use shortener::storage::{FileSnapshot, MemoryStore, StoreBackend, UrlPair, UrlRecord};
use std::collections::HashSet;
use std::sync::Arc;
use tempfile::TempDir;

fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

async fn listing(store: &MemoryStore, owner: &str) -> HashSet<UrlPair> {
    store
        .load_urls_by_user(owner)
        .map(|item| item.unwrap())
        .collect()
        .await
}

#[tokio::test]
async fn test_store_load_and_delete() {
    let store = MemoryStore::new();
    store
        .store_url("abc123", "http://example.com", "user1")
        .await
        .unwrap();
    assert_eq!(
        store.load_url("abc123").await.unwrap().as_deref(),
        Some("http://example.com")
    );

    store.delete_urls("user1", &ids(&["abc123"])).await.unwrap();
    // 内存存储同步删除，无需 flush
    let err = store.load_url("abc123").await.unwrap_err();
    assert!(err.is_gone());
    assert_eq!(store.count_urls().await.unwrap(), 1);
}

#[tokio::test]
async fn test_listing_is_scoped_to_owner() {
    let store = MemoryStore::new();
    store.store_url("a", "http://a.com", "u1").await.unwrap();
    store.store_url("b", "http://b.com", "u1").await.unwrap();
    store.store_url("c", "http://c.com", "u2").await.unwrap();
    store.delete_urls("u1", &ids(&["b"])).await.unwrap();

    let pairs = listing(&store, "u1").await;
    assert_eq!(pairs.len(), 1);
    assert!(pairs.contains(&UrlPair {
        id: "a".to_string(),
        original_url: "http://a.com".to_string(),
    }));
    assert!(listing(&store, "nobody").await.is_empty());
}

#[tokio::test]
async fn test_delete_ignores_other_owners() {
    let store = MemoryStore::new();
    store.store_url("a1", "http://a1.com", "alice").await.unwrap();
    store.store_url("b1", "http://b1.com", "bob").await.unwrap();

    store.delete_urls("alice", &ids(&["b1"])).await.unwrap();
    assert!(store.load_url("b1").await.unwrap().is_some());
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let store = MemoryStore::new();
    store.store_url("a", "http://a.com", "u1").await.unwrap();
    store.store_url("b", "http://b.com", "u1").await.unwrap();

    let batch = ids(&["a", "missing", "a"]);
    store.delete_urls("u1", &batch).await.unwrap();
    store.delete_urls("u1", &batch).await.unwrap();

    assert!(store.load_url("a").await.unwrap_err().is_gone());
    assert!(store.load_url("b").await.unwrap().is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_same_url_single_winner() {
    let store = Arc::new(MemoryStore::new());

    let mut handles = Vec::new();
    for i in 0..16 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .store_url(&format!("id{}", i), "http://contested.com", &format!("u{}", i))
                .await
        }));
    }

    let mut winners = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => winners += 1,
            Err(e) => assert!(e.is_conflict()),
        }
    }
    assert_eq!(winners, 1);
    assert_eq!(store.count_urls().await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_listing_while_writing() {
    let store = Arc::new(MemoryStore::new());
    for i in 0..300 {
        store
            .store_url(&format!("id{}", i), &format!("http://{}.com", i), "u1")
            .await
            .unwrap();
    }

    let writer = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            for i in 300..600 {
                store
                    .store_url(&format!("id{}", i), &format!("http://{}.com", i), "u1")
                    .await
                    .unwrap();
            }
        })
    };

    let seen = listing(&store, "u1").await;
    writer.await.unwrap();

    // 扫描开始前已存在的记录一定可见
    assert!(seen.len() >= 300);
    assert_eq!(store.count_urls().await.unwrap(), 600);
}

#[tokio::test]
async fn test_snapshot_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("links.csv");

    {
        let store = MemoryStore::open(path.to_str().unwrap()).unwrap();
        store.store_url("a", "http://a.com", "u1").await.unwrap();
        store
            .store_url("b", "http://b.com/?x=1,2", "u2")
            .await
            .unwrap();
        store.delete_urls("u1", &ids(&["a"])).await.unwrap();
        store.store_session("u1", "opaque").await.unwrap();
        store.flush().await.unwrap();
    }

    let mut records = FileSnapshot::new(&path).load().unwrap();
    records.sort_by(|l, r| l.id.cmp(&r.id));
    let mut deleted = UrlRecord::new("a", "http://a.com", "u1");
    deleted.deleted = true;
    assert_eq!(
        records,
        vec![deleted, UrlRecord::new("b", "http://b.com/?x=1,2", "u2")]
    );

    let reopened = MemoryStore::open(path.to_str().unwrap()).unwrap();
    assert_eq!(reopened.snapshot_path(), Some(path.as_path()));
    assert!(reopened.load_url("a").await.unwrap_err().is_gone());
    assert_eq!(
        reopened.load_url("b").await.unwrap().as_deref(),
        Some("http://b.com/?x=1,2")
    );
    // 会话不落盘
    assert_eq!(reopened.load_user("opaque").await.unwrap(), None);
    // 重新加载后 URL 索引依然生效
    assert!(
        reopened
            .store_url("c", "http://b.com/?x=1,2", "u3")
            .await
            .unwrap_err()
            .is_conflict()
    );
}

#[tokio::test]
async fn test_corrupt_snapshot_fails_open() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("links.csv");
    std::fs::write(&path, "only,two\n").unwrap();

    let err = MemoryStore::open(path.to_str().unwrap()).err().unwrap();
    assert_eq!(err.code(), "E008");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_flush_keeps_latest_records() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("links.csv");
    let store = Arc::new(MemoryStore::open(path.to_str().unwrap()).unwrap());

    for i in 0..500 {
        store
            .store_url(&format!("seed{}", i), &format!("http://seed{}.com", i), "u0")
            .await
            .unwrap();
    }

    for round in 0..50 {
        let mut handles = vec![];
        for task in 0..4 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let id = format!("r{}_{}", round, task);
                store
                    .store_url(&id, &format!("http://{}.com", id), "u1")
                    .await
                    .unwrap();
                store.flush().await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // 每个 flush 返回后，文件中必须包含它之前写入的记录
        let on_disk = FileSnapshot::new(&path).load().unwrap().len() as u64;
        assert_eq!(on_disk, store.count_urls().await.unwrap(), "round {}", round);
    }
}

#[test]
fn test_listing_created_outside_runtime() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = MemoryStore::new();
    rt.block_on(store.store_url("a", "http://a.com", "u1")).unwrap();

    // 流在运行时之外构造，轮询时才启动生产者
    let listing = store.load_urls_by_user("u1");
    let pairs: Vec<_> = rt.block_on(listing.collect());
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].as_ref().unwrap().id, "a");
}

//! In-memory storage backend
//!
//! Records live in a sharded `DashMap` keyed by short id, with a secondary
//! `url -> id` index so that registering the same URL twice is a conflict.
//! Sessions are kept in a separate map and are never persisted.
//!
//! When a snapshot path is configured, the map is seeded from the CSV file
//! on construction and written back on every `flush`.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use super::StoreBackend;
use super::models::{UrlPair, UrlRecord};
use super::snapshot::FileSnapshot;
use super::stream::{ListingSender, UrlStream, listing_channel, spawn_listing};
use crate::errors::{Result, ShortenerError};

#[derive(Debug, Clone)]
struct StoredUrl {
    url: String,
    owner_id: String,
    deleted: bool,
}

#[derive(Default)]
pub struct MemoryStore {
    records: Arc<DashMap<String, StoredUrl>>,
    /// url -> id，保证同一 URL 只注册一次
    url_index: DashMap<String, String>,
    /// token -> owner id
    sessions: DashMap<String, String>,
    snapshot: Option<Arc<FileSnapshot>>,
}

fn collect_records(records: &DashMap<String, StoredUrl>) -> Vec<UrlRecord> {
    records
        .iter()
        .map(|entry| UrlRecord {
            id: entry.key().clone(),
            original_url: entry.url.clone(),
            owner_id: entry.owner_id.clone(),
            deleted: entry.deleted,
        })
        .collect()
}

async fn produce_owner_urls(
    records: Arc<DashMap<String, StoredUrl>>,
    owner_id: String,
    tx: ListingSender,
) {
    let keys: Vec<String> = records.iter().map(|entry| entry.key().clone()).collect();

    for key in keys {
        let candidate = records.get(&key).and_then(|entry| {
            (entry.owner_id == owner_id && !entry.deleted).then(|| UrlPair {
                id: key.clone(),
                original_url: entry.url.clone(),
            })
        });

        if let Some(pair) = candidate
            && tx.send(Ok(pair)).await.is_err()
        {
            trace!("Listing for {} cancelled by consumer", owner_id);
            return;
        }
    }
}

impl MemoryStore {
    /// 纯内存存储（进程退出即丢失）
    pub fn new() -> Self {
        Self::default()
    }

    /// 路径为空时等同于 `new()`，否则从快照文件加载
    pub fn open(file_storage_path: &str) -> Result<Self> {
        if file_storage_path.is_empty() {
            info!("Memory storage initialized without snapshot file");
            return Ok(Self::new());
        }
        Self::with_snapshot(FileSnapshot::new(file_storage_path))
    }

    pub fn with_snapshot(snapshot: FileSnapshot) -> Result<Self> {
        let mut store = Self::default();

        let records = snapshot.load()?;
        let count = records.len();
        for record in records {
            store.url_index.insert(record.original_url.clone(), record.id.clone());
            store.records.insert(
                record.id,
                StoredUrl {
                    url: record.original_url,
                    owner_id: record.owner_id,
                    deleted: record.deleted,
                },
            );
        }

        info!(
            "Memory storage initialized from {} ({} records)",
            snapshot.path().display(),
            count
        );
        store.snapshot = Some(Arc::new(snapshot));
        Ok(store)
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot.as_deref().map(FileSnapshot::path)
    }

    /// 在后台任务中扫描属于 owner 且未删除的记录
    ///
    /// 先取 key 快照，再逐条短暂加锁读取；发送时不持有任何分片锁，
    /// 因此消费者可以在扫描过程中修改 map。接收端被丢弃后扫描随即停止。
    fn scan_owner(&self, owner_id: &str) -> mpsc::Receiver<Result<UrlPair>> {
        let (tx, rx) = listing_channel();
        tokio::spawn(produce_owner_urls(
            Arc::clone(&self.records),
            owner_id.to_string(),
            tx,
        ));
        rx
    }
}

#[async_trait]
impl StoreBackend for MemoryStore {
    async fn store_url(&self, id: &str, url: &str, owner_id: &str) -> Result<()> {
        // 固定加锁顺序：先 url 索引，再记录表
        match self.url_index.entry(url.to_string()) {
            Entry::Occupied(existing) => Err(ShortenerError::conflict(format!(
                "URL 已被缩短: {} (id: {})",
                url,
                existing.get()
            ))),
            Entry::Vacant(slot) => match self.records.entry(id.to_string()) {
                Entry::Occupied(_) => Err(ShortenerError::conflict(format!(
                    "短码已存在: {}",
                    id
                ))),
                Entry::Vacant(record) => {
                    record.insert(StoredUrl {
                        url: url.to_string(),
                        owner_id: owner_id.to_string(),
                        deleted: false,
                    });
                    slot.insert(id.to_string());
                    debug!("Stored url {} -> {}", id, url);
                    Ok(())
                }
            },
        }
    }

    async fn load_url(&self, id: &str) -> Result<Option<String>> {
        match self.records.get(id) {
            Some(entry) if entry.deleted => Err(ShortenerError::gone(format!(
                "URL with id {} is deleted",
                id
            ))),
            Some(entry) => Ok(Some(entry.url.clone())),
            None => Ok(None),
        }
    }

    fn load_urls_by_user(&self, owner_id: &str) -> UrlStream {
        let records = Arc::clone(&self.records);
        let owner_id = owner_id.to_string();
        spawn_listing(move |tx| produce_owner_urls(records, owner_id, tx))
    }

    async fn delete_urls(&self, owner_id: &str, ids: &[String]) -> Result<()> {
        let mut remaining: HashSet<&str> = ids.iter().map(String::as_str).collect();
        if remaining.is_empty() {
            return Ok(());
        }

        let mut candidates = self.scan_owner(owner_id);
        let mut deleted = 0usize;

        while let Some(item) = candidates.recv().await {
            let pair = item?;
            if !remaining.remove(pair.id.as_str()) {
                continue;
            }

            if let Some(mut entry) = self.records.get_mut(&pair.id)
                && entry.owner_id == owner_id
            {
                entry.deleted = true;
                deleted += 1;
            }

            if remaining.is_empty() {
                // 丢弃接收端，生产者随之停止
                break;
            }
        }

        debug!(
            "Marked {} of {} urls deleted for owner {}",
            deleted,
            ids.len(),
            owner_id
        );
        Ok(())
    }

    async fn load_user(&self, token: &str) -> Result<Option<String>> {
        Ok(self.sessions.get(token).map(|owner| owner.value().clone()))
    }

    async fn store_session(&self, owner_id: &str, token: &str) -> Result<()> {
        match self.sessions.entry(token.to_string()) {
            Entry::Occupied(_) => Err(ShortenerError::conflict("会话已存在")),
            Entry::Vacant(slot) => {
                slot.insert(owner_id.to_string());
                Ok(())
            }
        }
    }

    async fn count_users(&self) -> Result<u64> {
        Ok(self.sessions.len() as u64)
    }

    async fn count_urls(&self) -> Result<u64> {
        Ok(self.records.len() as u64)
    }

    async fn flush(&self) -> Result<()> {
        let Some(snapshot) = &self.snapshot else {
            return Ok(());
        };

        let snapshot = Arc::clone(snapshot);
        let records = Arc::clone(&self.records);

        let count = tokio::task::spawn_blocking(move || {
            snapshot.persist_with(|| collect_records(&records))
        })
        .await
        .map_err(|e| ShortenerError::file_operation(format!("快照写入任务失败: {}", e)))??;

        info!("Memory storage flushed {} records to snapshot", count);
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}

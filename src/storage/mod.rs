//! Storage layer
//!
//! `Storage` is the single entry point used by the rest of the service. It
//! dispatches to one backend chosen at construction time: the in-memory
//! store (optionally backed by a CSV snapshot) or the SeaORM relational
//! store.

use async_trait::async_trait;
use futures_util::TryStreamExt;
use tracing::info;

use crate::config::StorageConfig;
use crate::errors::Result;

pub mod backend;
pub mod deletion;
pub mod memory;
pub mod models;
pub mod snapshot;
pub mod stream;

pub use backend::SeaOrmStore;
pub use memory::MemoryStore;
pub use models::{PendingDeletion, ShortUrlPair, UrlPair, UrlRecord};
pub use snapshot::FileSnapshot;
pub use stream::UrlStream;

/// 存储后端需要实现的操作集合
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// URL 或 id 已存在时返回 `Conflict`
    async fn store_url(&self, id: &str, url: &str, owner_id: &str) -> Result<()>;

    /// 不存在返回 `Ok(None)`，已删除返回 `Gone`
    async fn load_url(&self, id: &str) -> Result<Option<String>>;

    /// 一次性、无序的惰性结果流；丢弃即取消
    ///
    /// 构造时不做任何工作，生产者任务在首次轮询时才启动，
    /// 因此必须在 Tokio 运行时中轮询。
    fn load_urls_by_user(&self, owner_id: &str) -> UrlStream;

    async fn delete_urls(&self, owner_id: &str, ids: &[String]) -> Result<()>;

    async fn load_user(&self, token: &str) -> Result<Option<String>>;

    async fn store_session(&self, owner_id: &str, token: &str) -> Result<()>;

    async fn count_users(&self) -> Result<u64>;

    /// 包含已删除的记录
    async fn count_urls(&self) -> Result<u64>;

    async fn flush(&self) -> Result<()>;

    async fn ping(&self) -> Result<()>;

    fn backend_name(&self) -> &str;
}

pub struct Storage {
    backend: Box<dyn StoreBackend>,
}

impl Storage {
    pub fn new(backend: impl StoreBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    pub async fn store_url(&self, id: &str, url: &str, owner_id: &str) -> Result<()> {
        self.backend.store_url(id, url, owner_id).await
    }

    pub async fn load_url(&self, id: &str) -> Result<Option<String>> {
        self.backend.load_url(id).await
    }

    pub fn load_urls_by_user(&self, owner_id: &str) -> UrlStream {
        self.backend.load_urls_by_user(owner_id)
    }

    /// 读完整个列表并用 `make_url` 生成完整短链接
    pub async fn load_by_user<F>(&self, owner_id: &str, make_url: F) -> Result<Vec<ShortUrlPair>>
    where
        F: Fn(&str) -> String,
    {
        self.backend
            .load_urls_by_user(owner_id)
            .map_ok(|pair| ShortUrlPair {
                short_url: make_url(&pair.id),
                original_url: pair.original_url,
            })
            .try_collect()
            .await
    }

    pub async fn delete_urls(&self, owner_id: &str, ids: &[String]) -> Result<()> {
        self.backend.delete_urls(owner_id, ids).await
    }

    pub async fn load_user(&self, token: &str) -> Result<Option<String>> {
        self.backend.load_user(token).await
    }

    pub async fn store_session(&self, owner_id: &str, token: &str) -> Result<()> {
        self.backend.store_session(owner_id, token).await
    }

    pub async fn count_users(&self) -> Result<u64> {
        self.backend.count_users().await
    }

    pub async fn count_urls(&self) -> Result<u64> {
        self.backend.count_urls().await
    }

    pub async fn flush(&self) -> Result<()> {
        self.backend.flush().await
    }

    pub async fn ping(&self) -> Result<()> {
        self.backend.ping().await
    }

    pub fn backend_name(&self) -> &str {
        self.backend.backend_name()
    }
}

pub struct StorageFactory;

impl StorageFactory {
    /// DSN 为空时使用内存存储，否则按 DSN 推断数据库类型
    pub async fn create(config: &StorageConfig) -> Result<Storage> {
        let storage = if config.database_dsn.is_empty() {
            Storage::new(MemoryStore::open(&config.file_storage_path)?)
        } else {
            Storage::new(SeaOrmStore::connect(&config.database_dsn, config).await?)
        };

        info!("Using {} storage backend", storage.backend_name());
        Ok(storage)
    }
}

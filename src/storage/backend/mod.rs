//! SeaORM storage backend
//!
//! This module provides database storage using SeaORM,
//! supporting SQLite, MySQL/MariaDB, and PostgreSQL.

mod connection;
mod deletions;
mod mutations;
mod query;
pub mod timeout;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::StoreBackend;
use super::deletion::{BufferState, DeleteBuffer, DeletionSink};
use super::stream::UrlStream;
use crate::config::StorageConfig;
use crate::errors::{Result, ShortenerError};

pub use connection::{connect_generic, connect_sqlite, run_migrations};
pub use deletions::{DELETE_CHUNK_SIZE, DeletionWriter};

/// 从数据库 URL 推断数据库类型
pub fn infer_backend_from_url(database_url: &str) -> Result<String> {
    if database_url.starts_with("sqlite://")
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
        || database_url == ":memory:"
    {
        Ok("sqlite".to_string())
    } else if database_url.starts_with("mysql://") || database_url.starts_with("mariadb://") {
        Ok("mysql".to_string())
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Ok("postgres".to_string())
    } else {
        Err(ShortenerError::database_config(format!(
            "无法从 URL 推断数据库类型: {}. 支持的 URL 格式: sqlite://, mysql://, mariadb://, postgres://",
            database_url
        )))
    }
}

/// 规范化 backend 名称
pub fn normalize_backend_name(backend: &str) -> String {
    match backend {
        "mariadb" => "mysql".to_string(),
        "postgresql" => "postgres".to_string(),
        other => other.to_string(),
    }
}

/// sqlx 的 MySQL 驱动只识别 mysql:// 前缀
fn driver_url(database_url: &str) -> String {
    match database_url.strip_prefix("mariadb://") {
        Some(rest) => format!("mysql://{}", rest),
        None => database_url.to_string(),
    }
}

/// SeaORM-based storage backend
pub struct SeaOrmStore {
    db: DatabaseConnection,
    backend_name: String,
    query_timeout: Duration,
    deletions: Arc<DeleteBuffer>,
    flusher: JoinHandle<()>,
}

impl SeaOrmStore {
    pub async fn connect(database_url: &str, config: &StorageConfig) -> Result<Self> {
        if database_url.is_empty() {
            return Err(ShortenerError::database_config("DATABASE_DSN 未设置"));
        }

        let backend_name = normalize_backend_name(&infer_backend_from_url(database_url)?);
        let url = driver_url(database_url);

        let db = if backend_name == "sqlite" {
            connect_sqlite(&url, config.pool_size).await?
        } else {
            connect_generic(&url, &backend_name, config.pool_size).await?
        };

        run_migrations(&db).await?;

        let query_timeout = config.query_timeout();
        let writer = DeletionWriter::new(db.clone(), query_timeout);
        let deletions = Arc::new(DeleteBuffer::new(Arc::new(writer) as Arc<dyn DeletionSink>));

        let interval = config.delete_flush_interval();
        let flusher = {
            let deletions = Arc::clone(&deletions);
            tokio::spawn(async move { deletions.start_background_task(interval).await })
        };

        info!(
            "{} Storage initialized (delete flush every {}s).",
            backend_name.to_uppercase(),
            interval.as_secs()
        );

        Ok(Self {
            db,
            backend_name,
            query_timeout,
            deletions,
            flusher,
        })
    }

    pub fn deletion_state(&self) -> BufferState {
        self.deletions.state()
    }
}

impl Drop for SeaOrmStore {
    fn drop(&mut self) {
        self.flusher.abort();
        if self.deletions.pending_bytes() > 0 {
            warn!(
                "{} storage dropped with {} bytes of unflushed deletions",
                self.backend_name.to_uppercase(),
                self.deletions.pending_bytes()
            );
        }
    }
}

#[async_trait]
impl StoreBackend for SeaOrmStore {
    async fn store_url(&self, id: &str, url: &str, owner_id: &str) -> Result<()> {
        self.insert_url(id, url, owner_id).await
    }

    async fn load_url(&self, id: &str) -> Result<Option<String>> {
        self.find_url(id).await
    }

    fn load_urls_by_user(&self, owner_id: &str) -> UrlStream {
        self.stream_owner_urls(owner_id)
    }

    async fn delete_urls(&self, owner_id: &str, ids: &[String]) -> Result<()> {
        self.deletions.append(owner_id, ids)
    }

    async fn load_user(&self, token: &str) -> Result<Option<String>> {
        self.find_user_by_token(token).await
    }

    async fn store_session(&self, owner_id: &str, token: &str) -> Result<()> {
        self.insert_session(owner_id, token).await
    }

    async fn count_users(&self) -> Result<u64> {
        self.count_user_rows().await
    }

    async fn count_urls(&self) -> Result<u64> {
        self.count_url_rows().await
    }

    async fn flush(&self) -> Result<()> {
        let affected = self.deletions.flush().await?;
        info!(
            "{} storage flushed, {} urls marked deleted",
            self.backend_name.to_uppercase(),
            affected
        );
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        timeout::with_timeout("ping", self.query_timeout, async {
            self.db.ping().await.map_err(|e| {
                ShortenerError::database_connection(format!("数据库不可用: {}", e))
            })
        })
        .await
    }

    fn backend_name(&self) -> &str {
        &self.backend_name
    }
}

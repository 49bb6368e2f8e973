//! Shortener service
//!
//! Thin business layer over `Storage`: derives ids from URLs and renders
//! full short URLs from the configured base URL.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use tracing::{info, warn};

use crate::errors::Result;
use crate::storage::{ShortUrlPair, Storage};

/// 存储统计
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageStats {
    pub users: u64,
    /// 包含已删除的链接
    pub urls: u64,
}

pub struct Shortener {
    storage: Arc<Storage>,
    base_url: String,
}

impl Shortener {
    pub fn new(storage: Arc<Storage>, base_url: impl Into<String>) -> Self {
        Self {
            storage,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn storage(&self) -> &Arc<Storage> {
        &self.storage
    }

    /// 返回 `(id, short_url)`；同一 URL 总是得到同一个 id
    pub fn shorten_url(&self, url: &str) -> (String, String) {
        let id = URL_SAFE_NO_PAD.encode(url.as_bytes());
        let short_url = self.make_url(&id);
        (id, short_url)
    }

    pub fn make_url(&self, id: &str) -> String {
        format!("{}/{}", self.base_url, id)
    }

    pub async fn store_url(&self, id: &str, url: &str, owner_id: &str) -> Result<()> {
        match self.storage.store_url(id, url, owner_id).await {
            Ok(()) => {
                info!("Short link created: {} -> {}", id, url);
                Ok(())
            }
            Err(e) => {
                if !e.is_conflict() {
                    warn!("Failed to store {}: {}", id, e);
                }
                Err(e)
            }
        }
    }

    pub async fn find_url(&self, id: &str) -> Result<Option<String>> {
        self.storage.load_url(id).await
    }

    pub async fn load_by_user(&self, owner_id: &str) -> Result<Vec<ShortUrlPair>> {
        self.storage
            .load_by_user(owner_id, |id| self.make_url(id))
            .await
    }

    pub async fn delete_urls(&self, owner_id: &str, ids: &[String]) -> Result<()> {
        self.storage.delete_urls(owner_id, ids).await
    }

    pub async fn count_users(&self) -> Result<u64> {
        self.storage.count_users().await
    }

    pub async fn count_urls(&self) -> Result<u64> {
        self.storage.count_urls().await
    }

    pub async fn stats(&self) -> Result<StorageStats> {
        Ok(StorageStats {
            users: self.count_users().await?,
            urls: self.count_urls().await?,
        })
    }

    pub async fn flush_storage(&self) -> Result<()> {
        self.storage.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn shortener() -> Shortener {
        Shortener::new(
            Arc::new(Storage::new(MemoryStore::new())),
            "http://localhost:8080/",
        )
    }

    #[test]
    fn test_shorten_url_is_deterministic() {
        let s = shortener();
        let (id, short) = s.shorten_url("example.com");
        assert_eq!(id, "ZXhhbXBsZS5jb20");
        assert_eq!(short, "http://localhost:8080/ZXhhbXBsZS5jb20");
        assert_eq!(s.shorten_url("example.com").0, id);
    }

    #[test]
    fn test_ids_are_url_safe() {
        let (id, _) = shortener().shorten_url("https://example.com/?q=a+b&x=~~~");
        assert!(!id.contains('+') && !id.contains('/') && !id.contains('='));
    }

    #[tokio::test]
    async fn test_load_by_user_renders_short_urls() {
        let s = shortener();
        let (id, short) = s.shorten_url("http://a.com");
        s.store_url(&id, "http://a.com", "u1").await.unwrap();

        let pairs = s.load_by_user("u1").await.unwrap();
        assert_eq!(
            pairs,
            vec![ShortUrlPair {
                short_url: short,
                original_url: "http://a.com".to_string(),
            }]
        );
        assert!(s.load_by_user("u2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stats_counts_deleted_urls() {
        let s = shortener();
        s.store_url("a", "http://a.com", "u1").await.unwrap();
        s.store_url("b", "http://b.com", "u1").await.unwrap();
        s.delete_urls("u1", &["a".to_string()]).await.unwrap();
        s.storage().store_session("u1", "opaque").await.unwrap();

        assert_eq!(s.stats().await.unwrap(), StorageStats { users: 1, urls: 2 });
    }
}

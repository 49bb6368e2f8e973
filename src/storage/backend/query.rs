//! Query operations for SeaOrmStore
//!
//! This module contains all read-only database operations.

use futures_util::{TryStreamExt, pin_mut};
use sea_orm::{ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};
use std::time::Duration;
use tracing::{error, trace};

use super::SeaOrmStore;
use super::timeout::with_timeout;
use crate::errors::{Result, ShortenerError};
use crate::storage::models::UrlPair;
use crate::storage::stream::{ListingSender, UrlStream, spawn_listing};

use migration::entities::{url, user};

impl SeaOrmStore {
    pub(super) async fn find_url(&self, id: &str) -> Result<Option<String>> {
        let model = with_timeout(&format!("load_url({})", id), self.query_timeout, async {
            url::Entity::find_by_id(id.to_string())
                .one(&self.db)
                .await
                .map_err(|e| ShortenerError::database_operation(format!("查询短链接失败: {}", e)))
        })
        .await?;

        match model {
            Some(model) if model.is_deleted() => Err(ShortenerError::gone(format!(
                "URL with id {} is deleted",
                id
            ))),
            Some(model) => Ok(Some(model.url)),
            None => Ok(None),
        }
    }

    pub(super) async fn find_user_by_token(&self, token: &str) -> Result<Option<String>> {
        let model = with_timeout("load_user", self.query_timeout, async {
            user::Entity::find()
                .filter(user::Column::SessionToken.eq(token))
                .one(&self.db)
                .await
                .map_err(|e| ShortenerError::database_operation(format!("查询会话失败: {}", e)))
        })
        .await?;

        Ok(model.map(|user| user.id))
    }

    pub(super) async fn count_user_rows(&self) -> Result<u64> {
        with_timeout("count_users", self.query_timeout, async {
            user::Entity::find().count(&self.db).await.map_err(ShortenerError::from)
        })
        .await
    }

    /// 包含已软删除的记录
    pub(super) async fn count_url_rows(&self) -> Result<u64> {
        with_timeout("count_urls", self.query_timeout, async {
            url::Entity::find().count(&self.db).await.map_err(ShortenerError::from)
        })
        .await
    }

    /// 后台任务逐行读取并推送到有界通道，首次轮询时启动
    pub(super) fn stream_owner_urls(&self, owner_id: &str) -> UrlStream {
        let db = self.db.clone();
        let owner_id = owner_id.to_string();
        let limit = self.query_timeout;

        spawn_listing(move |tx| async move {
            if let Err(e) = forward_owner_urls(&db, &owner_id, limit, &tx).await {
                error!("列出用户 {} 的链接失败: {}", owner_id, e);
                let _ = tx.send(Err(e)).await;
            }
        })
    }
}

/// 每次读库都受超时限制；等待消费者时不计时
async fn forward_owner_urls(
    db: &DatabaseConnection,
    owner_id: &str,
    limit: Duration,
    tx: &ListingSender,
) -> Result<()> {
    let rows = with_timeout("load_urls_by_user", limit, async {
        url::Entity::find()
            .filter(url::Column::OwnerId.eq(owner_id))
            .filter(
                Condition::any()
                    .add(url::Column::Deleted.eq(false))
                    .add(url::Column::Deleted.is_null()),
            )
            .stream(db)
            .await
            .map_err(ShortenerError::from)
    })
    .await?;
    pin_mut!(rows);

    loop {
        let next = with_timeout("load_urls_by_user", limit, async {
            rows.try_next().await.map_err(ShortenerError::from)
        })
        .await?;

        let Some(model) = next else {
            return Ok(());
        };

        let pair = UrlPair {
            id: model.id,
            original_url: model.url,
        };
        if tx.send(Ok(pair)).await.is_err() {
            trace!("Listing for {} cancelled by consumer", owner_id);
            return Ok(());
        }
    }
}

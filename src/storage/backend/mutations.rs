//! Mutation operations for SeaOrmStore
//!
//! This module contains all write database operations except deletion,
//! which goes through the delete buffer.

use sea_orm::{
    ActiveValue::Set, DbErr, EntityTrait, SqlErr, TransactionTrait, sea_query::OnConflict,
};
use tracing::{debug, warn};

use super::SeaOrmStore;
use super::timeout::with_timeout;
use crate::errors::{Result, ShortenerError};

use migration::entities::{url, user};

/// 插入未生效（ON CONFLICT DO NOTHING）
fn is_not_inserted(err: &DbErr) -> bool {
    if matches!(err, DbErr::RecordNotInserted) {
        return true;
    }
    // 某些数据库后端在 do_nothing 时可能返回特定错误
    let err_str = err.to_string().to_lowercase();
    err_str.contains("no rows") || err_str.contains("record not inserted")
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

impl SeaOrmStore {
    pub(super) async fn insert_url(&self, id: &str, original_url: &str, owner_id: &str) -> Result<()> {
        with_timeout(
            &format!("store_url({})", id),
            self.query_timeout,
            self.insert_url_in_transaction(id, original_url, owner_id),
        )
        .await
    }

    /// ON CONFLICT (url) DO NOTHING；未插入则回滚并返回冲突
    async fn insert_url_in_transaction(
        &self,
        id: &str,
        original_url: &str,
        owner_id: &str,
    ) -> Result<()> {
        let txn = self.db.begin().await.map_err(|e| {
            ShortenerError::database_operation(format!("Failed to begin transaction: {}", e))
        })?;

        let model = url::ActiveModel {
            url: Set(original_url.to_string()),
            id: Set(id.to_string()),
            owner_id: Set(Some(owner_id.to_string())),
            deleted: Set(Some(false)),
        };

        let result = url::Entity::insert(model)
            .on_conflict(OnConflict::column(url::Column::Url).do_nothing().to_owned())
            .exec(&txn)
            .await;

        if let Err(e) = result {
            if let Err(rollback_err) = txn.rollback().await {
                warn!("store_url({}) 回滚失败: {}", id, rollback_err);
            }
            return if is_not_inserted(&e) {
                Err(ShortenerError::conflict(format!(
                    "URL 已被缩短: {}",
                    original_url
                )))
            } else if is_unique_violation(&e) {
                Err(ShortenerError::conflict(format!("短码已存在: {}", id)))
            } else {
                Err(ShortenerError::database_operation(format!(
                    "保存短链接失败: {}",
                    e
                )))
            };
        }

        txn.commit().await.map_err(|e| {
            ShortenerError::database_operation(format!("Failed to commit transaction: {}", e))
        })?;
        debug!("Stored url {} -> {}", id, original_url);
        Ok(())
    }

    pub(super) async fn insert_session(&self, owner_id: &str, token: &str) -> Result<()> {
        with_timeout("store_session", self.query_timeout, async {
            let model = user::ActiveModel {
                id: Set(owner_id.to_string()),
                session_token: Set(Some(token.to_string())),
            };

            match user::Entity::insert(model).exec(&self.db).await {
                Ok(_) => Ok(()),
                Err(e) if is_unique_violation(&e) => Err(ShortenerError::conflict(format!(
                    "用户已存在: {}",
                    owner_id
                ))),
                Err(e) => Err(ShortenerError::database_operation(format!(
                    "保存会话失败: {}",
                    e
                ))),
            }
        })
        .await
    }
}

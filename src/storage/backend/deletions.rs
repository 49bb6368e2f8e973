//! DeletionSink implementation for the relational backend
//!
//! Pairs are matched with a literal `VALUES` row list so that one UPDATE
//! covers a whole chunk. All ids and owners are bound as parameters.

use std::time::Duration;

use async_trait::async_trait;
use sea_orm::sea_query::{Expr, Query, UpdateStatement, Value};
use sea_orm::{ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbBackend};
use tracing::debug;

use super::timeout::with_timeout;
use crate::errors::{Result, ShortenerError};
use crate::storage::deletion::DeletionSink;
use crate::storage::models::PendingDeletion;

use migration::entities::url;

/// 每条 UPDATE 最多包含的 (id, owner_id) 对
pub const DELETE_CHUNK_SIZE: usize = 1000;

pub struct DeletionWriter {
    db: DatabaseConnection,
    query_timeout: Duration,
}

impl DeletionWriter {
    pub fn new(db: DatabaseConnection, query_timeout: Duration) -> Self {
        Self { db, query_timeout }
    }
}

/// VALUES 行列表。Postgres 的自定义表达式只识别 `$n` 占位符，
/// 序号相对于本表达式自身的参数列表
fn values_rows(len: usize, backend: DbBackend) -> String {
    (0..len)
        .map(|i| match backend {
            DbBackend::Postgres => format!("(${}, ${})", 2 * i + 1, 2 * i + 2),
            // MySQL 的表值构造器需要 ROW(...)
            DbBackend::MySql => "ROW(?, ?)".to_string(),
            _ => "(?, ?)".to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// 构造批量软删除语句
pub fn build_delete_statement(chunk: &[PendingDeletion], backend: DbBackend) -> UpdateStatement {
    let rows = values_rows(chunk.len(), backend);
    let values: Vec<Value> = chunk
        .iter()
        .flat_map(|d| [d.record_id.clone().into(), d.owner_id.clone().into()])
        .collect();

    Query::update()
        .table(url::Entity)
        .value(url::Column::Deleted, true)
        .and_where(Expr::cust_with_values(
            format!("(id, owner_id) IN (VALUES {})", rows),
            values,
        ))
        .cond_where(
            Condition::any()
                .add(url::Column::Deleted.eq(false))
                .add(url::Column::Deleted.is_null()),
        )
        .to_owned()
}

#[async_trait]
impl DeletionSink for DeletionWriter {
    async fn apply_deletions(&self, batch: Vec<PendingDeletion>) -> Result<u64> {
        let backend = self.db.get_database_backend();
        let mut affected = 0u64;

        for chunk in batch.chunks(DELETE_CHUNK_SIZE) {
            let stmt = build_delete_statement(chunk, backend);
            let result = with_timeout("delete_urls", self.query_timeout, async {
                self.db.execute(&stmt).await.map_err(|e| {
                    ShortenerError::database_operation(format!("批量删除失败: {}", e))
                })
            })
            .await?;
            affected += result.rows_affected();
        }

        debug!(
            "Applied {} queued deletions in {} chunks, {} rows affected",
            batch.len(),
            batch.len().div_ceil(DELETE_CHUNK_SIZE),
            affected
        );
        Ok(affected)
    }
}

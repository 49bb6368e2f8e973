//! 查询超时控制
//!
//! 每个关系型查询都有固定的超时上限，超时即失败，不做重试。

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::errors::{Result, ShortenerError};

/// 在超时限制内执行操作
pub async fn with_timeout<T, Fut>(operation_name: &str, limit: Duration, operation: Fut) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => {
            warn!(
                "Operation '{}' timed out after {} ms",
                operation_name,
                limit.as_millis()
            );
            Err(ShortenerError::timeout(format!(
                "{} 超时 ({} ms)",
                operation_name,
                limit.as_millis()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_completes_within_limit() {
        let value = with_timeout("fast", Duration::from_millis(200), async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_inner_error_passes_through() {
        let err = with_timeout::<(), _>("broken", Duration::from_millis(200), async {
            Err(ShortenerError::database_operation("boom"))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, ShortenerError::DatabaseOperation(_)));
    }

    #[tokio::test]
    async fn test_slow_operation_times_out() {
        let err = with_timeout("slow", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, ShortenerError::Timeout(_)));
        assert!(err.message().contains("slow"));
    }
}

use std::time::Duration;

use tokio::signal;
use tracing::{error, warn};

use crate::storage::Storage;

/// 关闭时刷盘的最长等待时间
pub const SHUTDOWN_FLUSH_TIMEOUT: Duration = Duration::from_secs(30);

/// 等待 Ctrl+C，然后刷写存储
pub async fn listen_for_shutdown(storage: &Storage) {
    if let Err(e) = signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
    }
    warn!("Shutdown signal received, flushing storage...");

    flush_on_shutdown(storage, SHUTDOWN_FLUSH_TIMEOUT).await;
}

/// 在超时内刷写存储，失败只记录日志
pub async fn flush_on_shutdown(storage: &Storage, limit: Duration) -> bool {
    match tokio::time::timeout(limit, storage.flush()).await {
        Ok(Ok(())) => {
            warn!(
                "{} storage flushed successfully",
                storage.backend_name().to_uppercase()
            );
            true
        }
        Ok(Err(e)) => {
            error!("Failed to flush storage on shutdown: {}", e);
            false
        }
        Err(_) => {
            error!(
                "Storage flush did not finish within {}s, shutting down anyway",
                limit.as_secs()
            );
            false
        }
    }
}

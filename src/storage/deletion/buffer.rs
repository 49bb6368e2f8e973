//! 异步删除缓冲区
//!
//! `append` 只负责编码并追加到字节缓冲区；实际的 UPDATE 由定时任务
//! 或显式 `flush` 批量执行。两种 drain 互斥，定时任务遇到正在进行的
//! drain 时直接跳过本轮。

use std::sync::Arc;

use async_trait::async_trait;
use bytes::BytesMut;
use parking_lot::Mutex;
use tokio::time::{Duration, sleep};
use tracing::{debug, trace, warn};

use super::codec;
use crate::errors::Result;
use crate::storage::models::PendingDeletion;

/// 删除批次的落地端
#[async_trait]
pub trait DeletionSink: Send + Sync {
    /// 应用一批删除，返回实际被标记的行数
    async fn apply_deletions(&self, batch: Vec<PendingDeletion>) -> Result<u64>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
    Idle,
    Accumulating,
    Draining,
}

pub struct DeleteBuffer {
    /// 已编码的帧
    pending: Mutex<BytesMut>,
    /// drain 锁，防止并发 drain
    drain_lock: tokio::sync::Mutex<()>,
    sink: Arc<dyn DeletionSink>,
}

impl DeleteBuffer {
    pub fn new(sink: Arc<dyn DeletionSink>) -> Self {
        Self {
            pending: Mutex::new(BytesMut::new()),
            drain_lock: tokio::sync::Mutex::new(()),
            sink,
        }
    }

    /// 追加一次删除请求（一个帧），不等待 drain
    pub fn append(&self, owner_id: &str, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let frame = codec::encode_frame(&PendingDeletion::batch(owner_id, ids))?;
        let mut pending = self.pending.lock();
        pending.extend_from_slice(&frame);
        trace!(
            "DeleteBuffer: queued {} ids for {}, {} bytes pending",
            ids.len(),
            owner_id,
            pending.len()
        );
        Ok(())
    }

    pub fn pending_bytes(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn state(&self) -> BufferState {
        if self.drain_lock.try_lock().is_err() {
            BufferState::Draining
        } else if self.pending.lock().is_empty() {
            BufferState::Idle
        } else {
            BufferState::Accumulating
        }
    }

    /// 手动 drain（等待进行中的 drain 结束），错误返回给调用方
    pub async fn flush(&self) -> Result<u64> {
        debug!("DeleteBuffer: Manual flush triggered");
        let _guard = self.drain_lock.lock().await;
        self.drain().await
    }

    /// 启动后台 drain 任务（作为异步方法运行）
    pub async fn start_background_task(&self, interval: Duration) {
        loop {
            sleep(interval).await;

            if let Ok(_guard) = self.drain_lock.try_lock() {
                trace!("DeleteBuffer: Starting scheduled drain");
                if let Err(e) = self.drain().await {
                    warn!("DeleteBuffer: scheduled drain failed, batch dropped: {}", e);
                }
            } else {
                trace!("DeleteBuffer: drain already in progress, skipping scheduled drain");
            }
        }
    }

    /// 调用方必须持有 drain_lock
    async fn drain(&self) -> Result<u64> {
        let mut taken = self.pending.lock().split();
        if taken.is_empty() {
            trace!("DeleteBuffer: Nothing to drain");
            return Ok(0);
        }

        let decoded = codec::decode_all(&mut taken);

        if !taken.is_empty() {
            // 不完整的尾部放回缓冲区最前面
            let mut pending = self.pending.lock();
            let newer = pending.split();
            taken.extend_from_slice(&newer);
            *pending = taken;
        }

        for err in &decoded.skipped {
            warn!("DeleteBuffer: skipped corrupt frame: {}", err);
        }

        let count = decoded.deletions.len();
        let affected = if count == 0 {
            0
        } else {
            self.sink.apply_deletions(decoded.deletions).await?
        };
        debug!(
            "DeleteBuffer: drained {} queued pairs, {} rows marked deleted",
            count, affected
        );

        // 其余帧已经应用，仍把解码错误报告给调用方
        if let Some(err) = decoded.skipped.into_iter().next() {
            return Err(err.into());
        }
        Ok(affected)
    }
}

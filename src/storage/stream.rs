//! Lazy per-owner listing streams
//!
//! Both backends produce listings from a background task that feeds a
//! bounded channel. The consumer sees a one-shot `Stream`; dropping it
//! closes the channel, which the producer observes on its next send and
//! stops scanning.

use std::future::Future;

use futures_util::stream::{self, BoxStream, StreamExt};
use tokio::sync::mpsc;

use super::models::UrlPair;
use crate::errors::Result;

/// 生产者与消费者之间的缓冲深度
pub const STREAM_CHANNEL_CAPACITY: usize = 64;

/// 按用户列出链接的结果流
pub type UrlStream = BoxStream<'static, Result<UrlPair>>;

pub(crate) type ListingSender = mpsc::Sender<Result<UrlPair>>;

pub(crate) fn listing_channel() -> (ListingSender, mpsc::Receiver<Result<UrlPair>>) {
    mpsc::channel(STREAM_CHANNEL_CAPACITY)
}

/// 将接收端包装为 Stream
pub(crate) fn receiver_stream(rx: mpsc::Receiver<Result<UrlPair>>) -> UrlStream {
    stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|item| (item, rx)) }).boxed()
}

/// 首次轮询时才启动生产者任务，因此构造流不要求处于 Tokio 运行时中
pub(crate) fn spawn_listing<F, Fut>(produce: F) -> UrlStream
where
    F: FnOnce(ListingSender) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    stream::once(async move {
        let (tx, rx) = listing_channel();
        tokio::spawn(produce(tx));
        receiver_stream(rx)
    })
    .flatten()
    .boxed()
}

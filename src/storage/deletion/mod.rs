//! 延迟批量删除
//!
//! 关系型后端的 `delete_urls` 只把请求编码进缓冲区，由后台任务定期
//! 合并成批量 UPDATE 执行。

mod buffer;
pub mod codec;

pub use buffer::{BufferState, DeleteBuffer, DeletionSink};
pub use codec::CodecError;

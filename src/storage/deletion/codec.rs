//! Binary frame codec for queued deletions
//!
//! Frame format:
//! - 4 bytes: payload length (big-endian u32)
//! - payload: repeated records of
//!   - 2 bytes: id length (big-endian u16), id bytes (UTF-8)
//!   - 2 bytes: owner length (big-endian u16), owner bytes (UTF-8)
//!
//! One `delete_urls` call produces exactly one frame. A frame whose declared
//! length runs past the end of the buffer marks the end of decodable data.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;

use crate::errors::ShortenerError;
use crate::storage::models::PendingDeletion;

/// 帧头长度
pub const FRAME_HEADER_LEN: usize = 4;

/// 单个字段的最大字节数
pub const MAX_FIELD_LEN: usize = u16::MAX as usize;

#[derive(Debug, PartialEq, Eq)]
pub enum CodecError {
    /// id 或 owner 超过 u16 可表示的长度
    FieldTooLong(usize),
    /// 帧负载超过 u32 可表示的长度
    FrameTooLarge(usize),
    /// 帧内记录声明的长度越过了帧边界
    Malformed(usize),
    /// 字段不是合法的 UTF-8
    InvalidUtf8,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::FieldTooLong(len) => {
                write!(f, "Field too long: {} bytes (max: {})", len, MAX_FIELD_LEN)
            }
            CodecError::FrameTooLarge(len) => write!(f, "Frame too large: {} bytes", len),
            CodecError::Malformed(offset) => write!(f, "Malformed record at offset {}", offset),
            CodecError::InvalidUtf8 => write!(f, "Invalid UTF-8 in record field"),
        }
    }
}

impl std::error::Error for CodecError {}

impl From<CodecError> for ShortenerError {
    fn from(err: CodecError) -> Self {
        ShortenerError::serialization(format!("删除队列编解码失败: {}", err))
    }
}

/// 将一批待删除项编码为一个完整的帧
pub fn encode_frame(deletions: &[PendingDeletion]) -> Result<Bytes, CodecError> {
    let mut payload_len = 0usize;
    for deletion in deletions {
        for field in [&deletion.record_id, &deletion.owner_id] {
            if field.len() > MAX_FIELD_LEN {
                return Err(CodecError::FieldTooLong(field.len()));
            }
            payload_len += 2 + field.len();
        }
    }
    if payload_len > u32::MAX as usize {
        return Err(CodecError::FrameTooLarge(payload_len));
    }

    let mut buf = BytesMut::with_capacity(FRAME_HEADER_LEN + payload_len);
    buf.put_u32(payload_len as u32);
    for deletion in deletions {
        put_field(&mut buf, &deletion.record_id);
        put_field(&mut buf, &deletion.owner_id);
    }
    Ok(buf.freeze())
}

fn put_field(buf: &mut BytesMut, field: &str) {
    buf.put_u16(field.len() as u16);
    buf.put_slice(field.as_bytes());
}

/// 从缓冲区解码一个帧
///
/// Returns:
/// - `Ok(Some(batch))` - complete frame decoded, buffer advanced
/// - `Ok(None)` - header missing or declared length exceeds the buffer (buffer unchanged)
/// - `Err(e)` - frame present but its records are corrupt (frame consumed)
pub fn decode_frame(buf: &mut BytesMut) -> Result<Option<Vec<PendingDeletion>>, CodecError> {
    if buf.len() < FRAME_HEADER_LEN {
        return Ok(None);
    }

    let length = (&buf[..FRAME_HEADER_LEN]).get_u32() as usize;
    if buf.len() - FRAME_HEADER_LEN < length {
        return Ok(None);
    }

    buf.advance(FRAME_HEADER_LEN);
    let mut payload = buf.split_to(length).freeze();

    let mut batch = Vec::new();
    while payload.has_remaining() {
        let record_id = take_field(&mut payload, length)?;
        let owner_id = take_field(&mut payload, length)?;
        batch.push(PendingDeletion {
            record_id,
            owner_id,
        });
    }
    Ok(Some(batch))
}

fn take_field(payload: &mut Bytes, frame_len: usize) -> Result<String, CodecError> {
    let offset = frame_len - payload.remaining();
    if payload.remaining() < 2 {
        return Err(CodecError::Malformed(offset));
    }
    let len = payload.get_u16() as usize;
    if payload.remaining() < len {
        return Err(CodecError::Malformed(offset));
    }
    let raw = payload.split_to(len);
    String::from_utf8(raw.to_vec()).map_err(|_| CodecError::InvalidUtf8)
}

/// 一次 drain 的解码结果
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Decoded {
    pub deletions: Vec<PendingDeletion>,
    /// 已被跳过的损坏帧
    pub skipped: Vec<CodecError>,
}

/// 连续解码所有完整帧，不完整的尾部保留在缓冲区中
///
/// 损坏的帧已从缓冲区中移除，记录错误后继续解码后续帧。
pub fn decode_all(buf: &mut BytesMut) -> Decoded {
    let mut decoded = Decoded::default();
    loop {
        match decode_frame(buf) {
            Ok(Some(batch)) => decoded.deletions.extend(batch),
            Ok(None) => break,
            Err(e) => decoded.skipped.push(e),
        }
    }
    decoded
}

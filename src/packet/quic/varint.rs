//! QUIC 变长整数编解码 (RFC 9000 §16)。
//! QUIC variable-length integer encoding (RFC 9000 §16).
//!
//! The two most significant bits of the first byte select a total width of
//! 1, 2, 4 or 8 bytes; the remaining 6, 14, 30 or 62 bits hold the value in
//! network byte order.

use crate::error::{Error, Result};
use bytes::{Buf, BufMut};

/// The largest value a varint can carry.
/// 变长整数可表示的最大值。
pub const MAX_VARINT: u64 = (1 << 62) - 1;

const WIDTH_SHIFT: u8 = 6;

/// Decodes one varint from the start of `buf`, returning `(value, width)`.
///
/// 从 `buf` 起始处解码一个变长整数，返回 `(值, 宽度)`。
pub fn decode(buf: &[u8]) -> Result<(u64, usize)> {
    let first = *buf.first().ok_or(Error::Truncated)?;
    let width = 1usize << (first >> WIDTH_SHIFT);
    if buf.len() < width {
        return Err(Error::Truncated);
    }

    let mut field = &buf[..width];
    let value = match width {
        1 => u64::from(field.get_u8() & 0x3F),
        2 => u64::from(field.get_u16() & 0x3FFF),
        4 => u64::from(field.get_u32() & 0x3FFF_FFFF),
        _ => field.get_u64() & MAX_VARINT,
    };
    Ok((value, width))
}

/// Number of bytes the canonical (shortest) encoding of `value` occupies.
/// `value` 规范（最短）编码所占的字节数。
pub fn encoded_len(value: u64) -> Option<usize> {
    match value {
        0..=0x3F => Some(1),
        0x40..=0x3FFF => Some(2),
        0x4000..=0x3FFF_FFFF => Some(4),
        0x4000_0000..=MAX_VARINT => Some(8),
        _ => None,
    }
}

/// Encodes `value` canonically, returning the number of bytes written.
///
/// 以规范形式编码 `value`，返回写入的字节数。
pub fn encode<B: BufMut>(value: u64, buf: &mut B) -> Option<usize> {
    let width = encoded_len(value)?;
    match width {
        1 => buf.put_u8(value as u8),
        2 => buf.put_u16(0x4000 | value as u16),
        4 => buf.put_u32(0x8000_0000 | value as u32),
        _ => buf.put_u64(0xC000_0000_0000_0000 | value),
    }
    Some(width)
}

//! QUIC 长/短头解析与合并包分帧。
//! QUIC long/short header parsing and coalesced packet framing.
//!
//! A UDP datagram may carry several long-header packets back to back, optionally
//! followed by a single short-header packet that runs to the end of the datagram
//! (RFC 9000 §12.2). [`CoalescedPackets`] walks that sequence one header at a
//! time. Every length it follows is checked against the end of the datagram
//! before the corresponding read.
//!
//! Bit layout of the first byte:
//!
//! ```text
//! long:  | form=1 | fixed=1 | type(2) | reserved(2) | pn_len(2) |
//! short: | form=0 | fixed=1 | spin | reserved(2) | key_phase | pn_len(2) |
//! ```

pub mod varint;

use crate::error::{Error, NonConformance, Result};
use bytes::Buf;
use std::fmt;

pub const HEADER_FORM_BIT: u8 = 0x80;
pub const FIXED_BIT: u8 = 0x40;
pub const LONG_TYPE_MASK: u8 = 0x30;
pub const LONG_TYPE_SHIFT: u8 = 4;
pub const SPIN_BIT: u8 = 0x20;
pub const KEY_PHASE_BIT: u8 = 0x04;

/// First byte + version.
const VERSION_END: usize = 1 + 4;

/// The version field value reserved for Version Negotiation packets.
pub const VERSION_NEGOTIATION: u32 = 0;

/// The type of a long-header packet.
/// 长头包的类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LongPacketType {
    Initial,
    ZeroRtt,
    Handshake,
    Retry,
    /// Not a type-bits value: announced by a version field of zero.
    /// 并非类型位取值：由版本字段为 0 表示。
    VersionNegotiation,
}

impl LongPacketType {
    fn from_first_byte(first: u8) -> Self {
        match (first & LONG_TYPE_MASK) >> LONG_TYPE_SHIFT {
            0b00 => LongPacketType::Initial,
            0b01 => LongPacketType::ZeroRtt,
            0b10 => LongPacketType::Handshake,
            _ => LongPacketType::Retry,
        }
    }

    /// Retry and Version Negotiation packets carry no length field, so nothing
    /// after them in the datagram can be framed.
    pub fn terminates_datagram(self) -> bool {
        matches!(
            self,
            LongPacketType::Retry | LongPacketType::VersionNegotiation
        )
    }
}

impl fmt::Display for LongPacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LongPacketType::Initial => "Initial",
            LongPacketType::ZeroRtt => "0-RTT",
            LongPacketType::Handshake => "Handshake",
            LongPacketType::Retry => "Retry",
            LongPacketType::VersionNegotiation => "VersionNegotiation",
        };
        write!(f, "{}", s)
    }
}

/// A decoded long header.
///
/// 已解码的长头。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LongHeader<'a> {
    /// Offset of the first byte within the datagram.
    /// 首字节在数据报中的偏移。
    pub offset: usize,
    pub packet_type: LongPacketType,
    pub version: u32,
    pub dcid: &'a [u8],
    pub scid: &'a [u8],
    /// Token length (Initial packets only, zero otherwise).
    /// 令牌长度（仅 Initial 包，其余为 0）。
    pub token_len: u64,
    /// Value of the Length field (packet number + payload).
    /// 长度字段的值（包号 + 载荷）。
    pub payload_len: u64,
    /// Total bytes this packet occupies in the datagram.
    /// 该包在数据报中占用的总字节数。
    pub len: usize,
}

/// A decoded short header. It always extends to the end of the datagram.
///
/// 已解码的短头，总是延伸到数据报末尾。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortHeader {
    pub offset: usize,
    pub spin: bool,
    pub key_phase: bool,
    pub len: usize,
}

impl ShortHeader {
    pub fn spin_bit(&self) -> u32 {
        u32::from(self.spin)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuicHeader<'a> {
    Long(LongHeader<'a>),
    Short(ShortHeader),
}

impl QuicHeader<'_> {
    pub fn len(&self) -> usize {
        match self {
            QuicHeader::Long(h) => h.len,
            QuicHeader::Short(h) => h.len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Checks the fixed bit of a packet's first byte.
/// 检查包首字节的固定位。
pub fn check_fixed_bit(first: u8) -> Result<()> {
    if first & FIXED_BIT == 0 {
        return Err(NonConformance::FixedBitUnset.into());
    }
    Ok(())
}

/// Iterator over the packets coalesced in one UDP payload.
///
/// Yields headers in wire order. The iterator stops after a short header, a
/// Retry or Version Negotiation packet, at the exact end of the datagram, or
/// after the first error.
///
/// 遍历一个 UDP 载荷中合并的各个包的迭代器。遇到短头、Retry 或版本协商包、
/// 恰好到达数据报末尾或出现第一个错误后停止。
#[derive(Debug, Clone)]
pub struct CoalescedPackets<'a> {
    datagram: &'a [u8],
    pos: usize,
    max_length_field: u64,
    done: bool,
}

impl<'a> CoalescedPackets<'a> {
    pub fn new(datagram: &'a [u8], max_length_field: u64) -> Self {
        Self {
            datagram,
            pos: 0,
            max_length_field,
            done: false,
        }
    }

    /// Bytes consumed by the headers yielded so far.
    /// 目前已产出的头所消耗的字节数。
    pub fn consumed(&self) -> usize {
        self.pos
    }

    fn next_header(&mut self) -> Result<QuicHeader<'a>> {
        let offset = self.pos;
        let datagram = self.datagram;
        let rest = &datagram[offset..];
        let first = *rest.first().ok_or(Error::Truncated)?;
        check_fixed_bit(first)?;

        if first & HEADER_FORM_BIT == 0 {
            self.done = true;
            self.pos = datagram.len();
            return Ok(QuicHeader::Short(ShortHeader {
                offset,
                spin: first & SPIN_BIT != 0,
                key_phase: first & KEY_PHASE_BIT != 0,
                len: rest.len(),
            }));
        }

        let header = parse_long(rest, offset, self.max_length_field)?;
        if header.packet_type.terminates_datagram() {
            self.done = true;
        }
        self.pos += header.len;
        Ok(QuicHeader::Long(header))
    }
}

impl<'a> Iterator for CoalescedPackets<'a> {
    type Item = Result<QuicHeader<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.pos >= self.datagram.len() {
            return None;
        }
        let item = self.next_header();
        if item.is_err() {
            self.done = true;
        }
        Some(item)
    }
}

/// Parses the long header at the start of `rest`.
fn parse_long(rest: &[u8], offset: usize, max_length_field: u64) -> Result<LongHeader<'_>> {
    if rest.len() < VERSION_END + 1 {
        return Err(Error::Truncated);
    }
    let mut fixed = &rest[1..VERSION_END];
    let version = fixed.get_u32();

    let mut cursor = VERSION_END;
    let dcid = length_prefixed(rest, &mut cursor)?;
    let scid = length_prefixed(rest, &mut cursor)?;

    let packet_type = if version == VERSION_NEGOTIATION {
        LongPacketType::VersionNegotiation
    } else {
        LongPacketType::from_first_byte(rest[0])
    };

    if packet_type.terminates_datagram() {
        return Ok(LongHeader {
            offset,
            packet_type,
            version,
            dcid,
            scid,
            token_len: 0,
            payload_len: 0,
            len: rest.len(),
        });
    }

    let mut token_len = 0;
    if packet_type == LongPacketType::Initial {
        token_len = bounded_varint(rest, &mut cursor, max_length_field)?;
        skip(rest, &mut cursor, token_len)?;
    }

    let payload_len = bounded_varint(rest, &mut cursor, max_length_field)?;
    skip(rest, &mut cursor, payload_len)?;

    Ok(LongHeader {
        offset,
        packet_type,
        version,
        dcid,
        scid,
        token_len,
        payload_len,
        len: cursor,
    })
}

/// Reads a 1-byte length followed by that many bytes.
fn length_prefixed<'a>(buf: &'a [u8], cursor: &mut usize) -> Result<&'a [u8]> {
    let len = usize::from(*buf.get(*cursor).ok_or(Error::Truncated)?);
    let start = *cursor + 1;
    let field = buf.get(start..start + len).ok_or(Error::Truncated)?;
    *cursor = start + len;
    Ok(field)
}

/// Reads a varint and rejects values at or above `limit`.
fn bounded_varint(buf: &[u8], cursor: &mut usize, limit: u64) -> Result<u64> {
    let (value, width) = varint::decode(&buf[*cursor..])?;
    if value >= limit {
        return Err(NonConformance::LengthOutOfRange { value, limit }.into());
    }
    *cursor += width;
    Ok(value)
}

fn skip(buf: &[u8], cursor: &mut usize, len: u64) -> Result<()> {
    let len = usize::try_from(len).map_err(|_| Error::Truncated)?;
    let end = cursor.checked_add(len).ok_or(Error::Truncated)?;
    if end > buf.len() {
        return Err(Error::Truncated);
    }
    *cursor = end;
    Ok(())
}

/// Parses every header in `datagram`, failing on the first malformed packet.
///
/// 解析 `datagram` 中的所有头，遇到第一个畸形包即失败。
pub fn parse_datagram(datagram: &[u8], max_length_field: u64) -> Result<Vec<QuicHeader<'_>>> {
    CoalescedPackets::new(datagram, max_length_field).collect()
}

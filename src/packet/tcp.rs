//! TCP 头解析。
//! TCP header parsing.

use crate::error::{Error, NonConformance, Result};
use bytes::Buf;

pub const TCP_MIN_HEADER_LEN: usize = 20;

/// The subset of the TCP header used for round-trip detection.
/// 往返检测所使用的 TCP 头字段子集。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpHeader {
    pub src_port: u16,
    pub dst_port: u16,
    pub seq: u32,
    pub ack: u32,
    /// Header length in bytes (data offset * 4).
    /// 头长度（字节），即数据偏移 * 4。
    pub header_len: usize,
}

impl TcpHeader {
    /// Decodes a TCP header from the start of `segment`.
    /// 从 `segment` 起始处解码 TCP 头。
    pub fn parse(segment: &[u8]) -> Result<Self> {
        if segment.len() < TCP_MIN_HEADER_LEN {
            return Err(Error::Truncated);
        }
        let mut buf = &segment[..TCP_MIN_HEADER_LEN];
        let src_port = buf.get_u16();
        let dst_port = buf.get_u16();
        let seq = buf.get_u32();
        let ack = buf.get_u32();
        let header_len = usize::from(buf.get_u8() >> 4) * 4;
        if header_len < TCP_MIN_HEADER_LEN {
            return Err(NonConformance::HeaderTooShort(header_len).into());
        }
        if segment.len() < header_len {
            return Err(Error::Truncated);
        }

        Ok(Self {
            src_port,
            dst_port,
            seq,
            ack,
            header_len,
        })
    }
}

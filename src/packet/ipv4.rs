//! 以太网与 IPv4 头解析。
//! Ethernet and IPv4 header parsing.

use crate::error::{Error, NonConformance, Result};
use bytes::Buf;
use std::net::Ipv4Addr;

pub const ETHERNET_HEADER_LEN: usize = 14;
pub const ETHERTYPE_IPV4: u16 = 0x0800;
pub const IPV4_MIN_HEADER_LEN: usize = 20;

pub const PROTO_TCP: u8 = 6;
pub const PROTO_UDP: u8 = 17;

/// Mask of the two ECN bits in the TOS byte.
const ECN_MASK: u8 = 0b0000_0011;

/// The 2-bit ECN codepoint carried in the IPv4 TOS byte (RFC 3168).
/// IPv4 TOS 字节中携带的 2 位 ECN 码点 (RFC 3168)。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EcnCodepoint {
    NotEct = 0b00,
    Ect1 = 0b01,
    Ect0 = 0b10,
    /// Congestion experienced.
    /// 经历拥塞。
    Ce = 0b11,
}

impl EcnCodepoint {
    pub fn from_tos(tos: u8) -> Self {
        match tos & ECN_MASK {
            0b00 => EcnCodepoint::NotEct,
            0b01 => EcnCodepoint::Ect1,
            0b10 => EcnCodepoint::Ect0,
            _ => EcnCodepoint::Ce,
        }
    }

    pub fn is_congestion_experienced(self) -> bool {
        self == EcnCodepoint::Ce
    }
}

/// The subset of the IPv4 header the engine needs.
///
/// 引擎所需的 IPv4 头字段子集。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv4Header {
    /// Header length in bytes (IHL * 4).
    /// 头长度（字节），即 IHL * 4。
    pub header_len: usize,
    pub tos: u8,
    pub total_length: u16,
    pub protocol: u8,
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
}

impl Ipv4Header {
    /// Decodes an IPv4 header from the start of `packet`.
    ///
    /// Options are skipped but must be fully present in the buffer.
    ///
    /// 从 `packet` 起始处解码 IPv4 头。选项会被跳过，但必须完整存在于缓冲区中。
    pub fn parse(packet: &[u8]) -> Result<Self> {
        if packet.len() < IPV4_MIN_HEADER_LEN {
            return Err(Error::Truncated);
        }
        let mut buf = &packet[..IPV4_MIN_HEADER_LEN];
        let version_ihl = buf.get_u8();
        let version = version_ihl >> 4;
        if version != 4 {
            return Err(NonConformance::NotIpv4(version).into());
        }
        let header_len = usize::from(version_ihl & 0x0F) * 4;
        if header_len < IPV4_MIN_HEADER_LEN {
            return Err(NonConformance::HeaderTooShort(header_len).into());
        }
        if packet.len() < header_len {
            return Err(Error::Truncated);
        }

        let tos = buf.get_u8();
        let total_length = buf.get_u16();
        buf.advance(5); // identification, flags/fragment offset, ttl
        let protocol = buf.get_u8();
        buf.advance(2); // checksum
        let source = Ipv4Addr::from(buf.get_u32());
        let destination = Ipv4Addr::from(buf.get_u32());

        Ok(Self {
            header_len,
            tos,
            total_length,
            protocol,
            source,
            destination,
        })
    }

    pub fn ecn(&self) -> EcnCodepoint {
        EcnCodepoint::from_tos(self.tos)
    }
}

/// Strips the Ethernet header, returning the IPv4 packet behind it.
/// 去掉以太网头，返回其后的 IPv4 包。
pub fn strip_ethernet(frame: &[u8]) -> Result<&[u8]> {
    if frame.len() < ETHERNET_HEADER_LEN {
        return Err(Error::Truncated);
    }
    let mut ethertype = &frame[12..ETHERNET_HEADER_LEN];
    let ethertype = ethertype.get_u16();
    if ethertype != ETHERTYPE_IPV4 {
        return Err(NonConformance::NotIpv4EtherType(ethertype).into());
    }
    Ok(&frame[ETHERNET_HEADER_LEN..])
}

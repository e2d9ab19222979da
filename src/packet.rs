//! packet 模块：对原始帧与数据报进行边界检查的视图。
//! The packet module: bounds-checked views over raw frames and datagrams.
//!
//! Every parser in this module reads only from the slice it is given and
//! returns [`Error::Truncated`] before any read that would cross its end.

pub mod ipv4;
pub mod quic;
pub mod tcp;
pub mod udp;

use crate::error::{Error, NonConformance, Result};
use crate::flow::FlowKey;
use ipv4::{Ipv4Header, PROTO_TCP, PROTO_UDP};
use tcp::TcpHeader;
use udp::UdpHeader;

/// The transport header found behind the IPv4 header.
/// IPv4 头之后的传输层头。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    Tcp(TcpHeader),
    Udp(UdpHeader),
}

/// A parsed IPv4 packet with its transport header and transport payload.
///
/// 已解析的 IPv4 包，包含传输层头及传输层载荷。
#[derive(Debug, Clone)]
pub struct PacketView<'a> {
    pub ip: Ipv4Header,
    pub transport: Transport,
    /// Transport payload, bounded by both the IP total length and the buffer end.
    /// 传输层载荷，同时受 IP 总长度与缓冲区末尾约束。
    pub payload: &'a [u8],
}

impl<'a> PacketView<'a> {
    /// Parses an Ethernet frame carrying IPv4.
    /// 解析承载 IPv4 的以太网帧。
    pub fn from_ethernet(frame: &'a [u8]) -> Result<Self> {
        Self::from_ip(ipv4::strip_ethernet(frame)?)
    }

    /// Parses a packet starting at its IPv4 header.
    /// 解析从 IPv4 头开始的包。
    pub fn from_ip(packet: &'a [u8]) -> Result<Self> {
        let ip = Ipv4Header::parse(packet)?;
        let segment = packet.get(ip.header_len..).ok_or(Error::Truncated)?;
        let (transport, transport_len) = match ip.protocol {
            PROTO_TCP => {
                let tcp = TcpHeader::parse(segment)?;
                let len = tcp.header_len;
                (Transport::Tcp(tcp), len)
            }
            PROTO_UDP => (Transport::Udp(UdpHeader::parse(segment)?), udp::UDP_HEADER_LEN),
            other => {
                return Err(NonConformance::UnsupportedProtocol(other).into());
            }
        };

        let start = ip.header_len + transport_len;
        let ip_end = usize::from(ip.total_length).min(packet.len()).max(start);
        let payload = packet.get(start..ip_end).ok_or(Error::Truncated)?;

        Ok(Self {
            ip,
            transport,
            payload,
        })
    }

    /// The flow key in the packet's direction of travel.
    /// 按包传输方向构造的流键。
    pub fn key(&self) -> FlowKey {
        let (src_port, dst_port) = self.ports();
        FlowKey::new(self.ip.source, self.ip.destination, src_port, dst_port)
    }

    pub fn ports(&self) -> (u16, u16) {
        match &self.transport {
            Transport::Tcp(tcp) => (tcp.src_port, tcp.dst_port),
            Transport::Udp(udp) => (udp.src_port, udp.dst_port),
        }
    }

    /// TCP payload length as announced by the IP and TCP length fields.
    ///
    /// `total_length - ip_header_len - tcp_header_len`, saturating at zero so a
    /// lying length field cannot underflow.
    pub fn tcp_payload_len(&self) -> Option<u32> {
        match &self.transport {
            Transport::Tcp(tcp) => Some(
                u32::from(self.ip.total_length)
                    .saturating_sub(self.ip.header_len as u32)
                    .saturating_sub(tcp.header_len as u32),
            ),
            Transport::Udp(_) => None,
        }
    }
}

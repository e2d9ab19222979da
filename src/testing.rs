//! 测试辅助工具模块：构造以太网/IPv4/TCP/UDP/QUIC 测试包。
//! Test utilities module: builders for Ethernet/IPv4/TCP/UDP/QUIC test packets.

#![cfg(test)]

use crate::classifier::Policy;
use crate::classifier::mapping::QueueMapping;
use crate::classifier::policy::ThroughputReduction;
use crate::flow::FlowKey;
use crate::packet::ipv4::{ETHERTYPE_IPV4, PROTO_TCP, PROTO_UDP};
use crate::packet::quic::varint;
use bytes::BufMut;
use std::net::Ipv4Addr;

pub const CLIENT: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 2);
pub const SERVER: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 9);

/// The default policy: identity queue mapping and the throughput-reduction test.
pub fn default_policy() -> Policy {
    Policy::new(QueueMapping::new(), ThroughputReduction::default())
}

/// The two endpoints of one direction of a conversation.
#[derive(Debug, Clone, Copy)]
pub struct Endpoints {
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    pub src_port: u16,
    pub dst_port: u16,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            src: CLIENT,
            dst: SERVER,
            src_port: 40000,
            dst_port: 443,
        }
    }
}

impl Endpoints {
    pub fn key(&self) -> FlowKey {
        FlowKey::new(self.src, self.dst, self.src_port, self.dst_port)
    }

    pub fn reversed(&self) -> Self {
        Self {
            src: self.dst,
            dst: self.src,
            src_port: self.dst_port,
            dst_port: self.src_port,
        }
    }

    /// An IPv4 packet carrying a TCP segment with `payload_len` zero bytes.
    pub fn tcp(&self, seq: u32, ack: u32, payload_len: usize) -> Vec<u8> {
        let mut segment = Vec::with_capacity(20 + payload_len);
        segment.put_u16(self.src_port);
        segment.put_u16(self.dst_port);
        segment.put_u32(seq);
        segment.put_u32(ack);
        segment.put_u8(5 << 4);
        segment.put_u8(0x10); // ACK
        segment.put_u16(65535);
        segment.put_u16(0);
        segment.put_u16(0);
        segment.put_bytes(0, payload_len);
        self.ipv4(PROTO_TCP, &segment)
    }

    /// An IPv4 packet carrying a UDP datagram with `payload`.
    pub fn udp(&self, payload: &[u8]) -> Vec<u8> {
        let mut datagram = Vec::with_capacity(8 + payload.len());
        datagram.put_u16(self.src_port);
        datagram.put_u16(self.dst_port);
        datagram.put_u16((8 + payload.len()) as u16);
        datagram.put_u16(0);
        datagram.put_slice(payload);
        self.ipv4(PROTO_UDP, &datagram)
    }

    fn ipv4(&self, protocol: u8, transport: &[u8]) -> Vec<u8> {
        let mut packet = Vec::with_capacity(20 + transport.len());
        packet.put_u8(0x45);
        packet.put_u8(0);
        packet.put_u16((20 + transport.len()) as u16);
        packet.put_u32(0);
        packet.put_u8(64);
        packet.put_u8(protocol);
        packet.put_u16(0);
        packet.put_slice(&self.src.octets());
        packet.put_slice(&self.dst.octets());
        packet.put_slice(transport);
        packet
    }
}

/// Wraps an IPv4 packet in an Ethernet header.
pub fn ethernet(packet: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(14 + packet.len());
    frame.put_bytes(0x02, 6);
    frame.put_bytes(0x04, 6);
    frame.put_u16(ETHERTYPE_IPV4);
    frame.put_slice(packet);
    frame
}

/// Sets the ECN codepoint of an IPv4 packet.
pub fn set_ecn(packet: &mut [u8], codepoint: u8) {
    packet[1] = (packet[1] & !0b11) | (codepoint & 0b11);
}

/// A 1-RTT packet: short header followed by filler up to `len` bytes.
pub fn short_packet(spin: bool, len: usize) -> Vec<u8> {
    let mut packet = vec![0u8; len.max(1)];
    let spin_bit = if spin { 0x20 } else { 0 };
    packet[0] = 0x40 | spin_bit | 0x01;
    packet
}

/// A long-header packet. `packet_type` is the 2-bit type; Initial packets
/// carry an empty token.
pub fn long_packet(packet_type: u8, dcid: &[u8], scid: &[u8], payload_len: usize) -> Vec<u8> {
    let mut packet = Vec::new();
    packet.put_u8(0xC0 | (packet_type & 0b11) << 4);
    packet.put_u32(1);
    packet.put_u8(dcid.len() as u8);
    packet.put_slice(dcid);
    packet.put_u8(scid.len() as u8);
    packet.put_slice(scid);
    if packet_type == 0 {
        let _ = varint::encode(0, &mut packet);
    }
    // Two-byte form, as most stacks write it.
    packet.put_u16(0x4000 | payload_len as u16);
    packet.put_bytes(0xAB, payload_len);
    packet
}

//! tests/common/harness.rs
use bytes::BufMut;
use flow_responsiveness::classifier::Policy;
use flow_responsiveness::classifier::mapping::QueueMapping;
use flow_responsiveness::classifier::policy::ThroughputReduction;
use flow_responsiveness::flow::FlowKey;
use flow_responsiveness::report::CycleReport;
use flow_responsiveness::{Config, Engine};
use std::net::Ipv4Addr;
use std::sync::{Arc, Once};
use tokio::sync::mpsc;

/// Initializes tracing for tests, ensuring it's only done once.
pub fn init_tracing() {
    static TRACING_INIT: Once = Once::new();
    TRACING_INIT.call_once(|| {
        let filter = std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "flow_responsiveness=debug".to_string());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .init();
    });
}

/// An engine plus the receiving end of its report stream.
pub struct TestHarness {
    pub engine: Arc<Engine>,
    pub reports: mpsc::Receiver<CycleReport>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self::with_policy(
            config,
            Policy::new(QueueMapping::new(), ThroughputReduction::default()),
        )
    }

    pub fn with_policy(config: Config, policy: Policy) -> Self {
        init_tracing();
        let (engine, reports) = Engine::new(config, policy).unwrap();
        Self {
            engine: Arc::new(engine),
            reports,
        }
    }

    /// Drains every report published so far.
    pub fn drain(&mut self) -> Vec<CycleReport> {
        let mut out = Vec::new();
        while let Ok(report) = self.reports.try_recv() {
            out.push(report);
        }
        out
    }
}

/// One direction of a conversation, able to build packets travelling that way.
#[derive(Debug, Clone, Copy)]
pub struct Path {
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    pub src_port: u16,
    pub dst_port: u16,
}

impl Path {
    pub fn new(src: Ipv4Addr, src_port: u16, dst: Ipv4Addr, dst_port: u16) -> Self {
        Self {
            src,
            dst,
            src_port,
            dst_port,
        }
    }

    /// A sender inside the default 10.0.0.0/24 experiment block.
    pub fn client(port: u16) -> Self {
        Self::new(Ipv4Addr::new(10, 0, 0, 7), port, Ipv4Addr::new(172, 16, 0, 1), 443)
    }

    pub fn key(&self) -> FlowKey {
        FlowKey::new(self.src, self.dst, self.src_port, self.dst_port)
    }

    pub fn reversed(&self) -> Self {
        Self::new(self.dst, self.dst_port, self.src, self.src_port)
    }

    /// IPv4 + TCP, no options, `payload_len` zero bytes of payload.
    pub fn tcp(&self, seq: u32, ack: u32, payload_len: usize) -> Vec<u8> {
        let mut segment = Vec::with_capacity(20 + payload_len);
        segment.put_u16(self.src_port);
        segment.put_u16(self.dst_port);
        segment.put_u32(seq);
        segment.put_u32(ack);
        segment.put_u8(5 << 4);
        segment.put_u8(0x18);
        segment.put_u16(0xFFFF);
        segment.put_u32(0);
        segment.put_bytes(0, payload_len);
        self.ipv4(6, 0, &segment)
    }

    /// IPv4 + UDP carrying `payload`.
    pub fn udp(&self, payload: &[u8]) -> Vec<u8> {
        let mut datagram = Vec::with_capacity(8 + payload.len());
        datagram.put_u16(self.src_port);
        datagram.put_u16(self.dst_port);
        datagram.put_u16((8 + payload.len()) as u16);
        datagram.put_u16(0);
        datagram.put_slice(payload);
        self.ipv4(17, 0, &datagram)
    }

    /// The same TCP segment with the CE codepoint set.
    pub fn tcp_ce(&self, seq: u32, ack: u32, payload_len: usize) -> Vec<u8> {
        let mut packet = self.tcp(seq, ack, payload_len);
        packet[1] |= 0b11;
        packet
    }

    fn ipv4(&self, protocol: u8, tos: u8, transport: &[u8]) -> Vec<u8> {
        let mut packet = Vec::with_capacity(20 + transport.len());
        packet.put_u8(0x45);
        packet.put_u8(tos);
        packet.put_u16((20 + transport.len()) as u16);
        packet.put_u16(0x1234);
        packet.put_u16(0x4000);
        packet.put_u8(64);
        packet.put_u8(protocol);
        packet.put_u16(0);
        packet.put_slice(&self.src.octets());
        packet.put_slice(&self.dst.octets());
        packet.put_slice(transport);
        packet
    }
}

/// Prepends an Ethernet header announcing IPv4.
pub fn ethernet(packet: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(14 + packet.len());
    frame.put_slice(&[0x02, 0, 0, 0, 0, 1]);
    frame.put_slice(&[0x02, 0, 0, 0, 0, 2]);
    frame.put_u16(0x0800);
    frame.put_slice(packet);
    frame
}

/// A QUIC 1-RTT packet of `len` bytes.
pub fn quic_short(spin: bool, len: usize) -> Vec<u8> {
    let mut packet = vec![0x5Au8; len.max(1)];
    packet[0] = 0x40 | if spin { 0x20 } else { 0x00 };
    packet
}

/// A QUIC long-header packet with a two-byte Length field.
/// Type 0 (Initial) gets an empty token.
pub fn quic_long(packet_type: u8, dcid: &[u8], scid: &[u8], payload_len: u16) -> Vec<u8> {
    let mut packet = Vec::new();
    packet.put_u8(0xC0 | ((packet_type & 0b11) << 4));
    packet.put_u32(0x0000_0001);
    packet.put_u8(dcid.len() as u8);
    packet.put_slice(dcid);
    packet.put_u8(scid.len() as u8);
    packet.put_slice(scid);
    if packet_type == 0 {
        packet.put_u8(0);
    }
    packet.put_u16(0x4000 | payload_len);
    packet.put_bytes(0, usize::from(payload_len));
    packet
}

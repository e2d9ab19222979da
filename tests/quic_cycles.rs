//! End-to-end QUIC spin-bit cycles through the public engine API.
pub mod common;

use common::harness::{Path, TestHarness, ethernet, quic_long, quic_short};
use flow_responsiveness::Config;
use flow_responsiveness::classifier::category::{Category, ClassId, ClassIds};
use flow_responsiveness::classifier::mapping::TrafficClass;
use flow_responsiveness::collector::DropReason;
use flow_responsiveness::flow::Protocol;
use flow_responsiveness::{Engine, Error, TcAction};
use std::time::Duration;
use tokio::time::Instant;

const INITIAL: u8 = 0;
const HANDSHAKE: u8 = 2;

fn send_short(engine: &Engine, path: &Path, spin: bool, count: usize, now: Instant) -> TcAction {
    let frame = ethernet(&path.udp(&quic_short(spin, 1000)));
    let mut last = TcAction::Unspecified;
    for _ in 0..count {
        last = engine.classify_egress(&frame, now);
    }
    last
}

#[tokio::test(start_paused = true)]
async fn test_handshake_datagram_is_tracked_without_report() {
    let mut harness = TestHarness::new();
    let path = Path::client(50000);

    let mut datagram = quic_long(INITIAL, &[0xAA; 8], &[0xBB; 8], 80);
    assert_eq!(datagram.len(), 106);
    datagram.extend(quic_long(HANDSHAKE, &[0xAA; 8], &[0xBB; 8], 69));
    assert_eq!(datagram.len(), 200);

    let action = harness
        .engine
        .classify_egress(&ethernet(&path.udp(&datagram)), Instant::now());
    assert_eq!(action, TcAction::Classified(TrafficClass(0)));
    assert!(harness.drain().is_empty());

    let snapshot = harness.engine.snapshot(&path.key());
    let state = snapshot.state.unwrap();
    assert_eq!(state.protocol, Protocol::Quic);
    assert_eq!(state.bytes.current(), 200);
    // QUIC flows never get an ack tracker.
    assert_eq!(snapshot.tracker, None);
    assert!(snapshot.ecn.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_handshake_then_spin_cycles() {
    let mut harness = TestHarness::new();
    let path = Path::client(50001);
    let engine = harness.engine.clone();

    let handshake = quic_long(INITIAL, &[1; 8], &[2; 8], 1000);
    engine.classify_egress(&ethernet(&path.udp(&handshake)), Instant::now());

    // The last handshake flight is coalesced with the first 1-RTT packet.
    let mut datagram = quic_long(HANDSHAKE, &[1; 8], &[], 100);
    datagram.extend(quic_short(false, 500));
    engine.classify_egress(&ethernet(&path.udp(&datagram)), Instant::now());

    tokio::time::advance(Duration::from_millis(25)).await;
    send_short(&engine, &path, true, 2, Instant::now());
    tokio::time::advance(Duration::from_millis(25)).await;
    send_short(&engine, &path, false, 1, Instant::now());

    let reports = harness.drain();
    assert_eq!(reports.len(), 2);
    // Handshake bytes plus the short packet's own bytes.
    assert_eq!(reports[0].bytes, 1026 + 500);
    assert_eq!(reports[0].rtt, Duration::from_millis(25));
    assert_eq!(reports[1].bytes, 2000);
    assert_eq!(reports[1].rtt, Duration::from_millis(25));
    assert_eq!(reports[1].spin_history & 0b111, 0b011);
    assert!(reports.iter().all(|r| r.protocol == Protocol::Quic));
}

#[tokio::test(start_paused = true)]
async fn test_flow_backing_off_after_drops_is_responsive() {
    let mut harness = TestHarness::new();
    let engine = harness.engine.clone();
    let path = Path::client(50002);

    send_short(&engine, &path, false, 10, Instant::now());
    let outcome = engine.on_kernel_drop(&path.udp(&quic_short(false, 1000)), DropReason(3));
    assert!(outcome.is_ok());

    let mut spin = false;
    for count in [8, 6, 1] {
        spin = !spin;
        tokio::time::advance(Duration::from_millis(30)).await;
        send_short(&engine, &path, spin, count, Instant::now());
    }

    let reports = harness.drain();
    let bytes: Vec<u32> = reports.iter().map(|r| r.bytes).collect();
    assert_eq!(bytes, vec![10_000, 8_000, 6_000]);
    assert_eq!(reports[0].drops, 1);

    let last = &reports[2];
    let expected = ClassIds::default().id(Category::ECN_UNCLASS_LOSS_RESP);
    assert!(last.new_class);
    assert_eq!(last.class_id, expected);
    assert_eq!(last.tally.drop_responsive, 1);
    assert_eq!(
        send_short(&engine, &path, spin, 1, Instant::now()),
        TcAction::Classified(TrafficClass(expected.0))
    );
    // The cumulative drop counter survives the class change.
    assert_eq!(
        engine.snapshot(&path.key()).cumulative_drops.unwrap().value(),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn test_wider_edge_threshold_skips_single_flips() {
    let mut config = Config::default();
    config.quic.edge_threshold = 2;
    let mut harness = TestHarness::with_config(config);
    let engine = harness.engine.clone();
    let path = Path::client(50003);

    // Alternating single flips never form an edge for E = 2.
    for spin in [false, true, false, true] {
        send_short(&engine, &path, spin, 1, Instant::now());
    }
    assert!(harness.drain().is_empty());

    // A second one in a row does.
    send_short(&engine, &path, true, 1, Instant::now());
    let reports = harness.drain();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].bytes, 4000);
    assert_eq!(reports[0].class_id, ClassId(0));
}

#[tokio::test]
async fn test_malformed_datagrams_are_left_alone() {
    let harness = TestHarness::new();
    let path = Path::client(50004);
    let now = Instant::now();

    // Fixed bit cleared.
    let mut bad = quic_short(false, 100);
    bad[0] &= !0x40;
    // Length field runs past the datagram.
    let mut short_length = quic_long(HANDSHAKE, &[1; 4], &[], 300);
    short_length.truncate(120);
    // Length field beyond the accepted bound.
    let oversized = quic_long(HANDSHAKE, &[1; 4], &[], 1600);

    for datagram in [bad, short_length, oversized] {
        let frame = ethernet(&path.udp(&datagram));
        assert_eq!(harness.engine.classify_egress(&frame, now), TcAction::Unspecified);
    }
    assert!(matches!(
        harness.engine.try_classify_egress(&ethernet(&path.udp(&[])), now),
        Err(Error::Truncated)
    ));
    assert!(!harness.engine.snapshot(&path.key()).is_tracked());
}

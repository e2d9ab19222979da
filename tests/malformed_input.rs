//! Random and mutated input fed to every hook: nothing may panic, and garbage
//! is never classified.
pub mod common;

use common::harness::{Path, TestHarness, ethernet, quic_long, quic_short};
use flow_responsiveness::TcAction;
use flow_responsiveness::collector::{DropReason, EnqueueStatus};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::Instant;

const ROUNDS: usize = 2000;

#[test]
fn test_random_bytes_never_panic() {
    let harness = TestHarness::new();
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let now = Instant::now();

    for _ in 0..ROUNDS {
        let len = rng.random_range(0..1600);
        let mut buf = vec![0u8; len];
        rng.fill(&mut buf[..]);

        let _ = harness.engine.classify_egress(&buf, now);
        let _ = harness.engine.on_dequeue(&buf);
        let _ = harness.engine.on_enqueue(
            &buf,
            EnqueueStatus::Dropped {
                queue_drops: rng.random(),
            },
        );
        let _ = harness.engine.on_kernel_drop(&buf, DropReason(rng.random()));
        let _ = harness.engine.observe_inbound(&buf);
    }
}

#[test]
fn test_random_udp_payloads_never_panic() {
    let harness = TestHarness::new();
    let mut rng = StdRng::seed_from_u64(17);
    let path = Path::client(45000);
    let now = Instant::now();

    for _ in 0..ROUNDS {
        let len = rng.random_range(0..1400);
        let mut payload = vec![0u8; len];
        rng.fill(&mut payload[..]);
        let frame = ethernet(&path.udp(&payload));
        // Either it parsed as QUIC or it was left alone; both are fine.
        let _ = harness.engine.classify_egress(&frame, now);
    }
}

#[test]
fn test_payloads_without_fixed_bit_are_never_classified() {
    let harness = TestHarness::new();
    let mut rng = StdRng::seed_from_u64(99);
    let path = Path::client(45001);
    let now = Instant::now();

    for _ in 0..ROUNDS {
        let len = rng.random_range(1..1400);
        let mut payload = vec![0u8; len];
        rng.fill(&mut payload[..]);
        payload[0] &= !0x40;
        let frame = ethernet(&path.udp(&payload));
        assert_eq!(harness.engine.classify_egress(&frame, now), TcAction::Unspecified);
    }
    assert!(!harness.engine.snapshot(&path.key()).is_tracked());
}

#[test]
fn test_mutated_valid_frames_never_panic() {
    let harness = TestHarness::new();
    let mut rng = StdRng::seed_from_u64(2024);
    let path = Path::client(45002);
    let now = Instant::now();

    let mut coalesced = quic_long(0, &[3; 8], &[4; 8], 200);
    coalesced.extend(quic_short(true, 300));
    let seeds = [
        ethernet(&path.tcp(1, 1, 200)),
        ethernet(&path.udp(&coalesced)),
        ethernet(&path.udp(&quic_short(false, 64))),
    ];

    for _ in 0..ROUNDS {
        let mut frame = seeds[rng.random_range(0..seeds.len())].clone();
        for _ in 0..rng.random_range(1..8) {
            let at = rng.random_range(0..frame.len());
            frame[at] = rng.random();
        }
        if rng.random_bool(0.3) {
            let keep = rng.random_range(0..frame.len());
            frame.truncate(keep);
        }
        let _ = harness.engine.classify_egress(&frame, now);
        if frame.len() > 14 {
            let _ = harness.engine.observe_inbound(&frame[14..]);
            let _ = harness.engine.on_dequeue(&frame[14..]);
        }
    }
}

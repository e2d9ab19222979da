//! Tests for flow keys, registers, state records and tables.
use super::*;
use crate::classifier::category::ClassId;
use crate::classifier::policy::Verdict;
use crate::classifier::category::Responsiveness;
use crate::error::Error;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::time::Instant;

fn key(n: u16) -> FlowKey {
    FlowKey::new(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 1, 1), n, 80)
}

#[test]
fn test_key_reversal() {
    let k = key(5000);
    let r = k.reversed();
    assert_eq!(r.src_ip, k.dst_ip);
    assert_eq!(r.dst_port, 5000);
    assert_eq!(r.reversed(), k);
    assert_ne!(r, k);
    assert_eq!(k.to_string(), "10.0.0.1:5000 -> 10.0.1.1:80");
}

#[test]
fn test_register_saturates_at_255() {
    let mut register = SaturatingRegister::default();
    for _ in 0..300 {
        register.increment();
    }
    assert_eq!(register.current(), 255);
    assert_eq!(register.raw(), 0xFF);
    assert!(!register.increment());
}

#[test]
fn test_register_saturation_does_not_carry_into_history() {
    let mut register = SaturatingRegister::from_raw(0x0000_03FE);
    assert!(register.increment());
    assert!(!register.increment());
    assert_eq!(register.raw(), 0x0000_03FF);
    assert_eq!(register.cycle(1), 3);
}

#[test]
fn test_register_shift_ages_cycles() {
    let mut register = SaturatingRegister::default();
    for count in [4u32, 3, 2, 1] {
        for _ in 0..count {
            register.increment();
        }
        register.shift();
    }
    assert_eq!(register.current(), 0);
    assert_eq!(register.cycle(1), 1);
    assert_eq!(register.cycle(2), 2);
    assert_eq!(register.cycle(3), 3);
    // The first cycle has aged out.
    assert_eq!(register.cycle(4), 0);
    assert_eq!(register.raw(), 0x0302_0100);
}

#[test]
fn test_cumulative_counter_stops_at_low_byte() {
    let mut counter = CumulativeCounter::default();
    for _ in 0..1000 {
        counter.increment();
    }
    assert_eq!(counter.value(), 255);

    counter.set(0x1234);
    assert!(counter.increment());
    assert_eq!(counter.value(), 0x1235);
}

#[test]
fn test_byte_window_roll() {
    let mut window = ByteWindow::new(100);
    window.add(50);
    assert_eq!(window.roll(10), 150);
    assert_eq!(window.roll(20), 10);
    assert_eq!(window.roll(30), 20);
    assert_eq!(window.roll(40), 30);
    assert_eq!(window.current(), 40);
    assert_eq!(window.cycle(1), 30);
    assert_eq!(window.cycle(2), 20);
    assert_eq!(window.cycle(3), 10);
    assert_eq!(window.cycle(4), 0);

    window.add(u32::MAX);
    assert_eq!(window.current(), u32::MAX);
}

#[test]
fn test_tally_majority_ties_are_responsive() {
    let mut tally = Tally::default();
    tally.record_ecn(Verdict::Unresponsive);
    assert_eq!(tally.ecn_majority(), Responsiveness::Unresponsive);
    tally.record_ecn(Verdict::Responsive);
    assert_eq!(tally.ecn_majority(), Responsiveness::Responsive);
    tally.record_drop(Verdict::Responsive);
    tally.record_drop(Verdict::Unresponsive);
    tally.record_drop(Verdict::Unresponsive);
    assert_eq!(tally.drop_majority(), Responsiveness::Unresponsive);
    assert_eq!(tally.drop_responsive, 1);
    assert_eq!(tally.drop_unresponsive, 2);
}

#[test]
fn test_spin_history_appends_low_bit() {
    let mut state = FlowState::new_quic(Instant::now(), ClassId(0), 1, 0);
    state.push_spin(0);
    state.push_spin(1);
    state.push_spin(1);
    assert_eq!(state.spin_history, 0b1011);
    assert_eq!(state.protocol, Protocol::Quic);
}

#[test]
fn test_ack_tracker_arms_once() {
    let mut tracker = AckTracker::default();
    tracker.observe(7000, 500);
    assert!(tracker.active);
    assert_eq!(tracker.highest_ack, 7000);
    assert_eq!(tracker.expected_ack_on_ack, 500);

    // Already armed: the snapshot stays, the highest ack still advances.
    tracker.observe(8000, 900);
    assert_eq!(tracker.expected_ack_on_ack, 500);
    assert_eq!(tracker.highest_ack, 8000);

    // A stale ack never moves the highest ack backwards.
    tracker.observe(7500, 900);
    assert_eq!(tracker.highest_ack, 8000);
}

#[test]
fn test_round_trip_closes_only_when_both_sides_caught_up() {
    let tracker = AckTracker {
        highest_ack: 7000,
        expected_ack_on_ack: 500,
        active: true,
    };
    assert!(tracker.closes_round_trip(7000, 500));
    assert!(tracker.closes_round_trip(6000, 900));
    assert!(!tracker.closes_round_trip(7001, 500));
    assert!(!tracker.closes_round_trip(7000, 499));

    let idle = AckTracker { active: false, ..tracker };
    assert!(!idle.closes_round_trip(7000, 500));
}

#[test]
fn test_round_trip_across_sequence_wrap() {
    let tracker = AckTracker {
        highest_ack: 100,
        expected_ack_on_ack: 10,
        active: true,
    };
    assert!(tracker.closes_round_trip(u32::MAX - 50, 10));
}

#[test]
fn test_table_capacity_is_enforced() {
    let table: DashTable<SaturatingRegister> = DashTable::with_capacity(2);
    assert!(table.insert_if_absent(key(1), SaturatingRegister::default()).unwrap());
    assert!(!table.insert_if_absent(key(1), SaturatingRegister::default()).unwrap());
    assert!(table.insert_if_absent(key(2), SaturatingRegister::default()).unwrap());
    assert!(matches!(
        table.insert_if_absent(key(3), SaturatingRegister::default()),
        Err(Error::TableFull)
    ));
    assert!(matches!(
        table.upsert(key(3), SaturatingRegister::default, |_, _| ()),
        Err(Error::TableFull)
    ));
    // Existing entries remain writable when full.
    let created = table
        .upsert(key(2), SaturatingRegister::default, |r, created| {
            r.increment();
            created
        })
        .unwrap();
    assert!(!created);
    assert_eq!(table.len(), 2);
    assert_eq!(table.get(&key(2)).unwrap().current(), 1);
    assert!(!table.contains(&key(3)));
}

#[test]
fn test_update_missing_entry_is_none() {
    let table: DashTable<CumulativeCounter> = DashTable::with_capacity(4);
    assert_eq!(table.update(&key(9), |c| c.increment()), None);
    assert!(table.is_empty());
}

#[test]
fn test_aggregate_has_its_own_slot() {
    let tables = FlowTables::new(1);
    tables
        .drop_results
        .insert_if_absent(key(1), CumulativeCounter::default())
        .unwrap();
    tables
        .drop_results
        .insert_if_absent(FlowKey::AGGREGATE, CumulativeCounter::from_raw(3))
        .unwrap();
    assert_eq!(tables.drop_results.len(), 2);
    assert_eq!(tables.drops.capacity(), 1);
}

#[test]
fn test_concurrent_upserts_count_every_increment() {
    let table = Arc::new(DashTable::<CumulativeCounter>::with_capacity(16));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let table = table.clone();
            std::thread::spawn(move || {
                for _ in 0..50 {
                    table
                        .upsert(key(1), CumulativeCounter::default, |c, _| {
                            c.increment();
                        })
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(table.get(&key(1)).unwrap().value(), 200);
    assert_eq!(table.len(), 1);
}

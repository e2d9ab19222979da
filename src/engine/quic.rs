//! QUIC 路径：基于自旋位边沿的周期检测。
//! The QUIC path: cycle detection on spin-bit edges.

use super::{Engine, Step};
use crate::classifier::category::ClassId;
use crate::error::{Error, Result};
use crate::flow::{FlowKey, FlowState, FlowTable, Protocol, TableBackend};
use crate::packet::PacketView;
use crate::packet::quic::{CoalescedPackets, QuicHeader};
use tokio::time::Instant;

/// Clamps a datagram length into the byte counters.
fn byte_count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

impl<B: TableBackend> Engine<B> {
    /// Classifies one outgoing UDP datagram as QUIC.
    ///
    /// Every coalesced header is framed before any flow state is touched, so a
    /// malformed datagram leaves no trace. A short header (direct, or behind
    /// long-header packets) is sampled for its spin bit and accounts the bytes
    /// from its first byte to the end of the datagram. A datagram of long
    /// headers only is accounted in full but never closes a cycle.
    ///
    /// 将一个出向 UDP 数据报按 QUIC 进行分类。
    pub(super) fn classify_quic(&self, view: &PacketView<'_>, now: Instant) -> Result<ClassId> {
        let key = view.key();
        let datagram = view.payload;
        if datagram.is_empty() {
            return Err(Error::Truncated);
        }

        let mut short = None;
        for header in CoalescedPackets::new(datagram, self.config.quic.max_length_field) {
            if let QuicHeader::Short(header) = header? {
                short = Some(header);
            }
        }

        let step = match short {
            Some(header) => self.sample_spin(key, header.spin_bit(), byte_count(header.len), now)?,
            None => self.account_long_only(key, byte_count(datagram.len()), now)?,
        };
        Ok(self.finish(key, Protocol::Quic, step))
    }

    /// Checks for a spin edge, then appends the bit to the flow's history.
    ///
    /// With `E = edge_threshold`, a cycle closes when
    /// `(history + spin) mod 2^E == 2^(E-1)`. For `E = 1` that is every change
    /// of the spin bit.
    fn sample_spin(&self, key: FlowKey, spin: u32, bytes: u32, now: Instant) -> Result<Step> {
        let edge = self.config.quic.edge_threshold;
        let period_mask = (1u32 << edge).wrapping_sub(1);
        let edge_value = 1u32 << (edge - 1);
        let initial = self.classifier.initial_class();

        self.tables.flows.upsert(
            key,
            || FlowState::new_quic(now, initial, spin, bytes),
            |flow, created| {
                if created {
                    return Step::Created(flow.class_id);
                }
                let step = if (flow.spin_history.wrapping_add(spin) & period_mask) == edge_value {
                    Step::Closed(Box::new(self.close_cycle(key, flow, now, bytes)))
                } else {
                    flow.bytes.add(bytes);
                    Step::Continued(flow.class_id)
                };
                flow.push_spin(spin);
                step
            },
        )
    }

    fn account_long_only(&self, key: FlowKey, bytes: u32, now: Instant) -> Result<Step> {
        let initial = self.classifier.initial_class();
        self.tables.flows.upsert(
            key,
            || FlowState::new_quic(now, initial, 0, bytes),
            |flow, created| {
                if created {
                    return Step::Created(flow.class_id);
                }
                flow.bytes.add(bytes);
                Step::Continued(flow.class_id)
            },
        )
    }
}

//! 返回方向 TCP 报文段的确认跟踪。
//! Acknowledgment tracking on the return direction of TCP flows.

use crate::error::{Error, Result};
use crate::flow::{AckTracker, DashBackend, FlowTable, FlowTables, TableBackend};
use crate::packet::{PacketView, Transport};
use std::sync::Arc;
use tracing::debug;

/// What the tracker did with one inbound segment.
/// 跟踪器对一个入向报文段的处理结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// Not a TCP segment.
    NotTcp,
    /// The tracker entry did not exist and was created unarmed.
    Created,
    /// The tracker was updated; `armed` is set when this segment armed a new round trip.
    Updated { highest_ack: u32, armed: bool },
}

/// Observes segments travelling back to the classified sender.
///
/// Segments are keyed with source and destination swapped so that they land on
/// the tracker of the forward flow they acknowledge.
///
/// 观测返回被分类发送方的报文段。报文段以交换后的源/目的作为键，
/// 从而落到它们所确认的正向流的跟踪器上。
#[derive(Debug, Clone)]
pub struct AckCollector<B: TableBackend = DashBackend> {
    tables: Arc<FlowTables<B>>,
}

impl<B: TableBackend> AckCollector<B> {
    pub fn new(tables: Arc<FlowTables<B>>) -> Self {
        Self { tables }
    }

    pub fn observe(&self, packet: &[u8]) -> Result<AckOutcome> {
        let view = PacketView::from_ip(packet)?;
        let (Transport::Tcp(tcp), Some(payload_len)) = (&view.transport, view.tcp_payload_len())
        else {
            return Ok(AckOutcome::NotTcp);
        };

        let key = view.key().reversed();
        let ack = tcp.ack;
        let peer_expected_ack = tcp.seq.wrapping_add(payload_len);

        self.tables.ack_trackers.upsert(
            key,
            || AckTracker {
                highest_ack: ack,
                expected_ack_on_ack: peer_expected_ack,
                active: false,
            },
            |tracker, created| {
                if created {
                    debug!(%key, error = %Error::MissingTrackerEntry, "created ack tracker");
                    return AckOutcome::Created;
                }
                let armed = !tracker.active;
                tracker.observe(ack, peer_expected_ack);
                AckOutcome::Updated {
                    highest_ack: tracker.highest_ack,
                    armed,
                }
            },
        )
    }
}

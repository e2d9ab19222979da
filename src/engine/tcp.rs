//! TCP 路径：基于确认进度的往返周期检测。
//! The TCP path: round-trip cycle detection driven by acknowledgment progress.

use super::{Engine, Step};
use crate::classifier::category::ClassId;
use crate::error::Result;
use crate::flow::{AckTracker, FlowState, FlowTable, Protocol, TableBackend};
use crate::packet::PacketView;
use crate::packet::tcp::TcpHeader;
use crate::seq;
use tokio::time::Instant;
use tracing::{debug, warn};

impl<B: TableBackend> Engine<B> {
    /// Classifies one outgoing TCP segment.
    ///
    /// A new flow starts with `expected_ack = seq + payload` and the initial
    /// class. On an existing flow the segment closes the running cycle when the
    /// flow's ack tracker shows the peer has acknowledged `expected_ack` and
    /// this segment acknowledges what the peer had sent when the round trip was
    /// armed. Otherwise its payload joins the running cycle.
    ///
    /// 对一个出向 TCP 报文段进行分类。
    pub(super) fn classify_tcp(
        &self,
        view: &PacketView<'_>,
        tcp: &TcpHeader,
        now: Instant,
    ) -> Result<ClassId> {
        let key = view.key();
        let payload = view.tcp_payload_len().unwrap_or(0);
        let seq_end = tcp.seq.wrapping_add(payload);
        let initial = self.classifier.initial_class();

        let step = self.tables.flows.upsert(
            key,
            || FlowState::new_tcp(now, initial, seq_end, payload),
            |flow, created| {
                if created {
                    return Step::Created(flow.class_id);
                }

                let Some(tracker) = self.tables.ack_trackers.get(&key) else {
                    debug!(%key, "no ack tracker for flow, creating one");
                    if let Err(e) = self
                        .tables
                        .ack_trackers
                        .insert_if_absent(key, AckTracker::default())
                    {
                        warn!(%key, error = %e, "could not create ack tracker");
                    }
                    flow.bytes.add(payload);
                    return Step::Continued(flow.class_id);
                };

                if !tracker.closes_round_trip(flow.expected_ack, tcp.ack) {
                    flow.bytes.add(payload);
                    return Step::Continued(flow.class_id);
                }

                self.tables
                    .ack_trackers
                    .update(&key, |tracker| tracker.active = false);
                flow.expected_ack = seq::max_quarter(flow.expected_ack, seq_end);
                Step::Closed(Box::new(self.close_cycle(key, flow, now, payload)))
            },
        )?;

        Ok(self.finish(key, Protocol::Tcp, step))
    }
}

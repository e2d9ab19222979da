//! 队列出队点的 ECN 标记采集。
//! ECN mark collection at the queue dequeue point.

use crate::error::Result;
use crate::flow::{DashBackend, FlowTable, FlowTables, SaturatingRegister, TableBackend};
use crate::packet::PacketView;
use std::sync::Arc;
use tracing::trace;

/// What the ECN collector did with one dequeued packet.
/// ECN 采集器对一个出队包的处理结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcnOutcome {
    /// The packet was not marked congestion-experienced.
    NotMarked,
    /// The mark was counted; holds the cycle count afterwards.
    Counted(u8),
    /// The cycle count already reads 255.
    Saturated,
}

/// Counts congestion-experienced marks per flow.
///
/// 按流统计 "经历拥塞" 标记。
#[derive(Debug, Clone)]
pub struct EcnCollector<B: TableBackend = DashBackend> {
    tables: Arc<FlowTables<B>>,
}

impl<B: TableBackend> EcnCollector<B> {
    pub fn new(tables: Arc<FlowTables<B>>) -> Self {
        Self { tables }
    }

    /// Inspects a packet leaving the shaping queue, starting at its IP header.
    ///
    /// 检查离开整形队列的包（从其 IP 头开始）。
    pub fn on_dequeue(&self, packet: &[u8]) -> Result<EcnOutcome> {
        let view = PacketView::from_ip(packet)?;
        if !view.ip.ecn().is_congestion_experienced() {
            return Ok(EcnOutcome::NotMarked);
        }

        let key = view.key();
        let outcome = self.tables.ecn.upsert(
            key,
            SaturatingRegister::default,
            |register, created| {
                if created {
                    trace!(%key, "creating ECN register on first mark");
                }
                if register.increment() {
                    EcnOutcome::Counted(register.current())
                } else {
                    EcnOutcome::Saturated
                }
            },
        )?;
        Ok(outcome)
    }
}

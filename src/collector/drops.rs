//! 丢包采集：入队失败与内核被动丢包通知。
//! Drop collection: enqueue failures and kernel passive-drop notifications.

use crate::config::SourcePrefix;
use crate::error::Result;
use crate::flow::{
    CumulativeCounter, DashBackend, FlowKey, FlowTable, FlowTables, SaturatingRegister,
    TableBackend,
};
use crate::packet::PacketView;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Result reported by the shaping queue's enqueue operation.
/// 整形队列入队操作报告的结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueStatus {
    Success,
    /// The packet was not accepted. `queue_drops` is the queue's own running
    /// drop statistic at that moment.
    /// 包未被接受。`queue_drops` 为此刻队列自身的累计丢包统计。
    Dropped { queue_drops: u32 },
}

/// The kernel's reason code attached to a freed packet.
///
/// 内核附加在被释放包上的原因码。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DropReason(pub u32);

impl DropReason {
    /// `SKB_DROP_REASON_NOT_SPECIFIED`.
    pub const NOT_SPECIFIED: DropReason = DropReason(2);

    pub fn is_specified(self) -> bool {
        self != Self::NOT_SPECIFIED
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the drop collector did with one notification.
/// 丢包采集器对一次通知的处理结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    /// A successful enqueue; the flow's drop register exists afterwards.
    Registered,
    /// The drop was counted.
    Counted { cycle: u8, cumulative: u32 },
    /// The notification carried no specific reason.
    UnspecifiedReason,
    /// The source address lies outside the configured prefix.
    OutsidePrefix,
}

/// Feeds both drop triggers into the per-flow drop records.
///
/// 将两种丢包触发源写入每流丢包记录。
#[derive(Debug, Clone)]
pub struct DropCollector<B: TableBackend = DashBackend> {
    tables: Arc<FlowTables<B>>,
    prefix: SourcePrefix,
}

impl<B: TableBackend> DropCollector<B> {
    pub fn new(tables: Arc<FlowTables<B>>, prefix: SourcePrefix) -> Self {
        Self { tables, prefix }
    }

    /// Handles the return of a shaping-queue enqueue, starting at the IP header.
    ///
    /// 处理整形队列入队的返回（从 IP 头开始）。
    pub fn on_enqueue(&self, packet: &[u8], status: EnqueueStatus) -> Result<DropOutcome> {
        let key = PacketView::from_ip(packet)?.key();
        match status {
            EnqueueStatus::Success => {
                self.tables
                    .drops
                    .insert_if_absent(key, SaturatingRegister::default())?;
                Ok(DropOutcome::Registered)
            }
            EnqueueStatus::Dropped { queue_drops } => {
                debug!(%key, queue_drops, "enqueue failed");
                // The queue's own total is recorded even when the flow has no room.
                let outcome = self.count(key);
                self.record_aggregate(queue_drops)?;
                outcome
            }
        }
    }

    /// Handles a kernel passive-drop notification, starting at the IP header.
    ///
    /// 处理内核被动丢包通知（从 IP 头开始）。
    pub fn on_kernel_drop(&self, packet: &[u8], reason: DropReason) -> Result<DropOutcome> {
        if !reason.is_specified() {
            return Ok(DropOutcome::UnspecifiedReason);
        }
        let view = PacketView::from_ip(packet)?;
        if !self.prefix.contains(view.ip.source) {
            trace!(source = %view.ip.source, prefix = %self.prefix, "drop outside prefix");
            return Ok(DropOutcome::OutsidePrefix);
        }

        let key = view.key();
        debug!(%key, %reason, "kernel drop");
        let outcome = self.count(key)?;
        let register = self.tables.drops.get(&key).unwrap_or_default();
        self.record_aggregate(register.raw())?;
        Ok(outcome)
    }

    fn count(&self, key: FlowKey) -> Result<DropOutcome> {
        let cycle = self.tables.drops.upsert(
            key,
            SaturatingRegister::default,
            |register, _| {
                register.increment();
                register.current()
            },
        )?;
        let cumulative = self.tables.drop_results.upsert(
            key,
            CumulativeCounter::default,
            |counter, _| {
                counter.increment();
                counter.value()
            },
        )?;
        Ok(DropOutcome::Counted { cycle, cumulative })
    }

    fn record_aggregate(&self, value: u32) -> Result<()> {
        self.tables.drop_results.upsert(
            FlowKey::AGGREGATE,
            CumulativeCounter::default,
            |counter, _| counter.set(value),
        )
    }
}

//! 周期摘要报告及其发布。
//! Per-cycle summary reports and their publication.

use crate::classifier::category::ClassId;
use crate::error::{Error, Result};
use crate::flow::{FlowKey, Protocol, Tally};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::Instant;
use tracing::{trace, warn};

/// The summary published every time a flow closes a cycle.
///
/// 每当一个流结束一个周期时发布的摘要。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub key: FlowKey,
    /// Time of the cycle close, measured from engine start.
    /// 周期结束的时间，自引擎启动起计。
    pub timestamp: Duration,
    /// Time since the previous cycle close.
    /// 距上一次周期结束的时间。
    pub rtt: Duration,
    pub class_id: ClassId,
    pub bytes: u32,
    pub ecn_marks: u8,
    pub drops: u8,
    pub new_class: bool,
    pub tally: Tally,
    /// Spin-bit history as it stood before this cycle's bit (QUIC only).
    /// 本周期位加入之前的自旋位历史（仅 QUIC）。
    pub spin_history: u32,
    pub protocol: Protocol,
}

/// The consumer-facing end of the report stream.
///
/// `publish` must never wait; a sink that cannot take a report right now
/// returns an error and the report is dropped.
///
/// 报告流面向消费者的一端。`publish` 绝不能等待；暂时无法接收报告的 sink
/// 返回错误，报告被丢弃。
pub trait ReportSink: Send + Sync + 'static {
    fn publish(&self, report: CycleReport) -> Result<()>;
}

impl ReportSink for mpsc::Sender<CycleReport> {
    fn publish(&self, report: CycleReport) -> Result<()> {
        self.try_send(report).map_err(|e| match e {
            TrySendError::Full(_) => Error::ChannelFull,
            TrySendError::Closed(_) => Error::ChannelClosed,
        })
    }
}

impl ReportSink for mpsc::UnboundedSender<CycleReport> {
    fn publish(&self, report: CycleReport) -> Result<()> {
        self.send(report).map_err(|_| Error::ChannelClosed)
    }
}

/// Stamps and publishes cycle reports.
///
/// 为周期报告打时间戳并发布。
pub struct Emitter {
    sink: Box<dyn ReportSink>,
    epoch: Instant,
    published: AtomicU64,
    dropped: AtomicU64,
}

impl Emitter {
    pub fn new(sink: Box<dyn ReportSink>, epoch: Instant) -> Self {
        Self {
            sink,
            epoch,
            published: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Offset of `now` from the engine epoch.
    pub fn timestamp(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.epoch)
    }

    pub fn emit(&self, report: CycleReport) {
        let key = report.key;
        match self.sink.publish(report) {
            Ok(()) => {
                self.published.fetch_add(1, Ordering::Relaxed);
            }
            Err(Error::ChannelFull) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                trace!(%key, "report channel full, dropping cycle report");
            }
            Err(e) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(%key, error = %e, "failed to publish cycle report");
            }
        }
    }

    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("published", &self.published())
            .field("dropped", &self.dropped())
            .finish_non_exhaustive()
    }
}

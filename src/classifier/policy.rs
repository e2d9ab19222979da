//! 可插拔的响应性判定策略。
//! Pluggable responsiveness tests.

use crate::flow::{ByteWindow, SaturatingRegister};

/// The outcome of one responsiveness test for one signal.
/// 针对单个信号的一次响应性判定结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Responsive,
    Unresponsive,
}

/// Everything a responsiveness test may look at when a cycle closes.
///
/// 周期结束时响应性判定可查看的全部信息。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleSample {
    /// ECN marks; the low byte is the cycle that just closed.
    /// ECN 标记；低字节为刚结束的周期。
    pub ecn: SaturatingRegister,
    /// Drops; the low byte is the cycle that just closed.
    /// 丢包；低字节为刚结束的周期。
    pub drops: SaturatingRegister,
    /// Byte totals; cycle 0 is the cycle that just closed.
    /// 字节总数；第 0 个周期为刚结束的周期。
    pub bytes: ByteWindow,
}

impl CycleSample {
    pub fn ecn_marks(&self) -> u8 {
        self.ecn.current()
    }

    pub fn drop_count(&self) -> u8 {
        self.drops.current()
    }

    pub fn cycle_bytes(&self) -> u32 {
        self.bytes.current()
    }
}

/// Decides, per signal, whether a flow reacted to congestion this cycle.
///
/// Returning `None` means the cycle carries no evidence for that signal and no
/// tally is recorded.
///
/// 针对每种信号判断流在本周期是否对拥塞作出反应。返回 `None` 表示本周期对该信号
/// 没有证据，不记录计数。
pub trait ResponsivenessTest: Send + Sync + 'static {
    fn ecn(&self, sample: &CycleSample) -> Option<Verdict>;

    fn loss(&self, sample: &CycleSample) -> Option<Verdict>;
}

/// Checks whether throughput fell after a signal was observed.
///
/// A signal recorded `lag` cycles before the cycle that just closed is evidence.
/// The flow is unresponsive when the closed cycle still carried more than
/// `numerator / denominator` of the bytes of the signalled cycle, i.e. when
/// `numerator * bytes[lag] < denominator * bytes[0]`.
///
/// 检查观测到信号后吞吐量是否下降。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThroughputReduction {
    pub lag: u32,
    pub numerator: u32,
    pub denominator: u32,
}

impl Default for ThroughputReduction {
    fn default() -> Self {
        Self {
            lag: 2,
            numerator: 9,
            denominator: 10,
        }
    }
}

impl ThroughputReduction {
    fn judge(&self, signal: SaturatingRegister, bytes: &ByteWindow) -> Option<Verdict> {
        if signal.cycle(self.lag) == 0 {
            return None;
        }
        let before = u64::from(self.numerator) * u64::from(bytes.cycle(self.lag as usize));
        let after = u64::from(self.denominator) * u64::from(bytes.current());
        if before < after {
            Some(Verdict::Unresponsive)
        } else {
            Some(Verdict::Responsive)
        }
    }
}

impl ResponsivenessTest for ThroughputReduction {
    fn ecn(&self, sample: &CycleSample) -> Option<Verdict> {
        self.judge(sample.ecn, &sample.bytes)
    }

    fn loss(&self, sample: &CycleSample) -> Option<Verdict> {
        self.judge(sample.drops, &sample.bytes)
    }
}

//! 每流状态记录。
//! Per-flow state records.

use crate::classifier::category::ClassId;
use crate::classifier::policy::Verdict;
use crate::classifier::category::Responsiveness;
use crate::seq;
use std::fmt;
use tokio::time::Instant;

/// The transport a flow was first classified through.
/// 流首次被分类时所经由的传输协议。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    Quic,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Protocol::Tcp => "TCP",
            Protocol::Quic => "QUIC",
        };
        write!(f, "{}", s)
    }
}

/// Byte totals of the running cycle and the three cycles before it.
///
/// 当前进行中周期及其前三个周期的字节总数。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ByteWindow {
    current: u32,
    previous: [u32; 3],
}

impl ByteWindow {
    pub fn new(current: u32) -> Self {
        Self {
            current,
            previous: [0; 3],
        }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    /// Byte total `cycles_ago` cycles back; 0 is the running cycle.
    /// `cycles_ago` 个周期前的字节总数；0 为当前进行中的周期。
    pub fn cycle(&self, cycles_ago: usize) -> u32 {
        match cycles_ago {
            0 => self.current,
            n => self.previous.get(n - 1).copied().unwrap_or(0),
        }
    }

    pub fn add(&mut self, bytes: u32) {
        self.current = self.current.saturating_add(bytes);
    }

    /// Closes the running cycle and opens a new one with `bytes`.
    /// Returns the total of the cycle just closed.
    ///
    /// 结束当前周期并以 `bytes` 开启新周期，返回刚结束周期的总量。
    pub fn roll(&mut self, bytes: u32) -> u32 {
        let closed = self.current;
        self.previous = [closed, self.previous[0], self.previous[1]];
        self.current = bytes;
        closed
    }
}

/// Lifetime tallies of responsiveness verdicts. Only ever incremented.
///
/// 响应性判定的终身计数，只增不减。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub ecn_responsive: u32,
    pub ecn_unresponsive: u32,
    pub drop_responsive: u32,
    pub drop_unresponsive: u32,
}

impl Tally {
    pub fn record_ecn(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::Responsive => self.ecn_responsive = self.ecn_responsive.saturating_add(1),
            Verdict::Unresponsive => {
                self.ecn_unresponsive = self.ecn_unresponsive.saturating_add(1)
            }
        }
    }

    pub fn record_drop(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::Responsive => self.drop_responsive = self.drop_responsive.saturating_add(1),
            Verdict::Unresponsive => {
                self.drop_unresponsive = self.drop_unresponsive.saturating_add(1)
            }
        }
    }

    /// Majority vote over ECN verdicts; ties count as responsive.
    /// 对 ECN 判定进行多数表决，平局视为响应。
    pub fn ecn_majority(&self) -> Responsiveness {
        majority(self.ecn_responsive, self.ecn_unresponsive)
    }

    pub fn drop_majority(&self) -> Responsiveness {
        majority(self.drop_responsive, self.drop_unresponsive)
    }
}

fn majority(responsive: u32, unresponsive: u32) -> Responsiveness {
    if responsive >= unresponsive {
        Responsiveness::Responsive
    } else {
        Responsiveness::Unresponsive
    }
}

/// The state kept for one flow from its first packet on.
///
/// 从首个包开始为一个流保存的状态。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowState {
    /// When the last cycle closed (or the flow was first seen).
    /// 上一个周期结束（或首次见到该流）的时间。
    pub last_sample: Instant,
    pub class_id: ClassId,
    /// Recently observed QUIC spin bits, newest in bit 0.
    /// 最近观测到的 QUIC 自旋位，最新的位于第 0 位。
    pub spin_history: u32,
    /// Next sequence offset the sender expects to see acknowledged (TCP only).
    /// 发送方期望被确认的下一个序列偏移（仅 TCP）。
    pub expected_ack: u32,
    pub bytes: ByteWindow,
    pub tally: Tally,
    pub protocol: Protocol,
}

impl FlowState {
    pub fn new_tcp(now: Instant, class_id: ClassId, expected_ack: u32, bytes: u32) -> Self {
        Self {
            last_sample: now,
            class_id,
            spin_history: 0,
            expected_ack,
            bytes: ByteWindow::new(bytes),
            tally: Tally::default(),
            protocol: Protocol::Tcp,
        }
    }

    pub fn new_quic(now: Instant, class_id: ClassId, spin_history: u32, bytes: u32) -> Self {
        Self {
            last_sample: now,
            class_id,
            spin_history,
            expected_ack: 0,
            bytes: ByteWindow::new(bytes),
            tally: Tally::default(),
            protocol: Protocol::Quic,
        }
    }

    /// Appends a spin bit to the history register.
    /// 将一个自旋位追加到历史寄存器。
    pub fn push_spin(&mut self, spin: u32) {
        self.spin_history = (self.spin_history << 1) | (spin & 1);
    }
}

/// Acknowledgment progress seen on the return path of a TCP flow.
///
/// TCP 流返回路径上观测到的确认进度。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AckTracker {
    /// Highest cumulative ack observed from the peer.
    /// 从对端观测到的最高累计确认号。
    pub highest_ack: u32,
    /// The peer's `seq + payload` when the current round trip was armed.
    /// 当前往返被启动时对端的 `seq + payload`。
    pub expected_ack_on_ack: u32,
    /// A round trip is outstanding.
    /// 存在一个未完成的往返。
    pub active: bool,
}

impl AckTracker {
    /// Records a segment from the peer and arms a round trip if none is active.
    ///
    /// 记录来自对端的一个报文段，若无活跃往返则启动一个。
    pub fn observe(&mut self, ack: u32, peer_expected_ack: u32) {
        self.highest_ack = seq::max_quarter(self.highest_ack, ack);
        if !self.active {
            self.active = true;
            self.expected_ack_on_ack = peer_expected_ack;
        }
    }

    /// Whether a forward segment closes the round trip for a flow that expects
    /// `expected_ack` to be acknowledged.
    ///
    /// 对于期望 `expected_ack` 被确认的流，一个正向报文段是否结束了当前往返。
    pub fn closes_round_trip(&self, expected_ack: u32, forward_ack: u32) -> bool {
        self.active
            && seq::is_at_or_after_quarter(self.highest_ack, expected_ack)
            && seq::is_at_or_after_quarter(forward_ack, self.expected_ack_on_ack)
    }
}

//! 饱和移位寄存器与累计计数器。
//! Saturating shift registers and cumulative counters.

const BYTE: u32 = 0xFF;

/// A 32-bit register holding one byte-sized count per sampling cycle.
///
/// The low byte is the current cycle's count and saturates at 255. Each cycle
/// boundary shifts the register left by one byte, so the upper three bytes hold
/// the counts of the three previous cycles, newest first.
///
/// 每个采样周期保存一个字节计数的 32 位寄存器。低字节是当前周期的计数，
/// 饱和于 255。每个周期边界将寄存器左移一个字节。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaturatingRegister(u32);

impl SaturatingRegister {
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    /// The current cycle's count.
    /// 当前周期的计数。
    pub const fn current(self) -> u8 {
        (self.0 & BYTE) as u8
    }

    /// The count recorded `cycles_ago` cycles back (0 is the current cycle).
    /// Anything older than three cycles has aged out and reads as zero.
    ///
    /// `cycles_ago` 个周期前记录的计数（0 为当前周期）。超过三个周期的计数读为 0。
    pub const fn cycle(self, cycles_ago: u32) -> u8 {
        if cycles_ago > 3 {
            return 0;
        }
        ((self.0 >> (8 * cycles_ago)) & BYTE) as u8
    }

    /// Adds one to the current cycle unless it already reads 255.
    /// Returns whether the count changed.
    ///
    /// 当前周期计数未到 255 时加一，返回计数是否改变。
    pub fn increment(&mut self) -> bool {
        if self.0 & BYTE == BYTE {
            return false;
        }
        self.0 += 1;
        true
    }

    /// Moves every cycle one byte up and opens an empty current cycle.
    /// 将每个周期上移一个字节，并开启一个空的当前周期。
    pub fn shift(&mut self) {
        self.0 <<= 8;
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }
}

/// A running drop total that stops counting once its low byte reads 255.
///
/// The same record type also stores the path-wide aggregate, which is written
/// as a whole value rather than incremented.
///
/// 累计丢包计数，低字节到达 255 后停止计数。同一记录类型也用于保存全路径汇总值。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CumulativeCounter(u32);

impl CumulativeCounter {
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn value(self) -> u32 {
        self.0
    }

    pub fn increment(&mut self) -> bool {
        if self.0 & BYTE == BYTE {
            return false;
        }
        self.0 += 1;
        true
    }

    pub fn set(&mut self, value: u32) {
        self.0 = value;
    }
}

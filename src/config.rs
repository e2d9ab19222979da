//! 定义了分类引擎的可配置参数。
//! Defines configurable parameters for the classification engine.

use crate::classifier::category::ClassIds;
use crate::error::{Error, Result};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// A structure containing all configurable parameters for the engine.
///
/// 包含引擎所有可配置参数的结构体。
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Responsiveness classifier parameters.
    /// 响应性分类器参数。
    pub classifier: ClassifierConfig,

    /// QUIC header parsing and spin-bit sampling parameters.
    /// QUIC 头解析与自旋位采样参数。
    pub quic: QuicConfig,

    /// Drop accounting parameters.
    /// 丢包统计参数。
    pub drops: DropConfig,

    /// Flow table sizing.
    /// 流表容量。
    pub tables: TableConfig,

    /// Report channel parameters.
    /// 报告通道参数。
    pub output: OutputConfig,
}

/// Responsiveness classifier parameters.
///
/// 响应性分类器参数。
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// The maximum segment size in bytes.
    /// 最大报文段长度（字节）。
    pub mss: u32,
    /// A cycle must carry at least `min_cycle_segments * mss` bytes before
    /// any responsiveness verdict is recorded for it.
    /// 一个周期至少需要携带 `min_cycle_segments * mss` 字节才会记录响应性判定。
    pub min_cycle_segments: u32,
    /// Class identifiers assigned to the nine classification categories.
    /// 分配给九个分类类别的类标识符。
    pub class_ids: ClassIds,
}

/// QUIC header parsing and spin-bit sampling parameters.
///
/// QUIC 头解析与自旋位采样参数。
#[derive(Debug, Clone)]
pub struct QuicConfig {
    /// log2 of the short-header sampling period.
    /// 短头采样周期的 log2 值。
    pub edge_threshold: u32,
    /// Token and payload length fields must be strictly below this value.
    /// 令牌长度和载荷长度字段必须严格小于此值。
    pub max_length_field: u64,
}

/// Drop accounting parameters.
///
/// 丢包统计参数。
#[derive(Debug, Clone, Default)]
pub struct DropConfig {
    /// Kernel drop notifications are only counted for sources inside this prefix.
    /// 仅对源地址位于该前缀内的内核丢包通知进行计数。
    pub source_prefix: SourcePrefix,
}

/// Flow table sizing.
///
/// 流表容量。
#[derive(Debug, Clone)]
pub struct TableConfig {
    /// The maximum number of entries each per-flow table may hold.
    /// 每个流表可容纳的最大条目数。
    pub capacity: usize,
}

/// Report channel parameters.
///
/// 报告通道参数。
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Number of cycle reports buffered before new reports are dropped.
    /// 在新报告被丢弃之前缓冲的周期报告数量。
    pub channel_capacity: usize,
}

impl Config {
    /// Checks the configuration for values the engine cannot operate with.
    ///
    /// 检查配置中引擎无法使用的值。
    pub fn validate(&self) -> Result<()> {
        if self.classifier.mss == 0 {
            return Err(Error::InvalidConfig("mss must be non-zero".into()));
        }
        if let Some((first, second, id)) = self.classifier.class_ids.shared_id() {
            return Err(Error::InvalidConfig(format!(
                "class id {} is assigned to both {} and {}",
                id, first, second
            )));
        }
        if self.quic.edge_threshold == 0 || self.quic.edge_threshold >= 32 {
            return Err(Error::InvalidConfig(format!(
                "edge_threshold must be in 1..32, got {}",
                self.quic.edge_threshold
            )));
        }
        if self.tables.capacity == 0 {
            return Err(Error::InvalidConfig("table capacity must be non-zero".into()));
        }
        if self.output.channel_capacity == 0 {
            return Err(Error::InvalidConfig(
                "report channel capacity must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// The byte threshold below which a cycle yields no verdict.
    /// 低于该字节数的周期不会产生判定。
    pub fn min_cycle_bytes(&self) -> u32 {
        self.classifier
            .min_cycle_segments
            .saturating_mul(self.classifier.mss)
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            mss: 1500,
            min_cycle_segments: 4,
            class_ids: ClassIds::default(),
        }
    }
}

impl Default for QuicConfig {
    fn default() -> Self {
        Self {
            edge_threshold: 1,
            max_length_field: 1500,
        }
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self { capacity: 10240 }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 4096,
        }
    }
}

/// The first three octets of an IPv4 address block.
///
/// IPv4 地址块的前三个八位组。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourcePrefix([u8; 3]);

impl SourcePrefix {
    pub const fn new(a: u8, b: u8, c: u8) -> Self {
        Self([a, b, c])
    }

    /// Checks whether `addr` lies inside this /24 block.
    /// 检查 `addr` 是否位于该 /24 地址块内。
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        addr.octets()[..3] == self.0
    }

    pub fn octets(&self) -> [u8; 3] {
        self.0
    }
}

impl Default for SourcePrefix {
    fn default() -> Self {
        Self([10, 0, 0])
    }
}

impl fmt::Display for SourcePrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.0[0], self.0[1], self.0[2])
    }
}

impl FromStr for SourcePrefix {
    type Err = Error;

    /// Accepts `"a.b.c"` or a full dotted quad whose last octet is ignored.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let addr = if s.split('.').count() == 3 {
            format!("{}.0", s).parse::<Ipv4Addr>()?
        } else {
            s.parse::<Ipv4Addr>()?
        };
        let [a, b, c, _] = addr.octets();
        Ok(Self([a, b, c]))
    }
}

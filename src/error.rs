//! 定义了库中所有可能的错误类型。
//! Defines all possible error types in the library.

use std::fmt;
use thiserror::Error;

/// The reason a packet was rejected as not conforming to its wire format.
/// 包因不符合其线路格式而被拒绝的原因。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonConformance {
    /// The QUIC fixed bit (0x40) was not set.
    /// QUIC 固定位 (0x40) 未设置。
    FixedBitUnset,
    /// A length field exceeded the configured sanity bound.
    /// 长度字段超出了配置的合理性上限。
    LengthOutOfRange { value: u64, limit: u64 },
    /// The IP version nibble was not 4.
    /// IP 版本字段不是 4。
    NotIpv4(u8),
    /// A header length field was smaller than the minimum header size.
    /// 头部长度字段小于最小头部长度。
    HeaderTooShort(usize),
    /// The EtherType did not announce IPv4.
    /// EtherType 不是 IPv4。
    NotIpv4EtherType(u16),
    /// The transport protocol is neither TCP nor UDP.
    /// 传输层协议既不是 TCP 也不是 UDP。
    UnsupportedProtocol(u8),
}

impl fmt::Display for NonConformance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NonConformance::FixedBitUnset => write!(f, "QUIC fixed bit unset"),
            NonConformance::LengthOutOfRange { value, limit } => {
                write!(f, "length field {} not below limit {}", value, limit)
            }
            NonConformance::NotIpv4(version) => write!(f, "IP version {}", version),
            NonConformance::HeaderTooShort(len) => write!(f, "header length {} too short", len),
            NonConformance::NotIpv4EtherType(ty) => write!(f, "ethertype {:#06x}", ty),
            NonConformance::UnsupportedProtocol(proto) => {
                write!(f, "transport protocol {}", proto)
            }
        }
    }
}

/// The primary error type for the flow classification engine.
/// 流分类引擎的主要错误类型。
#[derive(Debug, Error)]
pub enum Error {
    /// The buffer ended before the next field could be read.
    /// 缓冲区在读取下一个字段之前结束。
    #[error("packet truncated")]
    Truncated,

    /// The packet does not conform to the expected wire format.
    /// 包不符合预期的线路格式。
    #[error("packet not conformant: {0}")]
    NotConformant(NonConformance),

    /// A create-if-absent operation failed because the table is at capacity.
    /// 由于表已满，"不存在则创建" 操作失败。
    #[error("flow table is full")]
    TableFull,

    /// An observation point expected a per-flow sub-record that does not exist yet.
    /// 观测点期望的流子记录尚不存在。
    #[error("no tracker entry for flow")]
    MissingTrackerEntry,

    /// The supplied configuration is invalid.
    /// 提供的配置无效。
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An error occurred during address parsing.
    /// 地址解析期间发生错误。
    #[error("Address parsing error: {0}")]
    AddressParse(#[from] std::net::AddrParseError),

    /// The consumer side of the report channel has gone away.
    /// 报告通道的消费端已关闭。
    #[error("report channel is closed")]
    ChannelClosed,

    /// The report channel is full and the report was not published.
    /// 报告通道已满，报告未被发布。
    #[error("report channel is full")]
    ChannelFull,
}

impl Error {
    /// Returns `true` for the errors that mean "leave this packet unclassified".
    ///
    /// 对于表示 "该包保持未分类" 的错误返回 `true`。
    pub fn is_unclassifiable(&self) -> bool {
        matches!(
            self,
            Error::Truncated | Error::NotConformant(_) | Error::TableFull
        )
    }
}

impl From<NonConformance> for Error {
    fn from(reason: NonConformance) -> Self {
        Error::NotConformant(reason)
    }
}

/// A specialized `Result` type for this library.
/// 本库专用的 `Result` 类型。
pub type Result<T> = std::result::Result<T, Error>;

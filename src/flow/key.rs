//! 流键定义。
//! Flow key definition.

use std::fmt;
use std::net::Ipv4Addr;

/// Identifies one direction of one conversation.
///
/// Addresses and ports are held as host values; the wire byte order is only
/// relevant while parsing.
///
/// 标识一个会话的一个方向。地址与端口以主机值保存，线路字节序仅在解析时相关。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowKey {
    pub src_ip: Ipv4Addr,
    pub dst_ip: Ipv4Addr,
    pub src_port: u16,
    pub dst_port: u16,
}

impl FlowKey {
    /// The sentinel key under which the path-wide drop aggregate is stored.
    /// 保存全路径丢包汇总值的哨兵键。
    pub const AGGREGATE: FlowKey = FlowKey {
        src_ip: Ipv4Addr::new(0, 0, 0, 1),
        dst_ip: Ipv4Addr::new(0, 0, 0, 1),
        src_port: 1,
        dst_port: 1,
    };

    pub const fn new(src_ip: Ipv4Addr, dst_ip: Ipv4Addr, src_port: u16, dst_port: u16) -> Self {
        Self {
            src_ip,
            dst_ip,
            src_port,
            dst_port,
        }
    }

    /// The key of the opposite direction of the same conversation.
    ///
    /// 同一会话反方向的键。
    pub const fn reversed(&self) -> Self {
        Self {
            src_ip: self.dst_ip,
            dst_ip: self.src_ip,
            src_port: self.dst_port,
            dst_port: self.src_port,
        }
    }
}

impl fmt::Display for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} -> {}:{}",
            self.src_ip, self.src_port, self.dst_ip, self.dst_port
        )
    }
}

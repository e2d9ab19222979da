//! UDP 头解析。
//! UDP header parsing.

use crate::error::{Error, Result};
use bytes::Buf;

pub const UDP_HEADER_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdpHeader {
    pub src_port: u16,
    pub dst_port: u16,
    pub length: u16,
}

impl UdpHeader {
    pub fn parse(datagram: &[u8]) -> Result<Self> {
        if datagram.len() < UDP_HEADER_LEN {
            return Err(Error::Truncated);
        }
        let mut buf = &datagram[..UDP_HEADER_LEN];
        Ok(Self {
            src_port: buf.get_u16(),
            dst_port: buf.get_u16(),
            length: buf.get_u16(),
        })
    }
}

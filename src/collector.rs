//! 向流表写入信号计数的独立观测点。
//! Independent observation points that feed signal counters into the flow tables.
//!
//! Collectors only mutate the records they own and never close a cycle.

pub mod ack;
pub mod drops;
pub mod ecn;

pub use ack::AckCollector;
pub use drops::{DropCollector, DropReason, EnqueueStatus};
pub use ecn::EcnCollector;

//! 每流状态及保存它们的共享键控表。
//! Per-flow state and the shared keyed tables that hold it.

pub mod key;
pub mod register;
pub mod state;
pub mod table;

pub use key::FlowKey;
pub use register::{CumulativeCounter, SaturatingRegister};
pub use state::{AckTracker, ByteWindow, FlowState, Protocol, Tally};
pub use table::{DashBackend, DashTable, FlowTable, FlowTables, TableBackend};

#[cfg(test)]
mod tests;

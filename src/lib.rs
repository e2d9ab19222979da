#![deny(clippy::expect_used, clippy::unwrap_used)]

//! The root of the flow congestion-responsiveness classification library.
//! 流拥塞响应性分类库的根。

pub mod classifier;
pub mod collector;
pub mod config;
pub mod engine;
pub mod error;
pub mod flow;
pub mod packet;
pub mod report;
pub mod seq;

mod testing;

pub use config::Config;
pub use engine::{Engine, FlowSnapshot, TcAction};
pub use error::{Error, Result};

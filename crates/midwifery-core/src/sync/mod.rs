//! Offline sync: the pending-mutation queue and the connectivity monitor
//! that drains it.

mod monitor;
mod queue;

pub use monitor::*;
pub use queue::*;

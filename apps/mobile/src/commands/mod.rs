//! Command surface called by the UI shell.
//!
//! Every command returns `Result<T, String>` so the shell can surface the
//! message as is. Commands that write locally refresh the controller counters
//! afterwards so the pending badge stays current.

mod observations;
mod offline;
mod reference;
mod tasks;

pub use observations::*;
pub use offline::*;
pub use reference::*;
pub use tasks::*;

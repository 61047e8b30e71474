//! FieldSafe mobile composition root.
//!
//! Opens the on-device database, wires the storage, remote and sync layers,
//! and exposes the command functions the UI shell calls.

pub mod commands;
pub mod context;

pub use commands::*;
pub use context::MobileContext;

#[cfg(test)]
mod tests;

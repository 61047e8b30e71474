//! Domain types, ports and sync orchestration of the FieldSafe offline store.
//!
//! Storage and HTTP live in sibling crates; this crate only talks to them
//! through the repository traits and [`remote::RemoteApi`].

pub mod config;
pub mod errors;
pub mod metadata;
pub mod observations;
pub mod reference;
pub mod remote;
pub mod sync;
pub mod tasks;
pub mod utils;
pub mod workflow;

pub use config::OfflineConfig;
pub use errors::{DatabaseError, Error, RemoteError, RemoteResult, Result};

//! SQLite storage for the FieldSafe offline store.
//!
//! Reads go through an r2d2 pool; every write is funneled through the single
//! writer actor in [`db::write_actor`] so that multi-table changes commit
//! atomically and never contend for the database lock.

pub mod db;
pub mod errors;
pub mod metadata;
pub mod observations;
pub mod reference;
pub mod schema;
pub mod sync;
pub mod tasks;
mod utils;

pub use db::{create_pool, get_connection, init, run_migrations, DbPool, WriteHandle};
pub use errors::StorageError;
pub use metadata::MetadataRepository;
pub use observations::ObservationRepository;
pub use reference::ReferenceRepository;
pub use sync::SyncQueueRepository;
pub use tasks::TaskRepository;

//! SQLite persistence for the mutation queue.

pub mod queue;

pub use queue::{
    count_outstanding_tx, enqueue_tx, find_create_entry_tx, SyncQueueDB, SyncQueueRepository,
};

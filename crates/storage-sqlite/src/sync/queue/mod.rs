mod model;
mod repository;

pub use model::SyncQueueDB;
pub use repository::{count_outstanding_tx, enqueue_tx, find_create_entry_tx, SyncQueueRepository};

use async_trait::async_trait;

use super::{EnqueueRequest, QueueItem, QueueStatusUpdate};
use crate::errors::Result;

/// Durable, ordered log of unconfirmed writes.
#[async_trait]
pub trait SyncQueueRepositoryTrait: Send + Sync {
    /// Insert, or overwrite the entry with the same id. Generates an id when
    /// the request has none.
    async fn enqueue(&self, request: EnqueueRequest) -> Result<QueueItem>;

    /// PENDING and FAILED entries, oldest first.
    fn get_pending(&self) -> Result<Vec<QueueItem>>;

    fn get(&self, id: &str) -> Result<Option<QueueItem>>;

    /// Unconditional update by id; last writer wins.
    async fn update_status(&self, update: QueueStatusUpdate) -> Result<()>;

    async fn delete(&self, id: String) -> Result<()>;

    /// Number of PENDING and FAILED entries.
    fn count_pending(&self) -> Result<i64>;

    fn count_needs_review(&self) -> Result<i64>;

    /// Entries parked as NEEDS_REVIEW, oldest first.
    fn list_needs_review(&self) -> Result<Vec<QueueItem>>;

    /// Move entries left PROCESSING by an interrupted run back to PENDING.
    async fn reset_processing(&self) -> Result<usize>;
}

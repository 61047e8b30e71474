use async_trait::async_trait;

use super::{NewObservation, Observation, ObservationDto};
use crate::errors::Result;
use crate::sync::SyncStatus;
use crate::workflow::StatusTransition;

/// Local mirror of observations.
#[async_trait]
pub trait ObservationRepositoryTrait: Send + Sync {
    /// Bulk upsert of server rows in one transaction. Every row lands as
    /// SYNCED; a row already holding the same server id keeps its local id.
    /// Rows with queued changes are left untouched. Returns the number of
    /// rows written.
    async fn persist_from_server(&self, items: Vec<ObservationDto>) -> Result<usize>;

    /// Non-deleted rows, most recently updated first.
    fn get_local(&self) -> Result<Vec<Observation>>;

    /// Lookup by either server id or local id.
    fn get_local_by_id(&self, id: &str) -> Result<Option<Observation>>;

    /// Whether the row still has a mutation waiting for replay or in flight.
    fn has_queued_changes(&self, local_id: &str) -> Result<bool>;

    /// Insert a PENDING row and its CREATE queue entry atomically.
    async fn create_offline(&self, input: NewObservation) -> Result<Observation>;

    /// Reconcile a server response into the row identified by `local_id`:
    /// assign server id, version and timestamp, and overwrite each domain
    /// field only when the server supplied a value. While a newer change for
    /// the row is still queued, only the server id and version are taken.
    async fn mark_synced(&self, local_id: String, server: ObservationDto) -> Result<Observation>;

    async fn set_sync_status(&self, local_id: String, status: SyncStatus) -> Result<()>;

    /// Apply a workflow transition locally and record it for replay.
    async fn transition_offline(
        &self,
        id: String,
        transition: StatusTransition,
    ) -> Result<Observation>;

    /// Re-enqueue a CREATE for every unsynced row that lost its queue entry.
    async fn requeue_orphans(&self) -> Result<usize>;
}

/// UI-facing observation commands.
#[async_trait]
pub trait ObservationServiceTrait: Send + Sync {
    async fn fetch_observations(&self) -> Result<Vec<Observation>>;
    /// When the last successful online fetch completed.
    fn last_pulled_at(&self) -> Result<Option<String>>;
    fn get_observation(&self, id: &str) -> Result<Option<Observation>>;
    async fn create_observation(&self, input: NewObservation) -> Result<Observation>;
    async fn answer_observation(&self, id: &str, answer: String) -> Result<Observation>;
    async fn close_observation(&self, id: &str) -> Result<Observation>;
    async fn reject_observation(&self, id: &str, reason: String) -> Result<Observation>;
}

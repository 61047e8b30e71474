//! Drain pass: replays queued mutations against the remote API and folds the
//! results back into the mirror.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{
    FailureDisposition, MutationEnvelope, QueueEntityType, QueueItem, QueueOperation, QueueStatus,
    QueueStatusUpdate, RetryPolicy, SyncQueueRepositoryTrait, SyncStatus,
};
use crate::errors::{Error, RemoteError, Result};
use crate::observations::{NewObservation, ObservationRepositoryTrait};
use crate::remote::{CredentialStore, RemoteApi};
use crate::tasks::{NewTask, TaskRepositoryTrait};
use crate::utils::to_rfc3339;
use crate::workflow::StatusTransition;

pub const UNSUPPORTED_OPERATION: &str = "Unsupported operation";

#[derive(Debug, Error)]
enum ReplayError {
    #[error("{0}")]
    Remote(RemoteError),
    #[error("Unsupported operation")]
    Unsupported,
    #[error("Invalid queue payload: {0}")]
    InvalidPayload(String),
    #[error(transparent)]
    Storage(Error),
}

impl From<RemoteError> for ReplayError {
    fn from(err: RemoteError) -> Self {
        Self::Remote(err)
    }
}

/// What startup recovery repaired.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryReport {
    pub reset_processing: usize,
    pub requeued_orphans: usize,
}

pub struct SyncEngine {
    queue: Arc<dyn SyncQueueRepositoryTrait>,
    observations: Arc<dyn ObservationRepositoryTrait>,
    tasks: Arc<dyn TaskRepositoryTrait>,
    remote: Arc<dyn RemoteApi>,
    credentials: Arc<dyn CredentialStore>,
    policy: RetryPolicy,
}

impl SyncEngine {
    pub fn new(
        queue: Arc<dyn SyncQueueRepositoryTrait>,
        observations: Arc<dyn ObservationRepositoryTrait>,
        tasks: Arc<dyn TaskRepositoryTrait>,
        remote: Arc<dyn RemoteApi>,
        credentials: Arc<dyn CredentialStore>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            queue,
            observations,
            tasks,
            remote,
            credentials,
            policy,
        }
    }

    pub fn pending_count(&self) -> Result<i64> {
        self.queue.count_pending()
    }

    pub fn needs_review_count(&self) -> Result<i64> {
        self.queue.count_needs_review()
    }

    /// Repair state left behind by an interrupted process. Must run before the
    /// first drain pass.
    pub async fn recover(&self) -> Result<RecoveryReport> {
        let reset_processing = self.queue.reset_processing().await?;
        let requeued_orphans = self.observations.requeue_orphans().await?
            + self.tasks.requeue_orphans().await?;

        if reset_processing > 0 || requeued_orphans > 0 {
            warn!(
                "[OfflineSync] Recovery reset {} in-flight entries and re-enqueued {} orphaned rows",
                reset_processing, requeued_orphans
            );
        }
        Ok(RecoveryReport {
            reset_processing,
            requeued_orphans,
        })
    }

    /// Process every queued entry once, front to back, one at a time.
    ///
    /// Replay failures are recorded on the entry and never abort the pass;
    /// storage failures do. Once an entry of an entity fails or is waiting
    /// out its backoff, later entries of that entity wait for the next pass.
    pub async fn run_drain_pass(&self) -> Result<super::DrainOutcome> {
        let mut outcome = super::DrainOutcome::default();

        let token = self
            .credentials
            .access_token()
            .filter(|value| !value.trim().is_empty());
        let pending = self.queue.get_pending()?;

        let token = match token {
            Some(token) if !pending.is_empty() => token,
            Some(_) => {
                debug!("[OfflineSync] Queue is empty, nothing to replay");
                outcome.pending = self.queue.count_pending()?;
                return Ok(outcome);
            }
            None => {
                debug!(
                    "[OfflineSync] No access token, leaving {} queued mutations",
                    pending.len()
                );
                outcome.pending = self.queue.count_pending()?;
                return Ok(outcome);
            }
        };

        let mut blocked: HashSet<(QueueEntityType, String)> = HashSet::new();
        for item in pending {
            let entity = (item.entity_type, item.entity_id.clone());
            if blocked.contains(&entity) {
                debug!(
                    "[OfflineSync] Holding {} behind an earlier entry for {}",
                    item.id, item.entity_id
                );
                outcome.skipped += 1;
                continue;
            }

            if !item.is_due(Utc::now()) {
                debug!(
                    "[OfflineSync] Skipping {} until {}",
                    item.id,
                    item.next_retry_at.as_deref().unwrap_or_default()
                );
                blocked.insert(entity);
                outcome.skipped += 1;
                continue;
            }

            outcome.processed += 1;
            let attempt = item.retry_count.saturating_add(1);
            self.queue
                .update_status(QueueStatusUpdate {
                    retry_count: Some(attempt),
                    ..QueueStatusUpdate::new(item.id.clone(), QueueStatus::Processing)
                })
                .await?;

            match self.replay(&token, &item).await {
                Ok(()) => {
                    self.queue.delete(item.id.clone()).await?;
                    outcome.synced += 1;
                    debug!(
                        "[OfflineSync] Replayed {:?} {:?} for {}",
                        item.entity_type, item.operation, item.entity_id
                    );
                }
                Err(ReplayError::Storage(err)) => return Err(err),
                Err(failure) => {
                    let parked = self.record_failure(&item, attempt, failure).await?;
                    blocked.insert(entity);
                    if parked {
                        outcome.needs_review += 1;
                    } else {
                        outcome.failed += 1;
                    }
                }
            }
        }

        outcome.pending = self.queue.count_pending()?;
        info!(
            "[OfflineSync] Drain pass done: processed={} synced={} failed={} needs_review={} skipped={} pending={}",
            outcome.processed,
            outcome.synced,
            outcome.failed,
            outcome.needs_review,
            outcome.skipped,
            outcome.pending
        );
        Ok(outcome)
    }

    async fn replay(&self, token: &str, item: &QueueItem) -> std::result::Result<(), ReplayError> {
        match (item.entity_type, item.operation) {
            (QueueEntityType::Observation, QueueOperation::Create) => {
                let envelope: MutationEnvelope<NewObservation> = decode_payload(item)?;
                let created = self
                    .remote
                    .create_observation(token, &envelope.payload)
                    .await?;
                self.observations
                    .mark_synced(envelope.local_id, created)
                    .await
                    .map_err(ReplayError::Storage)?;
            }
            (QueueEntityType::Observation, QueueOperation::Update) => {
                let envelope: MutationEnvelope<StatusTransition> = decode_payload(item)?;
                let server_id = match envelope.server_id.clone() {
                    Some(id) => id,
                    None => self
                        .observations
                        .get_local_by_id(&envelope.local_id)
                        .map_err(ReplayError::Storage)?
                        .and_then(|row| row.server_id)
                        .ok_or_else(|| missing_server_id(&envelope.local_id))?,
                };
                let updated = self
                    .remote
                    .transition_observation(token, &server_id, &envelope.payload)
                    .await?;
                self.observations
                    .mark_synced(envelope.local_id, updated)
                    .await
                    .map_err(ReplayError::Storage)?;
            }
            (QueueEntityType::Task, QueueOperation::Create) => {
                let envelope: MutationEnvelope<NewTask> = decode_payload(item)?;
                let created = self.remote.create_task(token, &envelope.payload).await?;
                self.tasks
                    .mark_synced(envelope.local_id, created)
                    .await
                    .map_err(ReplayError::Storage)?;
            }
            (QueueEntityType::Task, QueueOperation::Update) => {
                let envelope: MutationEnvelope<StatusTransition> = decode_payload(item)?;
                let server_id = match envelope.server_id.clone() {
                    Some(id) => id,
                    None => self
                        .tasks
                        .get_local_by_id(&envelope.local_id)
                        .map_err(ReplayError::Storage)?
                        .and_then(|row| row.server_id)
                        .ok_or_else(|| missing_server_id(&envelope.local_id))?,
                };
                let updated = self
                    .remote
                    .transition_task(token, &server_id, &envelope.payload)
                    .await?;
                self.tasks
                    .mark_synced(envelope.local_id, updated)
                    .await
                    .map_err(ReplayError::Storage)?;
            }
            _ => return Err(ReplayError::Unsupported),
        }
        Ok(())
    }

    /// Returns `true` when the entry was parked as NEEDS_REVIEW.
    async fn record_failure(
        &self,
        item: &QueueItem,
        attempt: i32,
        failure: ReplayError,
    ) -> Result<bool> {
        let message = failure.to_string();
        let disposition = match &failure {
            ReplayError::Remote(err) => self.policy.disposition(attempt, err),
            _ => FailureDisposition::Park,
        };

        let (queue_status, row_status, next_retry_at) = match disposition {
            FailureDisposition::Park => (QueueStatus::NeedsReview, SyncStatus::NeedsReview, None),
            FailureDisposition::Retry => (
                QueueStatus::Failed,
                SyncStatus::Failed,
                Some(to_rfc3339(self.policy.next_retry_at(attempt, Utc::now()))),
            ),
        };

        warn!(
            "[OfflineSync] Replay of {} ({:?} {:?}) failed on attempt {}: {} -> {:?}",
            item.id, item.entity_type, item.operation, attempt, message, queue_status
        );

        self.queue
            .update_status(QueueStatusUpdate {
                id: item.id.clone(),
                status: queue_status,
                retry_count: Some(attempt),
                last_error: Some(message),
                next_retry_at,
            })
            .await?;

        // Only never-synced rows carry a queue-driven sync status.
        if item.operation == QueueOperation::Create {
            match item.entity_type {
                QueueEntityType::Observation => {
                    self.observations
                        .set_sync_status(item.entity_id.clone(), row_status)
                        .await?
                }
                QueueEntityType::Task => {
                    self.tasks
                        .set_sync_status(item.entity_id.clone(), row_status)
                        .await?
                }
                QueueEntityType::Profile | QueueEntityType::Attachment => {}
            }
        }

        Ok(disposition == FailureDisposition::Park)
    }
}

fn decode_payload<T: DeserializeOwned>(item: &QueueItem) -> std::result::Result<T, ReplayError> {
    serde_json::from_value(item.payload.clone())
        .map_err(|err| ReplayError::InvalidPayload(err.to_string()))
}

fn missing_server_id(local_id: &str) -> ReplayError {
    ReplayError::InvalidPayload(format!("no server id known for {local_id}"))
}

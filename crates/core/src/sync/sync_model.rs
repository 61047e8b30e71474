//! Mutation queue and mirror-row sync domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entity kinds a queued mutation can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueEntityType {
    Observation,
    Task,
    Profile,
    Attachment,
}

/// Operations a queued mutation can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueOperation {
    Create,
    Update,
    Delete,
    Upload,
}

/// Lifecycle of a queue entry.
///
/// `Processing` only exists between the moment a drain pass picks an entry up
/// and the moment the remote call resolves. `NeedsReview` is terminal: the
/// entry is kept for inspection but never replayed again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueStatus {
    Pending,
    Processing,
    Failed,
    Done,
    NeedsReview,
}

impl QueueStatus {
    /// Statuses picked up by a drain pass and counted as pending.
    pub const REPLAYABLE: [QueueStatus; 2] = [QueueStatus::Pending, QueueStatus::Failed];
}

/// Sync state of a mirror row.
///
/// `Pending`, `Failed` and `NeedsReview` rows never carry a server id;
/// `Synced` rows always do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    Synced,
    Pending,
    Failed,
    NeedsReview,
}

/// A durable, not-yet-confirmed write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub id: String,
    pub entity_type: QueueEntityType,
    /// `localId` of the mirror row the mutation targets.
    pub entity_id: String,
    pub operation: QueueOperation,
    /// Decoded payload. A payload that fails to decode is surfaced as a JSON
    /// string holding the raw stored text.
    pub payload: serde_json::Value,
    pub base_version: Option<i64>,
    pub status: QueueStatus,
    pub retry_count: i32,
    pub last_error: Option<String>,
    pub next_retry_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl QueueItem {
    /// Whether the backoff window of this entry has elapsed.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.next_retry_at.as_deref() {
            None => true,
            Some(value) => match DateTime::parse_from_rfc3339(value) {
                Ok(at) => at.with_timezone(&Utc) <= now,
                Err(_) => true,
            },
        }
    }
}

/// Input for [`crate::sync::SyncQueueRepositoryTrait::enqueue`].
///
/// Enqueueing with an `id` that already exists overwrites the stored
/// operation, payload, status, retry count and error of that entry.
#[derive(Debug, Clone, PartialEq)]
pub struct EnqueueRequest {
    pub id: Option<String>,
    pub entity_type: QueueEntityType,
    pub operation: QueueOperation,
    pub payload: serde_json::Value,
    pub base_version: Option<i64>,
    pub status: Option<QueueStatus>,
    pub retry_count: Option<i32>,
    pub last_error: Option<String>,
}

impl EnqueueRequest {
    pub fn new(
        entity_type: QueueEntityType,
        operation: QueueOperation,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: None,
            entity_type,
            operation,
            payload,
            base_version: None,
            status: None,
            retry_count: None,
            last_error: None,
        }
    }

    /// `localId` carried by the payload envelope.
    pub fn entity_id(&self) -> Option<&str> {
        self.payload.get("localId").and_then(|value| value.as_str())
    }
}

/// Input for [`crate::sync::SyncQueueRepositoryTrait::update_status`].
/// `None` fields are left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueStatusUpdate {
    pub id: String,
    pub status: QueueStatus,
    pub retry_count: Option<i32>,
    pub last_error: Option<String>,
    pub next_retry_at: Option<String>,
}

impl QueueStatusUpdate {
    pub fn new(id: impl Into<String>, status: QueueStatus) -> Self {
        Self {
            id: id.into(),
            status,
            retry_count: None,
            last_error: None,
            next_retry_at: None,
        }
    }
}

/// Payload envelope stored in the queue: the target row plus the body needed
/// to replay the remote call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationEnvelope<T> {
    pub local_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
    pub payload: T,
}

impl<T> MutationEnvelope<T> {
    pub fn new(local_id: impl Into<String>, payload: T) -> Self {
        Self {
            local_id: local_id.into(),
            server_id: None,
            payload,
        }
    }

    pub fn with_server_id(mut self, server_id: impl Into<String>) -> Self {
        self.server_id = Some(server_id.into());
        self
    }
}

/// Summary of one drain pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrainOutcome {
    pub processed: usize,
    pub synced: usize,
    pub failed: usize,
    pub needs_review: usize,
    /// Entries left alone because their backoff window has not elapsed.
    pub skipped: usize,
    /// PENDING + FAILED entries remaining after the pass.
    pub pending: i64,
}

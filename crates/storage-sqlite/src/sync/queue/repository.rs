//! Repository for the durable mutation queue.

use std::sync::Arc;

use async_trait::async_trait;
use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use log::{debug, warn};
use uuid::Uuid;

use fieldsafe_core::errors::{Error, Result};
use fieldsafe_core::sync::{
    EnqueueRequest, QueueEntityType, QueueItem, QueueOperation, QueueStatus, QueueStatusUpdate,
    SyncQueueRepositoryTrait,
};
use fieldsafe_core::utils::now_rfc3339;

use super::model::{SyncQueueDB, SyncQueueStatusChangeset};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::sync_queue;
use crate::utils::{enum_from_db, enum_to_db};

fn replayable_statuses() -> Result<Vec<String>> {
    QueueStatus::REPLAYABLE.iter().map(enum_to_db).collect()
}

fn to_queue_item(row: SyncQueueDB) -> Result<QueueItem> {
    let payload = serde_json::from_str(&row.payload).unwrap_or_else(|err| {
        warn!(
            "[SyncQueue] Payload of {} is not valid JSON, returning raw text: {}",
            row.id, err
        );
        serde_json::Value::String(row.payload.clone())
    });

    Ok(QueueItem {
        id: row.id,
        entity_type: enum_from_db(&row.entity_type)?,
        entity_id: row.entity_id,
        operation: enum_from_db(&row.operation)?,
        payload,
        base_version: row.base_version,
        status: enum_from_db(&row.status)?,
        retry_count: row.retry_count,
        last_error: row.last_error,
        next_retry_at: row.next_retry_at,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

/// Insert a queue entry, or overwrite the entry with the same id, on a
/// connection that is already inside a writer transaction.
///
/// An overwrite keeps the original `created_at` so the entry keeps its place
/// in the queue.
pub fn enqueue_tx(conn: &mut SqliteConnection, request: EnqueueRequest) -> Result<QueueItem> {
    let entity_id = request
        .entity_id()
        .map(str::to_string)
        .ok_or_else(|| Error::Validation("Queue payload is missing localId".to_string()))?;
    let now = now_rfc3339();

    let row = SyncQueueDB {
        id: request
            .id
            .clone()
            .unwrap_or_else(|| Uuid::now_v7().to_string()),
        entity_type: enum_to_db(&request.entity_type)?,
        entity_id,
        operation: enum_to_db(&request.operation)?,
        payload: serde_json::to_string(&request.payload)?,
        base_version: request.base_version,
        status: enum_to_db(&request.status.unwrap_or(QueueStatus::Pending))?,
        retry_count: request.retry_count.unwrap_or(0),
        last_error: request.last_error.clone(),
        next_retry_at: None,
        created_at: now.clone(),
        updated_at: now,
    };

    diesel::insert_into(sync_queue::table)
        .values(&row)
        .on_conflict(sync_queue::id)
        .do_update()
        .set((
            sync_queue::entity_type.eq(&row.entity_type),
            sync_queue::entity_id.eq(&row.entity_id),
            sync_queue::operation.eq(&row.operation),
            sync_queue::payload.eq(&row.payload),
            sync_queue::base_version.eq(row.base_version),
            sync_queue::status.eq(&row.status),
            sync_queue::retry_count.eq(row.retry_count),
            sync_queue::last_error.eq(&row.last_error),
            sync_queue::next_retry_at.eq(None::<String>),
            sync_queue::updated_at.eq(&row.updated_at),
        ))
        .execute(conn)
        .map_err(StorageError::from)?;

    let stored = sync_queue::table
        .find(&row.id)
        .first::<SyncQueueDB>(conn)
        .map_err(StorageError::from)?;
    debug!(
        "[SyncQueue] Enqueued {} {} {} for {}",
        stored.id, stored.entity_type, stored.operation, stored.entity_id
    );
    to_queue_item(stored)
}

/// The CREATE entry still recorded for `entity_id`, whatever its status.
pub fn find_create_entry_tx(
    conn: &mut SqliteConnection,
    entity_type: QueueEntityType,
    entity_id: &str,
) -> Result<Option<QueueItem>> {
    let row = sync_queue::table
        .filter(sync_queue::entity_type.eq(enum_to_db(&entity_type)?))
        .filter(sync_queue::entity_id.eq(entity_id))
        .filter(sync_queue::operation.eq(enum_to_db(&QueueOperation::Create)?))
        .order((sync_queue::created_at.asc(), sync_queue::id.asc()))
        .first::<SyncQueueDB>(conn)
        .optional()
        .map_err(StorageError::from)?;
    row.map(to_queue_item).transpose()
}

/// Entries for `entity_id` that are waiting for replay or in flight.
pub fn count_outstanding_tx(
    conn: &mut SqliteConnection,
    entity_type: QueueEntityType,
    entity_id: &str,
) -> Result<i64> {
    let mut statuses = replayable_statuses()?;
    statuses.push(enum_to_db(&QueueStatus::Processing)?);
    let count = sync_queue::table
        .filter(sync_queue::entity_type.eq(enum_to_db(&entity_type)?))
        .filter(sync_queue::entity_id.eq(entity_id))
        .filter(sync_queue::status.eq_any(statuses))
        .select(count_star())
        .first::<i64>(conn)
        .map_err(StorageError::from)?;
    Ok(count)
}

pub struct SyncQueueRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl SyncQueueRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }

    fn load_by_status(&self, statuses: Vec<String>) -> Result<Vec<QueueItem>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = sync_queue::table
            .filter(sync_queue::status.eq_any(statuses))
            .order((sync_queue::created_at.asc(), sync_queue::id.asc()))
            .load::<SyncQueueDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(to_queue_item).collect()
    }

    fn count_by_status(&self, statuses: Vec<String>) -> Result<i64> {
        let mut conn = get_connection(&self.pool)?;
        let count = sync_queue::table
            .filter(sync_queue::status.eq_any(statuses))
            .select(count_star())
            .first::<i64>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(count)
    }
}

#[async_trait]
impl SyncQueueRepositoryTrait for SyncQueueRepository {
    async fn enqueue(&self, request: EnqueueRequest) -> Result<QueueItem> {
        self.writer.exec(move |conn| enqueue_tx(conn, request)).await
    }

    fn get_pending(&self) -> Result<Vec<QueueItem>> {
        self.load_by_status(replayable_statuses()?)
    }

    fn get(&self, id: &str) -> Result<Option<QueueItem>> {
        let mut conn = get_connection(&self.pool)?;
        let row = sync_queue::table
            .find(id)
            .first::<SyncQueueDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        row.map(to_queue_item).transpose()
    }

    async fn update_status(&self, update: QueueStatusUpdate) -> Result<()> {
        self.writer
            .exec(move |conn| {
                let changes = SyncQueueStatusChangeset {
                    status: enum_to_db(&update.status)?,
                    retry_count: update.retry_count,
                    last_error: update.last_error,
                    next_retry_at: update.next_retry_at,
                    updated_at: now_rfc3339(),
                };
                diesel::update(sync_queue::table.find(update.id))
                    .set(&changes)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn delete(&self, id: String) -> Result<()> {
        self.writer
            .exec(move |conn| {
                diesel::delete(sync_queue::table.find(id))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    fn count_pending(&self) -> Result<i64> {
        self.count_by_status(replayable_statuses()?)
    }

    fn count_needs_review(&self) -> Result<i64> {
        self.count_by_status(vec![enum_to_db(&QueueStatus::NeedsReview)?])
    }

    fn list_needs_review(&self) -> Result<Vec<QueueItem>> {
        self.load_by_status(vec![enum_to_db(&QueueStatus::NeedsReview)?])
    }

    async fn reset_processing(&self) -> Result<usize> {
        self.writer
            .exec(move |conn| {
                let reset = diesel::update(
                    sync_queue::table
                        .filter(sync_queue::status.eq(enum_to_db(&QueueStatus::Processing)?)),
                )
                .set((
                    sync_queue::status.eq(enum_to_db(&QueueStatus::Pending)?),
                    sync_queue::updated_at.eq(now_rfc3339()),
                ))
                .execute(conn)
                .map_err(StorageError::from)?;
                Ok(reset)
            })
            .await
    }
}

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use log::{debug, warn};

use fieldsafe_core::errors::{Error, Result};
use fieldsafe_core::sync::{
    EnqueueRequest, MutationEnvelope, QueueEntityType, QueueOperation, QueueStatus, SyncStatus,
};
use fieldsafe_core::tasks::{NewTask, Task, TaskDto, TaskRepositoryTrait};
use fieldsafe_core::utils::{new_local_id, now_rfc3339};
use fieldsafe_core::workflow::StatusTransition;

use super::model::{to_task, TaskDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::{sync_queue, tasks};
use crate::sync::{count_outstanding_tx, enqueue_tx, find_create_entry_tx};
use crate::utils::enum_to_db;

fn find_by_any_id(conn: &mut SqliteConnection, id: &str) -> Result<Option<TaskDB>> {
    let row = tasks::table
        .filter(tasks::local_id.eq(id).or(tasks::server_id.eq(id)))
        .first::<TaskDB>(conn)
        .optional()
        .map_err(StorageError::from)?;
    Ok(row)
}

fn create_request(task: &Task) -> Result<EnqueueRequest> {
    let envelope = MutationEnvelope::new(task.local_id.clone(), NewTask::from(task));
    Ok(EnqueueRequest::new(
        QueueEntityType::Task,
        QueueOperation::Create,
        serde_json::to_value(envelope)?,
    ))
}

pub struct TaskRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl TaskRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl TaskRepositoryTrait for TaskRepository {
    async fn persist_from_server(&self, items: Vec<TaskDto>) -> Result<usize> {
        self.writer
            .exec(move |conn| -> Result<usize> {
                let now = now_rfc3339();
                let mut written = 0;
                for item in items {
                    let existing_local_id = tasks::table
                        .filter(tasks::server_id.eq(&item.id))
                        .select(tasks::local_id)
                        .first::<String>(conn)
                        .optional()
                        .map_err(StorageError::from)?;
                    if let Some(local_id) = existing_local_id.as_deref() {
                        if count_outstanding_tx(conn, QueueEntityType::Task, local_id)? > 0 {
                            debug!(
                                "[OfflineSync] Keeping queued changes of task {} over pulled copy",
                                local_id
                            );
                            continue;
                        }
                    }
                    let local_id = existing_local_id.unwrap_or_else(|| item.id.clone());
                    let row = TaskDB::from_server(local_id, item, &now)?;
                    diesel::replace_into(tasks::table)
                        .values(&row)
                        .execute(conn)
                        .map_err(StorageError::from)?;
                    written += 1;
                }
                Ok(written)
            })
            .await
    }

    fn get_local(&self) -> Result<Vec<Task>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = tasks::table
            .filter(tasks::deleted_at.is_null())
            .order(tasks::updated_at.desc())
            .load::<TaskDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(to_task).collect()
    }

    fn get_local_by_id(&self, id: &str) -> Result<Option<Task>> {
        let mut conn = get_connection(&self.pool)?;
        find_by_any_id(&mut conn, id)?.map(to_task).transpose()
    }

    fn has_queued_changes(&self, local_id: &str) -> Result<bool> {
        let mut conn = get_connection(&self.pool)?;
        Ok(count_outstanding_tx(&mut conn, QueueEntityType::Task, local_id)? > 0)
    }

    async fn create_offline(&self, input: NewTask) -> Result<Task> {
        self.writer
            .exec(move |conn| -> Result<Task> {
                let local_id = new_local_id();
                let row = TaskDB::new_local(local_id.clone(), &input, &now_rfc3339())?;
                diesel::insert_into(tasks::table)
                    .values(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;

                let task = to_task(row)?;
                enqueue_tx(conn, create_request(&task)?)?;
                debug!("[OfflineSync] Task {} stored offline", local_id);
                Ok(task)
            })
            .await
    }

    async fn mark_synced(&self, local_id: String, server: TaskDto) -> Result<Task> {
        self.writer
            .exec(move |conn| -> Result<Task> {
                let existing = tasks::table
                    .find(&local_id)
                    .first::<TaskDB>(conn)
                    .optional()
                    .map_err(StorageError::from)?
                    .ok_or_else(|| Error::NotFound(format!("Task {local_id} not found")))?;

                // A pull may already have mirrored this server id under its own key.
                let duplicates = diesel::delete(
                    tasks::table
                        .filter(tasks::server_id.eq(&server.id))
                        .filter(tasks::local_id.ne(&local_id)),
                )
                .execute(conn)
                .map_err(StorageError::from)?;
                if duplicates > 0 {
                    debug!(
                        "[OfflineSync] Dropped {} pulled copies of task {}",
                        duplicates, server.id
                    );
                }

                // The entry being replayed is still PROCESSING; anything beyond it is newer.
                let newer_queued =
                    count_outstanding_tx(conn, QueueEntityType::Task, &local_id)? > 1;
                let merged = if newer_queued {
                    existing.acknowledge_server(&server)?
                } else {
                    existing.merge_server(server, &now_rfc3339())?
                };
                diesel::update(tasks::table.find(&local_id))
                    .set(&merged)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                to_task(merged)
            })
            .await
    }

    async fn set_sync_status(&self, local_id: String, status: SyncStatus) -> Result<()> {
        self.writer
            .exec(move |conn| {
                diesel::update(
                    tasks::table
                        .find(&local_id)
                        .filter(tasks::server_id.is_null()),
                )
                .set(tasks::sync_status.eq(enum_to_db(&status)?))
                .execute(conn)
                .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn transition_offline(
        &self,
        id: String,
        transition: StatusTransition,
    ) -> Result<Task> {
        transition.validate()?;
        self.writer
            .exec(move |conn| -> Result<Task> {
                let current = find_by_any_id(conn, &id)?
                    .ok_or_else(|| Error::NotFound(format!("Task {id} not found")))?;
                let mut row = current.apply_transition(&transition, &now_rfc3339());

                match row.server_id.clone() {
                    None => {
                        // Fold the change into the CREATE that has not reached the server.
                        row.sync_status = enum_to_db(&SyncStatus::Pending)?;
                        let task = to_task(row.clone())?;
                        let mut request = create_request(&task)?;
                        if let Some(entry) =
                            find_create_entry_tx(conn, QueueEntityType::Task, &row.local_id)?
                        {
                            request.id = Some(entry.id);
                            request.retry_count = Some(entry.retry_count);
                            request.last_error = entry.last_error;
                            request.status = Some(QueueStatus::Pending);
                        }
                        enqueue_tx(conn, request)?;
                    }
                    Some(server_id) => {
                        let envelope = MutationEnvelope::new(row.local_id.clone(), &transition)
                            .with_server_id(server_id);
                        let mut request = EnqueueRequest::new(
                            QueueEntityType::Task,
                            QueueOperation::Update,
                            serde_json::to_value(envelope)?,
                        );
                        request.base_version = Some(row.version);
                        enqueue_tx(conn, request)?;
                    }
                }

                diesel::update(tasks::table.find(&row.local_id))
                    .set(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                to_task(row)
            })
            .await
    }

    async fn requeue_orphans(&self) -> Result<usize> {
        self.writer
            .exec(move |conn| -> Result<usize> {
                let unsynced = tasks::table
                    .filter(tasks::server_id.is_null())
                    .filter(tasks::deleted_at.is_null())
                    .load::<TaskDB>(conn)
                    .map_err(StorageError::from)?;
                if unsynced.is_empty() {
                    return Ok(0);
                }

                let queued: HashSet<String> = sync_queue::table
                    .filter(
                        sync_queue::entity_type.eq(enum_to_db(&QueueEntityType::Task)?),
                    )
                    .select(sync_queue::entity_id)
                    .load::<String>(conn)
                    .map_err(StorageError::from)?
                    .into_iter()
                    .collect();

                let mut requeued = 0;
                for row in unsynced {
                    if queued.contains(&row.local_id) {
                        continue;
                    }
                    warn!(
                        "[OfflineSync] Task {} has no queue entry, re-enqueueing CREATE",
                        row.local_id
                    );
                    let task = to_task(row)?;
                    enqueue_tx(conn, create_request(&task)?)?;
                    requeued += 1;
                }
                Ok(requeued)
            })
            .await
    }
}

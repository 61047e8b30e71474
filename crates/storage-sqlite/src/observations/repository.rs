use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use log::{debug, warn};

use fieldsafe_core::errors::{Error, Result};
use fieldsafe_core::observations::{
    NewObservation, Observation, ObservationDto, ObservationRepositoryTrait,
};
use fieldsafe_core::sync::{
    EnqueueRequest, MutationEnvelope, QueueEntityType, QueueOperation, QueueStatus, SyncStatus,
};
use fieldsafe_core::utils::{new_local_id, now_rfc3339};
use fieldsafe_core::workflow::StatusTransition;

use super::model::{to_observation, ObservationDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::{observations, sync_queue};
use crate::sync::{count_outstanding_tx, enqueue_tx, find_create_entry_tx};
use crate::utils::enum_to_db;

fn find_by_any_id(conn: &mut SqliteConnection, id: &str) -> Result<Option<ObservationDB>> {
    let row = observations::table
        .filter(
            observations::local_id
                .eq(id)
                .or(observations::server_id.eq(id)),
        )
        .first::<ObservationDB>(conn)
        .optional()
        .map_err(StorageError::from)?;
    Ok(row)
}

fn create_request(observation: &Observation) -> Result<EnqueueRequest> {
    let envelope = MutationEnvelope::new(
        observation.local_id.clone(),
        NewObservation::from(observation),
    );
    Ok(EnqueueRequest::new(
        QueueEntityType::Observation,
        QueueOperation::Create,
        serde_json::to_value(envelope)?,
    ))
}

pub struct ObservationRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl ObservationRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl ObservationRepositoryTrait for ObservationRepository {
    async fn persist_from_server(&self, items: Vec<ObservationDto>) -> Result<usize> {
        self.writer
            .exec(move |conn| -> Result<usize> {
                let now = now_rfc3339();
                let mut written = 0;
                for item in items {
                    let existing_local_id = observations::table
                        .filter(observations::server_id.eq(&item.id))
                        .select(observations::local_id)
                        .first::<String>(conn)
                        .optional()
                        .map_err(StorageError::from)?;
                    if let Some(local_id) = existing_local_id.as_deref() {
                        if count_outstanding_tx(conn, QueueEntityType::Observation, local_id)? > 0 {
                            debug!(
                                "[OfflineSync] Keeping queued changes of observation {} over pulled copy",
                                local_id
                            );
                            continue;
                        }
                    }
                    let local_id = existing_local_id.unwrap_or_else(|| item.id.clone());
                    let row = ObservationDB::from_server(local_id, item, &now)?;
                    diesel::replace_into(observations::table)
                        .values(&row)
                        .execute(conn)
                        .map_err(StorageError::from)?;
                    written += 1;
                }
                Ok(written)
            })
            .await
    }

    fn get_local(&self) -> Result<Vec<Observation>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = observations::table
            .filter(observations::deleted_at.is_null())
            .order(observations::updated_at.desc())
            .load::<ObservationDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(to_observation).collect()
    }

    fn get_local_by_id(&self, id: &str) -> Result<Option<Observation>> {
        let mut conn = get_connection(&self.pool)?;
        find_by_any_id(&mut conn, id)?.map(to_observation).transpose()
    }

    fn has_queued_changes(&self, local_id: &str) -> Result<bool> {
        let mut conn = get_connection(&self.pool)?;
        Ok(count_outstanding_tx(&mut conn, QueueEntityType::Observation, local_id)? > 0)
    }

    async fn create_offline(&self, input: NewObservation) -> Result<Observation> {
        self.writer
            .exec(move |conn| -> Result<Observation> {
                let local_id = new_local_id();
                let row = ObservationDB::new_local(local_id.clone(), &input, &now_rfc3339())?;
                diesel::insert_into(observations::table)
                    .values(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;

                let observation = to_observation(row)?;
                enqueue_tx(conn, create_request(&observation)?)?;
                debug!("[OfflineSync] Observation {} stored offline", local_id);
                Ok(observation)
            })
            .await
    }

    async fn mark_synced(&self, local_id: String, server: ObservationDto) -> Result<Observation> {
        self.writer
            .exec(move |conn| -> Result<Observation> {
                let existing = observations::table
                    .find(&local_id)
                    .first::<ObservationDB>(conn)
                    .optional()
                    .map_err(StorageError::from)?
                    .ok_or_else(|| Error::NotFound(format!("Observation {local_id} not found")))?;

                // A pull may already have mirrored this server id under its own key.
                let duplicates = diesel::delete(
                    observations::table
                        .filter(observations::server_id.eq(&server.id))
                        .filter(observations::local_id.ne(&local_id)),
                )
                .execute(conn)
                .map_err(StorageError::from)?;
                if duplicates > 0 {
                    debug!(
                        "[OfflineSync] Dropped {} pulled copies of observation {}",
                        duplicates, server.id
                    );
                }

                // The entry being replayed is still PROCESSING; anything beyond it is newer.
                let newer_queued =
                    count_outstanding_tx(conn, QueueEntityType::Observation, &local_id)? > 1;
                let merged = if newer_queued {
                    existing.acknowledge_server(&server)?
                } else {
                    existing.merge_server(server, &now_rfc3339())?
                };
                diesel::update(observations::table.find(&local_id))
                    .set(&merged)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                to_observation(merged)
            })
            .await
    }

    async fn set_sync_status(&self, local_id: String, status: SyncStatus) -> Result<()> {
        self.writer
            .exec(move |conn| {
                diesel::update(
                    observations::table
                        .find(&local_id)
                        .filter(observations::server_id.is_null()),
                )
                .set(observations::sync_status.eq(enum_to_db(&status)?))
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
    ) -> Result<Observation> {
        transition.validate()?;
        self.writer
            .exec(move |conn| -> Result<Observation> {
                let current = find_by_any_id(conn, &id)?
                    .ok_or_else(|| Error::NotFound(format!("Observation {id} not found")))?;
                let mut row = current.apply_transition(&transition, &now_rfc3339());

                match row.server_id.clone() {
                    None => {
                        // Fold the change into the CREATE that has not reached the server.
                        row.sync_status = enum_to_db(&SyncStatus::Pending)?;
                        let observation = to_observation(row.clone())?;
                        let mut request = create_request(&observation)?;
                        if let Some(entry) =
                            find_create_entry_tx(conn, QueueEntityType::Observation, &row.local_id)?
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
                            QueueEntityType::Observation,
                            QueueOperation::Update,
                            serde_json::to_value(envelope)?,
                        );
                        request.base_version = Some(row.version);
                        enqueue_tx(conn, request)?;
                    }
                }

                diesel::update(observations::table.find(&row.local_id))
                    .set(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                to_observation(row)
            })
            .await
    }

    async fn requeue_orphans(&self) -> Result<usize> {
        self.writer
            .exec(move |conn| -> Result<usize> {
                let unsynced = observations::table
                    .filter(observations::server_id.is_null())
                    .filter(observations::deleted_at.is_null())
                    .load::<ObservationDB>(conn)
                    .map_err(StorageError::from)?;
                if unsynced.is_empty() {
                    return Ok(0);
                }

                let queued: HashSet<String> = sync_queue::table
                    .filter(
                        sync_queue::entity_type.eq(enum_to_db(&QueueEntityType::Observation)?),
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
                        "[OfflineSync] Observation {} has no queue entry, re-enqueueing CREATE",
                        row.local_id
                    );
                    let observation = to_observation(row)?;
                    enqueue_tx(conn, create_request(&observation)?)?;
                    requeued += 1;
                }
                Ok(requeued)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::connection::SimpleConnection;
    use fieldsafe_core::config::TransactionMode;
    use fieldsafe_core::sync::{QueueItem, SyncQueueRepositoryTrait};
    use fieldsafe_core::workflow::MediaRef;
    use tempfile::{tempdir, TempDir};

    use crate::db::{create_pool, init, run_migrations, spawn_writer};
    use crate::sync::SyncQueueRepository;

    struct Fixture {
        _dir: TempDir,
        pool: Arc<DbPool>,
        repo: ObservationRepository,
        queue: SyncQueueRepository,
    }

    fn setup_db() -> Fixture {
        let dir = tempdir().expect("tempdir");
        let db_path = init(&dir.path().to_string_lossy()).expect("init db");
        run_migrations(&db_path, TransactionMode::Exclusive).expect("migrate db");
        let pool = create_pool(&db_path).expect("create pool");
        let writer = spawn_writer(pool.as_ref().clone());
        Fixture {
            _dir: dir,
            repo: ObservationRepository::new(pool.clone(), writer.clone()),
            queue: SyncQueueRepository::new(pool.clone(), writer),
            pool,
        }
    }

    fn server_dto(id: &str, description: &str, updated_at: &str) -> ObservationDto {
        ObservationDto {
            id: id.to_string(),
            version: Some(1),
            updated_at: Some(updated_at.to_string()),
            description: Some(description.to_string()),
            status: Some("PENDING".to_string()),
            worker_full_name: Some("Luis Vega".to_string()),
            ..ObservationDto::default()
        }
    }

    fn new_observation() -> NewObservation {
        NewObservation {
            project_id: Some("prj-1".to_string()),
            worker_full_name: Some("Ana Ruiz".to_string()),
            description: "Loose scaffolding plank".to_string(),
            risk_level: Some(3),
            media: vec![MediaRef {
                uri: "file:///photos/1.jpg".to_string(),
                mime_type: Some("image/jpeg".to_string()),
            }],
            ..NewObservation::default()
        }
    }

    fn queue_for(queue: &SyncQueueRepository, local_id: &str) -> Vec<QueueItem> {
        queue
            .get_pending()
            .expect("pending")
            .into_iter()
            .filter(|item| item.entity_id == local_id)
            .collect()
    }

    #[tokio::test]
    async fn bulk_replace_is_idempotent() {
        let fx = setup_db();
        let first = vec![
            server_dto("srv-1", "first", "2026-03-01T08:00:00.000000Z"),
            server_dto("srv-2", "second", "2026-03-01T09:00:00.000000Z"),
        ];
        let second = vec![
            server_dto("srv-1", "first, edited", "2026-03-02T08:00:00.000000Z"),
            server_dto("srv-2", "second", "2026-03-01T09:00:00.000000Z"),
        ];

        assert_eq!(fx.repo.persist_from_server(first).await.expect("first"), 2);
        fx.repo.persist_from_server(second).await.expect("second");

        let rows = fx.repo.get_local().expect("local");
        assert_eq!(rows.len(), 2);
        // Most recently updated first.
        assert_eq!(rows[0].server_id.as_deref(), Some("srv-1"));
        assert_eq!(rows[0].description, "first, edited");
        assert!(rows.iter().all(|row| row.sync_status == SyncStatus::Synced));
    }

    #[tokio::test]
    async fn offline_create_writes_row_and_queue_entry_together() {
        let fx = setup_db();
        let created = fx.repo.create_offline(new_observation()).await.expect("create");

        assert!(created.server_id.is_none());
        assert_eq!(created.sync_status, SyncStatus::Pending);
        assert_eq!(created.status, "PENDING");
        assert_eq!(created.media.len(), 1);

        let entries = queue_for(&fx.queue, &created.local_id);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].operation, QueueOperation::Create);
        let envelope: MutationEnvelope<NewObservation> =
            serde_json::from_value(entries[0].payload.clone()).expect("envelope");
        assert_eq!(envelope.local_id, created.local_id);
        assert_eq!(envelope.payload.description, "Loose scaffolding plank");
    }

    #[tokio::test]
    async fn mark_synced_merges_without_nulling_and_lookup_is_symmetric() {
        let fx = setup_db();
        let created = fx.repo.create_offline(new_observation()).await.expect("create");

        let server = ObservationDto {
            id: "srv-9".to_string(),
            version: Some(1),
            updated_at: Some("2026-03-05T10:00:00.000000Z".to_string()),
            status: Some("ANSWERED".to_string()),
            ..ObservationDto::default()
        };
        let synced = fx
            .repo
            .mark_synced(created.local_id.clone(), server)
            .await
            .expect("mark synced");

        assert_eq!(synced.server_id.as_deref(), Some("srv-9"));
        assert_eq!(synced.sync_status, SyncStatus::Synced);
        assert_eq!(synced.worker_full_name.as_deref(), Some("Ana Ruiz"));
        assert_eq!(synced.status, "ANSWERED");
        assert_eq!(synced.media.len(), 1);

        let by_local = fx.repo.get_local_by_id(&created.local_id).expect("by local");
        let by_server = fx.repo.get_local_by_id("srv-9").expect("by server");
        assert_eq!(by_local, by_server);
        assert!(by_local.is_some());
    }

    #[tokio::test]
    async fn pull_keeps_the_local_id_of_a_synced_row() {
        let fx = setup_db();
        let created = fx.repo.create_offline(new_observation()).await.expect("create");
        fx.repo
            .mark_synced(
                created.local_id.clone(),
                server_dto("srv-3", "Loose scaffolding plank", "2026-03-05T10:00:00.000000Z"),
            )
            .await
            .expect("mark synced");
        for entry in queue_for(&fx.queue, &created.local_id) {
            fx.queue.delete(entry.id).await.expect("delete entry");
        }

        fx.repo
            .persist_from_server(vec![server_dto(
                "srv-3",
                "Plank fixed",
                "2026-03-06T10:00:00.000000Z",
            )])
            .await
            .expect("pull");

        let rows = fx.repo.get_local().expect("local");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].local_id, created.local_id);
        assert_eq!(rows[0].description, "Plank fixed");
    }

    #[tokio::test]
    async fn pull_leaves_rows_with_queued_changes_alone() {
        let fx = setup_db();
        fx.repo
            .persist_from_server(vec![server_dto(
                "srv-6",
                "Missing guard",
                "2026-03-01T08:00:00.000000Z",
            )])
            .await
            .expect("pull");
        fx.repo
            .transition_offline("srv-6".to_string(), StatusTransition::close())
            .await
            .expect("close");
        assert!(fx.repo.has_queued_changes("srv-6").expect("queued"));

        let written = fx
            .repo
            .persist_from_server(vec![
                server_dto("srv-6", "Missing guard", "2026-03-02T08:00:00.000000Z"),
                server_dto("srv-7", "Wet floor", "2026-03-02T09:00:00.000000Z"),
            ])
            .await
            .expect("second pull");
        assert_eq!(written, 1);

        let row = fx.repo.get_local_by_id("srv-6").expect("get").expect("exists");
        assert_eq!(row.status, "CLOSED");
        assert!(fx.repo.get_local_by_id("srv-7").expect("get").is_some());
        assert!(!fx.repo.has_queued_changes("srv-7").expect("queued"));
    }

    #[tokio::test]
    async fn acknowledgement_keeps_changes_queued_behind_it() {
        let fx = setup_db();
        fx.repo
            .persist_from_server(vec![server_dto(
                "srv-8",
                "Exposed wiring",
                "2026-03-01T08:00:00.000000Z",
            )])
            .await
            .expect("pull");
        fx.repo
            .transition_offline("srv-8".to_string(), StatusTransition::answer("Taped off"))
            .await
            .expect("answer");
        fx.repo
            .transition_offline("srv-8".to_string(), StatusTransition::close())
            .await
            .expect("close");

        let answered = ObservationDto {
            id: "srv-8".to_string(),
            version: Some(2),
            status: Some("ANSWERED".to_string()),
            answer: Some("Taped off".to_string()),
            ..ObservationDto::default()
        };
        let synced = fx
            .repo
            .mark_synced("srv-8".to_string(), answered)
            .await
            .expect("mark synced");

        assert_eq!(synced.status, "CLOSED");
        assert_eq!(synced.version, 2);
        assert_eq!(synced.sync_status, SyncStatus::Synced);
    }

    #[tokio::test]
    async fn transition_of_unsynced_row_amends_its_create() {
        let fx = setup_db();
        let created = fx.repo.create_offline(new_observation()).await.expect("create");

        let rejected = fx
            .repo
            .transition_offline(created.local_id.clone(), StatusTransition::reject("duplicate"))
            .await
            .expect("reject");
        assert_eq!(rejected.status, "REJECTED");
        assert_eq!(rejected.rejection_reason.as_deref(), Some("duplicate"));

        let entries = queue_for(&fx.queue, &created.local_id);
        assert_eq!(entries.len(), 1);
        let envelope: MutationEnvelope<NewObservation> =
            serde_json::from_value(entries[0].payload.clone()).expect("envelope");
        assert_eq!(envelope.payload.status.as_deref(), Some("REJECTED"));
        assert_eq!(envelope.payload.rejection_reason.as_deref(), Some("duplicate"));
    }

    #[tokio::test]
    async fn transition_of_synced_row_enqueues_an_update() {
        let fx = setup_db();
        fx.repo
            .persist_from_server(vec![server_dto(
                "srv-4",
                "Blocked exit",
                "2026-03-01T08:00:00.000000Z",
            )])
            .await
            .expect("pull");

        let closed = fx
            .repo
            .transition_offline("srv-4".to_string(), StatusTransition::close())
            .await
            .expect("close");
        assert_eq!(closed.status, "CLOSED");
        assert_eq!(closed.sync_status, SyncStatus::Synced);

        let entries = queue_for(&fx.queue, &closed.local_id);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].operation, QueueOperation::Update);
        assert_eq!(entries[0].base_version, Some(1));
        let envelope: MutationEnvelope<StatusTransition> =
            serde_json::from_value(entries[0].payload.clone()).expect("envelope");
        assert_eq!(envelope.server_id.as_deref(), Some("srv-4"));
        assert_eq!(envelope.payload, StatusTransition::close());
    }

    #[tokio::test]
    async fn orphaned_rows_are_requeued_once() {
        let fx = setup_db();
        let created = fx.repo.create_offline(new_observation()).await.expect("create");

        let mut conn = get_connection(&fx.pool).expect("conn");
        conn.batch_execute("DELETE FROM sync_queue").expect("drop queue");

        assert_eq!(fx.repo.requeue_orphans().await.expect("requeue"), 1);
        assert_eq!(fx.repo.requeue_orphans().await.expect("requeue again"), 0);
        assert_eq!(queue_for(&fx.queue, &created.local_id).len(), 1);
    }

    #[tokio::test]
    async fn sync_status_is_only_set_on_unsynced_rows() {
        let fx = setup_db();
        let created = fx.repo.create_offline(new_observation()).await.expect("create");
        fx.repo
            .set_sync_status(created.local_id.clone(), SyncStatus::Failed)
            .await
            .expect("fail");
        let row = fx
            .repo
            .get_local_by_id(&created.local_id)
            .expect("get")
            .expect("exists");
        assert_eq!(row.sync_status, SyncStatus::Failed);

        fx.repo
            .persist_from_server(vec![server_dto("srv-5", "x", "2026-03-01T08:00:00.000000Z")])
            .await
            .expect("pull");
        fx.repo
            .set_sync_status("srv-5".to_string(), SyncStatus::Failed)
            .await
            .expect("noop");
        let synced = fx.repo.get_local_by_id("srv-5").expect("get").expect("exists");
        assert_eq!(synced.sync_status, SyncStatus::Synced);
    }
}

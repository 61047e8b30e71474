//! End-to-end tests of the offline subsystem against a scripted remote.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tempfile::TempDir;

use fieldsafe_core::errors::{RemoteError, RemoteResult};
use fieldsafe_core::observations::{NewObservation, ObservationDto};
use fieldsafe_core::reference::{ReferenceItem, ReferenceKind};
use fieldsafe_core::remote::{CredentialStore, RemoteApi};
use fieldsafe_core::sync::{
    EnqueueRequest, QueueEntityType, QueueOperation, QueueStatus, QueueStatusUpdate, RetryPolicy,
    SyncStatus, UNSUPPORTED_OPERATION,
};
use fieldsafe_core::tasks::{NewTask, TaskDto};
use fieldsafe_core::workflow::StatusTransition;
use fieldsafe_core::OfflineConfig;

use crate::commands::*;
use crate::context::MobileContext;

#[derive(Default)]
struct MockRemote {
    calls: Mutex<Vec<String>>,
    failure: Mutex<Option<RemoteError>>,
    delay: Mutex<Duration>,
    next_id: AtomicUsize,
    observations: Mutex<Vec<ObservationDto>>,
    references: Mutex<Vec<ReferenceItem>>,
}

impl MockRemote {
    fn fail_with(&self, error: Option<RemoteError>) {
        *self.failure.lock().unwrap() = error;
    }

    fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    async fn record(&self, call: String) -> RemoteResult<()> {
        self.calls.lock().unwrap().push(call);
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match self.failure.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn next_server_id(&self) -> String {
        format!("srv-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[async_trait]
impl RemoteApi for MockRemote {
    async fn list_observations(&self, _token: &str) -> RemoteResult<Vec<ObservationDto>> {
        self.record("list_observations".to_string()).await?;
        Ok(self.observations.lock().unwrap().clone())
    }

    async fn create_observation(
        &self,
        _token: &str,
        input: &NewObservation,
    ) -> RemoteResult<ObservationDto> {
        self.record(format!("create_observation:{}", input.description))
            .await?;
        Ok(ObservationDto {
            id: self.next_server_id(),
            version: Some(1),
            description: Some(input.description.clone()),
            status: Some(input.status.clone().unwrap_or_else(|| "PENDING".to_string())),
            risk_level: input.risk_level,
            answer: input.answer.clone(),
            ..ObservationDto::default()
        })
    }

    async fn transition_observation(
        &self,
        _token: &str,
        server_id: &str,
        transition: &StatusTransition,
    ) -> RemoteResult<ObservationDto> {
        self.record(format!(
            "transition_observation:{}:{}",
            server_id,
            transition.action.path_segment()
        ))
        .await?;
        Ok(ObservationDto {
            id: server_id.to_string(),
            version: Some(2),
            status: Some(transition.resulting_status().to_string()),
            answer: transition.answer.clone(),
            rejection_reason: transition.reason.clone(),
            ..ObservationDto::default()
        })
    }

    async fn list_tasks(&self, _token: &str) -> RemoteResult<Vec<TaskDto>> {
        self.record("list_tasks".to_string()).await?;
        Ok(Vec::new())
    }

    async fn create_task(&self, _token: &str, input: &NewTask) -> RemoteResult<TaskDto> {
        self.record(format!("create_task:{}", input.title)).await?;
        Ok(TaskDto {
            id: self.next_server_id(),
            version: Some(1),
            title: Some(input.title.clone()),
            description: Some(input.description.clone()),
            status: Some("PENDING".to_string()),
            ..TaskDto::default()
        })
    }

    async fn transition_task(
        &self,
        _token: &str,
        server_id: &str,
        transition: &StatusTransition,
    ) -> RemoteResult<TaskDto> {
        self.record(format!(
            "transition_task:{}:{}",
            server_id,
            transition.action.path_segment()
        ))
        .await?;
        Ok(TaskDto {
            id: server_id.to_string(),
            version: Some(2),
            status: Some(transition.resulting_status().to_string()),
            ..TaskDto::default()
        })
    }

    async fn list_reference(
        &self,
        _token: &str,
        kind: ReferenceKind,
    ) -> RemoteResult<Vec<ReferenceItem>> {
        self.record(format!("list_reference:{}", kind.table_name()))
            .await?;
        Ok(self.references.lock().unwrap().clone())
    }
}

struct MockCredentials(Mutex<Option<String>>);

impl MockCredentials {
    fn signed_in() -> Self {
        Self(Mutex::new(Some("test-token".to_string())))
    }

    fn signed_out() -> Self {
        Self(Mutex::new(None))
    }
}

impl CredentialStore for MockCredentials {
    fn access_token(&self) -> Option<String> {
        self.0.lock().unwrap().clone()
    }
}

struct Harness {
    _dir: TempDir,
    context: MobileContext,
    remote: Arc<MockRemote>,
}

fn harness_with(retry: RetryPolicy, credentials: MockCredentials) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let config = OfflineConfig {
        retry,
        ..OfflineConfig::default()
    };
    let remote = Arc::new(MockRemote::default());
    let context = MobileContext::with_remote(
        dir.path().to_str().unwrap(),
        &config,
        remote.clone(),
        Arc::new(credentials),
    )
    .unwrap();
    Harness {
        _dir: dir,
        context,
        remote,
    }
}

async fn ready_harness() -> Harness {
    let harness = harness_with(RetryPolicy::default(), MockCredentials::signed_in());
    start_offline_sync(&harness.context, false).await.unwrap();
    harness
}

fn observation(description: &str) -> NewObservation {
    NewObservation {
        description: description.to_string(),
        risk_level: Some(3),
        ..NewObservation::default()
    }
}

fn offline() -> Option<RemoteError> {
    Some(RemoteError::transport("network unreachable"))
}

#[tokio::test]
async fn open_applies_every_migration() {
    let harness = harness_with(RetryPolicy::default(), MockCredentials::signed_in());
    assert_eq!(
        harness.context.schema_version,
        fieldsafe_storage_sqlite::db::SCHEMA_VERSION
    );
    assert!(!offline_status(&harness.context).ready);
}

#[tokio::test]
async fn online_create_mirrors_the_server_row() {
    let harness = ready_harness().await;

    let created = create_observation(&harness.context, observation("Loose cable"))
        .await
        .unwrap();

    assert_eq!(created.server_id.as_deref(), Some("srv-1"));
    assert_eq!(created.sync_status, SyncStatus::Synced);
    assert_eq!(offline_status(&harness.context).pending_mutations, 0);
}

#[tokio::test]
async fn offline_create_is_replayed_and_reconciled() {
    let harness = ready_harness().await;
    harness.remote.fail_with(offline());

    let local = create_observation(&harness.context, observation("Blocked exit"))
        .await
        .unwrap();
    assert!(local.server_id.is_none());
    assert_eq!(local.sync_status, SyncStatus::Pending);
    assert_eq!(offline_status(&harness.context).pending_mutations, 1);

    harness.remote.fail_with(None);
    let outcome = sync_now(&harness.context).await.unwrap();
    assert_eq!(outcome.synced, 1);
    assert_eq!(outcome.pending, 0);

    let synced = get_observation(&harness.context, &local.local_id)
        .unwrap()
        .unwrap();
    assert_eq!(synced.server_id.as_deref(), Some("srv-1"));
    assert_eq!(synced.sync_status, SyncStatus::Synced);
    assert_eq!(synced.description, "Blocked exit");

    let by_server_id = get_observation(&harness.context, "srv-1").unwrap().unwrap();
    assert_eq!(by_server_id.local_id, synced.local_id);

    let status = offline_status(&harness.context);
    assert_eq!(status.pending_mutations, 0);
    assert!(status.last_synced_at.is_some());
    assert!(!status.syncing);
}

#[tokio::test]
async fn signed_out_create_never_calls_the_remote() {
    let harness = harness_with(RetryPolicy::default(), MockCredentials::signed_out());
    start_offline_sync(&harness.context, true).await.unwrap();

    let local = create_observation(&harness.context, observation("Spill"))
        .await
        .unwrap();
    assert!(local.server_id.is_none());

    // Without a token the drain pass leaves the queue alone.
    let outcome = sync_now(&harness.context).await.unwrap();
    assert_eq!(outcome.processed, 0);
    assert_eq!(outcome.pending, 1);
    assert!(harness.remote.calls().is_empty());
}

#[tokio::test]
async fn online_validation_error_reaches_the_caller() {
    let harness = ready_harness().await;
    harness
        .remote
        .fail_with(Some(RemoteError::http(422, "description is required")));

    let err = create_observation(&harness.context, observation(""))
        .await
        .unwrap_err();
    assert!(err.contains("description is required"));
    assert_eq!(offline_status(&harness.context).pending_mutations, 0);
}

#[tokio::test]
async fn replay_validation_error_parks_the_entry() {
    let harness = ready_harness().await;
    harness.remote.fail_with(offline());
    let local = create_observation(&harness.context, observation("Bad data"))
        .await
        .unwrap();

    harness
        .remote
        .fail_with(Some(RemoteError::http(422, "riskLevel out of range")));
    let outcome = sync_now(&harness.context).await.unwrap();
    assert_eq!(outcome.needs_review, 1);
    assert_eq!(outcome.pending, 0);

    let row = get_observation(&harness.context, &local.local_id)
        .unwrap()
        .unwrap();
    assert_eq!(row.sync_status, SyncStatus::NeedsReview);
    assert!(row.server_id.is_none());

    let parked = list_needs_review(&harness.context).unwrap();
    assert_eq!(parked.len(), 1);
    assert!(parked[0]
        .last_error
        .as_deref()
        .unwrap()
        .contains("riskLevel out of range"));

    let status = offline_status(&harness.context);
    assert_eq!(status.needs_review, 1);
    assert_eq!(status.pending_mutations, 0);
}

#[tokio::test]
async fn transient_replay_failure_backs_off() {
    let harness = ready_harness().await;
    harness.remote.fail_with(offline());
    let local = create_observation(&harness.context, observation("Broken ladder"))
        .await
        .unwrap();

    harness
        .remote
        .fail_with(Some(RemoteError::http(503, "maintenance")));
    let first = sync_now(&harness.context).await.unwrap();
    assert_eq!(first.failed, 1);
    assert_eq!(first.pending, 1);

    let row = get_observation(&harness.context, &local.local_id)
        .unwrap()
        .unwrap();
    assert_eq!(row.sync_status, SyncStatus::Failed);

    let entry = harness.context.sync_queue_repository().get_pending().unwrap();
    assert_eq!(entry[0].status, QueueStatus::Failed);
    assert_eq!(entry[0].retry_count, 1);
    assert!(entry[0].next_retry_at.is_some());

    // Still inside the backoff window.
    let second = sync_now(&harness.context).await.unwrap();
    assert_eq!(second.processed, 0);
    assert_eq!(second.skipped, 1);
    assert_eq!(second.pending, 1);
}

#[tokio::test]
async fn retry_ceiling_parks_transient_failures() {
    let policy = RetryPolicy {
        max_attempts: 2,
        base_delay_secs: 0,
        ..RetryPolicy::default()
    };
    let harness = harness_with(policy, MockCredentials::signed_in());
    start_offline_sync(&harness.context, false).await.unwrap();
    harness.remote.fail_with(offline());
    create_observation(&harness.context, observation("Exposed wiring"))
        .await
        .unwrap();

    let first = sync_now(&harness.context).await.unwrap();
    assert_eq!(first.failed, 1);
    let second = sync_now(&harness.context).await.unwrap();
    assert_eq!(second.needs_review, 1);
    assert_eq!(second.pending, 0);

    let third = sync_now(&harness.context).await.unwrap();
    assert_eq!(third.processed, 0);
}

#[tokio::test]
async fn drain_pass_replays_in_fifo_order() {
    let harness = ready_harness().await;
    harness.remote.fail_with(offline());
    for description in ["first", "second", "third"] {
        create_observation(&harness.context, observation(description))
            .await
            .unwrap();
    }
    create_task(
        &harness.context,
        NewTask {
            title: "fourth".to_string(),
            description: "follow-up".to_string(),
            ..NewTask::default()
        },
    )
    .await
    .unwrap();

    harness.remote.fail_with(None);
    let before = harness.remote.calls().len();
    let outcome = sync_now(&harness.context).await.unwrap();
    assert_eq!(outcome.synced, 4);

    assert_eq!(
        harness.remote.calls()[before..].to_vec(),
        vec![
            "create_observation:first",
            "create_observation:second",
            "create_observation:third",
            "create_task:fourth",
        ]
    );
}

#[tokio::test]
async fn concurrent_triggers_run_a_single_pass() {
    let harness = ready_harness().await;
    harness.remote.fail_with(offline());
    create_observation(&harness.context, observation("Wet floor"))
        .await
        .unwrap();

    harness.remote.fail_with(None);
    harness.remote.set_delay(Duration::from_millis(200));
    let (a, b) = tokio::join!(sync_now(&harness.context), sync_now(&harness.context));

    assert!(a.is_some() ^ b.is_some());
    let replays = harness
        .remote
        .calls()
        .iter()
        .filter(|call| call.as_str() == "create_observation:Wet floor")
        .count();
    // One failed online attempt plus exactly one replay.
    assert_eq!(replays, 2);
}

#[tokio::test]
async fn network_transitions_trigger_sync_only_when_coming_online() {
    let harness = ready_harness().await;
    harness.remote.fail_with(offline());
    create_observation(&harness.context, observation("Trip hazard"))
        .await
        .unwrap();
    harness.remote.fail_with(None);

    assert!(on_network_change(&harness.context, false).await.is_none());
    assert!(on_app_foreground(&harness.context).await.is_none());

    let outcome = on_network_change(&harness.context, true).await.unwrap();
    assert_eq!(outcome.synced, 1);
    assert!(offline_status(&harness.context).is_online);

    // Already online: no transition, no pass.
    assert!(on_network_change(&harness.context, true).await.is_none());
    assert!(on_app_foreground(&harness.context).await.is_some());
}

#[tokio::test]
async fn transition_of_unsynced_row_amends_its_create() {
    let harness = ready_harness().await;
    harness.remote.fail_with(offline());
    let local = create_observation(&harness.context, observation("Missing guard"))
        .await
        .unwrap();

    let answered = answer_observation(&harness.context, &local.local_id, "Guard refitted".into())
        .await
        .unwrap();
    assert_eq!(answered.status, "ANSWERED");
    assert_eq!(answered.answer.as_deref(), Some("Guard refitted"));
    assert_eq!(offline_status(&harness.context).pending_mutations, 1);

    harness.remote.fail_with(None);
    let before = harness.remote.calls().len();
    let outcome = sync_now(&harness.context).await.unwrap();
    assert_eq!(outcome.synced, 1);
    assert_eq!(
        harness.remote.calls()[before..].to_vec(),
        vec!["create_observation:Missing guard"]
    );

    let synced = get_observation(&harness.context, &local.local_id)
        .unwrap()
        .unwrap();
    assert_eq!(synced.status, "ANSWERED");
    assert_eq!(synced.sync_status, SyncStatus::Synced);
}

#[tokio::test]
async fn transition_of_synced_row_is_replayed_as_update() {
    let harness = ready_harness().await;
    let created = create_observation(&harness.context, observation("Unlabelled drum"))
        .await
        .unwrap();
    let server_id = created.server_id.clone().unwrap();

    harness.remote.fail_with(offline());
    let closed = close_observation(&harness.context, &created.local_id)
        .await
        .unwrap();
    assert_eq!(closed.status, "CLOSED");
    assert_eq!(offline_status(&harness.context).pending_mutations, 1);

    let pending = harness.context.sync_queue_repository().get_pending().unwrap();
    assert_eq!(pending[0].operation, QueueOperation::Update);
    assert_eq!(pending[0].base_version, Some(1));

    harness.remote.fail_with(None);
    let outcome = sync_now(&harness.context).await.unwrap();
    assert_eq!(outcome.synced, 1);
    assert!(harness
        .remote
        .calls()
        .contains(&format!("transition_observation:{server_id}:close")));

    let row = get_observation(&harness.context, &created.local_id)
        .unwrap()
        .unwrap();
    assert_eq!(row.status, "CLOSED");
    assert_eq!(row.version, 2);
}

#[tokio::test]
async fn transition_behind_a_queued_update_keeps_its_order() {
    let harness = ready_harness().await;
    let created = create_observation(&harness.context, observation("Frayed sling"))
        .await
        .unwrap();
    let server_id = created.server_id.clone().unwrap();

    harness.remote.fail_with(offline());
    answer_observation(&harness.context, &created.local_id, "Sling replaced".into())
        .await
        .unwrap();

    // Back online, but the answer has not been replayed yet.
    harness.remote.fail_with(None);
    let before = harness.remote.calls().len();
    let closed = close_observation(&harness.context, &created.local_id)
        .await
        .unwrap();
    assert_eq!(closed.status, "CLOSED");
    assert_eq!(harness.remote.calls().len(), before);
    assert_eq!(offline_status(&harness.context).pending_mutations, 2);

    let outcome = sync_now(&harness.context).await.unwrap();
    assert_eq!(outcome.synced, 2);
    assert_eq!(
        harness.remote.calls()[before..].to_vec(),
        vec![
            format!("transition_observation:{server_id}:answer"),
            format!("transition_observation:{server_id}:close"),
        ]
    );

    let row = get_observation(&harness.context, &created.local_id)
        .unwrap()
        .unwrap();
    assert_eq!(row.status, "CLOSED");
    assert_eq!(row.answer.as_deref(), Some("Sling replaced"));
    assert_eq!(row.sync_status, SyncStatus::Synced);
}

#[tokio::test]
async fn failed_update_holds_later_updates_of_the_same_row() {
    let harness = ready_harness().await;
    let created = create_observation(&harness.context, observation("Open trench"))
        .await
        .unwrap();
    let server_id = created.server_id.clone().unwrap();

    harness.remote.fail_with(offline());
    answer_observation(&harness.context, &created.local_id, "Barrier placed".into())
        .await
        .unwrap();
    close_observation(&harness.context, &created.local_id)
        .await
        .unwrap();
    assert_eq!(offline_status(&harness.context).pending_mutations, 2);

    harness
        .remote
        .fail_with(Some(RemoteError::http(503, "maintenance")));
    let before = harness.remote.calls().len();
    let outcome = sync_now(&harness.context).await.unwrap();
    assert_eq!(outcome.processed, 1);
    assert_eq!(outcome.failed, 1);
    assert_eq!(outcome.skipped, 1);
    assert_eq!(outcome.pending, 2);
    assert_eq!(
        harness.remote.calls()[before..].to_vec(),
        vec![format!("transition_observation:{server_id}:answer")]
    );

    // The close stays untouched until the answer goes through.
    let pending = harness.context.sync_queue_repository().get_pending().unwrap();
    assert_eq!(pending[1].status, QueueStatus::Pending);
    assert_eq!(pending[1].retry_count, 0);
}

#[tokio::test]
async fn fetch_keeps_transitions_still_waiting_in_the_queue() {
    let harness = ready_harness().await;
    let created = create_observation(&harness.context, observation("Blocked hydrant"))
        .await
        .unwrap();

    harness.remote.fail_with(offline());
    close_observation(&harness.context, &created.local_id)
        .await
        .unwrap();

    harness.remote.fail_with(None);
    harness.remote.observations.lock().unwrap().push(ObservationDto {
        id: created.server_id.clone().unwrap(),
        version: Some(1),
        description: Some("Blocked hydrant".to_string()),
        status: Some("PENDING".to_string()),
        ..ObservationDto::default()
    });
    let fetched = fetch_observations(&harness.context).await.unwrap();
    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].status, "CLOSED");

    let outcome = sync_now(&harness.context).await.unwrap();
    assert_eq!(outcome.synced, 1);
    let row = get_observation(&harness.context, &created.local_id)
        .unwrap()
        .unwrap();
    assert_eq!(row.status, "CLOSED");
}

#[tokio::test]
async fn rejection_without_reason_is_refused() {
    let harness = ready_harness().await;
    let created = create_task(
        &harness.context,
        NewTask {
            title: "Replace extinguisher".to_string(),
            ..NewTask::default()
        },
    )
    .await
    .unwrap();

    assert!(reject_task(&harness.context, &created.local_id, "  ".into())
        .await
        .is_err());
    assert!(answer_task(&harness.context, "no-such-task", "done".into())
        .await
        .is_err());
}

#[tokio::test]
async fn unsupported_operations_are_parked() {
    let harness = ready_harness().await;
    harness
        .context
        .sync_queue_repository()
        .enqueue(EnqueueRequest::new(
            QueueEntityType::Profile,
            QueueOperation::Create,
            json!({ "localId": "profile-1", "payload": {} }),
        ))
        .await
        .unwrap();

    let outcome = sync_now(&harness.context).await.unwrap();
    assert_eq!(outcome.needs_review, 1);

    let parked = list_needs_review(&harness.context).unwrap();
    assert_eq!(parked[0].last_error.as_deref(), Some(UNSUPPORTED_OPERATION));
}

#[tokio::test]
async fn bootstrap_recovers_interrupted_entries() {
    let harness = harness_with(RetryPolicy::default(), MockCredentials::signed_in());
    let queue = harness.context.sync_queue_repository();
    let entry = queue
        .enqueue(EnqueueRequest::new(
            QueueEntityType::Observation,
            QueueOperation::Create,
            json!({ "localId": "obs-local-1", "payload": { "description": "Interrupted" } }),
        ))
        .await
        .unwrap();
    queue
        .update_status(QueueStatusUpdate::new(entry.id.clone(), QueueStatus::Processing))
        .await
        .unwrap();
    assert_eq!(offline_status(&harness.context).pending_mutations, 0);

    let report = start_offline_sync(&harness.context, false).await.unwrap();
    assert_eq!(report.reset_processing, 1);

    let status = offline_status(&harness.context);
    assert!(status.ready);
    assert_eq!(status.pending_mutations, 1);
    let recovered = get_queued_mutation(&harness.context, &entry.id)
        .unwrap()
        .unwrap();
    assert_eq!(recovered.status, QueueStatus::Pending);
    assert_eq!(recovered.retry_count, 0);
    assert!(get_queued_mutation(&harness.context, "missing")
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn fetch_falls_back_to_the_mirror_and_stamps_cursor() {
    let harness = ready_harness().await;
    harness.remote.observations.lock().unwrap().push(ObservationDto {
        id: "srv-remote".to_string(),
        description: Some("Pulled from server".to_string()),
        status: Some("PENDING".to_string()),
        ..ObservationDto::default()
    });

    let online = fetch_observations(&harness.context).await.unwrap();
    assert_eq!(online.len(), 1);
    assert!(last_pulled_at(&harness.context, "observations")
        .unwrap()
        .is_some());

    harness.remote.fail_with(offline());
    let cached = fetch_observations(&harness.context).await.unwrap();
    assert_eq!(cached, online);
}

#[tokio::test]
async fn reference_lists_survive_going_offline() {
    let harness = ready_harness().await;
    harness.remote.references.lock().unwrap().extend([
        ReferenceItem {
            id: "dep-2".to_string(),
            name: "Warehouse".to_string(),
            parent_id: None,
            updated_at: None,
        },
        ReferenceItem {
            id: "dep-1".to_string(),
            name: "Assembly".to_string(),
            parent_id: None,
            updated_at: None,
        },
    ]);

    let online = fetch_reference(&harness.context, ReferenceKind::Department)
        .await
        .unwrap();
    assert_eq!(online.len(), 2);

    harness.remote.fail_with(offline());
    let cached = fetch_reference(&harness.context, ReferenceKind::Department)
        .await
        .unwrap();
    let names: Vec<_> = cached.iter().map(|item| item.name.as_str()).collect();
    assert_eq!(names, vec!["Assembly", "Warehouse"]);
    assert!(last_pulled_at(&harness.context, "departments")
        .unwrap()
        .is_some());
}

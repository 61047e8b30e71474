use std::sync::Arc;

use async_trait::async_trait;
use log::debug;

use super::{NewTask, Task, TaskRepositoryTrait, TaskServiceTrait};
use crate::errors::{Error, Result};
use crate::metadata::MetadataRepositoryTrait;
use crate::remote::{CredentialStore, RemoteApi};
use crate::sync::{attempt_online, OnlineAttempt};
use crate::utils::now_rfc3339;
use crate::workflow::StatusTransition;

const CURSOR_DOMAIN: &str = "tasks";

/// Online-first task commands backed by the local mirror.
pub struct TaskService {
    remote: Arc<dyn RemoteApi>,
    credentials: Arc<dyn CredentialStore>,
    repository: Arc<dyn TaskRepositoryTrait>,
    metadata: Arc<dyn MetadataRepositoryTrait>,
}

impl TaskService {
    pub fn new(
        remote: Arc<dyn RemoteApi>,
        credentials: Arc<dyn CredentialStore>,
        repository: Arc<dyn TaskRepositoryTrait>,
        metadata: Arc<dyn MetadataRepositoryTrait>,
    ) -> Self {
        Self {
            remote,
            credentials,
            repository,
            metadata,
        }
    }

    fn require(&self, id: &str) -> Result<Task> {
        self.repository
            .get_local_by_id(id)?
            .ok_or_else(|| Error::NotFound(format!("Task {id} not found")))
    }

    async fn transition(&self, id: &str, transition: StatusTransition) -> Result<Task> {
        transition.validate()?;
        let current = self.require(id)?;

        // Earlier changes still in the queue must reach the server first.
        let queued_behind = current.server_id.is_some()
            && self.repository.has_queued_changes(&current.local_id)?;
        if queued_behind {
            debug!(
                "[OfflineSync] Task {} has queued changes, appending to the queue",
                current.local_id
            );
        } else if let Some(server_id) = current.server_id.as_deref() {
            let transition_ref = &transition;
            let attempt = attempt_online(self.credentials.as_ref(), |token| async move {
                self.remote
                    .transition_task(&token, server_id, transition_ref)
                    .await
            })
            .await?;

            if let OnlineAttempt::Completed(dto) = attempt {
                self.repository.persist_from_server(vec![dto]).await?;
                return self.require(&current.local_id);
            }
        }

        debug!(
            "[OfflineSync] Recording {:?} for task {} locally",
            transition.action, current.local_id
        );
        self.repository
            .transition_offline(current.local_id, transition)
            .await
    }
}

#[async_trait]
impl TaskServiceTrait for TaskService {
    async fn fetch_tasks(&self) -> Result<Vec<Task>> {
        let attempt = attempt_online(self.credentials.as_ref(), |token| async move {
            self.remote.list_tasks(&token).await
        })
        .await?;

        if let OnlineAttempt::Completed(items) = attempt {
            let count = self.repository.persist_from_server(items).await?;
            self.metadata
                .set_cursor(CURSOR_DOMAIN, Some(now_rfc3339()))
                .await?;
            debug!("[OfflineSync] Pulled {} tasks", count);
        }
        self.repository.get_local()
    }

    fn last_pulled_at(&self) -> Result<Option<String>> {
        self.metadata.get_cursor(CURSOR_DOMAIN)
    }

    fn get_task(&self, id: &str) -> Result<Option<Task>> {
        self.repository.get_local_by_id(id)
    }

    async fn create_task(&self, input: NewTask) -> Result<Task> {
        let input_ref = &input;
        let attempt = attempt_online(self.credentials.as_ref(), |token| async move {
            self.remote.create_task(&token, input_ref).await
        })
        .await?;

        match attempt {
            OnlineAttempt::Completed(dto) => {
                let server_id = dto.id.clone();
                self.repository.persist_from_server(vec![dto]).await?;
                self.require(&server_id)
            }
            OnlineAttempt::Offline(_) => self.repository.create_offline(input).await,
        }
    }

    async fn answer_task(&self, id: &str, answer: String) -> Result<Task> {
        self.transition(id, StatusTransition::answer(answer)).await
    }

    async fn close_task(&self, id: &str) -> Result<Task> {
        self.transition(id, StatusTransition::close()).await
    }

    async fn reject_task(&self, id: &str, reason: String) -> Result<Task> {
        self.transition(id, StatusTransition::reject(reason)).await
    }
}

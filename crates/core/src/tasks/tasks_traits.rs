use async_trait::async_trait;

use super::{NewTask, Task, TaskDto};
use crate::errors::Result;
use crate::sync::SyncStatus;
use crate::workflow::StatusTransition;

/// Local mirror of tasks. Same contract as the observation mirror.
#[async_trait]
pub trait TaskRepositoryTrait: Send + Sync {
    async fn persist_from_server(&self, items: Vec<TaskDto>) -> Result<usize>;
    fn get_local(&self) -> Result<Vec<Task>>;
    fn get_local_by_id(&self, id: &str) -> Result<Option<Task>>;
    fn has_queued_changes(&self, local_id: &str) -> Result<bool>;
    async fn create_offline(&self, input: NewTask) -> Result<Task>;
    async fn mark_synced(&self, local_id: String, server: TaskDto) -> Result<Task>;
    async fn set_sync_status(&self, local_id: String, status: SyncStatus) -> Result<()>;
    async fn transition_offline(&self, id: String, transition: StatusTransition) -> Result<Task>;
    async fn requeue_orphans(&self) -> Result<usize>;
}

#[async_trait]
pub trait TaskServiceTrait: Send + Sync {
    async fn fetch_tasks(&self) -> Result<Vec<Task>>;
    /// When the last successful online fetch completed.
    fn last_pulled_at(&self) -> Result<Option<String>>;
    fn get_task(&self, id: &str) -> Result<Option<Task>>;
    async fn create_task(&self, input: NewTask) -> Result<Task>;
    async fn answer_task(&self, id: &str, answer: String) -> Result<Task>;
    async fn close_task(&self, id: &str) -> Result<Task>;
    async fn reject_task(&self, id: &str, reason: String) -> Result<Task>;
}

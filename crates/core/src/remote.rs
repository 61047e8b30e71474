//! Ports to the remote CRUD API and to the credential holder.

use async_trait::async_trait;

use crate::errors::RemoteResult;
use crate::observations::{NewObservation, ObservationDto};
use crate::reference::{ReferenceItem, ReferenceKind};
use crate::tasks::{NewTask, TaskDto};
use crate::workflow::StatusTransition;

/// Remote create/read/update operations per entity type.
///
/// Implementations report HTTP failures with their status code so callers can
/// tell terminal validation errors (4xx) from transport or server failures.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    async fn list_observations(&self, token: &str) -> RemoteResult<Vec<ObservationDto>>;

    async fn create_observation(
        &self,
        token: &str,
        input: &NewObservation,
    ) -> RemoteResult<ObservationDto>;

    async fn transition_observation(
        &self,
        token: &str,
        server_id: &str,
        transition: &StatusTransition,
    ) -> RemoteResult<ObservationDto>;

    async fn list_tasks(&self, token: &str) -> RemoteResult<Vec<TaskDto>>;

    async fn create_task(&self, token: &str, input: &NewTask) -> RemoteResult<TaskDto>;

    async fn transition_task(
        &self,
        token: &str,
        server_id: &str,
        transition: &StatusTransition,
    ) -> RemoteResult<TaskDto>;

    async fn list_reference(
        &self,
        token: &str,
        kind: ReferenceKind,
    ) -> RemoteResult<Vec<ReferenceItem>>;
}

/// Supplies the bearer token. Token storage itself lives outside this crate.
pub trait CredentialStore: Send + Sync {
    fn access_token(&self) -> Option<String>;
}

use std::sync::Arc;

use async_trait::async_trait;
use log::debug;

use super::{ReferenceItem, ReferenceKind, ReferenceRepositoryTrait, ReferenceServiceTrait};
use crate::errors::Result;
use crate::metadata::MetadataRepositoryTrait;
use crate::remote::{CredentialStore, RemoteApi};
use crate::sync::{attempt_online, OnlineAttempt};
use crate::utils::now_rfc3339;

pub struct ReferenceService {
    remote: Arc<dyn RemoteApi>,
    credentials: Arc<dyn CredentialStore>,
    repository: Arc<dyn ReferenceRepositoryTrait>,
    metadata: Arc<dyn MetadataRepositoryTrait>,
}

impl ReferenceService {
    pub fn new(
        remote: Arc<dyn RemoteApi>,
        credentials: Arc<dyn CredentialStore>,
        repository: Arc<dyn ReferenceRepositoryTrait>,
        metadata: Arc<dyn MetadataRepositoryTrait>,
    ) -> Self {
        Self {
            remote,
            credentials,
            repository,
            metadata,
        }
    }
}

#[async_trait]
impl ReferenceServiceTrait for ReferenceService {
    async fn fetch_reference(&self, kind: ReferenceKind) -> Result<Vec<ReferenceItem>> {
        let attempt = attempt_online(self.credentials.as_ref(), |token| async move {
            self.remote.list_reference(&token, kind).await
        })
        .await?;

        if let OnlineAttempt::Completed(items) = attempt {
            let count = self.repository.replace_from_server(kind, items).await?;
            self.metadata
                .set_cursor(kind.table_name(), Some(now_rfc3339()))
                .await?;
            debug!("[OfflineSync] Pulled {} {}", count, kind.table_name());
        }
        self.repository.list(kind)
    }
}

use std::sync::Arc;

use fieldsafe_core::{
    metadata::MetadataRepositoryTrait,
    observations::ObservationServiceTrait,
    reference::ReferenceServiceTrait,
    sync::{OfflineController, SyncEngine, SyncQueueRepositoryTrait},
    tasks::TaskServiceTrait,
};

pub struct MobileContext {
    pub db_path: String,
    pub schema_version: i32,

    // Services
    pub observation_service: Arc<dyn ObservationServiceTrait>,
    pub task_service: Arc<dyn TaskServiceTrait>,
    pub reference_service: Arc<dyn ReferenceServiceTrait>,
    pub metadata_repository: Arc<dyn MetadataRepositoryTrait>,
    pub sync_queue_repository: Arc<dyn SyncQueueRepositoryTrait>,
    pub sync_engine: Arc<SyncEngine>,
    pub offline_controller: Arc<OfflineController>,
}

impl MobileContext {
    pub fn observation_service(&self) -> Arc<dyn ObservationServiceTrait> {
        Arc::clone(&self.observation_service)
    }

    pub fn task_service(&self) -> Arc<dyn TaskServiceTrait> {
        Arc::clone(&self.task_service)
    }

    pub fn reference_service(&self) -> Arc<dyn ReferenceServiceTrait> {
        Arc::clone(&self.reference_service)
    }

    pub fn metadata_repository(&self) -> Arc<dyn MetadataRepositoryTrait> {
        Arc::clone(&self.metadata_repository)
    }

    pub fn sync_queue_repository(&self) -> Arc<dyn SyncQueueRepositoryTrait> {
        Arc::clone(&self.sync_queue_repository)
    }

    pub fn sync_engine(&self) -> Arc<SyncEngine> {
        Arc::clone(&self.sync_engine)
    }

    pub fn offline_controller(&self) -> Arc<OfflineController> {
        Arc::clone(&self.offline_controller)
    }
}

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};

use fieldsafe_api_client::ApiClient;
use fieldsafe_core::{
    errors::{Error, RemoteError, Result},
    observations::ObservationService,
    reference::ReferenceService,
    remote::{CredentialStore, RemoteApi},
    sync::{OfflineController, SyncEngine},
    tasks::TaskService,
    OfflineConfig,
};
use fieldsafe_storage_sqlite::{
    create_pool, db, run_migrations, MetadataRepository, ObservationRepository,
    ReferenceRepository, SyncQueueRepository, TaskRepository,
};

use super::MobileContext;

impl MobileContext {
    /// Open the database under `app_data_dir` and wire the HTTP client from
    /// `config`.
    ///
    /// A migration failure is fatal: the subsystem never starts on a schema it
    /// does not understand.
    pub fn open(
        app_data_dir: &str,
        config: &OfflineConfig,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self> {
        if !config.is_api_configured() {
            warn!("[OfflineSync] No API base URL configured, every remote call will fall back to the local path");
        }
        let client = ApiClient::new(
            &config.api_base_url,
            Duration::from_secs(config.request_timeout_secs),
        )
        .map_err(|err| Error::Remote(RemoteError::from(err)))?;

        Self::with_remote(app_data_dir, config, Arc::new(client), credentials)
    }

    pub fn with_remote(
        app_data_dir: &str,
        config: &OfflineConfig,
        remote: Arc<dyn RemoteApi>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self> {
        let db_path = db::init_with_file_name(app_data_dir, &config.database_file_name)?;
        let schema_version = run_migrations(&db_path, config.transaction_mode)?;

        let pool = create_pool(&db_path)?;
        let writer = db::spawn_writer((*pool).clone());

        let metadata_repository = Arc::new(MetadataRepository::new(pool.clone(), writer.clone()));
        let sync_queue_repository =
            Arc::new(SyncQueueRepository::new(pool.clone(), writer.clone()));
        let observation_repository =
            Arc::new(ObservationRepository::new(pool.clone(), writer.clone()));
        let task_repository = Arc::new(TaskRepository::new(pool.clone(), writer.clone()));
        let reference_repository = Arc::new(ReferenceRepository::new(pool, writer));

        let observation_service = Arc::new(ObservationService::new(
            remote.clone(),
            credentials.clone(),
            observation_repository.clone(),
            metadata_repository.clone(),
        ));
        let task_service = Arc::new(TaskService::new(
            remote.clone(),
            credentials.clone(),
            task_repository.clone(),
            metadata_repository.clone(),
        ));
        let reference_service = Arc::new(ReferenceService::new(
            remote.clone(),
            credentials.clone(),
            reference_repository,
            metadata_repository.clone(),
        ));

        let sync_engine = Arc::new(SyncEngine::new(
            sync_queue_repository.clone(),
            observation_repository,
            task_repository,
            remote,
            credentials,
            config.retry,
        ));
        let offline_controller = Arc::new(OfflineController::new(sync_engine.clone()));

        info!(
            "[OfflineSync] Opened {} at schema version {}",
            db_path, schema_version
        );

        Ok(Self {
            db_path,
            schema_version,
            observation_service,
            task_service,
            reference_service,
            metadata_repository,
            sync_queue_repository,
            sync_engine,
            offline_controller,
        })
    }
}

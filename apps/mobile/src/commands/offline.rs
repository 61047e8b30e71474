use log::info;

use fieldsafe_core::sync::{DrainOutcome, OfflineStatus, QueueItem, RecoveryReport};

use crate::context::MobileContext;

/// Mount the offline subsystem. Call once, after [`MobileContext::open`],
/// with the first reachability reading.
pub async fn start_offline_sync(
    context: &MobileContext,
    initially_online: bool,
) -> Result<RecoveryReport, String> {
    info!("[OfflineSync] Starting (online={})", initially_online);
    context
        .offline_controller()
        .bootstrap(initially_online)
        .await
        .map_err(|e| e.to_string())
}

pub fn offline_status(context: &MobileContext) -> OfflineStatus {
    context.offline_controller().status()
}

/// `None` when a pass is already running or the subsystem is not ready.
pub async fn sync_now(context: &MobileContext) -> Option<DrainOutcome> {
    context.offline_controller().sync_now().await
}

pub async fn on_network_change(context: &MobileContext, online: bool) -> Option<DrainOutcome> {
    context.offline_controller().handle_network_change(online).await
}

pub async fn on_app_foreground(context: &MobileContext) -> Option<DrainOutcome> {
    context.offline_controller().handle_app_foreground().await
}

/// Time of the last successful online pull of `domain` ("observations",
/// "tasks" or a reference table name).
pub fn last_pulled_at(context: &MobileContext, domain: &str) -> Result<Option<String>, String> {
    context
        .metadata_repository()
        .get_cursor(domain)
        .map_err(|e| e.to_string())
}

/// Entries parked after exhausting retries or failing permanently.
pub fn list_needs_review(context: &MobileContext) -> Result<Vec<QueueItem>, String> {
    context
        .sync_queue_repository()
        .list_needs_review()
        .map_err(|e| e.to_string())
}

/// A single queued mutation, whatever its status.
pub fn get_queued_mutation(
    context: &MobileContext,
    id: &str,
) -> Result<Option<QueueItem>, String> {
    context
        .sync_queue_repository()
        .get(id)
        .map_err(|e| e.to_string())
}

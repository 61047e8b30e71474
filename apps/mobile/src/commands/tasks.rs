use log::{debug, error};

use fieldsafe_core::tasks::{NewTask, Task};

use crate::context::MobileContext;

pub async fn fetch_tasks(context: &MobileContext) -> Result<Vec<Task>, String> {
    debug!("Fetching tasks...");
    context
        .task_service()
        .fetch_tasks()
        .await
        .map_err(|e| e.to_string())
}

pub fn get_task(context: &MobileContext, id: &str) -> Result<Option<Task>, String> {
    context.task_service().get_task(id).map_err(|e| e.to_string())
}

pub async fn create_task(context: &MobileContext, input: NewTask) -> Result<Task, String> {
    debug!("Creating task...");
    let result = context
        .task_service()
        .create_task(input)
        .await
        .map_err(|e| {
            error!("Failed to create task: {}", e);
            e.to_string()
        });
    context.offline_controller().refresh_counts();
    result
}

pub async fn answer_task(
    context: &MobileContext,
    id: &str,
    answer: String,
) -> Result<Task, String> {
    debug!("Answering task {}...", id);
    let result = context
        .task_service()
        .answer_task(id, answer)
        .await
        .map_err(|e| e.to_string());
    context.offline_controller().refresh_counts();
    result
}

pub async fn close_task(context: &MobileContext, id: &str) -> Result<Task, String> {
    debug!("Closing task {}...", id);
    let result = context
        .task_service()
        .close_task(id)
        .await
        .map_err(|e| e.to_string());
    context.offline_controller().refresh_counts();
    result
}

pub async fn reject_task(
    context: &MobileContext,
    id: &str,
    reason: String,
) -> Result<Task, String> {
    debug!("Rejecting task {}...", id);
    let result = context
        .task_service()
        .reject_task(id, reason)
        .await
        .map_err(|e| e.to_string());
    context.offline_controller().refresh_counts();
    result
}

use log::{debug, error};

use fieldsafe_core::observations::{NewObservation, Observation};

use crate::context::MobileContext;

pub async fn fetch_observations(context: &MobileContext) -> Result<Vec<Observation>, String> {
    debug!("Fetching observations...");
    context
        .observation_service()
        .fetch_observations()
        .await
        .map_err(|e| e.to_string())
}

pub fn get_observation(
    context: &MobileContext,
    id: &str,
) -> Result<Option<Observation>, String> {
    context
        .observation_service()
        .get_observation(id)
        .map_err(|e| e.to_string())
}

pub async fn create_observation(
    context: &MobileContext,
    input: NewObservation,
) -> Result<Observation, String> {
    debug!("Creating observation...");
    let result = context
        .observation_service()
        .create_observation(input)
        .await
        .map_err(|e| {
            error!("Failed to create observation: {}", e);
            e.to_string()
        });
    context.offline_controller().refresh_counts();
    result
}

pub async fn answer_observation(
    context: &MobileContext,
    id: &str,
    answer: String,
) -> Result<Observation, String> {
    debug!("Answering observation {}...", id);
    let result = context
        .observation_service()
        .answer_observation(id, answer)
        .await
        .map_err(|e| e.to_string());
    context.offline_controller().refresh_counts();
    result
}

pub async fn close_observation(context: &MobileContext, id: &str) -> Result<Observation, String> {
    debug!("Closing observation {}...", id);
    let result = context
        .observation_service()
        .close_observation(id)
        .await
        .map_err(|e| e.to_string());
    context.offline_controller().refresh_counts();
    result
}

pub async fn reject_observation(
    context: &MobileContext,
    id: &str,
    reason: String,
) -> Result<Observation, String> {
    debug!("Rejecting observation {}...", id);
    let result = context
        .observation_service()
        .reject_observation(id, reason)
        .await
        .map_err(|e| e.to_string());
    context.offline_controller().refresh_counts();
    result
}

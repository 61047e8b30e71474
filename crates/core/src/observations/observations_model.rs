//! Safety observation models.

use serde::{Deserialize, Serialize};

use crate::sync::SyncStatus;
use crate::workflow::MediaRef;

/// Observation as served to the UI from the local mirror.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub local_id: String,
    pub server_id: Option<String>,
    pub project_id: Option<String>,
    pub department_id: Option<String>,
    pub location_id: Option<String>,
    pub category_id: Option<String>,
    pub subcategory_id: Option<String>,
    pub supervisor_id: Option<String>,
    pub worker_full_name: Option<String>,
    pub description: String,
    pub status: String,
    pub risk_level: i32,
    pub deadline: Option<String>,
    pub answer: Option<String>,
    pub rejection_reason: Option<String>,
    pub media: Vec<MediaRef>,
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
    pub sync_status: SyncStatus,
}

/// Payload of a create-observation command, also the body of the remote create
/// call and of a queued CREATE.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewObservation {
    pub project_id: Option<String>,
    pub department_id: Option<String>,
    pub location_id: Option<String>,
    pub category_id: Option<String>,
    pub subcategory_id: Option<String>,
    pub supervisor_id: Option<String>,
    pub worker_full_name: Option<String>,
    #[serde(default)]
    pub description: String,
    pub risk_level: Option<i32>,
    pub deadline: Option<String>,
    #[serde(default)]
    pub media: Vec<MediaRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

impl From<&Observation> for NewObservation {
    fn from(observation: &Observation) -> Self {
        Self {
            project_id: observation.project_id.clone(),
            department_id: observation.department_id.clone(),
            location_id: observation.location_id.clone(),
            category_id: observation.category_id.clone(),
            subcategory_id: observation.subcategory_id.clone(),
            supervisor_id: observation.supervisor_id.clone(),
            worker_full_name: observation.worker_full_name.clone(),
            description: observation.description.clone(),
            risk_level: Some(observation.risk_level),
            deadline: observation.deadline.clone(),
            media: observation.media.clone(),
            status: Some(observation.status.clone()),
            answer: observation.answer.clone(),
            rejection_reason: observation.rejection_reason.clone(),
        }
    }
}

/// Observation as returned by the server. Everything but `id` may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationDto {
    pub id: String,
    pub version: Option<i64>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub project_id: Option<String>,
    pub department_id: Option<String>,
    pub location_id: Option<String>,
    pub category_id: Option<String>,
    pub subcategory_id: Option<String>,
    pub supervisor_id: Option<String>,
    pub worker_full_name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub risk_level: Option<i32>,
    pub deadline: Option<String>,
    pub answer: Option<String>,
    pub rejection_reason: Option<String>,
    pub media: Option<Vec<MediaRef>>,
}

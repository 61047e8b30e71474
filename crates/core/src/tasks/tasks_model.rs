//! Corrective task models.

use serde::{Deserialize, Serialize};

use crate::sync::SyncStatus;
use crate::workflow::MediaRef;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub local_id: String,
    pub server_id: Option<String>,
    /// Observation this task was raised from, if any.
    pub observation_id: Option<String>,
    pub project_id: Option<String>,
    pub department_id: Option<String>,
    pub location_id: Option<String>,
    pub assignee_id: Option<String>,
    pub title: String,
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

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub observation_id: Option<String>,
    pub project_id: Option<String>,
    pub department_id: Option<String>,
    pub location_id: Option<String>,
    pub assignee_id: Option<String>,
    #[serde(default)]
    pub title: String,
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

impl From<&Task> for NewTask {
    fn from(task: &Task) -> Self {
        Self {
            observation_id: task.observation_id.clone(),
            project_id: task.project_id.clone(),
            department_id: task.department_id.clone(),
            location_id: task.location_id.clone(),
            assignee_id: task.assignee_id.clone(),
            title: task.title.clone(),
            description: task.description.clone(),
            risk_level: Some(task.risk_level),
            deadline: task.deadline.clone(),
            media: task.media.clone(),
            status: Some(task.status.clone()),
            answer: task.answer.clone(),
            rejection_reason: task.rejection_reason.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDto {
    pub id: String,
    pub version: Option<i64>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub observation_id: Option<String>,
    pub project_id: Option<String>,
    pub department_id: Option<String>,
    pub location_id: Option<String>,
    pub assignee_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub risk_level: Option<i32>,
    pub deadline: Option<String>,
    pub answer: Option<String>,
    pub rejection_reason: Option<String>,
    pub media: Option<Vec<MediaRef>>,
}

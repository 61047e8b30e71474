//! Database model for mirrored observations.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use fieldsafe_core::errors::Result;
use fieldsafe_core::observations::{NewObservation, Observation, ObservationDto};
use fieldsafe_core::sync::SyncStatus;
use fieldsafe_core::workflow::{StatusTransition, STATUS_PENDING};

use crate::utils::{decode_media, encode_media, enum_from_db, enum_to_db};

#[derive(
    Queryable,
    Identifiable,
    Insertable,
    AsChangeset,
    Selectable,
    Debug,
    Clone,
    Serialize,
    Deserialize,
)]
#[diesel(primary_key(local_id))]
#[diesel(table_name = crate::schema::observations)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ObservationDB {
    pub local_id: String,
    pub server_id: Option<String>,
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
    pub media: Option<String>,
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
    pub deleted_at: Option<String>,
    pub sync_status: String,
}

impl ObservationDB {
    /// Row for an observation created on the device and not yet confirmed.
    pub fn new_local(local_id: String, input: &NewObservation, now: &str) -> Result<Self> {
        Ok(Self {
            local_id,
            server_id: None,
            project_id: input.project_id.clone(),
            department_id: input.department_id.clone(),
            location_id: input.location_id.clone(),
            category_id: input.category_id.clone(),
            subcategory_id: input.subcategory_id.clone(),
            supervisor_id: input.supervisor_id.clone(),
            worker_full_name: input.worker_full_name.clone(),
            description: Some(input.description.clone()),
            status: Some(
                input
                    .status
                    .clone()
                    .unwrap_or_else(|| STATUS_PENDING.to_string()),
            ),
            risk_level: Some(input.risk_level.unwrap_or(0)),
            deadline: input.deadline.clone(),
            answer: input.answer.clone(),
            rejection_reason: input.rejection_reason.clone(),
            media: Some(encode_media(&input.media)?),
            version: 0,
            created_at: now.to_string(),
            updated_at: now.to_string(),
            deleted_at: None,
            sync_status: enum_to_db(&SyncStatus::Pending)?,
        })
    }

    /// Full replacement from a server payload under `local_id`.
    pub fn from_server(local_id: String, server: ObservationDto, now: &str) -> Result<Self> {
        let updated_at = server.updated_at.unwrap_or_else(|| now.to_string());
        Ok(Self {
            local_id,
            project_id: server.project_id,
            department_id: server.department_id,
            location_id: server.location_id,
            category_id: server.category_id,
            subcategory_id: server.subcategory_id,
            supervisor_id: server.supervisor_id,
            worker_full_name: server.worker_full_name,
            description: server.description,
            status: server.status,
            risk_level: server.risk_level,
            deadline: server.deadline,
            answer: server.answer,
            rejection_reason: server.rejection_reason,
            media: server.media.as_deref().map(encode_media).transpose()?,
            version: server.version.unwrap_or(0),
            created_at: server.created_at.unwrap_or_else(|| updated_at.clone()),
            updated_at,
            deleted_at: None,
            sync_status: enum_to_db(&SyncStatus::Synced)?,
            server_id: Some(server.id),
        })
    }

    /// Reconcile a server response into this row. Domain fields the server
    /// omitted keep their local value.
    pub fn merge_server(self, server: ObservationDto, now: &str) -> Result<Self> {
        let media = match server.media.as_deref() {
            Some(media) => Some(encode_media(media)?),
            None => self.media,
        };
        Ok(Self {
            local_id: self.local_id,
            server_id: Some(server.id),
            project_id: server.project_id.or(self.project_id),
            department_id: server.department_id.or(self.department_id),
            location_id: server.location_id.or(self.location_id),
            category_id: server.category_id.or(self.category_id),
            subcategory_id: server.subcategory_id.or(self.subcategory_id),
            supervisor_id: server.supervisor_id.or(self.supervisor_id),
            worker_full_name: server.worker_full_name.or(self.worker_full_name),
            description: server.description.or(self.description),
            status: server.status.or(self.status),
            risk_level: server.risk_level.or(self.risk_level),
            deadline: server.deadline.or(self.deadline),
            answer: server.answer.or(self.answer),
            rejection_reason: server.rejection_reason.or(self.rejection_reason),
            media,
            version: server.version.unwrap_or(self.version),
            created_at: server.created_at.unwrap_or(self.created_at),
            updated_at: server.updated_at.unwrap_or_else(|| now.to_string()),
            deleted_at: self.deleted_at,
            sync_status: enum_to_db(&SyncStatus::Synced)?,
        })
    }

    /// Server acknowledgement that leaves local fields alone, used while a
    /// later change to the row is still queued.
    pub fn acknowledge_server(self, server: &ObservationDto) -> Result<Self> {
        Ok(Self {
            server_id: Some(server.id.clone()),
            version: server.version.unwrap_or(self.version),
            sync_status: enum_to_db(&SyncStatus::Synced)?,
            ..self
        })
    }

    pub fn apply_transition(mut self, transition: &StatusTransition, now: &str) -> Self {
        self.status = Some(transition.resulting_status().to_string());
        if transition.answer.is_some() {
            self.answer = transition.answer.clone();
        }
        if transition.reason.is_some() {
            self.rejection_reason = transition.reason.clone();
        }
        self.updated_at = now.to_string();
        self
    }
}

pub(crate) fn to_observation(row: ObservationDB) -> Result<Observation> {
    let media = decode_media(&row.local_id, row.media.as_deref());
    Ok(Observation {
        sync_status: enum_from_db(&row.sync_status)?,
        local_id: row.local_id,
        server_id: row.server_id,
        project_id: row.project_id,
        department_id: row.department_id,
        location_id: row.location_id,
        category_id: row.category_id,
        subcategory_id: row.subcategory_id,
        supervisor_id: row.supervisor_id,
        worker_full_name: row.worker_full_name,
        description: row.description.unwrap_or_default(),
        status: row.status.unwrap_or_else(|| STATUS_PENDING.to_string()),
        risk_level: row.risk_level.unwrap_or(0),
        deadline: row.deadline,
        answer: row.answer,
        rejection_reason: row.rejection_reason,
        media,
        version: row.version,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

//! Database model for the mutation queue.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

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
#[diesel(table_name = crate::schema::sync_queue)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SyncQueueDB {
    pub id: String,
    pub entity_type: String,
    pub entity_id: String,
    pub operation: String,
    /// JSON text of the mutation envelope.
    pub payload: String,
    pub base_version: Option<i64>,
    pub status: String,
    pub retry_count: i32,
    pub last_error: Option<String>,
    pub next_retry_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Partial update; `None` fields are left untouched.
#[derive(AsChangeset, Debug)]
#[diesel(table_name = crate::schema::sync_queue)]
pub(crate) struct SyncQueueStatusChangeset {
    pub status: String,
    pub retry_count: Option<i32>,
    pub last_error: Option<String>,
    pub next_retry_at: Option<String>,
    pub updated_at: String,
}

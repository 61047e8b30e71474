//! Repository for the six read-only reference tables.
//!
//! The tables share one shape, so statements are built per table name and
//! run through `sql_query` with bound values.

use std::sync::Arc;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sql_types::{Nullable, Text};

use fieldsafe_core::errors::Result;
use fieldsafe_core::reference::{ReferenceItem, ReferenceKind, ReferenceRepositoryTrait};

use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::utils::quote_identifier;

#[derive(diesel::QueryableByName)]
struct ReferenceRow {
    #[diesel(sql_type = Text)]
    id: String,
    #[diesel(sql_type = Text)]
    name: String,
    #[diesel(sql_type = Nullable<Text>)]
    parent_id: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    updated_at: Option<String>,
}

impl From<ReferenceRow> for ReferenceItem {
    fn from(row: ReferenceRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            parent_id: row.parent_id,
            updated_at: row.updated_at,
        }
    }
}

pub struct ReferenceRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl ReferenceRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl ReferenceRepositoryTrait for ReferenceRepository {
    async fn replace_from_server(
        &self,
        kind: ReferenceKind,
        items: Vec<ReferenceItem>,
    ) -> Result<usize> {
        self.writer
            .exec(move |conn| -> Result<usize> {
                let sql = format!(
                    "INSERT OR REPLACE INTO {} (id, name, parent_id, updated_at, deleted_at) \
                     VALUES (?, ?, ?, ?, NULL)",
                    quote_identifier(kind.table_name())
                );
                let count = items.len();
                for item in items {
                    diesel::sql_query(sql.as_str())
                        .bind::<Text, _>(item.id)
                        .bind::<Text, _>(item.name)
                        .bind::<Nullable<Text>, _>(item.parent_id)
                        .bind::<Nullable<Text>, _>(item.updated_at)
                        .execute(conn)
                        .map_err(StorageError::from)?;
                }
                Ok(count)
            })
            .await
    }

    fn list(&self, kind: ReferenceKind) -> Result<Vec<ReferenceItem>> {
        let mut conn = get_connection(&self.pool)?;
        let sql = format!(
            "SELECT id, name, parent_id, updated_at FROM {} \
             WHERE deleted_at IS NULL ORDER BY name ASC",
            quote_identifier(kind.table_name())
        );
        let rows = diesel::sql_query(sql)
            .load::<ReferenceRow>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(ReferenceItem::from).collect())
    }
}

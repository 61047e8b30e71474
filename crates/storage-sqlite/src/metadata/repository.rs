use std::sync::Arc;

use async_trait::async_trait;
use diesel::prelude::*;

use fieldsafe_core::metadata::MetadataRepositoryTrait;
use fieldsafe_core::Result;

use super::model::MetadataDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::metadata;

pub struct MetadataRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl MetadataRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl MetadataRepositoryTrait for MetadataRepository {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = get_connection(&self.pool)?;
        let row = metadata::table
            .find(key)
            .first::<MetadataDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(row.and_then(|row| row.value))
    }

    async fn set(&self, key: String, value: Option<String>) -> Result<()> {
        self.writer
            .exec(move |conn| {
                let row = MetadataDB {
                    key,
                    value: value.clone(),
                };
                diesel::insert_into(metadata::table)
                    .values(&row)
                    .on_conflict(metadata::key)
                    .do_update()
                    .set(metadata::value.eq(value))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }
}

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
#[diesel(primary_key(key))]
#[diesel(table_name = crate::schema::metadata)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct MetadataDB {
    pub key: String,
    pub value: Option<String>,
}

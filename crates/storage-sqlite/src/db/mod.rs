//! Connection management: database file location, pool, migrations and the
//! single writer.

pub mod migrations;
pub mod migrator;
pub mod write_actor;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;
use log::info;

use fieldsafe_core::config::{TransactionMode, DEFAULT_DATABASE_FILE_NAME};
use fieldsafe_core::errors::{DatabaseError, Error, Result};

use crate::errors::StorageError;

pub use migrations::{MIGRATIONS, SCHEMA_VERSION};
pub use migrator::{MigrationStep, Migrator};
pub use write_actor::{spawn_writer, WriteHandle};

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

const POOL_MAX_SIZE: u32 = 8;
const BUSY_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug)]
struct ConnectionOptions {
    busy_timeout: Duration,
}

impl CustomizeConnection<SqliteConnection, r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> std::result::Result<(), r2d2::Error> {
        conn.batch_execute(&format!(
            "PRAGMA busy_timeout = {}; PRAGMA foreign_keys = ON;",
            self.busy_timeout.as_millis()
        ))
        .map_err(r2d2::Error::QueryError)
    }
}

/// Ensure the data directory exists and the database file is in WAL mode.
/// Returns the database path.
pub fn init(app_data_dir: &str) -> Result<String> {
    init_with_file_name(app_data_dir, DEFAULT_DATABASE_FILE_NAME)
}

pub fn init_with_file_name(app_data_dir: &str, file_name: &str) -> Result<String> {
    std::fs::create_dir_all(app_data_dir).map_err(|e| {
        Error::Database(DatabaseError::ConnectionFailed(format!(
            "Failed to create data directory {}: {}",
            app_data_dir, e
        )))
    })?;

    let db_path = Path::new(app_data_dir)
        .join(file_name)
        .to_string_lossy()
        .to_string();

    let mut conn = SqliteConnection::establish(&db_path).map_err(StorageError::from)?;
    conn.batch_execute("PRAGMA journal_mode = WAL;")
        .map_err(StorageError::from)?;

    info!("[OfflineSync] Database at {}", db_path);
    Ok(db_path)
}

pub fn create_pool(db_path: &str) -> Result<Arc<DbPool>> {
    let manager = ConnectionManager::<SqliteConnection>::new(db_path);
    let pool = Pool::builder()
        .max_size(POOL_MAX_SIZE)
        .connection_customizer(Box::new(ConnectionOptions {
            busy_timeout: Duration::from_millis(BUSY_TIMEOUT_MS),
        }))
        .build(manager)
        .map_err(|e| Error::Database(DatabaseError::PoolCreationFailed(e.to_string())))?;
    Ok(Arc::new(pool))
}

pub fn get_connection(pool: &Arc<DbPool>) -> Result<DbConnection> {
    pool.get()
        .map_err(|e| Error::Database(DatabaseError::ConnectionFailed(e.to_string())))
}

/// Bring the schema at `db_path` up to [`SCHEMA_VERSION`]. Callers treat a
/// failure as fatal.
pub fn run_migrations(db_path: &str, mode: TransactionMode) -> Result<i32> {
    let mut conn = SqliteConnection::establish(db_path).map_err(StorageError::from)?;
    conn.batch_execute(&format!("PRAGMA busy_timeout = {};", BUSY_TIMEOUT_MS))
        .map_err(StorageError::from)?;
    Migrator::new(MIGRATIONS, SCHEMA_VERSION).run(&mut conn, mode)
}

use fieldsafe_core::errors::{DatabaseError, Error};
use thiserror::Error;

/// Failures raised by the SQLite layer before they are folded into
/// [`fieldsafe_core::Error`].
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Query failed: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("Connection failed: {0}")]
    Connection(#[from] diesel::ConnectionError),

    #[error("Connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("Migration failed: {0}")]
    Migration(String),

    /// A domain error raised inside a writer job, carried through the
    /// transaction so it rolls back and surfaces unchanged.
    #[error(transparent)]
    Domain(Box<Error>),
}

impl From<Error> for StorageError {
    fn from(err: Error) -> Self {
        StorageError::Domain(Box::new(err))
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Query(err) => Error::Database(DatabaseError::QueryFailed(err.to_string())),
            StorageError::Connection(err) => {
                Error::Database(DatabaseError::ConnectionFailed(err.to_string()))
            }
            StorageError::Pool(err) => {
                Error::Database(DatabaseError::PoolCreationFailed(err.to_string()))
            }
            StorageError::Migration(message) => {
                Error::Database(DatabaseError::MigrationFailed(message))
            }
            StorageError::Domain(err) => *err,
        }
    }
}

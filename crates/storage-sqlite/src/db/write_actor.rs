//! Single-writer actor.
//!
//! SQLite allows one writer at a time. All mutations are sent to one thread
//! that owns a dedicated connection and runs each job inside an IMMEDIATE
//! transaction, so a job either commits every row it touched or none.

use diesel::sqlite::SqliteConnection;
use log::{debug, error};
use tokio::sync::{mpsc, oneshot};

use fieldsafe_core::errors::{DatabaseError, Error, Result};

use super::DbPool;
use crate::errors::StorageError;

type Job = Box<dyn FnOnce(&mut SqliteConnection) + Send + 'static>;

#[derive(Clone)]
pub struct WriteHandle {
    sender: mpsc::UnboundedSender<Job>,
}

impl WriteHandle {
    /// Run `job` on the writer connection inside one transaction. An `Err`
    /// returned by the job rolls the transaction back.
    pub async fn exec<T, F>(&self, job: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel::<Result<T>>();
        let wrapped: Job = Box::new(move |conn: &mut SqliteConnection| {
            let result = conn
                .immediate_transaction::<T, StorageError, _>(|tx| job(tx).map_err(StorageError::from))
                .map_err(Error::from);
            let _ = reply_tx.send(result);
        });

        self.sender
            .send(wrapped)
            .map_err(|_| writer_gone("Writer actor is not running"))?;
        reply_rx
            .await
            .map_err(|_| writer_gone("Writer actor dropped the job"))?
    }
}

fn writer_gone(message: &str) -> Error {
    Error::Database(DatabaseError::Internal(message.to_string()))
}

/// Start the writer thread. It holds one pooled connection for its whole
/// lifetime and stops when every [`WriteHandle`] is dropped.
pub fn spawn_writer(pool: DbPool) -> WriteHandle {
    let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();

    let spawned = std::thread::Builder::new()
        .name("fieldsafe-db-writer".to_string())
        .spawn(move || {
            let mut conn = match pool.get() {
                Ok(conn) => conn,
                Err(err) => {
                    error!("[OfflineSync] Writer could not acquire a connection: {}", err);
                    return;
                }
            };
            while let Some(job) = receiver.blocking_recv() {
                job(&mut *conn);
            }
            debug!("[OfflineSync] Writer actor stopped");
        });

    if let Err(err) = spawned {
        error!("[OfflineSync] Failed to spawn writer thread: {}", err);
    }

    WriteHandle { sender }
}

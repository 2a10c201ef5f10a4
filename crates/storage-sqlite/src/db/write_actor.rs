//! Single-writer actor serializing all database mutations.
//!
//! SQLite permits one writer at a time. Funneling mutations through one
//! dedicated thread avoids SQLITE_BUSY churn under concurrent callers and
//! gives every repository job an `immediate_transaction` boundary: either
//! the whole job commits or none of it does.

use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sqlite::SqliteConnection;
use diesel::Connection;
use log::error;
use tokio::sync::{mpsc, oneshot};

use chapterflow_core::errors::{DatabaseError, Error, Result};

use crate::errors::StorageError;

type WriteJob = Box<dyn FnOnce(&mut SqliteConnection) + Send + 'static>;

/// Transaction-level failure: either the job's own error or a diesel
/// commit/rollback error raised by the transaction machinery itself.
enum TxFailure {
    App(Error),
    Db(diesel::result::Error),
}

impl From<diesel::result::Error> for TxFailure {
    fn from(err: diesel::result::Error) -> Self {
        TxFailure::Db(err)
    }
}

impl TxFailure {
    fn into_error(self) -> Error {
        match self {
            TxFailure::App(err) => err,
            TxFailure::Db(err) => StorageError::from(err).into(),
        }
    }
}

#[derive(Clone)]
pub struct WriteHandle {
    tx: mpsc::UnboundedSender<WriteJob>,
}

impl WriteHandle {
    /// Runs `job` on the writer thread inside an immediate transaction and
    /// awaits its result.
    pub async fn exec<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let wrapped: WriteJob = Box::new(move |conn| {
            let result = conn
                .immediate_transaction::<T, TxFailure, _>(|tx| job(tx).map_err(TxFailure::App))
                .map_err(TxFailure::into_error);
            // Receiver gone means the caller stopped waiting; nothing to do.
            let _ = reply_tx.send(result);
        });

        self.tx.send(wrapped).map_err(|_| {
            Error::Database(DatabaseError::Internal(
                "Database writer is no longer running".to_string(),
            ))
        })?;

        reply_rx.await.map_err(|_| {
            Error::Database(DatabaseError::Internal(
                "Write job was dropped before completion".to_string(),
            ))
        })?
    }
}

/// Spawns the writer thread. The handle is cheap to clone; dropping every
/// clone shuts the thread down.
pub fn spawn_writer(pool: Pool<ConnectionManager<SqliteConnection>>) -> WriteHandle {
    let (tx, mut rx) = mpsc::unbounded_channel::<WriteJob>();

    std::thread::spawn(move || {
        while let Some(job) = rx.blocking_recv() {
            match pool.get() {
                Ok(mut conn) => job(&mut conn),
                // Dropping the job closes its reply channel; the caller sees
                // a dropped-job error rather than a hang.
                Err(e) => error!("Writer could not obtain a connection: {}", e),
            }
        }
    });

    WriteHandle { tx }
}

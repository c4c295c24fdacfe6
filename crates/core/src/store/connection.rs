//! Database connection management and the unit of work.
//!
//! This module opens the SQLite database, applies the pragmas the store
//! relies on (WAL mode, foreign keys for cascading server deletes), runs
//! migrations, and hands out transaction-scoped [`Queries`] handles.

use super::{Deadline, Queries, migrations};
use crate::Error;
use std::path::Path;
use tokio_rusqlite::Connection;
use tokio_rusqlite::rusqlite::TransactionBehavior;

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA temp_store=MEMORY;
     PRAGMA foreign_keys=ON;";

/// Persistent store handle.
///
/// Wraps a tokio-rusqlite Connection that runs database operations on a
/// background thread. Clones share the same connection.
#[derive(Clone, Debug)]
pub struct Db {
    pub(crate) conn: Connection,
}

impl Db {
    /// Open a database at the specified path.
    ///
    /// Creates the file if it doesn't exist, applies pragmas, and runs any
    /// pending migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let conn = Connection::open(path).await.map_err(|e| Error::QueryFailed(e.into()))?;
        Self::prepare(conn).await
    }

    /// Open an in-memory database for testing.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::QueryFailed(e.into()))?;
        Self::prepare(conn).await
    }

    async fn prepare(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| {
            conn.execute_batch(PRAGMAS)?;
            Ok(())
        })
        .await
        .map_err(Error::QueryFailed)?;

        migrations::run(&conn).await?;

        Ok(Self { conn })
    }

    /// Run `f` against a non-transactional query handle.
    ///
    /// Statements run in autocommit mode, so a write still executing when
    /// the deadline passes can commit after the caller has seen
    /// `DeadlineExceeded`. Use it for reads; writes go through
    /// [`Db::with_transaction`].
    pub async fn run<T, F>(&self, deadline: Deadline, f: F) -> Result<T, Error>
    where
        F: FnOnce(&Queries<'_>) -> Result<T, Error> + Send + 'static,
        T: Send + 'static,
    {
        deadline.check()?;
        let call = self.conn.call(move |conn| -> Result<T, Error> { f(&Queries::new(conn, deadline)) });

        tokio::time::timeout(deadline.remaining(), call)
            .await
            .map_err(|_| Error::DeadlineExceeded)?
            .map_err(Error::from)
    }

    /// Execute `f` inside one database transaction.
    ///
    /// Commits when `f` succeeds. When `f` fails (or the deadline passes
    /// before commit) the transaction is rolled back and the original error
    /// is returned; a failed rollback is logged and never replaces it.
    pub async fn with_transaction<T, F>(&self, deadline: Deadline, f: F) -> Result<T, Error>
    where
        F: FnOnce(&Queries<'_>) -> Result<T, Error> + Send + 'static,
        T: Send + 'static,
    {
        deadline.check()?;
        let call = self.conn.call(move |conn| -> Result<T, Error> {
            deadline.check()?;
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let outcome = f(&Queries::new(&tx, deadline)).and_then(|value| deadline.check().map(|()| value));

            match outcome {
                Ok(value) => {
                    tx.commit()?;
                    Ok(value)
                }
                Err(err) => {
                    if let Err(rollback_err) = tx.rollback() {
                        tracing::error!(error = %err, rollback_error = %rollback_err, "transaction rollback failed");
                    } else {
                        tracing::debug!(error = %err, "transaction rolled back");
                    }
                    Err(err)
                }
            }
        });

        tokio::time::timeout(deadline.remaining(), call)
            .await
            .map_err(|_| Error::DeadlineExceeded)?
            .map_err(Error::from)
    }
}

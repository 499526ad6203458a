//! # Unit of Work
//!
//! One connection held for a multi-statement write, either inside a real
//! transaction or in autocommit mode.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UnitOfWork::Transaction        UnitOfWork::Direct                      │
//! │  ───────────────────────        ──────────────────                      │
//! │  BEGIN                          (autocommit)                            │
//! │  write, write, write            write, write, write                     │
//! │  COMMIT / ROLLBACK              on failure: caller runs                 │
//! │                                 compensating writes                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both variants deref to the same `SqliteConnection`, so repository code
//! is written once against [`UnitOfWork::conn`].

use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tracing::warn;

use crate::error::{DbError, DbResult};

#[derive(Debug)]
pub enum UnitOfWork {
    Transaction(Transaction<'static, Sqlite>),
    Direct(PoolConnection<Sqlite>),
}

impl UnitOfWork {
    /// Acquires a connection and, when `transactional`, opens a transaction.
    pub async fn begin(pool: &SqlitePool, transactional: bool) -> DbResult<Self> {
        if transactional {
            let tx = pool
                .begin()
                .await
                .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
            Ok(UnitOfWork::Transaction(tx))
        } else {
            Ok(UnitOfWork::Direct(pool.acquire().await?))
        }
    }

    pub fn is_transactional(&self) -> bool {
        matches!(self, UnitOfWork::Transaction(_))
    }

    /// The connection every statement of the unit runs on.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        match self {
            UnitOfWork::Transaction(tx) => &mut **tx,
            UnitOfWork::Direct(conn) => &mut **conn,
        }
    }

    /// Commits a transaction. A direct unit has nothing left to do.
    pub async fn commit(self) -> DbResult<()> {
        match self {
            UnitOfWork::Transaction(tx) => tx
                .commit()
                .await
                .map_err(|e| DbError::TransactionFailed(e.to_string())),
            UnitOfWork::Direct(_) => Ok(()),
        }
    }

    /// Rolls back a transaction. Direct units are returned as-is so the
    /// caller can compensate on the same connection.
    pub async fn rollback(self) -> Option<PoolConnection<Sqlite>> {
        match self {
            UnitOfWork::Transaction(tx) => {
                if let Err(e) = tx.rollback().await {
                    warn!(error = %e, "Rollback failed");
                }
                None
            }
            UnitOfWork::Direct(conn) => Some(conn),
        }
    }
}

pub mod db_stats_driven_ports;
pub mod db_task_driven_ports;
pub mod db_todo_driven_ports;
pub mod db_user_driven_ports;

use crate::external_connections;
use crate::external_connections::ConnectionHandle;
use anyhow::Context;
use sqlx::pool::PoolConnection;
use sqlx::{Acquire, FromRow, PgConnection, PgPool, Postgres, Transaction};

/// Owns the database pool driven adapters run their queries against.
/// Allows business logic to be agnostic of where its data lives
/// so driven adapters can easily be swapped out for other implementations
#[derive(Clone)]
pub struct ExternalConnectivity {
    db: PgPool,
}

impl ExternalConnectivity {
    pub fn new(db: PgPool) -> Self {
        ExternalConnectivity { db }
    }
}

/// A handle from ExternalConnectivity which can connect to a database
pub struct PoolConnectionHandle {
    active_connection: PoolConnection<Postgres>,
}

impl ConnectionHandle for PoolConnectionHandle {
    fn borrow_connection(&mut self) -> &mut PgConnection {
        &mut self.active_connection
    }
}

impl external_connections::ExternalConnectivity for ExternalConnectivity {
    type DbHandle<'cxn_borrow> = PoolConnectionHandle;

    async fn database_cxn(&mut self) -> Result<Self::DbHandle<'_>, anyhow::Error> {
        let handle = PoolConnectionHandle {
            active_connection: self
                .db
                .acquire()
                .await
                .context("acquiring connection from db pool")?,
        };

        Ok(handle)
    }
}

impl external_connections::Transactable for ExternalConnectivity {
    type Handle = ExternalConnectionsInTransaction;

    async fn start_transaction(&self) -> Result<Self::Handle, anyhow::Error> {
        let transaction = self
            .db
            .begin()
            .await
            .context("Starting transaction from db pool")?;

        Ok(ExternalConnectionsInTransaction { txn: transaction })
    }
}

/// A variant of ExternalConnectivity where the database client has an active database transaction
/// which can later be committed. Dropping it without committing rolls the transaction back.
pub struct ExternalConnectionsInTransaction {
    txn: Transaction<'static, Postgres>,
}

/// A handle from ExternalConnectionsInTransaction which can connect to a database
pub struct TransactionHandle<'tx> {
    active_transaction: &'tx mut PgConnection,
}

impl external_connections::ExternalConnectivity for ExternalConnectionsInTransaction {
    type DbHandle<'tx_borrow>
        = TransactionHandle<'tx_borrow>
    where
        Self: 'tx_borrow;

    async fn database_cxn(&mut self) -> Result<TransactionHandle<'_>, anyhow::Error> {
        let handle = self
            .txn
            .acquire()
            .await
            .context("acquiring connection from database transaction")?;

        Ok(TransactionHandle {
            active_transaction: handle,
        })
    }
}

impl ConnectionHandle for TransactionHandle<'_> {
    fn borrow_connection(&mut self) -> &mut PgConnection {
        &mut *self.active_transaction
    }
}

impl external_connections::TransactionHandle for ExternalConnectionsInTransaction {
    async fn commit(self) -> Result<(), anyhow::Error> {
        self.txn
            .commit()
            .await
            .context("Committing database transaction")?;

        Ok(())
    }
}

/// Utility DTO for consuming the output of the PostgreSQL `count()` function
#[derive(FromRow)]
struct Count {
    count: Option<i64>,
}

impl Count {
    /// Retrieve the count value, as it's typechecked to be optional but should always be present
    fn count(&self) -> i64 {
        self.count.unwrap_or_default()
    }
}

/// Utility DTO for retrieving the ID of a newly inserted record to PostgreSQL
#[derive(FromRow)]
struct NewId {
    id: i32,
}

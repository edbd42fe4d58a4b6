use sqlx::PgConnection;

/// A borrowed database connection, either pooled or part of an open transaction
pub trait ConnectionHandle {
    fn borrow_connection(&mut self) -> &mut PgConnection;
}

/// Provides access to the external systems driven adapters talk to, so business logic stays
/// agnostic of whether it runs inside a transaction or against the raw pool
pub trait ExternalConnectivity: Sync {
    type DbHandle<'cxn_borrow>: ConnectionHandle + Send
    where
        Self: 'cxn_borrow;

    async fn database_cxn(&mut self) -> Result<Self::DbHandle<'_>, anyhow::Error>;
}

/// Something that can open a transaction which groups several port calls into one atomic unit
pub trait Transactable {
    type Handle: ExternalConnectivity + TransactionHandle + Send;

    async fn start_transaction(&self) -> Result<Self::Handle, anyhow::Error>;
}

/// An open transaction which must be committed for its writes to persist
pub trait TransactionHandle {
    async fn commit(self) -> Result<(), anyhow::Error>;
}

/// Connectivity that can be used directly or used to start a transaction
pub trait TransactableExternalConnectivity: ExternalConnectivity + Transactable {}

impl<T> TransactableExternalConnectivity for T where T: ExternalConnectivity + Transactable {}

#[cfg(test)]
pub mod test_util {
    use super::*;
    use anyhow::anyhow;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Stand-in for external connectivity in unit tests. Driven port fakes never touch the
    /// database, so asking for a connection is an error.
    #[derive(Clone)]
    pub struct FakeExternalConnectivity {
        commits: Arc<AtomicU32>,
    }

    impl FakeExternalConnectivity {
        pub fn new() -> Self {
            FakeExternalConnectivity {
                commits: Arc::new(AtomicU32::new(0)),
            }
        }

        /// Number of transactions started from this connectivity (or its clones) that were committed
        pub fn commit_count(&self) -> u32 {
            self.commits.load(Ordering::SeqCst)
        }
    }

    pub struct FakeConnectionHandle;

    impl ConnectionHandle for FakeConnectionHandle {
        fn borrow_connection(&mut self) -> &mut PgConnection {
            unreachable!("fake connectivity never hands out database connections")
        }
    }

    impl ExternalConnectivity for FakeExternalConnectivity {
        type DbHandle<'cxn_borrow> = FakeConnectionHandle;

        async fn database_cxn(&mut self) -> Result<Self::DbHandle<'_>, anyhow::Error> {
            Err(anyhow!("no database is available in unit tests"))
        }
    }

    impl Transactable for FakeExternalConnectivity {
        type Handle = FakeExternalConnectivity;

        async fn start_transaction(&self) -> Result<Self::Handle, anyhow::Error> {
            Ok(self.clone())
        }
    }

    impl TransactionHandle for FakeExternalConnectivity {
        async fn commit(self) -> Result<(), anyhow::Error> {
            self.commits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}

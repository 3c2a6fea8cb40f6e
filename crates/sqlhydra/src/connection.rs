//! Named connections and the transaction coordinator.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::FutureExt;

use crate::config::ConnectionConfig;
use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::handle::{DatabaseHandle, TransactionHandle};
use crate::monitor::SqlLogger;
use crate::query_builder::QueryBuilder;
use crate::resolver;

enum TxSlot {
    Idle,
    /// `begin` is waiting on the handle; a second `begin` must still fail.
    Beginning,
    Active(Arc<dyn TransactionHandle>),
}

/// A live handle bound to one dialect, with at most one active transaction.
///
/// While a transaction is active, [`Connection::query_builder`] returns builders bound to it, so
/// every statement issued through this connection joins the transaction.
pub struct Connection {
    name: String,
    dialect: Dialect,
    handle: Arc<dyn DatabaseHandle>,
    tx: Mutex<TxSlot>,
    logger: Arc<SqlLogger>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("name", &self.name)
            .field("dialect", &self.dialect)
            .field("in_transaction", &self.in_transaction())
            .finish()
    }
}

impl Connection {
    /// Validate `config`, resolve its connector and connect.
    pub async fn open(config: &ConnectionConfig) -> OrmResult<Self> {
        let (dialect, connector) = resolver::resolve(config)?;
        let handle = connector.connect(config).await?;
        tracing::info!(
            target: "sqlhydra.registry",
            name = %config.name,
            dialect = %dialect,
            "connection opened"
        );
        Ok(Self::from_handle(&config.name, dialect, handle))
    }

    /// Wrap an existing handle.
    pub fn from_handle(name: &str, dialect: Dialect, handle: Arc<dyn DatabaseHandle>) -> Self {
        Self {
            name: name.to_string(),
            dialect,
            handle,
            tx: Mutex::new(TxSlot::Idle),
            logger: Arc::new(SqlLogger::default()),
        }
    }

    /// Replace the SQL logger used by builders from this connection.
    pub fn with_logger(mut self, logger: SqlLogger) -> Self {
        self.logger = Arc::new(logger);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn slot(&self) -> MutexGuard<'_, TxSlot> {
        self.tx.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn take_active(&self) -> OrmResult<Arc<dyn TransactionHandle>> {
        let mut slot = self.slot();
        match std::mem::replace(&mut *slot, TxSlot::Idle) {
            TxSlot::Active(tx) => Ok(tx),
            other => {
                *slot = other;
                Err(OrmError::NotInTransaction)
            }
        }
    }

    /// A builder bound to the active transaction, or to the plain handle.
    pub fn query_builder(&self) -> QueryBuilder {
        match &*self.slot() {
            TxSlot::Active(tx) => {
                QueryBuilder::for_transaction(self.dialect, Arc::clone(tx), Arc::clone(&self.logger))
            }
            _ => QueryBuilder::new(self.dialect, Arc::clone(&self.handle))
                .with_logger(Arc::clone(&self.logger)),
        }
    }

    /// Whether a transaction is active (or being opened).
    pub fn in_transaction(&self) -> bool {
        !matches!(&*self.slot(), TxSlot::Idle)
    }

    /// Start a transaction and return a builder bound to it.
    pub async fn begin(&self) -> OrmResult<QueryBuilder> {
        let tx = self.start_transaction().await?;
        Ok(QueryBuilder::for_transaction(
            self.dialect,
            tx,
            Arc::clone(&self.logger),
        ))
    }

    async fn start_transaction(&self) -> OrmResult<Arc<dyn TransactionHandle>> {
        {
            let mut slot = self.slot();
            if !matches!(&*slot, TxSlot::Idle) {
                return Err(OrmError::AlreadyInTransaction);
            }
            *slot = TxSlot::Beginning;
        }

        // Resets `Beginning` if the handle fails or this future is dropped.
        let guard = SlotGuard::new(self, None);
        let tx = self.handle.begin().await?;
        guard.disarm();

        *self.slot() = TxSlot::Active(Arc::clone(&tx));
        tracing::debug!(target: "sqlhydra.tx", connection = %self.name, "begin");
        Ok(tx)
    }

    /// Commit the active transaction. The transaction state is cleared even when commit fails.
    pub async fn commit(&self) -> OrmResult<()> {
        let tx = self.take_active()?;
        let result = tx.commit().await;
        tracing::debug!(
            target: "sqlhydra.tx",
            connection = %self.name,
            ok = result.is_ok(),
            "commit"
        );
        result
    }

    /// Roll back the active transaction. The transaction state is cleared even when rollback fails.
    pub async fn rollback(&self) -> OrmResult<()> {
        let tx = self.take_active()?;
        let result = tx.rollback().await;
        tracing::debug!(
            target: "sqlhydra.tx",
            connection = %self.name,
            ok = result.is_ok(),
            "rollback"
        );
        result
    }

    /// Run `f` inside a transaction.
    ///
    /// Commits when `f` returns `Ok`. Rolls back when it returns `Err` (a failed rollback is
    /// attached to the original error) or panics (the panic is resumed after the rollback).
    /// If the returned future is dropped before the body finishes, the transaction is abandoned:
    /// the slot is cleared and the backend rolls back.
    ///
    /// ```ignore
    /// let id = conn
    ///     .transaction(|qb| async move {
    ///         qb.execute(qb.insert("users").set("name", "alice")).await?;
    ///         qb.fetch_scalar::<i64>(qb.select("users").select("MAX(id)")).await
    ///     })
    ///     .await?;
    /// ```
    pub async fn transaction<T, F, Fut>(&self, f: F) -> OrmResult<T>
    where
        F: FnOnce(QueryBuilder) -> Fut,
        Fut: Future<Output = OrmResult<T>>,
    {
        let tx = self.start_transaction().await?;
        let qb = QueryBuilder::for_transaction(self.dialect, Arc::clone(&tx), Arc::clone(&self.logger));
        let guard = SlotGuard::new(self, Some(tx));
        // `f` itself runs inside the unwind boundary: it may panic before returning a future.
        let outcome = AssertUnwindSafe(async move { f(qb).await })
            .catch_unwind()
            .await;
        guard.disarm();

        match outcome {
            Ok(Ok(value)) => {
                self.commit().await?;
                Ok(value)
            }
            Ok(Err(e)) => {
                tracing::debug!(
                    target: "sqlhydra.tx",
                    connection = %self.name,
                    error = %e,
                    "transaction body failed"
                );
                match self.rollback().await {
                    Ok(()) => Err(e),
                    Err(rollback) => Err(e.with_rollback_failure(rollback)),
                }
            }
            Err(panic) => {
                tracing::warn!(
                    target: "sqlhydra.tx",
                    connection = %self.name,
                    "transaction body panicked, rolling back"
                );
                if let Err(rollback) = self.rollback().await {
                    tracing::error!(
                        target: "sqlhydra.tx",
                        connection = %self.name,
                        error = %rollback,
                        "rollback after panic failed"
                    );
                }
                std::panic::resume_unwind(panic)
            }
        }
    }

    /// Release the handle. An active transaction is dropped without commit.
    pub fn close(&self) -> OrmResult<()> {
        *self.slot() = TxSlot::Idle;
        self.handle.close()
    }
}

/// Clears the transaction slot when the future that owns it is dropped early.
///
/// With `tx` unset it guards the `Beginning` state; otherwise it guards `Active(tx)` and closes
/// the handle, which rolls the transaction back.
struct SlotGuard<'a> {
    conn: Option<&'a Connection>,
    tx: Option<Arc<dyn TransactionHandle>>,
}

impl<'a> SlotGuard<'a> {
    fn new(conn: &'a Connection, tx: Option<Arc<dyn TransactionHandle>>) -> Self {
        Self {
            conn: Some(conn),
            tx,
        }
    }

    fn disarm(mut self) {
        self.conn = None;
    }
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        let Some(conn) = self.conn else {
            return;
        };
        let ours = {
            let mut slot = conn.slot();
            let ours = match (&*slot, &self.tx) {
                (TxSlot::Beginning, None) => true,
                (TxSlot::Active(active), Some(tx)) => Arc::ptr_eq(active, tx),
                _ => false,
            };
            if ours {
                *slot = TxSlot::Idle;
            }
            ours
        };
        if let (true, Some(tx)) = (ours, self.tx.take()) {
            tracing::warn!(
                target: "sqlhydra.tx",
                connection = %conn.name,
                "transaction abandoned, rolling back"
            );
            if let Err(e) = tx.close() {
                tracing::warn!(
                    target: "sqlhydra.tx",
                    connection = %conn.name,
                    error = %e,
                    "abandoned transaction did not close cleanly"
                );
            }
        }
    }
}

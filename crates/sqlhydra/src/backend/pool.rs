//! Pooled PostgreSQL backend on `deadpool-postgres`.
//!
//! Plain statements check out a client per call. A transaction pins one client for its whole
//! lifetime, so it is isolated from statements issued through the pool.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod};
use futures_util::future::BoxFuture;
use tokio_postgres::NoTls;

use super::postgres::{execute_rows, pg_config, query_rows};
use crate::config::ConnectionConfig;
use crate::error::{OrmError, OrmResult};
use crate::handle::{DatabaseHandle, ExecResult, TransactionHandle};
use crate::record::Record;
use crate::resolver::Connector;
use crate::value::Value;

const DEFAULT_POOL_SIZE: usize = 16;

fn default_manager_config() -> ManagerConfig {
    ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    }
}

/// Build a pool from connection settings. `pool_size` sets the maximum number of clients.
pub fn create_pool(config: &ConnectionConfig) -> OrmResult<Pool> {
    let max_size = match config.param("pool_size") {
        Some(n) => n
            .parse()
            .map_err(|_| OrmError::Config(format!("invalid pool_size: {n}")))?,
        None => DEFAULT_POOL_SIZE,
    };
    let manager = Manager::from_config(pg_config(config)?, NoTls, default_manager_config());
    Pool::builder(manager)
        .max_size(max_size)
        .build()
        .map_err(|e| OrmError::Pool(e.to_string()))
}

/// A handle over a client pool.
pub struct PoolHandle {
    pool: Pool,
}

impl PoolHandle {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

impl DatabaseHandle for PoolHandle {
    fn query<'a>(&'a self, sql: &'a str, params: &'a [Value]) -> BoxFuture<'a, OrmResult<Vec<Record>>> {
        Box::pin(async move {
            let client = self.pool.get().await?;
            query_rows(&client, sql, params).await
        })
    }

    fn execute<'a>(&'a self, sql: &'a str, params: &'a [Value]) -> BoxFuture<'a, OrmResult<ExecResult>> {
        Box::pin(async move {
            let client = self.pool.get().await?;
            execute_rows(&client, sql, params).await
        })
    }

    fn begin(&self) -> BoxFuture<'_, OrmResult<Arc<dyn TransactionHandle>>> {
        Box::pin(async move {
            let pinned = Pinned(Some(self.pool.get().await?));
            pinned.client()?.batch_execute("BEGIN").await?;
            let tx: Arc<dyn TransactionHandle> = Arc::new(PoolTransaction {
                client: Mutex::new(pinned.release()),
                done: AtomicBool::new(false),
            });
            Ok(tx)
        })
    }

    fn close(&self) -> OrmResult<()> {
        self.pool.close();
        Ok(())
    }
}

/// A transaction pinned to one pooled client.
pub struct PoolTransaction {
    client: Mutex<Option<Object>>,
    done: AtomicBool,
}

/// A client checked out of a transaction for one call.
///
/// Dropped without [`Pinned::release`] (a failed or cancelled call), the client is detached
/// from the pool so a session that may still be inside `BEGIN` is never recycled.
struct Pinned(Option<Object>);

impl Pinned {
    fn client(&self) -> OrmResult<&Object> {
        self.0
            .as_ref()
            .ok_or_else(|| OrmError::execution("transaction client is gone"))
    }

    fn release(mut self) -> Option<Object> {
        self.0.take()
    }
}

impl Drop for Pinned {
    fn drop(&mut self) {
        if let Some(client) = self.0.take() {
            drop(Object::take(client));
        }
    }
}

impl PoolTransaction {
    fn checkout(&self) -> OrmResult<Pinned> {
        if self.done.load(Ordering::SeqCst) {
            return Err(OrmError::NotInTransaction);
        }
        self.client
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .map(|client| Pinned(Some(client)))
            .ok_or_else(|| OrmError::execution("transaction client is busy"))
    }

    fn checkin(&self, pinned: Pinned) {
        *self.client.lock().unwrap_or_else(|e| e.into_inner()) = pinned.release();
    }

    async fn finish(&self, sql: &str) -> OrmResult<()> {
        let pinned = self.checkout()?;
        self.done.store(true, Ordering::SeqCst);
        pinned.client()?.batch_execute(sql).await?;
        // Back to the pool outside of any transaction.
        drop(pinned.release());
        Ok(())
    }
}

impl DatabaseHandle for PoolTransaction {
    fn query<'a>(&'a self, sql: &'a str, params: &'a [Value]) -> BoxFuture<'a, OrmResult<Vec<Record>>> {
        Box::pin(async move {
            let pinned = self.checkout()?;
            let result = query_rows(pinned.client()?, sql, params).await;
            self.checkin(pinned);
            result
        })
    }

    fn execute<'a>(&'a self, sql: &'a str, params: &'a [Value]) -> BoxFuture<'a, OrmResult<ExecResult>> {
        Box::pin(async move {
            let pinned = self.checkout()?;
            let result = execute_rows(pinned.client()?, sql, params).await;
            self.checkin(pinned);
            result
        })
    }

    fn begin(&self) -> BoxFuture<'_, OrmResult<Arc<dyn TransactionHandle>>> {
        Box::pin(async { Err(OrmError::AlreadyInTransaction) })
    }

    fn close(&self) -> OrmResult<()> {
        self.done.store(true, Ordering::SeqCst);
        if let Some(client) = self.client.lock().unwrap_or_else(|e| e.into_inner()).take() {
            // Detach instead of recycling a client with an open transaction.
            drop(Object::take(client));
        }
        Ok(())
    }
}

impl TransactionHandle for PoolTransaction {
    fn commit(&self) -> BoxFuture<'_, OrmResult<()>> {
        Box::pin(self.finish("COMMIT"))
    }

    fn rollback(&self) -> BoxFuture<'_, OrmResult<()>> {
        Box::pin(self.finish("ROLLBACK"))
    }
}

impl Drop for PoolTransaction {
    fn drop(&mut self) {
        if !self.done.load(Ordering::SeqCst) {
            let _ = DatabaseHandle::close(self);
        }
    }
}

/// Opens [`PoolHandle`]s. Selected with the `pool=true` connection param.
pub struct PoolConnector;

impl Connector for PoolConnector {
    fn connect<'a>(
        &'a self,
        config: &'a ConnectionConfig,
    ) -> BoxFuture<'a, OrmResult<Arc<dyn DatabaseHandle>>> {
        Box::pin(async move {
            let pool = create_pool(config)?;
            // Fail fast on bad credentials instead of on the first statement.
            drop(pool.get().await?);
            let handle: Arc<dyn DatabaseHandle> = Arc::new(PoolHandle::new(pool));
            Ok(handle)
        })
    }
}

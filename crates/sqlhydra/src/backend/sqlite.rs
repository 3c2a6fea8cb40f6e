//! Embedded SQLite backend on [`rusqlite`].
//!
//! The driver is synchronous; statements run inline on the calling task while holding the
//! connection lock. A transaction shares the connection with its handle, so at most one
//! transaction can be open per handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::future::BoxFuture;
use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, params_from_iter};

use crate::config::ConnectionConfig;
use crate::error::{OrmError, OrmResult};
use crate::handle::{DatabaseHandle, ExecResult, TransactionHandle};
use crate::record::Record;
use crate::resolver::Connector;
use crate::value::Value;

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(rusqlite::types::Value::Null),
            Value::Bool(b) => ToSqlOutput::from(*b),
            Value::Int(i) => ToSqlOutput::from(*i),
            Value::Float(f) => ToSqlOutput::from(*f),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Bytes(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
            Value::Timestamp(t) => ToSqlOutput::from(t.to_rfc3339()),
            Value::Json(j) => ToSqlOutput::from(j.to_string()),
        })
    }
}

fn decode(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
    }
}

struct Shared {
    conn: Mutex<Option<Connection>>,
    in_tx: AtomicBool,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Option<Connection>> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> OrmResult<T> {
        let guard = self.lock();
        let conn = guard
            .as_ref()
            .ok_or_else(|| OrmError::execution("sqlite connection is closed"))?;
        Ok(f(conn)?)
    }

    fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Record>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
            let mut rows = stmt.query(params_from_iter(params.iter()))?;
            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                let mut record = Record::new();
                for (idx, name) in names.iter().enumerate() {
                    record.set(name.as_str(), decode(row.get_ref(idx)?));
                }
                out.push(record);
            }
            Ok(out)
        })
    }

    fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<ExecResult> {
        self.with_conn(|conn| {
            let affected = conn.execute(sql, params_from_iter(params.iter()))?;
            Ok(ExecResult::new(affected as u64).with_last_insert_id(conn.last_insert_rowid()))
        })
    }
}

/// A single SQLite connection.
pub struct SqliteHandle {
    shared: Arc<Shared>,
}

impl SqliteHandle {
    /// Wrap an open rusqlite connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            shared: Arc::new(Shared {
                conn: Mutex::new(Some(conn)),
                in_tx: AtomicBool::new(false),
            }),
        }
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> OrmResult<Self> {
        Ok(Self::new(Connection::open_in_memory()?))
    }
}

impl DatabaseHandle for SqliteHandle {
    fn query<'a>(&'a self, sql: &'a str, params: &'a [Value]) -> BoxFuture<'a, OrmResult<Vec<Record>>> {
        Box::pin(async move { self.shared.query(sql, params) })
    }

    fn execute<'a>(&'a self, sql: &'a str, params: &'a [Value]) -> BoxFuture<'a, OrmResult<ExecResult>> {
        Box::pin(async move { self.shared.execute(sql, params) })
    }

    fn begin(&self) -> BoxFuture<'_, OrmResult<Arc<dyn TransactionHandle>>> {
        Box::pin(async move {
            if self.shared.in_tx.swap(true, Ordering::SeqCst) {
                return Err(OrmError::AlreadyInTransaction);
            }
            if let Err(e) = self.shared.with_conn(|conn| conn.execute_batch("BEGIN")) {
                self.shared.in_tx.store(false, Ordering::SeqCst);
                return Err(e);
            }
            let tx: Arc<dyn TransactionHandle> = Arc::new(SqliteTransaction {
                shared: Arc::clone(&self.shared),
                done: AtomicBool::new(false),
            });
            Ok(tx)
        })
    }

    fn close(&self) -> OrmResult<()> {
        match self.shared.lock().take() {
            Some(conn) => conn.close().map_err(|(_, e)| OrmError::from(e)),
            None => Ok(()),
        }
    }
}

/// An open `BEGIN ... COMMIT` block on a [`SqliteHandle`].
pub struct SqliteTransaction {
    shared: Arc<Shared>,
    done: AtomicBool,
}

impl SqliteTransaction {
    fn finish(&self, sql: &'static str) -> OrmResult<()> {
        if self.done.swap(true, Ordering::SeqCst) {
            return Err(OrmError::NotInTransaction);
        }
        let result = self.shared.with_conn(|conn| conn.execute_batch(sql));
        self.shared.in_tx.store(false, Ordering::SeqCst);
        result
    }

    fn ensure_open(&self) -> OrmResult<()> {
        if self.done.load(Ordering::SeqCst) {
            return Err(OrmError::NotInTransaction);
        }
        Ok(())
    }
}

impl DatabaseHandle for SqliteTransaction {
    fn query<'a>(&'a self, sql: &'a str, params: &'a [Value]) -> BoxFuture<'a, OrmResult<Vec<Record>>> {
        Box::pin(async move {
            self.ensure_open()?;
            self.shared.query(sql, params)
        })
    }

    fn execute<'a>(&'a self, sql: &'a str, params: &'a [Value]) -> BoxFuture<'a, OrmResult<ExecResult>> {
        Box::pin(async move {
            self.ensure_open()?;
            self.shared.execute(sql, params)
        })
    }

    fn begin(&self) -> BoxFuture<'_, OrmResult<Arc<dyn TransactionHandle>>> {
        Box::pin(async { Err(OrmError::AlreadyInTransaction) })
    }

    fn close(&self) -> OrmResult<()> {
        self.finish("ROLLBACK")
    }
}

impl TransactionHandle for SqliteTransaction {
    fn commit(&self) -> BoxFuture<'_, OrmResult<()>> {
        Box::pin(async move { self.finish("COMMIT") })
    }

    fn rollback(&self) -> BoxFuture<'_, OrmResult<()>> {
        Box::pin(async move { self.finish("ROLLBACK") })
    }
}

impl Drop for SqliteTransaction {
    fn drop(&mut self) {
        if !self.done.load(Ordering::SeqCst) {
            let _ = self.finish("ROLLBACK");
        }
    }
}

/// Opens [`SqliteHandle`]s from `database` (a path or `:memory:`).
///
/// Supported params: `foreign_keys=on|off`, `busy_timeout=<ms>`.
pub struct SqliteConnector;

impl Connector for SqliteConnector {
    fn connect<'a>(
        &'a self,
        config: &'a ConnectionConfig,
    ) -> BoxFuture<'a, OrmResult<Arc<dyn DatabaseHandle>>> {
        Box::pin(async move {
            let conn = Connection::open(&config.database)?;
            if let Some(flag) = config.param("foreign_keys") {
                let on = matches!(flag, "on" | "true" | "1");
                conn.pragma_update(None, "foreign_keys", on)?;
            }
            if let Some(ms) = config.param("busy_timeout") {
                let ms: u64 = ms
                    .parse()
                    .map_err(|_| OrmError::Config(format!("invalid busy_timeout: {ms}")))?;
                conn.busy_timeout(std::time::Duration::from_millis(ms))?;
            }
            let handle: Arc<dyn DatabaseHandle> = Arc::new(SqliteHandle::new(conn));
            Ok(handle)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn handle() -> SqliteHandle {
        let handle = SqliteHandle::open_in_memory().unwrap();
        handle
            .execute("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT, score REAL)", &[])
            .await
            .unwrap();
        handle
    }

    #[tokio::test]
    async fn round_trips_values() {
        let handle = handle().await;
        let result = handle
            .execute(
                "INSERT INTO t (name, score) VALUES (?, ?)",
                &[Value::from("a"), Value::from(1.5)],
            )
            .await
            .unwrap();
        assert_eq!(result.rows_affected, 1);
        assert_eq!(result.last_insert_id, Some(1));

        let rows = handle
            .query("SELECT id, name, score FROM t WHERE id = ?", &[Value::Int(1)])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("name"), Some(&Value::from("a")));
        assert_eq!(rows[0].get("score"), Some(&Value::Float(1.5)));
    }

    #[tokio::test]
    async fn rollback_discards_writes() {
        let handle = handle().await;
        let tx = handle.begin().await.unwrap();
        tx.execute("INSERT INTO t (name) VALUES ('x')", &[]).await.unwrap();
        assert!(matches!(handle.begin().await, Err(OrmError::AlreadyInTransaction)));
        tx.rollback().await.unwrap();

        let rows = handle.query("SELECT COUNT(*) AS n FROM t", &[]).await.unwrap();
        assert_eq!(rows[0].get("n"), Some(&Value::Int(0)));
        assert!(matches!(tx.commit().await, Err(OrmError::NotInTransaction)));
        handle.begin().await.unwrap().commit().await.unwrap();
    }

    #[tokio::test]
    async fn closed_handle_fails() {
        let handle = handle().await;
        handle.close().unwrap();
        assert!(handle.query("SELECT 1", &[]).await.is_err());
    }
}

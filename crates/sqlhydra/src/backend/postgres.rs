//! PostgreSQL backend on `tokio-postgres`.
//!
//! [`PostgresHandle`] owns one client. Its transactions run `BEGIN`/`COMMIT` on that same
//! session, so statements issued through the plain handle while a transaction is open belong
//! to it as well. Use the pooled backend when independent sessions are needed.

use std::error::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use futures_util::future::BoxFuture;
use tokio_postgres::types::{IsNull, ToSql, Type};
use tokio_postgres::{Client, NoTls, Row};

use crate::config::ConnectionConfig;
use crate::error::{OrmError, OrmResult};
use crate::handle::{DatabaseHandle, ExecResult, TransactionHandle};
use crate::record::Record;
use crate::resolver::Connector;
use crate::value::Value;

type BoxError = Box<dyn Error + Sync + Send>;

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => b.to_sql(ty, out),
            Value::Int(i) => match *ty {
                Type::INT2 => i16::try_from(*i)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*i)?.to_sql(ty, out),
                Type::OID => u32::try_from(*i)?.to_sql(ty, out),
                Type::FLOAT4 => (*i as f32).to_sql(ty, out),
                Type::FLOAT8 => (*i as f64).to_sql(ty, out),
                Type::BOOL => (*i != 0).to_sql(ty, out),
                Type::TEXT | Type::VARCHAR | Type::BPCHAR => i.to_string().to_sql(ty, out),
                _ => i.to_sql(ty, out),
            },
            Value::Float(f) => match *ty {
                Type::FLOAT4 => (*f as f32).to_sql(ty, out),
                _ => f.to_sql(ty, out),
            },
            Value::Text(s) => match *ty {
                Type::UUID => uuid::Uuid::parse_str(s)?.to_sql(ty, out),
                Type::JSON | Type::JSONB => serde_json::from_str::<serde_json::Value>(s)?.to_sql(ty, out),
                _ => s.as_str().to_sql(ty, out),
            },
            Value::Bytes(b) => b.as_slice().to_sql(ty, out),
            Value::Timestamp(t) => match *ty {
                Type::TIMESTAMP => t.naive_utc().to_sql(ty, out),
                _ => t.to_sql(ty, out),
            },
            Value::Json(j) => j.to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    tokio_postgres::types::to_sql_checked!();
}

fn cell<'a, T>(row: &'a Row, idx: usize, wrap: impl FnOnce(T) -> Value) -> OrmResult<Value>
where
    T: tokio_postgres::types::FromSql<'a>,
{
    let value: Option<T> = row
        .try_get(idx)
        .map_err(|e| OrmError::decode(row.columns()[idx].name(), e.to_string()))?;
    Ok(value.map_or(Value::Null, wrap))
}

fn decode_cell(row: &Row, idx: usize) -> OrmResult<Value> {
    let ty = row.columns()[idx].type_().clone();
    match ty {
        Type::BOOL => cell(row, idx, Value::Bool),
        Type::INT2 => cell(row, idx, |v: i16| Value::Int(v.into())),
        Type::INT4 => cell(row, idx, |v: i32| Value::Int(v.into())),
        Type::INT8 => cell(row, idx, Value::Int),
        Type::OID => cell(row, idx, |v: u32| Value::Int(v.into())),
        Type::FLOAT4 => cell(row, idx, |v: f32| Value::Float(v.into())),
        Type::FLOAT8 => cell(row, idx, Value::Float),
        Type::BYTEA => cell(row, idx, Value::Bytes),
        Type::TIMESTAMPTZ => cell(row, idx, |v: DateTime<Utc>| Value::Timestamp(v)),
        Type::TIMESTAMP => cell(row, idx, |v: NaiveDateTime| Value::Timestamp(v.and_utc())),
        Type::DATE => cell(row, idx, |v: NaiveDate| Value::Text(v.to_string())),
        Type::JSON | Type::JSONB => cell(row, idx, Value::Json),
        Type::UUID => cell(row, idx, |v: uuid::Uuid| Value::Text(v.to_string())),
        _ => cell(row, idx, Value::Text),
    }
}

fn decode_row(row: &Row) -> OrmResult<Record> {
    let mut record = Record::new();
    for (idx, column) in row.columns().iter().enumerate() {
        record.set(column.name(), decode_cell(row, idx)?);
    }
    Ok(record)
}

fn bind(params: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

pub(crate) async fn query_rows(client: &Client, sql: &str, params: &[Value]) -> OrmResult<Vec<Record>> {
    let rows = client.query(sql, &bind(params)).await?;
    rows.iter().map(decode_row).collect()
}

pub(crate) async fn execute_rows(client: &Client, sql: &str, params: &[Value]) -> OrmResult<ExecResult> {
    let affected = client.execute(sql, &bind(params)).await?;
    Ok(ExecResult::new(affected))
}

/// Driver configuration from connection settings.
///
/// Supported params: `application_name`, `connect_timeout` (seconds) and
/// `sslmode=disable|prefer`. TLS is not bundled, so `sslmode=require` is rejected.
pub(crate) fn pg_config(config: &ConnectionConfig) -> OrmResult<tokio_postgres::Config> {
    let mut pg = tokio_postgres::Config::new();
    pg.host(&config.host)
        .user(&config.user)
        .dbname(&config.database);
    if let Some(port) = config.effective_port() {
        pg.port(port);
    }
    if !config.password.is_empty() {
        pg.password(&config.password);
    }
    for (key, value) in config.param_pairs() {
        match key {
            "application_name" => {
                pg.application_name(value);
            }
            "connect_timeout" => {
                let secs: u64 = value
                    .parse()
                    .map_err(|_| OrmError::Config(format!("invalid connect_timeout: {value}")))?;
                pg.connect_timeout(Duration::from_secs(secs));
            }
            "sslmode" => match value {
                "disable" | "prefer" | "" => {}
                other => {
                    return Err(OrmError::Config(format!(
                        "sslmode={other} requires TLS, which is not bundled"
                    )));
                }
            },
            _ => {}
        }
    }
    Ok(pg)
}

struct Session {
    client: Mutex<Option<Arc<Client>>>,
    in_tx: AtomicBool,
}

impl Session {
    fn client(&self) -> OrmResult<Arc<Client>> {
        self.client
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or_else(|| OrmError::execution("postgres connection is closed"))
    }
}

/// One PostgreSQL session.
pub struct PostgresHandle {
    session: Arc<Session>,
}

impl PostgresHandle {
    /// Wrap a connected client. Its connection task must already be running.
    pub fn new(client: Client) -> Self {
        Self {
            session: Arc::new(Session {
                client: Mutex::new(Some(Arc::new(client))),
                in_tx: AtomicBool::new(false),
            }),
        }
    }
}

impl DatabaseHandle for PostgresHandle {
    fn query<'a>(&'a self, sql: &'a str, params: &'a [Value]) -> BoxFuture<'a, OrmResult<Vec<Record>>> {
        Box::pin(async move { query_rows(&*self.session.client()?, sql, params).await })
    }

    fn execute<'a>(&'a self, sql: &'a str, params: &'a [Value]) -> BoxFuture<'a, OrmResult<ExecResult>> {
        Box::pin(async move { execute_rows(&*self.session.client()?, sql, params).await })
    }

    fn begin(&self) -> BoxFuture<'_, OrmResult<Arc<dyn TransactionHandle>>> {
        Box::pin(async move {
            if self.session.in_tx.swap(true, Ordering::SeqCst) {
                return Err(OrmError::AlreadyInTransaction);
            }
            // Built before BEGIN is sent so a dropped future still rolls the session back.
            let tx = PostgresTransaction {
                session: Arc::clone(&self.session),
                done: AtomicBool::new(false),
                settled: AtomicBool::new(false),
            };
            let begun = match self.session.client() {
                Ok(client) => client.batch_execute("BEGIN").await.map_err(OrmError::from),
                Err(e) => Err(e),
            };
            if let Err(e) = begun {
                tx.done.store(true, Ordering::SeqCst);
                tx.settled.store(true, Ordering::SeqCst);
                self.session.in_tx.store(false, Ordering::SeqCst);
                return Err(e);
            }
            let tx: Arc<dyn TransactionHandle> = Arc::new(tx);
            Ok(tx)
        })
    }

    fn close(&self) -> OrmResult<()> {
        self.session
            .client
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        Ok(())
    }
}

/// A `BEGIN ... COMMIT` block on a [`PostgresHandle`] session.
pub struct PostgresTransaction {
    session: Arc<Session>,
    /// No further statements are accepted.
    done: AtomicBool,
    /// The session is back outside of any transaction.
    settled: AtomicBool,
}

impl PostgresTransaction {
    async fn finish(&self, sql: &str) -> OrmResult<()> {
        if self.done.swap(true, Ordering::SeqCst) {
            return Err(OrmError::NotInTransaction);
        }
        let result = match self.session.client() {
            Ok(client) => client.batch_execute(sql).await.map_err(OrmError::from),
            Err(e) => Err(e),
        };
        self.settled.store(true, Ordering::SeqCst);
        self.session.in_tx.store(false, Ordering::SeqCst);
        result
    }

    fn client(&self) -> OrmResult<Arc<Client>> {
        if self.done.load(Ordering::SeqCst) {
            return Err(OrmError::NotInTransaction);
        }
        self.session.client()
    }

    /// Stop accepting statements and roll the session back on the runtime.
    ///
    /// Without a runtime (or a client) the session is only marked free; the server rolls back
    /// when the connection goes away.
    fn abandon(&self) {
        self.done.store(true, Ordering::SeqCst);
        if self.settled.swap(true, Ordering::SeqCst) {
            return;
        }
        let session = Arc::clone(&self.session);
        match (session.client(), tokio::runtime::Handle::try_current()) {
            (Ok(client), Ok(runtime)) => {
                runtime.spawn(async move {
                    if let Err(e) = client.batch_execute("ROLLBACK").await {
                        tracing::warn!(target: "sqlhydra.tx", error = %e, "background rollback failed");
                    }
                    session.in_tx.store(false, Ordering::SeqCst);
                });
            }
            _ => session.in_tx.store(false, Ordering::SeqCst),
        }
    }
}

impl DatabaseHandle for PostgresTransaction {
    fn query<'a>(&'a self, sql: &'a str, params: &'a [Value]) -> BoxFuture<'a, OrmResult<Vec<Record>>> {
        Box::pin(async move { query_rows(&*self.client()?, sql, params).await })
    }

    fn execute<'a>(&'a self, sql: &'a str, params: &'a [Value]) -> BoxFuture<'a, OrmResult<ExecResult>> {
        Box::pin(async move { execute_rows(&*self.client()?, sql, params).await })
    }

    fn begin(&self) -> BoxFuture<'_, OrmResult<Arc<dyn TransactionHandle>>> {
        Box::pin(async { Err(OrmError::AlreadyInTransaction) })
    }

    fn close(&self) -> OrmResult<()> {
        self.abandon();
        Ok(())
    }
}

impl TransactionHandle for PostgresTransaction {
    fn commit(&self) -> BoxFuture<'_, OrmResult<()>> {
        Box::pin(self.finish("COMMIT"))
    }

    fn rollback(&self) -> BoxFuture<'_, OrmResult<()>> {
        Box::pin(self.finish("ROLLBACK"))
    }
}

impl Drop for PostgresTransaction {
    fn drop(&mut self) {
        if !self.settled.load(Ordering::SeqCst) {
            self.abandon();
        }
    }
}

/// Connects one client per handle and drives its connection on the tokio runtime.
pub struct PostgresConnector;

impl Connector for PostgresConnector {
    fn connect<'a>(
        &'a self,
        config: &'a ConnectionConfig,
    ) -> BoxFuture<'a, OrmResult<Arc<dyn DatabaseHandle>>> {
        Box::pin(async move {
            let (client, connection) = pg_config(config)?.connect(NoTls).await?;
            let name = config.name.clone();
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    tracing::error!(target: "sqlhydra.registry", name = %name, error = %e, "postgres connection error");
                }
            });
            let handle: Arc<dyn DatabaseHandle> = Arc::new(PostgresHandle::new(client));
            Ok(handle)
        })
    }
}

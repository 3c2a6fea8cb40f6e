//! Database handle abstraction.
//!
//! A [`DatabaseHandle`] runs parameterized statements for rows or for effect and opens
//! transactions. Handles are used as trait objects so connections of different backends can
//! live in one registry; methods therefore return boxed futures.

use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::error::OrmResult;
use crate::record::Record;
use crate::value::Value;

/// Outcome of a statement executed for effect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// Generated key, where the backend reports one (SQLite `last_insert_rowid`).
    pub last_insert_id: Option<i64>,
}

impl ExecResult {
    pub fn new(rows_affected: u64) -> Self {
        Self {
            rows_affected,
            last_insert_id: None,
        }
    }

    pub fn with_last_insert_id(mut self, id: i64) -> Self {
        self.last_insert_id = Some(id);
        self
    }
}

/// A connection (or pool) able to run statements.
///
/// Implementations must be safe to call concurrently; the core adds no locking of its own.
pub trait DatabaseHandle: Send + Sync {
    /// Execute a statement and return its rows.
    fn query<'a>(&'a self, sql: &'a str, params: &'a [Value])
    -> BoxFuture<'a, OrmResult<Vec<Record>>>;

    /// Execute a statement for effect.
    fn execute<'a>(&'a self, sql: &'a str, params: &'a [Value])
    -> BoxFuture<'a, OrmResult<ExecResult>>;

    /// Start a transaction scoped to this handle.
    fn begin(&self) -> BoxFuture<'_, OrmResult<Arc<dyn TransactionHandle>>>;

    /// Release the underlying connection. Later calls fail.
    fn close(&self) -> OrmResult<()>;
}

/// An open transaction. Statements run through it belong to the transaction.
pub trait TransactionHandle: DatabaseHandle {
    fn commit(&self) -> BoxFuture<'_, OrmResult<()>>;

    fn rollback(&self) -> BoxFuture<'_, OrmResult<()>>;
}

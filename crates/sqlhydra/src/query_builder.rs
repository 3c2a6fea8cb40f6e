//! Statement execution bound to a connection or transaction.

use std::sync::Arc;
use std::time::Instant;

use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::handle::{DatabaseHandle, ExecResult, TransactionHandle};
use crate::monitor::SqlLogger;
use crate::qb::{
    CreateTableQb, DeleteQb, Filter, InsertQb, Page, SelectQb, Statement, UpdateQb, normalize_page,
};
use crate::record::{FromRecord, Record};
use crate::relation::{self, RelationSpec};
use crate::schema::Model;
use crate::value::{FromValue, Value};

#[derive(Clone)]
enum Executor {
    Handle(Arc<dyn DatabaseHandle>),
    Transaction(Arc<dyn TransactionHandle>),
}

impl Executor {
    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Record>> {
        match self {
            Executor::Handle(handle) => handle.query(sql, params).await,
            Executor::Transaction(tx) => tx.query(sql, params).await,
        }
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<ExecResult> {
        match self {
            Executor::Handle(handle) => handle.execute(sql, params).await,
            Executor::Transaction(tx) => tx.execute(sql, params).await,
        }
    }
}

/// Builds statements for one dialect and runs them on a handle.
///
/// Obtained from [`Connection::query_builder`](crate::Connection::query_builder), which binds
/// it to the active transaction when there is one. Cloning is cheap.
#[derive(Clone)]
pub struct QueryBuilder {
    dialect: Dialect,
    executor: Executor,
    logger: Arc<SqlLogger>,
}

impl std::fmt::Debug for QueryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("dialect", &self.dialect)
            .field("in_transaction", &self.in_transaction())
            .finish()
    }
}

impl QueryBuilder {
    /// Bind a builder to a plain handle.
    pub fn new(dialect: Dialect, handle: Arc<dyn DatabaseHandle>) -> Self {
        Self {
            dialect,
            executor: Executor::Handle(handle),
            logger: Arc::new(SqlLogger::default()),
        }
    }

    pub(crate) fn for_transaction(
        dialect: Dialect,
        tx: Arc<dyn TransactionHandle>,
        logger: Arc<SqlLogger>,
    ) -> Self {
        Self {
            dialect,
            executor: Executor::Transaction(tx),
            logger,
        }
    }

    /// Replace the SQL logger.
    pub fn with_logger(mut self, logger: Arc<SqlLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Whether statements run inside a transaction.
    pub fn in_transaction(&self) -> bool {
        matches!(self.executor, Executor::Transaction(_))
    }

    // ==================== Statement constructors ====================

    pub fn select(&self, table: &str) -> SelectQb {
        SelectQb::new(table).dialect(self.dialect)
    }

    pub fn insert(&self, table: &str) -> InsertQb {
        InsertQb::new(table).dialect(self.dialect)
    }

    pub fn update(&self, table: &str) -> UpdateQb {
        UpdateQb::new(table).dialect(self.dialect)
    }

    pub fn delete(&self, table: &str) -> DeleteQb {
        DeleteQb::new(table).dialect(self.dialect)
    }

    pub fn create_table(&self, table: &str) -> CreateTableQb {
        CreateTableQb::new(table).dialect(self.dialect)
    }

    // ==================== Raw SQL ====================

    /// Run raw SQL for rows. Placeholders must already match the dialect.
    pub async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Record>> {
        self.logger
            .before(self.dialect, sql, params.len(), self.in_transaction());
        let started = Instant::now();
        let result = self.executor.query(sql, params).await;
        self.logger.after(sql, started.elapsed(), result.is_err());
        result
    }

    /// Run raw SQL for effect.
    pub async fn execute_raw(&self, sql: &str, params: &[Value]) -> OrmResult<ExecResult> {
        self.logger
            .before(self.dialect, sql, params.len(), self.in_transaction());
        let started = Instant::now();
        let result = self.executor.execute(sql, params).await;
        self.logger.after(sql, started.elapsed(), result.is_err());
        result
    }

    // ==================== Statements ====================

    fn build(&self, statement: impl Into<Statement>) -> OrmResult<(String, Vec<Value>)> {
        statement.into().build_with_dialect(self.dialect)
    }

    /// Execute a statement and return all rows.
    pub async fn fetch_all(&self, statement: impl Into<Statement>) -> OrmResult<Vec<Record>> {
        let (sql, params) = self.build(statement)?;
        self.query(&sql, &params).await
    }

    /// Execute a statement and return the first row, if any.
    pub async fn fetch_opt(&self, statement: impl Into<Statement>) -> OrmResult<Option<Record>> {
        Ok(self.fetch_all(statement).await?.into_iter().next())
    }

    /// Execute a statement and return the first row; no rows is [`OrmError::NotFound`].
    pub async fn fetch_one(&self, statement: impl Into<Statement>) -> OrmResult<Record> {
        let statement = statement.into();
        let table = statement.table_name().to_string();
        self.fetch_opt(statement)
            .await?
            .ok_or_else(|| OrmError::not_found(format!("no rows returned from {table}")))
    }

    /// Execute a statement for effect.
    pub async fn execute(&self, statement: impl Into<Statement>) -> OrmResult<ExecResult> {
        let (sql, params) = self.build(statement)?;
        self.execute_raw(&sql, &params).await
    }

    /// Execute and map all rows to `T`.
    pub async fn fetch_all_as<T: FromRecord>(
        &self,
        statement: impl Into<Statement>,
    ) -> OrmResult<Vec<T>> {
        let rows = self.fetch_all(statement).await?;
        rows.iter().map(T::from_record).collect()
    }

    /// Execute and map the first row to `T`.
    pub async fn fetch_one_as<T: FromRecord>(&self, statement: impl Into<Statement>) -> OrmResult<T> {
        T::from_record(&self.fetch_one(statement).await?)
    }

    /// Execute and map the first row, if any, to `T`.
    pub async fn fetch_opt_as<T: FromRecord>(
        &self,
        statement: impl Into<Statement>,
    ) -> OrmResult<Option<T>> {
        self.fetch_opt(statement)
            .await?
            .as_ref()
            .map(T::from_record)
            .transpose()
    }

    /// Execute and decode the first column of the first row.
    pub async fn fetch_scalar<T: FromValue>(&self, statement: impl Into<Statement>) -> OrmResult<T> {
        let row = self.fetch_one(statement).await?;
        let (column, value) = row
            .columns()
            .next()
            .map(|(c, v)| (c.to_string(), v.clone()))
            .ok_or_else(|| OrmError::not_found("row has no columns"))?;
        T::from_value(value).map_err(|message| OrmError::decode(column, message))
    }

    // ==================== Relations ====================

    /// Run `select` and eager-load `relations` into every returned row.
    ///
    /// One query is issued per relation level, whatever the number of parents. Any failing
    /// child query fails the whole call; partially hydrated rows are never returned. An explicit
    /// column list on `select` gains the key columns the relations look up.
    pub async fn get(&self, select: SelectQb, relations: &[RelationSpec]) -> OrmResult<Vec<Record>> {
        let table = select.table_name().to_string();
        let select = select.ensure_columns(&relation::parent_key_columns(&table, relations));
        let mut rows = self.fetch_all(select).await?;
        for spec in relations {
            let parents: Vec<&mut Record> = rows.iter_mut().collect();
            relation::load(self, &table, parents, spec).await?;
        }
        Ok(rows)
    }

    /// [`QueryBuilder::get`] mapped to `T`.
    pub async fn get_as<T: FromRecord>(
        &self,
        select: SelectQb,
        relations: &[RelationSpec],
    ) -> OrmResult<Vec<T>> {
        let rows = self.get(select, relations).await?;
        rows.iter().map(T::from_record).collect()
    }

    // ==================== Aggregates & pagination ====================

    /// Number of rows `select` would return, ignoring ORDER BY/LIMIT/OFFSET.
    pub async fn count(&self, select: &SelectQb) -> OrmResult<i64> {
        let (sql, params) = select.build_count_with_dialect(self.dialect)?;
        let rows = self.query(&sql, &params).await?;
        let value = rows
            .first()
            .and_then(Record::first_value)
            .cloned()
            .unwrap_or(Value::Int(0));
        i64::from_value(value).map_err(|message| OrmError::decode("count", message))
    }

    /// Whether `select` matches any row.
    pub async fn exists(&self, select: &SelectQb) -> OrmResult<bool> {
        Ok(self.count(select).await? > 0)
    }

    /// Offset pagination with totals.
    pub async fn paginate(&self, select: SelectQb, page: i64, per_page: i64) -> OrmResult<Page<Record>> {
        self.paginate_with(select, &[], page, per_page).await
    }

    /// Offset pagination with eager-loaded relations on the page items.
    pub async fn paginate_with(
        &self,
        select: SelectQb,
        relations: &[RelationSpec],
        page: i64,
        per_page: i64,
    ) -> OrmResult<Page<Record>> {
        let (page, per_page) = normalize_page(page, per_page);
        let total = self.count(&select).await?;
        let items = self.get(select.page(page, per_page), relations).await?;
        Ok(Page::new(items, total, page, per_page))
    }

    /// [`QueryBuilder::paginate`] mapped to `T`.
    pub async fn paginate_as<T: FromRecord>(
        &self,
        select: SelectQb,
        page: i64,
        per_page: i64,
    ) -> OrmResult<Page<T>> {
        self.paginate(select, page, per_page)
            .await?
            .try_map(|record| T::from_record(&record))
    }

    // ==================== Models ====================

    /// Insert one model row with every stored column.
    pub async fn insert_model<M: Model>(&self, model: &M) -> OrmResult<ExecResult> {
        self.insert_models(std::slice::from_ref(model)).await
    }

    /// Insert several model rows in one statement.
    pub async fn insert_models<M: Model>(&self, models: &[M]) -> OrmResult<ExecResult> {
        let columns = M::schema().columns();
        let mut insert = self.insert(M::table_name()).columns(&columns);
        for model in models {
            insert = insert.values(model.to_values().into_iter().map(|(_, v)| v));
        }
        self.execute(insert).await
    }

    /// Update every non-key column of `model`, matched by primary key.
    pub async fn update_model<M: Model>(&self, model: &M) -> OrmResult<ExecResult> {
        let pk = M::schema().primary_key()?.column;
        let mut update = self.update(M::table_name());
        let mut pk_value = None;
        for (column, value) in model.to_values() {
            if column == pk {
                pk_value = Some(value);
            } else {
                update = update.set(column, value);
            }
        }
        let pk_value = pk_value.ok_or_else(|| OrmError::MissingPrimaryKey(M::table_name().to_string()))?;
        self.execute(update.eq(pk, pk_value)).await
    }

    /// Delete the row matching `model`'s primary key.
    pub async fn delete_model<M: Model>(&self, model: &M) -> OrmResult<ExecResult> {
        let pk = M::schema().primary_key()?.column;
        let pk_value = model
            .to_values()
            .into_iter()
            .find(|(column, _)| *column == pk)
            .map(|(_, value)| value)
            .ok_or_else(|| OrmError::MissingPrimaryKey(M::table_name().to_string()))?;
        self.execute(self.delete(M::table_name()).eq(pk, pk_value)).await
    }

    /// Fetch a model by primary key.
    pub async fn find<M: Model>(&self, id: impl Into<Value>) -> OrmResult<Option<M>> {
        let pk = M::schema().primary_key()?.column;
        let select = self
            .select(M::table_name())
            .columns(&M::schema().columns())
            .eq(pk, id);
        self.fetch_opt_as(select).await
    }
}

//! INSERT query builder.

use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::qb::param::ParamList;
use crate::record::Record;
use crate::value::Value;

/// INSERT query builder rendering one multi-row VALUES list.
#[derive(Clone, Debug)]
pub struct InsertQb {
    dialect: Dialect,
    table: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    returning_cols: Vec<String>,
}

impl InsertQb {
    /// Create a new INSERT query builder.
    pub fn new(table: &str) -> Self {
        Self {
            dialect: Dialect::default(),
            table: table.trim().to_string(),
            columns: Vec::new(),
            rows: Vec::new(),
            returning_cols: Vec::new(),
        }
    }

    /// Render for `dialect`.
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Set the column list.
    pub fn columns(mut self, cols: &[&str]) -> Self {
        self.columns = cols.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Append a value row. Its arity must match the column list.
    pub fn values<T: Into<Value>>(mut self, row: impl IntoIterator<Item = T>) -> Self {
        self.rows.push(row.into_iter().map(Into::into).collect());
        self
    }

    /// Set a column value on the first row.
    pub fn set(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.columns.push(column.to_string());
        match self.rows.first_mut() {
            Some(row) => row.push(value.into()),
            None => self.rows.push(vec![value.into()]),
        }
        self
    }

    /// Set an optional column value (None => skip).
    pub fn set_opt<T: Into<Value>>(self, column: &str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.set(column, v),
            None => self,
        }
    }

    /// Append a row from a record.
    ///
    /// The first record also defines the column list when none was set.
    pub fn record(mut self, record: &Record) -> Self {
        if self.columns.is_empty() {
            self.columns = record.column_names().into_iter().map(str::to_string).collect();
        }
        let row = self
            .columns
            .iter()
            .map(|c| record.get(c).cloned().unwrap_or(Value::Null))
            .collect();
        self.rows.push(row);
        self
    }

    /// Return columns from the inserted rows.
    ///
    /// Rendered as `RETURNING` on PostgreSQL and SQLite and `OUTPUT INSERTED.*` on SQL Server.
    /// MySQL has no equivalent; the clause is dropped there.
    pub fn returning(mut self, cols: &str) -> Self {
        self.returning_cols.extend(
            cols.split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
        );
        self
    }

    fn validate(&self) -> OrmResult<()> {
        if self.table.is_empty() {
            return Err(OrmError::MissingTable);
        }
        if self.columns.is_empty() || self.rows.is_empty() {
            return Err(OrmError::validation(format!(
                "INSERT INTO {} requires at least one column and one row",
                self.table
            )));
        }
        for (i, row) in self.rows.iter().enumerate() {
            if row.len() != self.columns.len() {
                return Err(OrmError::column_mismatch(format!(
                    "row {} has {} values for {} columns",
                    i + 1,
                    row.len(),
                    self.columns.len()
                )));
            }
        }
        Ok(())
    }

    /// Build SQL and arguments for the builder's dialect.
    pub fn build(&self) -> OrmResult<(String, Vec<Value>)> {
        self.build_with_dialect(self.dialect)
    }

    /// Build SQL and arguments for `dialect`.
    pub fn build_with_dialect(&self, dialect: Dialect) -> OrmResult<(String, Vec<Value>)> {
        self.validate()?;
        let mut params = ParamList::new(dialect);

        let mut sql = format!("INSERT INTO {} ({})", self.table, self.columns.join(", "));
        let returning = !self.returning_cols.is_empty();
        if returning && dialect == Dialect::Mssql {
            let output: Vec<String> = self
                .returning_cols
                .iter()
                .map(|c| format!("INSERTED.{c}"))
                .collect();
            sql.push_str(" OUTPUT ");
            sql.push_str(&output.join(", "));
        }

        let rows: Vec<String> = self
            .rows
            .iter()
            .map(|row| format!("({})", params.push_all(row)))
            .collect();
        sql.push_str(" VALUES ");
        sql.push_str(&rows.join(", "));

        if returning && matches!(dialect, Dialect::Pgsql | Dialect::Sqlite) {
            sql.push_str(" RETURNING ");
            sql.push_str(&self.returning_cols.join(", "));
        }

        Ok((sql, params.into_values()))
    }

    /// Get the built SQL string (for debugging).
    pub fn to_sql(&self) -> OrmResult<String> {
        self.build().map(|(sql, _)| sql)
    }
}

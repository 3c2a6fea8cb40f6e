//! UPDATE query builder.

use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::qb::expr::ExprGroup;
use crate::qb::param::ParamList;
use crate::qb::traits::{Filter, OrderLimit, Ordered};
use crate::record::Record;
use crate::schema::Model;
use crate::value::Value;

/// SET field value type.
#[derive(Clone, Debug)]
enum SetField {
    /// Parameterized value
    Value(Value),
    /// Raw SQL expression
    Raw(String),
}

/// UPDATE query builder.
///
/// A missing WHERE clause updates every row; that is the caller's call to make.
#[derive(Clone, Debug)]
pub struct UpdateQb {
    dialect: Dialect,
    table: String,
    set_fields: Vec<(String, SetField)>,
    where_group: ExprGroup,
    order_limit: OrderLimit,
    /// Deferred `set_record` failure, reported by `build`.
    build_error: Option<String>,
}

impl UpdateQb {
    /// Create a new UPDATE query builder.
    pub fn new(table: &str) -> Self {
        Self {
            dialect: Dialect::default(),
            table: table.trim().to_string(),
            set_fields: Vec::new(),
            where_group: ExprGroup::new(),
            order_limit: OrderLimit::default(),
            build_error: None,
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

    /// Set a column value.
    pub fn set(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.set_fields
            .push((column.to_string(), SetField::Value(value.into())));
        self
    }

    /// Set an optional column value (None => skip).
    pub fn set_opt<T: Into<Value>>(self, column: &str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.set(column, v),
            None => self,
        }
    }

    /// Set a column to a raw SQL expression (e.g. `count = count + 1`).
    pub fn set_raw(mut self, column: &str, expr: &str) -> Self {
        self.set_fields
            .push((column.to_string(), SetField::Raw(expr.to_string())));
        self
    }

    /// Set every column of `record`, checked against the schema of `M`.
    ///
    /// A column `M` does not store makes `build` fail with [`OrmError::ColumnMismatch`].
    pub fn set_record<M: Model>(mut self, record: &Record) -> Self {
        let schema = M::schema();
        for (column, value) in record.columns() {
            if !schema.has_column(column) {
                if self.build_error.is_none() {
                    self.build_error = Some(format!(
                        "column `{column}` is not part of table `{}`",
                        schema.table()
                    ));
                }
                continue;
            }
            self.set_fields
                .push((column.to_string(), SetField::Value(value.clone())));
        }
        self
    }

    fn validate(&self) -> OrmResult<()> {
        if self.table.is_empty() {
            return Err(OrmError::MissingTable);
        }
        if let Some(message) = &self.build_error {
            return Err(OrmError::column_mismatch(message.clone()));
        }
        if self.set_fields.is_empty() {
            return Err(OrmError::validation(format!(
                "UPDATE {} requires at least one SET column",
                self.table
            )));
        }
        Ok(())
    }

    /// Build SQL and arguments for the builder's dialect.
    pub fn build(&self) -> OrmResult<(String, Vec<Value>)> {
        self.build_with_dialect(self.dialect)
    }

    /// Build SQL and arguments for `dialect`.
    ///
    /// LIMIT renders as `UPDATE TOP (n)` on SQL Server, where ORDER BY is not allowed and is
    /// dropped.
    pub fn build_with_dialect(&self, dialect: Dialect) -> OrmResult<(String, Vec<Value>)> {
        self.validate()?;
        let mut params = ParamList::new(dialect);

        let mut sql = match (dialect, self.order_limit.limit) {
            (Dialect::Mssql, Some(n)) => format!("UPDATE TOP ({n}) {} SET ", self.table),
            _ => format!("UPDATE {} SET ", self.table),
        };

        let sets: Vec<String> = self
            .set_fields
            .iter()
            .map(|(column, field)| match field {
                SetField::Value(value) => format!("{column} = {}", params.push(value.clone())),
                SetField::Raw(expr) => format!("{column} = {expr}"),
            })
            .collect();
        sql.push_str(&sets.join(", "));

        if let Some(where_sql) = self.where_group.compile(&mut params)? {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }

        if dialect != Dialect::Mssql {
            self.order_limit.push_order(&mut sql);
            if let Some(n) = self.order_limit.limit {
                sql.push_str(&format!(" LIMIT {n}"));
            }
        }

        Ok((sql, params.into_values()))
    }

    /// Get the built SQL string (for debugging).
    pub fn to_sql(&self) -> OrmResult<String> {
        self.build().map(|(sql, _)| sql)
    }
}

impl Filter for UpdateQb {
    fn where_group_mut(&mut self) -> &mut ExprGroup {
        &mut self.where_group
    }
}

impl Ordered for UpdateQb {
    fn order_limit_mut(&mut self) -> &mut OrderLimit {
        &mut self.order_limit
    }
}

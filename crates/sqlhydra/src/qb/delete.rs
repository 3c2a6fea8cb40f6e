//! DELETE query builder.

use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::qb::expr::ExprGroup;
use crate::qb::param::ParamList;
use crate::qb::traits::{Filter, OrderLimit, Ordered};
use crate::value::Value;

/// DELETE query builder. Without a WHERE clause every row is deleted.
#[derive(Clone, Debug)]
pub struct DeleteQb {
    dialect: Dialect,
    table: String,
    where_group: ExprGroup,
    order_limit: OrderLimit,
}

impl DeleteQb {
    /// Create a new DELETE query builder.
    pub fn new(table: &str) -> Self {
        Self {
            dialect: Dialect::default(),
            table: table.trim().to_string(),
            where_group: ExprGroup::new(),
            order_limit: OrderLimit::default(),
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

    /// Build SQL and arguments for the builder's dialect.
    pub fn build(&self) -> OrmResult<(String, Vec<Value>)> {
        self.build_with_dialect(self.dialect)
    }

    /// Build SQL and arguments for `dialect`.
    pub fn build_with_dialect(&self, dialect: Dialect) -> OrmResult<(String, Vec<Value>)> {
        if self.table.is_empty() {
            return Err(OrmError::MissingTable);
        }
        let mut params = ParamList::new(dialect);

        let mut sql = match (dialect, self.order_limit.limit) {
            (Dialect::Mssql, Some(n)) => format!("DELETE TOP ({n}) FROM {}", self.table),
            _ => format!("DELETE FROM {}", self.table),
        };

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

impl Filter for DeleteQb {
    fn where_group_mut(&mut self) -> &mut ExprGroup {
        &mut self.where_group
    }
}

impl Ordered for DeleteQb {
    fn order_limit_mut(&mut self) -> &mut OrderLimit {
        &mut self.order_limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qb::expr::Expr;

    #[test]
    fn test_delete_basic() {
        let (sql, args) = DeleteQb::new("users").eq("id", 1).build().unwrap();
        assert_eq!(sql, "DELETE FROM users WHERE id = $1");
        assert_eq!(args, vec![Value::Int(1)]);
    }

    #[test]
    fn test_delete_all_rows() {
        assert_eq!(DeleteQb::new("sessions").to_sql().unwrap(), "DELETE FROM sessions");
    }

    #[test]
    fn test_delete_empty_combinator_fails() {
        let err = DeleteQb::new("users").and_expr(Expr::or(vec![])).build().unwrap_err();
        assert!(matches!(err, OrmError::EmptyCondition));
    }

    #[test]
    fn test_delete_with_limit() {
        let qb = DeleteQb::new("logs").lt("id", 100).limit(10);
        assert_eq!(
            qb.build_with_dialect(Dialect::Sqlite).unwrap().0,
            "DELETE FROM logs WHERE id < ? LIMIT 10"
        );
        assert_eq!(
            qb.build_with_dialect(Dialect::Mssql).unwrap().0,
            "DELETE TOP (10) FROM logs WHERE id < @p1"
        );
    }
}

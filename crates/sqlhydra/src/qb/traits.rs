//! Capability traits shared by the statement builders.
//!
//! SELECT, UPDATE and DELETE all carry a WHERE clause and an ORDER BY/LIMIT tail. Rather than
//! each builder re-implementing the predicate methods, they expose their state through
//! [`Filter`] and [`Ordered`] and get the fluent API from the provided methods.

use crate::qb::expr::{Expr, ExprGroup, Op};
use crate::qb::select::SelectQb;
use crate::value::Value;

/// Builders with a WHERE clause.
pub trait Filter: Sized {
    /// Mutable access to the WHERE group.
    fn where_group_mut(&mut self) -> &mut ExprGroup;

    /// Add an arbitrary expression to the WHERE clause (ANDed).
    fn and_expr(mut self, expr: Expr) -> Self {
        self.where_group_mut().and_expr(expr);
        self
    }

    /// Add WHERE: column = value
    fn eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.and_expr(Expr::eq(column, value))
    }

    /// Add WHERE: column <> value
    fn ne(self, column: &str, value: impl Into<Value>) -> Self {
        self.and_expr(Expr::ne(column, value))
    }

    /// Add WHERE: column > value
    fn gt(self, column: &str, value: impl Into<Value>) -> Self {
        self.and_expr(Expr::gt(column, value))
    }

    /// Add WHERE: column >= value
    fn gte(self, column: &str, value: impl Into<Value>) -> Self {
        self.and_expr(Expr::gte(column, value))
    }

    /// Add WHERE: column < value
    fn lt(self, column: &str, value: impl Into<Value>) -> Self {
        self.and_expr(Expr::lt(column, value))
    }

    /// Add WHERE: column <= value
    fn lte(self, column: &str, value: impl Into<Value>) -> Self {
        self.and_expr(Expr::lte(column, value))
    }

    /// Add WHERE: column LIKE pattern
    fn like(self, column: &str, pattern: impl Into<Value>) -> Self {
        self.and_expr(Expr::like(column, pattern))
    }

    /// Add WHERE: column ILIKE pattern
    fn ilike(self, column: &str, pattern: impl Into<Value>) -> Self {
        self.and_expr(Expr::ilike(column, pattern))
    }

    /// Add WHERE: column NOT LIKE pattern
    fn not_like(self, column: &str, pattern: impl Into<Value>) -> Self {
        self.and_expr(Expr::not_like(column, pattern))
    }

    /// Add WHERE: column NOT ILIKE pattern
    fn not_ilike(self, column: &str, pattern: impl Into<Value>) -> Self {
        self.and_expr(Expr::not_ilike(column, pattern))
    }

    /// Add WHERE: column IS NULL
    fn is_null(self, column: &str) -> Self {
        self.and_expr(Expr::is_null(column))
    }

    /// Add WHERE: column IS NOT NULL
    fn is_not_null(self, column: &str) -> Self {
        self.and_expr(Expr::is_not_null(column))
    }

    /// Add WHERE: column IN (...)
    fn in_list<T: Into<Value>>(self, column: &str, values: impl IntoIterator<Item = T>) -> Self {
        self.and_expr(Expr::in_list(column, values))
    }

    /// Add WHERE: column NOT IN (...)
    fn not_in<T: Into<Value>>(self, column: &str, values: impl IntoIterator<Item = T>) -> Self {
        self.and_expr(Expr::not_in(column, values))
    }

    /// Add WHERE: column BETWEEN from AND to
    fn between(self, column: &str, from: impl Into<Value>, to: impl Into<Value>) -> Self {
        self.and_expr(Expr::between(column, from, to))
    }

    /// Add WHERE: column NOT BETWEEN from AND to
    fn not_between(self, column: &str, from: impl Into<Value>, to: impl Into<Value>) -> Self {
        self.and_expr(Expr::not_between(column, from, to))
    }

    /// Add WHERE: EXISTS (subquery)
    fn exists(self, query: SelectQb) -> Self {
        self.and_expr(Expr::exists(query))
    }

    /// Add WHERE: NOT EXISTS (subquery)
    fn not_exists(self, query: SelectQb) -> Self {
        self.and_expr(Expr::not_exists(query))
    }

    /// Add WHERE: column op ANY (...)
    fn any<T: Into<Value>>(self, column: &str, op: Op, values: impl IntoIterator<Item = T>) -> Self {
        self.and_expr(Expr::any(column, op, values))
    }

    /// Add WHERE: column op ALL (...)
    fn all<T: Into<Value>>(self, column: &str, op: Op, values: impl IntoIterator<Item = T>) -> Self {
        self.and_expr(Expr::all(column, op, values))
    }

    /// Add WHERE: column op SOME (...)
    fn some<T: Into<Value>>(
        self,
        column: &str,
        op: Op,
        values: impl IntoIterator<Item = T>,
    ) -> Self {
        self.and_expr(Expr::some(column, op, values))
    }

    /// Add WHERE: column IS DISTINCT FROM value
    fn is_distinct_from(self, column: &str, value: impl Into<Value>) -> Self {
        self.and_expr(Expr::is_distinct_from(column, value))
    }

    /// Add WHERE: column IS NOT DISTINCT FROM value
    fn is_not_distinct_from(self, column: &str, value: impl Into<Value>) -> Self {
        self.and_expr(Expr::is_not_distinct_from(column, value))
    }

    /// Add a raw WHERE fragment.
    fn raw(self, sql: &str) -> Self {
        self.and_expr(Expr::raw(sql))
    }

    /// Add a WHERE template with `?` placeholders.
    fn where_template<T: Into<Value>>(self, sql: &str, values: impl IntoIterator<Item = T>) -> Self {
        self.and_expr(Expr::template(sql, values))
    }

    // Optional conditions: skipped when the value is None.

    /// Add WHERE: column = value (if Some)
    fn eq_opt<T: Into<Value>>(self, column: &str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.eq(column, v),
            None => self,
        }
    }

    /// Add WHERE: column LIKE pattern (if Some)
    fn like_opt<T: Into<Value>>(self, column: &str, pattern: Option<T>) -> Self {
        match pattern {
            Some(p) => self.like(column, p),
            None => self,
        }
    }

    /// Add WHERE: column ILIKE pattern (if Some)
    fn ilike_opt<T: Into<Value>>(self, column: &str, pattern: Option<T>) -> Self {
        match pattern {
            Some(p) => self.ilike(column, p),
            None => self,
        }
    }

    /// Add WHERE: column > value (if Some)
    fn gt_opt<T: Into<Value>>(self, column: &str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.gt(column, v),
            None => self,
        }
    }

    /// Add WHERE: column < value (if Some)
    fn lt_opt<T: Into<Value>>(self, column: &str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.lt(column, v),
            None => self,
        }
    }

    /// Add WHERE: column IN (...) (if Some)
    fn in_opt<T: Into<Value>>(self, column: &str, values: Option<Vec<T>>) -> Self {
        match values {
            Some(v) => self.in_list(column, v),
            None => self,
        }
    }
}

/// ORDER BY clauses plus LIMIT.
#[derive(Clone, Debug, Default)]
pub struct OrderLimit {
    pub(crate) order: Vec<String>,
    pub(crate) limit: Option<i64>,
}

impl OrderLimit {
    pub(crate) fn has_order(&self) -> bool {
        !self.order.is_empty()
    }

    pub(crate) fn push_order(&self, sql: &mut String) {
        if self.has_order() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order.join(", "));
        }
    }
}

/// Builders with ORDER BY and LIMIT.
pub trait Ordered: Sized {
    /// Mutable access to the ORDER BY/LIMIT state.
    fn order_limit_mut(&mut self) -> &mut OrderLimit;

    /// Add an ORDER BY clause.
    fn order_by(mut self, clause: &str) -> Self {
        self.order_limit_mut().order.push(clause.to_string());
        self
    }

    /// Add ORDER BY column ASC.
    fn order_by_asc(self, column: &str) -> Self {
        self.order_by(&format!("{column} ASC"))
    }

    /// Add ORDER BY column DESC.
    fn order_by_desc(self, column: &str) -> Self {
        self.order_by(&format!("{column} DESC"))
    }

    /// Drop every ORDER BY clause.
    fn clear_order(mut self) -> Self {
        self.order_limit_mut().order.clear();
        self
    }

    /// Set LIMIT.
    fn limit(mut self, n: i64) -> Self {
        self.order_limit_mut().limit = Some(n);
        self
    }
}
